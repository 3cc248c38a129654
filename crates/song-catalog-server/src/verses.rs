//! Verse splitting and pagination for song lyrics.

/// Verses are separated by one blank line.
pub const VERSE_SEPARATOR: &str = "\n\n";

pub fn split_verses(text: &str) -> Vec<&str> {
    text.split(VERSE_SEPARATOR).collect()
}

/// Verses `[(page-1)*limit, page*limit)` of `text`, clamped to the verse
/// count. Pages past the end are empty rather than an error.
pub fn verse_page(text: &str, page: u32, limit: u32) -> Vec<String> {
    let verses = split_verses(text);
    let limit = limit as usize;
    let start = (page.saturating_sub(1) as usize)
        .saturating_mul(limit)
        .min(verses.len());
    let end = start.saturating_add(limit).min(verses.len());
    verses[start..end].iter().map(|v| v.to_string()).collect()
}
