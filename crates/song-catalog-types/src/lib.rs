use serde::{Deserialize, Serialize};

/// A catalog entry as stored and returned by the song API.
///
/// Request payloads may omit any field; missing fields decode to their
/// defaults (`0` / empty string), matching how clients submit only
/// `group` and `song` on creation.
#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(default, rename_all = "camelCase")]
pub struct Song {
    /// Store-assigned identifier (`0` until persisted).
    pub id: i64,
    /// Performing artist or group name.
    pub group: String,
    /// Track title.
    pub song: String,
    /// Free-form release date, filled from the metadata provider.
    pub release_date: String,
    /// Full lyrics; verses are separated by a blank line.
    pub text: String,
    /// External reference URL.
    pub link: String,
}

impl Song {
    /// Overwrite the enrichment fields with a provider lookup result.
    pub fn apply_detail(&mut self, detail: SongDetail) {
        self.release_date = detail.release_date;
        self.text = detail.text;
        self.link = detail.link;
    }
}

/// Enrichment payload returned by the external metadata provider
/// (`GET {base}/info?group=..&song=..`).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
#[serde(rename_all = "camelCase")]
pub struct SongDetail {
    /// Release date as reported by the provider.
    pub release_date: String,
    /// Lyrics text.
    pub text: String,
    /// External reference URL.
    pub link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn song_uses_camel_case_release_date() {
        let song = Song {
            id: 7,
            group: "Muse".to_string(),
            song: "Supermassive Black Hole".to_string(),
            release_date: "16.07.2006".to_string(),
            text: "Ooh baby".to_string(),
            link: "https://example.com".to_string(),
        };
        let value = serde_json::to_value(&song).expect("serialize song");
        assert_eq!(value["releaseDate"], "16.07.2006");
        assert!(value.get("release_date").is_none());
        assert_eq!(value["id"], 7);
    }

    #[test]
    fn song_payload_with_only_group_and_song_decodes() {
        let song: Song =
            serde_json::from_str(r#"{"group":"Muse","song":"Uprising"}"#).expect("decode song");
        assert_eq!(song.id, 0);
        assert_eq!(song.group, "Muse");
        assert_eq!(song.song, "Uprising");
        assert!(song.release_date.is_empty());
    }

    #[test]
    fn apply_detail_overwrites_enrichment_fields_only() {
        let mut song = Song {
            id: 3,
            group: "G".to_string(),
            song: "S".to_string(),
            release_date: "client".to_string(),
            text: "client".to_string(),
            link: "client".to_string(),
        };
        song.apply_detail(SongDetail {
            release_date: "2020".to_string(),
            text: "x".to_string(),
            link: "y".to_string(),
        });
        assert_eq!(song.id, 3);
        assert_eq!(song.group, "G");
        assert_eq!(song.release_date, "2020");
        assert_eq!(song.text, "x");
        assert_eq!(song.link, "y");
    }

    #[test]
    fn song_detail_requires_all_fields() {
        let err = serde_json::from_str::<SongDetail>(r#"{"releaseDate":"2020"}"#);
        assert!(err.is_err());
    }
}
