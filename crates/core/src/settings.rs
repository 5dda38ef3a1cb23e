use serde::{Deserialize, Serialize};

/// Display language whose records prefer their localized title.
pub const LOCALIZED_LANGUAGE: &str = "zh_CN";

/// The subset of user settings the export tab reads.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(default, rename_all = "camelCase")]
pub struct Settings {
    pub language: String,
    pub pinned_games: Vec<String>,
    pub export_count: Option<u32>,
    pub export_path: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_default() {
        let settings: Settings = serde_json::from_str(r#"{"language": "zh_CN"}"#).expect("parse");
        assert_eq!(settings.language, "zh_CN");
        assert!(settings.pinned_games.is_empty());
        assert_eq!(settings.export_count, None);
    }

    #[test]
    fn camel_case_wire_names() {
        let settings: Settings = serde_json::from_str(
            r#"{"language": "en_US", "pinnedGames": ["7", "9"], "exportCount": 3, "exportPath": "/tmp/out"}"#,
        )
        .expect("parse");
        assert_eq!(settings.pinned_games, vec!["7", "9"]);
        assert_eq!(settings.export_count, Some(3));
        assert_eq!(settings.export_path.as_deref(), Some("/tmp/out"));
    }
}
