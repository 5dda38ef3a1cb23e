use serde::{Deserialize, Deserializer, Serialize};

use crate::settings::{Settings, LOCALIZED_LANGUAGE};

/// Stable identifier of a backed-up game. The backend sends wiki page ids,
/// sometimes as numbers and sometimes as strings, so they are normalised to
/// strings on the way in.
pub type RecordId = String;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct BackupItem {
    #[serde(default)]
    pub is_permanent: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

/// One game's backup state as reported by the backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BackupRecord {
    #[serde(rename = "wiki_page_id", deserialize_with = "deserialize_id")]
    pub id: RecordId,
    #[serde(default)]
    pub title: String,
    #[serde(rename = "zh_CN", default, skip_serializing_if = "Option::is_none")]
    pub localized_title: Option<String>,
    #[serde(default)]
    pub backups: Vec<BackupItem>,
    #[serde(default)]
    pub backup_size: u64,
    #[serde(rename = "latest_backup", default)]
    pub latest_backup: String,
}

impl BackupRecord {
    pub fn has_permanent_backup(&self) -> bool {
        self.backups.iter().any(|b| b.is_permanent)
    }

    pub fn backup_count(&self) -> usize {
        self.backups.len()
    }

    pub fn is_pinned(&self, settings: &Settings) -> bool {
        settings.pinned_games.iter().any(|id| *id == self.id)
    }

    /// Title shown in the table and used as the sort key. Falls back to the
    /// default title when the localized one is missing or empty.
    pub fn display_title(&self, language: &str) -> &str {
        match self.localized_title.as_deref() {
            Some(localized) if language == LOCALIZED_LANGUAGE && !localized.is_empty() => localized,
            _ => &self.title,
        }
    }
}

/// A record paired with the key the sort service orders it by.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SortableRecord {
    #[serde(flatten)]
    pub record: BackupRecord,
    #[serde(rename = "titleToSort")]
    pub title_to_sort: String,
}

impl SortableRecord {
    pub fn new(record: BackupRecord, language: &str) -> Self {
        let title_to_sort = record.display_title(language).to_owned();
        Self {
            record,
            title_to_sort,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub(crate) enum WireId {
    Number(u64),
    Text(String),
}

impl From<WireId> for RecordId {
    fn from(id: WireId) -> Self {
        match id {
            WireId::Number(n) => n.to_string(),
            WireId::Text(s) => s,
        }
    }
}

fn deserialize_id<'de, D>(deserializer: D) -> Result<RecordId, D::Error>
where
    D: Deserializer<'de>,
{
    WireId::deserialize(deserializer).map(Into::into)
}
