use std::collections::HashMap;
use std::sync::Arc;

use save_export_core::{BackupRecord, RecordId};
use tokio::sync::RwLock;
use tracing::debug;

/// Latest known backup record per game, rebuilt from scratch on every table
/// refresh. Clones share the same map.
#[derive(Debug, Clone, Default)]
pub struct BackupRecordStore {
    records: Arc<RwLock<HashMap<RecordId, BackupRecord>>>,
}

impl BackupRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole mapping. Later duplicates of an id win.
    pub async fn refresh(&self, records: impl IntoIterator<Item = BackupRecord>) {
        let fresh: HashMap<RecordId, BackupRecord> =
            records.into_iter().map(|r| (r.id.clone(), r)).collect();
        let mut guard = self.records.write().await;
        debug!(previous = guard.len(), current = fresh.len(), "record store refreshed");
        *guard = fresh;
    }

    pub async fn get(&self, id: &str) -> Option<BackupRecord> {
        self.records.read().await.get(id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Sum of `backup_size` over `ids`. Unknown ids count as zero.
    pub async fn total_size<'a, I>(&self, ids: I) -> u64
    where
        I: IntoIterator<Item = &'a RecordId>,
    {
        let guard = self.records.read().await;
        ids.into_iter()
            .filter_map(|id| guard.get(id))
            .map(|r| r.backup_size)
            .sum()
    }
}
