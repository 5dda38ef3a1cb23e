use std::time::Duration;

use anyhow::{Context, Result};
use save_export_core::{BackupRecord, ExportReport, ProgressPhase, RecordId, Settings, SortableRecord};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use thiserror::Error;
use tracing::{debug, warn};

use crate::service::Backend;

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8090".to_owned(),
            timeout: Duration::from_secs(3600),
        }
    }
}

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("backend rejected {channel} ({status}): {message}")]
    Rejected {
        channel: String,
        status: u16,
        message: String,
    },
    #[error("backend base url is empty")]
    MissingBaseUrl,
}

/// Talks to the backend process over its IPC bridge: every call is a
/// `POST {base_url}/ipc/{channel}` whose body is the JSON argument list.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
    base_url: String,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_owned();
        if base_url.is_empty() {
            return Err(BackendError::MissingBaseUrl.into());
        }
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .context("build backend http client")?;
        Ok(Self { client, base_url })
    }

    fn url(&self, channel: &str) -> String {
        format!("{}/ipc/{channel}", self.base_url)
    }

    async fn invoke<T: DeserializeOwned>(&self, channel: &str, args: Value) -> Result<T> {
        debug!(channel, "backend invoke");
        let resp = self
            .client
            .post(self.url(channel))
            .json(&args)
            .send()
            .await
            .with_context(|| format!("invoke {channel}"))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(BackendError::Rejected {
                channel: channel.to_owned(),
                status: status.as_u16(),
                message,
            }
            .into());
        }

        resp.json::<T>()
            .await
            .with_context(|| format!("decode {channel} reply"))
    }

    /// Posts without waiting for the reply. Outside a tokio runtime the
    /// message is dropped with a warning.
    fn send(&self, channel: &'static str, args: Value) {
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            warn!(channel, "no runtime available, dropping backend notification");
            return;
        };
        let request = self.client.post(self.url(channel)).json(&args);
        handle.spawn(async move {
            match request.send().await {
                Ok(resp) if resp.status().is_success() => {}
                Ok(resp) => warn!(channel, status = %resp.status(), "backend rejected notification"),
                Err(e) => warn!(channel, error = %e, "backend notification failed"),
            }
        });
    }
}

#[async_trait::async_trait]
impl Backend for HttpBackend {
    async fn fetch_exportable_records(&self) -> Result<Vec<BackupRecord>> {
        self.invoke("fetch-export-table-data", json!([])).await
    }

    async fn get_settings(&self) -> Result<Settings> {
        self.invoke("get-settings", json!([])).await
    }

    async fn sort_records(&self, records: Vec<SortableRecord>) -> Result<Vec<SortableRecord>> {
        if records.is_empty() {
            return Ok(records);
        }
        self.invoke("sort-games", json!([records])).await
    }

    async fn select_destination_folder(&self) -> Result<Option<String>> {
        let picked: Option<String> = self.invoke("select-path", json!(["folder"])).await?;
        Ok(picked.filter(|p| !p.is_empty()))
    }

    fn persist_setting(&self, key: &str, value: Value) {
        self.send("save-settings", json!([key, value]));
    }

    async fn start_export_operation(
        &self,
        selected_ids: &[RecordId],
        count: u32,
        destination: &str,
    ) -> Result<ExportReport> {
        let report: Option<ExportReport> = self
            .invoke(
                "export-selected-backups",
                json!([selected_ids, count, destination]),
            )
            .await?;
        Ok(report.unwrap_or_default())
    }

    async fn check_operation_may_start(&self, operation: &str) -> Result<bool> {
        self.invoke("operation-start-check", json!([operation])).await
    }

    fn report_progress(&self, operation_id: &str, title: &str, phase: ProgressPhase) {
        self.send("update-progress", json!([operation_id, title, phase]));
    }

    fn set_global_status(&self, flag: &str, value: bool) {
        self.send("update-status", json!([flag, value]));
    }

    async fn translate(&self, key: &str, params: &[(&str, String)]) -> String {
        let params: Map<String, Value> = params
            .iter()
            .map(|(k, v)| ((*k).to_owned(), Value::String(v.clone())))
            .collect();
        match self.invoke::<String>("translate", json!([key, params])).await {
            Ok(text) if !text.is_empty() => text,
            Ok(_) => key.to_owned(),
            Err(e) => {
                warn!(key, error = %e, "translation failed, using key");
                key.to_owned()
            }
        }
    }
}
