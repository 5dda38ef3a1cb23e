use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Context;
use save_export_backend::Backend;
use save_export_core::{
    parse_export_count, ExportJob, ExportResult, ProgressPhase, RecordId, EXPORTING_FLAG,
    EXPORT_OPERATION,
};
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::notice::{Notice, NoticeBoard};
use crate::summary::{ExportSummaryPresenter, SummaryView};
use crate::table::TableController;

/// Progress channel id shared with the backend's progress bar.
pub const EXPORT_PROGRESS_ID: &str = "export";

/// Contents of the export dialog.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ExportDraft {
    pub selected_ids: Vec<RecordId>,
    pub count: u32,
    pub destination: String,
}

#[derive(Debug, Clone, Default, Serialize, PartialEq, Eq)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ExportPhase {
    #[default]
    Idle,
    Configuring { draft: ExportDraft },
    Running { job_id: Uuid, games: usize },
}

#[derive(Debug, Error)]
pub enum ExportFlowError {
    #[error("no games selected")]
    NoSelection,
    #[error("export path is empty")]
    EmptyDestination,
    /// Re-entry while an export is running.
    #[error("an export is already running")]
    Blocked,
    #[error("export dialog is not open")]
    NotConfiguring,
    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The backend refused to start; nothing was exported.
    Blocked,
    Completed(SummaryView),
    Failed(String),
}

/// Lowers the backend's exporting flag when dropped, so every way out of a
/// granted run releases the single-flight guard exactly once.
struct ExportingFlag {
    backend: Arc<dyn Backend>,
}

impl Drop for ExportingFlag {
    fn drop(&mut self) {
        self.backend.set_global_status(EXPORTING_FLAG, false);
    }
}

/// Puts the workflow back to `Idle` when dropped, including when a run
/// unwinds.
struct IdleOnDrop<'a> {
    phase: &'a Mutex<ExportPhase>,
}

impl Drop for IdleOnDrop<'_> {
    fn drop(&mut self) {
        *lock_phase(self.phase) = ExportPhase::Idle;
    }
}

fn lock_phase(phase: &Mutex<ExportPhase>) -> MutexGuard<'_, ExportPhase> {
    phase.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Drives the export dialog and the export run:
/// `Idle -> Configuring -> Running -> Idle`.
pub struct ExportOrchestrator {
    backend: Arc<dyn Backend>,
    table: Arc<TableController>,
    summary: Arc<ExportSummaryPresenter>,
    notices: Arc<NoticeBoard>,
    phase: Mutex<ExportPhase>,
}

impl ExportOrchestrator {
    pub fn new(
        backend: Arc<dyn Backend>,
        table: Arc<TableController>,
        summary: Arc<ExportSummaryPresenter>,
        notices: Arc<NoticeBoard>,
    ) -> Self {
        Self {
            backend,
            table,
            summary,
            notices,
            phase: Mutex::new(ExportPhase::Idle),
        }
    }

    pub async fn phase(&self) -> ExportPhase {
        self.lock_phase().clone()
    }

    /// Opens the export dialog for the current selection, prefilled from
    /// settings.
    pub async fn begin(&self) -> Result<ExportDraft, ExportFlowError> {
        let running = matches!(*self.lock_phase(), ExportPhase::Running { .. });
        if running {
            return Err(ExportFlowError::Blocked);
        }

        let selected_ids = self.table.selected_ids().await;
        if selected_ids.is_empty() {
            self.warn("alert.no_games_selected").await;
            return Err(ExportFlowError::NoSelection);
        }

        let settings = self
            .backend
            .get_settings()
            .await
            .context("load export settings")?;
        let draft = ExportDraft {
            selected_ids,
            count: settings.export_count.filter(|c| *c > 0).unwrap_or(1),
            destination: settings.export_path.unwrap_or_default(),
        };

        let mut phase = self.lock_phase();
        if matches!(*phase, ExportPhase::Running { .. }) {
            return Err(ExportFlowError::Blocked);
        }
        *phase = ExportPhase::Configuring {
            draft: draft.clone(),
        };
        Ok(draft)
    }

    /// Lets the user pick the destination folder. A picked path goes into
    /// the dialog and is remembered in settings, unless the dialog closed
    /// while the picker was open.
    pub async fn select_destination(&self) -> Result<Option<String>, ExportFlowError> {
        self.ensure_configuring()?;

        let picked = self
            .backend
            .select_destination_folder()
            .await
            .context("select export folder")?;

        if let Some(path) = &picked {
            let mut phase = self.lock_phase();
            match &mut *phase {
                ExportPhase::Configuring { draft } => draft.destination = path.clone(),
                ExportPhase::Running { .. } => return Err(ExportFlowError::Blocked),
                ExportPhase::Idle => return Err(ExportFlowError::NotConfiguring),
            }
            self.backend.persist_setting("exportPath", json!(path));
        }
        Ok(picked)
    }

    /// Closes the dialog without exporting.
    pub async fn cancel(&self) -> bool {
        let mut phase = self.lock_phase();
        if matches!(*phase, ExportPhase::Configuring { .. }) {
            *phase = ExportPhase::Idle;
            true
        } else {
            false
        }
    }

    /// Confirms the dialog. An empty destination keeps the dialog open.
    /// The returned job must be handed to [`ExportOrchestrator::run`].
    pub async fn confirm(&self, count_raw: &str, destination: &str) -> Result<ExportJob, ExportFlowError> {
        let draft = self.ensure_configuring()?;

        let count = parse_export_count(count_raw);
        let Some(job) = ExportJob::new(draft.selected_ids, count, destination) else {
            self.warn("alert.empty_export_path").await;
            return Err(ExportFlowError::EmptyDestination);
        };

        let mut phase = self.lock_phase();
        match *phase {
            ExportPhase::Configuring { .. } => {}
            ExportPhase::Running { .. } => return Err(ExportFlowError::Blocked),
            ExportPhase::Idle => return Err(ExportFlowError::NotConfiguring),
        }
        self.backend.persist_setting("exportCount", json!(count));
        *phase = ExportPhase::Running {
            job_id: job.id,
            games: job.selected_ids.len(),
        };
        Ok(job)
    }

    /// Runs a confirmed job to completion and returns to `Idle`.
    pub async fn run(&self, job: ExportJob) -> RunOutcome {
        let _idle = IdleOnDrop { phase: &self.phase };
        self.execute(&job).await
    }

    async fn execute(&self, job: &ExportJob) -> RunOutcome {
        let title = self.backend.translate("main.export_in_progress", &[]).await;

        let may_start = match self.backend.check_operation_may_start(EXPORT_OPERATION).await {
            Ok(granted) => granted,
            Err(e) => {
                error!(job_id = %job.id, error = %e, "export start check failed");
                false
            }
        };
        if !may_start {
            info!(job_id = %job.id, "export not started, another operation holds the guard");
            return RunOutcome::Blocked;
        }

        let _flag = ExportingFlag {
            backend: self.backend.clone(),
        };

        info!(
            job_id = %job.id,
            games = job.selected_ids.len(),
            count = job.count,
            destination = %job.destination,
            "export started"
        );
        self.backend
            .report_progress(EXPORT_PROGRESS_ID, &title, ProgressPhase::Start);
        let reply = self
            .backend
            .start_export_operation(&job.selected_ids, job.count, &job.destination)
            .await;
        self.backend
            .report_progress(EXPORT_PROGRESS_ID, &title, ProgressPhase::End);

        match reply {
            Ok(report) => {
                let result = ExportResult::from_report(job, report);
                info!(
                    job_id = %job.id,
                    succeeded = result.succeeded,
                    failed = result.failed,
                    "export finished"
                );
                let view = self.summary.present(result).await;
                if let Err(e) = self.table.refresh(true).await {
                    warn!(job_id = %job.id, error = %e, "table refresh after export failed");
                }
                RunOutcome::Completed(view)
            }
            Err(e) => {
                error!(job_id = %job.id, error = %e, "export failed");
                let title = self.backend.translate("alert.error_during_export", &[]).await;
                let message = format!("{e:#}");
                self.notices
                    .push(Notice::Modal {
                        title,
                        details: vec![message.clone()],
                    })
                    .await;
                RunOutcome::Failed(message)
            }
        }
    }

    fn lock_phase(&self) -> MutexGuard<'_, ExportPhase> {
        lock_phase(&self.phase)
    }

    fn ensure_configuring(&self) -> Result<ExportDraft, ExportFlowError> {
        match &*self.lock_phase() {
            ExportPhase::Configuring { draft } => Ok(draft.clone()),
            ExportPhase::Running { .. } => Err(ExportFlowError::Blocked),
            ExportPhase::Idle => Err(ExportFlowError::NotConfiguring),
        }
    }

    async fn warn(&self, key: &str) {
        let message = self.backend.translate(key, &[]).await;
        warn!(%message, "export validation failed");
        self.notices.push(Notice::Warning { message }).await;
    }
}
