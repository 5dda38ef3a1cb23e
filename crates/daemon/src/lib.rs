pub mod config;
pub mod export;
pub mod notice;
pub mod selection;
mod server;
pub mod summary;
pub mod tab;
pub mod table;

pub use export::{ExportDraft, ExportFlowError, ExportOrchestrator, ExportPhase, RunOutcome};
pub use notice::{Notice, NoticeBoard};
pub use server::{build_router, AppState};
pub use summary::{ExportSummaryPresenter, SummaryPanel, SummaryView};
pub use tab::ExportTab;
pub use table::{TableController, TableReconciler, TableRow, TableView};
