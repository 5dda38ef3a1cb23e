pub mod export;
pub mod format;
pub mod record;
pub mod selection;
pub mod settings;

pub use export::{
    parse_export_count, ExportFailure, ExportJob, ExportReport, ExportResult, ProgressPhase,
    EXPORTING_FLAG, EXPORT_OPERATION,
};
pub use format::format_size;
pub use record::{BackupItem, BackupRecord, RecordId, SortableRecord};
pub use selection::SelectionState;
pub use settings::{Settings, LOCALIZED_LANGUAGE};
