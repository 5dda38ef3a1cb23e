//! Carries row selection across a table rebuild.

use save_export_core::SelectionState;

use crate::table::{TableRow, TableView};

/// Selected ids of the rows currently on screen, read just before they are
/// replaced.
pub fn capture(view: &TableView) -> SelectionState {
    view.rows
        .iter()
        .filter(|row| row.selected)
        .map(|row| row.id.clone())
        .collect()
}

/// Ticks a freshly built row if it was selected before the rebuild. Ids that
/// disappeared from the dataset simply never match.
pub fn restore(row: &mut TableRow, selection: &SelectionState) {
    row.selected = selection.contains(&row.id);
}
