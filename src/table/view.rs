/// What the table looks like right now; computed, never stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TableView {
    /// Signed out, or signed in with nothing to show.
    Placeholder { signed_in: bool },
    Populated {
        account: String,
        rows: Vec<RowView>,
        verify_enabled: bool,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowView {
    pub subject: String,
    pub date_label: String,
    pub selected: bool,
}

impl TableView {
    pub fn is_placeholder(&self) -> bool {
        matches!(self, TableView::Placeholder { .. })
    }

    pub fn selected_rows(&self) -> usize {
        match self {
            TableView::Placeholder { .. } => 0,
            TableView::Populated { rows, .. } => rows.iter().filter(|r| r.selected).count(),
        }
    }
}
