//! The mail table: the fetched Venmo emails, the selected row, and the view
//! model the terminal draws from them.

pub mod format;
pub mod state;
pub mod view;

pub use format::format_date_time;
pub use state::{FetchOutcome, MailTable, TableHost};
pub use view::{RowView, TableView};
