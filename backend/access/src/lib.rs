//! Access control for the download bot.
//!
//! `AccessController` is the only writer of the user/request stores and owns
//! every status transition. `SelectionRegistry` holds the transient per-admin
//! multi-select state behind the paginated inline menus, and the bulk module
//! applies one action to every selected target with per-target failure
//! isolation.

pub mod bulk;
pub mod controller;
pub mod selection;

pub use bulk::{broadcast, BroadcastReport, BulkAction, BulkActionExecutor, BulkReport, MessageSink};
pub use controller::AccessController;
pub use selection::{
    render_page, PageRow, PageView, SelectionPurpose, SelectionRegistry, PAGE_SIZE,
};
