//! Read-only funnel reporting: table counts, conversion, search and CSV export.

pub mod export;
pub mod overview;
pub mod router;
pub mod service;

pub use export::{export_csv, ExportError};
pub use overview::{conversion_rate, filter_rows, summarize, BreakdownEntry, FunnelOverview};
pub use router::{admin_router, ADMIN_TOKEN_HEADER};
pub use service::{AdminError, AdminService, AdminTables};
