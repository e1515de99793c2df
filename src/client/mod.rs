//! Platform client
//!
//! [`RequestExecutor`] signs and sends single calls; [`XhsApi`] exposes the
//! platform operations on top of it and owns the refresh-and-retry policy;
//! [`Pager`] walks cursor listings.

pub mod api;
pub mod executor;
pub mod pager;

pub use api::XhsApi;
pub use executor::{ApiCall, RequestExecutor, build_http_client};
pub use pager::{ListQuery, PageState, Pager};
