//! Type definitions shared across the crate
//!
//! Sessions, ordered query parameters, the platform envelope and listing pages.

pub mod request;
pub mod response;
pub mod session;

pub use request::{HttpMethod, QueryParams};
pub use response::{ApiResponse, Envelope, Page, Reply};
pub use session::{CookieMap, DEVICE_ID_COOKIE, Session};
