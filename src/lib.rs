//! Signed-request client for the Xiaohongshu web API
//!
//! The platform accepts calls only when they carry the cookies of a live
//! session and a signature header set bound to that session's device
//! identifier (the `a1` cookie). This crate keeps that session alive and signs
//! every call through a pluggable [`Signer`](signer::Signer).
//!
//! # Architecture
//!
//! - [`session`]: cookie store, refresh capability and the
//!   [`SessionManager`] holding the active session
//! - [`signer`]: signature contract and the remote signing service client
//! - [`client`]: request executor, the [`XhsApi`] facade and cursor pagers
//! - [`server`] and [`cli`]: the `xhs-server` HTTP service and the `xhs` CLI
//!
//! # Usage
//!
//! ```bash
//! xhs-server --port 6868
//! xhs user-notes <user_id> --xsec-token <token> --all
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use xhs_signed_client::{Settings, XhsApi};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let api = XhsApi::from_settings(&Settings::default())?;
//! let mut pager = api.user_notes_pager("5ff0e6410000000001008400", "token", None);
//! while let Some(page) = pager.next_page().await? {
//!     println!("{} notes", page.items().len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod server;
pub mod session;
pub mod signer;
pub mod types;
pub mod utils;

pub use client::XhsApi;
pub use config::Settings;
pub use error::{Error, Result};
pub use session::SessionManager;
pub use types::{ApiResponse, Envelope, Page, Session};
