//! Request signing
//!
//! The platform's edge only accepts calls carrying a signature header set
//! computed from the method, the request target, the payload and the
//! session's device identifier. The algorithm itself lives behind the
//! [`Signer`] trait; this crate never guesses at it.
//!
//! A signer is invoked immediately before every transmission, retries
//! included, and its output is never cached.

pub mod remote;

pub use remote::RemoteSigner;

use crate::{Result, types::{HttpMethod, QueryParams}};
use async_trait::async_trait;
use std::collections::BTreeMap;

/// Header name to value mapping produced by a signer
pub type SignatureHeaders = BTreeMap<String, String>;

/// Everything a signature is computed from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SignRequest<'a> {
    pub method: HttpMethod,
    /// Endpoint path, e.g. `/api/sns/web/v1/feed`
    pub path: &'a str,
    /// Request target exactly as transmitted: the path plus, for GET, `?` and
    /// the serialized query
    pub uri: &'a str,
    /// Value of the `a1` cookie
    pub device_id: &'a str,
    /// GET parameters in transmission order
    pub query: Option<&'a QueryParams>,
    /// Compact JSON body of a POST, byte-identical to what is sent
    pub body: Option<&'a str>,
}

impl<'a> SignRequest<'a> {
    pub fn get(path: &'a str, uri: &'a str, device_id: &'a str, query: &'a QueryParams) -> Self {
        Self {
            method: HttpMethod::Get,
            path,
            uri,
            device_id,
            query: Some(query),
            body: None,
        }
    }

    pub fn post(path: &'a str, device_id: &'a str, body: &'a str) -> Self {
        Self {
            method: HttpMethod::Post,
            path,
            uri: path,
            device_id,
            query: None,
            body: Some(body),
        }
    }
}

/// Signature capability
///
/// Identical inputs must yield identical headers within one session epoch.
/// Implementations that depend on the clock are fine as long as the result is
/// consumed right away, which the request executor guarantees.
#[async_trait]
pub trait Signer: Send + Sync + std::fmt::Debug {
    async fn sign(&self, request: &SignRequest<'_>) -> Result<SignatureHeaders>;
}
