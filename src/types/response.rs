//! Response type definitions
//!
//! The platform's `{success|code, data, msg}` envelope, one page of a cursor
//! listing, and the body returned by the HTTP service.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope codes the platform uses for an expired or missing login
const SESSION_REJECTED_CODES: [i64; 2] = [-100, -101];

/// The platform's response wrapper, kept verbatim for pass-through
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    raw: Value,
}

impl Envelope {
    /// Parse a response body
    ///
    /// Fails with `MalformedResponse` unless the body is a JSON object that
    /// carries `success` or `code`.
    pub fn parse(body: &str) -> Result<Self> {
        let raw: Value = serde_json::from_str(body)
            .map_err(|e| Error::malformed(format!("body is not JSON: {}", e)))?;
        Self::from_value(raw)
    }

    pub fn from_value(raw: Value) -> Result<Self> {
        let Some(object) = raw.as_object() else {
            return Err(Error::malformed("envelope is not a JSON object"));
        };
        if !object.contains_key("success") && !object.contains_key("code") {
            return Err(Error::malformed("envelope has neither `success` nor `code`"));
        }
        Ok(Self { raw })
    }

    /// `success`, or `code == 0` when the platform omits it
    pub fn success(&self) -> bool {
        match self.raw.get("success").and_then(Value::as_bool) {
            Some(success) => success,
            None => self.code() == Some(0),
        }
    }

    pub fn code(&self) -> Option<i64> {
        self.raw.get("code").and_then(Value::as_i64)
    }

    pub fn msg(&self) -> Option<&str> {
        self.raw
            .get("msg")
            .or_else(|| self.raw.get("message"))
            .and_then(Value::as_str)
    }

    pub fn data(&self) -> Option<&Value> {
        self.raw.get("data").filter(|data| !data.is_null())
    }

    /// Whether the platform says the session is no longer logged in
    pub fn is_session_rejected(&self) -> bool {
        !self.success()
            && self
                .code()
                .is_some_and(|code| SESSION_REJECTED_CODES.contains(&code))
    }

    /// Platform message for error reporting, falling back to the raw body
    pub fn failure_message(&self) -> String {
        match self.msg() {
            Some(msg) if !msg.is_empty() => msg.to_string(),
            _ => self.raw.to_string(),
        }
    }

    /// Fail with `Rejected` unless the call succeeded
    pub fn require_success(&self) -> Result<()> {
        if self.success() {
            Ok(())
        } else {
            Err(Error::rejected(
                self.code().unwrap_or_default(),
                self.failure_message(),
            ))
        }
    }

    /// The `data` payload of a successful call
    pub fn into_data(self) -> Result<Value> {
        self.require_success()?;
        match self.raw {
            Value::Object(mut object) => match object.remove("data") {
                Some(data) if !data.is_null() => Ok(data),
                _ => Err(Error::malformed("successful envelope has no `data`")),
            },
            _ => Err(Error::malformed("envelope is not a JSON object")),
        }
    }

    pub fn as_value(&self) -> &Value {
        &self.raw
    }

    pub fn into_value(self) -> Value {
        self.raw
    }
}

/// A decoded response plus the cookies the platform set on it
#[derive(Debug, Clone)]
pub struct Reply {
    pub envelope: Envelope,
    /// `Set-Cookie` name/value pairs, in response order
    pub set_cookies: Vec<(String, String)>,
}

/// One page of a cursor listing
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// Continuation token for the next page, empty at the end
    pub cursor: String,
    pub has_more: bool,
    /// The full `data` payload
    pub data: Value,
}

impl Page {
    /// Read `cursor` and `has_more` from a listing payload
    ///
    /// `has_more` is mandatory; a missing cursor reads as the empty string.
    pub fn from_data(data: Value) -> Result<Self> {
        let has_more = data
            .get("has_more")
            .and_then(Value::as_bool)
            .ok_or_else(|| Error::malformed("listing payload has no boolean `has_more`"))?;
        let cursor = match data.get("cursor") {
            None | Some(Value::Null) => String::new(),
            Some(Value::String(cursor)) => cursor.clone(),
            Some(Value::Number(cursor)) => cursor.to_string(),
            Some(other) => {
                return Err(Error::malformed(format!(
                    "listing cursor has unexpected type: {}",
                    other
                )));
            }
        };
        Ok(Self {
            cursor,
            has_more,
            data,
        })
    }

    /// Whether another page can be requested after this one
    pub fn is_continuable(&self) -> bool {
        self.has_more && !self.cursor.is_empty()
    }

    /// The listed records: `notes` or `comments`, whichever is present
    pub fn items(&self) -> &[Value] {
        ["notes", "comments"]
            .iter()
            .find_map(|key| self.data.get(*key).and_then(Value::as_array))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }
}

/// Body returned by the HTTP service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse {
    pub code: u32,
    pub data: Option<Value>,
    pub message: String,
}

impl ApiResponse {
    pub const SUCCESS_CODE: u32 = 2000;
    pub const FAIL_CODE: u32 = 4000;

    pub fn success(data: Value) -> Self {
        Self {
            code: Self::SUCCESS_CODE,
            data: Some(data),
            message: "SUCCESS！".to_string(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            code: Self::FAIL_CODE,
            data: None,
            message: message.into(),
        }
    }
}
