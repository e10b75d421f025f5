//! Request/response transport to the live server
//!
//! Every call sends one envelope whose body is a single namespaced method
//! element and receives either a `<method>Response` payload or a fault.

mod envelope;
mod http;
mod memory;

pub use envelope::{CONTENT_NAMESPACE, ENVELOPE_NAMESPACE, fault_envelope, parse_response, request_envelope, response_envelope};
pub use http::{HttpTransport, HttpTransportConfig};
pub use memory::MemoryTransport;

use crate::Result;
use csync_binding::Element;
use regex::Regex;
use std::fmt;
use std::sync::LazyLock;

static ALREADY_EXISTS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\balready\s+exists\b").unwrap());

static SERVICE_UNAVAILABLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\bservice\s+(is\s+)?(unavailable|not\s+running)\b").unwrap());

/// Classification of a remote fault message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// Idempotent re-creation; treated as success with no effect
    AlreadyExists,
    /// The downstream component for a type is not running
    ServiceUnavailable,
    Other,
}

impl FaultKind {
    pub fn classify(message: &str) -> Self {
        if ALREADY_EXISTS.is_match(message) {
            Self::AlreadyExists
        } else if SERVICE_UNAVAILABLE.is_match(message) {
            Self::ServiceUnavailable
        } else {
            Self::Other
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::AlreadyExists => "already exists",
            Self::ServiceUnavailable => "service unavailable",
            Self::Other => "error",
        };
        write!(f, "{s}")
    }
}

/// A blocking request/response channel.
///
/// Calls never retry; a failure is returned to the caller immediately.
pub trait Transport: Send {
    /// Send `request` (the method element) and return the response payload
    /// element.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Fault`] for a fault envelope and
    /// [`crate::Error::Transport`] when the call itself fails.
    fn call(&self, request: &Element) -> Result<Element>;
}

impl<T: Transport + Sync> Transport for std::sync::Arc<T> {
    fn call(&self, request: &Element) -> Result<Element> {
        (**self).call(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("Folder '/a' already exists", FaultKind::AlreadyExists)]
    #[case("Object ALREADY EXISTS in repository", FaultKind::AlreadyExists)]
    #[case("The service is unavailable", FaultKind::ServiceUnavailable)]
    #[case("Notification service not running", FaultKind::ServiceUnavailable)]
    #[case("Invalid parent id", FaultKind::Other)]
    fn classifies_fault_messages(#[case] message: &str, #[case] expected: FaultKind) {
        assert_eq!(FaultKind::classify(message), expected);
    }
}
