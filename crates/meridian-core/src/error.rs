//! Error types for recovered faults.
//!
//! Meridian separates two kinds of failure that reach the request path:
//!
//! - A [`ContractViolation`] is raised with [`std::panic::panic_any`] when a
//!   caller breaks an API contract (binding an unregistered type, asking for the
//!   content type of an unknown format). It is a programming error and is meant to
//!   be caught by the panic guard, not handled locally.
//! - An [`ErrorDescription`] is the structured form of any fault the panic guard
//!   recovers. It is what gets logged and rendered back to the client.

use std::any::Any;

use serde::Serialize;
use thiserror::Error;

/// Panic payload signalling that a caller broke an API contract.
///
/// # Example
///
/// ```
/// use meridian_core::{ContractViolation, ErrorDescription};
///
/// let payload = std::panic::catch_unwind(|| {
///     ContractViolation::new("no binder registered for type Foo").raise()
/// })
/// .unwrap_err();
///
/// let error = ErrorDescription::from_panic(payload.as_ref()).unwrap();
/// assert_eq!(error.kind(), "ContractViolation");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("contract violation: {message}")]
pub struct ContractViolation {
    message: String,
}

impl ContractViolation {
    /// Creates a new violation with the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Returns the violation message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Unwinds the current task with this violation as the panic payload.
    pub fn raise(self) -> ! {
        std::panic::panic_any(self)
    }
}

/// Raises a [`ContractViolation`] with the given message.
pub fn contract_violation(message: impl Into<String>) -> ! {
    ContractViolation::new(message).raise()
}

/// Structured description of a fault recovered while handling a request.
///
/// Carries the fault kind, a human-readable message, a best-effort stack trace
/// and, when known, the request path the fault occurred on.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize)]
#[error("{kind}: {message}")]
pub struct ErrorDescription {
    kind: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    stack: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    path: Option<String>,
}

impl ErrorDescription {
    /// Creates a description from a kind and message.
    pub fn new(kind: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            message: message.into(),
            stack: None,
            path: None,
        }
    }

    /// Generic description used when a fault cannot be classified.
    #[must_use]
    pub fn internal() -> Self {
        Self::new("Internal Server Error", "An unexpected error occurred")
    }

    /// Description for a request that matched no action.
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new("Not Found", message)
    }

    /// Attaches a stack trace.
    pub fn with_stack(mut self, stack: impl Into<String>) -> Self {
        self.stack = Some(stack.into());
        self
    }

    /// Attaches the request path.
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Classifies a panic payload.
    ///
    /// Recognizes [`ContractViolation`], `&'static str`, `String`, an
    /// `ErrorDescription` raised directly, and boxed errors. Returns `None` for
    /// any other payload type.
    #[must_use]
    pub fn from_panic(payload: &(dyn Any + Send)) -> Option<Self> {
        if let Some(violation) = payload.downcast_ref::<ContractViolation>() {
            return Some(Self::new("ContractViolation", violation.message()));
        }
        if let Some(message) = payload.downcast_ref::<&'static str>() {
            return Some(Self::new("Panic", *message));
        }
        if let Some(message) = payload.downcast_ref::<String>() {
            return Some(Self::new("Panic", message.as_str()));
        }
        if let Some(error) = payload.downcast_ref::<Self>() {
            return Some(error.clone());
        }
        payload
            .downcast_ref::<Box<dyn std::error::Error + Send + Sync>>()
            .map(|error| Self::new("Error", error.to_string()))
    }

    /// Returns the fault kind.
    #[must_use]
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Returns the fault message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the captured stack trace, if any.
    #[must_use]
    pub fn stack(&self) -> Option<&str> {
        self.stack.as_deref()
    }

    /// Returns the request path, if recorded.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    /// Returns a copy without the stack trace.
    #[must_use]
    pub fn without_stack(&self) -> Self {
        Self {
            stack: None,
            ..self.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::panic::catch_unwind;

    fn payload_of(f: impl FnOnce() + std::panic::UnwindSafe) -> Box<dyn Any + Send> {
        catch_unwind(f).expect_err("closure should panic")
    }

    #[test]
    fn test_classifies_str_panic() {
        let payload = payload_of(|| panic!("boom"));
        let error = ErrorDescription::from_panic(payload.as_ref()).unwrap();
        assert_eq!(error.kind(), "Panic");
        assert_eq!(error.message(), "boom");
    }

    #[test]
    fn test_classifies_formatted_panic() {
        let id = 7;
        let payload = payload_of(move || panic!("user {id} missing"));
        let error = ErrorDescription::from_panic(payload.as_ref()).unwrap();
        assert_eq!(error.message(), "user 7 missing");
    }

    #[test]
    fn test_classifies_contract_violation() {
        let payload = payload_of(|| contract_violation("bad bind target"));
        let error = ErrorDescription::from_panic(payload.as_ref()).unwrap();
        assert_eq!(error.kind(), "ContractViolation");
        assert_eq!(error.message(), "bad bind target");
    }

    #[test]
    fn test_unknown_payload_is_unclassified() {
        let payload = payload_of(|| std::panic::panic_any(42_u8));
        assert!(ErrorDescription::from_panic(payload.as_ref()).is_none());
    }

    #[test]
    fn test_serialization_skips_missing_fields() {
        let error = ErrorDescription::new("Panic", "boom");
        let json = serde_json::to_value(&error).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "Panic", "message": "boom"}));
    }

    #[test]
    fn test_display() {
        let error = ErrorDescription::new("Panic", "boom").with_path("/users");
        assert_eq!(error.to_string(), "Panic: boom");
        assert_eq!(error.path(), Some("/users"));
        assert!(error.with_stack("trace").without_stack().stack().is_none());
    }
}
