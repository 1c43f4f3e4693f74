//! Typed error kinds for the pipeline
//! Every cross-boundary failure is classified into one of the kinds below so
//! retry policy, circuit breakers, and the degradation registry can react to
//! it without re-parsing an opaque error string.

use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};

/// Classification used by the resilience layer to decide whether a failure
/// is retryable, terminal, or a local rejection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed input or out-of-range value. Rejected locally, never retried.
    Validation,
    /// Network, timeout, or a temporarily unavailable collaborator.
    TransientIo,
    /// Authentication or permission failure. Terminal for the collaborator.
    AuthPermission,
    /// Queue full or pool exhausted.
    ResourceExhaustion,
    /// An internal invariant is broken. Fatal for the affected task.
    LogicInvariant,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorKind::TransientIo)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::TransientIo => "transient_io",
            ErrorKind::AuthPermission => "auth_permission",
            ErrorKind::ResourceExhaustion => "resource_exhaustion",
            ErrorKind::LogicInvariant => "logic_invariant",
        }
    }
}

/// A structured application error carrying enough context for an operator
/// to act on: timestamp, component, kind, and free-form context.
#[derive(Debug, Clone)]
pub struct AppError {
    pub timestamp: DateTime<Utc>,
    pub component: String,
    pub kind: ErrorKind,
    pub message: String,
    pub context: HashMap<String, String>,
}

impl AppError {
    pub fn new(component: impl Into<String>, kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            component: component.into(),
            kind,
            message: message.into(),
            context: HashMap::new(),
        }
    }

    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    pub fn validation(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, ErrorKind::Validation, message)
    }

    pub fn transient_io(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, ErrorKind::TransientIo, message)
    }

    pub fn auth_permission(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, ErrorKind::AuthPermission, message)
    }

    pub fn resource_exhaustion(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, ErrorKind::ResourceExhaustion, message)
    }

    pub fn logic_invariant(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(component, ErrorKind::LogicInvariant, message)
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({}): {}",
            self.timestamp.to_rfc3339(),
            self.component,
            self.kind.as_str(),
            self.message
        )?;
        if !self.context.is_empty() {
            write!(f, " context=")?;
            let mut pairs: Vec<_> = self.context.iter().collect();
            pairs.sort_by(|a, b| a.0.cmp(b.0));
            for (k, v) in pairs {
                write!(f, " {}={}", k, v)?;
            }
        }
        Ok(())
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_only_for_transient_io() {
        assert!(ErrorKind::TransientIo.is_retryable());
        assert!(!ErrorKind::Validation.is_retryable());
        assert!(!ErrorKind::AuthPermission.is_retryable());
        assert!(!ErrorKind::ResourceExhaustion.is_retryable());
        assert!(!ErrorKind::LogicInvariant.is_retryable());
    }

    #[test]
    fn display_includes_context() {
        let err = AppError::transient_io("broker", "timeout").with_context("order_id", "abc123");
        let rendered = err.to_string();
        assert!(rendered.contains("broker"));
        assert!(rendered.contains("order_id=abc123"));
    }
}
