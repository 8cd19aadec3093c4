//! Non-fatal build findings

use std::fmt;

use serde::Serialize;

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum Severity {
    /// Recorded, build continues
    Warning,
    /// Recorded alongside a failing build
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Severity::Warning => write!(f, "warning"),
            Severity::Error => write!(f, "error"),
        }
    }
}

/// A finding about a schema component
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    /// Severity
    pub severity: Severity,
    /// Component the finding is about, e.g. `element {urn:x}a`
    pub component: String,
    /// Message
    pub message: String,
}

impl Diagnostic {
    /// Create a warning
    pub fn warning(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            component: component.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}: {}", self.severity, self.component, self.message)
    }
}
