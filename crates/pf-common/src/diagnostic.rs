//! Non-fatal problems accumulated during a pass (§6, §7).
//!
//! Every recoverable failure — unresolved reference, formula syntax error,
//! circular dependency, unviable debt sizing — degrades its node to a zero
//! array and pushes one of these instead of aborting the whole evaluation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticCode {
    UnresolvedReference,
    UnknownModuleType,
    UnknownModuleInput,
    CircularDependency,
    FormulaSyntaxError,
    UnknownFunction,
    ArityMismatch,
    SolverDidNotConverge,
    ConfigError,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub code: DiagnosticCode,
    pub severity: Severity,
    pub ref_name: Option<String>,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context: Option<serde_json::Value>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Error,
            ref_name: None,
            message: message.into(),
            context: None,
        }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Self {
            code,
            severity: Severity::Warning,
            ref_name: None,
            message: message.into(),
            context: None,
        }
    }

    pub fn with_ref(mut self, r: impl Into<String>) -> Self {
        self.ref_name = Some(r.into());
        self
    }

    pub fn with_context(mut self, ctx: serde_json::Value) -> Self {
        self.context = Some(ctx);
        self
    }
}
