use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;
use sigil_contracts::SIGIL_DIAG_SCHEMA_VERSION;

use crate::error::{ErrorKind, RuntimeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Probe,
    Resolve,
    Accumulate,
    Decode,
    Eval,
    Combine,
    Internal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum DiagnosticCode {
    SGL0001UnboundName,
    SGL0100CapabilityOutOfRange,
    SGL0101CapabilityUnsupported,
    SGL0102OffsetMismatch,
    SGL0200TypeMismatch,
    SGL0201ArityMismatch,
    SGL0300AccumulatorMisuse,
    SGL0400MalformedPayload,
    SGL0410EvalError,
    SGL0420BudgetExceeded,
    SGL0901InternalBug,
}

impl DiagnosticCode {
    pub fn code_str(self) -> &'static str {
        match self {
            DiagnosticCode::SGL0001UnboundName => "SGL0001",
            DiagnosticCode::SGL0100CapabilityOutOfRange => "SGL0100",
            DiagnosticCode::SGL0101CapabilityUnsupported => "SGL0101",
            DiagnosticCode::SGL0102OffsetMismatch => "SGL0102",
            DiagnosticCode::SGL0200TypeMismatch => "SGL0200",
            DiagnosticCode::SGL0201ArityMismatch => "SGL0201",
            DiagnosticCode::SGL0300AccumulatorMisuse => "SGL0300",
            DiagnosticCode::SGL0400MalformedPayload => "SGL0400",
            DiagnosticCode::SGL0410EvalError => "SGL0410",
            DiagnosticCode::SGL0420BudgetExceeded => "SGL0420",
            DiagnosticCode::SGL0901InternalBug => "SGL0901",
        }
    }

    pub fn default_message(self) -> &'static str {
        match self {
            DiagnosticCode::SGL0001UnboundName => "name is not bound in the environment",
            DiagnosticCode::SGL0100CapabilityOutOfRange => "capability offset past end of table",
            DiagnosticCode::SGL0101CapabilityUnsupported => "capability has no native binding",
            DiagnosticCode::SGL0102OffsetMismatch => {
                "offset resolves to an unexpected capability"
            }
            DiagnosticCode::SGL0200TypeMismatch => "value has the wrong type",
            DiagnosticCode::SGL0201ArityMismatch => "wrong number of arguments",
            DiagnosticCode::SGL0300AccumulatorMisuse => "accumulator stages used out of order",
            DiagnosticCode::SGL0400MalformedPayload => "malformed bootstrap payload",
            DiagnosticCode::SGL0410EvalError => "failed to evaluate text",
            DiagnosticCode::SGL0420BudgetExceeded => "evaluation budget exceeded",
            DiagnosticCode::SGL0901InternalBug => "internal sigil bug",
        }
    }

    pub fn default_help(self) -> Option<&'static str> {
        match self {
            DiagnosticCode::SGL0100CapabilityOutOfRange | DiagnosticCode::SGL0102OffsetMismatch => {
                Some("Run `sigil audit` against the selected --profile and fix the offset table.")
            }
            DiagnosticCode::SGL0300AccumulatorMisuse => Some(
                "Supply the prefix and suffix before adding elements; call with no element to finish.",
            ),
            DiagnosticCode::SGL0400MalformedPayload => {
                Some("Payloads are an even number of hex digits encoding UTF-8 text.")
            }
            DiagnosticCode::SGL0420BudgetExceeded => Some(
                "Raise SIGIL_MAX_PAYLOAD_BYTES, SIGIL_MAX_EXPR_NODES or SIGIL_MAX_EXPR_DEPTH.",
            ),
            DiagnosticCode::SGL0901InternalBug => {
                Some("This is a bug in sigil. Please report it with the input that triggered it.")
            }
            _ => None,
        }
    }

    fn stage(self) -> Stage {
        match self {
            DiagnosticCode::SGL0001UnboundName => Stage::Resolve,
            DiagnosticCode::SGL0100CapabilityOutOfRange
            | DiagnosticCode::SGL0101CapabilityUnsupported
            | DiagnosticCode::SGL0102OffsetMismatch => Stage::Probe,
            DiagnosticCode::SGL0200TypeMismatch | DiagnosticCode::SGL0201ArityMismatch => {
                Stage::Combine
            }
            DiagnosticCode::SGL0300AccumulatorMisuse => Stage::Accumulate,
            DiagnosticCode::SGL0400MalformedPayload => Stage::Decode,
            DiagnosticCode::SGL0410EvalError | DiagnosticCode::SGL0420BudgetExceeded => {
                Stage::Eval
            }
            DiagnosticCode::SGL0901InternalBug => Stage::Internal,
        }
    }

    pub fn for_error(err: &RuntimeError) -> Self {
        match err.kind {
            ErrorKind::Unbound => DiagnosticCode::SGL0001UnboundName,
            ErrorKind::Capability => {
                if err.message.contains("out of range") {
                    DiagnosticCode::SGL0100CapabilityOutOfRange
                } else {
                    DiagnosticCode::SGL0101CapabilityUnsupported
                }
            }
            ErrorKind::Type => DiagnosticCode::SGL0200TypeMismatch,
            ErrorKind::Arity => DiagnosticCode::SGL0201ArityMismatch,
            ErrorKind::Accumulator => DiagnosticCode::SGL0300AccumulatorMisuse,
            ErrorKind::Payload => DiagnosticCode::SGL0400MalformedPayload,
            ErrorKind::Eval => DiagnosticCode::SGL0410EvalError,
            ErrorKind::Budget => DiagnosticCode::SGL0420BudgetExceeded,
            ErrorKind::Internal => DiagnosticCode::SGL0901InternalBug,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub code: String,
    pub severity: Severity,
    pub stage: Stage,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub data: BTreeMap<String, Value>,
}

impl Diagnostic {
    pub fn error(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            code: code.code_str().to_string(),
            severity: Severity::Error,
            stage: code.stage(),
            message: message.into(),
            help: code.default_help().map(|s| s.to_string()),
            data: BTreeMap::new(),
        }
    }

    pub fn warning(code: DiagnosticCode, message: impl Into<String>) -> Self {
        Diagnostic {
            severity: Severity::Warning,
            ..Diagnostic::error(code, message)
        }
    }

    pub fn with_data(mut self, key: &str, value: Value) -> Self {
        self.data.insert(key.to_string(), value);
        self
    }
}

impl From<&RuntimeError> for Diagnostic {
    fn from(err: &RuntimeError) -> Self {
        Diagnostic::error(DiagnosticCode::for_error(err), err.message.clone())
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {:?} {:?}: {}",
            self.code, self.stage, self.severity, self.message
        )?;
        if let Some(help) = &self.help {
            write!(f, "\n  help: {help}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Report {
    pub schema_version: String,
    pub ok: bool,
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub meta: BTreeMap<String, Value>,
}

impl Report {
    pub fn ok() -> Self {
        Self {
            schema_version: SIGIL_DIAG_SCHEMA_VERSION.to_string(),
            ok: true,
            diagnostics: Vec::new(),
            meta: BTreeMap::new(),
        }
    }

    pub fn with_diagnostics(mut self, mut diagnostics: Vec<Diagnostic>) -> Self {
        diagnostics.sort_by(|a, b| {
            a.code
                .cmp(&b.code)
                .then_with(|| a.message.cmp(&b.message))
        });
        self.ok = diagnostics.iter().all(|d| d.severity != Severity::Error);
        self.diagnostics = diagnostics;
        self
    }

    pub fn with_meta(mut self, key: &str, value: Value) -> Self {
        self.meta.insert(key.to_string(), value);
        self
    }
}

pub fn render_diagnostics_md() -> String {
    let mut out = String::new();
    out.push_str("# sigil diagnostics catalog\n\n");
    out.push_str("This document is generated from `crates/sigil-core/src/diagnostics.rs`.\n\n");
    out.push_str("| Code | Stage | Message | Help |\n");
    out.push_str("| ---- | ----- | ------- | ---- |\n");
    for code in all_codes() {
        out.push_str(&format!(
            "| {} | {:?} | {} | {} |\n",
            code.code_str(),
            code.stage(),
            code.default_message(),
            code.default_help().unwrap_or("")
        ));
    }
    out
}

fn all_codes() -> &'static [DiagnosticCode] {
    &[
        DiagnosticCode::SGL0001UnboundName,
        DiagnosticCode::SGL0100CapabilityOutOfRange,
        DiagnosticCode::SGL0101CapabilityUnsupported,
        DiagnosticCode::SGL0102OffsetMismatch,
        DiagnosticCode::SGL0200TypeMismatch,
        DiagnosticCode::SGL0201ArityMismatch,
        DiagnosticCode::SGL0300AccumulatorMisuse,
        DiagnosticCode::SGL0400MalformedPayload,
        DiagnosticCode::SGL0410EvalError,
        DiagnosticCode::SGL0420BudgetExceeded,
        DiagnosticCode::SGL0901InternalBug,
    ]
}
