//! Error codes, diagnostics, and exit-code mapping.
//!
//! Every error a0 programs can produce — at lex time, parse time, validation
//! time, policy time, or runtime — is one of a fixed, named set of codes.
//! [`Diagnostic`] is the common carrier type; [`ErrorCode::exit_code`] is the
//! host-facing contract that turns a failing run into a process exit status.

use a0_core::SourceSpan;
use std::fmt;

/// The full A0 error taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorCode {
    // Lexical / parse
    ELex,
    EParse,
    // AST / validation
    EAst,
    EImportUnsupported,
    ENoReturn,
    EReturnNotLast,
    EUnknownCap,
    EUndeclaredCap,
    EUnknownBudget,
    EDupBinding,
    EUnbound,
    ECallEffect,
    EFnDup,
    EUnknownFn,
    EUnknownTool,
    // Policy
    ECapDenied,
    // Runtime
    ETool,
    EToolArgs,
    EFn,
    EBudget,
    EPath,
    EType,
    EForNotList,
    EMatchNotRecord,
    EMatchNoArm,
    EIo,
    ETrace,
    // Evidence
    EAssert,
}

impl ErrorCode {
    /// The stable string form, as it appears in `Diagnostic::code` and in
    /// run-result error records.
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::ELex => "E_LEX",
            ErrorCode::EParse => "E_PARSE",
            ErrorCode::EAst => "E_AST",
            ErrorCode::EImportUnsupported => "E_IMPORT_UNSUPPORTED",
            ErrorCode::ENoReturn => "E_NO_RETURN",
            ErrorCode::EReturnNotLast => "E_RETURN_NOT_LAST",
            ErrorCode::EUnknownCap => "E_UNKNOWN_CAP",
            ErrorCode::EUndeclaredCap => "E_UNDECLARED_CAP",
            ErrorCode::EUnknownBudget => "E_UNKNOWN_BUDGET",
            ErrorCode::EDupBinding => "E_DUP_BINDING",
            ErrorCode::EUnbound => "E_UNBOUND",
            ErrorCode::ECallEffect => "E_CALL_EFFECT",
            ErrorCode::EFnDup => "E_FN_DUP",
            ErrorCode::EUnknownFn => "E_UNKNOWN_FN",
            ErrorCode::EUnknownTool => "E_UNKNOWN_TOOL",
            ErrorCode::ECapDenied => "E_CAP_DENIED",
            ErrorCode::ETool => "E_TOOL",
            ErrorCode::EToolArgs => "E_TOOL_ARGS",
            ErrorCode::EFn => "E_FN",
            ErrorCode::EBudget => "E_BUDGET",
            ErrorCode::EPath => "E_PATH",
            ErrorCode::EType => "E_TYPE",
            ErrorCode::EForNotList => "E_FOR_NOT_LIST",
            ErrorCode::EMatchNotRecord => "E_MATCH_NOT_RECORD",
            ErrorCode::EMatchNoArm => "E_MATCH_NO_ARM",
            ErrorCode::EIo => "E_IO",
            ErrorCode::ETrace => "E_TRACE",
            ErrorCode::EAssert => "E_ASSERT",
        }
    }

    /// A short, human-facing category label, used by the pretty renderer.
    pub fn category(self) -> &'static str {
        match self {
            ErrorCode::ELex => "LEX ERROR",
            ErrorCode::EParse => "PARSE ERROR",
            ErrorCode::EAst
            | ErrorCode::EImportUnsupported
            | ErrorCode::ENoReturn
            | ErrorCode::EReturnNotLast
            | ErrorCode::EDupBinding
            | ErrorCode::EUnbound
            | ErrorCode::EFnDup
            | ErrorCode::EUnknownFn
            | ErrorCode::EUnknownTool
            | ErrorCode::ECallEffect => "VALIDATION ERROR",
            ErrorCode::EUnknownCap | ErrorCode::EUndeclaredCap | ErrorCode::EUnknownBudget => {
                "DECLARATION ERROR"
            }
            ErrorCode::ECapDenied => "CAPABILITY DENIED",
            ErrorCode::ETool | ErrorCode::EToolArgs => "TOOL ERROR",
            ErrorCode::EFn => "FUNCTION ERROR",
            ErrorCode::EBudget => "BUDGET EXCEEDED",
            ErrorCode::EPath => "PATH ERROR",
            ErrorCode::EType => "TYPE ERROR",
            ErrorCode::EForNotList => "ITERATION ERROR",
            ErrorCode::EMatchNotRecord | ErrorCode::EMatchNoArm => "MATCH ERROR",
            ErrorCode::EIo => "I/O ERROR",
            ErrorCode::ETrace => "TRACE ERROR",
            ErrorCode::EAssert => "ASSERTION FAILED",
        }
    }

    /// Exit code contract (spec §6): 2 for lex/parse/validation, 3 for a
    /// denied capability, 4 for any other runtime error, 5 for a failed
    /// assertion or a flagged `check`.
    pub fn exit_code(self) -> i32 {
        match self {
            ErrorCode::ELex
            | ErrorCode::EParse
            | ErrorCode::EAst
            | ErrorCode::EImportUnsupported
            | ErrorCode::ENoReturn
            | ErrorCode::EReturnNotLast
            | ErrorCode::EUnknownCap
            | ErrorCode::EUndeclaredCap
            | ErrorCode::EUnknownBudget
            | ErrorCode::EDupBinding
            | ErrorCode::EUnbound
            | ErrorCode::ECallEffect
            | ErrorCode::EFnDup
            | ErrorCode::EUnknownFn
            | ErrorCode::EUnknownTool => 2,
            ErrorCode::ECapDenied => 3,
            ErrorCode::ETool
            | ErrorCode::EToolArgs
            | ErrorCode::EFn
            | ErrorCode::EBudget
            | ErrorCode::EPath
            | ErrorCode::EType
            | ErrorCode::EForNotList
            | ErrorCode::EMatchNotRecord
            | ErrorCode::EMatchNoArm
            | ErrorCode::EIo
            | ErrorCode::ETrace => 4,
            ErrorCode::EAssert => 5,
        }
    }

    /// Whether this code belongs to the pre-execution pipeline (lex, parse,
    /// validate). Such errors always abort before the first statement runs.
    pub fn is_pipeline_error(self) -> bool {
        self.exit_code() == 2
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

/// A single diagnostic: one error code, a message, and the span it applies
/// to (absent for whole-program errors like a missing required header).
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}

impl Diagnostic {
    pub fn error(code: ErrorCode, message: impl Into<String>, span: Option<SourceSpan>) -> Self {
        Diagnostic {
            severity: Severity::Error,
            code,
            message: message.into(),
            span,
        }
    }

    /// Render as a single-line, Elm-inspired header followed by the message:
    /// `── PARSE ERROR ── main.a0:3:1 ──`.
    pub fn render_pretty(&self) -> String {
        let location = match &self.span {
            Some(span) => format!(" {span} "),
            None => " ".to_string(),
        };
        let header_text = format!("── {}{}", self.code.category(), location);
        let dashes = 72usize.saturating_sub(header_text.chars().count());
        format!(
            "{}{}\n\n{}\n",
            header_text,
            "─".repeat(dashes.max(2)),
            self.message
        )
    }
}

/// A run's final outcome, matching the run-result shape of spec §6.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct RunError {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
}

impl From<&Diagnostic> for RunError {
    fn from(d: &Diagnostic) -> Self {
        RunError {
            code: d.code,
            message: d.message.clone(),
            span: d.span.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn exit_codes_match_contract() {
        assert_eq!(ErrorCode::ELex.exit_code(), 2);
        assert_eq!(ErrorCode::EUnknownFn.exit_code(), 2);
        assert_eq!(ErrorCode::ECapDenied.exit_code(), 3);
        assert_eq!(ErrorCode::EBudget.exit_code(), 4);
        assert_eq!(ErrorCode::EIo.exit_code(), 4);
        assert_eq!(ErrorCode::EAssert.exit_code(), 5);
    }

    #[test]
    fn pipeline_errors_are_exactly_exit_two() {
        assert!(ErrorCode::EAst.is_pipeline_error());
        assert!(!ErrorCode::ECapDenied.is_pipeline_error());
        assert!(!ErrorCode::EBudget.is_pipeline_error());
    }

    #[test]
    fn pretty_render_includes_span_and_message() {
        let span = SourceSpan::point(Arc::from("main.a0"), 3, 1);
        let d = Diagnostic::error(ErrorCode::EParse, "unexpected token '}'", Some(span));
        let rendered = d.render_pretty();
        assert!(rendered.contains("PARSE ERROR"));
        assert!(rendered.contains("main.a0:3:1"));
        assert!(rendered.contains("unexpected token"));
    }
}
