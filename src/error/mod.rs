//! Error types and diagnostics for XML scanning.
//!
//! This module provides structured error reporting with source location
//! tracking. Errors carry the line, column and character offset within the
//! innermost active entity, plus the public/system identifiers of that
//! entity, so a failure inside an external entity can be traced back to it.
//!
//! The scanner supports a **continue-after-fatal-error** mode: fatal
//! well-formedness errors are then collected as [`ParseDiagnostic`]s with
//! [`ErrorSeverity::Fatal`] while scanning resynchronises on a best-effort
//! basis. Resource-limit, encoding and premature end-of-input errors always
//! stop the scan.

use std::fmt;

use crate::security::{Limit, LimitState};

/// Severity level for a scan diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorSeverity {
    /// A non-fatal issue that doesn't prevent scanning.
    Warning,
    /// A recoverable error, such as a validity-constraint violation.
    Error,
    /// A well-formedness violation. Scanning stops unless recovery is enabled.
    Fatal,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Warning => write!(f, "warning"),
            Self::Error => write!(f, "error"),
            Self::Fatal => write!(f, "fatal error"),
        }
    }
}

/// Broad classification of a scan error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed byte sequence or unsupported encoding.
    Encoding,
    /// Violation of an XML well-formedness constraint.
    WellFormedness,
    /// Violation of a Namespaces in XML constraint.
    Namespace,
    /// Validity-constraint violation (reported with `Error` severity).
    Validity,
    /// A configured resource limit was exceeded.
    LimitExceeded,
    /// Input ended in the middle of a construct.
    PrematureEof,
    /// `next()` was called after the document was fully scanned.
    NoMoreElements,
    /// The underlying reader failed.
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Encoding => "encoding error",
            Self::WellFormedness => "well-formedness error",
            Self::Namespace => "namespace error",
            Self::Validity => "validity error",
            Self::LimitExceeded => "limit exceeded",
            Self::PrematureEof => "premature end of input",
            Self::NoMoreElements => "no more elements",
            Self::Io => "i/o error",
        };
        f.write_str(s)
    }
}

/// Source location within an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SourceLocation {
    /// 1-based line number.
    pub line: u32,
    /// 1-based column number (in characters, not bytes).
    pub column: u32,
    /// 0-based character offset from the start of the entity.
    pub char_offset: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Structured description of a resource-limit violation.
///
/// Carries the measured value together with the configured limit and how
/// that limit was set, so callers can tell a default limit apart from one
/// they configured themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimitViolation {
    /// The limit that was exceeded.
    pub limit: Limit,
    /// Name of the entity being scanned when the limit tripped, if any.
    pub entity_name: Option<String>,
    /// The accumulated value that exceeded the limit.
    pub value: usize,
    /// The configured maximum.
    pub max: usize,
    /// How the maximum was configured.
    pub state: LimitState,
}

impl fmt::Display for LimitViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.entity_name {
            Some(name) => write!(
                f,
                "{} of {} in \"{}\" exceeds the limit of {} set by {}",
                self.limit,
                self.value,
                name,
                self.max,
                self.state.as_str()
            ),
            None => write!(
                f,
                "{} of {} exceeds the limit of {} set by {}",
                self.limit,
                self.value,
                self.max,
                self.state.as_str()
            ),
        }
    }
}

/// A single diagnostic emitted during scanning.
///
/// Warnings and validity errors are always delivered as diagnostics. Fatal
/// errors become diagnostics only when continue-after-fatal-error is on.
#[derive(Debug, Clone)]
pub struct ParseDiagnostic {
    /// The severity of this diagnostic.
    pub severity: ErrorSeverity,
    /// The error classification.
    pub kind: ErrorKind,
    /// Stable machine-readable key, e.g. `"ETagRequired"`.
    pub code: &'static str,
    /// Human-readable error message.
    pub message: String,
    /// Where in the source this diagnostic occurred.
    pub location: SourceLocation,
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} at {}",
            self.severity, self.message, self.location
        )
    }
}

/// The error type returned when scanning fails.
#[derive(Debug, Clone)]
pub struct ParseError {
    /// The error classification.
    pub kind: ErrorKind,
    /// Stable machine-readable key, e.g. `"MaxEntitySizeLimit"`.
    pub code: &'static str,
    /// The primary error message.
    pub message: String,
    /// Where in the innermost active entity the error occurred.
    pub location: SourceLocation,
    /// System identifier of the innermost active entity, if known.
    pub system_id: Option<String>,
    /// Public identifier of the innermost active entity, if known.
    pub public_id: Option<String>,
    /// Details of the exceeded limit for [`ErrorKind::LimitExceeded`].
    pub limit: Option<LimitViolation>,
    /// All diagnostics collected before the fatal error (in recovery mode,
    /// this includes recovered fatal errors).
    pub diagnostics: Vec<ParseDiagnostic>,
}

impl ParseError {
    /// Creates an error with no entity identifiers or diagnostics attached.
    pub fn new(
        kind: ErrorKind,
        code: &'static str,
        message: impl Into<String>,
        location: SourceLocation,
    ) -> Self {
        Self {
            kind,
            code,
            message: message.into(),
            location,
            system_id: None,
            public_id: None,
            limit: None,
            diagnostics: Vec::new(),
        }
    }

    /// Returns `true` if this error signals a resource-limit violation.
    #[must_use]
    pub fn is_limit_exceeded(&self) -> bool {
        self.kind == ErrorKind::LimitExceeded
    }

    /// Returns `true` if this error is the "no more elements" signal raised
    /// by calling `next_event` after the end of the document.
    #[must_use]
    pub fn is_no_more_elements(&self) -> bool {
        self.kind == ErrorKind::NoMoreElements
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.system_id {
            Some(id) => write!(
                f,
                "parse error at {id}:{}: {}",
                self.location, self.message
            ),
            None => write!(f, "parse error at {}: {}", self.location, self.message),
        }
    }
}

impl std::error::Error for ParseError {}
