//! The entity-aware character scanner.
//!
//! [`EntityScanner`] owns the stack of open entities and implements the
//! XML lexical productions directly over the active entity's buffer:
//!
//! - `buffer`: pushing/popping entities, refilling and shifting the
//!   buffer window, doubling it when a token outgrows it.
//! - `lexer`: names, qualified names, content runs, literals, delimited
//!   data, conditional consumption.
//! - `markup`: comment, processing instruction and character reference
//!   bodies shared by the document and DTD scanners.
//! - `xmldecl`: the `version`/`encoding`/`standalone` pseudo-attributes of
//!   XML and text declarations.
//!
//! Lexer operations never pop an entity on their own. Reaching the end of
//! the active entity is reported as "nothing matched" (or `None`), and the
//! document driver decides whether to pop it and resume the parent.
//!
//! All fatal errors funnel through [`EntityScanner::report_fatal`], which
//! either returns the error or, in continue-after-fatal-error mode, records
//! it and lets the caller resynchronise.

mod buffer;
pub mod chars;
mod lexer;
mod markup;
mod xmldecl;

use std::fmt;

use crate::entity::{EntityKind, InputSource, ScannedEntity, SourceError, DOCUMENT_ENTITY};
use crate::error::{
    ErrorKind, ErrorSeverity, LimitViolation, ParseDiagnostic, ParseError, SourceLocation,
};
use crate::security::{Limit, LimitAnalyzer, SecurityManager};
use crate::util::dict::SymbolTable;

pub use buffer::Refill;
pub use chars::XmlVersion;
pub use markup::ProcessingInstruction;
pub use xmldecl::XmlDeclInfo;

/// Default size, in characters, of an entity buffer.
pub const DEFAULT_BUFFER_SIZE: usize = 8192;

/// What a name (or run of text) is being scanned for. Used to attribute
/// limit violations and to pick the checks that apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameType {
    ElementStart,
    ElementEnd,
    AttributeName,
    AttributeValue,
    Doctype,
    Entity,
    Notation,
    PiTarget,
    Comment,
    CData,
    Reference,
    Other,
}

impl fmt::Display for NameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            NameType::ElementStart => "element start",
            NameType::ElementEnd => "element end",
            NameType::AttributeName => "attribute name",
            NameType::AttributeValue => "attribute value",
            NameType::Doctype => "doctype",
            NameType::Entity => "entity",
            NameType::Notation => "notation",
            NameType::PiTarget => "processing instruction",
            NameType::Comment => "comment",
            NameType::CData => "CDATA section",
            NameType::Reference => "reference",
            NameType::Other => "name",
        };
        f.write_str(s)
    }
}

/// The entity stack plus the lexer working on its top entry.
pub struct EntityScanner {
    /// The active entity.
    entity: ScannedEntity,
    /// Suspended parents, outermost first.
    stack: Vec<ScannedEntity>,
    buffer_size: usize,
    pub(crate) symbols: SymbolTable,
    security: SecurityManager,
    limits: LimitAnalyzer,
    version: XmlVersion,
    detecting_version: bool,
    recover: bool,
    diagnostics: Vec<ParseDiagnostic>,
}

impl EntityScanner {
    /// Opens the document entity.
    #[must_use]
    pub fn new(
        document: InputSource,
        buffer_size: usize,
        security: SecurityManager,
        recover: bool,
    ) -> Self {
        let buffer_size = buffer_size.max(1);
        let mut entity = ScannedEntity::new(
            DOCUMENT_ENTITY,
            EntityKind::Document,
            document,
            true,
            buffer_size,
        );
        // Read one char at a time until the XML declaration is processed.
        entity.may_read_chunks = false;
        Self {
            entity,
            stack: Vec::new(),
            buffer_size,
            symbols: SymbolTable::new(),
            security,
            limits: LimitAnalyzer::new(),
            version: XmlVersion::V1_0,
            detecting_version: false,
            recover,
            diagnostics: Vec::new(),
        }
    }

    /// The active entity.
    #[must_use]
    pub fn current(&self) -> &ScannedEntity {
        &self.entity
    }

    /// Number of suspended parents (0 while scanning the document entity).
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len()
    }

    /// Returns `true` if an entity with this name and kind is open.
    #[must_use]
    pub fn is_entity_open(&self, name: &str, kind: EntityKind) -> bool {
        self.stack
            .iter()
            .chain(std::iter::once(&self.entity))
            .any(|e| e.kind == kind && e.name == name)
    }

    /// Names of the open entities, outermost first.
    pub fn entity_path(&self) -> impl Iterator<Item = &str> {
        self.stack
            .iter()
            .chain(std::iter::once(&self.entity))
            .map(|e| e.name.as_str())
    }

    /// Describes a reference to the open entity `name` as the chain of
    /// open entities from it back to itself, e.g. `a -> b -> a`.
    #[must_use]
    pub fn recursion_path(&self, name: &str) -> String {
        let mut path: Vec<&str> = self.entity_path().skip_while(|e| *e != name).collect();
        path.push(name);
        path.join(" -> ")
    }

    /// The initial buffer size for new entities.
    #[must_use]
    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// The XML version in effect.
    #[must_use]
    pub fn version(&self) -> XmlVersion {
        self.version
    }

    pub(crate) fn set_version(&mut self, version: XmlVersion) {
        self.version = version;
    }

    /// While set, limit checks are bypassed (used for declaration scanning).
    pub(crate) fn set_detecting_version(&mut self, detecting: bool) {
        self.detecting_version = detecting;
    }

    pub(crate) fn set_may_read_chunks(&mut self, may: bool) {
        self.entity.may_read_chunks = may;
    }

    pub(crate) fn set_entity_encoding(&mut self, encoding: Option<String>) {
        self.entity.encoding = encoding;
    }

    /// Switches the active entity's decoder to a declared encoding.
    pub(crate) fn switch_encoding(&mut self, label: &str) -> Result<(), ParseError> {
        match self.entity.source.switch_encoding(label) {
            Ok(_) => Ok(()),
            Err(e) => Err(self.error(ErrorKind::Encoding, "EncodingDeclInvalid", e.message)),
        }
    }

    /// Returns `true` in continue-after-fatal-error mode.
    #[must_use]
    pub fn recover(&self) -> bool {
        self.recover
    }

    /// The configured limits.
    #[must_use]
    pub fn security(&self) -> &SecurityManager {
        &self.security
    }

    /// The measured limit values.
    #[must_use]
    pub fn limit_analyzer(&self) -> &LimitAnalyzer {
        &self.limits
    }

    // -- Locations and errors --

    /// The position of the next unread character in the active entity.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        SourceLocation {
            line: self.entity.line,
            column: self.entity.column,
            char_offset: self.entity.char_offset(),
        }
    }

    /// Builds an error at the current location, carrying the active
    /// entity's identifiers and the diagnostics collected so far.
    pub fn error(
        &self,
        kind: ErrorKind,
        code: &'static str,
        message: impl Into<String>,
    ) -> ParseError {
        let identifier = self.entity.identifier();
        let mut err = ParseError::new(kind, code, message, self.location());
        err.system_id = identifier.system_id().map(str::to_string);
        err.public_id.clone_from(&identifier.public_id);
        err.diagnostics.clone_from(&self.diagnostics);
        err
    }

    /// Reports a fatal error. Returns it unless recovery is enabled, in
    /// which case it is recorded and the caller continues.
    pub fn report_fatal(
        &mut self,
        kind: ErrorKind,
        code: &'static str,
        message: impl Into<String>,
    ) -> Result<(), ParseError> {
        if !self.recover {
            return Err(self.error(kind, code, message));
        }
        let message = message.into();
        log::warn!("recovering from fatal error {code}: {message}");
        self.push_diagnostic(ErrorSeverity::Fatal, kind, code, message);
        Ok(())
    }

    /// Records a non-fatal error.
    pub fn report_error(&mut self, kind: ErrorKind, code: &'static str, message: impl Into<String>) {
        self.push_diagnostic(ErrorSeverity::Error, kind, code, message.into());
    }

    /// Records a warning.
    pub fn report_warning(&mut self, code: &'static str, message: impl Into<String>) {
        self.push_diagnostic(
            ErrorSeverity::Warning,
            ErrorKind::Validity,
            code,
            message.into(),
        );
    }

    fn push_diagnostic(
        &mut self,
        severity: ErrorSeverity,
        kind: ErrorKind,
        code: &'static str,
        message: String,
    ) {
        let location = self.location();
        self.diagnostics.push(ParseDiagnostic {
            severity,
            kind,
            code,
            message,
            location,
        });
    }

    /// Diagnostics not yet handed to the document handler.
    pub fn pending_diagnostics(&self) -> &[ParseDiagnostic] {
        &self.diagnostics
    }

    /// Number of diagnostics recorded so far.
    #[must_use]
    pub fn diagnostic_count(&self) -> usize {
        self.diagnostics.len()
    }

    fn source_error(&self, err: SourceError) -> ParseError {
        match err {
            SourceError::Io(e) => self.error(ErrorKind::Io, "IOError", e.to_string()),
            SourceError::Encoding(e) => {
                self.error(ErrorKind::Encoding, "InvalidByteSequence", e.message)
            }
        }
    }

    /// Premature end of the active entity inside a construct.
    pub fn premature_eof(&self, what: &str) -> ParseError {
        let message = if self.stack.is_empty() {
            format!("XML document structures must start and end within the same entity ({what})")
        } else {
            format!(
                "{what} must start and end within the same entity \"{}\"",
                self.entity.name
            )
        };
        self.error(ErrorKind::PrematureEof, "PrematureEOF", message)
    }

    // -- Limits --

    /// Adds `amount` to `limit` for the active entity and fails if the
    /// limit (or the total entity size) is exceeded.
    pub fn check_limit(&mut self, limit: Limit, amount: usize) -> Result<(), ParseError> {
        self.limits.add_value(limit, &self.entity.name, amount);
        if self.security.is_over_limit(limit, &self.limits) {
            return Err(self.limit_error(limit));
        }
        if self.security.is_over_limit(Limit::TotalEntitySize, &self.limits) {
            return Err(self.limit_error(Limit::TotalEntitySize));
        }
        Ok(())
    }

    /// Counts `amount` characters scanned from the active entity against
    /// the per-entity size limits.
    pub fn check_entity_limit(
        &mut self,
        nt: Option<NameType>,
        amount: usize,
    ) -> Result<(), ParseError> {
        if self.detecting_version {
            return Ok(());
        }
        match self.entity.kind {
            EntityKind::General => {
                if nt != Some(NameType::Reference) {
                    self.check_limit(Limit::GeneralEntitySize, amount)?;
                }
                if matches!(nt, Some(NameType::ElementStart | NameType::AttributeName)) {
                    self.check_node_count()?;
                }
                Ok(())
            }
            EntityKind::Parameter => self.check_limit(Limit::ParameterEntitySize, amount),
            EntityKind::Document | EntityKind::ExternalSubset => Ok(()),
        }
    }

    /// Counts one element or attribute node produced inside a general entity.
    pub fn check_node_count(&mut self) -> Result<(), ParseError> {
        if self.entity.is_ge {
            self.check_limit(Limit::EntityReplacement, 1)?;
        }
        Ok(())
    }

    /// Checks a single measured value (depth, attribute count) that is not
    /// accumulated per entity.
    pub fn check_value(&mut self, limit: Limit, value: usize) -> Result<(), ParseError> {
        self.limits.add_value(limit, &self.entity.name, value);
        if self.security.is_over_limit(limit, &self.limits) {
            return Err(self.limit_error(limit));
        }
        Ok(())
    }

    fn limit_error(&self, limit: Limit) -> ParseError {
        let entity_name = match limit {
            Limit::EntityReplacement | Limit::EntityExpansion | Limit::TotalEntitySize => None,
            Limit::GeneralEntitySize | Limit::ParameterEntitySize => self
                .limits
                .largest_entity(limit)
                .map(str::to_string)
                .or_else(|| Some(self.entity.name.clone())),
            _ => Some(self.entity.name.clone()),
        };
        let violation = LimitViolation {
            limit,
            entity_name,
            value: self.limits.value(limit),
            max: self.security.limit(limit),
            state: self.security.state(limit),
        };
        log::warn!("{violation}");
        let mut err = self.error(ErrorKind::LimitExceeded, limit.error_code(), violation.to_string());
        err.limit = Some(violation);
        err
    }

    /// Zeroes the limit counters.
    pub fn reset_limits(&mut self) {
        self.limits.reset();
    }
}

impl fmt::Debug for EntityScanner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityScanner")
            .field("entity", &self.entity.name)
            .field("depth", &self.stack.len())
            .field("version", &self.version)
            .field("location", &self.location())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn scanner(text: &str, buffer_size: usize) -> EntityScanner {
        let mut s = EntityScanner::new(
            InputSource::from_string(text),
            buffer_size,
            SecurityManager::new(),
            false,
        );
        s.set_may_read_chunks(true);
        s
    }

    #[test]
    fn test_new_scanner_is_at_document_entity() {
        let s = scanner("<a/>", 16);
        assert_eq!(s.depth(), 0);
        assert_eq!(s.current().name, DOCUMENT_ENTITY);
        assert_eq!(s.location().line, 1);
    }

    #[test]
    fn test_report_fatal_without_recovery_returns_error() {
        let mut s = scanner("x", 16);
        let err = s
            .report_fatal(ErrorKind::WellFormedness, "Test", "boom")
            .unwrap_err();
        assert_eq!(err.code, "Test");
        assert_eq!(err.message, "boom");
    }

    #[test]
    fn test_report_fatal_with_recovery_records_diagnostic() {
        let mut s = EntityScanner::new(
            InputSource::from_string("x"),
            16,
            SecurityManager::new(),
            true,
        );
        s.report_fatal(ErrorKind::WellFormedness, "Test", "boom").unwrap();
        assert_eq!(s.diagnostic_count(), 1);
        assert_eq!(s.pending_diagnostics()[0].severity, ErrorSeverity::Fatal);
    }

    #[test]
    fn test_error_carries_system_id() {
        let s = EntityScanner::new(
            InputSource::from_string("x").with_system_id("doc.xml"),
            16,
            SecurityManager::new(),
            false,
        );
        let err = s.error(ErrorKind::WellFormedness, "Test", "m");
        assert_eq!(err.system_id.as_deref(), Some("doc.xml"));
    }

    #[test]
    fn test_recursion_path() {
        let mut s = scanner("", 16);
        s.push_entity("a", EntityKind::General, InputSource::from_string("x"), false)
            .unwrap();
        s.push_entity("b", EntityKind::General, InputSource::from_string("y"), false)
            .unwrap();
        assert!(s.is_entity_open("a", EntityKind::General));
        assert!(!s.is_entity_open("a", EntityKind::Parameter));
        assert_eq!(s.recursion_path("a"), "a -> b -> a");
    }

    #[test]
    fn test_name_type_display() {
        assert_eq!(NameType::ElementStart.to_string(), "element start");
        assert_eq!(NameType::PiTarget.to_string(), "processing instruction");
    }
}
