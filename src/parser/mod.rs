//! Scan options and entry points.
//!
//! [`ParseOptions`] carries every setting a scan reads: feature flags,
//! resource limits and the resolver callbacks. A [`DocumentScanner`] copies
//! the options once when it is created.
//!
//! ```
//! use xmlscan::parser::{scan_str, ParseOptions};
//! use xmlscan::document::DefaultHandler;
//!
//! let opts = ParseOptions::default()
//!     .namespaces(true)
//!     .general_entity_size_limit(1024);
//! scan_str("<root/>", &opts, &mut DefaultHandler).unwrap();
//! ```

mod resolve;

use std::sync::Arc;

use crate::document::{DocumentHandler, DocumentScanner, EventKind};
use crate::entity::{ExternalEntityRequest, ExternalSubsetRequest, InputSource};
use crate::error::ParseError;
use crate::scanner::DEFAULT_BUFFER_SIZE;
use crate::security::{Limit, SecurityManager};

pub(crate) use resolve::{resolve_external, resolve_external_subset, scan_text_decl};

/// A callback that opens external entities and the external DTD subset.
///
/// Returns `None` to leave the entity unread. The reference is then
/// reported through `skipped_entity` (or, for the external subset, simply
/// not loaded).
///
/// # Security
///
/// **Warning:** Resolving external entities opens the door to XML External
/// Entity (XXE) attacks. Only use this with trusted input, and consider
/// restricting which URIs the resolver is willing to open.
pub type EntityResolver =
    Arc<dyn Fn(ExternalEntityRequest<'_>) -> Option<InputSource> + Send + Sync>;

/// A callback that supplies an external subset for a document that has no
/// DOCTYPE declaration.
pub type ExternalSubsetResolver =
    Arc<dyn Fn(ExternalSubsetRequest<'_>) -> Option<InputSource> + Send + Sync>;

/// Scan options.
///
/// ```
/// use xmlscan::parser::ParseOptions;
///
/// let opts = ParseOptions::default()
///     .continue_after_fatal_error(true)
///     .buffer_size(64)
///     .max_name_length(256);
/// assert_eq!(opts.buffer_size, 64);
/// ```
pub struct ParseOptions {
    /// Bind element and attribute names to namespaces.
    pub namespaces: bool,
    /// Record fatal errors as diagnostics and keep scanning.
    pub continue_after_fatal_error: bool,
    /// Load the external subset named by the DOCTYPE (needs a resolver).
    pub load_external_dtd: bool,
    /// Process the DTD. When off, the internal subset is skipped and no
    /// declarations are kept.
    pub process_dtd: bool,
    /// Treat any DOCTYPE declaration as a fatal error.
    pub disallow_doctype: bool,
    /// Report character references as general entity boundaries.
    pub notify_char_refs: bool,
    /// Report the predefined entities as general entity boundaries.
    pub notify_builtin_refs: bool,
    /// Keep `xmlns` attributes in element attribute lists.
    pub namespace_declarations_as_attributes: bool,
    /// Protocols external DTDs and entities may be loaded from: `"all"`,
    /// `""` (none), or a comma-separated list such as `"file,http"`.
    pub access_external_dtd: String,
    /// Initial per-entity buffer size in characters.
    pub buffer_size: usize,
    /// Resource limits.
    pub security: SecurityManager,
    /// Opens external entities and external subsets.
    pub entity_resolver: Option<EntityResolver>,
    /// Supplies an external subset for documents without a DOCTYPE.
    pub external_subset_resolver: Option<ExternalSubsetResolver>,
}

impl Clone for ParseOptions {
    fn clone(&self) -> Self {
        Self {
            namespaces: self.namespaces,
            continue_after_fatal_error: self.continue_after_fatal_error,
            load_external_dtd: self.load_external_dtd,
            process_dtd: self.process_dtd,
            disallow_doctype: self.disallow_doctype,
            notify_char_refs: self.notify_char_refs,
            notify_builtin_refs: self.notify_builtin_refs,
            namespace_declarations_as_attributes: self.namespace_declarations_as_attributes,
            access_external_dtd: self.access_external_dtd.clone(),
            buffer_size: self.buffer_size,
            security: self.security.clone(),
            entity_resolver: self.entity_resolver.clone(),
            external_subset_resolver: self.external_subset_resolver.clone(),
        }
    }
}

impl std::fmt::Debug for ParseOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParseOptions")
            .field("namespaces", &self.namespaces)
            .field("continue_after_fatal_error", &self.continue_after_fatal_error)
            .field("load_external_dtd", &self.load_external_dtd)
            .field("process_dtd", &self.process_dtd)
            .field("disallow_doctype", &self.disallow_doctype)
            .field("notify_char_refs", &self.notify_char_refs)
            .field("notify_builtin_refs", &self.notify_builtin_refs)
            .field(
                "namespace_declarations_as_attributes",
                &self.namespace_declarations_as_attributes,
            )
            .field("access_external_dtd", &self.access_external_dtd)
            .field("buffer_size", &self.buffer_size)
            .field("security", &self.security)
            .field(
                "entity_resolver",
                &self.entity_resolver.as_ref().map(|_| "..."),
            )
            .field(
                "external_subset_resolver",
                &self.external_subset_resolver.as_ref().map(|_| "..."),
            )
            .finish()
    }
}

impl Default for ParseOptions {
    fn default() -> Self {
        Self {
            namespaces: true,
            continue_after_fatal_error: false,
            load_external_dtd: true,
            process_dtd: true,
            disallow_doctype: false,
            notify_char_refs: false,
            notify_builtin_refs: false,
            namespace_declarations_as_attributes: false,
            access_external_dtd: "all".to_string(),
            buffer_size: DEFAULT_BUFFER_SIZE,
            security: SecurityManager::new(),
            entity_resolver: None,
            external_subset_resolver: None,
        }
    }
}

impl ParseOptions {
    /// Enables or disables namespace processing.
    #[must_use]
    pub fn namespaces(mut self, yes: bool) -> Self {
        self.namespaces = yes;
        self
    }

    /// Enables or disables continue-after-fatal-error mode. Use with
    /// extreme caution: recovery is best effort.
    #[must_use]
    pub fn continue_after_fatal_error(mut self, yes: bool) -> Self {
        self.continue_after_fatal_error = yes;
        self
    }

    /// Enables or disables loading of the external DTD subset.
    #[must_use]
    pub fn load_external_dtd(mut self, yes: bool) -> Self {
        self.load_external_dtd = yes;
        self
    }

    /// Enables or disables DTD processing.
    #[must_use]
    pub fn process_dtd(mut self, yes: bool) -> Self {
        self.process_dtd = yes;
        self
    }

    /// Makes any DOCTYPE declaration fatal.
    #[must_use]
    pub fn disallow_doctype(mut self, yes: bool) -> Self {
        self.disallow_doctype = yes;
        self
    }

    /// Reports character references as entity boundaries.
    #[must_use]
    pub fn notify_char_refs(mut self, yes: bool) -> Self {
        self.notify_char_refs = yes;
        self
    }

    /// Reports predefined entity references as entity boundaries.
    #[must_use]
    pub fn notify_builtin_refs(mut self, yes: bool) -> Self {
        self.notify_builtin_refs = yes;
        self
    }

    /// Keeps namespace declarations in attribute lists.
    #[must_use]
    pub fn namespace_declarations_as_attributes(mut self, yes: bool) -> Self {
        self.namespace_declarations_as_attributes = yes;
        self
    }

    /// Sets the protocols external resources may be loaded from.
    #[must_use]
    pub fn access_external_dtd(mut self, protocols: &str) -> Self {
        self.access_external_dtd = protocols.to_string();
        self
    }

    /// Sets the initial per-entity buffer size (at least one character).
    #[must_use]
    pub fn buffer_size(mut self, chars: usize) -> Self {
        self.buffer_size = chars.max(1);
        self
    }

    /// Sets a resource limit. `0` disables it.
    #[must_use]
    pub fn limit(mut self, limit: Limit, value: usize) -> Self {
        self.security.set_limit(limit, value);
        self
    }

    /// Sets the maximum number of entity expansions per document.
    #[must_use]
    pub fn entity_expansion_limit(self, max: usize) -> Self {
        self.limit(Limit::EntityExpansion, max)
    }

    /// Sets the maximum size of a single general entity expansion.
    #[must_use]
    pub fn general_entity_size_limit(self, max: usize) -> Self {
        self.limit(Limit::GeneralEntitySize, max)
    }

    /// Sets the maximum size of a single parameter entity expansion.
    #[must_use]
    pub fn parameter_entity_size_limit(self, max: usize) -> Self {
        self.limit(Limit::ParameterEntitySize, max)
    }

    /// Sets the maximum total size of all entity expansions.
    #[must_use]
    pub fn total_entity_size_limit(self, max: usize) -> Self {
        self.limit(Limit::TotalEntitySize, max)
    }

    /// Sets the maximum length of an XML name.
    #[must_use]
    pub fn max_name_length(self, max: usize) -> Self {
        self.limit(Limit::MaxName, max)
    }

    /// Sets the maximum element nesting depth.
    #[must_use]
    pub fn max_element_depth(self, max: usize) -> Self {
        self.limit(Limit::MaxElementDepth, max)
    }

    /// Sets the maximum number of attributes per element.
    #[must_use]
    pub fn element_attribute_limit(self, max: usize) -> Self {
        self.limit(Limit::ElementAttribute, max)
    }

    /// Sets the maximum number of element and attribute nodes produced
    /// inside general entities.
    #[must_use]
    pub fn entity_replacement_limit(self, max: usize) -> Self {
        self.limit(Limit::EntityReplacement, max)
    }

    /// Sets the entity resolver.
    ///
    /// # Security
    ///
    /// **Warning:** Resolving external entities opens the door to XML
    /// External Entity (XXE) attacks. Only use this with trusted input.
    #[must_use]
    pub fn entity_resolver(
        mut self,
        resolver: impl Fn(ExternalEntityRequest<'_>) -> Option<InputSource> + Send + Sync + 'static,
    ) -> Self {
        self.entity_resolver = Some(Arc::new(resolver));
        self
    }

    /// Sets the resolver consulted for documents without a DOCTYPE.
    #[must_use]
    pub fn external_subset_resolver(
        mut self,
        resolver: impl Fn(ExternalSubsetRequest<'_>) -> Option<InputSource> + Send + Sync + 'static,
    ) -> Self {
        self.external_subset_resolver = Some(Arc::new(resolver));
        self
    }
}

/// Returns `true` if `system_id` may be loaded under the comma-separated
/// protocol list `allowed` (`"all"` allows anything, `""` nothing).
/// Identifiers without a scheme count as `file`.
#[must_use]
pub fn access_allowed(system_id: &str, allowed: &str) -> bool {
    let allowed = allowed.trim();
    if allowed.eq_ignore_ascii_case("all") {
        return true;
    }
    if allowed.is_empty() {
        return false;
    }
    let protocol = match system_id.split_once(':') {
        Some((scheme, _))
            if scheme.len() > 1 && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.')) =>
        {
            scheme
        }
        _ => "file",
    };
    allowed
        .split(',')
        .map(str::trim)
        .any(|p| p.eq_ignore_ascii_case(protocol))
}

/// Scans a document held in a string to the end, delivering every event to
/// `handler`.
///
/// # Errors
///
/// Returns the first fatal error, unless continue-after-fatal-error mode
/// recovered from it.
pub fn scan_str(
    input: &str,
    options: &ParseOptions,
    handler: &mut dyn DocumentHandler,
) -> Result<(), ParseError> {
    scan_source(InputSource::from_string(input), options, handler)
}

/// Scans a document from any input source to the end.
///
/// # Errors
///
/// Returns the first fatal error, unless continue-after-fatal-error mode
/// recovered from it.
pub fn scan_source(
    source: InputSource,
    options: &ParseOptions,
    handler: &mut dyn DocumentHandler,
) -> Result<(), ParseError> {
    let mut scanner = DocumentScanner::new(source, options, handler);
    while scanner.next_event()? != EventKind::EndDocument {}
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::security::LimitState;

    #[test]
    fn test_defaults() {
        let opts = ParseOptions::default();
        assert!(opts.namespaces);
        assert!(opts.load_external_dtd);
        assert!(!opts.continue_after_fatal_error);
        assert_eq!(opts.buffer_size, DEFAULT_BUFFER_SIZE);
        assert_eq!(opts.security.state(Limit::MaxName), LimitState::Default);
    }

    #[test]
    fn test_limit_setters_mark_configured() {
        let opts = ParseOptions::default()
            .general_entity_size_limit(10)
            .max_element_depth(0);
        assert_eq!(opts.security.limit(Limit::GeneralEntitySize), 10);
        assert_eq!(
            opts.security.state(Limit::GeneralEntitySize),
            LimitState::Configured
        );
        assert_eq!(
            opts.security.state(Limit::MaxElementDepth),
            LimitState::Disabled
        );
    }

    #[test]
    fn test_buffer_size_is_clamped() {
        assert_eq!(ParseOptions::default().buffer_size(0).buffer_size, 1);
    }

    #[test]
    fn test_clone_keeps_resolver() {
        let opts = ParseOptions::default().entity_resolver(|_| None);
        let cloned = opts.clone();
        assert!(cloned.entity_resolver.is_some());
        assert!(format!("{cloned:?}").contains("entity_resolver: Some(\"...\")"));
    }

    #[test]
    fn test_access_allowed() {
        assert!(access_allowed("http://example.com/a.dtd", "all"));
        assert!(!access_allowed("a.dtd", ""));
        assert!(access_allowed("a.dtd", "file"));
        assert!(access_allowed("HTTP://example.com/a.dtd", "file, http"));
        assert!(!access_allowed("https://example.com/a.dtd", "http"));
        assert!(access_allowed("C:/dtds/a.dtd", "file"));
    }
}
