//! The document handler interface.
//!
//! A [`DocumentHandler`] receives the structural events of a scan in
//! document order. Every method has a default no-op body, so implementors
//! only override what they need.
//!
//! ```
//! use xmlscan::document::DocumentHandler;
//! use xmlscan::parser::{scan_str, ParseOptions};
//! use xmlscan::util::qname::QName;
//! use xmlscan::document::Attributes;
//!
//! struct Counter(usize);
//!
//! impl DocumentHandler for Counter {
//!     fn start_element(&mut self, _name: &QName, _attributes: &Attributes) {
//!         self.0 += 1;
//!     }
//!     fn empty_element(&mut self, _name: &QName, _attributes: &Attributes) {
//!         self.0 += 1;
//!     }
//! }
//!
//! let mut counter = Counter(0);
//! scan_str("<root><a/><b/></root>", &ParseOptions::default(), &mut counter).unwrap();
//! assert_eq!(counter.0, 3);
//! ```

use crate::entity::ResourceIdentifier;
use crate::error::ParseDiagnostic;
use crate::util::qname::QName;

/// One attribute of a start tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// The attribute name; `uri` is filled in by namespace binding.
    pub name: QName,
    /// The normalised value.
    pub value: String,
}

/// The attributes of a start tag, in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Attributes {
    list: Vec<Attribute>,
}

impl Attributes {
    /// Creates an empty list.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of attributes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.list.len()
    }

    /// Returns `true` if there are no attributes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.list.is_empty()
    }

    /// The attribute at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&Attribute> {
        self.list.get(index)
    }

    /// Iterates over the attributes in document order.
    pub fn iter(&self) -> std::slice::Iter<'_, Attribute> {
        self.list.iter()
    }

    /// Looks up a value by qualified name.
    #[must_use]
    pub fn value(&self, rawname: &str) -> Option<&str> {
        self.list
            .iter()
            .find(|a| a.name.rawname == rawname)
            .map(|a| a.value.as_str())
    }

    /// Looks up a value by namespace URI and local name.
    #[must_use]
    pub fn value_ns(&self, uri: Option<&str>, localpart: &str) -> Option<&str> {
        self.list
            .iter()
            .find(|a| a.name.uri_str() == uri && a.name.localpart == localpart)
            .map(|a| a.value.as_str())
    }

    pub(crate) fn push(&mut self, attribute: Attribute) {
        self.list.push(attribute);
    }

    pub(crate) fn contains_rawname(&self, rawname: &str) -> bool {
        self.list.iter().any(|a| a.name.rawname == rawname)
    }

    pub(crate) fn as_mut_slice(&mut self) -> &mut [Attribute] {
        &mut self.list
    }

    pub(crate) fn retain(&mut self, keep: impl FnMut(&Attribute) -> bool) {
        self.list.retain(keep);
    }
}

impl<'a> IntoIterator for &'a Attributes {
    type Item = &'a Attribute;
    type IntoIter = std::slice::Iter<'a, Attribute>;

    fn into_iter(self) -> Self::IntoIter {
        self.list.iter()
    }
}

/// Receiver of scan events.
#[allow(unused_variables)]
pub trait DocumentHandler {
    /// Called once, before any other event.
    fn start_document(&mut self) {}

    /// The document's XML declaration.
    fn xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {}

    /// The text declaration of an external entity or external subset.
    fn text_decl(&mut self, version: Option<&str>, encoding: Option<&str>) {}

    /// The DOCTYPE declaration. Always precedes the root element.
    fn doctype_decl(&mut self, root_name: &str, public_id: Option<&str>, system_id: Option<&str>) {}

    /// An internal general or parameter entity declaration. Parameter
    /// entity names carry a leading `%`.
    fn internal_entity_decl(&mut self, name: &str, value: &str) {}

    /// An external parsed entity declaration.
    fn external_entity_decl(&mut self, name: &str, identifier: &ResourceIdentifier) {}

    /// An unparsed (`NDATA`) entity declaration.
    fn unparsed_entity_decl(&mut self, name: &str, identifier: &ResourceIdentifier, notation: &str) {}

    /// End of the internal and external DTD subsets.
    fn end_dtd(&mut self) {}

    /// A namespace prefix comes into scope (empty for the default namespace).
    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) {}

    /// A namespace prefix goes out of scope.
    fn end_prefix_mapping(&mut self, prefix: &str) {}

    /// A start tag.
    fn start_element(&mut self, name: &QName, attributes: &Attributes) {}

    /// An empty-element tag. No `end_element` follows.
    fn empty_element(&mut self, name: &QName, attributes: &Attributes) {}

    /// An end tag.
    fn end_element(&mut self, name: &QName) {}

    /// Character data.
    fn characters(&mut self, text: &str) {}

    /// Start of a CDATA section; its text arrives through `characters`.
    fn start_cdata(&mut self) {}

    /// End of a CDATA section.
    fn end_cdata(&mut self) {}

    /// A comment.
    fn comment(&mut self, text: &str) {}

    /// A processing instruction.
    fn processing_instruction(&mut self, target: &str, data: &str) {}

    /// A general entity starts expanding in content. Character and
    /// built-in references are reported this way when notification of them
    /// is enabled, with names like `#65`, `#x41` or `amp`.
    fn start_general_entity(&mut self, name: &str, identifier: Option<&ResourceIdentifier>) {}

    /// A general entity finished expanding.
    fn end_general_entity(&mut self, name: &str) {}

    /// An entity reference that was not expanded, because the entity is
    /// undeclared or its external text was not available.
    fn skipped_entity(&mut self, name: &str) {}

    /// Called once, after the last event.
    fn end_document(&mut self) {}

    /// A warning.
    fn warning(&mut self, diagnostic: &ParseDiagnostic) {}

    /// A recoverable error.
    fn error(&mut self, diagnostic: &ParseDiagnostic) {}

    /// A fatal error scanning recovered from.
    fn fatal_error(&mut self, diagnostic: &ParseDiagnostic) {}
}

/// A handler that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultHandler;

impl DocumentHandler for DefaultHandler {}
