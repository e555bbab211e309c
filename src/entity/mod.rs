//! Entities: declarations, resolution requests and the scanned-entity frame.
//!
//! The [`EntityStore`] keeps the general and parameter entity declarations
//! collected from the DTD. Resolution of external entities is delegated to
//! the caller through the resolver callbacks in
//! [`ParseOptions`](crate::parser::ParseOptions), which receive an
//! [`ExternalEntityRequest`] and return an [`InputSource`].

pub mod scanned;
pub mod source;

use std::collections::HashMap;

pub use scanned::{EntityKind, ScannedEntity};
pub use source::{expand_system_id, InputSource, ResourceIdentifier, SourceError};

/// Pseudo-name of the document entity.
pub const DOCUMENT_ENTITY: &str = "[xml]";

/// Pseudo-name of the external DTD subset.
pub const DTD_ENTITY: &str = "[dtd]";

/// What kind of resource an [`ExternalEntityRequest`] asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// An external parsed general entity referenced from content.
    GeneralEntity,
    /// An external parameter entity referenced from the DTD.
    ParameterEntity,
    /// The external subset named by the DOCTYPE declaration.
    ExternalSubset,
}

/// Information passed to an entity resolver callback.
#[derive(Debug, Clone, Copy)]
pub struct ExternalEntityRequest<'a> {
    /// The entity name (`"[dtd]"` for the external subset).
    pub name: &'a str,
    /// What is being resolved.
    pub kind: RequestKind,
    /// The SYSTEM identifier as written in the declaration.
    pub system_id: &'a str,
    /// The PUBLIC identifier, if present.
    pub public_id: Option<&'a str>,
    /// The system id of the entity containing the declaration, if known.
    pub base_system_id: Option<&'a str>,
    /// The system id resolved against the base.
    pub expanded_system_id: &'a str,
}

/// Information passed to an external-subset resolver for a document that
/// has no DOCTYPE declaration.
#[derive(Debug, Clone, Copy)]
pub struct ExternalSubsetRequest<'a> {
    /// The name of the document's root element.
    pub root_name: &'a str,
    /// The system id of the document, if known.
    pub base_system_id: Option<&'a str>,
}

/// A general or parameter entity declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDecl {
    /// The entity name (without `%` for parameter entities).
    pub name: String,
    /// `true` for parameter entities.
    pub is_parameter: bool,
    /// Replacement text of an internal entity.
    pub value: Option<String>,
    /// Identifiers of an external entity.
    pub identifier: Option<ResourceIdentifier>,
    /// Notation name of an unparsed entity.
    pub notation: Option<String>,
    /// `true` if declared in the external subset or an external parameter
    /// entity.
    pub in_external_subset: bool,
}

impl EntityDecl {
    /// Creates an internal entity declaration.
    #[must_use]
    pub fn internal(name: &str, value: String, is_parameter: bool) -> Self {
        Self {
            name: name.to_string(),
            is_parameter,
            value: Some(value),
            identifier: None,
            notation: None,
            in_external_subset: false,
        }
    }

    /// Creates an external entity declaration.
    #[must_use]
    pub fn external(
        name: &str,
        identifier: ResourceIdentifier,
        notation: Option<String>,
        is_parameter: bool,
    ) -> Self {
        Self {
            name: name.to_string(),
            is_parameter,
            value: None,
            identifier: Some(identifier),
            notation,
            in_external_subset: false,
        }
    }

    /// Returns `true` if the entity's text lives outside the document.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.identifier.is_some()
    }

    /// Returns `true` for an unparsed (`NDATA`) entity.
    #[must_use]
    pub fn is_unparsed(&self) -> bool {
        self.notation.is_some()
    }
}

/// Declarations collected from the DTD.
#[derive(Debug, Default, Clone)]
pub struct EntityStore {
    general: HashMap<String, EntityDecl>,
    parameter: HashMap<String, EntityDecl>,
    has_external_subset: bool,
    has_pe_references: bool,
}

impl EntityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a declaration. The first declaration of a name is binding;
    /// returns `false` if the name was already declared.
    pub fn declare(&mut self, decl: EntityDecl) -> bool {
        let map = if decl.is_parameter {
            &mut self.parameter
        } else {
            &mut self.general
        };
        if map.contains_key(&decl.name) {
            return false;
        }
        map.insert(decl.name.clone(), decl);
        true
    }

    /// Looks up a general entity.
    #[must_use]
    pub fn general(&self, name: &str) -> Option<&EntityDecl> {
        self.general.get(name)
    }

    /// Looks up a parameter entity.
    #[must_use]
    pub fn parameter(&self, name: &str) -> Option<&EntityDecl> {
        self.parameter.get(name)
    }

    /// Notes that the DTD has an external subset.
    pub fn set_has_external_subset(&mut self) {
        self.has_external_subset = true;
    }

    /// Notes that the DTD referenced a parameter entity.
    pub fn set_has_pe_references(&mut self) {
        self.has_pe_references = true;
    }

    /// Returns `true` if declarations may be missing because the DTD has
    /// parts the scanner did not (or could not) read.
    #[must_use]
    pub fn has_external_parts(&self) -> bool {
        self.has_external_subset || self.has_pe_references
    }

    /// Number of general entity declarations.
    #[must_use]
    pub fn general_count(&self) -> usize {
        self.general.len()
    }

    /// Forgets every declaration.
    pub fn reset(&mut self) {
        self.general.clear();
        self.parameter.clear();
        self.has_external_subset = false;
        self.has_pe_references = false;
    }
}

/// Returns the replacement character of a predefined entity.
#[must_use]
pub fn builtin_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        _ => None,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_first_declaration_wins() {
        let mut store = EntityStore::new();
        assert!(store.declare(EntityDecl::internal("e", "one".into(), false)));
        assert!(!store.declare(EntityDecl::internal("e", "two".into(), false)));
        assert_eq!(store.general("e").unwrap().value.as_deref(), Some("one"));
    }

    #[test]
    fn test_general_and_parameter_namespaces_are_separate() {
        let mut store = EntityStore::new();
        store.declare(EntityDecl::internal("e", "g".into(), false));
        store.declare(EntityDecl::internal("e", "p".into(), true));
        assert_eq!(store.general("e").unwrap().value.as_deref(), Some("g"));
        assert_eq!(store.parameter("e").unwrap().value.as_deref(), Some("p"));
    }

    #[test]
    fn test_external_and_unparsed() {
        let id = ResourceIdentifier::new(None, Some("pic.gif".into()), None);
        let decl = EntityDecl::external("pic", id, Some("gif".into()), false);
        assert!(decl.is_external());
        assert!(decl.is_unparsed());
    }

    #[test]
    fn test_reset() {
        let mut store = EntityStore::new();
        store.declare(EntityDecl::internal("e", "v".into(), false));
        store.set_has_pe_references();
        assert!(store.has_external_parts());
        store.reset();
        assert!(store.general("e").is_none());
        assert!(!store.has_external_parts());
        assert_eq!(store.general_count(), 0);
    }

    #[test]
    fn test_builtin_entities() {
        assert_eq!(builtin_entity("lt"), Some('<'));
        assert_eq!(builtin_entity("quot"), Some('"'));
        assert_eq!(builtin_entity("nbsp"), None);
    }
}
