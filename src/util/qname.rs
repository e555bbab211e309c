//! `QName` (qualified name) handling.
//!
//! A `QName` is a name of the form `prefix:localname` or just `localname`
//! (with no prefix), as defined by the Namespaces in XML specification.
//! The scanner fills in the lexical parts; the namespace binder sets the
//! `uri` once the owning element's declarations are known.
//!
//! See <https://www.w3.org/TR/xml-names/#NT-QName>

use std::fmt;

use super::dict::Symbol;

/// A qualified name with its (optional) resolved namespace URI.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct QName {
    /// The prefix before the first colon, if any.
    pub prefix: Option<Symbol>,
    /// The local part after the first colon (or the whole name).
    pub localpart: Symbol,
    /// The exact lexical text of the name.
    pub rawname: Symbol,
    /// The bound namespace URI. `None` until binding runs, and after it
    /// for names in no namespace.
    pub uri: Option<Symbol>,
}

impl QName {
    /// Creates a name with no prefix.
    #[must_use]
    pub fn unprefixed(name: Symbol) -> Self {
        Self {
            prefix: None,
            localpart: name.clone(),
            rawname: name,
            uri: None,
        }
    }

    /// Creates a name from already-split parts.
    #[must_use]
    pub fn new(prefix: Option<Symbol>, localpart: Symbol, rawname: Symbol) -> Self {
        Self {
            prefix,
            localpart,
            rawname,
            uri: None,
        }
    }

    /// Returns the prefix as a string slice (`""` when there is none).
    #[must_use]
    pub fn prefix_str(&self) -> &str {
        self.prefix.as_deref().unwrap_or("")
    }

    /// Returns the bound namespace URI as a string slice.
    #[must_use]
    pub fn uri_str(&self) -> Option<&str> {
        self.uri.as_deref()
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.rawname)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unprefixed_qname() {
        let q = QName::unprefixed(Symbol::new("root"));
        assert_eq!(q.prefix_str(), "");
        assert_eq!(q.localpart, q.rawname);
        assert_eq!(q.uri_str(), None);
        assert_eq!(q.to_string(), "root");
    }

    #[test]
    fn test_prefixed_qname_display_uses_rawname() {
        let q = QName::new(
            Some(Symbol::new("p")),
            Symbol::new("q"),
            Symbol::new("p:q"),
        );
        assert_eq!(q.to_string(), "p:q");
        assert_eq!(q.prefix_str(), "p");
    }
}
