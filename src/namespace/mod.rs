//! Namespace scopes.
//!
//! [`NamespaceContext`] is a stack of prefix bindings with one frame per open
//! element. The `xml` and `xmlns` prefixes are bound permanently and can
//! never be declared; the base frame holds no user bindings.

use crate::util::dict::Symbol;

/// The namespace URI bound to the `xml` prefix.
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

/// The namespace URI of `xmlns` attributes.
pub const XMLNS_NAMESPACE: &str = "http://www.w3.org/2000/xmlns/";

/// A stack of prefix-to-URI bindings.
#[derive(Debug, Clone)]
pub struct NamespaceContext {
    /// Binding frames. The empty prefix stands for the default namespace and
    /// a `None` URI records an undeclaration (`xmlns=""`).
    stack: Vec<Vec<(Symbol, Option<Symbol>)>>,
    xml_uri: Symbol,
    xmlns_uri: Symbol,
}

impl NamespaceContext {
    /// Creates a context holding only the base frame.
    #[must_use]
    pub fn new() -> Self {
        Self {
            stack: vec![Vec::new()],
            xml_uri: Symbol::new(XML_NAMESPACE),
            xmlns_uri: Symbol::new(XMLNS_NAMESPACE),
        }
    }

    /// Opens a scope for an element.
    pub fn push_context(&mut self) {
        self.stack.push(Vec::new());
    }

    /// Closes the innermost scope. The base frame is never removed.
    pub fn pop_context(&mut self) {
        if self.stack.len() > 1 {
            self.stack.pop();
        }
    }

    /// Number of open element scopes.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.stack.len() - 1
    }

    /// Binds `prefix` (empty for the default namespace) in the innermost
    /// scope. A later declaration in the same scope replaces an earlier one.
    ///
    /// Returns `false`, without binding anything, for `xml` and `xmlns`,
    /// which are bound implicitly.
    pub fn declare_prefix(&mut self, prefix: &Symbol, uri: Option<Symbol>) -> bool {
        if prefix == "xml" || prefix == "xmlns" {
            return false;
        }
        if let Some(frame) = self.stack.last_mut() {
            if let Some(binding) = frame.iter_mut().find(|(p, _)| p == prefix) {
                binding.1 = uri;
            } else {
                frame.push((prefix.clone(), uri));
            }
        }
        true
    }

    /// Resolves `prefix` (empty for the default namespace).
    #[must_use]
    pub fn get_uri(&self, prefix: &str) -> Option<Symbol> {
        match prefix {
            "xml" => return Some(self.xml_uri.clone()),
            "xmlns" => return Some(self.xmlns_uri.clone()),
            _ => {}
        }
        self.stack
            .iter()
            .rev()
            .flat_map(|frame| frame.iter().rev())
            .find(|(p, _)| p == prefix)
            .and_then(|(_, uri)| uri.clone())
    }

    /// Prefixes declared in the innermost scope, in declaration order.
    pub fn declared_prefixes(&self) -> impl Iterator<Item = &Symbol> {
        self.stack
            .last()
            .into_iter()
            .flat_map(|frame| frame.iter().map(|(p, _)| p))
    }

    /// Drops every scope but the base frame.
    pub fn reset(&mut self) {
        self.stack.truncate(1);
        if let Some(base) = self.stack.first_mut() {
            base.clear();
        }
    }
}

impl Default for NamespaceContext {
    fn default() -> Self {
        Self::new()
    }
}
