//! Symbol table for interned names.
//!
//! Element names, attribute names, prefixes and namespace URIs repeat
//! constantly in a document, so the scanner interns them once per session
//! and hands out cheap [`Symbol`] handles. Unlike a pointer-identity
//! intern pool, symbols compare **by value**: two symbols are equal when
//! their text is equal, whichever table (if any) produced them. The
//! reserved-prefix checks in the namespace binder depend on this.

use std::borrow::Borrow;
use std::collections::HashSet;
use std::fmt;
use std::ops::Deref;
use std::rc::Rc;

/// An interned, reference-counted string with value equality.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(Rc<str>);

impl Symbol {
    /// Creates a symbol that is not backed by any table.
    #[must_use]
    pub fn new(s: &str) -> Self {
        Self(Rc::from(s))
    }

    /// Returns the symbol text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Symbol {
    type Target = str;

    fn deref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Symbol {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Symbol {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for Symbol {
    fn eq(&self, other: &str) -> bool {
        &*self.0 == other
    }
}

impl PartialEq<&str> for Symbol {
    fn eq(&self, other: &&str) -> bool {
        &*self.0 == *other
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&*self.0, f)
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A string interning table.
///
/// # Examples
///
/// ```
/// use xmlscan::util::dict::SymbolTable;
///
/// let mut table = SymbolTable::new();
/// let a = table.intern("hello");
/// let b = table.intern("hello");
/// let c = table.intern("world");
///
/// assert_eq!(a, b);
/// assert_ne!(a, c);
/// assert_eq!(a.as_str(), "hello");
/// ```
#[derive(Debug, Default)]
pub struct SymbolTable {
    set: HashSet<Symbol>,
}

impl SymbolTable {
    /// Creates a new empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Interns a string and returns its symbol.
    pub fn intern(&mut self, s: &str) -> Symbol {
        if let Some(existing) = self.set.get(s) {
            return existing.clone();
        }
        let symbol = Symbol::new(s);
        self.set.insert(symbol.clone());
        symbol
    }

    /// Interns a run of characters taken straight from a scan buffer.
    pub fn intern_chars(&mut self, chars: &[char]) -> Symbol {
        let s: String = chars.iter().collect();
        self.intern(&s)
    }

    /// Returns the number of interned strings.
    #[must_use]
    pub fn len(&self) -> usize {
        self.set.len()
    }

    /// Returns `true` if the table contains no interned strings.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.set.is_empty()
    }
}
