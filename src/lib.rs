//! # xmlscan
//!
//! A streaming, entity-aware XML tokenizer and well-formedness scanner.
//! Input is decoded into a stack of character buffers, one per open
//! entity, and scanned a token at a time; structural events go to a
//! [`DocumentHandler`] as they are recognised. There is no tree.
//!
//! The scanner enforces the XML 1.0 and 1.1 well-formedness rules, the
//! namespaces rules when enabled, and configurable resource limits on
//! entity expansion, entity size, name length, element depth and
//! attribute count.
//!
//! ## Quick Start
//!
//! ```
//! use xmlscan::{DocumentHandler, ParseOptions};
//! use xmlscan::util::qname::QName;
//! use xmlscan::document::Attributes;
//!
//! #[derive(Default)]
//! struct Names(Vec<String>);
//!
//! impl DocumentHandler for Names {
//!     fn start_element(&mut self, name: &QName, _attributes: &Attributes) {
//!         self.0.push(name.rawname.to_string());
//!     }
//!     fn empty_element(&mut self, name: &QName, _attributes: &Attributes) {
//!         self.0.push(name.rawname.to_string());
//!     }
//! }
//!
//! let mut names = Names::default();
//! xmlscan::scan_str("<root><child/></root>", &ParseOptions::default(), &mut names).unwrap();
//! assert_eq!(names.0, ["root", "child"]);
//! ```

pub mod document;
pub mod dtd;
pub mod encoding;
pub mod entity;
pub mod error;
pub mod namespace;
pub mod parser;
pub mod scanner;
pub mod security;
pub mod util;

// Re-export primary types at the crate root for convenience.
pub use document::{DocumentHandler, DocumentScanner, EventKind};
pub use entity::InputSource;
pub use error::{ErrorKind, ParseError};
pub use parser::{scan_source, scan_str, ParseOptions};
