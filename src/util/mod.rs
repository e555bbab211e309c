//! Utility modules for xmlscan.
//!
//! Contains the symbol table used to intern names and the `QName` type.

pub mod dict;
pub mod qname;
