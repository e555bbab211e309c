//! The per-entity scanning frame.

use super::source::{InputSource, ResourceIdentifier};

/// What an open entity is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// The document entity (`[xml]`).
    Document,
    /// A general entity referenced from content or an attribute value.
    General,
    /// A parameter entity referenced from the DTD.
    Parameter,
    /// The external DTD subset (`[dtd]`).
    ExternalSubset,
}

/// One open input context on the entity stack.
///
/// The buffer always has `ch.len()` slots; only `ch[..count]` holds input
/// and `ch[position..count]` is still unread, so
/// `0 <= position <= count <= ch.len()` at every point. `base_char_offset`
/// is the absolute offset of `ch[0]` within the entity, which keeps
/// location reporting exact across window shifts.
#[derive(Debug)]
pub struct ScannedEntity {
    /// Entity name, or a pseudo-name such as `[xml]` or `[dtd]`.
    pub name: String,
    pub kind: EntityKind,
    pub(crate) source: InputSource,
    pub(crate) ch: Vec<char>,
    pub(crate) position: usize,
    pub(crate) count: usize,
    /// Start of the token being scanned, kept across refills.
    pub(crate) start_position: usize,
    pub(crate) line: u32,
    pub(crate) column: u32,
    pub(crate) base_char_offset: usize,
    /// Quote characters do not end a literal while scanning this entity.
    pub(crate) literal: bool,
    /// Newline normalization and the external character rules apply.
    pub(crate) is_external: bool,
    /// Refills may read more than one character at a time.
    pub(crate) may_read_chunks: bool,
    /// General (as opposed to parameter) entity, for limit bucketing.
    pub(crate) is_ge: bool,
    /// The source reached end of input.
    pub(crate) exhausted: bool,
    /// Encoding named by the entity's XML or text declaration.
    pub(crate) encoding: Option<String>,
    /// Element depth when the entity was opened.
    pub(crate) element_depth: usize,
}

impl ScannedEntity {
    /// Creates a frame at line 1, column 1 with an empty buffer.
    pub(crate) fn new(
        name: impl Into<String>,
        kind: EntityKind,
        source: InputSource,
        is_external: bool,
        buffer_size: usize,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            source,
            ch: vec!['\0'; buffer_size.max(1)],
            position: 0,
            count: 0,
            start_position: 0,
            line: 1,
            column: 1,
            base_char_offset: 0,
            literal: false,
            is_external,
            may_read_chunks: true,
            is_ge: kind == EntityKind::General,
            exhausted: false,
            encoding: None,
            element_depth: 0,
        }
    }

    /// Number of unread characters in the buffer.
    #[must_use]
    pub fn available(&self) -> usize {
        self.count - self.position
    }

    /// Identifiers of the underlying source.
    #[must_use]
    pub fn identifier(&self) -> &ResourceIdentifier {
        self.source.identifier()
    }

    /// Current line number (1-based).
    #[must_use]
    pub fn line(&self) -> u32 {
        self.line
    }

    /// Current column number (1-based).
    #[must_use]
    pub fn column(&self) -> u32 {
        self.column
    }

    /// Absolute character offset of the next unread character.
    #[must_use]
    pub fn char_offset(&self) -> usize {
        self.base_char_offset + self.position
    }

    /// Returns `true` if this frame is inside a literal value.
    #[must_use]
    pub fn is_literal(&self) -> bool {
        self.literal
    }

    /// Returns `true` if this frame reads an external resource.
    #[must_use]
    pub fn is_external(&self) -> bool {
        self.is_external
    }

    /// Capacity of the character buffer.
    #[must_use]
    pub fn buffer_len(&self) -> usize {
        self.ch.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_frame_defaults() {
        let e = ScannedEntity::new(
            "[xml]",
            EntityKind::Document,
            InputSource::from_string("<a/>"),
            true,
            16,
        );
        assert_eq!(e.available(), 0);
        assert_eq!((e.line(), e.column()), (1, 1));
        assert_eq!(e.char_offset(), 0);
        assert_eq!(e.buffer_len(), 16);
        assert!(!e.is_ge);
        assert!(e.is_external());
        assert!(!e.is_literal());
    }

    #[test]
    fn test_general_entities_are_bucketed_as_ge() {
        let e = ScannedEntity::new(
            "foo",
            EntityKind::General,
            InputSource::from_string("bar"),
            false,
            0,
        );
        assert!(e.is_ge);
        assert_eq!(e.buffer_len(), 1);
    }
}
