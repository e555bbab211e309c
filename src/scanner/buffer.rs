//! Entity stack maintenance and buffer refilling.

use std::mem;

use super::EntityScanner;
use crate::entity::{EntityKind, InputSource, ScannedEntity};
use crate::error::{ErrorKind, ParseError};
use crate::security::Limit;

/// Outcome of one physical load into the active entity's buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Refill {
    /// How far the retained window moved towards the start of the buffer.
    pub shifted: usize,
    /// The source had nothing left to give.
    pub end_of_entity: bool,
}

impl EntityScanner {
    // -- Entity stack --

    /// Opens `source` as a new entity on top of the stack. The pushed
    /// entity becomes the active one immediately.
    pub fn push_entity(
        &mut self,
        name: &str,
        kind: EntityKind,
        source: InputSource,
        is_external: bool,
    ) -> Result<(), ParseError> {
        if matches!(kind, EntityKind::General | EntityKind::Parameter) {
            self.check_limit(Limit::EntityExpansion, 1)?;
        }
        let mut entity = ScannedEntity::new(name, kind, source, is_external, self.buffer_size);
        // External entities may begin with a text declaration naming the
        // encoding, so the decoder must not run ahead of it.
        entity.may_read_chunks = !is_external;
        log::trace!(
            "push entity {name} ({kind:?}, external: {is_external}) at depth {}",
            self.stack.len() + 1
        );
        self.stack.push(mem::replace(&mut self.entity, entity));
        Ok(())
    }

    /// Closes the active entity and resumes its parent.
    ///
    /// # Errors
    ///
    /// Fails with `UnexpectedEndOfInput` when only the document entity is
    /// open.
    pub fn pop_entity(&mut self) -> Result<ScannedEntity, ParseError> {
        let Some(parent) = self.stack.pop() else {
            return Err(self.error(
                ErrorKind::PrematureEof,
                "UnexpectedEndOfInput",
                "no entity left to close",
            ));
        };
        let finished = mem::replace(&mut self.entity, parent);
        match finished.kind {
            EntityKind::General => self
                .limits
                .end_entity(Limit::GeneralEntitySize, &finished.name),
            EntityKind::Parameter => self
                .limits
                .end_entity(Limit::ParameterEntitySize, &finished.name),
            EntityKind::Document | EntityKind::ExternalSubset => {}
        }
        log::trace!(
            "pop entity {} back to {} at depth {}",
            finished.name,
            self.entity.name,
            self.stack.len()
        );
        Ok(finished)
    }

    /// Marks the active entity as the body of a literal value, so the
    /// quote characters it contains do not close the outer literal.
    pub(crate) fn set_literal(&mut self, literal: bool) {
        self.entity.literal = literal;
    }

    /// Records the element depth at which the active entity was opened.
    pub(crate) fn set_element_depth(&mut self, depth: usize) {
        self.entity.element_depth = depth;
    }

    // -- Buffer --

    /// Loads more characters into the active entity's buffer.
    ///
    /// Everything before `keep_from` is discarded: the window
    /// `ch[keep_from..count]` is moved to the start of the buffer and all
    /// positions are shifted by the same amount. A full buffer is doubled
    /// first, so a token longer than the buffer keeps growing it.
    pub fn refill(&mut self, keep_from: usize) -> Result<Refill, ParseError> {
        let e = &mut self.entity;
        let keep_from = keep_from.min(e.position);
        if keep_from > 0 {
            e.ch.copy_within(keep_from..e.count, 0);
            e.count -= keep_from;
            e.position -= keep_from;
            e.start_position = e.start_position.saturating_sub(keep_from);
            e.base_char_offset += keep_from;
        }
        let shifted = keep_from;
        if e.exhausted {
            return Ok(Refill {
                shifted,
                end_of_entity: true,
            });
        }
        if e.count == e.ch.len() {
            let len = e.ch.len() * 2;
            log::trace!("growing buffer of {} to {len} chars", e.name);
            e.ch.resize(len, '\0');
        }
        let room = e.ch.len() - e.count;
        let want = if e.may_read_chunks { room } else { 1 };
        let start = e.count;
        let read = e.source.read_chars(&mut e.ch[start..start + want]);
        let n = match read {
            Ok(n) => n,
            Err(err) => return Err(self.source_error(err)),
        };
        let e = &mut self.entity;
        e.count += n;
        if n == 0 {
            e.exhausted = true;
        }
        Ok(Refill {
            shifted,
            end_of_entity: n == 0,
        })
    }

    /// Makes sure at least `min` unread characters are buffered, refilling
    /// as needed. With `from_current_token`, the text from the start of the
    /// current token is kept in the buffer as well.
    ///
    /// Returns `false` if the entity ends first.
    pub fn ensure_available(
        &mut self,
        min: usize,
        from_current_token: bool,
    ) -> Result<bool, ParseError> {
        while self.entity.available() < min {
            if self.entity.exhausted {
                return Ok(false);
            }
            let keep = if from_current_token {
                self.entity.start_position
            } else {
                self.entity.position
            };
            self.refill(keep)?;
        }
        Ok(true)
    }

    /// Returns `true` if the active entity has no characters left.
    pub fn at_end_of_entity(&mut self) -> Result<bool, ParseError> {
        Ok(!self.ensure_available(1, false)?)
    }

    /// Marks the current position as the start of a token.
    pub(crate) fn mark_token_start(&mut self) {
        self.entity.start_position = self.entity.position;
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::scanner;
    use super::*;

    #[test]
    fn test_refill_loads_chunks() {
        let mut s = scanner("abcdef", 4);
        let r = s.refill(0).unwrap();
        assert!(!r.end_of_entity);
        assert_eq!(s.current().available(), 4);
    }

    #[test]
    fn test_refill_one_char_before_declaration() {
        let mut s = scanner("abcdef", 4);
        s.set_may_read_chunks(false);
        s.refill(0).unwrap();
        assert_eq!(s.current().available(), 1);
    }

    #[test]
    fn test_refill_shifts_and_tracks_offset() {
        let mut s = scanner("abcdefgh", 4);
        s.refill(0).unwrap();
        s.entity.position = 3;
        let r = s.refill(3).unwrap();
        assert_eq!(r.shifted, 3);
        assert_eq!(s.entity.position, 0);
        assert_eq!(s.entity.ch[0], 'd');
        assert_eq!(s.location().char_offset, 3);
        assert_eq!(s.current().available(), 4);
    }

    #[test]
    fn test_refill_doubles_full_buffer() {
        let mut s = scanner("abcdefgh", 2);
        s.refill(0).unwrap();
        s.mark_token_start();
        s.entity.position = 2;
        s.refill(0).unwrap();
        assert_eq!(s.current().buffer_len(), 4);
        assert_eq!(&s.entity.ch[..4], &['a', 'b', 'c', 'd']);
    }

    #[test]
    fn test_ensure_available_reports_end_of_entity() {
        let mut s = scanner("ab", 8);
        assert!(s.ensure_available(2, false).unwrap());
        assert!(!s.ensure_available(3, false).unwrap());
        s.entity.position = 2;
        assert!(s.at_end_of_entity().unwrap());
    }

    #[test]
    fn test_push_and_pop_entity() {
        let mut s = scanner("<a/>", 8);
        s.push_entity("foo", EntityKind::General, InputSource::from_string("bar"), false)
            .unwrap();
        assert_eq!(s.depth(), 1);
        assert_eq!(s.current().name, "foo");
        assert!(s.is_entity_open("foo", EntityKind::General));
        let popped = s.pop_entity().unwrap();
        assert_eq!(popped.name, "foo");
        assert_eq!(s.depth(), 0);
        assert_eq!(s.limit_analyzer().value(Limit::EntityExpansion), 1);
    }

    #[test]
    fn test_pop_document_entity_fails() {
        let mut s = scanner("<a/>", 8);
        let err = s.pop_entity().unwrap_err();
        assert_eq!(err.code, "UnexpectedEndOfInput");
    }
}
