//! Lexical productions scanned directly over the active entity's buffer.
//!
//! Every operation refills transparently when a token straddles the end of
//! the buffer. None of them leaves the active entity: running out of input
//! shows up as "no match" or `None` and the driver decides what to do.

use super::chars::{
    is_name_char, is_name_start_char, is_ncname_char, is_ncname_start_char, XmlVersion,
};
use super::{EntityScanner, NameType};
use crate::error::{ErrorKind, ParseError};
use crate::security::Limit;
use crate::util::dict::Symbol;
use crate::util::qname::QName;

impl EntityScanner {
    /// Returns `true` if `c` is a newline sequence start that is folded to
    /// `\n` in the active entity.
    fn is_folded_newline(&self, c: char) -> bool {
        self.entity.is_external
            && (c == '\r'
                || (self.version == XmlVersion::V1_1 && matches!(c, '\u{85}' | '\u{2028}')))
    }

    /// The next character, with newline sequences reported as `\n`, or
    /// `None` at the end of the active entity.
    pub fn peek_char(&mut self) -> Result<Option<char>, ParseError> {
        if !self.ensure_available(1, false)? {
            return Ok(None);
        }
        let c = self.entity.ch[self.entity.position];
        Ok(Some(if self.is_folded_newline(c) { '\n' } else { c }))
    }

    /// The raw character `n` places ahead, without consuming anything.
    pub fn peek_at(&mut self, n: usize) -> Result<Option<char>, ParseError> {
        if !self.ensure_available(n + 1, false)? {
            return Ok(None);
        }
        Ok(Some(self.entity.ch[self.entity.position + n]))
    }

    /// Consumes one character. `\r\n`, `\r` (and in XML 1.1 `\r\u{85}`,
    /// `\u{85}`, `\u{2028}`) come back as a single `\n` in external
    /// entities.
    pub fn scan_char(&mut self, nt: Option<NameType>) -> Result<Option<char>, ParseError> {
        if !self.ensure_available(1, false)? {
            return Ok(None);
        }
        let mut c = self.entity.ch[self.entity.position];
        self.entity.position += 1;
        if c == '\n' {
            self.entity.line += 1;
            self.entity.column = 1;
        } else if self.is_folded_newline(c) {
            if c == '\r' && self.ensure_available(1, false)? {
                let next = self.entity.ch[self.entity.position];
                if next == '\n' || (self.version == XmlVersion::V1_1 && next == '\u{85}') {
                    self.entity.position += 1;
                }
            }
            c = '\n';
            self.entity.line += 1;
            self.entity.column = 1;
        } else {
            self.entity.column += 1;
        }
        self.check_entity_limit(nt, 1)?;
        Ok(Some(c))
    }

    /// Consumes `c` if it is next. A `\n` also matches a folded newline.
    pub fn skip_char(&mut self, c: char, nt: Option<NameType>) -> Result<bool, ParseError> {
        if self.peek_char()? == Some(c) {
            self.scan_char(nt)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Consumes a run of whitespace. Returns `true` if anything was skipped.
    pub fn skip_spaces(&mut self) -> Result<bool, ParseError> {
        let mut skipped = false;
        let mut plain = 0;
        while self.ensure_available(1, false)? {
            let c = self.entity.ch[self.entity.position];
            if c == '\n' || self.is_folded_newline(c) {
                self.check_entity_limit(None, plain)?;
                plain = 0;
                self.scan_char(None)?;
            } else if matches!(c, ' ' | '\t' | '\r') {
                self.entity.position += 1;
                self.entity.column += 1;
                plain += 1;
            } else {
                break;
            }
            skipped = true;
        }
        self.check_entity_limit(None, plain)?;
        Ok(skipped)
    }

    /// Returns `true` if the unread input starts with `s`. `s` must not
    /// contain newline characters.
    pub fn looking_at(&mut self, s: &str) -> Result<bool, ParseError> {
        let len = s.chars().count();
        if !self.ensure_available(len, false)? {
            return Ok(false);
        }
        let at = self.entity.position;
        Ok(s.chars()
            .zip(&self.entity.ch[at..at + len])
            .all(|(a, &b)| a == b))
    }

    /// Consumes `s` if the unread input starts with it.
    pub fn skip_string(&mut self, s: &str) -> Result<bool, ParseError> {
        if !self.looking_at(s)? {
            return Ok(false);
        }
        let len = s.chars().count();
        self.entity.position += len;
        self.entity.column += len as u32;
        self.check_entity_limit(None, len)?;
        Ok(true)
    }

    // -- Names --

    /// Scans a maximal run of characters accepted by `start` then `rest`,
    /// keeping the token in the buffer across refills. Returns the token's
    /// range in the buffer, or `None` if the first character does not
    /// qualify.
    fn scan_name_chars(
        &mut self,
        start: fn(char) -> bool,
        rest: fn(char) -> bool,
    ) -> Result<Option<(usize, usize)>, ParseError> {
        if !self.ensure_available(1, false)? {
            return Ok(None);
        }
        if !start(self.entity.ch[self.entity.position]) {
            return Ok(None);
        }
        self.mark_token_start();
        self.entity.position += 1;
        loop {
            if self.entity.position == self.entity.count {
                let len = self.entity.position - self.entity.start_position;
                if len == self.entity.ch.len() {
                    // About to grow the buffer for this name alone.
                    self.check_value(Limit::MaxName, len)?;
                }
                if self.refill(self.entity.start_position)?.end_of_entity {
                    break;
                }
            }
            if !rest(self.entity.ch[self.entity.position]) {
                break;
            }
            self.entity.position += 1;
        }
        let start = self.entity.start_position;
        let end = self.entity.position;
        self.entity.column += (end - start) as u32;
        Ok(Some((start, end)))
    }

    fn finish_name(
        &mut self,
        range: Option<(usize, usize)>,
        nt: NameType,
    ) -> Result<Option<Symbol>, ParseError> {
        let Some((start, end)) = range else {
            return Ok(None);
        };
        self.check_value(Limit::MaxName, end - start)?;
        self.check_entity_limit(Some(nt), end - start)?;
        Ok(Some(self.symbols.intern_chars(&self.entity.ch[start..end])))
    }

    /// Scans a `Name`.
    pub fn scan_name(&mut self, nt: NameType) -> Result<Option<Symbol>, ParseError> {
        let range = self.scan_name_chars(is_name_start_char, is_name_char)?;
        self.finish_name(range, nt)
    }

    /// Scans an `NCName`.
    pub fn scan_ncname(&mut self, nt: NameType) -> Result<Option<Symbol>, ParseError> {
        let range = self.scan_name_chars(is_ncname_start_char, is_ncname_char)?;
        self.finish_name(range, nt)
    }

    /// Scans an `Nmtoken`.
    pub fn scan_nmtoken(&mut self, nt: NameType) -> Result<Option<Symbol>, ParseError> {
        let range = self.scan_name_chars(is_name_char, is_name_char)?;
        self.finish_name(range, nt)
    }

    /// Scans a qualified name, splitting it at the first colon. A second
    /// colon ends the name and is left unread.
    ///
    /// The name-length limit applies to the prefix and the local part
    /// separately; an unprefixed name is measured as a whole.
    pub fn scan_qname(&mut self, nt: NameType) -> Result<Option<QName>, ParseError> {
        if !self.ensure_available(1, false)? {
            return Ok(None);
        }
        if !is_name_start_char(self.entity.ch[self.entity.position]) {
            return Ok(None);
        }
        self.mark_token_start();
        // Colon offset relative to the token start, stable across shifts.
        let mut colon: Option<usize> = None;
        loop {
            if self.entity.position == self.entity.count {
                let len = self.entity.position - self.entity.start_position;
                if len == self.entity.ch.len() {
                    let segment = colon.map_or(len, |c| len - c - 1);
                    self.check_value(Limit::MaxName, segment)?;
                }
                if self.refill(self.entity.start_position)?.end_of_entity {
                    break;
                }
            }
            let c = self.entity.ch[self.entity.position];
            if !is_name_char(c) {
                break;
            }
            if c == ':' {
                if colon.is_some() {
                    break;
                }
                let offset = self.entity.position - self.entity.start_position;
                self.check_value(Limit::MaxName, offset)?;
                colon = Some(offset);
            }
            self.entity.position += 1;
        }

        let start = self.entity.start_position;
        let end = self.entity.position;
        let length = end - start;
        self.entity.column += length as u32;
        let rawname = self.symbols.intern_chars(&self.entity.ch[start..end]);
        let qname = match colon {
            Some(offset) => {
                let local_len = length - offset - 1;
                self.check_value(Limit::MaxName, offset)?;
                let local_start = start + offset + 1;
                let local_ok = offset > 0
                    && local_len > 0
                    && is_ncname_start_char(self.entity.ch[local_start]);
                if !local_ok {
                    self.report_fatal(
                        ErrorKind::Namespace,
                        "IllegalQName",
                        format!("element or attribute \"{rawname}\" does not match the QName production"),
                    )?;
                }
                self.check_value(Limit::MaxName, local_len)?;
                let prefix = self.symbols.intern_chars(&self.entity.ch[start..start + offset]);
                let localpart = self.symbols.intern_chars(&self.entity.ch[local_start..end]);
                QName::new(Some(prefix), localpart, rawname)
            }
            None => {
                self.check_value(Limit::MaxName, length)?;
                QName::unprefixed(rawname)
            }
        };
        self.check_entity_limit(Some(nt), length)?;
        Ok(Some(qname))
    }

    // -- Runs of text --

    /// Shared loop of the content and literal scanners. Newline sequences
    /// are rewritten to `\n` inside the buffer, then each run is measured
    /// against the entity limits before it is appended to `out`.
    ///
    /// Stops in front of a character for which `stop` holds or which is
    /// not a legal literal character, returning it unread; returns `None`
    /// at the end of the entity. At most `room` characters are appended;
    /// once they are, the next character is returned unread.
    fn scan_text_run(
        &mut self,
        out: &mut String,
        nt: Option<NameType>,
        measure_name: bool,
        room: usize,
        stop: &dyn Fn(char) -> bool,
    ) -> Result<Option<char>, ParseError> {
        let external = self.entity.is_external;
        let v11 = self.version == XmlVersion::V1_1;
        let mut total = 0;
        loop {
            if !self.ensure_available(1, false)? {
                return Ok(None);
            }
            let start = self.entity.position;
            let mut w = start;
            let mut r = start;
            let mut stopped = None;
            let mut need_more = false;
            while r < self.entity.count {
                let c = self.entity.ch[r];
                if total + (w - start) >= room {
                    stopped = Some(c);
                    break;
                }
                if c == '\n' || (external && (c == '\r' || (v11 && matches!(c, '\u{85}' | '\u{2028}')))) {
                    if c == '\r' {
                        if r + 1 == self.entity.count && !self.entity.exhausted {
                            // Cannot tell `\r` from `\r\n` yet.
                            need_more = true;
                            break;
                        }
                        r += 1;
                        if r < self.entity.count {
                            let next = self.entity.ch[r];
                            if next == '\n' || (v11 && next == '\u{85}') {
                                r += 1;
                            }
                        }
                    } else {
                        r += 1;
                    }
                    self.entity.ch[w] = '\n';
                    w += 1;
                    self.entity.line += 1;
                    self.entity.column = 1;
                    continue;
                }
                if stop(c) || !self.version.is_literal_char(c, external) {
                    stopped = Some(c);
                    break;
                }
                self.entity.ch[w] = c;
                w += 1;
                r += 1;
                self.entity.column += 1;
            }
            self.entity.position = r;
            let len = w - start;
            if len > 0 {
                self.check_entity_limit(nt, len)?;
                total += len;
                if measure_name {
                    self.check_value(Limit::MaxName, total)?;
                }
                out.extend(&self.entity.ch[start..w]);
            }
            if stopped.is_some() {
                return Ok(stopped);
            }
            if need_more {
                self.refill(self.entity.position)?;
            }
        }
    }

    /// Scans character data up to markup (`<`), a reference (`&`), a `]`
    /// (which may start `]]>`), or an illegal character.
    ///
    /// With a `chunk_limit`, at most that many characters are appended and
    /// the run may end in front of an ordinary data character.
    ///
    /// Returns the character that ended the run, unread, or `None` at the
    /// end of the active entity.
    pub fn scan_content(
        &mut self,
        out: &mut String,
        chunk_limit: Option<usize>,
    ) -> Result<Option<char>, ParseError> {
        let room = chunk_limit.unwrap_or(usize::MAX);
        self.scan_text_run(out, None, false, room, &|c| matches!(c, '<' | '&' | ']'))
    }

    /// Scans a quoted literal up to `quote`, a reference (`&` or `%`), a
    /// `<`, or an illegal character. The quote only ends the run when the
    /// active entity is not the body of an expanded literal, so quotes
    /// inside an internal entity's replacement text are data.
    ///
    /// Returns the character that ended the run, unread, or `None` at the
    /// end of the active entity.
    pub fn scan_literal(
        &mut self,
        quote: char,
        out: &mut String,
        is_ns_uri: bool,
    ) -> Result<Option<char>, ParseError> {
        let quote_ends = !self.entity.literal || self.entity.is_external;
        self.scan_text_run(out, None, is_ns_uri, usize::MAX, &|c| {
            (c == quote && quote_ends) || matches!(c, '%' | '&' | '<')
        })
    }

    /// Scans raw data up to `delimiter`, which is consumed but not copied.
    ///
    /// Returns `false` once the delimiter has been consumed and `true` if
    /// scanning stopped early, either in front of an illegal character
    /// (left unread for the caller to report) or because `chunk_limit`
    /// characters were collected.
    ///
    /// # Errors
    ///
    /// Reaching the end of the entity before the delimiter is a premature
    /// end of input.
    pub fn scan_data(
        &mut self,
        delimiter: &str,
        out: &mut String,
        chunk_limit: Option<usize>,
        nt: NameType,
    ) -> Result<bool, ParseError> {
        let delim: Vec<char> = delimiter.chars().collect();
        let dl = delim.len();
        let external = self.entity.is_external;
        let v11 = self.version == XmlVersion::V1_1;
        let mut collected = 0;
        loop {
            if !self.ensure_available(dl, false)? {
                return Err(self.premature_eof(&nt.to_string()));
            }
            let start = self.entity.position;
            let mut w = start;
            let mut r = start;
            let mut found = false;
            let mut stopped = false;
            let mut need_more = false;
            while r + dl <= self.entity.count {
                if self.entity.ch[r..r + dl] == delim[..] {
                    found = true;
                    break;
                }
                if chunk_limit.is_some_and(|limit| collected + (w - start) >= limit) {
                    stopped = true;
                    break;
                }
                let c = self.entity.ch[r];
                if c == '\n' || (external && (c == '\r' || (v11 && matches!(c, '\u{85}' | '\u{2028}')))) {
                    if c == '\r' && r + 1 == self.entity.count && !self.entity.exhausted {
                        // Cannot tell `\r` from `\r\n` yet.
                        need_more = true;
                        break;
                    }
                    r += 1;
                    if c == '\r' && r < self.entity.count {
                        let next = self.entity.ch[r];
                        if next == '\n' || (v11 && next == '\u{85}') {
                            r += 1;
                        }
                    }
                    self.entity.ch[w] = '\n';
                    w += 1;
                    self.entity.line += 1;
                    self.entity.column = 1;
                    continue;
                }
                if !self.version.is_literal_char(c, external) {
                    stopped = true;
                    break;
                }
                self.entity.ch[w] = c;
                w += 1;
                r += 1;
                self.entity.column += 1;
            }
            self.entity.position = r;
            let len = w - start;
            if len > 0 {
                self.check_entity_limit(Some(nt), len)?;
                collected += len;
                out.extend(&self.entity.ch[start..w]);
            }
            if found {
                self.entity.position += dl;
                self.entity.column += dl as u32;
                self.check_entity_limit(Some(nt), dl)?;
                return Ok(false);
            }
            if stopped {
                return Ok(true);
            }
            if need_more {
                self.refill(self.entity.position)?;
                continue;
            }
            // Fewer than `dl` chars left in the buffer: keep them and load
            // more so a delimiter split by the refill is still seen.
            if self.entity.available() < dl && self.entity.exhausted {
                return Err(self.premature_eof(&nt.to_string()));
            }
            self.refill(self.entity.position)?;
        }
    }
}
