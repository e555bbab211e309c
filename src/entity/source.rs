//! Character sources for scanned entities.
//!
//! An [`InputSource`] is the physical input behind one entity: either text
//! that is already decoded (internal entities, strings handed over by the
//! caller) or a byte stream decoded on demand through
//! [`StreamDecoder`](crate::encoding::StreamDecoder).
//!
//! Byte sources never decode ahead of what the scanner asks for: a request
//! for `n` characters decodes at most `n` bytes, and every supported
//! encoding produces at most one character per byte. This keeps the bytes
//! after an XML declaration undecoded until the declared encoding is known.

use std::fmt;
use std::io::{self, Read};

use crate::encoding::{EncodingError, StreamDecoder};

const RAW_CHUNK: usize = 8192;

/// Identifiers of an external resource.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceIdentifier {
    /// The public identifier, if any.
    pub public_id: Option<String>,
    /// The system identifier exactly as written in the document.
    pub literal_system_id: Option<String>,
    /// The system identifier of the resource the reference appeared in.
    pub base_system_id: Option<String>,
    /// The literal system identifier resolved against the base.
    pub expanded_system_id: Option<String>,
}

impl ResourceIdentifier {
    /// Builds an identifier, expanding the literal system id against `base`.
    #[must_use]
    pub fn new(
        public_id: Option<String>,
        literal_system_id: Option<String>,
        base_system_id: Option<String>,
    ) -> Self {
        let expanded_system_id = literal_system_id
            .as_deref()
            .map(|literal| expand_system_id(literal, base_system_id.as_deref()));
        Self {
            public_id,
            literal_system_id,
            base_system_id,
            expanded_system_id,
        }
    }

    /// The most specific system id available.
    #[must_use]
    pub fn system_id(&self) -> Option<&str> {
        self.expanded_system_id
            .as_deref()
            .or(self.literal_system_id.as_deref())
    }
}

/// Resolves a (possibly relative) system identifier against a base.
///
/// Absolute identifiers (with a URI scheme or a leading `/`) are returned
/// unchanged. A relative identifier replaces the last path segment of the
/// base.
#[must_use]
pub fn expand_system_id(literal: &str, base: Option<&str>) -> String {
    let has_scheme = literal
        .split_once(':')
        .is_some_and(|(scheme, _)| {
            scheme.len() > 1
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        });
    if has_scheme || literal.starts_with('/') {
        return literal.to_string();
    }
    match base.and_then(|b| b.rfind('/').map(|pos| &b[..=pos])) {
        Some(dir) => format!("{dir}{literal}"),
        None => literal.to_string(),
    }
}

/// Failure while pulling characters out of a source.
#[derive(Debug)]
pub enum SourceError {
    /// The underlying reader failed.
    Io(io::Error),
    /// The bytes could not be decoded.
    Encoding(EncodingError),
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io(e) => write!(f, "i/o error: {e}"),
            Self::Encoding(e) => e.fmt(f),
        }
    }
}

impl std::error::Error for SourceError {}

impl From<io::Error> for SourceError {
    fn from(e: io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<EncodingError> for SourceError {
    fn from(e: EncodingError) -> Self {
        Self::Encoding(e)
    }
}

enum CharReader {
    Text { text: String, pos: usize },
    Bytes(Box<ByteReader>),
}

struct ByteReader {
    reader: Box<dyn Read>,
    decoder: StreamDecoder,
    raw: Vec<u8>,
    raw_pos: usize,
    raw_len: usize,
    decoded: String,
    decoded_pos: usize,
    eof: bool,
    finished: bool,
}

impl ByteReader {
    fn new(reader: Box<dyn Read>, decoder: StreamDecoder) -> Self {
        Self {
            reader,
            decoder,
            raw: vec![0; RAW_CHUNK],
            raw_pos: 0,
            raw_len: 0,
            decoded: String::new(),
            decoded_pos: 0,
            eof: false,
            finished: false,
        }
    }

    fn read_chars(&mut self, out: &mut [char]) -> Result<usize, SourceError> {
        let mut n = 0;
        while n < out.len() {
            if let Some(c) = self.decoded[self.decoded_pos..].chars().next() {
                out[n] = c;
                n += 1;
                self.decoded_pos += c.len_utf8();
                continue;
            }
            self.decoded.clear();
            self.decoded_pos = 0;
            if self.finished {
                break;
            }
            if self.raw_pos == self.raw_len {
                if self.eof {
                    self.decoder.decode(&[], &mut self.decoded, true)?;
                    self.finished = true;
                    continue;
                }
                self.raw_len = loop {
                    match self.reader.read(&mut self.raw) {
                        Ok(len) => break len,
                        Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
                        Err(e) => return Err(e.into()),
                    }
                };
                self.raw_pos = 0;
                if self.raw_len == 0 {
                    self.eof = true;
                }
                continue;
            }
            let want = (out.len() - n).min(self.raw_len - self.raw_pos);
            let end = self.raw_pos + want;
            let used = self
                .decoder
                .decode(&self.raw[self.raw_pos..end], &mut self.decoded, false)?;
            self.raw_pos += used;
        }
        Ok(n)
    }

    fn has_pending_text(&self) -> bool {
        self.decoded_pos < self.decoded.len()
    }
}

/// The physical input behind one entity.
pub struct InputSource {
    identifier: ResourceIdentifier,
    reader: CharReader,
}

impl InputSource {
    /// Creates a source over already-decoded text.
    #[must_use]
    pub fn from_string(text: impl Into<String>) -> Self {
        Self {
            identifier: ResourceIdentifier::default(),
            reader: CharReader::Text {
                text: text.into(),
                pos: 0,
            },
        }
    }

    /// Creates a source over raw bytes, decoded as UTF-8 unless a byte
    /// order mark or the document's encoding declaration says otherwise.
    #[must_use]
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self::from_reader(io::Cursor::new(bytes))
    }

    /// Creates a source over a byte stream, decoded as UTF-8 unless a byte
    /// order mark or the document's encoding declaration says otherwise.
    #[must_use]
    pub fn from_reader(reader: impl Read + 'static) -> Self {
        Self {
            identifier: ResourceIdentifier::default(),
            reader: CharReader::Bytes(Box::new(ByteReader::new(
                Box::new(reader),
                StreamDecoder::sniffing(),
            ))),
        }
    }

    /// Forces the encoding of a byte source. Text sources are unaffected.
    ///
    /// # Errors
    ///
    /// Returns `EncodingError` if the label is not recognized.
    pub fn with_encoding(mut self, label: &str) -> Result<Self, EncodingError> {
        if let CharReader::Bytes(bytes) = &mut self.reader {
            bytes.decoder = StreamDecoder::for_label(label)?;
        }
        Ok(self)
    }

    /// Sets the system identifier reported for this source.
    #[must_use]
    pub fn with_system_id(mut self, system_id: impl Into<String>) -> Self {
        let system_id = system_id.into();
        self.identifier.expanded_system_id = Some(system_id.clone());
        self.identifier.literal_system_id = Some(system_id);
        self
    }

    /// Sets the public identifier reported for this source.
    #[must_use]
    pub fn with_public_id(mut self, public_id: impl Into<String>) -> Self {
        self.identifier.public_id = Some(public_id.into());
        self
    }

    /// Replaces all identifiers at once.
    #[must_use]
    pub fn with_identifier(mut self, identifier: ResourceIdentifier) -> Self {
        self.identifier = identifier;
        self
    }

    /// Fills in identifiers the resolver left empty.
    pub(crate) fn inherit_identifier(&mut self, identifier: &ResourceIdentifier) {
        if self.identifier.public_id.is_none() {
            self.identifier.public_id.clone_from(&identifier.public_id);
        }
        if self.identifier.literal_system_id.is_none() {
            self.identifier
                .literal_system_id
                .clone_from(&identifier.literal_system_id);
            self.identifier
                .expanded_system_id
                .clone_from(&identifier.expanded_system_id);
        }
        if self.identifier.base_system_id.is_none() {
            self.identifier
                .base_system_id
                .clone_from(&identifier.base_system_id);
        }
    }

    /// The identifiers of this source.
    #[must_use]
    pub fn identifier(&self) -> &ResourceIdentifier {
        &self.identifier
    }

    /// The name of the decoder's encoding, for byte sources.
    #[must_use]
    pub fn encoding_name(&self) -> Option<&'static str> {
        match &self.reader {
            CharReader::Text { .. } => None,
            CharReader::Bytes(bytes) => Some(bytes.decoder.encoding_name()),
        }
    }

    /// Reads up to `out.len()` characters. Returns `0` at end of input.
    pub(crate) fn read_chars(&mut self, out: &mut [char]) -> Result<usize, SourceError> {
        match &mut self.reader {
            CharReader::Text { text, pos } => {
                let mut n = 0;
                for c in text[*pos..].chars().take(out.len()) {
                    out[n] = c;
                    n += 1;
                    *pos += c.len_utf8();
                }
                Ok(n)
            }
            CharReader::Bytes(bytes) => bytes.read_chars(out),
        }
    }

    /// Switches a byte source to the encoding named by its declaration.
    ///
    /// Returns `true` if the decoder changed.
    pub(crate) fn switch_encoding(&mut self, label: &str) -> Result<bool, EncodingError> {
        match &mut self.reader {
            CharReader::Text { .. } => {
                crate::encoding::lookup(label)?;
                Ok(false)
            }
            CharReader::Bytes(bytes) => {
                if bytes.has_pending_text() {
                    return Ok(false);
                }
                bytes.decoder.switch_encoding(label)
            }
        }
    }
}

impl fmt::Debug for InputSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.reader {
            CharReader::Text { .. } => "text",
            CharReader::Bytes(_) => "bytes",
        };
        f.debug_struct("InputSource")
            .field("identifier", &self.identifier)
            .field("kind", &kind)
            .finish()
    }
}

impl From<&str> for InputSource {
    fn from(text: &str) -> Self {
        Self::from_string(text)
    }
}

impl From<String> for InputSource {
    fn from(text: String) -> Self {
        Self::from_string(text)
    }
}
