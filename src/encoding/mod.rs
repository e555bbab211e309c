//! Streaming character decoding.
//!
//! Byte-oriented input sources decode through [`StreamDecoder`], a thin
//! wrapper around an `encoding_rs` streaming decoder. Encoding
//! auto-detection is limited to what `encoding_rs` does by itself: a
//! decoder opened without an explicit label starts as UTF-8 and sniffs a
//! UTF-8 or UTF-16 byte order mark.
//!
//! A document whose XML declaration names a different ASCII-compatible
//! encoding may switch the decoder for the remaining bytes through
//! [`StreamDecoder::switch_encoding`]. The entity scanner makes this safe by
//! reading one character at a time until the declaration has been scanned.

use std::fmt;

use encoding_rs::{DecoderResult, Encoding, UTF_16BE, UTF_16LE, UTF_8};

/// An error that occurs while decoding input bytes.
#[derive(Debug, Clone)]
pub struct EncodingError {
    /// A human-readable description of the encoding error.
    pub message: String,
}

impl EncodingError {
    /// Creates a new `EncodingError` with the given message.
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for EncodingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "encoding error: {}", self.message)
    }
}

impl std::error::Error for EncodingError {}

/// Looks up an encoding by its IANA label (case-insensitive).
///
/// # Errors
///
/// Returns `EncodingError` if the label is not recognized.
pub fn lookup(label: &str) -> Result<&'static Encoding, EncodingError> {
    Encoding::for_label(label.trim().as_bytes())
        .ok_or_else(|| EncodingError::new(format!("unsupported encoding: {label}")))
}

/// A stateful decoder turning a byte stream into UTF-8 text.
pub struct StreamDecoder {
    decoder: encoding_rs::Decoder,
    explicit: bool,
    decoded_bytes: usize,
}

impl StreamDecoder {
    /// Creates a UTF-8 decoder that honours a UTF-8 or UTF-16 byte order mark.
    #[must_use]
    pub fn sniffing() -> Self {
        Self {
            decoder: UTF_8.new_decoder(),
            explicit: false,
            decoded_bytes: 0,
        }
    }

    /// Creates a decoder for an explicitly chosen encoding.
    ///
    /// An explicit encoding is never replaced by the encoding declared in
    /// the document.
    ///
    /// # Errors
    ///
    /// Returns `EncodingError` if the label is not recognized.
    pub fn for_label(label: &str) -> Result<Self, EncodingError> {
        let encoding = lookup(label)?;
        Ok(Self {
            decoder: encoding.new_decoder_with_bom_removal(),
            explicit: true,
            decoded_bytes: 0,
        })
    }

    /// Returns the canonical name of the encoding currently in use.
    #[must_use]
    pub fn encoding_name(&self) -> &'static str {
        self.decoder.encoding().name()
    }

    /// Returns `true` if the encoding was chosen by the caller.
    #[must_use]
    pub fn is_explicit(&self) -> bool {
        self.explicit
    }

    /// Returns the number of input bytes decoded so far.
    #[must_use]
    pub fn decoded_bytes(&self) -> usize {
        self.decoded_bytes
    }

    /// Decodes `src` and appends the text to `dst`.
    ///
    /// Returns the number of bytes of `src` consumed. `last` must be set
    /// once the underlying stream is exhausted so that a truncated
    /// multi-byte sequence is reported.
    ///
    /// # Errors
    ///
    /// Returns `EncodingError` on a malformed byte sequence, with the
    /// absolute byte offset of the offending sequence.
    pub fn decode(
        &mut self,
        src: &[u8],
        dst: &mut String,
        last: bool,
    ) -> Result<usize, EncodingError> {
        let mut consumed = 0;
        loop {
            let needed = self
                .decoder
                .max_utf8_buffer_length_without_replacement(src.len() - consumed)
                .unwrap_or(4 * (src.len() - consumed) + 16);
            dst.reserve(needed.max(4));
            let (result, read) = self.decoder.decode_to_string_without_replacement(
                &src[consumed..],
                dst,
                last,
            );
            consumed += read;
            match result {
                DecoderResult::InputEmpty => break,
                DecoderResult::OutputFull => continue,
                DecoderResult::Malformed(bad, _) => {
                    let offset = (self.decoded_bytes + consumed).saturating_sub(usize::from(bad));
                    self.decoded_bytes += consumed;
                    return Err(EncodingError::new(format!(
                        "malformed byte sequence for encoding {} at byte {offset}",
                        self.encoding_name()
                    )));
                }
            }
        }
        self.decoded_bytes += consumed;
        Ok(consumed)
    }

    /// Switches to the encoding named by an XML or text declaration.
    ///
    /// The switch only happens for a decoder that was not given an explicit
    /// label, is not decoding UTF-16, and only toward an ASCII-compatible
    /// encoding. Returns `true` if the decoder was replaced.
    ///
    /// # Errors
    ///
    /// Returns `EncodingError` if the label is not recognized.
    pub fn switch_encoding(&mut self, label: &str) -> Result<bool, EncodingError> {
        let encoding = lookup(label)?;
        let current = self.decoder.encoding();
        if self.explicit
            || encoding == current
            || current == UTF_16LE
            || current == UTF_16BE
            || !encoding.is_ascii_compatible()
        {
            return Ok(false);
        }
        log::debug!(
            "switching decoder from {} to {} after {} bytes",
            current.name(),
            encoding.name(),
            self.decoded_bytes
        );
        self.decoder = encoding.new_decoder_without_bom_handling();
        Ok(true)
    }
}

impl fmt::Debug for StreamDecoder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamDecoder")
            .field("encoding", &self.encoding_name())
            .field("explicit", &self.explicit)
            .field("decoded_bytes", &self.decoded_bytes)
            .finish()
    }
}
