//! XML character classes for XML 1.0 (Fifth Edition) and XML 1.1.

use std::fmt;

/// The XML version governing character validity and newline handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum XmlVersion {
    /// XML 1.0 (also used for `1.x` versions other than `1.1`).
    #[default]
    V1_0,
    /// XML 1.1.
    V1_1,
}

impl XmlVersion {
    /// Maps a `VersionNum` to a version. Any `1.x` other than `1.1` is
    /// processed as XML 1.0.
    #[must_use]
    pub fn from_version_num(s: &str) -> Option<Self> {
        if !is_valid_version_num(s) {
            return None;
        }
        Some(if s == "1.1" {
            XmlVersion::V1_1
        } else {
            XmlVersion::V1_0
        })
    }

    /// Returns `true` if `c` is a legal character of this version.
    #[must_use]
    pub fn is_char(self, c: char) -> bool {
        match self {
            XmlVersion::V1_0 => is_xml_char(c),
            XmlVersion::V1_1 => is_xml11_char(c),
        }
    }

    /// Returns `true` if `c` may appear literally in an entity with the
    /// given externality. XML 1.1 restricted characters are only allowed
    /// in internal entities, where they stem from character references in
    /// the replacement text.
    #[must_use]
    pub fn is_literal_char(self, c: char, external: bool) -> bool {
        match self {
            XmlVersion::V1_0 => is_xml_char(c),
            XmlVersion::V1_1 => is_xml11_char(c) && !(external && is_xml11_restricted(c)),
        }
    }
}

impl fmt::Display for XmlVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            XmlVersion::V1_0 => f.write_str("1.0"),
            XmlVersion::V1_1 => f.write_str("1.1"),
        }
    }
}

/// Returns `true` if `c` is a valid `Char` per XML 1.0 §2.2 `[2]`.
///
/// `#x9 | #xA | #xD | [#x20-#xD7FF] | [#xE000-#xFFFD] | [#x10000-#x10FFFF]`
#[must_use]
pub fn is_xml_char(c: char) -> bool {
    matches!(c as u32,
        0x09 | 0x0A | 0x0D | 0x20..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns `true` if `c` is a valid `Char` per XML 1.1 §2.2 `[2]`.
#[must_use]
pub fn is_xml11_char(c: char) -> bool {
    matches!(c as u32,
        0x01..=0xD7FF | 0xE000..=0xFFFD | 0x0001_0000..=0x0010_FFFF
    )
}

/// Returns `true` if `c` is an XML 1.1 `RestrictedChar` `[2a]`.
#[must_use]
pub fn is_xml11_restricted(c: char) -> bool {
    matches!(c as u32,
        0x01..=0x08 | 0x0B..=0x0C | 0x0E..=0x1F | 0x7F..=0x84 | 0x86..=0x9F
    )
}

/// Returns `true` if `c` is a valid `NameStartChar` per XML 1.0 §2.3 `[4]`.
#[must_use]
pub fn is_name_start_char(c: char) -> bool {
    matches!(c,
        ':' | 'A'..='Z' | '_' | 'a'..='z' |
        '\u{C0}'..='\u{D6}' | '\u{D8}'..='\u{F6}' | '\u{F8}'..='\u{2FF}' |
        '\u{370}'..='\u{37D}' | '\u{37F}'..='\u{1FFF}' |
        '\u{200C}'..='\u{200D}' | '\u{2070}'..='\u{218F}' |
        '\u{2C00}'..='\u{2FEF}' | '\u{3001}'..='\u{D7FF}' |
        '\u{F900}'..='\u{FDCF}' | '\u{FDF0}'..='\u{FFFD}' |
        '\u{10000}'..='\u{EFFFF}'
    )
}

/// Returns `true` if `c` is a valid `NameChar` per XML 1.0 §2.3 `[4a]`.
#[must_use]
pub fn is_name_char(c: char) -> bool {
    is_name_start_char(c)
        || matches!(c,
            '-' | '.' | '0'..='9' | '\u{B7}' |
            '\u{300}'..='\u{36F}' | '\u{203F}'..='\u{2040}'
        )
}

/// `NameStartChar` without the colon.
#[must_use]
pub fn is_ncname_start_char(c: char) -> bool {
    c != ':' && is_name_start_char(c)
}

/// `NameChar` without the colon.
#[must_use]
pub fn is_ncname_char(c: char) -> bool {
    c != ':' && is_name_char(c)
}

/// XML whitespace (`S`, §2.3 `[3]`).
#[must_use]
pub fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r')
}

/// Returns `true` if `c` is a valid `PubidChar` per XML 1.0 §2.3 `[13]`.
#[must_use]
pub fn is_pubid_char(c: char) -> bool {
    matches!(c,
        ' ' | '\r' | '\n' |
        'a'..='z' | 'A'..='Z' | '0'..='9' |
        '-' | '\'' | '(' | ')' | '+' | ',' | '.' | '/' | ':' |
        '=' | '?' | ';' | '!' | '*' | '#' | '@' | '$' | '_' | '%'
    )
}

/// Validates an XML version number, `VersionNum ::= '1.' [0-9]+`.
#[must_use]
pub fn is_valid_version_num(s: &str) -> bool {
    if let Some(rest) = s.strip_prefix("1.") {
        !rest.is_empty() && rest.bytes().all(|b| b.is_ascii_digit())
    } else {
        false
    }
}

/// Validates an encoding name, `EncName ::= [A-Za-z] ([A-Za-z0-9._] | '-')*`.
#[must_use]
pub fn is_valid_encoding_name(s: &str) -> bool {
    let bytes = s.as_bytes();
    if bytes.is_empty() || !bytes[0].is_ascii_alphabetic() {
        return false;
    }
    bytes[1..]
        .iter()
        .all(|&b| b.is_ascii_alphanumeric() || b == b'.' || b == b'_' || b == b'-')
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xml10_chars() {
        assert!(is_xml_char('\t'));
        assert!(is_xml_char('\u{10FFFF}'));
        assert!(!is_xml_char('\u{1}'));
        assert!(!is_xml_char('\u{FFFE}'));
    }

    #[test]
    fn test_xml11_restricted_chars() {
        assert!(is_xml11_char('\u{1}'));
        assert!(is_xml11_restricted('\u{1}'));
        assert!(!is_xml11_restricted('\u{85}'));
        assert!(XmlVersion::V1_1.is_literal_char('\u{1}', false));
        assert!(!XmlVersion::V1_1.is_literal_char('\u{1}', true));
        assert!(!XmlVersion::V1_0.is_literal_char('\u{1}', false));
    }

    #[test]
    fn test_name_classes() {
        assert!(is_name_start_char(':'));
        assert!(!is_ncname_start_char(':'));
        assert!(is_name_char('-'));
        assert!(!is_name_start_char('-'));
        assert!(is_name_start_char('\u{10000}'));
        assert!(!is_ncname_char(':'));
    }

    #[test]
    fn test_version_num() {
        assert_eq!(XmlVersion::from_version_num("1.0"), Some(XmlVersion::V1_0));
        assert_eq!(XmlVersion::from_version_num("1.1"), Some(XmlVersion::V1_1));
        assert_eq!(XmlVersion::from_version_num("1.7"), Some(XmlVersion::V1_0));
        assert_eq!(XmlVersion::from_version_num("2.0"), None);
        assert_eq!(XmlVersion::from_version_num("1."), None);
        assert_eq!(XmlVersion::V1_1.to_string(), "1.1");
    }

    #[test]
    fn test_encoding_name() {
        assert!(is_valid_encoding_name("UTF-8"));
        assert!(is_valid_encoding_name("ISO_8859-1"));
        assert!(!is_valid_encoding_name("8859"));
        assert!(!is_valid_encoding_name(""));
    }

    #[test]
    fn test_pubid_chars() {
        assert!(is_pubid_char('-'));
        assert!(!is_pubid_char('"'));
        assert!(!is_pubid_char('\t'));
    }
}
