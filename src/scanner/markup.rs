//! Markup bodies shared by the document and DTD scanners: comments,
//! processing instructions and character references.

use super::{EntityScanner, NameType};
use crate::error::{ErrorKind, ParseError};
use crate::util::dict::Symbol;

/// A scanned processing instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessingInstruction {
    pub target: Symbol,
    pub data: String,
}

const MAX_CODE_POINT: u32 = 0x10_FFFF;

impl EntityScanner {
    /// Scans the rest of a comment after `<!--`, up to and including `-->`.
    pub fn scan_comment(&mut self, text: &mut String) -> Result<(), ParseError> {
        loop {
            if self.scan_data("--", text, None, NameType::Comment)? {
                let c = self.peek_char()?.unwrap_or('\0');
                self.report_fatal(
                    ErrorKind::WellFormedness,
                    "InvalidCharInComment",
                    format!(
                        "an invalid XML character (Unicode: 0x{:x}) was found in the comment",
                        c as u32
                    ),
                )?;
                self.scan_char(Some(NameType::Comment))?;
                continue;
            }
            if self.skip_char('>', Some(NameType::Comment))? {
                return Ok(());
            }
            self.report_fatal(
                ErrorKind::WellFormedness,
                "DashDashInComment",
                "the string \"--\" is not permitted within comments",
            )?;
            text.push_str("--");
        }
    }

    /// Scans the rest of a processing instruction after `<?`, up to and
    /// including `?>`.
    ///
    /// Returns `None` if the instruction had no target and recovery skipped
    /// past it.
    pub fn scan_pi(&mut self) -> Result<Option<ProcessingInstruction>, ParseError> {
        let Some(target) = self.scan_name(NameType::PiTarget)? else {
            self.report_fatal(
                ErrorKind::WellFormedness,
                "PITargetRequired",
                "the processing instruction must begin with the name of the target",
            )?;
            let mut skipped = String::new();
            while self.scan_data("?>", &mut skipped, None, NameType::PiTarget)? {
                self.scan_char(None)?;
            }
            return Ok(None);
        };
        if target.eq_ignore_ascii_case("xml") {
            self.report_fatal(
                ErrorKind::WellFormedness,
                "ReservedPITarget",
                "the processing instruction target matching \"[xX][mM][lL]\" is not allowed",
            )?;
        }
        let mut data = String::new();
        if self.skip_string("?>")? {
            return Ok(Some(ProcessingInstruction { target, data }));
        }
        if !self.skip_spaces()? {
            self.report_fatal(
                ErrorKind::WellFormedness,
                "SpaceRequiredInPI",
                "white space is required between the processing instruction target and data",
            )?;
        }
        while self.scan_data("?>", &mut data, None, NameType::PiTarget)? {
            let c = self.peek_char()?.unwrap_or('\0');
            self.report_fatal(
                ErrorKind::WellFormedness,
                "InvalidCharInPI",
                format!(
                    "an invalid XML character (Unicode: 0x{:x}) was found in the processing instruction",
                    c as u32
                ),
            )?;
            self.scan_char(Some(NameType::PiTarget))?;
        }
        Ok(Some(ProcessingInstruction { target, data }))
    }

    /// Scans a character reference after `&#`, including the `;`.
    ///
    /// Returns the referenced character and its lexical form (`65` or
    /// `x41`), or `None` if the reference was malformed and recovery is on.
    /// Redundant leading zeros are dropped from the lexical form, and
    /// digits past the largest code point are consumed but not kept.
    pub fn scan_char_reference(&mut self) -> Result<Option<(char, String)>, ParseError> {
        let nt = Some(NameType::Reference);
        let hex = self.skip_char('x', nt)?;
        let radix = if hex { 16 } else { 10 };
        let mut digits = String::new();
        if hex {
            digits.push('x');
        }
        let mut value: u32 = 0;
        let mut seen_digit = false;
        let mut too_large = false;
        while let Some(c) = self.peek_char()? {
            let Some(d) = c.to_digit(radix) else {
                break;
            };
            self.scan_char(nt)?;
            seen_digit = true;
            if too_large {
                continue;
            }
            value = value * radix + d;
            if value > MAX_CODE_POINT {
                too_large = true;
                digits.push(c);
                digits.push_str("...");
            } else if value > 0 || digits.len() == usize::from(hex) {
                digits.push(c);
            }
        }
        if !seen_digit {
            let (code, what) = if hex {
                ("HexdigitRequiredInCharRef", "a hexadecimal representation")
            } else {
                ("DigitRequiredInCharRef", "a decimal representation")
            };
            self.report_fatal(
                ErrorKind::WellFormedness,
                code,
                format!("{what} must immediately follow the \"&#\" in a character reference"),
            )?;
            return Ok(None);
        }
        if !self.skip_char(';', nt)? {
            self.report_fatal(
                ErrorKind::WellFormedness,
                "SemicolonRequiredInCharRef",
                "the character reference must end with the ';' delimiter",
            )?;
            return Ok(None);
        }
        let value = Some(value)
            .filter(|_| !too_large)
            .and_then(char::from_u32)
            .filter(|&c| self.version().is_char(c));
        match value {
            Some(c) => Ok(Some((c, digits))),
            None => {
                self.report_fatal(
                    ErrorKind::WellFormedness,
                    "InvalidCharRef",
                    format!("character reference \"&#{digits}\" is an invalid XML character"),
                )?;
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::scanner;
    use super::*;
    use crate::scanner::XmlVersion;

    #[test]
    fn test_comment_body() {
        let mut s = scanner(" a - b -->rest", 3);
        let mut text = String::new();
        s.scan_comment(&mut text).unwrap();
        assert_eq!(text, " a - b ");
        assert!(s.looking_at("rest").unwrap());
    }

    #[test]
    fn test_comment_rejects_double_dash() {
        let mut s = scanner(" a -- b -->", 8);
        let err = s.scan_comment(&mut String::new()).unwrap_err();
        assert_eq!(err.code, "DashDashInComment");
    }

    #[test]
    fn test_unterminated_comment() {
        let mut s = scanner(" never closed", 4);
        let err = s.scan_comment(&mut String::new()).unwrap_err();
        assert_eq!(err.code, "PrematureEOF");
    }

    #[test]
    fn test_pi_with_and_without_data() {
        let mut s = scanner("target  some data?><?empty?>", 5);
        let pi = s.scan_pi().unwrap().unwrap();
        assert_eq!(pi.target, "target");
        assert_eq!(pi.data, "some data");
        assert!(s.skip_string("<?").unwrap());
        let pi = s.scan_pi().unwrap().unwrap();
        assert_eq!(pi.target, "empty");
        assert_eq!(pi.data, "");
    }

    #[test]
    fn test_pi_errors() {
        assert_eq!(scanner("XmL x?>", 8).scan_pi().unwrap_err().code, "ReservedPITarget");
        assert_eq!(scanner(" x?>", 8).scan_pi().unwrap_err().code, "PITargetRequired");
        assert_eq!(scanner("t\"x?>", 8).scan_pi().unwrap_err().code, "SpaceRequiredInPI");
    }

    #[test]
    fn test_char_references() {
        let mut s = scanner("65;x1F600;", 2);
        assert_eq!(s.scan_char_reference().unwrap(), Some(('A', "65".to_string())));
        assert_eq!(
            s.scan_char_reference().unwrap(),
            Some(('\u{1F600}', "x1F600".to_string()))
        );
    }

    #[test]
    fn test_char_reference_errors() {
        assert_eq!(scanner(";", 4).scan_char_reference().unwrap_err().code, "DigitRequiredInCharRef");
        assert_eq!(scanner("x;", 4).scan_char_reference().unwrap_err().code, "HexdigitRequiredInCharRef");
        assert_eq!(scanner("65", 4).scan_char_reference().unwrap_err().code, "SemicolonRequiredInCharRef");
        assert_eq!(scanner("0;", 4).scan_char_reference().unwrap_err().code, "InvalidCharRef");
        assert_eq!(scanner("xD800;", 4).scan_char_reference().unwrap_err().code, "InvalidCharRef");
        assert_eq!(scanner("99999999999;", 4).scan_char_reference().unwrap_err().code, "InvalidCharRef");
    }

    #[test]
    fn test_char_reference_digits_are_bounded() {
        let zeros = "0".repeat(100_000);
        let mut s = scanner(&format!("{zeros}65;x{zeros}41;"), 16);
        assert_eq!(s.scan_char_reference().unwrap(), Some(('A', "065".to_string())));
        assert_eq!(s.scan_char_reference().unwrap(), Some(('A', "x041".to_string())));

        let mut s = scanner(&format!("x{};", "F".repeat(100_000)), 16);
        let err = s.scan_char_reference().unwrap_err();
        assert_eq!(err.code, "InvalidCharRef");
        assert!(err.message.len() < 100, "{}", err.message);
        assert_eq!(scanner("1114112;", 4).scan_char_reference().unwrap_err().code, "InvalidCharRef");
        assert_eq!(
            scanner("x10FFFF;", 4).scan_char_reference().unwrap(),
            Some(('\u{10FFFF}', "x10FFFF".to_string()))
        );
    }

    #[test]
    fn test_restricted_char_reference_needs_xml11() {
        assert_eq!(scanner("x1;", 4).scan_char_reference().unwrap_err().code, "InvalidCharRef");
        let mut s = scanner("x1;", 4);
        s.set_version(XmlVersion::V1_1);
        assert_eq!(s.scan_char_reference().unwrap().unwrap().0, '\u{1}');
    }
}
