//! XML and text declarations.

use super::chars::{is_valid_encoding_name, is_valid_version_num, XmlVersion};
use super::{EntityScanner, NameType};
use crate::error::{ErrorKind, ParseError};
use crate::util::dict::Symbol;

/// The pseudo-attributes of an XML or text declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlDeclInfo {
    pub version: Option<String>,
    pub encoding: Option<String>,
    pub standalone: Option<bool>,
}

impl EntityScanner {
    /// Scans the pseudo-attributes of a declaration whose `<?xml` has
    /// already been consumed, up to and including `?>`.
    ///
    /// An XML declaration needs `version` first; a text declaration needs
    /// `encoding` and may not carry `standalone`. The declared version and
    /// encoding are applied to the active entity, after which it may load
    /// input in chunks.
    pub fn scan_xml_decl_or_text_decl(
        &mut self,
        text_decl: bool,
    ) -> Result<XmlDeclInfo, ParseError> {
        self.set_detecting_version(true);
        let result = self.scan_decl_pseudo_attributes(text_decl);
        self.set_detecting_version(false);
        let info = result?;

        if let Some(version) = &info.version {
            match XmlVersion::from_version_num(version) {
                Some(v) if !text_decl => self.set_version(v),
                Some(XmlVersion::V1_1) if self.version() == XmlVersion::V1_0 => {
                    self.report_fatal(
                        ErrorKind::WellFormedness,
                        "VersionMismatch",
                        "an XML 1.1 entity cannot be included in an XML 1.0 document",
                    )?;
                }
                Some(_) => {}
                None => self.report_fatal(
                    ErrorKind::WellFormedness,
                    "VersionNotSupported",
                    format!("XML version \"{version}\" is not supported"),
                )?,
            }
        }
        if let Some(encoding) = &info.encoding {
            self.switch_encoding(encoding)?;
            self.set_entity_encoding(Some(encoding.clone()));
        }
        self.set_may_read_chunks(true);
        log::trace!("{} declaration: {info:?}", if text_decl { "text" } else { "XML" });
        Ok(info)
    }

    fn scan_decl_pseudo_attributes(&mut self, text_decl: bool) -> Result<XmlDeclInfo, ParseError> {
        let mut info = XmlDeclInfo::default();
        loop {
            let spaced = self.skip_spaces()?;
            if self.skip_string("?>")? {
                break;
            }
            let Some((name, value)) = self.scan_pseudo_attribute()? else {
                if self.at_end_of_entity()? {
                    return Err(self.premature_eof("the XML declaration"));
                }
                self.report_fatal(
                    ErrorKind::WellFormedness,
                    "XMLDeclUnterminated",
                    "the XML declaration must end with \"?>\"",
                )?;
                self.skip_past_decl()?;
                break;
            };
            if !spaced {
                self.report_fatal(
                    ErrorKind::WellFormedness,
                    "SpaceRequiredInXMLDecl",
                    format!("white space is required before the \"{name}\" pseudo-attribute"),
                )?;
            }
            match name.as_str() {
                "version"
                    if info.version.is_none()
                        && info.encoding.is_none()
                        && info.standalone.is_none() =>
                {
                    if !is_valid_version_num(&value) {
                        self.report_fatal(
                            ErrorKind::WellFormedness,
                            "VersionInfoInvalid",
                            format!("invalid version \"{value}\""),
                        )?;
                    }
                    info.version = Some(value);
                }
                "encoding" if info.encoding.is_none() && info.standalone.is_none() => {
                    if !is_valid_encoding_name(&value) {
                        self.report_fatal(
                            ErrorKind::Encoding,
                            "EncodingDeclInvalid",
                            format!("invalid encoding name \"{value}\""),
                        )?;
                    }
                    info.encoding = Some(value);
                }
                "standalone" if text_decl => {
                    self.report_fatal(
                        ErrorKind::WellFormedness,
                        "SDDeclNotAllowed",
                        "a text declaration cannot have a standalone pseudo-attribute",
                    )?;
                }
                "standalone" if info.standalone.is_none() => match value.as_str() {
                    "yes" => info.standalone = Some(true),
                    "no" => info.standalone = Some(false),
                    _ => self.report_fatal(
                        ErrorKind::WellFormedness,
                        "SDDeclInvalid",
                        format!("standalone must be \"yes\" or \"no\", not \"{value}\""),
                    )?,
                },
                _ => {
                    let code = if !text_decl && info.version.is_none() {
                        "VersionInfoRequired"
                    } else {
                        "XMLDeclUnterminated"
                    };
                    self.report_fatal(
                        ErrorKind::WellFormedness,
                        code,
                        format!("unexpected pseudo-attribute \"{name}\" in declaration"),
                    )?;
                }
            }
        }
        if text_decl && info.encoding.is_none() {
            self.report_fatal(
                ErrorKind::WellFormedness,
                "EncodingDeclRequired",
                "the encoding declaration is required in the text declaration",
            )?;
        }
        if !text_decl && info.version.is_none() {
            self.report_fatal(
                ErrorKind::WellFormedness,
                "VersionInfoRequired",
                "the version is required in the XML declaration",
            )?;
        }
        Ok(info)
    }

    /// Scans `name = "value"`. Returns `None` if no name starts here. When
    /// recovering from a missing `=` or quote, the value comes back empty.
    pub fn scan_pseudo_attribute(&mut self) -> Result<Option<(Symbol, String)>, ParseError> {
        let Some(name) = self.scan_name(NameType::Other)? else {
            return Ok(None);
        };
        self.skip_spaces()?;
        if !self.skip_char('=', None)? {
            self.report_fatal(
                ErrorKind::WellFormedness,
                "EqRequiredInXMLDecl",
                format!("the \"=\" character must follow \"{name}\" in the declaration"),
            )?;
            return Ok(Some((name, String::new())));
        }
        self.skip_spaces()?;
        let quote = match self.peek_char()? {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                self.report_fatal(
                    ErrorKind::WellFormedness,
                    "QuoteRequiredInXMLDecl",
                    format!("the value following \"{name}\" in the declaration must be quoted"),
                )?;
                return Ok(Some((name, String::new())));
            }
        };
        self.scan_char(None)?;
        let mut value = String::new();
        loop {
            match self.scan_literal(quote, &mut value, false)? {
                Some(c) if c == quote => {
                    self.scan_char(None)?;
                    break;
                }
                Some(c @ ('&' | '%' | '<')) => {
                    value.push(c);
                    self.scan_char(None)?;
                }
                Some(c) => {
                    self.report_fatal(
                        ErrorKind::WellFormedness,
                        "InvalidCharInXMLDecl",
                        format!("an invalid XML character (Unicode: 0x{:x}) was found in the declaration", c as u32),
                    )?;
                    self.scan_char(None)?;
                }
                None => return Err(self.premature_eof("the XML declaration")),
            }
        }
        Ok(Some((name, value)))
    }

    /// Skips to just past the next `?>` after a malformed declaration.
    fn skip_past_decl(&mut self) -> Result<(), ParseError> {
        while !self.skip_string("?>")? {
            if self.scan_char(None)?.is_none() {
                return Err(self.premature_eof("the XML declaration"));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::super::tests::scanner;
    use super::*;
    use crate::entity::InputSource;
    use crate::security::SecurityManager;

    fn decl(text: &str, text_decl: bool) -> Result<XmlDeclInfo, ParseError> {
        let mut s = scanner(text, 4);
        s.scan_xml_decl_or_text_decl(text_decl)
    }

    #[test]
    fn test_full_xml_decl() {
        let info = decl(" version='1.0' encoding=\"UTF-8\" standalone='yes'?>", false).unwrap();
        assert_eq!(info.version.as_deref(), Some("1.0"));
        assert_eq!(info.encoding.as_deref(), Some("UTF-8"));
        assert_eq!(info.standalone, Some(true));
    }

    #[test]
    fn test_xml_decl_sets_version() {
        let mut s = scanner(" version=\"1.1\"?>", 4);
        s.scan_xml_decl_or_text_decl(false).unwrap();
        assert_eq!(s.version(), XmlVersion::V1_1);
    }

    #[test]
    fn test_xml_decl_requires_version() {
        let err = decl(" encoding='UTF-8'?>", false).unwrap_err();
        assert_eq!(err.code, "VersionInfoRequired");
    }

    #[test]
    fn test_xml_decl_order_is_enforced() {
        let err = decl(" version='1.0' standalone='no' encoding='UTF-8'?>", false).unwrap_err();
        assert_eq!(err.code, "XMLDeclUnterminated");
    }

    #[test]
    fn test_text_decl_requires_encoding() {
        let info = decl(" encoding='UTF-8'?>", true).unwrap();
        assert_eq!(info.version, None);
        let err = decl(" version='1.0'?>", true).unwrap_err();
        assert_eq!(err.code, "EncodingDeclRequired");
    }

    #[test]
    fn test_text_decl_rejects_standalone() {
        let err = decl(" encoding='UTF-8' standalone='yes'?>", true).unwrap_err();
        assert_eq!(err.code, "SDDeclNotAllowed");
    }

    #[test]
    fn test_bad_pseudo_attribute_values() {
        assert_eq!(decl(" version='2.0'?>", false).unwrap_err().code, "VersionInfoInvalid");
        assert_eq!(decl(" version='1.0' standalone='maybe'?>", false).unwrap_err().code, "SDDeclInvalid");
        assert_eq!(decl(" version '1.0'?>", false).unwrap_err().code, "EqRequiredInXMLDecl");
        assert_eq!(decl(" version=1.0?>", false).unwrap_err().code, "QuoteRequiredInXMLDecl");
        assert_eq!(decl(" version='1.0'", false).unwrap_err().code, "PrematureEOF");
    }

    #[test]
    fn test_recovery_resynchronises_after_declaration() {
        let mut s = EntityScanner::new(
            InputSource::from_string(" version 1.0 ?><a/>"),
            4,
            SecurityManager::new(),
            true,
        );
        s.scan_xml_decl_or_text_decl(false).unwrap();
        assert!(s.diagnostic_count() >= 1);
        assert!(s.looking_at("<a/>").unwrap());
    }
}
