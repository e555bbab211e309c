//! The drivers outside the root element: XML declaration, prolog,
//! DOCTYPE with its subsets, and the misc after the root.

use super::{DocumentScanner, Driver, EventKind, ScannerState, Step};
use crate::dtd::{scan_external_id, DtdContext, DtdProgress};
use crate::entity::{EntityKind, RequestKind, ResourceIdentifier, DTD_ENTITY};
use crate::error::{ErrorKind, ParseError};
use crate::parser::{resolve_external, resolve_external_subset, scan_text_decl};
use crate::scanner::chars::is_space;
use crate::scanner::NameType;
use crate::util::dict::Symbol;

impl DocumentScanner<'_> {
    pub(super) fn xml_decl_step(&mut self) -> Result<Step, ParseError> {
        if self.scanner.peek_at(0)? == Some('\u{FEFF}') {
            self.scanner.scan_char(None)?;
        }
        if self.scanner.looking_at("<?xml")? && self.scanner.peek_at(5)?.is_some_and(is_space) {
            self.scanner.skip_string("<?xml")?;
            let info = self.scanner.scan_xml_decl_or_text_decl(false)?;
            self.standalone = info.standalone == Some(true);
            self.handler.xml_decl(
                info.version.as_deref().unwrap_or("1.0"),
                info.encoding.as_deref(),
                info.standalone,
            );
            self.set_state(ScannerState::Prolog);
            self.driver = Driver::Prolog;
            return Ok(Step::Event(EventKind::XmlDecl));
        }
        self.scanner.set_may_read_chunks(true);
        self.set_state(ScannerState::Prolog);
        Ok(Step::Switch(Driver::Prolog))
    }

    pub(super) fn prolog_step(&mut self) -> Result<Step, ParseError> {
        self.scanner.skip_spaces()?;
        if self.scanner.skip_string("<!--")? {
            return self.comment_event();
        }
        if self.scanner.skip_string("<?")? {
            return self.pi_event();
        }
        if self.scanner.skip_string("<!DOCTYPE")? {
            return self.scan_doctype();
        }
        let (code, message) = match self.scanner.peek_char()? {
            None => {
                return Err(self.scanner.error(
                    ErrorKind::PrematureEof,
                    "PrematureEOF",
                    "a well-formed document requires a root element",
                ))
            }
            Some('<') if self.scanner.peek_at(1)? == Some('!') => (
                "MarkupNotRecognizedInProlog",
                "the markup in the document preceding the root element must be well-formed",
            ),
            Some('<') => {
                self.set_state(ScannerState::Content);
                return Ok(Step::Switch(Driver::Content));
            }
            Some('&') => (
                "ReferenceIllegalInProlog",
                "a reference is not allowed in the prolog",
            ),
            Some(_) => ("ContentIllegalInProlog", "content is not allowed in prolog"),
        };
        self.scanner.report_fatal(ErrorKind::WellFormedness, code, message)?;
        self.scanner.scan_char(None)?;
        Ok(Step::Again)
    }

    /// Scans `<!DOCTYPE` up to the internal subset or the closing `>`.
    fn scan_doctype(&mut self) -> Result<Step, ParseError> {
        if self.options.disallow_doctype {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "DoctypeNotAllowed",
                "DOCTYPE is disallowed when the feature \"disallow-doctype-decl\" is set",
            )?;
        }
        if self.seen_doctype {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "AlreadySeenDoctype",
                "already seen doctype",
            )?;
        }
        self.seen_doctype = true;
        if !self.scanner.skip_spaces()? {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SpaceRequiredBeforeRootElementTypeInDoctypeDecl",
                "white space is required after \"<!DOCTYPE\" in the document type declaration",
            )?;
        }
        let root = match self.scanner.scan_name(NameType::Doctype)? {
            Some(root) => root,
            None => {
                self.scanner.report_fatal(
                    ErrorKind::WellFormedness,
                    "RootElementTypeRequired",
                    "the root element type must appear after \"<!DOCTYPE\" in the document type declaration",
                )?;
                Symbol::new("")
            }
        };
        self.scanner.skip_spaces()?;
        let external = scan_external_id(&mut self.scanner)?;
        self.scanner.skip_spaces()?;

        let base = self
            .scanner
            .current()
            .identifier()
            .system_id()
            .map(str::to_string);
        let identifier = external.map(|id| ResourceIdentifier::new(id.public_id, Some(id.system_id), base));
        self.handler.doctype_decl(
            &root,
            identifier.as_ref().and_then(|id| id.public_id.as_deref()),
            identifier.as_ref().and_then(|id| id.literal_system_id.as_deref()),
        );
        let load = self.options.process_dtd && self.options.load_external_dtd;
        match &identifier {
            Some(id) => {
                self.entities.set_has_external_subset();
                if load {
                    self.pending_external_subset = resolve_external(
                        &self.options,
                        &mut self.scanner,
                        DTD_ENTITY,
                        RequestKind::ExternalSubset,
                        id,
                    )?;
                }
            }
            None if load => {
                self.pending_external_subset =
                    resolve_external_subset(&self.options, &mut self.scanner, &root)?;
                if self.pending_external_subset.is_some() {
                    self.entities.set_has_external_subset();
                }
            }
            None => {}
        }

        if self.scanner.skip_char('[', None)? {
            if self.options.process_dtd {
                self.set_state(ScannerState::DtdInternalDecls);
                return Ok(Step::Switch(Driver::Dtd));
            }
            self.dtd.skip_internal_subset(&mut self.scanner)?;
            // Nothing was declared, so references can't be judged.
            self.entities.reset();
            self.entities.set_has_external_subset();
        }
        self.finish_doctype()
    }

    /// Finishes the DOCTYPE after the internal subset, or after the
    /// external ID when there is none.
    fn finish_doctype(&mut self) -> Result<Step, ParseError> {
        self.scanner.skip_spaces()?;
        if !self.scanner.skip_char('>', None)? {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "DoctypedeclUnterminated",
                "the document type declaration must end with '>'",
            )?;
        }
        if self.pending_external_subset.is_some() {
            self.set_state(ScannerState::DtdExternal);
            return Ok(Step::Switch(Driver::Dtd));
        }
        Ok(self.end_dtd())
    }

    pub(super) fn dtd_step(&mut self) -> Result<Step, ParseError> {
        match self.state {
            ScannerState::DtdExternal => {
                let Some(source) = self.pending_external_subset.take() else {
                    return Ok(self.end_dtd());
                };
                self.scanner
                    .push_entity(DTD_ENTITY, EntityKind::ExternalSubset, source, true)?;
                scan_text_decl(&mut self.scanner, &mut *self.handler)?;
                self.set_state(ScannerState::DtdExternalDecls);
                Ok(Step::Again)
            }
            ScannerState::DtdInternalDecls => match self.scan_dtd_decl()? {
                DtdProgress::More => Ok(Step::Again),
                DtdProgress::Done => self.finish_doctype(),
            },
            _ => match self.scan_dtd_decl()? {
                DtdProgress::More => Ok(Step::Again),
                DtdProgress::Done => Ok(self.end_dtd()),
            },
        }
    }

    /// Scans one markup declaration from the active subset.
    pub(super) fn scan_dtd_decl(&mut self) -> Result<DtdProgress, ParseError> {
        let mut cx = DtdContext {
            scanner: &mut self.scanner,
            entities: &mut self.entities,
            handler: &mut *self.handler,
            options: &self.options,
        };
        self.dtd.scan_decl(&mut cx)
    }

    fn end_dtd(&mut self) -> Step {
        log::debug!(
            "DTD done: {} declarations, {} general entities",
            self.dtd.declaration_count(),
            self.entities.general_count()
        );
        self.handler.end_dtd();
        self.set_state(ScannerState::Prolog);
        self.driver = Driver::Prolog;
        Step::Event(EventKind::Dtd)
    }

    pub(super) fn trailing_misc_step(&mut self) -> Result<Step, ParseError> {
        self.scanner.skip_spaces()?;
        if self.scanner.skip_string("<!--")? {
            return self.comment_event();
        }
        if self.scanner.skip_string("<?")? {
            return self.pi_event();
        }
        let (code, message) = match self.scanner.peek_char()? {
            None => {
                self.handler.end_document();
                self.set_state(ScannerState::Terminated);
                return Ok(Step::Event(EventKind::EndDocument));
            }
            Some('<') => (
                "MarkupNotRecognizedInMisc",
                "the markup in the document following the root element must be well-formed",
            ),
            Some(_) => (
                "ContentIllegalInTrailingMisc",
                "content is not allowed in trailing section",
            ),
        };
        self.scanner.report_fatal(ErrorKind::WellFormedness, code, message)?;
        self.scanner.scan_char(None)?;
        Ok(Step::Again)
    }

    /// Delivers a comment whose `<!--` was consumed.
    pub(super) fn comment_event(&mut self) -> Result<Step, ParseError> {
        let mut text = String::new();
        self.scanner.scan_comment(&mut text)?;
        self.handler.comment(&text);
        Ok(Step::Event(EventKind::Comment))
    }

    /// Delivers a processing instruction whose `<?` was consumed.
    pub(super) fn pi_event(&mut self) -> Result<Step, ParseError> {
        match self.scanner.scan_pi()? {
            Some(pi) => {
                self.handler.processing_instruction(&pi.target, &pi.data);
                Ok(Step::Event(EventKind::ProcessingInstruction))
            }
            None => Ok(Step::Again),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::document::{DefaultHandler, DocumentHandler};
    use crate::entity::InputSource;
    use crate::parser::ParseOptions;

    #[derive(Default)]
    struct Log(Vec<String>);

    impl DocumentHandler for Log {
        fn xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {
            self.0.push(format!("xml {version} {encoding:?} {standalone:?}"));
        }
        fn doctype_decl(&mut self, root: &str, public_id: Option<&str>, system_id: Option<&str>) {
            self.0.push(format!("doctype {root} {public_id:?} {system_id:?}"));
        }
        fn internal_entity_decl(&mut self, name: &str, value: &str) {
            self.0.push(format!("entity {name}={value}"));
        }
        fn end_dtd(&mut self) {
            self.0.push("end dtd".to_string());
        }
        fn comment(&mut self, text: &str) {
            self.0.push(format!("comment {text}"));
        }
    }

    fn run(input: &str, options: &ParseOptions) -> Result<Vec<String>, ParseError> {
        let mut log = Log::default();
        crate::parser::scan_source(InputSource::from_string(input), options, &mut log)?;
        Ok(log.0)
    }

    #[test]
    fn test_xml_decl_and_internal_subset() {
        let got = run(
            "<?xml version='1.0' encoding='UTF-8' standalone='yes'?>\n<!--p-->\
             <!DOCTYPE r [<!ENTITY e 'v'>]><r/>",
            &ParseOptions::default(),
        )
        .unwrap();
        assert_eq!(
            got,
            [
                "xml 1.0 Some(\"UTF-8\") Some(true)",
                "comment p",
                "doctype r None None",
                "entity e=v",
                "end dtd",
            ]
        );
    }

    #[test]
    fn test_prolog_errors() {
        let opts = ParseOptions::default();
        assert_eq!(run("", &opts).unwrap_err().code, "PrematureEOF");
        assert_eq!(run("x<r/>", &opts).unwrap_err().code, "ContentIllegalInProlog");
        assert_eq!(run("&e;<r/>", &opts).unwrap_err().code, "ReferenceIllegalInProlog");
        assert_eq!(run("<!FOO><r/>", &opts).unwrap_err().code, "MarkupNotRecognizedInProlog");
        assert_eq!(
            run("<!DOCTYPE r><!DOCTYPE r><r/>", &opts).unwrap_err().code,
            "AlreadySeenDoctype"
        );
        assert_eq!(run("<!DOCTYPE r <r/>", &opts).unwrap_err().code, "DoctypedeclUnterminated");
    }

    #[test]
    fn test_disallow_doctype() {
        let opts = ParseOptions::default().disallow_doctype(true);
        assert_eq!(run("<!DOCTYPE r><r/>", &opts).unwrap_err().code, "DoctypeNotAllowed");
        assert!(run("<r/>", &opts).is_ok());
    }

    #[test]
    fn test_unprocessed_internal_subset_is_skipped() {
        let opts = ParseOptions::default().process_dtd(false);
        let got = run("<!DOCTYPE r [<!ENTITY e 'a]b'>]><r/>", &opts).unwrap();
        assert_eq!(got, ["doctype r None None", "end dtd"]);
    }

    #[test]
    fn test_external_subset_is_loaded_through_resolver() {
        let opts = ParseOptions::default().entity_resolver(|req| {
            assert_eq!(req.kind, RequestKind::ExternalSubset);
            Some(InputSource::from_string("<?xml encoding='UTF-8'?><!ENTITY x 'ext'>"))
        });
        let got = run("<!DOCTYPE r SYSTEM 'r.dtd' [<!ENTITY y 'int'>]><r/>", &opts).unwrap();
        assert_eq!(
            got,
            [
                "doctype r None Some(\"r.dtd\")",
                "entity y=int",
                "entity x=ext",
                "end dtd",
            ]
        );
    }

    #[test]
    fn test_trailing_misc() {
        let opts = ParseOptions::default();
        let got = run("<r/> <!--after--> ", &opts).unwrap();
        assert_eq!(got, ["comment after"]);
        assert_eq!(run("<r/><s/>", &opts).unwrap_err().code, "MarkupNotRecognizedInMisc");
        assert_eq!(run("<r/>x", &opts).unwrap_err().code, "ContentIllegalInTrailingMisc");
    }

    #[test]
    fn test_recovery_continues_past_prolog_garbage() {
        let opts = ParseOptions::default().continue_after_fatal_error(true);
        let mut handler = DefaultHandler;
        crate::parser::scan_source(InputSource::from_string("xy<r/>"), &opts, &mut handler)
            .unwrap();
    }
}
