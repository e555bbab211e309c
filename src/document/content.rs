//! The content driver: everything between the root start tag and the
//! root end tag, including general entity expansion.

use std::collections::HashSet;

use super::{Attribute, Attributes, DocumentScanner, Driver, EventKind, PendingRef, ScannerState, Step};
use crate::dtd::DtdProgress;
use crate::entity::{builtin_entity, EntityKind, InputSource, RequestKind, DTD_ENTITY};
use crate::error::{ErrorKind, ParseError};
use crate::namespace::{XMLNS_NAMESPACE, XML_NAMESPACE};
use crate::parser::{resolve_external, resolve_external_subset, scan_text_decl};
use crate::scanner::{NameType, XmlVersion};
use crate::security::Limit;
use crate::util::dict::Symbol;
use crate::util::qname::QName;

/// Replaces tab, line feed and carriage return in `value[from..]` with
/// spaces.
fn normalize_whitespace(value: &mut String, from: usize) {
    let is_ws = |c: char| matches!(c, '\t' | '\n' | '\r');
    if value[from..].contains(is_ws) {
        let tail: String = value[from..]
            .chars()
            .map(|c| if is_ws(c) { ' ' } else { c })
            .collect();
        value.truncate(from);
        value.push_str(&tail);
    }
}

impl DocumentScanner<'_> {
    pub(super) fn content_step(&mut self) -> Result<Step, ParseError> {
        if let Some(pending) = self.pending_ref.take() {
            return self.handle_pending_ref(pending);
        }
        if self.scanner.at_end_of_entity()? {
            if self.entity_depth > 0 {
                return self.end_entity();
            }
            let what = match self.elements.last() {
                Some(open) => format!("element \"{}\"", open.rawname),
                None => "the root element".to_string(),
            };
            return Err(self.scanner.premature_eof(&what));
        }
        if self.scanner.skip_string("</")? {
            return self.scan_end_element();
        }
        if self.scanner.skip_string("<!--")? {
            return self.comment_event();
        }
        if self.scanner.skip_string("<![CDATA[")? {
            return self.scan_cdata();
        }
        if self.scanner.skip_string("<?")? {
            return self.pi_event();
        }
        if self.scanner.looking_at("<!")? {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "MarkupNotRecognizedInContent",
                "the content of elements must consist of well-formed character data or markup",
            )?;
            self.scanner.scan_char(None)?;
            return Ok(Step::Again);
        }
        if self.scanner.skip_char('<', None)? {
            return self.scan_start_element();
        }
        self.scan_characters()
    }

    // -- Character data and references --

    /// Coalesces character data, character references and predefined
    /// entities into one `characters` call of at most `buffer_size` chars.
    /// Stops at markup, at the end of the active entity, and in front of
    /// any reference that must be reported as an entity.
    fn scan_characters(&mut self) -> Result<Step, ParseError> {
        let limit = self.scanner.buffer_size();
        let mut text = String::new();
        let mut chars = 0;
        while chars < limit {
            let before = text.len();
            let next = self.scanner.scan_content(&mut text, Some(limit - chars))?;
            chars += text[before..].chars().count();
            if chars >= limit {
                break;
            }
            let before = text.len();
            match next {
                None | Some('<') => break,
                Some(']') => {
                    if self.scanner.looking_at("]]>")? {
                        self.scanner.report_fatal(
                            ErrorKind::WellFormedness,
                            "CDEndInContent",
                            "the character sequence \"]]>\" must not appear in content unless used to mark the end of a CDATA section",
                        )?;
                    }
                    self.scanner.scan_char(None)?;
                    text.push(']');
                }
                Some('&') => {
                    self.scanner.scan_char(Some(NameType::Reference))?;
                    if self.scan_content_reference(&mut text)? {
                        break;
                    }
                }
                Some(c) => {
                    self.scanner.report_fatal(
                        ErrorKind::WellFormedness,
                        "InvalidCharInContent",
                        format!(
                            "an invalid XML character (Unicode: 0x{:x}) was found in the element content of the document",
                            c as u32
                        ),
                    )?;
                    self.scanner.scan_char(None)?;
                }
            }
            chars += text[before..].chars().count();
        }
        if text.is_empty() {
            return Ok(Step::Again);
        }
        self.handler.characters(&text);
        Ok(Step::Event(EventKind::Characters))
    }

    /// Scans a reference in content after its `&`. References that expand
    /// inline are appended to `text`; returns `true` when the reference was
    /// parked in `pending_ref` instead.
    fn scan_content_reference(&mut self, text: &mut String) -> Result<bool, ParseError> {
        if self.scanner.skip_char('#', Some(NameType::Reference))? {
            let Some((value, digits)) = self.scanner.scan_char_reference()? else {
                return Ok(false);
            };
            if self.options.notify_char_refs {
                self.pending_ref = Some(PendingRef::Char {
                    name: format!("#{digits}"),
                    value,
                });
                return Ok(true);
            }
            text.push(value);
            return Ok(false);
        }
        let Some(name) = self.scan_reference_name()? else {
            return Ok(false);
        };
        match builtin_entity(&name) {
            Some(value) if self.options.notify_builtin_refs => {
                self.pending_ref = Some(PendingRef::Builtin { name, value });
                Ok(true)
            }
            Some(value) => {
                text.push(value);
                Ok(false)
            }
            None => {
                self.pending_ref = Some(PendingRef::Named(name));
                Ok(true)
            }
        }
    }

    /// Scans `name;` after `&`.
    fn scan_reference_name(&mut self) -> Result<Option<Symbol>, ParseError> {
        let Some(name) = self.scanner.scan_name(NameType::Reference)? else {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "NameRequiredInReference",
                "the entity name must immediately follow the '&' in the entity reference",
            )?;
            return Ok(None);
        };
        if !self.scanner.skip_char(';', Some(NameType::Reference))? {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SemicolonRequiredInReference",
                format!("the reference to entity \"{name}\" must end with the ';' delimiter"),
            )?;
            return Ok(None);
        }
        Ok(Some(name))
    }

    fn handle_pending_ref(&mut self, pending: PendingRef) -> Result<Step, ParseError> {
        let (name, value) = match pending {
            PendingRef::Named(name) => return self.start_entity(name),
            PendingRef::Char { name, value } => (name, value),
            PendingRef::Builtin { name, value } => (name.to_string(), value),
        };
        self.handler.start_general_entity(&name, None);
        self.handler.characters(value.encode_utf8(&mut [0; 4]));
        self.handler.end_general_entity(&name);
        Ok(Step::Event(EventKind::Characters))
    }

    /// Reports a reference to an entity that was never declared. Fatal
    /// unless declarations may have been missed in unread external parts.
    fn undeclared_entity(&mut self, name: &str) -> Result<(), ParseError> {
        let message = format!("the entity \"{name}\" was referenced, but not declared");
        if self.standalone || !self.entities.has_external_parts() {
            self.scanner
                .report_fatal(ErrorKind::WellFormedness, "EntityNotDeclared", message)
        } else {
            self.scanner
                .report_error(ErrorKind::Validity, "EntityNotDeclared", message);
            Ok(())
        }
    }

    /// Opens a general entity referenced from content.
    fn start_entity(&mut self, name: Symbol) -> Result<Step, ParseError> {
        let Some(decl) = self.entities.general(&name).cloned() else {
            self.undeclared_entity(&name)?;
            self.handler.skipped_entity(&name);
            return Ok(Step::Again);
        };
        if decl.is_unparsed() {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "ReferenceToUnparsedEntity",
                format!("the unparsed entity reference \"&{name};\" is not permitted"),
            )?;
            return Ok(Step::Again);
        }
        if self.scanner.is_entity_open(&name, EntityKind::General) {
            let message = format!(
                "recursive entity reference \"{name}\" (reference path: {})",
                self.scanner.recursion_path(&name)
            );
            self.scanner
                .report_fatal(ErrorKind::WellFormedness, "RecursiveReference", message)?;
            return Ok(Step::Again);
        }
        match (&decl.value, &decl.identifier) {
            (Some(value), _) => {
                let source = InputSource::from_string(value.clone());
                self.scanner
                    .push_entity(&name, EntityKind::General, source, false)?;
            }
            (None, Some(id)) => {
                let resolved = resolve_external(
                    &self.options,
                    &mut self.scanner,
                    &name,
                    RequestKind::GeneralEntity,
                    id,
                )?;
                let Some(source) = resolved else {
                    self.handler.skipped_entity(&name);
                    return Ok(Step::Again);
                };
                self.scanner.push_entity(&name, EntityKind::General, source, true)?;
            }
            (None, None) => return Ok(Step::Again),
        }
        self.scanner.set_element_depth(self.elements.len());
        self.entity_depth += 1;
        self.handler
            .start_general_entity(&name, decl.identifier.as_ref());
        if decl.is_external() {
            scan_text_decl(&mut self.scanner, &mut *self.handler)?;
        }
        Ok(Step::Event(EventKind::StartEntity))
    }

    fn end_entity(&mut self) -> Result<Step, ParseError> {
        if self.elements.len() != self.scanner.current().element_depth {
            let message = format!(
                "the element structure must start and end within the entity \"{}\"",
                self.scanner.current().name
            );
            self.scanner
                .report_fatal(ErrorKind::WellFormedness, "ElementEntityMismatch", message)?;
        }
        let entity = self.scanner.pop_entity()?;
        self.entity_depth -= 1;
        self.handler.end_general_entity(&entity.name);
        Ok(Step::Event(EventKind::EndEntity))
    }

    // -- CDATA --

    /// Scans a CDATA section after `<![CDATA[`, delivering its text in
    /// chunks of at most one buffer.
    fn scan_cdata(&mut self) -> Result<Step, ParseError> {
        self.handler.start_cdata();
        let chunk = Some(self.scanner.buffer_size());
        let mut text = String::new();
        loop {
            let more = self
                .scanner
                .scan_data("]]>", &mut text, chunk, NameType::CData)?;
            if !text.is_empty() {
                self.handler.characters(&text);
                text.clear();
            }
            if !more {
                break;
            }
            let external = self.scanner.current().is_external();
            match self.scanner.peek_char()? {
                Some(c) if !self.scanner.version().is_literal_char(c, external) => {
                    self.scanner.report_fatal(
                        ErrorKind::WellFormedness,
                        "InvalidCharInCDSect",
                        format!(
                            "an invalid XML character (Unicode: 0x{:x}) was found in the CDATA section",
                            c as u32
                        ),
                    )?;
                    self.scanner.scan_char(None)?;
                }
                _ => {}
            }
        }
        self.handler.end_cdata();
        Ok(Step::Event(EventKind::CData))
    }

    // -- Tags --

    fn scan_element_name(&mut self, nt: NameType) -> Result<Option<QName>, ParseError> {
        if self.options.namespaces {
            self.scanner.scan_qname(nt)
        } else {
            Ok(self.scanner.scan_name(nt)?.map(QName::unprefixed))
        }
    }

    /// Scans a start tag after its `<`.
    fn scan_start_element(&mut self) -> Result<Step, ParseError> {
        let Some(mut element) = self.scan_element_name(NameType::ElementStart)? else {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "MarkupNotRecognizedInContent",
                "the content of elements must consist of well-formed character data or markup",
            )?;
            return Ok(Step::Again);
        };
        if !self.seen_root {
            self.seen_root = true;
            if !self.seen_doctype && self.options.process_dtd && self.options.load_external_dtd {
                self.load_subset_for_root(&element.rawname)?;
            }
        }
        self.scanner
            .check_value(Limit::MaxElementDepth, self.elements.len() + 1)?;

        let mut attributes = Attributes::new();
        let empty = loop {
            let spaced = self.scanner.skip_spaces()?;
            if self.scanner.skip_char('>', None)? {
                break false;
            }
            if self.scanner.skip_string("/>")? {
                break true;
            }
            if self.scanner.at_end_of_entity()? {
                return Err(self
                    .scanner
                    .premature_eof(&format!("the start tag of element \"{}\"", element.rawname)));
            }
            if !spaced {
                self.element_unterminated(&element)?;
                self.scanner.scan_char(None)?;
                continue;
            }
            self.scan_attribute(&element, &mut attributes)?;
        };

        if self.options.namespaces {
            self.bind_namespaces(&mut element, &mut attributes)?;
        }
        if empty {
            self.handler.empty_element(&element, &attributes);
            if self.options.namespaces {
                self.end_prefix_mappings();
            }
            if self.elements.is_empty() {
                self.set_state(ScannerState::TrailingMisc);
                self.driver = Driver::TrailingMisc;
            }
            return Ok(Step::Event(EventKind::EmptyElement));
        }
        self.handler.start_element(&element, &attributes);
        self.elements.push(element);
        Ok(Step::Event(EventKind::StartElement))
    }

    fn element_unterminated(&mut self, element: &QName) -> Result<(), ParseError> {
        self.scanner.report_fatal(
            ErrorKind::WellFormedness,
            "ElementUnterminated",
            format!(
                "element type \"{}\" must be followed by either attribute specifications, \">\" or \"/>\"",
                element.rawname
            ),
        )
    }

    fn scan_attribute(&mut self, element: &QName, attributes: &mut Attributes) -> Result<(), ParseError> {
        let Some(name) = self.scan_element_name(NameType::AttributeName)? else {
            self.element_unterminated(element)?;
            self.scanner.scan_char(None)?;
            return Ok(());
        };
        self.scanner.skip_spaces()?;
        if !self.scanner.skip_char('=', None)? {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "EqRequiredInAttribute",
                format!(
                    "attribute name \"{}\" associated with an element type \"{}\" must be followed by the ' = ' character",
                    name.rawname, element.rawname
                ),
            )?;
            return Ok(());
        }
        self.scanner.skip_spaces()?;
        let value = self.scan_attribute_value(&name, element)?;
        self.scanner
            .check_value(Limit::ElementAttribute, attributes.len() + 1)?;
        if attributes.contains_rawname(&name.rawname) {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "AttributeNotUnique",
                format!(
                    "attribute \"{}\" was already specified for element \"{}\"",
                    name.rawname, element.rawname
                ),
            )?;
            return Ok(());
        }
        attributes.push(Attribute { name, value });
        Ok(())
    }

    /// Scans a quoted attribute value, expanding references and
    /// normalizing white space.
    fn scan_attribute_value(&mut self, name: &QName, element: &QName) -> Result<String, ParseError> {
        let quote = match self.scanner.peek_char()? {
            Some(q @ ('"' | '\'')) => q,
            _ => {
                self.scanner.report_fatal(
                    ErrorKind::WellFormedness,
                    "OpenQuoteExpected",
                    format!(
                        "open quote is expected for attribute \"{}\" associated with an element type \"{}\"",
                        name.rawname, element.rawname
                    ),
                )?;
                return Ok(String::new());
            }
        };
        self.scanner.scan_char(None)?;
        let depth = self.scanner.depth();
        let is_ns_uri = self.options.namespaces
            && (name.rawname.as_str() == "xmlns" || name.prefix_str() == "xmlns");
        let mut value = String::new();
        loop {
            let start = value.len();
            let stop = self.scanner.scan_literal(quote, &mut value, is_ns_uri)?;
            normalize_whitespace(&mut value, start);
            match stop {
                Some(c) if c == quote => {
                    self.scanner.scan_char(None)?;
                    if self.scanner.depth() == depth {
                        return Ok(value);
                    }
                    value.push(c);
                }
                Some('&') => {
                    self.scanner.scan_char(Some(NameType::Reference))?;
                    self.scan_attribute_reference(&mut value)?;
                }
                Some('<') => {
                    self.scanner.report_fatal(
                        ErrorKind::WellFormedness,
                        "LessthanInAttValue",
                        format!(
                            "the value of attribute \"{}\" associated with an element type \"{}\" must not contain the '<' character",
                            name.rawname, element.rawname
                        ),
                    )?;
                    self.scanner.scan_char(None)?;
                    value.push('<');
                }
                Some('%') => {
                    self.scanner.scan_char(None)?;
                    value.push('%');
                }
                Some(c) => {
                    self.scanner.report_fatal(
                        ErrorKind::WellFormedness,
                        "InvalidCharInAttValue",
                        format!(
                            "an invalid XML character (Unicode: 0x{:x}) was found in the value of attribute \"{}\"",
                            c as u32, name.rawname
                        ),
                    )?;
                    self.scanner.scan_char(None)?;
                }
                None if self.scanner.depth() > depth => {
                    self.scanner.pop_entity()?;
                }
                None => {
                    return Err(self
                        .scanner
                        .premature_eof(&format!("the value of attribute \"{}\"", name.rawname)))
                }
            }
        }
    }

    /// Scans a reference inside an attribute value after its `&`. Internal
    /// entities are pushed and read as part of the literal.
    fn scan_attribute_reference(&mut self, value: &mut String) -> Result<(), ParseError> {
        if self.scanner.skip_char('#', Some(NameType::Reference))? {
            if let Some((c, _)) = self.scanner.scan_char_reference()? {
                value.push(c);
            }
            return Ok(());
        }
        let Some(name) = self.scan_reference_name()? else {
            return Ok(());
        };
        if let Some(c) = builtin_entity(&name) {
            value.push(c);
            return Ok(());
        }
        let Some(decl) = self.entities.general(&name).cloned() else {
            return self.undeclared_entity(&name);
        };
        let (code, message) = if decl.is_unparsed() {
            (
                "ReferenceToUnparsedEntity",
                format!("the unparsed entity reference \"&{name};\" is not permitted"),
            )
        } else if decl.is_external() {
            (
                "ReferenceToExternalEntity",
                format!("the external entity reference \"&{name};\" is not permitted in an attribute value"),
            )
        } else if self.scanner.is_entity_open(&name, EntityKind::General) {
            (
                "RecursiveReference",
                format!(
                    "recursive entity reference \"{name}\" (reference path: {})",
                    self.scanner.recursion_path(&name)
                ),
            )
        } else {
            let text = decl.value.unwrap_or_default();
            self.scanner
                .push_entity(&name, EntityKind::General, InputSource::from_string(text), false)?;
            self.scanner.set_literal(true);
            return Ok(());
        };
        self.scanner
            .report_fatal(ErrorKind::WellFormedness, code, message)
    }

    /// Resolves namespace declarations on a start tag, then binds the
    /// element and attribute names.
    fn bind_namespaces(&mut self, element: &mut QName, attributes: &mut Attributes) -> Result<(), ParseError> {
        self.ns.push_context();
        for attr in attributes.iter() {
            let prefix = if attr.name.rawname.as_str() == "xmlns" {
                self.scanner.symbols.intern("")
            } else if attr.name.prefix_str() == "xmlns" {
                attr.name.localpart.clone()
            } else {
                continue;
            };
            let uri = attr.value.as_str();
            let problem = if prefix.as_str() == "xmlns" || uri == XMLNS_NAMESPACE {
                Some((
                    "CantBindXMLNS",
                    "the prefix \"xmlns\" cannot be bound to any namespace explicitly; neither can the namespace for \"xmlns\" be bound to any prefix explicitly".to_string(),
                ))
            } else if prefix.as_str() == "xml" {
                if uri == XML_NAMESPACE {
                    continue;
                }
                Some((
                    "CantBindXML",
                    "the prefix \"xml\" cannot be bound to any namespace other than its usual namespace".to_string(),
                ))
            } else if uri == XML_NAMESPACE {
                Some((
                    "CantBindXML",
                    "the namespace for prefix \"xml\" cannot be bound to any prefix other than \"xml\"".to_string(),
                ))
            } else if uri.is_empty() && !prefix.is_empty() && self.scanner.version() == XmlVersion::V1_0 {
                Some((
                    "EmptyPrefixedAttName",
                    format!(
                        "the value of the attribute \"{}\" is invalid: prefixed namespace bindings may not be empty",
                        attr.name.rawname
                    ),
                ))
            } else {
                None
            };
            if let Some((code, message)) = problem {
                self.scanner.report_fatal(ErrorKind::Namespace, code, message)?;
                continue;
            }
            let bound = (!uri.is_empty()).then(|| self.scanner.symbols.intern(uri));
            self.ns.declare_prefix(&prefix, bound);
            self.handler.start_prefix_mapping(&prefix, uri);
        }

        if element.prefix_str() == "xmlns" {
            self.scanner.report_fatal(
                ErrorKind::Namespace,
                "ElementXMLNSPrefix",
                format!("element \"{}\" cannot have \"xmlns\" as its prefix", element.rawname),
            )?;
        }
        element.uri = self.ns.get_uri(element.prefix_str());
        if let (Some(prefix), None) = (&element.prefix, &element.uri) {
            self.scanner.report_fatal(
                ErrorKind::Namespace,
                "ElementPrefixUnbound",
                format!(
                    "the prefix \"{prefix}\" for element \"{}\" is not bound",
                    element.rawname
                ),
            )?;
        }

        let mut seen = HashSet::new();
        for attr in attributes.as_mut_slice() {
            let name = &mut attr.name;
            if name.rawname.as_str() == "xmlns" {
                name.uri = self.ns.get_uri("xmlns");
                continue;
            }
            let Some(prefix) = name.prefix.clone() else {
                continue;
            };
            name.uri = self.ns.get_uri(&prefix);
            let Some(uri) = name.uri.clone() else {
                self.scanner.report_fatal(
                    ErrorKind::Namespace,
                    "AttributePrefixUnbound",
                    format!(
                        "the prefix \"{prefix}\" for attribute \"{}\" associated with an element type \"{}\" is not bound",
                        name.rawname, element.rawname
                    ),
                )?;
                continue;
            };
            if !seen.insert((uri.clone(), name.localpart.clone())) {
                self.scanner.report_fatal(
                    ErrorKind::Namespace,
                    "AttributeNSNotUnique",
                    format!(
                        "attribute \"{}\" bound to namespace \"{uri}\" was already specified for element \"{}\"",
                        name.localpart, element.rawname
                    ),
                )?;
            }
        }
        if !self.options.namespace_declarations_as_attributes {
            attributes.retain(|a| a.name.uri_str() != Some(XMLNS_NAMESPACE));
        }
        Ok(())
    }

    /// Reports the end of the innermost scope's bindings and drops it.
    fn end_prefix_mappings(&mut self) {
        let declared: Vec<Symbol> = self.ns.declared_prefixes().cloned().collect();
        for prefix in &declared {
            self.handler.end_prefix_mapping(prefix);
        }
        self.ns.pop_context();
    }

    /// Scans an end tag after its `</`.
    fn scan_end_element(&mut self) -> Result<Step, ParseError> {
        let Some(expected) = self.elements.last().cloned() else {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "MarkupNotRecognizedInContent",
                "the content of elements must consist of well-formed character data or markup",
            )?;
            return Ok(Step::Again);
        };
        let name = self.scanner.scan_name(NameType::ElementEnd)?;
        if name.as_deref() != Some(expected.rawname.as_str()) {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "ETagRequired",
                format!(
                    "the element type \"{0}\" must be terminated by the matching end-tag \"</{0}>\"",
                    expected.rawname
                ),
            )?;
        }
        if self.entity_depth > 0 && self.elements.len() <= self.scanner.current().element_depth {
            let message = format!(
                "the element structure must start and end within the entity \"{}\"",
                self.scanner.current().name
            );
            self.scanner
                .report_fatal(ErrorKind::WellFormedness, "ElementEntityMismatch", message)?;
        }
        self.scanner.skip_spaces()?;
        if !self.scanner.skip_char('>', None)? {
            self.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "ETagUnterminated",
                format!(
                    "the end-tag for element type \"{}\" must end with a '>' delimiter",
                    expected.rawname
                ),
            )?;
        }
        self.elements.pop();
        self.handler.end_element(&expected);
        if self.options.namespaces {
            self.end_prefix_mappings();
        }
        if self.elements.is_empty() {
            self.set_state(ScannerState::TrailingMisc);
            self.driver = Driver::TrailingMisc;
        }
        Ok(Step::Event(EventKind::EndElement))
    }

    /// Scans an external subset supplied for a document that has no
    /// DOCTYPE, before its root element is reported.
    fn load_subset_for_root(&mut self, root: &str) -> Result<(), ParseError> {
        let Some(source) = resolve_external_subset(&self.options, &mut self.scanner, root)? else {
            return Ok(());
        };
        let id = source.identifier().clone();
        self.handler
            .doctype_decl(root, id.public_id.as_deref(), id.literal_system_id.as_deref());
        self.entities.set_has_external_subset();
        self.scanner
            .push_entity(DTD_ENTITY, EntityKind::ExternalSubset, source, true)?;
        scan_text_decl(&mut self.scanner, &mut *self.handler)?;
        while self.scan_dtd_decl()? == DtdProgress::More {}
        self.handler.end_dtd();
        Ok(())
    }
}
