//! The DTD scanner.
//!
//! Scans the internal and external subsets one markup declaration per
//! call. Only entity declarations are kept: `ELEMENT`, `ATTLIST` and
//! `NOTATION` declarations are checked lexically and skipped, since
//! content models and attribute defaults are not processed.
//!
//! Parameter entity references between declarations push the entity onto
//! the scanner's stack; its end is noticed by the next call. In the
//! internal subset a parameter entity reference inside a declaration is a
//! well-formedness error, in external parts it is expanded in place.

use crate::document::DocumentHandler;
use crate::entity::{EntityDecl, EntityKind, EntityStore, InputSource, RequestKind, ResourceIdentifier};
use crate::error::{ErrorKind, ParseError};
use crate::parser::{resolve_external, scan_text_decl, ParseOptions};
use crate::scanner::chars::{is_name_char, is_name_start_char, is_pubid_char, is_space};
use crate::scanner::{EntityScanner, NameType};

/// Result of one [`DtdScanner::scan_decl`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtdProgress {
    /// More declarations may follow.
    More,
    /// The subset ended: `]` of the internal subset (left for the caller to
    /// close the DOCTYPE) or the end of the external subset (popped).
    Done,
}

/// A `SYSTEM` or `PUBLIC` external identifier.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExternalId {
    pub public_id: Option<String>,
    pub system_id: String,
}

/// What the DTD scanner needs from the document session.
pub(crate) struct DtdContext<'a> {
    pub scanner: &'a mut EntityScanner,
    pub entities: &'a mut EntityStore,
    pub handler: &'a mut dyn DocumentHandler,
    pub options: &'a ParseOptions,
}

/// State carried between declarations.
#[derive(Debug, Default, Clone)]
pub struct DtdScanner {
    /// Open `INCLUDE` sections.
    conditional_depth: usize,
    /// Declarations seen, for logging.
    declarations: usize,
}

impl DtdScanner {
    /// Creates a scanner with no open conditional sections.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Forgets all state.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Number of markup declarations scanned so far.
    #[must_use]
    pub fn declaration_count(&self) -> usize {
        self.declarations
    }

    /// Scans one markup declaration, comment, PI, parameter entity
    /// reference or conditional section boundary.
    pub(crate) fn scan_decl(&mut self, cx: &mut DtdContext<'_>) -> Result<DtdProgress, ParseError> {
        cx.scanner.skip_spaces()?;
        let kind = cx.scanner.current().kind;
        if cx.scanner.at_end_of_entity()? {
            return match kind {
                EntityKind::Parameter => {
                    cx.scanner.pop_entity()?;
                    Ok(DtdProgress::More)
                }
                EntityKind::ExternalSubset => {
                    if self.conditional_depth > 0 {
                        return Err(cx.scanner.error(
                            ErrorKind::WellFormedness,
                            "IncludeSectUnterminated",
                            "the included conditional section must end with \"]]>\"",
                        ));
                    }
                    cx.scanner.pop_entity()?;
                    log::trace!("external subset done after {} declarations", self.declarations);
                    Ok(DtdProgress::Done)
                }
                EntityKind::Document | EntityKind::General => {
                    Err(cx.scanner.premature_eof("the document type declaration"))
                }
            };
        }

        if self.conditional_depth > 0 && cx.scanner.skip_string("]]>")? {
            self.conditional_depth -= 1;
            return Ok(DtdProgress::More);
        }
        if cx.scanner.looking_at("]")? {
            if kind == EntityKind::Document {
                cx.scanner.scan_char(None)?;
                return Ok(DtdProgress::Done);
            }
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "MarkupNotRecognizedInDTD",
                "the markup declarations contained or pointed to by the document type declaration must be well-formed",
            )?;
            cx.scanner.scan_char(None)?;
            return Ok(DtdProgress::More);
        }
        if cx.scanner.skip_char('%', None)? {
            self.expand_pe(cx, false)?;
            return Ok(DtdProgress::More);
        }
        if cx.scanner.skip_string("<!--")? {
            cx.scanner.scan_comment(&mut String::new())?;
            return Ok(DtdProgress::More);
        }
        if cx.scanner.skip_string("<?")? {
            cx.scanner.scan_pi()?;
            return Ok(DtdProgress::More);
        }
        if cx.scanner.skip_string("<!ENTITY")? {
            self.declarations += 1;
            self.scan_entity_decl(cx)?;
            return Ok(DtdProgress::More);
        }
        for keyword in ["ELEMENT", "ATTLIST", "NOTATION"] {
            if cx.scanner.skip_string(&format!("<!{keyword}"))? {
                self.declarations += 1;
                self.skip_markup_decl(cx, keyword)?;
                return Ok(DtdProgress::More);
            }
        }
        if cx.scanner.skip_string("<![")? {
            self.scan_conditional_section(cx)?;
            return Ok(DtdProgress::More);
        }

        cx.scanner.report_fatal(
            ErrorKind::WellFormedness,
            "MarkupNotRecognizedInDTD",
            "the markup declarations contained or pointed to by the document type declaration must be well-formed",
        )?;
        cx.scanner.scan_char(None)?;
        Ok(DtdProgress::More)
    }

    /// Skips white space inside a declaration. In external parts this also
    /// expands parameter entity references and closes exhausted parameter
    /// entities.
    fn skip_decl_spaces(&mut self, cx: &mut DtdContext<'_>) -> Result<bool, ParseError> {
        let mut skipped = false;
        loop {
            if cx.scanner.skip_spaces()? {
                skipped = true;
            }
            let kind = cx.scanner.current().kind;
            if kind == EntityKind::Parameter && cx.scanner.at_end_of_entity()? {
                cx.scanner.pop_entity()?;
                skipped = true;
                continue;
            }
            if kind != EntityKind::Document
                && cx.scanner.looking_at("%")?
                && cx.scanner.peek_at(1)?.is_some_and(is_name_start_char)
            {
                cx.scanner.scan_char(None)?;
                self.expand_pe(cx, false)?;
                skipped = true;
                continue;
            }
            return Ok(skipped);
        }
    }

    /// Expands a parameter entity reference whose `%` was consumed.
    fn expand_pe(&mut self, cx: &mut DtdContext<'_>, in_literal: bool) -> Result<(), ParseError> {
        let Some(name) = cx.scanner.scan_name(NameType::Reference)? else {
            return cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "NameRequiredInPEReference",
                "the entity name must immediately follow the '%' in the parameter entity reference",
            );
        };
        if !cx.scanner.skip_char(';', Some(NameType::Reference))? {
            return cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SemicolonRequiredInPEReference",
                format!("the parameter entity reference \"%{name};\" must end with the ';' delimiter"),
            );
        }
        cx.entities.set_has_pe_references();
        let Some(decl) = cx.entities.parameter(&name).cloned() else {
            cx.scanner.report_error(
                ErrorKind::Validity,
                "EntityNotDeclared",
                format!("the parameter entity \"{name}\" was referenced, but not declared"),
            );
            return Ok(());
        };
        if cx.scanner.is_entity_open(&name, EntityKind::Parameter) {
            let message = format!(
                "recursive entity reference \"{name}\" (reference path: {})",
                cx.scanner.recursion_path(&name)
            );
            return cx
                .scanner
                .report_fatal(ErrorKind::WellFormedness, "RecursiveReference", message);
        }
        log::debug!("expanding parameter entity %{name};");
        match (decl.value, decl.identifier) {
            (Some(value), _) => {
                cx.scanner.push_entity(
                    &name,
                    EntityKind::Parameter,
                    InputSource::from_string(value),
                    false,
                )?;
            }
            (None, Some(identifier)) => {
                let source = resolve_external(
                    cx.options,
                    cx.scanner,
                    &name,
                    RequestKind::ParameterEntity,
                    &identifier,
                )?;
                let Some(source) = source else {
                    cx.handler.skipped_entity(&format!("%{name}"));
                    return Ok(());
                };
                cx.scanner
                    .push_entity(&name, EntityKind::Parameter, source, true)?;
                scan_text_decl(cx.scanner, cx.handler)?;
            }
            (None, None) => return Ok(()),
        }
        if in_literal {
            cx.scanner.set_literal(true);
        }
        Ok(())
    }

    /// `<!ENTITY` has been consumed.
    fn scan_entity_decl(&mut self, cx: &mut DtdContext<'_>) -> Result<(), ParseError> {
        if !self.skip_decl_spaces(cx)? {
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SpaceRequiredBeforeEntityNameInEntityDecl",
                "white space is required after \"<!ENTITY\" in the entity declaration",
            )?;
        }
        let is_parameter = cx.scanner.skip_char('%', None)?;
        if is_parameter && !self.skip_decl_spaces(cx)? {
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SpaceRequiredBeforeEntityNameInPEDecl",
                "white space is required before the entity name in the parameter entity declaration",
            )?;
        }
        let Some(name) = cx.scanner.scan_name(NameType::Entity)? else {
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "EntityNameRequiredInEntityDecl",
                "the entity name is required in the entity declaration",
            )?;
            return self.skip_to_decl_end(cx);
        };
        if !self.skip_decl_spaces(cx)? {
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SpaceRequiredAfterEntityNameInEntityDecl",
                format!("white space is required between the entity name \"{name}\" and the definition"),
            )?;
        }

        let base = cx
            .scanner
            .current()
            .identifier()
            .system_id()
            .map(str::to_string);
        let mut decl = match scan_external_id(cx.scanner)? {
            Some(external) => {
                let spaced = self.skip_decl_spaces(cx)?;
                let mut notation = None;
                if cx.scanner.skip_string("NDATA")? {
                    if is_parameter {
                        cx.scanner.report_fatal(
                            ErrorKind::WellFormedness,
                            "NDATANotAllowedInPEDecl",
                            "NDATA is not allowed in a parameter entity declaration",
                        )?;
                    }
                    if !spaced {
                        cx.scanner.report_fatal(
                            ErrorKind::WellFormedness,
                            "SpaceRequiredBeforeNDATAInUnparsedEntityDecl",
                            "white space is required before \"NDATA\"",
                        )?;
                    }
                    if !self.skip_decl_spaces(cx)? {
                        cx.scanner.report_fatal(
                            ErrorKind::WellFormedness,
                            "SpaceRequiredBeforeNotationNameInUnparsedEntityDecl",
                            "white space is required between \"NDATA\" and the notation name",
                        )?;
                    }
                    match cx.scanner.scan_name(NameType::Notation)? {
                        Some(n) => notation = Some(n.to_string()),
                        None => cx.scanner.report_fatal(
                            ErrorKind::WellFormedness,
                            "NotationNameRequiredInUnparsedEntityDecl",
                            format!("the notation name is required after \"NDATA\" for the entity \"{name}\""),
                        )?,
                    }
                }
                let identifier =
                    ResourceIdentifier::new(external.public_id, Some(external.system_id), base);
                EntityDecl::external(&name, identifier, notation, is_parameter)
            }
            None => {
                let Some(quote) = cx.scanner.peek_char()?.filter(|c| matches!(c, '"' | '\'')) else {
                    cx.scanner.report_fatal(
                        ErrorKind::WellFormedness,
                        "QuoteRequiredInEntityDecl",
                        format!("the replacement text of the entity \"{name}\" must be quoted"),
                    )?;
                    return self.skip_to_decl_end(cx);
                };
                cx.scanner.scan_char(None)?;
                let value = self.scan_entity_value(cx, quote)?;
                EntityDecl::internal(&name, value, is_parameter)
            }
        };

        self.skip_decl_spaces(cx)?;
        if !cx.scanner.skip_char('>', None)? {
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "EntityDeclUnterminated",
                format!("the declaration for the entity \"{name}\" must end with '>'"),
            )?;
            self.skip_to_decl_end(cx)?;
        }

        let current = cx.scanner.current();
        decl.in_external_subset = current.kind == EntityKind::ExternalSubset
            || (current.kind == EntityKind::Parameter && current.is_external());
        let display = if is_parameter {
            format!("%{name}")
        } else {
            name.to_string()
        };
        if !cx.entities.declare(decl.clone()) {
            cx.scanner.report_warning(
                "EntityDeclared",
                format!("the entity \"{display}\" is already declared; the first declaration is binding"),
            );
            return Ok(());
        }
        log::debug!("declared entity {display}");
        match (&decl.value, &decl.identifier, &decl.notation) {
            (Some(value), _, _) => cx.handler.internal_entity_decl(&display, value),
            (None, Some(id), Some(notation)) => cx.handler.unparsed_entity_decl(&display, id, notation),
            (None, Some(id), None) => cx.handler.external_entity_decl(&display, id),
            (None, None, _) => {}
        }
        Ok(())
    }

    /// Scans an entity value after its opening quote, including the
    /// closing quote. Character references are expanded, general entity
    /// references are kept as written.
    fn scan_entity_value(&mut self, cx: &mut DtdContext<'_>, quote: char) -> Result<String, ParseError> {
        let depth = cx.scanner.depth();
        let mut value = String::new();
        loop {
            match cx.scanner.scan_literal(quote, &mut value, false)? {
                Some(c) if c == quote => {
                    cx.scanner.scan_char(None)?;
                    if cx.scanner.depth() == depth {
                        return Ok(value);
                    }
                    value.push(c);
                }
                Some('&') => {
                    cx.scanner.scan_char(None)?;
                    if cx.scanner.skip_char('#', None)? {
                        if let Some((c, _)) = cx.scanner.scan_char_reference()? {
                            value.push(c);
                        }
                        continue;
                    }
                    let Some(name) = cx.scanner.scan_name(NameType::Reference)? else {
                        cx.scanner.report_fatal(
                            ErrorKind::WellFormedness,
                            "NameRequiredInReference",
                            "the entity name must immediately follow the '&' in the entity reference",
                        )?;
                        value.push('&');
                        continue;
                    };
                    if !cx.scanner.skip_char(';', None)? {
                        cx.scanner.report_fatal(
                            ErrorKind::WellFormedness,
                            "SemicolonRequiredInReference",
                            format!("the reference to entity \"{name}\" must end with the ';' delimiter"),
                        )?;
                    }
                    value.push('&');
                    value.push_str(&name);
                    value.push(';');
                }
                Some('%') => {
                    cx.scanner.scan_char(None)?;
                    if cx.scanner.current().kind == EntityKind::Document {
                        cx.scanner.report_fatal(
                            ErrorKind::WellFormedness,
                            "PEReferenceWithinMarkup",
                            "parameter entity references cannot occur within markup in the internal subset of the DTD",
                        )?;
                        value.push('%');
                        continue;
                    }
                    self.expand_pe(cx, true)?;
                }
                Some('<') => {
                    cx.scanner.scan_char(None)?;
                    value.push('<');
                }
                Some(c) => {
                    cx.scanner.report_fatal(
                        ErrorKind::WellFormedness,
                        "InvalidCharInEntityValue",
                        format!(
                            "an invalid XML character (Unicode: 0x{:x}) was found in the literal entity value",
                            c as u32
                        ),
                    )?;
                    cx.scanner.scan_char(None)?;
                }
                None if cx.scanner.depth() > depth => {
                    cx.scanner.pop_entity()?;
                }
                None => return Err(cx.scanner.premature_eof("the entity value")),
            }
        }
    }

    /// Checks and skips an `ELEMENT`, `ATTLIST` or `NOTATION` declaration
    /// whose keyword was consumed.
    fn skip_markup_decl(&mut self, cx: &mut DtdContext<'_>, keyword: &str) -> Result<(), ParseError> {
        if !self.skip_decl_spaces(cx)? {
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SpaceRequiredInMarkupDecl",
                format!("white space is required after \"<!{keyword}\""),
            )?;
        }
        let nt = if keyword == "NOTATION" {
            NameType::Notation
        } else {
            NameType::Other
        };
        if cx.scanner.scan_name(nt)?.is_none() {
            let code = match keyword {
                "ELEMENT" => "ElementTypeRequiredInElementDecl",
                "ATTLIST" => "ElementTypeRequiredInAttlistDecl",
                _ => "NotationNameRequiredInNotationDecl",
            };
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                code,
                format!("a name is required in the \"{keyword}\" declaration"),
            )?;
        }
        loop {
            self.skip_decl_spaces(cx)?;
            match cx.scanner.peek_char()? {
                Some('>') => {
                    cx.scanner.scan_char(None)?;
                    return Ok(());
                }
                Some(quote @ ('"' | '\'')) => {
                    cx.scanner.scan_char(None)?;
                    skip_quoted(cx.scanner, quote)?;
                }
                Some(c) if is_name_char(c) => {
                    cx.scanner.scan_nmtoken(NameType::Other)?;
                }
                Some('(' | ')' | '|' | ',' | '?' | '*' | '+' | '#') => {
                    cx.scanner.scan_char(None)?;
                }
                Some('%') if cx.scanner.current().kind == EntityKind::Document => {
                    cx.scanner.report_fatal(
                        ErrorKind::WellFormedness,
                        "PEReferenceWithinMarkup",
                        "parameter entity references cannot occur within markup in the internal subset of the DTD",
                    )?;
                    cx.scanner.scan_char(None)?;
                }
                Some(c) => {
                    cx.scanner.report_fatal(
                        ErrorKind::WellFormedness,
                        "MarkupNotRecognizedInDTD",
                        format!("unexpected character '{c}' in the \"{keyword}\" declaration"),
                    )?;
                    cx.scanner.scan_char(None)?;
                }
                None => return Err(cx.scanner.premature_eof("the markup declaration")),
            }
        }
    }

    /// `<![` has been consumed.
    fn scan_conditional_section(&mut self, cx: &mut DtdContext<'_>) -> Result<(), ParseError> {
        if cx.scanner.current().kind == EntityKind::Document {
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "ConditionalSectionInInternalSubset",
                "conditional sections are only allowed in the external subset",
            )?;
        }
        self.skip_decl_spaces(cx)?;
        let include = if cx.scanner.skip_string("INCLUDE")? {
            true
        } else if cx.scanner.skip_string("IGNORE")? {
            false
        } else {
            return cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "MarkupNotRecognizedInDTD",
                "a conditional section must start with \"INCLUDE\" or \"IGNORE\"",
            );
        };
        self.skip_decl_spaces(cx)?;
        if !cx.scanner.skip_char('[', None)? {
            cx.scanner.report_fatal(
                ErrorKind::WellFormedness,
                "MarkupNotRecognizedInDTD",
                "'[' is required after the conditional section keyword",
            )?;
        }
        if include {
            self.conditional_depth += 1;
            return Ok(());
        }
        let mut depth = 1;
        loop {
            if cx.scanner.skip_string("<![")? {
                depth += 1;
            } else if cx.scanner.skip_string("]]>")? {
                depth -= 1;
                if depth == 0 {
                    return Ok(());
                }
            } else if cx.scanner.scan_char(None)?.is_none() {
                return Err(cx.scanner.error(
                    ErrorKind::PrematureEof,
                    "IgnoreSectUnterminated",
                    "the excluded conditional section must end with \"]]>\"",
                ));
            }
        }
    }

    /// Recovery: skips to just past the next `>`.
    fn skip_to_decl_end(&mut self, cx: &mut DtdContext<'_>) -> Result<(), ParseError> {
        loop {
            match cx.scanner.scan_char(None)? {
                Some('>') => return Ok(()),
                Some(quote @ ('"' | '\'')) => skip_quoted(cx.scanner, quote)?,
                Some(_) => {}
                None => return Err(cx.scanner.premature_eof("the markup declaration")),
            }
        }
    }

    /// Skips an internal subset without processing it, after its `[`.
    /// Consumes the closing `]`.
    pub(crate) fn skip_internal_subset(&mut self, scanner: &mut EntityScanner) -> Result<(), ParseError> {
        loop {
            if scanner.skip_string("<!--")? {
                scanner.scan_comment(&mut String::new())?;
                continue;
            }
            if scanner.skip_string("<?")? {
                scanner.scan_pi()?;
                continue;
            }
            match scanner.scan_char(None)? {
                Some(']') => return Ok(()),
                Some(quote @ ('"' | '\'')) => skip_quoted(scanner, quote)?,
                Some(_) => {}
                None => return Err(scanner.premature_eof("the document type declaration")),
            }
        }
    }
}

/// Skips a quoted literal after its opening quote.
fn skip_quoted(scanner: &mut EntityScanner, quote: char) -> Result<(), ParseError> {
    loop {
        match scanner.scan_char(None)? {
            Some(c) if c == quote => return Ok(()),
            Some(_) => {}
            None => return Err(scanner.premature_eof("the literal")),
        }
    }
}

/// Scans an optional `SYSTEM "uri"` or `PUBLIC "pubid" "uri"` identifier.
pub(crate) fn scan_external_id(scanner: &mut EntityScanner) -> Result<Option<ExternalId>, ParseError> {
    if scanner.skip_string("SYSTEM")? {
        if !scanner.skip_spaces()? {
            scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SpaceRequiredAfterSYSTEM",
                "white space is required after keyword SYSTEM",
            )?;
        }
        let system_id = scan_system_literal(scanner)?;
        return Ok(Some(ExternalId {
            public_id: None,
            system_id,
        }));
    }
    if scanner.skip_string("PUBLIC")? {
        if !scanner.skip_spaces()? {
            scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SpaceRequiredAfterPUBLIC",
                "white space is required after keyword PUBLIC",
            )?;
        }
        let public_id = scan_pubid_literal(scanner)?;
        if !scanner.skip_spaces()? {
            scanner.report_fatal(
                ErrorKind::WellFormedness,
                "SpaceRequiredBetweenPublicAndSystem",
                "white spaces are required between publicId and systemId",
            )?;
        }
        let system_id = scan_system_literal(scanner)?;
        return Ok(Some(ExternalId {
            public_id: Some(public_id),
            system_id,
        }));
    }
    Ok(None)
}

fn scan_system_literal(scanner: &mut EntityScanner) -> Result<String, ParseError> {
    let Some(quote) = scanner.peek_char()?.filter(|c| matches!(c, '"' | '\'')) else {
        scanner.report_fatal(
            ErrorKind::WellFormedness,
            "QuoteRequiredInSystemID",
            "the system identifier must begin with either a single or double quote character",
        )?;
        return Ok(String::new());
    };
    scanner.scan_char(None)?;
    let mut literal = String::new();
    let delimiter = quote.to_string();
    while scanner.scan_data(&delimiter, &mut literal, None, NameType::Other)? {
        scanner.report_fatal(
            ErrorKind::WellFormedness,
            "InvalidCharInSystemID",
            "an invalid XML character was found in the system identifier",
        )?;
        scanner.scan_char(None)?;
    }
    Ok(literal)
}

/// Scans a public identifier, collapsing white space runs to one space.
fn scan_pubid_literal(scanner: &mut EntityScanner) -> Result<String, ParseError> {
    let Some(quote) = scanner.peek_char()?.filter(|c| matches!(c, '"' | '\'')) else {
        scanner.report_fatal(
            ErrorKind::WellFormedness,
            "QuoteRequiredInPublicID",
            "the public identifier must begin with either a single or double quote character",
        )?;
        return Ok(String::new());
    };
    scanner.scan_char(None)?;
    let mut literal = String::new();
    let mut pending_space = false;
    loop {
        match scanner.scan_char(None)? {
            Some(c) if c == quote => break,
            Some(c) if is_space(c) => pending_space = !literal.is_empty(),
            Some(c) if is_pubid_char(c) => {
                if pending_space {
                    literal.push(' ');
                    pending_space = false;
                }
                literal.push(c);
            }
            Some(c) => scanner.report_fatal(
                ErrorKind::WellFormedness,
                "InvalidCharInPublicID",
                format!("the character (Unicode: 0x{:x}) is not permitted in the public identifier", c as u32),
            )?,
            None => return Err(scanner.premature_eof("the public identifier")),
        }
    }
    Ok(literal)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::DefaultHandler;
    use crate::entity::DTD_ENTITY;
    use crate::security::SecurityManager;

    fn scanner(text: &str) -> EntityScanner {
        let mut s = EntityScanner::new(InputSource::from_string(text), 4, SecurityManager::new(), false);
        s.set_may_read_chunks(true);
        s
    }

    fn scan_all(
        s: &mut EntityScanner,
        entities: &mut EntityStore,
        options: &ParseOptions,
    ) -> Result<usize, ParseError> {
        let mut dtd = DtdScanner::new();
        let mut handler = DefaultHandler;
        let mut cx = DtdContext {
            scanner: s,
            entities,
            handler: &mut handler,
            options,
        };
        while dtd.scan_decl(&mut cx)? == DtdProgress::More {}
        Ok(dtd.declaration_count())
    }

    fn internal(text: &str) -> Result<EntityStore, ParseError> {
        let mut s = scanner(text);
        let mut entities = EntityStore::new();
        scan_all(&mut s, &mut entities, &ParseOptions::default())?;
        Ok(entities)
    }

    fn external(text: &str) -> Result<EntityStore, ParseError> {
        let mut s = scanner("");
        s.push_entity(DTD_ENTITY, EntityKind::ExternalSubset, InputSource::from_string(text), true)
            .unwrap();
        s.set_may_read_chunks(true);
        let mut entities = EntityStore::new();
        scan_all(&mut s, &mut entities, &ParseOptions::default())?;
        Ok(entities)
    }

    #[test]
    fn test_internal_entity_declarations() {
        let store = internal("<!ENTITY a 'x&#65;y&b;'> <!ENTITY % p \"pv\"> ]").unwrap();
        assert_eq!(store.general("a").unwrap().value.as_deref(), Some("xAy&b;"));
        assert_eq!(store.parameter("p").unwrap().value.as_deref(), Some("pv"));
    }

    #[test]
    fn test_external_and_unparsed_declarations() {
        let store = internal(
            "<!ENTITY e SYSTEM 'e.ent'><!ENTITY pic PUBLIC '-//X//  pic' 'p.gif' NDATA gif>]",
        )
        .unwrap();
        let e = store.general("e").unwrap();
        assert_eq!(e.identifier.as_ref().unwrap().system_id(), Some("e.ent"));
        let pic = store.general("pic").unwrap();
        assert!(pic.is_unparsed());
        assert_eq!(
            pic.identifier.as_ref().unwrap().public_id.as_deref(),
            Some("-//X// pic")
        );
    }

    #[test]
    fn test_other_declarations_are_skipped() {
        let mut s = scanner(
            "<!ELEMENT a (b|c)*><!ATTLIST a id ID #IMPLIED t CDATA 'x>y'><!NOTATION gif SYSTEM 'gif'><!-- c --><?pi?>]",
        );
        let mut entities = EntityStore::new();
        let count = scan_all(&mut s, &mut entities, &ParseOptions::default()).unwrap();
        assert_eq!(count, 3);
    }

    #[test]
    fn test_pe_reference_in_internal_markup_is_fatal() {
        let err = internal("<!ENTITY % p 'x'><!ENTITY a '%p;'>]").unwrap_err();
        assert_eq!(err.code, "PEReferenceWithinMarkup");
    }

    #[test]
    fn test_pe_between_declarations() {
        let store = internal("<!ENTITY % decls '<!ENTITY inner \"v\">'> %decls; ]").unwrap();
        assert_eq!(store.general("inner").unwrap().value.as_deref(), Some("v"));
        assert!(store.has_external_parts());
    }

    #[test]
    fn test_pe_in_external_entity_value() {
        let store = external("<!ENTITY % p 'q\"q'><!ENTITY a \"[%p;]\">").unwrap();
        assert_eq!(store.general("a").unwrap().value.as_deref(), Some("[q\"q]"));
    }

    #[test]
    fn test_conditional_sections() {
        let store = external(
            "<![INCLUDE[<!ENTITY a 'in'>]]><![IGNORE[<!ENTITY b 'out'> <![INCLUDE[ ]]> ]]>",
        )
        .unwrap();
        assert!(store.general("a").is_some());
        assert!(store.general("b").is_none());
        assert_eq!(
            external("<![INCLUDE[<!ENTITY a 'x'>").unwrap_err().code,
            "IncludeSectUnterminated"
        );
        assert_eq!(
            internal("<![INCLUDE[ ]]> ]").unwrap_err().code,
            "ConditionalSectionInInternalSubset"
        );
    }

    #[test]
    fn test_recursive_pe_is_fatal() {
        let err = internal("<!ENTITY % a '&#37;a;'> %a; ]").unwrap_err();
        assert_eq!(err.code, "RecursiveReference");
        assert!(err.message.contains("a -> a"));
    }

    #[test]
    fn test_undeclared_pe_is_not_fatal() {
        let store = internal("%missing; <!ENTITY a 'x'> ]").unwrap();
        assert!(store.general("a").is_some());
        assert!(store.has_external_parts());
    }

    #[test]
    fn test_unterminated_internal_subset() {
        assert_eq!(internal("<!ENTITY a 'x'>").unwrap_err().code, "PrematureEOF");
    }

    #[test]
    fn test_skip_internal_subset() {
        let mut s = scanner("<!ENTITY a ']'><!-- ] --><?p ]?>]>rest");
        DtdScanner::new().skip_internal_subset(&mut s).unwrap();
        assert!(s.looking_at(">rest").unwrap());
    }

    #[test]
    fn test_external_id() {
        let mut s = scanner("PUBLIC \"-//A//B\" 'sys.dtd'");
        let id = scan_external_id(&mut s).unwrap().unwrap();
        assert_eq!(id.public_id.as_deref(), Some("-//A//B"));
        assert_eq!(id.system_id, "sys.dtd");
        let mut s = scanner("SYSTEM\"x\"");
        assert_eq!(scan_external_id(&mut s).unwrap_err().code, "SpaceRequiredAfterSYSTEM");
        let mut s = scanner("PUBLIC '{bad}' 'x'");
        assert_eq!(scan_external_id(&mut s).unwrap_err().code, "InvalidCharInPublicID");
    }
}
