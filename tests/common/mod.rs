//! Shared helpers for the integration tests: a handler that records every
//! callback as a line of text.

#![allow(dead_code)]

use xmlscan::document::{Attributes, DocumentHandler};
use xmlscan::entity::{InputSource, ResourceIdentifier};
use xmlscan::error::{ErrorSeverity, ParseDiagnostic, ParseError};
use xmlscan::parser::{scan_source, ParseOptions};
use xmlscan::util::qname::QName;

/// Records events as `name(args)` lines and diagnostics separately.
#[derive(Debug, Default)]
pub struct Recorder {
    pub events: Vec<String>,
    pub diagnostics: Vec<(ErrorSeverity, &'static str)>,
    /// Open general entities, for the depth-conservation checks.
    pub entity_depth: isize,
    pub max_entity_depth: isize,
}

impl Recorder {
    /// All `characters` payloads joined together.
    pub fn text(&self) -> String {
        self.events
            .iter()
            .filter_map(|e| e.strip_prefix("characters(")?.strip_suffix(')'))
            .collect()
    }

    pub fn count(&self, prefix: &str) -> usize {
        self.events.iter().filter(|e| e.starts_with(prefix)).count()
    }
}

fn name(name: &QName) -> String {
    match name.uri_str() {
        Some(uri) => format!("{}{{{uri}}}", name.rawname),
        None => name.rawname.to_string(),
    }
}

fn attributes(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|a| format!("{}={}", name(&a.name), a.value))
        .collect::<Vec<_>>()
        .join(",")
}

impl DocumentHandler for Recorder {
    fn start_document(&mut self) {
        self.events.push("startDocument".to_string());
    }

    fn xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {
        let mut line = format!("xmlDecl(version={version}");
        if let Some(encoding) = encoding {
            line.push_str(&format!(",encoding={encoding}"));
        }
        if let Some(standalone) = standalone {
            line.push_str(&format!(",standalone={standalone}"));
        }
        line.push(')');
        self.events.push(line);
    }

    fn text_decl(&mut self, version: Option<&str>, encoding: Option<&str>) {
        self.events.push(format!(
            "textDecl({},{})",
            version.unwrap_or("-"),
            encoding.unwrap_or("-")
        ));
    }

    fn doctype_decl(&mut self, root_name: &str, _public_id: Option<&str>, system_id: Option<&str>) {
        self.events
            .push(format!("doctype({root_name},{})", system_id.unwrap_or("-")));
    }

    fn end_dtd(&mut self) {
        self.events.push("endDTD".to_string());
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) {
        self.events.push(format!("startPrefix({prefix}={uri})"));
    }

    fn end_prefix_mapping(&mut self, prefix: &str) {
        self.events.push(format!("endPrefix({prefix})"));
    }

    fn start_element(&mut self, qname: &QName, attrs: &Attributes) {
        self.events
            .push(format!("startElement({},[{}])", name(qname), attributes(attrs)));
    }

    fn empty_element(&mut self, qname: &QName, attrs: &Attributes) {
        self.events
            .push(format!("emptyElement({},[{}])", name(qname), attributes(attrs)));
    }

    fn end_element(&mut self, qname: &QName) {
        self.events.push(format!("endElement({})", name(qname)));
    }

    fn characters(&mut self, text: &str) {
        self.events.push(format!("characters({text})"));
    }

    fn start_cdata(&mut self) {
        self.events.push("startCDATA".to_string());
    }

    fn end_cdata(&mut self) {
        self.events.push("endCDATA".to_string());
    }

    fn comment(&mut self, text: &str) {
        self.events.push(format!("comment({text})"));
    }

    fn processing_instruction(&mut self, target: &str, data: &str) {
        self.events.push(format!("pi({target},{data})"));
    }

    fn start_general_entity(&mut self, name: &str, _identifier: Option<&ResourceIdentifier>) {
        self.entity_depth += 1;
        self.max_entity_depth = self.max_entity_depth.max(self.entity_depth);
        self.events.push(format!("startEntity({name})"));
    }

    fn end_general_entity(&mut self, name: &str) {
        self.entity_depth -= 1;
        self.events.push(format!("endEntity({name})"));
    }

    fn skipped_entity(&mut self, name: &str) {
        self.events.push(format!("skippedEntity({name})"));
    }

    fn end_document(&mut self) {
        self.events.push("endDocument".to_string());
    }

    fn warning(&mut self, diagnostic: &ParseDiagnostic) {
        self.diagnostics.push((diagnostic.severity, diagnostic.code));
    }

    fn error(&mut self, diagnostic: &ParseDiagnostic) {
        self.diagnostics.push((diagnostic.severity, diagnostic.code));
    }

    fn fatal_error(&mut self, diagnostic: &ParseDiagnostic) {
        self.diagnostics.push((diagnostic.severity, diagnostic.code));
    }
}

/// Scans `input` to the end and returns what was recorded along with the
/// outcome.
pub fn record(input: &str, options: &ParseOptions) -> (Recorder, Result<(), ParseError>) {
    record_source(InputSource::from_string(input), options)
}

pub fn record_source(source: InputSource, options: &ParseOptions) -> (Recorder, Result<(), ParseError>) {
    let mut recorder = Recorder::default();
    let result = scan_source(source, options, &mut recorder);
    (recorder, result)
}

/// Scans `input`, which must be well-formed, and returns the events.
pub fn events(input: &str, options: &ParseOptions) -> Vec<String> {
    let (recorder, result) = record(input, options);
    if let Err(e) = result {
        panic!("unexpected error: {e}\nevents so far: {:#?}", recorder.events);
    }
    recorder.events
}

/// Scans `input`, which must be malformed, and returns the error.
pub fn error(input: &str, options: &ParseOptions) -> ParseError {
    let (recorder, result) = record(input, options);
    match result {
        Ok(()) => panic!("expected an error, got events: {:#?}", recorder.events),
        Err(e) => e,
    }
}
