//! Command-line front end: checks documents for well-formedness and can
//! print the event stream the scanner produces.

use std::fs::{self, File};
use std::io::{self, Write};
use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;

use xmlscan::document::{Attributes, DocumentHandler};
use xmlscan::entity::{InputSource, ResourceIdentifier};
use xmlscan::error::ParseDiagnostic;
use xmlscan::parser::{scan_source, ParseOptions};
use xmlscan::security::Limit;
use xmlscan::util::qname::QName;

// ---------------------------------------------------------------------------
// CLI argument definitions
// ---------------------------------------------------------------------------

/// xmlscan -- check XML documents for well-formedness.
#[derive(Parser, Debug)]
#[command(name = "xmlscan", version, about, long_about = None)]
#[allow(clippy::struct_excessive_bools)]
struct Cli {
    /// XML files to scan (use `-` for stdin).
    #[arg(required = true)]
    files: Vec<String>,

    /// Print every event as it is scanned.
    #[arg(long)]
    events: bool,

    /// Print warnings and recovered errors.
    #[arg(long)]
    verbose: bool,

    /// Print timing information.
    #[arg(long)]
    timing: bool,

    // -- Scanning options --------------------------------------------------
    /// Treat names as plain names, without namespace processing.
    #[arg(long)]
    no_namespaces: bool,

    /// Keep scanning after fatal errors where possible.
    #[arg(long)]
    recover: bool,

    /// Load the external subset and external entities from the file system.
    #[arg(long)]
    load_external: bool,

    /// Skip the internal subset and ignore the external subset.
    #[arg(long)]
    no_dtd: bool,

    /// Reject documents that contain a DOCTYPE declaration.
    #[arg(long)]
    disallow_doctype: bool,

    /// Initial buffer size in characters.
    #[arg(long, value_name = "CHARS")]
    buffer_size: Option<usize>,

    // -- Limits (0 disables a limit) ---------------------------------------
    /// Maximum number of entity expansions.
    #[arg(long, value_name = "N")]
    entity_expansion_limit: Option<usize>,

    /// Maximum size of one general entity, in characters.
    #[arg(long, value_name = "N")]
    general_entity_size_limit: Option<usize>,

    /// Maximum size of all entities together, in characters.
    #[arg(long, value_name = "N")]
    total_entity_size_limit: Option<usize>,

    /// Maximum element nesting depth.
    #[arg(long, value_name = "N")]
    max_element_depth: Option<usize>,

    /// Maximum length of a name.
    #[arg(long, value_name = "N")]
    max_name_length: Option<usize>,
}

// ---------------------------------------------------------------------------
// Exit codes
// ---------------------------------------------------------------------------

const EXIT_SUCCESS: u8 = 0;
const EXIT_SCAN_ERROR: u8 = 1;
const EXIT_READ_ERROR: u8 = 2;

// ---------------------------------------------------------------------------
// Main entry point
// ---------------------------------------------------------------------------

fn main() -> ExitCode {
    let cli = Cli::parse();
    let options = build_options(&cli);
    let mut worst_exit: u8 = EXIT_SUCCESS;

    for file in &cli.files {
        let exit = process_file(&cli, &options, file);
        if exit > worst_exit {
            worst_exit = exit;
        }
    }

    ExitCode::from(worst_exit)
}

fn build_options(cli: &Cli) -> ParseOptions {
    let mut options = ParseOptions::default()
        .namespaces(!cli.no_namespaces)
        .continue_after_fatal_error(cli.recover)
        .process_dtd(!cli.no_dtd)
        .disallow_doctype(cli.disallow_doctype);
    if let Some(size) = cli.buffer_size {
        options = options.buffer_size(size);
    }
    let limits = [
        (Limit::EntityExpansion, cli.entity_expansion_limit),
        (Limit::GeneralEntitySize, cli.general_entity_size_limit),
        (Limit::TotalEntitySize, cli.total_entity_size_limit),
        (Limit::MaxElementDepth, cli.max_element_depth),
        (Limit::MaxName, cli.max_name_length),
    ];
    for (limit, value) in limits {
        if let Some(value) = value {
            options = options.limit(limit, value);
        }
    }
    if cli.load_external {
        options = options.entity_resolver(|request| {
            let path = request
                .expanded_system_id
                .strip_prefix("file://")
                .unwrap_or(request.expanded_system_id);
            match File::open(path) {
                Ok(file) => Some(InputSource::from_reader(file).with_system_id(path)),
                Err(e) => {
                    eprintln!("{path}: failed to open: {e}");
                    None
                }
            }
        });
    } else {
        options = options.load_external_dtd(false);
    }
    options
}

/// Scans a single input file and returns an exit code.
fn process_file(cli: &Cli, options: &ParseOptions, filename: &str) -> u8 {
    let source = if filename == "-" {
        InputSource::from_reader(io::stdin()).with_system_id("-")
    } else {
        match fs::read(filename) {
            Ok(bytes) => InputSource::from_bytes(bytes).with_system_id(filename),
            Err(e) => {
                eprintln!("{filename}: failed to read: {e}");
                return EXIT_READ_ERROR;
            }
        }
    };

    let start = Instant::now();
    let stdout = io::stdout();
    let mut printer = EventPrinter {
        out: stdout.lock(),
        events: cli.events,
        verbose: cli.verbose,
        filename,
        problems: 0,
    };
    let result = scan_source(source, options, &mut printer);
    let problems = printer.problems;
    drop(printer);

    if cli.timing {
        eprintln!("Scanning {filename} took {:?}", start.elapsed());
    }

    match result {
        Ok(()) if problems == 0 => EXIT_SUCCESS,
        Ok(()) => EXIT_SCAN_ERROR,
        Err(e) => {
            eprintln!("{filename}: {e}");
            EXIT_SCAN_ERROR
        }
    }
}

// ---------------------------------------------------------------------------
// Event printing
// ---------------------------------------------------------------------------

struct EventPrinter<'a, W: Write> {
    out: W,
    events: bool,
    verbose: bool,
    filename: &'a str,
    /// Recovered fatal errors.
    problems: usize,
}

impl<W: Write> EventPrinter<'_, W> {
    fn emit(&mut self, line: std::fmt::Arguments<'_>) {
        if self.events {
            // A closed pipe just ends the listing.
            let _ = writeln!(self.out, "{line}");
        }
    }
}

fn format_name(name: &QName) -> String {
    match name.uri_str() {
        Some(uri) => format!("{{{uri}}}{}", name.localpart),
        None => name.rawname.to_string(),
    }
}

fn format_attributes(attributes: &Attributes) -> String {
    attributes
        .iter()
        .map(|a| format!(" {}={:?}", format_name(&a.name), a.value))
        .collect()
}

impl<W: Write> DocumentHandler for EventPrinter<'_, W> {
    fn start_document(&mut self) {
        self.emit(format_args!("START_DOCUMENT"));
    }

    fn xml_decl(&mut self, version: &str, encoding: Option<&str>, standalone: Option<bool>) {
        self.emit(format_args!(
            "XML_DECL version={version} encoding={} standalone={}",
            encoding.unwrap_or("-"),
            standalone.map_or("-", |s| if s { "yes" } else { "no" })
        ));
    }

    fn doctype_decl(&mut self, root_name: &str, public_id: Option<&str>, system_id: Option<&str>) {
        self.emit(format_args!(
            "DOCTYPE {root_name} public={} system={}",
            public_id.unwrap_or("-"),
            system_id.unwrap_or("-")
        ));
    }

    fn internal_entity_decl(&mut self, name: &str, value: &str) {
        self.emit(format_args!("ENTITY {name} {value:?}"));
    }

    fn external_entity_decl(&mut self, name: &str, identifier: &ResourceIdentifier) {
        self.emit(format_args!(
            "ENTITY {name} SYSTEM {}",
            identifier.system_id().unwrap_or("-")
        ));
    }

    fn unparsed_entity_decl(&mut self, name: &str, identifier: &ResourceIdentifier, notation: &str) {
        self.emit(format_args!(
            "ENTITY {name} SYSTEM {} NDATA {notation}",
            identifier.system_id().unwrap_or("-")
        ));
    }

    fn end_dtd(&mut self) {
        self.emit(format_args!("END_DTD"));
    }

    fn start_prefix_mapping(&mut self, prefix: &str, uri: &str) {
        self.emit(format_args!("PREFIX {prefix:?} -> {uri}"));
    }

    fn start_element(&mut self, name: &QName, attributes: &Attributes) {
        self.emit(format_args!(
            "START_ELEMENT {}{}",
            format_name(name),
            format_attributes(attributes)
        ));
    }

    fn empty_element(&mut self, name: &QName, attributes: &Attributes) {
        self.emit(format_args!(
            "EMPTY_ELEMENT {}{}",
            format_name(name),
            format_attributes(attributes)
        ));
    }

    fn end_element(&mut self, name: &QName) {
        self.emit(format_args!("END_ELEMENT {}", format_name(name)));
    }

    fn characters(&mut self, text: &str) {
        self.emit(format_args!("CHARACTERS {text:?}"));
    }

    fn start_cdata(&mut self) {
        self.emit(format_args!("START_CDATA"));
    }

    fn end_cdata(&mut self) {
        self.emit(format_args!("END_CDATA"));
    }

    fn comment(&mut self, text: &str) {
        self.emit(format_args!("COMMENT {text:?}"));
    }

    fn processing_instruction(&mut self, target: &str, data: &str) {
        self.emit(format_args!("PI {target} {data:?}"));
    }

    fn start_general_entity(&mut self, name: &str, _identifier: Option<&ResourceIdentifier>) {
        self.emit(format_args!("START_ENTITY {name}"));
    }

    fn end_general_entity(&mut self, name: &str) {
        self.emit(format_args!("END_ENTITY {name}"));
    }

    fn skipped_entity(&mut self, name: &str) {
        self.emit(format_args!("SKIPPED_ENTITY {name}"));
    }

    fn end_document(&mut self) {
        self.emit(format_args!("END_DOCUMENT"));
    }

    fn warning(&mut self, diagnostic: &ParseDiagnostic) {
        if self.verbose {
            eprintln!("{}: {diagnostic}", self.filename);
        }
    }

    fn error(&mut self, diagnostic: &ParseDiagnostic) {
        if self.verbose {
            eprintln!("{}: {diagnostic}", self.filename);
        }
    }

    fn fatal_error(&mut self, diagnostic: &ParseDiagnostic) {
        self.problems += 1;
        eprintln!("{}: {diagnostic}", self.filename);
    }
}
