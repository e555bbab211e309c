//! The document scanner: a pull-driven state machine over the entity
//! scanner.
//!
//! [`DocumentScanner::next_event`] advances the scan by exactly one
//! structural event, delivering it to the [`DocumentHandler`] and returning
//! its [`EventKind`]. Internally each driver (XML declaration, prolog,
//! DTD, content, trailing misc) runs one step and either produces an event
//! or names the driver to continue with; a single loop does the dispatch,
//! so entity nesting never deepens the call stack across events.
//!
//! ```
//! use xmlscan::document::{DefaultHandler, DocumentScanner, EventKind};
//! use xmlscan::entity::InputSource;
//! use xmlscan::parser::ParseOptions;
//!
//! let mut handler = DefaultHandler;
//! let options = ParseOptions::default();
//! let mut scanner = DocumentScanner::new(
//!     InputSource::from_string("<doc>hi</doc>"),
//!     &options,
//!     &mut handler,
//! );
//! let mut events = Vec::new();
//! loop {
//!     let event = scanner.next_event().unwrap();
//!     events.push(event);
//!     if event == EventKind::EndDocument {
//!         break;
//!     }
//! }
//! assert_eq!(
//!     events,
//!     [
//!         EventKind::StartDocument,
//!         EventKind::StartElement,
//!         EventKind::Characters,
//!         EventKind::EndElement,
//!         EventKind::EndDocument,
//!     ]
//! );
//! assert!(scanner.next_event().unwrap_err().is_no_more_elements());
//! ```

mod content;
mod drivers;
pub mod handler;

use std::fmt;

use crate::dtd::DtdScanner;
use crate::entity::{EntityStore, InputSource};
use crate::error::{ErrorKind, ErrorSeverity, ParseError, SourceLocation};
use crate::namespace::NamespaceContext;
use crate::parser::ParseOptions;
use crate::scanner::EntityScanner;
use crate::util::dict::Symbol;
use crate::util::qname::QName;

pub use handler::{Attribute, Attributes, DefaultHandler, DocumentHandler};

/// The structural events returned by [`DocumentScanner::next_event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    StartDocument,
    XmlDecl,
    /// The DOCTYPE declaration with its internal and external subsets.
    Dtd,
    StartElement,
    EmptyElement,
    EndElement,
    Characters,
    /// A complete CDATA section.
    CData,
    Comment,
    ProcessingInstruction,
    /// A general entity started expanding in content.
    StartEntity,
    /// A general entity finished expanding.
    EndEntity,
    EndDocument,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EventKind::StartDocument => "start document",
            EventKind::XmlDecl => "XML declaration",
            EventKind::Dtd => "DTD",
            EventKind::StartElement => "start element",
            EventKind::EmptyElement => "empty element",
            EventKind::EndElement => "end element",
            EventKind::Characters => "characters",
            EventKind::CData => "CDATA section",
            EventKind::Comment => "comment",
            EventKind::ProcessingInstruction => "processing instruction",
            EventKind::StartEntity => "start entity",
            EventKind::EndEntity => "end entity",
            EventKind::EndDocument => "end document",
        };
        f.write_str(s)
    }
}

/// Where the scan is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScannerState {
    /// Before the optional XML declaration.
    XmlDecl,
    /// Between the XML declaration and the root element.
    Prolog,
    /// Inside the internal subset.
    DtdInternalDecls,
    /// The internal subset is done and the external subset is about to open.
    DtdExternal,
    /// Inside the external subset.
    DtdExternalDecls,
    /// Inside the root element.
    Content,
    /// After the root element.
    TrailingMisc,
    /// The document was fully scanned.
    Terminated,
    /// A fatal error stopped the scan.
    Failed,
}

/// The active driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Driver {
    XmlDecl,
    Prolog,
    Dtd,
    Content,
    TrailingMisc,
}

/// Outcome of one driver step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    /// An event was delivered; return it to the caller.
    Event(EventKind),
    /// Continue with another driver.
    Switch(Driver),
    /// Run the same driver again.
    Again,
}

/// An entity reference found while coalescing character data, to be
/// handled at the start of the next step.
#[derive(Debug, Clone, PartialEq, Eq)]
enum PendingRef {
    /// A character reference to report as an entity (`#65`, `#x41`).
    Char { name: String, value: char },
    /// A predefined entity to report as an entity.
    Builtin { name: Symbol, value: char },
    /// A declared or undeclared general entity.
    Named(Symbol),
}

/// One scan of one document.
///
/// Owns the entity stack, namespace context and declarations for the
/// duration of the scan. Options are copied once at construction. The
/// session must not be shared across threads; [`reset`](Self::reset)
/// reuses it for another document.
pub struct DocumentScanner<'h> {
    scanner: EntityScanner,
    entities: EntityStore,
    ns: NamespaceContext,
    options: ParseOptions,
    handler: &'h mut dyn DocumentHandler,
    dtd: DtdScanner,
    state: ScannerState,
    driver: Driver,
    started: bool,
    failure: Option<ParseError>,
    /// Diagnostics already handed to the handler.
    delivered: usize,
    /// Open elements, outermost first.
    elements: Vec<QName>,
    /// Open general entities in content.
    entity_depth: usize,
    standalone: bool,
    seen_doctype: bool,
    seen_root: bool,
    pending_ref: Option<PendingRef>,
    pending_external_subset: Option<InputSource>,
}

impl<'h> DocumentScanner<'h> {
    /// Creates a session over `document`.
    pub fn new(
        document: InputSource,
        options: &ParseOptions,
        handler: &'h mut dyn DocumentHandler,
    ) -> Self {
        Self {
            scanner: Self::open(document, options),
            entities: EntityStore::new(),
            ns: NamespaceContext::new(),
            options: options.clone(),
            handler,
            dtd: DtdScanner::new(),
            state: ScannerState::XmlDecl,
            driver: Driver::XmlDecl,
            started: false,
            failure: None,
            delivered: 0,
            elements: Vec::new(),
            entity_depth: 0,
            standalone: false,
            seen_doctype: false,
            seen_root: false,
            pending_ref: None,
            pending_external_subset: None,
        }
    }

    fn open(document: InputSource, options: &ParseOptions) -> EntityScanner {
        EntityScanner::new(
            document,
            options.buffer_size,
            options.security.clone(),
            options.continue_after_fatal_error,
        )
    }

    /// Starts over on a new document with the same options and handler.
    /// Declarations, namespace bindings and limit counters are cleared.
    pub fn reset(&mut self, document: InputSource) {
        self.scanner = Self::open(document, &self.options);
        self.entities.reset();
        self.ns.reset();
        self.dtd.reset();
        self.state = ScannerState::XmlDecl;
        self.driver = Driver::XmlDecl;
        self.started = false;
        self.failure = None;
        self.delivered = 0;
        self.elements.clear();
        self.entity_depth = 0;
        self.standalone = false;
        self.seen_doctype = false;
        self.seen_root = false;
        self.pending_ref = None;
        self.pending_external_subset = None;
    }

    /// Scans up to and including the next event.
    ///
    /// # Errors
    ///
    /// Returns the fatal error that stopped the scan; every later call
    /// returns it again. After [`EventKind::EndDocument`] the error kind is
    /// [`ErrorKind::NoMoreElements`].
    pub fn next_event(&mut self) -> Result<EventKind, ParseError> {
        if let Some(err) = &self.failure {
            return Err(err.clone());
        }
        if self.state == ScannerState::Terminated {
            return Err(self.scanner.error(
                ErrorKind::NoMoreElements,
                "NoMoreElements",
                "the end of the document has already been reached",
            ));
        }
        let result = self.run();
        self.flush_diagnostics();
        result.map_err(|err| {
            log::trace!("scan failed: {err}");
            self.state = ScannerState::Failed;
            self.failure = Some(err.clone());
            err
        })
    }

    fn run(&mut self) -> Result<EventKind, ParseError> {
        if !self.started {
            self.started = true;
            self.handler.start_document();
            return Ok(EventKind::StartDocument);
        }
        loop {
            let step = match self.driver {
                Driver::XmlDecl => self.xml_decl_step()?,
                Driver::Prolog => self.prolog_step()?,
                Driver::Dtd => self.dtd_step()?,
                Driver::Content => self.content_step()?,
                Driver::TrailingMisc => self.trailing_misc_step()?,
            };
            match step {
                Step::Event(kind) => return Ok(kind),
                Step::Switch(driver) => {
                    log::trace!("driver {:?} -> {driver:?}", self.driver);
                    self.driver = driver;
                }
                Step::Again => {}
            }
        }
    }

    /// Hands new warnings and recovered errors to the handler.
    fn flush_diagnostics(&mut self) {
        let pending = self.scanner.pending_diagnostics();
        for diagnostic in pending.iter().skip(self.delivered) {
            match diagnostic.severity {
                ErrorSeverity::Warning => self.handler.warning(diagnostic),
                ErrorSeverity::Error => self.handler.error(diagnostic),
                ErrorSeverity::Fatal => self.handler.fatal_error(diagnostic),
            }
        }
        self.delivered = pending.len();
    }

    /// Where the scan is.
    #[must_use]
    pub fn state(&self) -> ScannerState {
        self.state
    }

    /// The position of the next unread character in the innermost entity.
    #[must_use]
    pub fn location(&self) -> SourceLocation {
        self.scanner.location()
    }

    /// Number of general entities currently expanding in content.
    #[must_use]
    pub fn entity_depth(&self) -> usize {
        self.entity_depth
    }

    /// Number of open elements.
    #[must_use]
    pub fn element_depth(&self) -> usize {
        self.elements.len()
    }

    /// The entity declarations collected so far.
    #[must_use]
    pub fn entities(&self) -> &EntityStore {
        &self.entities
    }

    /// The underlying entity scanner.
    #[must_use]
    pub fn entity_scanner(&self) -> &EntityScanner {
        &self.scanner
    }

    fn set_state(&mut self, state: ScannerState) {
        log::trace!("state {:?} -> {state:?}", self.state);
        self.state = state;
    }
}

impl fmt::Debug for DocumentScanner<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DocumentScanner")
            .field("state", &self.state)
            .field("driver", &self.driver)
            .field("elements", &self.elements.len())
            .field("entity_depth", &self.entity_depth)
            .field("scanner", &self.scanner)
            .finish_non_exhaustive()
    }
}
