//! Opening external entities through the resolver callbacks.

use super::{access_allowed, ParseOptions};
use crate::document::DocumentHandler;
use crate::entity::{
    ExternalEntityRequest, ExternalSubsetRequest, InputSource, RequestKind, ResourceIdentifier,
};
use crate::error::{ErrorKind, ParseError};
use crate::scanner::chars::is_space;
use crate::scanner::EntityScanner;

fn access_code(kind: RequestKind) -> &'static str {
    match kind {
        RequestKind::ExternalSubset => "AccessExternalDTD",
        RequestKind::GeneralEntity | RequestKind::ParameterEntity => "AccessExternalEntity",
    }
}

/// Checks `system_id` against the allowed protocols. A refusal is fatal.
fn check_access(
    options: &ParseOptions,
    scanner: &mut EntityScanner,
    system_id: &str,
    kind: RequestKind,
) -> Result<bool, ParseError> {
    if access_allowed(system_id, &options.access_external_dtd) {
        return Ok(true);
    }
    scanner.report_fatal(
        ErrorKind::WellFormedness,
        access_code(kind),
        format!(
            "external access to \"{system_id}\" is not allowed: the protocol is not in the allowed list \"{}\"",
            options.access_external_dtd
        ),
    )?;
    Ok(false)
}

/// Asks the entity resolver for the text of an external entity or the
/// external subset.
///
/// Returns `None` when no resolver is installed or it declined.
pub(crate) fn resolve_external(
    options: &ParseOptions,
    scanner: &mut EntityScanner,
    name: &str,
    kind: RequestKind,
    identifier: &ResourceIdentifier,
) -> Result<Option<InputSource>, ParseError> {
    let Some(resolver) = &options.entity_resolver else {
        log::debug!("no entity resolver for {name}, not loading it");
        return Ok(None);
    };
    let Some(expanded) = identifier.system_id() else {
        return Ok(None);
    };
    if !check_access(options, scanner, expanded, kind)? {
        return Ok(None);
    }
    let request = ExternalEntityRequest {
        name,
        kind,
        system_id: identifier.literal_system_id.as_deref().unwrap_or(expanded),
        public_id: identifier.public_id.as_deref(),
        base_system_id: identifier.base_system_id.as_deref(),
        expanded_system_id: expanded,
    };
    let source = resolver(request).map(|mut source| {
        source.inherit_identifier(identifier);
        source
    });
    log::debug!(
        "resolved {name} ({expanded}): {}",
        if source.is_some() { "loaded" } else { "declined" }
    );
    Ok(source)
}

/// Asks the external-subset resolver for a grammar for a document that
/// has no DOCTYPE declaration.
pub(crate) fn resolve_external_subset(
    options: &ParseOptions,
    scanner: &mut EntityScanner,
    root_name: &str,
) -> Result<Option<InputSource>, ParseError> {
    let Some(resolver) = &options.external_subset_resolver else {
        return Ok(None);
    };
    let base = scanner
        .current()
        .identifier()
        .system_id()
        .map(str::to_string);
    let request = ExternalSubsetRequest {
        root_name,
        base_system_id: base.as_deref(),
    };
    let Some(source) = resolver(request) else {
        return Ok(None);
    };
    if let Some(system_id) = source.identifier().system_id() {
        let system_id = system_id.to_string();
        if !check_access(options, scanner, &system_id, RequestKind::ExternalSubset)? {
            return Ok(None);
        }
    }
    log::debug!("external subset supplied for root element {root_name}");
    Ok(Some(source))
}

/// Scans the text declaration at the start of a freshly pushed external
/// entity, if there is one.
pub(crate) fn scan_text_decl(
    scanner: &mut EntityScanner,
    handler: &mut dyn DocumentHandler,
) -> Result<(), ParseError> {
    if scanner.looking_at("<?xml")? && scanner.peek_at(5)?.is_some_and(is_space) {
        scanner.skip_string("<?xml")?;
        let info = scanner.scan_xml_decl_or_text_decl(true)?;
        handler.text_decl(info.version.as_deref(), info.encoding.as_deref());
    } else {
        scanner.set_may_read_chunks(true);
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::document::DefaultHandler;
    use crate::entity::EntityKind;
    use crate::security::SecurityManager;

    fn scanner() -> EntityScanner {
        EntityScanner::new(
            InputSource::from_string("").with_system_id("dir/doc.xml"),
            16,
            SecurityManager::new(),
            false,
        )
    }

    fn id(system: &str) -> ResourceIdentifier {
        ResourceIdentifier::new(None, Some(system.to_string()), Some("dir/doc.xml".to_string()))
    }

    #[test]
    fn test_without_resolver_nothing_is_loaded() {
        let opts = ParseOptions::default();
        let mut s = scanner();
        let got = resolve_external(&opts, &mut s, "e", RequestKind::GeneralEntity, &id("e.ent"));
        assert!(got.unwrap().is_none());
    }

    #[test]
    fn test_resolver_sees_expanded_id() {
        let opts = ParseOptions::default().entity_resolver(|req| {
            assert_eq!(req.system_id, "e.ent");
            assert_eq!(req.expanded_system_id, "dir/e.ent");
            assert_eq!(req.base_system_id, Some("dir/doc.xml"));
            Some(InputSource::from_string("text"))
        });
        let mut s = scanner();
        let source = resolve_external(&opts, &mut s, "e", RequestKind::GeneralEntity, &id("e.ent"))
            .unwrap()
            .unwrap();
        assert_eq!(source.identifier().system_id(), Some("dir/e.ent"));
    }

    #[test]
    fn test_access_check_refuses_protocol() {
        let opts = ParseOptions::default()
            .access_external_dtd("file")
            .entity_resolver(|_| Some(InputSource::from_string("")));
        let mut s = scanner();
        let err = resolve_external(
            &opts,
            &mut s,
            "[dtd]",
            RequestKind::ExternalSubset,
            &id("http://example.com/x.dtd"),
        )
        .unwrap_err();
        assert_eq!(err.code, "AccessExternalDTD");
    }

    #[test]
    fn test_text_decl_is_consumed() {
        let mut s = scanner();
        s.push_entity(
            "e",
            EntityKind::General,
            InputSource::from_string("<?xml encoding='UTF-8'?>body"),
            true,
        )
        .unwrap();
        scan_text_decl(&mut s, &mut DefaultHandler).unwrap();
        assert!(s.looking_at("body").unwrap());
    }

    #[test]
    fn test_pi_named_xml_prefix_is_not_a_text_decl() {
        let mut s = scanner();
        s.push_entity(
            "e",
            EntityKind::General,
            InputSource::from_string("<?xml-stylesheet?>"),
            true,
        )
        .unwrap();
        scan_text_decl(&mut s, &mut DefaultHandler).unwrap();
        assert!(s.looking_at("<?xml-stylesheet").unwrap());
        assert!(s.current().may_read_chunks);
    }
}
