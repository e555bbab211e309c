//! Scans the same documents with every small buffer size, so that each
//! token is split by a refill at every possible offset.

#![allow(clippy::unwrap_used)]

mod common;

use pretty_assertions::assert_eq;

use common::{error, events, record};
use xmlscan::document::{DocumentScanner, EventKind};
use xmlscan::entity::InputSource;
use xmlscan::parser::ParseOptions;

const SIZES: std::ops::RangeInclusive<usize> = 1..=24;

fn with_buffer(size: usize) -> ParseOptions {
    ParseOptions::default().buffer_size(size)
}

// ---------------------------------------------------------------------------
// Newline normalization
// ---------------------------------------------------------------------------

#[test]
fn test_newlines_fold_at_every_split() {
    let input = "<r>a\r\nb\rc\nd\r\n\r\ne</r>";
    for size in SIZES {
        let (recorder, result) = record(input, &with_buffer(size));
        result.unwrap();
        assert_eq!(recorder.text(), "a\nb\nc\nd\n\ne", "buffer size {size}");
    }
}

#[test]
fn test_line_count_follows_folded_newlines() {
    let input = "<r>a\r\nb\rc\nd</x>";
    for size in SIZES {
        let err = error(input, &with_buffer(size));
        assert_eq!(err.code, "ETagRequired");
        assert_eq!(err.location.line, 4, "buffer size {size}");
    }
}

#[test]
fn test_xml11_folds_nel_and_line_separator() {
    let input = "<?xml version='1.1'?><r>a\u{85}b\u{2028}c\r\u{85}d</r>";
    for size in SIZES {
        let (recorder, result) = record(input, &with_buffer(size));
        result.unwrap();
        assert_eq!(recorder.text(), "a\nb\nc\nd", "buffer size {size}");
    }
}

#[test]
fn test_split_crlf_in_system_literal_counts_one_line() {
    let input = "<!DOCTYPE r SYSTEM 'ab\r\ncd'>\n<r></x>";
    for size in 1..=30 {
        let (recorder, result) = record(input, &with_buffer(size));
        let err = result.unwrap_err();
        assert_eq!(err.code, "ETagRequired");
        assert_eq!(err.location.line, 3, "buffer size {size}");
        assert!(
            recorder.events.contains(&"doctype(r,ab\ncd)".to_string()),
            "buffer size {size}: {:?}",
            recorder.events
        );
    }
}

#[test]
fn test_xml10_keeps_nel() {
    let (recorder, result) = record("<r>a\u{85}b</r>", &with_buffer(2));
    result.unwrap();
    assert_eq!(recorder.text(), "a\u{85}b");
}

#[test]
fn test_attribute_newlines_become_spaces() {
    for size in SIZES {
        let got = events("<r a='x\r\ny\tz'/>", &with_buffer(size));
        assert_eq!(got[1], "emptyElement(r,[a=x y z])", "buffer size {size}");
    }
}

// ---------------------------------------------------------------------------
// Names and delimiters
// ---------------------------------------------------------------------------

#[test]
fn test_names_are_identical_for_every_split() {
    let element = "averyveryverylongelementname-with.parts_42";
    let attribute = "another_long.attribute-name";
    let input = format!("<{element} {attribute}='v'></{element}>");
    let expected = events(&input, &with_buffer(8192));
    for size in SIZES {
        assert_eq!(events(&input, &with_buffer(size)), expected, "buffer size {size}");
    }
    assert_eq!(expected[1], format!("startElement({element},[{attribute}=v])"));
}

#[test]
fn test_prefixed_names_are_identical_for_every_split() {
    let input = "<prefix:element xmlns:prefix='urn:p' prefix:attr='v'/>";
    let expected = events(input, &with_buffer(8192));
    for size in SIZES {
        assert_eq!(events(input, &with_buffer(size)), expected, "buffer size {size}");
    }
    assert!(expected[2].starts_with("emptyElement(prefix:element{urn:p},"));
}

#[test]
fn test_delimiters_split_across_refills() {
    let input = "<r><![CDATA[a]]b]>c]]><!--x-y--><?pi d?e?></r>";
    for size in SIZES {
        let got = events(input, &with_buffer(size));
        let text: String = got
            .iter()
            .filter_map(|e| e.strip_prefix("characters("))
            .map(|t| t.trim_end_matches(')'))
            .collect();
        assert_eq!(text, "a]]b]>c", "buffer size {size}");
        assert!(got.contains(&"comment(x-y)".to_string()), "buffer size {size}");
        assert!(got.contains(&"pi(pi,d?e)".to_string()), "buffer size {size}");
    }
}

#[test]
fn test_xml_declaration_with_tiny_buffer() {
    let input = "<?xml version='1.0' encoding='UTF-8' standalone='no'?><r/>";
    for size in SIZES {
        let got = events(input, &with_buffer(size));
        assert_eq!(
            got[1], "xmlDecl(version=1.0,encoding=UTF-8,standalone=false)",
            "buffer size {size}"
        );
    }
}

#[test]
fn test_characters_are_bounded_by_buffer_size() {
    let input = format!("<r>{}&amp;b&#65;\r\nc</r>", "a".repeat(10_000));
    let expected = format!("{}&bA\nc", "a".repeat(10_000));
    for size in [1, 2, 3, 8, 64, 1000] {
        let (recorder, result) = record(&input, &with_buffer(size));
        result.unwrap();
        let payloads: Vec<&str> = recorder
            .events
            .iter()
            .filter_map(|e| e.strip_prefix("characters(")?.strip_suffix(')'))
            .collect();
        assert!(payloads.len() >= 10_000 / size, "buffer size {size}");
        for payload in &payloads {
            assert!(payload.chars().count() <= size, "buffer size {size}: {payload:?}");
        }
        assert_eq!(payloads.concat(), expected, "buffer size {size}");
    }
}

// ---------------------------------------------------------------------------
// Entity nesting
// ---------------------------------------------------------------------------

const NESTED: &str = "<!DOCTYPE r [\
    <!ENTITY a 'x&b;y'>\
    <!ENTITY b 'z&c;'>\
    <!ENTITY c '!'>\
]><r>&a;-&b;<e>&c;</e></r>";

#[test]
fn test_entity_depth_is_conserved() {
    for size in SIZES {
        let (recorder, result) = record(NESTED, &with_buffer(size));
        result.unwrap();
        assert_eq!(recorder.entity_depth, 0, "buffer size {size}");
        assert_eq!(recorder.max_entity_depth, 3, "buffer size {size}");
        assert_eq!(
            recorder.count("startEntity"),
            recorder.count("endEntity"),
            "buffer size {size}"
        );
        assert_eq!(recorder.text(), "xz!y-z!!", "buffer size {size}");
    }
}

#[test]
fn test_session_entity_depth_returns_to_zero() {
    let options = with_buffer(3);
    let mut recorder = common::Recorder::default();
    let mut scanner = DocumentScanner::new(InputSource::from_string(NESTED), &options, &mut recorder);
    let mut deepest = 0;
    loop {
        let event = scanner.next_event().unwrap();
        deepest = deepest.max(scanner.entity_depth());
        if event == EventKind::EndDocument {
            break;
        }
    }
    assert_eq!(deepest, 3);
    assert_eq!(scanner.entity_depth(), 0);
}
