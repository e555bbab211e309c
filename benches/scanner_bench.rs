#![allow(clippy::expect_used)]

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::fmt::Write;
use xmlscan::document::{Attributes, DefaultHandler, DocumentHandler};
use xmlscan::entity::InputSource;
use xmlscan::parser::{scan_source, scan_str, ParseOptions};
use xmlscan::util::qname::QName;

// ---------------------------------------------------------------------------
// Document generators
// ---------------------------------------------------------------------------

/// Generates a small XML document with approximately 10 elements.
fn make_small_xml() -> String {
    let mut xml = String::from("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<root>\n");
    for i in 0..10 {
        let _ = writeln!(xml, "  <item id=\"{i}\">Value {i}</item>");
    }
    xml.push_str("</root>\n");
    xml
}

/// Generates a medium XML document with approximately 100 elements.
fn make_medium_xml() -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<catalog>\n");
    for i in 0..100 {
        let _ = writeln!(
            xml,
            "  <book id=\"bk{i}\"><title>Title {i}</title>\
             <author>Author {i}</author>\
             <price>{}.99</price></book>",
            10 + i
        );
    }
    xml.push_str("</catalog>\n");
    xml
}

/// Generates a large XML document with approximately 1000 elements.
fn make_large_xml() -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n<database>\n");
    for i in 0..1000 {
        let _ = writeln!(
            xml,
            "  <record id=\"{i}\"><name>Record {i}</name>\
             <value>{}</value><status>active</status></record>",
            i * 42
        );
    }
    xml.push_str("</database>\n");
    xml
}

/// Generates a deeply nested XML document with the given nesting depth.
fn make_nested_xml(depth: usize) -> String {
    let mut xml = String::from("<?xml version=\"1.0\"?>\n");
    for i in 0..depth {
        let _ = write!(xml, "<level{i}>");
    }
    xml.push_str("leaf");
    for i in (0..depth).rev() {
        let _ = write!(xml, "</level{i}>");
    }
    xml
}

/// Generates a namespace-heavy document.
fn make_namespace_heavy_xml() -> String {
    let mut xml = String::from(
        "<root xmlns=\"urn:default\" xmlns:a=\"urn:a\" xmlns:b=\"urn:b\" xmlns:c=\"urn:c\">\n",
    );
    for i in 0..200 {
        let _ = writeln!(
            xml,
            "  <a:item b:ref=\"{i}\" c:kind=\"k\"><b:name xmlns:d=\"urn:d\" d:x=\"1\">n{i}</b:name></a:item>"
        );
    }
    xml.push_str("</root>\n");
    xml
}

/// Generates a document whose content is mostly entity references.
fn make_entity_heavy_xml() -> String {
    let mut xml = String::from(
        "<!DOCTYPE doc [\n<!ENTITY co \"Example Corporation\">\n\
         <!ENTITY sig \"-- &co; --\">\n]>\n<doc>\n",
    );
    for i in 0..500 {
        let _ = writeln!(xml, "  <p n=\"{i}\">&sig; &amp; &#x41;&lt;&co;</p>");
    }
    xml.push_str("</doc>\n");
    xml
}

// ---------------------------------------------------------------------------
// Scanning benchmarks
// ---------------------------------------------------------------------------

fn bench_scan_small(c: &mut Criterion) {
    let xml = make_small_xml();
    let options = ParseOptions::default();
    c.bench_function("scan_small", |b| {
        b.iter(|| scan_str(black_box(&xml), &options, &mut DefaultHandler));
    });
}

fn bench_scan_medium(c: &mut Criterion) {
    let xml = make_medium_xml();
    let options = ParseOptions::default();
    c.bench_function("scan_medium", |b| {
        b.iter(|| scan_str(black_box(&xml), &options, &mut DefaultHandler));
    });
}

fn bench_scan_large(c: &mut Criterion) {
    let xml = make_large_xml();
    let options = ParseOptions::default();
    c.bench_function("scan_large", |b| {
        b.iter(|| scan_str(black_box(&xml), &options, &mut DefaultHandler));
    });
}

fn bench_scan_large_bytes(c: &mut Criterion) {
    let xml = make_large_xml().into_bytes();
    let options = ParseOptions::default();
    c.bench_function("scan_large_bytes", |b| {
        b.iter(|| {
            let source = InputSource::from_bytes(black_box(xml.clone()));
            scan_source(source, &options, &mut DefaultHandler)
        });
    });
}

fn bench_scan_deeply_nested(c: &mut Criterion) {
    let xml = make_nested_xml(500);
    let options = ParseOptions::default();
    c.bench_function("scan_deeply_nested", |b| {
        b.iter(|| scan_str(black_box(&xml), &options, &mut DefaultHandler));
    });
}

fn bench_scan_namespace_heavy(c: &mut Criterion) {
    let xml = make_namespace_heavy_xml();
    let options = ParseOptions::default();
    c.bench_function("scan_namespace_heavy", |b| {
        b.iter(|| scan_str(black_box(&xml), &options, &mut DefaultHandler));
    });
}

fn bench_scan_entity_heavy(c: &mut Criterion) {
    let xml = make_entity_heavy_xml();
    let options = ParseOptions::default();
    c.bench_function("scan_entity_heavy", |b| {
        b.iter(|| scan_str(black_box(&xml), &options, &mut DefaultHandler));
    });
}

fn bench_scan_small_buffer(c: &mut Criterion) {
    let xml = make_medium_xml();
    let options = ParseOptions::default().buffer_size(64);
    c.bench_function("scan_small_buffer", |b| {
        b.iter(|| scan_str(black_box(&xml), &options, &mut DefaultHandler));
    });
}

// ---------------------------------------------------------------------------
// Handler benchmark
// ---------------------------------------------------------------------------

/// A minimal handler that counts elements, used for benchmarking the
/// callback path without allocation overhead from recording events.
struct CountingHandler {
    elements: u64,
    characters: u64,
}

impl DocumentHandler for CountingHandler {
    fn start_element(&mut self, _name: &QName, _attributes: &Attributes) {
        self.elements += 1;
    }

    fn empty_element(&mut self, _name: &QName, _attributes: &Attributes) {
        self.elements += 1;
    }

    fn characters(&mut self, _text: &str) {
        self.characters += 1;
    }
}

fn bench_counting_handler(c: &mut Criterion) {
    let xml = make_medium_xml();
    let options = ParseOptions::default();
    c.bench_function("counting_handler", |b| {
        b.iter(|| {
            let mut handler = CountingHandler {
                elements: 0,
                characters: 0,
            };
            scan_str(black_box(&xml), &options, &mut handler).expect("scan failed");
            black_box(handler.elements);
        });
    });
}

criterion_group!(
    scanning,
    bench_scan_small,
    bench_scan_medium,
    bench_scan_large,
    bench_scan_large_bytes,
    bench_scan_deeply_nested,
    bench_scan_namespace_heavy,
    bench_scan_entity_heavy,
    bench_scan_small_buffer,
);

criterion_group!(handlers, bench_counting_handler);

criterion_main!(scanning, handlers);
