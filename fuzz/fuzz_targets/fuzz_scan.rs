#![no_main]
use libfuzzer_sys::fuzz_target;
use xmlscan::document::DefaultHandler;
use xmlscan::entity::InputSource;
use xmlscan::parser::{scan_source, ParseOptions};

fuzz_target!(|data: &[u8]| {
    // Strict mode, small buffer so that tokens straddle refills
    let strict = ParseOptions::default().buffer_size(7);
    let _ = scan_source(InputSource::from_bytes(data.to_vec()), &strict, &mut DefaultHandler);
    // Recovery mode with tight limits
    let recover = ParseOptions::default()
        .continue_after_fatal_error(true)
        .entity_expansion_limit(1000)
        .max_element_depth(256);
    let _ = scan_source(InputSource::from_bytes(data.to_vec()), &recover, &mut DefaultHandler);
});
