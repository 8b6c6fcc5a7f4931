//! Fuzz target for parsing and verifying launch form bodies.
//!
//! ## Running
//!
//! ```bash
//! cd crates/lti-launch-auth
//! cargo +nightly fuzz run fuzz_launch_form
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use lti_launch_auth::{is_lti_launch, parse_launch_path, LaunchRequest, SignatureVerifier};

#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzInput {
    method: String,
    path: String,
    body: Vec<u8>,
    secret: String,
}

fuzz_target!(|input: FuzzInput| {
    let url = format!("https://example.org{}", input.path);
    let request = LaunchRequest::from_form(input.method, &url, &input.body);

    let _ = is_lti_launch(request.params());
    let _ = parse_launch_path(&input.path);

    // Must never panic, and must be deterministic.
    let verifier = SignatureVerifier::default();
    let first = verifier.verify(&request, &input.secret);
    let second = verifier.verify(&request, &input.secret);
    assert_eq!(first, second);

    // Re-encoding the parsed parameters must preserve them.
    let body = request.to_form_body();
    let reparsed = LaunchRequest::from_form(request.method(), request.url(), body.as_bytes());
    assert_eq!(reparsed.params(), request.body_params());
});
