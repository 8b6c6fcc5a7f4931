//! Fuzz target for signature base string construction.
//!
//! ## Running
//!
//! ```bash
//! cd crates/lti-launch-auth
//! cargo +nightly fuzz run fuzz_base_string
//! ```

#![no_main]

use libfuzzer_sys::fuzz_target;
use lti_launch_auth::domain::base_string::{normalize_url, signature_base_string};
use lti_launch_auth::domain::encoding::percent_encode;

#[derive(Debug, arbitrary::Arbitrary)]
struct FuzzInput {
    method: String,
    url: String,
    params: Vec<(String, String)>,
}

fuzz_target!(|input: FuzzInput| {
    // Encoded output only ever contains unreserved characters and escapes.
    for (name, value) in &input.params {
        for encoded in [percent_encode(name), percent_encode(value)] {
            assert!(encoded
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b"-._~%".contains(&b)));
        }
    }

    let _ = normalize_url(&input.url);

    // Parameter order never changes the base string.
    let forward = signature_base_string(&input.method, &input.url, &input.params);
    let mut reversed = input.params.clone();
    reversed.reverse();
    let backward = signature_base_string(&input.method, &input.url, &reversed);
    assert_eq!(forward.ok(), backward.ok());
});
