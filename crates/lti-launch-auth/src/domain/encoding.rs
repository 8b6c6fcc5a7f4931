//! # OAuth Percent-Encoding
//!
//! RFC 5849 Section 3.6: every byte outside the unreserved set
//! (`ALPHA / DIGIT / "-" / "." / "_" / "~"`) is encoded as `%XX` with
//! uppercase hex digits. Space becomes `%20`, never `+`.

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

/// Characters left unescaped besides ASCII alphanumerics.
const OAUTH_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Percent-encode a value for use in a signature base string or signing key.
pub fn percent_encode(value: &str) -> String {
    utf8_percent_encode(value, OAUTH_ENCODE_SET).to_string()
}
