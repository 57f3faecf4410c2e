//! Parsers for the small text formats carried in request heads and form bodies.
//!
//! None of them fail: malformed pieces are skipped or decoded lossily, so a request
//! with an odd cookie or query string is still served.

pub mod content_type;
pub mod cookie;
pub mod lang;
pub mod query;

pub use cookie::CookieJar;
pub use query::{QueryMap, QueryValue};

use std::borrow::Cow;

use percent_encoding::percent_decode_str;

/// Percent-decodes `input`, invalid utf-8 becomes U+FFFD.
pub(crate) fn decode_component(input: &str) -> String {
    percent_decode_str(input).decode_utf8_lossy().into_owned()
}

/// Form decoding: `+` is a space, then percent-decoding.
pub(crate) fn decode_form_component(input: &str) -> String {
    let input: Cow<'_, str> = if input.contains('+') { Cow::Owned(input.replace('+', " ")) } else { Cow::Borrowed(input) };
    decode_component(&input)
}
