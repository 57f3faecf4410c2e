//! `Accept-Language` parsing.

use std::cmp::Ordering;

/// Returns the language tags ordered by descending quality.
///
/// A missing `q` counts as 1 and an unparsable one as 0. Tags of equal quality keep
/// the order the client sent them in.
pub fn parse(header: &str) -> Vec<String> {
    let mut langs = header
        .split(',')
        .filter_map(|item| {
            let mut parts = item.split(';');
            let tag = parts.next()?.trim();
            if tag.is_empty() {
                return None;
            }

            let quality = parts
                .filter_map(|param| param.split_once('='))
                .find(|(name, _)| name.trim().eq_ignore_ascii_case("q"))
                .map_or(1.0, |(_, value)| value.trim().parse::<f32>().ok().filter(|q| q.is_finite()).unwrap_or(0.0));

            Some((tag.to_string(), quality))
        })
        .collect::<Vec<_>>();

    langs.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    langs.into_iter().map(|(tag, _)| tag).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_by_quality() {
        assert_eq!(parse("en;q=0.8,fr;q=0.9,de"), vec!["de", "fr", "en"]);
        assert_eq!(parse("en-US, en;q=0.5, ro ; q = 0.9"), vec!["en-US", "ro", "en"]);
    }

    #[test]
    fn equal_quality_keeps_order() {
        assert_eq!(parse("ro,en,fr"), vec!["ro", "en", "fr"]);
    }

    #[test]
    fn unparsable_quality_is_zero() {
        assert_eq!(parse("xx;q=abc,en;q=0.1"), vec!["en", "xx"]);
        assert!(parse("").is_empty());
        assert!(parse(" , ").is_empty());
    }
}
