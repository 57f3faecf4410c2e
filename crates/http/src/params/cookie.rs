//! `Cookie` header parsing.

use std::collections::HashMap;

use super::decode_component;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE: &str = "_session";

/// Cookies sent by the client. The session cookie is kept apart from the others.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CookieJar {
    cookies: HashMap<String, String>,
    session_id: Option<String>,
}

impl CookieJar {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.cookies.get(name).map(String::as_str)
    }

    pub fn session_id(&self) -> Option<&str> {
        self.session_id.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.cookies.iter().map(|(name, value)| (name.as_str(), value.as_str()))
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }

    /// Adds the cookies of another `Cookie` header, its values win.
    pub fn extend(&mut self, other: CookieJar) {
        self.cookies.extend(other.cookies);
        if other.session_id.is_some() {
            self.session_id = other.session_id;
        }
    }
}

/// Parses `name=value; name2=value2`. Pairs without `=` or with an empty name are
/// skipped, values are percent-decoded and a later duplicate wins.
pub fn parse(header: &str) -> CookieJar {
    let mut jar = CookieJar::default();

    for pair in header.split(';') {
        let Some((name, value)) = pair.split_once('=') else {
            continue;
        };
        let name = name.trim();
        if name.is_empty() {
            continue;
        }

        let value = decode_component(value.trim().trim_matches('"'));
        if name == SESSION_COOKIE {
            jar.session_id = Some(value);
        } else {
            jar.cookies.insert(name.to_string(), value);
        }
    }
    jar
}
