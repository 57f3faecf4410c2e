//! The request handed to HTTP handlers.
//!
//! A [`Request`] bundles the [`Connection`] with everything decoded from the request:
//! query and form parameters merged into one map, uploaded files, the raw body of
//! non-form requests and the path parameters captured by the router.

use std::collections::HashMap;
use std::sync::Arc;

use bytes::Bytes;
use serde::de::DeserializeOwned;
use strand_http::params::{QueryMap, QueryValue};

use crate::connection::Connection;
use crate::form::{FormData, UploadedFile};
use crate::session::Session;

/// Path parameters captured by the router, `/users/{id}` -> `id`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    params: HashMap<String, String>,
}

impl PathParams {
    pub fn new(params: HashMap<String, String>) -> Self {
        Self { params }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }
}

impl From<matchit::Params<'_, '_>> for PathParams {
    fn from(params: matchit::Params<'_, '_>) -> Self {
        Self { params: params.iter().map(|(key, value)| (key.to_string(), value.to_string())).collect() }
    }
}

#[derive(Debug)]
struct Inner {
    connection: Connection,
    params: QueryMap,
    files: HashMap<String, UploadedFile>,
    body: Bytes,
    path_params: PathParams,
}

/// Cheap to clone, every clone sees the same request.
#[derive(Debug, Clone)]
pub struct Request {
    inner: Arc<Inner>,
}

impl Request {
    /// Builds a request. Form fields are merged after the query string parameters.
    pub fn new(connection: Connection, form: FormData, path_params: PathParams) -> Self {
        let mut params = connection.query().clone();
        params.merge(form.fields);
        Self { inner: Arc::new(Inner { connection, params, files: form.files, body: form.body, path_params }) }
    }

    pub fn connection(&self) -> &Connection {
        &self.inner.connection
    }

    pub fn session(&self) -> &Arc<Session> {
        self.inner.connection.session()
    }

    /// First value of a query or form parameter.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.inner.params.get_str(key)
    }

    pub fn param_value(&self, key: &str) -> Option<&QueryValue> {
        self.inner.params.get(key)
    }

    /// Query string and form parameters, form values after query values.
    pub fn params(&self) -> &QueryMap {
        &self.inner.params
    }

    pub fn path_param(&self, key: &str) -> Option<&str> {
        self.inner.path_params.get(key)
    }

    pub fn path_params(&self) -> &PathParams {
        &self.inner.path_params
    }

    pub fn files(&self) -> &HashMap<String, UploadedFile> {
        &self.inner.files
    }

    pub fn file(&self, name: &str) -> Option<&UploadedFile> {
        self.inner.files.get(name)
    }

    /// The raw body, empty for form requests.
    pub fn body(&self) -> &Bytes {
        &self.inner.body
    }

    /// Deserializes the raw body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_slice(&self.inner.body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SessionStore;
    use http::header;
    use serde::Deserialize;
    use strand_http::protocol::RequestHeader;
    use std::time::Duration;

    fn connection(uri: &str) -> Connection {
        let header = RequestHeader::from(
            http::Request::builder().uri(uri).header(header::HOST, "localhost").body(()).unwrap(),
        );
        Connection::new(
            header,
            "127.0.0.1:40000".parse().unwrap(),
            "127.0.0.1:8080".parse().unwrap(),
            false,
            SessionStore::new(Duration::from_secs(60)),
        )
    }

    #[test]
    fn merge_query_and_form() {
        let form = FormData { fields: strand_http::params::query::parse("tag=b&title=x"), ..FormData::default() };
        let mut path_params = HashMap::new();
        path_params.insert("id".to_string(), "42".to_string());

        let request = Request::new(connection("/posts/42?page=1&tag=a"), form, PathParams::new(path_params));

        assert_eq!(request.param("page"), Some("1"));
        assert_eq!(request.params().get_all("tag"), &["a", "b"]);
        assert_eq!(request.param("title"), Some("x"));
        assert_eq!(request.path_param("id"), Some("42"));
        assert!(request.files().is_empty());
    }

    #[test]
    fn json_body() {
        #[derive(Deserialize)]
        struct Greeting {
            name: String,
        }

        let form = FormData { body: Bytes::from_static(b"{\"name\":\"ferris\"}"), ..FormData::default() };
        let request = Request::new(connection("/"), form, PathParams::default());

        assert_eq!(request.json::<Greeting>().unwrap().name, "ferris");
        assert!(request.clone().json::<Vec<u8>>().is_err());
    }
}
