//! Converts handler return values into HTTP responses.
//!
//! Handlers return anything implementing [`Responder`]: strings, status codes,
//! prebuilt responses, [`Json`] values, and `Result`/`Option` combinations of them.

use http::header::{CONTENT_TYPE, HeaderValue};
use http::{Response, StatusCode};
use serde::Serialize;
use std::convert::Infallible;
use tracing::error;

use crate::Request;
use crate::body::ResponseBody;

/// A trait for types that can be converted into HTTP responses.
pub trait Responder {
    fn response_to(self, req: &Request) -> Response<ResponseBody>;
}

impl<T: Responder, E: Responder> Responder for Result<T, E> {
    fn response_to(self, req: &Request) -> Response<ResponseBody> {
        match self {
            Ok(t) => t.response_to(req),
            Err(e) => e.response_to(req),
        }
    }
}

/// `None` is a 404.
impl<T: Responder> Responder for Option<T> {
    fn response_to(self, req: &Request) -> Response<ResponseBody> {
        match self {
            Some(t) => t.response_to(req),
            None => StatusCode::NOT_FOUND.response_to(req),
        }
    }
}

impl<B> Responder for Response<B>
where
    B: Into<ResponseBody>,
{
    fn response_to(self, _req: &Request) -> Response<ResponseBody> {
        self.map(Into::into)
    }
}

impl<T: Responder> Responder for (StatusCode, T) {
    fn response_to(self, req: &Request) -> Response<ResponseBody> {
        let (status, responder) = self;
        let mut response = responder.response_to(req);
        *response.status_mut() = status;
        response
    }
}

impl<T: Responder> Responder for Box<T> {
    fn response_to(self, req: &Request) -> Response<ResponseBody> {
        (*self).response_to(req)
    }
}

impl Responder for () {
    fn response_to(self, _req: &Request) -> Response<ResponseBody> {
        Response::new(ResponseBody::empty())
    }
}

/// The status with its canonical reason as plain text body.
impl Responder for StatusCode {
    fn response_to(self, _req: &Request) -> Response<ResponseBody> {
        status_response(self)
    }
}

pub(crate) fn status_response(status: StatusCode) -> Response<ResponseBody> {
    let mut response = plain_text(ResponseBody::from(status.canonical_reason().unwrap_or_default()));
    *response.status_mut() = status;
    response
}

impl Responder for &'static str {
    fn response_to(self, _req: &Request) -> Response<ResponseBody> {
        plain_text(ResponseBody::from(self))
    }
}

impl Responder for String {
    fn response_to(self, _req: &Request) -> Response<ResponseBody> {
        plain_text(ResponseBody::from(self))
    }
}

impl Responder for Infallible {
    fn response_to(self, _req: &Request) -> Response<ResponseBody> {
        match self {}
    }
}

fn plain_text(body: ResponseBody) -> Response<ResponseBody> {
    let mut response = Response::new(body);
    response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

/// Serializes the wrapped value as an `application/json` body.
#[derive(Debug, Clone)]
pub struct Json<T>(pub T);

impl<T: Serialize> Responder for Json<T> {
    fn response_to(self, req: &Request) -> Response<ResponseBody> {
        match serde_json::to_vec(&self.0) {
            Ok(bytes) => {
                let mut response = Response::new(ResponseBody::from(bytes));
                response.headers_mut().insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
                response
            }
            Err(e) => {
                error!(cause = %e, "serialize json response error");
                StatusCode::INTERNAL_SERVER_ERROR.response_to(req)
            }
        }
    }
}
