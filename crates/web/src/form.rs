//! Request body reading for HTTP handlers.
//!
//! Form bodies are decoded into parameters and uploaded files, anything else is kept
//! as raw bytes. Every byte read counts against the message limit.

use std::collections::HashMap;
use std::fmt::Display;

use bytes::{Bytes, BytesMut};
use http::StatusCode;
use http_body::Body;
use http_body_util::BodyExt;
use mime::Mime;
use strand_http::params::{self, QueryMap};
use strand_http::protocol::{Multipart, MultipartError};
use thiserror::Error;
use tracing::debug;

/// A file received in a multipart/form-data body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    filename: String,
    content_type: Option<String>,
    content: Bytes,
}

impl UploadedFile {
    pub fn new(filename: impl Into<String>, content_type: Option<String>, content: Bytes) -> Self {
        Self { filename: filename.into(), content_type, content }
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn content_type(&self) -> Option<&str> {
        self.content_type.as_deref()
    }

    pub fn content(&self) -> &Bytes {
        &self.content
    }

    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }
}

/// What a request body was decoded into.
#[derive(Debug, Default)]
pub struct FormData {
    pub fields: QueryMap,
    pub files: HashMap<String, UploadedFile>,
    /// The body as received when it was not a form.
    pub body: Bytes,
}

#[derive(Error, Debug)]
pub enum FormError {
    #[error("request body exceeds the limit of {limit} bytes")]
    TooLarge { limit: usize },

    #[error("malformed multipart body: {source}")]
    Multipart {
        #[from]
        source: MultipartError,
    },

    #[error("read request body error: {reason}")]
    Body { reason: String },
}

impl FormError {
    /// The status the client gets for this error.
    pub fn status(&self) -> StatusCode {
        match self {
            FormError::TooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            FormError::Multipart { .. } | FormError::Body { .. } => StatusCode::BAD_REQUEST,
        }
    }

    fn body<S: ToString>(str: S) -> Self {
        Self::Body { reason: str.to_string() }
    }
}

#[derive(Debug)]
struct Budget {
    used: usize,
    limit: usize,
}

impl Budget {
    fn spend(&mut self, len: usize) -> Result<(), FormError> {
        self.used = self.used.saturating_add(len);
        if self.used > self.limit {
            return Err(FormError::TooLarge { limit: self.limit });
        }
        Ok(())
    }
}

/// Reads `body` according to `content_type`.
///
/// multipart/form-data is parsed while it streams in, urlencoded bodies go through the
/// query parser, other bodies are collected as is.
pub async fn read_form<B>(content_type: Option<&str>, mut body: B, limit: usize) -> Result<FormData, FormError>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    if body.is_end_stream() {
        return Ok(FormData::default());
    }
    if body.size_hint().lower() > limit as u64 {
        return Err(FormError::TooLarge { limit });
    }

    let mut budget = Budget { used: 0, limit };
    let mime = content_type.and_then(|value| value.parse::<Mime>().ok());

    match mime {
        Some(mime) if mime.type_() == mime::MULTIPART && mime.subtype() == mime::FORM_DATA => {
            // parsed again by the decoder, which needs the raw boundary parameter
            let content_type = content_type.unwrap_or_default();
            read_multipart(Multipart::from_content_type(body, content_type)?, &mut budget).await
        }
        Some(mime) if mime.essence_str() == mime::APPLICATION_WWW_FORM_URLENCODED.essence_str() => {
            let bytes = read_all(&mut body, &mut budget).await?;
            let fields = params::query::parse(&String::from_utf8_lossy(&bytes));
            Ok(FormData { fields, ..FormData::default() })
        }
        _ => Ok(FormData { body: read_all(&mut body, &mut budget).await?, ..FormData::default() }),
    }
}

async fn read_all<B>(body: &mut B, budget: &mut Budget) -> Result<Bytes, FormError>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    let mut buf = BytesMut::new();
    while let Some(frame) = body.frame().await {
        let frame = frame.map_err(FormError::body)?;
        if let Ok(data) = frame.into_data() {
            budget.spend(data.len())?;
            buf.extend_from_slice(&data);
        }
    }
    Ok(buf.freeze())
}

async fn read_multipart<B>(mut multipart: Multipart<B>, budget: &mut Budget) -> Result<FormData, FormError>
where
    B: Body<Data = Bytes> + Unpin,
    B::Error: Display,
{
    let mut form = FormData::default();

    while let Some(mut field) = multipart.next_field().await? {
        let mut content = BytesMut::new();
        while let Some(chunk) = field.chunk().await? {
            budget.spend(chunk.len())?;
            content.extend_from_slice(&chunk);
        }

        let name = field.name().to_string();
        match field.filename() {
            Some(filename) if field.is_file() => {
                debug!(field = %name, filename, len = content.len(), "received uploaded file");
                let file = UploadedFile::new(filename, field.content_type().map(str::to_string), content.freeze());
                form.files.insert(name, file);
            }
            _ => form.fields.insert(&name, String::from_utf8_lossy(&content).into_owned()),
        }
    }

    Ok(form)
}
