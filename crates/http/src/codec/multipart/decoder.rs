use bytes::{Buf, Bytes, BytesMut};
use http::{HeaderMap, HeaderName, HeaderValue, header};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::codec::multipart::disposition;
use crate::codec::scanner::{BoundaryScanner, ScanStep};
use crate::ensure;
use crate::params::content_type;
use crate::protocol::MultipartError;

/// Longest accepted part header line, CRLF included.
const MAX_HEADER_LINE: usize = 8 * 1024;

/// RFC 2046 caps boundaries at 70 characters.
const MAX_BOUNDARY_LEN: usize = 70;

/// Parsed headers of one part, available before any of its payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldHead {
    name: String,
    filename: Option<String>,
    headers: HeaderMap,
}

impl FieldHead {
    pub(crate) fn new(name: String, filename: Option<String>) -> Self {
        Self { name, filename, headers: HeaderMap::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The uploaded file name, `None` for plain fields.
    pub fn filename(&self) -> Option<&str> {
        self.filename.as_deref()
    }

    pub fn is_file(&self) -> bool {
        self.filename.is_some()
    }

    /// Part headers except `Content-Disposition`.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn content_type(&self) -> Option<&str> {
        self.headers.get(header::CONTENT_TYPE).and_then(|value| value.to_str().ok())
    }
}

/// Output of [`MultipartDecoder`], in body order.
///
/// Every part yields `Field`, zero or more non-empty `Data` chunks and `FieldEnd`.
/// `End` follows the closing boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MultipartItem {
    Field(FieldHead),
    Data(Bytes),
    FieldEnd,
    End,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    FirstBoundary,
    /// After a delimiter: `\r\n` opens a part, `--` (when `allow_end`) closes the body.
    BoundaryTail { allow_end: bool, first: Option<u8> },
    Header,
    Data,
    FieldClosing,
    /// After the closing delimiter, an optional `\r\n`.
    RequestEnd { seen_cr: bool },
    Finished,
    Failed,
}

enum Progress {
    Item(MultipartItem),
    Continue,
    NeedMore,
}

/// Streaming multipart/form-data decoder.
///
/// Payload bytes are handed out as soon as they can't be part of a delimiter. Bytes
/// that might start one are withheld (consumed from the input) until the delimiter
/// completes or breaks; a broken delimiter prefix is re-emitted from the pattern.
#[derive(Debug)]
pub struct MultipartDecoder {
    scanner: BoundaryScanner,
    state: State,
    line: BytesMut,
    pending: Option<FieldHead>,
}

impl MultipartDecoder {
    /// Creates a decoder for `boundary` as found in the `Content-Type` header.
    pub fn new(boundary: &str) -> Result<Self, MultipartError> {
        ensure!(
            !boundary.is_empty() && boundary.len() <= MAX_BOUNDARY_LEN,
            MultipartError::invalid_boundary(format!("length {} is outside 1..={MAX_BOUNDARY_LEN}", boundary.len()))
        );
        ensure!(
            !boundary.bytes().any(|b| b == b'\r' || b == b'\n'),
            MultipartError::invalid_boundary("boundary contains CR or LF")
        );

        let mut pattern = BytesMut::with_capacity(boundary.len() + 4);
        pattern.extend_from_slice(b"\r\n--");
        pattern.extend_from_slice(boundary.as_bytes());

        // the body opens with `--<boundary>`, the leading CRLF is implied
        Ok(Self {
            scanner: BoundaryScanner::starting_at(pattern.freeze(), 2),
            state: State::FirstBoundary,
            line: BytesMut::new(),
            pending: None,
        })
    }

    /// Creates a decoder from a `Content-Type` header value.
    ///
    /// Fails with [`MultipartError::NoBoundary`] before any byte is read when the
    /// header has no `boundary` parameter.
    pub fn from_content_type(content_type: &str) -> Result<Self, MultipartError> {
        let boundary = content_type::boundary(content_type).ok_or(MultipartError::NoBoundary)?;
        Self::new(boundary)
    }

    /// The delimiter searched between parts, `\r\n--<boundary>`.
    pub fn delimiter(&self) -> &[u8] {
        self.scanner.pattern()
    }

    pub fn is_finished(&self) -> bool {
        self.state == State::Finished
    }

    pub fn is_failed(&self) -> bool {
        self.state == State::Failed
    }

    fn decode_next(&mut self, src: &mut BytesMut) -> Result<Option<MultipartItem>, MultipartError> {
        loop {
            let progress = match self.state {
                State::FirstBoundary => self.skip_first_boundary(src)?,
                State::BoundaryTail { allow_end, first } => self.read_boundary_tail(src, allow_end, first)?,
                State::Header => self.read_header(src)?,
                State::Data => self.read_data(src)?,
                State::FieldClosing => {
                    self.state = State::BoundaryTail { allow_end: true, first: None };
                    Progress::Item(MultipartItem::FieldEnd)
                }
                State::RequestEnd { seen_cr } => self.read_request_end(src, seen_cr)?,
                State::Finished => {
                    ensure!(src.is_empty(), MultipartError::AlreadyFinished);
                    Progress::NeedMore
                }
                State::Failed => return Err(MultipartError::Failed),
            };

            match progress {
                Progress::Item(item) => return Ok(Some(item)),
                Progress::Continue => {}
                Progress::NeedMore => return Ok(None),
            }
        }
    }

    fn skip_first_boundary(&mut self, src: &mut BytesMut) -> Result<Progress, MultipartError> {
        while let Some(&byte) = src.first() {
            src.advance(1);
            match self.scanner.step(byte) {
                ScanStep::Matched => {}
                ScanStep::Complete => {
                    self.scanner.reset();
                    self.state = State::BoundaryTail { allow_end: false, first: None };
                    return Ok(Progress::Continue);
                }
                ScanStep::Restarted { .. } | ScanStep::Missed { .. } => {
                    return Err(MultipartError::UnexpectedBoundarySymbol);
                }
            }
        }
        Ok(Progress::NeedMore)
    }

    fn read_boundary_tail(&mut self, src: &mut BytesMut, allow_end: bool, mut first: Option<u8>) -> Result<Progress, MultipartError> {
        while let Some(&byte) = src.first() {
            src.advance(1);
            match (first, byte) {
                (None, b'\r') => first = Some(byte),
                (None, b'-') if allow_end => first = Some(byte),
                (Some(b'\r'), b'\n') => {
                    self.state = State::Header;
                    return Ok(Progress::Continue);
                }
                (Some(b'-'), b'-') => {
                    self.state = State::RequestEnd { seen_cr: false };
                    return Ok(Progress::Continue);
                }
                _ => return Err(MultipartError::UnexpectedBoundarySymbol),
            }
        }
        self.state = State::BoundaryTail { allow_end, first };
        Ok(Progress::NeedMore)
    }

    fn read_header(&mut self, src: &mut BytesMut) -> Result<Progress, MultipartError> {
        loop {
            let Some(pos) = src.iter().position(|b| *b == b'\n') else {
                ensure!(
                    self.line.len() + src.len() <= MAX_HEADER_LINE,
                    MultipartError::HeaderTooLarge { max_size: MAX_HEADER_LINE }
                );
                self.line.extend_from_slice(&src.split());
                return Ok(Progress::NeedMore);
            };

            ensure!(self.line.len() + pos < MAX_HEADER_LINE, MultipartError::HeaderTooLarge { max_size: MAX_HEADER_LINE });
            self.line.extend_from_slice(&src.split_to(pos + 1));

            // a bare LF stays part of the line
            if !self.line.ends_with(b"\r\n") {
                continue;
            }

            let line = self.line.split();
            let line = &line[..line.len() - 2];

            if line.is_empty() {
                let head = self.pending.take().ok_or(MultipartError::InvalidHeader)?;
                trace!(name = head.name(), filename = ?head.filename(), "multipart field ready");
                self.state = State::Data;
                return Ok(Progress::Item(MultipartItem::Field(head)));
            }

            self.parse_header_line(line)?;
        }
    }

    fn parse_header_line(&mut self, line: &[u8]) -> Result<(), MultipartError> {
        let colon = line.iter().position(|b| *b == b':').filter(|pos| *pos > 0).ok_or(MultipartError::NoHeaderDelimiter)?;
        let name = line[..colon].trim_ascii();
        let value = line[colon + 1..].trim_ascii();

        match &mut self.pending {
            None => {
                ensure!(name.eq_ignore_ascii_case(b"content-disposition"), MultipartError::InvalidHeader);
                let value = std::str::from_utf8(value).map_err(|_| MultipartError::InvalidContentDisposition)?;
                let disposition = disposition::parse(value).ok_or(MultipartError::InvalidContentDisposition)?;
                self.pending = Some(FieldHead::new(disposition.name, disposition.filename));
            }
            Some(head) => {
                let name = HeaderName::from_bytes(name).map_err(|_| MultipartError::InvalidHeader)?;
                let value = HeaderValue::from_bytes(value).map_err(|_| MultipartError::InvalidHeader)?;
                head.headers.append(name, value);
            }
        }
        Ok(())
    }

    fn read_data(&mut self, src: &mut BytesMut) -> Result<Progress, MultipartError> {
        if src.is_empty() {
            return Ok(Progress::NeedMore);
        }

        // start of a partial delimiter match that began inside `src`
        let mut match_start: Option<usize> = None;

        for i in 0..src.len() {
            let step = self.scanner.step(src[i]);
            match step {
                ScanStep::Matched => {
                    if self.scanner.cursor() == 1 {
                        match_start = Some(i);
                    }
                }
                ScanStep::Complete => {
                    let data_end = match_start.unwrap_or(0);
                    let data = src.split_to(data_end).freeze();
                    src.advance(i + 1 - data_end);
                    self.scanner.reset();
                    self.state = State::FieldClosing;
                    return Ok(if data.is_empty() { Progress::Continue } else { Progress::Item(MultipartItem::Data(data)) });
                }
                ScanStep::Restarted { released } | ScanStep::Missed { released } => {
                    if match_start.is_none() && released > 0 {
                        // the broken match was carried over from an earlier arrival,
                        // hand its prefix out and rescan from the current byte
                        self.scanner.reset();
                        src.advance(i);
                        return Ok(Progress::Item(MultipartItem::Data(self.scanner.pattern().slice(..released))));
                    }
                    match_start = matches!(step, ScanStep::Restarted { .. }).then_some(i);
                }
            }
        }

        // a partial match at the end of the arrival is withheld
        let data_end = if self.scanner.cursor() == 0 { src.len() } else { match_start.unwrap_or(0) };
        let data = src.split_to(data_end).freeze();
        src.clear();

        Ok(if data.is_empty() { Progress::NeedMore } else { Progress::Item(MultipartItem::Data(data)) })
    }

    fn read_request_end(&mut self, src: &mut BytesMut, mut seen_cr: bool) -> Result<Progress, MultipartError> {
        while let Some(&byte) = src.first() {
            src.advance(1);
            match (seen_cr, byte) {
                (false, b'\r') => seen_cr = true,
                (true, b'\n') => {
                    self.state = State::Finished;
                    return Ok(Progress::Item(MultipartItem::End));
                }
                _ => return Err(MultipartError::InvalidRequestEnding),
            }
        }
        self.state = State::RequestEnd { seen_cr };
        Ok(Progress::NeedMore)
    }
}

impl Decoder for MultipartDecoder {
    type Item = MultipartItem;
    type Error = MultipartError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode_next(src) {
            Ok(item) => Ok(item),
            Err(e) => {
                self.state = State::Failed;
                Err(e)
            }
        }
    }

    /// A body may stop right after the closing delimiter without the final CRLF.
    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(item) = self.decode(buf)? {
            return Ok(Some(item));
        }

        match self.state {
            State::Finished => Ok(None),
            State::RequestEnd { seen_cr: false } => {
                self.state = State::Finished;
                Ok(Some(MultipartItem::End))
            }
            _ => {
                self.state = State::Failed;
                Err(MultipartError::UnexpectedEnd)
            }
        }
    }
}
