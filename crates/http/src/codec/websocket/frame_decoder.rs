//! Client frame decoder.
//!
//! Parses frame headers in place and only consumes them once the mask key is
//! available, so a header split across arrivals is simply re-read. Payload is
//! unmasked in slices of at most [`UNMASK_SLICE`] bytes; after each full slice the
//! decoder reports [`DecodeStep::Yield`] so a driver can give the runtime a turn
//! before continuing with a large frame.

use bytes::{Buf, BytesMut};
use tokio_util::codec::Decoder;
use tracing::trace;

use crate::ensure;
use crate::protocol::{OpCode, WsError, WsEvent, WsMessage};

pub const UNMASK_SLICE: usize = 16 * 1024;

const MAX_CONTROL_PAYLOAD: usize = 125;

/// Result of a single [`WsDecoder::decode_step`] call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeStep {
    Event(WsEvent),
    /// Nothing more can be done until more bytes arrive.
    NeedMore,
    /// A slice was unmasked and buffered bytes remain.
    Yield,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum State {
    WaitHeader,
    WaitLength16,
    WaitLength64,
    WaitMask,
    Unmasking,
    Closed,
    Failed,
}

/// Reassembles masked client frames into [`WsEvent`]s.
///
/// Data frames accumulate until a final frame completes the message; control frames
/// may arrive between fragments. A message whose accumulated size would pass
/// `limit` fails with [`WsError::MessageTooBig`] before any of its payload is read.
#[derive(Debug)]
pub struct WsDecoder {
    state: State,
    limit: usize,

    fin: bool,
    opcode: OpCode,
    /// header bytes parsed so far, still in the source buffer
    index: usize,
    length: usize,
    mask: [u8; 4],
    offset: usize,

    message_opcode: Option<OpCode>,
    message: BytesMut,
    control: BytesMut,
}

impl WsDecoder {
    pub fn new(limit: usize) -> Self {
        Self {
            state: State::WaitHeader,
            limit,
            fin: false,
            opcode: OpCode::Continuation,
            index: 0,
            length: 0,
            mask: [0; 4],
            offset: 0,
            message_opcode: None,
            message: BytesMut::new(),
            control: BytesMut::new(),
        }
    }

    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Returns true once a close frame was received.
    pub fn is_closed(&self) -> bool {
        self.state == State::Closed
    }

    pub fn is_failed(&self) -> bool {
        self.state == State::Failed
    }

    /// Advances as far as the buffered bytes allow, stopping after one event, at the
    /// end of the buffer, or after each unmasked slice.
    ///
    /// Any error is fatal: the decoder stays failed and returns [`WsError::Failed`]
    /// afterwards.
    pub fn decode_step(&mut self, src: &mut BytesMut) -> Result<DecodeStep, WsError> {
        match self.step(src) {
            Ok(step) => Ok(step),
            Err(e) => {
                self.state = State::Failed;
                self.message.clear();
                self.control.clear();
                Err(e)
            }
        }
    }

    fn step(&mut self, src: &mut BytesMut) -> Result<DecodeStep, WsError> {
        loop {
            match self.state {
                State::WaitHeader => {
                    if src.len() < 2 {
                        return Ok(DecodeStep::NeedMore);
                    }
                    self.parse_header(src[0], src[1])?;
                }
                State::WaitLength16 => {
                    if src.len() < 4 {
                        return Ok(DecodeStep::NeedMore);
                    }
                    self.length = u16::from_be_bytes([src[2], src[3]]) as usize;
                    self.index = 4;
                    self.state = State::WaitMask;
                }
                State::WaitLength64 => {
                    if src.len() < 10 {
                        return Ok(DecodeStep::NeedMore);
                    }
                    let high = u32::from_be_bytes([src[2], src[3], src[4], src[5]]);
                    ensure!(high == 0, WsError::PayloadTooLarge);
                    self.length = u32::from_be_bytes([src[6], src[7], src[8], src[9]]) as usize;
                    self.index = 10;
                    self.state = State::WaitMask;
                }
                State::WaitMask => {
                    if src.len() < self.index + 4 {
                        return Ok(DecodeStep::NeedMore);
                    }
                    let buffered = if self.opcode.is_control() { 0 } else { self.message.len() };
                    ensure!(
                        self.length.saturating_add(buffered) <= self.limit,
                        WsError::MessageTooBig { limit: self.limit }
                    );
                    self.mask.copy_from_slice(&src[self.index..self.index + 4]);
                    src.advance(self.index + 4);
                    self.index = 0;
                    self.offset = 0;
                    self.state = State::Unmasking;
                }
                State::Unmasking => {
                    if self.offset < self.length {
                        if src.is_empty() {
                            return Ok(DecodeStep::NeedMore);
                        }
                        let n = (self.length - self.offset).min(UNMASK_SLICE).min(src.len());
                        self.unmask(src.split_to(n));

                        if self.offset < self.length {
                            return Ok(if src.is_empty() { DecodeStep::NeedMore } else { DecodeStep::Yield });
                        }
                    }

                    self.state = State::WaitHeader;
                    if let Some(event) = self.finish_frame()? {
                        return Ok(DecodeStep::Event(event));
                    }
                }
                State::Closed => {
                    src.clear();
                    return Ok(DecodeStep::NeedMore);
                }
                State::Failed => return Err(WsError::Failed),
            }
        }
    }

    fn parse_header(&mut self, b0: u8, b1: u8) -> Result<(), WsError> {
        ensure!(b0 & 0x70 == 0, WsError::ExtensionsUnsupported);

        let opcode = OpCode::try_from(b0 & 0x0F).map_err(WsError::UnknownOpcode)?;
        let fin = b0 & 0x80 != 0;
        let length = (b1 & 0x7F) as usize;

        if opcode.is_control() {
            ensure!(fin && length <= MAX_CONTROL_PAYLOAD, WsError::InvalidControlFrame);
        }
        ensure!(b1 & 0x80 != 0, WsError::UnmaskedFrame);

        match (opcode, self.message_opcode) {
            (OpCode::Continuation, None) => return Err(WsError::UnexpectedContinuation),
            (OpCode::Text | OpCode::Binary, Some(current)) if current != opcode => return Err(WsError::InterleavedMessage),
            (OpCode::Text | OpCode::Binary, None) => self.message_opcode = Some(opcode),
            _ => {}
        }

        trace!(?opcode, fin, length, "websocket frame header");

        self.fin = fin;
        self.opcode = opcode;
        self.index = 2;
        self.length = length;
        self.state = match length {
            126 => State::WaitLength16,
            127 => State::WaitLength64,
            _ => State::WaitMask,
        };
        Ok(())
    }

    fn unmask(&mut self, mut chunk: BytesMut) {
        for (i, byte) in chunk.iter_mut().enumerate() {
            *byte ^= self.mask[(self.offset + i) % 4];
        }
        self.offset += chunk.len();

        if self.opcode.is_control() {
            self.control.unsplit(chunk);
        } else {
            self.message.unsplit(chunk);
        }
    }

    fn finish_frame(&mut self) -> Result<Option<WsEvent>, WsError> {
        match self.opcode {
            OpCode::Close => {
                self.control.clear();
                self.state = State::Closed;
                Ok(Some(WsEvent::Close))
            }
            OpCode::Ping => Ok(Some(WsEvent::Ping(self.control.split().freeze()))),
            OpCode::Pong => {
                self.control.clear();
                Ok(None)
            }
            OpCode::Text | OpCode::Binary | OpCode::Continuation => {
                if !self.fin {
                    return Ok(None);
                }

                let data = self.message.split().freeze();
                match self.message_opcode.take() {
                    Some(OpCode::Text) => {
                        let text = String::from_utf8(Vec::from(data)).map_err(|_| WsError::InvalidUtf8)?;
                        Ok(Some(WsEvent::Message(WsMessage::Text(text))))
                    }
                    _ => Ok(Some(WsEvent::Message(WsMessage::Binary(data)))),
                }
            }
        }
    }
}

impl Decoder for WsDecoder {
    type Item = WsEvent;
    type Error = WsError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            match self.decode_step(src)? {
                DecodeStep::Event(event) => return Ok(Some(event)),
                DecodeStep::NeedMore => return Ok(None),
                DecodeStep::Yield => {}
            }
        }
    }
}
