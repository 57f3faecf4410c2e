//! Server frame encoder. Server frames are final and never masked.

use bytes::{BufMut, BytesMut};
use tokio_util::codec::Encoder;

use crate::protocol::{WsError, WsFrame};

#[derive(Debug, Default)]
pub struct WsEncoder;

impl Encoder<WsFrame> for WsEncoder {
    type Error = WsError;

    fn encode(&mut self, frame: WsFrame, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let payload = frame.payload();
        dst.reserve(payload.len() + 10);
        dst.put_u8(0x80 | frame.opcode() as u8);

        match payload.len() {
            len if len < 126 => dst.put_u8(len as u8),
            len if len <= u16::MAX as usize => {
                dst.put_u8(126);
                dst.put_u16(len as u16);
            }
            len => {
                dst.put_u8(127);
                dst.put_u64(len as u64);
            }
        }

        dst.put_slice(payload);
        Ok(())
    }
}
