//! Request/reply framing.
//!
//! Every message starts with a fixed 16-byte [`FrameHeader`]. Request
//! payloads carry the interface token followed by the operation's arguments;
//! reply payloads carry the result code followed by the declared outputs,
//! present only when the code denotes success.
//!
//! ```text
//! ┌──────────────────┬──────────────────────────────────────┐
//! │ FrameHeader      │ Payload                              │
//! │ (16 bytes)       │ (payload_len bytes)                  │
//! └──────────────────┴──────────────────────────────────────┘
//! Request payload: [token: str][args...]
//! Reply payload:   [code: i32][outputs... iff code == 0]
//! ```

use crate::opcode::Opcode;
use crate::wire::{Decoder, Encoder};
use crate::CodecResult;
use bytes::Bytes;
use formlink_types::CodecError;
use std::mem::size_of;
use zerocopy::{AsBytes, FromBytes, FromZeroes, Ref};

/// Magic word identifying a formlink frame ("FLK1").
pub const FRAME_MAGIC: u32 = 0x464C_4B31;

/// Current protocol version. Bumped only for incompatible framing changes;
/// the opcode catalog itself grows without a version bump.
pub const PROTOCOL_VERSION: u8 = 1;

/// Contract-identity string checked by the dispatcher before any decoding.
pub const INTERFACE_TOKEN: &str = "formlink.FormManager.v1";

/// Hard upper bound on a frame payload.
pub const MAX_PAYLOAD_BYTES: usize = 1024 * 1024;

/// Frame flag: no reply is expected for this request.
pub const FLAG_ONEWAY: u8 = 0b0000_0001;

/// Fixed frame header (16 bytes).
///
/// Field ordering is chosen to achieve exactly 16 bytes without padding:
/// u32, then two u16-aligned bytes plus the u16 opcode, then two u32 fields.
#[repr(C)]
#[derive(Debug, Clone, Copy, AsBytes, FromBytes, FromZeroes)]
pub struct FrameHeader {
    /// Magic MUST be first for immediate protocol identification.
    pub magic: u32,
    /// Protocol version.
    pub version: u8,
    /// Frame flags (oneway, reserved bits zero).
    pub flags: u8,
    /// Operation identifier. Carried raw so unknown opcodes can be rejected
    /// by the dispatcher instead of the parser.
    pub opcode: u16,
    /// Payload bytes following the header.
    pub payload_len: u32,
    /// Reserved for future use, must be zero.
    pub reserved: u32,
}

impl FrameHeader {
    pub const SIZE: usize = 16;

    pub fn new(opcode: u16, flags: u8, payload_len: u32) -> Self {
        Self {
            magic: FRAME_MAGIC,
            version: PROTOCOL_VERSION,
            flags,
            opcode,
            payload_len,
            reserved: 0,
        }
    }

    /// Validate magic, version and the declared payload length against the
    /// actual buffer. Nothing past the header is interpreted here.
    pub fn validate(&self, full_frame: &[u8]) -> CodecResult<()> {
        if self.magic != FRAME_MAGIC {
            return Err(CodecError::InvalidMagic {
                expected: FRAME_MAGIC,
                actual: self.magic,
            });
        }
        if self.version != PROTOCOL_VERSION {
            return Err(CodecError::UnsupportedVersion(self.version));
        }
        let declared = self.payload_len as usize;
        if declared > MAX_PAYLOAD_BYTES {
            return Err(CodecError::PayloadTooLarge {
                len: declared,
                max: MAX_PAYLOAD_BYTES,
            });
        }
        let actual = full_frame.len() - Self::SIZE;
        if declared != actual {
            return Err(CodecError::PayloadLengthMismatch { declared, actual });
        }
        Ok(())
    }
}

fn parse_header(frame: &[u8]) -> CodecResult<&FrameHeader> {
    if frame.len() < FrameHeader::SIZE {
        return Err(CodecError::BufferUnderrun {
            need: FrameHeader::SIZE,
            got: frame.len(),
        });
    }
    let header = Ref::<_, FrameHeader>::new(&frame[..FrameHeader::SIZE])
        .ok_or(CodecError::BufferUnderrun {
            need: FrameHeader::SIZE,
            got: frame.len(),
        })?
        .into_ref();
    header.validate(frame)?;
    Ok(header)
}

/// A decoded request frame. `args` is positioned just past the token.
#[derive(Debug)]
pub struct RequestFrame<'a> {
    pub opcode: u16,
    pub flags: u8,
    pub token: String,
    pub args: Decoder<'a>,
}

/// A decoded reply frame. `outputs` is positioned just past the result code
/// and is only meaningful when `code == 0`.
#[derive(Debug)]
pub struct ReplyFrame<'a> {
    pub opcode: u16,
    pub code: i32,
    pub outputs: Decoder<'a>,
}

/// Encode a request frame for `opcode`, with `encode_args` writing the
/// operation's declared argument schema.
pub fn encode_request<F>(opcode: Opcode, token: &str, encode_args: F) -> CodecResult<Bytes>
where
    F: FnOnce(&mut Encoder) -> CodecResult<()>,
{
    let mut payload = Encoder::new();
    payload.put_str(token)?;
    encode_args(&mut payload)?;
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(CodecError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_BYTES,
        });
    }

    let flags = if opcode.is_oneway() { FLAG_ONEWAY } else { 0 };
    let header = FrameHeader::new(opcode.into(), flags, payload.len() as u32);

    let mut frame = Vec::with_capacity(FrameHeader::SIZE + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(payload.as_slice());
    Ok(Bytes::from(frame))
}

/// Decode a request frame. The interface token is read but NOT verified
/// here; the dispatcher owns that check and must perform it before touching
/// `args`.
pub fn decode_request(frame: &[u8]) -> CodecResult<RequestFrame<'_>> {
    let header = parse_header(frame)?;
    let mut args = Decoder::new(&frame[FrameHeader::SIZE..]);
    let token = args.get_str()?;
    Ok(RequestFrame {
        opcode: header.opcode,
        flags: header.flags,
        token,
        args,
    })
}

/// Encode a reply frame. Outputs are written only when `code` is the
/// success sentinel; failure replies deliberately carry no trailing bytes.
pub fn encode_reply(opcode: u16, code: i32, outputs: Option<&Encoder>) -> CodecResult<Bytes> {
    let mut payload = Vec::with_capacity(size_of::<i32>());
    payload.extend_from_slice(&code.to_le_bytes());
    if code == 0 {
        if let Some(out) = outputs {
            payload.extend_from_slice(out.as_slice());
        }
    }
    if payload.len() > MAX_PAYLOAD_BYTES {
        return Err(CodecError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_BYTES,
        });
    }

    let header = FrameHeader::new(opcode, 0, payload.len() as u32);
    let mut frame = Vec::with_capacity(FrameHeader::SIZE + payload.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(&payload);
    Ok(Bytes::from(frame))
}

/// Decode a reply frame. Only the leading result code is interpreted; the
/// caller must consult `code` before reading any outputs.
pub fn decode_reply(frame: &[u8]) -> CodecResult<ReplyFrame<'_>> {
    let header = parse_header(frame)?;
    let mut outputs = Decoder::new(&frame[FrameHeader::SIZE..]);
    let code = outputs.get_i32()?;
    Ok(ReplyFrame {
        opcode: header.opcode,
        code,
        outputs,
    })
}
