//! # Formlink Protocol Codec
//!
//! ## Purpose
//!
//! This crate is the "rules" layer of the formlink system: the fixed wire
//! contract between application processes and the privileged form service.
//! It owns the opcode catalog, the byte-level encode/decode primitives with
//! bounded-length decoding, and the request/reply frame format.
//!
//! ## Integration Points
//!
//! - **Client side**: `formlink-client` encodes requests and decodes replies
//!   through `encode_request` / `decode_reply`
//! - **Service side**: `formlink-manager` decodes requests and encodes replies
//!   through `decode_request` / `encode_reply`
//! - **Validation**: every length field is checked against a hard maximum and
//!   the remaining buffer before any proportional allocation
//!
//! ## Architecture Role
//!
//! ```text
//! formlink-types → [formlink-codec] → formlink-client / formlink-manager
//!      ↑                 ↓                      ↓
//!  Pure Data        Wire Contract         Proxy / Dispatcher
//!  Structures       Opcodes + Frames      Typed Call Sites
//! ```
//!
//! ## What This Crate Contains
//! - `Opcode` catalog in reserved numeric bands
//! - `Encoder` / `Decoder` primitives and the `WireEncode` / `WireDecode` traits
//! - `FrameHeader` and request/reply framing with interface-token handling
//! - Wire encodings for the records in `formlink-types`
//!
//! ## What This Crate Does NOT Contain
//! - Transport or connection handling (consumed, not designed, by formlink)
//! - Business semantics of any operation

pub mod frame;
pub mod opcode;
pub mod records;
pub mod wire;

// Re-export key types for convenience
pub use frame::{
    decode_reply, decode_request, encode_reply, encode_request, FrameHeader, ReplyFrame,
    RequestFrame, FLAG_ONEWAY, FRAME_MAGIC, INTERFACE_TOKEN, MAX_PAYLOAD_BYTES, PROTOCOL_VERSION,
};
pub use opcode::{Opcode, OpcodeBand};
pub use wire::{
    Decoder, Encoder, WireDecode, WireEncode, MAX_SEQUENCE_LEN, MAX_STRING_BYTES,
};

pub use formlink_types::error::CodecError;

/// Result alias for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;
