//! Byte-level encode/decode primitives.
//!
//! All multi-byte integers are little-endian. Strings, byte buffers and
//! homogeneous sequences are length-prefixed with a `u32`. Every length field
//! is validated against a hard maximum *and* the remaining buffer before any
//! allocation proportional to the claimed length happens; a decoder that
//! fails leaves nothing half-built in caller-visible state because values are
//! only returned on full success.

use crate::CodecResult;
use formlink_types::CodecError;
use std::collections::BTreeMap;

/// Hard upper bound on the element count of any wire sequence.
pub const MAX_SEQUENCE_LEN: usize = 8192;

/// Hard upper bound on the byte length of any wire string.
pub const MAX_STRING_BYTES: usize = 64 * 1024;

/// Append-only writer for wire values.
#[derive(Debug, Default)]
pub struct Encoder {
    buf: Vec<u8>,
}

impl Encoder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.buf
    }

    pub fn put_u8(&mut self, v: u8) {
        self.buf.push(v);
    }

    pub fn put_u16(&mut self, v: u16) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    pub fn put_bool(&mut self, v: bool) {
        self.buf.push(v as u8);
    }

    pub fn put_str(&mut self, s: &str) -> CodecResult<()> {
        if s.len() > MAX_STRING_BYTES {
            return Err(CodecError::StringTooLong {
                len: s.len(),
                max: MAX_STRING_BYTES,
            });
        }
        self.put_u32(s.len() as u32);
        self.buf.extend_from_slice(s.as_bytes());
        Ok(())
    }

    /// Encode a homogeneous sequence. The same bound enforced on decode is
    /// enforced here so an over-long catalog can never be emitted.
    pub fn put_seq<T: WireEncode>(&mut self, items: &[T]) -> CodecResult<()> {
        if items.len() > MAX_SEQUENCE_LEN {
            return Err(CodecError::SequenceTooLong {
                len: items.len(),
                max: MAX_SEQUENCE_LEN,
            });
        }
        self.put_u32(items.len() as u32);
        for item in items {
            item.encode(self)?;
        }
        Ok(())
    }
}

/// Cursor over a received byte buffer.
///
/// Reads advance the cursor only when the full value is available; a failed
/// read returns an error without exposing a partial value.
#[derive(Debug)]
pub struct Decoder<'a> {
    buf: &'a [u8],
    offset: usize,
}

impl<'a> Decoder<'a> {
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, offset: 0 }
    }

    pub fn remaining(&self) -> usize {
        self.buf.len() - self.offset
    }

    pub fn is_exhausted(&self) -> bool {
        self.remaining() == 0
    }

    fn take(&mut self, n: usize) -> CodecResult<&'a [u8]> {
        if self.remaining() < n {
            return Err(CodecError::BufferUnderrun {
                need: n,
                got: self.remaining(),
            });
        }
        let slice = &self.buf[self.offset..self.offset + n];
        self.offset += n;
        Ok(slice)
    }

    pub fn get_u8(&mut self) -> CodecResult<u8> {
        Ok(self.take(1)?[0])
    }

    pub fn get_u16(&mut self) -> CodecResult<u16> {
        let b = self.take(2)?;
        Ok(u16::from_le_bytes([b[0], b[1]]))
    }

    pub fn get_u32(&mut self) -> CodecResult<u32> {
        let b = self.take(4)?;
        Ok(u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_u64(&mut self) -> CodecResult<u64> {
        let b = self.take(8)?;
        Ok(u64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn get_i32(&mut self) -> CodecResult<i32> {
        let b = self.take(4)?;
        Ok(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))
    }

    pub fn get_i64(&mut self) -> CodecResult<i64> {
        let b = self.take(8)?;
        Ok(i64::from_le_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    pub fn get_bool(&mut self) -> CodecResult<bool> {
        Ok(self.get_u8()? != 0)
    }

    pub fn get_str(&mut self) -> CodecResult<String> {
        let len = self.get_u32()? as usize;
        if len > MAX_STRING_BYTES {
            return Err(CodecError::StringTooLong {
                len,
                max: MAX_STRING_BYTES,
            });
        }
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| CodecError::InvalidUtf8)
    }

    /// Decode a homogeneous sequence. The declared element count is checked
    /// against [`MAX_SEQUENCE_LEN`] and then against the remaining buffer
    /// (one byte per element minimum) before any allocation happens.
    pub fn get_seq<T: WireDecode>(&mut self) -> CodecResult<Vec<T>> {
        let len = self.get_u32()? as usize;
        if len > MAX_SEQUENCE_LEN {
            return Err(CodecError::SequenceTooLong {
                len,
                max: MAX_SEQUENCE_LEN,
            });
        }
        if len > self.remaining() {
            return Err(CodecError::BufferUnderrun {
                need: len,
                got: self.remaining(),
            });
        }
        let mut items = Vec::with_capacity(len);
        for _ in 0..len {
            items.push(T::decode(self)?);
        }
        Ok(items)
    }
}

/// A value with a wire encoding.
pub trait WireEncode {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()>;
}

/// A value decodable from the wire. Decoding either yields a complete value
/// or fails; there is no partial result.
pub trait WireDecode: Sized {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self>;
}

macro_rules! impl_wire_primitive {
    ($ty:ty, $put:ident, $get:ident) => {
        impl WireEncode for $ty {
            fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
                enc.$put(*self);
                Ok(())
            }
        }
        impl WireDecode for $ty {
            fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
                dec.$get()
            }
        }
    };
}

impl_wire_primitive!(u8, put_u8, get_u8);
impl_wire_primitive!(u16, put_u16, get_u16);
impl_wire_primitive!(u32, put_u32, get_u32);
impl_wire_primitive!(u64, put_u64, get_u64);
impl_wire_primitive!(i32, put_i32, get_i32);
impl_wire_primitive!(i64, put_i64, get_i64);
impl_wire_primitive!(bool, put_bool, get_bool);

impl WireEncode for String {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_str(self)
    }
}

impl WireDecode for String {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.get_str()
    }
}

impl<T: WireEncode> WireEncode for Vec<T> {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_seq(self)
    }
}

impl<T: WireDecode> WireDecode for Vec<T> {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        dec.get_seq()
    }
}

impl<T: WireEncode> WireEncode for Option<T> {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        match self {
            Some(v) => {
                enc.put_bool(true);
                v.encode(enc)
            }
            None => {
                enc.put_bool(false);
                Ok(())
            }
        }
    }
}

impl<T: WireDecode> WireDecode for Option<T> {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        if dec.get_bool()? {
            Ok(Some(T::decode(dec)?))
        } else {
            Ok(None)
        }
    }
}

// Sorted maps ride the wire as a sequence of key/value pairs; BTreeMap
// iteration order makes the encoding deterministic.
impl WireEncode for BTreeMap<String, String> {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        if self.len() > MAX_SEQUENCE_LEN {
            return Err(CodecError::SequenceTooLong {
                len: self.len(),
                max: MAX_SEQUENCE_LEN,
            });
        }
        enc.put_u32(self.len() as u32);
        for (k, v) in self {
            enc.put_str(k)?;
            enc.put_str(v)?;
        }
        Ok(())
    }
}

impl WireDecode for BTreeMap<String, String> {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let len = dec.get_u32()? as usize;
        if len > MAX_SEQUENCE_LEN {
            return Err(CodecError::SequenceTooLong {
                len,
                max: MAX_SEQUENCE_LEN,
            });
        }
        if len > dec.remaining() {
            return Err(CodecError::BufferUnderrun {
                need: len,
                got: dec.remaining(),
            });
        }
        let mut map = BTreeMap::new();
        for _ in 0..len {
            let k = dec.get_str()?;
            let v = dec.get_str()?;
            map.insert(k, v);
        }
        Ok(map)
    }
}
