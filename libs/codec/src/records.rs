//! Wire encodings for the `formlink-types` records.
//!
//! Field order is part of the wire contract: new fields are appended, never
//! inserted. Nested records encode recursively through the same traits.

use crate::wire::{Decoder, Encoder, WireDecode, WireEncode};
use crate::CodecResult;
use formlink_types::{
    CodecError, FormBindingData, FormDimension, FormId, FormInfo, FormInfoFilter, FormRequest,
    FormState,
};

impl WireEncode for FormId {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_i64(self.raw());
        Ok(())
    }
}

impl WireDecode for FormId {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        Ok(FormId::new(dec.get_i64()?))
    }
}

impl WireEncode for FormDimension {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_u8((*self).into());
        Ok(())
    }
}

impl WireDecode for FormDimension {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let raw = dec.get_u8()?;
        FormDimension::try_from(raw).map_err(|_| CodecError::UnknownEnumValue {
            what: "form dimension",
            value: raw as i64,
        })
    }
}

impl WireEncode for FormState {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_i32((*self).into());
        Ok(())
    }
}

impl WireDecode for FormState {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        let raw = dec.get_i32()?;
        FormState::try_from(raw).map_err(|_| CodecError::UnknownEnumValue {
            what: "form state",
            value: raw as i64,
        })
    }
}

impl WireEncode for FormRequest {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_str(&self.bundle)?;
        enc.put_str(&self.ability)?;
        enc.put_str(&self.module)?;
        enc.put_str(&self.form_name)?;
        self.dimension.encode(enc)?;
        enc.put_bool(self.temporary);
        self.params.encode(enc)
    }
}

impl WireDecode for FormRequest {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        Ok(FormRequest {
            bundle: dec.get_str()?,
            ability: dec.get_str()?,
            module: dec.get_str()?,
            form_name: dec.get_str()?,
            dimension: Option::decode(dec)?,
            temporary: dec.get_bool()?,
            params: WireDecode::decode(dec)?,
        })
    }
}

impl WireEncode for FormInfo {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        self.id.encode(enc)?;
        enc.put_str(&self.bundle)?;
        enc.put_str(&self.ability)?;
        enc.put_str(&self.module)?;
        enc.put_str(&self.name)?;
        self.dimension.encode(enc)?;
        enc.put_bool(self.temporary);
        enc.put_bool(self.visible);
        enc.put_bool(self.update_enabled);
        Ok(())
    }
}

impl WireDecode for FormInfo {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        Ok(FormInfo {
            id: FormId::decode(dec)?,
            bundle: dec.get_str()?,
            ability: dec.get_str()?,
            module: dec.get_str()?,
            name: dec.get_str()?,
            dimension: FormDimension::decode(dec)?,
            temporary: dec.get_bool()?,
            visible: dec.get_bool()?,
            update_enabled: dec.get_bool()?,
        })
    }
}

impl WireEncode for FormInfoFilter {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        self.bundle.encode(enc)?;
        self.module.encode(enc)
    }
}

impl WireDecode for FormInfoFilter {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        Ok(FormInfoFilter {
            bundle: Option::decode(dec)?,
            module: Option::decode(dec)?,
        })
    }
}

impl WireEncode for FormBindingData {
    fn encode(&self, enc: &mut Encoder) -> CodecResult<()> {
        enc.put_str(&self.content)?;
        self.images.encode(enc)
    }
}

impl WireDecode for FormBindingData {
    fn decode(dec: &mut Decoder<'_>) -> CodecResult<Self> {
        Ok(FormBindingData {
            content: dec.get_str()?,
            images: Vec::decode(dec)?,
        })
    }
}
