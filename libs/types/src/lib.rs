//! # Formlink Types - Shared Data Model
//!
//! Pure data structures for the formlink protocol: the form data model that
//! crosses the process boundary and the error taxonomy shared by the client
//! and service sides.
//!
//! ## What This Crate Contains
//! - Form records (`FormId`, `FormRequest`, `FormInfo`, `FormInfoFilter`, ...)
//! - Wire result codes (`ErrCode`) and the unified `FormError` taxonomy
//!
//! ## What This Crate Does NOT Contain
//! - Encoding/decoding rules (belongs in `formlink-codec`)
//! - Transport or connection handling (belongs in `formlink-client`)
//! - Dispatch or business logic (belongs in `formlink-manager`)

pub mod error;
pub mod form;

pub use error::{
    CodecError, ErrCode, FormError, FormResult, ProtocolRejection, TransportError,
};
pub use form::{
    FormBindingData, FormDimension, FormId, FormInfo, FormInfoFilter, FormRequest, FormState,
};
