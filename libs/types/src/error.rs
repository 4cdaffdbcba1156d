//! Error taxonomy for the formlink protocol.
//!
//! Every failure a caller can observe is one of five kinds: structural wire
//! damage (`CodecError`), channel failure (`TransportError`), contract
//! rejection (`ProtocolRejection`), a business code passed through verbatim
//! (`FormError::Service`), or a rejection issued solely because the client is
//! mid-reconnect (`FormError::RecoveryInProgress`). Internal result codes are
//! private to the protocol; the published subset lives behind the error
//! translator in `formlink-manager`.

use num_enum::{IntoPrimitive, TryFromPrimitive};
use thiserror::Error;

/// Result codes carried in reply frames. `Ok` (0) is the success sentinel;
/// outputs are only present after it.
///
/// The numeric values are part of the wire contract and are never reused,
/// though the set is free to grow across versions.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum ErrCode {
    Ok = 0,
    CommonFailure = 1,
    PermissionDenied = 2,
    InvalidParam = 3,
    GetInfoFailed = 4,
    FormNotFound = 9,
    NotSelfForm = 10,
    MaxFormsExceeded = 11,
    OperationTimeout = 12,
    /// Request carried the wrong interface token.
    InterfaceMismatch = 20,
    /// Opcode matched no cataloged operation.
    UnknownOperation = 21,
    /// Arguments failed structural decoding; the service was never invoked.
    StructuralError = 22,
    ServiceNotReady = 30,
    InRecovery = 36,
    NotSystemApp = 40,
}

impl ErrCode {
    pub fn is_ok(&self) -> bool {
        matches!(self, ErrCode::Ok)
    }
}

/// Structural failure while encoding or decoding wire data.
///
/// A decode failure aborts the whole message; partially decoded values are
/// never exposed to callers. Length fields are trusted against nothing but
/// the hard maxima and the remaining buffer.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CodecError {
    #[error("buffer underrun: need {need} bytes, got {got}")]
    BufferUnderrun { need: usize, got: usize },

    #[error("string length {len} exceeds maximum {max}")]
    StringTooLong { len: usize, max: usize },

    #[error("sequence length {len} exceeds maximum {max}")]
    SequenceTooLong { len: usize, max: usize },

    #[error("string payload is not valid UTF-8")]
    InvalidUtf8,

    #[error("invalid magic: expected {expected:#010x}, got {actual:#010x}")]
    InvalidMagic { expected: u32, actual: u32 },

    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),

    #[error("declared payload length {declared} does not match buffer ({actual} bytes)")]
    PayloadLengthMismatch { declared: usize, actual: usize },

    #[error("payload length {len} exceeds maximum {max}")]
    PayloadTooLarge { len: usize, max: usize },

    #[error("unknown {what} value {value}")]
    UnknownEnumValue { what: &'static str, value: i64 },
}

impl From<CodecError> for ErrCode {
    fn from(_: CodecError) -> Self {
        ErrCode::StructuralError
    }
}

/// Failure of the underlying request/reply channel.
///
/// The transport itself is opaque to this layer; its timeouts and delivery
/// failures all surface as one of these variants without local retry.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TransportError {
    #[error("not connected to the form service")]
    NotConnected,

    #[error("form service peer died")]
    PeerDied,

    #[error("transport channel closed: {0}")]
    ChannelClosed(String),

    #[error("transport timeout")]
    Timeout,

    #[error("transport i/o failure: {0}")]
    Io(String),

    #[error("service discovery failed: {0}")]
    Discovery(String),
}

/// Rejection issued by the dispatcher before any argument is interpreted.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolRejection {
    #[error("interface token mismatch")]
    InterfaceMismatch,

    #[error("unknown opcode {0:#06x}")]
    UnknownOpcode(u16),
}

/// Unified caller-facing error for every proxy operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FormError {
    #[error("wire format error: {0}")]
    Codec(#[from] CodecError),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("protocol rejection: {0}")]
    Protocol(#[from] ProtocolRejection),

    /// Business failure reported by the service, passed through verbatim.
    #[error("service error code {0}")]
    Service(i32),

    /// The client is re-establishing its connection; retry after recovery.
    #[error("connection recovery in progress")]
    RecoveryInProgress,

    #[error("invalid form id: {0}")]
    InvalidFormId(i64),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl FormError {
    /// Classify a non-zero wire result code. Codes the dispatcher reserves
    /// for contract rejections become `Protocol`; everything else is a
    /// service-reported failure carried verbatim.
    pub fn from_result_code(code: i32, opcode: u16) -> Self {
        match ErrCode::try_from(code) {
            Ok(ErrCode::InterfaceMismatch) => {
                FormError::Protocol(ProtocolRejection::InterfaceMismatch)
            }
            Ok(ErrCode::UnknownOperation) => {
                FormError::Protocol(ProtocolRejection::UnknownOpcode(opcode))
            }
            _ => FormError::Service(code),
        }
    }
}

pub type FormResult<T> = Result<T, FormError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn err_code_values_are_stable() {
        assert_eq!(i32::from(ErrCode::Ok), 0);
        assert_eq!(i32::from(ErrCode::FormNotFound), 9);
        assert_eq!(i32::from(ErrCode::InterfaceMismatch), 20);
        assert_eq!(i32::from(ErrCode::InRecovery), 36);
    }

    #[test]
    fn codec_error_maps_to_structural_code() {
        let code: ErrCode = CodecError::InvalidUtf8.into();
        assert_eq!(code, ErrCode::StructuralError);
    }

    #[test]
    fn result_code_classification() {
        assert!(matches!(
            FormError::from_result_code(ErrCode::InterfaceMismatch.into(), 0x0101),
            FormError::Protocol(ProtocolRejection::InterfaceMismatch)
        ));
        assert!(matches!(
            FormError::from_result_code(ErrCode::UnknownOperation.into(), 0x7777),
            FormError::Protocol(ProtocolRejection::UnknownOpcode(0x7777))
        ));
        assert!(matches!(
            FormError::from_result_code(ErrCode::FormNotFound.into(), 0x0102),
            FormError::Service(9)
        ));
        // Codes outside the known enum still pass through verbatim.
        assert!(matches!(
            FormError::from_result_code(9999, 0x0102),
            FormError::Service(9999)
        ));
    }
}
