//! Internal-to-published error translation.
//!
//! Wire result codes are an internal contract between proxy and dispatcher.
//! What host applications see is a small published set with stable numeric
//! values and human-readable messages; the mapping lives in one table so a
//! new internal code cannot silently leak out unmapped. Unknown codes
//! collapse to the generic internal error.

use formlink_types::ErrCode;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use thiserror::Error;

/// Published failure, safe to surface outside the service process.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message} (code {code})")]
pub struct ExternalError {
    pub code: u32,
    pub message: &'static str,
}

pub const EXTERNAL_PERMISSION_DENIED: u32 = 201;
pub const EXTERNAL_NOT_SYSTEM_APP: u32 = 202;
pub const EXTERNAL_INVALID_PARAM: u32 = 401;
pub const EXTERNAL_MALFORMED_REQUEST: u32 = 16_500_050;
pub const EXTERNAL_SERVICE_UNAVAILABLE: u32 = 16_500_060;
pub const EXTERNAL_INTERNAL: u32 = 16_501_000;
pub const EXTERNAL_FORM_NOT_FOUND: u32 = 16_501_001;
pub const EXTERNAL_MAX_FORMS: u32 = 16_501_002;
pub const EXTERNAL_NOT_SELF_FORM: u32 = 16_501_003;

const INTERNAL_FALLBACK: ExternalError = ExternalError {
    code: EXTERNAL_INTERNAL,
    message: "internal form service error",
};

static TRANSLATIONS: Lazy<HashMap<i32, ExternalError>> = Lazy::new(|| {
    let mut map = HashMap::new();
    let mut put = |code: ErrCode, external: u32, message: &'static str| {
        map.insert(
            i32::from(code),
            ExternalError {
                code: external,
                message,
            },
        );
    };

    put(
        ErrCode::PermissionDenied,
        EXTERNAL_PERMISSION_DENIED,
        "caller lacks the required permission",
    );
    put(
        ErrCode::NotSystemApp,
        EXTERNAL_NOT_SYSTEM_APP,
        "operation is restricted to system applications",
    );
    put(
        ErrCode::InvalidParam,
        EXTERNAL_INVALID_PARAM,
        "invalid input parameter",
    );
    put(
        ErrCode::StructuralError,
        EXTERNAL_MALFORMED_REQUEST,
        "request could not be decoded",
    );
    put(
        ErrCode::ServiceNotReady,
        EXTERNAL_SERVICE_UNAVAILABLE,
        "form service is not ready",
    );
    put(
        ErrCode::InRecovery,
        EXTERNAL_SERVICE_UNAVAILABLE,
        "form service connection is being re-established",
    );
    put(
        ErrCode::FormNotFound,
        EXTERNAL_FORM_NOT_FOUND,
        "form not found",
    );
    put(
        ErrCode::MaxFormsExceeded,
        EXTERNAL_MAX_FORMS,
        "maximum number of forms exceeded",
    );
    put(
        ErrCode::NotSelfForm,
        EXTERNAL_NOT_SELF_FORM,
        "form belongs to another application",
    );
    map
});

/// Translate an internal result code into its published form.
pub fn translate(code: i32) -> ExternalError {
    TRANSLATIONS.get(&code).cloned().unwrap_or(INTERNAL_FALLBACK)
}
