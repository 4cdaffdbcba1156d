//! Operation catalog.
//!
//! Opcodes are allocated in reserved numeric bands so each operation family
//! can grow without renumbering existing entries. A published opcode is part
//! of the wire contract forever: extension uses unused numbers, never reuse.
//!
//! Bands:
//! - `0x01xx` lifecycle (create/delete/release)
//! - `0x02xx` update and refresh
//! - `0x03xx` query
//! - `0x04xx` visibility/observer notifications
//! - `0x05xx` provider events (fire-and-forget)
//! - `0x06xx` system

use num_enum::{IntoPrimitive, TryFromPrimitive};

/// Every cataloged operation on the form service contract.
#[repr(u16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, TryFromPrimitive, IntoPrimitive)]
pub enum Opcode {
    // Lifecycle band (0x01xx)
    AddForm = 0x0101,
    DeleteForm = 0x0102,
    ReleaseForm = 0x0103,
    CastTempForm = 0x0104,
    DeleteInvalidForms = 0x0105,
    StopRenderingForm = 0x0106,

    // Update band (0x02xx)
    UpdateForm = 0x0201,
    RequestForm = 0x0202,
    SetNextRefreshTime = 0x0203,
    LifecycleUpdate = 0x0204,
    RequestPublishForm = 0x0205,

    // Query band (0x03xx)
    GetAllFormsInfo = 0x0301,
    GetFormsInfoByApp = 0x0302,
    GetFormsInfoByModule = 0x0303,
    GetFormsInfoFiltered = 0x0304,
    AcquireFormState = 0x0305,
    HasFormVisible = 0x0306,

    // Observe band (0x04xx)
    NotifyFormsVisible = 0x0401,
    NotifyFormsInvisible = 0x0402,
    NotifyFormsEnableUpdate = 0x0403,

    // Event band (0x05xx) - fire-and-forget
    MessageEvent = 0x0501,
    RouterEvent = 0x0502,
    BackgroundEvent = 0x0503,

    // System band (0x06xx)
    CheckServiceReady = 0x0601,
    ShareForm = 0x0602,
}

/// Operation family, derived from the opcode's numeric band.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpcodeBand {
    Lifecycle,
    Update,
    Query,
    Observe,
    Event,
    System,
}

impl Opcode {
    pub fn band(&self) -> OpcodeBand {
        match u16::from(*self) >> 8 {
            0x01 => OpcodeBand::Lifecycle,
            0x02 => OpcodeBand::Update,
            0x03 => OpcodeBand::Query,
            0x04 => OpcodeBand::Observe,
            0x05 => OpcodeBand::Event,
            _ => OpcodeBand::System,
        }
    }

    /// Fire-and-forget operations return once the request is handed to the
    /// transport; no reply is awaited and no remote outcome is observable.
    pub fn is_oneway(&self) -> bool {
        self.band() == OpcodeBand::Event
    }

    pub fn name(&self) -> &'static str {
        match self {
            Opcode::AddForm => "add_form",
            Opcode::DeleteForm => "delete_form",
            Opcode::ReleaseForm => "release_form",
            Opcode::CastTempForm => "cast_temp_form",
            Opcode::DeleteInvalidForms => "delete_invalid_forms",
            Opcode::StopRenderingForm => "stop_rendering_form",
            Opcode::UpdateForm => "update_form",
            Opcode::RequestForm => "request_form",
            Opcode::SetNextRefreshTime => "set_next_refresh_time",
            Opcode::LifecycleUpdate => "lifecycle_update",
            Opcode::RequestPublishForm => "request_publish_form",
            Opcode::GetAllFormsInfo => "get_all_forms_info",
            Opcode::GetFormsInfoByApp => "get_forms_info_by_app",
            Opcode::GetFormsInfoByModule => "get_forms_info_by_module",
            Opcode::GetFormsInfoFiltered => "get_forms_info_filtered",
            Opcode::AcquireFormState => "acquire_form_state",
            Opcode::HasFormVisible => "has_form_visible",
            Opcode::NotifyFormsVisible => "notify_forms_visible",
            Opcode::NotifyFormsInvisible => "notify_forms_invisible",
            Opcode::NotifyFormsEnableUpdate => "notify_forms_enable_update",
            Opcode::MessageEvent => "message_event",
            Opcode::RouterEvent => "router_event",
            Opcode::BackgroundEvent => "background_event",
            Opcode::CheckServiceReady => "check_service_ready",
            Opcode::ShareForm => "share_form",
        }
    }
}

impl std::fmt::Display for Opcode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}({:#06x})", self.name(), u16::from(*self))
    }
}
