//! Request routing.
//!
//! The dispatcher receives raw request frames from the transport and turns
//! them into calls on the injected [`FormService`]. Order of checks is part
//! of the contract:
//!
//! 1. frame structure (magic, version, declared length)
//! 2. interface token: a mismatch is rejected with a fixed code and nothing
//!    past the token is decoded
//! 3. opcode lookup in one opcode-indexed routing unit; unknown numbers get
//!    the fixed unknown-operation code
//! 4. per-operation argument decode; a failure here aborts before the
//!    service method is ever invoked
//! 5. system-caller gate for privileged operations
//!
//! Replies are encoded result-code-first; outputs are appended only when
//! the code denotes success. Handlers borrow no dispatcher state mutably,
//! so concurrent dispatch from transport workers is safe.

use crate::api::{CallerContext, FormService};
use bytes::Bytes;
use formlink_codec::{
    decode_request, encode_reply, Decoder, Encoder, FrameHeader, Opcode, WireDecode, WireEncode,
    INTERFACE_TOKEN,
};
use formlink_types::{CodecError, ErrCode, FormId};
use std::sync::Arc;
use tracing::{debug, warn};
use zerocopy::AsBytes;

/// Routes (token, opcode, bytes) to the injected service implementation.
pub struct Dispatcher {
    service: Arc<dyn FormService>,
}

enum DispatchFailure {
    /// Malformed wire data; the service was never invoked.
    Structural(CodecError),
    /// Fixed rejection or verbatim service code.
    Code(ErrCode),
}

impl From<CodecError> for DispatchFailure {
    fn from(e: CodecError) -> Self {
        DispatchFailure::Structural(e)
    }
}

impl From<ErrCode> for DispatchFailure {
    fn from(code: ErrCode) -> Self {
        DispatchFailure::Code(code)
    }
}

impl DispatchFailure {
    fn result_code(&self) -> ErrCode {
        match self {
            DispatchFailure::Structural(_) => ErrCode::StructuralError,
            DispatchFailure::Code(code) => *code,
        }
    }
}

/// Operations only a system caller may issue.
fn requires_system_caller(opcode: Opcode) -> bool {
    matches!(
        opcode,
        Opcode::DeleteInvalidForms
            | Opcode::LifecycleUpdate
            | Opcode::NotifyFormsVisible
            | Opcode::NotifyFormsInvisible
            | Opcode::NotifyFormsEnableUpdate
            | Opcode::ShareForm
    )
}

impl Dispatcher {
    pub fn new(service: Arc<dyn FormService>) -> Self {
        Self { service }
    }

    /// Dispatch a request frame and produce the reply frame.
    ///
    /// Never fails: every failure mode has a wire representation. Frames too
    /// damaged to yield an opcode are answered with opcode 0.
    pub async fn dispatch(&self, caller: &CallerContext, frame: &[u8]) -> Bytes {
        let (opcode_raw, result) = self.dispatch_inner(caller, frame).await;
        let (code, outputs) = match result {
            Ok(outputs) => (ErrCode::Ok, Some(outputs)),
            Err(failure) => {
                if let DispatchFailure::Structural(e) = &failure {
                    debug!(opcode = opcode_raw, error = %e, "structural decode failure");
                }
                (failure.result_code(), None)
            }
        };
        match encode_reply(opcode_raw, code.into(), outputs.as_ref()) {
            Ok(frame) => frame,
            Err(e) => {
                // Only reachable when declared outputs overflow the payload
                // bound; the request still gets an answer.
                warn!(opcode = opcode_raw, error = %e, "reply encoding failed");
                bare_reply(opcode_raw, ErrCode::CommonFailure)
            }
        }
    }

    /// Dispatch a fire-and-forget frame. Failures are logged; the remote
    /// outcome is never surfaced to the caller.
    pub async fn dispatch_oneway(&self, caller: &CallerContext, frame: &[u8]) {
        let (opcode_raw, result) = self.dispatch_inner(caller, frame).await;
        if let Err(failure) = result {
            warn!(
                opcode = opcode_raw,
                code = i32::from(failure.result_code()),
                "oneway request failed"
            );
        }
    }

    async fn dispatch_inner(
        &self,
        caller: &CallerContext,
        frame: &[u8],
    ) -> (u16, Result<Encoder, DispatchFailure>) {
        let mut request = match decode_request(frame) {
            Ok(request) => request,
            Err(e) => return (0, Err(DispatchFailure::Structural(e))),
        };
        let opcode_raw = request.opcode;

        // Contract identity first: a wrong token is rejected before any
        // argument byte is decoded.
        if request.token != INTERFACE_TOKEN {
            return (opcode_raw, Err(ErrCode::InterfaceMismatch.into()));
        }

        let opcode = match Opcode::try_from(opcode_raw) {
            Ok(opcode) => opcode,
            Err(_) => {
                debug!(opcode = opcode_raw, "unknown operation");
                return (opcode_raw, Err(ErrCode::UnknownOperation.into()));
            }
        };

        if requires_system_caller(opcode) && !caller.system_app {
            return (opcode_raw, Err(ErrCode::PermissionDenied.into()));
        }

        (opcode_raw, self.route(opcode, caller, &mut request.args).await)
    }

    /// The single opcode-indexed routing unit.
    async fn route(
        &self,
        opcode: Opcode,
        caller: &CallerContext,
        args: &mut Decoder<'_>,
    ) -> Result<Encoder, DispatchFailure> {
        let service = &self.service;
        let mut out = Encoder::new();
        match opcode {
            Opcode::AddForm => {
                let req = WireDecode::decode(args)?;
                let info = service.add_form(caller, req).await?;
                info.encode(&mut out)?;
            }
            Opcode::DeleteForm => {
                let id = FormId::decode(args)?;
                service.delete_form(caller, id).await?;
            }
            Opcode::ReleaseForm => {
                let id = FormId::decode(args)?;
                let delete_cache = args.get_bool()?;
                service.release_form(caller, id, delete_cache).await?;
            }
            Opcode::CastTempForm => {
                let id = FormId::decode(args)?;
                service.cast_temp_form(caller, id).await?;
            }
            Opcode::DeleteInvalidForms => {
                let valid_ids = Vec::decode(args)?;
                let removed = service.delete_invalid_forms(caller, valid_ids).await?;
                out.put_u32(removed);
            }
            Opcode::StopRenderingForm => {
                let id = FormId::decode(args)?;
                let component = args.get_str()?;
                service.stop_rendering_form(caller, id, component).await?;
            }
            Opcode::UpdateForm => {
                let id = FormId::decode(args)?;
                let data = WireDecode::decode(args)?;
                service.update_form(caller, id, data).await?;
            }
            Opcode::RequestForm => {
                let id = FormId::decode(args)?;
                service.request_form(caller, id).await?;
            }
            Opcode::SetNextRefreshTime => {
                let id = FormId::decode(args)?;
                let minutes = args.get_i64()?;
                service.set_next_refresh_time(caller, id, minutes).await?;
            }
            Opcode::LifecycleUpdate => {
                let ids = Vec::decode(args)?;
                let active = args.get_bool()?;
                service.lifecycle_update(caller, ids, active).await?;
            }
            Opcode::RequestPublishForm => {
                let req = WireDecode::decode(args)?;
                let id = service.request_publish_form(caller, req).await?;
                id.encode(&mut out)?;
            }
            Opcode::GetAllFormsInfo => {
                let infos = service.get_all_forms_info(caller).await?;
                infos.encode(&mut out)?;
            }
            Opcode::GetFormsInfoByApp => {
                let bundle = args.get_str()?;
                let infos = service.get_forms_info_by_app(caller, bundle).await?;
                infos.encode(&mut out)?;
            }
            Opcode::GetFormsInfoByModule => {
                let bundle = args.get_str()?;
                let module = args.get_str()?;
                let infos = service
                    .get_forms_info_by_module(caller, bundle, module)
                    .await?;
                infos.encode(&mut out)?;
            }
            Opcode::GetFormsInfoFiltered => {
                let filter = WireDecode::decode(args)?;
                let infos = service.get_forms_info(caller, filter).await?;
                infos.encode(&mut out)?;
            }
            Opcode::AcquireFormState => {
                let req = WireDecode::decode(args)?;
                let state = service.acquire_form_state(caller, req).await?;
                state.encode(&mut out)?;
            }
            Opcode::HasFormVisible => {
                let id = FormId::decode(args)?;
                let visible = service.has_form_visible(caller, id).await?;
                out.put_bool(visible);
            }
            Opcode::NotifyFormsVisible | Opcode::NotifyFormsInvisible => {
                let ids = Vec::decode(args)?;
                let visible = opcode == Opcode::NotifyFormsVisible;
                service.notify_forms_visible(caller, ids, visible).await?;
            }
            Opcode::NotifyFormsEnableUpdate => {
                let ids = Vec::decode(args)?;
                let enabled = args.get_bool()?;
                service
                    .notify_forms_enable_update(caller, ids, enabled)
                    .await?;
            }
            Opcode::MessageEvent => {
                let id = FormId::decode(args)?;
                let message = args.get_str()?;
                service.message_event(caller, id, message).await?;
            }
            Opcode::RouterEvent => {
                let id = FormId::decode(args)?;
                let target = args.get_str()?;
                service.router_event(caller, id, target).await?;
            }
            Opcode::BackgroundEvent => {
                let id = FormId::decode(args)?;
                let params = args.get_str()?;
                service.background_event(caller, id, params).await?;
            }
            Opcode::CheckServiceReady => {
                let ready = service.check_service_ready(caller).await?;
                out.put_bool(ready);
            }
            Opcode::ShareForm => {
                let id = FormId::decode(args)?;
                let device_id = args.get_str()?;
                service.share_form(caller, id, device_id).await?;
            }
        }
        Ok(out)
    }
}

/// Infallible failure reply: header plus the four result-code bytes.
fn bare_reply(opcode: u16, code: ErrCode) -> Bytes {
    let code_bytes = i32::from(code).to_le_bytes();
    let header = FrameHeader::new(opcode, 0, code_bytes.len() as u32);
    let mut frame = Vec::with_capacity(FrameHeader::SIZE + code_bytes.len());
    frame.extend_from_slice(header.as_bytes());
    frame.extend_from_slice(&code_bytes);
    Bytes::from(frame)
}
