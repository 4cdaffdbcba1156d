//! Typed call sites for every cataloged operation.
//!
//! Each method validates what is needed to encode, builds the request frame,
//! sends it through the connection manager's shared path, and interprets the
//! reply result-code-first: outputs are decoded only when the code denotes
//! success, so failure replies are never interpreted past the code. No
//! business validation beyond that, and no retries; idempotence of a retry
//! is the caller's concern.

use crate::connection::ConnectionManager;
use bytes::Bytes;
use formlink_codec::{
    decode_reply, encode_request, CodecResult, Decoder, Encoder, Opcode, WireDecode, WireEncode,
    INTERFACE_TOKEN,
};
use formlink_types::{
    FormBindingData, FormError, FormId, FormInfo, FormInfoFilter, FormRequest, FormResult,
    FormState,
};
use tracing::debug;

/// Client proxy for the form service.
pub struct FormClient {
    conn: ConnectionManager,
}

impl FormClient {
    pub fn new(conn: ConnectionManager) -> Self {
        Self { conn }
    }

    pub fn connection(&self) -> &ConnectionManager {
        &self.conn
    }

    /// Encode, send, and decode the reply's result code. Returns the output
    /// decoder only for success replies.
    async fn invoke<E, D, R>(&self, opcode: Opcode, encode_args: E, decode_outputs: D) -> FormResult<R>
    where
        E: FnOnce(&mut Encoder) -> CodecResult<()>,
        D: FnOnce(&mut Decoder<'_>) -> CodecResult<R>,
    {
        let request = encode_request(opcode, INTERFACE_TOKEN, encode_args)?;
        let endpoint = self.conn.acquire().await?;
        let reply: Bytes = endpoint
            .call(opcode.into(), request)
            .await
            .map_err(FormError::Transport)?;

        let mut frame = decode_reply(&reply)?;
        if frame.code != 0 {
            debug!(%opcode, code = frame.code, "operation failed");
            return Err(FormError::from_result_code(frame.code, frame.opcode));
        }
        Ok(decode_outputs(&mut frame.outputs)?)
    }

    /// Hand a fire-and-forget request to the transport. Only local encode
    /// and hand-off failures are observable.
    async fn send_event<E>(&self, opcode: Opcode, encode_args: E) -> FormResult<()>
    where
        E: FnOnce(&mut Encoder) -> CodecResult<()>,
    {
        let request = encode_request(opcode, INTERFACE_TOKEN, encode_args)?;
        let endpoint = self.conn.acquire().await?;
        endpoint
            .send_oneway(opcode.into(), request)
            .await
            .map_err(FormError::Transport)
    }

    fn check_form_id(id: FormId) -> FormResult<FormId> {
        if !id.is_valid() {
            return Err(FormError::InvalidFormId(id.raw()));
        }
        Ok(id)
    }

    fn check_request(req: &FormRequest) -> FormResult<()> {
        if !req.has_identity() {
            return Err(FormError::InvalidArgument(
                "form request is missing bundle/ability/module/name".into(),
            ));
        }
        Ok(())
    }

    // Lifecycle ------------------------------------------------------------

    pub async fn add_form(&self, req: &FormRequest) -> FormResult<FormInfo> {
        Self::check_request(req)?;
        self.invoke(Opcode::AddForm, |enc| req.encode(enc), FormInfo::decode)
            .await
    }

    pub async fn delete_form(&self, id: FormId) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        self.invoke(Opcode::DeleteForm, |enc| id.encode(enc), |_| Ok(()))
            .await
    }

    pub async fn release_form(&self, id: FormId, delete_cache: bool) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        self.invoke(
            Opcode::ReleaseForm,
            |enc| {
                id.encode(enc)?;
                enc.put_bool(delete_cache);
                Ok(())
            },
            |_| Ok(()),
        )
        .await
    }

    pub async fn cast_temp_form(&self, id: FormId) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        self.invoke(Opcode::CastTempForm, |enc| id.encode(enc), |_| Ok(()))
            .await
    }

    /// Drop every tracked form whose id is not in `valid_ids`; returns how
    /// many the service removed.
    pub async fn delete_invalid_forms(&self, valid_ids: &[FormId]) -> FormResult<u32> {
        self.invoke(
            Opcode::DeleteInvalidForms,
            |enc| enc.put_seq(valid_ids),
            |out| out.get_u32(),
        )
        .await
    }

    pub async fn stop_rendering_form(&self, id: FormId, component: &str) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        let component = component.to_owned();
        self.invoke(
            Opcode::StopRenderingForm,
            move |enc| {
                id.encode(enc)?;
                enc.put_str(&component)
            },
            |_| Ok(()),
        )
        .await
    }

    // Update ---------------------------------------------------------------

    pub async fn update_form(&self, id: FormId, data: &FormBindingData) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        self.invoke(
            Opcode::UpdateForm,
            |enc| {
                id.encode(enc)?;
                data.encode(enc)
            },
            |_| Ok(()),
        )
        .await
    }

    pub async fn request_form(&self, id: FormId) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        self.invoke(Opcode::RequestForm, |enc| id.encode(enc), |_| Ok(()))
            .await
    }

    pub async fn set_next_refresh_time(&self, id: FormId, minutes: i64) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        if minutes <= 0 {
            return Err(FormError::InvalidArgument(format!(
                "refresh interval must be positive, got {minutes}"
            )));
        }
        self.invoke(
            Opcode::SetNextRefreshTime,
            |enc| {
                id.encode(enc)?;
                enc.put_i64(minutes);
                Ok(())
            },
            |_| Ok(()),
        )
        .await
    }

    pub async fn lifecycle_update(&self, ids: &[FormId], active: bool) -> FormResult<()> {
        self.invoke(
            Opcode::LifecycleUpdate,
            |enc| {
                enc.put_seq(ids)?;
                enc.put_bool(active);
                Ok(())
            },
            |_| Ok(()),
        )
        .await
    }

    pub async fn request_publish_form(&self, req: &FormRequest) -> FormResult<FormId> {
        Self::check_request(req)?;
        self.invoke(
            Opcode::RequestPublishForm,
            |enc| req.encode(enc),
            FormId::decode,
        )
        .await
    }

    // Query ----------------------------------------------------------------

    pub async fn get_all_forms_info(&self) -> FormResult<Vec<FormInfo>> {
        self.invoke(Opcode::GetAllFormsInfo, |_| Ok(()), Vec::decode)
            .await
    }

    pub async fn get_forms_info_by_app(&self, bundle: &str) -> FormResult<Vec<FormInfo>> {
        let bundle = bundle.to_owned();
        self.invoke(
            Opcode::GetFormsInfoByApp,
            move |enc| enc.put_str(&bundle),
            Vec::decode,
        )
        .await
    }

    pub async fn get_forms_info_by_module(
        &self,
        bundle: &str,
        module: &str,
    ) -> FormResult<Vec<FormInfo>> {
        let bundle = bundle.to_owned();
        let module = module.to_owned();
        self.invoke(
            Opcode::GetFormsInfoByModule,
            move |enc| {
                enc.put_str(&bundle)?;
                enc.put_str(&module)
            },
            Vec::decode,
        )
        .await
    }

    pub async fn get_forms_info(&self, filter: &FormInfoFilter) -> FormResult<Vec<FormInfo>> {
        self.invoke(
            Opcode::GetFormsInfoFiltered,
            |enc| filter.encode(enc),
            Vec::decode,
        )
        .await
    }

    pub async fn acquire_form_state(&self, req: &FormRequest) -> FormResult<FormState> {
        Self::check_request(req)?;
        self.invoke(
            Opcode::AcquireFormState,
            |enc| req.encode(enc),
            FormState::decode,
        )
        .await
    }

    pub async fn has_form_visible(&self, id: FormId) -> FormResult<bool> {
        let id = Self::check_form_id(id)?;
        self.invoke(Opcode::HasFormVisible, |enc| id.encode(enc), |out| {
            out.get_bool()
        })
        .await
    }

    // Observe --------------------------------------------------------------

    pub async fn notify_forms_visible(&self, ids: &[FormId], visible: bool) -> FormResult<()> {
        let opcode = if visible {
            Opcode::NotifyFormsVisible
        } else {
            Opcode::NotifyFormsInvisible
        };
        self.invoke(opcode, |enc| enc.put_seq(ids), |_| Ok(())).await
    }

    pub async fn notify_forms_enable_update(
        &self,
        ids: &[FormId],
        enabled: bool,
    ) -> FormResult<()> {
        self.invoke(
            Opcode::NotifyFormsEnableUpdate,
            |enc| {
                enc.put_seq(ids)?;
                enc.put_bool(enabled);
                Ok(())
            },
            |_| Ok(()),
        )
        .await
    }

    // Events (fire-and-forget) ---------------------------------------------

    pub async fn message_event(&self, id: FormId, message: &str) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        let message = message.to_owned();
        self.send_event(Opcode::MessageEvent, move |enc| {
            id.encode(enc)?;
            enc.put_str(&message)
        })
        .await
    }

    pub async fn router_event(&self, id: FormId, target: &str) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        let target = target.to_owned();
        self.send_event(Opcode::RouterEvent, move |enc| {
            id.encode(enc)?;
            enc.put_str(&target)
        })
        .await
    }

    pub async fn background_event(&self, id: FormId, params: &str) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        let params = params.to_owned();
        self.send_event(Opcode::BackgroundEvent, move |enc| {
            id.encode(enc)?;
            enc.put_str(&params)
        })
        .await
    }

    // System ---------------------------------------------------------------

    pub async fn check_service_ready(&self) -> FormResult<bool> {
        self.invoke(Opcode::CheckServiceReady, |_| Ok(()), |out| out.get_bool())
            .await
    }

    pub async fn share_form(&self, id: FormId, device_id: &str) -> FormResult<()> {
        let id = Self::check_form_id(id)?;
        if device_id.is_empty() {
            return Err(FormError::InvalidArgument("empty target device id".into()));
        }
        let device_id = device_id.to_owned();
        self.invoke(
            Opcode::ShareForm,
            move |enc| {
                id.encode(enc)?;
                enc.put_str(&device_id)
            },
            |_| Ok(()),
        )
        .await
    }
}
