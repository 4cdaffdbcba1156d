//! The abstract form service contract.
//!
//! One method per cataloged operation. The dispatcher never interprets
//! argument or result semantics beyond their declared shape; everything
//! behavioral lives behind this trait.

use async_trait::async_trait;
use formlink_types::{
    ErrCode, FormBindingData, FormId, FormInfo, FormInfoFilter, FormRequest, FormState,
};

/// Business failures are wire result codes, passed through verbatim.
pub type ServiceResult<T> = Result<T, ErrCode>;

/// Identity of the process on the other end of the transport, as attested
/// by the transport itself. Used only for the system-caller gate; callers
/// never supply it inside the message.
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub uid: u32,
    pub system_app: bool,
}

impl CallerContext {
    pub fn system() -> Self {
        Self {
            uid: 0,
            system_app: true,
        }
    }

    pub fn app(uid: u32) -> Self {
        Self {
            uid,
            system_app: false,
        }
    }
}

/// The full operation set of the form service.
///
/// Implemented by the production [`FormStore`](crate::FormStore), by test
/// doubles, and by fuzz harnesses; the dispatcher is generic over all of
/// them. Methods must be safely re-entrant: the transport invokes the
/// dispatcher from arbitrary worker threads.
#[async_trait]
pub trait FormService: Send + Sync {
    // Lifecycle
    async fn add_form(&self, caller: &CallerContext, req: FormRequest) -> ServiceResult<FormInfo>;
    async fn delete_form(&self, caller: &CallerContext, id: FormId) -> ServiceResult<()>;
    async fn release_form(
        &self,
        caller: &CallerContext,
        id: FormId,
        delete_cache: bool,
    ) -> ServiceResult<()>;
    async fn cast_temp_form(&self, caller: &CallerContext, id: FormId) -> ServiceResult<()>;
    async fn delete_invalid_forms(
        &self,
        caller: &CallerContext,
        valid_ids: Vec<FormId>,
    ) -> ServiceResult<u32>;
    async fn stop_rendering_form(
        &self,
        caller: &CallerContext,
        id: FormId,
        component: String,
    ) -> ServiceResult<()>;

    // Update
    async fn update_form(
        &self,
        caller: &CallerContext,
        id: FormId,
        data: FormBindingData,
    ) -> ServiceResult<()>;
    async fn request_form(&self, caller: &CallerContext, id: FormId) -> ServiceResult<()>;
    async fn set_next_refresh_time(
        &self,
        caller: &CallerContext,
        id: FormId,
        minutes: i64,
    ) -> ServiceResult<()>;
    async fn lifecycle_update(
        &self,
        caller: &CallerContext,
        ids: Vec<FormId>,
        active: bool,
    ) -> ServiceResult<()>;
    async fn request_publish_form(
        &self,
        caller: &CallerContext,
        req: FormRequest,
    ) -> ServiceResult<FormId>;

    // Query
    async fn get_all_forms_info(&self, caller: &CallerContext) -> ServiceResult<Vec<FormInfo>>;
    async fn get_forms_info_by_app(
        &self,
        caller: &CallerContext,
        bundle: String,
    ) -> ServiceResult<Vec<FormInfo>>;
    async fn get_forms_info_by_module(
        &self,
        caller: &CallerContext,
        bundle: String,
        module: String,
    ) -> ServiceResult<Vec<FormInfo>>;
    async fn get_forms_info(
        &self,
        caller: &CallerContext,
        filter: FormInfoFilter,
    ) -> ServiceResult<Vec<FormInfo>>;
    async fn acquire_form_state(
        &self,
        caller: &CallerContext,
        req: FormRequest,
    ) -> ServiceResult<FormState>;
    async fn has_form_visible(&self, caller: &CallerContext, id: FormId) -> ServiceResult<bool>;

    // Observe
    async fn notify_forms_visible(
        &self,
        caller: &CallerContext,
        ids: Vec<FormId>,
        visible: bool,
    ) -> ServiceResult<()>;
    async fn notify_forms_enable_update(
        &self,
        caller: &CallerContext,
        ids: Vec<FormId>,
        enabled: bool,
    ) -> ServiceResult<()>;

    // Events (fire-and-forget; remote outcome is not surfaced to callers)
    async fn message_event(
        &self,
        caller: &CallerContext,
        id: FormId,
        message: String,
    ) -> ServiceResult<()>;
    async fn router_event(
        &self,
        caller: &CallerContext,
        id: FormId,
        target: String,
    ) -> ServiceResult<()>;
    async fn background_event(
        &self,
        caller: &CallerContext,
        id: FormId,
        params: String,
    ) -> ServiceResult<()>;

    // System
    async fn check_service_ready(&self, caller: &CallerContext) -> ServiceResult<bool>;
    async fn share_form(
        &self,
        caller: &CallerContext,
        id: FormId,
        device_id: String,
    ) -> ServiceResult<()>;
}
