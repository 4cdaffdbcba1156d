//! In-memory form registry.
//!
//! [`FormStore`] is the production [`FormService`] implementation: a
//! uid-scoped registry of live form instances behind a single async
//! `RwLock`. Mutating operations check ownership before touching a record;
//! a system caller bypasses ownership the same way it bypasses the
//! dispatcher's opcode gate.

use crate::api::{CallerContext, FormService, ServiceResult};
use async_trait::async_trait;
use formlink_types::{
    ErrCode, FormBindingData, FormId, FormInfo, FormInfoFilter, FormRequest, FormState,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Default cap on concurrently live forms across all callers.
pub const DEFAULT_MAX_FORMS: usize = 512;

struct FormRecord {
    info: FormInfo,
    owner: u32,
    active: bool,
    binding: FormBindingData,
    next_refresh_minutes: Option<i64>,
}

/// Registry state. Identifier allocation is monotonic and never reuses a
/// value, so a stale id from a deleted form can never alias a new one.
pub struct FormStore {
    forms: RwLock<HashMap<i64, FormRecord>>,
    next_id: AtomicI64,
    max_forms: usize,
}

impl Default for FormStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FormStore {
    pub fn new() -> Self {
        Self::with_max_forms(DEFAULT_MAX_FORMS)
    }

    pub fn with_max_forms(max_forms: usize) -> Self {
        Self {
            forms: RwLock::new(HashMap::new()),
            next_id: AtomicI64::new(1),
            max_forms,
        }
    }

    fn allocate_id(&self) -> FormId {
        FormId::new(self.next_id.fetch_add(1, Ordering::SeqCst))
    }

    fn authorize(caller: &CallerContext, record: &FormRecord) -> ServiceResult<()> {
        if caller.system_app || caller.uid == record.owner {
            Ok(())
        } else {
            Err(ErrCode::NotSelfForm)
        }
    }

    fn build_record(
        &self,
        caller: &CallerContext,
        req: FormRequest,
    ) -> ServiceResult<(FormId, FormRecord)> {
        if !req.has_identity() {
            return Err(ErrCode::InvalidParam);
        }
        let dimension = req.dimension.ok_or(ErrCode::InvalidParam)?;
        let id = self.allocate_id();
        let record = FormRecord {
            info: FormInfo {
                id,
                bundle: req.bundle,
                ability: req.ability,
                module: req.module,
                name: req.form_name,
                dimension,
                temporary: req.temporary,
                visible: false,
                update_enabled: true,
            },
            owner: caller.uid,
            active: true,
            binding: FormBindingData::default(),
            next_refresh_minutes: None,
        };
        Ok((id, record))
    }
}

#[async_trait]
impl FormService for FormStore {
    async fn add_form(&self, caller: &CallerContext, req: FormRequest) -> ServiceResult<FormInfo> {
        let (id, record) = self.build_record(caller, req)?;
        let mut forms = self.forms.write().await;
        if forms.len() >= self.max_forms {
            return Err(ErrCode::MaxFormsExceeded);
        }
        let info = record.info.clone();
        forms.insert(id.raw(), record);
        info!(form_id = %id, bundle = %info.bundle, uid = caller.uid, "form added");
        Ok(info)
    }

    async fn delete_form(&self, caller: &CallerContext, id: FormId) -> ServiceResult<()> {
        let mut forms = self.forms.write().await;
        let record = forms.get(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        forms.remove(&id.raw());
        info!(form_id = %id, uid = caller.uid, "form deleted");
        Ok(())
    }

    async fn release_form(
        &self,
        caller: &CallerContext,
        id: FormId,
        delete_cache: bool,
    ) -> ServiceResult<()> {
        let mut forms = self.forms.write().await;
        let record = forms.get_mut(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        if delete_cache {
            forms.remove(&id.raw());
        } else {
            // Released but cached: the record survives for a later
            // request_form, it just stops rendering.
            record.active = false;
            record.info.visible = false;
        }
        debug!(form_id = %id, delete_cache, "form released");
        Ok(())
    }

    async fn cast_temp_form(&self, caller: &CallerContext, id: FormId) -> ServiceResult<()> {
        let mut forms = self.forms.write().await;
        let record = forms.get_mut(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        if !record.info.temporary {
            return Err(ErrCode::InvalidParam);
        }
        record.info.temporary = false;
        info!(form_id = %id, "temporary form cast to normal");
        Ok(())
    }

    async fn delete_invalid_forms(
        &self,
        _caller: &CallerContext,
        valid_ids: Vec<FormId>,
    ) -> ServiceResult<u32> {
        let mut forms = self.forms.write().await;
        let before = forms.len();
        forms.retain(|raw, _| valid_ids.iter().any(|id| id.raw() == *raw));
        let removed = (before - forms.len()) as u32;
        if removed > 0 {
            info!(removed, "purged invalid forms");
        }
        Ok(removed)
    }

    async fn stop_rendering_form(
        &self,
        caller: &CallerContext,
        id: FormId,
        component: String,
    ) -> ServiceResult<()> {
        let mut forms = self.forms.write().await;
        let record = forms.get_mut(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        record.active = false;
        debug!(form_id = %id, component = %component, "rendering stopped");
        Ok(())
    }

    async fn update_form(
        &self,
        caller: &CallerContext,
        id: FormId,
        data: FormBindingData,
    ) -> ServiceResult<()> {
        let mut forms = self.forms.write().await;
        let record = forms.get_mut(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        if !record.info.update_enabled {
            return Err(ErrCode::CommonFailure);
        }
        record.binding = data;
        debug!(form_id = %id, "form content updated");
        Ok(())
    }

    async fn request_form(&self, caller: &CallerContext, id: FormId) -> ServiceResult<()> {
        let mut forms = self.forms.write().await;
        let record = forms.get_mut(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        record.active = true;
        debug!(
            form_id = %id,
            cached_bytes = record.binding.content.len(),
            "refresh requested"
        );
        Ok(())
    }

    async fn set_next_refresh_time(
        &self,
        caller: &CallerContext,
        id: FormId,
        minutes: i64,
    ) -> ServiceResult<()> {
        if minutes <= 0 {
            return Err(ErrCode::InvalidParam);
        }
        let mut forms = self.forms.write().await;
        let record = forms.get_mut(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        debug!(
            form_id = %id,
            minutes,
            previous = ?record.next_refresh_minutes,
            "refresh schedule changed"
        );
        record.next_refresh_minutes = Some(minutes);
        Ok(())
    }

    async fn lifecycle_update(
        &self,
        _caller: &CallerContext,
        ids: Vec<FormId>,
        active: bool,
    ) -> ServiceResult<()> {
        let mut forms = self.forms.write().await;
        // Ids that no longer resolve are skipped; a lifecycle sweep must not
        // fail halfway through a batch.
        for id in ids {
            if let Some(record) = forms.get_mut(&id.raw()) {
                record.active = active;
            }
        }
        Ok(())
    }

    async fn request_publish_form(
        &self,
        caller: &CallerContext,
        req: FormRequest,
    ) -> ServiceResult<FormId> {
        let (id, record) = self.build_record(caller, req)?;
        let mut forms = self.forms.write().await;
        if forms.len() >= self.max_forms {
            return Err(ErrCode::MaxFormsExceeded);
        }
        forms.insert(id.raw(), record);
        info!(form_id = %id, "form published");
        Ok(id)
    }

    async fn get_all_forms_info(&self, _caller: &CallerContext) -> ServiceResult<Vec<FormInfo>> {
        let forms = self.forms.read().await;
        let mut infos: Vec<FormInfo> = forms.values().map(|r| r.info.clone()).collect();
        infos.sort_by_key(|info| info.id);
        Ok(infos)
    }

    async fn get_forms_info_by_app(
        &self,
        caller: &CallerContext,
        bundle: String,
    ) -> ServiceResult<Vec<FormInfo>> {
        if bundle.is_empty() {
            return Err(ErrCode::InvalidParam);
        }
        self.get_forms_info(
            caller,
            FormInfoFilter {
                bundle: Some(bundle),
                module: None,
            },
        )
        .await
    }

    async fn get_forms_info_by_module(
        &self,
        caller: &CallerContext,
        bundle: String,
        module: String,
    ) -> ServiceResult<Vec<FormInfo>> {
        if bundle.is_empty() || module.is_empty() {
            return Err(ErrCode::InvalidParam);
        }
        self.get_forms_info(
            caller,
            FormInfoFilter {
                bundle: Some(bundle),
                module: Some(module),
            },
        )
        .await
    }

    async fn get_forms_info(
        &self,
        _caller: &CallerContext,
        filter: FormInfoFilter,
    ) -> ServiceResult<Vec<FormInfo>> {
        let forms = self.forms.read().await;
        let mut infos: Vec<FormInfo> = forms
            .values()
            .filter(|r| filter.matches(&r.info))
            .map(|r| r.info.clone())
            .collect();
        infos.sort_by_key(|info| info.id);
        Ok(infos)
    }

    async fn acquire_form_state(
        &self,
        _caller: &CallerContext,
        req: FormRequest,
    ) -> ServiceResult<FormState> {
        if !req.has_identity() {
            return Err(ErrCode::InvalidParam);
        }
        let forms = self.forms.read().await;
        let known = forms.values().any(|r| {
            r.info.bundle == req.bundle
                && r.info.module == req.module
                && r.info.name == req.form_name
        });
        Ok(if known {
            FormState::Ready
        } else {
            FormState::Default
        })
    }

    async fn has_form_visible(&self, _caller: &CallerContext, id: FormId) -> ServiceResult<bool> {
        let forms = self.forms.read().await;
        let record = forms.get(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        // A released-but-cached form renders nothing, so it is never visible.
        Ok(record.info.visible && record.active)
    }

    async fn notify_forms_visible(
        &self,
        _caller: &CallerContext,
        ids: Vec<FormId>,
        visible: bool,
    ) -> ServiceResult<()> {
        let mut forms = self.forms.write().await;
        for id in ids {
            if let Some(record) = forms.get_mut(&id.raw()) {
                record.info.visible = visible;
            }
        }
        Ok(())
    }

    async fn notify_forms_enable_update(
        &self,
        _caller: &CallerContext,
        ids: Vec<FormId>,
        enabled: bool,
    ) -> ServiceResult<()> {
        let mut forms = self.forms.write().await;
        for id in ids {
            if let Some(record) = forms.get_mut(&id.raw()) {
                record.info.update_enabled = enabled;
            }
        }
        Ok(())
    }

    async fn message_event(
        &self,
        caller: &CallerContext,
        id: FormId,
        message: String,
    ) -> ServiceResult<()> {
        let forms = self.forms.read().await;
        let record = forms.get(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        debug!(form_id = %id, message = %message, "message event");
        Ok(())
    }

    async fn router_event(
        &self,
        caller: &CallerContext,
        id: FormId,
        target: String,
    ) -> ServiceResult<()> {
        let forms = self.forms.read().await;
        let record = forms.get(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        debug!(form_id = %id, target = %target, "router event");
        Ok(())
    }

    async fn background_event(
        &self,
        caller: &CallerContext,
        id: FormId,
        params: String,
    ) -> ServiceResult<()> {
        let forms = self.forms.read().await;
        let record = forms.get(&id.raw()).ok_or(ErrCode::FormNotFound)?;
        Self::authorize(caller, record)?;
        debug!(form_id = %id, params = %params, "background event");
        Ok(())
    }

    async fn check_service_ready(&self, _caller: &CallerContext) -> ServiceResult<bool> {
        Ok(true)
    }

    async fn share_form(
        &self,
        _caller: &CallerContext,
        id: FormId,
        device_id: String,
    ) -> ServiceResult<()> {
        if device_id.is_empty() {
            return Err(ErrCode::InvalidParam);
        }
        let forms = self.forms.read().await;
        if !forms.contains_key(&id.raw()) {
            return Err(ErrCode::FormNotFound);
        }
        info!(form_id = %id, device = %device_id, "form shared");
        Ok(())
    }
}
