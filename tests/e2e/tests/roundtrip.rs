//! Full-stack request/reply tests: typed proxy call in, typed result out,
//! with real frames crossing the loopback in both directions.

use formlink_e2e::harness;
use formlink_manager::translator::{
    translate, EXTERNAL_FORM_NOT_FOUND, EXTERNAL_PERMISSION_DENIED,
};
use formlink_manager::CallerContext;
use formlink_types::{
    ErrCode, FormBindingData, FormDimension, FormError, FormId, FormInfoFilter, FormRequest,
    FormState,
};

fn request(bundle: &str, name: &str) -> FormRequest {
    FormRequest {
        bundle: bundle.into(),
        ability: "MainAbility".into(),
        module: "entry".into(),
        form_name: name.into(),
        dimension: Some(FormDimension::TwoByTwo),
        ..Default::default()
    }
}

#[tokio::test]
async fn full_form_lifecycle() {
    let h = harness(CallerContext::app(20010));

    let info = h.client.add_form(&request("com.example.weather", "forecast")).await.unwrap();
    assert!(info.id.is_valid());
    assert_eq!(info.bundle, "com.example.weather");

    let data = FormBindingData {
        content: r#"{"temp":"21C"}"#.into(),
        images: vec!["sunny.png".into()],
    };
    h.client.update_form(info.id, &data).await.unwrap();

    let all = h.client.get_all_forms_info().await.unwrap();
    assert_eq!(all, vec![info.clone()]);

    h.client.delete_form(info.id).await.unwrap();
    let err = h.client.delete_form(info.id).await.unwrap_err();
    assert_eq!(err, FormError::Service(ErrCode::FormNotFound.into()));
}

#[tokio::test]
async fn local_validation_never_reaches_the_transport() {
    let h = harness(CallerContext::app(20010));

    let err = h.client.delete_form(FormId::new(-1)).await.unwrap_err();
    assert_eq!(err, FormError::InvalidFormId(-1));
    let err = h.client.set_next_refresh_time(FormId::new(1), 0).await.unwrap_err();
    assert!(matches!(err, FormError::InvalidArgument(_)));

    // Nothing was even resolved, let alone sent.
    assert_eq!(h.discovery.resolve_count(), 0);
}

#[tokio::test]
async fn filtered_queries_return_exact_sets_in_id_order() {
    let h = harness(CallerContext::app(20010));

    let forecast = h.client.add_form(&request("com.example.weather", "forecast")).await.unwrap();
    let mut radar_req = request("com.example.weather", "radar");
    radar_req.module = "feature".into();
    let radar = h.client.add_form(&radar_req).await.unwrap();
    let clock = h.client.add_form(&request("com.example.clock", "clock")).await.unwrap();

    let by_app = h.client.get_forms_info_by_app("com.example.weather").await.unwrap();
    assert_eq!(by_app, vec![forecast.clone(), radar.clone()]);

    let by_module = h
        .client
        .get_forms_info_by_module("com.example.weather", "feature")
        .await
        .unwrap();
    assert_eq!(by_module, vec![radar]);

    let everything = h.client.get_forms_info(&FormInfoFilter::default()).await.unwrap();
    assert_eq!(everything.len(), 3);
    assert_eq!(everything.last(), Some(&clock));
}

#[tokio::test]
async fn service_codes_translate_to_published_errors() {
    let h = harness(CallerContext::app(20010));

    let err = h.client.delete_form(FormId::new(999)).await.unwrap_err();
    let code = match err {
        FormError::Service(code) => code,
        other => panic!("expected service error, got {other:?}"),
    };
    assert_eq!(translate(code).code, EXTERNAL_FORM_NOT_FOUND);
}

#[tokio::test]
async fn system_operations_rejected_for_app_callers() {
    let h = harness(CallerContext::app(20010));
    let info = h.client.add_form(&request("com.example.weather", "forecast")).await.unwrap();

    let err = h.client.lifecycle_update(&[info.id], false).await.unwrap_err();
    let code = match err {
        FormError::Service(code) => code,
        other => panic!("expected service error, got {other:?}"),
    };
    assert_eq!(code, i32::from(ErrCode::PermissionDenied));
    assert_eq!(translate(code).code, EXTERNAL_PERMISSION_DENIED);

    // The same operations go through for a system caller.
    let system = harness(CallerContext::system());
    let info = system.client.add_form(&request("com.example.clock", "clock")).await.unwrap();
    system.client.lifecycle_update(&[info.id], false).await.unwrap();
    system
        .client
        .notify_forms_visible(&[info.id], true)
        .await
        .unwrap();
    assert!(system.client.has_form_visible(info.id).await.unwrap());
}

#[tokio::test]
async fn events_are_fire_and_forget() {
    let h = harness(CallerContext::app(20010));
    let info = h.client.add_form(&request("com.example.weather", "forecast")).await.unwrap();

    h.client.message_event(info.id, "refresh").await.unwrap();
    h.client.router_event(info.id, "pages/detail").await.unwrap();

    // A remote failure on a oneway op is invisible to the caller.
    h.client.message_event(FormId::new(999), "refresh").await.unwrap();

    let endpoint = h.discovery.current_endpoint().unwrap();
    assert_eq!(endpoint.oneway_count(), 3);
}

#[tokio::test]
async fn form_state_reflects_service_knowledge() {
    let h = harness(CallerContext::app(20010));
    let req = request("com.example.weather", "forecast");

    assert_eq!(h.client.acquire_form_state(&req).await.unwrap(), FormState::Default);
    h.client.add_form(&req).await.unwrap();
    assert_eq!(h.client.acquire_form_state(&req).await.unwrap(), FormState::Ready);

    assert!(h.client.check_service_ready().await.unwrap());
}

#[tokio::test]
async fn temp_form_cast_and_publish() {
    let h = harness(CallerContext::app(20010));

    let mut req = request("com.example.weather", "forecast");
    req.temporary = true;
    let info = h.client.add_form(&req).await.unwrap();
    assert!(info.temporary);
    h.client.cast_temp_form(info.id).await.unwrap();

    let published = h
        .client
        .request_publish_form(&request("com.example.weather", "radar"))
        .await
        .unwrap();
    assert!(published.is_valid());
    assert_ne!(published, info.id);
}
