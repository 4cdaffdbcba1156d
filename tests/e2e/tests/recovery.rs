//! Crash recovery over the full stack: the service endpoint dies, the
//! monitor reconnects, and calls resume against the surviving service state.

use formlink_client::{ClientConfig, RecoveryStatus};
use formlink_e2e::{harness, harness_with_config, wait_for};
use formlink_manager::CallerContext;
use formlink_types::{FormDimension, FormError, FormRequest, TransportError};

fn request(name: &str) -> FormRequest {
    FormRequest {
        bundle: "com.example.weather".into(),
        ability: "MainAbility".into(),
        module: "entry".into(),
        form_name: name.into(),
        dimension: Some(FormDimension::TwoByTwo),
        ..Default::default()
    }
}

#[tokio::test]
async fn service_state_survives_a_crash_and_reconnect() {
    let h = harness(CallerContext::app(20010));
    let info = h.client.add_form(&request("forecast")).await.unwrap();

    h.discovery.current_endpoint().unwrap().kill();

    // Recovery has run once the second resolve lands; only then is the
    // status transition back to NOT_RECOVERING meaningful.
    wait_for(|| h.discovery.resolve_count() == 2).await;
    let conn = h.client.connection().clone();
    wait_for(move || conn.status() == RecoveryStatus::NotRecovering).await;

    // Same store behind the fresh endpoint: nothing was lost.
    let all = h.client.get_all_forms_info().await.unwrap();
    assert_eq!(all, vec![info]);
}

#[tokio::test]
async fn reconnect_callbacks_fire_after_recovery() {
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    let h = harness(CallerContext::app(20010));
    let resynced = Arc::new(AtomicU32::new(0));
    let resynced_cb = resynced.clone();
    h.client.connection().on_reconnected(move || {
        resynced_cb.fetch_add(1, Ordering::SeqCst);
    });

    h.client.check_service_ready().await.unwrap();
    h.discovery.current_endpoint().unwrap().kill();

    wait_for(|| resynced.load(Ordering::SeqCst) == 1).await;
}

#[tokio::test]
async fn calls_are_rejected_while_recovery_runs() {
    let h = harness_with_config(
        CallerContext::app(20010),
        ClientConfig {
            reconnect_attempts: 3,
            reconnect_delay_ms: 200,
        },
    );
    h.client.check_service_ready().await.unwrap();

    // Failing discovery keeps the loop in RECOVERING long enough to observe.
    h.discovery.fail_resolves(true);
    h.discovery.current_endpoint().unwrap().kill();

    let conn = h.client.connection().clone();
    wait_for(move || conn.status() == RecoveryStatus::Recovering).await;

    let err = h.client.get_all_forms_info().await.unwrap_err();
    assert_eq!(err, FormError::RecoveryInProgress);
}

#[tokio::test]
async fn exhausted_recovery_is_sticky_until_an_explicit_reconnect() {
    let h = harness(CallerContext::app(20010));
    h.client.check_service_ready().await.unwrap();

    h.discovery.fail_resolves(true);
    h.discovery.current_endpoint().unwrap().kill();

    let conn = h.client.connection().clone();
    wait_for(move || conn.status() == RecoveryStatus::RecoverFailed).await;

    // Ordinary calls now attempt a fresh connect and surface the discovery
    // failure; the status stays sticky.
    let err = h.client.check_service_ready().await.unwrap_err();
    assert_eq!(
        err,
        FormError::Transport(TransportError::Discovery(
            "form service not registered".into()
        ))
    );

    // Once the service is registered again an explicit connect succeeds.
    h.discovery.fail_resolves(false);
    h.client.connection().ensure_connected().await.unwrap();
    assert_eq!(h.client.connection().status(), RecoveryStatus::NotRecovering);
    assert!(h.client.check_service_ready().await.unwrap());
}
