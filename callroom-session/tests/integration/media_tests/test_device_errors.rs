use std::sync::Arc;

use callroom_core::ConnectionPhase;
use callroom_session::signaling::MemoryRelay;
use callroom_session::{DeviceError, SessionError, SessionEvent};

use crate::integration::{alice, bob, create_participant_with, init_tracing, room, test_config};
use crate::utils::{MockMediaDevices, MockPeerConnectionFactory, expect_phase, wait_for_event};

#[tokio::test]
async fn test_device_in_use_stops_before_transport() {
    init_tracing();

    let side = create_participant_with(
        Arc::new(MemoryRelay::new()),
        MockPeerConnectionFactory::new("alice"),
        MockMediaDevices::failing(DeviceError::InUse),
        test_config(),
    );

    let mut call = side
        .manager
        .start_session(room(), alice(), bob())
        .expect("alice starts");
    let mut events = call.take_events().expect("events");

    expect_phase(&call, ConnectionPhase::Error)
        .await
        .expect("acquisition fails");
    assert_eq!(side.devices.user_requests(), 1);
    assert_eq!(side.factory.created().await, 0);

    let failure = wait_for_event(&mut events, |e| matches!(e, SessionEvent::Failed(_)))
        .await
        .expect("failure reported");
    match failure {
        SessionEvent::Failed(SessionError::Device(err)) => {
            assert_eq!(err, DeviceError::InUse);
            assert!(err.user_message().contains("already in use"));
        }
        other => panic!("expected a device error, got {:?}", other),
    }

    assert!(matches!(
        call.toggle_mic().await,
        Err(SessionError::MediaUnavailable)
    ));

    call.hangup().await;
    assert_eq!(call.phase(), ConnectionPhase::Closed);
}

#[tokio::test]
async fn test_permission_denied_has_its_own_message() {
    init_tracing();

    let side = create_participant_with(
        Arc::new(MemoryRelay::new()),
        MockPeerConnectionFactory::new("alice"),
        MockMediaDevices::failing(DeviceError::from_platform("NotAllowedError", "denied")),
        test_config(),
    );

    let mut call = side
        .manager
        .start_session(room(), alice(), bob())
        .expect("alice starts");
    let mut events = call.take_events().expect("events");

    let failure = wait_for_event(&mut events, |e| matches!(e, SessionEvent::Failed(_)))
        .await
        .expect("failure reported");
    match failure {
        SessionEvent::Failed(SessionError::Device(err)) => {
            assert_eq!(err, DeviceError::PermissionDenied);
            assert_ne!(err.user_message(), DeviceError::InUse.user_message());
        }
        other => panic!("expected a device error, got {:?}", other),
    }
    assert_eq!(side.factory.created().await, 0);

    call.hangup().await;
}
