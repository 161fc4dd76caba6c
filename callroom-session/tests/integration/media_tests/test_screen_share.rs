use std::sync::Arc;

use callroom_core::ConnectionPhase;
use callroom_session::media::{MediaKind, TrackSource};
use callroom_session::signaling::MemoryRelay;
use callroom_session::{DeviceError, ScreenShareError, SessionError, SessionEvent};

use crate::integration::{TestParticipant, alice, bob, create_participant, init_tracing, room, test_config};
use crate::utils::{SETTLE_TIMEOUT_MS, expect_phase, wait_for_event, wait_until};

fn participant() -> TestParticipant {
    create_participant("alice", Arc::new(MemoryRelay::new()), test_config())
}

#[tokio::test]
async fn test_screen_share_round_trip() {
    init_tracing();

    let side = participant();
    let mut call = side
        .manager
        .start_session(room(), alice(), bob())
        .expect("alice starts");
    let mut events = call.take_events().expect("events");
    expect_phase(&call, ConnectionPhase::Negotiating)
        .await
        .expect("negotiating");

    let pc = side.factory.last().await.expect("transport");
    let camera = side.devices.last_camera().await.expect("camera stream");
    let camera_video = camera.video_tracks().next().expect("camera track").clone();
    assert_eq!(
        pc.outgoing(MediaKind::Video).await.as_deref(),
        Some(camera_video.id())
    );

    // Start: the screen replaces the camera on the existing sender.
    assert!(call.toggle_screen_share().await.expect("sharing starts"));
    let screen = side.devices.last_screen().await.expect("screen track");
    assert_eq!(pc.outgoing(MediaKind::Video).await.as_deref(), Some(screen.id()));
    assert_eq!(pc.added_tracks().await.len(), 2);

    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::LocalPreview(s)
            if s.tracks().len() == 1 && s.tracks()[0].source() == TrackSource::Screen)
    })
    .await
    .expect("screen preview");
    assert!(call.snapshot().await.unwrap().media.screen_sharing);

    // Stop: the camera comes back and the capture is released.
    assert!(!call.toggle_screen_share().await.expect("sharing stops"));
    assert!(screen.is_ended());
    assert!(!camera_video.is_ended());
    assert_eq!(
        pc.outgoing(MediaKind::Video).await.as_deref(),
        Some(camera_video.id())
    );

    wait_for_event(&mut events, |e| {
        matches!(e, SessionEvent::LocalPreview(s) if s.id() == camera.id())
    })
    .await
    .expect("camera preview");
    assert!(!call.snapshot().await.unwrap().media.screen_sharing);

    call.hangup().await;
}

#[tokio::test]
async fn test_platform_stop_restores_camera() {
    init_tracing();

    let side = participant();
    let call = side
        .manager
        .start_session(room(), alice(), bob())
        .expect("alice starts");
    expect_phase(&call, ConnectionPhase::Negotiating)
        .await
        .expect("negotiating");

    let pc = side.factory.last().await.expect("transport");
    let camera = side.devices.last_camera().await.expect("camera stream");
    let camera_id = camera.video_tracks().next().expect("camera track").id().to_owned();

    assert!(call.toggle_screen_share().await.expect("sharing starts"));
    let screen = side.devices.last_screen().await.expect("screen track");

    // The user ends the capture from the browser's own control.
    screen.stop();

    {
        let (pc, camera_id) = (&*pc, camera_id.as_str());
        wait_until(SETTLE_TIMEOUT_MS, || async move {
            pc.outgoing(MediaKind::Video).await.as_deref() == Some(camera_id)
        })
        .await
        .expect("camera restored");
    }
    assert!(!call.snapshot().await.unwrap().media.screen_sharing);
    assert_eq!(call.phase(), ConnectionPhase::Negotiating);

    call.hangup().await;
}

#[tokio::test]
async fn test_screen_share_failure_keeps_camera() {
    init_tracing();

    let side = participant();
    let call = side
        .manager
        .start_session(room(), alice(), bob())
        .expect("alice starts");
    expect_phase(&call, ConnectionPhase::Negotiating)
        .await
        .expect("negotiating");
    side.devices
        .fail_display_media(DeviceError::PermissionDenied)
        .await;

    let err = call
        .toggle_screen_share()
        .await
        .expect_err("capture refused");
    assert!(matches!(
        err,
        SessionError::ScreenShare(ScreenShareError::Capture(DeviceError::PermissionDenied))
    ));

    let pc = side.factory.last().await.expect("transport");
    let camera = side.devices.last_camera().await.expect("camera stream");
    let camera_id = camera.video_tracks().next().expect("camera track").id().to_owned();
    assert_eq!(pc.outgoing(MediaKind::Video).await, Some(camera_id));
    assert_eq!(call.phase(), ConnectionPhase::Negotiating);
    assert!(!call.snapshot().await.unwrap().media.screen_sharing);

    call.hangup().await;
}

#[tokio::test]
async fn test_teardown_releases_screen_capture() {
    init_tracing();

    let side = participant();
    let call = side
        .manager
        .start_session(room(), alice(), bob())
        .expect("alice starts");
    expect_phase(&call, ConnectionPhase::Negotiating)
        .await
        .expect("negotiating");

    assert!(call.toggle_screen_share().await.expect("sharing starts"));
    let screen = side.devices.last_screen().await.expect("screen track");
    let camera = side.devices.last_camera().await.expect("camera stream");

    call.hangup().await;

    assert!(screen.is_ended());
    assert!(camera.tracks().iter().all(|t| t.is_ended()));
}
