use std::sync::Arc;
use std::time::Duration;

use callroom_core::{
    CallRoom, CandidateCollection, ConnectionPhase, IceCandidate, SdpType, SessionDescription,
};
use callroom_session::signaling::{MemoryRelay, SignalingRelay};
use callroom_session::{CallHandle, SessionEvent};

use crate::integration::{alice, bob, create_participant, init_tracing, room, test_config};
use crate::utils::{
    MALFORMED_CANDIDATE, MockPeerConnection, SETTLE_TIMEOUT_MS, drain_events, expect_phase,
    wait_until,
};

fn remote_offer() -> CallRoom {
    CallRoom::with_offer(SessionDescription::new(SdpType::Offer, "v=0 remote offer"))
}

async fn wait_for_pending(call: &CallHandle, expected: usize) {
    wait_until(SETTLE_TIMEOUT_MS, || async move {
        call.snapshot()
            .await
            .map(|s| s.pending_candidates == expected)
            .unwrap_or(false)
    })
    .await
    .expect("pending candidates settle");
}

#[tokio::test]
async fn test_early_candidates_drain_in_order() {
    init_tracing();

    let relay = MemoryRelay::new();
    let early: Vec<IceCandidate> = (1..=3)
        .map(|n| MockPeerConnection::candidate("alice-remote", n))
        .collect();
    relay.get_or_create_room(&room()).await.unwrap();
    for candidate in &early {
        relay
            .append_candidate(&room(), CandidateCollection::OfferCandidates, candidate.clone())
            .await
            .unwrap();
    }

    let bob_side = create_participant("bob", Arc::new(relay.clone()), test_config());
    let bob_call = bob_side
        .manager
        .start_session(room(), bob(), alice())
        .expect("bob starts");
    expect_phase(&bob_call, ConnectionPhase::Negotiating)
        .await
        .expect("bob negotiating");

    // No remote description yet: everything is queued, nothing applied.
    wait_for_pending(&bob_call, 3).await;
    let pc = bob_side.factory.last().await.expect("bob transport");
    assert!(pc.applied().await.is_empty());

    relay.set_room(&room(), remote_offer()).await.unwrap();
    expect_phase(&bob_call, ConnectionPhase::Connected)
        .await
        .expect("bob applies the offer");

    assert_eq!(pc.applied().await, early);
    assert_eq!(bob_call.snapshot().await.unwrap().pending_candidates, 0);
    let stored = relay.room(&room()).expect("room");
    assert_eq!(stored.offer, remote_offer().offer);
    assert!(stored.answer.is_some());

    bob_call.hangup().await;
}

#[tokio::test]
async fn test_repeated_offer_is_applied_once() {
    init_tracing();

    let relay = MemoryRelay::new();
    let bob_side = create_participant("bob", Arc::new(relay.clone()), test_config());
    let mut bob_call = bob_side
        .manager
        .start_session(room(), bob(), alice())
        .expect("bob starts");
    let mut events = bob_call.take_events().expect("events");

    relay.set_room(&room(), remote_offer()).await.unwrap();
    expect_phase(&bob_call, ConnectionPhase::Connected)
        .await
        .expect("bob connects");
    let pc = bob_side.factory.last().await.expect("bob transport");
    let answer = relay.room(&room()).and_then(|r| r.answer);

    // The same offer arrives again as a modification of the room.
    relay.write_room(&room(), remote_offer()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(200)).await;

    assert_eq!(pc.remote_sets(), 1);
    assert_eq!(bob_call.phase(), ConnectionPhase::Connected);
    assert_eq!(relay.room(&room()).and_then(|r| r.answer), answer);
    assert!(
        !drain_events(&mut events)
            .iter()
            .any(|e| matches!(e, SessionEvent::Failed(_)))
    );

    bob_call.hangup().await;
}

#[tokio::test]
async fn test_bad_candidate_is_ignored() {
    init_tracing();

    let relay = MemoryRelay::new();
    let bob_side = create_participant("bob", Arc::new(relay.clone()), test_config());
    let bob_call = bob_side
        .manager
        .start_session(room(), bob(), alice())
        .expect("bob starts");

    relay.set_room(&room(), remote_offer()).await.unwrap();
    expect_phase(&bob_call, ConnectionPhase::Connected)
        .await
        .expect("bob connects");
    let pc = bob_side.factory.last().await.expect("bob transport");

    let good = MockPeerConnection::candidate("alice-remote", 7);
    for candidate in [IceCandidate::new(MALFORMED_CANDIDATE), good.clone()] {
        relay
            .append_candidate(&room(), CandidateCollection::OfferCandidates, candidate)
            .await
            .unwrap();
    }

    {
        let pc = &*pc;
        wait_until(SETTLE_TIMEOUT_MS, || async move { !pc.applied().await.is_empty() })
            .await
            .expect("good candidate applied");
    }
    assert_eq!(pc.applied().await, vec![good]);
    assert_eq!(bob_call.phase(), ConnectionPhase::Connected);
    assert_eq!(bob_call.snapshot().await.unwrap().pending_candidates, 0);

    bob_call.hangup().await;
}
