//! Player service: commands, engine events and the progress ticker on one task


use aria_playback::{
    PlayRequest, PlaybackError, PlayerEvent, PlayerHandle, PlayerSnapshot, SessionEvent,
    TransportState,
};
use std::time::Duration;
use test_helpers::{song, Harness, Report};

async fn wait_for(handle: &PlayerHandle, predicate: impl Fn(&PlayerSnapshot) -> bool) {
    let mut rx = handle.subscribe();
    tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|s| predicate(s)))
        .await
        .expect("player never reached the expected state")
        .expect("player service stopped");
}

#[tokio::test(start_paused = true)]
async fn commands_are_answered_and_state_is_published() {
    let service = Harness::new().await.into_service();
    let mut events = service.handle.events();

    service
        .handle
        .play(PlayRequest::songs([song("a"), song("b")]))
        .await
        .unwrap();
    wait_for(&service.handle, |s| s.current_song.is_some()).await;

    let snapshot = service.handle.snapshot();
    assert!(snapshot.is_playing);
    assert_eq!(snapshot.current_song.unwrap().id.as_str(), "a");

    service.handle.skip_forward().await.unwrap();
    wait_for(&service.handle, |s| {
        s.current_song.as_ref().is_some_and(|c| c.id.as_str() == "b")
    })
    .await;

    let changes = std::iter::from_fn(|| events.try_recv().ok())
        .filter(|e| matches!(e, PlayerEvent::SongChanged { .. }))
        .count();
    assert_eq!(changes, 2);
}

#[tokio::test(start_paused = true)]
async fn errors_are_returned_to_the_caller() {
    let service = Harness::new().await.into_service();

    let err = service.handle.resume().await.unwrap_err();
    assert!(matches!(err, PlaybackError::NoCurrentSong));
}

#[tokio::test(start_paused = true)]
async fn progress_is_reported_while_playing() {
    let service = Harness::new().await.into_service();

    service
        .handle
        .play(PlayRequest::songs([song("a")]))
        .await
        .unwrap();
    wait_for(&service.handle, |s| s.current_song.is_some()).await;

    tokio::time::sleep(Duration::from_secs(25)).await;
    let progress = |reports: Vec<Report>| {
        reports
            .iter()
            .filter(|r| matches!(r, Report::Progress { .. }))
            .count()
    };
    assert_eq!(progress(service.remote.reports()), 2);

    // Paused players stay quiet
    service.handle.pause().await.unwrap();
    let before = progress(service.remote.reports());
    tokio::time::sleep(Duration::from_secs(60)).await;
    assert_eq!(progress(service.remote.reports()), before);
}

#[tokio::test(start_paused = true)]
async fn session_events_reach_the_orchestrator() {
    let service = Harness::new().await.into_service();

    service
        .handle
        .play(PlayRequest::songs([song("a")]))
        .await
        .unwrap();
    wait_for(&service.handle, |s| s.is_playing).await;

    service
        .session_events
        .send(SessionEvent::InterruptionBegan)
        .unwrap();
    wait_for(&service.handle, |s| s.transport == TransportState::Paused).await;

    service
        .session_events
        .send(SessionEvent::InterruptionEnded {
            should_resume: true,
        })
        .unwrap();
    wait_for(&service.handle, |s| s.transport == TransportState::Playing).await;
    assert!(service.engine.is_playing());
}

#[tokio::test(start_paused = true)]
async fn dropping_every_handle_stops_playback() {
    let service = Harness::new().await.into_service();

    service
        .handle
        .play(PlayRequest::songs([song("a")]))
        .await
        .unwrap();
    wait_for(&service.handle, |s| s.current_song.is_some()).await;

    let engine = service.engine.clone();
    drop(service.handle);

    tokio::time::timeout(Duration::from_secs(5), async {
        while engine.current().is_some() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("player kept playing after its handles were dropped");
    assert!(service.remote.reports().contains(&Report::Stopped("a".into())));
}
