mod helpers;

use cutroom_core::models::{
    AudioSourceSelection, Cut, DurationMaster, LoadState, MediaKind, MediaReference, ProjectId,
    TrimWindow, VolumeMap,
};
use cutroom_core::{InMemoryProject, MediaError, PlaybackConfig, ProjectContext};
use cutroom_playback::{
    AudioPresence, DecodedAudioCounter, MediaElement, PreviewSession, TickOutcome,
};
use cutroom_storage::ContentStore;
use helpers::{memory_resolver, webm_bytes, FakeElement};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

const VIDEO_KEY: &str = "media/p/cut_1/video/r0001.webm";
const AUDIO_KEY: &str = "media/p/cut_1/audio/r0001.webm";

fn cut(trim: TrimWindow, with_audio: bool) -> Cut {
    let mut cut = Cut::new(1);
    cut.trim_window = trim;
    cut.video_reference = Some(MediaReference::store(MediaKind::Video, VIDEO_KEY));
    if with_audio {
        cut.audio_reference = Some(MediaReference::store(MediaKind::Audio, AUDIO_KEY));
    }
    cut
}

struct Harness {
    session: PreviewSession,
    primary: FakeElement,
    secondary: FakeElement,
    resolver: Arc<cutroom_media::ReferenceResolver>,
}

async fn mounted(cut: &Cut) -> Harness {
    let (store, resolver) = memory_resolver();
    for (kind, key) in [(MediaKind::Video, VIDEO_KEY), (MediaKind::Audio, AUDIO_KEY)] {
        store
            .put(kind, key, webm_bytes().into(), None)
            .await
            .unwrap();
    }

    let primary = FakeElement::new();
    let secondary = FakeElement::new();
    let mut session = PreviewSession::open(
        cut,
        primary.boxed(),
        secondary.boxed(),
        PlaybackConfig::default(),
    );
    session.mount(&resolver).await.unwrap();

    Harness {
        session,
        primary,
        secondary,
        resolver,
    }
}

fn audible(h: &Harness) -> usize {
    [&h.primary, &h.secondary]
        .iter()
        .filter(|element| !element.is_muted())
        .count()
}

#[tokio::test]
async fn test_degenerate_trim_resets_to_full_clip() {
    let mut h = mounted(&cut(TrimWindow::new(2.0, 2.3), false)).await;
    h.session.on_metadata_loaded(10.0);
    assert_eq!(h.session.state().trim_window, TrimWindow::new(0.0, 10.0));
}

#[tokio::test]
async fn test_valid_trim_is_kept() {
    let mut h = mounted(&cut(TrimWindow::new(1.0, 4.0), false)).await;
    h.session.on_metadata_loaded(10.0);
    assert_eq!(h.session.state().trim_window, TrimWindow::new(1.0, 4.0));
    assert_eq!(h.primary.time(), 1.0);

    // Uninitialized window (end 0) and one past the clip are reset too
    let mut h = mounted(&cut(TrimWindow::default(), false)).await;
    h.session.on_metadata_loaded(8.0);
    assert_eq!(h.session.state().trim_window, TrimWindow::new(0.0, 8.0));

    let mut h = mounted(&cut(TrimWindow::new(3.0, 30.0), false)).await;
    h.session.on_metadata_loaded(8.0);
    assert_eq!(h.session.state().trim_window, TrimWindow::new(0.0, 8.0));
}

#[tokio::test]
async fn test_exactly_one_track_audible_across_toggles() {
    let mut h = mounted(&cut(TrimWindow::new(0.0, 5.0), true)).await;
    h.session.on_metadata_loaded(5.0);
    assert_eq!(audible(&h), 1);
    assert!(!h.primary.is_muted());

    h.session.play();
    let sequence = [
        AudioSourceSelection::AlternateTrack,
        AudioSourceSelection::AlternateTrack,
        AudioSourceSelection::PrimaryTrack,
        AudioSourceSelection::AlternateTrack,
        AudioSourceSelection::PrimaryTrack,
        AudioSourceSelection::PrimaryTrack,
    ];
    for source in sequence {
        h.session.set_audio_source(source).unwrap();
        assert_eq!(audible(&h), 1, "after switching to {:?}", source);
        let alternate = source == AudioSourceSelection::AlternateTrack;
        assert_eq!(h.secondary.is_muted(), !alternate);
        assert_eq!(h.primary.is_muted(), alternate);
    }
}

#[tokio::test]
async fn test_switch_restores_silenced_volume() {
    let mut source = cut(TrimWindow::new(0.0, 5.0), true);
    source.volumes = VolumeMap {
        primary: 1.0,
        alternate: 0.0,
        background: 0.3,
    };
    let mut h = mounted(&source).await;

    h.session
        .set_audio_source(AudioSourceSelection::AlternateTrack)
        .unwrap();
    assert_eq!(h.session.state().volumes.alternate, 1.0);
    assert_eq!(h.secondary.volume(), 1.0);

    // Non-silent preferences are left alone
    h.session.set_volume(AudioSourceSelection::PrimaryTrack, 0.4);
    h.session
        .set_audio_source(AudioSourceSelection::PrimaryTrack)
        .unwrap();
    assert_eq!(h.primary.volume(), 0.4);
}

#[tokio::test]
async fn test_alternate_requires_loaded_track() {
    let mut h = mounted(&cut(TrimWindow::new(0.0, 5.0), false)).await;
    assert_eq!(h.session.state().alternate_state, LoadState::Empty);
    assert!(matches!(
        h.session.set_audio_source(AudioSourceSelection::AlternateTrack),
        Err(MediaError::InvalidInput(_))
    ));
    assert_eq!(audible(&h), 1);
    assert!(!h.primary.is_muted());
}

#[tokio::test]
async fn test_drift_is_corrected_on_next_tick() {
    let mut source = cut(TrimWindow::new(1.0, 9.0), true);
    source.audio_source = AudioSourceSelection::AlternateTrack;
    let mut h = mounted(&source).await;
    h.session.on_metadata_loaded(10.0);
    h.session.on_alternate_metadata_loaded(8.0);
    h.session.play();

    h.primary.set_time(3.0);
    h.secondary.set_time(2.05);
    assert_eq!(h.session.on_time_update(), TickOutcome::Playing);

    h.secondary.set_time(1.6);
    assert_eq!(h.session.on_time_update(), TickOutcome::DriftCorrected);
    assert!((h.secondary.time() - 2.0).abs() < 0.01);

    assert_eq!(h.session.on_time_update(), TickOutcome::Playing);
}

#[tokio::test]
async fn test_audio_driven_loop_freezes_video_until_voice_ends() {
    let mut source = cut(TrimWindow::new(1.0, 4.0), true);
    source.duration_master = DurationMaster::AudioDriven;
    source.audio_source = AudioSourceSelection::AlternateTrack;
    let mut h = mounted(&source).await;
    h.session.on_metadata_loaded(10.0);
    h.session.on_alternate_metadata_loaded(6.0);
    h.session.play();
    assert_eq!(h.primary.time(), 1.0);
    assert_eq!(h.secondary.time(), 0.0);

    h.primary.set_time(2.5);
    h.secondary.set_time(1.5);
    assert_eq!(h.session.on_time_update(), TickOutcome::Playing);

    // Video reaches its trim end: hold the last frame
    h.primary.set_time(4.0);
    h.secondary.set_time(3.0);
    assert_eq!(h.session.on_time_update(), TickOutcome::Frozen);
    assert!(h.primary.is_paused());
    assert_eq!(h.primary.time(), 4.0);
    assert!(h.session.state().frozen);

    h.secondary.set_time(5.9);
    assert_eq!(h.session.on_time_update(), TickOutcome::Frozen);
    assert!(!h.secondary.is_paused());

    // Voice track done: six seconds elapsed, both restart
    h.secondary.set_time(6.0);
    assert_eq!(h.session.on_time_update(), TickOutcome::Looped);
    assert_eq!(h.primary.time(), 1.0);
    assert_eq!(h.secondary.time(), 0.0);
    assert!(!h.primary.is_paused());
    assert!(!h.session.state().frozen);
}

#[tokio::test]
async fn test_video_only_loops_at_trim_end() {
    let mut h = mounted(&cut(TrimWindow::new(1.0, 4.0), true)).await;
    h.session.on_metadata_loaded(10.0);
    h.session.on_alternate_metadata_loaded(6.0);
    h.session.play();

    h.primary.set_time(4.0);
    assert_eq!(h.session.on_time_update(), TickOutcome::Looped);
    assert_eq!(h.primary.time(), 1.0);
}

#[tokio::test]
async fn test_paused_session_is_idle() {
    let mut h = mounted(&cut(TrimWindow::new(0.0, 5.0), false)).await;
    h.session.on_metadata_loaded(5.0);
    assert_eq!(h.session.on_time_update(), TickOutcome::Idle);
    h.session.play();
    h.session.pause();
    assert!(h.primary.is_paused());
    assert_eq!(h.session.on_time_update(), TickOutcome::Idle);
}

#[tokio::test]
async fn test_close_unloads_and_releases_handles() {
    let mut h = mounted(&cut(TrimWindow::new(0.0, 5.0), true)).await;
    let blobs = h.resolver.blobs().clone();
    assert_eq!(blobs.live_count(), 2);
    assert!(h.primary.has_source());

    h.session.play();
    h.session.close();
    h.session.close();

    assert!(h.session.is_closed());
    assert!(!h.primary.has_source());
    assert!(!h.secondary.has_source());
    assert!(h.primary.is_paused());
    assert!(h.session.cancel_token().is_cancelled());
    let stats = blobs.stats();
    assert_eq!(stats.live, 0);
    assert_eq!(stats.revoked, 2);
}

#[tokio::test]
async fn test_drop_releases_handles() {
    let h = mounted(&cut(TrimWindow::new(0.0, 5.0), true)).await;
    let blobs = h.resolver.blobs().clone();
    let primary = h.primary.clone();
    drop(h);

    assert_eq!(blobs.live_count(), 0);
    assert!(!primary.has_source());
}

#[tokio::test]
async fn test_repeated_mount_unmount_leaks_nothing() {
    let (store, resolver) = memory_resolver();
    store
        .put(MediaKind::Video, VIDEO_KEY, webm_bytes().into(), None)
        .await
        .unwrap();
    let source = cut(TrimWindow::new(0.0, 5.0), false);

    for _ in 0..20 {
        let mut session = PreviewSession::open(
            &source,
            FakeElement::new().boxed(),
            FakeElement::new().boxed(),
            PlaybackConfig::default(),
        );
        session.mount(&resolver).await.unwrap();
        session.close();
    }

    let stats = resolver.blobs().stats();
    assert_eq!(stats.allocated, 20);
    assert_eq!(stats.revoked, 20);
    assert_eq!(stats.live, 0);
}

#[tokio::test]
async fn test_cancelled_mount_loads_nothing() {
    let (_store, resolver) = memory_resolver();
    let mut source = Cut::new(3);
    source.video_reference = Some(MediaReference::RemoteUrl(
        "https://cdn.example.com/slow.webm".to_string(),
    ));

    let primary = FakeElement::new();
    let mut session = PreviewSession::open(
        &source,
        primary.boxed(),
        FakeElement::new().boxed(),
        PlaybackConfig::default(),
    );

    let token = session.cancel_token();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(10)).await;
        token.cancel();
    });

    let result = session.mount(&resolver).await;
    assert!(matches!(result, Err(MediaError::Cancelled)));
    assert!(!primary.has_source());
    assert_eq!(resolver.blobs().stats().allocated, 0);
    assert_eq!(session.state().video_state, LoadState::Resolving);
}

#[tokio::test]
async fn test_missing_video_is_reported_as_data_loss() {
    let (_store, resolver) = memory_resolver();
    let source = cut(TrimWindow::new(0.0, 5.0), false);
    let mut session = PreviewSession::open(
        &source,
        FakeElement::new().boxed(),
        FakeElement::new().boxed(),
        PlaybackConfig::default(),
    );

    let result = session.mount(&resolver).await;
    assert!(matches!(result, Err(MediaError::Unavailable(_))));
    match &session.state().video_state {
        LoadState::Failed { code, message } => {
            assert_eq!(code, "MEDIA_UNAVAILABLE");
            assert!(message.contains("data may be lost"));
        }
        other => panic!("unexpected state {:?}", other),
    }
}

#[tokio::test]
async fn test_save_clamps_and_writes_one_update() {
    let source = cut(TrimWindow::new(1.0, 4.0), true);
    let project = InMemoryProject::new(ProjectId::new(), vec![source.clone()]);
    let mut h = mounted(&source).await;
    h.session.on_metadata_loaded(10.0);

    h.session
        .set_trim_window(TrimWindow::new(9.98, 12.0))
        .unwrap();
    h.session
        .set_audio_source(AudioSourceSelection::AlternateTrack)
        .unwrap();
    h.session.set_volume(AudioSourceSelection::AlternateTrack, 0.7);
    h.session.set_duration_master(DurationMaster::VideoDriven);

    let saved = h.session.save(&project).await.unwrap();
    assert!((saved.trim_window.start - 9.9).abs() < 1e-9);
    assert_eq!(saved.trim_window.end, 10.0);
    assert_eq!(saved.audio_source, AudioSourceSelection::AlternateTrack);
    assert_eq!(saved.volumes.alternate, 0.7);
    assert_eq!(saved.duration_master, DurationMaster::VideoDriven);
    assert_eq!(project.cut(1).await.unwrap(), saved);
}

#[tokio::test]
async fn test_confirmed_cut_locks_trim_but_saves_audio() {
    let mut source = cut(TrimWindow::new(1.0, 4.0), true);
    source.confirmed = true;
    let project = InMemoryProject::new(ProjectId::new(), vec![source.clone()]);
    let mut h = mounted(&source).await;
    h.session.on_metadata_loaded(10.0);

    assert!(matches!(
        h.session.set_trim_window(TrimWindow::new(0.0, 2.0)),
        Err(MediaError::Locked(1))
    ));

    h.session
        .set_audio_source(AudioSourceSelection::AlternateTrack)
        .unwrap();
    let saved = h.session.save(&project).await.unwrap();
    assert_eq!(saved.trim_window, TrimWindow::new(1.0, 4.0));
    assert_eq!(saved.audio_source, AudioSourceSelection::AlternateTrack);
}

#[tokio::test]
async fn test_empty_stored_video_is_data_loss() {
    let (store, resolver) = memory_resolver();
    store
        .put(MediaKind::Video, VIDEO_KEY, Vec::<u8>::new().into(), Some("video/webm"))
        .await
        .unwrap();

    let primary = FakeElement::new();
    let mut session = PreviewSession::open(
        &cut(TrimWindow::new(0.0, 5.0), false),
        primary.boxed(),
        FakeElement::new().boxed(),
        PlaybackConfig::default(),
    );

    let result = session.mount(&resolver).await;
    assert!(matches!(result, Err(MediaError::Unavailable(_))));
    assert!(!primary.has_source());
    match &session.state().video_state {
        LoadState::Failed { code, .. } => assert_eq!(code, "MEDIA_UNAVAILABLE"),
        other => panic!("unexpected state {:?}", other),
    }
    assert_eq!(resolver.blobs().stats().allocated, 0);
}

/// Decoder that never produces audio, so polling never stops on its own.
struct SilentTrack;

impl DecodedAudioCounter for SilentTrack {
    fn decoded_audio_bytes(&self) -> Option<u64> {
        Some(0)
    }
}

async fn presence_watch_stopped(rx: &mut watch::Receiver<AudioPresence>) -> bool {
    tokio::time::timeout(Duration::from_secs(2), async {
        while rx.changed().await.is_ok() {}
    })
    .await
    .is_ok()
}

#[tokio::test]
async fn test_audio_presence_watch_ends_on_close() {
    let mut h = mounted(&cut(TrimWindow::new(0.0, 5.0), true)).await;
    let mut rx = h.session.spawn_audio_probe(Arc::new(SilentTrack));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(rx.has_changed().is_ok(), "presence watch should still be running");

    h.session.close();
    assert!(presence_watch_stopped(&mut rx).await);
}

#[tokio::test]
async fn test_audio_presence_watch_ends_on_drop() {
    let h = mounted(&cut(TrimWindow::new(0.0, 5.0), true)).await;
    let Harness { mut session, .. } = h;
    let mut rx = session.spawn_audio_probe(Arc::new(SilentTrack));
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(rx.has_changed().is_ok());

    drop(session);
    assert!(presence_watch_stopped(&mut rx).await);
}

#[tokio::test]
async fn test_confirmed_cut_with_reset_trim_still_saves_audio() {
    let mut source = cut(TrimWindow::new(2.0, 2.3), true);
    source.confirmed = true;
    let project = InMemoryProject::new(ProjectId::new(), vec![source.clone()]);
    let mut h = mounted(&source).await;

    // Playback uses the whole clip; the stored window is left alone
    h.session.on_metadata_loaded(10.0);
    assert_eq!(h.session.state().trim_window, TrimWindow::new(0.0, 10.0));

    h.session
        .set_audio_source(AudioSourceSelection::AlternateTrack)
        .unwrap();
    h.session.set_volume(AudioSourceSelection::AlternateTrack, 0.6);

    let saved = h.session.save(&project).await.unwrap();
    assert_eq!(saved.trim_window, TrimWindow::new(2.0, 2.3));
    assert_eq!(saved.audio_source, AudioSourceSelection::AlternateTrack);
    assert_eq!(saved.volumes.alternate, 0.6);
    assert_eq!(project.cut(1).await.unwrap(), saved);
    assert_eq!(h.session.state().trim_window, TrimWindow::new(0.0, 10.0));
}
