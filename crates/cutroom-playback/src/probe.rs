//! Audio presence probe
//!
//! Generated clips sometimes carry no audio track at all. The probe polls the
//! decoder's audio byte counter and publishes what it sees on a watch channel.
//! It runs until its token is cancelled, which the owning session does on close.

use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::element::DecodedAudioCounter;

/// Zero readings in a row before a track is reported silent.
const ABSENT_AFTER_READINGS: u32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioPresence {
    #[default]
    Unknown,
    Present,
    Absent,
}

/// Start polling `counter` every `every`. Once audio is seen the probe stops on
/// its own; otherwise it keeps polling until `cancel` fires.
pub fn spawn_audio_presence_probe(
    counter: Arc<dyn DecodedAudioCounter>,
    every: Duration,
    cancel: CancellationToken,
) -> (watch::Receiver<AudioPresence>, JoinHandle<()>) {
    let (tx, rx) = watch::channel(AudioPresence::Unknown);

    let handle = tokio::spawn(async move {
        let mut ticker = interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut zero_readings = 0u32;
        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    break;
                }
                _ = ticker.tick() => {
                    let next = match counter.decoded_audio_bytes() {
                        None => AudioPresence::Unknown,
                        Some(bytes) if bytes > 0 => AudioPresence::Present,
                        Some(_) => {
                            zero_readings += 1;
                            if zero_readings >= ABSENT_AFTER_READINGS {
                                AudioPresence::Absent
                            } else {
                                AudioPresence::Unknown
                            }
                        }
                    };

                    tx.send_if_modified(|current| {
                        if *current == next {
                            false
                        } else {
                            tracing::debug!(presence = ?next, "Audio presence changed");
                            *current = next;
                            true
                        }
                    });

                    if next == AudioPresence::Present {
                        break;
                    }
                }
            }
        }
    });

    (rx, handle)
}
