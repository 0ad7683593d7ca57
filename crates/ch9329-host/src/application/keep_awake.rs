//! Keep-awake scheduler: periodically taps a harmless key on the target.
//!
//! A machine driven only through the CH9329 sees no input while the operator
//! works elsewhere, and will lock or sleep.  This task taps a key (Scroll Lock
//! by default) once per period to keep it awake.
//!
//! # Jitter
//!
//! Before every tap the task waits a random extra delay (1–5 s by default) so
//! the target does not see input at an exact fixed interval.
//!
//! # Modes
//!
//! | Mode             | Taps while session active | Taps while inactive |
//! |------------------|---------------------------|---------------------|
//! | `off`            | no                        | no                  |
//! | `while_inactive` | no                        | yes                 |
//! | `always`         | yes                       | yes                 |

use std::ops::Range;
use std::sync::Arc;
use std::time::Duration;

use ch9329_core::keymap::vk;
use parking_lot::Mutex;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, trace, warn};

use super::session::RemoteSession;

/// Default interval between taps.
pub const DEFAULT_PERIOD: Duration = Duration::from_secs(60);

/// Default random delay added before each tap.
pub const DEFAULT_JITTER: Range<Duration> = Duration::from_secs(1)..Duration::from_secs(5);

/// Default key: Scroll Lock, which has no visible effect on most targets.
pub const DEFAULT_KEY_VK: u8 = vk::SCROLL;

/// When the scheduler taps.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum KeepAwakeMode {
    #[default]
    Off,
    WhileInactive,
    Always,
}

impl KeepAwakeMode {
    /// Returns `true` if a tap is due given the session state.
    pub fn should_tap(self, session_active: bool) -> bool {
        match self {
            KeepAwakeMode::Off => false,
            KeepAwakeMode::WhileInactive => !session_active,
            KeepAwakeMode::Always => true,
        }
    }
}

/// Scheduler parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeepAwakeSettings {
    pub mode: KeepAwakeMode,
    pub period: Duration,
    /// Extra delay before each tap is drawn uniformly from this range.
    /// An empty range means no jitter beyond `jitter.start`.
    pub jitter: Range<Duration>,
    /// Windows VK code of the key to tap.
    pub key_vk: u8,
}

impl KeepAwakeSettings {
    pub fn new(mode: KeepAwakeMode) -> Self {
        Self {
            mode,
            period: DEFAULT_PERIOD,
            jitter: DEFAULT_JITTER,
            key_vk: DEFAULT_KEY_VK,
        }
    }

    fn pick_jitter<R: Rng>(&self, rng: &mut R) -> Duration {
        let start = self.jitter.start.as_millis() as u64;
        let end = self.jitter.end.as_millis() as u64;
        if end <= start {
            return self.jitter.start;
        }
        Duration::from_millis(rng.gen_range(start..end))
    }
}

impl Default for KeepAwakeSettings {
    fn default() -> Self {
        Self::new(KeepAwakeMode::default())
    }
}

/// Runs the scheduler until `shutdown` flips to `true` or its sender drops.
///
/// The first tap is due immediately (plus jitter).  The tap itself blocks for
/// the encoder's tap delay, so it runs on the blocking pool.
pub async fn run_keep_awake(
    session: Arc<Mutex<RemoteSession>>,
    settings: KeepAwakeSettings,
    mut shutdown: watch::Receiver<bool>,
) {
    if settings.mode == KeepAwakeMode::Off {
        debug!("keep-awake disabled");
        return;
    }

    info!(
        mode = ?settings.mode,
        period_secs = settings.period.as_secs(),
        key_vk = %format!("0x{:02X}", settings.key_vk),
        "keep-awake started"
    );

    let mut ticker = tokio::time::interval(settings.period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }

        let jitter = settings.pick_jitter(&mut rand::thread_rng());
        tokio::select! {
            _ = tokio::time::sleep(jitter) => {}
            _ = shutdown.changed() => break,
        }

        let session = Arc::clone(&session);
        let mode = settings.mode;
        let key_vk = settings.key_vk;
        let outcome = tokio::task::spawn_blocking(move || {
            let mut session = session.lock();
            if !mode.should_tap(session.is_active()) {
                return Ok(false);
            }
            session.keep_awake_tap(key_vk).map(|()| true)
        })
        .await;

        match outcome {
            Ok(Ok(true)) => debug!("keep-awake tap sent"),
            Ok(Ok(false)) => trace!("keep-awake tap skipped: session active"),
            Ok(Err(e)) => warn!("keep-awake tap failed: {e}"),
            Err(e) => error!("keep-awake tap task failed: {e}"),
        }
    }

    debug!("keep-awake stopped");
}
