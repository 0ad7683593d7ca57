//! RemoteSession: routes captured input events into the HID encoder.
//!
//! The session sits between an input source and the [`HidEncoder`].  While
//! it is *active*, keyboard and mouse events are translated and forwarded to
//! the target machine; while it is inactive they are ignored, so the operator
//! can use the local machine normally.
//!
//! # Routing rules
//!
//! | Event                        | Action                                          |
//! |------------------------------|-------------------------------------------------|
//! | modifier key down / up       | `press_modifier` / `release_modifier`           |
//! | other key down               | `key_down(usage)` after VK→HID translation      |
//! | other key up                 | `key_up()`                                      |
//! | Ctrl+Alt+E down              | swallowed                                       |
//! | Ctrl+Alt+E up                | exits the session                               |
//! | mouse move                   | dispatched move; suppressed while one in flight |
//! | button down (not X2)         | `mouse_button_down`                             |
//! | X2 down                      | ignored                                         |
//! | any button up                | `mouse_button_up_all`; X2 also exits            |
//! | wheel                        | `mouse_scroll(±1)` by the sign of the delta     |
//! | media key / tap key          | forwarded even while inactive                   |
//!
//! Moves that arrive while a previous move is still being written are held
//! back: their deltas accumulate, up to [`MAX_PENDING_MOTION`] per axis, and
//! are folded into the next accepted move.  Motion beyond one report's
//! ±127 range is carried over the same way.  Whatever is still pending is
//! written before any button change and before the session exits, so the
//! pointer ends up where the input put it.

use ch9329_core::keymap::vk;
use ch9329_core::{
    EncodeError, HidEncoder, KeyAction, KeyMapper, MediaKey, MouseButton, MoveDispatch,
};
use thiserror::Error;
use tracing::{debug, info, trace, warn};

use crate::infrastructure::input_capture::RawInputEvent;

/// Largest motion per axis the session holds back while moves are in flight.
pub const MAX_PENDING_MOTION: i32 = 16 * 127;

/// Error type for the remote-session use case.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Encode(#[from] EncodeError),

    /// A configured key has no HID usage.
    #[error("virtual key 0x{0:02X} has no HID usage")]
    UnmappedKey(u8),
}

/// What the session did with one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventOutcome {
    /// One or more frames were written.
    Forwarded,
    /// A move was held back because another move is in flight.
    Suppressed,
    /// The session is inactive or the event has no mapping.
    Ignored,
    /// The event was consumed by a session control gesture.
    Swallowed,
    /// The session became active.
    Entered,
    /// The session became inactive.
    Exited,
}

/// Routes input events into a [`HidEncoder`] while the session is active.
pub struct RemoteSession {
    encoder: HidEncoder,
    active: bool,
    pending_dx: i32,
    pending_dy: i32,
    move_failures: u64,
}

impl RemoteSession {
    /// Creates an inactive session around `encoder`.
    pub fn new(encoder: HidEncoder) -> Self {
        Self {
            encoder,
            active: false,
            pending_dx: 0,
            pending_dy: 0,
            move_failures: 0,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn encoder(&self) -> &HidEncoder {
        &self.encoder
    }

    /// Number of dispatched mouse moves whose write failed.
    pub fn move_failures(&self) -> u64 {
        self.move_failures
    }

    /// Activates the session.
    ///
    /// Sends a full keyboard release first so modifier state left over from
    /// before the session cannot leak into it.
    pub fn enter(&mut self) -> Result<(), SessionError> {
        if self.active {
            return Ok(());
        }
        self.active = true;
        self.pending_dx = 0;
        self.pending_dy = 0;
        info!("remote session active");
        self.encoder.release_all()?;
        Ok(())
    }

    /// Deactivates the session and releases every held key and button.
    pub fn exit(&mut self) -> Result<(), SessionError> {
        if !self.active {
            return Ok(());
        }
        self.active = false;
        info!("remote session ended");
        self.release_everything()
    }

    /// Releases everything regardless of state.  Used on process shutdown.
    pub fn shutdown(&mut self) -> Result<(), SessionError> {
        self.active = false;
        self.release_everything()
    }

    /// Taps the key named by `vk_code` for the keep-awake scheduler.
    pub fn keep_awake_tap(&mut self, vk_code: u8) -> Result<(), SessionError> {
        let usage = KeyMapper::windows_vk_to_hid(vk_code).ok_or(SessionError::UnmappedKey(vk_code))?;
        self.encoder.tap_key(usage)?;
        Ok(())
    }

    /// Routes one input event.
    ///
    /// # Errors
    ///
    /// Returns [`SessionError::Encode`] if a frame could not be written.  The
    /// session stays in its current state; the caller decides whether to
    /// carry on.
    pub fn handle_event(&mut self, event: RawInputEvent) -> Result<EventOutcome, SessionError> {
        self.drain_move_failures();

        match event {
            RawInputEvent::SessionEnter => self.enter().map(|()| EventOutcome::Entered),
            RawInputEvent::SessionExit => self.exit().map(|()| EventOutcome::Exited),
            RawInputEvent::MediaKey { key } => self.media(key),
            RawInputEvent::TapKey { vk_code } => {
                self.keep_awake_tap(vk_code)?;
                Ok(EventOutcome::Forwarded)
            }
            _ if !self.active => {
                trace!(?event, "session inactive; event ignored");
                Ok(EventOutcome::Ignored)
            }
            RawInputEvent::KeyDown { vk_code } => self.key_down(vk_code),
            RawInputEvent::KeyUp { vk_code } => self.key_up(vk_code),
            RawInputEvent::MouseMove { dx, dy } => self.mouse_move(dx, dy),
            RawInputEvent::MouseButtonDown { button } => self.button_down(button),
            RawInputEvent::MouseButtonUp { button } => self.button_up(button),
            RawInputEvent::MouseWheel { delta } => self.wheel(delta),
        }
    }

    // ── Keyboard ──────────────────────────────────────────────────────────────

    fn exit_chord_held(&self) -> bool {
        let modifiers = self.encoder.modifiers();
        modifiers.ctrl() && modifiers.alt()
    }

    fn key_down(&mut self, vk_code: u8) -> Result<EventOutcome, SessionError> {
        if vk_code == vk::KEY_E && self.exit_chord_held() {
            debug!("exit chord pressed");
            return Ok(EventOutcome::Swallowed);
        }
        match KeyMapper::classify_windows_vk(vk_code) {
            KeyAction::Modifier(modifier) => self.encoder.press_modifier(modifier)?,
            KeyAction::Key(usage) => self.encoder.key_down(usage)?,
            KeyAction::Unmapped => {
                debug!("no HID usage for VK 0x{vk_code:02X}; key down dropped");
                return Ok(EventOutcome::Ignored);
            }
        }
        Ok(EventOutcome::Forwarded)
    }

    fn key_up(&mut self, vk_code: u8) -> Result<EventOutcome, SessionError> {
        if vk_code == vk::KEY_E && self.exit_chord_held() {
            self.exit()?;
            return Ok(EventOutcome::Exited);
        }
        match KeyMapper::classify_windows_vk(vk_code) {
            KeyAction::Modifier(modifier) => self.encoder.release_modifier(modifier)?,
            KeyAction::Key(_) => self.encoder.key_up()?,
            KeyAction::Unmapped => {
                debug!("no HID usage for VK 0x{vk_code:02X}; key up dropped");
                return Ok(EventOutcome::Ignored);
            }
        }
        Ok(EventOutcome::Forwarded)
    }

    fn media(&mut self, key: MediaKey) -> Result<EventOutcome, SessionError> {
        debug!(%key, "media key");
        self.encoder.media_key_press(key)?;
        Ok(EventOutcome::Forwarded)
    }

    // ── Mouse ─────────────────────────────────────────────────────────────────

    fn mouse_move(&mut self, dx: i32, dy: i32) -> Result<EventOutcome, SessionError> {
        let x = clamp_pending(self.pending_dx.saturating_add(dx));
        let y = clamp_pending(self.pending_dy.saturating_add(dy));
        match self.encoder.dispatch_mouse_move_rel(x, y)? {
            MoveDispatch::Accepted => {
                self.pending_dx = x - report_step(x);
                self.pending_dy = y - report_step(y);
                Ok(EventOutcome::Forwarded)
            }
            MoveDispatch::Busy => {
                self.pending_dx = x;
                self.pending_dy = y;
                Ok(EventOutcome::Suppressed)
            }
        }
    }

    fn button_down(&mut self, button: MouseButton) -> Result<EventOutcome, SessionError> {
        if button == MouseButton::X2 {
            return Ok(EventOutcome::Swallowed);
        }
        self.flush_pending_motion()?;
        self.encoder.mouse_button_down(button)?;
        Ok(EventOutcome::Forwarded)
    }

    fn button_up(&mut self, button: MouseButton) -> Result<EventOutcome, SessionError> {
        if button == MouseButton::X2 {
            // Exit sends the button release itself.
            self.exit()?;
            return Ok(EventOutcome::Exited);
        }
        self.flush_pending_motion()?;
        self.encoder.mouse_button_up_all()?;
        Ok(EventOutcome::Forwarded)
    }

    fn wheel(&mut self, delta: i16) -> Result<EventOutcome, SessionError> {
        let step = match delta.signum() {
            0 => return Ok(EventOutcome::Ignored),
            s => s as i8,
        };
        self.encoder.mouse_scroll(step)?;
        Ok(EventOutcome::Forwarded)
    }

    // ── Internals ─────────────────────────────────────────────────────────────

    /// Writes held-back motion synchronously, one report per ±127 step.
    fn flush_pending_motion(&mut self) -> Result<(), SessionError> {
        while self.pending_dx != 0 || self.pending_dy != 0 {
            let x = report_step(self.pending_dx);
            let y = report_step(self.pending_dy);
            // Consume before writing so a failing link cannot loop forever.
            self.pending_dx -= x;
            self.pending_dy -= y;
            self.encoder.mouse_move_rel(x, y)?;
        }
        Ok(())
    }

    fn release_everything(&mut self) -> Result<(), SessionError> {
        self.encoder.wait_for_moves();
        let motion = self.flush_pending_motion();
        self.pending_dx = 0;
        self.pending_dy = 0;
        // Attempt both releases even if an earlier write fails.
        let keyboard = self.encoder.release_all();
        let mouse = self.encoder.mouse_button_up_all();
        motion?;
        keyboard?;
        mouse?;
        Ok(())
    }

    fn drain_move_failures(&mut self) {
        for e in self.encoder.take_move_failures() {
            self.move_failures += 1;
            warn!(total = self.move_failures, "mouse move lost: {e}");
        }
    }
}

fn clamp_pending(value: i32) -> i32 {
    value.clamp(-MAX_PENDING_MOTION, MAX_PENDING_MOTION)
}

/// The part of `value` a single mouse report can carry.
fn report_step(value: i32) -> i32 {
    value.clamp(i8::MIN as i32, i8::MAX as i32)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    use ch9329_core::protocol::frame::{MEDIA_RELEASE_FRAME, MOUSE_RELEASE_FRAME};
    use ch9329_core::transport::{TransportError, TransportSink};
    use ch9329_core::RecordingSink;

    use super::*;

    /// Records frames after a fixed write latency, keeping dispatched moves
    /// in flight long enough for later moves to be held back.
    struct SlowSink {
        inner: RecordingSink,
        latency: Duration,
    }

    impl TransportSink for SlowSink {
        fn write(&self, frame: &[u8]) -> Result<(), TransportError> {
            thread::sleep(self.latency);
            self.inner.write(frame)
        }
    }

    fn move_deltas(frame: &[u8]) -> (i8, i8) {
        (frame[7] as i8, frame[8] as i8)
    }

    const VK_A: u8 = 0x41;

    fn active_session() -> (Arc<RecordingSink>, RemoteSession) {
        let sink = Arc::new(RecordingSink::new());
        let mut session = RemoteSession::new(HidEncoder::new(sink.clone()));
        session.enter().unwrap();
        sink.clear();
        (sink, session)
    }

    fn keyboard_bytes(frame: &[u8]) -> (u8, u8) {
        (frame[5], frame[7])
    }

    #[test]
    fn test_inactive_session_ignores_input() {
        // Arrange
        let sink = Arc::new(RecordingSink::new());
        let mut session = RemoteSession::new(HidEncoder::new(sink.clone()));

        // Act
        let outcome = session.handle_event(RawInputEvent::KeyDown { vk_code: VK_A }).unwrap();

        // Assert
        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_enter_sends_clean_keyboard_report() {
        let sink = Arc::new(RecordingSink::new());
        let mut session = RemoteSession::new(HidEncoder::new(sink.clone()));

        let outcome = session.handle_event(RawInputEvent::SessionEnter).unwrap();

        assert_eq!(outcome, EventOutcome::Entered);
        assert!(session.is_active());
        assert_eq!(sink.len(), 1);
        assert_eq!(keyboard_bytes(&sink.frames()[0]), (0, 0));
    }

    #[test]
    fn test_shift_a_is_translated_to_hid() {
        // Arrange
        let (sink, mut session) = active_session();

        // Act
        for event in [
            RawInputEvent::KeyDown { vk_code: vk::LSHIFT },
            RawInputEvent::KeyDown { vk_code: VK_A },
            RawInputEvent::KeyUp { vk_code: VK_A },
            RawInputEvent::KeyUp { vk_code: vk::LSHIFT },
        ] {
            assert_eq!(session.handle_event(event).unwrap(), EventOutcome::Forwarded);
        }

        // Assert
        let reports: Vec<_> = sink.frames().iter().map(|f| keyboard_bytes(f)).collect();
        assert_eq!(reports, vec![(0x02, 0x00), (0x02, 0x04), (0x02, 0x00), (0x00, 0x00)]);
    }

    #[test]
    fn test_unmapped_key_is_ignored() {
        let (sink, mut session) = active_session();

        let outcome = session.handle_event(RawInputEvent::KeyDown { vk_code: 0x07 }).unwrap();

        assert_eq!(outcome, EventOutcome::Ignored);
        assert!(sink.is_empty());
    }

    #[test]
    fn test_ctrl_alt_e_swallows_down_and_exits_on_up() {
        // Arrange
        let (sink, mut session) = active_session();
        session.handle_event(RawInputEvent::KeyDown { vk_code: vk::RCONTROL }).unwrap();
        session.handle_event(RawInputEvent::KeyDown { vk_code: vk::LMENU }).unwrap();
        sink.clear();

        // Act
        let down = session.handle_event(RawInputEvent::KeyDown { vk_code: vk::KEY_E }).unwrap();
        let up = session.handle_event(RawInputEvent::KeyUp { vk_code: vk::KEY_E }).unwrap();

        // Assert
        assert_eq!(down, EventOutcome::Swallowed);
        assert_eq!(up, EventOutcome::Exited);
        assert!(!session.is_active());
        let frames = sink.frames();
        assert_eq!(frames.len(), 2, "only the exit releases are sent");
        assert_eq!(keyboard_bytes(&frames[0]), (0, 0));
        assert_eq!(frames[1], MOUSE_RELEASE_FRAME.to_vec());
    }

    #[test]
    fn test_e_without_chord_is_typed() {
        let (sink, mut session) = active_session();
        session.handle_event(RawInputEvent::KeyDown { vk_code: vk::LCONTROL }).unwrap();
        sink.clear();

        let outcome = session.handle_event(RawInputEvent::KeyDown { vk_code: vk::KEY_E }).unwrap();

        assert_eq!(outcome, EventOutcome::Forwarded);
        assert_eq!(keyboard_bytes(&sink.frames()[0]), (0x01, 0x08));
    }

    #[test]
    fn test_x2_down_ignored_and_up_exits() {
        // Arrange
        let (sink, mut session) = active_session();

        // Act
        let down = session
            .handle_event(RawInputEvent::MouseButtonDown { button: MouseButton::X2 })
            .unwrap();
        let up = session
            .handle_event(RawInputEvent::MouseButtonUp { button: MouseButton::X2 })
            .unwrap();

        // Assert
        assert_eq!(down, EventOutcome::Swallowed);
        assert_eq!(up, EventOutcome::Exited);
        assert!(!session.is_active());
        let frames = sink.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[1], MOUSE_RELEASE_FRAME.to_vec());
    }

    #[test]
    fn test_any_button_up_releases_all() {
        let (sink, mut session) = active_session();
        session
            .handle_event(RawInputEvent::MouseButtonDown { button: MouseButton::Left })
            .unwrap();
        session
            .handle_event(RawInputEvent::MouseButtonDown { button: MouseButton::Right })
            .unwrap();

        session
            .handle_event(RawInputEvent::MouseButtonUp { button: MouseButton::Left })
            .unwrap();

        let frames = sink.frames();
        assert_eq!(frames[1][6], 0x03);
        assert_eq!(frames[2], MOUSE_RELEASE_FRAME.to_vec());
        assert_eq!(session.encoder().button_mask(), 0);
    }

    #[test]
    fn test_wheel_sends_unit_step_by_sign() {
        // Arrange
        let (sink, mut session) = active_session();

        // Act
        let up = session.handle_event(RawInputEvent::MouseWheel { delta: 240 }).unwrap();
        let down = session.handle_event(RawInputEvent::MouseWheel { delta: -120 }).unwrap();
        let none = session.handle_event(RawInputEvent::MouseWheel { delta: 0 }).unwrap();

        // Assert
        assert_eq!((up, down, none), (EventOutcome::Forwarded, EventOutcome::Forwarded, EventOutcome::Ignored));
        let frames = sink.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0][9], 0x01);
        assert_eq!(frames[1][9], 0xFF);
    }

    #[test]
    fn test_mouse_move_is_dispatched() {
        let (sink, mut session) = active_session();

        let outcome = session.handle_event(RawInputEvent::MouseMove { dx: 10, dy: -4 }).unwrap();
        session.encoder().wait_for_moves();

        assert_eq!(outcome, EventOutcome::Forwarded);
        let frames = sink.frames();
        assert_eq!(frames.len(), 1);
        assert_eq!((frames[0][7], frames[0][8]), (10, 0xFC));
    }

    #[test]
    fn test_held_back_moves_are_written_before_exit() {
        // Arrange
        let sink = Arc::new(SlowSink {
            inner: RecordingSink::new(),
            latency: Duration::from_millis(50),
        });
        let mut session = RemoteSession::new(HidEncoder::new(sink.clone()));
        session.enter().unwrap();
        sink.inner.clear();

        // Act
        let first = session.handle_event(RawInputEvent::MouseMove { dx: 5, dy: 0 }).unwrap();
        let second = session.handle_event(RawInputEvent::MouseMove { dx: 3, dy: 0 }).unwrap();
        let third = session.handle_event(RawInputEvent::MouseMove { dx: 4, dy: 1 }).unwrap();
        session.handle_event(RawInputEvent::SessionExit).unwrap();

        // Assert
        assert_eq!(first, EventOutcome::Forwarded);
        assert_eq!((second, third), (EventOutcome::Suppressed, EventOutcome::Suppressed));
        let frames = sink.inner.frames();
        assert_eq!(frames.len(), 4);
        assert_eq!(move_deltas(&frames[0]), (5, 0));
        assert_eq!(move_deltas(&frames[1]), (7, 1));
        assert_eq!(keyboard_bytes(&frames[2]), (0, 0));
        assert_eq!(frames[3], MOUSE_RELEASE_FRAME.to_vec());
    }

    #[test]
    fn test_move_beyond_report_range_is_carried_into_button_press() {
        // Arrange
        let (sink, mut session) = active_session();

        // Act
        session.handle_event(RawInputEvent::MouseMove { dx: 300, dy: -130 }).unwrap();
        session
            .handle_event(RawInputEvent::MouseButtonDown { button: MouseButton::Left })
            .unwrap();

        // Assert
        let frames = sink.frames();
        assert_eq!(frames.len(), 4);
        assert_eq!(move_deltas(&frames[0]), (127, -128));
        assert_eq!(move_deltas(&frames[1]), (127, -2));
        assert_eq!(move_deltas(&frames[2]), (46, 0));
        assert_eq!(frames[3][6], 0x01, "button press comes after the motion");
    }

    #[test]
    fn test_pending_motion_is_bounded() {
        let (sink, mut session) = active_session();

        session.handle_event(RawInputEvent::MouseMove { dx: 100_000, dy: 0 }).unwrap();
        session.exit().unwrap();

        // One dispatched report, then (MAX_PENDING_MOTION - 127) / 127 flushed
        // reports, then the two releases.
        let flushed = ((MAX_PENDING_MOTION - 127) / 127) as usize;
        assert_eq!(sink.frames().len(), 1 + flushed + 2);
    }

    #[test]
    fn test_media_and_tap_work_while_inactive() {
        // Arrange
        let sink = Arc::new(RecordingSink::new());
        let mut session = RemoteSession::new(HidEncoder::new(sink.clone()));

        // Act
        let media = session.handle_event(RawInputEvent::MediaKey { key: MediaKey::Mute }).unwrap();
        let tap = session.handle_event(RawInputEvent::TapKey { vk_code: vk::SCROLL }).unwrap();

        // Assert
        assert_eq!(media, EventOutcome::Forwarded);
        assert_eq!(tap, EventOutcome::Forwarded);
        let frames = sink.frames();
        assert_eq!(frames.len(), 4);
        assert_eq!(frames[1], MEDIA_RELEASE_FRAME.to_vec());
        assert_eq!(keyboard_bytes(&frames[2]), (0x00, 0x47));
    }

    #[test]
    fn test_keep_awake_tap_rejects_unmapped_key() {
        let sink = Arc::new(RecordingSink::new());
        let mut session = RemoteSession::new(HidEncoder::new(sink.clone()));

        let result = session.keep_awake_tap(0x01);

        assert!(matches!(result, Err(SessionError::UnmappedKey(0x01))));
        assert!(sink.is_empty());
    }

    #[test]
    fn test_transport_failure_is_returned_and_session_stays_active() {
        // Arrange
        let (sink, mut session) = active_session();
        sink.set_failing(true);

        // Act
        let result = session.handle_event(RawInputEvent::KeyDown { vk_code: VK_A });

        // Assert
        assert!(matches!(result, Err(SessionError::Encode(EncodeError::Transport(_)))));
        assert!(session.is_active());
    }

    #[test]
    fn test_failed_dispatched_move_is_counted() {
        let (sink, mut session) = active_session();
        sink.set_failing(true);

        session.handle_event(RawInputEvent::MouseMove { dx: 1, dy: 1 }).unwrap();
        session.encoder().wait_for_moves();
        sink.set_failing(false);
        session.handle_event(RawInputEvent::MouseWheel { delta: 1 }).unwrap();

        assert_eq!(session.move_failures(), 1);
    }

    #[test]
    fn test_shutdown_releases_even_when_inactive() {
        let sink = Arc::new(RecordingSink::new());
        let mut session = RemoteSession::new(HidEncoder::new(sink.clone()));

        session.shutdown().unwrap();

        let frames = sink.frames();
        assert_eq!(frames.len(), 2);
        assert_eq!(keyboard_bytes(&frames[0]), (0, 0));
        assert_eq!(frames[1], MOUSE_RELEASE_FRAME.to_vec());
    }
}
