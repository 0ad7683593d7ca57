//! Integration tests for the host pipeline.
//!
//! These tests exercise the application layer of ch9329-host end-to-end:
//! input source → event pump → `RemoteSession` → `HidEncoder` → sink.

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use ch9329_core::protocol::frame::{MEDIA_RELEASE_FRAME, MOUSE_RELEASE_FRAME};
use ch9329_core::transport::{TransportError, TransportSink};
use ch9329_core::{checksum, HidEncoder, MouseButton, RecordingSink};
use ch9329_host::application::event_pump::pump_events;
use ch9329_host::application::keep_awake::{run_keep_awake, KeepAwakeMode, KeepAwakeSettings};
use ch9329_host::application::session::RemoteSession;
use ch9329_host::infrastructure::input_capture::mock::MockInputSource;
use ch9329_host::infrastructure::input_capture::script::{parse_script, ScriptInputSource};
use ch9329_host::infrastructure::input_capture::{InputSource, RawInputEvent};
use mockall::{mock, Sequence};
use parking_lot::Mutex;

mock! {
    pub Sink {}
    impl TransportSink for Sink {
        fn write(&self, frame: &[u8]) -> Result<(), TransportError>;
    }
}

fn keyboard_frame(modifiers: u8, key: u8) -> Vec<u8> {
    let mut frame = vec![0x57, 0xAB, 0x00, 0x02, 0x08, modifiers, 0x00, key, 0, 0, 0, 0, 0];
    frame.push(checksum(&frame));
    frame
}

fn shared_session(sink: Arc<dyn TransportSink>) -> Mutex<RemoteSession> {
    Mutex::new(RemoteSession::new(HidEncoder::new(sink)))
}

#[test]
fn test_script_replay_produces_expected_frames() {
    // Arrange
    let sink = Arc::new(RecordingSink::new());
    let session = shared_session(sink.clone());
    let script = "\
enter
key-down 0xA0   # left shift
key-down 0x41
key-up 0x41
key-up 0xA0
button-down left
button-up left
media mute
exit
";
    let source = ScriptInputSource::from_steps(parse_script(script).unwrap());

    // Act
    let rx = source.start().unwrap();
    let stats = pump_events(&rx, &session, &AtomicBool::new(true));

    // Assert
    assert_eq!(stats.errors, 0);
    assert!(!session.lock().is_active());
    let frames = sink.frames();
    let mut expected = vec![
        keyboard_frame(0x00, 0x00),
        keyboard_frame(0x02, 0x00),
        keyboard_frame(0x02, 0x04),
        keyboard_frame(0x02, 0x00),
        keyboard_frame(0x00, 0x00),
    ];
    let mut left_down = vec![0x57, 0xAB, 0x00, 0x05, 0x05, 0x01, 0x01, 0x00, 0x00, 0x00];
    left_down.push(checksum(&left_down));
    expected.push(left_down);
    expected.push(MOUSE_RELEASE_FRAME.to_vec());
    expected.push(vec![0x57, 0xAB, 0x00, 0x03, 0x04, 0x02, 0x04, 0x00, 0x00, 0x0F]);
    expected.push(MEDIA_RELEASE_FRAME.to_vec());
    expected.push(keyboard_frame(0x00, 0x00));
    expected.push(MOUSE_RELEASE_FRAME.to_vec());
    assert_eq!(frames, expected);
}

#[test]
fn test_every_frame_checksum_is_valid() {
    let sink = Arc::new(RecordingSink::new());
    let session = shared_session(sink.clone());
    let source = MockInputSource::new();
    let rx = source.start().unwrap();
    source.inject_all([
        RawInputEvent::SessionEnter,
        RawInputEvent::KeyDown { vk_code: 0xA3 },
        RawInputEvent::KeyDown { vk_code: 0x7B },
        RawInputEvent::KeyUp { vk_code: 0x7B },
        RawInputEvent::KeyUp { vk_code: 0xA3 },
        RawInputEvent::MouseButtonDown { button: MouseButton::Middle },
        RawInputEvent::MouseWheel { delta: -120 },
        RawInputEvent::MouseButtonUp { button: MouseButton::Middle },
        RawInputEvent::TapKey { vk_code: 0x91 },
        RawInputEvent::SessionExit,
    ]);
    source.stop();

    pump_events(&rx, &session, &AtomicBool::new(true));

    let frames = sink.frames();
    assert!(!frames.is_empty());
    for frame in frames {
        let (body, sum) = frame.split_at(frame.len() - 1);
        assert_eq!(&body[..3], &[0x57, 0xAB, 0x00]);
        assert_eq!(sum[0], checksum(body), "bad checksum in {frame:02X?}");
    }
}

#[test]
fn test_exit_chord_sends_releases_in_order() {
    // Arrange
    let mut sink = MockSink::new();
    let mut seq = Sequence::new();
    for expected in [
        keyboard_frame(0x00, 0x00), // enter
        keyboard_frame(0x01, 0x00), // left ctrl
        keyboard_frame(0x05, 0x00), // left alt
        keyboard_frame(0x00, 0x00), // exit: keyboard release
    ] {
        sink.expect_write()
            .withf(move |frame: &[u8]| frame == expected.as_slice())
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Ok(()));
    }
    sink.expect_write()
        .withf(|frame: &[u8]| frame == &MOUSE_RELEASE_FRAME[..])
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    let session = shared_session(Arc::new(sink));
    let source = MockInputSource::new();
    let rx = source.start().unwrap();

    // Act
    source.inject_all([
        RawInputEvent::SessionEnter,
        RawInputEvent::KeyDown { vk_code: 0xA2 },
        RawInputEvent::KeyDown { vk_code: 0xA4 },
        RawInputEvent::KeyDown { vk_code: 0x45 },
        RawInputEvent::KeyUp { vk_code: 0x45 },
        // Session is now inactive: these produce nothing.
        RawInputEvent::KeyUp { vk_code: 0xA4 },
        RawInputEvent::KeyUp { vk_code: 0xA2 },
    ]);
    source.stop();
    let stats = pump_events(&rx, &session, &AtomicBool::new(true));

    // Assert
    assert_eq!(stats.events, 7);
    assert!(!session.lock().is_active());
}

#[test]
fn test_exit_still_releases_mouse_when_keyboard_release_fails() {
    // Arrange
    let mut sink = MockSink::new();
    let mut seq = Sequence::new();
    sink.expect_write()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    sink.expect_write()
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Err(TransportError::Closed));
    sink.expect_write()
        .withf(|frame: &[u8]| frame == &MOUSE_RELEASE_FRAME[..])
        .times(1)
        .in_sequence(&mut seq)
        .returning(|_| Ok(()));
    let mut session = RemoteSession::new(HidEncoder::new(Arc::new(sink)));
    session.enter().unwrap();

    // Act
    let result = session.exit();

    // Assert
    assert!(result.is_err());
    assert!(!session.is_active());
}

#[test]
fn test_moves_are_written_in_order_with_later_frames() {
    let sink = Arc::new(RecordingSink::new());
    let session = shared_session(sink.clone());
    let source = MockInputSource::new();
    let rx = source.start().unwrap();
    source.inject_all([
        RawInputEvent::SessionEnter,
        RawInputEvent::MouseMove { dx: 5, dy: 5 },
        RawInputEvent::MouseButtonDown { button: MouseButton::Right },
        RawInputEvent::SessionExit,
    ]);
    source.stop();

    pump_events(&rx, &session, &AtomicBool::new(true));

    let frames = sink.frames();
    assert_eq!(frames.len(), 5);
    assert_eq!((frames[1][7], frames[1][8]), (5, 5), "move precedes the button");
    assert_eq!(frames[2][6], 0x02);
}

#[tokio::test]
async fn test_keep_awake_taps_scroll_lock_while_inactive() {
    // Arrange
    let sink = Arc::new(RecordingSink::new());
    let session = Arc::new(shared_session(sink.clone()));
    let settings = KeepAwakeSettings {
        period: Duration::from_millis(20),
        jitter: Duration::ZERO..Duration::ZERO,
        ..KeepAwakeSettings::new(KeepAwakeMode::WhileInactive)
    };
    let (tx, rx) = tokio::sync::watch::channel(false);

    // Act
    let task = tokio::spawn(run_keep_awake(Arc::clone(&session), settings, rx));
    tokio::time::sleep(Duration::from_millis(80)).await;
    tx.send(true).unwrap();
    task.await.unwrap();

    // Assert: only Scroll Lock taps, each a press followed by a release.
    let frames = sink.frames();
    assert!(frames.len() >= 2);
    assert_eq!(frames.len() % 2, 0);
    for pair in frames.chunks(2) {
        assert_eq!(pair[0], keyboard_frame(0x00, 0x47));
        assert_eq!(pair[1], keyboard_frame(0x00, 0x00));
    }
}

#[test]
fn test_keep_awake_off_completes_immediately() {
    let sink = Arc::new(RecordingSink::new());
    let session = Arc::new(shared_session(sink.clone()));
    let (_tx, rx) = tokio::sync::watch::channel(false);

    tokio_test::block_on(run_keep_awake(session, KeepAwakeSettings::default(), rx));

    assert!(sink.is_empty());
}
