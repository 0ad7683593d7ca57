//! Script-driven input source.
//!
//! Replays a line-oriented event script, one command per line:
//!
//! ```text
//! # comments and blank lines are skipped
//! enter
//! key-down 0xA0        # Windows VK code, decimal or 0x-hex
//! key-down 0x41
//! key-up 0x41
//! key-up 0xA0
//! move 10 -5
//! button-down left     # left | right | middle | x1 | x2
//! button-up left
//! wheel -120
//! media mute
//! tap 0x91
//! sleep 250            # milliseconds
//! exit
//! ```
//!
//! A script read from a file is parsed completely before replay starts, so
//! a typo fails fast with its line number.  A script read from stdin is
//! parsed as it streams; malformed lines are logged and skipped.

use std::io::{self, BufRead};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Sender};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use ch9329_core::{MediaKey, MouseButton};
use parking_lot::Mutex;
use thiserror::Error;
use tracing::{debug, warn};

use super::{CaptureError, InputSource, RawInputEvent};

/// Longest uninterrupted sleep; the replay thread rechecks the stop flag in
/// between.
const SLEEP_SLICE: Duration = Duration::from_millis(50);

/// Parse error, tagged with the 1-based line number.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ScriptError {
    #[error("line {line}: unknown command `{command}`")]
    UnknownCommand { line: usize, command: String },

    #[error("line {line}: `{command}` needs {expected}")]
    MissingArgument {
        line: usize,
        command: &'static str,
        expected: &'static str,
    },

    #[error("line {line}: `{value}` is not a valid number")]
    InvalidNumber { line: usize, value: String },

    #[error("line {line}: {reason}")]
    InvalidArgument { line: usize, reason: String },
}

/// One parsed script line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptStep {
    Event(RawInputEvent),
    Sleep(Duration),
}

/// Parses a whole script.
pub fn parse_script(text: &str) -> Result<Vec<ScriptStep>, ScriptError> {
    let mut steps = Vec::new();
    for (i, line) in text.lines().enumerate() {
        if let Some(step) = parse_line(i + 1, line)? {
            steps.push(step);
        }
    }
    Ok(steps)
}

/// Parses a single line.  Returns `Ok(None)` for blank and comment lines.
pub fn parse_line(line_no: usize, line: &str) -> Result<Option<ScriptStep>, ScriptError> {
    let line = match line.find('#') {
        Some(i) => &line[..i],
        None => line,
    };
    let mut words = line.split_whitespace();
    let Some(command) = words.next() else {
        return Ok(None);
    };
    let mut args = Args {
        line: line_no,
        words,
    };

    let step = match command {
        "key-down" => ScriptStep::Event(RawInputEvent::KeyDown {
            vk_code: args.number("key-down", "a VK code")?,
        }),
        "key-up" => ScriptStep::Event(RawInputEvent::KeyUp {
            vk_code: args.number("key-up", "a VK code")?,
        }),
        "tap" => ScriptStep::Event(RawInputEvent::TapKey {
            vk_code: args.number("tap", "a VK code")?,
        }),
        "move" => ScriptStep::Event(RawInputEvent::MouseMove {
            dx: args.number("move", "dx and dy")?,
            dy: args.number("move", "dx and dy")?,
        }),
        "button-down" => ScriptStep::Event(RawInputEvent::MouseButtonDown {
            button: args.button("button-down")?,
        }),
        "button-up" => ScriptStep::Event(RawInputEvent::MouseButtonUp {
            button: args.button("button-up")?,
        }),
        "wheel" => ScriptStep::Event(RawInputEvent::MouseWheel {
            delta: args.number("wheel", "a delta")?,
        }),
        "media" => {
            let name = args.word("media", "a media key name")?;
            let key = name
                .parse::<MediaKey>()
                .map_err(|e| ScriptError::InvalidArgument {
                    line: line_no,
                    reason: e.to_string(),
                })?;
            ScriptStep::Event(RawInputEvent::MediaKey { key })
        }
        "sleep" => ScriptStep::Sleep(Duration::from_millis(
            args.number("sleep", "a duration in milliseconds")?,
        )),
        "enter" => ScriptStep::Event(RawInputEvent::SessionEnter),
        "exit" => ScriptStep::Event(RawInputEvent::SessionExit),
        other => {
            return Err(ScriptError::UnknownCommand {
                line: line_no,
                command: other.to_string(),
            })
        }
    };

    if let Some(extra) = args.words.next() {
        return Err(ScriptError::InvalidArgument {
            line: line_no,
            reason: format!("unexpected argument `{extra}`"),
        });
    }
    Ok(Some(step))
}

struct Args<'a> {
    line: usize,
    words: std::str::SplitWhitespace<'a>,
}

impl<'a> Args<'a> {
    fn word(&mut self, command: &'static str, expected: &'static str) -> Result<&'a str, ScriptError> {
        self.words.next().ok_or(ScriptError::MissingArgument {
            line: self.line,
            command,
            expected,
        })
    }

    fn number<T>(&mut self, command: &'static str, expected: &'static str) -> Result<T, ScriptError>
    where
        T: TryFrom<i64>,
    {
        let word = self.word(command, expected)?;
        let invalid = || ScriptError::InvalidNumber {
            line: self.line,
            value: word.to_string(),
        };
        let (negative, digits) = match word.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, word),
        };
        let (radix, digits) = match digits
            .strip_prefix("0x")
            .or_else(|| digits.strip_prefix("0X"))
        {
            Some(hex) => (16, hex),
            None => (10, digits),
        };
        // `from_str_radix` accepts its own sign; only the one above is allowed.
        if digits.starts_with(['-', '+']) {
            return Err(invalid());
        }
        let magnitude = i64::from_str_radix(digits, radix).map_err(|_| invalid())?;
        let value = if negative {
            magnitude.checked_neg().ok_or_else(invalid)?
        } else {
            magnitude
        };
        T::try_from(value).map_err(|_| invalid())
    }

    fn button(&mut self, command: &'static str) -> Result<MouseButton, ScriptError> {
        let word = self.word(command, "a button name")?;
        word.parse::<MouseButton>()
            .map_err(|reason| ScriptError::InvalidArgument {
                line: self.line,
                reason,
            })
    }
}

enum ScriptInput {
    Parsed(Vec<ScriptStep>),
    Stdin,
}

/// [`InputSource`] that replays a script on a background thread.
pub struct ScriptInputSource {
    input: Mutex<Option<ScriptInput>>,
    stop: Arc<AtomicBool>,
}

impl ScriptInputSource {
    /// Reads and parses the script at `path`.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| CaptureError::Io {
            path: PathBuf::from(path),
            source,
        })?;
        let steps = parse_script(&text)?;
        debug!(path = %path.display(), steps = steps.len(), "input script loaded");
        Ok(Self::from_steps(steps))
    }

    /// Builds a source from already-parsed steps.
    pub fn from_steps(steps: Vec<ScriptStep>) -> Self {
        Self::with_input(ScriptInput::Parsed(steps))
    }

    /// Streams the script from standard input.
    pub fn stdin() -> Self {
        Self::with_input(ScriptInput::Stdin)
    }

    fn with_input(input: ScriptInput) -> Self {
        Self {
            input: Mutex::new(Some(input)),
            stop: Arc::new(AtomicBool::new(false)),
        }
    }
}

impl InputSource for ScriptInputSource {
    fn start(&self) -> Result<mpsc::Receiver<RawInputEvent>, CaptureError> {
        let input = self.input.lock().take().ok_or(CaptureError::AlreadyStarted)?;
        let (tx, rx) = mpsc::channel();
        let stop = Arc::clone(&self.stop);

        thread::Builder::new()
            .name("script-input".to_string())
            .spawn(move || match input {
                ScriptInput::Parsed(steps) => replay(steps, &tx, &stop),
                ScriptInput::Stdin => replay_stdin(&tx, &stop),
            })
            .map_err(CaptureError::Spawn)?;

        Ok(rx)
    }

    fn stop(&self) {
        self.stop.store(true, Ordering::Release);
    }
}

fn replay(steps: Vec<ScriptStep>, tx: &Sender<RawInputEvent>, stop: &AtomicBool) {
    for step in steps {
        if !run_step(step, tx, stop) {
            break;
        }
    }
    debug!("input script finished");
}

fn replay_stdin(tx: &Sender<RawInputEvent>, stop: &AtomicBool) {
    let stdin = io::stdin();
    for (i, line) in stdin.lock().lines().enumerate() {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("failed to read stdin: {e}");
                break;
            }
        };
        match parse_line(i + 1, &line) {
            Ok(Some(step)) => {
                if !run_step(step, tx, stop) {
                    break;
                }
            }
            Ok(None) => {}
            Err(e) => warn!("skipping script line: {e}"),
        }
    }
    debug!("stdin input closed");
}

/// Executes one step.  Returns `false` once replay should end.
fn run_step(step: ScriptStep, tx: &Sender<RawInputEvent>, stop: &AtomicBool) -> bool {
    if stop.load(Ordering::Acquire) {
        return false;
    }
    match step {
        ScriptStep::Event(event) => tx.send(event).is_ok(),
        ScriptStep::Sleep(duration) => sleep_unless_stopped(duration, stop),
    }
}

fn sleep_unless_stopped(duration: Duration, stop: &AtomicBool) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if stop.load(Ordering::Acquire) {
            return false;
        }
        let remaining = deadline.saturating_duration_since(Instant::now());
        if remaining.is_zero() {
            return true;
        }
        thread::sleep(remaining.min(SLEEP_SLICE));
    }
}
