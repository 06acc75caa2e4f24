//! Global F8 (pause/resume) and F9 (stop) hotkeys via rdev.
//!
//! The listener needs OS input permissions (accessibility on macOS, an input
//! group or root on some Linux setups); when it cannot start, stdin commands
//! keep working.

use clickmatch::ControlState;
use rdev::{listen, EventType, Key};
use std::io;
use std::sync::Arc;
use std::thread;

pub const PAUSE_KEY: Key = Key::F8;
pub const STOP_KEY: Key = Key::F9;

/// Applies one input event to the control flags.
fn handle(state: &ControlState, event: &EventType) {
    match event {
        EventType::KeyPress(key) if *key == PAUSE_KEY => {
            state.request_pause_toggle();
        }
        EventType::KeyPress(key) if *key == STOP_KEY => state.request_stop(),
        _ => {}
    }
}

/// Starts the global key listener on its own thread.
pub fn spawn_listener(state: Arc<ControlState>) -> io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("clickmatch-hotkeys".into())
        .spawn(move || {
            if let Err(err) = listen(move |event| handle(&state, &event.event_type)) {
                tracing::warn!(error = ?err, "hotkey listener unavailable");
            }
        })
}

#[cfg(test)]
mod tests {
    use super::handle;
    use clickmatch::{ControlState, LoopState};
    use rdev::{EventType, Key};

    #[test]
    fn f8_toggles_pause_and_f9_stops() {
        let state = ControlState::default();
        handle(&state, &EventType::KeyPress(Key::F8));
        assert_eq!(state.state(), LoopState::Paused);
        handle(&state, &EventType::KeyRelease(Key::F8));
        assert_eq!(state.state(), LoopState::Paused);
        handle(&state, &EventType::KeyPress(Key::F8));
        assert_eq!(state.state(), LoopState::Running);

        handle(&state, &EventType::KeyPress(Key::KeyQ));
        assert_eq!(state.state(), LoopState::Running);
        handle(&state, &EventType::KeyPress(Key::F9));
        assert_eq!(state.state(), LoopState::Stopped);
    }
}
