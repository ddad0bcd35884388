use std::time::Duration;

use crate::sim::EventSink;

/// Presentation-side consumer driven by the window loop.
///
/// Physics events arrive through [`EventSink`] once per fixed step; the remaining hooks run once
/// per presented frame.
pub trait SessionObserver: EventSink {
    fn on_frame(&mut self, _frame_dt: Duration, _input_activity: bool) {}

    fn toggle_mute(&mut self) {}

    /// Extra text for the window title.
    fn status_line(&self) -> Option<String> {
        None
    }

    fn shutdown(&mut self) {}
}

impl SessionObserver for () {}
