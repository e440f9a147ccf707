//! Terminal input pump for the workbench.
//!
//! Crossterm polling is blocking, so each read runs on a blocking task and
//! the poll timeout doubles as the tick cadence. Mouse events are first-class
//! here because the canvas is pointer-driven.

use crossterm::event::{self, Event as CrosstermEvent, KeyEvent, MouseEvent};
use std::time::Duration;

#[derive(Debug)]
pub enum Event {
    Key(KeyEvent),
    /// Press, drag, or release anywhere in the terminal.
    Mouse(MouseEvent),
    /// Poll timeout elapsed with no input. Drives toasts and async drains.
    Tick,
    Resize(u16, u16),
}

pub struct EventPump {
    poll_timeout: Duration,
}

impl EventPump {
    pub fn new(poll_timeout: Duration) -> Self {
        Self { poll_timeout }
    }

    /// Wait for the next terminal event, yielding `Tick` on timeout.
    pub async fn next(&self) -> Event {
        let timeout = self.poll_timeout;
        let read = tokio::task::spawn_blocking(move || {
            if !event::poll(timeout).unwrap_or(false) {
                return Event::Tick;
            }
            match event::read() {
                Ok(CrosstermEvent::Key(key)) => Event::Key(key),
                Ok(CrosstermEvent::Mouse(mouse)) => Event::Mouse(mouse),
                Ok(CrosstermEvent::Resize(width, height)) => Event::Resize(width, height),
                // Focus/paste events carry nothing the app reacts to.
                _ => Event::Tick,
            }
        });
        read.await.unwrap_or(Event::Tick)
    }
}
