//! A renderer that keeps frames in memory.

use core::time::Duration;
use std::time::Instant;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use embedded_graphics::prelude::Size;

use super::{Canvas, Renderer, ViewerEvent};
use crate::Result;

/// Headless [`Renderer`] that forwards every presented frame to a
/// [`RecordingHandle`].
///
/// Useful for tests and for applications that inspect frames themselves. The
/// handle can also inject [`ViewerEvent`]s as if a user resized or closed a window.
///
/// At most [`FRAME_CAPACITY`](Self::FRAME_CAPACITY) frames wait in the handle; when
/// it is full the oldest is dropped, so an undrained handle never grows.
///
/// ```rust
/// use std::time::Duration;
/// use neopixel_sim::led_strip::LedStrip;
/// use neopixel_sim::viewer::RecordingRenderer;
///
/// # fn main() -> neopixel_sim::Result<()> {
/// let strip = LedStrip::new(3);
/// let (renderer, frames) = RecordingRenderer::new();
/// let viewer = strip.begin(renderer)?;
///
/// let first = frames.next_frame(Duration::from_secs(5)).expect("initial frame");
/// assert_eq!((first.width(), first.height()), (400, 200));
/// viewer.join()
/// # }
/// ```
#[derive(Debug)]
pub struct RecordingRenderer {
    frames: Sender<Canvas>,
    overflow: Receiver<Canvas>,
    events: Receiver<ViewerEvent>,
    started: Sender<Size>,
}

/// The application side of a [`RecordingRenderer`].
#[derive(Debug)]
pub struct RecordingHandle {
    frames: Receiver<Canvas>,
    events: Sender<ViewerEvent>,
    started: Receiver<Size>,
}

impl RecordingRenderer {
    /// Frames held for the handle before the oldest is dropped.
    pub const FRAME_CAPACITY: usize = 8;

    /// Create a connected renderer and handle.
    #[must_use]
    pub fn new() -> (Self, RecordingHandle) {
        let (frames_tx, frames_rx) = channel::bounded(Self::FRAME_CAPACITY);
        let (events_tx, events_rx) = channel::unbounded();
        let (started_tx, started_rx) = channel::bounded(1);
        (
            Self {
                frames: frames_tx,
                overflow: frames_rx.clone(),
                events: events_rx,
                started: started_tx,
            },
            RecordingHandle {
                frames: frames_rx,
                events: events_tx,
                started: started_rx,
            },
        )
    }
}

impl Renderer for RecordingRenderer {
    fn start(&mut self, size: Size) -> Result<()> {
        // Nobody listening is fine.
        let _ = self.started.try_send(size);
        Ok(())
    }

    fn present(&mut self, canvas: &Canvas) -> Result<()> {
        let mut frame = canvas.clone();
        // Drop the oldest queued frame until the newest fits.
        while let Err(TrySendError::Full(rejected)) = self.frames.try_send(frame) {
            let _ = self.overflow.try_recv();
            frame = rejected;
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<ViewerEvent> {
        self.events.try_recv().ok()
    }
}

impl RecordingHandle {
    /// Wait up to `timeout` for the viewer to start, returning its initial size.
    #[must_use]
    pub fn wait_started(&self, timeout: Duration) -> Option<Size> {
        self.started.recv_timeout(timeout).ok()
    }

    /// Wait up to `timeout` for the next presented frame.
    #[must_use]
    pub fn next_frame(&self, timeout: Duration) -> Option<Canvas> {
        self.frames.recv_timeout(timeout).ok()
    }

    /// Wait up to `timeout` for a frame that satisfies `predicate`, skipping others.
    #[must_use]
    pub fn frame_matching(
        &self,
        timeout: Duration,
        mut predicate: impl FnMut(&Canvas) -> bool,
    ) -> Option<Canvas> {
        let deadline = Instant::now() + timeout;
        loop {
            match self.frames.recv_deadline(deadline) {
                Ok(canvas) if predicate(&canvas) => return Some(canvas),
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => return None,
            }
        }
    }

    /// All frames presented so far that have not been received yet.
    #[must_use]
    pub fn drain(&self) -> Vec<Canvas> {
        self.frames.try_iter().collect()
    }

    /// Report a user event to the viewer; it is seen on the next tick.
    pub fn send_event(&self, event: ViewerEvent) {
        let _ = self.events.send(event);
    }

    /// Report that the user resized the view.
    pub fn resize(&self, width: u32, height: u32) {
        self.send_event(ViewerEvent::Resized(Size::new(width, height)));
    }

    /// Report that the user closed the view.
    pub fn dismiss(&self) {
        self.send_event(ViewerEvent::Dismissed);
    }
}
