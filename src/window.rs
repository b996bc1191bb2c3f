#![cfg(feature = "window")]
//! Show the strip in an SDL2 window.
//!
//! [`WindowRenderer`] opens a resizable window when the viewer starts. Each frame is
//! copied into an RGB24 texture and stretched over the window. Resizing the window
//! reflows the strip, and a click (or closing the window) dismisses the viewer.
//!
//! SDL runs on a thread of its own that the renderer starts and stops, so the
//! renderer itself stays `Send`. SDL must own that thread's video subsystem, which
//! works on Linux and Windows but not macOS.
//!
//! ```rust,no_run
//! use neopixel_sim::led_strip::LedStrip;
//! use neopixel_sim::window::WindowRenderer;
//!
//! # fn main() -> neopixel_sim::Result<()> {
//! let strip = LedStrip::new(60);
//! let viewer = strip.begin(WindowRenderer::new("strip"))?;
//! strip.set_pixel_color_rgb(0, 255, 0, 0)?;
//! strip.show();
//! viewer.dismissal().wait();
//! viewer.join()
//! # }
//! ```

use core::fmt::Display;
use core::time::Duration;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use embedded_graphics::prelude::{OriginDimensions, Size};
use log::{debug, info};
use sdl2::event::{Event, WindowEvent};
use sdl2::pixels::PixelFormatEnum;
use sdl2::render::Texture;

use crate::viewer::{Canvas, Renderer, ViewerEvent};
use crate::{Error, Result};

/// How long the window thread waits for a frame before checking for input again.
const EVENT_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// [`Renderer`] that draws frames in an on-screen window.
#[derive(Debug)]
pub struct WindowRenderer {
    title: String,
    window: Option<WindowThread>,
}

#[derive(Debug)]
struct WindowThread {
    frames: Sender<Canvas>,
    stale_frames: Receiver<Canvas>,
    events: Receiver<ViewerEvent>,
    thread: JoinHandle<Result<()>>,
}

impl WindowRenderer {
    /// Render into a window titled `title`, opened when the viewer starts.
    #[must_use]
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            window: None,
        }
    }

    // Joins the window thread and returns how it ended.
    fn close(&mut self) -> Result<()> {
        let Some(WindowThread { frames, thread, .. }) = self.window.take() else {
            return Ok(());
        };
        drop(frames);
        thread.join().map_err(|_| Error::ViewerPanicked)?
    }
}

impl Renderer for WindowRenderer {
    fn start(&mut self, size: Size) -> Result<()> {
        // One frame in flight; the window always shows the newest.
        let (frames_tx, frames_rx) = channel::bounded(1);
        let (events_tx, events_rx) = channel::unbounded();
        let (ready_tx, ready_rx) = channel::bounded(1);
        let stale_frames = frames_rx.clone();
        let title = self.title.clone();

        let thread = std::thread::Builder::new()
            .name("neopixel-window".into())
            .spawn(move || run_window(&title, size, &frames_rx, &events_tx, &ready_tx))
            .map_err(Error::ViewerSpawn)?;

        self.window = Some(WindowThread {
            frames: frames_tx,
            stale_frames,
            events: events_rx,
            thread,
        });
        // The thread drops `ready_tx` without sending if SDL fails to start.
        match ready_rx.recv() {
            Ok(()) => Ok(()),
            Err(_) => self.close(),
        }
    }

    fn present(&mut self, canvas: &Canvas) -> Result<()> {
        if self
            .window
            .as_ref()
            .is_some_and(|window| window.thread.is_finished())
        {
            return self.close();
        }
        let Some(window) = &self.window else {
            return Ok(());
        };

        let mut frame = canvas.clone();
        while let Err(TrySendError::Full(rejected)) = window.frames.try_send(frame) {
            let _ = window.stale_frames.try_recv();
            frame = rejected;
        }
        Ok(())
    }

    fn poll_event(&mut self) -> Option<ViewerEvent> {
        self.window.as_ref()?.events.try_recv().ok()
    }

    fn finish(&mut self) -> Result<()> {
        self.close()
    }
}

fn run_window(
    title: &str,
    size: Size,
    frames: &Receiver<Canvas>,
    events: &Sender<ViewerEvent>,
    ready: &Sender<()>,
) -> Result<()> {
    let context = sdl2::init().map_err(window_error)?;
    let video = context.video().map_err(window_error)?;
    let window = video
        .window(title, size.width, size.height)
        .position_centered()
        .resizable()
        .build()
        .map_err(window_error)?;
    let mut screen = window.into_canvas().build().map_err(window_error)?;
    let creator = screen.texture_creator();
    let mut event_pump = context.event_pump().map_err(window_error)?;
    let _ = ready.send(());
    info!("window open: {}x{}", size.width, size.height);

    let mut texture: Option<(Size, Texture<'_>)> = None;
    loop {
        for event in event_pump.poll_iter() {
            if let Some(event) = viewer_event(&event) {
                debug!("window event: {event:?}");
                let _ = events.send(event);
            }
        }

        let canvas = match frames.recv_timeout(EVENT_POLL_INTERVAL) {
            Ok(canvas) => canvas,
            Err(RecvTimeoutError::Timeout) => continue,
            Err(RecvTimeoutError::Disconnected) => return Ok(()),
        };
        let frame_size = canvas.size();
        if frame_size.width == 0 || frame_size.height == 0 {
            continue;
        }
        if texture
            .as_ref()
            .is_none_or(|(texture_size, _)| *texture_size != frame_size)
        {
            let fresh = creator
                .create_texture_streaming(
                    PixelFormatEnum::RGB24,
                    frame_size.width,
                    frame_size.height,
                )
                .map_err(window_error)?;
            texture = Some((frame_size, fresh));
        }
        if let Some((_, texture)) = texture.as_mut() {
            texture
                .update(None, &canvas.to_rgb_bytes(), frame_size.width as usize * 3)
                .map_err(window_error)?;
            screen.copy(texture, None, None).map_err(window_error)?;
            screen.present();
        }
    }
}

/// Translate an SDL event into what the viewer cares about.
///
/// Closing the window or releasing any mouse button dismisses; a size change
/// resizes. Everything else is ignored.
#[must_use]
pub fn viewer_event(event: &Event) -> Option<ViewerEvent> {
    match *event {
        Event::Quit { .. } | Event::MouseButtonUp { .. } => Some(ViewerEvent::Dismissed),
        Event::Window {
            win_event: WindowEvent::SizeChanged(width, height),
            ..
        } => Some(ViewerEvent::Resized(Size::new(
            u32::try_from(width).unwrap_or(0),
            u32::try_from(height).unwrap_or(0),
        ))),
        _ => None,
    }
}

fn window_error(err: impl Display) -> Error {
    Error::Window(err.to_string())
}
