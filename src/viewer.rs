//! On-screen presentation of a simulated strip.
//!
//! A [`Viewer`] runs on its own thread. It never touches the strip's raw buffer; it
//! only reads the snapshot that [`LedStrip::show`](crate::led_strip::LedStrip::show)
//! publishes, so it cannot observe a half-written frame.
//!
//! The viewer lays LEDs out in serpentine rows (see [`layout::StripLayout`]), draws
//! them into a [`Canvas`], and hands each finished canvas to a [`Renderer`]. The
//! renderer is the only part that knows about windows or files.
//!
//! # Redraws
//!
//! A fixed-rate ticker (60 Hz by default) wakes the viewer. On each tick it redraws
//! if `show` was called or the window was resized since the last tick. Requests
//! between ticks collapse into one redraw of the latest snapshot.
//!
//! # Dismissal
//!
//! When the user closes the view (the renderer reports [`ViewerEvent::Dismissed`],
//! or the application calls [`Viewer::dismiss`]), the viewer stops and fires its
//! [`Dismissal`] token. The token also fires if the renderer fails, with
//! [`CloseReason::Failed`], so a loop on [`Dismissal::is_closed`] never outlives its
//! viewer. The application decides what happens next. The old "closing the window
//! kills the program" behavior is available through [`DismissAction::ExitProcess`].
//!
//! # Example
//!
//! ```rust,no_run
//! use neopixel_sim::led_strip::LedStrip;
//! use neopixel_sim::viewer::{DismissAction, RecordingRenderer, ViewerConfig};
//!
//! # fn main() -> neopixel_sim::Result<()> {
//! let strip = LedStrip::new(30);
//! let (renderer, _frames) = RecordingRenderer::new();
//! let config = ViewerConfig::new()
//!     .with_size(640, 240)
//!     .with_jitter_seed(7)
//!     .with_dismiss_action(DismissAction::Notify);
//! let viewer = strip.begin_with_config(renderer, config)?;
//!
//! let dismissal = viewer.dismissal();
//! while !dismissal.is_closed() {
//!     // animate the strip ...
//!     strip.show();
//! #   break;
//! }
//! viewer.join()
//! # }
//! ```

use core::time::Duration;
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

use crossbeam::channel::{self, Receiver, Sender};
use embedded_graphics::prelude::{OriginDimensions, Size};
use log::{debug, error, info};
use parking_lot::{Condvar, Mutex};
use portable_atomic::{AtomicBool, AtomicU8, Ordering};
use rand::SeedableRng;
use rand::rngs::StdRng;

use crate::led_strip::SharedSnapshot;
use crate::{Error, Result};

pub mod canvas;
pub mod layout;
mod recording;

pub use canvas::Canvas;
pub use recording::{RecordingHandle, RecordingRenderer};

use layout::{Jitter, StripLayout};

// ============================================================================
// Configuration
// ============================================================================

/// Default window width in pixels.
pub const WIDTH_DEFAULT: u32 = 400;

/// Default window height in pixels.
pub const HEIGHT_DEFAULT: u32 = 200;

/// Default LED marker radius in pixels.
pub const MARKER_RADIUS_DEFAULT: u32 = 6;

/// Default gap between neighboring markers in pixels.
pub const PAD_DEFAULT: u32 = 6;

/// Default redraw ticker rate.
pub const FRAME_RATE_DEFAULT: u32 = 60;

/// Default maximum horizontal jitter in pixels.
pub const JITTER_X_DEFAULT: f32 = 3.0;

/// Default maximum vertical jitter in pixels.
pub const JITTER_Y_DEFAULT: f32 = 4.0;

/// What the viewer does after the user dismisses it.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum DismissAction {
    /// Stop the viewer and fire its [`Dismissal`] token.
    #[default]
    Notify,
    /// Stop the viewer, fire the token, then exit the whole process with `code`.
    ExitProcess {
        /// Process exit status.
        code: i32,
    },
}

/// Viewer settings.
///
/// Start from [`ViewerConfig::new`] (or `Default`) and override what you need.
#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    width: u32,
    height: u32,
    marker_radius: u32,
    pad: u32,
    frame_rate: u32,
    jitter_max: (f32, f32),
    jitter_seed: Option<u64>,
    dismiss_action: DismissAction,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl ViewerConfig {
    /// The default settings.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            width: WIDTH_DEFAULT,
            height: HEIGHT_DEFAULT,
            marker_radius: MARKER_RADIUS_DEFAULT,
            pad: PAD_DEFAULT,
            frame_rate: FRAME_RATE_DEFAULT,
            jitter_max: (JITTER_X_DEFAULT, JITTER_Y_DEFAULT),
            jitter_seed: None,
            dismiss_action: DismissAction::Notify,
        }
    }

    /// Initial window size.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// LED marker radius.
    #[must_use]
    pub const fn with_marker_radius(mut self, marker_radius: u32) -> Self {
        self.marker_radius = marker_radius;
        self
    }

    /// Gap between neighboring markers.
    #[must_use]
    pub const fn with_pad(mut self, pad: u32) -> Self {
        self.pad = pad;
        self
    }

    /// Redraw ticker rate in hertz. Must be positive.
    #[must_use]
    pub const fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        assert!(frame_rate > 0, "frame_rate must be positive");
        self.frame_rate = frame_rate;
        self
    }

    /// Maximum jitter per axis. Zero turns jitter off for that axis.
    #[must_use]
    pub const fn with_jitter(mut self, max_x: f32, max_y: f32) -> Self {
        self.jitter_max = (max_x, max_y);
        self
    }

    /// Draw jitter from a seeded generator so layouts repeat across runs.
    #[must_use]
    pub const fn with_jitter_seed(mut self, seed: u64) -> Self {
        self.jitter_seed = Some(seed);
        self
    }

    /// What to do when the user dismisses the viewer.
    #[must_use]
    pub const fn with_dismiss_action(mut self, dismiss_action: DismissAction) -> Self {
        self.dismiss_action = dismiss_action;
        self
    }

    /// Initial window size.
    #[must_use]
    pub const fn size(&self) -> Size {
        Size::new(self.width, self.height)
    }

    /// Time between ticker wakeups.
    #[must_use]
    pub fn frame_interval(&self) -> Duration {
        Duration::from_secs_f64(1.0 / f64::from(self.frame_rate))
    }

    /// Configured dismiss behavior.
    #[must_use]
    pub const fn dismiss_action(&self) -> DismissAction {
        self.dismiss_action
    }

    fn layout(&self, len: usize) -> StripLayout {
        let (max_x, max_y) = self.jitter_max;
        let jitter = match self.jitter_seed {
            Some(seed) => Jitter::random(len, max_x, max_y, &mut StdRng::seed_from_u64(seed)),
            None => Jitter::random(len, max_x, max_y, &mut rand::rng()),
        };
        StripLayout::new(self.width, self.marker_radius, self.pad, jitter)
    }
}

// ============================================================================
// Renderer seam
// ============================================================================

/// Something the user did to the view.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ViewerEvent {
    /// The view now has this size.
    Resized(Size),
    /// The user closed the view.
    Dismissed,
}

/// Presents rendered frames and reports user events.
///
/// The viewer calls every method from its own thread. Only
/// [`present`](Self::present) is required.
pub trait Renderer: Send + 'static {
    /// Called once before the first frame.
    ///
    /// # Errors
    ///
    /// An error stops the viewer.
    fn start(&mut self, _size: Size) -> Result<()> {
        Ok(())
    }

    /// Show a fully drawn frame.
    ///
    /// # Errors
    ///
    /// An error stops the viewer.
    fn present(&mut self, canvas: &Canvas) -> Result<()>;

    /// Return the next pending user event, if any. Called once per tick until it
    /// returns `None`.
    fn poll_event(&mut self) -> Option<ViewerEvent> {
        None
    }

    /// Called once after the last frame, however the viewer stopped (except on
    /// [`DismissAction::ExitProcess`]).
    ///
    /// # Errors
    ///
    /// Returned from [`Viewer::join`].
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

// ============================================================================
// Viewer state and signals
// ============================================================================

/// Lifecycle of a strip's viewer. States only move forward.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[repr(u8)]
pub enum ViewerState {
    /// `begin` has not been called.
    Uninitialized,
    /// The viewer thread exists but has not shown its first frame.
    Starting,
    /// Frames are being presented.
    Running,
    /// The viewer stopped: dismissed, its handle dropped, or its renderer failed.
    Closed,
    /// The viewer was dismissed with [`DismissAction::ExitProcess`].
    ProcessExit,
}

impl ViewerState {
    const fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Uninitialized,
            1 => Self::Starting,
            2 => Self::Running,
            3 => Self::Closed,
            _ => Self::ProcessExit,
        }
    }
}

/// Flags shared between the publishing side and the viewer thread.
///
/// Each flag holds at most one pending request; repeated requests before the next
/// tick are merged.
#[derive(Debug)]
pub(crate) struct Signals {
    update: AtomicBool,
    dismiss: AtomicBool,
    resize: Mutex<Option<Size>>,
    state: AtomicU8,
}

impl Signals {
    pub(crate) const fn new() -> Self {
        Self {
            update: AtomicBool::new(false),
            dismiss: AtomicBool::new(false),
            resize: Mutex::new(None),
            state: AtomicU8::new(ViewerState::Starting as u8),
        }
    }

    pub(crate) fn request_update(&self) {
        self.update.store(true, Ordering::Release);
    }

    fn take_update(&self) -> bool {
        self.update.swap(false, Ordering::AcqRel)
    }

    fn request_resize(&self, size: Size) {
        *self.resize.lock() = Some(size);
    }

    fn take_resize(&self) -> Option<Size> {
        self.resize.lock().take()
    }

    fn request_dismiss(&self) {
        self.dismiss.store(true, Ordering::Release);
    }

    fn dismiss_requested(&self) -> bool {
        self.dismiss.load(Ordering::Acquire)
    }

    fn apply(&self, event: ViewerEvent) {
        match event {
            ViewerEvent::Resized(size) => self.request_resize(size),
            ViewerEvent::Dismissed => self.request_dismiss(),
        }
    }

    pub(crate) fn state(&self) -> ViewerState {
        ViewerState::from_u8(self.state.load(Ordering::Acquire))
    }

    // Terminal states are never left.
    fn set_state(&self, state: ViewerState) {
        let _ = self
            .state
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                let current = ViewerState::from_u8(current);
                matches!(current, ViewerState::Starting | ViewerState::Running)
                    .then_some(state as u8)
            });
    }
}

// ============================================================================
// Dismissal token
// ============================================================================

/// Why a viewer stopped.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum CloseReason {
    /// The user closed the view, or [`Viewer::dismiss`] was called.
    Dismissed,
    /// The renderer returned an error. [`Viewer::join`] returns it.
    Failed,
    /// The handle asked the viewer to stop ([`Viewer::join`] or drop).
    Stopped,
}

/// Cancellation token that fires when the viewer stops for any reason.
///
/// Applications animate while [`is_closed`](Self::is_closed) is false, then call
/// [`Viewer::join`] to collect the outcome. Cheap to clone; every clone observes the
/// same close.
#[derive(Clone, Debug, Default)]
pub struct Dismissal(Arc<DismissalInner>);

#[derive(Debug, Default)]
struct DismissalInner {
    reason: Mutex<Option<CloseReason>>,
    condvar: Condvar,
}

impl Dismissal {
    /// True once the user has dismissed the viewer.
    #[must_use]
    pub fn is_dismissed(&self) -> bool {
        self.close_reason() == Some(CloseReason::Dismissed)
    }

    /// True once the viewer has stopped, whatever the reason.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.close_reason().is_some()
    }

    /// Why the viewer stopped, or `None` while it is running.
    #[must_use]
    pub fn close_reason(&self) -> Option<CloseReason> {
        *self.0.reason.lock()
    }

    /// Block until the viewer stops.
    pub fn wait(&self) -> CloseReason {
        let mut reason = self.0.reason.lock();
        loop {
            if let Some(reason) = *reason {
                return reason;
            }
            self.0.condvar.wait(&mut reason);
        }
    }

    /// Block until the viewer stops or `timeout` passes. Returns whether it stopped.
    #[must_use]
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut reason = self.0.reason.lock();
        while reason.is_none() {
            if self.0.condvar.wait_until(&mut reason, deadline).timed_out() {
                break;
            }
        }
        reason.is_some()
    }

    // The first reason wins.
    fn close(&self, reason: CloseReason) {
        let mut current = self.0.reason.lock();
        if current.is_none() {
            *current = Some(reason);
            self.0.condvar.notify_all();
        }
    }
}

// ============================================================================
// Viewer
// ============================================================================

/// Owned handle to a running viewer, returned by
/// [`LedStrip::begin`](crate::led_strip::LedStrip::begin).
///
/// Dropping the handle stops the viewer and waits for its thread.
#[derive(Debug)]
pub struct Viewer {
    signals: Arc<Signals>,
    dismissal: Dismissal,
    stop: Option<Sender<()>>,
    thread: Option<JoinHandle<Result<()>>>,
}

impl Viewer {
    pub(crate) fn spawn<R: Renderer>(
        snapshot: SharedSnapshot,
        len: usize,
        renderer: R,
        config: ViewerConfig,
        signals: Arc<Signals>,
    ) -> Result<Self> {
        let (stop, stop_rx) = channel::bounded(0);
        let dismissal = Dismissal::default();
        let scene = Scene::new(&config, len);
        let viewer_loop = ViewerLoop {
            renderer,
            scene,
            snapshot,
            signals: Arc::clone(&signals),
            dismissal: dismissal.clone(),
            frame_interval: config.frame_interval(),
            dismiss_action: config.dismiss_action,
            stop: stop_rx,
        };

        let thread = std::thread::Builder::new()
            .name("neopixel-viewer".into())
            .spawn(move || viewer_loop.run())
            .map_err(|err| {
                signals.set_state(ViewerState::Closed);
                Error::ViewerSpawn(err)
            })?;

        Ok(Self {
            signals,
            dismissal,
            stop: Some(stop),
            thread: Some(thread),
        })
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ViewerState {
        self.signals.state()
    }

    /// Token that fires when this viewer stops, whatever the reason.
    #[must_use]
    pub fn dismissal(&self) -> Dismissal {
        self.dismissal.clone()
    }

    /// Tell the viewer its window is now `width × height`. Takes effect on the next tick.
    pub fn resize(&self, width: u32, height: u32) {
        self.signals.request_resize(Size::new(width, height));
    }

    /// Dismiss the viewer as if the user had closed it. Takes effect on the next tick.
    pub fn dismiss(&self) {
        self.signals.request_dismiss();
    }

    /// True once the viewer thread has returned.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.thread.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop the viewer and wait for it.
    ///
    /// # Errors
    ///
    /// Returns the renderer's error if one stopped the viewer, or
    /// [`Error::ViewerPanicked`] if the thread panicked.
    pub fn join(mut self) -> Result<()> {
        self.shutdown()
    }

    /// Wait for the viewer to stop on its own (usually by dismissal), without
    /// asking it to stop.
    ///
    /// # Errors
    ///
    /// Same as [`join`](Self::join).
    pub fn wait(mut self) -> Result<()> {
        let result = self.thread.take().map_or(Ok(()), |thread| {
            thread.join().map_err(|_| Error::ViewerPanicked)?
        });
        self.stop = None;
        result
    }

    fn shutdown(&mut self) -> Result<()> {
        // Disconnecting the stop channel wakes the loop.
        self.stop = None;
        self.thread.take().map_or(Ok(()), |thread| {
            thread.join().map_err(|_| Error::ViewerPanicked)?
        })
    }
}

impl Drop for Viewer {
    fn drop(&mut self) {
        if let Err(err) = self.shutdown() {
            error!("viewer stopped with an error: {err}");
        }
    }
}

// ============================================================================
// Viewer thread
// ============================================================================

/// Layout plus the canvas it is drawn into.
struct Scene {
    layout: StripLayout,
    canvas: Canvas,
}

impl Scene {
    fn new(config: &ViewerConfig, len: usize) -> Self {
        Self {
            layout: config.layout(len),
            canvas: Canvas::new(config.size()),
        }
    }

    fn resize(&mut self, size: Size) {
        self.layout.set_width(size.width);
        self.canvas = Canvas::new(size);
    }
}

struct ViewerLoop<R> {
    renderer: R,
    scene: Scene,
    snapshot: SharedSnapshot,
    signals: Arc<Signals>,
    dismissal: Dismissal,
    frame_interval: Duration,
    dismiss_action: DismissAction,
    stop: Receiver<()>,
}

// Also runs if the loop panics.
impl<R> Drop for ViewerLoop<R> {
    fn drop(&mut self) {
        self.signals.set_state(ViewerState::Closed);
        self.dismissal.close(CloseReason::Failed);
    }
}

impl<R: Renderer> ViewerLoop<R> {
    fn run(mut self) -> Result<()> {
        let result = self.run_frames();
        if let Err(err) = &result {
            error!("viewer renderer failed: {err}");
        }
        self.signals.set_state(ViewerState::Closed);
        let finished = self.renderer.finish();
        let result = result.and(finished);
        self.dismissal.close(if result.is_ok() {
            CloseReason::Stopped
        } else {
            CloseReason::Failed
        });
        result
    }

    fn run_frames(&mut self) -> Result<()> {
        let size = self.scene.canvas.size();
        self.renderer.start(size)?;
        self.redraw()?;
        self.signals.set_state(ViewerState::Running);
        info!(
            "viewer running: {} pixels in {}x{}",
            self.snapshot.lock().len(),
            size.width,
            size.height
        );

        let ticker = channel::tick(self.frame_interval);
        loop {
            channel::select! {
                recv(self.stop) -> _ => {
                    debug!("viewer stop requested");
                    return Ok(());
                }
                recv(ticker) -> _ => {}
            }

            while let Some(event) = self.renderer.poll_event() {
                self.signals.apply(event);
            }

            if self.signals.dismiss_requested() {
                self.dismissed();
                return Ok(());
            }

            let mut needs_redraw = false;
            if let Some(size) = self.signals.take_resize() {
                debug!("viewer resized to {}x{}", size.width, size.height);
                self.scene.resize(size);
                needs_redraw = true;
            }
            if self.signals.take_update() {
                needs_redraw = true;
            }
            if needs_redraw {
                self.redraw()?;
            }
        }
    }

    fn redraw(&mut self) -> Result<()> {
        // Clone the Arc under the lock; drawing happens after it is released.
        let snapshot = Arc::clone(&self.snapshot.lock());
        self.scene.canvas.draw_strip(&self.scene.layout, &snapshot);
        self.renderer.present(&self.scene.canvas)
    }

    fn dismissed(&self) {
        match self.dismiss_action {
            DismissAction::Notify => {
                info!("viewer dismissed");
                self.signals.set_state(ViewerState::Closed);
                self.dismissal.close(CloseReason::Dismissed);
            }
            DismissAction::ExitProcess { code } => {
                info!("viewer dismissed, exiting with status {code}");
                self.signals.set_state(ViewerState::ProcessExit);
                self.dismissal.close(CloseReason::Dismissed);
                std::process::exit(code);
            }
        }
    }
}
