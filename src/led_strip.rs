//! A simulated NeoPixel-style (WS281x) LED strip.
//!
//! [`LedStrip`] mirrors the API of a hardware strip driver: pixels are written by
//! index as packed 32-bit colors, and nothing becomes visible until
//! [`show`](LedStrip::show) publishes the buffer. Instead of clocking bits out
//! of a GPIO pin, `show` decodes the buffer into a [`Snapshot`] that a
//! [`Viewer`](crate::viewer::Viewer) renders on its own thread.
//!
//! # Example: Chase a Single Dot
//!
//! ```rust,no_run
//! use std::time::Duration;
//! use neopixel_sim::led_strip::LedStrip;
//! use neopixel_sim::viewer::RecordingRenderer;
//!
//! # fn main() -> neopixel_sim::Result<()> {
//! const LED_COUNT: usize = 100;
//!
//! let strip = LedStrip::new(LED_COUNT);
//! let (renderer, _frames) = RecordingRenderer::new();
//! let viewer = strip.begin(renderer)?;
//!
//! let mut previous = 0;
//! for step in 0..LED_COUNT * 3 {
//!     let current = step % LED_COUNT;
//!     strip.set_pixel_color_rgb(previous, 0, 0, 0)?;
//!     strip.set_pixel_color_rgb(current, 255, 255, 255)?;
//!     strip.show();
//!     previous = current;
//!     std::thread::sleep(Duration::from_millis(100));
//! }
//! viewer.join()
//! # }
//! ```
//!
//! # Packed colors
//!
//! A packed color is `(white << 24) | (red << 16) | (green << 8) | blue`. Channels are
//! `u8`, so a channel can never spill into its neighbor. The white channel is stored
//! and read back but dropped by [`decode`].

use std::sync::Arc;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::RgbColor;
use log::debug;
use parking_lot::Mutex;

use crate::viewer::{Renderer, Signals, Viewer, ViewerConfig, ViewerState};
use crate::{Error, Result};

pub mod ws;

/// Predefined RGB color constants from the `smart_leds` crate.
///
/// Common colors include `RED`, `GREEN`, `BLUE`, `YELLOW`, `WHITE`, `BLACK`, `CYAN`, `MAGENTA`, `ORANGE`, `PURPLE`.
#[doc(inline)]
pub use smart_leds::colors;

/// A 32-bit packed white/red/green/blue color.
pub type PackedColor = u32;

/// The decoded colors as of the most recent [`LedStrip::show`].
///
/// Snapshots are immutable; `show` replaces the whole snapshot rather than editing it.
pub type Snapshot = Arc<[RGB8]>;

pub(crate) type SharedSnapshot = Arc<Mutex<Snapshot>>;

// ============================================================================
// Packed color helpers
// ============================================================================

/// Pack red, green and blue into a [`PackedColor`] with the white channel off.
#[must_use]
pub const fn color(red: u8, green: u8, blue: u8) -> PackedColor {
    color_rgbw(red, green, blue, 0)
}

/// Pack red, green, blue and white into a [`PackedColor`].
#[must_use]
pub const fn color_rgbw(red: u8, green: u8, blue: u8, white: u8) -> PackedColor {
    ((white as u32) << 24) | ((red as u32) << 16) | ((green as u32) << 8) | blue as u32
}

/// Unpack the red, green and blue channels of a [`PackedColor`]. White is dropped.
#[must_use]
pub const fn decode(color: PackedColor) -> RGB8 {
    RGB8::new((color >> 16) as u8, (color >> 8) as u8, color as u8)
}

/// Return the white channel of a [`PackedColor`].
#[must_use]
pub const fn white(color: PackedColor) -> u8 {
    (color >> 24) as u8
}

/// Convert colors to [`RGB8`].
///
/// # Example
///
/// ```rust
/// use neopixel_sim::led_strip::{ToRgb8, color, RGB8};
///
/// assert_eq!(color(16, 32, 48).to_rgb8(), RGB8::new(16, 32, 48));
/// ```
pub trait ToRgb8 {
    /// Convert this color to [`RGB8`].
    #[must_use]
    fn to_rgb8(self) -> RGB8;
}

impl ToRgb8 for RGB8 {
    #[inline]
    fn to_rgb8(self) -> RGB8 {
        self
    }
}

impl ToRgb8 for Rgb888 {
    #[inline]
    fn to_rgb8(self) -> RGB8 {
        RGB8::new(self.r(), self.g(), self.b())
    }
}

impl ToRgb8 for PackedColor {
    #[inline]
    fn to_rgb8(self) -> RGB8 {
        decode(self)
    }
}

/// Convert colors to [`Rgb888`] for embedded-graphics rendering.
pub trait ToRgb888 {
    /// Convert this color to [`Rgb888`].
    #[must_use]
    fn to_rgb888(self) -> Rgb888;
}

impl ToRgb888 for RGB8 {
    #[inline]
    fn to_rgb888(self) -> Rgb888 {
        Rgb888::new(self.r, self.g, self.b)
    }
}

impl ToRgb888 for Rgb888 {
    #[inline]
    fn to_rgb888(self) -> Rgb888 {
        self
    }
}

impl ToRgb888 for PackedColor {
    #[inline]
    fn to_rgb888(self) -> Rgb888 {
        decode(self).to_rgb888()
    }
}

/// RGB color type used by snapshots, re-exported from `smart_leds`.
#[doc(inline)]
pub use smart_leds::RGB8;

// ============================================================================
// Hardware options (accepted, not used)
// ============================================================================

/// Hardware settings a real strip driver needs.
///
/// The simulator accepts them so existing call sites keep compiling, logs them, and
/// otherwise ignores them.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct StripOptions {
    /// GPIO pin connected to the strip's data line.
    pub pin: u8,
    /// Signal frequency in hertz.
    pub freq_hz: u32,
    /// DMA channel used to generate the signal.
    pub dma: u8,
    /// Invert the signal line.
    pub invert: bool,
    /// Global brightness, 0 to 255.
    pub brightness: u8,
    /// PWM channel.
    pub channel: u8,
    /// One of the [`ws`] strip-type constants.
    pub strip_type: i32,
}

impl Default for StripOptions {
    fn default() -> Self {
        Self {
            pin: 18,
            freq_hz: 800_000,
            dma: 10,
            invert: false,
            brightness: 255,
            channel: 0,
            strip_type: ws::SK6812_STRIP_RGBW,
        }
    }
}

// ============================================================================
// LedStrip
// ============================================================================

/// An in-memory LED strip with a published snapshot for on-screen display.
///
/// All methods take `&self`; the strip can be shared between threads with an [`Arc`].
/// Writes go to the raw buffer, [`show`](Self::show) copies the buffer into the
/// snapshot, and the viewer only ever reads the snapshot.
///
/// See the [module documentation](mod@crate::led_strip) for a usage example.
pub struct LedStrip {
    len: usize,
    pixels: Mutex<Vec<PackedColor>>,
    displayed: SharedSnapshot,
    viewer_signals: Mutex<Option<Arc<Signals>>>,
}

impl LedStrip {
    /// Create a strip of `len` pixels, all off, with an all-black snapshot.
    #[must_use]
    pub fn new(len: usize) -> Self {
        Self {
            len,
            pixels: Mutex::new(vec![0; len]),
            displayed: Arc::new(Mutex::new(Arc::from(vec![RGB8::new(0, 0, 0); len]))),
            viewer_signals: Mutex::new(None),
        }
    }

    /// Create a strip of `len` pixels, accepting the hardware options of a real driver.
    ///
    /// The options have no effect on the simulation.
    #[must_use]
    pub fn with_options(len: usize, options: StripOptions) -> Self {
        debug!("ignoring hardware options for simulated strip: {options:?}");
        Self::new(len)
    }

    /// Number of pixels in the strip. Fixed for the strip's lifetime.
    #[must_use]
    pub const fn num_pixels(&self) -> usize {
        self.len
    }

    /// Same as [`num_pixels`](Self::num_pixels).
    #[must_use]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// True if the strip has no pixels.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Store a packed color at `index`. Not visible until [`show`](Self::show).
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index >= self.len()`.
    pub fn set_pixel_color(&self, index: usize, color: PackedColor) -> Result<()> {
        let len = self.len;
        let mut pixels = self.pixels.lock();
        let slot = pixels
            .get_mut(index)
            .ok_or(Error::IndexOutOfRange { index, len })?;
        *slot = color;
        Ok(())
    }

    /// Store an RGB color at `index` with the white channel off.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index >= self.len()`.
    pub fn set_pixel_color_rgb(&self, index: usize, red: u8, green: u8, blue: u8) -> Result<()> {
        self.set_pixel_color(index, color(red, green, blue))
    }

    /// Store an RGBW color at `index`. The white channel is kept but never displayed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index >= self.len()`.
    pub fn set_pixel_color_rgbw(
        &self,
        index: usize,
        red: u8,
        green: u8,
        blue: u8,
        white: u8,
    ) -> Result<()> {
        self.set_pixel_color(index, color_rgbw(red, green, blue, white))
    }

    /// Return the packed color stored at `index`, published or not.
    ///
    /// # Errors
    ///
    /// Returns [`Error::IndexOutOfRange`] if `index >= self.len()`.
    pub fn get_pixel_color(&self, index: usize) -> Result<PackedColor> {
        self.pixels
            .lock()
            .get(index)
            .copied()
            .ok_or(Error::IndexOutOfRange {
                index,
                len: self.len,
            })
    }

    /// Edit the whole raw buffer in one step.
    ///
    /// `edit` runs with the buffer lock held: other writers and
    /// [`show`](Self::show) wait until it returns, so a publish never sees half of a
    /// bulk edit.
    ///
    /// ```rust
    /// use neopixel_sim::led_strip::{LedStrip, color};
    ///
    /// let strip = LedStrip::new(4);
    /// strip.with_pixels_mut(|pixels| pixels.fill(color(0, 0, 255)));
    /// strip.show();
    /// assert!(strip.get_displayed().iter().all(|pixel| pixel.b == 255));
    /// ```
    ///
    /// # Deadlocks
    ///
    /// The buffer lock is not reentrant. Calling any other `LedStrip` method on the
    /// same strip from inside `edit` (including `show`) never returns. Edit the
    /// slice, return, then publish.
    pub fn with_pixels_mut<R>(&self, edit: impl FnOnce(&mut [PackedColor]) -> R) -> R {
        let mut pixels = self.pixels.lock();
        edit(pixels.as_mut_slice())
    }

    /// Publish the current buffer to the viewer.
    ///
    /// Decodes every pixel into a new snapshot and swaps it in under the snapshot
    /// lock, then tells the viewer (if one was started) to redraw.
    pub fn show(&self) {
        {
            let pixels = self.pixels.lock();
            let mut displayed = self.displayed.lock();
            *displayed = pixels.iter().copied().map(decode).collect();
        }
        if let Some(signals) = self.viewer_signals.lock().as_ref() {
            signals.request_update();
        }
    }

    /// Return the snapshot published by the most recent [`show`](Self::show).
    #[must_use]
    pub fn get_displayed(&self) -> Snapshot {
        Arc::clone(&self.displayed.lock())
    }

    /// Start the viewer with the default [`ViewerConfig`].
    ///
    /// # Errors
    ///
    /// See [`begin_with_config`](Self::begin_with_config).
    pub fn begin<R: Renderer>(&self, renderer: R) -> Result<Viewer> {
        self.begin_with_config(renderer, ViewerConfig::default())
    }

    /// Start the viewer on its own thread, rendering through `renderer`.
    ///
    /// A strip has at most one viewer over its lifetime; the returned handle owns it.
    /// A `begin` that fails to create the thread does not use up that viewer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::AlreadyStarted`] if a viewer was already started on this
    /// strip, and [`Error::ViewerSpawn`] if the thread cannot be created.
    pub fn begin_with_config<R: Renderer>(
        &self,
        renderer: R,
        config: ViewerConfig,
    ) -> Result<Viewer> {
        // Held across the spawn so concurrent begins and shows see one outcome.
        let mut bound = self.viewer_signals.lock();
        if bound.is_some() {
            return Err(Error::AlreadyStarted);
        }
        let signals = Arc::new(Signals::new());
        let viewer = Viewer::spawn(
            Arc::clone(&self.displayed),
            self.num_pixels(),
            renderer,
            config,
            Arc::clone(&signals),
        )?;
        *bound = Some(signals);
        Ok(viewer)
    }

    /// Current state of this strip's viewer.
    #[must_use]
    pub fn viewer_state(&self) -> ViewerState {
        self.viewer_signals
            .lock()
            .as_ref()
            .map_or(ViewerState::Uninitialized, |signals| signals.state())
    }
}

impl core::fmt::Debug for LedStrip {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("LedStrip")
            .field("len", &self.len)
            .field("viewer_state", &self.viewer_state())
            .finish_non_exhaustive()
    }
}
