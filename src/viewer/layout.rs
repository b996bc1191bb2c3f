//! Where each LED is drawn on screen.
//!
//! See [`StripLayout`] for the placement rules.

use rand::Rng;

/// Per-pixel `(x, y)` offsets that nudge markers off the grid.
///
/// Jitter is drawn once when the viewer starts and never changes, so dense strips
/// read as a string of lights instead of a perfect matrix.
#[derive(Clone, Debug, PartialEq)]
pub struct Jitter(Vec<(f32, f32)>);

impl Jitter {
    /// No jitter: every marker sits exactly on its grid position.
    #[must_use]
    pub fn none(len: usize) -> Self {
        Self(vec![(0.0, 0.0); len])
    }

    /// Draw offsets uniformly from `[0, max_x) × [0, max_y)`.
    ///
    /// A maximum of zero (or less) disables jitter on that axis.
    #[must_use]
    pub fn random<R: Rng + ?Sized>(len: usize, max_x: f32, max_y: f32, rng: &mut R) -> Self {
        Self(
            (0..len)
                .map(|_| (scaled(rng, max_x), scaled(rng, max_y)))
                .collect(),
        )
    }

    /// Offset for pixel `index`, or `(0, 0)` past the end.
    #[must_use]
    pub fn get(&self, index: usize) -> (f32, f32) {
        self.0.get(index).copied().unwrap_or((0.0, 0.0))
    }

    /// Number of pixels covered.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True if no pixels are covered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<(f32, f32)>> for Jitter {
    fn from(offsets: Vec<(f32, f32)>) -> Self {
        Self(offsets)
    }
}

fn scaled<R: Rng + ?Sized>(rng: &mut R, max: f32) -> f32 {
    if max > 0.0 {
        rng.random::<f32>() * max
    } else {
        0.0
    }
}

/// Serpentine placement of a strip's LEDs inside a window.
///
/// LEDs fill rows left to right, then the next row right to left, and so on, the way
/// a strip is usually zig-zagged across a panel. Each LED is a circle of radius
/// `marker_radius`; neighbors sit `pad + 2 * marker_radius` apart and the first
/// center is `pad + marker_radius` from the top-left corner. The number of LEDs
/// per row follows from the window width and is recomputed on resize.
///
/// ```text
/// 8 LEDs, 3 per row:
///   LED0  LED1  LED2
///   LED5  LED4  LED3
///   LED6  LED7
/// ```
///
/// # Example
///
/// ```rust
/// use neopixel_sim::viewer::layout::{Jitter, StripLayout};
///
/// // (60 - 6) / (2 * 6 + 6) = 3 LEDs per row
/// let layout = StripLayout::new(60, 6, 6, Jitter::none(8));
/// assert_eq!(layout.row_size(), 3);
/// assert_eq!(layout.center(0), (12.0, 12.0));
/// assert_eq!(layout.center(3), (48.0, 30.0)); // second row runs right to left
/// assert_eq!(layout.center(5), (12.0, 30.0));
/// ```
#[derive(Clone, Debug, PartialEq)]
pub struct StripLayout {
    width: u32,
    marker_radius: u32,
    pad: u32,
    jitter: Jitter,
}

impl StripLayout {
    /// Create a layout for a window `width` pixels wide.
    #[must_use]
    pub const fn new(width: u32, marker_radius: u32, pad: u32, jitter: Jitter) -> Self {
        Self {
            width,
            marker_radius,
            pad,
            jitter,
        }
    }

    /// Number of LEDs placed on each row; at least one, however narrow the window.
    #[must_use]
    pub const fn row_size(&self) -> usize {
        let cell = 2 * self.marker_radius + self.pad;
        if cell == 0 {
            return 1;
        }
        let row_size = self.width.saturating_sub(self.pad) / cell;
        if row_size == 0 { 1 } else { row_size as usize }
    }

    /// Screen position of LED `index`, jitter included.
    #[must_use]
    pub fn center(&self, index: usize) -> (f32, f32) {
        let row_size = self.row_size();
        let row = index / row_size;
        let mut col = index % row_size;
        if row % 2 == 1 {
            col = row_size - col - 1;
        }

        let first = (self.pad + self.marker_radius) as f32;
        let step = first + self.marker_radius as f32;
        let (jitter_x, jitter_y) = self.jitter.get(index);
        (
            step.mul_add(col as f32, first) + jitter_x,
            step.mul_add(row as f32, first) + jitter_y,
        )
    }

    /// Centers of the first `len` LEDs, in strip order.
    pub fn centers(&self, len: usize) -> impl Iterator<Item = (f32, f32)> + '_ {
        (0..len).map(|index| self.center(index))
    }

    /// Reflow for a new window width.
    pub const fn set_width(&mut self, width: u32) {
        self.width = width;
    }

    /// Window width this layout flows into.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.width
    }

    /// Radius of each LED marker.
    #[must_use]
    pub const fn marker_radius(&self) -> u32 {
        self.marker_radius
    }

    /// The fixed per-pixel jitter.
    #[must_use]
    pub const fn jitter(&self) -> &Jitter {
        &self.jitter
    }
}
