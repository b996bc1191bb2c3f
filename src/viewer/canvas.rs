//! Software raster the viewer draws into.

use core::convert::Infallible;

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::Drawable;
use embedded_graphics::prelude::{
    DrawTarget, OriginDimensions, Pixel, Point, Primitive, RgbColor, Size,
};
use embedded_graphics::primitives::{Circle, Line, PrimitiveStyle, PrimitiveStyleBuilder};
use itertools::Itertools;
use smart_leds::RGB8;

use super::layout::StripLayout;
use crate::led_strip::ToRgb888;

/// Background behind the strip.
pub const BACKGROUND: Rgb888 = Rgb888::WHITE;

/// Color of the guide lines and marker outlines.
pub const OUTLINE: Rgb888 = Rgb888::BLACK;

/// An RGB image the size of the viewer window.
///
/// `Canvas` is an embedded-graphics [`DrawTarget`], so anything from that crate can
/// be drawn on it. Out-of-bounds pixels are clipped.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Canvas {
    size: Size,
    pixels: Vec<Rgb888>,
}

impl Canvas {
    /// Create a canvas filled with [`BACKGROUND`].
    #[must_use]
    pub fn new(size: Size) -> Self {
        Self {
            size,
            pixels: vec![BACKGROUND; size.width as usize * size.height as usize],
        }
    }

    /// Width in pixels.
    #[must_use]
    pub const fn width(&self) -> u32 {
        self.size.width
    }

    /// Height in pixels.
    #[must_use]
    pub const fn height(&self) -> u32 {
        self.size.height
    }

    /// Color at `(x, y)`, or `None` outside the canvas.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgb888> {
        self.index(x, y)
            .and_then(|index| self.pixels.get(index).copied())
    }

    /// All pixels, row-major.
    #[must_use]
    pub fn pixels(&self) -> &[Rgb888] {
        &self.pixels
    }

    /// Packed 8-bit RGB bytes, row-major.
    #[must_use]
    pub fn to_rgb_bytes(&self) -> Vec<u8> {
        self.pixels
            .iter()
            .flat_map(|pixel| [pixel.r(), pixel.g(), pixel.b()])
            .collect()
    }

    fn index(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.size.width && y < self.size.height)
            .then(|| y as usize * self.size.width as usize + x as usize)
    }

    /// Draw a full frame of the strip: background, guide lines, then markers.
    ///
    /// Markers go in a second pass so they sit on top of the lines.
    pub fn draw_strip(&mut self, layout: &StripLayout, snapshot: &[RGB8]) {
        let Ok(()) = self.clear(BACKGROUND);

        let centers: Vec<Point> = layout.centers(snapshot.len()).map(to_point).collect();

        let line_style = PrimitiveStyle::with_stroke(OUTLINE, 1);
        for (start, end) in centers.iter().tuple_windows() {
            let Ok(()) = Line::new(*start, *end).into_styled(line_style).draw(self);
        }

        let diameter = 2 * layout.marker_radius() + 1;
        for (center, led) in centers.iter().zip(snapshot) {
            let style = PrimitiveStyleBuilder::new()
                .fill_color(led.to_rgb888())
                .stroke_color(OUTLINE)
                .stroke_width(1)
                .build();
            let Ok(()) = Circle::with_center(*center, diameter)
                .into_styled(style)
                .draw(self);
        }
    }
}

fn to_point((x, y): (f32, f32)) -> Point {
    Point::new(x.round() as i32, y.round() as i32)
}

impl OriginDimensions for Canvas {
    fn size(&self) -> Size {
        self.size
    }
}

impl DrawTarget for Canvas {
    type Color = Rgb888;
    type Error = Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> core::result::Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(coord, color) in pixels {
            let (Ok(x), Ok(y)) = (u32::try_from(coord.x), u32::try_from(coord.y)) else {
                continue;
            };
            if let Some(index) = self.index(x, y) {
                if let Some(slot) = self.pixels.get_mut(index) {
                    *slot = color;
                }
            }
        }
        Ok(())
    }

    fn clear(&mut self, color: Self::Color) -> core::result::Result<(), Self::Error> {
        self.pixels.fill(color);
        Ok(())
    }
}

