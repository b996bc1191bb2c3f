#![allow(missing_docs)]
//! Chase a white dot along a 100-LED strip.
//!
//! Run with `RUST_LOG=info cargo run --features demo --bin demo_strip_chase`. The
//! strip opens in a window; resize it to reflow the rows and click it to quit.
//!
//! - `--png` writes each frame to `strip.png` instead (open it in an image viewer
//!   that reloads on change, press Ctrl-C to stop).
//! - Any other argument is a path: one lap is recorded there as a looping APNG.

use std::time::Duration;

use neopixel_sim::Result;
use neopixel_sim::led_strip::{LedStrip, StripOptions, ws};
use neopixel_sim::to_png::{ApngRenderer, PngRenderer};
use neopixel_sim::viewer::{CloseReason, Renderer, ViewerConfig};
use neopixel_sim::window::WindowRenderer;

const LED_COUNT: usize = 100;
const STEP: Duration = Duration::from_millis(100);

fn main() -> Result<()> {
    env_logger::init();

    // Hardware options are accepted for compatibility and ignored.
    let strip = LedStrip::with_options(
        LED_COUNT,
        StripOptions {
            strip_type: ws::SK6812_STRIP_RGBW,
            ..StripOptions::default()
        },
    );

    match std::env::args().nth(1).as_deref() {
        None => chase(&strip, WindowRenderer::new("NeoPixel strip"), None),
        Some("--png") => chase(&strip, PngRenderer::new("strip.png"), None),
        Some(apng_path) => chase(&strip, ApngRenderer::new(apng_path, 100), Some(LED_COUNT)),
    }
}

fn chase(strip: &LedStrip, renderer: impl Renderer, steps: Option<usize>) -> Result<()> {
    let viewer = strip.begin_with_config(renderer, ViewerConfig::new().with_frame_rate(30))?;
    let dismissal = viewer.dismissal();
    let mut previous = 0;
    let mut current = 0;
    let mut step = 0;
    while !dismissal.is_closed() && steps.is_none_or(|steps| step < steps) {
        strip.set_pixel_color_rgb(previous, 0, 0, 0)?;
        strip.set_pixel_color_rgb(current, 255, 255, 255)?;
        strip.show();

        (previous, current) = (current, (current + 1) % LED_COUNT);
        step += 1;
        std::thread::sleep(STEP);
    }
    if dismissal.close_reason() == Some(CloseReason::Dismissed) {
        log::info!("strip dismissed after {step} steps");
    }
    viewer.join()
}
