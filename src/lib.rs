//! Run NeoPixel-style (WS281x) LED strip code on a workstation.
//!
//! [`LedStrip`](led_strip::LedStrip) exposes the same read/write operations as a
//! hardware strip driver, but keeps the pixels in memory. Calling
//! [`begin`](led_strip::LedStrip::begin) starts a [`Viewer`](viewer::Viewer) on its
//! own thread that draws the strip as a string of colored lights, so animations can
//! be developed and checked without hardware.
//!
//! # Glossary
//!
//! - **Pixel:** one addressable light on the strip, identified by index.
//! - **Packed color:** a `u32` holding white, red, green and blue channels
//!   (see [`led_strip::color_rgbw`]).
//! - **Snapshot:** the decoded colors as of the last `show`; the only thing the
//!   viewer ever reads.
//! - **Publish:** what `show` does: replace the snapshot from the raw buffer in one step.
//! - **Viewer:** the thread that renders snapshots through a
//!   [`Renderer`](viewer::Renderer).
//!
//! # Features
//!
//! - `png` (default): [`to_png`] renderers that write frames to PNG / APNG files.
//! - `window`: [`window::WindowRenderer`], an SDL2 window that redraws on every
//!   frame, resizes with the layout, and dismisses the viewer on a click.
//! - `demo`: builds the `demo_strip_chase` binary.

mod error;
pub mod led_strip;
#[cfg(feature = "png")]
pub mod to_png;
pub mod viewer;
#[cfg(feature = "window")]
pub mod window;

// Re-export error types and result (used throughout)
pub use crate::error::{Error, Result};
