#![cfg(feature = "png")]
//! Write viewer frames to PNG and animated PNG files.
//!
//! [`PngRenderer`] keeps a single PNG up to date with the latest frame (open it in an
//! image viewer that reloads on change). [`ApngRenderer`] records the whole session
//! and writes a looping APNG when the viewer stops.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use embedded_graphics::prelude::Size;
use log::{info, warn};
use png::{BitDepth, ColorType, Encoder};
use tempfile::NamedTempFile;

use crate::Result;
use crate::viewer::{Canvas, Renderer};

/// Write `canvas` to a PNG file, creating parent directories as needed.
///
/// The image is written to a temporary file beside `output_path` and renamed over
/// it, so readers see either the previous image or the new one, never a partial file.
///
/// # Errors
///
/// Returns an I/O or PNG encoding error.
pub fn write_canvas_png(canvas: &Canvas, output_path: impl AsRef<Path>) -> Result<()> {
    let output_path = output_path.as_ref();
    let staged = staging_file(output_path)?;
    {
        let mut file = BufWriter::new(staged.as_file());
        let mut encoder = Encoder::new(&mut file, canvas.width(), canvas.height());
        encoder.set_color(ColorType::Rgb);
        encoder.set_depth(BitDepth::Eight);
        let mut writer = encoder.write_header()?;
        writer.write_image_data(&canvas.to_rgb_bytes())?;
        writer.finish()?;
        file.flush()?;
    }
    staged.persist(output_path).map_err(|err| err.error)?;
    Ok(())
}

/// Write `canvases` to a looping APNG file, `frame_delay_ms` per frame.
///
/// All canvases must share the first canvas's size.
///
/// # Errors
///
/// Returns an I/O or PNG encoding error.
///
/// # Panics
///
/// Panics if `canvases` is empty, sizes differ, or `frame_delay_ms` is zero or
/// does not fit in `u16`.
pub fn write_canvases_apng(
    canvases: &[Canvas],
    output_path: impl AsRef<Path>,
    frame_delay_ms: u32,
) -> Result<()> {
    assert!(!canvases.is_empty(), "canvases must not be empty");
    assert!(frame_delay_ms > 0, "frame_delay_ms must be positive");
    let output_path = output_path.as_ref();
    let (width, height) = (canvases[0].width(), canvases[0].height());
    assert!(
        canvases
            .iter()
            .all(|canvas| canvas.width() == width && canvas.height() == height),
        "canvas sizes must match"
    );
    let frame_count = u32::try_from(canvases.len()).expect("frame count must fit in u32");
    let delay_num = u16::try_from(frame_delay_ms).expect("frame_delay_ms must fit in u16");
    let delay_den = 1000u16;

    let staged = staging_file(output_path)?;
    {
        let mut file = BufWriter::new(staged.as_file());
        let mut encoder = Encoder::new(&mut file, width, height);
        encoder.set_color(ColorType::Rgb);
        encoder.set_depth(BitDepth::Eight);
        encoder.set_animated(frame_count, 0)?;
        let mut writer = encoder.write_header()?;
        for canvas in canvases {
            writer.set_frame_delay(delay_num, delay_den)?;
            writer.write_image_data(&canvas.to_rgb_bytes())?;
        }
        writer.finish()?;
        file.flush()?;
    }
    staged.persist(output_path).map_err(|err| err.error)?;
    Ok(())
}

fn create_parent_dirs(output_path: &Path) -> Result<()> {
    if let Some(parent) = output_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}

// Same directory as the target so the final rename stays on one filesystem.
fn staging_file(output_path: &Path) -> Result<NamedTempFile> {
    create_parent_dirs(output_path)?;
    let dir = output_path
        .parent()
        .filter(|parent| !parent.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    Ok(tempfile::Builder::new()
        .prefix(".neopixel-")
        .suffix(".png.tmp")
        .tempfile_in(dir)?)
}

// ============================================================================
// Renderers
// ============================================================================

/// [`Renderer`] that rewrites one PNG file with every presented frame.
#[derive(Clone, Debug)]
pub struct PngRenderer {
    output_path: PathBuf,
}

impl PngRenderer {
    /// Render to `output_path`.
    #[must_use]
    pub fn new(output_path: impl Into<PathBuf>) -> Self {
        Self {
            output_path: output_path.into(),
        }
    }

    /// Where frames are written.
    #[must_use]
    pub fn output_path(&self) -> &Path {
        &self.output_path
    }
}

impl Renderer for PngRenderer {
    fn start(&mut self, size: Size) -> Result<()> {
        info!(
            "rendering {}x{} frames to {}",
            size.width,
            size.height,
            self.output_path.display()
        );
        Ok(())
    }

    fn present(&mut self, canvas: &Canvas) -> Result<()> {
        write_canvas_png(canvas, &self.output_path)
    }
}

/// [`Renderer`] that records every frame and writes a looping APNG when the viewer
/// stops.
///
/// Frames presented after a resize no longer match the first frame's size and are
/// left out.
#[derive(Debug)]
pub struct ApngRenderer {
    output_path: PathBuf,
    frame_delay_ms: u32,
    frames: Vec<Canvas>,
}

impl ApngRenderer {
    /// Record to `output_path`, showing each frame for `frame_delay_ms`.
    ///
    /// # Panics
    ///
    /// Panics if `frame_delay_ms` is zero or does not fit in `u16`.
    #[must_use]
    pub fn new(output_path: impl Into<PathBuf>, frame_delay_ms: u32) -> Self {
        assert!(frame_delay_ms > 0, "frame_delay_ms must be positive");
        assert!(
            u16::try_from(frame_delay_ms).is_ok(),
            "frame_delay_ms must fit in u16"
        );
        Self {
            output_path: output_path.into(),
            frame_delay_ms,
            frames: Vec::new(),
        }
    }
}

impl Renderer for ApngRenderer {
    fn present(&mut self, canvas: &Canvas) -> Result<()> {
        if let Some(first) = self.frames.first() {
            if (first.width(), first.height()) != (canvas.width(), canvas.height()) {
                warn!(
                    "skipping {}x{} frame in {}x{} animation",
                    canvas.width(),
                    canvas.height(),
                    first.width(),
                    first.height()
                );
                return Ok(());
            }
        }
        self.frames.push(canvas.clone());
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        if self.frames.is_empty() {
            return Ok(());
        }
        write_canvases_apng(&self.frames, &self.output_path, self.frame_delay_ms)?;
        info!(
            "wrote {} frame APNG to {}",
            self.frames.len(),
            self.output_path.display()
        );
        Ok(())
    }
}
