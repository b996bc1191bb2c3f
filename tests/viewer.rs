#![allow(missing_docs)]
#![allow(clippy::unwrap_used)]
//! Host-level tests for the viewer thread, driven through a recording renderer.

use std::io;
use std::sync::Arc;
use std::time::{Duration, Instant};

use embedded_graphics::pixelcolor::Rgb888;
use embedded_graphics::prelude::{RgbColor, Size};
use neopixel_sim::led_strip::{LedStrip, color};
use neopixel_sim::viewer::canvas::BACKGROUND;
use neopixel_sim::viewer::{
    Canvas, CloseReason, RecordingRenderer, Renderer, Viewer, ViewerConfig, ViewerEvent,
    ViewerState,
};
use neopixel_sim::{Error, Result};
use parking_lot::Mutex;
use portable_atomic::{AtomicBool, Ordering};

const TIMEOUT: Duration = Duration::from_secs(5);

fn steady_config() -> ViewerConfig {
    ViewerConfig::new().with_jitter(0.0, 0.0)
}

fn wait_for_state(strip: &LedStrip, state: ViewerState) -> bool {
    let deadline = Instant::now() + TIMEOUT;
    while Instant::now() < deadline {
        if strip.viewer_state() == state {
            return true;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
    false
}

#[test]
fn initial_frame_shows_dark_markers() {
    let strip = LedStrip::new(3);
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip.begin_with_config(renderer, steady_config()).unwrap();

    assert_eq!(frames.wait_started(TIMEOUT), Some(Size::new(400, 200)));
    let frame = frames.next_frame(TIMEOUT).expect("initial frame");

    assert_eq!((frame.width(), frame.height()), (400, 200));
    assert_eq!(frame.pixel(12, 12), Some(Rgb888::BLACK));
    assert_eq!(frame.pixel(30, 12), Some(Rgb888::BLACK));
    assert_eq!(frame.pixel(48, 12), Some(Rgb888::BLACK));
    assert_eq!(frame.pixel(66, 12), Some(BACKGROUND));
    viewer.join().unwrap();
}

#[test]
fn show_redraws_with_published_colors() {
    let strip = LedStrip::new(3);
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip.begin_with_config(renderer, steady_config()).unwrap();
    frames.next_frame(TIMEOUT).expect("initial frame");

    strip.set_pixel_color_rgb(0, 255, 0, 0).unwrap();
    strip.set_pixel_color_rgb(1, 0, 255, 0).unwrap();
    strip.set_pixel_color_rgb(2, 0, 0, 255).unwrap();
    strip.show();

    let frame = frames
        .frame_matching(TIMEOUT, |frame| frame.pixel(12, 12) == Some(Rgb888::RED))
        .expect("frame with published colors");
    assert_eq!(frame.pixel(30, 12), Some(Rgb888::GREEN));
    assert_eq!(frame.pixel(48, 12), Some(Rgb888::BLUE));
    viewer.join().unwrap();
}

#[test]
fn unpublished_writes_do_not_redraw() {
    let strip = LedStrip::new(3);
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip.begin_with_config(renderer, steady_config()).unwrap();
    frames.next_frame(TIMEOUT).expect("initial frame");

    strip.set_pixel_color(0, color(255, 255, 255)).unwrap();

    assert!(frames.next_frame(Duration::from_millis(200)).is_none());
    viewer.join().unwrap();
}

#[test]
fn show_before_begin_appears_in_first_frame() {
    let strip = LedStrip::new(2);
    strip.set_pixel_color_rgb(1, 255, 0, 0).unwrap();
    strip.show();
    assert_eq!(strip.viewer_state(), ViewerState::Uninitialized);

    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip.begin_with_config(renderer, steady_config()).unwrap();

    let frame = frames.next_frame(TIMEOUT).expect("initial frame");
    assert_eq!(frame.pixel(12, 12), Some(Rgb888::BLACK));
    assert_eq!(frame.pixel(30, 12), Some(Rgb888::RED));
    viewer.join().unwrap();
}

#[test]
fn renderer_resize_reflows_layout() {
    let strip = LedStrip::new(11);
    strip.set_pixel_color_rgb(10, 255, 0, 0).unwrap();
    strip.show();
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip.begin_with_config(renderer, steady_config()).unwrap();

    let frame = frames.next_frame(TIMEOUT).expect("initial frame");
    // 21 per row: pixel 10 is on the first row.
    assert_eq!(frame.pixel(192, 12), Some(Rgb888::RED));

    frames.resize(200, 100);

    let frame = frames
        .frame_matching(TIMEOUT, |frame| frame.width() == 200)
        .expect("resized frame");
    assert_eq!(frame.height(), 100);
    // 10 per row: pixel 10 starts the second row, at its right end.
    assert_eq!(frame.pixel(174, 30), Some(Rgb888::RED));
    viewer.join().unwrap();
}

#[test]
fn handle_resize_redraws_at_new_size() {
    let strip = LedStrip::new(3);
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip.begin_with_config(renderer, steady_config()).unwrap();
    frames.next_frame(TIMEOUT).expect("initial frame");

    viewer.resize(120, 80);

    let frame = frames
        .frame_matching(TIMEOUT, |frame| frame.width() == 120)
        .expect("resized frame");
    assert_eq!(frame.height(), 80);
    viewer.join().unwrap();
}

#[test]
fn user_dismissal_cancels_token_and_closes() {
    let strip = LedStrip::new(3);
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip.begin(renderer).unwrap();
    let dismissal = viewer.dismissal();
    frames.next_frame(TIMEOUT).expect("initial frame");
    assert!(!dismissal.is_dismissed());

    frames.send_event(ViewerEvent::Dismissed);

    assert!(dismissal.wait_timeout(TIMEOUT));
    viewer.wait().unwrap();
    assert!(dismissal.is_dismissed());
    assert_eq!(dismissal.close_reason(), Some(CloseReason::Dismissed));
    assert_eq!(strip.viewer_state(), ViewerState::Closed);
}

#[test]
fn programmatic_dismissal_stops_the_viewer() {
    let strip = LedStrip::new(3);
    let (renderer, _frames) = RecordingRenderer::new();
    let viewer = strip.begin(renderer).unwrap();
    let dismissal = viewer.dismissal();

    viewer.dismiss();

    assert_eq!(dismissal.wait(), CloseReason::Dismissed);
    viewer.wait().unwrap();
    assert_eq!(strip.viewer_state(), ViewerState::Closed);
}

#[test]
fn show_after_close_is_harmless() {
    let strip = LedStrip::new(3);
    let (renderer, _frames) = RecordingRenderer::new();
    strip.begin(renderer).unwrap().join().unwrap();

    strip.set_pixel_color_rgb(0, 1, 2, 3).unwrap();
    strip.show();

    assert_eq!(strip.get_displayed()[0].b, 3);
    assert_eq!(strip.viewer_state(), ViewerState::Closed);
}

#[test]
fn second_begin_is_rejected() {
    let strip = LedStrip::new(3);
    let (renderer, _frames) = RecordingRenderer::new();
    let viewer = strip.begin(renderer).unwrap();

    let (again, _) = RecordingRenderer::new();
    assert!(matches!(strip.begin(again), Err(Error::AlreadyStarted)));

    viewer.join().unwrap();
    let (after_close, _) = RecordingRenderer::new();
    assert!(matches!(
        strip.begin(after_close),
        Err(Error::AlreadyStarted)
    ));
}

#[test]
fn state_moves_from_running_to_closed() {
    let strip = LedStrip::new(3);
    assert_eq!(strip.viewer_state(), ViewerState::Uninitialized);
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip.begin(renderer).unwrap();

    frames.next_frame(TIMEOUT).expect("initial frame");
    assert!(wait_for_state(&strip, ViewerState::Running));
    assert_eq!(viewer.state(), ViewerState::Running);
    assert!(!viewer.is_finished());

    viewer.join().unwrap();
    assert_eq!(strip.viewer_state(), ViewerState::Closed);
}

#[test]
fn dropping_the_handle_stops_the_viewer() {
    let strip = LedStrip::new(3);
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip.begin(renderer).unwrap();
    frames.next_frame(TIMEOUT).expect("initial frame");

    let dismissal = viewer.dismissal();
    drop(viewer);

    assert_eq!(strip.viewer_state(), ViewerState::Closed);
    assert_eq!(dismissal.close_reason(), Some(CloseReason::Stopped));
    assert!(!dismissal.is_dismissed());
}

#[test]
fn viewer_never_blocks_writers() {
    let strip = Arc::new(LedStrip::new(64));
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip
        .begin_with_config(renderer, steady_config().with_frame_rate(240))
        .unwrap();

    for step in 0..200_u8 {
        for index in 0..64 {
            strip.set_pixel_color_rgb(index, step, 0, 0).unwrap();
        }
        strip.show();
    }

    let last = frames
        .frame_matching(TIMEOUT, |frame| {
            frame.pixel(12, 12) == Some(Rgb888::new(199, 0, 0))
        })
        .expect("latest snapshot is drawn");
    assert_eq!(last.pixel(30, 12), Some(Rgb888::new(199, 0, 0)));
    viewer.join().unwrap();
}

struct FailingRenderer {
    finished: Arc<AtomicBool>,
}

impl Renderer for FailingRenderer {
    fn present(&mut self, _canvas: &Canvas) -> Result<()> {
        Err(io::Error::other("display went away").into())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished.store(true, Ordering::Release);
        Ok(())
    }
}

#[test]
fn renderer_error_closes_viewer_and_is_returned() {
    let finished = Arc::new(AtomicBool::new(false));
    let strip = LedStrip::new(3);
    let viewer = strip
        .begin(FailingRenderer {
            finished: Arc::clone(&finished),
        })
        .unwrap();

    let result = viewer.wait();

    assert!(matches!(result, Err(Error::Io(_))));
    assert!(finished.load(Ordering::Acquire));
    assert_eq!(strip.viewer_state(), ViewerState::Closed);
}

#[test]
fn renderer_error_fires_the_close_token() {
    let strip = LedStrip::new(3);
    let viewer = strip
        .begin(FailingRenderer {
            finished: Arc::new(AtomicBool::new(false)),
        })
        .unwrap();
    let dismissal = viewer.dismissal();

    // An animation loop on the token ends instead of running against a dead viewer.
    let mut frames_animated = 0_u32;
    let deadline = Instant::now() + TIMEOUT;
    while !dismissal.is_closed() && Instant::now() < deadline {
        strip.show();
        frames_animated += 1;
        std::thread::sleep(Duration::from_millis(5));
    }

    assert!(dismissal.is_closed(), "loop ran {frames_animated} frames");
    assert_eq!(dismissal.close_reason(), Some(CloseReason::Failed));
    assert!(!dismissal.is_dismissed());
    assert_eq!(strip.viewer_state(), ViewerState::Closed);
    assert!(matches!(viewer.join(), Err(Error::Io(_))));
}

struct CountingRenderer {
    presented: Arc<portable_atomic::AtomicUsize>,
    finished: Arc<AtomicBool>,
}

impl Renderer for CountingRenderer {
    fn present(&mut self, _canvas: &Canvas) -> Result<()> {
        self.presented.fetch_add(1, Ordering::AcqRel);
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        self.finished.store(true, Ordering::Release);
        Ok(())
    }
}

#[test]
fn finish_runs_once_the_viewer_stops() {
    let presented = Arc::new(portable_atomic::AtomicUsize::new(0));
    let finished = Arc::new(AtomicBool::new(false));
    let strip = LedStrip::new(3);
    let viewer = strip
        .begin(CountingRenderer {
            presented: Arc::clone(&presented),
            finished: Arc::clone(&finished),
        })
        .unwrap();
    assert!(wait_for_state(&strip, ViewerState::Running));

    viewer.join().unwrap();

    assert!(presented.load(Ordering::Acquire) >= 1);
    assert!(finished.load(Ordering::Acquire));
}

#[test]
fn concurrent_begins_bind_exactly_one_viewer() {
    let strip = Arc::new(LedStrip::new(3));

    let outcomes: Vec<bool> = (0..8)
        .map(|_| {
            let strip = Arc::clone(&strip);
            std::thread::spawn(move || {
                let (renderer, _frames) = RecordingRenderer::new();
                strip.begin(renderer).map(Viewer::join).is_ok()
            })
        })
        .collect::<Vec<_>>()
        .into_iter()
        .map(|thread| thread.join().unwrap())
        .collect();

    assert_eq!(outcomes.iter().filter(|started| **started).count(), 1);
    assert_eq!(strip.viewer_state(), ViewerState::Closed);
}

#[test]
fn undrained_recording_keeps_only_recent_frames() {
    let strip = LedStrip::new(4);
    let (renderer, frames) = RecordingRenderer::new();
    let viewer = strip
        .begin_with_config(renderer, steady_config().with_frame_rate(200))
        .unwrap();
    assert!(wait_for_state(&strip, ViewerState::Running));

    for step in 0..200_u8 {
        strip.set_pixel_color_rgb(0, step, 0, 0).unwrap();
        strip.show();
        std::thread::sleep(Duration::from_millis(6));
    }
    // Let the last show reach the renderer.
    std::thread::sleep(Duration::from_millis(100));
    viewer.join().unwrap();

    let queued = frames.drain();
    assert!(!queued.is_empty());
    assert!(queued.len() <= RecordingRenderer::FRAME_CAPACITY);
    let newest = queued.last().unwrap();
    assert_eq!(newest.pixel(12, 12), Some(Rgb888::new(199, 0, 0)));
}

/// Counts presented frames and remembers the color of the first marker.
#[derive(Clone, Default)]
struct FrameLog(Arc<Mutex<(usize, Option<Rgb888>)>>);

impl FrameLog {
    fn snapshot(&self) -> (usize, Option<Rgb888>) {
        *self.0.lock()
    }
}

impl Renderer for FrameLog {
    fn present(&mut self, canvas: &Canvas) -> Result<()> {
        let mut log = self.0.lock();
        log.0 += 1;
        log.1 = canvas.pixel(12, 12);
        Ok(())
    }
}

#[test]
fn burst_of_shows_between_ticks_redraws_once_with_the_latest() {
    const TICK: Duration = Duration::from_millis(500);
    let log = FrameLog::default();
    let strip = LedStrip::new(16);
    let viewer = strip
        .begin_with_config(log.clone(), steady_config().with_frame_rate(2))
        .unwrap();
    assert!(wait_for_state(&strip, ViewerState::Running));
    let (initial_frames, _) = log.snapshot();
    assert_eq!(initial_frames, 1);

    let burst_start = Instant::now();
    for step in 0..=250_u8 {
        strip.set_pixel_color_rgb(0, step, 0, 0).unwrap();
        strip.show();
    }
    std::thread::sleep(TICK * 3);
    let elapsed = burst_start.elapsed();

    let (frames, newest) = log.snapshot();
    let redraws = frames - initial_frames;
    let ticks = usize::try_from(elapsed.as_millis() / TICK.as_millis()).unwrap();
    assert!(redraws >= 1, "the burst was never drawn");
    assert!(
        redraws <= ticks + 1,
        "{redraws} redraws in {ticks} ticks for 251 shows"
    );
    assert_eq!(newest, Some(Rgb888::new(250, 0, 0)));
    viewer.join().unwrap();
}
