//! Strip-type identifiers.
//!
//! Real drivers use these to pick a channel order and bit timing. The simulator
//! accepts them through [`StripOptions::strip_type`](super::StripOptions::strip_type)
//! so call sites compile unchanged; they carry no behavior.

/// SK6812 RGBW strip.
pub const SK6812_STRIP_RGBW: i32 = 0;

/// SK6812 white-only strip.
pub const SK6812W_STRIP: i32 = 1;
