#![allow(missing_docs)]
use neopixel_sim::led_strip::{RGB8, ToRgb8, ToRgb888, color, color_rgbw, decode, white};
use embedded_graphics::pixelcolor::Rgb888;

#[test]
fn rgb888_to_rgb8_matches_rgb8() {
    let rgb8_color = RGB8::new(16, 32, 48);
    let rgb888_color = Rgb888::new(16, 32, 48);

    assert_eq!(rgb8_color, rgb888_color.to_rgb8());
}

#[test]
fn rgb8_to_rgb888_matches_rgb888() {
    let rgb8_color = RGB8::new(16, 32, 48);
    let rgb888_color = Rgb888::new(16, 32, 48);

    assert_eq!(rgb888_color, rgb8_color.to_rgb888());
}

#[test]
fn packed_color_converts_to_both_color_types() {
    let packed = color(16, 32, 48);

    assert_eq!(packed.to_rgb8(), RGB8::new(16, 32, 48));
    assert_eq!(packed.to_rgb888(), Rgb888::new(16, 32, 48));
}

#[test]
fn packing_places_channels_in_wrgb_order() {
    assert_eq!(color(0x12, 0x34, 0x56), 0x0012_3456);
    assert_eq!(color_rgbw(0x12, 0x34, 0x56, 0x78), 0x7812_3456);
    assert_eq!(color_rgbw(255, 255, 255, 255), u32::MAX);
}

#[test]
fn decode_recovers_rgb_and_drops_white() {
    for (red, green, blue, white_level) in [
        (0, 0, 0, 0),
        (255, 0, 0, 0),
        (0, 255, 0, 17),
        (0, 0, 255, 255),
        (1, 128, 254, 200),
    ] {
        let packed = color_rgbw(red, green, blue, white_level);
        assert_eq!(decode(packed), RGB8::new(red, green, blue));
        assert_eq!(white(packed), white_level);
    }
}
