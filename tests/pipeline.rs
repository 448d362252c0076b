//! 端到端：解码 -> 缓存 -> 排版 -> 模拟器输出

use std::fs;

use epd_reader::app::reader::{show_pattern, show_text};
use epd_reader::common::config::{AppConfig, LayoutConfig};
use epd_reader::driver::display::{
    DeviceState, DisplayDriver, SimulatorEpdDriver, create_display_driver,
};
use epd_reader::graphics::buffer::{Bitmap, FrameView};
use epd_reader::graphics::pattern::BINARY_PATTERN;
use epd_reader::graphics::text::MonoFontRasterizer;

const HEADER: &[u8] = b"P4 128 296\n";
const FRAME_LEN: usize = 16 * 296;

#[test]
fn text_page_lands_in_pbm_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("display.pbm");
    let mut driver = SimulatorEpdDriver::new(&path, 128, 296);
    let mut rasterizer = MonoFontRasterizer::new(10).unwrap();

    let stats = show_text(
        &mut driver,
        &mut rasterizer,
        "builtin-mono",
        10,
        "Hello, e-paper!\nSecond line \u{FFFD}".as_bytes(),
        LayoutConfig::default(),
    )
    .unwrap();

    assert_eq!(driver.state(), DeviceState::Off);
    assert_eq!(stats.lines, 2);
    // 空格不计入已放置字形
    assert_eq!(stats.placed, 14 + 11);

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[..HEADER.len()], HEADER);
    let frame = &bytes[HEADER.len()..];
    assert_eq!(frame.len(), FRAME_LEN);

    let page = FrameView::new(128, 296, frame).unwrap();
    let inked_rows: Vec<u16> = (0..296)
        .filter(|&y| (0..128).any(|x| page.get_pixel(x, y).unwrap()))
        .collect();
    // 两行文字，均位于页边距之内
    assert!(inked_rows.first().copied().unwrap() >= 4);
    assert!(inked_rows.last().copied().unwrap() < 4 + 2 * 10 + 2);
    assert!((0..128).all(|x| (40..296).all(|y| !page.get_pixel(x, y).unwrap())));
}

#[test]
fn invalid_bytes_still_produce_a_page() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("display.pbm");
    let mut driver = SimulatorEpdDriver::new(&path, 128, 296);
    let mut rasterizer = MonoFontRasterizer::new(16).unwrap();

    let stats = show_text(
        &mut driver,
        &mut rasterizer,
        "builtin-mono",
        16,
        &[b'o', 0xC3, b'k', 0x80][..],
        LayoutConfig::default(),
    )
    .unwrap();

    assert_eq!(stats.replaced, 2);
    assert_eq!(fs::read(&path).unwrap().len(), HEADER.len() + FRAME_LEN);
}

#[test]
fn truncated_text_leaves_header_only_and_device_off() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("display.pbm");
    let mut driver = SimulatorEpdDriver::new(&path, 128, 296);
    let mut rasterizer = MonoFontRasterizer::new(16).unwrap();

    let result = show_text(
        &mut driver,
        &mut rasterizer,
        "builtin-mono",
        16,
        &[b'a', 0xE4, 0xB8][..],
        LayoutConfig::default(),
    );

    assert!(result.is_err());
    assert_eq!(driver.state(), DeviceState::Off);
    assert_eq!(fs::read(&path).unwrap(), HEADER);
}

#[test]
fn diagnostic_pattern_through_configured_backend() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = AppConfig::default();
    config.device.output = dir.path().join("pattern.pbm");

    let mut driver = create_display_driver(&config).unwrap();
    show_pattern(driver.as_mut()).unwrap();

    let bytes = fs::read(&config.device.output).unwrap();
    let page = FrameView::new(128, 296, &bytes[HEADER.len()..]).unwrap();
    assert!(page.get_pixel(0, 0).unwrap());
    assert!(page.get_pixel(5, 5).unwrap());
    assert!(!page.get_pixel(1, 0).unwrap());

    let expected = FrameView::new(16, 16, &BINARY_PATTERN).unwrap();
    for y in 0..16 {
        for x in 0..16 {
            assert_eq!(
                page.get_pixel(2 + x, 250 + y).unwrap(),
                expected.get_pixel(x, y).unwrap(),
                "pattern pixel ({x}, {y})"
            );
        }
    }
}
