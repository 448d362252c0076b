//! 诊断图案：点阵网格与二进制计数块

use super::buffer::{Bitmap, FrameView, Framebuffer, GraphicsResult};

/// 网格点间距（像素）
pub const GRID_STEP: u16 = 5;

/// 16x16 计数图案，第 r 行的两个字节均为 r
pub const BINARY_PATTERN: [u8; 32] = [
    0x00, 0x00, 0x01, 0x01, 0x02, 0x02, 0x03, 0x03, 0x04, 0x04, 0x05, 0x05, 0x06, 0x06, 0x07, 0x07,
    0x08, 0x08, 0x09, 0x09, 0x0A, 0x0A, 0x0B, 0x0B, 0x0C, 0x0C, 0x0D, 0x0D, 0x0E, 0x0E, 0x0F, 0x0F,
];

/// 计数图案的默认位置
pub const BINARY_PATTERN_ORIGIN: (u16, u16) = (2, 250);

/// 每隔 `step` 像素画一个黑点
pub fn draw_grid(fb: &mut Framebuffer, step: u16) -> GraphicsResult<()> {
    let step = step.max(1) as usize;
    for y in (0..fb.height()).step_by(step) {
        for x in (0..fb.width()).step_by(step) {
            fb.set_pixel(x, y)?;
        }
    }
    Ok(())
}

/// 把计数图案复制到 `(x, y)`
pub fn draw_binary_pattern(fb: &mut Framebuffer, x: u16, y: u16) -> GraphicsResult<()> {
    let pattern = FrameView::new(16, 16, &BINARY_PATTERN)?;
    fb.blit(&pattern, x, y)
}

/// 绘制完整诊断页面
pub fn draw_diagnostics(fb: &mut Framebuffer) -> GraphicsResult<()> {
    draw_grid(fb, GRID_STEP)?;
    let (x, y) = BINARY_PATTERN_ORIGIN;
    draw_binary_pattern(fb, x, y)
}
