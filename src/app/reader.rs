//! 阅读器：解码文本、排版一页并送到显示设备
//!
//! 排版只做逐字放置：遇到换行符或行宽不足时换行，页面写满即停止。
//! 显示流程无论成功与否都会尝试关闭设备，帧缓冲区与字形缓存随作用域释放。

use std::io::Read;

use log::{debug, error, info, warn};

use crate::common::config::LayoutConfig;
use crate::common::error::{AppError, GraphicsError, RasterError, Result};
use crate::driver::display::{DeviceState, DisplayDriver};
use crate::graphics::buffer::{Bitmap, Framebuffer};
use crate::graphics::cache::GlyphCache;
use crate::graphics::glyph::Glyph;
use crate::graphics::pattern;
use crate::graphics::text::Rasterizer;
use crate::text::utf8::{Decoded, REPLACEMENT_CHARACTER, Utf8Decoder, WHITE_SQUARE};

/// 排版结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageStatus {
    /// 文本已全部读完
    EndOfText,
    /// 页面已写满，剩余文本未读取
    PageFull,
}

/// 排版统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ComposeStats {
    /// 放置到页面上的字形数
    pub placed: usize,
    /// 以替换字符显示的非法序列数
    pub replaced: usize,
    /// 因缺字或超出页面而跳过的码点数
    pub skipped: usize,
    /// 已使用的行数
    pub lines: usize,
}

/// 页面排版器
pub struct PageComposer {
    layout: LayoutConfig,
    line_height: u16,
    ascent: u16,
    cursor_x: u16,
    line_top: u16,
    stats: ComposeStats,
}

impl PageComposer {
    /// # 参数
    /// - `layout`: 页边距与行距
    /// - `line_height`: 字体行高
    /// - `ascent`: 行顶到基线的距离
    pub fn new(layout: LayoutConfig, line_height: u16, ascent: u16) -> Self {
        Self {
            layout,
            line_height: line_height.max(1),
            ascent,
            cursor_x: layout.margin,
            line_top: layout.margin,
            stats: ComposeStats::default(),
        }
    }

    pub fn stats(&self) -> ComposeStats {
        self.stats
    }

    /// 从解码器读取码点并排版到 `page`，直到文本结束或页面写满
    pub fn compose<R, Z>(
        &mut self,
        decoder: &mut Utf8Decoder<R>,
        cache: &mut GlyphCache,
        rasterizer: &mut Z,
        page: &mut Framebuffer,
    ) -> Result<PageStatus>
    where
        R: Read,
        Z: Rasterizer + ?Sized,
    {
        if !self.line_fits(page) {
            warn!("Page too small for a single line of text");
            return Ok(PageStatus::PageFull);
        }
        self.stats.lines = self.stats.lines.max(1);

        loop {
            let codepoint = match decoder.next_codepoint()? {
                Decoded::Codepoint(cp) => cp,
                Decoded::Replacement => {
                    self.stats.replaced += 1;
                    REPLACEMENT_CHARACTER
                }
                Decoded::EndOfFile => {
                    debug!("End of text at byte {}", decoder.offset());
                    return Ok(PageStatus::EndOfText);
                }
            };

            let codepoint = match codepoint {
                0x0A => {
                    if !self.new_line(page) {
                        return Ok(PageStatus::PageFull);
                    }
                    continue;
                }
                0x09 => 0x20,
                cp if cp < 0x20 || cp == 0x7F => continue,
                cp => cp,
            };

            let Some(codepoint) = Self::resolve(codepoint, cache, rasterizer)? else {
                self.stats.skipped += 1;
                continue;
            };
            let Some(glyph) = cache.get(codepoint) else {
                continue;
            };
            if !self.place(glyph, page)? {
                return Ok(PageStatus::PageFull);
            }
        }
    }

    /// 确保码点（或缺字方块）已缓存，返回实际要绘制的码点
    fn resolve<Z: Rasterizer + ?Sized>(
        codepoint: u32,
        cache: &mut GlyphCache,
        rasterizer: &mut Z,
    ) -> Result<Option<u32>> {
        match cache.ensure(codepoint, rasterizer) {
            Ok(()) => return Ok(Some(codepoint)),
            Err(RasterError::MissingGlyph(_)) if codepoint != WHITE_SQUARE => {
                debug!("No glyph for U+{:04X}, falling back to U+25A1", codepoint);
            }
            Err(RasterError::MissingGlyph(_)) => {}
            Err(e) => return Err(e.into()),
        }
        match cache.ensure(WHITE_SQUARE, rasterizer) {
            Ok(()) => Ok(Some(WHITE_SQUARE)),
            Err(RasterError::MissingGlyph(_)) => {
                warn!("No glyph for U+{:04X} and no fallback, skipping", codepoint);
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn line_fits(&self, page: &Framebuffer) -> bool {
        self.line_top as u32 + self.line_height as u32 + self.layout.margin as u32
            <= page.height() as u32
    }

    /// 换行，页面已满时返回 `false`
    fn new_line(&mut self, page: &Framebuffer) -> bool {
        self.cursor_x = self.layout.margin;
        self.line_top = self
            .line_top
            .saturating_add(self.line_height)
            .saturating_add(self.layout.line_spacing);
        if !self.line_fits(page) {
            return false;
        }
        self.stats.lines += 1;
        true
    }

    /// 在光标处放置字形，页面已满时返回 `false`
    fn place(&mut self, glyph: &Glyph, page: &mut Framebuffer) -> Result<bool> {
        let advance = glyph.advance();
        let metrics = glyph.metrics();
        // 位图可能比 advance 更宽，按两者中较远的右边界判断换行
        let extent = glyph.bitmap().map_or(advance as i32, |bitmap| {
            (advance as i32).max(metrics.bearing as i32 + bitmap.width() as i32)
        });
        let right = page.width().saturating_sub(self.layout.margin);
        let overflows = self.cursor_x as i32 + extent > right as i32;
        if self.cursor_x > self.layout.margin && overflows && !self.new_line(page) {
            return Ok(false);
        }

        if let Some(bitmap) = glyph.bitmap() {
            let x = (self.cursor_x as i32 + metrics.bearing as i32).max(0) as u16;
            let baseline = self.line_top as i32 + self.ascent as i32;
            let y = (baseline - metrics.baseline as i32).max(0) as u16;
            match page.blit(bitmap, x, y) {
                Ok(()) => self.stats.placed += 1,
                Err(GraphicsError::OutOfRange { .. }) => {
                    warn!(
                        "Glyph {}x{} at ({}, {}) does not fit the page, skipping",
                        bitmap.width(),
                        bitmap.height(),
                        x,
                        y
                    );
                    self.stats.skipped += 1;
                }
                Err(e) => return Err(e.into()),
            }
        }

        self.cursor_x = self.cursor_x.saturating_add(advance);
        Ok(true)
    }
}

/// 在设备打开期间执行 `work`，结束后总是尝试关闭设备
fn with_device<T>(
    driver: &mut dyn DisplayDriver,
    work: impl FnOnce(&mut dyn DisplayDriver) -> Result<T>,
) -> Result<T> {
    // 1. 上电
    driver.power_on()?;

    // 2. 执行
    let result = work(&mut *driver);

    // 3. 关闭
    let off = if driver.state() != DeviceState::Off {
        driver.power_off().map_err(AppError::from)
    } else {
        Ok(())
    };

    match (result, off) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(e)) => {
            error!("Failed to power off display: {}", e);
            Err(e)
        }
        (Err(e), Ok(())) => Err(e),
        (Err(e), Err(off_err)) => {
            error!("Failed to power off display after error: {}", off_err);
            Err(e)
        }
    }
}

/// 排版一页文本并显示
///
/// # 参数
/// - `driver`: 显示设备
/// - `rasterizer`: 字形栅格化器
/// - `font_name`/`font_size`: 字形缓存所属字体
/// - `text`: UTF-8 文本
/// - `layout`: 排版参数
pub fn show_text<R: Read>(
    driver: &mut dyn DisplayDriver,
    rasterizer: &mut dyn Rasterizer,
    font_name: &str,
    font_size: u32,
    text: R,
    layout: LayoutConfig,
) -> Result<ComposeStats> {
    let (width, height) = driver.dimensions();
    let mut page = Framebuffer::new(width, height)?;
    let mut cache = GlyphCache::new(font_name, font_size)?;
    let mut decoder = Utf8Decoder::new(text);
    let mut composer = PageComposer::new(layout, rasterizer.line_height(), rasterizer.ascent());

    with_device(driver, |driver| {
        let status = composer.compose(&mut decoder, &mut cache, rasterizer, &mut page)?;
        let stats = composer.stats();
        info!(
            "Composed page ({:?}): {} glyphs on {} lines, {} replaced, {} skipped",
            status, stats.placed, stats.lines, stats.replaced, stats.skipped
        );
        let cache_stats = cache.stats();
        debug!(
            "Glyph cache: {} entries, {} hits, {} misses",
            cache_stats.entries, cache_stats.hits, cache_stats.misses
        );

        driver.display(&page)?;
        Ok(stats)
    })
}

/// 显示诊断图案
pub fn show_pattern(driver: &mut dyn DisplayDriver) -> Result<()> {
    let (width, height) = driver.dimensions();
    let mut page = Framebuffer::new(width, height)?;
    with_device(driver, |driver| {
        pattern::draw_diagnostics(&mut page)?;
        info!("Displaying diagnostic pattern");
        driver.display(&page)?;
        Ok(())
    })
}
