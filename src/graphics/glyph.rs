//! 字形：单个字符的位图与排版度量

use super::buffer::{Bitmap, Framebuffer};

/// 字形度量（像素）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GlyphMetrics {
    /// 绘制后光标前进量
    pub advance: u16,
    /// 基线到位图顶行的距离，向上为正
    pub baseline: i16,
    /// 光标到位图左列的水平偏移
    pub bearing: i16,
    /// 位图中实际有墨的宽度（不含行尾填充）
    pub width: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Glyph {
    bitmap: Option<Framebuffer>,
    metrics: GlyphMetrics,
}

impl Glyph {
    /// `metrics.width` 小于位图宽度时，位图裁剪到有墨宽度
    pub fn new(bitmap: Framebuffer, metrics: GlyphMetrics) -> Self {
        let bitmap = if metrics.width > 0 && metrics.width < bitmap.width() {
            Framebuffer::crop_from(&bitmap, metrics.width, bitmap.height()).unwrap_or(bitmap)
        } else {
            bitmap
        };
        Self {
            bitmap: Some(bitmap),
            metrics,
        }
    }

    /// 没有像素的字形（空格等），只推进光标
    pub fn blank(advance: u16) -> Self {
        Self {
            bitmap: None,
            metrics: GlyphMetrics {
                advance,
                ..GlyphMetrics::default()
            },
        }
    }

    pub fn bitmap(&self) -> Option<&Framebuffer> {
        self.bitmap.as_ref()
    }

    pub fn metrics(&self) -> GlyphMetrics {
        self.metrics
    }

    pub fn advance(&self) -> u16 {
        self.metrics.advance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn padded_bitmap_cropped_to_ink_width() {
        let padded = Framebuffer::from_bytes(16, 1, vec![0xF0, 0x0F]).unwrap();
        let glyph = Glyph::new(
            padded,
            GlyphMetrics {
                advance: 5,
                width: 4,
                ..GlyphMetrics::default()
            },
        );
        let bitmap = glyph.bitmap().unwrap();
        assert_eq!(bitmap.width(), 4);
        assert_eq!(bitmap.as_bytes(), &[0xF0]);
    }

    #[test]
    fn zero_width_metrics_keep_bitmap() {
        let bitmap = Framebuffer::from_bytes(8, 1, vec![0xFF]).unwrap();
        let glyph = Glyph::new(bitmap, GlyphMetrics::default());
        assert_eq!(glyph.bitmap().map(Bitmap::width), Some(8));
    }
}
