//! 文字栅格化
//!
//! `Rasterizer` 把码点转换为 [`Glyph`]。启用 `freetype` 特性时使用 freetype-rs
//! 渲染字体文件，否则使用 embedded-graphics 自带的 ISO-8859-1 点阵字体。

use embedded_graphics::{
    mono_font::{MonoFont, MonoTextStyle, iso_8859_1},
    pixelcolor::BinaryColor,
    prelude::*,
    text::{Baseline, Text},
};
use log::info;

use super::buffer::Framebuffer;
use super::glyph::{Glyph, GlyphMetrics};
use crate::common::config::FontConfig;
use crate::common::error::RasterError;
use crate::text::utf8::{REPLACEMENT_CHARACTER, WHITE_SQUARE};

/// 字形栅格化接口
pub trait Rasterizer {
    /// 渲染单个码点
    ///
    /// # 返回值
    /// - 字体中没有该字符时返回 `RasterError::MissingGlyph`
    fn rasterize(&mut self, codepoint: u32) -> Result<Glyph, RasterError>;

    /// 行高（像素）
    fn line_height(&self) -> u16;

    /// 行顶到基线的距离（像素）
    fn ascent(&self) -> u16;
}

/// 内置点阵字体，按像素高度由小到大排列
const MONO_FONTS: [&MonoFont<'static>; 9] = [
    &iso_8859_1::FONT_4X6,
    &iso_8859_1::FONT_5X8,
    &iso_8859_1::FONT_6X10,
    &iso_8859_1::FONT_6X13,
    &iso_8859_1::FONT_8X13,
    &iso_8859_1::FONT_7X14,
    &iso_8859_1::FONT_9X15,
    &iso_8859_1::FONT_9X18,
    &iso_8859_1::FONT_10X20,
];

/// 基于 embedded-graphics 点阵字体的栅格化器
pub struct MonoFontRasterizer {
    font: &'static MonoFont<'static>,
}

impl MonoFontRasterizer {
    /// 选择高度不超过 `size` 的最大内置字体
    pub fn new(size: u32) -> Result<Self, RasterError> {
        if size == 0 {
            return Err(RasterError::InvalidFontSize(size));
        }
        let font = MONO_FONTS
            .iter()
            .rev()
            .find(|font| font.character_size.height <= size)
            .copied()
            .unwrap_or(MONO_FONTS[0]);
        info!(
            "Using built-in {}x{} mono font for size {}",
            font.character_size.width, font.character_size.height, size
        );
        Ok(Self { font })
    }

    pub fn font(&self) -> &'static MonoFont<'static> {
        self.font
    }

    fn advance(&self) -> u16 {
        (self.font.character_size.width + self.font.character_spacing) as u16
    }
}

impl Rasterizer for MonoFontRasterizer {
    fn rasterize(&mut self, codepoint: u32) -> Result<Glyph, RasterError> {
        // 替换字符与缺字方块在 Latin-1 字体中都以问号显示
        let c = match codepoint {
            REPLACEMENT_CHARACTER | WHITE_SQUARE => '?',
            0x20..=0x7E | 0xA0..=0xFF => {
                char::from_u32(codepoint).ok_or(RasterError::MissingGlyph(codepoint))?
            }
            _ => return Err(RasterError::MissingGlyph(codepoint)),
        };
        if c.is_whitespace() {
            return Ok(Glyph::blank(self.advance()));
        }

        let size = self.font.character_size;
        let mut bitmap = Framebuffer::new(size.width as u16, size.height as u16)?;
        let mut utf8 = [0u8; 4];
        let style = MonoTextStyle::new(self.font, BinaryColor::On);
        Text::with_baseline(c.encode_utf8(&mut utf8), Point::zero(), style, Baseline::Top)
            .draw(&mut bitmap)
            .map_err(|never| -> RasterError { match never {} })?;

        Ok(Glyph::new(
            bitmap,
            GlyphMetrics {
                advance: self.advance(),
                baseline: self.font.baseline as i16,
                bearing: 0,
                width: size.width as u16,
            },
        ))
    }

    fn line_height(&self) -> u16 {
        self.font.character_size.height as u16
    }

    fn ascent(&self) -> u16 {
        self.font.baseline as u16
    }
}

#[cfg(feature = "freetype")]
pub use self::freetype_font::FreeTypeRasterizer;

#[cfg(feature = "freetype")]
mod freetype_font {
    use std::path::Path;

    use freetype::bitmap::PixelMode;
    use freetype::face::{Face, LoadFlag};
    use freetype::library::Library;
    use log::{debug, error, info};

    use super::Rasterizer;
    use crate::common::error::RasterError;
    use crate::graphics::buffer::{FrameView, Framebuffer};
    use crate::graphics::glyph::{Glyph, GlyphMetrics};

    fn font_error(err: freetype::Error) -> RasterError {
        RasterError::Font(err.to_string())
    }

    /// 基于 freetype-rs 的单色栅格化器
    pub struct FreeTypeRasterizer {
        face: Face,
        // 与 face 同生命周期
        _library: Library,
        size: u32,
    }

    impl FreeTypeRasterizer {
        /// 加载字体文件
        ///
        /// # 参数
        /// - `path`: 字体文件路径
        /// - `size`: 像素大小，必须大于 0
        pub fn new<P: AsRef<Path>>(path: P, size: u32) -> Result<Self, RasterError> {
            if size == 0 {
                return Err(RasterError::InvalidFontSize(size));
            }
            let path = path.as_ref();
            info!("Loading font {} @ {}px", path.display(), size);

            // 1. 初始化库并加载字体
            let library = Library::init().map_err(font_error)?;
            let face = library.new_face(path, 0).map_err(|e| {
                error!("Failed to load font {}: {}", path.display(), e);
                font_error(e)
            })?;

            // 2. 设置像素大小
            face.set_pixel_sizes(0, size).map_err(font_error)?;

            Ok(Self {
                face,
                _library: library,
                size,
            })
        }
    }

    impl Rasterizer for FreeTypeRasterizer {
        fn rasterize(&mut self, codepoint: u32) -> Result<Glyph, RasterError> {
            let glyph_index = match self.face.get_char_index(codepoint as usize) {
                Some(index) if index != 0 => index,
                _ => return Err(RasterError::MissingGlyph(codepoint)),
            };
            self.face
                .load_glyph(
                    glyph_index,
                    LoadFlag::RENDER | LoadFlag::MONOCHROME | LoadFlag::TARGET_MONO,
                )
                .map_err(font_error)?;

            let slot = self.face.glyph();
            let bitmap = slot.bitmap();
            let advance = (slot.advance().x >> 6).max(0) as u16;

            match bitmap.pixel_mode() {
                Ok(PixelMode::Mono) => {}
                Ok(PixelMode::Gray) | Ok(PixelMode::Gray2) | Ok(PixelMode::Gray4) => {
                    return Err(RasterError::UnsupportedPixelMode("gray".into()));
                }
                Ok(_) => return Err(RasterError::UnsupportedPixelMode("color".into())),
                Err(e) => return Err(font_error(e)),
            }

            let pitch = bitmap.pitch();
            if pitch < 0 {
                return Err(RasterError::NegativePitch(pitch));
            }
            let rows = bitmap.rows();
            let width = bitmap.width();
            if rows <= 0 || width <= 0 || pitch == 0 {
                debug!("Glyph U+{:04X} has no pixels", codepoint);
                return Ok(Glyph::blank(advance));
            }

            // 字体库按 pitch 整字节存行，裁掉行尾填充列
            let view = FrameView::new((pitch * 8) as u16, rows as u16, bitmap.buffer())?;
            let owned = Framebuffer::crop_from(&view, width as u16, rows as u16)?;

            Ok(Glyph::new(
                owned,
                GlyphMetrics {
                    advance,
                    baseline: slot.bitmap_top() as i16,
                    bearing: slot.bitmap_left() as i16,
                    width: width as u16,
                },
            ))
        }

        fn line_height(&self) -> u16 {
            self.face
                .size_metrics()
                .map(|metrics| (metrics.height >> 6) as u16)
                .unwrap_or(self.size as u16)
        }

        fn ascent(&self) -> u16 {
            self.face
                .size_metrics()
                .map(|metrics| (metrics.ascender >> 6) as u16)
                .unwrap_or(self.size as u16)
        }
    }
}

/// 根据字体配置创建栅格化器
///
/// 配置了字体文件且启用 `freetype` 特性时加载字体文件，否则使用内置点阵字体。
pub fn create_rasterizer(font: &FontConfig) -> Result<Box<dyn Rasterizer>, RasterError> {
    match &font.path {
        #[cfg(feature = "freetype")]
        Some(path) => Ok(Box::new(FreeTypeRasterizer::new(path, font.size)?)),
        #[cfg(not(feature = "freetype"))]
        Some(path) => {
            log::warn!(
                "Font {} ignored: built without the `freetype` feature",
                path.display()
            );
            Ok(Box::new(MonoFontRasterizer::new(font.size)?))
        }
        None => Ok(Box::new(MonoFontRasterizer::new(font.size)?)),
    }
}

/// 字体在缓存中的名称
pub fn font_name(font: &FontConfig) -> String {
    match &font.path {
        Some(path) => path.display().to_string(),
        None => "builtin-mono".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graphics::buffer::Bitmap;

    #[test]
    fn zero_size_rejected() {
        assert!(matches!(
            MonoFontRasterizer::new(0),
            Err(RasterError::InvalidFontSize(0))
        ));
    }

    #[test]
    fn picks_largest_font_that_fits() {
        assert_eq!(MonoFontRasterizer::new(16).unwrap().font().character_size.height, 15);
        assert_eq!(MonoFontRasterizer::new(10).unwrap().font().character_size.height, 10);
        assert_eq!(MonoFontRasterizer::new(3).unwrap().font().character_size.height, 6);
        assert_eq!(MonoFontRasterizer::new(64).unwrap().font().character_size.height, 20);
    }

    #[test]
    fn renders_ink_for_letters() {
        let mut raster = MonoFontRasterizer::new(10).unwrap();
        let glyph = raster.rasterize('A' as u32).unwrap();
        let bitmap = glyph.bitmap().unwrap();
        assert_eq!((bitmap.width(), bitmap.height()), (6, 10));
        assert!(bitmap.as_bytes().iter().any(|&b| b != 0));
        assert_eq!(glyph.advance(), 6);
    }

    #[test]
    fn space_is_blank() {
        let mut raster = MonoFontRasterizer::new(10).unwrap();
        let glyph = raster.rasterize(' ' as u32).unwrap();
        assert!(glyph.bitmap().is_none());
        assert_eq!(glyph.advance(), 6);
    }

    #[test]
    fn non_latin1_is_missing() {
        let mut raster = MonoFontRasterizer::new(10).unwrap();
        assert!(matches!(
            raster.rasterize(0x4E2D),
            Err(RasterError::MissingGlyph(0x4E2D))
        ));
        assert!(raster.rasterize(REPLACEMENT_CHARACTER).is_ok());
    }

    #[test]
    fn builtin_selected_without_font_path() {
        let raster = create_rasterizer(&FontConfig::default()).unwrap();
        assert!(raster.line_height() > 0);
        assert!(raster.ascent() <= raster.line_height());
        assert_eq!(font_name(&FontConfig::default()), "builtin-mono");
    }
}
