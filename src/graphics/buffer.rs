//! 帧缓冲区管理（1bit/像素，PBM位序）
//!
//! 每行占 `pitch = ceil(width / 8)` 字节，行与行之间没有额外填充。
//! 字节内最高位对应离行首最近的像素，置 1 表示黑色；
//! 设备上黑白电平的差异由各显示驱动在输出时处理。

use std::ops::Deref;

use embedded_graphics::{pixelcolor::BinaryColor, prelude::*};

use crate::common::error::GraphicsError;

pub type GraphicsResult<T> = core::result::Result<T, GraphicsError>;

/// 给定宽度下每行所需字节数
pub const fn pitch_for(width: u16) -> usize {
    (width as usize).div_ceil(8)
}

/// 只读位图访问接口
///
/// `Framebuffer`（拥有存储）和 `FrameView`（借用存储）都实现该接口，
/// 均可作为 [`Framebuffer::blit`] 的源。
pub trait Bitmap {
    /// 像素宽度
    fn width(&self) -> u16;

    /// 像素高度
    fn height(&self) -> u16;

    /// 原始字节，长度为 `pitch() * height()`
    fn as_bytes(&self) -> &[u8];

    /// 每行字节数
    fn pitch(&self) -> usize {
        pitch_for(self.width())
    }

    /// 读取像素，`true` 表示黑色
    fn get_pixel(&self, x: u16, y: u16) -> GraphicsResult<bool> {
        let (index, mask) = locate(self.width(), self.height(), x, y)?;
        Ok(self.as_bytes()[index] & mask != 0)
    }
}

/// 计算像素所在字节下标与位掩码
fn locate(width: u16, height: u16, x: u16, y: u16) -> GraphicsResult<(usize, u8)> {
    if x >= width || y >= height {
        return Err(GraphicsError::OutOfRange {
            x,
            y,
            width: 1,
            height: 1,
            bound_w: width,
            bound_h: height,
        });
    }
    let index = y as usize * pitch_for(width) + x as usize / 8;
    Ok((index, 0x80 >> (x % 8)))
}

fn check_dimensions(width: u16, height: u16) -> GraphicsResult<()> {
    if width == 0 || height == 0 {
        return Err(GraphicsError::InvalidDimensions { width, height });
    }
    Ok(())
}

/// 帧缓冲区（拥有存储）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Framebuffer {
    width: u16,
    height: u16,
    buffer: Vec<u8>,
}

impl Framebuffer {
    /// 创建全白帧缓冲区
    ///
    /// # 参数
    /// - `width`: 像素宽度，必须大于 0
    /// - `height`: 像素高度，必须大于 0
    ///
    /// # 返回值
    /// - `GraphicsResult<Framebuffer>`: 尺寸为 0 时返回 `InvalidDimensions`
    pub fn new(width: u16, height: u16) -> GraphicsResult<Self> {
        check_dimensions(width, height)?;
        Ok(Self {
            width,
            height,
            buffer: vec![0x00; pitch_for(width) * height as usize],
        })
    }

    /// 用现有字节构造帧缓冲区，长度必须恰好为 `pitch * height`
    pub fn from_bytes(width: u16, height: u16, bytes: Vec<u8>) -> GraphicsResult<Self> {
        check_dimensions(width, height)?;
        let expected = pitch_for(width) * height as usize;
        if bytes.len() != expected {
            return Err(GraphicsError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            buffer: bytes,
        })
    }

    /// 借用为只读视图
    pub fn view(&self) -> FrameView<'_> {
        FrameView {
            width: self.width,
            height: self.height,
            bytes: &self.buffer,
        }
    }

    /// 将像素置为黑色
    pub fn set_pixel(&mut self, x: u16, y: u16) -> GraphicsResult<()> {
        let (index, mask) = locate(self.width, self.height, x, y)?;
        self.buffer[index] |= mask;
        Ok(())
    }

    /// 将像素置为白色
    pub fn clear_pixel(&mut self, x: u16, y: u16) -> GraphicsResult<()> {
        let (index, mask) = locate(self.width, self.height, x, y)?;
        self.buffer[index] &= !mask;
        Ok(())
    }

    /// 翻转像素
    pub fn toggle_pixel(&mut self, x: u16, y: u16) -> GraphicsResult<()> {
        let (index, mask) = locate(self.width, self.height, x, y)?;
        self.buffer[index] ^= mask;
        Ok(())
    }

    /// 清除缓冲区（填充白色）
    pub fn clear(&mut self) {
        self.buffer.fill(0x00);
    }

    /// 将源位图复制到 `(x, y)`，目标区域内原有像素被整体覆盖
    ///
    /// 源位图必须完全落在目标内（允许恰好贴边），否则返回 `OutOfRange`
    /// 且目标保持不变。`x` 不是 8 的倍数时，每个源字节拆分写入相邻两个目标字节；
    /// 源行末尾的填充位不会写入目标。
    pub fn blit<B: Bitmap + ?Sized>(&mut self, source: &B, x: u16, y: u16) -> GraphicsResult<()> {
        let src_width = source.width();
        let src_height = source.height();
        if x as u32 + src_width as u32 > self.width as u32
            || y as u32 + src_height as u32 > self.height as u32
        {
            return Err(GraphicsError::OutOfRange {
                x,
                y,
                width: src_width,
                height: src_height,
                bound_w: self.width,
                bound_h: self.height,
            });
        }

        let dest_pitch = pitch_for(self.width);
        let src_pitch = source.pitch();
        let shift = (x % 8) as u32;
        let src = source.as_bytes();

        for (row, src_row) in src.chunks_exact(src_pitch).take(src_height as usize).enumerate() {
            let mut out = (y as usize + row) * dest_pitch + x as usize / 8;
            for (i, &byte) in src_row.iter().enumerate() {
                // 本字节中有效像素数（1..=8）
                let valid = (src_width as usize - i * 8).min(8) as u32;
                let keep = 0xFFu8 << (8 - valid);
                let bits = byte & keep;

                let head = keep >> shift;
                self.buffer[out] = (self.buffer[out] & !head) | (bits >> shift);

                if shift != 0 {
                    let tail = keep << (8 - shift);
                    if tail != 0 {
                        self.buffer[out + 1] = (self.buffer[out + 1] & !tail) | (bits << (8 - shift));
                    }
                }
                out += 1;
            }
        }
        Ok(())
    }

    /// 复制源位图左上角 `width x height` 区域为新的帧缓冲区
    ///
    /// 用于去掉字体库输出位图行尾按整字节填充的列。
    pub fn crop_from<B: Bitmap + ?Sized>(
        source: &B,
        width: u16,
        height: u16,
    ) -> GraphicsResult<Self> {
        check_dimensions(width, height)?;
        if width > source.width() || height > source.height() {
            return Err(GraphicsError::OutOfRange {
                x: 0,
                y: 0,
                width,
                height,
                bound_w: source.width(),
                bound_h: source.height(),
            });
        }
        let pitch = pitch_for(width);
        let tail = match width % 8 {
            0 => 0xFF,
            bits => 0xFFu8 << (8 - bits),
        };
        let mut buffer = Vec::with_capacity(pitch * height as usize);
        for src_row in source.as_bytes().chunks_exact(source.pitch()).take(height as usize) {
            buffer.extend_from_slice(&src_row[..pitch]);
            if let Some(last) = buffer.last_mut() {
                *last &= tail;
            }
        }
        Ok(Self {
            width,
            height,
            buffer,
        })
    }

    /// 释放帧缓冲区，交出底层存储
    pub fn into_bytes(self) -> Vec<u8> {
        self.buffer
    }
}

impl Bitmap for Framebuffer {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn as_bytes(&self) -> &[u8] {
        &self.buffer
    }
}

impl Deref for Framebuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

/// 借用外部存储的只读位图（如字体库输出的字形位图）
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameView<'a> {
    width: u16,
    height: u16,
    bytes: &'a [u8],
}

impl<'a> FrameView<'a> {
    /// 包装外部字节
    ///
    /// # 返回值
    /// - 尺寸为 0：`InvalidDimensions`
    /// - 存储为空：`Uninitialized`
    /// - 长度不等于 `pitch * height`：`LengthMismatch`
    pub fn new(width: u16, height: u16, bytes: &'a [u8]) -> GraphicsResult<Self> {
        check_dimensions(width, height)?;
        if bytes.is_empty() {
            return Err(GraphicsError::Uninitialized);
        }
        let expected = pitch_for(width) * height as usize;
        if bytes.len() != expected {
            return Err(GraphicsError::LengthMismatch {
                expected,
                actual: bytes.len(),
            });
        }
        Ok(Self {
            width,
            height,
            bytes,
        })
    }
}

impl Bitmap for FrameView<'_> {
    fn width(&self) -> u16 {
        self.width
    }

    fn height(&self) -> u16 {
        self.height
    }

    fn as_bytes(&self) -> &[u8] {
        self.bytes
    }
}

impl OriginDimensions for Framebuffer {
    fn size(&self) -> Size {
        Size::new(self.width as u32, self.height as u32)
    }
}

impl DrawTarget for Framebuffer {
    type Color = BinaryColor;
    type Error = core::convert::Infallible;

    fn draw_iter<I>(&mut self, pixels: I) -> Result<(), Self::Error>
    where
        I: IntoIterator<Item = Pixel<Self::Color>>,
    {
        for Pixel(point, color) in pixels {
            let (Ok(x), Ok(y)) = (u16::try_from(point.x), u16::try_from(point.y)) else {
                continue;
            };
            // 超出范围的像素直接裁剪
            let _ = match color {
                BinaryColor::On => self.set_pixel(x, y),
                BinaryColor::Off => self.clear_pixel(x, y),
            };
        }
        Ok(())
    }
}
