//! 字形缓存
//!
//! 固定 255 个桶的链式哈希表，桶号为 `codepoint % 255`，
//! 同一桶内按插入顺序保存条目。缓存与单一字体（名称+像素大小）绑定，
//! 条目一经插入在缓存存活期间保持不变，直到整个缓存被清空或释放。

use std::cell::Cell;

use log::{debug, warn};

use super::glyph::Glyph;
use super::text::Rasterizer;
use crate::common::error::{CacheError, RasterError};

/// 哈希桶数量
pub const BUCKET_COUNT: usize = 255;

/// 缓存所属字体
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontSpec {
    pub name: String,
    pub size: u32,
}

#[derive(Debug)]
struct CacheEntry {
    codepoint: u32,
    glyph: Glyph,
    hits: Cell<u64>,
}

/// 缓存统计
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub longest_chain: usize,
}

#[derive(Debug)]
pub struct GlyphCache {
    font: FontSpec,
    table: Vec<Vec<CacheEntry>>,
    misses: Cell<u64>,
}

impl GlyphCache {
    /// 为指定字体创建空缓存
    ///
    /// # 参数
    /// - `font_name`: 字体名称（通常为字体文件路径）
    /// - `font_size`: 像素大小，必须大于 0
    pub fn new(font_name: impl Into<String>, font_size: u32) -> Result<Self, CacheError> {
        if font_size == 0 {
            return Err(CacheError::InvalidFontSize(font_size));
        }
        let font = FontSpec {
            name: font_name.into(),
            size: font_size,
        };
        debug!("Creating glyph cache for {} @ {}px", font.name, font.size);
        Ok(Self {
            font,
            table: (0..BUCKET_COUNT).map(|_| Vec::new()).collect(),
            misses: Cell::new(0),
        })
    }

    pub fn font(&self) -> &FontSpec {
        &self.font
    }

    /// 码点对应的桶号
    pub fn bucket_of(codepoint: u32) -> usize {
        codepoint as usize % BUCKET_COUNT
    }

    fn position(&self, codepoint: u32) -> Option<(usize, usize)> {
        let bucket = Self::bucket_of(codepoint);
        self.table[bucket]
            .iter()
            .position(|entry| entry.codepoint == codepoint)
            .map(|index| (bucket, index))
    }

    /// 查找已缓存字形，命中时累加该条目的命中计数
    pub fn lookup(&self, codepoint: u32) -> Option<&Glyph> {
        match self.position(codepoint) {
            Some((bucket, index)) => {
                let entry = &self.table[bucket][index];
                entry.hits.set(entry.hits.get() + 1);
                Some(&entry.glyph)
            }
            None => {
                self.misses.set(self.misses.get() + 1);
                None
            }
        }
    }

    /// 查找已缓存字形，不计入命中或未命中统计
    pub fn get(&self, codepoint: u32) -> Option<&Glyph> {
        self.position(codepoint)
            .map(|(bucket, index)| &self.table[bucket][index].glyph)
    }

    pub fn contains(&self, codepoint: u32) -> bool {
        self.position(codepoint).is_some()
    }

    /// 插入字形并返回缓存内的引用
    ///
    /// 码点已存在时拒绝插入，原条目保持不变。
    pub fn insert(&mut self, codepoint: u32, glyph: Glyph) -> Result<&Glyph, CacheError> {
        if self.contains(codepoint) {
            warn!("Glyph U+{:04X} already cached, keeping existing entry", codepoint);
            return Err(CacheError::AlreadyCached(codepoint));
        }
        Ok(self.push(codepoint, glyph))
    }

    fn push(&mut self, codepoint: u32, glyph: Glyph) -> &Glyph {
        let chain = &mut self.table[Self::bucket_of(codepoint)];
        chain.push(CacheEntry {
            codepoint,
            glyph,
            hits: Cell::new(0),
        });
        let entry = &chain[chain.len() - 1];
        &entry.glyph
    }

    /// 确保码点已缓存，未缓存时调用栅格化器生成
    ///
    /// 已缓存计一次命中，需要栅格化计一次未命中。
    /// 栅格化失败时缓存条目不变，错误原样返回。
    pub fn ensure<R: Rasterizer + ?Sized>(
        &mut self,
        codepoint: u32,
        rasterizer: &mut R,
    ) -> Result<(), RasterError> {
        if let Some((bucket, index)) = self.position(codepoint) {
            let entry = &self.table[bucket][index];
            entry.hits.set(entry.hits.get() + 1);
            return Ok(());
        }
        self.misses.set(self.misses.get() + 1);
        let glyph = rasterizer.rasterize(codepoint)?;
        debug!("Rasterized glyph U+{:04X}", codepoint);
        self.push(codepoint, glyph);
        Ok(())
    }

    /// 查找字形，未命中时栅格化并插入
    pub fn get_or_rasterize<R: Rasterizer + ?Sized>(
        &mut self,
        codepoint: u32,
        rasterizer: &mut R,
    ) -> Result<&Glyph, RasterError> {
        self.ensure(codepoint, rasterizer)?;
        self.get(codepoint)
            .ok_or(RasterError::MissingGlyph(codepoint))
    }

    pub fn len(&self) -> usize {
        self.table.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.table.iter().all(Vec::is_empty)
    }

    /// 某码点的命中次数
    pub fn hits(&self, codepoint: u32) -> Option<u64> {
        self.position(codepoint)
            .map(|(bucket, index)| self.table[bucket][index].hits.get())
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len(),
            hits: self
                .table
                .iter()
                .flatten()
                .map(|entry| entry.hits.get())
                .sum(),
            misses: self.misses.get(),
            longest_chain: self.table.iter().map(Vec::len).max().unwrap_or(0),
        }
    }

    /// 释放所有条目
    pub fn clear(&mut self) {
        self.table.iter_mut().for_each(Vec::clear);
        self.misses.set(0);
    }
}

impl Drop for GlyphCache {
    fn drop(&mut self) {
        let stats = self.stats();
        debug!(
            "Dropping glyph cache for {}: {} entries, {} hits, {} misses",
            self.font.name, stats.entries, stats.hits, stats.misses
        );
    }
}
