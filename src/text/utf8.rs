// src/text/utf8.rs

//! 流式 UTF-8 解码
//!
//! 逐字节读取输入，每次产出一个码点。非法字节序列不会中断解码，
//! 而是产出 [`Decoded::Replacement`]；只有读到文件末尾或在多字节序列中途
//! 遇到文件结束时才停止。

use std::io::{self, Read};
use std::iter::FusedIterator;

use log::{debug, warn};

use crate::common::error::DecodeError;

/// U+FFFD，非法序列的替换字符
pub const REPLACEMENT_CHARACTER: u32 = 0xFFFD;

/// U+25A1，字体缺字时显示的方块
pub const WHITE_SQUARE: u32 = 0x25A1;

/// 以首字节高 5 位为下标的序列长度表，0 表示不能作为首字节
const SEQUENCE_LENGTH: [u8; 32] = [
    1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, 1, // 0xxxxxxx
    0, 0, 0, 0, 0, 0, 0, 0, // 10xxxxxx
    2, 2, 2, 2, // 110xxxxx
    3, 3, // 1110xxxx
    4, // 11110xxx
    0, // 11111xxx
];

/// 各长度序列可表示的最小码点，用于拒绝超长编码
const MIN_CODEPOINT: [u32; 5] = [0, 0, 0x80, 0x800, 0x1_0000];

/// 单次解码结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decoded {
    Codepoint(u32),
    /// 非法序列，调用方应显示 U+FFFD
    Replacement,
    EndOfFile,
}

impl Decoded {
    /// 需要显示的码点，`EndOfFile` 返回 `None`
    pub fn codepoint(self) -> Option<u32> {
        match self {
            Decoded::Codepoint(cp) => Some(cp),
            Decoded::Replacement => Some(REPLACEMENT_CHARACTER),
            Decoded::EndOfFile => None,
        }
    }
}

/// 由首字节得到序列长度
pub fn sequence_length(lead: u8) -> Option<usize> {
    match SEQUENCE_LENGTH[(lead >> 3) as usize] {
        0 => None,
        len => Some(len as usize),
    }
}

/// 组合一个完整序列，非法时返回 `None`
fn decode_sequence(seq: &[u8]) -> Option<u32> {
    let len = seq.len();
    let lead_mask = if len == 1 { 0x7F } else { 0xFFu8 >> (len + 1) };
    let mut cp = (seq[0] & lead_mask) as u32;
    for &byte in &seq[1..] {
        if byte & 0xC0 != 0x80 {
            return None;
        }
        cp = (cp << 6) | (byte & 0x3F) as u32;
    }
    if cp < MIN_CODEPOINT[len] || (0xD800..=0xDFFF).contains(&cp) || cp > 0x10_FFFF {
        return None;
    }
    Some(cp)
}

/// 从字节流逐个解码码点
pub struct Utf8Decoder<R> {
    reader: R,
    offset: u64,
    /// 迭代器已遇到文件结束或错误
    finished: bool,
}

impl<R: Read> Utf8Decoder<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            offset: 0,
            finished: false,
        }
    }

    /// 已消费的字节数
    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn into_inner(self) -> R {
        self.reader
    }

    /// 解码下一个码点
    ///
    /// # 返回值
    /// - `Ok(Decoded::EndOfFile)`: 在序列边界处读到文件末尾
    /// - `Ok(Decoded::Replacement)`: 非法首字节或非法序列
    /// - `Err(DecodeError::Truncated)`: 多字节序列中途文件结束
    /// - `Err(DecodeError::Io)`: 读取失败
    pub fn next_codepoint(&mut self) -> Result<Decoded, DecodeError> {
        let start = self.offset;
        let mut seq = [0u8; 4];

        // 1. 首字节
        if !self.read_byte(&mut seq[0])? {
            return Ok(Decoded::EndOfFile);
        }
        let Some(len) = sequence_length(seq[0]) else {
            warn!("Invalid UTF-8 lead byte 0x{:02X} at offset {}", seq[0], start);
            return Ok(Decoded::Replacement);
        };

        // 2. 后续字节
        for read in 1..len {
            if !self.read_byte(&mut seq[read])? {
                debug!("Input truncated at offset {} inside {}-byte sequence", self.offset, len);
                return Err(DecodeError::Truncated {
                    expected: len,
                    read,
                });
            }
        }

        // 3. 组合码点
        match decode_sequence(&seq[..len]) {
            Some(cp) => Ok(Decoded::Codepoint(cp)),
            None => {
                warn!("Invalid UTF-8 sequence {:02X?} at offset {}", &seq[..len], start);
                Ok(Decoded::Replacement)
            }
        }
    }

    /// 读取一个字节，文件结束时返回 `false`
    fn read_byte(&mut self, out: &mut u8) -> Result<bool, DecodeError> {
        loop {
            match self.reader.read(std::slice::from_mut(out)) {
                Ok(0) => return Ok(false),
                Ok(_) => {
                    self.offset += 1;
                    return Ok(true);
                }
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }
    }
}

/// 文件结束或第一次出错之后只返回 `None`
impl<R: Read> Iterator for Utf8Decoder<R> {
    type Item = Result<u32, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        match self.next_codepoint() {
            Ok(Decoded::EndOfFile) => {
                self.finished = true;
                None
            }
            Ok(decoded) => decoded.codepoint().map(Ok),
            Err(e) => {
                self.finished = true;
                Some(Err(e))
            }
        }
    }
}

impl<R: Read> FusedIterator for Utf8Decoder<R> {}
