// src/hal/mock.rs

//! 测试用的记录型传输层

use std::collections::{HashMap, VecDeque};

use super::transport::{PinMode, PinState, Transport};
use crate::common::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SetMode(u8, PinMode),
    Write(u8, PinState),
    Read(u8, PinState),
    SpiOpen(u8, u32),
    Spi(Vec<u8>),
    Delay(u32),
}

/// 记录所有调用；输入引脚读数和 SPI 短写可预先编排
#[derive(Debug, Default)]
pub struct RecordingTransport {
    pub events: Vec<Event>,
    /// 每个输入引脚依次返回的读数，耗尽后返回低电平
    pub reads: HashMap<u8, VecDeque<PinState>>,
    /// 下一次 SPI 写最多接受的字节数
    pub short_write: Option<usize>,
    /// 下一次 SPI 写返回错误
    pub fail_spi: bool,
}

impl RecordingTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_reads(&mut self, pin: u8, levels: impl IntoIterator<Item = PinState>) {
        self.reads.entry(pin).or_default().extend(levels);
    }

    /// 所有 SPI 写出的字节块
    pub fn spi_writes(&self) -> Vec<&[u8]> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Spi(bytes) => Some(bytes.as_slice()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Transport for RecordingTransport {
    fn gpio_set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), TransportError> {
        self.events.push(Event::SetMode(pin, mode));
        Ok(())
    }

    fn gpio_write(&mut self, pin: u8, level: PinState) -> Result<(), TransportError> {
        self.events.push(Event::Write(pin, level));
        Ok(())
    }

    fn gpio_read(&mut self, pin: u8) -> Result<PinState, TransportError> {
        let level = self
            .reads
            .get_mut(&pin)
            .and_then(VecDeque::pop_front)
            .unwrap_or(PinState::Low);
        self.events.push(Event::Read(pin, level));
        Ok(level)
    }

    fn spi_open(&mut self, channel: u8, speed_hz: u32) -> Result<(), TransportError> {
        self.events.push(Event::SpiOpen(channel, speed_hz));
        Ok(())
    }

    fn spi_write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        if std::mem::take(&mut self.fail_spi) {
            return Err(TransportError::Spi("scripted failure".into()));
        }
        let accepted = match self.short_write.take() {
            Some(limit) => limit.min(bytes.len()),
            None => bytes.len(),
        };
        self.events.push(Event::Spi(bytes[..accepted].to_vec()));
        Ok(accepted)
    }

    fn delay_ms(&mut self, ms: u32) {
        self.events.push(Event::Delay(ms));
    }
}
