// src/hal/linux.rs

//! 嵌入式Linux平台的传输实现（sysfs GPIO + spidev）

use std::collections::HashMap;
use std::io::Write;

use embedded_hal::delay::DelayNs;
use linux_embedded_hal::spidev::{SpiModeFlags, Spidev, SpidevOptions};
use linux_embedded_hal::sysfs_gpio::Direction;
use linux_embedded_hal::{Delay, SysfsPin};
use log::{debug, info, warn};

use super::transport::{PinMode, PinState, Transport};
use crate::common::error::TransportError;

fn gpio_error(pin: u8, err: impl std::fmt::Display) -> TransportError {
    TransportError::Gpio {
        pin,
        message: err.to_string(),
    }
}

/// 基于 linux-embedded-hal 的传输层
///
/// 已导出的引脚在释放时取消导出。
pub struct LinuxTransport {
    pins: HashMap<u8, SysfsPin>,
    spi: Option<Spidev>,
    delay: Delay,
}

impl LinuxTransport {
    pub fn new() -> Self {
        info!("Initializing Linux transport");
        Self {
            pins: HashMap::new(),
            spi: None,
            delay: Delay,
        }
    }

    fn pin(&self, pin: u8) -> Result<&SysfsPin, TransportError> {
        self.pins.get(&pin).ok_or(TransportError::NotOpen("gpio"))
    }
}

impl Default for LinuxTransport {
    fn default() -> Self {
        Self::new()
    }
}

impl Transport for LinuxTransport {
    fn gpio_set_mode(&mut self, pin: u8, mode: PinMode) -> Result<(), TransportError> {
        if !self.pins.contains_key(&pin) {
            let gpio = SysfsPin::new(pin as u64);
            gpio.export().map_err(|e| gpio_error(pin, e))?;

            // 等待 GPIO 导出完成
            let mut attempts = 0;
            while !gpio.is_exported() {
                self.delay.delay_ms(10);
                attempts += 1;
                if attempts > 100 {
                    return Err(gpio_error(pin, "export timed out"));
                }
            }
            self.pins.insert(pin, gpio);
        }

        let direction = match mode {
            PinMode::Input => Direction::In,
            PinMode::Output => Direction::Out,
        };
        self.pin(pin)?
            .set_direction(direction)
            .map_err(|e| gpio_error(pin, e))?;
        debug!("GPIO {} set to {:?}", pin, mode);
        Ok(())
    }

    fn gpio_write(&mut self, pin: u8, level: PinState) -> Result<(), TransportError> {
        let value = match level {
            PinState::Low => 0,
            PinState::High => 1,
        };
        self.pin(pin)?
            .set_value(value)
            .map_err(|e| gpio_error(pin, e))
    }

    fn gpio_read(&mut self, pin: u8) -> Result<PinState, TransportError> {
        let value = self.pin(pin)?.get_value().map_err(|e| gpio_error(pin, e))?;
        Ok(PinState::from(value != 0))
    }

    fn spi_open(&mut self, channel: u8, speed_hz: u32) -> Result<(), TransportError> {
        let path = format!("/dev/spidev0.{}", channel);
        let mut spi = Spidev::open(&path)
            .map_err(|e| TransportError::Spi(format!("{}: {}", path, e)))?;
        let options = SpidevOptions::new()
            .bits_per_word(8)
            .max_speed_hz(speed_hz)
            .mode(SpiModeFlags::SPI_MODE_0)
            .build();
        spi.configure(&options)
            .map_err(|e| TransportError::Spi(e.to_string()))?;
        info!("Opened {} at {} Hz", path, speed_hz);
        self.spi = Some(spi);
        Ok(())
    }

    fn spi_write(&mut self, bytes: &[u8]) -> Result<usize, TransportError> {
        let spi = self.spi.as_mut().ok_or(TransportError::NotOpen("spi"))?;
        spi.write(bytes).map_err(|e| TransportError::Spi(e.to_string()))
    }

    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }
}

impl Drop for LinuxTransport {
    fn drop(&mut self) {
        // 取消导出GPIO
        for (pin, gpio) in self.pins.drain() {
            if let Err(e) = gpio.unexport() {
                warn!("Failed to unexport GPIO {}: {}", pin, e);
            }
        }
    }
}
