// src/driver/display/ws29bw.rs

//! Waveshare 2.9 寸黑白墨水屏驱动
//!
//! 通过 [`Transport`] 发送寄存器指令：DC 低电平表示指令、高电平表示数据，
//! 每次传输前后拉低/拉高 CS。BUSY 为高电平时控制器忙。

use log::{debug, error, info};

use super::command::{self, Command};
use super::{DeviceState, DisplayDriver, DisplayResult};
use crate::common::config::{BlackLevel, HardwareConfig};
use crate::common::error::DisplayError;
use crate::graphics::buffer::pitch_for;
use crate::hal::transport::{PinMode, PinState, Transport};

pub struct Ws29BwDriver<T: Transport> {
    transport: T,
    config: HardwareConfig,
    width: u16,
    height: u16,
    state: DeviceState,
    row: Vec<u8>,
}

impl<T: Transport> Ws29BwDriver<T> {
    /// 宽或高为 0 时返回 `InvalidDimensions`
    pub fn new(
        transport: T,
        config: HardwareConfig,
        width: u16,
        height: u16,
    ) -> DisplayResult<Self> {
        if width == 0 || height == 0 {
            error!("Refusing display of {}x{} pixels", width, height);
            return Err(DisplayError::InvalidDimensions { width, height });
        }
        Ok(Self {
            transport,
            config,
            width,
            height,
            state: DeviceState::Off,
            row: Vec::with_capacity(pitch_for(width)),
        })
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// 发送一字节指令
    fn write_command(&mut self, command: Command) -> DisplayResult<()> {
        self.transport.gpio_write(self.config.dc_pin, PinState::Low)?;
        self.transfer(&[command.address()])
    }

    /// 发送一段参数/像素数据
    fn write_data(&mut self, data: &[u8]) -> DisplayResult<()> {
        self.transport.gpio_write(self.config.dc_pin, PinState::High)?;
        self.transfer(data)
    }

    fn command_with_data(&mut self, command: Command, data: &[u8]) -> DisplayResult<()> {
        self.write_command(command)?;
        self.write_data(data)
    }

    fn transfer(&mut self, bytes: &[u8]) -> DisplayResult<()> {
        self.transport.gpio_write(self.config.cs_pin, PinState::Low)?;
        let written = self.transport.spi_write(bytes)?;
        self.transport.gpio_write(self.config.cs_pin, PinState::High)?;
        if written < bytes.len() {
            error!("SPI short write: {} of {} bytes", written, bytes.len());
            return Err(DisplayError::PartialWrite {
                written,
                expected: bytes.len(),
            });
        }
        Ok(())
    }

    /// 等待 BUSY 变为低电平
    fn wait_until_idle(&mut self) -> DisplayResult<()> {
        let mut polls = 0;
        while self.transport.gpio_read(self.config.busy_pin)? == PinState::High {
            if polls >= self.config.busy_poll_limit {
                error!("Display still busy after {} polls", polls);
                return Err(DisplayError::Busy { polls });
            }
            self.transport.delay_ms(self.config.busy_delay_ms);
            polls += 1;
        }
        Ok(())
    }

    /// 硬件复位：高-低-高，每步等待 `reset_delay_ms`
    fn pulse_reset(&mut self) -> DisplayResult<()> {
        let (pin, delay) = (self.config.rst_pin, self.config.reset_delay_ms);
        for level in [PinState::High, PinState::Low, PinState::High] {
            self.transport.gpio_write(pin, level)?;
            self.transport.delay_ms(delay);
        }
        Ok(())
    }

    fn init_registers(&mut self) -> DisplayResult<()> {
        self.command_with_data(Command::DriverOutputControl, &command::driver_output(self.height))?;
        self.command_with_data(Command::BoosterSoftStartControl, &command::BOOSTER_SOFT_START)?;
        self.command_with_data(Command::WriteVcomRegister, &command::VCOM_VOLTAGE)?;
        self.command_with_data(Command::SetDummyLinePeriod, &command::DUMMY_LINE_PERIOD)?;
        self.command_with_data(Command::SetGateTime, &command::GATE_TIME)?;
        self.command_with_data(Command::BorderWaveformControl, &command::BORDER_WAVEFORM)?;
        self.command_with_data(Command::DataEntryModeSetting, &command::DATA_ENTRY_MODE)?;
        self.command_with_data(Command::WriteLutRegister, &command::LUT_FULL_UPDATE)
    }

    /// 设置 RAM 窗口，X 以字节为单位，Y 为 16 位小端
    fn set_ram_window(
        &mut self,
        x_start: u16,
        x_end: u16,
        y_start: u16,
        y_end: u16,
    ) -> DisplayResult<()> {
        self.command_with_data(
            Command::SetRamXAddressStartEndPosition,
            &[(x_start >> 3) as u8, (x_end >> 3) as u8],
        )?;
        let [ys_lo, ys_hi] = y_start.to_le_bytes();
        let [ye_lo, ye_hi] = y_end.to_le_bytes();
        self.command_with_data(
            Command::SetRamYAddressStartEndPosition,
            &[ys_lo, ys_hi, ye_lo, ye_hi],
        )
    }

    fn set_ram_cursor(&mut self, x: u16, y: u16) -> DisplayResult<()> {
        self.command_with_data(Command::SetRamXAddressCounter, &[(x >> 3) as u8])?;
        self.command_with_data(Command::SetRamYAddressCounter, &y.to_le_bytes())
    }

    /// 逐行写入 RAM，按黑色电平转换字节
    fn write_frame(&mut self, bitmap: &[u8]) -> DisplayResult<()> {
        let pitch = pitch_for(self.width);
        let invert = self.config.black == BlackLevel::Low;
        let mut row = std::mem::take(&mut self.row);

        let mut result = Ok(());
        for (y, bytes) in bitmap.chunks_exact(pitch).enumerate() {
            row.clear();
            row.extend(bytes.iter().map(|&b| if invert { !b } else { b }));
            result = self
                .set_ram_cursor(0, y as u16)
                .and_then(|_| self.write_command(Command::WriteRam))
                .and_then(|_| self.write_data(&row));
            if result.is_err() {
                break;
            }
        }

        self.row = row;
        result
    }

    /// 触发刷新并等待完成
    fn refresh(&mut self) -> DisplayResult<()> {
        self.command_with_data(Command::DisplayUpdateControl2, &command::UPDATE_SEQUENCE)?;
        self.write_command(Command::MasterActivation)?;
        self.write_command(Command::TerminateFrameReadWrite)?;
        self.wait_until_idle()
    }

    fn bring_up(&mut self) -> DisplayResult<()> {
        // 1. 引脚方向
        let HardwareConfig {
            rst_pin,
            dc_pin,
            cs_pin,
            busy_pin,
            spi_channel,
            spi_clock_hz,
            ..
        } = self.config;
        for pin in [rst_pin, dc_pin, cs_pin] {
            self.transport.gpio_set_mode(pin, PinMode::Output)?;
        }
        self.transport.gpio_set_mode(busy_pin, PinMode::Input)?;

        // 2. SPI
        self.transport.spi_open(spi_channel, spi_clock_hz)?;

        // 3. 复位与寄存器初始化
        self.pulse_reset()?;
        self.init_registers()?;

        // 4. 全屏窗口
        self.set_ram_window(0, self.width.saturating_sub(1), 0, self.height.saturating_sub(1))
    }
}

impl<T: Transport> DisplayDriver for Ws29BwDriver<T> {
    fn power_on(&mut self) -> DisplayResult<()> {
        info!("Powering on Waveshare 2.9\" display");
        if self.state != DeviceState::Off {
            debug!("Display already powered on");
            return Ok(());
        }
        self.bring_up().map_err(|e| {
            error!("Failed to initialize display: {}", e);
            e
        })?;
        self.state = DeviceState::On;
        info!("EPD display initialized successfully");
        Ok(())
    }

    fn display(&mut self, bitmap: &[u8]) -> DisplayResult<()> {
        if self.state == DeviceState::Off {
            error!("display() called before power_on()");
            return Err(DisplayError::NotInitialized);
        }
        let expected = pitch_for(self.width) * self.height as usize;
        if bitmap.len() != expected {
            error!("Frame is {} bytes, display needs {}", bitmap.len(), expected);
            return Err(DisplayError::InvalidInput {
                expected,
                actual: bitmap.len(),
            });
        }

        self.state = DeviceState::Displaying;
        let result = self.write_frame(bitmap).and_then(|_| self.refresh());
        self.state = DeviceState::On;

        result.map_err(|e| {
            error!("Failed to update frame: {}", e);
            e
        })?;
        debug!("EPD frame updated and displayed");
        Ok(())
    }

    fn reset(&mut self) -> DisplayResult<()> {
        if self.state == DeviceState::Off {
            error!("reset() called before power_on()");
            return Err(DisplayError::NotInitialized);
        }
        debug!("Pulsing display reset line");
        self.pulse_reset()
    }

    fn power_off(&mut self) -> DisplayResult<()> {
        if self.state == DeviceState::Off {
            error!("power_off() called on a display that is not powered on");
            return Err(DisplayError::NotInitialized);
        }
        self.wait_until_idle()?;
        self.command_with_data(Command::DeepSleepMode, &command::DEEP_SLEEP)?;
        self.state = DeviceState::Off;
        info!("EPD entered deep sleep");
        Ok(())
    }

    fn dimensions(&self) -> (u16, u16) {
        (self.width, self.height)
    }

    fn state(&self) -> DeviceState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hal::mock::{Event, RecordingTransport};

    const DC: u8 = 25;
    const CS: u8 = 8;
    const RST: u8 = 17;
    const BUSY: u8 = 24;

    fn driver(width: u16, height: u16) -> Ws29BwDriver<RecordingTransport> {
        Ws29BwDriver::new(RecordingTransport::new(), HardwareConfig::default(), width, height)
            .unwrap()
    }

    fn powered(width: u16, height: u16) -> Ws29BwDriver<RecordingTransport> {
        let mut driver = driver(width, height);
        driver.power_on().unwrap();
        driver.transport_mut().clear();
        driver
    }

    /// 把事件流还原为 (指令, 数据块...) 序列
    fn commands(events: &[Event]) -> Vec<(u8, Vec<Vec<u8>>)> {
        let mut dc = PinState::High;
        let mut out: Vec<(u8, Vec<Vec<u8>>)> = Vec::new();
        for event in events {
            match event {
                Event::Write(DC, level) => dc = *level,
                Event::Spi(bytes) if dc == PinState::Low => out.push((bytes[0], Vec::new())),
                Event::Spi(bytes) => {
                    if let Some(last) = out.last_mut() {
                        last.1.push(bytes.clone());
                    }
                }
                _ => {}
            }
        }
        out
    }

    #[test]
    fn power_on_sequence() {
        let mut driver = driver(128, 296);
        driver.power_on().unwrap();
        assert_eq!(driver.state(), DeviceState::On);

        let events = &driver.transport().events;
        assert_eq!(events[0], Event::SetMode(RST, PinMode::Output));
        assert_eq!(events[3], Event::SetMode(BUSY, PinMode::Input));
        assert_eq!(events[4], Event::SpiOpen(0, 32_000_000));
        assert_eq!(
            &events[5..11],
            &[
                Event::Write(RST, PinState::High),
                Event::Delay(200),
                Event::Write(RST, PinState::Low),
                Event::Delay(200),
                Event::Write(RST, PinState::High),
                Event::Delay(200),
            ]
        );

        let cmds = commands(events);
        let opcodes: Vec<u8> = cmds.iter().map(|(op, _)| *op).collect();
        assert_eq!(
            opcodes,
            vec![0x01, 0x0C, 0x2C, 0x3A, 0x3B, 0x3C, 0x11, 0x32, 0x44, 0x45]
        );
        assert_eq!(cmds[0].1, vec![vec![0x27, 0x01, 0x00]]);
        assert_eq!(cmds[7].1[0].len(), 30);
        assert_eq!(cmds[8].1, vec![vec![0x00, 0x0F]]);
        assert_eq!(cmds[9].1, vec![vec![0x00, 0x00, 0x27, 0x01]]);
    }

    #[test]
    fn every_transfer_is_framed_by_chip_select() {
        let mut driver = powered(16, 2);
        driver.display(&[0; 4]).unwrap();
        let events = &driver.transport().events;
        for (i, event) in events.iter().enumerate() {
            if let Event::Spi(_) = event {
                assert_eq!(events[i - 1], Event::Write(CS, PinState::Low));
                assert_eq!(events[i + 1], Event::Write(CS, PinState::High));
            }
        }
    }

    #[test]
    fn display_writes_inverted_rows_then_refreshes() {
        let mut driver = powered(16, 2);
        driver.display(&[0x80, 0x00, 0xFF, 0x0F]).unwrap();
        assert_eq!(driver.state(), DeviceState::On);

        let cmds = commands(&driver.transport().events);
        let opcodes: Vec<u8> = cmds.iter().map(|(op, _)| *op).collect();
        assert_eq!(
            opcodes,
            vec![0x4E, 0x4F, 0x24, 0x4E, 0x4F, 0x24, 0x22, 0x20, 0xFF]
        );
        assert_eq!(cmds[1].1, vec![vec![0x00, 0x00]]);
        assert_eq!(cmds[2].1, vec![vec![0x7F, 0xFF]]);
        assert_eq!(cmds[4].1, vec![vec![0x01, 0x00]]);
        assert_eq!(cmds[5].1, vec![vec![0x00, 0xF0]]);
        assert_eq!(cmds[6].1, vec![vec![0xC4]]);
        assert_eq!(
            driver.transport().events.last(),
            Some(&Event::Read(BUSY, PinState::Low))
        );
    }

    #[test]
    fn active_high_black_is_sent_unchanged() {
        let config = HardwareConfig {
            black: BlackLevel::High,
            ..HardwareConfig::default()
        };
        let mut driver = Ws29BwDriver::new(RecordingTransport::new(), config, 8, 1).unwrap();
        driver.power_on().unwrap();
        driver.transport_mut().clear();
        driver.display(&[0x81]).unwrap();
        let cmds = commands(&driver.transport().events);
        assert_eq!(cmds[2].1, vec![vec![0x81]]);
    }

    #[test]
    fn display_requires_power_on() {
        let mut driver = driver(16, 2);
        assert!(matches!(
            driver.display(&[0; 4]),
            Err(DisplayError::NotInitialized)
        ));
        assert!(driver.transport().events.is_empty());
    }

    #[test]
    fn wrong_frame_length_rejected_before_transfer() {
        let mut driver = powered(16, 2);
        assert!(matches!(
            driver.display(&[0; 3]),
            Err(DisplayError::InvalidInput { expected: 4, actual: 3 })
        ));
        assert!(driver.transport().events.is_empty());
    }

    #[test]
    fn busy_wait_is_bounded() {
        let mut driver = powered(8, 1);
        driver
            .transport_mut()
            .script_reads(BUSY, std::iter::repeat(PinState::High).take(200));
        assert!(matches!(
            driver.display(&[0]),
            Err(DisplayError::Busy { polls: 100 })
        ));
        assert_eq!(driver.state(), DeviceState::On);
        let delays = driver
            .transport()
            .events
            .iter()
            .filter(|e| **e == Event::Delay(300))
            .count();
        assert_eq!(delays, 100);
    }

    #[test]
    fn busy_clears_after_a_few_polls() {
        let mut driver = powered(8, 1);
        driver
            .transport_mut()
            .script_reads(BUSY, [PinState::High, PinState::High, PinState::Low]);
        driver.display(&[0]).unwrap();
    }

    #[test]
    fn short_spi_write_is_partial_write() {
        let mut driver = powered(16, 1);
        driver.transport_mut().short_write = Some(0);
        assert!(matches!(
            driver.display(&[0, 0]),
            Err(DisplayError::PartialWrite { written: 0, expected: 1 })
        ));
        assert_eq!(driver.state(), DeviceState::On);
    }

    #[test]
    fn transport_failure_is_comms_error() {
        let mut driver = powered(8, 1);
        driver.transport_mut().fail_spi = true;
        assert!(matches!(driver.display(&[0]), Err(DisplayError::Comms(_))));
    }

    #[test]
    fn reset_pulses_only_when_on() {
        let mut off = driver(8, 1);
        assert!(matches!(off.reset(), Err(DisplayError::NotInitialized)));

        let mut on = powered(8, 1);
        on.reset().unwrap();
        let writes: Vec<&Event> = on
            .transport()
            .events
            .iter()
            .filter(|e| matches!(e, Event::Write(RST, _)))
            .collect();
        assert_eq!(writes.len(), 3);
    }

    #[test]
    fn power_off_enters_deep_sleep() {
        let mut driver = powered(8, 1);
        driver.power_off().unwrap();
        assert_eq!(driver.state(), DeviceState::Off);
        let cmds = commands(&driver.transport().events);
        assert_eq!(cmds, vec![(0x10, vec![vec![0x01]])]);
        assert!(matches!(driver.power_off(), Err(DisplayError::NotInitialized)));
    }

    #[test]
    fn zero_dimensions_rejected() {
        for (width, height) in [(0, 296), (128, 0)] {
            assert!(matches!(
                Ws29BwDriver::new(RecordingTransport::new(), HardwareConfig::default(), width, height),
                Err(DisplayError::InvalidDimensions { .. })
            ));
        }
    }

    #[test]
    fn frame_rows_are_streamed_inverted() {
        let mut driver = powered(16, 2);
        driver.display(&[0x00, 0xFF, 0x0F, 0xF0]).unwrap();
        let transport = driver.into_transport();
        let writes = transport.spi_writes();
        assert!(writes.contains(&&[0xFF, 0x00][..]));
        assert!(writes.contains(&&[0xF0, 0x0F][..]));
    }
}
