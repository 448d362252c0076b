// src/driver/display/command.rs

//! Waveshare 2.9 寸黑白屏控制器指令表

/// 控制器指令
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Command {
    /// 栅极数量与扫描方向
    DriverOutputControl = 0x01,
    /// 升压软启动
    BoosterSoftStartControl = 0x0C,
    /// 进入深度睡眠
    DeepSleepMode = 0x10,
    /// RAM 地址递增方向
    DataEntryModeSetting = 0x11,
    SwReset = 0x12,
    TemperatureSensorControl = 0x1A,
    /// 按 DisplayUpdateControl2 的设置执行刷新
    MasterActivation = 0x20,
    DisplayUpdateControl1 = 0x21,
    DisplayUpdateControl2 = 0x22,
    /// 之后的数据写入黑白 RAM
    WriteRam = 0x24,
    WriteVcomRegister = 0x2C,
    /// 30 字节波形表
    WriteLutRegister = 0x32,
    SetDummyLinePeriod = 0x3A,
    SetGateTime = 0x3B,
    BorderWaveformControl = 0x3C,
    SetRamXAddressStartEndPosition = 0x44,
    SetRamYAddressStartEndPosition = 0x45,
    SetRamXAddressCounter = 0x4E,
    SetRamYAddressCounter = 0x4F,
    /// 结束 RAM 读写
    TerminateFrameReadWrite = 0xFF,
}

impl Command {
    pub fn address(self) -> u8 {
        self as u8
    }
}

/// 全刷波形表
pub const LUT_FULL_UPDATE: [u8; 30] = [
    0x02, 0x02, 0x01, 0x11, 0x12, 0x12, 0x22, 0x22, 0x66, 0x69, 0x69, 0x59, 0x58, 0x99, 0x99,
    0x88, 0x00, 0x00, 0x00, 0x00, 0xF8, 0xB4, 0x13, 0x51, 0x35, 0x51, 0x51, 0x19, 0x01, 0x00,
];

pub const BOOSTER_SOFT_START: [u8; 3] = [0xD7, 0xD6, 0x9D];
pub const VCOM_VOLTAGE: [u8; 1] = [0xA8];
/// 每行 4 个哑行周期
pub const DUMMY_LINE_PERIOD: [u8; 1] = [0x1A];
/// 每行 2us
pub const GATE_TIME: [u8; 1] = [0x08];
pub const BORDER_WAVEFORM: [u8; 1] = [0x03];
/// X、Y 均递增
pub const DATA_ENTRY_MODE: [u8; 1] = [0x03];
/// 开时钟、开模拟、显示、关模拟、关时钟
pub const UPDATE_SEQUENCE: [u8; 1] = [0xC4];
pub const DEEP_SLEEP: [u8; 1] = [0x01];

/// DriverOutputControl 参数：栅极数 - 1（小端），扫描方向默认
pub fn driver_output(height: u16) -> [u8; 3] {
    let gates = height.saturating_sub(1);
    [(gates & 0xFF) as u8, (gates >> 8) as u8, 0x00]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn driver_output_encodes_gate_count() {
        assert_eq!(driver_output(296), [0x27, 0x01, 0x00]);
        assert_eq!(driver_output(1), [0x00, 0x00, 0x00]);
    }

    #[test]
    fn opcodes() {
        assert_eq!(Command::WriteRam.address(), 0x24);
        assert_eq!(Command::TerminateFrameReadWrite.address(), 0xFF);
        assert_eq!(Command::SetRamYAddressCounter.address(), 0x4F);
    }
}
