use crate::calibration::Oversampling;

/// Chip identification number, read from [`Register::ChipId`].
pub const BMP180_CHIP_ID: u8 = 0x55;

/// Start of conversion bit in [`Register::Control`]. Set while a conversion runs.
pub const SCO_BIT: u8 = 0x20;

/// Value written to [`Register::SoftReset`] to trigger a power-on reset.
pub const SOFT_RESET_VALUE: u8 = 0xB6;

/// Number of bytes in the calibration block.
pub const CALIBRATION_LEN: usize = 22;

/// BMP180 register map. Multi-byte values are big-endian and the register
/// pointer auto-increments on sequential access.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum Register {
    // 22 bytes up to 0xBF
    Calibration = 0xAA,
    ChipId = 0xD0,
    SoftReset = 0xE0,
    // Measurement control, bit 5 is SCO
    Control = 0xF4,
    OutMsb = 0xF6,
    OutLsb = 0xF7,
    OutXlsb = 0xF8,
}

pub enum Command {
    ReadTemperature,
    ReadPressure(Oversampling),
    SoftReset,
}

impl Command {
    /// Register the command byte is written to.
    pub fn register(&self) -> Register {
        match self {
            Command::ReadTemperature | Command::ReadPressure(_) => Register::Control,
            Command::SoftReset => Register::SoftReset,
        }
    }

    pub fn value(&self) -> u8 {
        match self {
            Command::ReadTemperature => 0x2E,
            Command::ReadPressure(oss) => 0x34 | (oss.value() << 6),
            Command::SoftReset => SOFT_RESET_VALUE,
        }
    }

    /// Minimum time in MICROSECONDS before the result may be read.
    pub fn delay_us(&self) -> u32 {
        match self {
            Command::ReadTemperature => 4_500,
            Command::ReadPressure(oss) => oss.conversion_time_us(),
            // start-up time after reset
            Command::SoftReset => 10_000,
        }
    }
}
