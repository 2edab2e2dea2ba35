//! An emulated BMP180 for tests and examples.
//!
//! [`Emulator`] implements [`RegisterBus`] on top of a 256 byte register file
//! and reacts to conversion commands the way the real chip does. Accesses the
//! chip would not accept are reported as [`EmulatorError`] values, never as
//! panics, so the emulator can stand in for a bus in any test.

use crate::bus::RegisterBus;
use crate::calibration::Oversampling;
use crate::command::{Register, BMP180_CHIP_ID, CALIBRATION_LEN, SCO_BIT, SOFT_RESET_VALUE};

/// Calibration block of the worked example in the BMP085 calculation notes.
pub const REFERENCE_CALIBRATION: [u8; CALIBRATION_LEN] = [
    0x1e, 0xe7, // ac1 = 7911
    0xfc, 0x5a, // ac2 = -934
    0xc8, 0x1e, // ac3 = -14306
    0x7b, 0x4f, // ac4 = 31567
    0x64, 0x47, // ac5 = 25671
    0x4a, 0x1e, // ac6 = 18974
    0x15, 0x7a, // b1 = 5498
    0x00, 0x2e, // b2 = 46
    0x80, 0x00, // mb = -32768
    0xd4, 0xbd, // mc = -11075
    0x09, 0x80, // md = 2432
];

/// Raw temperature of the worked example, 27116.
pub const REFERENCE_RAW_TEMPERATURE: u16 = 0x69EC;

/// Raw pressure of the worked example at the highest oversampling.
pub const REFERENCE_RAW_PRESSURE: [u8; 3] = [0x98, 0x2F, 0xC0];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum EmulatorError {
    /// The register is not readable (or not writable) on the chip.
    UnmappedRegister(u8),
    /// The access runs past register 0xFF.
    OutOfRange,
    /// The device was closed.
    Closed,
    /// Failure requested with [`Emulator::fail_on`].
    Injected(u8),
}

/// How long the SCO bit stays set after a conversion is started.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Busy {
    /// Conversion is complete by the first read.
    Never,
    /// The first `n` reads of the control register still see SCO set.
    Reads(u8),
    /// The conversion never completes.
    Forever,
}

/// In-memory BMP180 register file.
pub struct Emulator {
    memory: [u8; 256],
    pointer: u8,
    // last command written to the control register
    control: u8,
    raw_temperature: u16,
    raw_pressure: [u8; 3],
    busy: Busy,
    busy_left: Option<u8>,
    fail_on: Option<u8>,
    measurements: u32,
    control_reads: u32,
    closed: bool,
}

impl Default for Emulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Emulator {
    /// A chip programmed with the reference calibration and raw values.
    pub fn new() -> Self {
        let mut memory = [0u8; 256];
        memory[Register::ChipId as usize] = BMP180_CHIP_ID;
        let calib = Register::Calibration as usize;
        memory[calib..calib + CALIBRATION_LEN].copy_from_slice(&REFERENCE_CALIBRATION);

        Self {
            memory,
            pointer: 0,
            control: 0,
            raw_temperature: REFERENCE_RAW_TEMPERATURE,
            raw_pressure: REFERENCE_RAW_PRESSURE,
            busy: Busy::Never,
            busy_left: Some(0),
            fail_on: None,
            measurements: 0,
            control_reads: 0,
            closed: false,
        }
    }

    pub fn with_calibration(mut self, block: &[u8; CALIBRATION_LEN]) -> Self {
        let calib = Register::Calibration as usize;
        self.memory[calib..calib + CALIBRATION_LEN].copy_from_slice(block);
        self
    }

    pub fn with_chip_id(mut self, id: u8) -> Self {
        self.memory[Register::ChipId as usize] = id;
        self
    }

    pub fn with_raw_temperature(mut self, raw: u16) -> Self {
        self.raw_temperature = raw;
        self
    }

    /// Raw pressure at full resolution. Conversions at a lower oversampling
    /// setting only expose the XLSB bits valid at that setting.
    pub fn with_raw_pressure(mut self, raw: [u8; 3]) -> Self {
        self.raw_pressure = raw;
        self
    }

    pub fn with_busy(mut self, busy: Busy) -> Self {
        self.busy = busy;
        self
    }

    /// Fails every access touching `register`.
    pub fn fail_on(&mut self, register: u8) {
        self.fail_on = Some(register);
    }

    pub fn heal(&mut self) {
        self.fail_on = None;
    }

    /// Last command written to the control register.
    pub fn control(&self) -> u8 {
        self.control
    }

    /// Number of conversions started.
    pub fn measurements(&self) -> u32 {
        self.measurements
    }

    /// Number of reads that covered the control register.
    pub fn control_reads(&self) -> u32 {
        self.control_reads
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    fn check(&self, register: u8, len: usize) -> Result<(), EmulatorError> {
        if self.closed {
            return Err(EmulatorError::Closed);
        }
        let end = register as usize + len;
        if end > self.memory.len() {
            return Err(EmulatorError::OutOfRange);
        }
        match self.fail_on {
            Some(reg) if (register as usize..end).contains(&(reg as usize)) => {
                Err(EmulatorError::Injected(reg))
            }
            _ => Ok(()),
        }
    }

    fn readable(register: u8) -> bool {
        let calib = Register::Calibration as u8;
        register == Register::ChipId as u8
            || (calib..calib + CALIBRATION_LEN as u8).contains(&register)
            || (Register::Control as u8..=Register::OutXlsb as u8).contains(&register)
    }

    fn start_conversion(&mut self, command: u8) {
        self.control = command;
        self.measurements += 1;

        let out = Register::OutMsb as usize;
        if command == 0x2E {
            self.memory[out..out + 2].copy_from_slice(&self.raw_temperature.to_be_bytes());
        } else if command & 0x3F == 0x34 {
            let oss = Oversampling::try_from(command >> 6).unwrap_or_default();
            let [msb, lsb, xlsb] = self.raw_pressure;
            self.memory[out..out + 3].copy_from_slice(&[msb, lsb, xlsb & oss.xlsb_mask()]);
        }

        self.busy_left = match self.busy {
            Busy::Never => Some(0),
            Busy::Reads(n) => Some(n),
            Busy::Forever => None,
        };
        self.memory[Register::Control as usize] = self.control_value();
    }

    fn control_value(&self) -> u8 {
        match self.busy_left {
            Some(0) => self.control & !SCO_BIT,
            _ => self.control | SCO_BIT,
        }
    }

    fn soft_reset(&mut self) {
        self.control = 0;
        self.busy_left = Some(0);
        let control = Register::Control as usize;
        self.memory[control..=Register::OutXlsb as usize].fill(0);
    }
}

impl RegisterBus for Emulator {
    type Error = EmulatorError;

    fn read_block(&mut self, register: u8, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.check(register, buf.len())?;
        for offset in 0..buf.len() {
            let reg = register + offset as u8;
            if !Self::readable(reg) {
                return Err(EmulatorError::UnmappedRegister(reg));
            }
        }

        let start = register as usize;
        let control = Register::Control as usize;
        if (start..start + buf.len()).contains(&control) {
            self.control_reads += 1;
            self.memory[control] = self.control_value();
            if let Some(left) = self.busy_left.as_mut() {
                *left = left.saturating_sub(1);
            }
        }

        buf.copy_from_slice(&self.memory[start..start + buf.len()]);
        self.pointer = register.wrapping_add(buf.len() as u8);
        Ok(())
    }

    fn write_block(&mut self, register: u8, data: &[u8]) -> Result<(), Self::Error> {
        self.check(register, data.len())?;
        for (offset, &value) in data.iter().enumerate() {
            let reg = register + offset as u8;
            if reg == Register::Control as u8 {
                self.start_conversion(value);
            } else if reg == Register::SoftReset as u8 && value == SOFT_RESET_VALUE {
                self.soft_reset();
            } else if reg != Register::SoftReset as u8 {
                return Err(EmulatorError::UnmappedRegister(reg));
            }
        }
        self.pointer = register.wrapping_add(data.len() as u8);
        Ok(())
    }

    fn read(&mut self, buf: &mut [u8]) -> Result<(), Self::Error> {
        self.read_block(self.pointer, buf)
    }

    fn write(&mut self, data: &[u8]) -> Result<(), Self::Error> {
        self.write_block(self.pointer, data)
    }

    fn close(&mut self) -> Result<(), Self::Error> {
        self.closed = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chip_id() {
        let mut emulator = Emulator::new();
        let mut buf = [0u8; 1];
        emulator.read_block(0xD0, &mut buf).unwrap();
        assert_eq!(buf, [0x55]);
    }

    #[test]
    fn unmapped_register_is_an_error() {
        let mut emulator = Emulator::new();
        let mut buf = [0u8; 2];
        assert_eq!(
            emulator.read_block(0x10, &mut buf),
            Err(EmulatorError::UnmappedRegister(0x10))
        );
        assert_eq!(
            emulator.write_block(0xAA, &[0x00]),
            Err(EmulatorError::UnmappedRegister(0xAA))
        );
        assert_eq!(
            emulator.read_block(0xFE, &mut [0u8; 4]),
            Err(EmulatorError::OutOfRange)
        );
    }

    #[test]
    fn temperature_conversion_fills_result_registers() {
        let mut emulator = Emulator::new();
        emulator.write_block(0xF4, &[0x2E]).unwrap();
        assert_eq!(emulator.control(), 0x2E);
        let mut buf = [0u8; 2];
        emulator.read_block(0xF6, &mut buf).unwrap();
        assert_eq!(buf, [0x69, 0xEC]);
    }

    #[test]
    fn pressure_conversion_masks_xlsb() {
        let mut emulator = Emulator::new();
        emulator.write_block(0xF4, &[0x34]).unwrap();
        let mut buf = [0u8; 5];
        emulator.read_block(0xF4, &mut buf).unwrap();
        assert_eq!(buf, [0x14, 0x00, 0x98, 0x2F, 0x00]);

        emulator.write_block(0xF4, &[0xF4]).unwrap();
        emulator.read_block(0xF4, &mut buf).unwrap();
        assert_eq!(buf, [0xD4, 0x00, 0x98, 0x2F, 0xC0]);
        assert_eq!(emulator.measurements(), 2);
    }

    #[test]
    fn busy_bit_clears_after_reads() {
        let mut emulator = Emulator::new().with_busy(Busy::Reads(2));
        emulator.write_block(0xF4, &[0x74]).unwrap();
        let mut ctrl = [0u8; 1];
        emulator.read_block(0xF4, &mut ctrl).unwrap();
        assert_eq!(ctrl[0] & SCO_BIT, SCO_BIT);
        emulator.read_block(0xF4, &mut ctrl).unwrap();
        assert_eq!(ctrl[0] & SCO_BIT, SCO_BIT);
        emulator.read_block(0xF4, &mut ctrl).unwrap();
        assert_eq!(ctrl[0], 0x54);
        assert_eq!(emulator.control_reads(), 3);
    }

    #[test]
    fn implicit_pointer_continues() {
        let mut emulator = Emulator::new();
        let mut first = [0u8; 2];
        let mut second = [0u8; 2];
        emulator.read_block(0xAA, &mut first).unwrap();
        emulator.read(&mut second).unwrap();
        assert_eq!(first, [0x1e, 0xe7]);
        assert_eq!(second, [0xfc, 0x5a]);

        emulator.write_block(0xF4, &[0x2E]).unwrap();
        // pointer now sits on 0xF5, which is not writable
        assert_eq!(emulator.write(&[0x00]), Err(EmulatorError::UnmappedRegister(0xF5)));
    }

    #[test]
    fn soft_reset_clears_measurement() {
        let mut emulator = Emulator::new();
        emulator.write_block(0xF4, &[0x2E]).unwrap();
        emulator.write_block(0xE0, &[0xB6]).unwrap();
        assert_eq!(emulator.control(), 0);
        let mut buf = [0u8; 2];
        emulator.read_block(0xF6, &mut buf).unwrap();
        assert_eq!(buf, [0, 0]);
    }

    #[test]
    fn injected_and_closed_failures() {
        let mut emulator = Emulator::new();
        emulator.fail_on(0xF6);
        let mut buf = [0u8; 5];
        assert_eq!(
            emulator.read_block(0xF4, &mut buf),
            Err(EmulatorError::Injected(0xF6))
        );
        emulator.heal();
        emulator.read_block(0xF4, &mut buf).unwrap();

        emulator.close().unwrap();
        assert!(emulator.is_closed());
        assert_eq!(emulator.read_block(0xD0, &mut [0u8; 1]), Err(EmulatorError::Closed));
    }
}
