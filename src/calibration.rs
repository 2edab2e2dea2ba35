use crate::bus::RegisterBus;
use crate::command::{Register, CALIBRATION_LEN};
use crate::error::Error;

/// Pressure oversampling setting (`oss`)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Oversampling {
    #[default]
    UltraLowPower,
    Standard,
    HighResolution,
    UltraHighResolution,
}

impl Oversampling {
    pub fn value(&self) -> u8 {
        match *self {
            Oversampling::UltraLowPower => 0,
            Oversampling::Standard => 1,
            Oversampling::HighResolution => 2,
            Oversampling::UltraHighResolution => 3,
        }
    }

    /// Gets the maximum conversion time in MICROSECONDS.
    pub fn conversion_time_us(&self) -> u32 {
        // 4.5 / 7.5 / 13.5 / 25.5 ms
        match *self {
            Oversampling::UltraLowPower => 4_500,
            Oversampling::Standard => 7_500,
            Oversampling::HighResolution => 13_500,
            Oversampling::UltraHighResolution => 25_500,
        }
    }

    /// Bits of the XLSB register that carry data at this setting.
    pub fn xlsb_mask(&self) -> u8 {
        !(0xFFu8 >> self.value())
    }
}

impl TryFrom<u8> for Oversampling {
    type Error = u8;

    fn try_from(oss: u8) -> Result<Self, Self::Error> {
        match oss {
            0 => Ok(Oversampling::UltraLowPower),
            1 => Ok(Oversampling::Standard),
            2 => Ok(Oversampling::HighResolution),
            3 => Ok(Oversampling::UltraHighResolution),
            other => Err(other),
        }
    }
}

/// Factory calibration data read from the EEPROM at 0xAA..=0xBF
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Calibration {
    pub ac1: i16,
    pub ac2: i16,
    pub ac3: i16,
    pub ac4: u16,
    pub ac5: u16,
    pub ac6: u16,
    pub b1: i16,
    pub b2: i16,
    // unused by the conversion
    pub mb: i16,
    pub mc: i16,
    pub md: i16,
}

impl Calibration {
    /// Reads the calibration block from the device.
    ///
    /// Every bit pattern is accepted, the values are not range checked.
    pub fn load<B: RegisterBus>(bus: &mut B) -> Result<Calibration, Error<B::Error>> {
        let mut buf = [0u8; CALIBRATION_LEN];
        bus.read_block(Register::Calibration as u8, &mut buf)
            .map_err(Error::Transport)?;
        Ok(Calibration::from_bytes(&buf))
    }

    /// Decodes the raw block, big-endian words in register order.
    pub fn from_bytes(buf: &[u8; CALIBRATION_LEN]) -> Calibration {
        let word = |i: usize| [buf[2 * i], buf[2 * i + 1]];
        Calibration {
            ac1: i16::from_be_bytes(word(0)),
            ac2: i16::from_be_bytes(word(1)),
            ac3: i16::from_be_bytes(word(2)),
            ac4: u16::from_be_bytes(word(3)),
            ac5: u16::from_be_bytes(word(4)),
            ac6: u16::from_be_bytes(word(5)),
            b1: i16::from_be_bytes(word(6)),
            b2: i16::from_be_bytes(word(7)),
            mb: i16::from_be_bytes(word(8)),
            mc: i16::from_be_bytes(word(9)),
            md: i16::from_be_bytes(word(10)),
        }
    }
}

/// Floating point coefficients derived once from [`Calibration`].
///
/// The closed-form polynomials reproduce the integer datasheet algorithm
/// without its intermediate truncation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Constants {
    pub c5: f64,
    pub c6: f64,
    pub mc: f64,
    pub md: f64,
    pub x0: f64,
    pub x1: f64,
    pub x2: f64,
    pub y0: f64,
    pub y1: f64,
    pub y2: f64,
    pub p0: f64,
    pub p1: f64,
    pub p2: f64,
}

const TWO_POW_M13: f64 = 1.0 / 8_192.0;
const TWO_POW_M15: f64 = 1.0 / 32_768.0;
const TWO_POW_M20: f64 = 1.0 / 1_048_576.0;
const TWO_POW_M25: f64 = 1.0 / 33_554_432.0;
const TWO_POW_M30: f64 = 1.0 / 1_073_741_824.0;
const TWO_POW_M36: f64 = 1.0 / 68_719_476_736.0;

impl Constants {
    pub fn derive(calib: &Calibration) -> Constants {
        let c3 = 160.0 * TWO_POW_M15 * f64::from(calib.ac3);
        let c4 = 0.001 * TWO_POW_M15 * f64::from(calib.ac4);
        let b1 = 160.0 * 160.0 * TWO_POW_M30 * f64::from(calib.b1);

        Constants {
            c5: TWO_POW_M15 / 160.0 * f64::from(calib.ac5),
            c6: f64::from(calib.ac6),
            mc: 2048.0 / (160.0 * 160.0) * f64::from(calib.mc),
            md: f64::from(calib.md) / 160.0,

            x0: f64::from(calib.ac1),
            x1: 160.0 * TWO_POW_M13 * f64::from(calib.ac2),
            x2: 160.0 * 160.0 * TWO_POW_M25 * f64::from(calib.b2),

            y0: c4 * 32768.0,
            y1: c4 * c3,
            y2: c4 * b1,

            p0: (3791.0 - 8.0) / 1600.0,
            p1: 1.0 - 7357.0 * TWO_POW_M20,
            p2: 3038.0 * 100.0 * TWO_POW_M36,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::emulator::{Emulator, REFERENCE_CALIBRATION};

    fn reference() -> Calibration {
        Calibration::from_bytes(&REFERENCE_CALIBRATION)
    }

    fn bits(k: &Constants) -> [u64; 13] {
        [
            k.c5, k.c6, k.mc, k.md, k.x0, k.x1, k.x2, k.y0, k.y1, k.y2, k.p0, k.p1, k.p2,
        ]
        .map(f64::to_bits)
    }

    #[test]
    fn decode_reference_block() {
        assert_eq!(
            reference(),
            Calibration {
                ac1: 7911,
                ac2: -934,
                ac3: -14306,
                ac4: 31567,
                ac5: 25671,
                ac6: 18974,
                b1: 5498,
                b2: 46,
                mb: -32768,
                mc: -11075,
                md: 2432,
            }
        );
    }

    #[test]
    fn unsigned_fields_keep_high_bit() {
        let mut block = [0u8; CALIBRATION_LEN];
        block[6..12].copy_from_slice(&[0xFF, 0xFE, 0x80, 0x00, 0x80, 0x01]);
        block[0..2].copy_from_slice(&[0xFF, 0xFE]);
        let calib = Calibration::from_bytes(&block);
        assert_eq!(calib.ac1, -2);
        assert_eq!(calib.ac4, 0xFFFE);
        assert_eq!(calib.ac5, 0x8000);
        assert_eq!(calib.ac6, 0x8001);
    }

    #[test]
    fn load_reads_calibration_register() {
        let mut emulator = Emulator::new();
        assert_eq!(Calibration::load(&mut emulator).unwrap(), reference());
    }

    #[test]
    fn derive_is_bit_reproducible() {
        let calib = reference();
        let first = Constants::derive(&calib);
        let second = Constants::derive(&calib);
        assert_eq!(bits(&first), bits(&second));
    }

    #[test]
    fn derive_reference_values() {
        let k = Constants::derive(&reference());
        assert!((k.c5 - 0.004_896_354_675).abs() < 1e-12);
        assert_eq!(k.c6, 18974.0);
        assert!((k.mc - -886.0).abs() < 1e-12);
        assert!((k.md - 15.2).abs() < 1e-12);
        assert_eq!(k.x0, 7911.0);
        assert!((k.y0 - 31.567).abs() < 1e-12);
        assert!((k.p0 - 2.364_375).abs() < 1e-12);
    }

    #[test]
    fn oversampling_from_setting() {
        assert_eq!(Oversampling::try_from(0u8), Ok(Oversampling::UltraLowPower));
        assert_eq!(Oversampling::try_from(3u8), Ok(Oversampling::UltraHighResolution));
        assert_eq!(Oversampling::try_from(4u8), Err(4));
    }

    #[test]
    fn xlsb_mask_grows_with_oversampling() {
        assert_eq!(Oversampling::UltraLowPower.xlsb_mask(), 0x00);
        assert_eq!(Oversampling::Standard.xlsb_mask(), 0x80);
        assert_eq!(Oversampling::HighResolution.xlsb_mask(), 0xC0);
        assert_eq!(Oversampling::UltraHighResolution.xlsb_mask(), 0xE0);
    }
}
