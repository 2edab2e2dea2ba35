//! Conversion of raw register values into physical quantities.
//!
//! All functions are pure. A denominator close to zero, `alpha + md` for the
//! temperature or `y` for the pressure, only happens with corrupt calibration
//! data and yields a non-finite result rather than an error.

use crate::calibration::{Constants, Oversampling};

/// Exponent of the international barometric formula.
const BAROMETRIC_EXPONENT: f64 = 5.255;

/// Scale height of the barometric formula in meters.
const BAROMETRIC_HEIGHT_M: f64 = 44_330.0;

/// Uncompensated temperature as read from 0xF6..=0xF7.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawTemperature(pub u16);

impl RawTemperature {
    pub fn from_bytes(msb: u8, lsb: u8) -> Self {
        Self(u16::from_be_bytes([msb, lsb]))
    }

    pub fn value(&self) -> u16 {
        self.0
    }
}

/// Uncompensated pressure as read from 0xF6..=0xF8, together with the
/// oversampling setting that produced it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawPressure {
    pub msb: u8,
    pub lsb: u8,
    xlsb: u8,
    pub oversampling: Oversampling,
}

impl RawPressure {
    pub fn new(msb: u8, lsb: u8, xlsb: u8, oversampling: Oversampling) -> Self {
        Self {
            msb,
            lsb,
            xlsb,
            oversampling,
        }
    }

    /// XLSB restricted to the bits that are valid at the oversampling setting.
    pub fn xlsb(&self) -> u8 {
        self.xlsb & self.oversampling.xlsb_mask()
    }
}

/// Compensated temperature in degrees Celsius.
pub fn temperature_celsius(raw: u16, k: &Constants) -> f64 {
    let alpha = k.c5 * (f64::from(raw) - k.c6);
    alpha + k.mc / (alpha + k.md)
}

/// Compensated pressure in millibar (hPa).
///
/// `temperature` is the compensated temperature in degrees Celsius measured
/// right before the pressure.
pub fn pressure_mbar(temperature: f64, msb: u8, lsb: u8, xlsb: u8, k: &Constants) -> f64 {
    let s = temperature - 25.0;
    let x = k.x2 * s * s + k.x1 * s + k.x0;
    let y = k.y2 * s * s + k.y1 * s + k.y0;
    let pu = f64::from(msb) * 256.0 + f64::from(lsb) + f64::from(xlsb) / 256.0;
    let z = (pu - x) / y;
    k.p2 * z * z + k.p1 * z + k.p0
}

/// Pressure reduced to sea level for a station at `altitude_m` meters.
pub fn sea_level_pressure(pressure: f64, altitude_m: f64) -> f64 {
    pressure / libm::pow(1.0 - altitude_m / BAROMETRIC_HEIGHT_M, BAROMETRIC_EXPONENT)
}

/// Altitude in meters at which `pressure` is measured, given the pressure at
/// sea level. Inverse of [`sea_level_pressure`].
pub fn altitude(pressure: f64, sea_level: f64) -> f64 {
    BAROMETRIC_HEIGHT_M * (1.0 - libm::pow(pressure / sea_level, 1.0 / BAROMETRIC_EXPONENT))
}
