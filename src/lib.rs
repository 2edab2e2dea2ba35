//! Platform agnostic driver for the Bosch BMP180 (and BMP085) barometric
//! pressure and temperature sensor.
//!
//! The driver talks to the chip through a [`RegisterBus`]. Use [`I2cBus`] to
//! put it on any `embedded-hal` I²C bus, or the [`emulator`] to run without
//! hardware.
//!
//! ```
//! use bmp180::{emulator::Emulator, Bmp180, Oversampling};
//! use embedded_hal_mock::eh1::delay::NoopDelay;
//!
//! let mut bmp180 = Bmp180::new(Emulator::new(), NoopDelay::new()).unwrap();
//! assert_eq!(bmp180.id().unwrap(), 0x55);
//!
//! let t = bmp180.temperature().unwrap();
//! let p = bmp180.pressure(Oversampling::UltraHighResolution).unwrap();
//! let p0 = bmp180.pressure_at_sea_level(Oversampling::UltraHighResolution, 500.0).unwrap();
//! assert_eq!(format!("{:.3} {:.3} {:.3}", t, p, p0), "23.776 980.046 1040.241");
//! ```
//!
//! ## Features
//!
//! - `log`: log bus traffic with the `log` crate.
//! - `defmt`: log with `defmt` and derive `defmt::Format` for public types.
#![cfg_attr(not(test), no_std)]

#[cfg(all(feature = "defmt", feature = "log"))]
compile_error!("Features \"defmt\" and \"log\" are mutually exclusive and cannot be enabled together");

// This mod MUST go first, so that the others see its macros.
mod fmt;

pub mod bus;
pub mod calibration;
pub mod command;
mod config;
pub mod conversion;
pub mod emulator;
mod error;

use embedded_hal::delay::DelayNs;

pub use bus::{I2cBus, RegisterBus};
pub use calibration::{Calibration, Constants, Oversampling};
use command::{Command, Register, SCO_BIT};
pub use config::Config;
pub use conversion::{RawPressure, RawTemperature};
pub use error::Error;

/// Number of bytes read per pressure poll: control, 0xF5, MSB, LSB, XLSB.
const PRESSURE_FRAME_LEN: usize = 5;

pub struct Bmp180<B, D> {
    bus: B,
    delay: D,
    config: Config,
    calibration: Calibration,
    constants: Constants,
    // last compensated temperature, feeds the pressure compensation
    temperature: f64,
}

impl<B, D> Bmp180<B, D>
where
    B: RegisterBus,
    D: DelayNs,
{
    /// Opens the sensor with the default [`Config`].
    ///
    /// Reads the factory calibration and derives the conversion constants.
    /// The sensor takes exclusive ownership of the bus until [`release`](Self::release).
    pub fn new(bus: B, delay: D) -> Result<Self, Error<B::Error>> {
        Self::with_config(bus, delay, Config::default())
    }

    pub fn with_config(mut bus: B, delay: D, config: Config) -> Result<Self, Error<B::Error>> {
        let calibration = Calibration::load(&mut bus)?;
        debug!(
            "bmp180 calibration: ac1={} ac2={} ac3={} ac4={} ac5={} ac6={} b1={} b2={} mb={} mc={} md={}",
            calibration.ac1,
            calibration.ac2,
            calibration.ac3,
            calibration.ac4,
            calibration.ac5,
            calibration.ac6,
            calibration.b1,
            calibration.b2,
            calibration.mb,
            calibration.mc,
            calibration.md,
        );

        Ok(Self {
            bus,
            delay,
            config,
            constants: Constants::derive(&calibration),
            calibration,
            // Until the first temperature() the pressure is compensated for 0 °C.
            temperature: 0.0,
        })
    }

    /// Reads the chip id. A BMP180 answers 0x55, the value is not checked.
    pub fn id(&mut self) -> Result<u8, Error<B::Error>> {
        let mut id = [0u8; 1];
        self.bus
            .read_block(Register::ChipId as u8, &mut id)
            .map_err(Error::Transport)?;
        Ok(id[0])
    }

    /// Measures the temperature in degrees Celsius.
    ///
    /// The result is kept for the compensation of later pressure readings.
    pub fn temperature(&mut self) -> Result<f64, Error<B::Error>> {
        let raw = self.read_raw_temperature()?;
        let temperature = conversion::temperature_celsius(raw.value(), &self.constants);
        self.temperature = temperature;
        Ok(temperature)
    }

    /// Measures the pressure in millibar (hPa).
    ///
    /// Compensated with the temperature of the last successful
    /// [`temperature`](Self::temperature) call, or 0 °C if there was none.
    pub fn pressure(&mut self, oversampling: Oversampling) -> Result<f64, Error<B::Error>> {
        let raw = self.read_raw_pressure(oversampling)?;
        Ok(conversion::pressure_mbar(
            self.temperature,
            raw.msb,
            raw.lsb,
            raw.xlsb(),
            &self.constants,
        ))
    }

    /// Measures the pressure and reduces it to sea level for a sensor
    /// mounted `altitude_m` meters above it.
    pub fn pressure_at_sea_level(
        &mut self,
        oversampling: Oversampling,
        altitude_m: f64,
    ) -> Result<f64, Error<B::Error>> {
        let pressure = self.pressure(oversampling)?;
        Ok(conversion::sea_level_pressure(pressure, altitude_m))
    }

    /// Measures temperature, then pressure compensated with it.
    pub fn temperature_and_pressure(
        &mut self,
        oversampling: Oversampling,
    ) -> Result<(f64, f64), Error<B::Error>> {
        let temperature = self.temperature()?;
        let pressure = self.pressure(oversampling)?;
        Ok((temperature, pressure))
    }

    /// Runs the temperature conversion and returns the uncompensated value.
    pub fn read_raw_temperature(&mut self) -> Result<RawTemperature, Error<B::Error>> {
        self.start(&Command::ReadTemperature)?;

        let mut buf = [0u8; 2];
        self.bus
            .read_block(Register::OutMsb as u8, &mut buf)
            .map_err(Error::Transport)?;
        let raw = RawTemperature::from_bytes(buf[0], buf[1]);
        trace!("bmp180 raw temperature: {}", raw.value());
        Ok(raw)
    }

    /// Runs a pressure conversion and returns the uncompensated value.
    ///
    /// Control and result registers are fetched in one transfer. While the
    /// SCO bit is still set the transfer is repeated, at most
    /// [`Config::max_polls`] times.
    pub fn read_raw_pressure(
        &mut self,
        oversampling: Oversampling,
    ) -> Result<RawPressure, Error<B::Error>> {
        self.start(&Command::ReadPressure(oversampling))?;

        let mut frame = [0u8; PRESSURE_FRAME_LEN];
        let mut polls = 0;
        loop {
            self.bus
                .read_block(Register::Control as u8, &mut frame)
                .map_err(Error::Transport)?;
            if frame[0] & SCO_BIT == 0 {
                break;
            }
            if polls >= self.config.max_polls {
                warn!(
                    "bmp180 conversion still running after {} polls (control {})",
                    polls,
                    frame[0]
                );
                return Err(Error::ProtocolTimeout);
            }
            polls += 1;
            self.delay.delay_us(self.config.poll_interval_us);
        }

        let raw = RawPressure::new(frame[2], frame[3], frame[4], oversampling);
        trace!(
            "bmp180 raw pressure: {} {} {} (oss {}, {} polls)",
            raw.msb,
            raw.lsb,
            raw.xlsb(),
            oversampling.value(),
            polls
        );
        Ok(raw)
    }

    /// Triggers a power-on reset. Calibration data survives the reset.
    pub fn soft_reset(&mut self) -> Result<(), Error<B::Error>> {
        self.start(&Command::SoftReset)
    }

    /// Writes the command and waits until the chip may be read again.
    fn start(&mut self, command: &Command) -> Result<(), Error<B::Error>> {
        self.bus
            .write_block(command.register() as u8, &[command.value()])
            .map_err(Error::Transport)?;
        self.delay.delay_us(command.delay_us());
        Ok(())
    }

    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Temperature used to compensate the next pressure reading.
    pub fn last_temperature(&self) -> f64 {
        self.temperature
    }

    /// Gives back the bus and the delay provider.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    /// Closes the bus.
    pub fn close(mut self) -> Result<(), Error<B::Error>> {
        self.bus.close().map_err(Error::Transport)
    }
}
