use core::fmt;

/// Errors returned by the driver.
///
/// `E` is the error type of the underlying [`RegisterBus`](crate::bus::RegisterBus).
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// The bus failed to read or write. Carries the bus error unchanged.
    Transport(E),
    /// The conversion-in-progress bit was still set after the polling budget ran out.
    ProtocolTimeout,
}

impl<E: fmt::Debug> fmt::Display for Error<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Transport(e) => write!(f, "bus transfer failed: {:?}", e),
            Error::ProtocolTimeout => f.write_str("conversion did not complete within the polling budget"),
        }
    }
}

impl<E: fmt::Debug> core::error::Error for Error<E> {}
