/// Timing of the busy-bit polling that follows a pressure conversion.
///
/// The first read happens after the datasheet conversion time. Should the
/// conversion still be running, the control register is read again up to
/// `max_polls` more times, `poll_interval_us` apart, before the measurement
/// fails with [`Error::ProtocolTimeout`](crate::Error::ProtocolTimeout).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Config {
    /// Additional reads of the control register
    pub max_polls: u8,
    /// Wait between two reads (microseconds)
    pub poll_interval_us: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_polls: 10,
            poll_interval_us: 1_500,
        }
    }
}

impl Config {
    /// Fail on the first read that still sees a running conversion
    pub const fn no_polling() -> Self {
        Self {
            max_polls: 0,
            poll_interval_us: 0,
        }
    }

    pub const fn with_max_polls(mut self, max_polls: u8) -> Self {
        self.max_polls = max_polls;
        self
    }

    pub const fn with_poll_interval_us(mut self, poll_interval_us: u32) -> Self {
        self.poll_interval_us = poll_interval_us;
        self
    }

    /// Longest time spent polling after the conversion delay, in microseconds.
    pub fn polling_budget_us(&self) -> u64 {
        u64::from(self.max_polls) * u64::from(self.poll_interval_us)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_budget() {
        let config = Config::default();
        assert_eq!(config.polling_budget_us(), 15_000);
    }

    #[test]
    fn builder() {
        let config = Config::no_polling().with_max_polls(3).with_poll_interval_us(500);
        assert_eq!(
            config,
            Config {
                max_polls: 3,
                poll_interval_us: 500
            }
        );
        assert_eq!(config.polling_budget_us(), 1_500);
    }

    #[test]
    fn budget_does_not_overflow() {
        let config = Config::default().with_poll_interval_us(u32::MAX);
        assert_eq!(config.polling_budget_us(), 10 * u64::from(u32::MAX));
        let config = config.with_max_polls(u8::MAX);
        assert_eq!(config.polling_budget_us(), 255 * u64::from(u32::MAX));
    }
}
