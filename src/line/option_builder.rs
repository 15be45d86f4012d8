use std::time::Duration;

use crate::errors::Result;

use super::options::*;
use super::values::Level;

pub struct KeyConfigBuilder {
    pub(super) settle_delay: Option<Duration>,
    pub(super) edge: Option<EdgeDetect>,
    pub(super) initial_level: Option<Level>,
    pub(super) active: Option<Active>,
    pub(super) bias: Option<Bias>,
    pub(super) consumer: Consumer,
}

impl KeyConfigBuilder {
    pub const fn new() -> Self {
        Self {
            settle_delay: None,
            edge: None,
            initial_level: None,
            active: None,
            bias: None,
            consumer: heapless::String::new(),
        }
    }

    pub fn with_settle_delay(self, delay: Duration) -> Self {
        Self {
            settle_delay: Some(delay),
            ..self
        }
    }

    pub fn with_edge_detect(self, edge_detect: EdgeDetect) -> Self {
        Self {
            edge: Some(edge_detect),
            ..self
        }
    }

    /// The level assumed stable before the first sample is taken.
    pub fn with_initial_level(self, level: Level) -> Self {
        Self {
            initial_level: Some(level),
            ..self
        }
    }

    pub fn with_active(self, active: Active) -> Self {
        Self {
            active: Some(active),
            ..self
        }
    }

    pub fn with_bias(self, bias: Bias) -> Self {
        Self {
            bias: Some(bias),
            ..self
        }
    }

    pub fn with_consumer(mut self, consumer: &str) -> Result<Self> {
        self.consumer.clear();
        self.consumer
            .push_str(consumer)
            .map_err(|()| ConfigError::ConsumerTooLong {
                label: consumer.to_owned(),
            })?;
        Ok(self)
    }

    pub fn done(self) -> KeyConfig {
        let active = self.active.unwrap_or_default();
        KeyConfig {
            settle_delay: self.settle_delay.unwrap_or(DEFAULT_SETTLE_DELAY),
            edge_detect: self.edge.unwrap_or_default(),
            // A key at rest sits at its inactive level.
            initial_level: self.initial_level.unwrap_or(match active {
                Active::Low => Level::High,
                Active::High => Level::Low,
            }),
            active,
            bias: self.bias.unwrap_or_default(),
            consumer: self.consumer,
        }
    }

    #[cfg(feature = "uapi-v2")]
    pub(crate) fn build_v2(&self) -> crate::uapi::v2::LineFlags {
        use crate::uapi::v2::LineFlags;

        let flags = LineFlags::INPUT;

        let flags = match self.bias {
            Some(Bias::PullDown) => flags.union(LineFlags::BIAS_PULL_DOWN),
            Some(Bias::PullUp) => flags.union(LineFlags::BIAS_PULL_UP),
            Some(Bias::Disabled) | None => flags.union(LineFlags::BIAS_DISABLED),
        };

        match self.edge {
            Some(EdgeDetect::Both) | None => flags
                .union(LineFlags::EDGE_RISING)
                .union(LineFlags::EDGE_FALLING),
            Some(EdgeDetect::Rising) => flags.union(LineFlags::EDGE_RISING),
            Some(EdgeDetect::Falling) => flags.union(LineFlags::EDGE_FALLING),
        }
    }
}

impl Default for KeyConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "uapi-v2")]
impl KeyConfig {
    /// Request flags for an edge-detecting input line matching this config.
    pub(crate) fn build_v2(&self) -> crate::uapi::v2::LineFlags {
        KeyConfigBuilder {
            settle_delay: Some(self.settle_delay),
            edge: Some(self.edge_detect),
            initial_level: Some(self.initial_level),
            active: Some(self.active),
            bias: Some(self.bias),
            consumer: heapless::String::new(),
        }
        .build_v2()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_mirror_an_active_low_key() {
        let config = KeyConfig::default();
        assert_eq!(config.settle_delay(), Duration::from_millis(15));
        assert_eq!(config.edge_detect(), EdgeDetect::Both);
        assert_eq!(config.active(), Active::Low);
        assert_eq!(config.initial_level(), Level::High);
        assert_eq!(config.consumer(), "");
    }

    #[test]
    fn active_high_rests_low() {
        let config = KeyConfig::build().with_active(Active::High).done();
        assert_eq!(config.initial_level(), Level::Low);
    }

    #[test]
    fn consumer_fits_kernel_name_with_nul() {
        assert_eq!(CONSUMER_MAX, 31);
        let label = "k".repeat(CONSUMER_MAX);
        assert!(KeyConfig::build().with_consumer(&label).is_ok());

        let label = "k".repeat(CONSUMER_MAX + 1);
        let err = KeyConfig::build().with_consumer(&label).err();
        assert!(err.is_some_and(|e| e.is_configuration()));
    }

    #[test]
    fn long_consumer_is_rejected() {
        let err = KeyConfig::build()
            .with_consumer("a-consumer-label-well-beyond-thirty-two-bytes")
            .err()
            .map(|e| e.is_configuration());
        assert_eq!(err, Some(true));
    }

    #[cfg(feature = "uapi-v2")]
    #[test]
    fn falling_only_requests_one_edge() {
        use crate::uapi::v2::LineFlags;

        let flags = KeyConfig::build()
            .with_edge_detect(EdgeDetect::Falling)
            .with_bias(Bias::PullUp)
            .done()
            .build_v2();
        assert!(flags.contains(LineFlags::INPUT | LineFlags::EDGE_FALLING | LineFlags::BIAS_PULL_UP));
        assert!(!flags.contains(LineFlags::EDGE_RISING));
    }
}
