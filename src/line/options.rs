use std::time::Duration;

use super::values::Level;

pub mod builder {
    pub use super::super::option_builder::*;
}

/// Default settle delay applied after the last edge before sampling.
pub const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(15);

/// Maximum length in bytes of a consumer label. The kernel's 32-byte name
/// field also holds the terminating NUL.
pub const CONSUMER_MAX: usize = 31;

pub type Consumer = heapless::String<CONSUMER_MAX>;

/// How a session's `read` behaves when no transition is pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AccessMode {
    #[default]
    Blocking,
    NonBlocking,
}

impl AccessMode {
    pub const fn is_blocking(&self) -> bool {
        matches!(self, AccessMode::Blocking)
    }
}

/// Which level means "pressed".
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Active {
    High,
    #[default]
    Low,
}

/// Which edges of the raw line arm the debounce timer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum EdgeDetect {
    Rising,
    Falling,
    #[default]
    Both,
}

impl EdgeDetect {
    /// Whether a move from `from` to `to` is an edge this trigger reacts to.
    pub const fn matches(&self, from: Level, to: Level) -> bool {
        match (from, to) {
            (Level::Low, Level::High) => matches!(self, EdgeDetect::Rising | EdgeDetect::Both),
            (Level::High, Level::Low) => matches!(self, EdgeDetect::Falling | EdgeDetect::Both),
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Bias {
    #[default]
    Disabled,
    PullUp,
    PullDown,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("consumer label '{label}' exceeds {CONSUMER_MAX} bytes")]
    ConsumerTooLong { label: String },
}

impl From<ConfigError> for crate::errors::Error {
    fn from(value: ConfigError) -> Self {
        crate::errors::Error::configuration(value.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyConfig {
    pub(crate) settle_delay: Duration,
    pub(crate) edge_detect: EdgeDetect,
    pub(crate) initial_level: Level,
    pub(crate) active: Active,
    pub(crate) bias: Bias,
    pub(crate) consumer: Consumer,
}

impl KeyConfig {
    pub const fn build() -> builder::KeyConfigBuilder {
        builder::KeyConfigBuilder::new()
    }

    pub const fn settle_delay(&self) -> Duration {
        self.settle_delay
    }

    pub const fn edge_detect(&self) -> EdgeDetect {
        self.edge_detect
    }

    pub const fn initial_level(&self) -> Level {
        self.initial_level
    }

    pub const fn active(&self) -> Active {
        self.active
    }

    pub const fn bias(&self) -> Bias {
        self.bias
    }

    pub fn consumer(&self) -> &str {
        &self.consumer
    }
}

impl Default for KeyConfig {
    fn default() -> Self {
        Self::build().done()
    }
}
