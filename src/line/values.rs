use super::options::Active;

/// Electrical level of the key's input line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Level {
    High,
    Low,
}

impl Level {
    pub const fn new(is_high: bool) -> Self {
        if is_high {
            Self::High
        } else {
            Self::Low
        }
    }

    pub const fn is_high(&self) -> bool {
        matches!(self, Level::High)
    }

    pub const fn is_low(&self) -> bool {
        matches!(self, Level::Low)
    }

    /// Whether this level means "pressed" for a key wired with the given polarity.
    pub const fn is_pressed(&self, active: Active) -> bool {
        match active {
            Active::Low => self.is_low(),
            Active::High => self.is_high(),
        }
    }

    pub(crate) const fn to_bit(self) -> u8 {
        match self {
            Level::High => 1,
            Level::Low => 0,
        }
    }

    pub(crate) const fn from_bit(bit: u8) -> Self {
        Self::new(bit != 0)
    }
}

impl std::ops::Not for Level {
    type Output = Level;

    fn not(self) -> Self::Output {
        match self {
            Level::High => Level::Low,
            Level::Low => Level::High,
        }
    }
}

impl From<bool> for Level {
    #[inline]
    fn from(value: bool) -> Self {
        Self::new(value)
    }
}

impl From<Level> for bool {
    #[inline]
    fn from(value: Level) -> Self {
        value.is_high()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pressed_follows_polarity() {
        assert!(Level::Low.is_pressed(Active::Low));
        assert!(!Level::High.is_pressed(Active::Low));
        assert!(Level::High.is_pressed(Active::High));
        assert_eq!(!Level::High, Level::Low);
        assert_eq!(Level::from_bit(Level::High.to_bit()), Level::High);
    }
}
