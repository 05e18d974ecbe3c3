//! performance
//!
//! Fixed mapping between named performance tiers and their step counts.
//!
//! A1111 text carries only a step count; the structured convention carries
//! a named tier. The mapping is closed and exact: a step count with no
//! corresponding tier derives nothing.

/// Named performance tier with a fixed step count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Performance {
    Quality,
    Speed,
    ExtremeSpeed,
    Lightning,
}

impl Performance {
    /// Every tier, in descending step order.
    pub const ALL: [Performance; 4] = [
        Performance::Quality,
        Performance::Speed,
        Performance::ExtremeSpeed,
        Performance::Lightning,
    ];

    /// The step count this tier runs at.
    pub fn steps(self) -> u32 {
        match self {
            Performance::Quality => 60,
            Performance::Speed => 30,
            Performance::ExtremeSpeed => 8,
            Performance::Lightning => 4,
        }
    }

    /// The display name written into metadata.
    pub fn as_str(self) -> &'static str {
        match self {
            Performance::Quality => "Quality",
            Performance::Speed => "Speed",
            Performance::ExtremeSpeed => "Extreme Speed",
            Performance::Lightning => "Lightning",
        }
    }

    /// The tier whose step count matches exactly, if any.
    ///
    /// # Example
    ///
    /// ```
    /// use geninfo::performance::Performance;
    ///
    /// assert_eq!(Performance::from_steps(30), Some(Performance::Speed));
    /// assert_eq!(Performance::from_steps(31), None);
    /// ```
    pub fn from_steps(steps: u32) -> Option<Self> {
        Self::ALL.into_iter().find(|tier| tier.steps() == steps)
    }
}

impl std::fmt::Display for Performance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_lookup_is_exact() {
        assert_eq!(Performance::from_steps(60), Some(Performance::Quality));
        assert_eq!(Performance::from_steps(30), Some(Performance::Speed));
        assert_eq!(Performance::from_steps(8), Some(Performance::ExtremeSpeed));
        assert_eq!(Performance::from_steps(4), Some(Performance::Lightning));
        assert_eq!(Performance::from_steps(20), None);
        assert_eq!(Performance::from_steps(0), None);
    }

    #[test]
    fn display_names() {
        assert_eq!(Performance::Speed.to_string(), "Speed");
        assert_eq!(Performance::ExtremeSpeed.to_string(), "Extreme Speed");
    }
}
