//! Field selectors in the vocabulary of GRIB `.idx` sidecars.

use std::fmt;

/// Step-type discrimination for a selector.
///
/// Several GRIB messages can share a variable and level while meaning
/// physically different things: HRRR publishes both an instantaneous GUST
/// and a "0-1 hour max fcst" GUST at 10 m. Selecting by name alone would
/// pick whichever comes first, so instantaneous selectors exclude
/// period-reduced steps explicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StepKind {
    /// Matches "anl" and plain "N hour fcst" steps only.
    Instant,
    /// Matches any step string.
    Any,
}

impl StepKind {
    pub fn matches(&self, step: &str) -> bool {
        match self {
            StepKind::Any => true,
            StepKind::Instant => step == "anl" || (step.ends_with("hour fcst") && !step.contains('-')),
        }
    }
}

/// Identifies one scalar field within a grid file by its `.idx` tokens,
/// e.g. variable "TMP", level "700 mb".
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FieldSelector {
    pub variable: String,
    pub level: String,
    pub step: StepKind,
}

impl FieldSelector {
    pub fn new(variable: &str, level: &str, step: StepKind) -> Self {
        Self {
            variable: variable.to_string(),
            level: level.to_string(),
            step,
        }
    }

    /// Instantaneous field at an isobaric level, e.g. `pressure("TMP", 850)`.
    pub fn pressure(variable: &str, level_mb: u16) -> Self {
        Self::new(variable, &format!("{} mb", level_mb), StepKind::Instant)
    }

    /// Instantaneous field at a height above ground, e.g. 10 m gusts.
    pub fn height_above_ground(variable: &str, meters: u16) -> Self {
        Self::new(variable, &format!("{} m above ground", meters), StepKind::Instant)
    }

    /// Instantaneous surface field, e.g. terrain height.
    pub fn surface(variable: &str) -> Self {
        Self::new(variable, "surface", StepKind::Instant)
    }
}

impl fmt::Display for FieldSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.variable, self.level)?;
        if self.step == StepKind::Instant {
            write!(f, ":instant")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instant_step_matching() {
        let s = StepKind::Instant;
        assert!(s.matches("anl"));
        assert!(s.matches("1 hour fcst"));
        assert!(s.matches("12 hour fcst"));
        // Period-reduced variants must not match
        assert!(!s.matches("0-1 hour max fcst"));
        assert!(!s.matches("0-1 hour acc fcst"));
        assert!(!s.matches("11-12 hour max fcst"));
    }

    #[test]
    fn test_any_step_matching() {
        assert!(StepKind::Any.matches("anl"));
        assert!(StepKind::Any.matches("0-1 hour max fcst"));
    }

    #[test]
    fn test_selector_constructors() {
        let t850 = FieldSelector::pressure("TMP", 850);
        assert_eq!(t850.level, "850 mb");
        let gust = FieldSelector::height_above_ground("GUST", 10);
        assert_eq!(gust.level, "10 m above ground");
        let orog = FieldSelector::surface("HGT");
        assert_eq!(orog.level, "surface");
    }
}
