use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PipelineError;

/// Label sent when neither an explicit nor a demo lift is known
pub const UNKNOWN_LIFT_LABEL: &str = "Unknown";

/// Barbell lifts supported by form analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum LiftType {
    Squat,
    Deadlift,
    #[serde(rename = "Overhead Press")]
    OverheadPress,
    #[serde(rename = "Bench Press")]
    BenchPress,
    #[serde(rename = "Barbell Row")]
    BarbellRow,
}

impl LiftType {
    pub fn all() -> [Self; 5] {
        [
            Self::Squat,
            Self::Deadlift,
            Self::OverheadPress,
            Self::BenchPress,
            Self::BarbellRow,
        ]
    }

    /// Label shown to the user and sent to the analysis service
    pub fn label(&self) -> &'static str {
        match self {
            Self::Squat => "Squat",
            Self::Deadlift => "Deadlift",
            Self::OverheadPress => "Overhead Press",
            Self::BenchPress => "Bench Press",
            Self::BarbellRow => "Barbell Row",
        }
    }

    /// Demo asset file stem
    pub fn demo_slug(&self) -> &'static str {
        match self {
            Self::Squat => "squat",
            Self::Deadlift => "deadlift",
            Self::OverheadPress => "ohpress",
            Self::BenchPress => "benchpress",
            Self::BarbellRow => "barbellrow",
        }
    }

    /// Label used in demo mode when no explicit selection was made
    pub fn demo_label(&self) -> String {
        self.label().to_lowercase()
    }
}

impl fmt::Display for LiftType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for LiftType {
    type Err = PipelineError;

    /// Accepts labels, demo slugs and kebab/snake case spellings
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .collect::<String>()
            .to_lowercase();

        Self::all()
            .into_iter()
            .find(|lift| {
                let label_key: String = lift
                    .label()
                    .chars()
                    .filter(|c| c.is_ascii_alphanumeric())
                    .collect::<String>()
                    .to_lowercase();
                label_key == key || lift.demo_slug() == key
            })
            .ok_or_else(|| PipelineError::UnknownLift(s.to_string()))
    }
}

/// Resolve the label for an analysis request
///
/// An explicit selection wins over the demo default; with neither the label is
/// [`UNKNOWN_LIFT_LABEL`].
pub fn resolve_lift_label(explicit: Option<LiftType>, demo: Option<LiftType>) -> String {
    match (explicit, demo) {
        (Some(lift), _) => lift.label().to_string(),
        (None, Some(lift)) => lift.demo_label(),
        (None, None) => UNKNOWN_LIFT_LABEL.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lift_labels() {
        assert_eq!(LiftType::OverheadPress.label(), "Overhead Press");
        assert_eq!(LiftType::BarbellRow.to_string(), "Barbell Row");
        assert_eq!(LiftType::BenchPress.demo_slug(), "benchpress");
    }

    #[test]
    fn test_parse_lift_spellings() {
        assert_eq!("Squat".parse::<LiftType>().unwrap(), LiftType::Squat);
        assert_eq!("overhead-press".parse::<LiftType>().unwrap(), LiftType::OverheadPress);
        assert_eq!("bench_press".parse::<LiftType>().unwrap(), LiftType::BenchPress);
        assert_eq!("ohpress".parse::<LiftType>().unwrap(), LiftType::OverheadPress);
        assert!("clean".parse::<LiftType>().is_err());
    }

    #[test]
    fn test_resolve_lift_label() {
        assert_eq!(resolve_lift_label(Some(LiftType::Squat), Some(LiftType::Deadlift)), "Squat");
        assert_eq!(resolve_lift_label(None, Some(LiftType::Deadlift)), "deadlift");
        assert_eq!(resolve_lift_label(None, None), "Unknown");
    }

    #[test]
    fn test_serde_uses_labels() {
        let json = serde_json::to_string(&LiftType::BarbellRow).unwrap();
        assert_eq!(json, "\"Barbell Row\"");
    }
}
