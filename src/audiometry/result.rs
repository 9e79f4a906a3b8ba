// Hearing results, severity bands and aggregation
//
// Thresholds are classified with half-open bands over dB:
// [0,20) Normal, [20,40) Mild, [40,60) Moderate, [60,80) Severe, [80,∞) Profound.
// Boundary values belong to the higher band.

use serde::{Deserialize, Serialize};

/// Loudness at which the subject acknowledged one frequency
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HearingResult {
    /// Test frequency (Hz)
    pub frequency: u32,
    /// Loudness at which "heard" was signaled (dB)
    pub threshold: f32,
}

impl HearingResult {
    pub fn new(frequency: u32, threshold: f32) -> Self {
        Self {
            frequency,
            threshold,
        }
    }

    /// Per-frequency severity, e.g. for coloring individual points
    pub fn severity(&self) -> SeverityLevel {
        SeverityLevel::from_threshold(self.threshold)
    }
}

/// Severity band, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeverityLevel {
    Normal,
    Mild,
    Moderate,
    Severe,
    Profound,
}

impl SeverityLevel {
    /// All levels in severity order
    pub const ALL: [SeverityLevel; 5] = [
        SeverityLevel::Normal,
        SeverityLevel::Mild,
        SeverityLevel::Moderate,
        SeverityLevel::Severe,
        SeverityLevel::Profound,
    ];

    /// Classify a dB value. Total over all inputs: anything at or above
    /// 80 dB is Profound, anything below 20 dB is Normal.
    pub fn from_threshold(threshold_db: f32) -> Self {
        if threshold_db < 20.0 {
            SeverityLevel::Normal
        } else if threshold_db < 40.0 {
            SeverityLevel::Mild
        } else if threshold_db < 60.0 {
            SeverityLevel::Moderate
        } else if threshold_db < 80.0 {
            SeverityLevel::Severe
        } else {
            SeverityLevel::Profound
        }
    }

    /// Stable identifier, identical to the persisted form
    pub fn label(&self) -> &'static str {
        match self {
            SeverityLevel::Normal => "NORMAL",
            SeverityLevel::Mild => "MILD",
            SeverityLevel::Moderate => "MODERATE",
            SeverityLevel::Severe => "SEVERE",
            SeverityLevel::Profound => "PROFOUND",
        }
    }

    /// Band covered by this level, for legends
    pub fn range_label(&self) -> &'static str {
        match self {
            SeverityLevel::Normal => "0-20dB",
            SeverityLevel::Mild => "20-40dB",
            SeverityLevel::Moderate => "40-60dB",
            SeverityLevel::Severe => "60-80dB",
            SeverityLevel::Profound => "80dB+",
        }
    }
}

impl std::fmt::Display for SeverityLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Mean threshold plus its severity band
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aggregate {
    pub average_threshold: f32,
    pub severity: SeverityLevel,
}

/// Computes session-level figures from per-frequency results
pub struct ResultAggregator;

impl ResultAggregator {
    /// Arithmetic mean of all thresholds.
    ///
    /// # Panics
    /// If `results` is empty. A session is never aggregated before every
    /// frequency has a result.
    pub fn average(results: &[HearingResult]) -> f32 {
        assert!(
            !results.is_empty(),
            "average threshold requested for an empty result set"
        );
        let sum: f32 = results.iter().map(|r| r.threshold).sum();
        sum / results.len() as f32
    }

    /// Average and classify in one step
    pub fn aggregate(results: &[HearingResult]) -> Aggregate {
        let average_threshold = Self::average(results);
        Aggregate {
            average_threshold,
            severity: SeverityLevel::from_threshold(average_threshold),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn results_with(thresholds: &[f32]) -> Vec<HearingResult> {
        [250, 500, 1000, 2000, 4000, 8000]
            .iter()
            .zip(thresholds)
            .map(|(&hz, &db)| HearingResult::new(hz, db))
            .collect()
    }

    #[test]
    fn test_band_boundaries_belong_to_higher_band() {
        assert_eq!(SeverityLevel::from_threshold(19.999), SeverityLevel::Normal);
        assert_eq!(SeverityLevel::from_threshold(20.0), SeverityLevel::Mild);
        assert_eq!(SeverityLevel::from_threshold(40.0), SeverityLevel::Moderate);
        assert_eq!(SeverityLevel::from_threshold(60.0), SeverityLevel::Severe);
        assert_eq!(SeverityLevel::from_threshold(80.0), SeverityLevel::Profound);
    }

    #[test]
    fn test_classification_is_total() {
        assert_eq!(SeverityLevel::from_threshold(0.0), SeverityLevel::Normal);
        assert_eq!(SeverityLevel::from_threshold(-10.0), SeverityLevel::Normal);
        assert_eq!(SeverityLevel::from_threshold(79.9), SeverityLevel::Severe);
        assert_eq!(SeverityLevel::from_threshold(500.0), SeverityLevel::Profound);
    }

    #[test]
    fn test_classification_idempotent() {
        for value in [0.0, 19.0, 20.0, 39.5, 40.0, 60.0, 80.0, 95.0] {
            assert_eq!(
                SeverityLevel::from_threshold(value),
                SeverityLevel::from_threshold(value)
            );
        }
    }

    #[test]
    fn test_severity_ordering() {
        assert!(SeverityLevel::Normal < SeverityLevel::Mild);
        assert!(SeverityLevel::Mild < SeverityLevel::Moderate);
        assert!(SeverityLevel::Moderate < SeverityLevel::Severe);
        assert!(SeverityLevel::Severe < SeverityLevel::Profound);
        let mut sorted = SeverityLevel::ALL;
        sorted.reverse();
        sorted.sort();
        assert_eq!(sorted, SeverityLevel::ALL);
    }

    #[test]
    fn test_average_and_aggregate() {
        let results = results_with(&[0.0; 6]);
        let aggregate = ResultAggregator::aggregate(&results);
        assert_eq!(aggregate.average_threshold, 0.0);
        assert_eq!(aggregate.severity, SeverityLevel::Normal);

        let results = results_with(&[40.0; 6]);
        let aggregate = ResultAggregator::aggregate(&results);
        assert_eq!(aggregate.average_threshold, 40.0);
        assert_eq!(aggregate.severity, SeverityLevel::Moderate);

        let results = results_with(&[10.0, 20.0, 30.0, 40.0, 50.0, 60.0]);
        assert_eq!(ResultAggregator::average(&results), 35.0);
    }

    #[test]
    #[should_panic(expected = "empty result set")]
    fn test_average_of_empty_results_panics() {
        ResultAggregator::average(&[]);
    }

    #[test]
    fn test_serialized_form() {
        let json = serde_json::to_string(&HearingResult::new(1000, 42.0)).unwrap();
        assert_eq!(json, r#"{"frequency":1000,"threshold":42.0}"#);
        assert_eq!(
            serde_json::to_string(&SeverityLevel::Profound).unwrap(),
            r#""PROFOUND""#
        );
        assert_eq!(SeverityLevel::Moderate.to_string(), "MODERATE");
    }
}
