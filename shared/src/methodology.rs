use serde::{Deserialize, Serialize};
use strum::IntoEnumIterator;

use super::*;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionDescription {
    pub name: String,
    /// Share of the impact score, as a fraction of one.
    pub weight: f64,
    pub description: String,
    pub signals: Vec<String>,
}

/// Human readable description of the scoring model. Documentation only; the
/// engine never reads it back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Methodology {
    pub overview: String,
    pub dimensions: Vec<DimensionDescription>,
    pub philosophy: String,
}

impl Dimension {
    pub fn display_name(&self) -> &'static str {
        match self {
            Dimension::Quality => "Code Quality",
            Dimension::Velocity => "Delivery Velocity",
            Dimension::Collaboration => "Collaboration",
            Dimension::Leadership => "Technical Leadership",
        }
    }

    fn describe(&self) -> DimensionDescription {
        let (description, signals): (&str, Vec<String>) = match self {
            Dimension::Quality => (
                "Fast merge time, reasonable PR size, review activity",
                vec![
                    format!(
                        "Merge efficiency against the team's 90th percentile merge time ({MERGE_SPEED_WEIGHT}%)"
                    ),
                    format!(
                        "PR size optimization ({}-{} lines sweet spot, {PR_SIZE_WEIGHT}%)",
                        PR_SIZE_SWEET_SPOT.0, PR_SIZE_SWEET_SPOT.1
                    ),
                    format!(
                        "Review engagement relative to the most active reviewer ({REVIEW_ACTIVITY_WEIGHT}%)"
                    ),
                ],
            ),
            Dimension::Velocity => (
                "Consistent delivery of complex work",
                vec![
                    format!("Merged PRs relative to the most prolific author ({CONSISTENCY_WEIGHT}%)"),
                    format!(
                        "Files changed per PR relative to the team maximum ({COMPLEXITY_WEIGHT}%)"
                    ),
                ],
            ),
            Dimension::Collaboration => (
                "Helping teammates through code reviews",
                vec![
                    format!("Reviews given relative to the top reviewer ({REVIEW_VOLUME_WEIGHT}%)"),
                    format!(
                        "Review events per reviewed PR, full marks at {REVIEW_DEPTH_TARGET} ({REVIEW_DEPTH_WEIGHT}%)"
                    ),
                ],
            ),
            Dimension::Leadership => (
                "Code ownership and balanced contributions",
                vec![
                    format!("Files touched relative to the widest owner ({OWNERSHIP_WEIGHT}%)"),
                    format!(
                        "Both authoring and reviewing, only when doing both ({BALANCE_WEIGHT}%)"
                    ),
                ],
            ),
        };

        DimensionDescription {
            name: self.display_name().to_string(),
            weight: self.weight() as f64 / 100.0,
            description: description.to_string(),
            signals,
        }
    }
}

impl Default for Methodology {
    fn default() -> Self {
        Self {
            overview: "Impact measured across four dimensions with weighted scoring. Every \
                       signal is normalized against the rest of the team, so scores describe \
                       relative standing rather than absolute output. Avoids vanity metrics \
                       like lines of code."
                .to_string(),
            dimensions: Dimension::iter().map(|dimension| dimension.describe()).collect(),
            philosophy: "This approach resists gaming. You can't just spam commits, make tiny \
                         PRs, or rubber-stamp reviews. Real impact requires quality code, \
                         consistent delivery, helpful reviews, and technical ownership."
                .to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weights_add_up_to_one() {
        let methodology = Methodology::default();

        let total: f64 = methodology.dimensions.iter().map(|d| d.weight).sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert_eq!(methodology.dimensions.len(), 4);
        assert_eq!(methodology.dimensions[0].name, "Code Quality");
        assert_eq!(methodology.dimensions[0].weight, 0.3);
        assert_eq!(methodology.dimensions[0].signals.len(), 3);
    }

    #[test]
    fn signals_mention_sweet_spot() {
        let quality = &Methodology::default().dimensions[0];

        assert!(quality.signals[1].contains("200-500"));
    }
}
