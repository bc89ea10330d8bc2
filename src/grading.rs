use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// One row of a grading scale: the lowest score that earns this grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScaleBand {
    pub min: f64,
    pub grade: String,
    pub points: u32,
}

impl ScaleBand {
    fn new(min: f64, grade: &str, points: u32) -> Self {
        Self {
            min,
            grade: grade.to_string(),
            points,
        }
    }
}

/// Ordered score-threshold table. Bands are kept sorted descending by
/// `min`; the first band whose minimum is <= the score wins. The floor
/// band must sit at min 0 so every in-range score maps to a grade.
#[derive(Debug, Clone, Serialize)]
pub struct GradingScale {
    bands: Vec<ScaleBand>,
}

impl GradingScale {
    pub fn new(mut bands: Vec<ScaleBand>) -> anyhow::Result<Self> {
        if bands.is_empty() {
            anyhow::bail!("grading scale must have at least one band");
        }
        bands.sort_by(|a, b| b.min.partial_cmp(&a.min).unwrap_or(std::cmp::Ordering::Equal));
        for b in &bands {
            if !b.min.is_finite() || b.min < 0.0 || b.min > 100.0 {
                anyhow::bail!("scale band {} has minimum {} outside 0-100", b.grade, b.min);
            }
        }
        let floor = bands.last().map(|b| b.min).unwrap_or(f64::NAN);
        if floor != 0.0 {
            anyhow::bail!("lowest scale band must have minimum 0, found {}", floor);
        }
        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[ScaleBand] {
        &self.bands
    }

    /// Maps a score to its band. Out-of-range input is clamped to [0,100]
    /// rather than rejected; display-path lookups must not fail.
    pub fn band_for(&self, score: f64) -> &ScaleBand {
        let s = if score.is_finite() {
            score.clamp(0.0, 100.0)
        } else {
            0.0
        };
        self.bands
            .iter()
            .find(|b| b.min <= s)
            .unwrap_or_else(|| self.bands.last().expect("scale has bands"))
    }
}

/// Raw, snapshot-deserializable form of a grading policy override.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingConfig {
    pub general: Vec<ScaleBand>,
    pub science_math: Vec<ScaleBand>,
    #[serde(default)]
    pub science_math_subject_ids: Vec<String>,
}

/// The two scales in force plus the subject ids graded on the stricter
/// science/math thresholds. Immutable; passed into the engine rather than
/// read from globals so a dataset can carry its own policy.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingPolicy {
    pub general: GradingScale,
    pub science_math: GradingScale,
    pub science_math_subject_ids: BTreeSet<String>,
}

impl GradingPolicy {
    /// KNEC-style defaults: 12-point A..E ladder, with the science/math
    /// scale shifted five marks down for MAT/BIO/PHY/CHE.
    pub fn knec() -> Self {
        // Literals are listed descending with a zero floor, honoring the
        // GradingScale invariant directly.
        let general = GradingScale {
            bands: vec![
                ScaleBand::new(80.0, "A", 12),
                ScaleBand::new(75.0, "A-", 11),
                ScaleBand::new(70.0, "B+", 10),
                ScaleBand::new(65.0, "B", 9),
                ScaleBand::new(60.0, "B-", 8),
                ScaleBand::new(55.0, "C+", 7),
                ScaleBand::new(50.0, "C", 6),
                ScaleBand::new(45.0, "C-", 5),
                ScaleBand::new(40.0, "D+", 4),
                ScaleBand::new(35.0, "D", 3),
                ScaleBand::new(30.0, "D-", 2),
                ScaleBand::new(0.0, "E", 1),
            ],
        };
        let science_math = GradingScale {
            bands: vec![
                ScaleBand::new(75.0, "A", 12),
                ScaleBand::new(70.0, "A-", 11),
                ScaleBand::new(65.0, "B+", 10),
                ScaleBand::new(60.0, "B", 9),
                ScaleBand::new(55.0, "B-", 8),
                ScaleBand::new(50.0, "C+", 7),
                ScaleBand::new(45.0, "C", 6),
                ScaleBand::new(40.0, "C-", 5),
                ScaleBand::new(35.0, "D+", 4),
                ScaleBand::new(30.0, "D", 3),
                ScaleBand::new(25.0, "D-", 2),
                ScaleBand::new(0.0, "E", 1),
            ],
        };
        Self {
            general,
            science_math,
            science_math_subject_ids: ["MAT", "BIO", "PHY", "CHE"]
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }

    pub fn from_config(cfg: GradingConfig) -> anyhow::Result<Self> {
        Ok(Self {
            general: GradingScale::new(cfg.general)?,
            science_math: GradingScale::new(cfg.science_math)?,
            science_math_subject_ids: cfg.science_math_subject_ids.into_iter().collect(),
        })
    }

    pub fn scale_for_subject(&self, subject_id: &str) -> &GradingScale {
        if self.science_math_subject_ids.contains(subject_id) {
            &self.science_math
        } else {
            &self.general
        }
    }

    /// Subject-aware score -> band lookup (the grading mapper contract).
    pub fn grade_for(&self, subject_id: &str, score: f64) -> &ScaleBand {
        self.scale_for_subject(subject_id).band_for(score)
    }

    /// Term-level grade for a mean score. Always the general scale: the
    /// mean spans mixed subjects, so no subject scale applies.
    pub fn overall_band(&self, mean_score: f64) -> &ScaleBand {
        self.general.band_for(mean_score)
    }
}

impl Default for GradingPolicy {
    fn default() -> Self {
        Self::knec()
    }
}
