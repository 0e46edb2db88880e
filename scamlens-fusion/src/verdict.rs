// Verdict formatter: ordered decision bands with thresholds and advice.
//
// A BandSet is an ordered, closed ladder from the safe band (index 0) to the
// worst band (last index). Mapping a score to a band and a band to advice is
// a total lookup; there is no unhandled case.

use crate::types::{clamp_score, Band};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One decision band: label, entry threshold, and templated advice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSpec {
    /// Stable wire label, e.g. "clone" or "likely_scam"
    pub label: String,
    /// Minimum blended score for a score-derived verdict to enter this band
    pub min_score: f64,
    /// Human-readable guidance shown for this band
    pub advice: String,
}

impl BandSpec {
    pub fn new(label: &str, min_score: f64, advice: &str) -> Self {
        Self {
            label: label.to_string(),
            min_score,
            advice: advice.to_string(),
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BandSetError {
    #[error("band set must contain at least two bands")]
    TooFewBands,
    #[error("band thresholds must be strictly ascending")]
    NonAscendingThresholds,
}

/// Ordered, closed set of decision bands (safe first, worst last).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandSet {
    bands: Vec<BandSpec>,
}

impl BandSet {
    /// Validate and build a band set. Thresholds must be strictly ascending
    /// so that score-to-band mapping is unambiguous.
    pub fn try_new(bands: Vec<BandSpec>) -> Result<Self, BandSetError> {
        if bands.len() < 2 {
            return Err(BandSetError::TooFewBands);
        }
        for pair in bands.windows(2) {
            if pair[1].min_score <= pair[0].min_score {
                return Err(BandSetError::NonAscendingThresholds);
            }
        }
        Ok(Self { bands })
    }

    /// Site-clone ladder: clean / suspicious / clone.
    ///
    /// Thresholds are deployment-configurable; these are the compiled
    /// defaults.
    pub fn site_default() -> Self {
        Self::try_new(vec![
            BandSpec::new(
                "clean",
                0.0,
                "Looks safe, but always verify the domain before logging in.",
            ),
            BandSpec::new(
                "suspicious",
                30.0,
                "Be cautious - this site shows signs of impersonation. Double-check the domain.",
            ),
            BandSpec::new(
                "clone",
                60.0,
                "Do NOT enter credentials or personal information on this site.",
            ),
        ])
        .expect("default site bands are valid")
    }

    /// Phone-reputation ladder: five bands from appears_safe to
    /// confirmed_scam.
    pub fn phone_default() -> Self {
        Self::try_new(vec![
            BandSpec::new(
                "appears_safe",
                0.0,
                "No scam indicators found. Normal caution applies.",
            ),
            BandSpec::new(
                "caution",
                15.0,
                "Minor risk indicators. Avoid sharing personal details unprompted.",
            ),
            BandSpec::new(
                "suspicious",
                40.0,
                "Multiple risk indicators. Do not return calls or follow instructions from this number.",
            ),
            BandSpec::new(
                "likely_scam",
                70.0,
                "Strong scam indicators. Block this number and do not engage.",
            ),
            BandSpec::new(
                "confirmed_scam",
                85.0,
                "Confirmed scam number. Block it and report to your carrier.",
            ),
        ])
        .expect("default phone bands are valid")
    }

    /// Map a blended score to the highest band whose threshold it meets.
    pub fn band_for_score(&self, score: f64) -> Band {
        let score = clamp_score(score);
        let mut band = Band(0);
        for (idx, spec) in self.bands.iter().enumerate() {
            if score >= spec.min_score {
                band = Band(idx);
            }
        }
        band
    }

    /// The safe band (lowest severity).
    pub fn safe(&self) -> Band {
        Band(0)
    }

    /// The worst band (highest severity).
    pub fn worst(&self) -> Band {
        Band(self.bands.len() - 1)
    }

    /// The middle band, used for mixed verdicts and as the conservative
    /// fallback when no sources are usable.
    pub fn middle(&self) -> Band {
        Band(self.bands.len() / 2)
    }

    /// Wire label for a band. Out-of-range indices clamp to the worst band
    /// so the lookup stays total.
    pub fn label(&self, band: Band) -> &str {
        &self.spec(band).label
    }

    /// Advice string for a band. Total: every band maps to exactly one
    /// advice string.
    pub fn advice(&self, band: Band) -> &str {
        &self.spec(band).advice
    }

    /// The ordered band specs, safe first.
    pub fn specs(&self) -> &[BandSpec] {
        &self.bands
    }

    pub fn len(&self) -> usize {
        self.bands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bands.is_empty()
    }

    fn spec(&self, band: Band) -> &BandSpec {
        let idx = band.0.min(self.bands.len() - 1);
        &self.bands[idx]
    }
}
