use crate::domain::errors::FeatureError;
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Earnings announcements of one instrument, keyed by announcement date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EarningsEvents {
    surprises: BTreeMap<NaiveDate, f64>,
}

impl EarningsEvents {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds the lookup from the parallel lists an earnings calendar returns.
    pub fn from_pairs(dates: &[NaiveDate], surprises: &[f64]) -> Result<Self, FeatureError> {
        if dates.len() != surprises.len() {
            return Err(FeatureError::MalformedSeries {
                reason: format!(
                    "earnings history has {} dates but {} surprises",
                    dates.len(),
                    surprises.len()
                ),
            });
        }

        let mut map = BTreeMap::new();
        for (date, surprise) in dates.iter().zip(surprises) {
            if !surprise.is_finite() {
                return Err(FeatureError::MalformedSeries {
                    reason: format!("earnings surprise on {} is not finite", date),
                });
            }
            if map.insert(*date, *surprise).is_some() {
                return Err(FeatureError::MalformedSeries {
                    reason: format!("duplicate earnings date {}", date),
                });
            }
        }

        Ok(Self { surprises: map })
    }

    /// Surprise of an announcement dated exactly `date`, else 0.
    pub fn surprise_on(&self, date: NaiveDate) -> f64 {
        self.surprises.get(&date).copied().unwrap_or(0.0)
    }

    pub fn len(&self) -> usize {
        self.surprises.len()
    }

    pub fn is_empty(&self) -> bool {
        self.surprises.is_empty()
    }
}
