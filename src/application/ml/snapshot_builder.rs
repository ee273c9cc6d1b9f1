use crate::application::feature_engineering_service::TechnicalFeatureEngineeringService;
use crate::domain::errors::FeatureError;
use crate::domain::market::earnings::EarningsEvents;
use crate::domain::market::series::RawSeries;
use crate::domain::ml::feature_matrix::FeatureMatrix;
use crate::domain::ml::snapshot::Snapshot;
use std::sync::Arc;
use tracing::info;

/// Builds the offline snapshot: every registered column, unscaled, for each bar
/// of an anchored history.
#[derive(Debug, Clone)]
pub struct SnapshotBuilder {
    service: TechnicalFeatureEngineeringService,
}

impl Default for SnapshotBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SnapshotBuilder {
    pub fn new() -> Self {
        Self {
            service: TechnicalFeatureEngineeringService::all_columns(),
        }
    }

    pub fn derive(
        &self,
        series: &RawSeries,
        earnings: Arc<EarningsEvents>,
    ) -> Result<FeatureMatrix, FeatureError> {
        if series.is_empty() {
            return Err(FeatureError::DataInsufficient {
                rows: 0,
                required: 1,
            });
        }
        self.service.derive_batch(series, &earnings)
    }

    pub fn build(
        &self,
        series: &RawSeries,
        earnings: Arc<EarningsEvents>,
    ) -> Result<Snapshot, FeatureError> {
        let matrix = self.derive(series, earnings)?;
        let snapshot = Snapshot::from_matrix(series.symbol(), &matrix)?;
        info!(
            "Built snapshot for {}: {} rows x {} columns",
            series.symbol(),
            snapshot.len(),
            snapshot.columns().len()
        );
        Ok(snapshot)
    }
}
