//! Revenue figures for the admin dashboard charts.

use std::sync::Arc;

use service_core::error::AppError;
use tracing::instrument;

use crate::report::{build_report, ReportOutcome, ReportRequest};
use crate::services::store::PaymentStore;

#[derive(Clone)]
pub struct RevenueReporter {
    store: Arc<dyn PaymentStore>,
}

impl RevenueReporter {
    pub fn new(store: Arc<dyn PaymentStore>) -> Self {
        Self { store }
    }

    /// Bucket the frozen payment totals inside the requested window.
    #[instrument(skip(self), fields(window = ?request.window, granularity = ?request.granularity))]
    pub async fn revenue(&self, request: ReportRequest) -> Result<ReportOutcome, AppError> {
        let (from, until) = request.window.utc_bounds();
        let rows = self.store.revenue_rows(from, until).await?;
        Ok(build_report(&request, &rows))
    }
}
