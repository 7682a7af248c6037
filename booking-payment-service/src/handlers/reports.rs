//! Revenue chart endpoint.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use service_core::error::AppError;
use service_core::extract::FilterQuery;

use crate::dtos::{ChartResponse, NoDataResponse};
use crate::report::{ChartQuery, ReportOutcome, ReportRequest};
use crate::AppState;

/// Revenue buckets for the dashboard chart. An empty window answers 404 with
/// `status: false`; that is a "no data" signal, not a failure.
///
/// GET /payments/chart?type&year&month&start&end
pub async fn revenue_chart(
    State(state): State<AppState>,
    FilterQuery(query): FilterQuery<ChartQuery>,
) -> Result<Response, AppError> {
    let request = ReportRequest::resolve(&query)?;

    let response = match state.reports.revenue(request).await {
        Ok(ReportOutcome::Data(data)) => Json(ChartResponse { status: true, data }).into_response(),
        Ok(ReportOutcome::Empty) => (
            StatusCode::NOT_FOUND,
            Json(NoDataResponse {
                status: false,
                message: "No data for this request".to_string(),
            }),
        )
            .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Revenue report failed");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(NoDataResponse {
                    status: false,
                    message: "An error occurred while building the report".to_string(),
                }),
            )
                .into_response()
        }
    };

    Ok(response)
}
