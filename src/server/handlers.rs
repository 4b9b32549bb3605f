use crate::broadcast::types::ClusterId;

use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceUpResponse {
    pub status: String,
    pub cluster_id: ClusterId,
}

/// `GET /` service-up check.
pub async fn handle_service_up(
    Extension(cluster_id): Extension<ClusterId>,
) -> (StatusCode, Json<ServiceUpResponse>) {
    (
        StatusCode::OK,
        Json(ServiceUpResponse {
            status: "ok".to_string(),
            cluster_id,
        }),
    )
}
