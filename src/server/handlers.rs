use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::sync::Arc;
use tracing::warn;

use crate::error::QuoteError;
use crate::pricing::EquipmentType;
use crate::quote::{QuoteRecord, QuoteRequest};

use super::state::AppState;

// ─── Error response ──────────────────────────────────────────────

#[derive(Serialize)]
struct ApiErrorBody {
    error: String,
    code: u16,
    kind: &'static str,
}

pub(super) struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ApiErrorBody {
            error: self.message,
            code: self.status.as_u16(),
            kind: self.kind,
        };
        (self.status, Json(body)).into_response()
    }
}

impl From<QuoteError> for ApiError {
    fn from(e: QuoteError) -> Self {
        let status = if e.is_client_error() {
            StatusCode::UNPROCESSABLE_ENTITY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        Self {
            status,
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(r: JsonRejection) -> Self {
        Self {
            status: r.status(),
            kind: "invalid_input",
            message: r.body_text(),
        }
    }
}

// ─── GET /api/health ─────────────────────────────────────────────

#[derive(Serialize)]
pub struct Health {
    status: &'static str,
    version: &'static str,
}

pub async fn health() -> Json<Health> {
    Json(Health {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

// ─── GET /api/equipment ──────────────────────────────────────────

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EquipmentInfo {
    equipment_type: EquipmentType,
    multiplier: f64,
}

pub async fn equipment(State(state): State<Arc<AppState>>) -> Json<Vec<EquipmentInfo>> {
    let pricing = state.engine.pricing();
    Json(
        EquipmentType::ALL
            .into_iter()
            .map(|e| EquipmentInfo {
                equipment_type: e,
                multiplier: pricing.multiplier(e),
            })
            .collect(),
    )
}

// ─── POST /api/quote ─────────────────────────────────────────────

pub(super) async fn quote(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<QuoteRequest>, JsonRejection>,
) -> Result<Json<QuoteRecord>, ApiError> {
    let Json(request) = payload?;

    let result = state.engine.quote(&request).await.map_err(|e| {
        warn!(error = %e, kind = e.kind(), "quote rejected");
        ApiError::from(e)
    })?;

    Ok(Json(QuoteRecord::from_parts(&request, &result)))
}
