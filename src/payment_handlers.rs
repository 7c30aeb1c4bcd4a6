//! HTTP handlers for payment registration and corrections.

use crate::amortization::{self, PaymentKind};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::*;
use crate::storage::{money_to_f64, LoanStorage};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// GET /api/pagos
pub async fn list_pagos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PagoQuery>,
) -> Result<Json<Vec<Pago>>, AppError> {
    let pagos = match params.prestamo_id {
        Some(prestamo_id) => {
            sqlx::query_as::<_, Pago>(
                "SELECT * FROM pagos WHERE prestamo_id = $1 ORDER BY fecha_pago DESC",
            )
            .bind(prestamo_id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Pago>("SELECT * FROM pagos ORDER BY fecha_pago DESC")
                .fetch_all(&state.db)
                .await?
        }
    };
    Ok(Json(pagos))
}

/// POST /api/pagos
///
/// Registers a payment against a loan. The amount is classified against the
/// loan's periodic payment:
///
/// - full payment: pago row with es_parcial=false, the periods-paid counter
///   advances and the next due date steps by one frequency interval;
/// - partial payment without `confirmado: true`: nothing is persisted and the
///   response is 409 with `requires_confirmation`, so the UI can ask the
///   operator to confirm;
/// - partial payment confirmed: pago row with es_parcial=true and the
///   shortfall in saldo_restante; the counter does not advance.
///
/// Every persisted payment also writes an ingreso entry to the cash ledger.
pub async fn registrar_pago(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Json(req): Json<RegistrarPagoRequest>,
) -> Result<Response, AppError> {
    let storage = LoanStorage::new(state.db.clone());
    let prestamo = storage.get_prestamo(req.prestamo_id).await?;

    if prestamo.estado != EstadoPrestamo::Activo {
        return Err(AppError::Conflict(
            "Solo se pueden registrar pagos sobre prestamos activos".to_string(),
        ));
    }

    let pago_semanal = money_to_f64(&prestamo.pago_semanal)?;
    let kind = amortization::classify_payment(req.monto, pago_semanal)?;

    if let PaymentKind::Partial { saldo_restante } = kind {
        if !req.confirmado {
            tracing::info!(
                "Pago parcial sin confirmar para prestamo {} ({} de {})",
                prestamo.id,
                req.monto,
                pago_semanal
            );
            return Ok((
                StatusCode::CONFLICT,
                Json(json!({
                    "requires_confirmation": true,
                    "error": "El monto es menor al pago periodico; confirme el pago parcial",
                    "monto": req.monto,
                    "pago_semanal": pago_semanal,
                    "saldo_restante": saldo_restante,
                })),
            )
                .into_response());
        }
    }

    let pago = storage
        .register_pago(prestamo.id, kind, req.monto, Some(user.0.id))
        .await?;

    Ok((StatusCode::CREATED, Json(pago)).into_response())
}

/// DELETE /api/pagos/:id
///
/// Admin-only correction path. Rolls back the periods-paid counter for full
/// payments and removes the associated cash-ledger entry.
pub async fn delete_pago(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<CurrentUser>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    if !user.is_admin() {
        return Err(AppError::Unauthorized(
            "Solo un administrador puede eliminar pagos".to_string(),
        ));
    }

    let storage = LoanStorage::new(state.db.clone());
    storage.delete_pago(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
