//! HTTP handlers for loan origination, editing and the amortization views.

use crate::amortization::{self, ScheduleEntry};
use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::*;
use crate::storage::{money_to_f64, LoanStorage};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

/// POST /api/calcular-prestamo
///
/// Pure calculation used by the loan form: returns the flat-interest total
/// and the periodic payment. Nothing is persisted.
pub async fn calcular_prestamo(
    Json(req): Json<CalcularPrestamoRequest>,
) -> Result<Json<CalcularPrestamoResponse>, AppError> {
    let figures = amortization::quote(req.monto, req.tasa_interes, req.numero_semanas)?;
    Ok(Json(CalcularPrestamoResponse {
        total_pagar: figures.total_pagar,
        pago_semanal: figures.pago_semanal,
    }))
}

/// GET /api/prestamos
///
/// Lists loans, optionally filtered by client and/or state.
pub async fn list_prestamos(
    State(state): State<Arc<AppState>>,
    Query(params): Query<PrestamoQuery>,
) -> Result<Json<Vec<Prestamo>>, AppError> {
    let prestamos = sqlx::query_as::<_, Prestamo>(
        r#"
        SELECT * FROM prestamos
        WHERE ($1::uuid IS NULL OR cliente_id = $1)
          AND ($2::text IS NULL OR estado = $2)
        ORDER BY created_at DESC
        "#,
    )
    .bind(params.cliente_id)
    .bind(params.estado)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(prestamos))
}

/// GET /api/prestamos/:id
pub async fn get_prestamo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Prestamo>, AppError> {
    let storage = LoanStorage::new(state.db.clone());
    Ok(Json(storage.get_prestamo(id).await?))
}

/// POST /api/prestamos
///
/// Originates a loan. Figures (total_pagar, pago_semanal) are always computed
/// server-side from the submitted terms; any client-sent figures are ignored.
pub async fn create_prestamo(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CrearPrestamoRequest>,
) -> Result<(StatusCode, Json<Prestamo>), AppError> {
    let storage = LoanStorage::new(state.db.clone());
    let prestamo = storage.create_prestamo(&req).await?;
    Ok((StatusCode::CREATED, Json(prestamo)))
}

/// PUT /api/prestamos/:id
pub async fn update_prestamo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ActualizarPrestamoRequest>,
) -> Result<Json<Prestamo>, AppError> {
    let storage = LoanStorage::new(state.db.clone());
    Ok(Json(storage.update_prestamo(id, &req).await?))
}

/// DELETE /api/prestamos/:id
pub async fn delete_prestamo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let storage = LoanStorage::new(state.db.clone());
    storage.delete_prestamo(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/prestamos/:id/cronograma
///
/// Full period-by-period amortization projection for the loan's terms.
pub async fn cronograma(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<ScheduleEntry>>, AppError> {
    let storage = LoanStorage::new(state.db.clone());
    let prestamo = storage.get_prestamo(id).await?;

    let schedule = amortization::build_schedule(
        money_to_f64(&prestamo.monto)?,
        money_to_f64(&prestamo.tasa_interes)?,
        prestamo.numero_semanas as u32,
        prestamo.fecha_inicio,
        prestamo.frecuencia_pago,
    )?;

    Ok(Json(schedule))
}

/// GET /api/prestamos/:id/pagos
pub async fn pagos_de_prestamo(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Vec<Pago>>, AppError> {
    // 404 for unknown loans rather than an empty list
    let storage = LoanStorage::new(state.db.clone());
    storage.get_prestamo(id).await?;

    let pagos = sqlx::query_as::<_, Pago>(
        "SELECT * FROM pagos WHERE prestamo_id = $1 ORDER BY numero_semana, fecha_pago",
    )
    .bind(id)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(pagos))
}
