//! Reporting endpoints: aggregate statistics and the daily collection list.

use crate::errors::AppError;
use crate::handlers::AppState;
use crate::models::{CobroDia, Estadisticas};
use axum::{extract::State, Json};
use bigdecimal::BigDecimal;
use std::sync::Arc;

const STATS_CACHE_KEY: &str = "estadisticas";

/// GET /api/estadisticas
///
/// Dashboard aggregates. Cached for a short TTL (configured on the moka cache
/// in main) since every page load hits this endpoint.
pub async fn estadisticas(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Estadisticas>, AppError> {
    if let Some(cached) = state.stats_cache.get(STATS_CACHE_KEY).await {
        if let Ok(stats) = serde_json::from_str::<Estadisticas>(&cached) {
            tracing::debug!("Estadisticas cache HIT");
            return Ok(Json(stats));
        }
    }

    let total_clientes: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM clientes")
        .fetch_one(&state.db)
        .await?;

    let prestamos_activos: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM prestamos WHERE estado = 'activo'")
            .fetch_one(&state.db)
            .await?;

    let prestamos_pagados: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM prestamos WHERE estado = 'pagado'")
            .fetch_one(&state.db)
            .await?;

    let total_prestado: BigDecimal =
        sqlx::query_scalar("SELECT COALESCE(SUM(monto), 0) FROM prestamos")
            .fetch_one(&state.db)
            .await?;

    let total_cobrado: BigDecimal = sqlx::query_scalar("SELECT COALESCE(SUM(monto), 0) FROM pagos")
        .fetch_one(&state.db)
        .await?;

    // Same population as /api/cobros-dia: active loans due today or overdue
    let esperado_hoy: BigDecimal = sqlx::query_scalar(
        "SELECT COALESCE(SUM(pago_semanal), 0) FROM prestamos \
         WHERE estado = 'activo' AND proxima_fecha_pago <= CURRENT_DATE",
    )
    .fetch_one(&state.db)
    .await?;

    let cobrado_hoy: BigDecimal = sqlx::query_scalar(
        "SELECT COALESCE(SUM(monto), 0) FROM pagos WHERE fecha_pago::date = CURRENT_DATE",
    )
    .fetch_one(&state.db)
    .await?;

    let prestamos_vencidos_hoy: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM prestamos WHERE estado = 'activo' AND proxima_fecha_pago < CURRENT_DATE",
    )
    .fetch_one(&state.db)
    .await?;

    let stats = Estadisticas {
        total_clientes,
        prestamos_activos,
        prestamos_pagados,
        total_prestado: total_prestado.to_string(),
        total_cobrado: total_cobrado.to_string(),
        esperado_hoy: esperado_hoy.to_string(),
        cobrado_hoy: cobrado_hoy.to_string(),
        prestamos_vencidos_hoy,
    };

    if let Ok(json_str) = serde_json::to_string(&stats) {
        state
            .stats_cache
            .insert(STATS_CACHE_KEY.to_string(), json_str)
            .await;
    }

    Ok(Json(stats))
}

/// GET /api/cobros-dia
///
/// Collections due today or overdue: active loans with a next due date at or
/// before today, joined to the client and their assigned collector. Backs the
/// daily-collections view.
pub async fn cobros_dia(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<CobroDia>>, AppError> {
    let cobros = sqlx::query_as::<_, CobroDia>(
        r#"
        SELECT
            p.id AS prestamo_id,
            c.id AS cliente_id,
            c.nombre AS cliente_nombre,
            c.telefono AS cliente_telefono,
            c.direccion AS cliente_direccion,
            cb.nombre AS cobrador_nombre,
            p.pago_semanal,
            p.proxima_fecha_pago,
            p.semanas_pagadas,
            p.numero_semanas
        FROM prestamos p
        JOIN clientes c ON c.id = p.cliente_id
        LEFT JOIN cobradores cb ON cb.id = c.cobrador_id
        WHERE p.estado = 'activo' AND p.proxima_fecha_pago <= CURRENT_DATE
        ORDER BY p.proxima_fecha_pago, c.nombre
        "#,
    )
    .fetch_all(&state.db)
    .await?;

    Ok(Json(cobros))
}
