use crate::config::Config;
use crate::errors::AppError;
use crate::models::*;
use crate::validation::is_valid_email;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use moka::future::Cache;
use serde_json::json;
use sqlx::PgPool;
use std::sync::Arc;
use uuid::Uuid;

/// Shared application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool.
    pub db: PgPool,
    /// Application configuration.
    pub config: Config,
    /// Short-TTL cache for the statistics endpoint (serialized JSON).
    pub stats_cache: Cache<String, String>,
}

/// Health check endpoint.
///
/// Returns the service status, version, and health information.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "prestamos-api",
            "version": "0.1.0"
        })),
    )
}

fn validate_cliente(req: &ClienteRequest) -> Result<(), AppError> {
    if req.nombre.trim().is_empty() {
        return Err(AppError::BadRequest(
            "El nombre del cliente es obligatorio".to_string(),
        ));
    }
    if let Some(email) = req.email.as_deref() {
        if !email.is_empty() && !is_valid_email(email) {
            return Err(AppError::BadRequest(format!(
                "Email invalido: {}",
                email
            )));
        }
    }
    Ok(())
}

// ============ Clientes ============

/// GET /api/clientes
///
/// Lists clients, optionally filtered by assigned collector.
pub async fn list_clientes(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ClienteQuery>,
) -> Result<Json<Vec<Cliente>>, AppError> {
    let clientes = match params.cobrador_id {
        Some(cobrador_id) => {
            sqlx::query_as::<_, Cliente>(
                "SELECT * FROM clientes WHERE cobrador_id = $1 ORDER BY nombre",
            )
            .bind(cobrador_id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Cliente>("SELECT * FROM clientes ORDER BY nombre")
                .fetch_all(&state.db)
                .await?
        }
    };
    Ok(Json(clientes))
}

/// GET /api/clientes/:id
pub async fn get_cliente(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<Cliente>, AppError> {
    let cliente = sqlx::query_as::<_, Cliente>("SELECT * FROM clientes WHERE id = $1")
        .bind(id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Cliente {} no encontrado", id)))?;
    Ok(Json(cliente))
}

/// POST /api/clientes
pub async fn create_cliente(
    State(state): State<Arc<AppState>>,
    Json(req): Json<ClienteRequest>,
) -> Result<(StatusCode, Json<Cliente>), AppError> {
    validate_cliente(&req)?;

    let cliente = sqlx::query_as::<_, Cliente>(
        r#"
        INSERT INTO clientes (nombre, telefono, direccion, documento, email, cobrador_id, activo)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        RETURNING *
        "#,
    )
    .bind(req.nombre.trim())
    .bind(&req.telefono)
    .bind(&req.direccion)
    .bind(&req.documento)
    .bind(&req.email)
    .bind(req.cobrador_id)
    .bind(req.activo.unwrap_or(true))
    .fetch_one(&state.db)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            AppError::Conflict("Ya existe un cliente con ese documento".to_string())
        }
        _ => AppError::DatabaseError(e),
    })?;

    tracing::info!("Cliente {} creado", cliente.id);
    Ok((StatusCode::CREATED, Json(cliente)))
}

/// PUT /api/clientes/:id
pub async fn update_cliente(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<ClienteRequest>,
) -> Result<Json<Cliente>, AppError> {
    validate_cliente(&req)?;

    let cliente = sqlx::query_as::<_, Cliente>(
        r#"
        UPDATE clientes SET
            nombre = $2, telefono = $3, direccion = $4, documento = $5,
            email = $6, cobrador_id = $7, activo = $8, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.nombre.trim())
    .bind(&req.telefono)
    .bind(&req.direccion)
    .bind(&req.documento)
    .bind(&req.email)
    .bind(req.cobrador_id)
    .bind(req.activo.unwrap_or(true))
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Cliente {} no encontrado", id)))?;

    Ok(Json(cliente))
}

/// DELETE /api/clientes/:id
///
/// Rejected while loans reference the client; loans are never cascade-deleted.
pub async fn delete_cliente(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let prestamos: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM prestamos WHERE cliente_id = $1")
        .bind(id)
        .fetch_one(&state.db)
        .await?;
    if prestamos > 0 {
        return Err(AppError::Conflict(
            "No se puede eliminar un cliente con prestamos registrados".to_string(),
        ));
    }

    let deleted = sqlx::query("DELETE FROM clientes WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Cliente {} no encontrado", id)));
    }

    Ok(StatusCode::NO_CONTENT)
}

// ============ Cobradores ============

/// GET /api/cobradores
pub async fn list_cobradores(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<Cobrador>>, AppError> {
    let cobradores = sqlx::query_as::<_, Cobrador>("SELECT * FROM cobradores ORDER BY nombre")
        .fetch_all(&state.db)
        .await?;
    Ok(Json(cobradores))
}

/// POST /api/cobradores
pub async fn create_cobrador(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CobradorRequest>,
) -> Result<(StatusCode, Json<Cobrador>), AppError> {
    if req.nombre.trim().is_empty() {
        return Err(AppError::BadRequest(
            "El nombre del cobrador es obligatorio".to_string(),
        ));
    }

    let cobrador = sqlx::query_as::<_, Cobrador>(
        r#"
        INSERT INTO cobradores (nombre, telefono, zona, activo)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(req.nombre.trim())
    .bind(&req.telefono)
    .bind(&req.zona)
    .bind(req.activo.unwrap_or(true))
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(cobrador)))
}

/// PUT /api/cobradores/:id
pub async fn update_cobrador(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<CobradorRequest>,
) -> Result<Json<Cobrador>, AppError> {
    if req.nombre.trim().is_empty() {
        return Err(AppError::BadRequest(
            "El nombre del cobrador es obligatorio".to_string(),
        ));
    }

    let cobrador = sqlx::query_as::<_, Cobrador>(
        r#"
        UPDATE cobradores SET
            nombre = $2, telefono = $3, zona = $4, activo = $5, updated_at = now()
        WHERE id = $1
        RETURNING *
        "#,
    )
    .bind(id)
    .bind(req.nombre.trim())
    .bind(&req.telefono)
    .bind(&req.zona)
    .bind(req.activo.unwrap_or(true))
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| AppError::NotFound(format!("Cobrador {} no encontrado", id)))?;

    Ok(Json(cobrador))
}

/// DELETE /api/cobradores/:id
///
/// Clients assigned to the collector are detached (cobrador_id set NULL by
/// the FK), not deleted.
pub async fn delete_cobrador(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = sqlx::query("DELETE FROM cobradores WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Cobrador {} no encontrado", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ============ Notas ============

/// GET /api/notas?cliente_id=
pub async fn list_notas(
    State(state): State<Arc<AppState>>,
    Query(params): Query<NotaQuery>,
) -> Result<Json<Vec<Nota>>, AppError> {
    let notas = match params.cliente_id {
        Some(cliente_id) => {
            sqlx::query_as::<_, Nota>(
                "SELECT * FROM notas WHERE cliente_id = $1 ORDER BY created_at DESC",
            )
            .bind(cliente_id)
            .fetch_all(&state.db)
            .await?
        }
        None => {
            sqlx::query_as::<_, Nota>("SELECT * FROM notas ORDER BY created_at DESC")
                .fetch_all(&state.db)
                .await?
        }
    };
    Ok(Json(notas))
}

/// POST /api/notas
pub async fn create_nota(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NotaRequest>,
) -> Result<(StatusCode, Json<Nota>), AppError> {
    if req.contenido.trim().is_empty() {
        return Err(AppError::BadRequest(
            "El contenido de la nota es obligatorio".to_string(),
        ));
    }

    let cliente: Option<Uuid> = sqlx::query_scalar("SELECT id FROM clientes WHERE id = $1")
        .bind(req.cliente_id)
        .fetch_optional(&state.db)
        .await?;
    if cliente.is_none() {
        return Err(AppError::NotFound(format!(
            "Cliente {} no encontrado",
            req.cliente_id
        )));
    }

    let nota = sqlx::query_as::<_, Nota>(
        "INSERT INTO notas (cliente_id, contenido) VALUES ($1, $2) RETURNING *",
    )
    .bind(req.cliente_id)
    .bind(req.contenido.trim())
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(nota)))
}

/// DELETE /api/notas/:id
pub async fn delete_nota(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let deleted = sqlx::query("DELETE FROM notas WHERE id = $1")
        .bind(id)
        .execute(&state.db)
        .await?;
    if deleted.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Nota {} no encontrada", id)));
    }
    Ok(StatusCode::NO_CONTENT)
}

// ============ Caja ============

/// GET /api/caja
///
/// Lists cash-register movements, optionally bounded by [desde, hasta].
pub async fn list_caja(
    State(state): State<Arc<AppState>>,
    Query(params): Query<CajaQuery>,
) -> Result<Json<Vec<MovimientoCaja>>, AppError> {
    let movimientos = sqlx::query_as::<_, MovimientoCaja>(
        r#"
        SELECT * FROM caja
        WHERE ($1::date IS NULL OR fecha::date >= $1)
          AND ($2::date IS NULL OR fecha::date <= $2)
        ORDER BY fecha DESC
        "#,
    )
    .bind(params.desde)
    .bind(params.hasta)
    .fetch_all(&state.db)
    .await?;

    Ok(Json(movimientos))
}

/// POST /api/caja
///
/// Records a manual cash movement. Loan disbursements and payments write
/// their own entries; this endpoint covers everything else (expenses, top-ups).
pub async fn create_movimiento_caja(
    State(state): State<Arc<AppState>>,
    Json(req): Json<MovimientoCajaRequest>,
) -> Result<(StatusCode, Json<MovimientoCaja>), AppError> {
    if !req.monto.is_finite() || req.monto <= 0.0 {
        return Err(AppError::BadRequest(
            "El monto debe ser mayor que cero".to_string(),
        ));
    }
    if req.concepto.trim().is_empty() {
        return Err(AppError::BadRequest(
            "El concepto es obligatorio".to_string(),
        ));
    }

    let movimiento = sqlx::query_as::<_, MovimientoCaja>(
        r#"
        INSERT INTO caja (tipo, concepto, monto, prestamo_id)
        VALUES ($1, $2, $3, $4)
        RETURNING *
        "#,
    )
    .bind(req.tipo)
    .bind(req.concepto.trim())
    .bind(crate::storage::to_money(req.monto)?)
    .bind(req.prestamo_id)
    .fetch_one(&state.db)
    .await?;

    Ok((StatusCode::CREATED, Json(movimiento)))
}
