//! Database storage service for loans, payments and the cash ledger.
//!
//! Multi-statement flows (loan origination, payment registration, rollbacks)
//! live here so handlers stay thin. Each flow runs inside a single
//! transaction; the database's own row locking is the only concurrency
//! control, matching the one-request-one-transaction model of the app.

use crate::amortization::{self, PaymentKind};
use crate::errors::AppError;
use crate::models::{
    ActualizarPrestamoRequest, CrearPrestamoRequest, EstadoPago, EstadoPrestamo, Pago, Prestamo,
    TipoMovimiento,
};
use bigdecimal::{BigDecimal, ToPrimitive};
use chrono::Utc;
use sqlx::PgPool;
use std::str::FromStr;
use uuid::Uuid;

/// Converts an f64 currency amount to the NUMERIC representation, rounded to
/// cents. Sequential queries bind these instead of raw floats.
pub fn to_money(value: f64) -> Result<BigDecimal, AppError> {
    if !value.is_finite() {
        return Err(AppError::BadRequest(
            "El monto debe ser un numero valido".to_string(),
        ));
    }
    BigDecimal::from_str(&format!("{:.2}", value))
        .map_err(|e| AppError::InternalError(format!("Invalid currency value: {}", e)))
}

/// Reads a NUMERIC column back as f64 for calculator arithmetic.
pub fn money_to_f64(value: &BigDecimal) -> Result<f64, AppError> {
    value
        .to_f64()
        .ok_or_else(|| AppError::InternalError("Currency value out of f64 range".to_string()))
}

pub struct LoanStorage {
    pool: PgPool,
}

impl LoanStorage {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_prestamo(&self, id: Uuid) -> Result<Prestamo, AppError> {
        sqlx::query_as::<_, Prestamo>("SELECT * FROM prestamos WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Prestamo {} no encontrado", id)))
    }

    async fn count_pagos(&self, prestamo_id: Uuid) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM pagos WHERE prestamo_id = $1")
                .bind(prestamo_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    /// Originates a loan: validates the client, computes the flat-interest
    /// figures server-side, and writes the disbursement to the cash ledger in
    /// the same transaction.
    pub async fn create_prestamo(&self, req: &CrearPrestamoRequest) -> Result<Prestamo, AppError> {
        let figures = amortization::quote(req.monto, req.tasa_interes, req.numero_semanas)?;

        let frecuencia = req.frecuencia_pago.unwrap_or_default();
        let fecha_inicio = req.fecha_inicio.unwrap_or_else(|| Utc::now().date_naive());
        let primera_fecha = frecuencia.due_date(fecha_inicio, 1);

        let mut tx = self.pool.begin().await?;

        let cliente_existe: Option<Uuid> =
            sqlx::query_scalar("SELECT id FROM clientes WHERE id = $1")
                .bind(req.cliente_id)
                .fetch_optional(&mut *tx)
                .await?;
        if cliente_existe.is_none() {
            return Err(AppError::NotFound(format!(
                "Cliente {} no encontrado",
                req.cliente_id
            )));
        }

        let tasa_mora = req.tasa_mora.map(to_money).transpose()?;

        let prestamo = sqlx::query_as::<_, Prestamo>(
            r#"
            INSERT INTO prestamos
                (cliente_id, monto, tasa_interes, numero_semanas, frecuencia_pago,
                 fecha_inicio, total_pagar, pago_semanal, semanas_pagadas,
                 proxima_fecha_pago, tasa_mora, estado)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 0, $9, $10, 'activo')
            RETURNING *
            "#,
        )
        .bind(req.cliente_id)
        .bind(to_money(req.monto)?)
        .bind(to_money(req.tasa_interes)?)
        .bind(req.numero_semanas as i32)
        .bind(frecuencia)
        .bind(fecha_inicio)
        .bind(to_money(figures.total_pagar)?)
        .bind(to_money(figures.pago_semanal)?)
        .bind(primera_fecha)
        .bind(tasa_mora)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO caja (tipo, concepto, monto, prestamo_id)
            VALUES ($1, $2, $3, $4)
            "#,
        )
        .bind(TipoMovimiento::Egreso)
        .bind(format!("Desembolso prestamo {}", prestamo.id))
        .bind(&prestamo.monto)
        .bind(prestamo.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Prestamo {} creado: total {} en {} periodos",
            prestamo.id,
            figures.total_pagar,
            req.numero_semanas
        );
        Ok(prestamo)
    }

    /// Updates a loan. Term changes recompute the figures and are rejected
    /// once payments exist; estado/tasa_mora can change at any time.
    pub async fn update_prestamo(
        &self,
        id: Uuid,
        req: &ActualizarPrestamoRequest,
    ) -> Result<Prestamo, AppError> {
        let existing = self.get_prestamo(id).await?;

        let terms_changed = req.monto.is_some()
            || req.tasa_interes.is_some()
            || req.numero_semanas.is_some()
            || req.frecuencia_pago.is_some()
            || req.fecha_inicio.is_some();

        if terms_changed && self.count_pagos(id).await? > 0 {
            return Err(AppError::Conflict(
                "No se pueden cambiar los terminos de un prestamo con pagos registrados"
                    .to_string(),
            ));
        }

        let monto = match req.monto {
            Some(m) => m,
            None => money_to_f64(&existing.monto)?,
        };
        let tasa = match req.tasa_interes {
            Some(t) => t,
            None => money_to_f64(&existing.tasa_interes)?,
        };
        let semanas = req.numero_semanas.unwrap_or(existing.numero_semanas as u32);
        let frecuencia = req.frecuencia_pago.unwrap_or(existing.frecuencia_pago);
        let fecha_inicio = req.fecha_inicio.unwrap_or(existing.fecha_inicio);
        let estado = req.estado.unwrap_or(existing.estado);
        let tasa_mora = match req.tasa_mora {
            Some(t) => Some(to_money(t)?),
            None => existing.tasa_mora.clone(),
        };

        let figures = amortization::quote(monto, tasa, semanas)?;
        let proxima = if terms_changed {
            frecuencia.due_date(fecha_inicio, 1)
        } else {
            existing.proxima_fecha_pago
        };

        let prestamo = sqlx::query_as::<_, Prestamo>(
            r#"
            UPDATE prestamos SET
                monto = $2, tasa_interes = $3, numero_semanas = $4,
                frecuencia_pago = $5, fecha_inicio = $6, total_pagar = $7,
                pago_semanal = $8, proxima_fecha_pago = $9, tasa_mora = $10,
                estado = $11, updated_at = now()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(to_money(monto)?)
        .bind(to_money(tasa)?)
        .bind(semanas as i32)
        .bind(frecuencia)
        .bind(fecha_inicio)
        .bind(to_money(figures.total_pagar)?)
        .bind(to_money(figures.pago_semanal)?)
        .bind(proxima)
        .bind(tasa_mora)
        .bind(estado)
        .fetch_one(&self.pool)
        .await?;

        Ok(prestamo)
    }

    /// Deletes a loan that has no payments, along with its disbursement entry.
    pub async fn delete_prestamo(&self, id: Uuid) -> Result<(), AppError> {
        // Ensure it exists first for a clean 404
        self.get_prestamo(id).await?;

        if self.count_pagos(id).await? > 0 {
            return Err(AppError::Conflict(
                "No se puede eliminar un prestamo con pagos registrados".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM caja WHERE prestamo_id = $1 AND pago_id IS NULL")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM prestamos WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        Ok(())
    }

    /// Persists a classified payment and its cash-ledger entry.
    ///
    /// Full payments advance the periods-paid counter and the next due date,
    /// and flip the loan to `pagado` when the last period is covered. Partial
    /// payments record the shortfall and leave the counter untouched.
    ///
    /// The loan row is re-read under `FOR UPDATE` inside the transaction, so
    /// concurrent payments against the same loan serialize and each one
    /// advances the counter from the committed value, never from a stale copy.
    pub async fn register_pago(
        &self,
        prestamo_id: Uuid,
        kind: PaymentKind,
        monto: f64,
        registrado_por: Option<Uuid>,
    ) -> Result<Pago, AppError> {
        let mut tx = self.pool.begin().await?;

        let prestamo =
            sqlx::query_as::<_, Prestamo>("SELECT * FROM prestamos WHERE id = $1 FOR UPDATE")
                .bind(prestamo_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or_else(|| {
                    AppError::NotFound(format!("Prestamo {} no encontrado", prestamo_id))
                })?;

        if prestamo.estado != EstadoPrestamo::Activo {
            return Err(AppError::Conflict(
                "Solo se pueden registrar pagos sobre prestamos activos".to_string(),
            ));
        }

        let hoy = Utc::now().date_naive();
        let estado_pago = if hoy <= prestamo.proxima_fecha_pago {
            EstadoPago::ATiempo
        } else {
            EstadoPago::Atrasado
        };

        let (es_parcial, saldo_restante) = match kind {
            PaymentKind::Full => (false, 0.0),
            PaymentKind::Partial { saldo_restante } => (true, saldo_restante),
        };
        let numero_semana = prestamo.semanas_pagadas + 1;

        let pago = sqlx::query_as::<_, Pago>(
            r#"
            INSERT INTO pagos
                (prestamo_id, monto, numero_semana, estado, es_parcial,
                 saldo_restante, registrado_por)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(prestamo.id)
        .bind(to_money(monto)?)
        .bind(numero_semana)
        .bind(estado_pago)
        .bind(es_parcial)
        .bind(to_money(saldo_restante)?)
        .bind(registrado_por)
        .fetch_one(&mut *tx)
        .await?;

        if !es_parcial {
            let semanas_pagadas = prestamo.semanas_pagadas + 1;
            let nuevo_estado = if semanas_pagadas >= prestamo.numero_semanas {
                EstadoPrestamo::Pagado
            } else {
                EstadoPrestamo::Activo
            };
            let proxima = prestamo
                .frecuencia_pago
                .due_date(prestamo.fecha_inicio, semanas_pagadas as u32 + 1);

            sqlx::query(
                r#"
                UPDATE prestamos SET
                    semanas_pagadas = $2, proxima_fecha_pago = $3, estado = $4,
                    updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(prestamo.id)
            .bind(semanas_pagadas)
            .bind(proxima)
            .bind(nuevo_estado)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query(
            r#"
            INSERT INTO caja (tipo, concepto, monto, prestamo_id, pago_id)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(TipoMovimiento::Ingreso)
        .bind(format!(
            "Pago semana {} prestamo {}",
            numero_semana, prestamo.id
        ))
        .bind(&pago.monto)
        .bind(prestamo.id)
        .bind(pago.id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            "Pago {} registrado para prestamo {} (semana {}, parcial: {})",
            pago.id,
            prestamo.id,
            numero_semana,
            es_parcial
        );
        Ok(pago)
    }

    /// Admin correction path: removes a payment and rolls back its effects.
    /// The cash-ledger entry is removed by the pago_id cascade.
    pub async fn delete_pago(&self, pago_id: Uuid) -> Result<(), AppError> {
        let pago = sqlx::query_as::<_, Pago>("SELECT * FROM pagos WHERE id = $1")
            .bind(pago_id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Pago {} no encontrado", pago_id)))?;

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM pagos WHERE id = $1")
            .bind(pago_id)
            .execute(&mut *tx)
            .await?;

        if !pago.es_parcial {
            let prestamo =
                sqlx::query_as::<_, Prestamo>("SELECT * FROM prestamos WHERE id = $1 FOR UPDATE")
                    .bind(pago.prestamo_id)
                    .fetch_one(&mut *tx)
                    .await?;

            let semanas_pagadas = (prestamo.semanas_pagadas - 1).max(0);
            let proxima = prestamo
                .frecuencia_pago
                .due_date(prestamo.fecha_inicio, semanas_pagadas as u32 + 1);
            let estado = match prestamo.estado {
                EstadoPrestamo::Pagado => EstadoPrestamo::Activo,
                other => other,
            };

            sqlx::query(
                r#"
                UPDATE prestamos SET
                    semanas_pagadas = $2, proxima_fecha_pago = $3, estado = $4,
                    updated_at = now()
                WHERE id = $1
                "#,
            )
            .bind(prestamo.id)
            .bind(semanas_pagadas)
            .bind(proxima)
            .bind(estado)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        tracing::info!("Pago {} eliminado (rollback aplicado)", pago_id);
        Ok(())
    }
}
