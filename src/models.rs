use bigdecimal::BigDecimal;
use chrono::{DateTime, Months, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

// ============ Enumerations ============

/// Payment frequency of a loan. Stored as TEXT in postgres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum FrecuenciaPago {
    Semanal,
    Quincenal,
    Mensual,
}

impl FrecuenciaPago {
    /// Due date of the 1-based period `periodo`, anchored to the origination
    /// date so monthly schedules never drift after a clamped short month
    /// (Jan 31 -> Feb 28 -> Mar 31, not Mar 28).
    pub fn due_date(&self, fecha_inicio: NaiveDate, periodo: u32) -> NaiveDate {
        match self {
            FrecuenciaPago::Semanal => fecha_inicio + chrono::Duration::days(7 * periodo as i64),
            FrecuenciaPago::Quincenal => {
                fecha_inicio + chrono::Duration::days(14 * periodo as i64)
            }
            FrecuenciaPago::Mensual => fecha_inicio + Months::new(periodo),
        }
    }
}

impl Default for FrecuenciaPago {
    fn default() -> Self {
        FrecuenciaPago::Semanal
    }
}

/// Lifecycle state of a loan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum EstadoPrestamo {
    Activo,
    Pagado,
    Vencido,
}

/// Whether a payment landed on or before its due date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EstadoPago {
    ATiempo,
    Atrasado,
}

/// Direction of a cash-register movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum TipoMovimiento {
    Ingreso,
    Egreso,
}

// ============ Database Models ============

/// Application user (staff). Password is stored as an argon2 hash only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    /// Either "admin" or "cobrador".
    pub role: String,
    pub created_at: DateTime<Utc>,
}

/// Public projection of a user, safe to return from the API.
#[derive(Debug, Clone, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub role: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            role: user.role,
            created_at: user.created_at,
        }
    }
}

/// Collector (cobrador) assigned to clients for field collection.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cobrador {
    pub id: Uuid,
    pub nombre: String,
    pub telefono: Option<String>,
    /// Collection zone or route label.
    pub zona: Option<String>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Client of the business. Referenced by loans; never cascade-deleted.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Cliente {
    pub id: Uuid,
    pub nombre: String,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    /// National identity document, unique when present.
    pub documento: Option<String>,
    pub email: Option<String>,
    /// Assigned collector, if any.
    pub cobrador_id: Option<Uuid>,
    pub activo: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A loan (prestamo) under the flat simple-interest model.
///
/// `total_pagar` and `pago_semanal` are computed server-side at creation and
/// whenever the terms change: `total = monto * (1 + tasa/100)`,
/// `pago = total / numero_semanas`, both rounded to cents.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Prestamo {
    pub id: Uuid,
    pub cliente_id: Uuid,
    /// Principal amount lent.
    pub monto: BigDecimal,
    /// Flat interest rate in percent, applied once to the full principal.
    pub tasa_interes: BigDecimal,
    /// Term, in payment periods.
    pub numero_semanas: i32,
    pub frecuencia_pago: FrecuenciaPago,
    pub fecha_inicio: NaiveDate,
    /// Computed total payable over the life of the loan.
    pub total_pagar: BigDecimal,
    /// Computed periodic payment.
    pub pago_semanal: BigDecimal,
    /// Number of fully-paid periods so far.
    pub semanas_pagadas: i32,
    pub proxima_fecha_pago: NaiveDate,
    /// Optional stored late-fee rate. Recorded only; never auto-applied.
    pub tasa_mora: Option<BigDecimal>,
    pub estado: EstadoPrestamo,
    pub created_at: DateTime<Utc>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// A registered payment. Immutable once created; deletion is the only
/// correction path (admin only).
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Pago {
    pub id: Uuid,
    pub prestamo_id: Uuid,
    pub monto: BigDecimal,
    pub fecha_pago: DateTime<Utc>,
    /// 1-based period index this payment applies to.
    pub numero_semana: i32,
    pub estado: EstadoPago,
    pub es_parcial: bool,
    /// Shortfall against the periodic payment; zero for full payments.
    pub saldo_restante: BigDecimal,
    pub registrado_por: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Free-form note attached to a client.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Nota {
    pub id: Uuid,
    pub cliente_id: Uuid,
    pub contenido: String,
    pub created_at: DateTime<Utc>,
}

/// Cash-register ledger entry. Append-only.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct MovimientoCaja {
    pub id: Uuid,
    pub tipo: TipoMovimiento,
    pub concepto: String,
    pub monto: BigDecimal,
    pub fecha: DateTime<Utc>,
    pub prestamo_id: Option<Uuid>,
    pub pago_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

// ============ API Request Models ============

/// Public registration payload. Always creates a cobrador account; the role
/// is deliberately not part of the payload (admins are provisioned via the
/// bootstrap endpoint).
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// Debug-only password reset payload (DEBUG_ENDPOINTS=true).
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    pub username: String,
    pub new_password: String,
}

#[derive(Debug, Deserialize)]
pub struct ClienteRequest {
    pub nombre: String,
    pub telefono: Option<String>,
    pub direccion: Option<String>,
    pub documento: Option<String>,
    pub email: Option<String>,
    pub cobrador_id: Option<Uuid>,
    pub activo: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct CobradorRequest {
    pub nombre: String,
    pub telefono: Option<String>,
    pub zona: Option<String>,
    pub activo: Option<bool>,
}

/// Body of POST /api/calcular-prestamo. Pure calculation, nothing persisted.
#[derive(Debug, Deserialize)]
pub struct CalcularPrestamoRequest {
    pub monto: f64,
    pub tasa_interes: f64,
    pub numero_semanas: u32,
}

#[derive(Debug, Serialize)]
pub struct CalcularPrestamoResponse {
    pub total_pagar: f64,
    pub pago_semanal: f64,
}

#[derive(Debug, Deserialize)]
pub struct CrearPrestamoRequest {
    pub cliente_id: Uuid,
    pub monto: f64,
    pub tasa_interes: f64,
    pub numero_semanas: u32,
    pub frecuencia_pago: Option<FrecuenciaPago>,
    /// Origination date; defaults to today.
    pub fecha_inicio: Option<NaiveDate>,
    pub tasa_mora: Option<f64>,
}

/// Partial update of a loan's terms. Only allowed while no payments exist;
/// figures are recomputed from the merged terms.
#[derive(Debug, Deserialize)]
pub struct ActualizarPrestamoRequest {
    pub monto: Option<f64>,
    pub tasa_interes: Option<f64>,
    pub numero_semanas: Option<u32>,
    pub frecuencia_pago: Option<FrecuenciaPago>,
    pub fecha_inicio: Option<NaiveDate>,
    pub tasa_mora: Option<f64>,
    pub estado: Option<EstadoPrestamo>,
}

#[derive(Debug, Deserialize)]
pub struct RegistrarPagoRequest {
    pub prestamo_id: Uuid,
    pub monto: f64,
    /// Must be true to persist a partial payment.
    #[serde(default)]
    pub confirmado: bool,
}

#[derive(Debug, Deserialize)]
pub struct NotaRequest {
    pub cliente_id: Uuid,
    pub contenido: String,
}

#[derive(Debug, Deserialize)]
pub struct MovimientoCajaRequest {
    pub tipo: TipoMovimiento,
    pub concepto: String,
    pub monto: f64,
    pub prestamo_id: Option<Uuid>,
}

// ============ Query Parameters ============

#[derive(Debug, Deserialize)]
pub struct ClienteQuery {
    pub cobrador_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct PrestamoQuery {
    pub cliente_id: Option<Uuid>,
    pub estado: Option<EstadoPrestamo>,
}

#[derive(Debug, Deserialize)]
pub struct PagoQuery {
    pub prestamo_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct NotaQuery {
    pub cliente_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct CajaQuery {
    pub desde: Option<NaiveDate>,
    pub hasta: Option<NaiveDate>,
}

// ============ Reporting Models ============

/// Aggregate figures for GET /api/estadisticas.
#[derive(Debug, Serialize, Deserialize)]
pub struct Estadisticas {
    pub total_clientes: i64,
    pub prestamos_activos: i64,
    pub prestamos_pagados: i64,
    /// Sum of principal across all loans.
    pub total_prestado: String,
    /// Sum of all registered payments.
    pub total_cobrado: String,
    /// Sum of the periodic payments of active loans due today or earlier,
    /// i.e. what the collectors should bring in today.
    pub esperado_hoy: String,
    /// Sum of payments registered today.
    pub cobrado_hoy: String,
    /// Active loans whose next due date is already past.
    pub prestamos_vencidos_hoy: i64,
}

/// One row of GET /api/cobros-dia: a collection due today (or overdue),
/// joined to the client and the assigned collector.
#[derive(Debug, FromRow, Serialize)]
pub struct CobroDia {
    pub prestamo_id: Uuid,
    pub cliente_id: Uuid,
    pub cliente_nombre: String,
    pub cliente_telefono: Option<String>,
    pub cliente_direccion: Option<String>,
    pub cobrador_nombre: Option<String>,
    pub pago_semanal: BigDecimal,
    pub proxima_fecha_pago: NaiveDate,
    pub semanas_pagadas: i32,
    pub numero_semanas: i32,
}
