//! Loan schedule and payment-state calculator.
//!
//! Implements the flat simple-interest model: the stated rate is applied once
//! to the full principal, regardless of the term length. The per-period
//! capital/interest split shown in the projection is display-only and derived
//! from a periodic rate (`tasa / 100 / n`) applied to the running balance; the
//! last period absorbs whatever balance is left so the projection always ends
//! at exactly zero.
//!
//! All arithmetic is done in f64 rounded to cents. Figures are converted to
//! `BigDecimal` only at the storage boundary.

use crate::errors::AppError;
use crate::models::FrecuenciaPago;
use chrono::NaiveDate;
use serde::Serialize;

/// Half a cent; tolerance used when comparing currency amounts.
const CENT_EPS: f64 = 0.005;

/// Longest supported term, in payment periods. Keeps the term well inside
/// i32 range for the NUMERIC schema and the projection bounded.
pub const MAX_SEMANAS: u32 = 600;

/// Scalar figures produced at loan creation/edit time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LoanQuote {
    pub total_pagar: f64,
    pub pago_semanal: f64,
}

/// One row of the amortization projection.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleEntry {
    /// 1-based period index.
    pub numero: u32,
    pub fecha_vencimiento: NaiveDate,
    pub monto_pago: f64,
    /// Capital (principal) component of the payment.
    pub capital: f64,
    /// Interest component of the payment.
    pub interes: f64,
    /// Principal balance remaining after this payment.
    pub saldo_restante: f64,
}

/// Outcome of comparing a payment amount against the periodic payment.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PaymentKind {
    /// Amount covers the periodic payment; the periods-paid counter advances.
    Full,
    /// Amount falls short; the shortfall is recorded on the payment row.
    Partial { saldo_restante: f64 },
}

/// Rounds to cents, half away from zero.
pub fn round_currency(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

fn validate_terms(monto: f64, tasa: f64, semanas: u32) -> Result<(), AppError> {
    if !monto.is_finite() || monto <= 0.0 {
        return Err(AppError::BadRequest(
            "El monto debe ser un numero mayor que cero".to_string(),
        ));
    }
    if !tasa.is_finite() || tasa <= 0.0 {
        return Err(AppError::BadRequest(
            "La tasa de interes debe ser mayor que cero".to_string(),
        ));
    }
    if semanas == 0 || semanas > MAX_SEMANAS {
        return Err(AppError::BadRequest(format!(
            "El numero de semanas debe estar entre 1 y {}",
            MAX_SEMANAS
        )));
    }
    Ok(())
}

/// Computes the total payable and the periodic payment for a loan.
///
/// Flat model, deliberately not amortizing or compounding:
/// `total = monto * (1 + tasa/100)`, `pago = total / semanas`.
pub fn quote(monto: f64, tasa: f64, semanas: u32) -> Result<LoanQuote, AppError> {
    validate_terms(monto, tasa, semanas)?;

    let total = round_currency(monto * (1.0 + tasa / 100.0));
    let pago = round_currency(total / semanas as f64);

    // A huge principal can overflow the product; never hand out non-finite
    // figures, serde_json would serialize them as null.
    if !total.is_finite() || !pago.is_finite() {
        return Err(AppError::BadRequest(
            "El monto total excede el rango soportado".to_string(),
        ));
    }

    Ok(LoanQuote {
        total_pagar: total,
        pago_semanal: pago,
    })
}

/// Builds the full period-by-period projection for display.
///
/// Exactly `semanas` entries. The running balance starts at the principal and
/// is monotonically non-increasing; the final entry lands on 0.00 because the
/// last period's capital is forced to the remaining balance.
pub fn build_schedule(
    monto: f64,
    tasa: f64,
    semanas: u32,
    fecha_inicio: NaiveDate,
    frecuencia: FrecuenciaPago,
) -> Result<Vec<ScheduleEntry>, AppError> {
    let figures = quote(monto, tasa, semanas)?;

    // Derived periodic rate for the capital/interest break-out. This is not
    // the flat rate above; the split approximates the flat total but only the
    // payment column is contractual.
    let tasa_periodo = tasa / 100.0 / semanas as f64;

    let mut entries = Vec::with_capacity(semanas as usize);
    let mut saldo = round_currency(monto);

    for numero in 1..=semanas {
        let fecha = frecuencia.due_date(fecha_inicio, numero);

        let interes = round_currency(saldo * tasa_periodo);
        let (capital, pago) = if numero == semanas {
            // Last period absorbs the whole remaining balance.
            (saldo, round_currency(saldo + interes))
        } else {
            // Clamped so cent rounding can never push the balance negative
            let capital = round_currency(figures.pago_semanal - interes)
                .clamp(0.0, saldo);
            (capital, figures.pago_semanal)
        };

        saldo = round_currency(saldo - capital);

        entries.push(ScheduleEntry {
            numero,
            fecha_vencimiento: fecha,
            monto_pago: pago,
            capital,
            interes,
            saldo_restante: saldo,
        });
    }

    Ok(entries)
}

/// Classifies a payment amount against the loan's periodic payment.
///
/// Amounts within half a cent of the periodic payment count as full, so a
/// client paying the displayed rounded figure is never flagged partial.
pub fn classify_payment(monto: f64, pago_semanal: f64) -> Result<PaymentKind, AppError> {
    if !monto.is_finite() || monto <= 0.0 {
        return Err(AppError::BadRequest(
            "El monto del pago debe ser mayor que cero".to_string(),
        ));
    }
    if pago_semanal <= 0.0 {
        return Err(AppError::InternalError(
            "Loan has a non-positive periodic payment".to_string(),
        ));
    }

    if monto + CENT_EPS >= pago_semanal {
        Ok(PaymentKind::Full)
    } else {
        Ok(PaymentKind::Partial {
            saldo_restante: round_currency(pago_semanal - monto),
        })
    }
}
