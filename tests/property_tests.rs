/// Property-based tests using proptest
/// Tests invariants that should hold for all loan terms
use chrono::NaiveDate;
use prestamos_api::amortization::{build_schedule, classify_payment, quote, PaymentKind};
use prestamos_api::models::FrecuenciaPago;
use proptest::prelude::*;

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 1, 6).unwrap()
}

// Property: the flat-interest formula holds for any valid terms
proptest! {
    #[test]
    fn total_is_principal_plus_flat_interest(
        monto in 1.0f64..1_000_000.0,
        tasa in 0.1f64..200.0,
        semanas in 1u32..=104,
    ) {
        let q = quote(monto, tasa, semanas).unwrap();
        let expected = monto * (1.0 + tasa / 100.0);
        // Within cent rounding
        prop_assert!((q.total_pagar - expected).abs() <= 0.005);
        prop_assert!((q.pago_semanal - q.total_pagar / semanas as f64).abs() <= 0.005);
    }

    #[test]
    fn quote_never_panics_on_arbitrary_input(
        monto in proptest::num::f64::ANY,
        tasa in proptest::num::f64::ANY,
        semanas in proptest::num::u32::ANY,
    ) {
        let _ = quote(monto, tasa, semanas);
    }
}

// Property: schedule shape invariants
proptest! {
    #[test]
    fn schedule_has_n_entries_and_ends_at_zero(
        monto in 1.0f64..1_000_000.0,
        tasa in 0.1f64..200.0,
        semanas in 1u32..=104,
    ) {
        let schedule =
            build_schedule(monto, tasa, semanas, start_date(), FrecuenciaPago::Semanal).unwrap();
        prop_assert_eq!(schedule.len(), semanas as usize);
        prop_assert_eq!(schedule.last().unwrap().saldo_restante, 0.0);
    }

    #[test]
    fn balance_is_monotonically_non_increasing(
        monto in 1.0f64..1_000_000.0,
        tasa in 0.1f64..200.0,
        semanas in 1u32..=104,
    ) {
        let schedule =
            build_schedule(monto, tasa, semanas, start_date(), FrecuenciaPago::Semanal).unwrap();
        let mut prev = f64::MAX;
        for entry in &schedule {
            prop_assert!(entry.saldo_restante <= prev);
            prop_assert!(entry.saldo_restante >= 0.0);
            prev = entry.saldo_restante;
        }
    }

    #[test]
    fn due_dates_are_strictly_increasing(
        monto in 1.0f64..100_000.0,
        tasa in 0.1f64..100.0,
        semanas in 2u32..=60,
    ) {
        for frecuencia in [
            FrecuenciaPago::Semanal,
            FrecuenciaPago::Quincenal,
            FrecuenciaPago::Mensual,
        ] {
            let schedule =
                build_schedule(monto, tasa, semanas, start_date(), frecuencia).unwrap();
            for pair in schedule.windows(2) {
                prop_assert!(pair[0].fecha_vencimiento < pair[1].fecha_vencimiento);
            }
        }
    }
}

// Property: payment classification
proptest! {
    #[test]
    fn amounts_at_or_above_periodic_are_full(
        pago_semanal in 0.01f64..100_000.0,
        extra in 0.0f64..10_000.0,
    ) {
        let kind = classify_payment(pago_semanal + extra, pago_semanal).unwrap();
        prop_assert_eq!(kind, PaymentKind::Full);
    }

    #[test]
    fn partial_shortfall_accounts_for_the_difference(
        pago_semanal in 1.0f64..100_000.0,
        fraction in 0.01f64..0.95,
    ) {
        let monto = pago_semanal * fraction;
        match classify_payment(monto, pago_semanal).unwrap() {
            PaymentKind::Partial { saldo_restante } => {
                prop_assert!((saldo_restante - (pago_semanal - monto)).abs() <= 0.005);
            }
            // Rounding tolerance can absorb fractions extremely close to 1
            PaymentKind::Full => prop_assert!(pago_semanal - monto <= 0.005),
        }
    }

    #[test]
    fn classify_never_panics_on_arbitrary_input(
        monto in proptest::num::f64::ANY,
        pago_semanal in proptest::num::f64::ANY,
    ) {
        let _ = classify_payment(monto, pago_semanal);
    }
}
