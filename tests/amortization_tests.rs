/// Unit tests for the loan calculator: flat-interest quote, schedule
/// projection and payment classification.
use chrono::NaiveDate;
use prestamos_api::amortization::{
    build_schedule, classify_payment, quote, round_currency, PaymentKind, MAX_SEMANAS,
};
use prestamos_api::models::FrecuenciaPago;

fn approx(a: f64, b: f64) -> bool {
    (a - b).abs() < 0.005
}

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

mod quote_tests {
    use super::*;

    #[test]
    fn flat_interest_example() {
        // P=5000, R=10, N=12 => total 5500.00, periodic 458.33
        let q = quote(5000.0, 10.0, 12).unwrap();
        assert!(approx(q.total_pagar, 5500.00));
        assert!(approx(q.pago_semanal, 458.33));
    }

    #[test]
    fn rate_is_not_prorated_by_term() {
        // Same principal and rate, different terms: total identical
        let q12 = quote(1000.0, 20.0, 12).unwrap();
        let q52 = quote(1000.0, 20.0, 52).unwrap();
        assert!(approx(q12.total_pagar, 1200.00));
        assert!(approx(q52.total_pagar, 1200.00));
    }

    #[test]
    fn periodic_is_total_over_term() {
        let q = quote(2000.0, 15.0, 10).unwrap();
        assert!(approx(q.total_pagar, 2300.00));
        assert!(approx(q.pago_semanal, 230.00));
    }

    #[test]
    fn rejects_non_positive_inputs() {
        assert!(quote(0.0, 10.0, 12).is_err());
        assert!(quote(-100.0, 10.0, 12).is_err());
        assert!(quote(5000.0, 0.0, 12).is_err());
        assert!(quote(5000.0, -5.0, 12).is_err());
        assert!(quote(5000.0, 10.0, 0).is_err());
    }

    #[test]
    fn rejects_non_finite_inputs() {
        assert!(quote(f64::NAN, 10.0, 12).is_err());
        assert!(quote(f64::INFINITY, 10.0, 12).is_err());
        assert!(quote(5000.0, f64::NAN, 12).is_err());
    }

    #[test]
    fn rejects_terms_beyond_the_supported_maximum() {
        assert!(quote(1000.0, 10.0, MAX_SEMANAS).is_ok());
        assert!(quote(1000.0, 10.0, MAX_SEMANAS + 1).is_err());
        assert!(quote(1000.0, 10.0, u32::MAX).is_err());
    }

    #[test]
    fn rejects_quotes_that_overflow_to_infinity() {
        // The inputs are finite but the product is not representable
        assert!(quote(f64::MAX, 10.0, 12).is_err());
        assert!(quote(f64::MAX / 2.0, 200.0, 12).is_err());
    }

    #[test]
    fn rounding_is_half_away_from_zero() {
        assert_eq!(round_currency(458.335), 458.34);
        assert_eq!(round_currency(458.334), 458.33);
        assert_eq!(round_currency(0.005), 0.01);
    }
}

mod schedule_tests {
    use super::*;

    #[test]
    fn has_exactly_n_entries() {
        let schedule =
            build_schedule(5000.0, 10.0, 12, date(2025, 1, 6), FrecuenciaPago::Semanal).unwrap();
        assert_eq!(schedule.len(), 12);
        assert_eq!(schedule.first().unwrap().numero, 1);
        assert_eq!(schedule.last().unwrap().numero, 12);
    }

    #[test]
    fn balance_is_non_increasing_and_ends_at_zero() {
        let schedule =
            build_schedule(5000.0, 10.0, 12, date(2025, 1, 6), FrecuenciaPago::Semanal).unwrap();

        let mut prev = f64::MAX;
        for entry in &schedule {
            assert!(entry.saldo_restante <= prev + 0.005);
            assert!(entry.saldo_restante >= -0.005);
            prev = entry.saldo_restante;
        }
        assert_eq!(schedule.last().unwrap().saldo_restante, 0.0);
    }

    #[test]
    fn capital_components_sum_to_principal() {
        let schedule =
            build_schedule(5000.0, 10.0, 12, date(2025, 1, 6), FrecuenciaPago::Semanal).unwrap();
        let capital: f64 = schedule.iter().map(|e| e.capital).sum();
        assert!(approx(capital, 5000.0));
    }

    #[test]
    fn interest_split_uses_running_balance() {
        // First period interest = P * R/100/N on the full principal
        let schedule =
            build_schedule(5000.0, 10.0, 12, date(2025, 1, 6), FrecuenciaPago::Semanal).unwrap();
        let first = &schedule[0];
        assert!(approx(first.interes, round_currency(5000.0 * 0.10 / 12.0)));
        // Later periods accrue less interest than earlier ones
        assert!(schedule[5].interes < schedule[0].interes);
    }

    #[test]
    fn weekly_due_dates_step_seven_days() {
        let inicio = date(2025, 1, 6);
        let schedule =
            build_schedule(1000.0, 10.0, 4, inicio, FrecuenciaPago::Semanal).unwrap();
        assert_eq!(schedule[0].fecha_vencimiento, date(2025, 1, 13));
        assert_eq!(schedule[1].fecha_vencimiento, date(2025, 1, 20));
        assert_eq!(schedule[3].fecha_vencimiento, date(2025, 2, 3));
    }

    #[test]
    fn biweekly_due_dates_step_fourteen_days() {
        let schedule =
            build_schedule(1000.0, 10.0, 3, date(2025, 1, 6), FrecuenciaPago::Quincenal).unwrap();
        assert_eq!(schedule[0].fecha_vencimiento, date(2025, 1, 20));
        assert_eq!(schedule[1].fecha_vencimiento, date(2025, 2, 3));
        assert_eq!(schedule[2].fecha_vencimiento, date(2025, 2, 17));
    }

    #[test]
    fn monthly_due_dates_clamp_short_months() {
        // Jan 31 + 1 month lands on Feb 28
        let schedule =
            build_schedule(1000.0, 10.0, 3, date(2025, 1, 31), FrecuenciaPago::Mensual).unwrap();
        assert_eq!(schedule[0].fecha_vencimiento, date(2025, 2, 28));
        assert_eq!(schedule[1].fecha_vencimiento, date(2025, 3, 31));
    }

    #[test]
    fn single_period_loan_pays_everything_at_once() {
        let schedule =
            build_schedule(500.0, 10.0, 1, date(2025, 1, 6), FrecuenciaPago::Semanal).unwrap();
        assert_eq!(schedule.len(), 1);
        assert!(approx(schedule[0].capital, 500.0));
        assert_eq!(schedule[0].saldo_restante, 0.0);
    }

    #[test]
    fn tiny_principal_long_term_stays_non_negative() {
        let schedule =
            build_schedule(1.0, 0.5, 104, date(2025, 1, 6), FrecuenciaPago::Semanal).unwrap();
        for entry in &schedule {
            assert!(entry.saldo_restante >= 0.0);
        }
        assert_eq!(schedule.last().unwrap().saldo_restante, 0.0);
    }
}

mod classify_tests {
    use super::*;

    #[test]
    fn exact_periodic_amount_is_full() {
        assert_eq!(classify_payment(458.33, 458.33).unwrap(), PaymentKind::Full);
    }

    #[test]
    fn overpayment_is_full() {
        assert_eq!(classify_payment(500.0, 458.33).unwrap(), PaymentKind::Full);
    }

    #[test]
    fn one_cent_short_is_partial() {
        match classify_payment(458.32, 458.33).unwrap() {
            PaymentKind::Partial { saldo_restante } => assert!(approx(saldo_restante, 0.01)),
            PaymentKind::Full => panic!("expected partial"),
        }
    }

    #[test]
    fn partial_records_the_shortfall() {
        match classify_payment(300.0, 458.33).unwrap() {
            PaymentKind::Partial { saldo_restante } => assert!(approx(saldo_restante, 158.33)),
            PaymentKind::Full => panic!("expected partial"),
        }
    }

    #[test]
    fn rejects_non_positive_amounts() {
        assert!(classify_payment(0.0, 458.33).is_err());
        assert!(classify_payment(-10.0, 458.33).is_err());
        assert!(classify_payment(f64::NAN, 458.33).is_err());
    }
}
