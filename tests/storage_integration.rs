use std::env;
use std::sync::Arc;
use uuid::Uuid;

use prestamos_api::amortization::{classify_payment, PaymentKind};
use prestamos_api::db::Database;
use prestamos_api::models::{CrearPrestamoRequest, EstadoPrestamo};
use prestamos_api::storage::LoanStorage;

/// Integration smoke test for the loan/payment storage flows.
/// Marked ignored to avoid running against production by accident; set
/// TEST_DATABASE_URL to run (schema.sql must be applied).
#[tokio::test]
#[ignore]
async fn loan_lifecycle_smoke_test() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let storage = LoanStorage::new(db.pool.clone());

    // Unique documento to avoid conflicts on repeated runs
    let documento = format!("T{}", &Uuid::new_v4().simple().to_string()[..12]);
    let cliente_id: Uuid = sqlx::query_scalar(
        "INSERT INTO clientes (nombre, documento) VALUES ($1, $2) RETURNING id",
    )
    .bind("Cliente De Prueba")
    .bind(&documento)
    .fetch_one(&db.pool)
    .await?;

    // Originate: P=5000, R=10, N=12 => total 5500.00, periodic 458.33
    let prestamo = storage
        .create_prestamo(&CrearPrestamoRequest {
            cliente_id,
            monto: 5000.0,
            tasa_interes: 10.0,
            numero_semanas: 12,
            frecuencia_pago: None,
            fecha_inicio: None,
            tasa_mora: None,
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    assert_eq!(prestamo.total_pagar.to_string(), "5500.00");
    assert_eq!(prestamo.pago_semanal.to_string(), "458.33");
    assert_eq!(prestamo.semanas_pagadas, 0);
    assert_eq!(prestamo.estado, EstadoPrestamo::Activo);

    // Full payment advances the counter
    let kind = classify_payment(458.33, 458.33).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(kind, PaymentKind::Full);
    let pago_full = storage
        .register_pago(prestamo.id, kind, 458.33, None)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(!pago_full.es_parcial);

    let prestamo = storage
        .get_prestamo(prestamo.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(prestamo.semanas_pagadas, 1);

    // Confirmed partial payment records the shortfall, counter untouched
    let kind = classify_payment(200.0, 458.33).map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let pago_parcial = storage
        .register_pago(prestamo.id, kind, 200.0, None)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert!(pago_parcial.es_parcial);
    assert_eq!(pago_parcial.saldo_restante.to_string(), "258.33");

    let prestamo = storage
        .get_prestamo(prestamo.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(prestamo.semanas_pagadas, 1);

    // Deleting both payments rolls the loan back to its initial state
    storage
        .delete_pago(pago_parcial.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    storage
        .delete_pago(pago_full.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let prestamo = storage
        .get_prestamo(prestamo.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(prestamo.semanas_pagadas, 0);

    // Cleanup
    storage
        .delete_prestamo(prestamo.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    sqlx::query("DELETE FROM clientes WHERE id = $1")
        .bind(cliente_id)
        .execute(&db.pool)
        .await?;

    Ok(())
}

/// Two full payments racing on the same loan must serialize on the row lock:
/// distinct numero_semana values and a counter that advances twice.
#[tokio::test]
#[ignore]
async fn concurrent_full_payments_serialize_on_the_loan_row() -> anyhow::Result<()> {
    let db_url = env::var("TEST_DATABASE_URL")
        .or_else(|_| env::var("DATABASE_URL"))
        .map_err(|_| anyhow::anyhow!("Set TEST_DATABASE_URL or DATABASE_URL to run this test"))?;

    let db = Database::new(&db_url).await?;
    let storage = Arc::new(LoanStorage::new(db.pool.clone()));

    let documento = format!("T{}", &Uuid::new_v4().simple().to_string()[..12]);
    let cliente_id: Uuid = sqlx::query_scalar(
        "INSERT INTO clientes (nombre, documento) VALUES ($1, $2) RETURNING id",
    )
    .bind("Cliente Concurrente")
    .bind(&documento)
    .fetch_one(&db.pool)
    .await?;

    let prestamo = storage
        .create_prestamo(&CrearPrestamoRequest {
            cliente_id,
            monto: 5000.0,
            tasa_interes: 10.0,
            numero_semanas: 12,
            frecuencia_pago: None,
            fecha_inicio: None,
            tasa_mora: None,
        })
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;

    let a = tokio::spawn({
        let storage = storage.clone();
        let id = prestamo.id;
        async move { storage.register_pago(id, PaymentKind::Full, 458.33, None).await }
    });
    let b = tokio::spawn({
        let storage = storage.clone();
        let id = prestamo.id;
        async move { storage.register_pago(id, PaymentKind::Full, 458.33, None).await }
    });

    let pago_a = a.await?.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    let pago_b = b.await?.map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_ne!(pago_a.numero_semana, pago_b.numero_semana);

    let prestamo = storage
        .get_prestamo(prestamo.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    assert_eq!(prestamo.semanas_pagadas, 2);

    // Cleanup
    for pago_id in [pago_a.id, pago_b.id] {
        storage
            .delete_pago(pago_id)
            .await
            .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    }
    storage
        .delete_prestamo(prestamo.id)
        .await
        .map_err(|e| anyhow::anyhow!(e.to_string()))?;
    sqlx::query("DELETE FROM clientes WHERE id = $1")
        .bind(cliente_id)
        .execute(&db.pool)
        .await?;

    Ok(())
}
