/// Unit tests for the reporting response shapes.
use prestamos_api::models::Estadisticas;

fn sample() -> Estadisticas {
    Estadisticas {
        total_clientes: 42,
        prestamos_activos: 10,
        prestamos_pagados: 5,
        total_prestado: "50000.00".to_string(),
        total_cobrado: "12500.00".to_string(),
        esperado_hoy: "4583.30".to_string(),
        cobrado_hoy: "2291.65".to_string(),
        prestamos_vencidos_hoy: 3,
    }
}

#[test]
fn estadisticas_exposes_expected_vs_collected_for_the_day() {
    let value = serde_json::to_value(sample()).unwrap();
    let obj = value.as_object().unwrap();

    // The dashboard reads these keys; renaming any of them breaks it
    for key in [
        "total_clientes",
        "prestamos_activos",
        "prestamos_pagados",
        "total_prestado",
        "total_cobrado",
        "esperado_hoy",
        "cobrado_hoy",
        "prestamos_vencidos_hoy",
    ] {
        assert!(obj.contains_key(key), "missing field {}", key);
    }
    assert_eq!(obj["esperado_hoy"], "4583.30");
    assert_eq!(obj["cobrado_hoy"], "2291.65");
}

#[test]
fn estadisticas_round_trips_through_the_cache_encoding() {
    // The stats cache stores serialized JSON and decodes it on a hit
    let encoded = serde_json::to_string(&sample()).unwrap();
    let decoded: Estadisticas = serde_json::from_str(&encoded).unwrap();
    assert_eq!(decoded.total_clientes, 42);
    assert_eq!(decoded.esperado_hoy, "4583.30");
    assert_eq!(decoded.cobrado_hoy, "2291.65");
    assert_eq!(decoded.prestamos_vencidos_hoy, 3);
}
