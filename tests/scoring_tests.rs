use fipe_comparador::models::vehicle::{
    ConsumptionSpec, DataSource, EngineSpec, FuelType, Origin, PerformanceSpec, Transmission,
    VehicleRecord,
};
use fipe_comparador::services::scoring_service::ScoringService;
use fipe_comparador::utils::errors::AppError;
use fipe_comparador::utils::price::format_price_brl;
use rust_decimal::Decimal;

fn vehicle(id: &str, accel: f64, city: f64, highway: f64, year: i32, price: i64) -> VehicleRecord {
    VehicleRecord {
        id: id.to_string(),
        brand: "Prueba".to_string(),
        model: "Modelo 1.6".to_string(),
        year,
        price_amount: Decimal::from(price),
        price_display: format_price_brl(Decimal::from(price)),
        fuel_type: FuelType::Flex,
        transmission: Transmission::Manual,
        engine: EngineSpec {
            power_hp: 100.0,
            torque_nm: 130.0,
            cylinders: 4,
            displacement_liters: 1.6,
        },
        performance: PerformanceSpec {
            max_speed_kmh: 180.0,
            accel_0_100_s: accel,
        },
        consumption: ConsumptionSpec {
            city_kmpl: city,
            highway_kmpl: highway,
        },
        doors: 4,
        seats: 5,
        features: vec!["Aire acondicionado".to_string()],
        origin: Origin::Domestic,
        data_source: DataSource::Live,
    }
}

fn close(actual: f64, expected: f64) -> bool {
    (actual - expected).abs() < 0.01
}

#[test]
fn test_exact_two_vehicle_scenario() {
    // A: rápido pero caro; B: lento pero económico y barato
    let a = vehicle("a", 8.0, 10.0, 14.0, 2023, 80_000);
    let b = vehicle("b", 12.0, 14.0, 18.0, 2020, 45_000);

    let outcome = ScoringService::score(&[a, b]).unwrap();

    let score_a = &outcome.breakdowns[0];
    assert!(close(score_a.acceleration_score, 20.0));
    assert!(close(score_a.economy_score, 60.0));
    assert!(close(score_a.recency_score, 95.83));
    assert!(close(score_a.value_score, 20.0));
    assert!(close(score_a.total_score, 48.96));

    let score_b = &outcome.breakdowns[1];
    assert!(close(score_b.acceleration_score, 0.0)); // -20 acotado a 0
    assert!(close(score_b.economy_score, 80.0));
    assert!(close(score_b.recency_score, 83.33));
    assert!(close(score_b.value_score, 55.0));
    assert!(close(score_b.total_score, 51.83));

    assert_eq!(outcome.winner.id, "b");
}

#[test]
fn test_tie_favors_first_vehicle() {
    let first = vehicle("primero", 10.0, 12.0, 15.0, 2021, 60_000);
    let second = vehicle("segundo", 10.0, 12.0, 15.0, 2021, 60_000);

    let outcome = ScoringService::score(&[first, second]).unwrap();

    assert_eq!(
        outcome.breakdowns[0].total_score,
        outcome.breakdowns[1].total_score
    );
    assert_eq!(outcome.winner.id, "primero");
}

#[test]
fn test_scores_are_clamped_to_range() {
    // acel absurda y precio altísimo fuerzan los límites
    let extreme = vehicle("extremo", 25.0, 50.0, 60.0, 1995, 500_000);
    let normal = vehicle("normal", 9.0, 12.0, 16.0, 2022, 70_000);

    let outcome = ScoringService::score(&[extreme, normal]).unwrap();

    for breakdown in &outcome.breakdowns {
        for score in [
            breakdown.acceleration_score,
            breakdown.economy_score,
            breakdown.recency_score,
            breakdown.value_score,
            breakdown.total_score,
        ] {
            assert!((0.0..=100.0).contains(&score));
        }
    }
}

#[test]
fn test_invalid_comparison_sizes() {
    let one = vec![vehicle("solo", 10.0, 12.0, 15.0, 2021, 60_000)];
    assert!(matches!(
        ScoringService::score(&one),
        Err(AppError::Validation(_))
    ));

    let four: Vec<VehicleRecord> = (0..4)
        .map(|index| vehicle(&format!("v{}", index), 10.0, 12.0, 15.0, 2021, 60_000))
        .collect();
    assert!(matches!(
        ScoringService::score(&four),
        Err(AppError::Validation(_))
    ));
}

#[test]
fn test_scoring_is_deterministic() {
    let a = vehicle("a", 8.5, 11.0, 14.5, 2022, 75_000);
    let b = vehicle("b", 11.0, 13.0, 17.0, 2019, 52_000);
    let c = vehicle("c", 9.5, 12.0, 15.0, 2021, 64_000);

    let first = ScoringService::score(&[a.clone(), b.clone(), c.clone()]).unwrap();
    let second = ScoringService::score(&[a, b, c]).unwrap();

    for (left, right) in first.breakdowns.iter().zip(second.breakdowns.iter()) {
        assert_eq!(left.total_score, right.total_score);
    }
    assert_eq!(first.winner.id, second.winner.id);
}
