use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fare_finder::{pair, FlightLeg, PairingConstraints, Route};
use rand::{thread_rng, Rng};

fn random_legs(count: usize, from: &str, to: &str) -> Vec<FlightLeg> {
    let mut rng = thread_rng();
    let start = NaiveDate::from_ymd_opt(2025, 6, 1).unwrap();

    (0..count)
        .map(|_| {
            let date = start + Duration::days(rng.gen_range(0..42));
            FlightLeg {
                departure_station: from.to_string(),
                arrival_station: to.to_string(),
                departure_date: date,
                departure_times: vec![date.and_hms_opt(rng.gen_range(5..23), 0, 0).unwrap()],
                price: rng.gen_range(10.0..400.0),
                currency: "EUR".to_string(),
            }
        })
        .collect()
}

// Cross product cost for a full 42-day window, several flights per day
pub fn pairing_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("pairing_engine");

    for legs in [42, 126, 252].iter() {
        let outbound = random_legs(*legs, "BUD", "LTN");
        let returns = random_legs(*legs, "LTN", "BUD");
        let route = Route::new("BUD", "LTN");

        group.bench_with_input(BenchmarkId::new("round_trip", legs), legs, |b, _| {
            let constraints = PairingConstraints::round_trip(2, 7);
            b.iter(|| black_box(pair(&route, &outbound, &returns, &constraints)));
        });

        group.bench_with_input(BenchmarkId::new("one_way", legs), legs, |b, _| {
            let constraints = PairingConstraints::one_way();
            b.iter(|| black_box(pair(&route, &outbound, &returns, &constraints)));
        });
    }

    group.finish();
}

criterion_group!(benches, pairing_benchmark);
criterion_main!(benches);
