use chrono::{Duration, NaiveDate};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use fare_tracker::{compute_statistics, top_destinations, FareRecord, Mode};
use rand::{seq::SliceRandom, thread_rng, Rng};

const DESTINATIONS: [&str; 8] = ["BOM", "BLR", "GOI", "MAA", "CCU", "HYD", "PNQ", "COK"];

// One snapshot per day, a tenth of them unpriced
fn price_history(days: usize) -> Vec<FareRecord> {
    let mut rng = thread_rng();
    let start = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
    (0..days)
        .map(|i| {
            let price = if rng.gen_bool(0.1) {
                None
            } else {
                Some(rng.gen_range(2000.0..15000.0))
            };
            let destination = DESTINATIONS.choose(&mut rng).unwrap();
            FareRecord::new(Mode::Flight, "DEL", *destination, start + Duration::days(i as i64), price)
        })
        .collect()
}

pub fn statistics_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("route_statistics");

    for days in [60, 1000, 10_000].iter() {
        let sorted = price_history(*days);
        let mut shuffled = sorted.clone();
        shuffled.shuffle(&mut thread_rng());

        group.bench_with_input(BenchmarkId::new("sorted", days), &sorted, |b, series| {
            b.iter(|| black_box(compute_statistics(series)))
        });
        group.bench_with_input(BenchmarkId::new("unsorted", days), &shuffled, |b, series| {
            b.iter(|| black_box(compute_statistics(series)))
        });
        group.bench_with_input(BenchmarkId::new("top_destinations", days), &sorted, |b, series| {
            b.iter(|| black_box(top_destinations(series, 5)))
        });
    }

    group.finish();
}

criterion_group!(benches, statistics_benchmark);
criterion_main!(benches);
