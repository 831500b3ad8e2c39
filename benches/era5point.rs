use criterion::{black_box, criterion_group, criterion_main, Criterion};
use era5point::{plan_reanalysis, plan_radiation, LatLon, SkyType, TimeReference, TimeStep};

fn bench_planning(c: &mut Criterion) {
    let variables = vec!["2m_temperature".to_string()];
    c.bench_function("plan_reanalysis_full_year", |b| {
        b.iter(|| {
            plan_reanalysis(
                None,
                black_box(&variables),
                black_box(2021),
                None,
                LatLon(49.4, 0.1),
                Some(2),
            )
        })
    });
    c.bench_function("plan_radiation_full_year", |b| {
        b.iter(|| {
            plan_radiation(
                LatLon(49.4, 0.1),
                black_box(2021),
                SkyType::ObservedCloud,
                vec!["0".to_string()],
                TimeStep::OneHour,
                TimeReference::UniversalTime,
                Some(2),
            )
        })
    });
}

criterion_group!(benches, bench_planning);
criterion_main!(benches);
