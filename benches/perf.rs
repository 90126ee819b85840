use criterion::{Criterion, criterion_group, criterion_main};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::hint::black_box;

use prop_terminal::conditions::{GameConditions, Precipitation, Weather};
use prop_terminal::parlay::{ParlayMode, aggregate_parlay, aggregate_parlay_with_points};
use prop_terminal::projection::{PropContext, PropRequest, project};
use prop_terminal::session::SessionContext;
use prop_terminal::stat_config::{Position, StatKind, StatTable};

fn sample_request(i: usize) -> PropRequest {
    PropRequest {
        player: format!("Player {i}"),
        position: Position::WR,
        stat: StatKind::ReceivingYards,
        opponent: "Arizona Cardinals".to_string(),
        is_home: i % 2 == 0,
        game_id: None,
    }
}

fn correlation(n: usize, rho: f64) -> Vec<Vec<f64>> {
    (0..n)
        .map(|i| (0..n).map(|j| if i == j { 1.0 } else { rho }).collect())
        .collect()
}

fn bench_single_projection(c: &mut Criterion) {
    let req = sample_request(0);
    let ctx = PropContext {
        conditions: Some(GameConditions {
            total: 48.5,
            spread: 3.0,
            weather: Some(Weather {
                temperature_f: 38.0,
                wind_mph: 14.0,
                precipitation: Precipitation::Light,
            }),
        }),
        history: Some(vec![88.0, 71.0, 102.0, 64.0, 93.0]),
        ..PropContext::default()
    };
    let table = StatTable::builtin();
    let mut rng = StdRng::seed_from_u64(1);
    c.bench_function("project_single", |b| {
        b.iter(|| {
            let leg = project(black_box(&req), black_box(&ctx), table, &mut rng).unwrap();
            black_box(leg.confidence);
        })
    });
}

fn bench_batch_projection(c: &mut Criterion) {
    let session = SessionContext::new(Some(1));
    let requests: Vec<PropRequest> = (0..512).map(sample_request).collect();
    c.bench_function("project_batch_512", |b| {
        b.iter(|| {
            let out = session.project_batch(black_box(&requests), 7);
            black_box(out.len());
        })
    });
}

fn bench_parlay(c: &mut Criterion) {
    let confidences = [72.0, 68.0, 64.0, 61.0, 70.0, 66.0];
    c.bench_function("parlay_independent_6", |b| {
        b.iter(|| {
            let q = aggregate_parlay(black_box(&confidences), &ParlayMode::Independent).unwrap();
            black_box(q.probability);
        })
    });

    let mode = ParlayMode::Correlated(correlation(confidences.len(), 0.25));
    c.bench_function("parlay_correlated_6", |b| {
        b.iter(|| {
            let q = aggregate_parlay_with_points(black_box(&confidences), &mode, 4096).unwrap();
            black_box(q.probability);
        })
    });
}

criterion_group!(
    benches,
    bench_single_projection,
    bench_batch_projection,
    bench_parlay
);
criterion_main!(benches);
