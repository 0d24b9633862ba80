use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use crowd_simulation::{CrowdConfig, Simulation};

const FULL_CROWD: &str = "あいうえおかきくけこさしすせそたちつてとなにぬねのはひふへほまみむめもやゆよらりるれろわをんがぎぐげご";

fn settled_crowd(repulsion: i32) -> Simulation {
    let mut sim = Simulation::with_config(CrowdConfig {
        repulsion,
        seed: Some(7),
        ..CrowdConfig::default()
    })
    .unwrap();
    sim.gather(FULL_CROWD).unwrap();
    // Past the gathering phase so the bench measures steady state.
    for _ in 0..120 {
        sim.step();
    }
    sim
}

fn bench_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("crowd_step");

    for repulsion in [0, 100, 200] {
        let mut sim = settled_crowd(repulsion);
        group.throughput(Throughput::Elements(sim.len() as u64));
        group.bench_function(format!("repulsion_{repulsion}"), |b| {
            b.iter(|| sim.step());
        });
    }

    group.finish();
}

fn bench_explode(c: &mut Criterion) {
    c.bench_function("explode_until_empty", |b| {
        b.iter_batched(
            || settled_crowd(100),
            |mut sim| {
                sim.explode_all();
                for _ in 0..400 {
                    if sim.is_empty() {
                        break;
                    }
                    sim.step();
                }
                sim
            },
            criterion::BatchSize::LargeInput,
        );
    });
}

criterion_group!(benches, bench_step, bench_explode);
criterion_main!(benches);
