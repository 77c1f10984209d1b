use bcastsim::{runtime::Runtime, topology, Config};
use criterion::*;

fn run_broadcast(config: &Config) -> u64 {
    let mut rt = Runtime::with_seed_and_config(1, config.clone()).unwrap();
    topology::broadcast(&mut rt).unwrap();
    rt.run().events
}

fn fan_out(c: &mut Criterion) {
    let mut group = c.benchmark_group("broadcast fan-out");
    for outputs in [1, 4, 16, 64] {
        let mut config = Config::default();
        config.source.limit = 1000;
        config.channel.per = 0.1;
        config.topology.outputs = outputs;
        group.throughput(Throughput::Elements((outputs * 1000) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(outputs), &config, |b, config| {
            b.iter(|| black_box(run_broadcast(config)));
        });
    }
    group.finish();
}

criterion_group!(benches, fan_out);
criterion_main!(benches);
