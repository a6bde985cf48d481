use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use std::io::Cursor;
use std::sync::Arc;
use tsload::ingest::parser::parse_line;
use tsload::store::MemoryStore;
use tsload::{load, transform, BatchScanner, BufferPool, Loader, RetryPolicy};

fn generate_telemetry(rows: usize) -> Vec<String> {
    let trucks = 100;
    (0..rows)
        .map(|i| {
            let truck = i % trucks;
            let tick = 1_451_606_400_000_000_000i64 + (i / trucks) as i64 * 10_000_000_000;
            format!(
                "readings,name=truck_{},fleet=South,driver=Trish,model=H-2,device_version=v2.3,\
                 load_capacity=1500,fuel_capacity=150,nominal_fuel_consumption=12 \
                 latitude={:.5},longitude={:.5},elevation={}i,velocity={}i,heading={}i,grade=0i,\
                 fuel_consumption={:.1} {}",
                truck,
                10.0 + truck as f64 * 0.5,
                20.0 + i as f64 * 0.001,
                1000 + i % 300,
                i % 90,
                i % 360,
                20.0 + (i % 10) as f64,
                tick
            )
        })
        .collect()
}

fn generate_cpu(rows: usize) -> Vec<String> {
    let hosts = 100;
    (0..rows)
        .map(|i| {
            let host = i % hosts;
            let tick = 1_451_606_400_000_000_000i64 + (i / hosts) as i64 * 10_000_000_000;
            format!(
                "cpu,hostname=host_{},region=eu-central-1,datacenter=eu-central-1a,rack=6 \
                 usage_user={}i,usage_system={}i,usage_idle={}i,usage_nice={}i,usage_iowait={}i,\
                 usage_irq={}i,usage_softirq={}i,usage_steal={}i,usage_guest={}i,usage_guest_nice={}i {}",
                host,
                i % 100,
                (i + 7) % 100,
                (i + 13) % 100,
                (i + 21) % 100,
                (i + 34) % 100,
                (i + 55) % 100,
                (i + 89) % 100,
                (i + 3) % 100,
                (i + 5) % 100,
                (i + 8) % 100,
                tick
            )
        })
        .collect()
}

fn bench_line_parsing(c: &mut Criterion) {
    let mut group = c.benchmark_group("line_parsing");

    let lines = generate_telemetry(1000);
    group.throughput(Throughput::Elements(lines.len() as u64));
    group.bench_function("parse_telemetry", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(parse_line(line).unwrap());
            }
        })
    });

    let lines = generate_cpu(1000);
    group.bench_function("parse_cpu", |b| {
        b.iter(|| {
            for line in &lines {
                black_box(parse_line(line).unwrap());
            }
        })
    });

    group.finish();
}

fn bench_batch_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch_transform");

    for size in [1_000, 10_000].iter() {
        let telemetry = generate_telemetry(*size);
        let cpu = generate_cpu(*size);
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("telemetry", size), &telemetry, |b, lines| {
            b.iter(|| black_box(transform(lines.iter().map(String::as_str)).unwrap()))
        });
        group.bench_with_input(BenchmarkId::new("cpu", size), &cpu, |b, lines| {
            b.iter(|| black_box(transform(lines.iter().map(String::as_str)).unwrap()))
        });
    }

    group.finish();
}

fn bench_full_load(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_load");
    group.sample_size(10);

    let input = generate_telemetry(50_000).join("\n");
    group.throughput(Throughput::Elements(50_000));

    for workers in [1, 4].iter() {
        group.bench_with_input(BenchmarkId::new("workers", workers), workers, |b, &workers| {
            b.iter(|| {
                let loader = Loader::new(Arc::new(MemoryStore::new()), RetryPolicy::default());
                let scanner =
                    BatchScanner::new(Cursor::new(input.as_bytes()), BufferPool::new(8), 5_000);
                black_box(load(scanner, &loader, workers).unwrap())
            })
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_line_parsing,
    bench_batch_transform,
    bench_full_load
);
criterion_main!(benches);
