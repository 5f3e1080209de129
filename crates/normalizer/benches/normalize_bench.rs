//! 정규화 벤치마크
//!
//! 번들 룰셋을 로드한 풀로 라인 종류별 정규화 처리량을 측정합니다.

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use lognorm_core::types::{RAW_FIELD, Record};
use lognorm_normalizer::NormalizerPool;

const BUNDLED: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/normalizers");

const LINES: [(&str, &str); 4] = [
    ("syslog", "Jul 18 08:55:35 naruto app[3245]: body message"),
    (
        "sshd",
        "<38>Jul 18 08:55:35 naruto sshd[1234]: Failed password for root from 192.168.1.100 port 40022 ssh2",
    ),
    (
        "apache",
        r#"Jul 18 08:55:35 www apache: 10.10.4.4 - - [04/Dec/2009:16:23:13 +0100] "GET /index.html HTTP/1.1" 200 2937 "http://10.10.4.86/toc.html" "Mozilla/5.0""#,
    ),
    ("unmatched", "this line matches nothing at all"),
];

fn load_pool() -> NormalizerPool {
    let runtime = tokio::runtime::Runtime::new().unwrap();
    runtime.block_on(NormalizerPool::new([BUNDLED])).unwrap()
}

fn bench_normalize_lines(c: &mut Criterion) {
    let pool = load_pool();

    let mut group = c.benchmark_group("normalize");
    group.throughput(Throughput::Elements(1));

    for (kind, line) in LINES {
        group.bench_with_input(BenchmarkId::from_parameter(kind), line, |b, line| {
            b.iter(|| {
                let mut record = Record::with_field(RAW_FIELD, black_box(line));
                pool.normalize(&mut record)
            })
        });
    }

    group.finish();
}

fn bench_batch_throughput(c: &mut Criterion) {
    let pool = load_pool();
    let batch: Vec<&str> = LINES.iter().map(|(_, line)| *line).cycle().take(1_000).collect();

    let mut group = c.benchmark_group("batch");
    group.throughput(Throughput::Elements(batch.len() as u64));

    group.bench_function("mixed_1000", |b| {
        b.iter(|| {
            let mut matched = 0;
            for line in &batch {
                let mut record = Record::with_field(RAW_FIELD, *line);
                matched += pool.normalize(&mut record);
            }
            black_box(matched)
        })
    });

    group.finish();
}

criterion_group!(benches, bench_normalize_lines, bench_batch_throughput);
criterion_main!(benches);
