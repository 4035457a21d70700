use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use zipsheet::xlsx::parallel::generate_parallel;
use zipsheet::xlsx::{write_worksheet, SharedStrings, WorksheetStream};
use zipsheet::{read, Cell, Worksheet, XlsxWriter};

fn make_rows(size: usize) -> Vec<Vec<Cell>> {
    (0..size)
        .map(|i| {
            vec![
                Cell::from(i as f64),
                Cell::from(format!("Name_{}", i % 500)),
                Cell::from((i * 100) as f64),
                Cell::from(i % 2 == 0),
            ]
        })
        .collect()
}

fn benchmark_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("batch");
    group.sample_size(10); // Reduce samples for large benchmarks

    for size in [1000, 10000, 50000].iter() {
        let worksheet = Worksheet::new("Data", make_rows(*size));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut strings = SharedStrings::new();
                black_box(write_worksheet(&worksheet, &mut strings));
            });
        });
    }

    group.finish();
}

fn benchmark_streaming(c: &mut Criterion) {
    let mut group = c.benchmark_group("streaming");
    group.sample_size(10);

    for size in [1000, 10000, 50000].iter() {
        let rows = make_rows(*size);
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| {
                let mut strings = SharedStrings::new();
                let bytes: usize = WorksheetStream::new(rows.iter(), &mut strings)
                    .map(|chunk| chunk.len())
                    .sum();
                black_box(bytes);
            });
        });
    }

    group.finish();
}

fn benchmark_parallel(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel");
    group.sample_size(10);

    for sheets in [2, 4, 8].iter() {
        let worksheets: Vec<Worksheet> = (0..*sheets)
            .map(|i| Worksheet::new(format!("Sheet{}", i + 1), make_rows(10000)))
            .collect();
        group.bench_with_input(BenchmarkId::from_parameter(sheets), sheets, |b, _| {
            b.iter(|| black_box(generate_parallel(&worksheets).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_read(c: &mut Criterion) {
    let mut group = c.benchmark_group("read");
    group.sample_size(10);

    for size in [1000, 10000].iter() {
        let mut writer = XlsxWriter::new();
        writer.add_worksheet("Data", make_rows(*size));
        let bytes = writer.generate_compressed().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, _| {
            b.iter(|| black_box(read(&bytes).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_batch,
    benchmark_streaming,
    benchmark_parallel,
    benchmark_read
);
criterion_main!(benches);
