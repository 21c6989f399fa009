use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use debug_align::prelude::*;

fn bench_placement(c: &mut Criterion) {
    let mut group = c.benchmark_group("placement");
    let _guard = install_shared(rejecting_handler());

    for &misaligned in &[false, true] {
        group.bench_with_input(
            BenchmarkId::new("construct_f64", if misaligned { "misaligned" } else { "aligned" }),
            &misaligned,
            |b, &misaligned| {
                let mut scratch = Scratch::<f64>::new();
                let bytes = scratch.bytes_mut();
                let offset = if misaligned {
                    misaligned_offset::<f64>(bytes).expect("room to misalign")
                } else {
                    0
                };
                let mut slot = Slot::<f64>::new(bytes, offset).expect("slot fits");
                b.iter(|| {
                    let outcome = slot.construct(black_box(1.5)).map(|p| p.get());
                    black_box(outcome)
                })
            },
        );
    }
    group.finish();
}

fn bench_aligned_number(c: &mut Criterion) {
    let xs: Vec<AlignedNumber<f64>> = (0..1024).map(|i| AlignedNumber::new(i as f64)).collect();
    c.bench_function("aligned_number_sum", |b| {
        b.iter(|| black_box(xs.iter().copied().sum::<AlignedNumber<f64>>()))
    });
}

criterion_group!(benches, bench_placement, bench_aligned_number);
criterion_main!(benches);
