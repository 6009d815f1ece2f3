use criterion::{criterion_group, criterion_main, Criterion};
use eftem::lowlevel::{LmaFitter, LseFitter, MleFitter, WlseFitter};
use eftem::{
    CorrelationMode, CrossCorrelation, ElementalMapping, FitSample, ImageView, JobControl,
    MappingConfig, PowerLawFit, WorkerPool,
};
use std::hint::black_box;

fn make_image(width: usize, height: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(width * height);
    for y in 0..height {
        for x in 0..width {
            let value = ((x * 13) ^ (y * 7) ^ (x * y)) & 0xFF;
            data.push(value as f32);
        }
    }
    data
}

fn bench_correlation(c: &mut Criterion) {
    let width = 256;
    let height = 256;
    let image = make_image(width, height);
    let view = ImageView::from_slice(&image, width, height).unwrap();
    let search = view.roi(64, 64, 148, 148).unwrap();
    let target = view.roi(66, 61, 148, 148).unwrap();

    for mode in [CorrelationMode::Coefficient, CorrelationMode::Correlation] {
        let cc = CrossCorrelation::from_expanded(search, 10, 10, mode).unwrap();
        let name = match mode {
            CorrelationMode::Coefficient => "coefficient",
            CorrelationMode::Correlation => "correlation",
        };

        c.bench_function(&format!("{name}_sequential"), |b| {
            b.iter(|| black_box(cc.compute_sequential(target).unwrap()));
        });

        if cfg!(feature = "rayon") {
            let pool = WorkerPool::with_available_parallelism().unwrap();
            c.bench_function(&format!("{name}_pool"), |b| {
                b.iter(|| {
                    black_box(
                        cc.compute(target, &pool, &JobControl::with_timeout(None))
                            .unwrap(),
                    )
                });
            });
        }
    }
}

fn bench_fits(c: &mut Criterion) {
    let x = [230.0f32, 245.0, 260.0, 275.0];
    let y: Vec<f32> = x
        .iter()
        .enumerate()
        .map(|(i, &e)| 4.0e10 * e.powf(-3.2) + (i as f32 - 1.5) * 3.0)
        .collect();
    let sample = FitSample::new(&x, &y).unwrap();

    c.bench_function("fit_lse", |b| b.iter(|| black_box(LseFitter.fit(&sample))));
    let mle = MleFitter::new(1.0e-9);
    c.bench_function("fit_mle", |b| b.iter(|| black_box(mle.fit(&sample))));
    let wlse = WlseFitter::new(1.0e-9);
    c.bench_function("fit_wlse", |b| b.iter(|| black_box(wlse.fit(&sample))));
    let lma = LmaFitter::new(1.0e-9);
    c.bench_function("fit_lma", |b| b.iter(|| black_box(lma.fit(&sample))));
}

fn bench_mapping(c: &mut Criterion) {
    let width = 128;
    let height = 128;
    let losses = [230.0f32, 245.0, 260.0, 275.0, 290.0, 305.0];
    let base = make_image(width, height);
    let stack: Vec<Vec<f32>> = losses
        .iter()
        .map(|&e| {
            base.iter()
                .map(|&v| (1.0e10 + v * 1.0e7) * e.powf(-3.0))
                .collect()
        })
        .collect();
    let frames: Vec<_> = stack
        .iter()
        .map(|d| ImageView::from_slice(d, width, height).unwrap())
        .collect();

    let pool = WorkerPool::with_available_parallelism().unwrap();
    let mapping = ElementalMapping::new(MappingConfig::new(284.0), pool);
    c.bench_function("elemental_mapping_mle", |b| {
        b.iter(|| {
            black_box(
                mapping
                    .run(&frames, &losses, &JobControl::with_timeout(None))
                    .unwrap(),
            )
        });
    });
}

criterion_group!(benches, bench_correlation, bench_fits, bench_mapping);
criterion_main!(benches);
