use eftem::{
    ElementalMapping, FitErrors, FitMethod, FitSample, ImageView, JobControl, MappingConfig,
    WorkerPool,
};

const WIDTH: usize = 6;
const HEIGHT: usize = 5;
const LOSSES: [f32; 6] = [250.0, 230.0, 270.0, 290.0, 310.0, 330.0];
const EDGE: f32 = 284.0;

/// Pixel `(x, y)` follows its own power law plus a signal of `x + y` above the
/// edge.
fn stack() -> Vec<Vec<f32>> {
    LOSSES
        .iter()
        .map(|&e| {
            (0..WIDTH * HEIGHT)
                .map(|i| {
                    let (x, y) = (i % WIDTH, i / WIDTH);
                    let r = 2.5 + 0.2 * x as f64;
                    let a = (1.0e3 + 50.0 * y as f64) * 250f64.powf(r);
                    let signal = if e >= EDGE { (x + y) as f64 } else { 0.0 };
                    (a * f64::from(e).powf(-r) + signal) as f32
                })
                .collect()
        })
        .collect()
}

fn run(frames: &[Vec<f32>], method: FitMethod, threads: usize) -> eftem::ElementalMapSet {
    let views: Vec<_> = frames
        .iter()
        .map(|f| ImageView::from_slice(f, WIDTH, HEIGHT).unwrap())
        .collect();
    let config = MappingConfig {
        method,
        epsilon: 1.0e-9,
        ..MappingConfig::new(EDGE)
    };
    ElementalMapping::new(config, WorkerPool::new(threads).unwrap())
        .run(&views, &LOSSES, &JobControl::default())
        .unwrap()
}

#[test]
fn each_pixel_equals_its_own_fit() {
    let frames = stack();
    let pre_losses = [250.0f32, 230.0, 270.0];
    for method in FitMethod::ALL {
        let maps = run(&frames, method, 3);
        assert_eq!(maps.post_edge_losses(), &[290.0, 310.0, 330.0]);
        for y in 0..HEIGHT {
            for x in 0..WIDTH {
                let idx = y * WIDTH + x;
                let counts = [frames[0][idx], frames[1][idx], frames[2][idx]];
                let fit = method.fit(&FitSample::new(&pre_losses, &counts).unwrap(), 1.0e-9);
                assert_eq!(maps.r_map().get(x, y), Some(fit.r as f32));
                assert_eq!(maps.a_map().get(x, y), Some(fit.a as f32));
                assert_eq!(maps.errors_at(x, y), Some(FitErrors::NONE));
                for (k, map) in maps.elemental_maps().iter().enumerate() {
                    let frame = 3 + k;
                    let expected =
                        (f64::from(frames[frame][idx]) - fit.background(LOSSES[frame])) as f32;
                    assert_eq!(map.get(x, y), Some(expected));
                    assert!((expected - (x + y) as f32).abs() < 0.05);
                }
            }
        }
    }
}

#[test]
fn a_broken_pixel_leaves_its_neighbours_alone() {
    let clean = run(&stack(), FitMethod::Mle, 2);
    let mut frames = stack();
    let (bx, by) = (2, 3);
    for frame in frames.iter_mut().take(3) {
        frame[by * WIDTH + bx] = 0.0;
    }
    let broken = run(&frames, FitMethod::Mle, 2);

    assert_eq!(broken.error_pixel_count(), 1);
    assert_ne!(broken.errors_at(bx, by), Some(FitErrors::NONE));
    assert!(broken.r_map().get(bx, by).unwrap().is_nan());
    for map in broken.elemental_maps() {
        assert!(map.get(bx, by).unwrap().is_nan());
    }
    for y in 0..HEIGHT {
        for x in 0..WIDTH {
            if (x, y) == (bx, by) {
                continue;
            }
            assert_eq!(broken.r_map().get(x, y), clean.r_map().get(x, y));
            assert_eq!(broken.a_map().get(x, y), clean.a_map().get(x, y));
        }
    }
}

#[test]
fn result_does_not_depend_on_thread_count() {
    let frames = stack();
    let one = run(&frames, FitMethod::Wlse, 1);
    let many = run(&frames, FitMethod::Wlse, 4);
    assert_eq!(one.r_map(), many.r_map());
    assert_eq!(one.a_map(), many.a_map());
    assert_eq!(one.error_map(), many.error_map());
    assert_eq!(one.elemental_maps(), many.elemental_maps());
}
