use eftem::lowlevel::translate;
use eftem::{CorrelationMode, CrossCorrelation, ImageView, Shift};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn brute_force(
    reference: &[f32],
    ref_width: usize,
    target: ImageView<'_, f32>,
    x: usize,
    y: usize,
    mode: CorrelationMode,
) -> f64 {
    let ref_height = reference.len() / ref_width;
    let window: Vec<f64> = (0..ref_height)
        .flat_map(|j| (0..ref_width).map(move |i| (i, j)))
        .map(|(i, j)| *target.get(x + i, y + j).expect("window in bounds") as f64)
        .collect();
    let reference: Vec<f64> = reference.iter().map(|&v| v as f64).collect();
    let (mean_w, mean_r) = match mode {
        CorrelationMode::Coefficient => {
            let n = window.len() as f64;
            (
                window.iter().sum::<f64>() / n,
                reference.iter().sum::<f64>() / n,
            )
        }
        CorrelationMode::Correlation => (0.0, 0.0),
    };
    let mut cov = 0.0;
    let mut var_w = 0.0;
    let mut var_r = 0.0;
    for (&w, &r) in window.iter().zip(&reference) {
        let (dw, dr) = (w - mean_w, r - mean_r);
        cov += dw * dr;
        var_w += dw * dw;
        var_r += dr * dr;
    }
    cov / (var_w * var_r).sqrt()
}

fn random_image(rng: &mut StdRng, width: usize, height: usize) -> Vec<f32> {
    (0..width * height)
        .map(|_| rng.random_range(0.0f32..1000.0))
        .collect()
}

#[test]
fn every_cell_matches_brute_force() {
    let mut rng = StdRng::seed_from_u64(7);
    let (shift_x, shift_y) = (3usize, 2usize);
    let (ref_width, ref_height) = (11usize, 9usize);
    let reference = random_image(&mut rng, ref_width, ref_height);
    let target_data = random_image(&mut rng, ref_width + 2 * shift_x, ref_height + 2 * shift_y);
    let target =
        ImageView::from_slice(&target_data, ref_width + 2 * shift_x, ref_height + 2 * shift_y)
            .unwrap();
    let ref_view = ImageView::from_slice(&reference, ref_width, ref_height).unwrap();

    for mode in [CorrelationMode::Coefficient, CorrelationMode::Correlation] {
        let cc = CrossCorrelation::new(ref_view, shift_x, shift_y, mode).unwrap();
        let map = cc.compute_sequential(target).unwrap();
        for dy in -(shift_y as i32)..=shift_y as i32 {
            for dx in -(shift_x as i32)..=shift_x as i32 {
                let expected = brute_force(
                    &reference,
                    ref_width,
                    target,
                    (dx + shift_x as i32) as usize,
                    (dy + shift_y as i32) as usize,
                    mode,
                );
                let score = map.score(Shift::new(dx, dy)).unwrap() as f64;
                assert!(
                    (score - expected).abs() < 1e-4,
                    "{mode:?} at ({dx}, {dy}): {score} vs {expected}"
                );
            }
        }
    }
}

#[test]
fn peak_recovers_random_translation() {
    let mut rng = StdRng::seed_from_u64(2024);
    let (width, height) = (48, 40);
    let base = random_image(&mut rng, width, height);
    let view = ImageView::from_slice(&base, width, height).unwrap();

    for _ in 0..6 {
        let truth = Shift::new(rng.random_range(-4..=4), rng.random_range(-4..=4));
        let moved = translate(view, truth).unwrap();
        let expanded = moved.view().roi(10, 8, 28, 24).unwrap();
        let cc = CrossCorrelation::from_expanded(
            view.roi(10, 8, 28, 24).unwrap(),
            5,
            5,
            CorrelationMode::Coefficient,
        )
        .unwrap();
        let map = cc.compute_sequential(expanded).unwrap();
        assert_eq!(map.find_max(), truth);
    }
}
