use criterion::Criterion;
use light_curve_detrend::{LightCurve, TrendFitter};
use rand::prelude::*;
use rand_distr::StandardNormal;
use std::hint::black_box;

fn light_curve(rng: &mut StdRng, n: usize) -> LightCurve<f64> {
    let t: Vec<_> = (0..n).map(|i| 0.02 * i as f64).collect();
    let flux: Vec<_> = t
        .iter()
        .map(|&t| {
            let transit = if (t % 10.0) < 0.2 { -0.01 } else { 0.0 };
            1.0 + 0.005 * f64::sin(0.3 * t) + transit + 1e-3 * rng.sample::<f64, _>(StandardNormal)
        })
        .collect();
    let flux_err = vec![1e-3; n];
    LightCurve::new(&t, &flux, Some(&flux_err[..])).unwrap()
}

pub fn bench_detrend(c: &mut Criterion) {
    const COUNTS: [usize; 3] = [100, 1000, 10000];

    let mut rng = StdRng::seed_from_u64(0);
    let fitter = TrendFitter::default();
    for &n in COUNTS.iter() {
        let lc = light_curve(&mut rng, n);
        c.bench_function(format!("Trend fit {n}").as_str(), |b| {
            b.iter(|| fitter.fit(black_box(&lc)).unwrap())
        });
    }
}
