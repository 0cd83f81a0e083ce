//! Fit a three-component Student's T mixture by damped EM and report the
//! log likelihood at each step.
//!
//! Run with `RUST_LOG=debug` to see the update diagnostics.
use emix::prelude::*;
use nalgebra::{DMatrix, DVector};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

fn component(weight: f64, mean: [f64; 2], shape: [f64; 4]) -> Component {
    Component::new(
        weight,
        DVector::from_row_slice(&mean),
        DMatrix::from_row_slice(2, 2, &shape),
    )
    .unwrap()
}

fn loglike(mm: &Mixture, xs: &DMatrix<f64>) -> f64 {
    let mut fx = DVector::zeros(xs.nrows());
    mm.evaluate(xs, &mut fx).unwrap();
    fx.iter().map(|f| f.ln()).sum()
}

fn main() {
    env_logger::init();

    let df = 6.0;
    let mut rng = Xoshiro256Plus::seed_from_u64(1337);

    let truth = Mixture::new(
        vec![
            component(0.5, [-4.0, 0.0], [1.0, 0.4, 0.4, 1.0]),
            component(0.3, [3.0, 3.0], [0.5, 0.0, 0.0, 2.0]),
            component(0.2, [2.0, -3.0], [1.5, -0.6, -0.6, 0.8]),
        ],
        df,
    )
    .unwrap();

    let mut xs = DMatrix::zeros(10_000, 2);
    truth.draw_into(&mut rng, &mut xs).unwrap();

    // a few too many components, scattered over the data
    let cpnts = (0..5)
        .map(|ix| {
            let row = xs.row(ix * 1_000);
            component(1.0, [row[0], row[1]], [4.0, 0.0, 0.0, 4.0])
        })
        .collect();
    let mut fit = Mixture::new(cpnts, df).unwrap();

    let damping = Damping::new(0.5, 0.5).unwrap();
    println!("truth: {}", loglike(&truth, &xs));
    for iter in 0..50 {
        fit.update_em_unweighted(&xs, damping).unwrap();
        let n_clipped = fit.clip(1E-3).unwrap();
        println!(
            "iter {iter}: {} ({} components, {n_clipped} clipped)",
            loglike(&fit, &xs),
            fit.k()
        );
    }

    for cpnt in fit.iter() {
        println!("{cpnt}");
    }
}
