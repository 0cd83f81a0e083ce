#![cfg(feature = "serde1")]

use approx::assert_relative_eq;
use emix::prelude::*;
use nalgebra::{DMatrix, DVector};

fn mixture(df: f64) -> Mixture {
    Mixture::new(
        vec![
            Component::new(
                0.25,
                DVector::from_vec(vec![0.5, 3.1, -6.2]),
                DMatrix::from_row_slice(
                    3,
                    3,
                    &[
                        1.017_427_88,
                        0.365_866_52,
                        -0.656_204_86,
                        0.365_866_52,
                        1.005_645_53,
                        -0.425_972_61,
                        -0.656_204_86,
                        -0.425_972_61,
                        1.272_479_72,
                    ],
                ),
            )
            .unwrap(),
            Component::new(0.75, DVector::zeros(3), DMatrix::identity(3, 3) * 2.0)
                .unwrap(),
        ],
        df,
    )
    .unwrap()
}

fn assert_close(a: &Mixture, b: &Mixture) {
    assert_eq!(a.ndims(), b.ndims());
    assert_eq!(a.k(), b.k());
    assert_eq!(a.df(), b.df());
    for (ca, cb) in a.iter().zip(b.iter()) {
        assert::close(ca.weight, cb.weight, 1E-12);
        assert_relative_eq!(ca.mean().clone(), cb.mean().clone(), epsilon = 1E-12);
        assert_relative_eq!(ca.shape(), cb.shape(), epsilon = 1E-10);
    }

    let x = DVector::from_vec(vec![0.1, 1.0, -2.0]);
    assert::close(a.ln_f(&x), b.ln_f(&x), 1E-9);
}

#[test]
fn gaussian_json_round_trip() {
    let mm = mixture(f64::INFINITY);
    let json = serde_json::to_string(&mm).unwrap();
    assert!(json.contains("\"df\":null"));
    let mm2: Mixture = serde_json::from_str(&json).unwrap();
    assert!(mm2.is_gaussian());
    assert_close(&mm, &mm2);
}

#[test]
fn students_t_json_round_trip() {
    let mm = mixture(3.5);
    let json = serde_json::to_string(&mm).unwrap();
    let mm2: Mixture = serde_json::from_str(&json).unwrap();
    assert_close(&mm, &mm2);
}

#[test]
fn students_t_yaml_round_trip() {
    let mm = mixture(7.0);
    let yaml = serde_yaml::to_string(&mm).unwrap();
    let mm2: Mixture = serde_yaml::from_str(&yaml).unwrap();
    assert_close(&mm, &mm2);
}

#[test]
fn empty_mixture_round_trips() {
    let mut mm = mixture(f64::INFINITY);
    mm.clip(1.0).unwrap();
    let json = serde_json::to_string(&mm).unwrap();
    let mm2: Mixture = serde_json::from_str(&json).unwrap();
    assert_eq!(mm2.k(), 0);
    assert_eq!(mm2.ndims(), 3);
}

#[test]
fn deserialize_rejects_bad_df() {
    let mut params = mixture(2.0).emit_params();
    params.df = Some(-1.0);
    let json = serde_json::to_string(&params).unwrap();
    assert!(serde_json::from_str::<Mixture>(&json).is_err());
}

#[test]
fn deserialize_rejects_mismatched_ndims() {
    let mut value = serde_json::to_value(mixture(f64::INFINITY)).unwrap();
    value["ndims"] = serde_json::json!(2);
    assert!(serde_json::from_value::<Mixture>(value).is_err());
}

#[test]
fn component_json_round_trip() {
    let cpnt = mixture(f64::INFINITY)[0].clone();
    let json = serde_json::to_string(&cpnt).unwrap();
    let cpnt2: Component = serde_json::from_str(&json).unwrap();
    assert_relative_eq!(cpnt.shape(), cpnt2.shape(), epsilon = 1E-10);
    assert::close(cpnt.sqrt_det(), cpnt2.sqrt_det(), 1E-10);
}

#[test]
fn damping_json_round_trip() {
    let damping = Damping::new(0.8, 0.25).unwrap();
    let json = serde_json::to_string(&damping).unwrap();
    let damping2: Damping = serde_json::from_str(&json).unwrap();
    assert::close(damping.tau1(), damping2.tau1(), 1E-15);
    assert::close(damping.tau2(), damping2.tau2(), 1E-15);
}

#[test]
fn deserialize_rejects_bad_damping() {
    assert!(serde_json::from_str::<Damping>(r#"{"tau1":1.0,"tau2":7.0}"#)
        .is_err());
    assert!(serde_json::from_str::<Damping>(r#"{"tau1":1.0,"tau2":-0.5}"#)
        .is_err());
    let damping: Damping =
        serde_json::from_str(r#"{"tau1":1.0,"tau2":0.5}"#).unwrap();
    assert_eq!(damping, Damping::new(1.0, 0.5).unwrap());
}

#[test]
fn unnormalized_weights_round_trip() {
    let mut mm = mixture(3.5);
    mm[0].weight = 2.0;
    mm[1].weight = 0.1;
    let json = serde_json::to_string(&mm).unwrap();
    let mm2: Mixture = serde_json::from_str(&json).unwrap();
    assert_eq!(mm2.weights(), vec![2.0, 0.1]);
}

#[test]
fn deserialize_rejects_zero_ndims() {
    let json = r#"{"ndims":0,"df":null,"components":[]}"#;
    assert!(serde_json::from_str::<Mixture>(json).is_err());
}
