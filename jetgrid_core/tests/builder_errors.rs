use jetgrid_core::config::{GridGeometry, NoiseFieldCfg};
use jetgrid_core::error::BuildError;
use jetgrid_core::{Generator, MixStrategy, SolverCfg};
use rstest::rstest;

fn field_a() -> NoiseFieldCfg {
    NoiseFieldCfg {
        seed: 1,
        feature_size: 50.0,
        t_step: 0.1,
    }
}

#[rstest]
fn missing_field_a_yields_typed_build_error() {
    let err = Generator::builder()
        .with_bw_threshold(0.5)
        .try_build()
        .expect_err("should fail with MissingFieldA");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::MissingFieldA) => {}
        other => panic!("expected MissingFieldA, got: {other:?}"),
    }
}

#[rstest]
fn missing_threshold_yields_typed_build_error() {
    let err = Generator::builder()
        .with_field_a(field_a())
        .try_build()
        .expect_err("should fail with MissingThreshold");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::MissingThreshold)
    ));
}

#[rstest]
fn both_thresholds_conflict() {
    let err = Generator::builder()
        .with_field_a(field_a())
        .with_bw_threshold(0.5)
        .with_target_transparency(0.4)
        .build()
        .expect_err("should fail with ConflictingThreshold");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::ConflictingThreshold)
    ));
}

#[rstest]
#[case::zero_frames(|b: B| b.with_frames(0, 0.05), "n_frames")]
#[case::zero_dt(|b: B| b.with_frames(10, 0.0), "dt_frame must be > 0")]
#[case::sub_ms_dt(|b: B| b.with_frames(10, 0.0001), "1 ms")]
#[case::bad_field_b(
    |b: B| b.with_field_b(Some(NoiseFieldCfg { seed: 2, feature_size: -1.0, t_step: 0.1 })),
    "field B feature_size"
)]
#[case::bad_weight(|b: B| b.with_mix(MixStrategy::Weighted { weight_b: 1.5 }), "weight_b")]
#[case::bad_solver(
    |b: B| b.with_solver(SolverCfg { tolerance: 0.0, max_iter: 10 }),
    "tolerance"
)]
#[case::bad_grid(
    |b: B| b.with_grid(GridGeometry { pcs_pixel_dist: 0, numel_pcs_axis: 15 }),
    "pcs_pixel_dist"
)]
#[case::huge_grid(
    |b: B| b.with_grid(GridGeometry { pcs_pixel_dist: 300_000_000, numel_pcs_axis: 15 }),
    "pcs_pixel_dist must be <= 1024"
)]
fn invalid_values_are_rejected(#[case] tweak: fn(B) -> B, #[case] needle: &str) {
    let b = Generator::builder()
        .with_field_a(field_a())
        .with_target_transparency(0.4);
    let err = tweak(b).build().expect_err("should be invalid");
    match err.downcast_ref::<BuildError>() {
        Some(BuildError::InvalidConfig(msg)) => assert!(msg.contains(needle), "{msg}"),
        other => panic!("expected InvalidConfig, got: {other:?}"),
    }
}

type B = jetgrid_core::GeneratorBuilder<jetgrid_core::builder::Set, jetgrid_core::builder::Set>;

#[rstest]
#[case(0.0)]
#[case(1.0)]
fn target_transparency_bounds_are_exclusive(#[case] ratio: f64) {
    let err = Generator::builder()
        .with_field_a(field_a())
        .with_target_transparency(ratio)
        .build()
        .expect_err("should be invalid");
    assert!(matches!(
        err.downcast_ref::<BuildError>(),
        Some(BuildError::InvalidConfig(_))
    ));
}

#[rstest]
fn config_file_maps_onto_generator() {
    let cfg = jetgrid_config::load_toml(
        r#"
        [protocol]
        n_frames = 3
        dt_frame = 0.02

        [field_a]
        feature_size = 20.0
        t_step = 0.05
        seed = 7

        [threshold]
        bw_threshold = 0.45

        [grid]
        pcs_pixel_dist = 4
        "#,
    )
    .unwrap();
    let gcfg = jetgrid_core::GeneratorCfg::try_from(&cfg).unwrap();
    let g = Generator::new(gcfg).unwrap();
    assert_eq!(g.cfg().duration_ms(), 20);
    assert_eq!(g.grid().n_pixels(), 64);
    assert_eq!(g.run().unwrap().protocol.frames().len(), 3);
}
