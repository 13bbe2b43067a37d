use jetgrid_config::{MixStrategyKind, load_file, load_toml};
use rstest::rstest;

const BASE: &str = r#"
[protocol]
n_frames = 100
dt_frame = 0.05
min_valve_duration = 5

[field_a]
feature_size = 50.0
t_step = 0.1
seed = 1
"#;

fn with(extra: &str) -> String {
    format!("{BASE}\n{extra}")
}

#[test]
fn accepts_target_transparency_without_field_b() {
    let cfg = load_toml(&with("[threshold]\ntarget_transparency = 0.4\n")).expect("parse TOML");
    cfg.validate().expect("valid config should pass");
    assert!(cfg.field_b_enabled().is_none());
    assert_eq!(cfg.mix.strategy, MixStrategyKind::Average);
    assert_eq!(cfg.grid.pcs_pixel_dist, 32);
    assert_eq!(cfg.solver.max_iter, 50);
}

#[test]
fn field_b_with_zero_feature_size_is_disabled() {
    let toml = with(
        r#"
[field_b]
feature_size = 0
t_step = 0.1
seed = 13

[threshold]
bw_threshold = 0.5
"#,
    );
    let cfg = load_toml(&toml).expect("parse TOML");
    cfg.validate().expect("disabled field B is valid");
    assert!(cfg.field_b.is_some());
    assert!(cfg.field_b_enabled().is_none());
}

#[rstest]
#[case("[threshold]\nbw_threshold = 0.5\ntarget_transparency = 0.4\n", "not both")]
#[case("", "is required")]
#[case("[threshold]\ntarget_transparency = 1.0\n", "target_transparency must be in")]
#[case("[threshold]\nbw_threshold = 1.5\n", "bw_threshold must be in")]
#[case(
    "[threshold]\nbw_threshold = 0.5\n[grid]\npcs_pixel_dist = 0\n",
    "pcs_pixel_dist must be > 0"
)]
#[case(
    "[threshold]\nbw_threshold = 0.5\n[solver]\nmax_iter = 0\n",
    "max_iter must be >= 1"
)]
#[case(
    "[threshold]\nbw_threshold = 0.5\n[mix]\nstrategy = \"weighted\"\nweight_b = 2.0\n",
    "weight_b must be in"
)]
#[case(
    "[threshold]\nbw_threshold = 0.5\n[field_b]\nfeature_size = -3.0\nt_step = 0.1\nseed = 2\n",
    "field_b.feature_size"
)]
fn rejects_invalid_sections(#[case] extra: &str, #[case] needle: &str) {
    let cfg = load_toml(&with(extra)).expect("parse TOML");
    let err = cfg.validate().expect_err("should be rejected");
    assert!(
        format!("{err}").contains(needle),
        "error `{err}` should mention `{needle}`"
    );
}

#[test]
fn rejects_zero_frames_and_sub_millisecond_dt() {
    let toml = r#"
[protocol]
n_frames = 0
dt_frame = 0.05

[field_a]
feature_size = 50.0
t_step = 0.1
seed = 1

[threshold]
bw_threshold = 0.5
"#;
    let err = load_toml(toml).unwrap().validate().unwrap_err();
    assert!(format!("{err}").contains("n_frames"));

    let toml = toml
        .replace("n_frames = 0", "n_frames = 10")
        .replace("dt_frame = 0.05", "dt_frame = 0.0001");
    let err = load_toml(&toml).unwrap().validate().unwrap_err();
    assert!(format!("{err}").contains("dt_frame"));
}

#[test]
fn rejects_unknown_mix_strategy_at_parse_time() {
    let toml = with("[threshold]\nbw_threshold = 0.5\n[mix]\nstrategy = \"screen\"\n");
    assert!(load_toml(&toml).is_err());
}

#[test]
fn load_file_parses_and_validates() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("jetgrid.toml");
    std::fs::write(&path, with("[threshold]\ntarget_transparency = 0.4\n")).unwrap();
    let cfg = load_file(&path).expect("valid file");
    assert_eq!(cfg.protocol.n_frames, 100);

    std::fs::write(&path, with("")).unwrap();
    assert!(load_file(&path).is_err());
}

#[test]
fn syntax_errors_keep_the_parser_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("broken.toml");
    std::fs::write(&path, "[protocol\nn_frames = 1\n").unwrap();
    let err = load_file(&path).unwrap_err();
    assert!(err.downcast_ref::<toml::de::Error>().is_some());
    assert!(format!("{err}").contains("parse config"));

    let missing = dir.path().join("absent.toml");
    let err = load_file(&missing).unwrap_err();
    assert!(err.downcast_ref::<std::io::Error>().is_some());
}
