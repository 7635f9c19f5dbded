//! Grid-forming envelopes through the public API.

use gcv_gfm::{calculator, export_envelope, time_axis, GfmParams, GfmTest, Regime};

fn run(test: GfmTest, damping: f64) -> gcv_gfm::Envelope {
    let time = time_axis(10.0, 0.002).unwrap();
    calculator(test)
        .calculate_envelopes(&GfmParams::default(), damping, 5.0, 0.2, &time, 1.0)
        .unwrap()
}

#[test]
fn low_damping_oscillates_high_damping_does_not() {
    let light = run(GfmTest::PhaseJump, 30.0);
    let heavy = run(GfmTest::PhaseJump, 3000.0);
    assert_eq!(light.regime, Regime::Underdamped);
    assert_eq!(heavy.regime, Regime::Overdamped);
    assert!(light.center.iter().any(|c| *c > 1e-3));
    assert!(heavy.center.iter().all(|c| *c <= 0.0));
}

#[test]
fn responses_settle_inside_the_final_tunnel() {
    let params = GfmParams::default();
    for test in [GfmTest::PhaseJump, GfmTest::ScrJump] {
        let env = run(test, 300.0);
        let last = env.len() - 1;
        assert!(env.center[last].abs() < 1e-3, "{test}");
        let floor = 0.99 * params.final_allowed_tunnel_pn;
        assert!(env.upper[last] > floor && env.lower[last] < -floor);
    }
}

#[test]
fn rocof_settles_at_inertial_power() {
    let env = run(GfmTest::Rocof, 300.0);
    // -2H·rocof/f0 with H = 5, rocof = -1 Hz/s, f0 = 50 Hz
    let expected = 0.2;
    assert!((env.center[env.len() - 1] - expected).abs() < 1e-4);
}

#[test]
fn export_writes_one_row_per_sample() {
    let env = run(GfmTest::AmplitudeStep, 300.0);
    let dir = tempfile::tempdir().unwrap();
    let files = export_envelope(&env, &dir.path().join("out"), "amplitude-step", false).unwrap();
    let text = std::fs::read_to_string(files.csv).unwrap();
    assert_eq!(text.lines().count(), env.len() + 1);
    assert!(text.starts_with("Time (s);ΔQ PCC (pu)"));
}
