extern crate cr3bp_validator as cr3bp;
extern crate pretty_env_logger;

use approx::assert_abs_diff_eq;
use cr3bp::cosmic::{jacobi_constant, LagrangePoint, MassRatio};
use cr3bp::dynamics::Cr3bpDynamics;
use cr3bp::linalg::Vector6;
use cr3bp::propagators::error_ctrl::WeightedMaxStep;
use cr3bp::propagators::*;
use cr3bp::validation::{energy_drift, Trajectory};
use cr3bp::CheckError;
use rstest::*;

use crate::{l1_halo_like, l1_lyapunov, propagated_states};

#[fixture]
fn mu() -> MassRatio {
    MassRatio::earth_moon()
}

#[rstest]
#[case(l1_lyapunov(), 0.01)]
#[case(l1_lyapunov(), 0.1)]
#[case(l1_lyapunov(), 0.5)]
#[case(l1_lyapunov(), 1.0)]
#[case(l1_halo_like(), 0.3)]
#[case(l1_halo_like(), 1.0)]
fn reversibility(mu: MassRatio, #[case] state0: Vector6<f64>, #[case] dt: f64) {
    let _ = pretty_env_logger::try_init();

    let forward = propagate(&state0, dt, mu).unwrap();
    assert!((forward - state0).norm() > 0.0);
    let back = propagate(&forward, -dt, mu).unwrap();

    for i in 0..6 {
        assert_abs_diff_eq!(back[i], state0[i], epsilon = 1e-6);
    }
}

#[rstest]
fn energy_conservation(mu: MassRatio) {
    let _ = pretty_env_logger::try_init();

    let states = propagated_states(l1_lyapunov(), 0.01, 100, mu);
    let drift = energy_drift(&Trajectory::from_states(&states), mu).unwrap();
    assert!(drift <= 1e-6, "energy drift of {drift:e}");

    // One long propagation conserves the Jacobi constant too
    let j0 = jacobi_constant(&l1_halo_like(), mu).jacobi;
    let end = propagate(&l1_halo_like(), 1.5, mu).unwrap();
    assert_abs_diff_eq!(jacobi_constant(&end, mu).jacobi, j0, epsilon = 1e-7);
}

#[rstest]
fn determinism(mu: MassRatio) {
    let first = propagate(&l1_lyapunov(), 0.7, mu).unwrap();
    for _ in 0..3 {
        assert_eq!(propagate(&l1_lyapunov(), 0.7, mu).unwrap(), first);
    }
}

#[rstest]
fn zero_and_invalid_durations(mu: MassRatio) {
    assert_eq!(propagate(&l1_lyapunov(), 0.0, mu).unwrap(), l1_lyapunov());
    assert!(matches!(
        propagate(&l1_lyapunov(), f64::NAN, mu),
        Err(PropagationError::InvalidDuration { .. })
    ));
    assert!(matches!(
        propagate(&l1_lyapunov(), f64::INFINITY, mu),
        Err(PropagationError::InvalidDuration { .. })
    ));

    let mut bad = l1_lyapunov();
    bad[2] = f64::NAN;
    assert!(matches!(
        propagate(&bad, 0.1, mu),
        Err(PropagationError::NonFiniteState { .. })
    ));
}

#[rstest]
fn failure_at_primary(mu: MassRatio) {
    let moon = LagrangePoint::Moon.position(mu);
    let state = Vector6::new(moon[0], moon[1], moon[2], 0.0, 0.1, 0.0);
    let err = propagate(&state, 0.1, mu).unwrap_err();
    assert!(matches!(err, PropagationError::Dynamics { .. }), "{err}");

    // Surfaced as an integration failure by the checks
    let check_err: CheckError = err.into();
    assert!(matches!(check_err, CheckError::IntegrationFailure { .. }));
}

#[rstest]
fn step_budget(mu: MassRatio) {
    let opts = PropOpts::<WeightedRmsStep>::builder().max_steps(5).build();
    let err = propagate_with(&l1_lyapunov(), 3.0, mu, &opts).unwrap_err();
    assert!(
        matches!(err, PropagationError::MaxStepsReached { max_steps: 5, .. }),
        "{err}"
    );

    // A single step cannot be shrunk enough with a single attempt and a huge initial step
    let opts = PropOpts::<WeightedRmsStep>::builder()
        .init_step(10.0)
        .attempts(1)
        .build();
    let err = propagate_with(&l1_lyapunov(), 10.0, mu, &opts).unwrap_err();
    assert!(
        matches!(err, PropagationError::TooManyAttempts { .. }),
        "{err}"
    );
}

#[rstest]
fn instance_continuity(mu: MassRatio) {
    let _ = pretty_env_logger::try_init();

    let setup = Propagator::default(Cr3bpDynamics::new(mu));
    let mut prop = setup.with(l1_lyapunov());
    let times = (1..=20).map(|i| f64::from(i) * 0.05).collect::<Vec<_>>();
    let states = prop.through_times(&times).unwrap();
    assert_eq!(states.len(), 20);
    assert_abs_diff_eq!(prop.t, 1.0, epsilon = 1e-12);
    assert!(prop.latest_details().error <= 1.0);

    // Integrating through intermediate times matches a single propagation within tolerance
    let direct = propagate(&l1_lyapunov(), 1.0, mu).unwrap();
    assert!((states[19] - direct).norm() < 1e-7);

    // And going back to the start
    let start = prop.until_time(0.0).unwrap();
    assert!((start - l1_lyapunov()).norm() < 1e-7);

    // A forced first step only changes the step sequence, not the result
    let mut forced = setup.with(l1_lyapunov());
    forced.set_step(0.2);
    let end = forced.for_duration(1.0).unwrap();
    assert!((end - direct).norm() < 1e-6);
}

#[rstest]
fn tolerances_and_error_control(mu: MassRatio) {
    let reference = propagate_with(
        &l1_halo_like(),
        1.0,
        mu,
        &PropOpts::with_tolerances(1e-12, 1e-12),
    )
    .unwrap();

    let default = propagate(&l1_halo_like(), 1.0, mu).unwrap();
    assert!((default - reference).norm() < 1e-6);

    let loose = propagate_with(&l1_halo_like(), 1.0, mu, &PropOpts::with_tolerances(1e-5, 1e-5))
        .unwrap();
    assert!((loose - reference).norm() < 1e-3);

    let max_ctrl = PropOpts::builder()
        .error_ctrl(WeightedMaxStep {})
        .build();
    let with_max = propagate_with(&l1_halo_like(), 1.0, mu, &max_ctrl).unwrap();
    assert!((with_max - reference).norm() < 1e-6);

    let mut setup = Propagator::default(Cr3bpDynamics::new(mu));
    setup.set_tolerances(1e-5, 1e-5);
    let loose_setup = setup.with(l1_halo_like()).for_duration(1.0).unwrap();
    assert!((loose_setup - reference).norm() < 1e-3);

    setup.set_tolerances(1e-8, 1e-8);
    setup.set_max_step(0.01);
    let mut prop = setup.with(l1_halo_like());
    let capped = prop.for_duration(1.0).unwrap();
    assert!(prop.latest_details().step.abs() <= 0.01);
    assert!((capped - reference).norm() < 1e-6);
}
