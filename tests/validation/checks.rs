extern crate cr3bp_validator as cr3bp;

use cr3bp::cosmic::MassRatio;
use cr3bp::validation::{dynamics_defect, energy_drift, ConsistencyChecker, Trajectory};
use cr3bp::CheckError;
use rstest::*;

use crate::{l1_halo_like, l1_lyapunov, propagated_states};

#[fixture]
fn mu() -> MassRatio {
    MassRatio::earth_moon()
}

/// A timed trajectory of `num` samples every `dt`, consistent with the dynamics
fn timed_trajectory(dt: f64, num: usize, mu: MassRatio) -> Trajectory {
    let states = propagated_states(l1_halo_like(), dt, num, mu);
    let times = (0..num).map(|i| i as f64 * dt).collect::<Vec<_>>();
    Trajectory::from_timed_states(&times, &states).unwrap()
}

#[rstest]
fn defect_of_consistent_trajectory(mu: MassRatio) {
    let traj = timed_trajectory(0.05, 20, mu);
    let (pos, vel) = dynamics_defect(&traj, mu).unwrap();
    assert!(pos < 1e-9, "position defect {pos:e}");
    assert!(vel < 1e-9, "velocity defect {vel:e}");
    assert!(energy_drift(&traj, mu).unwrap() < 1e-8);
}

#[rstest]
fn defect_detects_corrupted_sample(mu: MassRatio) {
    let traj = timed_trajectory(0.05, 20, mu);
    let mut data = traj.data().clone();
    // Shift the position of sample 10 by 1e-4 along x
    data[(1, 10)] += 1e-4;
    let corrupted = Trajectory::new(data);

    let checker = ConsistencyChecker::new(mu);
    let steps = checker.dynamics_defect_steps(&corrupted).unwrap();
    assert_eq!(steps.len(), 19);
    // Only the pairs (9, 10) and (10, 11) are affected
    for (i, step) in steps.iter().enumerate() {
        if i == 9 || i == 10 {
            assert!(step.position > 9e-5, "{i}: {step}");
        } else {
            assert!(step.position < 1e-9, "{i}: {step}");
        }
    }

    let (pos, _) = checker.dynamics_defect(&corrupted).unwrap();
    assert!(pos > 1.8e-4);
    assert!(checker.energy_drift(&corrupted).unwrap() > 1e-6);
}

#[rstest]
fn defect_requires_timed_samples(mu: MassRatio) {
    let states = propagated_states(l1_lyapunov(), 0.01, 5, mu);
    let traj = Trajectory::from_states(&states);
    assert!(matches!(
        dynamics_defect(&traj, mu),
        Err(CheckError::ShapeMismatch { got: 6, .. })
    ));
    // The energy check accepts both
    assert!(energy_drift(&traj, mu).is_ok());
}

#[rstest]
fn empty_trajectory(mu: MassRatio) {
    let traj = Trajectory::from_states(&[]);
    assert!(matches!(
        energy_drift(&traj, mu),
        Err(CheckError::InvalidInput { .. })
    ));
}
