extern crate cr3bp_validator as cr3bp;

use cr3bp::cosmic::{jacobi, jacobi_constant, LagrangePoint, MassRatio};
use cr3bp::dynamics::{derivative, primary_distances, Cr3bpDynamics, Dynamics};
use cr3bp::linalg::Vector6;
use cr3bp::CheckError;
use enum_iterator::all;
use rstest::*;

#[fixture]
fn mu() -> MassRatio {
    MassRatio::earth_moon()
}

#[rstest]
#[case(Vector6::new(0.8234, 0.0, 0.0, 0.0, 0.1263, 0.0))]
#[case(Vector6::new(0.8234, 0.0, 0.02, 0.0, 0.16, 0.0))]
#[case(Vector6::new(-0.5, 0.3, -0.1, 0.2, -0.4, 0.05))]
#[case(Vector6::new(1.2, -0.01, 0.0, 0.0, -0.5, 0.0))]
#[case(Vector6::new(1e3, 1e3, -1e3, 10.0, -10.0, 1.0))]
#[case(Vector6::new(0.98, 0.0, 0.0, 0.0, 1.0, 0.0))]
fn derivative_is_finite(mu: MassRatio, #[case] state: Vector6<f64>) {
    let (r1, r2) = primary_distances(&state, mu);
    assert!(r1 > 0.0 && r2 > 0.0);

    let d_x = derivative(&state, mu);
    assert_eq!(d_x.len(), 6);
    assert!(d_x.iter().all(|v| v.is_finite()), "{d_x}");

    // Kinematics
    assert_eq!(d_x[0], state[3]);
    assert_eq!(d_x[1], state[4]);
    assert_eq!(d_x[2], state[5]);

    let dynamics = Cr3bpDynamics::new(mu);
    assert_eq!(dynamics.eom(0.0, &state).unwrap(), d_x);
    // Autonomous dynamics
    assert_eq!(dynamics.eom(123.4, &state).unwrap(), d_x);

    let (d_x_dual, grad) = dynamics.dual_eom(0.0, &state).unwrap();
    assert!((d_x_dual - d_x).norm() < 1e-9);
    assert!(grad.iter().all(|v| v.is_finite()));
}

#[rstest]
fn derivative_singular_at_primaries(mu: MassRatio) {
    let dynamics = Cr3bpDynamics::new(mu);
    for point in all::<LagrangePoint>().filter(|p| p.is_primary()) {
        let pos = point.position(mu);
        let state = Vector6::new(pos[0], pos[1], pos[2], 0.0, 0.0, 0.0);
        assert!(
            dynamics.eom(0.0, &state).is_err(),
            "{point} should be singular"
        );
    }
}

#[rstest]
fn l1_jacobi_is_deterministic(mu: MassRatio) {
    let l1_like = [0.8369, 0.0, 0.0, 0.0, 0.0, 0.0];
    let first = jacobi(&l1_like, mu).unwrap();
    assert!(first.jacobi.is_finite());
    assert!(first.energy.is_finite());
    assert_eq!(first.jacobi, -2.0 * first.energy);

    for _ in 0..10 {
        assert_eq!(jacobi(&l1_like, mu).unwrap(), first);
    }
    assert_eq!(
        jacobi_constant(&Vector6::from_column_slice(&l1_like), mu),
        first
    );
}

#[rstest]
#[case(5)]
#[case(7)]
fn jacobi_wrong_length(mu: MassRatio, #[case] len: usize) {
    let state = vec![0.5; len];
    assert!(matches!(
        jacobi(&state, mu),
        Err(CheckError::InvalidInput { .. })
    ));
}

#[rstest]
fn libration_points_ordering(mu: MassRatio) {
    // At rest, the Jacobi constant decreases from L1 to L4/L5
    let jacobi_at = |point: LagrangePoint| {
        let pos = point.position(mu);
        jacobi(&[pos[0], pos[1], pos[2], 0.0, 0.0, 0.0], mu)
            .unwrap()
            .jacobi
    };
    let c1 = jacobi_at(LagrangePoint::L1);
    let c2 = jacobi_at(LagrangePoint::L2);
    let c3 = jacobi_at(LagrangePoint::L3);
    let c4 = jacobi_at(LagrangePoint::L4);
    let c5 = jacobi_at(LagrangePoint::L5);
    assert!(c1 > c2 && c2 > c3 && c3 > c4, "{c1} {c2} {c3} {c4}");
    assert!((c4 - c5).abs() < 1e-12);
}
