extern crate cr3bp_validator as cr3bp;
extern crate pretty_env_logger;

use cr3bp::cosmic::{LagrangePoint, MassRatio};
use cr3bp::io::{ConfigRepr, ValidationScenario};
use cr3bp::linalg::Vector6;
use cr3bp::validation::{
    aggregate, AggregateCfg, CsvSink, ErrorAggregator, ErrorKind, LogSink, Trajectory,
    TrajectoryBatch,
};
use cr3bp::propagators::PropagationError;
use cr3bp::CheckError;
use rstest::*;

use crate::{l1_halo_like, l1_lyapunov, propagated_states};

#[fixture]
fn mu() -> MassRatio {
    MassRatio::earth_moon()
}

/// Flattened (num_orbits, 6, num_timepoints) array of propagated states, every `dt`
fn untimed_flat(initial: &[Vector6<f64>], dt: f64, num: usize, mu: MassRatio) -> Vec<f64> {
    let mut flat = Vec::with_capacity(initial.len() * 6 * num);
    for state0 in initial {
        let states = propagated_states(*state0, dt, num, mu);
        for component in 0..6 {
            flat.extend(states.iter().map(|s| s[component]));
        }
    }
    flat
}

fn initial_states() -> Vec<Vector6<f64>> {
    let mut third = l1_lyapunov();
    third[4] += 0.01;
    vec![l1_lyapunov(), l1_halo_like(), third]
}

#[rstest]
fn energy_of_untimed_batch(mu: MassRatio) {
    let _ = pretty_env_logger::try_init();

    let flat = untimed_flat(&initial_states(), 0.01, 100, mu);
    let batch = TrajectoryBatch::from_flat(&flat, (3, 6, 100)).unwrap();
    let cfg = AggregateCfg::builder()
        .error_kinds(vec![ErrorKind::Energy])
        .time_step(0.01)
        .build();

    let report = aggregate(&batch, mu, &cfg).unwrap();
    assert_eq!(report.len(), 1);
    let cumulative = report.cumulative(ErrorKind::Energy).unwrap();
    assert!(cumulative.is_finite() && cumulative >= 0.0);
    assert!(cumulative < 1e-6);
    assert_eq!(report.average(ErrorKind::Energy), Some(cumulative / 99.0));
    assert_eq!(report.get(ErrorKind::Energy).unwrap().evolution.len(), 99);
}

#[rstest]
fn zero_time_step(mu: MassRatio) {
    let flat = untimed_flat(&initial_states(), 0.01, 10, mu);
    let batch = TrajectoryBatch::from_flat(&flat, (3, 6, 10)).unwrap();
    let cfg = AggregateCfg::builder()
        .error_kinds(vec![ErrorKind::Energy])
        .time_step(0.0)
        .build();

    match aggregate(&batch, mu, &cfg) {
        Err(CheckError::NonMonotonicTime { orbit, index, .. }) => {
            assert_eq!(orbit, 0);
            assert_eq!(index, 0);
        }
        other => panic!("expected non monotonic time, got {other:?}"),
    }
}

#[rstest]
#[case(1, 4, None)]
#[case(3, 10, Some(0.01))]
#[case(2, 2, Some(0.5))]
fn five_components(mu: MassRatio, #[case] n: usize, #[case] m: usize, #[case] dt: Option<f64>) {
    let batch = TrajectoryBatch::from_flat(&vec![0.5; n * 5 * m], (n, 5, m)).unwrap();
    let cfg = AggregateCfg {
        time_step: dt,
        ..Default::default()
    };
    assert!(matches!(
        aggregate(&batch, mu, &cfg),
        Err(CheckError::ShapeMismatch { got: 5, .. })
    ));
}

#[rstest]
fn untimed_without_time_step(mu: MassRatio) {
    let flat = untimed_flat(&initial_states(), 0.01, 3, mu);
    let batch = TrajectoryBatch::from_flat(&flat, (3, 6, 3)).unwrap();
    assert!(matches!(
        aggregate(&batch, mu, &AggregateCfg::default()),
        Err(CheckError::ShapeMismatch { got: 6, .. })
    ));
}

#[rstest]
fn all_kinds_on_timed_batch(mu: MassRatio) {
    let _ = pretty_env_logger::try_init();

    let dt = 0.05;
    let num = 15;
    let times = (0..num).map(|i| i as f64 * dt).collect::<Vec<_>>();
    let orbits = initial_states()
        .into_iter()
        .map(|s0| {
            Trajectory::from_timed_states(&times, &propagated_states(s0, dt, num, mu)).unwrap()
        })
        .collect::<Vec<_>>();
    let batch = TrajectoryBatch::from_orbits(orbits).unwrap();
    assert_eq!(batch.shape(), (3, 7, num));

    // A time step is ignored for timed batches
    let cfg = AggregateCfg::builder().time_step(123.0).build();
    let mut sink = CsvSink::from_writer(vec![]);
    let report = ErrorAggregator::new(mu, cfg.clone())
        .run_with_sink(&batch, &mut sink)
        .unwrap();

    assert_eq!(report.len(), 3);
    for kind in [ErrorKind::Position, ErrorKind::Velocity, ErrorKind::Energy] {
        let summary = report.get(kind).unwrap();
        assert!(summary.cumulative < 1e-8, "{summary}");
        assert_eq!(summary.evolution.len(), num - 1);
        let total: f64 = summary.evolution.iter().sum();
        if kind == ErrorKind::Energy {
            // Energy evolution is between consecutive samples, while the cumulative error is against the first one
            assert!(total.is_finite());
        } else {
            assert!((total - summary.cumulative).abs() < 1e-15);
        }
    }

    let csv = String::from_utf8(sink.into_inner().unwrap()).unwrap();
    assert_eq!(csv.lines().count(), 1 + 3 * (num - 1));
    assert!(csv.lines().nth(1).unwrap().starts_with("position,0,"));

    // Sequential and parallel runs are identical
    let sequential = AggregateCfg {
        parallel: false,
        ..cfg.clone()
    };
    assert_eq!(aggregate(&batch, mu, &sequential).unwrap(), report);
    assert_eq!(
        ErrorAggregator::new(mu, cfg)
            .run_with_sink(&batch, &mut LogSink)
            .unwrap(),
        report
    );
}

#[rstest]
fn selected_orbits_and_first_error(mu: MassRatio) {
    let dt = 0.05;
    let num = 6;
    let good_times = (0..num).map(|i| i as f64 * dt).collect::<Vec<_>>();
    let mut bad_times = good_times.clone();
    bad_times[3] = bad_times[2];

    let states = propagated_states(l1_lyapunov(), dt, num, mu);
    let good = Trajectory::from_timed_states(&good_times, &states).unwrap();
    let bad = Trajectory::from_timed_states(&bad_times, &states).unwrap();
    let batch = TrajectoryBatch::from_orbits(vec![good.clone(), bad.clone(), good, bad]).unwrap();

    // Skipping the bad orbits
    let cfg = AggregateCfg::builder().orbit_indices(vec![0, 2]).build();
    let report = aggregate(&batch, mu, &cfg).unwrap();
    let single = aggregate(
        &batch,
        mu,
        &AggregateCfg::builder().orbit_indices(vec![0]).build(),
    )
    .unwrap();
    assert!(
        (report.cumulative(ErrorKind::Position).unwrap()
            - 2.0 * single.cumulative(ErrorKind::Position).unwrap())
        .abs()
            < 1e-18
    );

    // The first failing orbit in index order is reported, in parallel too
    for parallel in [true, false] {
        let cfg = AggregateCfg::builder()
            .orbit_indices(vec![3, 0, 1])
            .parallel(parallel)
            .build();
        match aggregate(&batch, mu, &cfg) {
            Err(CheckError::NonMonotonicTime { orbit, index, .. }) => {
                assert_eq!(orbit, 3);
                assert_eq!(index, 2);
            }
            other => panic!("expected non monotonic time, got {other:?}"),
        }
    }
}

#[rstest]
fn sample_on_primary_fails_integration(mu: MassRatio) {
    let _ = pretty_env_logger::try_init();

    let dt = 0.05;
    let num = 5;
    let times = (0..num).map(|i| i as f64 * dt).collect::<Vec<_>>();
    let states = propagated_states(l1_lyapunov(), dt, num, mu);
    let good = Trajectory::from_timed_states(&times, &states).unwrap();

    let moon = LagrangePoint::Moon.position(mu);
    let mut on_moon = states.clone();
    on_moon[2] = Vector6::new(moon.x, moon.y, moon.z, 0.0, 0.0, 0.0);
    let bad = Trajectory::from_timed_states(&times, &on_moon).unwrap();
    let batch = TrajectoryBatch::from_orbits(vec![good, bad]).unwrap();

    for parallel in [true, false] {
        let cfg = AggregateCfg::builder()
            .error_kinds(vec![ErrorKind::Position])
            .parallel(parallel)
            .build();
        match aggregate(&batch, mu, &cfg) {
            Err(CheckError::IntegrationFailure { source }) => {
                assert!(
                    matches!(source, PropagationError::Dynamics { .. }),
                    "{source}"
                );
            }
            other => panic!("expected an integration failure, got {other:?}"),
        }
    }

    // The healthy orbit alone still validates
    let cfg = AggregateCfg::builder()
        .orbit_indices(vec![0])
        .error_kinds(vec![ErrorKind::Position])
        .build();
    assert!(aggregate(&batch, mu, &cfg).is_ok());
}

#[rstest]
fn from_scenario(mu: MassRatio) {
    let scenario = ValidationScenario::loads(
        "
mass_ratio: 0.0122
time_step: 0.02
error_kinds: [energy, position]
orbit_indices: [1]
parallel: false
",
    )
    .unwrap();
    let (scen_mu, cfg) = scenario.to_cfg().unwrap();
    assert_eq!(scen_mu, mu);

    let flat = untimed_flat(&initial_states(), 0.02, 8, mu);
    let batch = TrajectoryBatch::from_flat(&flat, (3, 6, 8)).unwrap();
    let report = ErrorAggregator::new(scen_mu, cfg).run(&batch).unwrap();
    assert_eq!(
        report.kinds().copied().collect::<Vec<_>>(),
        vec![ErrorKind::Position, ErrorKind::Energy]
    );
    assert!(report.cumulative(ErrorKind::Position).unwrap() < 1e-9);
    println!("{report}");
}
