use super::*;
use crate::agent::Pose;
use crate::config::{Backend, DiffusionMode};
use crate::steering::in_bounds;

fn small_config() -> SimConfig {
    SimConfig {
        width: 120,
        height: 100,
        initial_radius: 6,
        initial_agents: 200,
        spawn_rate: 5,
        diffusion_kernel_size: 3,
        evaporation_amount: 5,
        sensor_distance: 9,
        sensor_size: 1,
        sensor_angle_span: 45,
        move_step: 1,
        turn_step: 40,
        ..SimConfig::default()
    }
}

fn engine(config: SimConfig, seed: u64) -> Engine {
    Engine::new(config, Some(seed)).expect("test config should be valid")
}

fn poses(engine: &Engine) -> Vec<Pose> {
    engine.population().poses().collect()
}

#[test]
fn new_rejects_invalid_config() {
    let config = SimConfig {
        sensor_angle_span: 0,
        ..small_config()
    };
    assert!(matches!(
        Engine::new(config, Some(1)),
        Err(ConfigError::InvalidSensorAngleSpan)
    ));
}

#[test]
fn new_spawns_initial_population_on_empty_field() {
    let engine = engine(small_config(), 3);
    assert_eq!(engine.agent_count(), 200);
    assert_eq!(engine.step_index(), 0);
    assert_eq!(engine.field().total(), 0);
    assert_eq!(engine.seed(), 3);
}

#[test]
fn same_seed_is_bit_identical() {
    let mut a = engine(small_config(), 11);
    let mut b = engine(small_config(), 11);
    for _ in 0..25 {
        a.step();
        b.step();
    }
    assert_eq!(a.field_snapshot(), b.field_snapshot());
    assert_eq!(poses(&a), poses(&b));
}

#[test]
fn different_seeds_diverge() {
    let a = engine(small_config(), 1);
    let b = engine(small_config(), 2);
    assert_ne!(poses(&a), poses(&b));
}

#[test]
fn unseeded_engine_can_be_replayed_from_reported_seed() {
    let mut a = Engine::new(small_config(), None).expect("valid config");
    let mut b = engine(small_config(), a.seed());
    for _ in 0..5 {
        a.step();
        b.step();
    }
    assert_eq!(a.field_snapshot(), b.field_snapshot());
}

#[test]
fn agent_count_grows_by_spawn_rate_each_step() {
    let mut engine = engine(small_config(), 5);
    for n in 1..=30 {
        engine.step();
        assert_eq!(engine.agent_count(), 200 + n * 5);
        assert_eq!(engine.step_index(), n);
    }
}

#[test]
fn five_hundred_square_scenario_first_step() {
    let config = SimConfig {
        width: 500,
        height: 500,
        initial_radius: 5,
        initial_agents: 1000,
        spawn_rate: 0,
        diffusion_kernel_size: 3,
        evaporation_amount: 5,
        sensor_distance: 9,
        sensor_size: 1,
        sensor_angle_span: 45,
        move_step: 1,
        turn_step: 40,
        ..SimConfig::default()
    };
    let mut engine = engine(config, 42);

    engine.step_spawn_phase();
    let resets = engine.step_agent_phase();
    assert_eq!(resets, 0, "agents start near the center");
    let mut deposited = engine.field().clone();
    deposited.deposit(engine.population().positions());
    assert!(deposited.saturated_cells() <= 1000);
    assert!(deposited.saturated_cells() > 0);

    engine.step_field_phase();
    assert_eq!(engine.agent_count(), 1000);
    // Diffusion never exceeds 255, so evaporation leaves at most 250.
    assert!(engine.field().as_slice().iter().all(|&v| v <= 250));
    assert!(engine.field().lit_cells() > 0);
}

#[test]
fn first_step_on_empty_field_only_tie_breaks() {
    let config = SimConfig {
        spawn_rate: 0,
        ..small_config()
    };
    let mut engine = engine(config, 8);
    let before = poses(&engine);
    engine.step();
    for (old, new) in before.iter().zip(poses(&engine)) {
        let delta = (new.heading - old.heading).rem_euclid(360);
        assert!(delta == 40 || delta == 320, "turn of {delta} degrees");
    }
}

#[test]
fn agent_outside_sensing_region_is_reset_to_origin() {
    let config = SimConfig {
        initial_agents: 1,
        spawn_rate: 0,
        ..small_config()
    };
    let mut engine = engine(config, 2);
    engine.population.set(0, Pose::new(119, 50, 90));
    engine.step();
    let pose = engine.population().get(0);
    assert!(pose.x.abs() <= 1 && pose.y.abs() <= 1, "agent at {pose:?}");
    assert_eq!(engine.corner_resets_last_step(), 1);
    assert_eq!(engine.total_corner_resets(), 1);
}

#[test]
fn every_agent_senses_from_valid_region_or_origin() {
    let config = SimConfig {
        move_step: 2,
        ..small_config()
    };
    let move_step = config.move_step as i32;
    let mut engine = engine(config, 21);
    for _ in 0..150 {
        engine.step();
        let (w, h) = (engine.field().width(), engine.field().height());
        let d = engine.config().sensor_distance;
        for pose in engine.population().poses() {
            // Undo the move: the sensing position was within one move of this one.
            let near_origin = pose.x.abs() <= move_step && pose.y.abs() <= move_step;
            let sensed_in_bounds = (-move_step..=move_step).any(|dx| {
                (-move_step..=move_step).any(|dy| in_bounds(pose.x - dx, pose.y - dy, w, h, d))
            });
            assert!(near_origin || sensed_in_bounds, "agent at {pose:?}");
        }
    }
}

#[test]
fn sequential_and_parallel_backends_are_bit_identical() {
    for mode in [DiffusionMode::AdditiveBlend, DiffusionMode::Replace] {
        let sequential = SimConfig {
            diffusion_mode: mode,
            backend: Backend::Sequential,
            ..small_config()
        };
        let parallel = SimConfig {
            backend: Backend::Parallel,
            ..sequential.clone()
        };
        let mut a = engine(sequential, 77);
        let mut b = engine(parallel, 77);
        for _ in 0..40 {
            a.step();
            b.step();
            assert_eq!(a.corner_resets_last_step(), b.corner_resets_last_step());
        }
        assert_eq!(a.field_snapshot(), b.field_snapshot(), "{mode:?}");
        assert_eq!(poses(&a), poses(&b), "{mode:?}");
    }
}

#[test]
fn staged_parameter_waits_for_restart() {
    let config = SimConfig {
        spawn_rate: 0,
        ..small_config()
    };
    let mut engine = engine(config, 4);
    engine
        .set_parameter(Parameter::SpawnRate, 3)
        .expect("spawn_rate 3 is valid");
    engine.step();
    assert_eq!(engine.agent_count(), 200);
    assert_eq!(engine.config().spawn_rate, 0);
    assert_eq!(engine.pending_config().spawn_rate, 3);

    engine.restart().expect("pending config is valid");
    assert_eq!(engine.config().spawn_rate, 3);
    assert_eq!(engine.agent_count(), 200);
    engine.step();
    assert_eq!(engine.agent_count(), 203);
}

#[test]
fn invalid_parameter_is_rejected_without_staging() {
    let mut engine = engine(small_config(), 4);
    let err = engine
        .set_parameter(Parameter::SensorAngleSpan, 270)
        .unwrap_err();
    assert_eq!(err, ConfigError::InvalidSensorAngleSpan);
    assert_eq!(engine.pending_config(), engine.config());
}

#[test]
fn restart_clears_field_and_counters() {
    let mut engine = engine(small_config(), 9);
    for _ in 0..10 {
        engine.step();
    }
    assert!(engine.field().total() > 0);
    engine.restart().expect("config unchanged");
    assert_eq!(engine.field().total(), 0);
    assert_eq!(engine.agent_count(), 200);
    assert_eq!(engine.step_index(), 0);
    assert_eq!(engine.total_corner_resets(), 0);
}

#[test]
fn restart_reallocates_resized_field() {
    let mut engine = engine(small_config(), 9);
    engine.set_parameter(Parameter::Width, 200).expect("width 200 is valid");
    assert_eq!(engine.field().width(), 120);
    engine.restart().expect("pending config is valid");
    assert_eq!(engine.field().width(), 200);
    assert_eq!(engine.field().height(), 100);
    let [cx, _] = engine.spawn_center();
    assert_eq!(cx, 100.0);
}

#[test]
fn restart_continues_rng_stream() {
    let mut restarted = engine(small_config(), 13);
    restarted.restart().expect("config unchanged");
    let fresh = engine(small_config(), 13);
    assert_ne!(poses(&restarted), poses(&fresh));
}

#[test]
fn population_ceiling_stops_spawning() {
    let config = SimConfig {
        initial_agents: 10,
        spawn_rate: 5,
        max_agents: 22,
        ..small_config()
    };
    let mut engine = engine(config, 6);
    engine.step();
    engine.step();
    assert_eq!(engine.agent_count(), 20);
    assert!(!engine.cap_warned);
    engine.step();
    assert_eq!(engine.agent_count(), 22);
    assert!(engine.cap_warned);
    engine.step();
    assert_eq!(engine.agent_count(), 22);
}

#[test]
fn run_experiment_samples_on_schedule() {
    let mut engine = engine(small_config(), 12);
    let summary = engine.run_experiment(10, 4).expect("valid experiment");
    let steps: Vec<usize> = summary.samples.iter().map(|s| s.step).collect();
    assert_eq!(steps, vec![4, 8, 10]);
    assert_eq!(summary.final_agent_count, 200 + 10 * 5);
    assert_eq!(summary.seed, 12);
    let last = summary.samples.last().expect("at least one sample");
    assert_eq!(last.agent_count, summary.final_agent_count);
    assert!(last.trail_mean > 0.0);

    let json = serde_json::to_string(&summary).expect("summary serializes");
    assert!(json.contains("\"final_agent_count\":250"));
}

#[test]
fn run_experiment_rejects_invalid_requests() {
    let mut engine = engine(small_config(), 12);
    assert_eq!(
        engine.run_experiment(10, 0).unwrap_err(),
        ExperimentError::ZeroSampleInterval
    );
    assert_eq!(
        engine
            .run_experiment(Engine::MAX_EXPERIMENT_STEPS + 1, 1)
            .unwrap_err(),
        ExperimentError::OverLimit {
            quantity: "steps",
            requested: Engine::MAX_EXPERIMENT_STEPS + 1,
            limit: Engine::MAX_EXPERIMENT_STEPS,
        }
    );
    assert!(matches!(
        engine.run_experiment(Engine::MAX_EXPERIMENT_SAMPLES + 1, 1),
        Err(ExperimentError::OverLimit { quantity: "samples", .. })
    ));
    assert_eq!(engine.step_index(), 0);
}

#[test]
fn planned_samples_counts_intervals_and_final_step() {
    assert_eq!(planned_samples(0, 4), Ok(0));
    assert_eq!(planned_samples(10, 4), Ok(3));
    assert_eq!(planned_samples(12, 4), Ok(3));
    assert_eq!(planned_samples(3, 100), Ok(1));
    assert_eq!(
        planned_samples(Engine::MAX_EXPERIMENT_SAMPLES * 2, 2),
        Ok(Engine::MAX_EXPERIMENT_SAMPLES)
    );
    let err = planned_samples(Engine::MAX_EXPERIMENT_SAMPLES + 1, 1).unwrap_err();
    assert_eq!(err.to_string(), "50001 samples requested, limit is 50000");
}

#[test]
fn oversized_move_step_is_rejected_without_staging() {
    let mut engine = engine(small_config(), 4);
    let err = engine
        .set_parameter(Parameter::MoveStep, 3_000_000_000)
        .unwrap_err();
    assert!(matches!(err, ConfigError::MoveStepTooLarge { .. }));
    assert_eq!(engine.pending_config(), engine.config());
}

#[test]
fn step_reports_phase_timings() {
    let mut engine = engine(small_config(), 1);
    let timings = engine.step();
    assert!(timings.total_us >= timings.agent_pass_us);
    assert!(timings.total_us >= timings.field_update_us);
}
