use factory_sim::core::{Event, ResourceId, SimTime, SimulationObserver};
use factory_sim::factory::materials::MOTHERBOARD_CIRCUITS;
use factory_sim::factory::{MaterialUsage, Stock, STATION_COUNT};
use factory_sim::{
    build_simulation, run, run_batch, run_with_config, BatchConfig, ConcurrencyMode, Error,
    FactoryConfig,
};
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Default)]
struct Recording {
    levels: Vec<(ResourceId, usize, usize)>,
    delivery_times: Vec<SimTime>,
}

struct Recorder(Rc<RefCell<Recording>>);

impl SimulationObserver for Recorder {
    fn on_event_delivered(&mut self, event: &Event) {
        self.0.borrow_mut().delivery_times.push(event.due_time);
    }

    fn on_resource_update(&mut self, resource: ResourceId, held: usize, capacity: usize) {
        self.0.borrow_mut().levels.push((resource, held, capacity));
    }
}

#[test]
fn test_same_seed_gives_identical_snapshot() {
    let first = serde_json::to_string(&run(1000.0, 7).unwrap()).unwrap();
    let second = serde_json::to_string(&run(1000.0, 7).unwrap()).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_different_seeds_diverge() {
    let first = run(5000.0, 1).unwrap();
    let second = run(5000.0, 2).unwrap();
    assert_ne!(first, second);
}

#[test]
fn test_zero_horizon_gives_empty_snapshot() {
    let snapshot = run(0.0, 42).unwrap();

    assert_eq!(snapshot.production.total, 0);
    assert_eq!(snapshot.production.faulty, 0);
    assert_eq!(snapshot.production.faulty_rate, 0.0);
    assert_eq!(snapshot.station_metrics.occupancy_rates, vec![0.0; STATION_COUNT]);
    assert_eq!(snapshot.station_metrics.wait_times, vec![0.0; STATION_COUNT]);
    assert_eq!(snapshot.station_metrics.downtimes, vec![0.0; STATION_COUNT]);
    assert_eq!(snapshot.time_metrics.avg_production_time, 0.0);
    assert_eq!(snapshot.time_metrics.avg_fixing_time, 0.0);
    assert_eq!(snapshot.time_metrics.supplier_occupancy, 0.0);

    let materials = [
        "boxes",
        "cpus",
        "gpus",
        "hdd",
        "m2",
        "metal",
        "motherboard_circuits",
        "plastic",
        "ram",
        "screens",
    ];
    let used = &snapshot.material_metrics.materials_used;
    let resupplies = &snapshot.material_metrics.resupply_counts;
    assert_eq!(used.keys().map(String::as_str).collect::<Vec<_>>(), materials);
    assert_eq!(resupplies.keys().map(String::as_str).collect::<Vec<_>>(), materials);
    assert!(resupplies.values().all(|count| *count == 0));
    for (material, usage) in used {
        match usage {
            MaterialUsage::Count(count) => assert_eq!(*count, 0, "{}", material),
            MaterialUsage::Variants(variants) => {
                assert!(!variants.is_empty(), "{}", material);
                assert!(variants.values().all(|count| *count == 0), "{}", material);
            }
        }
    }
    assert_eq!(
        used["ram"],
        MaterialUsage::Variants(
            [("16GB", 0), ("32GB", 0), ("8GB", 0)]
                .into_iter()
                .map(|(variant, count)| (variant.to_string(), count))
                .collect()
        )
    );
}

#[test]
fn test_material_keys_do_not_depend_on_the_run() {
    let short = run(10.0, 4).unwrap();
    let long = run(5000.0, 4).unwrap();
    assert!(short
        .material_metrics
        .materials_used
        .keys()
        .eq(long.material_metrics.materials_used.keys()));
    assert!(short
        .material_metrics
        .resupply_counts
        .keys()
        .eq(long.material_metrics.resupply_counts.keys()));
    assert_eq!(long.material_metrics.materials_used["hdd"], MaterialUsage::Count(0));
}

#[test]
fn test_default_run_ratios_are_sane() {
    let snapshot = run(5000.0, 42).unwrap();
    let production = &snapshot.production;

    assert!(production.total > 0);
    let expected_rate =
        production.faulty as f64 / (production.total + production.faulty) as f64;
    assert_eq!(production.faulty_rate, expected_rate);

    for occupancy in &snapshot.station_metrics.occupancy_rates {
        assert!((0.0..=1.0).contains(occupancy), "occupancy {}", occupancy);
    }
    assert!(snapshot.time_metrics.avg_production_time > 0.0);
    assert!(snapshot.time_metrics.supplier_occupancy >= 0.0);
    assert!(snapshot.station_metrics.downtimes.iter().all(|downtime| *downtime >= 0.0));
}

#[test]
fn test_resources_never_exceed_capacity_and_time_never_goes_back() {
    let recording = Rc::new(RefCell::new(Recording::default()));
    let mut sim = build_simulation(&FactoryConfig::default()).unwrap();
    sim.add_observer(Box::new(Recorder(recording.clone())));
    sim.run_until(5000.0).unwrap();

    let recording = recording.borrow();
    assert!(!recording.levels.is_empty());
    for (resource, held, capacity) in &recording.levels {
        assert!(held <= capacity, "{} held {} of {}", resource, held, capacity);
    }
    assert!(recording
        .delivery_times
        .windows(2)
        .all(|pair| pair[0] <= pair[1]));
    assert_eq!(recording.delivery_times.len() as u64, sim.events_delivered());
}

#[test]
fn test_materials_are_resupplied_and_used() {
    let mut sim = build_simulation(&FactoryConfig::default()).unwrap();
    sim.run_until(5000.0).unwrap();
    let factory = sim.state();
    let metrics = factory.metrics();

    assert!(metrics.resupply_count(MOTHERBOARD_CIRCUITS) > 0);
    // Units run one at a time, so at most one motherboard is in flight
    let finished = metrics.production_count() + metrics.faulty_count();
    let used = metrics.material_used(MOTHERBOARD_CIRCUITS);
    assert!(used == finished || used == finished + 1, "{} vs {}", used, finished);

    let snapshot = factory.snapshot(sim.now());
    assert_eq!(
        snapshot.material_metrics.resupply_counts[MOTHERBOARD_CIRCUITS],
        metrics.resupply_count(MOTHERBOARD_CIRCUITS)
    );
}

#[test]
fn test_empty_starting_stock_still_produces() {
    let config = FactoryConfig::default()
        .with_horizon(500.0)
        .with_material(MOTHERBOARD_CIRCUITS, Stock::Quantity(0))
        .with_material("screens", Stock::Quantity(0));
    let snapshot = run_with_config(&config).unwrap();

    assert!(snapshot.production.total + snapshot.production.faulty > 0);
    assert!(snapshot.material_metrics.resupply_counts[MOTHERBOARD_CIRCUITS] >= 1);
    assert!(snapshot.material_metrics.resupply_counts["screens"] >= 1);
    assert!(snapshot.time_metrics.supplier_occupancy > 0.0);
}

#[test]
fn test_invalid_config_is_rejected_before_running() {
    let config = FactoryConfig::default().with_failure_probabilities([0.1, 0.1, 2.0, 0.1, 0.1, 0.1]);
    assert!(matches!(run_with_config(&config), Err(Error::Config(_))));
    assert!(matches!(run(-5.0, 1), Err(Error::Config(_))));
}

#[test]
fn test_batch_matches_individual_runs() {
    let config = FactoryConfig::default().with_horizon(800.0).with_random_seed(100);
    let sequential = run_batch(&config, &BatchConfig::new().with_runs(4)).unwrap();
    let parallel = run_batch(
        &config,
        &BatchConfig::new()
            .with_runs(4)
            .with_concurrency(ConcurrencyMode::Rayon)
            .with_thread_pool_size(2),
    )
    .unwrap();

    assert_eq!(sequential.len(), 4);
    assert_eq!(sequential, parallel);
    for (offset, snapshot) in sequential.iter().enumerate() {
        let single = run(800.0, 100 + offset as u64).unwrap();
        assert_eq!(*snapshot, single);
    }
}

#[test]
fn test_snapshot_serializes_with_stable_field_names() {
    let snapshot = run(300.0, 3).unwrap();
    let value = serde_json::to_value(&snapshot).unwrap();

    let sections = [
        ("production", vec!["total", "faulty", "faulty_rate"]),
        ("station_metrics", vec!["occupancy_rates", "wait_times", "downtimes"]),
        (
            "time_metrics",
            vec!["avg_production_time", "avg_fixing_time", "supplier_occupancy"],
        ),
        ("material_metrics", vec!["materials_used", "resupply_counts"]),
    ];
    for (section, fields) in sections {
        for field in fields {
            assert!(!value[section][field].is_null(), "missing {}.{}", section, field);
        }
    }
    assert_eq!(value["station_metrics"]["occupancy_rates"].as_array().unwrap().len(), 6);
}
