//! Integration tests for the production pipeline.
//!
//! Exercises: BuildingCatalog → ProductionTask → ProductionQueue → Colony
//! over many simulated days, plus observer and snapshot output.
//!
//! All tests are pure logic with no game loop and no rendering.

use std::collections::BTreeMap;
use std::sync::mpsc;

use thaleia_logic::prelude::*;

// ── Helpers ────────────────────────────────────────────────────────────

#[derive(Debug)]
struct TestColony {
    output: u32,
    buildings: BTreeMap<String, u32>,
    deliveries: Vec<String>,
}

impl TestColony {
    fn with_output(output: u32) -> Self {
        Self {
            output,
            buildings: BTreeMap::new(),
            deliveries: Vec::new(),
        }
    }
}

impl Colony for TestColony {
    type Product = BuildingType;

    fn daily_output(&self) -> u32 {
        self.output
    }

    fn on_building_finished(
        &mut self,
        product: &BuildingType,
        quantity: u32,
    ) -> Result<(), CallbackError> {
        *self.buildings.entry(product.id.clone()).or_insert(0) += quantity;
        self.deliveries.push(product.id.clone());
        Ok(())
    }
}

fn day(n: i64) -> Timestamp {
    Timestamp::from_days(n)
}

fn building(id: &str) -> BuildingType {
    BuildingCatalog::standard()
        .get(id)
        .cloned()
        .expect("standard catalog entry")
}

fn order(id: &str, quantity: u32) -> ProductionTask<BuildingType> {
    ProductionTask::new(building(id), quantity).unwrap()
}

// ── Task timing ────────────────────────────────────────────────────────

#[test]
fn single_factory_takes_ten_days() {
    let mut task = order("factory", 1);
    task.assign_output(day(0), 100, 1.0).unwrap();
    assert_eq!(task.finish_date().unwrap(), day(10));
}

#[test]
fn output_increase_after_five_days() {
    let mut task = order("factory", 1);
    task.assign_output(day(0), 100, 1.0).unwrap();
    task.assign_output(day(5), 500, 1.0).unwrap();
    assert_eq!(task.remaining_cost(), 500);
    assert_eq!(task.finish_date().unwrap(), day(6));
}

#[test]
fn finish_date_matches_cost_over_output() {
    for (output, quantity) in [(1u32, 1u32), (7, 3), (100, 2), (999, 5), (2500, 1)] {
        let mut task = order("laboratory", quantity);
        let cost = task.remaining_cost();
        task.assign_output(day(3), output, 1.0).unwrap();
        let expected = day(3).plus_days(cost as f64 / output as f64);
        assert_eq!(task.finish_date().unwrap(), expected, "output {}", output);
    }
}

#[test]
fn repeated_assignment_at_same_instant_is_idempotent() {
    let mut task = order("shipyard", 2);
    task.assign_output(day(1), 300, 0.5).unwrap();
    let before = task.remaining_cost();
    for _ in 0..5 {
        task.assign_output(day(1), 300, 0.5).unwrap();
    }
    assert_eq!(task.remaining_cost(), before);
}

#[test]
fn lock_blocks_share_change_until_halt() {
    let mut task = order("mine", 1);
    task.assign_output(day(0), 60, 0.6).unwrap();
    task.set_share_locked(true);
    assert!(matches!(
        task.assign_output(day(1), 60, 0.3),
        Err(ProductionError::InvalidState(_))
    ));

    task.halt(day(2)).unwrap();
    assert!(!task.is_share_locked());
    task.assign_output(day(2), 30, 0.3).unwrap();
    assert_eq!(task.remaining_cost(), 480);
}

#[test]
fn whole_and_fractional_accrual_diverge_after_interruptions() {
    let mut legacy = order("factory", 1);
    let mut exact = order("factory", 1).with_accrual(AccrualPolicy::FractionalDays);

    for task in [&mut legacy, &mut exact] {
        task.assign_output(day(0), 100, 1.0).unwrap();
        task.halt(day(0).plus_days(2.5)).unwrap();
        task.assign_output(day(3), 100, 1.0).unwrap();
    }

    assert_eq!(legacy.remaining_cost(), 800);
    assert_eq!(exact.remaining_cost(), 750);
    assert_eq!(legacy.finish_date().unwrap(), day(11));
    assert_eq!(exact.finish_date().unwrap(), day(0).plus_days(10.5));
}

// ── Queue behavior ─────────────────────────────────────────────────────

#[test]
fn activation_invariant_holds_for_every_add() {
    let mut queue = ProductionQueue::new(TestColony::with_output(100), day(0));
    let first = queue.add(order("mine", 1)).unwrap();
    assert_eq!(queue.active_ids(), vec![first]);
    assert!(queue.waiting_ids().is_empty());

    let mut expected_waiting = Vec::new();
    for id in ["factory", "laboratory", "shipyard", "mine"] {
        expected_waiting.push(queue.add(order(id, 1)).unwrap());
        assert_eq!(queue.active_ids(), vec![first]);
        assert_eq!(queue.waiting_ids(), expected_waiting);
    }
}

#[test]
fn rejected_add_leaves_queue_unchanged() {
    let mut queue = ProductionQueue::new(TestColony::with_output(100), day(0));
    queue.add(order("mine", 1)).unwrap();
    queue.add(order("factory", 1)).unwrap();

    let mut already_running = order("laboratory", 1);
    already_running.assign_output(day(0), 10, 1.0).unwrap();
    assert!(matches!(
        queue.add(already_running),
        Err(ProductionError::InvalidArgument(_))
    ));
    assert_eq!(queue.active_ids().len(), 1);
    assert_eq!(queue.waiting_ids().len(), 1);
}

#[test]
fn move_up_in_three_task_queue() {
    let mut queue = ProductionQueue::new(TestColony::with_output(100), day(0));
    let (tx, rx) = mpsc::channel();
    queue.add_observer(Box::new(ChannelObserver::new(tx)));

    let a = queue.add(order("factory", 1)).unwrap();
    let b = queue.add(order("mine", 1)).unwrap();
    let c = queue.add(order("laboratory", 1)).unwrap();
    assert_eq!(queue.active_ids(), vec![a]);
    assert_eq!(queue.waiting_ids(), vec![b, c]);
    rx.try_iter().for_each(drop);

    queue.move_up(c).unwrap();
    assert_eq!(queue.waiting_ids(), vec![c, b]);
    assert_eq!(rx.try_iter().collect::<Vec<_>>(), vec![QueueEvent::Reordered]);
}

#[test]
fn reordering_changes_build_order() {
    let mut queue = ProductionQueue::new(TestColony::with_output(200), day(0));
    queue.add(order("mine", 1)).unwrap();
    let factory = queue.add(order("factory", 1)).unwrap();
    let lab = queue.add(order("laboratory", 1)).unwrap();
    queue.move_down(factory).unwrap();
    assert_eq!(queue.waiting_ids(), vec![lab, factory]);

    let mut now = day(0);
    while !queue.is_empty() {
        now = now.plus_whole_days(1);
        queue.advance(now).unwrap();
    }
    assert_eq!(
        queue.colony().deliveries,
        vec!["mine".to_string(), "laboratory".to_string(), "factory".to_string()]
    );
}

#[test]
fn full_build_program_completes_in_order() {
    let mut queue = ProductionQueue::new(TestColony::with_output(250), day(0));
    let (tx, rx) = mpsc::channel();
    queue.add_observer(Box::new(ChannelObserver::new(tx)));
    queue.add_observer(Box::new(LogObserver::new("Test Colony")));

    // 1000 + 1200 + 800 + 2400 = 5400 points at 250/day.
    queue.add(order("factory", 1)).unwrap();
    queue.add(order("mine", 2)).unwrap();
    queue.add(order("laboratory", 1)).unwrap();
    queue.add(order("shipyard", 1)).unwrap();

    let mut finished_days = Vec::new();
    for d in 1..=40 {
        let report = queue.advance(day(d)).unwrap();
        for _ in &report.finished {
            finished_days.push(d);
        }
    }

    assert!(queue.is_empty());
    let colony = queue.colony();
    assert_eq!(colony.buildings.get("factory"), Some(&1));
    assert_eq!(colony.buildings.get("mine"), Some(&2));
    assert_eq!(colony.buildings.get("laboratory"), Some(&1));
    assert_eq!(colony.buildings.get("shipyard"), Some(&1));
    // Each task starts on the tick its predecessor is delivered.
    assert_eq!(finished_days, vec![4, 9, 13, 23]);

    let finished: Vec<_> = rx
        .try_iter()
        .filter(|e| matches!(e, QueueEvent::Finished(_)))
        .collect();
    assert_eq!(finished.len(), 4);
}

#[test]
fn capacity_drop_is_applied_by_rebalance() {
    let mut queue = ProductionQueue::new(TestColony::with_output(100), day(0));
    let id = queue.add(order("factory", 1)).unwrap();

    queue.advance(day(4)).unwrap();
    queue.colony_mut().output = 50;
    queue.rebalance(day(4)).unwrap();

    let task = queue.task(id).unwrap();
    assert_eq!(task.remaining_cost(), 600);
    assert_eq!(task.finish_date().unwrap(), day(16));
}

#[test]
fn pulling_the_active_task_hands_capacity_to_the_next() {
    let mut queue = ProductionQueue::new(TestColony::with_output(100), day(0));
    let factory = queue.add(order("factory", 1)).unwrap();
    let mine = queue.add(order("mine", 1)).unwrap();

    queue.advance(day(3)).unwrap();
    let pulled = queue.remove(factory).unwrap();
    assert_eq!(pulled.remaining_cost(), 700);

    let report = queue.advance(day(3)).unwrap();
    assert_eq!(report.activated, Some(mine));
    assert_eq!(queue.task(mine).unwrap().finish_date().unwrap(), day(9));

    // Re-queued work resumes from where it stopped.
    let factory = queue.add(pulled).unwrap();
    queue.advance(day(9)).unwrap();
    assert_eq!(queue.active_ids(), vec![factory]);
    assert_eq!(queue.task(factory).unwrap().finish_date().unwrap(), day(16));
}

#[test]
fn legacy_config_reports_finished_task_every_tick() {
    let mut queue = ProductionQueue::with_config(
        TestColony::with_output(100),
        day(0),
        SchedulerConfig::legacy(),
    );
    queue.add(order("factory", 1)).unwrap();

    for d in 10..13 {
        queue.advance(day(d)).unwrap();
    }
    assert_eq!(queue.colony().deliveries.len(), 3);
    assert_eq!(queue.active_ids().len(), 1);
}

#[test]
fn legacy_config_still_fills_an_idle_queue() {
    let mut queue = ProductionQueue::with_config(
        TestColony::with_output(100),
        day(0),
        SchedulerConfig::legacy(),
    );
    let factory = queue.add(order("factory", 1)).unwrap();
    let mine = queue.add(order("mine", 1)).unwrap();

    queue.advance(day(2)).unwrap();
    let pulled = queue.remove(factory).unwrap();
    assert!(!pulled.is_active());
    assert_eq!(pulled.remaining_cost(), 800);

    let report = queue.advance(day(2)).unwrap();
    assert_eq!(report.activated, Some(mine));
    assert_eq!(queue.active_ids(), vec![mine]);
}

#[test]
fn oversized_orders_are_rejected_without_panicking() {
    let arcology = BuildingType::new("arcology", "Arcology", u32::MAX);
    assert!(matches!(
        ProductionTask::new(arcology.clone(), u32::MAX),
        Err(ProductionError::InvalidArgument(_))
    ));

    // Accepted, but one point a day would finish past the end of time.
    let mut queue = ProductionQueue::new(TestColony::with_output(1), day(0));
    queue.add(ProductionTask::new(arcology, 1000).unwrap()).unwrap();
    assert!(queue.active_ids().is_empty());
    assert_eq!(queue.waiting_ids().len(), 1);
    assert!(queue.advance(day(1)).unwrap().activated.is_none());
}

#[test]
fn snapshot_reflects_progress() {
    let mut queue = ProductionQueue::new(TestColony::with_output(100), day(0));
    let id = queue.add(order("factory", 1)).unwrap();
    queue.add(order("mine", 1)).unwrap();

    let snap = queue.snapshot(day(5));
    assert_eq!(snap.active[0].id, id);
    assert_eq!(snap.active[0].remaining_cost, 500);
    assert_eq!(snap.waiting[0].product, "Mine");

    let json = snap.to_json().unwrap();
    let back: QueueSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(back, snap);
}
