//! Thaleia Headless Production Harness
//!
//! Drives colony production queues through simulated days without a game
//! loop, renderer or UI. Runs entirely in-process.
//!
//! Usage:
//!   cargo run -p thaleia-simtest
//!   cargo run -p thaleia-simtest -- --verbose
//!   cargo run -p thaleia-simtest -- path/to/scenario.json

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::mpsc;
use std::thread;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use thaleia_logic::prelude::*;

// ── Scenario (same layout the game's colony setup uses) ─────────────────
const SCENARIO_JSON: &str = include_str!("../../../data/colony_scenario.json");

#[derive(Debug, Deserialize)]
struct Scenario {
    colony: ColonySpec,
    catalog: BuildingCatalog,
    #[serde(default)]
    scheduler: SchedulerConfig,
    orders: Vec<OrderSpec>,
    days: i64,
    #[serde(default = "default_ticks_per_day")]
    ticks_per_day: u32,
    #[serde(default)]
    seed: u64,
}

fn default_ticks_per_day() -> u32 {
    1
}

#[derive(Debug, Deserialize)]
struct ColonySpec {
    name: String,
    daily_output: u32,
}

#[derive(Debug, Deserialize)]
struct OrderSpec {
    building: String,
    quantity: u32,
}

// ── Colony stand-in ─────────────────────────────────────────────────────

struct Settlement {
    daily_output: u32,
    stock: BTreeMap<String, u32>,
}

impl Settlement {
    fn new(daily_output: u32) -> Self {
        Self {
            daily_output,
            stock: BTreeMap::new(),
        }
    }

    fn total_buildings(&self) -> u32 {
        self.stock.values().sum()
    }
}

impl Colony for Settlement {
    type Product = BuildingType;

    fn daily_output(&self) -> u32 {
        self.daily_output
    }

    fn on_building_finished(
        &mut self,
        product: &BuildingType,
        quantity: u32,
    ) -> Result<(), CallbackError> {
        *self.stock.entry(product.id.clone()).or_insert(0) += quantity;
        Ok(())
    }
}

// ── Test harness ────────────────────────────────────────────────────────

struct TestResult {
    name: String,
    passed: bool,
    detail: String,
}

fn check(name: &str, passed: bool, detail: impl Into<String>) -> TestResult {
    TestResult {
        name: name.into(),
        passed,
        detail: detail.into(),
    }
}

fn main() {
    let verbose = std::env::args().any(|a| a == "--verbose");
    let path = std::env::args().skip(1).find(|a| !a.starts_with("--"));
    println!("=== Thaleia Production Harness ===\n");

    let source = match &path {
        Some(p) => match std::fs::read_to_string(p) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("cannot read scenario {}: {}", p, e);
                std::process::exit(1);
            }
        },
        None => SCENARIO_JSON.to_string(),
    };
    let scenario: Scenario = match serde_json::from_str(&source) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("scenario parse error: {}", e);
            std::process::exit(1);
        }
    };

    let mut results = Vec::new();

    // 1. Building catalog
    results.extend(validate_catalog(&scenario));

    // 2. Task timing
    results.extend(validate_task_timing(verbose));

    // 3. Scenario build program
    results.extend(run_build_program(&scenario, verbose));

    // 4. Seeded soak of queue invariants
    results.extend(soak_queue(&scenario, verbose));

    // 5. Shared queue across threads
    results.extend(validate_shared_queue(&scenario));

    // ── Summary ──
    println!();
    let passed = results.iter().filter(|r| r.passed).count();
    let failed = results.iter().filter(|r| !r.passed).count();
    let total = results.len();

    for r in &results {
        let icon = if r.passed { "✓" } else { "✗" };
        if !r.passed || verbose {
            println!("  {} {}: {}", icon, r.name, r.detail);
        }
    }

    println!(
        "\n=== RESULT: {}/{} passed, {} failed ===",
        passed, total, failed
    );

    if failed > 0 {
        std::process::exit(1);
    }
}

// ── 1. Catalog ──────────────────────────────────────────────────────────

fn validate_catalog(scenario: &Scenario) -> Vec<TestResult> {
    println!("--- Building Catalog ---");
    let mut results = Vec::new();
    let catalog = &scenario.catalog;

    results.push(check(
        "catalog_not_empty",
        !catalog.is_empty(),
        format!("{} building types loaded", catalog.len()),
    ));

    let problems = catalog.validate();
    results.push(check(
        "catalog_valid",
        problems.is_empty(),
        if problems.is_empty() {
            "all building types usable".to_string()
        } else {
            problems.join("; ")
        },
    ));

    let unknown: Vec<_> = scenario
        .orders
        .iter()
        .filter(|o| catalog.get(&o.building).is_none())
        .map(|o| o.building.as_str())
        .collect();
    results.push(check(
        "orders_reference_catalog",
        unknown.is_empty(),
        if unknown.is_empty() {
            format!("{} orders resolve", scenario.orders.len())
        } else {
            format!("unknown buildings: {}", unknown.join(", "))
        },
    ));

    let zero_qty = scenario.orders.iter().filter(|o| o.quantity == 0).count();
    results.push(check(
        "orders_positive_quantity",
        zero_qty == 0,
        format!("{} orders with zero quantity", zero_qty),
    ));

    results.push(check(
        "colony_has_output",
        scenario.colony.daily_output > 0,
        format!(
            "{} produces {} points/day",
            scenario.colony.name, scenario.colony.daily_output
        ),
    ));

    results
}

// ── 2. Task timing ──────────────────────────────────────────────────────

fn validate_task_timing(verbose: bool) -> Vec<TestResult> {
    println!("--- Task Timing ---");
    let mut results = Vec::new();
    let factory = BuildingType::new("factory", "Factory", 1000);
    let day = Timestamp::from_days;

    // Fresh start: 1000 points at 100/day
    let outcome = ProductionTask::new(factory.clone(), 1).and_then(|mut t| {
        t.assign_output(day(0), 100, 1.0)?;
        t.finish_date()
    });
    results.push(check(
        "fresh_start_ten_days",
        matches!(outcome, Ok(d) if d == day(10)),
        format!("{:?}", outcome.map(|d| d.to_string())),
    ));

    // Output raised after five days
    let outcome = ProductionTask::new(factory.clone(), 1).and_then(|mut t| {
        t.assign_output(day(0), 100, 1.0)?;
        t.assign_output(day(5), 500, 1.0)?;
        Ok((t.remaining_cost(), t.finish_date()?))
    });
    results.push(check(
        "output_change_reprojects",
        matches!(outcome, Ok((500, d)) if d == day(6)),
        format!("{:?}", outcome.map(|(c, d)| (c, d.to_string()))),
    ));

    // Halt for a day and resume
    let outcome = ProductionTask::new(factory.clone(), 1).and_then(|mut t| {
        t.assign_output(day(0), 100, 1.0)?;
        t.halt(day(5))?;
        t.assign_output(day(6), 100, 1.0)?;
        t.finish_date()
    });
    results.push(check(
        "halt_and_resume",
        matches!(outcome, Ok(d) if d == day(11)),
        format!("{:?}", outcome.map(|d| d.to_string())),
    ));

    // Same-instant reassignment books nothing
    let outcome = ProductionTask::new(factory.clone(), 1).and_then(|mut t| {
        t.assign_output(day(2), 100, 1.0)?;
        t.assign_output(day(2), 100, 1.0)?;
        Ok(t.remaining_cost())
    });
    results.push(check(
        "same_instant_idempotent",
        matches!(outcome, Ok(1000)),
        format!("{:?}", outcome),
    ));

    // Locked share
    let outcome = ProductionTask::new(factory.clone(), 1).and_then(|mut t| {
        t.assign_output(day(0), 100, 1.0)?;
        t.set_share_locked(true);
        let rejected = matches!(
            t.assign_output(day(1), 100, 0.5),
            Err(ProductionError::InvalidState(_))
        );
        t.halt(day(1))?;
        Ok((rejected, t.is_share_locked()))
    });
    results.push(check(
        "lock_blocks_share_change",
        matches!(outcome, Ok((true, false))),
        format!("{:?}", outcome),
    ));

    // Time travel
    let outcome = ProductionTask::new(factory, 1).and_then(|mut t| {
        t.assign_output(Timestamp::from_millis(100), 100, 1.0)?;
        Ok(t.halt(Timestamp::from_millis(99)))
    });
    results.push(check(
        "rejects_halt_in_past",
        matches!(outcome, Ok(Err(ProductionError::InvalidArgument(_)))),
        "halt before last update is refused",
    ));

    if verbose {
        let mut whole = ProductionTask::new(BuildingType::new("mine", "Mine", 600), 1)
            .map(|t| t.with_accrual(AccrualPolicy::WholeDays));
        let mut exact = ProductionTask::new(BuildingType::new("mine", "Mine", 600), 1)
            .map(|t| t.with_accrual(AccrualPolicy::FractionalDays));
        for task in [&mut whole, &mut exact].into_iter().flatten() {
            let halted = task
                .assign_output(day(0), 100, 1.0)
                .and_then(|_| task.halt(day(0).plus_days(1.75)));
            if halted.is_ok() {
                println!(
                    "  {:?}: {} cost left after 1.75 days at 100/day",
                    task.accrual(),
                    task.remaining_cost()
                );
            }
        }
    }

    results
}

// ── 3. Build program ────────────────────────────────────────────────────

fn run_build_program(scenario: &Scenario, verbose: bool) -> Vec<TestResult> {
    println!("--- Build Program ({}) ---", scenario.colony.name);
    let mut results = Vec::new();

    let start = Timestamp::EPOCH;
    let mut queue = ProductionQueue::with_config(
        Settlement::new(scenario.colony.daily_output),
        start,
        scenario.scheduler,
    );
    queue.add_observer(Box::new(LogObserver::new(scenario.colony.name.clone())));
    let (tx, rx) = mpsc::channel();
    queue.add_observer(Box::new(ChannelObserver::new(tx)));

    let mut ordered: BTreeMap<String, u32> = BTreeMap::new();
    let mut queue_order = Vec::new();
    for o in &scenario.orders {
        let Some(building) = scenario.catalog.get(&o.building) else {
            continue;
        };
        match queue
            .create_task(building.clone(), o.quantity)
            .and_then(|t| queue.add(t))
        {
            Ok(id) => {
                *ordered.entry(o.building.clone()).or_insert(0) += o.quantity;
                queue_order.push(id);
            }
            Err(e) => results.push(check("order_accepted", false, e.to_string())),
        }
    }

    let ticks_per_day = scenario.ticks_per_day.max(1) as i64;
    let tick_ms = MS_PER_DAY / ticks_per_day;
    let mut projected: HashMap<TaskId, Timestamp> = HashMap::new();
    let mut delivered_at: Vec<(TaskId, Timestamp)> = Vec::new();
    let mut late = Vec::new();
    let mut errors = Vec::new();

    let mut now = start;
    let end = start.plus_whole_days(scenario.days);
    while now < end {
        for (id, task) in queue.active() {
            if let Ok(due) = task.finish_date() {
                projected.insert(id, due);
            }
        }
        now = now.plus_millis(tick_ms);
        match queue.advance(now) {
            Ok(report) => {
                for id in report.finished {
                    if let Some(due) = projected.get(&id) {
                        if now.millis_since(*due) >= tick_ms {
                            late.push(id);
                        }
                    }
                    delivered_at.push((id, now));
                }
            }
            Err(e) => errors.push(e.to_string()),
        }
        if queue.is_empty() {
            break;
        }
    }

    results.push(check(
        "program_no_errors",
        errors.is_empty(),
        if errors.is_empty() {
            "every tick succeeded".to_string()
        } else {
            errors.join("; ")
        },
    ));

    results.push(check(
        "program_completes",
        queue.is_empty(),
        format!(
            "{} of {} orders delivered by {}",
            delivered_at.len(),
            queue_order.len(),
            now
        ),
    ));

    let stock = &queue.colony().stock;
    results.push(check(
        "stock_matches_orders",
        *stock == ordered,
        format!("stock {:?}, ordered {:?}", stock, ordered),
    ));

    let delivered_order: Vec<TaskId> = delivered_at.iter().map(|(id, _)| *id).collect();
    results.push(check(
        "delivered_in_queue_order",
        delivered_order == queue_order,
        format!("{:?}", delivered_order),
    ));

    let monotonic = delivered_at.windows(2).all(|w| w[0].1 <= w[1].1);
    results.push(check(
        "delivery_days_non_decreasing",
        monotonic,
        delivered_at
            .iter()
            .map(|(id, t)| format!("{} {}", id, t))
            .collect::<Vec<_>>()
            .join(", "),
    ));

    results.push(check(
        "delivered_within_one_tick",
        late.is_empty(),
        format!("{} late deliveries", late.len()),
    ));

    let finished_events = rx
        .try_iter()
        .filter(|e| matches!(e, QueueEvent::Finished(_)))
        .count();
    results.push(check(
        "finish_events_match_deliveries",
        finished_events == delivered_at.len(),
        format!("{} finish events", finished_events),
    ));

    if verbose {
        match queue.snapshot(now).to_json() {
            Ok(json) => println!("  final queue snapshot:\n{}", json),
            Err(e) => println!("  snapshot failed: {}", e),
        }
        println!(
            "  {} buildings in stock at {}",
            queue.colony().total_buildings(),
            now
        );
    }

    results
}

// ── 4. Soak ─────────────────────────────────────────────────────────────

fn soak_queue(scenario: &Scenario, verbose: bool) -> Vec<TestResult> {
    println!("--- Queue Soak (seed {}) ---", scenario.seed);
    let mut results = Vec::new();
    let mut rng = StdRng::seed_from_u64(scenario.seed);
    let types: Vec<BuildingType> = scenario.catalog.iter().cloned().collect();
    if types.is_empty() {
        results.push(check("soak_catalog", false, "no building types to queue"));
        return results;
    }

    let mut queue = ProductionQueue::with_config(
        Settlement::new(scenario.colony.daily_output),
        Timestamp::EPOCH,
        scenario.scheduler,
    );

    let mut live: HashSet<TaskId> = HashSet::new();
    let mut quantities: HashMap<TaskId, u32> = HashMap::new();
    let mut delivered_qty = 0u32;
    let mut now = Timestamp::EPOCH;

    let mut partition_violations = 0;
    let mut state_violations = 0;
    let mut order_violations = 0;
    let mut unexpected_errors = Vec::new();
    let steps = 2000;

    for _ in 0..steps {
        match rng.gen_range(0..10) {
            0..=2 => {
                let building = types.choose(&mut rng).cloned().unwrap_or_else(|| types[0].clone());
                let quantity = rng.gen_range(1..=3);
                match queue.create_task(building, quantity).and_then(|t| queue.add(t)) {
                    Ok(id) => {
                        live.insert(id);
                        quantities.insert(id, quantity);
                    }
                    Err(e) => unexpected_errors.push(e.to_string()),
                }
            }
            3 => {
                let ids: Vec<TaskId> = live.iter().copied().collect();
                if let Some(id) = ids.choose(&mut rng) {
                    match queue.remove(*id) {
                        Ok(task) if !task.is_active() => {
                            live.remove(id);
                        }
                        Ok(_) => state_violations += 1,
                        Err(e) => unexpected_errors.push(e.to_string()),
                    }
                }
            }
            4..=5 => {
                let before = queue.waiting_ids();
                if let Some(&id) = before.choose(&mut rng) {
                    let up = rng.gen_bool(0.5);
                    let mut expected = before.clone();
                    let pos = before.iter().position(|i| *i == id).unwrap_or(0);
                    let outcome = if up {
                        if pos > 0 {
                            expected.swap(pos - 1, pos);
                        }
                        queue.move_up(id)
                    } else {
                        if pos + 1 < expected.len() {
                            expected.swap(pos, pos + 1);
                        }
                        queue.move_down(id)
                    };
                    if let Err(e) = outcome {
                        unexpected_errors.push(e.to_string());
                    }
                    if queue.waiting_ids() != expected {
                        order_violations += 1;
                    }
                }
            }
            _ => {
                let before = queue.waiting_ids();
                now = now.plus_millis(rng.gen_range(0..=36) * 60 * 60 * 1000);
                match queue.advance(now) {
                    Ok(report) => {
                        for id in &report.finished {
                            delivered_qty += quantities.get(id).copied().unwrap_or(0);
                            if queue.config().completion == CompletionPolicy::RemoveFinished {
                                live.remove(id);
                            }
                        }
                        // Only the head may leave the waiting list on a tick.
                        let after = queue.waiting_ids();
                        let expected = match report.activated {
                            Some(_) => before.get(1..).map(|s| s.to_vec()).unwrap_or_default(),
                            None => before,
                        };
                        if after != expected {
                            order_violations += 1;
                        }
                    }
                    Err(e) => unexpected_errors.push(e.to_string()),
                }
            }
        }

        let waiting: HashSet<TaskId> = queue.waiting_ids().into_iter().collect();
        let active: HashSet<TaskId> = queue.active_ids().into_iter().collect();
        let union: HashSet<TaskId> = waiting.union(&active).copied().collect();
        if !waiting.is_disjoint(&active) || union != live {
            partition_violations += 1;
        }
        if queue.waiting().any(|(_, t)| t.is_active()) || queue.active().any(|(_, t)| !t.is_active()) {
            state_violations += 1;
        }
    }

    results.push(check(
        "soak_no_unexpected_errors",
        unexpected_errors.is_empty(),
        format!("{} errors {:?}", unexpected_errors.len(), unexpected_errors.first()),
    ));
    results.push(check(
        "soak_partition",
        partition_violations == 0,
        format!("{} steps where a task was not in exactly one list", partition_violations),
    ));
    results.push(check(
        "soak_task_states",
        state_violations == 0,
        format!("{} steps with waiting/active state mismatch", state_violations),
    ));
    results.push(check(
        "soak_waiting_order",
        order_violations == 0,
        format!("{} unexpected waiting-list orders", order_violations),
    ));
    results.push(check(
        "soak_deliveries_reach_colony",
        queue.colony().total_buildings() == delivered_qty,
        format!(
            "{} buildings delivered, {} in stock",
            delivered_qty,
            queue.colony().total_buildings()
        ),
    ));

    if verbose {
        println!(
            "  after {} steps: {} active, {} waiting, {} buildings, clock {}",
            steps,
            queue.active_ids().len(),
            queue.waiting_ids().len(),
            queue.colony().total_buildings(),
            now
        );
    }

    results
}

// ── 5. Shared queue ─────────────────────────────────────────────────────

fn validate_shared_queue(scenario: &Scenario) -> Vec<TestResult> {
    println!("--- Shared Queue ---");
    let mut results = Vec::new();
    let Some(building) = scenario.catalog.iter().next().cloned() else {
        results.push(check("shared_catalog", false, "no building types to queue"));
        return results;
    };

    let shared = SharedQueue::new(ProductionQueue::with_config(
        Settlement::new(scenario.colony.daily_output.max(1)),
        Timestamp::EPOCH,
        scenario.scheduler,
    ));

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let shared = shared.clone();
            let building = building.clone();
            thread::spawn(move || {
                let mut added = 0u32;
                for _ in 0..50 {
                    if let Ok(task) = ProductionTask::new(building.clone(), 1) {
                        if shared.add(task).is_ok() {
                            added += 1;
                        }
                    }
                }
                added
            })
        })
        .collect();

    let ticker = {
        let shared = shared.clone();
        thread::spawn(move || {
            let mut finished = 0u32;
            for d in 1..=200 {
                if let Ok(report) = shared.advance(Timestamp::from_days(d)) {
                    finished += report.finished.len() as u32;
                }
            }
            finished
        })
    };

    let added: u32 = producers.into_iter().filter_map(|h| h.join().ok()).sum();
    let finished = ticker.join().unwrap_or(0);
    let remaining = shared.with(|q| q.len() as u32).unwrap_or(u32::MAX);

    results.push(check(
        "shared_all_adds_accepted",
        added == 200,
        format!("{} of 200 tasks added", added),
    ));
    let accounted = if scenario.scheduler.completion == CompletionPolicy::RemoveFinished {
        finished + remaining == added
    } else {
        remaining == added
    };
    results.push(check(
        "shared_tasks_accounted",
        accounted,
        format!("{} finished + {} queued vs {} added", finished, remaining, added),
    ));

    results
}
