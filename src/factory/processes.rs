use super::materials::{CPUS, GPUS, MOTHERBOARD_CIRCUITS, RAM, SCREENS};
use super::Factory;
use crate::core::{Exit, Process, ProcessContext, ProcessId, Signal, SimTime, Yield};
use log::{debug, warn};

/// Keeps the calendar running. Days and accidents pass without touching production.
#[derive(Debug, Default)]
pub struct DayCycle {
    days: u64,
    in_accident: bool,
}

impl DayCycle {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_day(&mut self, ctx: &mut ProcessContext<'_, Factory>) -> Yield {
        self.in_accident = false;
        let factory = ctx.state();
        let day_length = factory.draw(factory.config().day.day_length);
        Yield::Timeout(day_length)
    }
}

impl Process<Factory> for DayCycle {
    fn name(&self) -> &str {
        "day_cycle"
    }

    fn resume(&mut self, signal: Signal, ctx: &mut ProcessContext<'_, Factory>) -> Yield {
        match signal {
            Signal::Start => self.next_day(ctx),
            Signal::Timeout if self.in_accident => self.next_day(ctx),
            Signal::Timeout => {
                self.days += 1;
                let now = ctx.now();
                let factory = ctx.state();
                let accident_probability = factory.config().day.accident_probability;
                if !factory.roll(accident_probability) {
                    return self.next_day(ctx);
                }
                let duration = factory.draw(factory.config().day.accident_duration);
                debug!("[t={:.3}] Accident after day {}, lasting {:.3}", now, self.days, duration);
                self.in_accident = true;
                Yield::Timeout(duration)
            }
            _ => Yield::Abort,
        }
    }
}

/// Starts one laptop after another, pausing between finished units
#[derive(Debug, Default)]
pub struct Manufacturing {
    current: Option<ProcessId>,
    units_started: u64,
}

impl Manufacturing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn units_started(&self) -> u64 {
        self.units_started
    }

    fn start_unit(&mut self, ctx: &mut ProcessContext<'_, Factory>) -> Yield {
        self.units_started += 1;
        let unit = ctx.spawn(AssembleUnit::new(self.units_started));
        self.current = Some(unit);
        Yield::Join(unit)
    }
}

impl Process<Factory> for Manufacturing {
    fn name(&self) -> &str {
        "manufacturing"
    }

    fn resume(&mut self, signal: Signal, ctx: &mut ProcessContext<'_, Factory>) -> Yield {
        match signal {
            Signal::Joined {
                exit: Exit::Completed,
                ..
            } => {
                self.current = None;
                let factory = ctx.state();
                let pause = factory.draw(factory.config().unit_interval);
                Yield::Timeout(pause)
            }
            Signal::Joined {
                child,
                exit: Exit::Interrupted,
            } => {
                debug!("[t={:.3}] Unit {} was interrupted, starting the next one", ctx.now(), child);
                self.start_unit(ctx)
            }
            Signal::Interrupted => {
                if let Some(unit) = self.current.take() {
                    debug!("[t={:.3}] Manufacturing interrupted, leaving {} behind", ctx.now(), unit);
                }
                self.start_unit(ctx)
            }
            Signal::Start | Signal::Timeout | Signal::Granted(_) => self.start_unit(ctx),
        }
    }
}

/// Which stock a pipeline step draws from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Part {
    Single(&'static str),
    /// Material with brand or size variants
    Component(&'static str),
    /// Metal or plastic, chosen when the step begins
    Case,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Step {
    station: usize,
    part: Part,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum UnitStage {
    Idle,
    Resupplying(ProcessId),
    Queued { since: SimTime },
    Repairing,
    Processing { duration: SimTime },
}

/// One laptop travelling through the six stations
#[derive(Debug)]
pub struct AssembleUnit {
    serial: u64,
    plan: Vec<Step>,
    step: usize,
    material: String,
    stage: UnitStage,
    started_at: SimTime,
}

impl AssembleUnit {
    pub fn new(serial: u64) -> Self {
        Self {
            serial,
            plan: Vec::new(),
            step: 0,
            material: String::new(),
            stage: UnitStage::Idle,
            started_at: 0.0,
        }
    }

    fn plan(factory: &mut Factory) -> Vec<Step> {
        let mut components = [
            Step {
                station: 1,
                part: Part::Component(CPUS),
            },
            Step {
                station: 2,
                part: Part::Component(GPUS),
            },
            Step {
                station: 3,
                part: Part::Component(RAM),
            },
        ];
        factory.shuffle(&mut components);

        let mut plan = Vec::with_capacity(6);
        plan.push(Step {
            station: 0,
            part: Part::Single(MOTHERBOARD_CIRCUITS),
        });
        plan.extend(components);
        plan.push(Step {
            station: 4,
            part: Part::Case,
        });
        plan.push(Step {
            station: 5,
            part: Part::Single(SCREENS),
        });
        plan
    }

    fn current(&self) -> Option<Step> {
        self.plan.get(self.step).copied()
    }

    /// Begin the current step: make sure there is stock, then queue for the station
    fn enter_step(&mut self, ctx: &mut ProcessContext<'_, Factory>) -> Yield {
        let Some(step) = self.current() else {
            return self.inspect(ctx);
        };

        let factory = ctx.state();
        self.material = match step.part {
            Part::Single(material) | Part::Component(material) => material.to_string(),
            Part::Case => factory.choose_case_material(),
        };
        if factory.inventory().is_depleted(&self.material) {
            let resupply = ctx.spawn(Resupply::new(self.material.clone()));
            debug!(
                "[t={:.3}] Unit {} waits for {} to be resupplied by {}",
                ctx.now(),
                self.serial,
                self.material,
                resupply
            );
            self.stage = UnitStage::Resupplying(resupply);
            return Yield::Join(resupply);
        }
        self.request_station(ctx, step)
    }

    fn request_station(&mut self, ctx: &mut ProcessContext<'_, Factory>, step: Step) -> Yield {
        self.stage = UnitStage::Queued { since: ctx.now() };
        Yield::Acquire(ctx.state().station(step.station).resource())
    }

    fn start_processing(&mut self, ctx: &mut ProcessContext<'_, Factory>) -> Yield {
        let factory = ctx.state();
        let duration = factory.draw(factory.config().stations.processing_time);
        self.stage = UnitStage::Processing { duration };
        Yield::Timeout(duration)
    }

    /// Book the station time, use up the material and hand the station on
    fn finish_step(
        &mut self,
        ctx: &mut ProcessContext<'_, Factory>,
        step: Step,
        duration: SimTime,
    ) -> Yield {
        let material = self.material.as_str();
        let factory = ctx.state();
        factory.metrics_mut().record_work_time(step.station, duration);
        match step.part {
            Part::Component(_) => match factory.pick_component(material) {
                Some(variant) => factory.consume_variant(material, &variant),
                None => warn!("No {} variant left for unit {}", material, self.serial),
            },
            Part::Single(_) | Part::Case => factory.consume(material),
        }
        let resource = factory.station(step.station).resource();
        ctx.release(resource);

        self.step += 1;
        self.enter_step(ctx)
    }

    /// Quality check at the end of the line
    fn inspect(&mut self, ctx: &mut ProcessContext<'_, Factory>) -> Yield {
        let now = ctx.now();
        let factory = ctx.state();
        let reject_probability = factory.config().quality_reject_probability;
        let faulty = factory.roll(reject_probability);
        let metrics = factory.metrics_mut();
        if faulty {
            metrics.record_faulty();
        } else {
            metrics.record_production();
        }
        metrics.record_production_time(now - self.started_at);
        debug!(
            "[t={:.3}] Unit {} done after {:.3} ({})",
            now,
            self.serial,
            now - self.started_at,
            if faulty { "faulty" } else { "ok" }
        );
        Yield::Finish
    }
}

impl Process<Factory> for AssembleUnit {
    fn name(&self) -> &str {
        "assemble_unit"
    }

    fn resume(&mut self, signal: Signal, ctx: &mut ProcessContext<'_, Factory>) -> Yield {
        let now = ctx.now();
        match (signal, self.stage, self.current()) {
            (Signal::Start, _, _) => {
                self.started_at = now;
                self.plan = Self::plan(ctx.state());
                self.enter_step(ctx)
            }
            (Signal::Joined { exit: Exit::Completed, .. }, UnitStage::Resupplying(_), Some(step)) => {
                self.request_station(ctx, step)
            }
            (Signal::Granted(_), UnitStage::Queued { since }, Some(step)) => {
                let factory = ctx.state();
                factory.metrics_mut().record_waiting_time(step.station, now - since);
                let repair = factory.check_station_failure(step.station);
                if repair > 0.0 {
                    self.stage = UnitStage::Repairing;
                    Yield::Timeout(repair)
                } else {
                    self.start_processing(ctx)
                }
            }
            (Signal::Timeout, UnitStage::Repairing, Some(_)) => self.start_processing(ctx),
            (Signal::Timeout, UnitStage::Processing { duration }, Some(step)) => {
                self.finish_step(ctx, step, duration)
            }
            (signal, stage, _) => {
                debug!(
                    "[t={:.3}] Unit {} abandoned on {:?} while {:?}",
                    now, self.serial, signal, stage
                );
                Yield::Abort
            }
        }
    }
}

/// Brings a depleted material back through the shared supply device
#[derive(Debug)]
pub struct Resupply {
    material: String,
    duration: Option<SimTime>,
}

impl Resupply {
    pub fn new(material: impl Into<String>) -> Self {
        Self {
            material: material.into(),
            duration: None,
        }
    }
}

impl Process<Factory> for Resupply {
    fn name(&self) -> &str {
        "resupply"
    }

    fn resume(&mut self, signal: Signal, ctx: &mut ProcessContext<'_, Factory>) -> Yield {
        let factory = ctx.state();
        match (signal, self.duration) {
            (Signal::Start, None) => Yield::Acquire(factory.supply_device()),
            (Signal::Granted(_), None) => {
                let duration = factory.draw(factory.config().resupply.resupply_time);
                self.duration = Some(duration);
                Yield::Timeout(duration)
            }
            (Signal::Timeout, Some(duration)) => {
                factory.metrics_mut().record_supply_time(duration);
                factory.replenish(&self.material);
                factory.metrics_mut().record_resupply(&self.material);
                Yield::Finish
            }
            _ => Yield::Abort,
        }
    }
}
