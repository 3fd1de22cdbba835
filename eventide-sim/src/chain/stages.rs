//! Generator and stage processes of the chain workload.

use std::collections::VecDeque;

use anyhow::{Context as _, bail};
use eventide_core::kernel::{Context, Delay, DeterministicRng, Process, ResourceId, Step, Wakeup};
use tracing::debug;

use super::data_item::DataItem;
use super::error::WorkloadError;

/// Trace label written when a stage acquires its resource.
pub const ENTER_LABEL: &str = "ENTER";
/// Trace label written when a stage releases its resource.
pub const EXIT_LABEL: &str = "EXIT";

/// Uniform range `[min, max)` for hold durations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HoldRange {
    pub(super) min: f64,
    pub(super) max: f64,
}

impl HoldRange {
    /// Creates a hold range.
    ///
    /// # Errors
    ///
    /// - `WorkloadError::InvalidHoldRange` - Bounds negative, not finite, or `min > max`
    pub fn new(min: f64, max: f64) -> Result<Self, WorkloadError> {
        if !min.is_finite() || !max.is_finite() || min < 0.0 || min > max {
            return Err(WorkloadError::InvalidHoldRange { min, max });
        }
        Ok(Self { min, max })
    }

    /// Returns the lower bound.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Returns the upper bound.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Draws a hold duration.
    pub fn sample(&self, rng: &mut DeterministicRng) -> f64 {
        rng.uniform(self.min, self.max)
    }
}

/// One resource-acquisition step of the chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Stage {
    /// Short label used in process names, e.g. `A`
    pub label: String,
    /// Resource acquired by this stage
    pub resource: ResourceId,
    /// How long the resource is held
    pub hold: HoldRange,
}

/// Process name of `item` in the stage labelled `stage`.
pub fn stage_process_name(item: &str, stage: &str) -> String {
    format!("{item}/{stage}")
}

/// Splits a stage process name back into `(item, stage)`.
pub fn parse_stage_process_name(name: &str) -> Option<(&str, &str)> {
    name.rsplit_once('/')
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum StagePhase {
    Idle,
    Waiting,
    Holding,
}

/// Moves one item through its current stage, then hands it to the next.
pub struct StageProcess {
    item: Option<DataItem>,
    stage: Stage,
    remaining: VecDeque<Stage>,
    phase: StagePhase,
}

impl StageProcess {
    /// Creates the process for `stage`; `remaining` stages follow in order.
    pub fn new(item: DataItem, stage: Stage, remaining: VecDeque<Stage>) -> Self {
        Self {
            item: Some(item),
            stage,
            remaining,
            phase: StagePhase::Idle,
        }
    }

    /// Name under which this process is spawned.
    pub fn process_name(&self) -> String {
        let item = self.item.as_ref().map_or("item-?", |item| item.name.as_str());
        stage_process_name(item, &self.stage.label)
    }

    fn enter(&mut self, ctx: &mut Context<'_>) -> anyhow::Result<Step> {
        let item = self
            .item
            .as_mut()
            .context("stage resumed without its data item")?;
        let value = item.bump();
        ctx.record(ENTER_LABEL, value);

        let hold = self.stage.hold.sample(ctx.rng());
        debug!(
            item = %item.name,
            stage = %self.stage.label,
            time = %ctx.now(),
            hold,
            "Stage entered"
        );
        self.phase = StagePhase::Holding;
        Ok(Step::Timeout(Delay::new(hold)?))
    }

    fn exit(&mut self, ctx: &mut Context<'_>) -> anyhow::Result<Step> {
        ctx.release(self.stage.resource)?;
        let item = self
            .item
            .take()
            .context("stage finished without its data item")?;
        ctx.record(EXIT_LABEL, item.value);

        if let Some(next_stage) = self.remaining.pop_front() {
            let remaining = std::mem::take(&mut self.remaining);
            let next = StageProcess::new(item, next_stage, remaining);
            let name = next.process_name();
            ctx.spawn(name, next)?;
        }
        Ok(Step::Done)
    }
}

impl Process for StageProcess {
    fn resume(&mut self, ctx: &mut Context<'_>, wakeup: Wakeup) -> anyhow::Result<Step> {
        match (self.phase, wakeup) {
            (StagePhase::Idle, Wakeup::Start) => {
                self.phase = StagePhase::Waiting;
                Ok(Step::Request(self.stage.resource))
            }
            (StagePhase::Waiting, Wakeup::Granted(resource)) if resource == self.stage.resource => {
                self.enter(ctx)
            }
            (StagePhase::Holding, Wakeup::Timeout) => self.exit(ctx),
            (phase, wakeup) => bail!("unexpected wakeup {wakeup:?} in phase {phase:?}"),
        }
    }
}

/// Spawns items at a fixed interval and starts each on the first stage.
pub struct Generator {
    items: u32,
    next_id: u32,
    interval: Delay,
    stages: VecDeque<Stage>,
}

impl Generator {
    /// Creates a generator of `items` items, `interval` apart.
    pub fn new(items: u32, interval: Delay, stages: VecDeque<Stage>) -> Self {
        Self {
            items,
            next_id: 0,
            interval,
            stages,
        }
    }
}

impl Process for Generator {
    fn resume(&mut self, ctx: &mut Context<'_>, _wakeup: Wakeup) -> anyhow::Result<Step> {
        if self.next_id >= self.items {
            return Ok(Step::Done);
        }

        let mut stages = self.stages.clone();
        let Some(first) = stages.pop_front() else {
            bail!("chain has no stages");
        };
        let item = DataItem::new(self.next_id);
        self.next_id += 1;

        let process = StageProcess::new(item, first, stages);
        let name = process.process_name();
        debug!(process = %name, time = %ctx.now(), "Generated item");
        ctx.spawn(name, process)?;

        if self.next_id >= self.items {
            return Ok(Step::Done);
        }
        Ok(Step::Timeout(self.interval))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hold_range_validation() {
        assert!(HoldRange::new(1.0, 5.0).is_ok());
        assert!(HoldRange::new(2.0, 2.0).is_ok());
        assert!(matches!(
            HoldRange::new(5.0, 1.0),
            Err(WorkloadError::InvalidHoldRange { .. })
        ));
        assert!(HoldRange::new(-1.0, 1.0).is_err());
        assert!(HoldRange::new(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_hold_range_sampling() {
        let range = HoldRange::new(2.0, 6.0).unwrap();
        let mut rng = DeterministicRng::from_seed(17);
        for _ in 0..100 {
            let hold = range.sample(&mut rng);
            assert!(hold >= range.min() && hold < range.max());
        }
    }

    #[test]
    fn test_stage_process_names() {
        let name = stage_process_name("item-4", "B");
        assert_eq!(name, "item-4/B");
        assert_eq!(parse_stage_process_name(&name), Some(("item-4", "B")));
        assert_eq!(parse_stage_process_name("generator"), None);
    }
}
