//! Reusable test processes.

use eventide_core::kernel::{Context, Process, ResourceId, Step, Wakeup};

#[derive(Debug, Clone, Copy)]
enum Phase {
    Arriving,
    Waiting,
    Holding,
}

/// Arrives after `arrival`, holds one slot of `resource` for `hold`, then leaves.
pub struct FixedHold {
    resource: ResourceId,
    arrival: f64,
    hold: f64,
    phase: Phase,
}

impl FixedHold {
    pub fn new(resource: ResourceId, hold: f64) -> Self {
        Self::arriving_after(resource, 0.0, hold)
    }

    pub fn arriving_after(resource: ResourceId, arrival: f64, hold: f64) -> Self {
        Self {
            resource,
            arrival,
            hold,
            phase: Phase::Arriving,
        }
    }
}

impl Process for FixedHold {
    fn resume(&mut self, ctx: &mut Context<'_>, wakeup: Wakeup) -> anyhow::Result<Step> {
        match self.phase {
            Phase::Arriving if wakeup == Wakeup::Start && self.arrival > 0.0 => {
                Ok(Step::timeout(self.arrival)?)
            }
            Phase::Arriving => {
                self.phase = Phase::Waiting;
                Ok(Step::Request(self.resource))
            }
            Phase::Waiting => {
                self.phase = Phase::Holding;
                ctx.record("HOLD", 1);
                Ok(Step::timeout(self.hold)?)
            }
            Phase::Holding => {
                ctx.release(self.resource)?;
                Ok(Step::Done)
            }
        }
    }
}
