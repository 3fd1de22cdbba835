//! Invariant checking framework for simulation validation.

use std::fmt;

use super::clock::SimTime;
use super::environment::Kernel;

/// Violation of a simulation invariant.
#[derive(Debug, Clone)]
pub struct InvariantViolation {
    /// Name of the violated invariant
    pub invariant: String,
    /// Detailed description of the violation
    pub description: String,
    /// Simulation time when the violation was detected
    pub timestamp: SimTime,
}

impl fmt::Display for InvariantViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Invariant '{}' violated at {}: {}",
            self.invariant, self.timestamp, self.description
        )
    }
}

/// Trait for checking simulation invariants.
///
/// Checked after every dispatched event.
pub trait Invariant: Send + Sync {
    /// Checks if invariant holds for current kernel state.
    ///
    /// # Errors
    /// Returns `InvariantViolation` if the invariant condition is not met.
    fn check(&self, kernel: &Kernel) -> Result<(), InvariantViolation>;

    /// Returns name of this invariant.
    fn name(&self) -> &str;
}

/// Ensures no resource has more holders than its capacity.
pub struct CapacityInvariant;

impl Invariant for CapacityInvariant {
    fn check(&self, kernel: &Kernel) -> Result<(), InvariantViolation> {
        for resource in kernel.resources() {
            if resource.in_use() > resource.capacity() {
                return Err(InvariantViolation {
                    invariant: self.name().to_string(),
                    description: format!(
                        "resource '{}' has {} holders, capacity {}",
                        resource.name(),
                        resource.in_use(),
                        resource.capacity()
                    ),
                    timestamp: kernel.now(),
                });
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Capacity"
    }
}

/// Ensures nobody waits on a resource that has a free slot.
pub struct WorkConservingInvariant;

impl Invariant for WorkConservingInvariant {
    fn check(&self, kernel: &Kernel) -> Result<(), InvariantViolation> {
        for resource in kernel.resources() {
            if resource.available() > 0 && resource.waiting_len() > 0 {
                return Err(InvariantViolation {
                    invariant: self.name().to_string(),
                    description: format!(
                        "resource '{}' has {} free slots while {} processes wait",
                        resource.name(),
                        resource.available(),
                        resource.waiting_len()
                    ),
                    timestamp: kernel.now(),
                });
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "WorkConserving"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimulationConfig;
    use crate::kernel::{Environment, Step, from_fn};

    #[test]
    fn test_builtin_invariants_hold_under_contention() {
        let mut env = Environment::new(SimulationConfig::seeded(1)).unwrap();
        let desk = env.add_resource("desk", 1).unwrap();

        for _ in 0..3 {
            let mut holding = false;
            env.spawn(
                "worker",
                from_fn(move |ctx, _| {
                    if holding {
                        ctx.release(desk)?;
                        return Ok(Step::Done);
                    }
                    if ctx.resource(desk).is_some_and(|r| r.is_holder(ctx.process_id())) {
                        holding = true;
                        return Ok(Step::timeout(1.0)?);
                    }
                    Ok(Step::Request(desk))
                }),
            )
            .unwrap();
        }

        assert!(CapacityInvariant.check(env.kernel()).is_ok());
        let report = env.run().unwrap();
        assert!(report.metrics.invariant_violations.is_empty());
        assert!(WorkConservingInvariant.check(env.kernel()).is_ok());
    }

    #[test]
    fn test_violation_display() {
        let violation = InvariantViolation {
            invariant: "Capacity".to_string(),
            description: "too many holders".to_string(),
            timestamp: SimTime::new(2.0).unwrap(),
        };
        assert_eq!(
            violation.to_string(),
            "Invariant 'Capacity' violated at 2.000: too many holders"
        );
    }
}
