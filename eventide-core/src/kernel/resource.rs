//! Capacity-limited shared resources with FIFO waiting queues.

use std::collections::VecDeque;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::error::SimulationError;
use super::process::ProcessId;

/// Index of a resource within its environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(usize);

impl ResourceId {
    /// Creates a resource id from its raw index.
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Result of a resource request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// A slot was free and now belongs to the requester
    Granted,
    /// All slots busy; requester is queued at `position` (0 = head)
    Queued { position: usize },
}

/// Counters describing how a resource was used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceUsage {
    /// Total slots handed out
    pub grants: u64,
    /// Total slots returned
    pub releases: u64,
    /// Requests that had to wait
    pub queued_requests: u64,
    /// Highest simultaneous holder count
    pub peak_holders: usize,
    /// Longest waiting queue
    pub peak_waiting: usize,
}

/// Capacity-limited shared entity with fair queued access.
#[derive(Debug, Clone)]
pub struct Resource {
    id: ResourceId,
    name: String,
    capacity: usize,
    holders: Vec<ProcessId>,
    waiting: VecDeque<ProcessId>,
    usage: ResourceUsage,
}

impl Resource {
    /// Creates a resource.
    ///
    /// # Errors
    ///
    /// - `SimulationError::InvalidCapacity` - `capacity` is zero
    pub fn new(
        id: ResourceId,
        name: impl Into<String>,
        capacity: usize,
    ) -> Result<Self, SimulationError> {
        let name = name.into();
        if capacity < 1 {
            return Err(SimulationError::InvalidCapacity {
                resource: name,
                capacity,
            });
        }

        Ok(Self {
            id,
            name,
            capacity,
            holders: Vec::with_capacity(capacity),
            waiting: VecDeque::new(),
            usage: ResourceUsage::default(),
        })
    }

    /// Requests a slot for `process`.
    ///
    /// Grants immediately when a slot is free and nobody is waiting,
    /// otherwise appends to the waiting queue.
    pub fn request(&mut self, process: ProcessId) -> RequestOutcome {
        if self.holders.len() < self.capacity && self.waiting.is_empty() {
            self.grant(process);
            return RequestOutcome::Granted;
        }

        self.waiting.push_back(process);
        self.usage.queued_requests += 1;
        self.usage.peak_waiting = self.usage.peak_waiting.max(self.waiting.len());
        RequestOutcome::Queued {
            position: self.waiting.len() - 1,
        }
    }

    /// Returns one slot held by `process`.
    ///
    /// If the waiting queue is non-empty the freed slot goes to its head,
    /// whose id is returned.
    ///
    /// # Errors
    ///
    /// - `SimulationError::NotHolder` - `process` holds no slot of this resource
    pub fn release(&mut self, process: ProcessId) -> Result<Option<ProcessId>, SimulationError> {
        let Some(index) = self.holders.iter().position(|holder| *holder == process) else {
            return Err(SimulationError::NotHolder {
                resource: self.name.clone(),
                process,
            });
        };
        self.holders.remove(index);
        self.usage.releases += 1;

        let next = self.waiting.pop_front();
        if let Some(next) = next {
            self.grant(next);
        }
        Ok(next)
    }

    /// Removes `process` from the waiting queue. Returns whether it was queued.
    pub fn withdraw(&mut self, process: ProcessId) -> bool {
        let before = self.waiting.len();
        self.waiting.retain(|waiter| *waiter != process);
        before != self.waiting.len()
    }

    fn grant(&mut self, process: ProcessId) {
        self.holders.push(process);
        self.usage.grants += 1;
        self.usage.peak_holders = self.usage.peak_holders.max(self.holders.len());
    }

    /// Returns the resource id.
    pub fn id(&self) -> ResourceId {
        self.id
    }

    /// Returns the resource name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the fixed capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Returns the number of slots currently held.
    pub fn in_use(&self) -> usize {
        self.holders.len()
    }

    /// Returns the number of free slots.
    pub fn available(&self) -> usize {
        self.capacity - self.holders.len()
    }

    /// Returns current holders in grant order.
    pub fn holders(&self) -> &[ProcessId] {
        &self.holders
    }

    /// Returns waiting processes, head first.
    pub fn waiting(&self) -> impl Iterator<Item = ProcessId> + '_ {
        self.waiting.iter().copied()
    }

    /// Returns length of the waiting queue.
    pub fn waiting_len(&self) -> usize {
        self.waiting.len()
    }

    /// Checks whether `process` holds at least one slot.
    pub fn is_holder(&self, process: ProcessId) -> bool {
        self.holders.contains(&process)
    }

    /// Returns usage counters.
    pub fn usage(&self) -> &ResourceUsage {
        &self.usage
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(id: u64) -> ProcessId {
        ProcessId::new(id)
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let result = Resource::new(ResourceId::new(0), "desk", 0);
        assert!(matches!(
            result,
            Err(SimulationError::InvalidCapacity { capacity: 0, .. })
        ));
    }

    #[test]
    fn test_grants_until_capacity_then_queues() {
        let mut resource = Resource::new(ResourceId::new(0), "desk", 2).unwrap();

        assert_eq!(resource.request(pid(1)), RequestOutcome::Granted);
        assert_eq!(resource.request(pid(2)), RequestOutcome::Granted);
        assert_eq!(
            resource.request(pid(3)),
            RequestOutcome::Queued { position: 0 }
        );
        assert_eq!(
            resource.request(pid(4)),
            RequestOutcome::Queued { position: 1 }
        );

        assert_eq!(resource.in_use(), 2);
        assert_eq!(resource.available(), 0);
        assert_eq!(resource.waiting_len(), 2);
    }

    #[test]
    fn test_release_hands_slot_to_queue_head() {
        let mut resource = Resource::new(ResourceId::new(0), "desk", 1).unwrap();
        resource.request(pid(1));
        resource.request(pid(2));
        resource.request(pid(3));

        assert_eq!(resource.release(pid(1)).unwrap(), Some(pid(2)));
        assert_eq!(resource.holders(), &[pid(2)]);
        assert_eq!(resource.release(pid(2)).unwrap(), Some(pid(3)));
        assert_eq!(resource.release(pid(3)).unwrap(), None);
        assert_eq!(resource.in_use(), 0);

        let usage = resource.usage();
        assert_eq!(usage.grants, 3);
        assert_eq!(usage.releases, 3);
        assert_eq!(usage.queued_requests, 2);
        assert_eq!(usage.peak_holders, 1);
        assert_eq!(usage.peak_waiting, 2);
    }

    #[test]
    fn test_release_by_non_holder_fails() {
        let mut resource = Resource::new(ResourceId::new(0), "desk", 1).unwrap();
        resource.request(pid(1));

        let result = resource.release(pid(9));
        assert!(matches!(result, Err(SimulationError::NotHolder { .. })));
        assert!(resource.is_holder(pid(1)));
    }

    #[test]
    fn test_withdraw_preserves_queue_order() {
        let mut resource = Resource::new(ResourceId::new(0), "desk", 1).unwrap();
        resource.request(pid(1));
        resource.request(pid(2));
        resource.request(pid(3));
        resource.request(pid(4));

        assert!(resource.withdraw(pid(3)));
        assert!(!resource.withdraw(pid(3)));
        assert_eq!(resource.waiting().collect::<Vec<_>>(), vec![pid(2), pid(4)]);
    }

    #[test]
    fn test_new_request_does_not_jump_queue() {
        let mut resource = Resource::new(ResourceId::new(0), "desk", 1).unwrap();
        resource.request(pid(1));
        resource.request(pid(2));

        // Slot goes to p2 on release, so a fresh request still waits
        resource.release(pid(1)).unwrap();
        assert_eq!(
            resource.request(pid(3)),
            RequestOutcome::Queued { position: 0 }
        );
    }
}
