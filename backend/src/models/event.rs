//! Event logging for scheduling replay and auditing.
//!
//! This module defines the Event enum which captures every significant state
//! change of the logistics engine. Events enable:
//! - Debugging (understand why a courier did or did not move)
//! - Auditing (verify that stock left and arrived where expected)
//! - Test assertions without scraping log output
//!
//! # Event Types
//!
//! Events are categorized by cycle phase:
//! - **Demand**: request submitted or requeued
//! - **Solve**: background solve started, finished, or failed
//! - **Commit**: instruction committed to a courier or dropped as stale
//! - **Execution**: courier transitions, pickups, deposits
//! - **Outcome**: instruction completed or failed
//!
//! # Example
//!
//! ```rust
//! use courier_logistics_core::models::event::{Event, EventLog};
//!
//! let mut log = EventLog::new();
//! log.log(Event::SolveStarted {
//!     tick: 3,
//!     requests: 2,
//!     couriers: 1,
//! });
//! assert_eq!(log.events_of_type("SolveStarted").len(), 1);
//! ```

use crate::models::courier::CourierState;
use crate::models::instruction::InstructionId;
use crate::models::location::{AgentId, WarehouseLocation};
use crate::models::request::RequestId;
use std::collections::VecDeque;
use std::fmt;

/// Why a solver instruction was rejected at commit time
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropReason {
    /// Source no longer holds the planned quantity
    SourceDepleted { available: u32, required: u32 },
    /// Assigned courier no longer exists
    CourierMissing,
    /// Assigned courier is no longer idle
    CourierBusy,
}

impl fmt::Display for DropReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DropReason::SourceDepleted {
                available,
                required,
            } => write!(f, "source depleted ({available} < {required})"),
            DropReason::CourierMissing => f.write_str("courier missing"),
            DropReason::CourierBusy => f.write_str("courier busy"),
        }
    }
}

/// Why an active instruction failed during execution
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    SourceInaccessible,
    InsufficientStock,
    DestinationInaccessible,
    DestinationFull,
    StateTimeout,
    /// Courier left the world or dropped the instruction while it was active
    CourierLost,
    /// Failure reported by a caller outside the engine
    External(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureReason::SourceInaccessible => f.write_str("source inaccessible"),
            FailureReason::InsufficientStock => f.write_str("insufficient stock"),
            FailureReason::DestinationInaccessible => f.write_str("destination inaccessible"),
            FailureReason::DestinationFull => f.write_str("destination full"),
            FailureReason::StateTimeout => f.write_str("state timeout"),
            FailureReason::CourierLost => f.write_str("courier lost"),
            FailureReason::External(reason) => f.write_str(reason),
        }
    }
}

/// Logistics event capturing a state change.
///
/// All events include a tick number for temporal ordering.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// New request entered the demand queue
    RequestSubmitted {
        tick: usize,
        request_id: RequestId,
        item_id: String,
        quantity: u32,
    },

    /// Unserved or dropped demand was put back into the queue
    RequestRequeued {
        tick: usize,
        request_id: RequestId,
        quantity: u32,
    },

    /// Snapshot taken and handed to the solver
    SolveStarted {
        tick: usize,
        requests: usize,
        couriers: usize,
    },

    /// Solver output reached the commit phase
    SolveCompleted {
        tick: usize,
        instructions: usize,
        duration_micros: u64,
    },

    /// Solver failed; no instructions this cycle
    SolveFailed { tick: usize, reason: String },

    /// Instruction passed revalidation and was assigned
    InstructionCommitted {
        tick: usize,
        instruction_id: InstructionId,
        agent_id: AgentId,
        quantity: u32,
    },

    /// Instruction failed revalidation and was discarded
    InstructionDropped {
        tick: usize,
        instruction_id: InstructionId,
        agent_id: AgentId,
        reason: DropReason,
    },

    /// Courier moved between delivery phases
    CourierTransition {
        tick: usize,
        agent_id: AgentId,
        from: CourierState,
        to: CourierState,
    },

    /// Items taken out of the source warehouse
    PickedUp {
        tick: usize,
        agent_id: AgentId,
        source: WarehouseLocation,
        item_id: String,
        quantity: u32,
    },

    /// Items put into the destination warehouse
    Deposited {
        tick: usize,
        agent_id: AgentId,
        destination: WarehouseLocation,
        item_id: String,
        quantity: u32,
    },

    InstructionCompleted {
        tick: usize,
        instruction_id: InstructionId,
        agent_id: AgentId,
    },

    InstructionFailed {
        tick: usize,
        instruction_id: InstructionId,
        agent_id: AgentId,
        reason: FailureReason,
    },
}

impl Event {
    /// Get the tick number when this event occurred
    pub fn tick(&self) -> usize {
        match self {
            Event::RequestSubmitted { tick, .. } => *tick,
            Event::RequestRequeued { tick, .. } => *tick,
            Event::SolveStarted { tick, .. } => *tick,
            Event::SolveCompleted { tick, .. } => *tick,
            Event::SolveFailed { tick, .. } => *tick,
            Event::InstructionCommitted { tick, .. } => *tick,
            Event::InstructionDropped { tick, .. } => *tick,
            Event::CourierTransition { tick, .. } => *tick,
            Event::PickedUp { tick, .. } => *tick,
            Event::Deposited { tick, .. } => *tick,
            Event::InstructionCompleted { tick, .. } => *tick,
            Event::InstructionFailed { tick, .. } => *tick,
        }
    }

    /// Get a short description of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::RequestSubmitted { .. } => "RequestSubmitted",
            Event::RequestRequeued { .. } => "RequestRequeued",
            Event::SolveStarted { .. } => "SolveStarted",
            Event::SolveCompleted { .. } => "SolveCompleted",
            Event::SolveFailed { .. } => "SolveFailed",
            Event::InstructionCommitted { .. } => "InstructionCommitted",
            Event::InstructionDropped { .. } => "InstructionDropped",
            Event::CourierTransition { .. } => "CourierTransition",
            Event::PickedUp { .. } => "PickedUp",
            Event::Deposited { .. } => "Deposited",
            Event::InstructionCompleted { .. } => "InstructionCompleted",
            Event::InstructionFailed { .. } => "InstructionFailed",
        }
    }

    /// Get instruction ID if event relates to a specific instruction
    pub fn instruction_id(&self) -> Option<InstructionId> {
        match self {
            Event::InstructionCommitted { instruction_id, .. } => Some(*instruction_id),
            Event::InstructionDropped { instruction_id, .. } => Some(*instruction_id),
            Event::InstructionCompleted { instruction_id, .. } => Some(*instruction_id),
            Event::InstructionFailed { instruction_id, .. } => Some(*instruction_id),
            _ => None,
        }
    }

    /// Get courier ID if event relates to a specific courier
    pub fn agent_id(&self) -> Option<AgentId> {
        match self {
            Event::InstructionCommitted { agent_id, .. } => Some(*agent_id),
            Event::InstructionDropped { agent_id, .. } => Some(*agent_id),
            Event::CourierTransition { agent_id, .. } => Some(*agent_id),
            Event::PickedUp { agent_id, .. } => Some(*agent_id),
            Event::Deposited { agent_id, .. } => Some(*agent_id),
            Event::InstructionCompleted { agent_id, .. } => Some(*agent_id),
            Event::InstructionFailed { agent_id, .. } => Some(*agent_id),
            _ => None,
        }
    }
}

/// Event log for storing and querying logistics events.
///
/// Bounded: once `capacity` events are held, the oldest are discarded.
#[derive(Debug, Clone)]
pub struct EventLog {
    events: VecDeque<Event>,
    capacity: usize,
}

impl EventLog {
    /// Default number of retained events
    pub const DEFAULT_CAPACITY: usize = 100_000;

    /// Create a new empty event log
    pub fn new() -> Self {
        Self::with_capacity(Self::DEFAULT_CAPACITY)
    }

    /// Create a log retaining at most `capacity` events
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            events: VecDeque::new(),
            capacity: capacity.max(1),
        }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        if self.events.len() == self.capacity {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Iterate over retained events, oldest first
    pub fn events(&self) -> impl Iterator<Item = &Event> {
        self.events.iter()
    }

    /// Get events for a specific tick
    pub fn events_at_tick(&self, tick: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.tick() == tick).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events for a specific instruction
    pub fn events_for_instruction(&self, instruction_id: InstructionId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.instruction_id() == Some(instruction_id))
            .collect()
    }

    /// Get events for a specific courier
    pub fn events_for_agent(&self, agent_id: AgentId) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.agent_id() == Some(agent_id))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}
