//! Active instruction table
//!
//! In-flight work keyed by instruction id, with a secondary index by agent.
//!
//! # Critical Invariants
//!
//! 1. **At most one active instruction per agent**: `insert` refuses a second
//!    instruction for an agent that already has one
//! 2. **Indexes agree**: every removal clears both maps

use crate::models::instruction::{InstructionId, TransportInstruction};
use crate::models::location::AgentId;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default)]
pub struct InstructionLedger {
    active: BTreeMap<InstructionId, TransportInstruction>,
    by_agent: BTreeMap<AgentId, InstructionId>,
}

impl InstructionLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an instruction as active
    ///
    /// Returns the instruction back if its agent (or its id) is already taken.
    pub fn insert(&mut self, instruction: TransportInstruction) -> Result<(), TransportInstruction> {
        if self.by_agent.contains_key(&instruction.agent_id())
            || self.active.contains_key(&instruction.id())
        {
            return Err(instruction);
        }

        self.by_agent.insert(instruction.agent_id(), instruction.id());
        self.active.insert(instruction.id(), instruction);
        Ok(())
    }

    pub fn get(&self, id: InstructionId) -> Option<&TransportInstruction> {
        self.active.get(&id)
    }

    pub fn remove(&mut self, id: InstructionId) -> Option<TransportInstruction> {
        let instruction = self.active.remove(&id)?;
        self.by_agent.remove(&instruction.agent_id());
        Some(instruction)
    }

    pub fn for_agent(&self, agent_id: AgentId) -> Option<&TransportInstruction> {
        self.by_agent
            .get(&agent_id)
            .and_then(|id| self.active.get(id))
    }

    pub fn has_agent(&self, agent_id: AgentId) -> bool {
        self.by_agent.contains_key(&agent_id)
    }

    pub fn len(&self) -> usize {
        self.active.len()
    }

    pub fn is_empty(&self) -> bool {
        self.active.is_empty()
    }

    /// Active instructions in id order
    pub fn iter(&self) -> impl Iterator<Item = &TransportInstruction> {
        self.active.values()
    }
}
