//! Agent bodies and the generation-tagged arena that owns them.

use std::time::Duration;

use glam::Vec2;
use ledge_runner_core::{AgentId, AgentSnapshot, DeathCause, Health};

use crate::physics::Body;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AgentState {
    Alive,
    Dead { cause: DeathCause, tick: u64 },
}

/// Outcome of applying damage to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum DamageOutcome {
    Ignored,
    Survived { remaining: i32 },
    Died,
}

#[derive(Clone, Debug)]
pub(crate) struct Agent {
    pub(crate) id: AgentId,
    pub(crate) body: Body,
    pub(crate) health: Health,
    pub(crate) state: AgentState,
    pub(crate) grounded: bool,
    pub(crate) pending_jump: Option<Vec2>,
    pub(crate) flash: Duration,
    pub(crate) touching_trap: bool,
    pub(crate) touching_player: bool,
}

impl Agent {
    pub(crate) fn new(id: AgentId, body: Body, max_health: i32) -> Self {
        Self {
            id,
            body,
            health: Health::full(max_health),
            state: AgentState::Alive,
            grounded: false,
            pending_jump: None,
            flash: Duration::ZERO,
            touching_trap: false,
            touching_player: false,
        }
    }

    pub(crate) fn is_alive(&self) -> bool {
        self.state == AgentState::Alive
    }

    /// Applies damage; dead agents ignore further hits.
    pub(crate) fn damage(&mut self, amount: i32, flash: Duration, tick: u64) -> DamageOutcome {
        if !self.is_alive() {
            return DamageOutcome::Ignored;
        }

        let remaining = self.health.take(amount);
        self.flash = flash;
        if self.health.is_depleted() {
            self.state = AgentState::Dead {
                cause: DeathCause::Combat,
                tick,
            };
            DamageOutcome::Died
        } else {
            DamageOutcome::Survived { remaining }
        }
    }

    /// Transitions into the dead state. Returns `false` when already dead.
    pub(crate) fn kill(&mut self, cause: DeathCause, tick: u64) -> bool {
        if !self.is_alive() {
            return false;
        }
        self.state = AgentState::Dead { cause, tick };
        self.pending_jump = None;
        true
    }

    /// Reports whether the agent died before the provided tick.
    pub(crate) fn died_before(&self, tick: u64) -> bool {
        matches!(self.state, AgentState::Dead { tick: died, .. } if died < tick)
    }

    pub(crate) fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            position: self.body.position,
            velocity: self.body.velocity,
            grounded: self.grounded,
            pending_jump: self.pending_jump.is_some(),
            health: self.health,
            flashing: !self.flash.is_zero(),
            alive: self.is_alive(),
        }
    }
}

#[derive(Clone, Debug, Default)]
struct Slot {
    generation: u32,
    agent: Option<Agent>,
}

/// Slot storage where removal invalidates the handle by bumping the slot's
/// generation.
#[derive(Clone, Debug, Default)]
pub(crate) struct AgentArena {
    slots: Vec<Slot>,
    free: Vec<u32>,
}

impl AgentArena {
    pub(crate) fn insert(&mut self, build: impl FnOnce(AgentId) -> Agent) -> AgentId {
        let index = match self.free.pop() {
            Some(index) => index,
            None => {
                self.slots.push(Slot::default());
                (self.slots.len() - 1) as u32
            }
        };
        let slot = &mut self.slots[index as usize];
        let id = AgentId::new(index, slot.generation);
        slot.agent = Some(build(id));
        id
    }

    pub(crate) fn get(&self, id: AgentId) -> Option<&Agent> {
        self.slots
            .get(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.agent.as_ref())
    }

    pub(crate) fn get_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        self.slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())
            .and_then(|slot| slot.agent.as_mut())
    }

    /// Removes the agent behind a valid handle. Stale handles are ignored.
    pub(crate) fn remove(&mut self, id: AgentId) -> Option<Agent> {
        let slot = self
            .slots
            .get_mut(id.index() as usize)
            .filter(|slot| slot.generation == id.generation())?;
        let agent = slot.agent.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(id.index());
        Some(agent)
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = &Agent> {
        self.slots.iter().filter_map(|slot| slot.agent.as_ref())
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Agent> {
        self.slots.iter_mut().filter_map(|slot| slot.agent.as_mut())
    }

    pub(crate) fn ids(&self) -> Vec<AgentId> {
        self.iter().map(|agent| agent.id).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.iter().count()
    }
}
