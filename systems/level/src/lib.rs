#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Level progression state machine and the signal bus that announces level
//! loads and resets to interested systems.

mod bus;

use ledge_runner_core::{Command, Event, LevelIndex, LevelSignal};
use tracing::{info, warn};

pub use bus::{LevelBus, Subscription};

/// Progression phase of the run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    /// The level is being played.
    #[default]
    Playing,
    /// A non-final exit was reached and the player is asked to advance.
    AdvancePrompt,
    /// The player died.
    GameOver,
    /// The final level was finished.
    Completed,
}

impl Phase {
    /// Whether simulation time is frozen in this phase.
    #[must_use]
    pub const fn is_paused(self) -> bool {
        !matches!(self, Self::Playing)
    }
}

/// Tracks the active level, the number of levels survived, and the current
/// phase, publishing level signals whenever a level is (re)loaded.
#[derive(Debug)]
pub struct LevelLifecycle {
    bus: LevelBus,
    level_count: u32,
    current: LevelIndex,
    survived: u32,
    phase: Phase,
}

impl LevelLifecycle {
    /// Creates a lifecycle for a run over `level_count` levels.
    ///
    /// Nothing is loaded until [`LevelLifecycle::load_level`] is called.
    #[must_use]
    pub fn new(level_count: usize) -> Self {
        Self {
            bus: LevelBus::default(),
            level_count: u32::try_from(level_count).unwrap_or(u32::MAX),
            current: LevelIndex::new(0),
            survived: 0,
            phase: Phase::Playing,
        }
    }

    /// Registers a new subscriber for level signals.
    #[must_use]
    pub fn subscribe(&self) -> Subscription {
        self.bus.subscribe()
    }

    /// Bus carrying the lifecycle's signals.
    #[must_use]
    pub fn bus(&self) -> &LevelBus {
        &self.bus
    }

    /// Current progression phase.
    #[must_use]
    pub const fn phase(&self) -> Phase {
        self.phase
    }

    /// Index of the most recently loaded level.
    #[must_use]
    pub const fn current_level(&self) -> LevelIndex {
        self.current
    }

    /// Number of levels completed since the run started.
    #[must_use]
    pub const fn survived_levels(&self) -> u32 {
        self.survived
    }

    /// Number of levels in the run.
    #[must_use]
    pub const fn level_count(&self) -> u32 {
        self.level_count
    }

    /// Activates `index`, clamped to the available levels, and publishes
    /// [`LevelSignal::LevelChanged`] followed by [`LevelSignal::Reset`].
    pub fn load_level(&mut self, index: u32, count_survived: bool, out: &mut Vec<Command>) {
        if self.level_count == 0 {
            warn!("no levels to load");
            return;
        }

        let level = LevelIndex::new(index.min(self.level_count - 1));
        self.current = level;
        self.phase = Phase::Playing;
        out.push(Command::ActivateLevel { level });
        out.push(Command::ResetPlayer);

        self.bus.publish(LevelSignal::LevelChanged);
        self.bus.publish(LevelSignal::Reset);

        if count_survived {
            self.survived = self.survived.saturating_add(1);
        }
        info!(
            level = level.get(),
            survived = self.survived,
            "level loaded"
        );
    }

    /// Loads the level after the current one, counting the current one as
    /// survived. Past the last level the run is completed instead.
    pub fn load_next_level(&mut self, out: &mut Vec<Command>) {
        if self.level_count == 0 {
            return;
        }

        let next = self.current.get().saturating_add(1);
        if next >= self.level_count {
            self.phase = Phase::Completed;
            info!(survived = self.survived, "run completed");
            return;
        }
        self.load_level(next, true, out);
    }

    /// Reloads the current level without counting it and signals an extra reset.
    pub fn reset_game(&mut self, out: &mut Vec<Command>) {
        self.load_level(self.current.get(), false, out);
        self.bus.publish(LevelSignal::Reset);
    }

    /// Clears progress and reloads the first level.
    pub fn reset_to_first_level(&mut self, out: &mut Vec<Command>) {
        self.survived = 0;
        self.load_level(0, false, out);
        self.bus.publish(LevelSignal::Reset);
    }

    /// Answers the advance prompt positively. Ignored in any other phase.
    pub fn accept_advance(&mut self, out: &mut Vec<Command>) {
        if self.phase == Phase::AdvancePrompt {
            self.load_next_level(out);
        }
    }

    /// Reacts to player death and exit events from the world.
    pub fn handle(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::PlayerDied if self.phase == Phase::Playing => {
                    self.phase = Phase::GameOver;
                    info!(survived = self.survived, "{}", self.survived_message());
                }
                Event::ExitReached { final_level, .. } if self.phase == Phase::Playing => {
                    self.phase = if *final_level {
                        Phase::Completed
                    } else {
                        Phase::AdvancePrompt
                    };
                }
                _ => {}
            }
        }
    }

    /// Summary shown on the game-over screen.
    #[must_use]
    pub fn survived_message(&self) -> String {
        let plural = if self.survived == 1 { "" } else { "S" };
        format!("YOU SURVIVED {} LEVEL{plural}", self.survived)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn survived_message_pluralises() {
        let mut lifecycle = LevelLifecycle::new(3);
        assert_eq!(lifecycle.survived_message(), "YOU SURVIVED 0 LEVELS");
        lifecycle.survived = 1;
        assert_eq!(lifecycle.survived_message(), "YOU SURVIVED 1 LEVEL");
        lifecycle.survived = 2;
        assert_eq!(lifecycle.survived_message(), "YOU SURVIVED 2 LEVELS");
    }

    #[test]
    fn only_playing_phase_runs_time() {
        assert!(!Phase::Playing.is_paused());
        assert!(Phase::AdvancePrompt.is_paused());
        assert!(Phase::GameOver.is_paused());
        assert!(Phase::Completed.is_paused());
    }

    #[test]
    fn empty_run_loads_nothing() {
        let mut lifecycle = LevelLifecycle::new(0);
        let subscription = lifecycle.subscribe();
        let mut commands = Vec::new();
        lifecycle.load_level(0, true, &mut commands);
        lifecycle.load_next_level(&mut commands);
        assert!(commands.is_empty());
        assert!(subscription.drain().is_empty());
        assert_eq!(lifecycle.survived_levels(), 0);
    }
}
