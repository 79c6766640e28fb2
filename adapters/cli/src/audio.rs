//! Sound effect playback owned by the composition root.

use ledge_runner_system_combat::Cue;
use tracing::debug;

/// Plays sound effects requested by the simulation.
pub(crate) trait AudioService {
    fn play(&mut self, cue: Cue);
}

/// Headless audio that logs each cue.
#[derive(Debug, Default)]
pub(crate) struct LoggingAudio {
    played: u64,
}

impl LoggingAudio {
    pub(crate) const fn played(&self) -> u64 {
        self.played
    }
}

impl AudioService for LoggingAudio {
    fn play(&mut self, cue: Cue) {
        self.played += 1;
        debug!(cue = cue.name(), "sound effect");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_played_cues() {
        let mut audio = LoggingAudio::default();
        audio.play(Cue::Bullet);
        audio.play(Cue::BounceTrap);
        assert_eq!(audio.played(), 2);
    }
}
