//! The persisted ability preference.

use std::{fs, path::Path};

use anyhow::{Context, Result};
use ledge_runner_core::Ability;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct Preferences {
    pub(crate) ability: i64,
}

impl Preferences {
    /// Reads the preference file. A missing file or key means no ability.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            debug!(path = %path.display(), "no preference file");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read preferences {}", path.display()))?;
        toml::from_str(&contents)
            .with_context(|| format!("failed to parse preferences {}", path.display()))
    }

    pub(crate) fn save(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string(self).context("failed to encode preferences")?;
        fs::write(path, contents)
            .with_context(|| format!("failed to write preferences {}", path.display()))
    }

    pub(crate) const fn ability(&self) -> Ability {
        Ability::from_index(self.ability)
    }
}
