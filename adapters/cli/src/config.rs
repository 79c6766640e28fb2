//! Game configuration loaded from TOML.

use std::{fs, path::Path};

use anyhow::{bail, Context, Result};
use ledge_runner_system_chase::Config as ChaseConfig;
use ledge_runner_system_player::Tuning as PlayerTuning;
use ledge_runner_system_spawning::Config as SpawningConfig;
use ledge_runner_world::{LevelLayout, WorldConfig};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Every tunable of a run. Missing sections and keys fall back to the stock game.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct GameConfig {
    pub(crate) spawning: SpawningConfig,
    pub(crate) chase: ChaseConfig,
    pub(crate) world: WorldConfig,
    pub(crate) player: PlayerTuning,
    pub(crate) levels: Vec<LevelConfig>,
}

/// A level as ASCII rows, top line first.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct LevelConfig {
    pub(crate) name: String,
    pub(crate) rows: Vec<String>,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            spawning: SpawningConfig::default(),
            chase: ChaseConfig::default(),
            world: WorldConfig::default(),
            player: PlayerTuning::default(),
            levels: stock_levels(),
        }
    }
}

impl GameConfig {
    /// Reads the configuration at `path`. An absent file yields the defaults.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            info!(path = %path.display(), "no config file, using stock game");
            return Ok(Self::default());
        }
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config {}", path.display()))?;
        Self::parse(&contents).with_context(|| format!("invalid config {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config toml contents")
    }

    /// Parses every configured level.
    pub(crate) fn layouts(&self) -> Result<Vec<LevelLayout>> {
        if self.levels.is_empty() {
            bail!("config declares no levels");
        }
        self.levels
            .iter()
            .map(|level| {
                LevelLayout::parse(&level.name, &level.rows)
                    .with_context(|| format!("failed to parse level `{}`", level.name))
            })
            .collect()
    }
}

fn stock_levels() -> Vec<LevelConfig> {
    let level = |name: &str, rows: &[&str]| LevelConfig {
        name: name.to_owned(),
        rows: rows.iter().map(|row| (*row).to_owned()).collect(),
    };
    vec![
        level(
            "first steps",
            &[
                "..................................",
                "....................###...........",
                "............###...................",
                "P.................^^...........E..",
                "######...#########################",
            ],
        ),
        level(
            "ledges",
            &[
                "........................###.........",
                "...............###..................",
                "........###.....................#...",
                "P...............................#.E.",
                "##########....######~~~~######..#####",
                "..........~~~~......................",
            ],
        ),
        level(
            "the pit",
            &[
                "..............................E",
                "..........................#####",
                "....................###........",
                "P............###...............",
                "######..^^..........~~~~~~~~~~~",
                "......##..##~~~~~~~~...........",
            ],
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stock_levels_parse() {
        let layouts = GameConfig::default().layouts().expect("stock levels are valid");
        assert_eq!(layouts.len(), 3);
        assert!(layouts.iter().all(|layout| layout.exit().is_some()));
    }

    #[test]
    fn empty_file_is_the_stock_game() {
        assert_eq!(GameConfig::parse("").expect("empty config"), GameConfig::default());
    }

    #[test]
    fn sections_override_individual_keys() {
        let config = GameConfig::parse(
            r####"
            [spawning]
            capacity = 9

            [chase]
            chase_speed = 3.5

            [world.player]
            max_health = 5

            [player]
            max_jumps = 3

            [[levels]]
            name = "tiny"
            rows = ["P.E", "###"]
            "####,
        )
        .expect("valid config");

        assert_eq!(config.spawning.capacity, 9);
        assert_eq!(config.spawning.spawn_interval_seconds, 0.5);
        assert_eq!(config.chase.chase_speed, 3.5);
        assert_eq!(config.world.player.max_health, 5);
        assert_eq!(config.player.max_jumps, 3);
        assert_eq!(config.levels.len(), 1);
        assert_eq!(config.layouts().expect("valid level").len(), 1);
    }

    #[test]
    fn broken_levels_are_reported() {
        let config = GameConfig::parse(
            r####"
            [[levels]]
            name = "broken"
            rows = ["..?", "###"]
            "####,
        )
        .expect("valid toml");
        let error = config.layouts().expect_err("unknown tile");
        assert!(format!("{error:#}").contains("broken"));

        let empty = GameConfig::parse("levels = []").expect("valid toml");
        assert!(empty.layouts().is_err());
    }

    #[test]
    fn absent_file_falls_back_to_defaults() {
        let path = std::env::temp_dir().join("ledge-runner-missing-config.toml");
        let _ = fs::remove_file(&path);
        assert_eq!(GameConfig::load(&path).expect("defaults"), GameConfig::default());
    }
}
