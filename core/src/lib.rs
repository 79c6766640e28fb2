#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Ledge Runner engine.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Systems submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to. Systems consume event streams, query immutable snapshots and the
//! [`GroundSensor`], and respond exclusively with new command batches.

use std::time::Duration;

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Ledge Runner.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the variable-rate logic clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Advances the fixed-rate physics integrator by a single step.
    PhysicsStep {
        /// Fixed duration integrated by the step.
        dt: Duration,
    },
    /// Activates the level with the provided index, replacing the tile map.
    ActivateLevel {
        /// Level that should become active.
        level: LevelIndex,
    },
    /// Requests that a new agent be placed at the provided spawn position.
    SpawnAgent {
        /// Feet position of the agent, usually a precomputed spawn point.
        position: Vec2,
    },
    /// Requests that an agent be removed from the world by handle.
    DespawnAgent {
        /// Handle of the agent targeted for removal.
        agent: AgentId,
    },
    /// Sets an agent's horizontal velocity while preserving its vertical motion.
    SteerAgent {
        /// Handle of the steered agent.
        agent: AgentId,
        /// Horizontal velocity in world units per second.
        velocity_x: f32,
    },
    /// Latches a jump that the next grounded physics step will execute.
    RequestJump {
        /// Handle of the jumping agent.
        agent: AgentId,
        /// Position the jump should be biased toward.
        toward: Vec2,
    },
    /// Applies damage to an agent.
    DamageAgent {
        /// Handle of the damaged agent.
        agent: AgentId,
        /// Amount of health removed.
        amount: i32,
    },
    /// Kills an agent regardless of its remaining health.
    KillAgent {
        /// Handle of the killed agent.
        agent: AgentId,
    },
    /// Replaces the player's velocity and gravity configuration.
    DrivePlayer {
        /// New velocity of the player body.
        velocity: Vec2,
        /// Gravity multiplier applied during subsequent physics steps.
        gravity_scale: f32,
        /// Direction the player faces.
        facing: Facing,
    },
    /// Applies damage to the player.
    DamagePlayer {
        /// Amount of health removed.
        amount: i32,
    },
    /// Restores the player's health and clears the dead flag.
    ResetPlayer,
    /// Launches a projectile from the player's position.
    FireProjectile {
        /// Direction of travel. Normalised by the world.
        direction: Vec2,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the logic clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that a level became active.
    LevelActivated {
        /// Index of the activated level.
        level: LevelIndex,
        /// Whether the activated level is the last one.
        final_level: bool,
    },
    /// Confirms that an agent entered the world.
    AgentSpawned {
        /// Handle allocated to the agent.
        agent: AgentId,
        /// Centre of the agent after overlap correction.
        position: Vec2,
        /// Number of upward nudges applied while resolving ground overlap.
        nudges: u32,
    },
    /// Reports that a spawn request could not be honoured.
    AgentSpawnRejected {
        /// Position supplied with the rejected request.
        position: Vec2,
    },
    /// Confirms that a latched agent jump was executed.
    AgentJumped {
        /// Handle of the jumping agent.
        agent: AgentId,
    },
    /// Reports that an agent lost health and survived.
    AgentDamaged {
        /// Handle of the damaged agent.
        agent: AgentId,
        /// Health remaining after the hit.
        remaining: i32,
    },
    /// Reports the single transition of an agent into the dead state.
    AgentDied {
        /// Handle of the dead agent.
        agent: AgentId,
        /// Trigger responsible for the death.
        cause: DeathCause,
    },
    /// Confirms that an agent handle was invalidated.
    AgentRemoved {
        /// Handle that is no longer valid.
        agent: AgentId,
    },
    /// Reports that the player lost health.
    PlayerDamaged {
        /// Health remaining after the hit.
        remaining: i32,
    },
    /// Reports that the player's health was depleted.
    PlayerDied,
    /// Reports that the player started touching a live agent.
    PlayerContact {
        /// Handle of the touched agent.
        agent: AgentId,
        /// Damage the agent deals on contact.
        damage: i32,
    },
    /// Reports that the player started touching a trap.
    PlayerTrapped {
        /// Damage the trap deals.
        damage: i32,
    },
    /// Reports that the player touched the level exit.
    ExitReached {
        /// Level whose exit was reached.
        level: LevelIndex,
        /// Whether the level is the last one.
        final_level: bool,
    },
    /// Confirms that a projectile was launched.
    ProjectileFired,
    /// Reports that a projectile struck an agent.
    ProjectileHit {
        /// Handle of the struck agent.
        agent: AgentId,
    },
}

/// Trigger responsible for an agent's death.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DeathCause {
    /// Health was depleted by damage.
    Combat,
    /// The agent was killed outright after attacking the player.
    Forced,
    /// The agent touched the instant-death hazard layer.
    Hazard,
    /// The agent fell below the death height.
    Fall,
}

/// Generation-tagged handle identifying an agent slot.
///
/// A handle stays valid until its slot is freed; reusing the slot bumps the
/// generation so stale handles never alias a newer agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId {
    index: u32,
    generation: u32,
}

impl AgentId {
    /// Creates a handle for the provided slot index and generation.
    #[must_use]
    pub const fn new(index: u32, generation: u32) -> Self {
        Self { index, generation }
    }

    /// Slot index referenced by the handle.
    #[must_use]
    pub const fn index(&self) -> u32 {
        self.index
    }

    /// Generation of the slot when the handle was issued.
    #[must_use]
    pub const fn generation(&self) -> u32 {
        self.generation
    }
}

/// Index of a level within the ordered level list.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LevelIndex(u32);

impl LevelIndex {
    /// Creates a new level index.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric index.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Zero-argument notifications published by the level lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum LevelSignal {
    /// The current level was reset or reloaded.
    Reset,
    /// A different level became active.
    LevelChanged,
}

/// Player ability chosen before a run and persisted as a single integer.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Ability {
    /// No ability selected.
    #[default]
    None,
    /// Grants additional maximum health.
    EnhancedHealth,
    /// Reduces gravity and terminal fall speed.
    SlowFalling,
    /// Increases jump power.
    SuperJump,
}

impl Ability {
    /// Decodes a persisted preference value. Unknown values select no ability.
    #[must_use]
    pub const fn from_index(value: i64) -> Self {
        match value {
            1 => Self::EnhancedHealth,
            2 => Self::SlowFalling,
            3 => Self::SuperJump,
            _ => Self::None,
        }
    }

    /// Encodes the ability as its persisted preference value.
    #[must_use]
    pub const fn index(self) -> i64 {
        match self {
            Self::None => 0,
            Self::EnhancedHealth => 1,
            Self::SlowFalling => 2,
            Self::SuperJump => 3,
        }
    }
}

/// Location of a single tile cell. Rows grow upward.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    column: i32,
    row: i32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(column: i32, row: i32) -> Self {
        Self { column, row }
    }

    /// Column index of the cell.
    #[must_use]
    pub const fn column(&self) -> i32 {
        self.column
    }

    /// Row index of the cell.
    #[must_use]
    pub const fn row(&self) -> i32 {
        self.row
    }

    /// Cell directly above this one.
    #[must_use]
    pub const fn above(&self) -> Self {
        Self::new(self.column, self.row + 1)
    }
}

/// Half-open rectangle of cells: `min` inclusive, `max` exclusive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellBounds {
    min: CellCoord,
    max: CellCoord,
}

impl CellBounds {
    /// Creates bounds spanning `min` (inclusive) to `max` (exclusive).
    #[must_use]
    pub const fn new(min: CellCoord, max: CellCoord) -> Self {
        Self { min, max }
    }

    /// Inclusive lower corner.
    #[must_use]
    pub const fn min(&self) -> CellCoord {
        self.min
    }

    /// Exclusive upper corner.
    #[must_use]
    pub const fn max(&self) -> CellCoord {
        self.max
    }

    /// Reports whether the bounds contain no cells.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.max.column <= self.min.column || self.max.row <= self.min.row
    }

    /// Iterates every cell inside the bounds, column by column.
    pub fn cells(&self) -> impl Iterator<Item = CellCoord> {
        let rows = self.min.row..self.max.row;
        (self.min.column..self.max.column)
            .flat_map(move |column| rows.clone().map(move |row| CellCoord::new(column, row)))
    }
}

/// Content stored in a single tile cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TileKind {
    /// Solid ground that bodies stand on and bump into.
    Ground,
    /// Non-solid trap that bounces and damages whatever touches it.
    Trap,
    /// Non-solid kill zone that destroys agents on contact.
    Hazard,
}

impl TileKind {
    /// Collision layer the tile belongs to.
    #[must_use]
    pub const fn layer(self) -> LayerMask {
        match self {
            Self::Ground => LayerMask::GROUND,
            Self::Trap => LayerMask::TRAP,
            Self::Hazard => LayerMask::HAZARD,
        }
    }
}

/// Bit set of collision layers used to filter sensor queries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(u32);

impl LayerMask {
    /// Matches nothing.
    pub const NONE: Self = Self(0);
    /// Solid ground tiles.
    pub const GROUND: Self = Self(1);
    /// Trap tiles.
    pub const TRAP: Self = Self(1 << 1);
    /// Hazard tiles.
    pub const HAZARD: Self = Self(1 << 2);
    /// The player body.
    pub const PLAYER: Self = Self(1 << 3);

    /// Combines two masks.
    #[must_use]
    pub const fn union(self, other: Self) -> Self {
        Self(self.0 | other.0)
    }

    /// Reports whether the two masks share any layer.
    #[must_use]
    pub const fn intersects(self, other: Self) -> bool {
        self.0 & other.0 != 0
    }
}

/// Axis-aligned bounding box described by its centre and half extents.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Centre of the box in world units.
    pub center: Vec2,
    /// Half of the box's width and height.
    pub half_extents: Vec2,
}

impl Aabb {
    /// Creates a box from its centre and half extents.
    #[must_use]
    pub const fn new(center: Vec2, half_extents: Vec2) -> Self {
        Self {
            center,
            half_extents,
        }
    }

    /// Lower-left corner.
    #[must_use]
    pub fn min(&self) -> Vec2 {
        self.center - self.half_extents
    }

    /// Upper-right corner.
    #[must_use]
    pub fn max(&self) -> Vec2 {
        self.center + self.half_extents
    }

    /// Reports whether the boxes overlap or share an edge.
    #[must_use]
    pub fn touches(&self, other: &Aabb) -> bool {
        let (a_min, a_max) = (self.min(), self.max());
        let (b_min, b_max) = (other.min(), other.max());
        a_min.x <= b_max.x && b_min.x <= a_max.x && a_min.y <= b_max.y && b_min.y <= a_max.y
    }

    /// Reports whether the point lies inside the box or on its boundary.
    #[must_use]
    pub fn contains_point(&self, point: Vec2) -> bool {
        let (min, max) = (self.min(), self.max());
        point.x >= min.x && point.x <= max.x && point.y >= min.y && point.y <= max.y
    }

    /// Distance along a unit ray to its first intersection with the box.
    ///
    /// Origins inside the box report a distance of zero.
    #[must_use]
    pub fn ray_distance(&self, origin: Vec2, direction: Vec2, max_distance: f32) -> Option<f32> {
        let (min, max) = (self.min(), self.max());
        let mut t_enter = 0.0_f32;
        let mut t_exit = max_distance;

        for axis in 0..2 {
            let (o, d, lo, hi) = (origin[axis], direction[axis], min[axis], max[axis]);
            if d == 0.0 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let near = (lo - o) / d;
            let far = (hi - o) / d;
            let (near, far) = if near <= far { (near, far) } else { (far, near) };
            t_enter = t_enter.max(near);
            t_exit = t_exit.min(far);
            if t_enter > t_exit {
                return None;
            }
        }

        Some(t_enter)
    }
}

/// Result of a successful sensor raycast.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RayHit {
    /// World position where the ray met the surface.
    pub point: Vec2,
    /// Distance travelled along the ray before the hit.
    pub distance: f32,
    /// Layer of the surface that was hit.
    pub layer: LayerMask,
}

/// Current and maximum health of a damageable body.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Health {
    current: i32,
    maximum: i32,
}

impl Health {
    /// Creates full health with the provided maximum.
    #[must_use]
    pub const fn full(maximum: i32) -> Self {
        Self {
            current: maximum,
            maximum,
        }
    }

    /// Remaining health.
    #[must_use]
    pub const fn current(&self) -> i32 {
        self.current
    }

    /// Maximum health.
    #[must_use]
    pub const fn maximum(&self) -> i32 {
        self.maximum
    }

    /// Reports whether the health reached zero or below.
    #[must_use]
    pub const fn is_depleted(&self) -> bool {
        self.current <= 0
    }

    /// Removes health and returns the remaining amount.
    pub fn take(&mut self, amount: i32) -> i32 {
        self.current = self.current.saturating_sub(amount);
        self.current
    }

    /// Restores health to its maximum.
    pub fn restore(&mut self) {
        self.current = self.maximum;
    }
}

/// Horizontal direction a body faces.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Facing {
    /// Facing toward decreasing x.
    Left,
    /// Facing toward increasing x.
    #[default]
    Right,
}

impl Facing {
    /// Unit sign of the facing direction.
    #[must_use]
    pub const fn sign(self) -> f32 {
        match self {
            Self::Left => -1.0,
            Self::Right => 1.0,
        }
    }

    /// The opposite direction.
    #[must_use]
    pub const fn flipped(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Handle of the agent.
    pub id: AgentId,
    /// Centre of the agent's body.
    pub position: Vec2,
    /// Current velocity.
    pub velocity: Vec2,
    /// Whether the ground probe found a surface during the last logic tick.
    pub grounded: bool,
    /// Whether a jump is latched for the next grounded physics step.
    pub pending_jump: bool,
    /// Health of the agent.
    pub health: Health,
    /// Whether the hit-feedback window is active.
    pub flashing: bool,
    /// Whether the agent is still alive. Dead agents await removal.
    pub alive: bool,
}

/// Read-only snapshot describing all agents within the world.
#[derive(Clone, Debug, Default)]
pub struct AgentView {
    snapshots: Vec<AgentSnapshot>,
}

impl AgentView {
    /// Creates a new agent view from the provided snapshots.
    #[must_use]
    pub fn from_snapshots(mut snapshots: Vec<AgentSnapshot>) -> Self {
        snapshots.sort_by_key(|snapshot| snapshot.id);
        Self { snapshots }
    }

    /// Iterator over the captured snapshots in handle order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot captured for a handle.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .map(|index| &self.snapshots[index])
    }

    /// Reports whether the handle refers to a live agent.
    #[must_use]
    pub fn is_alive(&self, agent: AgentId) -> bool {
        self.get(agent).is_some_and(|snapshot| snapshot.alive)
    }

    /// Number of captured snapshots, including dead agents awaiting removal.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Reports whether the view holds no snapshots.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }

    /// Consumes the view, yielding the underlying snapshots.
    #[must_use]
    pub fn into_vec(self) -> Vec<AgentSnapshot> {
        self.snapshots
    }
}

/// Immutable representation of the player used for queries.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PlayerSnapshot {
    /// Centre of the player's body.
    pub position: Vec2,
    /// Current velocity.
    pub velocity: Vec2,
    /// Half extents of the player's body.
    pub half_extents: Vec2,
    /// Direction the player faces.
    pub facing: Facing,
    /// Health of the player.
    pub health: Health,
    /// Whether the damage-feedback window is active.
    pub flashing: bool,
    /// Whether the player's health has been depleted.
    pub dead: bool,
}

/// Tile layout supplied per active level.
pub trait TileGrid {
    /// Reports whether the cell holds ground.
    fn has_ground(&self, cell: CellCoord) -> bool;

    /// Bounds enclosing every cell of the grid.
    fn cell_bounds(&self) -> CellBounds;

    /// World-space centre of the cell.
    fn cell_center_world(&self, cell: CellCoord) -> Vec2;

    /// World-space size of a single cell.
    fn cell_size(&self) -> Vec2;
}

/// Stateless geometric queries against the static collision layers.
pub trait GroundSensor {
    /// Casts a ray and returns the nearest surface on a layer in `mask`.
    ///
    /// Surfaces touching the origin are reported with a distance of zero.
    fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        max_distance: f32,
        mask: LayerMask,
    ) -> Option<RayHit>;

    /// Reports whether the area overlaps or touches a surface on a layer in `mask`.
    fn overlaps(&self, area: Aabb, mask: LayerMask) -> bool;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cell_bounds_iterate_every_cell() {
        let bounds = CellBounds::new(CellCoord::new(-1, 0), CellCoord::new(1, 3));
        let cells: Vec<_> = bounds.cells().collect();
        assert_eq!(cells.len(), 6);
        assert!(cells.contains(&CellCoord::new(-1, 2)));
        assert!(!cells.contains(&CellCoord::new(1, 0)));
    }

    #[test]
    fn empty_bounds_yield_no_cells() {
        let bounds = CellBounds::new(CellCoord::new(2, 2), CellCoord::new(2, 5));
        assert!(bounds.is_empty());
        assert_eq!(bounds.cells().count(), 0);
    }

    #[test]
    fn ray_distance_reports_first_face() {
        let aabb = Aabb::new(Vec2::new(0.0, 5.0), Vec2::splat(0.5));
        let distance = aabb
            .ray_distance(Vec2::ZERO, Vec2::Y, 10.0)
            .expect("ray should hit");
        assert!((distance - 4.5).abs() < 1e-5);
        assert!(aabb.ray_distance(Vec2::ZERO, Vec2::Y, 4.0).is_none());
        assert!(aabb.ray_distance(Vec2::ZERO, Vec2::NEG_Y, 10.0).is_none());
    }

    #[test]
    fn ray_distance_is_zero_inside_box() {
        let aabb = Aabb::new(Vec2::ZERO, Vec2::splat(1.0));
        assert_eq!(aabb.ray_distance(Vec2::ZERO, Vec2::X, 3.0), Some(0.0));
    }

    #[test]
    fn touching_boxes_count_as_contact() {
        let a = Aabb::new(Vec2::ZERO, Vec2::splat(0.5));
        let b = Aabb::new(Vec2::new(1.0, 0.0), Vec2::splat(0.5));
        let c = Aabb::new(Vec2::new(1.01, 0.0), Vec2::splat(0.5));
        assert!(a.touches(&b));
        assert!(!a.touches(&c));
    }

    #[test]
    fn health_depletes_at_zero() {
        let mut health = Health::full(3);
        assert_eq!(health.take(2), 1);
        assert!(!health.is_depleted());
        assert_eq!(health.take(1), 0);
        assert!(health.is_depleted());
        health.restore();
        assert_eq!(health.current(), 3);
    }

    #[test]
    fn unknown_ability_values_select_none() {
        assert_eq!(Ability::from_index(3), Ability::SuperJump);
        assert_eq!(Ability::from_index(-4), Ability::None);
        assert_eq!(Ability::from_index(99), Ability::None);
        assert_eq!(Ability::SlowFalling.index(), 2);
    }

    #[test]
    fn agent_view_looks_up_by_handle() {
        let snapshot = |index, alive| AgentSnapshot {
            id: AgentId::new(index, 1),
            position: Vec2::ZERO,
            velocity: Vec2::ZERO,
            grounded: false,
            pending_jump: false,
            health: Health::full(3),
            flashing: false,
            alive,
        };
        let view = AgentView::from_snapshots(vec![snapshot(4, true), snapshot(1, false)]);
        assert!(view.is_alive(AgentId::new(4, 1)));
        assert!(!view.is_alive(AgentId::new(1, 1)));
        assert!(!view.is_alive(AgentId::new(4, 2)));
        assert_eq!(view.iter().next().map(|s| s.id), Some(AgentId::new(1, 1)));
    }

    #[test]
    fn agent_id_round_trips_through_bincode() {
        let agent = AgentId::new(7, 3);
        let bytes = bincode::serialize(&agent).expect("serialize");
        let restored: AgentId = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(restored, agent);
    }
}
