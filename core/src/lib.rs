#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Tailchase simulation.
//!
//! This crate defines the message surface that connects adapters, the
//! authoritative world, and pure systems. Adapters submit [`Command`] values
//! describing desired mutations, the world executes those commands via its
//! `apply` entry point, and then broadcasts [`Event`] values for systems to
//! react to deterministically. Systems consume event streams, query immutable
//! snapshots, and respond exclusively with new command batches.

mod config;

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use config::{
    AiConfig, ConfigError, PlayerConfig, PowerUpConfig, SimulationConfig, SpeedTier, WorldConfig,
    MAX_GRID_CELLS,
};

/// Canonical banner emitted when the experience boots.
pub const WELCOME_BANNER: &str = "Welcome to Tailchase.";

/// Commands that express all permissible world mutations.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Advances the simulation clock by the provided delta time.
    Tick {
        /// Duration of simulated time that elapsed since the previous tick.
        dt: Duration,
    },
    /// Reports that the pointer was pressed at the provided world location.
    PointerPressed {
        /// Pointer location expressed in world units.
        at: WorldPoint,
    },
    /// Reports that a held pointer moved to the provided world location.
    PointerMoved {
        /// Pointer location expressed in world units.
        at: WorldPoint,
    },
    /// Reports that the pointer was released.
    PointerReleased,
    /// Appends a new follower to the controlled entity's chain.
    AddFriend,
    /// Spawns an autonomous foe at the provided location.
    SpawnFoe {
        /// Spawn location expressed in world units.
        at: WorldPoint,
    },
    /// Starts a power-up timeline on the controlled entity.
    ActivatePowerUp {
        /// Power-up that should start.
        kind: PowerUpKind,
    },
    /// Destroys the referenced agent if it is still alive.
    DestroyAgent {
        /// Identifier of the agent to destroy.
        agent: AgentId,
    },
}

/// Events broadcast by the world after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Indicates that the simulation clock advanced.
    TimeAdvanced {
        /// Duration of simulated time that elapsed in the tick.
        dt: Duration,
    },
    /// Confirms that an agent entered the world.
    AgentSpawned {
        /// Identifier assigned to the new agent.
        agent: AgentId,
        /// Role the agent plays in the chase.
        role: Role,
        /// Location the agent was spawned at.
        at: WorldPoint,
    },
    /// Confirms that an agent left the world for good.
    AgentDestroyed {
        /// Identifier of the destroyed agent.
        agent: AgentId,
        /// Role the agent played before it was destroyed.
        role: Role,
    },
    /// Announces that the controlled entity started a power-up timeline.
    PowerUpActivated {
        /// Power-up that started.
        kind: PowerUpKind,
    },
    /// Reports that an empowered controlled entity caught a single follower.
    FollowerCaptured {
        /// Identifier of the follower that was caught.
        agent: AgentId,
    },
    /// Reports that an empowered controlled entity caught a foe.
    FoeCaptured {
        /// Identifier of the foe that was caught.
        agent: AgentId,
    },
    /// Reports that the lead follower was caught and the whole chain went with it.
    ChainDevoured {
        /// Number of followers in the chain before it was destroyed.
        followers: u32,
        /// Cumulative number of chains devoured, including this one.
        kill_streak: u32,
    },
    /// Asks the game manager to add points to the score.
    ScoreAwarded {
        /// Points earned by the triggering interaction.
        points: u32,
    },
    /// Asks the game manager to end the game. Emitted at most once per world.
    GameOver,
    /// Announces that the lead follower started its terminal supernova.
    SupernovaIgnited {
        /// Identifier of the former lead follower.
        agent: AgentId,
    },
}

/// Role an agent plays in the chase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Role {
    /// Pointer-driven entity owned by the player.
    Controlled,
    /// Follower trailing the controlled entity in its chain.
    Friend,
    /// Autonomous agent hunting the controlled entity.
    Foe,
}

/// Unique identifier assigned to an agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AgentId(u32);

impl AgentId {
    /// Creates a new agent identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Identifier of a sentinel point agents can pursue instead of another agent.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AnchorId(u32);

impl AnchorId {
    /// Creates a new anchor identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Row-major index of a grid cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellId(u32);

impl CellId {
    /// Creates a new cell identifier with the provided numeric value.
    #[must_use]
    pub const fn new(value: u32) -> Self {
        Self(value)
    }

    /// Retrieves the numeric representation of the identifier.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }
}

/// Entity an agent is currently pursuing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TargetRef {
    /// Another agent living in the world.
    Agent(AgentId),
    /// A sentinel point such as the pointer marker.
    Anchor(AnchorId),
}

/// Location expressed in continuous world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldPoint {
    x: f32,
    y: f32,
}

impl WorldPoint {
    /// Creates a new world-space point.
    #[must_use]
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Horizontal coordinate.
    #[must_use]
    pub const fn x(&self) -> f32 {
        self.x
    }

    /// Vertical coordinate.
    #[must_use]
    pub const fn y(&self) -> f32 {
        self.y
    }

    /// Squared Euclidean distance to another point.
    #[must_use]
    pub fn distance_squared(self, other: WorldPoint) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        dx * dx + dy * dy
    }
}

/// Width and height expressed in world units.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct WorldSize {
    width: f32,
    height: f32,
}

impl WorldSize {
    /// Creates a new size descriptor.
    #[must_use]
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }

    /// Horizontal extent.
    #[must_use]
    pub const fn width(&self) -> f32 {
        self.width
    }

    /// Vertical extent.
    #[must_use]
    pub const fn height(&self) -> f32 {
        self.height
    }
}

/// Packed `0xRRGGBB` colour applied to an agent's visual.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tint(u32);

impl Tint {
    /// Baseline colour of the controlled entity.
    pub const BLUE: Self = Self(0x00_00ff);
    /// Warning colour of a lead follower about to strike.
    pub const RED: Self = Self(0xff_0000);
    /// Colour of followers pushed away by a repel.
    pub const YELLOW: Self = Self(0xff_ff00);
    /// Neutral colour used as the range for random follower tints.
    pub const WHITE: Self = Self(0xff_ffff);
    /// Colour of the controlled entity while empowered.
    pub const MUNCH: Self = Self(0xaf_1a4f);
    /// Colour of the controlled entity while out of phase.
    pub const PHASE: Self = Self(0xff_00ff);
    /// Base colour of a supernova.
    pub const SUPERNOVA: Self = Self(0xff_cfef);
    /// Colour a supernova settles on once fully bright.
    pub const SUPERNOVA_BURNOUT: Self = Self(0xff_eff0);

    /// Creates a tint from a packed `0xRRGGBB` value. Bits above 24 are dropped.
    #[must_use]
    pub const fn from_rgb(value: u32) -> Self {
        Self(value & 0xff_ffff)
    }

    /// Packed `0xRRGGBB` representation.
    #[must_use]
    pub const fn rgb(&self) -> u32 {
        self.0
    }

    /// Red component of the colour.
    #[must_use]
    pub const fn red(&self) -> u8 {
        ((self.0 >> 16) & 0xff) as u8
    }

    /// Green component of the colour.
    #[must_use]
    pub const fn green(&self) -> u8 {
        ((self.0 >> 8) & 0xff) as u8
    }

    /// Blue component of the colour.
    #[must_use]
    pub const fn blue(&self) -> u8 {
        (self.0 & 0xff) as u8
    }

    /// Scales the packed value by `factor` in `0.0..=1.0`, producing the
    /// "random-ish" shades used for flickering agents.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        let factor = factor.clamp(0.0, 1.0);
        Self::from_rgb((self.0 as f32 * factor) as u32)
    }
}

/// Behavioural ladder that decides whether an agent can be caught or can kill.
///
/// Every rung maps to the visual intensity adapters should render, but the
/// simulation only ever branches on the rung itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Vitality {
    /// Freshly spawned; harmless and cannot be caught.
    Dormant,
    /// Weakened; can be caught but never kills.
    Faded,
    /// Emerging from dormancy; can be caught.
    Stirring,
    /// Nearly awake; can be caught.
    Waking,
    /// Empowered controlled entity before its flicker starts.
    Guarded,
    /// Almost at full strength; a lead follower at this rung can be caught.
    Primed,
    /// Full strength; contact between two full agents kills the controlled entity.
    Full,
}

impl Vitality {
    /// Visual intensity adapters should render for this rung.
    #[must_use]
    pub const fn intensity(self) -> f32 {
        match self {
            Self::Dormant => 0.15,
            Self::Faded => 0.2,
            Self::Stirring => 0.25,
            Self::Waking => 0.5,
            Self::Guarded => 0.75,
            Self::Primed => 0.8,
            Self::Full => 1.0,
        }
    }

    /// Whether an ordinary follower or foe at this rung can be caught.
    #[must_use]
    pub const fn is_catchable(self) -> bool {
        !matches!(self, Self::Dormant)
    }

    /// Whether a lead follower at this rung can be caught.
    #[must_use]
    pub const fn is_lead_catchable(self) -> bool {
        matches!(self, Self::Primed | Self::Full)
    }

    /// Whether the agent is at full strength.
    #[must_use]
    pub const fn is_full(self) -> bool {
        matches!(self, Self::Full)
    }
}

/// Timeline an agent is currently following.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Posture {
    /// Baseline behaviour.
    Roaming,
    /// Spawn timeline that gradually wakes a new agent.
    Emerging,
    /// Slowed down by a freeze.
    Frozen,
    /// Fleeing its target because of a repel.
    Repelled,
    /// Reacting to an empowered controlled entity.
    Scared,
    /// Controlled entity able to catch followers.
    Empowered,
    /// Controlled entity temporarily out of phase.
    Phased,
    /// Terminal flourish of the former lead follower.
    Supernova,
}

/// Power-ups the controlled entity can activate.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PowerUpKind {
    /// Slows every follower to a crawl before a flicker and reset.
    Freeze,
    /// Sends every follower fleeing for a while.
    Repel,
    /// Empowers the controlled entity and scares the chain.
    Munch,
    /// Takes the controlled entity out of phase so contact cannot kill it.
    Phase,
}

/// Circular collision bounds synchronised with an agent's position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Collider {
    /// Centre of the circle in world units.
    pub center: WorldPoint,
    /// Radius of the circle in world units.
    pub radius: f32,
}

/// Opaque overlap predicate consumed by the world for contact checks.
pub type CollisionTest = fn(&Collider, &Collider) -> bool;

/// Closest agent located by a proximity query. Distances are squared.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Nearest {
    /// Identifier of the closest agent.
    pub agent: AgentId,
    /// Squared distance to the closest agent.
    pub distance_sq: f32,
}

/// Immutable representation of a single agent's state used for queries.
#[derive(Clone, Debug, PartialEq)]
pub struct AgentSnapshot {
    /// Unique identifier assigned to the agent.
    pub id: AgentId,
    /// Role the agent plays in the chase.
    pub role: Role,
    /// Centre of the agent in world units.
    pub position: WorldPoint,
    /// Visual and collision extent of the agent.
    pub size: WorldSize,
    /// Current speed; zero means stationary.
    pub speed: f32,
    /// Displacement multiplier copied from the last cell that updated the agent.
    pub update_rate: f32,
    /// Behavioural rung driving contact outcomes.
    pub vitality: Vitality,
    /// Timeline the agent is following.
    pub posture: Posture,
    /// Intensity adapters should render.
    pub intensity: f32,
    /// Colour adapters should render.
    pub tint: Tint,
    /// Rotation in radians adapters should render.
    pub rotation: f32,
    /// Whether the agent is the lead follower of the chain.
    pub is_lead: bool,
    /// Whether the agent is an empowered controlled entity.
    pub empowered: bool,
    /// Entity the agent is pursuing, if any.
    pub target: Option<TargetRef>,
    /// Whether the agent currently flees its target.
    pub reversed: bool,
    /// Squared distance to the target as of the last direction update.
    pub distance_sq: f32,
    /// Cells the agent is registered in.
    pub active_cells: Vec<CellId>,
    /// Number of scheduled transitions still pending for the agent.
    pub pending_timers: usize,
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

    /// Iterator over the captured agent snapshots in deterministic order.
    pub fn iter(&self) -> impl Iterator<Item = &AgentSnapshot> {
        self.snapshots.iter()
    }

    /// Looks up the snapshot captured for the provided agent.
    #[must_use]
    pub fn get(&self, agent: AgentId) -> Option<&AgentSnapshot> {
        self.snapshots
            .binary_search_by_key(&agent, |snapshot| snapshot.id)
            .ok()
            .and_then(|index| self.snapshots.get(index))
    }

    /// Number of captured snapshots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    /// Whether the view captured no agents.
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

#[cfg(test)]
mod tests {
    use super::{AgentId, PowerUpKind, Role, TargetRef, Tint, Vitality, WorldPoint};
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn power_up_kind_round_trips_through_bincode() {
        assert_round_trip(&PowerUpKind::Munch);
    }

    #[test]
    fn target_ref_round_trips_through_bincode() {
        assert_round_trip(&TargetRef::Agent(AgentId::new(7)));
        assert_round_trip(&Role::Foe);
    }

    #[test]
    fn vitality_ladder_orders_behaviour_thresholds() {
        assert!(!Vitality::Dormant.is_catchable());
        assert!(Vitality::Faded.is_catchable());
        assert!(!Vitality::Waking.is_lead_catchable());
        assert!(Vitality::Primed.is_lead_catchable());
        assert!(!Vitality::Primed.is_full());
        assert!(Vitality::Full.is_full());
    }

    #[test]
    fn vitality_intensity_tracks_rungs() {
        let ladder = [
            Vitality::Dormant,
            Vitality::Faded,
            Vitality::Stirring,
            Vitality::Waking,
            Vitality::Guarded,
            Vitality::Primed,
            Vitality::Full,
        ];
        for pair in ladder.windows(2) {
            assert!(
                pair[0].intensity() < pair[1].intensity(),
                "{:?} should render fainter than {:?}",
                pair[0],
                pair[1]
            );
        }
        assert!((Vitality::Full.intensity() - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn tint_exposes_channels() {
        let tint = Tint::MUNCH;
        assert_eq!(tint.red(), 0xaf);
        assert_eq!(tint.green(), 0x1a);
        assert_eq!(tint.blue(), 0x4f);
        assert_eq!(Tint::from_rgb(0x1ff_ffff).rgb(), 0xff_ffff);
    }

    #[test]
    fn scaled_tint_stays_within_base_range() {
        assert_eq!(Tint::RED.scaled(0.0), Tint::from_rgb(0));
        assert_eq!(Tint::WHITE.scaled(2.0), Tint::WHITE);
        assert!(Tint::WHITE.scaled(0.5).rgb() <= Tint::WHITE.rgb());
    }

    #[test]
    fn squared_distance_is_not_rooted() {
        let origin = WorldPoint::new(0.0, 0.0);
        let other = WorldPoint::new(3.0, 4.0);
        assert!((origin.distance_squared(other) - 25.0).abs() < f32::EPSILON);
    }
}
