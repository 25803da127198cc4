#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state management for Tailchase.
//!
//! The world owns every agent, the spatial grid they are registered in, the
//! follower chain and the scheduler driving timed transitions. It is only
//! mutated through [`apply`]; read access goes through [`query`].

mod agent;
mod chain;
mod collision;
mod grid;
mod powerup;
mod roles;
mod target;
mod timeline;

use std::time::Duration;

use glam::Vec2;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tailchase_core::{
    AgentId, CellId, CollisionTest, Command, ConfigError, Event, Nearest, Role, SimulationConfig,
    TargetRef, Tint, Vitality, WELCOME_BANNER,
};

use crate::{
    agent::{point, vec, Agent},
    chain::Chain,
    grid::Grid,
    target::Anchors,
    timeline::{Scheduler, TimerJob},
};

pub use collision::circles_overlap;

/// Frame delta equals one when the world ticks at this rate.
const FRAMES_PER_SECOND: f32 = 60.0;

/// Represents the authoritative Tailchase world state.
#[derive(Debug)]
pub struct World {
    config: SimulationConfig,
    agents: Vec<Option<Agent>>,
    free_slots: Vec<u32>,
    grid: Grid,
    scheduler: Scheduler,
    chain: Chain,
    anchors: Anchors,
    controlled: Option<AgentId>,
    pointer_held: bool,
    rng: ChaCha8Rng,
    collide: CollisionTest,
    tick_count: u64,
    delta: f32,
    kill_count: u32,
    game_over: bool,
    planned_cells: Vec<CellId>,
    member_scratch: Vec<AgentId>,
}

impl World {
    /// Creates a world from the default configuration with the controlled
    /// entity standing still at its centre.
    #[must_use]
    pub fn new() -> Self {
        Self::build(SimulationConfig::default())
    }

    /// Creates a world from the provided configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when the configuration cannot drive a world.
    pub fn with_config(config: SimulationConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::build(config))
    }

    /// Replaces the overlap predicate used for contact checks.
    pub fn set_collision_test(&mut self, collide: CollisionTest) {
        self.collide = collide;
    }

    fn build(config: SimulationConfig) -> Self {
        let world_config = &config.world;
        let mut world = Self {
            grid: Grid::new(world_config.width, world_config.height, world_config.cell_size),
            rng: ChaCha8Rng::seed_from_u64(config.rng_seed),
            agents: Vec::new(),
            free_slots: Vec::new(),
            scheduler: Scheduler::default(),
            chain: Chain::default(),
            anchors: Anchors::default(),
            controlled: None,
            pointer_held: false,
            collide: circles_overlap,
            tick_count: 0,
            delta: 0.0,
            kill_count: 0,
            game_over: false,
            planned_cells: Vec::new(),
            member_scratch: Vec::new(),
            config,
        };

        let centre = Vec2::new(world.config.world.width, world.config.world.height) * 0.5;
        let size = world.config.player.size;
        let id = world.spawn(Role::Controlled, centre, size, 0.0);
        let pointer = world.anchors.create(centre);
        if let Some(pilot) = slot_mut(&mut world.agents, id) {
            pilot.tint = Tint::BLUE;
            pilot.vitality = Vitality::Full;
            pilot.anchor = Some(pointer);
            pilot.target.set_reference(Some(TargetRef::Anchor(pointer)));
        }
        world.controlled = Some(id);
        world
    }

    fn agent(&self, id: AgentId) -> Option<&Agent> {
        self.agents.get(id.get() as usize).and_then(Option::as_ref)
    }

    fn agent_mut(&mut self, id: AgentId) -> Option<&mut Agent> {
        slot_mut(&mut self.agents, id)
    }

    fn controlled_agent(&self) -> Option<&Agent> {
        self.controlled.and_then(|id| self.agent(id))
    }

    /// Creates an agent and registers it into its spawn cell.
    ///
    /// Slots freed by destroyed agents are reused before the arena grows.
    fn spawn(&mut self, role: Role, position: Vec2, size: f32, speed: f32) -> AgentId {
        let slot = self
            .free_slots
            .pop()
            .unwrap_or(self.agents.len() as u32);
        let id = AgentId::new(slot);
        let mut agent = Agent::new(id, role, position, size, speed);
        agent.clamp_to(self.config.world.width, self.config.world.height);
        agent.sync_collider();
        let half_extent = agent.half_extent();
        let _ = self.grid.register(
            &mut agent.membership,
            role,
            id,
            agent.position,
            half_extent,
        );
        match self.agents.get_mut(slot as usize) {
            Some(vacant) => *vacant = Some(agent),
            None => self.agents.push(Some(agent)),
        }
        id
    }

    fn tick(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        self.tick_count = self.tick_count.saturating_add(1);
        self.delta = dt.as_secs_f32() * FRAMES_PER_SECOND;
        self.scheduler.advance(dt);
        out_events.push(Event::TimeAdvanced { dt });

        self.fire_due_timers();

        let focus = self
            .controlled_agent()
            .and_then(|pilot| pilot.membership.primary_cell());
        let mut planned = std::mem::take(&mut self.planned_cells);
        self.grid.plan_frame(
            focus,
            self.config.world.near_cell_radius,
            self.config.world.far_cell_cadence,
            self.tick_count,
            &mut planned,
        );

        let mut members = std::mem::take(&mut self.member_scratch);
        for cell in &planned {
            members.clear();
            if let Some(cell) = self.grid.cell(*cell) {
                cell.members().collect_into(&mut members);
            }
            for agent in &members {
                self.update_agent(*cell, *agent, out_events);
            }
        }
        self.member_scratch = members;
        self.planned_cells = planned;
    }

    fn fire_due_timers(&mut self) {
        while let Some(due) = self.scheduler.pop_due() {
            let Some(agent) = slot_mut(&mut self.agents, due.owner) else {
                continue;
            };
            if agent.timers.epoch() != due.epoch {
                continue;
            }
            if !due.repeating {
                Scheduler::complete(&mut agent.timers, due.handle);
            }

            match due.job {
                TimerJob::Timeline(steps) => self.drive(due.owner, steps, true),
                TimerJob::SupernovaPulse => self.pulse_supernova(due.owner),
            }
        }
    }

    /// Runs the role hooks and the movement pipeline for one agent.
    fn update_agent(&mut self, cell: CellId, id: AgentId, out_events: &mut Vec<Event>) {
        let tick = self.tick_count;
        let Some(agent) = self.agent_mut(id) else {
            return;
        };
        if !agent.first_pass(tick) {
            return;
        }

        let hooks = roles::hooks(agent.role);
        (hooks.steer)(self, cell, id);
        (hooks.interact)(self, cell, id, out_events);
        if self.agent(id).is_none() {
            return;
        }

        self.update_movement(cell, id);
    }

    fn update_movement(&mut self, cell_id: CellId, id: AgentId) {
        let Some(role) = self.agent(id).map(|agent| agent.role) else {
            return;
        };
        let hooks = roles::hooks(role);
        let direction_rate = (hooks.direction_rate)(&self.config);
        let membership_rate = (hooks.membership_rate)(&self.config);

        let Some(cell) = self.grid.cell_mut(cell_id) else {
            return;
        };
        let cell_rate = cell.update_rate();
        let refresh = cell.frames_between_updates(direction_rate);
        let recheck = cell.frames_between_updates(membership_rate);

        let destination = if refresh {
            Some(
                self.agent(id)
                    .and_then(|agent| agent.target.reference())
                    .and_then(|reference| self.resolve(reference)),
            )
        } else {
            None
        };

        let tick = self.tick_count;
        let delta = self.delta;
        let (width, height) = (self.config.world.width, self.config.world.height);
        let Some(agent) = slot_mut(&mut self.agents, id) else {
            return;
        };

        agent.adopt_update_rate(cell_rate, tick);
        match destination {
            Some(Some(to)) => agent.target.update(agent.position, to),
            Some(None) => agent.target.hold(),
            None => {}
        }

        if !agent.target.at_destination() && agent.speed != 0.0 {
            let previous = agent.position;
            let direction = agent.target.direction();
            agent.position += direction * agent.speed * agent.update_rate * delta;
            if direction.x != 0.0 {
                agent
                    .membership
                    .consume_edge_distance((agent.position.x - previous.x).abs());
            }
            if direction.y != 0.0 {
                agent
                    .membership
                    .consume_edge_distance((agent.position.y - previous.y).abs());
            }
            agent.clamp_to(width, height);
            agent.sync_collider();
        }

        if recheck {
            let half_extent = agent.half_extent();
            let _ = self.grid.register(
                &mut agent.membership,
                agent.role,
                agent.id,
                agent.position,
                half_extent,
            );
        }
    }

    /// Current position of a pursued entity, if it still exists.
    fn resolve(&self, reference: TargetRef) -> Option<Vec2> {
        match reference {
            TargetRef::Agent(agent) => self.agent(agent).map(|agent| agent.position),
            TargetRef::Anchor(anchor) => self.anchors.position(anchor),
        }
    }

    /// Closest agent of `role` in the cells surrounding `id`, by squared distance.
    fn closest_dynamic(&self, id: AgentId, role: Role) -> Option<Nearest> {
        let agent = self.agent(id)?;
        let mut best: Option<Nearest> = None;
        for cell in agent.membership.surrounding_cells() {
            let Some(cell) = self.grid.cell(*cell) else {
                continue;
            };
            let Some(found) = self.closest(agent, cell.members().list(role)) else {
                continue;
            };
            if best.map_or(true, |current| found.distance_sq < current.distance_sq) {
                best = Some(found);
            }
        }
        best
    }

    /// Nearest-neighbour helper over a single candidate list. Ties keep the
    /// first candidate encountered.
    fn closest(&self, from: &Agent, candidates: &[AgentId]) -> Option<Nearest> {
        let mut best: Option<Nearest> = None;
        for candidate in candidates {
            if *candidate == from.id {
                continue;
            }
            let Some(other) = self.agent(*candidate) else {
                continue;
            };
            let distance_sq = from.position.distance_squared(other.position);
            if best.map_or(true, |current| distance_sq < current.distance_sq) {
                best = Some(Nearest {
                    agent: *candidate,
                    distance_sq,
                });
            }
        }
        best
    }

    fn press_pointer(&mut self, at: Vec2) {
        let base_speed = self.config.player.base_speed;
        let Some(pilot) = self.controlled.and_then(|id| slot_mut(&mut self.agents, id)) else {
            log::debug!("pointer press ignored: no controlled entity");
            return;
        };
        pilot.speed = base_speed;
        if let Some(pointer) = pilot.anchor {
            self.anchors.set_position(pointer, at);
        }
        self.pointer_held = true;
    }

    fn move_pointer(&mut self, at: Vec2) {
        if !self.pointer_held {
            log::debug!("pointer move ignored: pointer not held");
            return;
        }
        if let Some(pointer) = self.controlled_agent().and_then(|pilot| pilot.anchor) {
            self.anchors.set_position(pointer, at);
        }
    }

    fn release_pointer(&mut self) {
        self.pointer_held = false;
        let Some(pilot) = self.controlled.and_then(|id| slot_mut(&mut self.agents, id)) else {
            log::debug!("pointer release ignored: no controlled entity");
            return;
        };
        pilot.speed = 0.0;
        if let Some(pointer) = pilot.anchor {
            self.anchors.set_position(pointer, pilot.position);
        }
    }

    fn add_friend(&mut self, out_events: &mut Vec<Event>) {
        let Some((head, origin)) = self
            .controlled_agent()
            .map(|pilot| (pilot.id, pilot.position))
        else {
            log::debug!("add friend ignored: no controlled entity");
            return;
        };

        let ai = &self.config.ai;
        let (size, speed, growth) = (ai.friend_size, ai.friend_speed, ai.lead_growth);
        let id = self.spawn(Role::Friend, origin, size, speed);
        let link = self.chain.push(id, Some(head));
        if let Some(friend) = slot_mut(&mut self.agents, id) {
            friend.target.set_reference(link.target);
            if link.is_lead {
                friend.is_lead = true;
                friend.size += Vec2::splat(growth);
                friend.sync_collider();
                friend.membership.invalidate();
            }
        }

        self.drive(id, powerup::emergence(), false);
        out_events.push(Event::AgentSpawned {
            agent: id,
            role: Role::Friend,
            at: point(origin),
        });
    }

    fn spawn_foe(&mut self, at: Vec2, out_events: &mut Vec<Event>) {
        let ai = &self.config.ai;
        let (size, speed) = (ai.foe_size, ai.foe_speed);
        let id = self.spawn(Role::Foe, at, size, speed);
        let position = self.agent(id).map_or(at, |foe| foe.position);
        self.drive(id, powerup::emergence(), false);
        out_events.push(Event::AgentSpawned {
            agent: id,
            role: Role::Foe,
            at: point(position),
        });
    }

    /// Terminal destroy path shared by every role.
    fn destroy(&mut self, id: AgentId, out_events: &mut Vec<Event>) {
        let Some(role) = self.agent(id).map(|agent| agent.role) else {
            log::debug!("destroy ignored: agent {} is not alive", id.get());
            return;
        };
        (roles::hooks(role).on_destroy)(self, id, out_events);

        let Some(mut agent) = self
            .agents
            .get_mut(id.get() as usize)
            .and_then(Option::take)
        else {
            return;
        };
        self.scheduler.cancel_all(&mut agent.timers);
        if let Some(anchor) = agent.anchor.take() {
            self.anchors.release(anchor);
        }
        self.grid.unregister(&mut agent.membership, role, id);
        if self.controlled == Some(id) {
            self.controlled = None;
            self.pointer_held = false;
        }
        if self.chain.remove(id) {
            self.relink_chain();
        }
        for other in self.agents.iter_mut().flatten() {
            let _ = other.target.release(TargetRef::Agent(id));
        }
        self.free_slots.push(id.get());

        out_events.push(Event::AgentDestroyed { agent: id, role });
    }

    /// Restores the chain linkage after a follower left it.
    fn relink_chain(&mut self) {
        let growth = self.config.ai.lead_growth;
        for link in self.chain.links(self.controlled) {
            let Some(friend) = slot_mut(&mut self.agents, link.follower) else {
                continue;
            };
            if friend.spiral.is_some() {
                continue;
            }
            friend.target.set_reference(link.target);
            if link.is_lead && !friend.is_lead {
                friend.is_lead = true;
                friend.size += Vec2::splat(growth);
                friend.sync_collider();
                friend.membership.invalidate();
            }
        }
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

fn slot_mut(agents: &mut [Option<Agent>], id: AgentId) -> Option<&mut Agent> {
    agents.get_mut(id.get() as usize).and_then(Option::as_mut)
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::Tick { dt } => world.tick(dt, out_events),
        Command::PointerPressed { at } => world.press_pointer(vec(at)),
        Command::PointerMoved { at } => world.move_pointer(vec(at)),
        Command::PointerReleased => world.release_pointer(),
        Command::AddFriend => world.add_friend(out_events),
        Command::SpawnFoe { at } => world.spawn_foe(vec(at), out_events),
        Command::ActivatePowerUp { kind } => world.activate_power_up(kind, out_events),
        Command::DestroyAgent { agent } => world.destroy(agent, out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::time::Duration;

    use tailchase_core::{
        AgentId, AgentSnapshot, AgentView, CellId, Nearest, Role, SimulationConfig, WorldPoint,
        WorldSize,
    };

    use super::World;
    use crate::agent::vec;

    /// Reports the welcome banner that adapters may display to players.
    #[must_use]
    pub fn welcome_banner(_world: &World) -> &'static str {
        super::WELCOME_BANNER
    }

    /// Configuration the world was built from.
    #[must_use]
    pub fn config(world: &World) -> &SimulationConfig {
        &world.config
    }

    /// Playable extent of the world.
    #[must_use]
    pub fn world_size(world: &World) -> WorldSize {
        WorldSize::new(world.config.world.width, world.config.world.height)
    }

    /// Number of grid cells along each axis.
    #[must_use]
    pub fn grid_dimensions(world: &World) -> (u32, u32) {
        world.grid.dimensions()
    }

    /// Captures a read-only view of every living agent.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(
            world
                .agents
                .iter()
                .flatten()
                .map(|agent| agent.snapshot())
                .collect(),
        )
    }

    /// Snapshot of a single agent, if it is alive.
    #[must_use]
    pub fn agent(world: &World, id: AgentId) -> Option<AgentSnapshot> {
        world.agent(id).map(|agent| agent.snapshot())
    }

    /// Identifier of the controlled entity while it is alive.
    #[must_use]
    pub fn controlled(world: &World) -> Option<AgentId> {
        world.controlled
    }

    /// Read-only view of the follower chain.
    #[must_use]
    pub fn chain(world: &World) -> ChainView<'_> {
        ChainView {
            followers: world.chain.followers(),
        }
    }

    /// Number of ticks processed so far.
    #[must_use]
    pub fn tick_count(world: &World) -> u64 {
        world.tick_count
    }

    /// Simulated time elapsed since the world was created.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.scheduler.now()
    }

    /// Number of chains devoured so far; the multiplier of the next one is one higher.
    #[must_use]
    pub fn kill_count(world: &World) -> u32 {
        world.kill_count
    }

    /// Whether the controlled entity has been destroyed.
    #[must_use]
    pub fn is_game_over(world: &World) -> bool {
        world.game_over
    }

    /// Number of scheduled transitions pending across every agent.
    #[must_use]
    pub fn pending_timers(world: &World) -> usize {
        world.scheduler.pending()
    }

    /// Cell containing the provided point, clamped to the grid.
    #[must_use]
    pub fn cell_at(world: &World, point: WorldPoint) -> CellId {
        world.grid.cell_at(vec(point))
    }

    /// Agents of `role` registered in the provided cell.
    #[must_use]
    pub fn cell_members(world: &World, cell: CellId, role: Role) -> &[AgentId] {
        world
            .grid
            .cell(cell)
            .map(|cell| cell.members().list(role))
            .unwrap_or(&[])
    }

    /// Closest agent of `role` in the cells surrounding `agent`. Distances are squared.
    #[must_use]
    pub fn closest_agent(world: &World, agent: AgentId, role: Role) -> Option<Nearest> {
        world.closest_dynamic(agent, role)
    }

    /// Follower chain in order, lead first.
    #[derive(Clone, Copy, Debug)]
    pub struct ChainView<'a> {
        followers: &'a [AgentId],
    }

    impl<'a> ChainView<'a> {
        /// Lead follower, if the chain is not empty.
        #[must_use]
        pub fn lead(&self) -> Option<AgentId> {
            self.followers.first().copied()
        }

        /// Followers in chain order.
        #[must_use]
        pub fn followers(&self) -> &'a [AgentId] {
            self.followers
        }

        /// Iterator over the followers in chain order.
        pub fn iter(&self) -> impl Iterator<Item = AgentId> + 'a {
            self.followers.iter().copied()
        }

        /// Number of followers.
        #[must_use]
        pub fn len(&self) -> usize {
            self.followers.len()
        }

        /// Whether the chain has no followers.
        #[must_use]
        pub fn is_empty(&self) -> bool {
            self.followers.is_empty()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tailchase_core::{PowerUpKind, Posture, WorldPoint};

    const FRAME: Duration = Duration::from_millis(16);

    fn tick(world: &mut World, events: &mut Vec<Event>) {
        apply(world, Command::Tick { dt: FRAME }, events);
    }

    fn advance(world: &mut World, duration: Duration) -> Vec<Event> {
        let mut events = Vec::new();
        let mut elapsed = Duration::ZERO;
        while elapsed < duration {
            tick(world, &mut events);
            elapsed += FRAME;
        }
        events
    }

    fn never(_: &tailchase_core::Collider, _: &tailchase_core::Collider) -> bool {
        false
    }

    fn world_with_friends(count: usize) -> World {
        let mut world = World::new();
        world.set_collision_test(never);
        let mut events = Vec::new();
        for _ in 0..count {
            apply(&mut world, Command::AddFriend, &mut events);
        }
        world
    }

    #[test]
    fn new_world_places_controlled_entity_at_centre() {
        let world = World::new();
        let pilot = query::controlled(&world).expect("controlled entity exists");
        let snapshot = query::agent(&world, pilot).expect("controlled entity alive");
        assert_eq!(snapshot.position, WorldPoint::new(1_200.0, 800.0));
        assert_eq!(snapshot.tint, Tint::BLUE);
        assert!(!snapshot.active_cells.is_empty());
        assert_eq!(query::welcome_banner(&world), "Welcome to Tailchase.");
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let mut config = SimulationConfig::default();
        config.world.cell_size = -5.0;
        assert!(matches!(
            World::with_config(config),
            Err(ConfigError::NonPositiveCellSize(_))
        ));
    }

    #[test]
    fn tick_reports_time_and_advances_counter() {
        let mut world = World::new();
        let mut events = Vec::new();
        tick(&mut world, &mut events);
        assert_eq!(events, vec![Event::TimeAdvanced { dt: FRAME }]);
        assert_eq!(query::tick_count(&world), 1);
        assert_eq!(query::elapsed(&world), FRAME);
    }

    #[test]
    fn friends_link_into_a_chain() {
        let world = world_with_friends(3);
        let chain = query::chain(&world);
        assert_eq!(chain.len(), 3);
        let pilot = query::controlled(&world).expect("controlled entity exists");
        let lead = query::agent(&world, chain.followers()[0]).expect("lead alive");
        assert!(lead.is_lead);
        assert_eq!(lead.target, Some(TargetRef::Agent(pilot)));
        assert!((lead.size.width() - 20.0).abs() < f32::EPSILON);
        for pair in chain.followers().windows(2) {
            let follower = query::agent(&world, pair[1]).expect("follower alive");
            assert_eq!(follower.target, Some(TargetRef::Agent(pair[0])));
            assert!(!follower.is_lead);
        }
    }

    #[test]
    fn destroying_an_interior_follower_relinks_the_chain() {
        let mut world = world_with_friends(4);
        let followers = query::chain(&world).followers().to_vec();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::DestroyAgent {
                agent: followers[1],
            },
            &mut events,
        );
        assert!(events.contains(&Event::AgentDestroyed {
            agent: followers[1],
            role: Role::Friend,
        }));

        let chain = query::chain(&world);
        assert_eq!(chain.len(), 3);
        for pair in chain.followers().windows(2) {
            let follower = query::agent(&world, pair[1]).expect("follower alive");
            assert_eq!(follower.target, Some(TargetRef::Agent(pair[0])));
        }
    }

    #[test]
    fn destroying_the_lead_promotes_its_successor() {
        let mut world = world_with_friends(3);
        let followers = query::chain(&world).followers().to_vec();
        let pilot = query::controlled(&world).expect("controlled entity exists");
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::DestroyAgent {
                agent: followers[0],
            },
            &mut events,
        );
        let lead = query::agent(&world, followers[1]).expect("successor alive");
        assert!(lead.is_lead);
        assert_eq!(lead.target, Some(TargetRef::Agent(pilot)));
        assert_eq!(query::chain(&world).lead(), Some(followers[1]));
    }

    #[test]
    fn destroyed_agents_leave_every_cell_and_timer() {
        let mut world = world_with_friends(1);
        let friend = query::chain(&world).followers()[0];
        let cells = query::agent(&world, friend)
            .expect("friend alive")
            .active_cells;
        let mut events = Vec::new();
        apply(&mut world, Command::DestroyAgent { agent: friend }, &mut events);
        for cell in cells {
            assert!(!query::cell_members(&world, cell, Role::Friend).contains(&friend));
        }
        assert!(query::agent(&world, friend).is_none());
        assert_eq!(query::pending_timers(&world), 0);

        events.clear();
        apply(&mut world, Command::DestroyAgent { agent: friend }, &mut events);
        assert!(events.is_empty(), "destroying twice is a no-op");
    }

    #[test]
    fn held_pointer_moves_the_controlled_entity() {
        let mut world = World::new();
        let pilot = query::controlled(&world).expect("controlled entity exists");
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PointerPressed {
                at: WorldPoint::new(1_500.0, 800.0),
            },
            &mut events,
        );
        let _ = advance(&mut world, Duration::from_millis(160));
        let moved = query::agent(&world, pilot).expect("controlled entity alive");
        assert!(moved.position.x() > 1_200.0, "entity should approach the pointer");
        assert!(moved.speed > 1.0, "far pointer selects a faster tier");

        apply(&mut world, Command::PointerReleased, &mut events);
        let released = query::agent(&world, pilot).expect("controlled entity alive");
        let _ = advance(&mut world, Duration::from_millis(160));
        let after = query::agent(&world, pilot).expect("controlled entity alive");
        assert!(after.speed.abs() < f32::EPSILON);
        assert_eq!(after.position, released.position);
    }

    #[test]
    fn agents_never_leave_the_world() {
        let mut world = World::new();
        let pilot = query::controlled(&world).expect("controlled entity exists");
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::PointerPressed {
                at: WorldPoint::new(-500.0, -500.0),
            },
            &mut events,
        );
        let _ = advance(&mut world, Duration::from_secs(8));
        let snapshot = query::agent(&world, pilot).expect("controlled entity alive");
        let half = snapshot.size.width() / 2.0;
        assert!(snapshot.position.x() >= half);
        assert!(snapshot.position.y() >= half);
    }

    #[test]
    fn foes_chase_the_closest_controlled_entity() {
        let mut world = World::new();
        world.set_collision_test(never);
        let pilot = query::controlled(&world).expect("controlled entity exists");
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnFoe {
                at: WorldPoint::new(1_300.0, 800.0),
            },
            &mut events,
        );
        let foe = match events.last() {
            Some(Event::AgentSpawned { agent, role, .. }) if *role == Role::Foe => *agent,
            other => panic!("expected foe spawn, got {other:?}"),
        };
        let _ = advance(&mut world, Duration::from_millis(200));
        let snapshot = query::agent(&world, foe).expect("foe alive");
        assert_eq!(snapshot.target, Some(TargetRef::Agent(pilot)));
        assert!(snapshot.position.x() < 1_300.0, "foe closes in on the controlled entity");

        let nearest = query::closest_agent(&world, foe, Role::Controlled).expect("pilot nearby");
        assert_eq!(nearest.agent, pilot);
    }

    #[test]
    fn foes_without_a_controlled_entity_nearby_hold_position() {
        let mut world = World::new();
        world.set_collision_test(never);
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::SpawnFoe {
                at: WorldPoint::new(50.0, 50.0),
            },
            &mut events,
        );
        let foe = match events.last() {
            Some(Event::AgentSpawned { agent, .. }) => *agent,
            other => panic!("expected foe spawn, got {other:?}"),
        };

        assert_eq!(query::closest_agent(&world, foe, Role::Controlled), None);
        let _ = advance(&mut world, Duration::from_millis(500));
        let snapshot = query::agent(&world, foe).expect("foe alive");
        assert_eq!(snapshot.target, None);
        assert_eq!(snapshot.position, WorldPoint::new(50.0, 50.0));
        assert_eq!(query::closest_agent(&world, foe, Role::Controlled), None);
    }

    #[test]
    fn equidistant_candidates_resolve_to_the_first_registered() {
        let near_right = WorldPoint::new(1_260.0, 830.0);
        let near_below = WorldPoint::new(1_230.0, 860.0);

        for (first, second) in [(near_right, near_below), (near_below, near_right)] {
            let mut world = World::new();
            let pilot = query::controlled(&world).expect("controlled entity exists");
            let mut events = Vec::new();
            apply(&mut world, Command::SpawnFoe { at: first }, &mut events);
            apply(&mut world, Command::SpawnFoe { at: second }, &mut events);
            let spawned: Vec<AgentId> = events
                .iter()
                .filter_map(|event| match event {
                    Event::AgentSpawned { agent, .. } => Some(*agent),
                    _ => None,
                })
                .collect();
            assert_eq!(
                query::cell_at(&world, first),
                query::cell_at(&world, second),
                "both candidates share a cell"
            );

            let nearest = query::closest_agent(&world, pilot, Role::Foe).expect("foes nearby");
            assert_eq!(nearest.agent, spawned[0]);
            assert!((nearest.distance_sq - 4_500.0).abs() < f32::EPSILON);
        }
    }

    #[test]
    fn destroyed_slots_are_reused_by_later_spawns() {
        let mut world = world_with_friends(2);
        let followers: Vec<AgentId> = query::chain(&world).iter().collect();
        let mut events = Vec::new();
        apply(
            &mut world,
            Command::DestroyAgent {
                agent: followers[0],
            },
            &mut events,
        );
        let slots = world.agents.len();

        apply(&mut world, Command::AddFriend, &mut events);
        assert_eq!(world.agents.len(), slots, "arena does not grow");
        assert_eq!(query::chain(&world).followers(), &[followers[1], followers[0]]);
        let newcomer = query::agent(&world, followers[0]).expect("newcomer alive");
        assert!(!newcomer.is_lead);
        assert_eq!(newcomer.target, Some(TargetRef::Agent(followers[1])));

        for _ in 0..50 {
            let mut spawned = Vec::new();
            apply(
                &mut world,
                Command::SpawnFoe {
                    at: WorldPoint::new(100.0, 100.0),
                },
                &mut spawned,
            );
            let foe = match spawned.last() {
                Some(Event::AgentSpawned { agent, .. }) => *agent,
                other => panic!("expected foe spawn, got {other:?}"),
            };
            apply(&mut world, Command::DestroyAgent { agent: foe }, &mut spawned);
        }
        assert_eq!(world.agents.len(), slots + 1);
    }

    #[test]
    fn emergence_wakes_friends_over_five_seconds() {
        let mut world = world_with_friends(1);
        let friend = query::chain(&world).followers()[0];
        let spawned = query::agent(&world, friend).expect("friend alive");
        assert_eq!(spawned.vitality, Vitality::Dormant);
        assert_eq!(spawned.posture, Posture::Emerging);

        let _ = advance(&mut world, Duration::from_millis(600));
        assert_eq!(
            query::agent(&world, friend).expect("friend alive").vitality,
            Vitality::Stirring
        );

        let _ = advance(&mut world, Duration::from_millis(3_500));
        assert_eq!(
            query::agent(&world, friend).expect("friend alive").vitality,
            Vitality::Waking
        );

        let _ = advance(&mut world, Duration::from_millis(1_500));
        let awake = query::agent(&world, friend).expect("friend alive");
        assert_eq!(awake.vitality, Vitality::Full);
        assert_eq!(awake.posture, Posture::Roaming);
        assert_eq!(awake.pending_timers, 0);
    }

    #[test]
    fn freeze_then_repel_leaves_only_repel_timers() {
        let mut world = world_with_friends(2);
        let _ = advance(&mut world, Duration::from_secs(6));
        let followers = query::chain(&world).followers().to_vec();
        let mut events = Vec::new();

        apply(
            &mut world,
            Command::ActivatePowerUp {
                kind: PowerUpKind::Freeze,
            },
            &mut events,
        );
        apply(
            &mut world,
            Command::ActivatePowerUp {
                kind: PowerUpKind::Repel,
            },
            &mut events,
        );

        for follower in &followers {
            let snapshot = query::agent(&world, *follower).expect("follower alive");
            assert_eq!(snapshot.posture, Posture::Repelled);
            assert_eq!(snapshot.pending_timers, 1, "only the repel timeline remains");
            assert!(snapshot.reversed);
        }

        let _ = advance(&mut world, Duration::from_millis(3_000));
        for follower in &followers {
            let snapshot = query::agent(&world, *follower).expect("follower alive");
            assert!(
                (snapshot.speed - 0.01).abs() > f32::EPSILON,
                "a freeze plateau leaked through after the repel"
            );
            assert!(!snapshot.reversed, "repel window is over");
            assert_eq!(snapshot.posture, Posture::Repelled);
        }
    }
}
