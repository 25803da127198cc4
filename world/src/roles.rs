//! Capability table selecting role-specific behaviour.
//!
//! Agents are a single tagged type; whatever differs between the controlled
//! entity, followers and foes is a strategy function looked up here by role.

use rand::Rng;
use tailchase_core::{
    AgentId, CellId, Event, Posture, Role, SimulationConfig, TargetRef, Tint, Vitality,
};

use crate::{powerup, World};

/// Strategy functions for one role.
pub(crate) struct RoleHooks {
    /// Adjusts speed, target or tint before the movement pipeline runs.
    pub(crate) steer: fn(&mut World, CellId, AgentId),
    /// Checks contacts against the controlled entity of the cell.
    pub(crate) interact: fn(&mut World, CellId, AgentId, &mut Vec<Event>),
    /// Restores the role's baseline, cancelling pending timers first.
    pub(crate) reset: fn(&mut World, AgentId),
    /// Runs before the shared destroy path releases the agent.
    pub(crate) on_destroy: fn(&mut World, AgentId, &mut Vec<Event>),
    /// Frames between direction recomputations.
    pub(crate) direction_rate: fn(&SimulationConfig) -> u32,
    /// Frames between cell membership re-evaluations.
    pub(crate) membership_rate: fn(&SimulationConfig) -> u32,
}

static CONTROLLED: RoleHooks = RoleHooks {
    steer: steer_controlled,
    interact: ignore_contacts,
    reset: reset_controlled,
    on_destroy: controlled_destroyed,
    direction_rate: player_direction_rate,
    membership_rate: player_membership_rate,
};

static FRIEND: RoleHooks = RoleHooks {
    steer: tint_friend,
    interact: World::check_contact,
    reset: reset_friend,
    on_destroy: keep_quiet,
    direction_rate: ai_direction_rate,
    membership_rate: ai_membership_rate,
};

static FOE: RoleHooks = RoleHooks {
    steer: chase_controlled,
    interact: World::check_contact,
    reset: reset_foe,
    on_destroy: keep_quiet,
    direction_rate: ai_direction_rate,
    membership_rate: ai_membership_rate,
};

/// Looks up the capability table entry for `role`.
pub(crate) fn hooks(role: Role) -> &'static RoleHooks {
    match role {
        Role::Controlled => &CONTROLLED,
        Role::Friend => &FRIEND,
        Role::Foe => &FOE,
    }
}

fn player_direction_rate(config: &SimulationConfig) -> u32 {
    config.player.direction_update_rate
}

fn player_membership_rate(config: &SimulationConfig) -> u32 {
    config.player.cell_update_rate
}

fn ai_direction_rate(config: &SimulationConfig) -> u32 {
    config.ai.direction_update_rate
}

fn ai_membership_rate(config: &SimulationConfig) -> u32 {
    config.ai.cell_update_rate
}

fn ignore_contacts(_: &mut World, _: CellId, _: AgentId, _: &mut Vec<Event>) {}

fn keep_quiet(_: &mut World, _: AgentId, _: &mut Vec<Event>) {}

/// Picks the speed tier matching the distance to the held pointer.
fn steer_controlled(world: &mut World, _: CellId, id: AgentId) {
    if !world.pointer_held {
        return;
    }
    let player = &world.config.player;
    let Some(pilot) = crate::slot_mut(&mut world.agents, id) else {
        return;
    };
    if pilot.speed != 0.0 {
        pilot.speed = player.speed_for(pilot.target.distance_sq());
    }
}

/// Per-tick follower colouring.
fn tint_friend(world: &mut World, _: CellId, id: AgentId) {
    let alert_distance_sq = world.config.ai.lead_alert_distance_sq;
    let rng = &mut world.rng;
    let Some(friend) = crate::slot_mut(&mut world.agents, id) else {
        return;
    };

    let reversed = friend.target.reversed();
    if friend.is_lead
        && friend.target.distance_sq() < alert_distance_sq
        && friend.vitality.is_full()
    {
        friend.tint = Tint::RED;
    } else if friend.posture != Posture::Supernova && !reversed {
        friend.tint = Tint::WHITE.scaled(rng.gen());
    }

    if reversed && !friend.is_lead {
        friend.vitality = Vitality::Faded;
        friend.tint = Tint::YELLOW;
    }
}

/// Foes hunt the closest controlled entity around them.
fn chase_controlled(world: &mut World, cell: CellId, id: AgentId) {
    let rate = world.config.ai.direction_update_rate;
    let admitted = world
        .grid
        .cell_mut(cell)
        .is_some_and(|cell| cell.frames_between_updates(rate));
    if !admitted {
        return;
    }

    let prey = world
        .closest_dynamic(id, Role::Controlled)
        .map(|nearest| TargetRef::Agent(nearest.agent));
    if let Some(foe) = world.agent_mut(id) {
        foe.target.set_reference(prey);
    }
}

fn reset_controlled(world: &mut World, id: AgentId) {
    world.cancel_timers(id);
    if let Some(pilot) = world.agent_mut(id) {
        pilot.vitality = Vitality::Full;
        pilot.tint = Tint::BLUE;
        pilot.empowered = false;
        pilot.posture = Posture::Roaming;
    }

    let followers = world.chain.followers().to_vec();
    for follower in followers {
        reset_friend(world, follower);
    }
}

fn reset_friend(world: &mut World, id: AgentId) {
    let speed = world.config.ai.friend_speed;
    reset_autonomous(world, id, speed);
}

fn reset_foe(world: &mut World, id: AgentId) {
    let speed = world.config.ai.foe_speed;
    reset_autonomous(world, id, speed);
}

fn reset_autonomous(world: &mut World, id: AgentId, speed: f32) {
    if !world.settle_baseline(id, speed) {
        return;
    }
    world.drive(id, powerup::fade_in(), false);
}

impl World {
    /// Cancels pending timers and restores an autonomous agent's baseline
    /// without scheduling anything. Returns false for supernovas, which never
    /// reset.
    pub(crate) fn settle_baseline(&mut self, id: AgentId, speed: f32) -> bool {
        match self.agent(id) {
            Some(agent) if agent.posture != Posture::Supernova => {}
            _ => return false,
        }
        self.cancel_timers(id);

        let rng = &mut self.rng;
        let Some(agent) = crate::slot_mut(&mut self.agents, id) else {
            return false;
        };
        agent.target.set_reversed(false);
        agent.tint = Tint::WHITE.scaled(rng.gen());
        agent.speed = speed;
        agent.posture = Posture::Roaming;
        true
    }

    pub(crate) fn cancel_timers(&mut self, id: AgentId) {
        if let Some(agent) = crate::slot_mut(&mut self.agents, id) {
            self.scheduler.cancel_all(&mut agent.timers);
        }
    }
}

/// The lead follower goes supernova and the game ends, once.
fn controlled_destroyed(world: &mut World, id: AgentId, out_events: &mut Vec<Event>) {
    let Some(origin) = world.agent(id).map(|pilot| pilot.position) else {
        return;
    };
    if let Some(lead) = world.chain.lead() {
        world.ignite_supernova(lead, origin, out_events);
    }
    if !world.game_over {
        world.game_over = true;
        log::info!("game over after {} ticks", world.tick_count);
        out_events.push(Event::GameOver);
    }
}
