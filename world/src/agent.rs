//! State carried by every agent regardless of role.

use glam::Vec2;
use tailchase_core::{
    AgentId, AgentSnapshot, AnchorId, Collider, Posture, Role, Tint, Vitality, WorldPoint,
    WorldSize,
};

use crate::{grid::Membership, target::Target, timeline::TimerGroup};

/// Supernova progress of a former lead follower.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub(crate) struct Spiral {
    /// Pulses elapsed in the current revolution.
    pub(crate) count: u32,
    /// Visual glow overriding the vitality intensity.
    pub(crate) glow: f32,
}

/// Tagged-variant agent. Role-specific behaviour lives in the role table.
#[derive(Clone, Debug)]
pub(crate) struct Agent {
    pub(crate) id: AgentId,
    pub(crate) role: Role,
    pub(crate) position: Vec2,
    pub(crate) size: Vec2,
    pub(crate) speed: f32,
    pub(crate) update_rate: f32,
    pub(crate) target: Target,
    pub(crate) membership: Membership,
    pub(crate) timers: TimerGroup,
    pub(crate) vitality: Vitality,
    pub(crate) posture: Posture,
    pub(crate) tint: Tint,
    pub(crate) rotation: f32,
    pub(crate) is_lead: bool,
    pub(crate) empowered: bool,
    /// Sentinel point owned by the agent, released when it is destroyed.
    pub(crate) anchor: Option<AnchorId>,
    pub(crate) spiral: Option<Spiral>,
    collider: Collider,
    last_seen_tick: u64,
    last_processed_tick: Option<u64>,
}

impl Agent {
    pub(crate) fn new(id: AgentId, role: Role, position: Vec2, size: f32, speed: f32) -> Self {
        let mut agent = Self {
            id,
            role,
            position,
            size: Vec2::splat(size),
            speed,
            update_rate: 1.0,
            target: Target::default(),
            membership: Membership::default(),
            timers: TimerGroup::default(),
            vitality: Vitality::Full,
            posture: Posture::Roaming,
            tint: Tint::WHITE,
            rotation: 0.0,
            is_lead: false,
            empowered: false,
            anchor: None,
            spiral: None,
            collider: Collider::default(),
            last_seen_tick: 0,
            last_processed_tick: None,
        };
        agent.target.hold();
        agent.sync_collider();
        agent
    }

    /// Returns true the first time it is called for a given world tick.
    pub(crate) fn first_pass(&mut self, tick: u64) -> bool {
        if self.last_seen_tick == tick {
            return false;
        }
        self.last_seen_tick = tick;
        true
    }

    /// Copies the cell's rate, capped at the ticks elapsed since the agent was
    /// last processed so agents crossing into a faster cell never double-step.
    pub(crate) fn adopt_update_rate(&mut self, cell_rate: f32, tick: u64) {
        let rate = match self.last_processed_tick {
            Some(last) => cell_rate.min(tick.saturating_sub(last).max(1) as f32),
            None => cell_rate,
        };
        self.update_rate = rate;
        self.last_processed_tick = Some(tick);
    }

    pub(crate) fn half_extent(&self) -> Vec2 {
        self.size * 0.5
    }

    /// Keeps the visual bounds inside a `width` x `height` world.
    pub(crate) fn clamp_to(&mut self, width: f32, height: f32) {
        let half = self.half_extent();
        if self.position.x > width - half.x {
            self.position.x = width - half.x;
        } else if self.position.x < half.x {
            self.position.x = half.x;
        }
        if self.position.y > height - half.y {
            self.position.y = height - half.y;
        } else if self.position.y < half.y {
            self.position.y = half.y;
        }
    }

    /// Aligns the collider with the current position and size.
    pub(crate) fn sync_collider(&mut self) {
        self.collider = Collider {
            center: point(self.position),
            radius: self.size.x.max(self.size.y) * 0.5,
        };
    }

    pub(crate) fn collider(&self) -> &Collider {
        &self.collider
    }

    /// Intensity adapters should render; a supernova glows on its own scale.
    pub(crate) fn intensity(&self) -> f32 {
        self.spiral
            .map_or_else(|| self.vitality.intensity(), |spiral| spiral.glow)
    }

    pub(crate) fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            role: self.role,
            position: point(self.position),
            size: WorldSize::new(self.size.x, self.size.y),
            speed: self.speed,
            update_rate: self.update_rate,
            vitality: self.vitality,
            posture: self.posture,
            intensity: self.intensity(),
            tint: self.tint,
            rotation: self.rotation,
            is_lead: self.is_lead,
            empowered: self.empowered,
            target: self.target.reference(),
            reversed: self.target.reversed(),
            distance_sq: self.target.distance_sq(),
            active_cells: self.membership.active_cells().to_vec(),
            pending_timers: self.timers.len(),
        }
    }
}

pub(crate) fn point(position: Vec2) -> WorldPoint {
    WorldPoint::new(position.x, position.y)
}

pub(crate) fn vec(point: WorldPoint) -> Vec2 {
    Vec2::new(point.x(), point.y())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn agent(size: f32) -> Agent {
        Agent::new(AgentId::new(0), Role::Friend, Vec2::ZERO, size, 1.0)
    }

    #[test]
    fn clamp_keeps_visual_bounds_inside_world() {
        let positions = [
            Vec2::new(-50.0, -50.0),
            Vec2::new(0.0, 500.0),
            Vec2::new(400.0, 10.0),
            Vec2::new(1_000.0, 1_000.0),
            Vec2::new(150.0, 100.0),
        ];
        for position in positions {
            let mut agent = agent(20.0);
            agent.position = position;
            agent.clamp_to(300.0, 200.0);
            assert!(
                (10.0..=290.0).contains(&agent.position.x),
                "x escaped for {position:?}: {:?}",
                agent.position
            );
            assert!(
                (10.0..=190.0).contains(&agent.position.y),
                "y escaped for {position:?}: {:?}",
                agent.position
            );
        }
    }

    #[test]
    fn first_pass_runs_once_per_tick() {
        let mut agent = agent(8.0);
        assert!(agent.first_pass(1));
        assert!(!agent.first_pass(1));
        assert!(agent.first_pass(2));
    }

    #[test]
    fn update_rate_never_exceeds_elapsed_ticks() {
        let mut agent = agent(8.0);
        agent.adopt_update_rate(2.0, 4);
        assert!((agent.update_rate - 2.0).abs() < f32::EPSILON);
        agent.adopt_update_rate(2.0, 5);
        assert!((agent.update_rate - 1.0).abs() < f32::EPSILON);
        agent.adopt_update_rate(2.0, 7);
        assert!((agent.update_rate - 2.0).abs() < f32::EPSILON);
    }

    #[test]
    fn collider_tracks_position_and_largest_side() {
        let mut agent = agent(8.0);
        agent.size = Vec2::new(8.0, 20.0);
        agent.position = Vec2::new(3.0, 4.0);
        agent.sync_collider();
        assert_eq!(agent.collider().center, WorldPoint::new(3.0, 4.0));
        assert!((agent.collider().radius - 10.0).abs() < f32::EPSILON);
    }

    #[test]
    fn supernova_glow_overrides_vitality_intensity() {
        let mut agent = agent(8.0);
        agent.vitality = Vitality::Dormant;
        assert!((agent.intensity() - 0.15).abs() < f32::EPSILON);
        agent.spiral = Some(Spiral {
            count: 0,
            glow: 0.1,
        });
        assert!((agent.intensity() - 0.1).abs() < f32::EPSILON);
    }
}
