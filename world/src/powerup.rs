//! Power-up timelines and the driver that plays them.
//!
//! Every non-terminal timeline ends in [`Action::Reset`]. Entering a timeline
//! cancels whatever the agent had pending, so at most one timeline per agent
//! is ever live. The supernova is the exception: it repeats until the agent
//! is destroyed and ignores resets.

use std::{collections::VecDeque, time::Duration};

use glam::Vec2;
use rand::Rng;
use tailchase_core::{AgentId, Event, Posture, PowerUpKind, Role, TargetRef, Tint, Vitality};

use crate::{
    agent::Spiral,
    roles,
    timeline::{Action, Step, Timeline, TimerJob},
    World,
};

/// Speed multiplier of followers scared by an empowered controlled entity.
const SCARED_SPEED_FACTOR: f32 = 1.25;
/// Speed multiplier of a scared lead follower backing away.
const SCARED_LEAD_FACTOR: f32 = 0.5;
/// Speed of a lead follower while the chain is repelled.
const REPELLED_LEAD_SPEED: f32 = 0.1;

/// Pulses in one full revolution of the supernova spiral.
const SPIRAL_REVOLUTION: u32 = 80;
const SUPERNOVA_INITIAL_GLOW: f32 = 0.1;
const SUPERNOVA_SPEED: f32 = 1.0;
const GLOW_STEP: f32 = 0.000_85;
const GROWTH_STEP: f32 = 0.5;
const ROTATION_STEP: f32 = 0.02;
/// Glow above which the supernova stops flickering.
const BURNOUT_GLOW: f32 = 0.99;

/// Wake-up sequence of a freshly spawned autonomous agent.
pub(crate) fn emergence() -> Timeline {
    VecDeque::from(vec![
        Step::now(Action::Vitality(Vitality::Dormant)),
        Step::now(Action::RandomTint(Tint::WHITE)),
        Step::now(Action::Posture(Posture::Emerging)),
        Step::after(500, Action::Vitality(Vitality::Stirring)),
        Step::after(3_500, Action::Vitality(Vitality::Waking)),
        Step::now(Action::RandomTint(Tint::RED)),
        Step::after(1_000, Action::Reset),
    ])
}

/// Fade back to full strength after an autonomous reset.
pub(crate) fn fade_in() -> Timeline {
    VecDeque::from(vec![
        Step::after(100, Action::Vitality(Vitality::Primed)),
        Step::after(400, Action::Vitality(Vitality::Full)),
    ])
}

fn freeze() -> Timeline {
    VecDeque::from(vec![
        Step::now(Action::Vitality(Vitality::Faded)),
        Step::now(Action::Speed(0.8)),
        Step::now(Action::Posture(Posture::Frozen)),
        Step::after(250, Action::Speed(0.1)),
        Step::after(250, Action::Speed(0.01)),
        Step::now(Action::Vitality(Vitality::Full)),
        Step::after(2_500, Action::Vitality(Vitality::Faded)),
        Step::after(750, Action::Vitality(Vitality::Full)),
        Step::after(500, Action::Vitality(Vitality::Faded)),
        Step::after(250, Action::Vitality(Vitality::Full)),
        Step::after(250, Action::Vitality(Vitality::Faded)),
        Step::after(250, Action::Reset),
    ])
}

fn repel(is_lead: bool) -> Timeline {
    let mut steps = VecDeque::new();
    if is_lead {
        steps.push_back(Step::now(Action::Speed(REPELLED_LEAD_SPEED)));
    }
    steps.extend([
        Step::now(Action::Reverse(true)),
        Step::now(Action::Vitality(Vitality::Faded)),
        Step::now(Action::Tint(Tint::YELLOW)),
        Step::now(Action::Posture(Posture::Repelled)),
        Step::after(2_500, Action::Reverse(false)),
        Step::after(2_500, Action::Reset),
    ]);
    steps
}

/// Scared followers have no timeline of their own; the controlled entity's
/// reset brings them back.
fn scared(is_lead: bool, friend_speed: f32) -> Timeline {
    let factor = if is_lead {
        SCARED_LEAD_FACTOR
    } else {
        SCARED_SPEED_FACTOR
    };
    let mut steps = VecDeque::from(vec![
        Step::now(Action::Speed(friend_speed * factor)),
        Step::now(Action::Posture(Posture::Scared)),
    ]);
    if is_lead {
        steps.extend([
            Step::now(Action::Reverse(true)),
            Step::now(Action::Tint(Tint::BLUE)),
            Step::now(Action::Vitality(Vitality::Primed)),
        ]);
    }
    steps
}

/// Flicker shared by the tail of Munch and Phase.
fn flicker_out(steps: &mut Timeline) {
    steps.extend([
        Step::after(3_000, Action::Vitality(Vitality::Faded)),
        Step::after(750, Action::Vitality(Vitality::Primed)),
        Step::after(500, Action::Vitality(Vitality::Faded)),
        Step::after(250, Action::Vitality(Vitality::Primed)),
        Step::after(250, Action::Vitality(Vitality::Faded)),
        Step::after(250, Action::Reset),
    ]);
}

fn munch() -> Timeline {
    let mut steps = VecDeque::from(vec![
        Step::now(Action::Vitality(Vitality::Guarded)),
        Step::now(Action::Tint(Tint::MUNCH)),
        Step::now(Action::Empowered(true)),
        Step::now(Action::Posture(Posture::Empowered)),
    ]);
    flicker_out(&mut steps);
    steps
}

fn phase() -> Timeline {
    let mut steps = VecDeque::from(vec![
        Step::now(Action::Vitality(Vitality::Faded)),
        Step::now(Action::Tint(Tint::PHASE)),
        Step::now(Action::Posture(Posture::Phased)),
    ]);
    flicker_out(&mut steps);
    steps
}

/// Offset applied to the supernova core on the given pulse of a revolution.
fn spiral_step(count: u32) -> Vec2 {
    match count {
        0..=20 => Vec2::new(2.0, 1.0),
        21..=40 => Vec2::new(-1.0, 2.0),
        41..=60 => Vec2::new(-2.0, -1.0),
        _ => Vec2::new(1.0, -2.0),
    }
}

impl World {
    /// Starts a power-up on the controlled entity.
    ///
    /// The controlled entity resets first, which resets the chain with it;
    /// the power-up then starts its own timelines.
    pub(crate) fn activate_power_up(&mut self, kind: PowerUpKind, out_events: &mut Vec<Event>) {
        let Some(pilot) = self.controlled else {
            log::debug!("power-up {kind:?} ignored: no controlled entity");
            return;
        };

        (roles::hooks(Role::Controlled).reset)(self, pilot);

        let friend_speed = self.config.ai.friend_speed;
        let followers = self.chain.followers().to_vec();
        match kind {
            PowerUpKind::Freeze => {
                for follower in followers {
                    self.enter_timeline(follower, freeze(), friend_speed);
                }
            }
            PowerUpKind::Repel => {
                for follower in followers {
                    let is_lead = self.agent(follower).is_some_and(|friend| friend.is_lead);
                    self.enter_timeline(follower, repel(is_lead), friend_speed);
                }
            }
            PowerUpKind::Munch => {
                self.drive(pilot, munch(), false);
                for follower in followers {
                    let is_lead = self.agent(follower).is_some_and(|friend| friend.is_lead);
                    self.enter_timeline(follower, scared(is_lead, friend_speed), friend_speed);
                }
            }
            PowerUpKind::Phase => self.drive(pilot, phase(), false),
        }

        log::info!("power-up {kind:?} activated");
        out_events.push(Event::PowerUpActivated { kind });
    }

    /// Cancels what a follower had pending and starts `steps` from its baseline.
    fn enter_timeline(&mut self, id: AgentId, steps: Timeline, speed: f32) {
        if self.settle_baseline(id, speed) {
            self.drive(id, steps, false);
        }
    }

    /// Plays `steps` for `id` until the next delayed step, which is scheduled.
    ///
    /// When `resumed` is set the head step came due on a timer and runs
    /// regardless of its delay. The driver stops as soon as the agent dies or
    /// its timers are cancelled by one of the steps.
    pub(crate) fn drive(&mut self, id: AgentId, mut steps: Timeline, resumed: bool) {
        let Some(epoch) = self.agent(id).map(|agent| agent.timers.epoch()) else {
            return;
        };

        let mut due = resumed;
        while let Some(step) = steps.front().copied() {
            if !due && step.delay() > Duration::ZERO {
                if let Some(agent) = crate::slot_mut(&mut self.agents, id) {
                    let _ = self.scheduler.schedule(
                        &mut agent.timers,
                        id,
                        step.delay(),
                        TimerJob::Timeline(steps),
                    );
                }
                return;
            }

            due = false;
            let _ = steps.pop_front();
            self.perform(id, step.action());

            match self.agent(id) {
                Some(agent) if agent.timers.epoch() == epoch => {}
                _ => return,
            }
        }
    }

    fn perform(&mut self, id: AgentId, action: Action) {
        let rng = &mut self.rng;
        let Some(agent) = crate::slot_mut(&mut self.agents, id) else {
            return;
        };
        match action {
            Action::Speed(speed) => agent.speed = speed,
            Action::Vitality(vitality) => agent.vitality = vitality,
            Action::Tint(tint) => agent.tint = tint,
            Action::RandomTint(base) => agent.tint = base.scaled(rng.gen()),
            Action::Reverse(reversed) => agent.target.set_reversed(reversed),
            Action::Posture(posture) => agent.posture = posture,
            Action::Empowered(empowered) => agent.empowered = empowered,
            Action::Reset => {
                let role = agent.role;
                (roles::hooks(role).reset)(self, id);
            }
        }
    }

    /// Turns the lead follower into a supernova orbiting a core placed at `origin`.
    pub(crate) fn ignite_supernova(
        &mut self,
        lead: AgentId,
        origin: Vec2,
        out_events: &mut Vec<Event>,
    ) {
        let period = Duration::from_millis(self.config.power_ups.supernova_period_millis);
        if self.agent(lead).is_none() {
            return;
        }
        self.cancel_timers(lead);
        let core = self.anchors.create(origin);

        let Some(agent) = crate::slot_mut(&mut self.agents, lead) else {
            return;
        };
        if let Some(previous) = agent.anchor.replace(core) {
            self.anchors.release(previous);
        }
        agent.target.set_reference(Some(TargetRef::Anchor(core)));
        agent.target.set_reversed(false);
        agent.spiral = Some(Spiral {
            count: 0,
            glow: SUPERNOVA_INITIAL_GLOW,
        });
        agent.speed = SUPERNOVA_SPEED;
        agent.tint = Tint::SUPERNOVA;
        agent.posture = Posture::Supernova;
        agent.vitality = Vitality::Dormant;
        let _ = self.scheduler.schedule_repeating(
            &mut agent.timers,
            lead,
            period,
            TimerJob::SupernovaPulse,
        );

        log::info!("agent {} ignited a supernova", lead.get());
        out_events.push(Event::SupernovaIgnited { agent: lead });
    }

    /// Advances a supernova by one pulse: the core spirals, the agent grows,
    /// turns and brightens.
    pub(crate) fn pulse_supernova(&mut self, id: AgentId) {
        let rng = &mut self.rng;
        let Some(agent) = crate::slot_mut(&mut self.agents, id) else {
            return;
        };
        let Some(spiral) = agent.spiral.as_mut() else {
            return;
        };

        spiral.count += 1;
        let offset = spiral_step(spiral.count);
        if spiral.count >= SPIRAL_REVOLUTION {
            spiral.count = 0;
        }
        spiral.glow += GLOW_STEP;
        let glow = spiral.glow;

        agent.size += Vec2::splat(GROWTH_STEP);
        agent.rotation += ROTATION_STEP;
        agent.tint = if glow <= BURNOUT_GLOW {
            Tint::SUPERNOVA.scaled(rng.gen())
        } else {
            Tint::SUPERNOVA_BURNOUT
        };
        agent.sync_collider();

        if let Some(core) = agent.anchor {
            if let Some(position) = self.anchors.position(core) {
                self.anchors.set_position(core, position + offset);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_delay(steps: &Timeline) -> Duration {
        steps.iter().map(|step| step.delay()).sum()
    }

    #[test]
    fn timelines_end_in_reset() {
        for steps in [emergence(), freeze(), repel(true), repel(false), munch(), phase()] {
            assert_eq!(
                steps.back().map(|step| step.action()),
                Some(Action::Reset),
                "timeline {steps:?} must end in a reset"
            );
        }
    }

    #[test]
    fn timelines_last_as_long_as_the_game_feel_demands() {
        assert_eq!(total_delay(&emergence()), Duration::from_millis(5_000));
        assert_eq!(total_delay(&freeze()), Duration::from_millis(5_000));
        assert_eq!(total_delay(&repel(false)), Duration::from_millis(5_000));
        assert_eq!(total_delay(&munch()), Duration::from_millis(5_000));
        assert_eq!(total_delay(&fade_in()), Duration::from_millis(500));
    }

    #[test]
    fn freeze_slows_through_three_plateaus() {
        let speeds: Vec<f32> = freeze()
            .iter()
            .filter_map(|step| match step.action() {
                Action::Speed(speed) => Some(speed),
                _ => None,
            })
            .collect();
        assert_eq!(speeds, vec![0.8, 0.1, 0.01]);
    }

    #[test]
    fn only_the_lead_slows_when_repelled() {
        let slows = |steps: Timeline| {
            steps
                .iter()
                .any(|step| step.action() == Action::Speed(REPELLED_LEAD_SPEED))
        };
        assert!(slows(repel(true)));
        assert!(!slows(repel(false)));
    }

    #[test]
    fn scared_lead_flees_while_others_speed_up() {
        let lead = scared(true, 2.0);
        assert!(lead.contains(&Step::now(Action::Reverse(true))));
        assert!(lead.contains(&Step::now(Action::Speed(1.0))));
        let follower = scared(false, 2.0);
        assert!(follower.contains(&Step::now(Action::Speed(2.5))));
        assert!(!follower.contains(&Step::now(Action::Reverse(true))));
    }

    #[test]
    fn spiral_walks_four_phases() {
        assert_eq!(spiral_step(1), Vec2::new(2.0, 1.0));
        assert_eq!(spiral_step(20), Vec2::new(2.0, 1.0));
        assert_eq!(spiral_step(21), Vec2::new(-1.0, 2.0));
        assert_eq!(spiral_step(41), Vec2::new(-2.0, -1.0));
        assert_eq!(spiral_step(61), Vec2::new(1.0, -2.0));
        assert_eq!(spiral_step(80), Vec2::new(1.0, -2.0));

        let net = (1..=SPIRAL_REVOLUTION)
            .map(spiral_step)
            .fold(Vec2::ZERO, |total, offset| total + offset);
        assert_eq!(net, Vec2::ZERO, "each revolution closes the loop");
    }
}
