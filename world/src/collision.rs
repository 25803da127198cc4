//! Contact checks between autonomous agents and the controlled entity.

use tailchase_core::{AgentId, CellId, Collider, Event, Role};

use crate::World;

/// Points awarded for catching a single follower or foe.
const CAPTURE_POINTS: u32 = 10;
/// Points per follower when the whole chain is devoured, before the streak multiplier.
const CHAIN_POINTS_PER_FOLLOWER: u32 = 10;

/// Default overlap predicate: two circles touch when their centres are closer
/// than the sum of their radii.
#[must_use]
pub fn circles_overlap(a: &Collider, b: &Collider) -> bool {
    let reach = a.radius + b.radius;
    a.center.distance_squared(b.center) < reach * reach
}

/// What a contact between an agent and the controlled entity results in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Outcome {
    DevourChain,
    Capture,
    Loss,
    Nothing,
}

impl World {
    /// Tests the agent against the cell's controlled entity at the interact rate
    /// and resolves the contact.
    pub(crate) fn check_contact(&mut self, cell: CellId, id: AgentId, out_events: &mut Vec<Event>) {
        let rate = self.config.ai.interact_update_rate;
        let Some(cell) = self.grid.cell_mut(cell) else {
            return;
        };
        if !cell.frames_between_updates(rate) {
            return;
        }
        let Some(controlled) = cell.members().list(Role::Controlled).first().copied() else {
            return;
        };

        let outcome = match (self.agent(id), self.agent(controlled)) {
            (Some(agent), Some(pilot)) if (self.collide)(agent.collider(), pilot.collider()) => {
                if pilot.empowered {
                    if agent.role == Role::Friend && agent.is_lead {
                        if agent.vitality.is_lead_catchable() {
                            Outcome::DevourChain
                        } else {
                            Outcome::Nothing
                        }
                    } else if agent.vitality.is_catchable() {
                        Outcome::Capture
                    } else {
                        Outcome::Nothing
                    }
                } else if agent.vitality.is_full() && pilot.vitality.is_full() {
                    Outcome::Loss
                } else {
                    Outcome::Nothing
                }
            }
            _ => Outcome::Nothing,
        };

        match outcome {
            Outcome::DevourChain => self.devour_chain(out_events),
            Outcome::Capture => self.capture(id, out_events),
            Outcome::Loss => {
                log::debug!("agent {} caught the controlled entity", id.get());
                self.destroy(controlled, out_events);
            }
            Outcome::Nothing => {}
        }
    }

    /// Destroys every follower and scores them with the growing kill streak.
    fn devour_chain(&mut self, out_events: &mut Vec<Event>) {
        self.kill_count += 1;
        let followers = self.chain.len() as u32;
        let points = followers * CHAIN_POINTS_PER_FOLLOWER * self.kill_count;
        log::info!(
            "chain of {followers} devoured, streak {}, {points} points",
            self.kill_count
        );
        out_events.push(Event::ChainDevoured {
            followers,
            kill_streak: self.kill_count,
        });
        out_events.push(Event::ScoreAwarded { points });

        for follower in self.chain.drain() {
            self.destroy(follower, out_events);
        }
    }

    /// Catches a single non-lead follower or a foe.
    fn capture(&mut self, id: AgentId, out_events: &mut Vec<Event>) {
        let Some(role) = self.agent(id).map(|agent| agent.role) else {
            return;
        };
        out_events.push(match role {
            Role::Foe => Event::FoeCaptured { agent: id },
            _ => Event::FollowerCaptured { agent: id },
        });
        out_events.push(Event::ScoreAwarded {
            points: CAPTURE_POINTS,
        });
        self.destroy(id, out_events);
    }
}
