//! Ordered follower list trailing the controlled entity.

use tailchase_core::{AgentId, TargetRef};

/// Followers in chain order; index 0 is the lead.
#[derive(Clone, Debug, Default)]
pub(crate) struct Chain {
    followers: Vec<AgentId>,
}

/// Pursuit link a follower must hold for the chain to stay connected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) struct Link {
    pub(crate) follower: AgentId,
    pub(crate) target: Option<TargetRef>,
    pub(crate) is_lead: bool,
}

impl Chain {
    pub(crate) fn followers(&self) -> &[AgentId] {
        &self.followers
    }

    pub(crate) fn len(&self) -> usize {
        self.followers.len()
    }

    pub(crate) fn lead(&self) -> Option<AgentId> {
        self.followers.first().copied()
    }

    /// Appends a follower and returns the entity it must pursue.
    pub(crate) fn push(&mut self, agent: AgentId, head: Option<AgentId>) -> Link {
        let link = Link {
            follower: agent,
            target: self.followers.last().copied().or(head).map(TargetRef::Agent),
            is_lead: self.followers.is_empty(),
        };
        self.followers.push(agent);
        link
    }

    /// Removes a follower, keeping the order of the remainder.
    pub(crate) fn remove(&mut self, agent: AgentId) -> bool {
        match self.followers.iter().position(|follower| *follower == agent) {
            Some(index) => {
                let _ = self.followers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Empties the chain, returning the followers in order.
    pub(crate) fn drain(&mut self) -> Vec<AgentId> {
        std::mem::take(&mut self.followers)
    }

    /// Links every follower must hold: the lead pursues `head`, every other
    /// follower pursues its predecessor.
    pub(crate) fn links(&self, head: Option<AgentId>) -> impl Iterator<Item = Link> + '_ {
        self.followers.iter().enumerate().map(move |(index, follower)| {
            let target = match index.checked_sub(1) {
                Some(previous) => self.followers.get(previous).copied(),
                None => head,
            };
            Link {
                follower: *follower,
                target: target.map(TargetRef::Agent),
                is_lead: index == 0,
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain_of(count: u32) -> Chain {
        let mut chain = Chain::default();
        for value in 1..=count {
            let _ = chain.push(AgentId::new(value), Some(AgentId::new(0)));
        }
        chain
    }

    fn assert_linked(chain: &Chain) {
        let head = AgentId::new(0);
        let links: Vec<Link> = chain.links(Some(head)).collect();
        for (index, link) in links.iter().enumerate() {
            let expected = if index == 0 {
                head
            } else {
                chain.followers()[index - 1]
            };
            assert_eq!(
                link.target,
                Some(TargetRef::Agent(expected)),
                "follower {index} lost its predecessor"
            );
            assert_eq!(link.is_lead, index == 0);
        }
    }

    #[test]
    fn push_links_to_predecessor_or_head() {
        let mut chain = Chain::default();
        let head = Some(AgentId::new(0));
        let lead = chain.push(AgentId::new(1), head);
        assert!(lead.is_lead);
        assert_eq!(lead.target, Some(TargetRef::Agent(AgentId::new(0))));

        let second = chain.push(AgentId::new(2), head);
        assert!(!second.is_lead);
        assert_eq!(second.target, Some(TargetRef::Agent(AgentId::new(1))));
    }

    #[test]
    fn interior_removal_closes_the_gap() {
        let mut chain = chain_of(5);
        assert!(chain.remove(AgentId::new(3)));
        assert_eq!(chain.len(), 4);
        assert!(!chain.followers().contains(&AgentId::new(3)));
        assert_linked(&chain);
    }

    #[test]
    fn lead_removal_promotes_the_next_follower() {
        let mut chain = chain_of(3);
        assert!(chain.remove(AgentId::new(1)));
        assert_eq!(chain.lead(), Some(AgentId::new(2)));
        assert_linked(&chain);
    }

    #[test]
    fn drain_empties_the_chain_in_order() {
        let mut chain = chain_of(3);
        assert_eq!(
            chain.drain(),
            vec![AgentId::new(1), AgentId::new(2), AgentId::new(3)]
        );
        assert_eq!(chain.len(), 0);
        assert!(!chain.remove(AgentId::new(1)));
    }
}
