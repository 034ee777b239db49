//! Per-team membership lists.
//!
//! The coordinator owns both rosters and is their only writer. Units read
//! them through shared references during targeting and crowd checks.

use serde::{Deserialize, Serialize};

use crate::components::{Team, UnitId};

/// Ordered list of the live members of one side.
///
/// Order is insertion order and is never shuffled; targeting ties are
/// broken by it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Roster {
    members: Vec<UnitId>,
}

impl Roster {
    /// Create an empty roster.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            members: Vec::new(),
        }
    }

    /// Append a member. Duplicates are ignored.
    pub fn add(&mut self, id: UnitId) {
        if !self.members.contains(&id) {
            self.members.push(id);
        }
    }

    /// Remove a member, preserving the order of the rest.
    /// Returns whether the id was present.
    pub fn remove(&mut self, id: UnitId) -> bool {
        match self.members.iter().position(|&m| m == id) {
            Some(index) => {
                self.members.remove(index);
                true
            }
            None => false,
        }
    }

    /// Check membership.
    #[must_use]
    pub fn contains(&self, id: UnitId) -> bool {
        self.members.contains(&id)
    }

    /// Members in roster order.
    #[must_use]
    pub fn members(&self) -> &[UnitId] {
        &self.members
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if no members remain.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Remove every member.
    pub fn clear(&mut self) {
        self.members.clear();
    }
}

/// Both sides' rosters.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rosters {
    a: Roster,
    b: Roster,
}

impl Rosters {
    /// Roster of a team.
    #[must_use]
    pub const fn of(&self, team: Team) -> &Roster {
        match team {
            Team::A => &self.a,
            Team::B => &self.b,
        }
    }

    /// Mutable roster of a team.
    pub fn of_mut(&mut self, team: Team) -> &mut Roster {
        match team {
            Team::A => &mut self.a,
            Team::B => &mut self.b,
        }
    }

    /// Roster a member of `team` fights against.
    #[must_use]
    pub const fn enemies_of(&self, team: Team) -> &Roster {
        self.of(team.opponent())
    }

    /// Empty both rosters.
    pub fn clear(&mut self) {
        self.a.clear();
        self.b.clear();
    }

    /// Teams whose roster is empty.
    #[must_use]
    pub fn empty_teams(&self) -> Vec<Team> {
        [Team::A, Team::B]
            .into_iter()
            .filter(|&team| self.of(team).is_empty())
            .collect()
    }
}
