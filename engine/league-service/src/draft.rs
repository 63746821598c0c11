//! In-progress lineup selection

use crate::credits::Credits;
use crate::lineup::LineupEntry;
use crate::player::Player;
use scoring_engine::Role;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

/// Draft maps every role to a fixed-capacity list of slots.
///
/// Capacities come from `Role::required_count` (two for ALA, one for the
/// rest). A player id occupies at most one slot across the whole draft.
/// Deserialized drafts are rebuilt slot by slot, so they hold the same
/// guarantees as drafts built through `place`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "DraftSlots", into = "DraftSlots")]
pub struct Draft {
    slots: BTreeMap<Role, Vec<Option<Player>>>,
}

/// Wire shape of a draft
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DraftSlots {
    pub slots: BTreeMap<Role, Vec<Option<Player>>>,
}

/// A serialized draft that breaks the formation rules
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DraftError {
    #[error("{player} is listed under {listed} but plays {role}")]
    WrongRole { player: Uuid, listed: Role, role: Role },

    #[error("Player {0} appears more than once")]
    Duplicate(Uuid),

    #[error("Too many {0} players")]
    RoleOverfilled(Role),
}

impl From<Draft> for DraftSlots {
    fn from(draft: Draft) -> Self {
        Self { slots: draft.slots }
    }
}

impl TryFrom<DraftSlots> for Draft {
    type Error = DraftError;

    fn try_from(wire: DraftSlots) -> Result<Self, Self::Error> {
        let mut draft = Draft::new();
        for (listed, players) in wire.slots {
            for player in players.into_iter().flatten() {
                if player.role != listed {
                    return Err(DraftError::WrongRole { player: player.id, listed, role: player.role });
                }
                if draft.contains(player.id) {
                    return Err(DraftError::Duplicate(player.id));
                }
                draft.place(player).map_err(|p| DraftError::RoleOverfilled(p.role))?;
            }
        }
        Ok(draft)
    }
}

impl Default for Draft {
    fn default() -> Self {
        Self::new()
    }
}

impl Draft {
    /// Create an empty draft
    pub fn new() -> Self {
        let slots = Role::ALL.iter().map(|role| (*role, vec![None; role.required_count()])).collect();
        Self { slots }
    }

    /// Slots of one role, in fill order
    pub fn slots(&self, role: Role) -> &[Option<Player>] {
        self.slots.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Occupied players in formation order
    pub fn players(&self) -> impl Iterator<Item = &Player> {
        self.slots.values().flat_map(|slots| slots.iter().flatten())
    }

    pub fn contains(&self, player_id: Uuid) -> bool {
        self.players().any(|p| p.id == player_id)
    }

    pub fn occupied(&self, role: Role) -> usize {
        self.slots(role).iter().filter(|slot| slot.is_some()).count()
    }

    pub fn len(&self) -> usize {
        self.players().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Every role has exactly its required number of players
    pub fn is_complete(&self) -> bool {
        Role::ALL.iter().all(|role| self.occupied(*role) == role.required_count())
    }

    /// Sum of the prices of all occupied slots
    pub fn cost(&self) -> Credits {
        self.players().map(|p| p.price).sum()
    }

    /// Put a player in the first empty slot of its role.
    ///
    /// Hands the player back when the role has no free slot.
    pub(crate) fn place(&mut self, player: Player) -> Result<(), Player> {
        let Some(slots) = self.slots.get_mut(&player.role) else {
            return Err(player);
        };
        match slots.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(player);
                Ok(())
            }
            None => Err(player),
        }
    }

    /// Empty the slot holding `player_id`
    pub(crate) fn take(&mut self, player_id: Uuid) -> Option<Player> {
        self.slots
            .values_mut()
            .flat_map(|slots| slots.iter_mut())
            .find(|slot| slot.as_ref().is_some_and(|p| p.id == player_id))
            .and_then(Option::take)
    }

    pub fn clear(&mut self) {
        for slot in self.slots.values_mut().flat_map(|slots| slots.iter_mut()) {
            *slot = None;
        }
    }

    /// Lineup entries for a commit, all starters with zero points
    pub fn entries(&self) -> Vec<LineupEntry> {
        self.players().map(|p| LineupEntry::starter(p.id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player(role: Role, cents: i64) -> Player {
        Player::new(format!("{} player", role), "Magnus", role, Credits::from_cents(cents))
    }

    #[test]
    fn test_new_draft_is_empty() {
        let draft = Draft::new();
        assert!(draft.is_empty());
        assert!(!draft.is_complete());
        assert_eq!(draft.slots(Role::Ala).len(), 2);
        assert_eq!(draft.slots(Role::Gol).len(), 1);
        assert_eq!(draft.cost(), Credits::ZERO);
    }

    #[test]
    fn test_wingers_fill_in_order() {
        let mut draft = Draft::new();
        let first = player(Role::Ala, 600);
        let second = player(Role::Ala, 500);

        draft.place(first.clone()).unwrap();
        draft.place(second.clone()).unwrap();
        assert_eq!(draft.slots(Role::Ala)[0].as_ref().unwrap().id, first.id);
        assert_eq!(draft.slots(Role::Ala)[1].as_ref().unwrap().id, second.id);

        let third = player(Role::Ala, 400);
        let rejected = draft.place(third.clone()).unwrap_err();
        assert_eq!(rejected.id, third.id);

        // a freed first slot is reused before anything else
        draft.take(first.id).unwrap();
        draft.place(third.clone()).unwrap();
        assert_eq!(draft.slots(Role::Ala)[0].as_ref().unwrap().id, third.id);
    }

    #[test]
    fn test_complete_draft_cost() {
        let mut draft = Draft::new();
        for (role, cents) in
            [(Role::Gol, 800), (Role::Fix, 700), (Role::Ala, 600), (Role::Ala, 500), (Role::Piv, 900)]
        {
            draft.place(player(role, cents)).unwrap();
        }

        assert!(draft.is_complete());
        assert_eq!(draft.len(), 5);
        assert_eq!(draft.cost(), Credits::from_cents(3500));
        assert_eq!(draft.entries().len(), 5);
        assert!(draft.entries().iter().all(|e| e.is_starter));

        draft.clear();
        assert!(draft.is_empty());
    }

    #[test]
    fn test_serde_keeps_slots() {
        let mut draft = Draft::new();
        draft.place(player(Role::Gol, 800)).unwrap();
        draft.place(player(Role::Ala, 600)).unwrap();

        let json = serde_json::to_string(&draft).unwrap();
        let back: Draft = serde_json::from_str(&json).unwrap();
        assert_eq!(back, draft);
    }

    #[test]
    fn test_deserialize_rejects_broken_formation() {
        let gol = player(Role::Gol, 800);
        let other_gol = player(Role::Gol, 700);

        let two_keepers = DraftSlots {
            slots: BTreeMap::from([(Role::Gol, vec![Some(gol.clone()), Some(other_gol)])]),
        };
        let json = serde_json::to_string(&two_keepers).unwrap();
        assert!(serde_json::from_str::<Draft>(&json).is_err());
        assert_eq!(
            Draft::try_from(two_keepers).unwrap_err(),
            DraftError::RoleOverfilled(Role::Gol)
        );

        let ala = player(Role::Ala, 600);
        let twice = DraftSlots {
            slots: BTreeMap::from([(Role::Ala, vec![Some(ala.clone()), Some(ala.clone())])]),
        };
        assert_eq!(Draft::try_from(twice).unwrap_err(), DraftError::Duplicate(ala.id));

        let misplaced = DraftSlots { slots: BTreeMap::from([(Role::Piv, vec![Some(gol.clone())])]) };
        assert!(matches!(Draft::try_from(misplaced), Err(DraftError::WrongRole { .. })));
    }

    #[test]
    fn test_take_missing_player() {
        let mut draft = Draft::new();
        assert!(draft.take(Uuid::new_v4()).is_none());
    }
}
