use alloc::collections::BTreeMap;
use alloc::format;
use alloc::string::String;

use serde::{Deserialize, Serialize};

use crate::error::PresenceError;
use crate::models::{Occupancy, RoomId};

/// Edge of the global occupancy lock, caused by one room's presence bit.
#[cfg_attr(feature = "docs", derive(utoipa::ToSchema))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transition {
    pub from: Occupancy,
    pub to: Occupancy,
    /// Room whose bit flipped the lock
    pub room: RoomId,
    pub present: bool,
}

impl Transition {
    pub fn reason(&self) -> String {
        format!(
            "presence {} in {}: {} -> {}",
            u8::from(self.present),
            self.room,
            self.from,
            self.to
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceUpdate {
    /// The room already had this bit
    Unchanged,
    /// Bit changed, the lock did not
    Recorded,
    Transition(Transition),
}

impl PresenceUpdate {
    pub fn transition(&self) -> Option<&Transition> {
        match self {
            PresenceUpdate::Transition(transition) => Some(transition),
            _ => None,
        }
    }
}

/// Presence bits of every sensor room. The occupancy lock is never stored,
/// it is the OR of the bits at the time it is asked for.
#[derive(Debug, Clone, Default)]
pub struct PresenceAggregator {
    bits: BTreeMap<RoomId, bool>,
}

impl PresenceAggregator {
    pub fn new<I>(rooms: I) -> Self
    where
        I: IntoIterator<Item = RoomId>,
    {
        Self {
            bits: rooms.into_iter().map(|room| (room, false)).collect(),
        }
    }

    pub fn set_presence(
        &mut self,
        room: &str,
        present: bool,
    ) -> Result<PresenceUpdate, PresenceError> {
        let before = self.occupancy();

        let bit = self
            .bits
            .get_mut(room)
            .ok_or_else(|| PresenceError::UnknownRoom(room.into()))?;

        if *bit == present {
            return Ok(PresenceUpdate::Unchanged);
        }
        *bit = present;

        let after = self.occupancy();
        if before == after {
            return Ok(PresenceUpdate::Recorded);
        }

        Ok(PresenceUpdate::Transition(Transition {
            from: before,
            to: after,
            room: room.into(),
            present,
        }))
    }

    pub fn is_occupied(&self) -> bool {
        self.bits.values().any(|bit| *bit)
    }

    pub fn occupancy(&self) -> Occupancy {
        Occupancy::from(self.is_occupied())
    }

    pub fn presence_of(&self, room: &str) -> Option<bool> {
        self.bits.get(room).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&RoomId, bool)> {
        self.bits.iter().map(|(room, bit)| (room, *bit))
    }

    /// `{room: 0/1}` as reported to the control surface.
    pub fn bits(&self) -> BTreeMap<RoomId, u8> {
        self.iter()
            .map(|(room, bit)| (room.clone(), u8::from(bit)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use alloc::vec::Vec;

    use super::*;

    fn house() -> PresenceAggregator {
        PresenceAggregator::new(
            ["kamar1", "kamar2", "kamar3", "dapur", "ruang_cuci"]
                .into_iter()
                .map(RoomId::from),
        )
    }

    #[test]
    fn test_starts_empty() {
        let presence = house();

        assert!(!presence.is_occupied());
        assert_eq!(presence.occupancy(), Occupancy::Empty);
        assert_eq!(presence.presence_of("kamar3"), Some(false));
        assert_eq!(presence.bits().len(), 5);
    }

    #[test]
    fn test_single_event_for_overlapping_presence() {
        let mut presence = house();

        let updates: Vec<PresenceUpdate> = [("kamar1", true), ("kamar2", true), ("kamar1", false)]
            .into_iter()
            .map(|(room, bit)| presence.set_presence(room, bit).unwrap())
            .collect();

        assert_eq!(
            updates[0],
            PresenceUpdate::Transition(Transition {
                from: Occupancy::Empty,
                to: Occupancy::Occupied,
                room: "kamar1".into(),
                present: true,
            })
        );
        assert_eq!(updates[1], PresenceUpdate::Recorded);
        assert_eq!(updates[2], PresenceUpdate::Recorded);
        assert!(presence.is_occupied());

        let last = presence.set_presence("kamar2", false).unwrap();
        assert_eq!(
            last.transition().map(|t| (t.from, t.to)),
            Some((Occupancy::Occupied, Occupancy::Empty))
        );
        assert!(!presence.is_occupied());
    }

    #[test]
    fn test_idempotent_writes() {
        let mut presence = house();

        for room in ["kamar1", "dapur", "ruang_cuci"] {
            for bit in [true, false] {
                presence.set_presence(room, bit).unwrap();
                assert_eq!(presence.presence_of(room), Some(bit));
                assert_eq!(
                    presence.set_presence(room, bit).unwrap(),
                    PresenceUpdate::Unchanged
                );
            }
        }
    }

    #[test]
    fn test_occupancy_tracks_or_of_bits() {
        let mut presence = house();
        let writes = [
            ("dapur", true),
            ("kamar3", true),
            ("dapur", false),
            ("kamar1", false),
            ("kamar3", false),
            ("ruang_cuci", true),
        ];

        for (room, bit) in writes {
            presence.set_presence(room, bit).unwrap();
            let any = presence.iter().any(|(_, bit)| bit);
            assert_eq!(presence.is_occupied(), any);
        }
    }

    #[test]
    fn test_unknown_room_rejected() {
        let mut presence = house();

        assert_eq!(
            presence.set_presence("garasi", true),
            Err(PresenceError::UnknownRoom("garasi".into()))
        );
        assert_eq!(presence.presence_of("garasi"), None);
        assert!(!presence.is_occupied());
    }

    #[test]
    fn test_transition_reason_names_room() {
        let mut presence = house();

        let update = presence.set_presence("kamar2", true).unwrap();
        let reason = update.transition().unwrap().reason();

        assert_eq!(reason, "presence 1 in kamar2: kosong -> berpenghuni");
    }
}
