use serde::{Deserialize, Serialize};

use super::state::{Pos, TileId, Value};

/// DeltaEvent is one atomic change between two consecutive game states.
///
/// `Move`, `Merge` and `Spawn` are produced by moves. `Reverse`, `Split` and `Despawn` only
/// appear in the output of an undo, as the inverses of the first three.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum DeltaEvent {
    Move {
        id: TileId,
        from: Pos,
        to: Pos,
    },
    Merge {
        from_ids: (TileId, TileId),
        new_id: TileId,
        at: Pos,
        value: Value,
    },
    Spawn {
        id: TileId,
        at: Pos,
    },
    Despawn {
        id: TileId,
        at: Pos,
    },
    Split {
        from_ids: (TileId, TileId),
        new_id: TileId,
        at: Pos,
        value: Value,
    },
    Reverse {
        id: TileId,
        from: Pos,
        to: Pos,
    },
}

impl std::fmt::Display for DeltaEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Move { id, from, to } => write!(f, "move #{id} {from} -> {to}"),
            Self::Reverse { id, from, to } => write!(f, "reverse #{id} {from} -> {to}"),
            Self::Merge {
                from_ids,
                new_id,
                at,
                value,
            } => write!(
                f,
                "merge #{0}+#{1} -> #{new_id} = {value} at {at}",
                from_ids.0, from_ids.1
            ),
            Self::Split {
                from_ids,
                new_id,
                at,
                value,
            } => write!(
                f,
                "split #{new_id} = {value} at {at} -> #{0}+#{1}",
                from_ids.0, from_ids.1
            ),
            Self::Spawn { id, at } => write!(f, "spawn #{id} at {at}"),
            Self::Despawn { id, at } => write!(f, "despawn #{id} at {at}"),
        }
    }
}

impl DeltaEvent {
    /// The event that undoes this one.
    ///
    /// Undo-only events have no inverse of their own and are returned unchanged.
    pub fn invert(&self) -> DeltaEvent {
        match self.clone() {
            Self::Spawn { id, at } => Self::Despawn { id, at },
            Self::Move { id, from, to } => Self::Reverse {
                id,
                from: to,
                to: from,
            },
            Self::Merge {
                from_ids,
                new_id,
                at,
                value,
            } => Self::Split {
                from_ids,
                new_id,
                at,
                value,
            },
            e @ (Self::Despawn { .. } | Self::Split { .. } | Self::Reverse { .. }) => e,
        }
    }
}

/// Delta is the ordered list of events describing one transition.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Delta {
    events: Vec<DeltaEvent>,
}

impl std::fmt::Display for Delta {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for event in &self.events {
            writeln!(f, "  {event}")?;
        }
        Ok(())
    }
}

impl From<Vec<DeltaEvent>> for Delta {
    fn from(events: Vec<DeltaEvent>) -> Self {
        Self { events }
    }
}

impl Delta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, event: DeltaEvent) {
        self.events.push(event);
    }

    pub fn events(&self) -> &[DeltaEvent] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Inverts every event, keeping their order.
    pub fn invert(&self) -> Delta {
        self.events.iter().map(DeltaEvent::invert).collect::<Vec<_>>().into()
    }
}
