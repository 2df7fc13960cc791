// Inbound command contract: what the dispatcher accepts from whatever
// transport sits in front of it (CLI, session stdin, an editor bridge).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{Actor, DocumentKind};

pub const ACTIVE_TARGET: &str = "active";

/// A document reference: an explicit id or whichever document is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Target {
    Active,
    Id(Uuid),
}

impl FromStr for Target {
    type Err = uuid::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        if value.trim() == ACTIVE_TARGET {
            return Ok(Self::Active);
        }
        Uuid::parse_str(value.trim()).map(Self::Id)
    }
}

impl TryFrom<String> for Target {
    type Error = uuid::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Target> for String {
    fn from(value: Target) -> Self {
        value.to_string()
    }
}

impl From<Uuid> for Target {
    fn from(value: Uuid) -> Self {
        Self::Id(value)
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Active => f.write_str(ACTIVE_TARGET),
            Self::Id(id) => write!(f, "{id}"),
        }
    }
}

/// One request for the dispatcher. Serialized with a `command` tag, e.g.
/// `{"command":"edit","target":"active","patch":"..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum Command {
    Create {
        kind: DocumentKind,
        title: String,
        #[serde(default)]
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
    },
    /// `actor`, when given, makes the edit respect that writer's lock view.
    Edit {
        target: Target,
        patch: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        actor: Option<Actor>,
    },
    Replace {
        target: Target,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        actor: Option<Actor>,
    },
    Lock {
        target: Target,
        held: bool,
        actor: Actor,
    },
    Undo {
        target: Target,
    },
    Redo {
        target: Target,
    },
    GoTo {
        target: Target,
        index: usize,
    },
    Delete {
        target: Target,
    },
}
