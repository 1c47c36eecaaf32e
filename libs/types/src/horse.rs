//! Horse identity

use crate::ids::HorseId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A horse that can be entered as a runner. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Horse {
    pub id: HorseId,
    pub name: String,
}

impl Horse {
    pub fn new(id: HorseId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

impl fmt::Display for Horse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}
