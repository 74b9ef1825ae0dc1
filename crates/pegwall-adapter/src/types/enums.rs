/*
[INPUT]:  Quoting sides shared by the adapter contract and the strategy
[OUTPUT]: Typed Rust enums with serialization support
[POS]:    Data layer - type definitions for venue communication
[UPDATE]: When new order sides or venue enums are added
*/

use std::fmt;

use serde::{Deserialize, Serialize};

/// Side of a wall.
///
/// A bid is funded in the quote unit, an ask in the pegged unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

impl Side {
    pub fn as_str(self) -> &'static str {
        match self {
            Side::Bid => "bid",
            Side::Ask => "ask",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
