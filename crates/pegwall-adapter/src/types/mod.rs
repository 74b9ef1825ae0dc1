/*
[INPUT]:  Venue data definitions and serde requirements
[OUTPUT]: Typed Rust structs/enums with serialization support
[POS]:    Data layer - type definitions for venue communication
[UPDATE]: When new shared types are added
*/

pub mod enums;
pub mod models;

pub use enums::*;
pub use models::*;
