//! # Domain Module
//!
//! Records, cache, errors and boundary invariants of the mirror client.

pub mod entities;
pub mod errors;
pub mod invariants;
pub mod mirror;
pub mod value_objects;

pub use entities::*;
pub use errors::*;
pub use invariants::*;
pub use mirror::*;
pub use value_objects::*;
