//! Core data model and contracts.

pub mod clock;
pub mod component;
pub mod roles;
pub mod session;
pub mod width;
