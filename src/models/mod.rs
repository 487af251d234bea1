pub mod actor;
pub mod delivery;
pub mod geo;
