//! Users resource: validation rules, persistence port and its SeaORM adapter,
//! and the REST surface that ties them together.

// === PUBLIC CONTRACT ===
pub mod contract;
pub use contract::model;

// === INTERNAL MODULES ===
// Exposed for the server binary and for integration tests.
pub mod api;
pub mod domain;
pub mod infra;
