pub mod repo;
pub mod validation;
