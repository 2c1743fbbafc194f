pub mod error;
pub mod generation;
pub mod naming;
pub mod report;
pub mod roles;
pub mod types;
