pub mod command;
pub mod confirm;
pub mod encryption;
pub mod env_check;
pub mod naming;

// Trait-based abstractions for testability
pub mod executor;
