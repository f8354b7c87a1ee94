//! Database model modules - extends Database with domain-specific methods
//!
//! Each module adds `impl` blocks on `Database` for a specific table group.

pub mod intents; // intents, intent_steps
