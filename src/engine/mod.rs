// Sarathi Engine — personalization & memory runtime
// One module per concern; pure data types live in crate::atoms.
//
// Turn data flow:
//   classifier → profile (mutate) + memory (retrieve) → emotion →
//   providers (generation) → orchestrator (gated tools) → memory (append)

pub mod classifier;
pub mod config;
pub mod emotion;
pub mod memory;
pub mod orchestrator;
pub mod profile;
pub mod providers;
pub mod sessions;
pub mod tools;
pub mod turn;
pub mod voice;
