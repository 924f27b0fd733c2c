//! Search engine module
//!
//! Defines the Engine trait, the backend capabilities the orchestrators
//! consume, and a registry for the configured engines.

mod backend;
mod fields;
mod loader;
mod registry;
mod traits;

// Engine implementations
pub mod fofa;
pub mod hunter;
pub mod quake;
pub mod zone;

pub use backend::HttpBackend;
pub use loader::EngineLoader;
pub use registry::EngineRegistry;
pub use traits::*;
