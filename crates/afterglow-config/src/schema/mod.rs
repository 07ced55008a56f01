//! Configuration schema types for the post-processing pipeline.
//!
//! All structs use `serde(default)` so partial configs work correctly.
//! Missing fields are filled with the defaults documented on each field.

mod effects;
mod render;
mod system;
mod temporal;

pub use effects::*;
pub use render::*;
pub use system::*;
pub use temporal::*;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AfterglowConfig {
    pub render: RenderConfig,
    pub temporal: TemporalConfig,
    pub effects: EffectsConfig,
    pub logging: LoggingConfig,
}
