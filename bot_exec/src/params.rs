//! Parameters for the bot executable

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::ctrl::{BumpParams, LineFollowParams, StandOffParams};
use crate::geometry::{Geometry, GeometryError};
use crate::hw::sim::SimParams;
use crate::vision::VisionParams;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// All parameters read from `bot_exec.toml`.
///
/// Any missing table or field takes its default value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct BotParams {
    pub geometry: Geometry,
    pub line_follow: LineFollowParams,
    pub stand_off: StandOffParams,
    pub bump: BumpParams,
    pub vision: VisionParams,
    pub sim: SimParams,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl BotParams {
    /// Check the parameters can be used to drive the robot.
    pub fn validate(&self) -> Result<(), GeometryError> {
        self.geometry.validate()
    }
}
