//! Render settings.

use serde::{Deserialize, Serialize};

use crate::error::EngineResult;
use crate::integrator::{IntegratorKind, IntegratorOptions};
use crate::path_space::PathSpaceLayout;

/// Everything needed to set up a path space and a render engine.
///
/// Missing JSON fields fall back to their defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub layout: PathSpaceLayout,
    pub integrator: IntegratorKind,
    /// Maximum vertices per subpath for the bidirectional MIS integrator.
    pub max_path_len: usize,
    /// Light samples per shading point.
    pub multi_light_samples: u32,
    /// Indirect samples at the first bounce.
    pub multi_indirect_samples: u32,
    /// Worker threads; all cores when unset.
    pub num_threads: Option<usize>,
    /// Base seed for the per-tile random streams.
    pub seed: u64,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            layout: PathSpaceLayout::default(),
            integrator: IntegratorKind::default(),
            max_path_len: 4,
            multi_light_samples: 1,
            multi_indirect_samples: 1,
            num_threads: None,
            seed: 1361,
        }
    }
}

impl RenderConfig {
    pub fn from_json(json: &str) -> EngineResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn integrator_options(&self) -> IntegratorOptions {
        IntegratorOptions {
            max_path_len: self.max_path_len,
            multi_light_samples: self.multi_light_samples,
            multi_indirect_samples: self.multi_indirect_samples,
        }
    }

    /// Worker count, defaulting to the number of logical cores.
    pub fn thread_count(&self) -> usize {
        self.num_threads.unwrap_or_else(num_cpus::get).max(1)
    }
}
