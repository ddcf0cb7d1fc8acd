//! Reduction and refinement settings

use std::path::PathBuf;

use meshsmooth_algorithms::{KeepSet, NormalWeighting};
use meshsmooth_core::{Error, Result};
use meshsmooth_reconstruction::{CleanupConfig, ReconstructionParams};
use serde::{Deserialize, Serialize};

/// Shallowest accepted reconstruction depth
pub const MIN_DEPTH: u32 = 2;
/// Deepest accepted reconstruction depth
pub const MAX_DEPTH: u32 = 15;
pub const DEFAULT_DEPTH: u32 = 7;

/// Settings for a single reduce-and-reconstruct pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ReductionConfig {
    /// Reconstruction octree depth, `MIN_DEPTH..=MAX_DEPTH`
    pub depth: u32,
    /// Partition set handed to reconstruction
    pub keep: KeepSet,
    /// Partition generator seed; `None` draws from OS entropy
    pub seed: Option<u64>,
    pub weighting: NormalWeighting,
    /// Negate vertex normals before reconstruction (inward-wound inputs)
    pub flip_normals: bool,
    /// Poisson position/normal weight
    pub scale: f32,
    pub relaxation_iterations: usize,
    /// Where to dump the reduced oriented cloud as PLY, if anywhere
    pub cloud_dump: Option<PathBuf>,
    pub cleanup: CleanupConfig,
}

impl Default for ReductionConfig {
    fn default() -> Self {
        let params = ReconstructionParams::default();
        Self {
            depth: DEFAULT_DEPTH,
            keep: KeepSet::default(),
            seed: None,
            weighting: NormalWeighting::default(),
            flip_normals: false,
            scale: params.scale,
            relaxation_iterations: params.relaxation_iterations,
            cloud_dump: None,
            cleanup: CleanupConfig::default(),
        }
    }
}

impl ReductionConfig {
    pub fn with_depth(mut self, depth: u32) -> Self {
        self.depth = depth;
        self
    }

    pub fn with_keep(mut self, keep: KeepSet) -> Self {
        self.keep = keep;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_weighting(mut self, weighting: NormalWeighting) -> Self {
        self.weighting = weighting;
        self
    }

    pub fn with_flip_normals(mut self, flip: bool) -> Self {
        self.flip_normals = flip;
        self
    }

    pub fn with_cloud_dump(mut self, path: impl Into<PathBuf>) -> Self {
        self.cloud_dump = Some(path.into());
        self
    }

    /// Check ranges before any mesh work starts
    pub fn validate(&self) -> Result<()> {
        if !(MIN_DEPTH..=MAX_DEPTH).contains(&self.depth) {
            return Err(Error::InvalidParameter(format!(
                "depth {} outside {}..={}",
                self.depth, MIN_DEPTH, MAX_DEPTH
            )));
        }
        if !self.scale.is_finite() || self.scale <= 0.0 {
            return Err(Error::InvalidParameter(format!(
                "scale must be positive, got {}",
                self.scale
            )));
        }
        Ok(())
    }

    pub fn reconstruction_params(&self) -> ReconstructionParams {
        ReconstructionParams {
            depth: self.depth,
            scale: self.scale,
            linear_fit: false,
            relaxation_iterations: self.relaxation_iterations,
        }
    }
}

/// Settings for the iterative refinement driver
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RefinementConfig {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// File stem of every produced mesh
    pub base_name: String,
    /// Number of reduce-and-reconstruct passes, at least 1
    pub iterations: usize,
    pub reduction: ReductionConfig,
}

impl Default for RefinementConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::new(),
            output_dir: PathBuf::from("."),
            base_name: "smoothed".to_string(),
            iterations: 1,
            reduction: ReductionConfig::default(),
        }
    }
}

impl RefinementConfig {
    pub fn new(input: impl Into<PathBuf>, output_dir: impl Into<PathBuf>) -> Self {
        Self {
            input: input.into(),
            output_dir: output_dir.into(),
            ..Self::default()
        }
    }

    pub fn with_base_name(mut self, base_name: impl Into<String>) -> Self {
        self.base_name = base_name.into();
        self
    }

    pub fn with_iterations(mut self, iterations: usize) -> Self {
        self.iterations = iterations;
        self
    }

    pub fn with_reduction(mut self, reduction: ReductionConfig) -> Self {
        self.reduction = reduction;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.iterations == 0 {
            return Err(Error::InvalidParameter(
                "iterations must be at least 1".to_string(),
            ));
        }
        if self.base_name.trim().is_empty() {
            return Err(Error::InvalidParameter("base name is empty".to_string()));
        }
        if self.base_name.contains(['/', '\\']) {
            return Err(Error::InvalidParameter(format!(
                "base name '{}' must not contain path separators",
                self.base_name
            )));
        }
        self.reduction.validate()
    }

    /// Path of the mesh written by 1-based `iteration`.
    ///
    /// A single-iteration run writes `base_name.ext`; longer runs number
    /// every file as `base_name_<i>.ext`.
    pub fn output_path(&self, iteration: usize, extension: &str) -> PathBuf {
        let file_name = if self.iterations == 1 {
            format!("{}.{}", self.base_name, extension)
        } else {
            format!("{}_{}.{}", self.base_name, iteration, extension)
        };
        self.output_dir.join(file_name)
    }

    /// Where 1-based `iteration` dumps its reduced cloud, if dumping is on.
    ///
    /// Numbered like [`RefinementConfig::output_path`]: `cloud.ply` becomes
    /// `cloud_<i>.ply` when there is more than one iteration.
    pub fn cloud_dump_path(&self, iteration: usize) -> Option<PathBuf> {
        let path = self.reduction.cloud_dump.as_ref()?;
        if self.iterations == 1 {
            return Some(path.clone());
        }

        let stem = path.file_stem().map(|s| s.to_string_lossy()).unwrap_or_default();
        let file_name = match path.extension() {
            Some(ext) => format!("{}_{}.{}", stem, iteration, ext.to_string_lossy()),
            None => format!("{}_{}", stem, iteration),
        };
        Some(path.with_file_name(file_name))
    }
}
