//! Run configuration and pre-flight validation (spec §9/§10.3).

use serde::{Deserialize, Serialize};

use crate::error::{NswingError, Result};
use crate::grid::{GridHeader, DEFAULT_DISCHARGE_LIMIT, NORMAL_GRAV};
use crate::nesting::NestingDescriptor;

/// Per-level friction setting; index matches the level's position in
/// the nesting tree.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LevelConfig {
    pub manning: f64,
    pub ratio_to_parent: usize,
}

/// Top-level configuration for a run (spec §10.3). Deliberately a plain
/// serde struct, not a builder, so it can be loaded directly from a
/// config file the way the teacher's wasm boundary loads simulator
/// parameters.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SimulationConfig {
    pub dt0: f64,
    pub n_cycles: u64,
    pub is_geographic: bool,
    pub coriolis_latitude_ref: Option<f64>,
    pub levels: Vec<LevelConfig>,
    pub manning_depth: f64,
    #[serde(default = "default_discharge_limit")]
    pub discharge_limit: f64,
    #[serde(default = "default_jupe")]
    pub jupe_l0: usize,
    pub do_linear: bool,
    pub do_upscale: bool,
    #[serde(default)]
    pub decimation: u32,
    #[serde(default)]
    pub mareg_interval: u32,
}

fn default_discharge_limit() -> f64 {
    DEFAULT_DISCHARGE_LIMIT
}

fn default_jupe() -> usize {
    5
}

impl SimulationConfig {
    /// Validate the configuration against the level headers and nesting
    /// descriptors it will drive, before the first step (spec §9 "fail
    /// fast on a bad CFL number or malformed nesting", spec §3 "nesting
    /// alignment invariant").
    pub fn validate(&self, headers: &[GridHeader], descriptors: &[NestingDescriptor]) -> Result<()> {
        if self.dt0 <= 0.0 {
            return Err(NswingError::Config("dt0 must be positive".into()));
        }
        if self.levels.len() != headers.len() {
            return Err(NswingError::Config(format!(
                "levels config has {} entries but {} grid headers were supplied",
                self.levels.len(),
                headers.len()
            )));
        }
        if headers.is_empty() {
            return Err(NswingError::Config("at least one level is required".into()));
        }

        let l0 = &headers[0];
        let min_spacing = l0.x_inc.min(l0.y_inc);
        if min_spacing <= 0.0 {
            return Err(NswingError::Config("level 0 spacing must be positive".into()));
        }
        let max_depth = (-l0.z_min).max(1e-6);
        let wave_speed = (NORMAL_GRAV * max_depth).sqrt();
        let cfl_limit = min_spacing / wave_speed;
        if self.dt0 > cfl_limit {
            return Err(NswingError::Config(format!(
                "dt0={} violates the CFL condition for level 0 (limit {cfl_limit})",
                self.dt0
            )));
        }
        if self.dt0 > 0.9 * cfl_limit {
            log::warn!(
                "NumericalWarning: dt0={} is within 10% of the CFL limit {cfl_limit} for level 0; consider a smaller timestep",
                self.dt0
            );
        }

        for (level_idx, level_cfg) in self.levels.iter().enumerate().skip(1) {
            if level_cfg.ratio_to_parent < 2 {
                return Err(NswingError::Config(format!(
                    "level {level_idx} has nesting ratio {}, but a child must refine its parent by an integer factor of at least 2",
                    level_cfg.ratio_to_parent
                )));
            }
        }

        for level_cfg in &self.levels {
            if level_cfg.manning < 0.0 {
                return Err(NswingError::Config("manning coefficient cannot be negative".into()));
            }
        }

        for desc in descriptors {
            validate_nesting_alignment(desc, headers)?;
        }

        Ok(())
    }
}

/// One child's nesting box must be an integer refinement of its parent,
/// sitting strictly inside it with its grid offset by half a parent
/// cell in each direction (spec §3 "nesting alignment invariant").
fn validate_nesting_alignment(desc: &NestingDescriptor, headers: &[GridHeader]) -> Result<()> {
    let parent = headers.get(desc.parent_level).ok_or_else(|| {
        NswingError::Config(format!("nesting descriptor references unknown parent level {}", desc.parent_level))
    })?;
    let child = headers.get(desc.child_level).ok_or_else(|| {
        NswingError::Config(format!("nesting descriptor references unknown child level {}", desc.child_level))
    })?;

    if desc.ratio < 2 {
        return Err(NswingError::Config(format!(
            "child level {} has nesting ratio {}, must be an integer >= 2",
            desc.child_level, desc.ratio
        )));
    }

    if desc.ll_col >= desc.ur_col || desc.ll_row >= desc.ur_row {
        return Err(NswingError::Config(format!(
            "child level {} has a degenerate or inverted bounding box",
            desc.child_level
        )));
    }

    if desc.ll_col == 0
        || desc.ll_row == 0
        || desc.ur_col + 1 >= parent.nx
        || desc.ur_row + 1 >= parent.ny
    {
        return Err(NswingError::Config(format!(
            "child level {} is not strictly inside its parent (bounding box touches or exceeds the parent's own edge)",
            desc.child_level
        )));
    }

    let ratio = desc.ratio as f64;
    let eps = 1e-6;
    if (parent.x_inc / ratio - child.x_inc).abs() > eps * child.x_inc.max(1.0)
        || (parent.y_inc / ratio - child.y_inc).abs() > eps * child.y_inc.max(1.0)
    {
        return Err(NswingError::Config(format!(
            "child level {} spacing does not match parent spacing / ratio",
            desc.child_level
        )));
    }

    // Half-cell offset: the child's first cell center sits half of the
    // child's own spacing inside the parent cell at (ll_col, ll_row),
    // which itself starts half a parent cell below/left of that cell's
    // center.
    let expected_x_min = parent.x_min + (desc.ll_col as f64 - 0.5) * parent.x_inc + 0.5 * child.x_inc;
    let expected_y_min = parent.y_min + (desc.ll_row as f64 - 0.5) * parent.y_inc + 0.5 * child.y_inc;
    let tol_x = 0.5 * child.x_inc;
    let tol_y = 0.5 * child.y_inc;
    if (child.x_min - expected_x_min).abs() > tol_x || (child.y_min - expected_y_min).abs() > tol_y {
        return Err(NswingError::Config(format!(
            "child level {} is not half-cell aligned with its parent at the nesting box origin",
            desc.child_level
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(z_min: f64, inc: f64) -> GridHeader {
        GridHeader {
            nx: 10,
            ny: 10,
            x_min: 0.0,
            y_min: 0.0,
            x_inc: inc,
            y_inc: inc,
            z_min,
            z_max: -1.0,
            is_geographic: false,
            coriolis_latitude_ref: None,
        }
    }

    fn base_config(dt0: f64) -> SimulationConfig {
        SimulationConfig {
            dt0,
            n_cycles: 10,
            is_geographic: false,
            coriolis_latitude_ref: None,
            levels: vec![LevelConfig {
                manning: 0.025,
                ratio_to_parent: 1,
            }],
            manning_depth: 0.01,
            discharge_limit: DEFAULT_DISCHARGE_LIMIT,
            jupe_l0: 5,
            do_linear: false,
            do_upscale: true,
            decimation: 0,
            mareg_interval: 0,
        }
    }

    #[test]
    fn warns_but_accepts_a_dt_near_the_cfl_limit() {
        let _ = env_logger::builder().is_test(true).try_init();
        let headers = vec![header(-100.0, 1000.0)];
        let cfl_limit = 1000.0 / (NORMAL_GRAV * 100.0_f64).sqrt();
        let config = base_config(0.95 * cfl_limit);
        assert!(config.validate(&headers, &[]).is_ok());
    }

    #[test]
    fn rejects_a_dt_that_violates_cfl() {
        let headers = vec![header(-8000.0, 1000.0)];
        let config = base_config(1000.0);
        assert!(config.validate(&headers, &[]).is_err());
    }

    #[test]
    fn accepts_a_conservative_dt() {
        let headers = vec![header(-100.0, 1000.0)];
        let config = base_config(1.0);
        assert!(config.validate(&headers, &[]).is_ok());
    }

    #[test]
    fn rejects_mismatched_level_count() {
        let headers = vec![header(-100.0, 1000.0), header(-50.0, 100.0)];
        let config = base_config(1.0);
        assert!(config.validate(&headers, &[]).is_err());
    }

    #[test]
    fn rejects_a_nesting_ratio_below_two() {
        let mut config = base_config(1.0);
        config.levels.push(LevelConfig {
            manning: 0.025,
            ratio_to_parent: 1,
        });
        let headers = vec![header(-100.0, 1000.0), header(-100.0, 500.0)];
        assert!(config.validate(&headers, &[]).is_err());
    }

    #[test]
    fn accepts_a_well_aligned_nested_child() {
        let mut config = base_config(1.0);
        config.levels.push(LevelConfig {
            manning: 0.025,
            ratio_to_parent: 2,
        });
        let parent = header(-100.0, 1000.0);
        let mut child = header(-100.0, 500.0);
        // Child covers parent cells [2..=6] in both axes, ratio 2: its
        // first cell center sits half a parent cell inside column 2.
        child.x_min = parent.x_min + (2.0 - 0.5) * parent.x_inc + 0.5 * child.x_inc;
        child.y_min = parent.y_min + (2.0 - 0.5) * parent.y_inc + 0.5 * child.y_inc;
        let headers = vec![parent, child];
        let desc = NestingDescriptor {
            parent_level: 0,
            child_level: 1,
            ll_col: 2,
            ll_row: 2,
            ur_col: 6,
            ur_row: 6,
            ratio: 2,
        };
        assert!(config.validate(&headers, &[desc]).is_ok());
    }

    #[test]
    fn rejects_a_child_box_touching_the_parent_edge() {
        let mut config = base_config(1.0);
        config.levels.push(LevelConfig {
            manning: 0.025,
            ratio_to_parent: 2,
        });
        let parent = header(-100.0, 1000.0);
        let mut child = header(-100.0, 500.0);
        child.x_min = parent.x_min + (0.0 - 0.5) * parent.x_inc + 0.5 * child.x_inc;
        child.y_min = parent.y_min + (0.0 - 0.5) * parent.y_inc + 0.5 * child.y_inc;
        let headers = vec![parent, child];
        let desc = NestingDescriptor {
            parent_level: 0,
            child_level: 1,
            ll_col: 0,
            ll_row: 0,
            ur_col: 4,
            ur_row: 4,
            ratio: 2,
        };
        assert!(config.validate(&headers, &[desc]).is_err());
    }
}
