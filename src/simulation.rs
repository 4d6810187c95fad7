//! Top-level driver wiring grid/coeffs/mass/momentum/nesting/boundary/
//! tracker/concurrency together into one L0 step (spec §2, §4.8).

use crate::boundary::{self, BorderConfig};
use crate::coeffs::ProjectionCoefficients;
use crate::concurrency;
use crate::config::SimulationConfig;
use crate::error::Result;
use crate::grid::LevelState;
use crate::mass;
use crate::momentum::MomentumParams;
use crate::nesting::{self, NestingDescriptor, ScheduleStep};
use crate::tracker::MaxTracker;

/// One nested level plus everything needed to step it on its own.
pub struct Level {
    pub state: LevelState,
    pub coeffs: ProjectionCoefficients,
    pub momentum_params: MomentumParams,
    pub border: BorderConfig,
    pub tracker: MaxTracker,
}

/// Owns the full level tree and drives one step of the coupled system.
pub struct Simulation {
    pub levels: Vec<Level>,
    pub descriptors: Vec<NestingDescriptor>,
    pub schedule: Vec<ScheduleStep>,
    pub parallel_momentum: bool,
    elapsed_s: f64,
}

impl Simulation {
    pub fn new(
        config: &SimulationConfig,
        levels: Vec<Level>,
        descriptors: Vec<NestingDescriptor>,
    ) -> Result<Self> {
        let headers: Vec<_> = levels.iter().map(|l| l.state.header).collect();
        config.validate(&headers, &descriptors)?;

        let ratios: Vec<usize> = std::iter::once(1)
            .chain(config.levels.iter().skip(1).map(|l| l.ratio_to_parent))
            .collect();
        let schedule = nesting::build_schedule(&descriptors, &ratios);

        Ok(Simulation {
            levels,
            descriptors,
            schedule,
            parallel_momentum: true,
            elapsed_s: 0.0,
        })
    }

    pub fn elapsed_s(&self) -> f64 {
        self.elapsed_s
    }

    /// Run one full L0 step, including every nested sub-step scheduled
    /// under it (spec §4.8 "one L0 step": `mass(L0) → boundary(L0) →
    /// recurse(children) → moment(L0) → commit(L0)`).
    pub fn step(&mut self) -> Result<()> {
        for instruction in self.schedule.clone() {
            match instruction {
                ScheduleStep::MassPhase { level } => self.mass_phase(level)?,
                ScheduleStep::InjectEdges { descriptor_index } => {
                    self.inject_edges(descriptor_index)
                }
                ScheduleStep::Upscale { descriptor_index } => self.upscale(descriptor_index),
                ScheduleStep::MomentPhase { level } => self.moment_phase(level)?,
                ScheduleStep::CommitPhase { level } => self.commit_phase(level),
            }
        }
        self.elapsed_s += self.levels[0].coeffs.dt;
        log::debug!(
            "completed L0 step, elapsed_s={} across {} level(s)",
            self.elapsed_s,
            self.levels.len()
        );
        Ok(())
    }

    /// Continuity equation for one level. Boundary conditions are only
    /// ever applied to level 0 (spec §4.5): a nested child's rim was
    /// just set by `inject_edges`, and running the open-boundary pass
    /// on it would immediately overwrite that injected data.
    fn mass_phase(&mut self, level_idx: usize) -> Result<()> {
        let level = &mut self.levels[level_idx];
        mass::advance(&mut level.state, &level.coeffs);
        if level_idx == 0 {
            boundary::apply_open_boundaries(&mut level.state, &level.border, self.elapsed_s);
        }
        Ok(())
    }

    /// Momentum equations for one level. Scheduled after every child
    /// nested under this level has fully stepped and upscaled its
    /// feedback, so a child's influence reaches the parent within the
    /// same step (spec §8 scenario 2).
    fn moment_phase(&mut self, level_idx: usize) -> Result<()> {
        let level = &mut self.levels[level_idx];
        concurrency::run_momentum(
            &mut level.state,
            &level.coeffs,
            &level.momentum_params,
            self.parallel_momentum,
            level_idx,
        )
    }

    fn commit_phase(&mut self, level_idx: usize) {
        let level = &mut self.levels[level_idx];
        level.state.commit();
        level.tracker.update_wmax(&level.state);
        level.tracker.update_vmax(&level.state);
    }

    fn inject_edges(&mut self, descriptor_index: usize) {
        let desc = self.descriptors[descriptor_index];
        let (parent_slice, child_slice) = split_parent_child(&mut self.levels, desc.parent_level, desc.child_level);
        nesting::interp_edges(&parent_slice.state, &mut child_slice.state, &desc);
    }

    fn upscale(&mut self, descriptor_index: usize) {
        let desc = self.descriptors[descriptor_index];
        let (parent_slice, child_slice) = split_parent_child(&mut self.levels, desc.parent_level, desc.child_level);
        nesting::upscale(&mut parent_slice.state, &child_slice.state, &desc);
    }
}

/// Borrow a parent and a child level mutably at the same time. Safe
/// because the nesting tree guarantees `parent != child` and the
/// scheduler never steps a level concurrently with its own parent or
/// child.
fn split_parent_child(levels: &mut [Level], parent: usize, child: usize) -> (&mut Level, &mut Level) {
    assert_ne!(parent, child, "a level cannot nest inside itself");
    if parent < child {
        let (left, right) = levels.split_at_mut(child);
        (&mut left[parent], &mut right[0])
    } else {
        let (left, right) = levels.split_at_mut(parent);
        (&mut right[0], &mut left[child])
    }
}
