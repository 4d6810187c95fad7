//! Parent/child grid coupling (spec §4.6): edge injection down into a
//! child level, and averaged feedback back up into the parent, plus the
//! scheduler that walks the level tree once per L0 step.

use crate::grid::LevelState;

/// Where a child level sits inside its parent's index space, and how
/// many child cells fall inside one parent cell (spec §3 "nesting
/// descriptor").
#[derive(Clone, Copy, Debug)]
pub struct NestingDescriptor {
    pub parent_level: usize,
    pub child_level: usize,
    /// Lower-left parent cell the child's (0,0) aligns with.
    pub ll_col: usize,
    pub ll_row: usize,
    /// Upper-right parent cell the child's last cell aligns with.
    pub ur_col: usize,
    pub ur_row: usize,
    /// Child cells per parent cell, in each direction.
    pub ratio: usize,
}

impl NestingDescriptor {
    pub fn parent_span_cols(&self) -> usize {
        self.ur_col - self.ll_col + 1
    }

    pub fn parent_span_rows(&self) -> usize {
        self.ur_row - self.ll_row + 1
    }
}

/// Sample the parent's eta along the boundary row/column the child
/// needs, then linearly interpolate onto the child's finer spacing
/// (spec §4.6 "edge injection").
///
/// Writes into the child's `eta_a` (its next mass-equation input), not
/// `eta_d`: the child's own mass/momentum step still owns computing
/// `eta_d` for every cell, including the rim. Writing into `eta_d`
/// directly would just be clobbered the moment the child steps.
pub fn interp_edges(parent: &LevelState, child: &mut LevelState, desc: &NestingDescriptor) {
    let ratio = desc.ratio as f64;

    // West and east child columns, sampled from the parent's matching
    // boundary column and interpolated down along the row axis.
    for (parent_col, child_col) in [(desc.ll_col, 0usize), (desc.ur_col, child.header.nx - 1)] {
        let parent_samples: Vec<f64> = (desc.ll_row..=desc.ur_row)
            .map(|r| parent.eta_a[parent.header.index(parent_col, r)])
            .collect();

        for child_row in 0..child.header.ny {
            let pos = child_row as f64 / ratio;
            let eta = intp_lin(&parent_samples, pos);
            let ij = child.header.index(child_col, child_row);
            if !child.is_permanent_dry(ij) {
                child.eta_a[ij] = eta;
            } else {
                child.eta_a[ij] = 0.0;
            }
        }
    }

    // South and north child rows.
    for (parent_row, child_row) in [(desc.ll_row, 0usize), (desc.ur_row, child.header.ny - 1)] {
        let parent_samples: Vec<f64> = (desc.ll_col..=desc.ur_col)
            .map(|c| parent.eta_a[parent.header.index(c, parent_row)])
            .collect();

        for child_col in 0..child.header.nx {
            let pos = child_col as f64 / ratio;
            let eta = intp_lin(&parent_samples, pos);
            let ij = child.header.index(child_col, child_row);
            if !child.is_permanent_dry(ij) {
                child.eta_a[ij] = eta;
            } else {
                child.eta_a[ij] = 0.0;
            }
        }
    }
}

/// Monotone 1-D linear interpolation of `samples` at fractional index
/// `pos`, clamped at the ends (spec §4.6 "intp_lin").
pub fn intp_lin(samples: &[f64], pos: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    if pos <= 0.0 {
        return samples[0];
    }
    let last = samples.len() - 1;
    if pos >= last as f64 {
        return samples[last];
    }
    let i0 = pos.floor() as usize;
    let frac = pos - i0 as f64;
    samples[i0] + frac * (samples[i0 + 1] - samples[i0])
}

/// Average the child's finer cells back into the parent (spec §4.6
/// "upscale"). Only cells strictly interior to the child's border
/// participate, matching the original's avoidance of double-counting
/// the edge-injected rim.
pub fn upscale(parent: &mut LevelState, child: &LevelState, desc: &NestingDescriptor) {
    let ratio = desc.ratio;
    if ratio <= 1 {
        return;
    }
    let half = (ratio * ratio * 2) / 3;

    for prow in desc.ll_row..=desc.ur_row {
        for pcol in desc.ll_col..=desc.ur_col {
            let crow0 = (prow - desc.ll_row) * ratio;
            let ccol0 = (pcol - desc.ll_col) * ratio;

            let mut sum_a = 0.0;
            let mut sum_d = 0.0;
            let mut count = 0usize;
            for dr in 0..ratio {
                for dc in 0..ratio {
                    let cr = crow0 + dr;
                    let cc = ccol0 + dc;
                    if cr >= child.header.ny || cc >= child.header.nx {
                        continue;
                    }
                    let cij = child.header.index(cc, cr);
                    if child.is_permanent_dry(cij) {
                        continue;
                    }
                    sum_a += child.eta_a[cij];
                    sum_d += child.eta_d[cij];
                    count += 1;
                }
            }

            if count == 0 || count < half {
                continue;
            }

            let pij = parent.header.index(pcol, prow);
            parent.eta_a[pij] = sum_a / count as f64;
            parent.eta_d[pij] = sum_d / count as f64;
        }
    }
}

/// One entry in the scheduler's explicit work list, replacing the
/// original's recursion with a flat sequence built once per configuration
/// (spec §9 "no recursion in the scheduler").
///
/// A level's own step is split across `MassPhase` and `MomentPhase`/
/// `CommitPhase` so its children's full sub-steps can run in between:
/// spec §4.8 requires `mass(L0) → boundary(L0) → recurse(children) →
/// moment(L0) → commit(L0)`, with `upscale` feeding the parent *before*
/// its own momentum step runs.
#[derive(Clone, Copy, Debug)]
pub enum ScheduleStep {
    /// Advance the continuity equation for `level`. Boundary conditions
    /// are applied immediately after, but only for level 0 (spec §4.5
    /// "boundary is L0-only" — applying it on a child would overwrite
    /// the edges `InjectEdges` just wrote).
    MassPhase { level: usize },
    /// Inject the parent's boundary into a child before it steps.
    InjectEdges { descriptor_index: usize },
    /// Feed a child's finer solution back into its parent, before the
    /// parent's own momentum step.
    Upscale { descriptor_index: usize },
    /// Advance the momentum equations for `level`, after every child
    /// nested under it has fully stepped.
    MomentPhase { level: usize },
    /// Copy `level`'s `d` buffers into `a` and update its trackers.
    CommitPhase { level: usize },
}

/// Build the flattened schedule for one parent step, given each level's
/// refinement ratio relative to its parent (spec §4.6 "nestify", §4.8
/// step ordering). Level 0 always takes exactly one step; a level
/// nested at ratio `r` takes `r` sub-steps per one parent step. Nesting
/// may be arbitrarily deep: a child's own children recurse the same way
/// inside its `MassPhase..CommitPhase` span.
pub fn build_schedule(descriptors: &[NestingDescriptor], ratios_by_level: &[usize]) -> Vec<ScheduleStep> {
    schedule_level(0, descriptors, ratios_by_level)
}

fn schedule_level(
    level: usize,
    descriptors: &[NestingDescriptor],
    ratios_by_level: &[usize],
) -> Vec<ScheduleStep> {
    let mut schedule = vec![ScheduleStep::MassPhase { level }];

    for (desc_idx, desc) in descriptors.iter().enumerate() {
        if desc.parent_level != level {
            continue;
        }
        let ratio = ratios_by_level[desc.child_level].max(1) as u32;
        for _ in 0..ratio {
            schedule.push(ScheduleStep::InjectEdges {
                descriptor_index: desc_idx,
            });
            schedule.extend(schedule_level(desc.child_level, descriptors, ratios_by_level));
        }
        schedule.push(ScheduleStep::Upscale {
            descriptor_index: desc_idx,
        });
    }

    schedule.push(ScheduleStep::MomentPhase { level });
    schedule.push(ScheduleStep::CommitPhase { level });
    schedule
}
