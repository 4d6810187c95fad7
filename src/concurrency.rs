//! The two-worker fork-join for `moment_m`/`moment_n` (spec §5).
//!
//! The two equations write disjoint arrays (`flux_m_d` vs `flux_n_d`)
//! and only read the shared `a` buffers, so there is no synchronization
//! needed beyond waiting for both workers to finish. There is no queue,
//! no work-stealing pool: just two threads and a join, which is exactly
//! what [`std::thread::scope`] gives us.

use crate::coeffs::ProjectionCoefficients;
use crate::error::{NswingError, Result};
use crate::grid::LevelState;
use crate::momentum::{self, MomentumParams};

/// Run `moment_m` and `moment_n` for one level, in parallel if
/// `parallel` is set, sequentially (m then n) otherwise. Both paths
/// must produce bitwise-identical output, since neither reads the
/// other's output array (spec §8 "parallel determinism").
///
/// Either worker producing a non-finite flux is surfaced as
/// [`NswingError::Numerical`] after the join, rather than propagating
/// NaN/inf silently into the next step (spec §5, §7, §8).
pub fn run_momentum(
    level: &mut LevelState,
    coeffs: &ProjectionCoefficients,
    params: &MomentumParams,
    parallel: bool,
    level_index: usize,
) -> Result<()> {
    if !parallel {
        momentum::moment_m(level, coeffs, params);
        momentum::moment_n(level, coeffs, params);
        return check_finite(level, level_index);
    }

    // SAFETY-free split: `LevelState` holds `flux_m_*` and `flux_n_*` in
    // separate `Vec`s, so splitting the borrow at the field level (via
    // two free functions operating on disjoint slices) would work, but
    // `moment_m`/`moment_n` both need read access to the rest of the
    // level's state (eta, h_total, bat) plus the velocity cache at the
    // end. We instead compute each side's flux array independently into
    // scratch buffers, then commit both under one mutable borrow.
    let nx = level.header.nx;
    let ny = level.header.ny;
    let n = nx * ny;

    let mut scratch_m = level.clone();
    let mut scratch_n = level.clone();

    std::thread::scope(|scope| -> Result<()> {
        let handle_m = scope.spawn(|| {
            momentum::moment_m(&mut scratch_m, coeffs, params);
            scratch_m
        });
        let handle_n = scope.spawn(|| {
            momentum::moment_n(&mut scratch_n, coeffs, params);
            scratch_n
        });

        let result_m = handle_m.join().expect("moment_m worker panicked");
        let result_n = handle_n.join().expect("moment_n worker panicked");

        level.flux_m_d.copy_from_slice(&result_m.flux_m_d[..n]);
        level.flux_n_d.copy_from_slice(&result_n.flux_n_d[..n]);

        if let (Some(dst), Some(src)) = (level.velocity.as_mut(), result_m.velocity.as_ref()) {
            dst.vx.copy_from_slice(&src.vx[..n]);
        }
        if let (Some(dst), Some(src)) = (level.velocity.as_mut(), result_n.velocity.as_ref()) {
            dst.vy.copy_from_slice(&src.vy[..n]);
        }

        check_finite(level, level_index)
    })
}

/// Scan a level's freshly written fluxes for the first non-finite value,
/// reporting it as a `Numerical` error rather than letting NaN/inf feed
/// the next mass step.
fn check_finite(level: &LevelState, level_index: usize) -> Result<()> {
    for (ij, &f) in level.flux_m_d.iter().enumerate() {
        if !f.is_finite() {
            log::warn!("level {level_index} cell {ij}: flux_m_d went non-finite ({f})");
            return Err(NswingError::Numerical {
                level: level_index,
                cell: ij,
                detail: format!("flux_m_d went non-finite ({f})"),
            });
        }
    }
    for (ij, &f) in level.flux_n_d.iter().enumerate() {
        if !f.is_finite() {
            log::warn!("level {level_index} cell {ij}: flux_n_d went non-finite ({f})");
            return Err(NswingError::Numerical {
                level: level_index,
                cell: ij,
                detail: format!("flux_n_d went non-finite ({f})"),
            });
        }
    }
    Ok(())
}
