//! The continuity (mass-conservation) equation (spec §4.3).
//!
//! Advances `eta_d`/`h_total_d` from the `a` buffers and the fluxes left
//! behind by the previous momentum step. Both projections share the same
//! finite-difference stencil; they differ only in the row factors fed in
//! by [`crate::coeffs`].

use crate::coeffs::ProjectionCoefficients;
use crate::grid::{LevelState, EPS_BEACH, EPS_MASS};

/// Advance the continuity equation for one level, writing into `eta_d`
/// and `h_total_d`. `coeffs` must have been built for this level's
/// projection (cartesian or spherical); the stencil itself does not
/// branch on projection, only the factors it multiplies by do.
///
/// On the write level (the only level with `beach.is_some()`), also
/// sticks the `long_beach`/`short_beach` masks: `long_beach` once a
/// normally-wet cell (`bat > 0`) is found nearly dry, `short_beach` once
/// a normally-dry cell (`bat < 0`) is found inundated (spec §4.3). Both
/// flags latch — they are never cleared once set.
pub fn advance(level: &mut LevelState, coeffs: &ProjectionCoefficients) {
    let nx = level.header.nx;
    let ny = level.header.ny;

    for row in 0..ny {
        let factors = coeffs.row(row);
        for col in 0..nx {
            let ij = level.header.index(col, row);

            if level.is_permanent_dry(ij) {
                level.eta_d[ij] = level.eta_a[ij];
                level.h_total_d[ij] = level.h_total_a[ij];
                continue;
            }

            let flux_m_here = level.flux_m_a[ij];
            let flux_m_west = if col > 0 {
                level.flux_m_a[level.header.index(col - 1, row)]
            } else {
                0.0
            };
            let flux_n_here = level.flux_n_a[ij];
            let flux_n_south = if row > 0 {
                level.flux_n_a[level.header.index(col, row - 1)]
            } else {
                0.0
            };

            let div_m = factors.r1m * (flux_m_here - flux_m_west);
            let div_n = factors.r1n * (flux_n_here - flux_n_south);

            let mut new_eta = level.eta_a[ij] - div_m - div_n;
            if new_eta.abs() < EPS_MASS {
                new_eta = 0.0;
            }

            // bat is stored positive-down (depth), so H_total = bat + eta.
            let new_depth = (new_eta + level.bat[ij]).max(0.0);

            level.eta_d[ij] = new_eta;
            level.h_total_d[ij] = new_depth;

            let bat_here = level.bat[ij];
            if let Some(beach) = level.beach.as_mut() {
                if bat_here > 0.0 && new_depth < EPS_BEACH {
                    beach.long_beach[ij] = 1;
                }
                if bat_here < 0.0 && new_depth > EPS_BEACH {
                    beach.short_beach[ij] = 1;
                }
            }
        }
    }
}
