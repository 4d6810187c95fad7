//! The momentum equations (spec §4.4), after Imamura's wet/dry case
//! split: a face between two cells is classified before anything else
//! is computed, and the classification — not just a single averaged
//! depth — decides which terms apply and what depth they use.

use crate::coeffs::ProjectionCoefficients;
use crate::grid::{LevelState, EPS_ADVECTION, EPS_DEPTH, EPS_VELOCITY, EPS_WET, NORMAL_GRAV};

/// Manning friction and discharge-limiting knobs shared by both momentum
/// directions (spec §9 "discharge limiter is a runtime setting").
#[derive(Clone, Copy, Debug)]
pub struct MomentumParams {
    pub manning: f64,
    pub manning_depth: f64,
    pub discharge_limit: f64,
    /// Width, in cells, of the buffer near a nested boundary where
    /// advection is suppressed (spec §4.4 "jupe").
    pub advection_buffer: usize,
    pub do_coriolis: bool,
}

/// The wet/dry classification of a momentum face (spec §4.4 step 1,
/// cases `a1..d3` in the original). `depth` is the weight the pressure
/// term, friction, and advection are evaluated against — the average of
/// both sides when both are wet, but the wet side's own depth alone when
/// only one side is.
#[derive(Clone, Copy, Debug, PartialEq)]
enum FaceCase {
    /// Neither side carries enough water, or the still-water bed itself
    /// rises above sea level here: no valid velocity, flux is 0.
    Invalid,
    /// Both neighbors are wet: the ordinary case.
    WetWet { depth: f64 },
    /// Only the near (west/south) side is wet, and its surface stands
    /// higher than the far side's bed — water is rising onto the dry
    /// cell.
    InundatingNear { depth: f64 },
    /// Only the far (east/north) side is wet, and its surface stands
    /// higher than the near side's bed.
    InundatingFar { depth: f64 },
    /// One side is dry and the wet side's surface does not clear the
    /// dry side's bed: treated as a reflecting wall, flux 0.
    Blocked,
}

fn classify(bat_near: f64, bat_far: f64, h_near: f64, h_far: f64, eta_near: f64, eta_far: f64) -> FaceCase {
    let dpa = 0.5 * (bat_near + bat_far);
    if dpa <= 0.0 && h_near < EPS_WET && h_far < EPS_WET {
        return FaceCase::Invalid;
    }

    let wet_near = h_near >= EPS_WET;
    let wet_far = h_far >= EPS_WET;

    match (wet_near, wet_far) {
        (false, false) => FaceCase::Invalid,
        (true, true) => FaceCase::WetWet {
            depth: 0.5 * (h_near + h_far),
        },
        (true, false) => {
            if eta_near > -bat_far {
                FaceCase::InundatingNear { depth: h_near }
            } else {
                FaceCase::Blocked
            }
        }
        (false, true) => {
            if eta_far > -bat_near {
                FaceCase::InundatingFar { depth: h_far }
            } else {
                FaceCase::Blocked
            }
        }
    }
}

/// Semi-implicit Manning friction close-out (spec §4.4 step 7):
/// `flux_new = flux_candidate / (1 + ff)`, where `ff` is the
/// dimensionless friction factor built from the *orthogonal* flux pair
/// `(f_along, g_across)`, not `f_along` alone.
fn apply_friction(flux_candidate: f64, f_along: f64, g_across: f64, depth: f64, dt: f64, params: &MomentumParams) -> f64 {
    if params.manning <= 0.0 || depth <= params.manning_depth {
        return flux_candidate;
    }
    let speed = (f_along * f_along + g_across * g_across).sqrt();
    let ff = NORMAL_GRAV * params.manning * params.manning * dt * speed / depth.powf(7.0 / 3.0);
    flux_candidate / (1.0 + ff)
}

/// Advance the m-direction (x / longitude) momentum equation.
pub fn moment_m(level: &mut LevelState, coeffs: &ProjectionCoefficients, params: &MomentumParams) {
    let nx = level.header.nx;
    let ny = level.header.ny;

    for row in 0..ny {
        let factors = coeffs.row(row);
        for col in 0..nx.saturating_sub(1) {
            let ij = level.header.index(col, row);
            let ije = level.header.index(col + 1, row);

            let case = classify(
                level.bat[ij],
                level.bat[ije],
                level.h_total_d[ij],
                level.h_total_d[ije],
                level.eta_d[ij],
                level.eta_d[ije],
            );

            let depth = match case {
                FaceCase::Invalid | FaceCase::Blocked => {
                    level.flux_m_d[ij] = 0.0;
                    continue;
                }
                FaceCase::WetWet { depth } => depth,
                FaceCase::InundatingNear { depth } => depth,
                FaceCase::InundatingFar { depth } => depth,
            };

            let pressure_grad = factors.r2m * (level.eta_d[ije] - level.eta_d[ij]);
            let mut xp = level.flux_m_a[ij] - depth * pressure_grad;

            if depth > EPS_DEPTH {
                let flux_n_avg = quad_average_n(level, col, row);
                if params.do_coriolis {
                    xp += factors.r4m * flux_n_avg;
                }

                if col >= params.advection_buffer
                    && col + 1 + params.advection_buffer < nx
                    && depth > EPS_ADVECTION
                {
                    xp -= factors.r3m * advection_term_m(level, col, row, depth);
                }

                xp = apply_friction(xp, level.flux_m_a[ij], flux_n_avg, depth, coeffs.dt, params);
            }

            if params.discharge_limit > 0.0 {
                let max_flux = params.discharge_limit * depth;
                xp = xp.clamp(-max_flux, max_flux);
            }

            level.flux_m_d[ij] = xp;
        }
        // Rightmost column's east-facing flux has no outward neighbor;
        // it stays at whatever the boundary module wrote there.
    }

    if let Some(vel) = level.velocity.as_mut() {
        for row in 0..ny {
            for col in 0..nx {
                let ij = level.header.index(col, row);
                let h = level.h_total_d[ij];
                vel.vx[ij] = if h > EPS_VELOCITY {
                    level.flux_m_d[ij] / h
                } else {
                    0.0
                };
            }
        }
    }
}

/// Advance the n-direction (y / latitude) momentum equation.
pub fn moment_n(level: &mut LevelState, coeffs: &ProjectionCoefficients, params: &MomentumParams) {
    let nx = level.header.nx;
    let ny = level.header.ny;

    for row in 0..ny.saturating_sub(1) {
        let factors = coeffs.row(row);
        for col in 0..nx {
            let ij = level.header.index(col, row);
            let ijn = level.header.index(col, row + 1);

            let case = classify(
                level.bat[ij],
                level.bat[ijn],
                level.h_total_d[ij],
                level.h_total_d[ijn],
                level.eta_d[ij],
                level.eta_d[ijn],
            );

            let depth = match case {
                FaceCase::Invalid | FaceCase::Blocked => {
                    level.flux_n_d[ij] = 0.0;
                    continue;
                }
                FaceCase::WetWet { depth } => depth,
                FaceCase::InundatingNear { depth } => depth,
                FaceCase::InundatingFar { depth } => depth,
            };

            let pressure_grad = factors.r2n * (level.eta_d[ijn] - level.eta_d[ij]);
            let mut xp = level.flux_n_a[ij] - depth * pressure_grad;

            if depth > EPS_DEPTH {
                let flux_m_avg = quad_average_m(level, col, row);
                if params.do_coriolis {
                    xp -= factors.r4n * flux_m_avg;
                }

                if row >= params.advection_buffer
                    && row + 1 + params.advection_buffer < ny
                    && depth > EPS_ADVECTION
                {
                    xp -= factors.r3n * advection_term_n(level, col, row, depth);
                }

                xp = apply_friction(xp, level.flux_n_a[ij], flux_m_avg, depth, coeffs.dt, params);
            }

            if params.discharge_limit > 0.0 {
                let max_flux = params.discharge_limit * depth;
                xp = xp.clamp(-max_flux, max_flux);
            }

            level.flux_n_d[ij] = xp;
        }
    }

    if let Some(vel) = level.velocity.as_mut() {
        for row in 0..ny {
            for col in 0..nx {
                let ij = level.header.index(col, row);
                let h = level.h_total_d[ij];
                vel.vy[ij] = if h > EPS_VELOCITY {
                    level.flux_n_d[ij] / h
                } else {
                    0.0
                };
            }
        }
    }
}

/// Average of the four n-fluxes surrounding an m-face, used both by the
/// Coriolis term and as the orthogonal flux component in friction, in
/// [`moment_m`].
fn quad_average_n(level: &LevelState, col: usize, row: usize) -> f64 {
    let nx = level.header.nx;
    let ny = level.header.ny;
    let south = row.saturating_sub(1);
    let east = (col + 1).min(nx - 1);

    let mut sum = 0.0;
    let mut count = 0.0;
    for &(c, r) in &[(col, row), (east, row), (col, south), (east, south)] {
        if r < ny {
            sum += level.flux_n_a[level.header.index(c, r)];
            count += 1.0;
        }
    }
    if count > 0.0 {
        sum / count
    } else {
        0.0
    }
}

/// Average of the four m-fluxes surrounding an n-face, used both by the
/// Coriolis term and as the orthogonal flux component in friction, in
/// [`moment_n`].
fn quad_average_m(level: &LevelState, col: usize, row: usize) -> f64 {
    let nx = level.header.nx;
    let north = (row + 1).min(level.header.ny - 1);
    let west = col.saturating_sub(1);

    let mut sum = 0.0;
    let mut count = 0.0;
    for &(c, r) in &[(col, row), (west, row), (col, north), (west, north)] {
        if c < nx {
            sum += level.flux_m_a[level.header.index(c, r)];
            count += 1.0;
        }
    }
    if count > 0.0 {
        sum / count
    } else {
        0.0
    }
}

/// First-order upwind advection of m-momentum along both axes.
fn advection_term_m(level: &LevelState, col: usize, row: usize, depth: f64) -> f64 {
    let nx = level.header.nx;
    let ny = level.header.ny;
    let ij = level.header.index(col, row);
    let flux_here = level.flux_m_a[ij];

    let dmdx = if flux_here >= 0.0 && col > 0 {
        let west = level.header.index(col - 1, row);
        (flux_here.powi(2) / depth.max(EPS_DEPTH))
            - (level.flux_m_a[west].powi(2) / depth.max(EPS_DEPTH))
    } else if col + 2 < nx {
        let east = level.header.index(col + 2, row);
        (level.flux_m_a[east].powi(2) / depth.max(EPS_DEPTH))
            - (flux_here.powi(2) / depth.max(EPS_DEPTH))
    } else {
        0.0
    };

    let dmdy = if row > 0 && row + 1 < ny {
        let north = level.header.index(col, row + 1);
        let south = level.header.index(col, row - 1);
        let v_avg = 0.5 * (level.flux_n_a[north] + level.flux_n_a[south]);
        v_avg * (level.flux_m_a[north] - level.flux_m_a[south]) / (2.0 * depth.max(EPS_DEPTH))
    } else {
        0.0
    };

    dmdx + dmdy
}

/// First-order upwind advection of n-momentum along both axes.
fn advection_term_n(level: &LevelState, col: usize, row: usize, depth: f64) -> f64 {
    let nx = level.header.nx;
    let ny = level.header.ny;
    let ij = level.header.index(col, row);
    let flux_here = level.flux_n_a[ij];

    let dndy = if flux_here >= 0.0 && row > 0 {
        let south = level.header.index(col, row - 1);
        (flux_here.powi(2) / depth.max(EPS_DEPTH))
            - (level.flux_n_a[south].powi(2) / depth.max(EPS_DEPTH))
    } else if row + 2 < ny {
        let north = level.header.index(col, row + 2);
        (level.flux_n_a[north].powi(2) / depth.max(EPS_DEPTH))
            - (flux_here.powi(2) / depth.max(EPS_DEPTH))
    } else {
        0.0
    };

    let dndx = if col > 0 && col + 1 < nx {
        let east = level.header.index(col + 1, row);
        let west = level.header.index(col - 1, row);
        let u_avg = 0.5 * (level.flux_m_a[east] + level.flux_m_a[west]);
        u_avg * (level.flux_n_a[east] - level.flux_n_a[west]) / (2.0 * depth.max(EPS_DEPTH))
    } else {
        0.0
    };

    dndy + dndx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::coeffs::ProjectionCoefficients;
    use crate::grid::GridHeader;

    fn flat_level(nx: usize, ny: usize, depth: f64) -> LevelState {
        let header = GridHeader {
            nx,
            ny,
            x_min: 0.0,
            y_min: 0.0,
            x_inc: 1.0,
            y_inc: 1.0,
            z_min: -depth,
            z_max: -1.0,
            is_geographic: false,
            coriolis_latitude_ref: None,
        };
        let bat = vec![depth; nx * ny];
        let mut level = LevelState::allocate(header, &bat, false, true);
        level.h_total_d.copy_from_slice(&vec![depth; nx * ny]);
        level.h_total_a.copy_from_slice(&level.h_total_d);
        level
    }

    fn flat_params() -> MomentumParams {
        MomentumParams {
            manning: 0.0,
            manning_depth: 0.0,
            discharge_limit: 0.0,
            advection_buffer: 0,
            do_coriolis: false,
        }
    }

    #[test]
    fn flat_surface_with_no_prior_flux_stays_at_rest() {
        let mut level = flat_level(4, 4, 10.0);
        let coeffs = ProjectionCoefficients::cartesian(&level.header, 0.1, None).unwrap();
        let params = flat_params();
        moment_m(&mut level, &coeffs, &params);
        moment_n(&mut level, &coeffs, &params);
        assert!(level.flux_m_d.iter().all(|&f| f == 0.0));
        assert!(level.flux_n_d.iter().all(|&f| f == 0.0));
    }

    #[test]
    fn eta_slope_accelerates_flux_downhill() {
        let mut level = flat_level(3, 1, 10.0);
        let ij0 = level.header.index(0, 0);
        let ij1 = level.header.index(1, 0);
        level.eta_d[ij1] = 1.0;
        level.eta_a[ij1] = 1.0;
        let coeffs = ProjectionCoefficients::cartesian(&level.header, 0.1, None).unwrap();
        let params = flat_params();
        moment_m(&mut level, &coeffs, &params);
        assert!(level.flux_m_d[ij0] < 0.0, "higher eta to the east should drive flux westward (negative)");
    }

    #[test]
    fn dry_face_produces_zero_flux() {
        let mut level = flat_level(3, 1, 10.0);
        let ij0 = level.header.index(0, 0);
        let ij1 = level.header.index(1, 0);
        level.h_total_d[ij0] = 0.0;
        level.h_total_d[ij1] = 0.0;
        let coeffs = ProjectionCoefficients::cartesian(&level.header, 0.1, None).unwrap();
        let params = flat_params();
        moment_m(&mut level, &coeffs, &params);
        assert_eq!(level.flux_m_d[ij0], 0.0);
    }

    #[test]
    fn discharge_limiter_clamps_excessive_flux() {
        let mut level = flat_level(3, 1, 10.0);
        let ij0 = level.header.index(0, 0);
        let ij1 = level.header.index(1, 0);
        level.eta_d[ij1] = 100.0;
        level.eta_a[ij1] = 100.0;
        let coeffs = ProjectionCoefficients::cartesian(&level.header, 1.0, None).unwrap();
        let mut params = flat_params();
        params.discharge_limit = 20.0;
        moment_m(&mut level, &coeffs, &params);
        let depth = level.h_total_d[ij0];
        assert!(level.flux_m_d[ij0].abs() <= 20.0 * depth + 1e-9);
    }

    #[test]
    fn dry_neighbor_floods_when_surface_clears_its_bed() {
        // col0 is wet ocean (bat=5, h=5 => eta=0); col1 is dry land
        // (bat=-1) whose bed sits 1m above sea level. A 2m surface at
        // col0 clears it, so col1 should be classified as inundating.
        let mut level = flat_level(2, 1, 5.0);
        let bat1 = level.header.index(1, 0);
        level.bat[bat1] = -1.0;
        level.h_total_d[bat1] = 0.0;
        let ij0 = level.header.index(0, 0);
        level.eta_d[ij0] = 2.0;
        level.eta_a[ij0] = 2.0;
        let coeffs = ProjectionCoefficients::cartesian(&level.header, 0.1, None).unwrap();
        let params = flat_params();
        moment_m(&mut level, &coeffs, &params);
        // Surface at col0 (eta=2) exceeds -bat(col1)=1, so the face is
        // not blocked: a nonzero flux should be produced.
        assert_ne!(level.flux_m_d[ij0], 0.0);
    }

    #[test]
    fn dry_neighbor_stays_blocked_when_surface_does_not_clear_its_bed() {
        let mut level = flat_level(2, 1, 5.0);
        let bat1 = level.header.index(1, 0);
        level.bat[bat1] = -10.0; // bed 10m above sea level
        level.h_total_d[bat1] = 0.0;
        let ij0 = level.header.index(0, 0);
        level.eta_d[ij0] = 0.5;
        level.eta_a[ij0] = 0.5;
        let coeffs = ProjectionCoefficients::cartesian(&level.header, 0.1, None).unwrap();
        let params = flat_params();
        moment_m(&mut level, &coeffs, &params);
        assert_eq!(level.flux_m_d[ij0], 0.0);
    }

    #[test]
    fn friction_is_applied_as_a_semi_implicit_divide() {
        let mut level = flat_level(3, 1, 10.0);
        let ij0 = level.header.index(0, 0);
        let ij1 = level.header.index(1, 0);
        level.eta_d[ij1] = 1.0;
        level.eta_a[ij1] = 1.0;
        level.flux_m_a[ij0] = 2.0;
        let coeffs = ProjectionCoefficients::cartesian(&level.header, 0.1, None).unwrap();
        let mut params = flat_params();
        params.manning = 0.03;
        moment_m(&mut level, &coeffs, &params);

        let mut level_no_friction = flat_level(3, 1, 10.0);
        level_no_friction.eta_d[ij1] = 1.0;
        level_no_friction.eta_a[ij1] = 1.0;
        level_no_friction.flux_m_a[ij0] = 2.0;
        moment_m(&mut level_no_friction, &coeffs, &flat_params());

        assert!(level.flux_m_d[ij0].abs() < level_no_friction.flux_m_d[ij0].abs());
    }
}
