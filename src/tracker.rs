//! Running maxima and decimated energy/power bookkeeping (spec §4.9).

use crate::grid::LevelState;

/// Per-level running maxima, updated once per committed step.
#[derive(Clone, Debug)]
pub struct MaxTracker {
    pub wmax: Vec<f64>,
    pub vmax: Vec<f64>,
}

impl MaxTracker {
    pub fn new(cell_count: usize) -> Self {
        MaxTracker {
            wmax: vec![0.0; cell_count],
            vmax: vec![0.0; cell_count],
        }
    }

    /// Update the running maximum elevation (spec §4.9, §8 "wmax is
    /// monotonically non-decreasing"). Ordinarily tracks `eta_d`
    /// directly; on land cells (`bat < 0`) `eta_d` still carries the
    /// dry-cell bookkeeping value, so the land case instead tracks
    /// inundation height above ground, `eta_a + bat`, clamped to never
    /// go negative.
    pub fn update_wmax(&mut self, level: &LevelState) {
        for ij in 0..self.wmax.len() {
            let mut work = level.eta_d[ij];
            if level.bat[ij] < 0.0 {
                work = (level.eta_a[ij] + level.bat[ij]).max(0.0);
            }
            if work > self.wmax[ij] {
                self.wmax[ij] = work;
            }
        }
    }

    /// Update the running maximum speed from the level's velocity
    /// fields, if the level tracks them (spec §8 "vmax is monotonically
    /// non-decreasing").
    pub fn update_vmax(&mut self, level: &LevelState) {
        let Some(vel) = level.velocity.as_ref() else {
            return;
        };
        for i in 0..self.vmax.len() {
            let speed = (vel.vx[i] * vel.vx[i] + vel.vy[i] * vel.vy[i]).sqrt();
            if speed > self.vmax[i] {
                self.vmax[i] = speed;
            }
        }
    }
}

/// Domain-integrated energy and power, sampled every `decimation` steps
/// rather than every step (spec §9 "decimated tracker hook").
#[derive(Clone, Copy, Debug, Default)]
pub struct EnergyPower {
    pub potential_j: f64,
    pub kinetic_j: f64,
    pub power_w: f64,
}

/// Compute instantaneous energy/power for one level. `cell_area_m2` is
/// the (approximately constant, for small cartesian levels) area of one
/// cell; geographic levels should pass the area at the level's central
/// latitude.
pub fn energy_power(level: &LevelState, cell_area_m2: f64, rho: f64, dt: f64) -> EnergyPower {
    let g = crate::grid::NORMAL_GRAV;
    let mut potential = 0.0;
    let mut kinetic = 0.0;

    for ij in 0..level.eta_a.len() {
        if level.is_permanent_dry(ij) {
            continue;
        }
        let h = level.h_total_a[ij];
        if h <= 0.0 {
            continue;
        }
        potential += 0.5 * rho * g * level.eta_a[ij] * level.eta_a[ij] * cell_area_m2;
        if let Some(vel) = level.velocity.as_ref() {
            let speed2 = vel.vx[ij] * vel.vx[ij] + vel.vy[ij] * vel.vy[ij];
            kinetic += 0.5 * rho * h * speed2 * cell_area_m2;
        }
    }

    EnergyPower {
        potential_j: potential,
        kinetic_j: kinetic,
        power_w: (potential + kinetic) / dt.max(1e-9),
    }
}
