//! Per-row projection coefficients (spec §4.2 "coordinate dispatch").
//!
//! A level is either cartesian or geographic; the choice is made once,
//! at level-build time, never per cell. Both builders produce the same
//! [`RowFactors`] table shape so `mass.rs`/`momentum.rs` never need to
//! know which projection is in effect.

use crate::error::{NswingError, Result};
use crate::grid::{GridHeader, EARTH_ANGULAR_VELOCITY, EARTH_RADIUS_M};

const DEG_TO_RAD: f64 = std::f64::consts::PI / 180.0;

/// Coefficients needed by one grid row to evaluate the mass and momentum
/// equations, named after the `r0..r4{m,n}` tables in the original core.
#[derive(Clone, Copy, Debug, Default)]
pub struct RowFactors {
    /// Continuity-equation coefficient, m-direction (`dt/dx` at this row).
    pub r0: f64,
    /// Mass-equation divergence coefficient, m-direction.
    pub r1m: f64,
    /// Mass-equation divergence coefficient, n-direction.
    pub r1n: f64,
    /// Momentum pressure-gradient coefficient, m-direction (`g*dt/dx`).
    pub r2m: f64,
    /// Momentum pressure-gradient coefficient, n-direction (`g*dt/dy`).
    pub r2n: f64,
    /// Advection coefficient, m-direction.
    pub r3m: f64,
    /// Advection coefficient, n-direction.
    pub r3n: f64,
    /// Coriolis coefficient applied to the m-momentum equation.
    pub r4m: f64,
    /// Coriolis coefficient applied to the n-momentum equation.
    pub r4n: f64,
}

/// A level's full table of per-row factors plus the timestep they were
/// built for.
#[derive(Clone, Debug)]
pub struct ProjectionCoefficients {
    pub rows: Vec<RowFactors>,
    pub dt: f64,
}

impl ProjectionCoefficients {
    pub fn row(&self, row: usize) -> &RowFactors {
        &self.rows[row]
    }

    /// Build the table for a cartesian (non-geographic) level, where
    /// every row shares the same factors because the metric is uniform.
    pub fn cartesian(header: &GridHeader, dt: f64, coriolis_latitude_ref: Option<f64>) -> Result<Self> {
        if header.x_inc <= 0.0 || header.y_inc <= 0.0 {
            return Err(NswingError::Config(
                "cartesian grid spacing must be positive".into(),
            ));
        }
        let coriolis = coriolis_latitude_ref
            .map(|lat| 2.0 * EARTH_ANGULAR_VELOCITY * (lat * DEG_TO_RAD).sin())
            .unwrap_or(0.0);

        let row = RowFactors {
            r0: dt / header.x_inc,
            r1m: dt / header.x_inc,
            r1n: dt / header.y_inc,
            r2m: crate::grid::NORMAL_GRAV * dt / header.x_inc,
            r2n: crate::grid::NORMAL_GRAV * dt / header.y_inc,
            r3m: dt / header.x_inc,
            r3n: dt / header.y_inc,
            r4m: coriolis * dt,
            r4n: coriolis * dt,
        };

        Ok(ProjectionCoefficients {
            rows: vec![row; header.ny],
            dt,
        })
    }

    /// Build the table for a geographic (spherical) level. Each row's
    /// factors vary with latitude because meridians converge toward the
    /// poles; `dlon`/`dlat` are taken in degrees from the header.
    pub fn spherical(header: &GridHeader, dt: f64) -> Result<Self> {
        if header.x_inc <= 0.0 || header.y_inc <= 0.0 {
            return Err(NswingError::Config(
                "geographic grid spacing must be positive".into(),
            ));
        }

        let dlon_rad = header.x_inc * DEG_TO_RAD;
        let dlat_rad = header.y_inc * DEG_TO_RAD;

        let mut rows = Vec::with_capacity(header.ny);
        for j in 0..header.ny {
            let phi_m = header.row_lat_center(j) * DEG_TO_RAD;
            let phi_n = header.row_lat_face(j) * DEG_TO_RAD;
            let cos_m = phi_m.cos();
            let cos_n = phi_n.cos();

            if cos_m.abs() < 1e-12 || cos_n.abs() < 1e-12 {
                return Err(NswingError::Config(format!(
                    "geographic row {j} lies on a pole, projection is singular there"
                )));
            }

            let r0 = dt / (EARTH_RADIUS_M * cos_m * dlon_rad);
            let r1m = dt / (EARTH_RADIUS_M * cos_m * dlon_rad);
            let r1n = dt / (EARTH_RADIUS_M * dlat_rad);
            let r2m = crate::grid::NORMAL_GRAV * dt / (EARTH_RADIUS_M * cos_m * dlon_rad);
            let r2n = crate::grid::NORMAL_GRAV * dt / (EARTH_RADIUS_M * dlat_rad);
            let r3m = dt / (EARTH_RADIUS_M * cos_n * dlon_rad);
            let r3n = dt / (EARTH_RADIUS_M * dlat_rad);
            let r4m = 2.0 * EARTH_ANGULAR_VELOCITY * phi_m.sin() * dt;
            let r4n = 2.0 * EARTH_ANGULAR_VELOCITY * phi_n.sin() * dt;

            rows.push(RowFactors {
                r0,
                r1m,
                r1n,
                r2m,
                r2n,
                r3m,
                r3n,
                r4m,
                r4n,
            });
        }

        Ok(ProjectionCoefficients { rows, dt })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn header(is_geographic: bool) -> GridHeader {
        GridHeader {
            nx: 4,
            ny: 5,
            x_min: 0.0,
            y_min: 10.0,
            x_inc: 0.01,
            y_inc: 0.01,
            z_min: -100.0,
            z_max: 10.0,
            is_geographic,
            coriolis_latitude_ref: Some(10.0),
        }
    }

    #[test]
    fn cartesian_rows_are_uniform() {
        let hdr = header(false);
        let coeffs = ProjectionCoefficients::cartesian(&hdr, 0.5, None).unwrap();
        assert_eq!(coeffs.rows.len(), hdr.ny);
        for row in &coeffs.rows {
            assert_relative_eq!(row.r0, 50.0);
        }
    }

    #[test]
    fn spherical_rows_vary_with_latitude() {
        let hdr = header(true);
        let coeffs = ProjectionCoefficients::spherical(&hdr, 1.0).unwrap();
        assert_eq!(coeffs.rows.len(), hdr.ny);
        assert!(coeffs.rows[0].r0 != coeffs.rows[hdr.ny - 1].r0);
    }

    #[test]
    fn spherical_rejects_pole_rows() {
        let mut hdr = header(true);
        hdr.y_min = 90.0;
        let err = ProjectionCoefficients::spherical(&hdr, 1.0);
        assert!(err.is_err());
    }
}
