//! Point-sample output: maregraph (virtual tide gauge) readings and
//! passive tracer advection (spec §4.10, §6 "maregraphs").

use crate::grid::LevelState;

/// A fixed point on a level where eta is recorded every `interval`
/// steps (spec §6 "maregraphs").
#[derive(Clone, Copy, Debug)]
pub struct Maregraph {
    pub x: f64,
    pub y: f64,
}

/// Bilinear-interpolate `field` (row-major, `header`-shaped) at a
/// real-valued grid position `(col, row)`.
fn bilinear(level: &LevelState, field: &[f64], col: f64, row: f64) -> f64 {
    let nx = level.header.nx;
    let ny = level.header.ny;
    let col = col.clamp(0.0, (nx - 1) as f64);
    let row = row.clamp(0.0, (ny - 1) as f64);

    let c0 = col.floor() as usize;
    let r0 = row.floor() as usize;
    let c1 = (c0 + 1).min(nx - 1);
    let r1 = (r0 + 1).min(ny - 1);

    let fc = col - c0 as f64;
    let fr = row - r0 as f64;

    let v00 = field[level.header.index(c0, r0)];
    let v10 = field[level.header.index(c1, r0)];
    let v01 = field[level.header.index(c0, r1)];
    let v11 = field[level.header.index(c1, r1)];

    let top = v00 + fc * (v10 - v00);
    let bottom = v01 + fc * (v11 - v01);
    top + fr * (bottom - top)
}

/// Sample a maregraph's current eta from the level.
pub fn sample_maregraph(level: &LevelState, point: &Maregraph) -> f64 {
    let col = (point.x - level.header.x_min) / level.header.x_inc;
    let row = (point.y - level.header.y_min) / level.header.y_inc;
    bilinear(level, &level.eta_a, col, row)
}

/// A passive tracer particle advected by the level's velocity field.
#[derive(Clone, Copy, Debug)]
pub struct Tracer {
    pub x: f64,
    pub y: f64,
}

impl Tracer {
    /// Advance the tracer one explicit Euler step using bilinearly
    /// interpolated velocity at its current position.
    pub fn advect(&mut self, level: &LevelState, dt: f64) {
        let Some(vel) = level.velocity.as_ref() else {
            return;
        };
        let col = (self.x - level.header.x_min) / level.header.x_inc;
        let row = (self.y - level.header.y_min) / level.header.y_inc;
        let vx = bilinear(level, &vel.vx, col, row);
        let vy = bilinear(level, &vel.vy, col, row);
        self.x += vx * dt;
        self.y += vy * dt;
    }
}
