//! Open-sea boundaries and forced wave sources (spec §4.5, §4.7).
//!
//! The original core enforced a wall by mutating bathymetry in place so
//! the ordinary stencil would see a dry cell there. That conflates
//! "permanently dry" with "temporarily walled off for this run", so here
//! a wall is a [`BorderMode`] instead: the mass/momentum solvers never
//! see it, the boundary pass applies it directly to the flux/eta arrays
//! each step.

use crate::grid::{LevelState, EPS_DEPTH, EPS_WET, NORMAL_GRAV};

/// What a given edge of a level's domain does with outgoing/incoming
/// waves (spec §4.5).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BorderMode {
    /// Radiating (Sommerfeld-type) open boundary: waves leave freely.
    Open,
    /// Reflective wall: normal flux pinned to zero.
    Wall,
    /// Driven by an external time series (spec §4.5, §4.7 "wave maker").
    Forced,
}

#[derive(Clone, Debug)]
pub struct BorderConfig {
    pub west: BorderMode,
    pub east: BorderMode,
    pub south: BorderMode,
    pub north: BorderMode,
    pub west_series: Vec<WaveSample>,
    pub east_series: Vec<WaveSample>,
    pub south_series: Vec<WaveSample>,
    pub north_series: Vec<WaveSample>,
}

impl Default for BorderConfig {
    fn default() -> Self {
        BorderConfig {
            west: BorderMode::Open,
            east: BorderMode::Open,
            south: BorderMode::Open,
            north: BorderMode::Open,
            west_series: Vec::new(),
            east_series: Vec::new(),
            south_series: Vec::new(),
            north_series: Vec::new(),
        }
    }
}

/// A single time/amplitude sample of a forced boundary series.
#[derive(Clone, Copy, Debug)]
pub struct WaveSample {
    pub time_s: f64,
    pub eta: f64,
}

/// Linearly interpolate a forced-boundary time series at `time_s`
/// (spec §6 "boundary condition files"). Samples must be sorted by time.
pub fn interpolate_wave(samples: &[WaveSample], time_s: f64) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    if time_s <= samples[0].time_s {
        return samples[0].eta;
    }
    if time_s >= samples[samples.len() - 1].time_s {
        return samples[samples.len() - 1].eta;
    }
    let idx = samples.partition_point(|s| s.time_s <= time_s).saturating_sub(1);
    let a = samples[idx];
    let b = samples[idx + 1];
    let span = b.time_s - a.time_s;
    if span <= 0.0 {
        return a.eta;
    }
    let t = (time_s - a.time_s) / span;
    a.eta + t * (b.eta - a.eta)
}

/// Apply the boundary condition to all four edges (and corners) of a
/// level, after mass/momentum have run for this step (spec §4.5, §4.7).
/// `time_s` is the simulation clock, consulted only by `Forced` edges.
pub fn apply_open_boundaries(level: &mut LevelState, config: &BorderConfig, time_s: f64) {
    let nx = level.header.nx;
    let ny = level.header.ny;
    if nx < 2 || ny < 2 {
        return;
    }

    // Interior of each edge (corners handled separately below so a cell
    // on two edges at once isn't resolved by whichever loop runs last).
    for row in 1..ny - 1 {
        match config.west {
            BorderMode::Open => radiate_west(level, row),
            BorderMode::Wall => {
                let ij = level.header.index(0, row);
                level.flux_m_d[ij] = 0.0;
            }
            BorderMode::Forced => force_west(level, row, &config.west_series, time_s),
        }
        match config.east {
            BorderMode::Open => radiate_east(level, row),
            BorderMode::Wall => {
                level.flux_m_d[level.header.index(nx - 2, row)] = 0.0;
            }
            BorderMode::Forced => force_east(level, row, &config.east_series, time_s),
        }
    }
    for col in 1..nx - 1 {
        match config.south {
            BorderMode::Open => radiate_south(level, col),
            BorderMode::Wall => {
                let ij = level.header.index(col, 0);
                level.flux_n_d[ij] = 0.0;
            }
            BorderMode::Forced => force_south(level, col, &config.south_series, time_s),
        }
        match config.north {
            BorderMode::Open => radiate_north(level, col),
            BorderMode::Wall => {
                let south = level.header.index(col, ny - 2);
                level.flux_n_d[south] = 0.0;
            }
            BorderMode::Forced => force_north(level, col, &config.north_series, time_s),
        }
    }

    apply_corners(level, config, time_s);
}

fn wave_speed_denom(bat: f64) -> f64 {
    (NORMAL_GRAV * bat.max(EPS_DEPTH)).sqrt()
}

/// Sommerfeld radiation value for one cell (spec §4.7): wet cells get
/// `±sqrt(M^2+N^2)/sqrt(g*bat)`, sign following the outward-pointing
/// flux component; dry cells get `-bat` (shoreline matches the bed).
fn radiating_eta(level: &LevelState, ij: usize, outward: f64, m: f64, n: f64) -> f64 {
    let bat = level.bat[ij];
    if level.h_total_d[ij] < EPS_WET {
        return -bat;
    }
    let speed = (m * m + n * n).sqrt();
    let denom = wave_speed_denom(bat);
    if outward >= 0.0 {
        speed / denom
    } else {
        -speed / denom
    }
}

fn radiate_west(level: &mut LevelState, row: usize) {
    let ij = level.header.index(0, row);
    let m = level.flux_m_d[ij];
    let n = level.flux_n_d[ij];
    level.eta_d[ij] = radiating_eta(level, ij, -m, m, n);
}

fn radiate_east(level: &mut LevelState, row: usize) {
    let nx = level.header.nx;
    let ij = level.header.index(nx - 1, row);
    let west = level.header.index(nx - 2, row);
    let m = level.flux_m_d[west];
    let n = level.flux_n_d[ij];
    level.eta_d[ij] = radiating_eta(level, ij, m, m, n);
}

fn radiate_south(level: &mut LevelState, col: usize) {
    let ij = level.header.index(col, 0);
    let m = level.flux_m_d[ij];
    let n = level.flux_n_d[ij];
    level.eta_d[ij] = radiating_eta(level, ij, -n, m, n);
}

fn radiate_north(level: &mut LevelState, col: usize) {
    let ny = level.header.ny;
    let ij = level.header.index(col, ny - 1);
    let south = level.header.index(col, ny - 2);
    let m = level.flux_m_d[ij];
    let n = level.flux_n_d[south];
    level.eta_d[ij] = radiating_eta(level, ij, n, m, n);
}

fn force_west(level: &mut LevelState, row: usize, series: &[WaveSample], time_s: f64) {
    let ij = level.header.index(0, row);
    level.eta_d[ij] = interpolate_wave(series, time_s);
}

fn force_east(level: &mut LevelState, row: usize, series: &[WaveSample], time_s: f64) {
    let ij = level.header.index(level.header.nx - 1, row);
    level.eta_d[ij] = interpolate_wave(series, time_s);
}

fn force_south(level: &mut LevelState, col: usize, series: &[WaveSample], time_s: f64) {
    let ij = level.header.index(col, 0);
    level.eta_d[ij] = interpolate_wave(series, time_s);
}

fn force_north(level: &mut LevelState, col: usize, series: &[WaveSample], time_s: f64) {
    let ij = level.header.index(col, level.header.ny - 1);
    level.eta_d[ij] = interpolate_wave(series, time_s);
}

/// The four corners, each touched by exactly one (column edge, row
/// edge) pair. Handled explicitly, after the edge interiors, so a
/// corner's value always reflects both of its edges rather than
/// whichever edge's loop happened to run last (spec §4.7, SPEC_FULL §11).
fn apply_corners(level: &mut LevelState, config: &BorderConfig, time_s: f64) {
    let nx = level.header.nx;
    let ny = level.header.ny;

    let corners: [(usize, usize, BorderMode, BorderMode, &[WaveSample], &[WaveSample], f64, f64); 4] = [
        (
            0,
            0,
            config.west,
            config.south,
            &config.west_series,
            &config.south_series,
            -1.0,
            -1.0,
        ),
        (
            nx - 1,
            0,
            config.east,
            config.south,
            &config.east_series,
            &config.south_series,
            1.0,
            -1.0,
        ),
        (
            0,
            ny - 1,
            config.west,
            config.north,
            &config.west_series,
            &config.north_series,
            -1.0,
            1.0,
        ),
        (
            nx - 1,
            ny - 1,
            config.east,
            config.north,
            &config.east_series,
            &config.north_series,
            1.0,
            1.0,
        ),
    ];

    for (col, row, col_mode, row_mode, col_series, row_series, outward_x, outward_y) in corners {
        let ij = level.header.index(col, row);

        let forced_col = matches!(col_mode, BorderMode::Forced);
        let forced_row = matches!(row_mode, BorderMode::Forced);
        if forced_col || forced_row {
            let series = if forced_col { col_series } else { row_series };
            level.eta_d[ij] = interpolate_wave(series, time_s);
            continue;
        }

        // A wall edge's normal flux was already pinned to zero by its
        // own edge loop at the adjacent interior cell; the corner cell
        // itself carries no separate normal-flux term to zero here.

        let open_col = matches!(col_mode, BorderMode::Open);
        let open_row = matches!(row_mode, BorderMode::Open);
        if open_col || open_row {
            let m = level.flux_m_d[ij];
            let n = level.flux_n_d[ij];
            // The diagonal outward normal is the sum of the two edges'
            // normals; project (m, n) onto it to get the signed outward
            // component feeding the radiation formula.
            let projected = match (open_col, open_row) {
                (true, true) => outward_x * m + outward_y * n,
                (true, false) => outward_x * m,
                (false, true) => outward_y * n,
                (false, false) => 0.0,
            };
            level.eta_d[ij] = radiating_eta(level, ij, projected, m, n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interpolation_clamps_outside_series_range() {
        let samples = vec![
            WaveSample { time_s: 0.0, eta: 1.0 },
            WaveSample { time_s: 10.0, eta: 3.0 },
        ];
        assert_eq!(interpolate_wave(&samples, -5.0), 1.0);
        assert_eq!(interpolate_wave(&samples, 50.0), 3.0);
    }

    #[test]
    fn interpolation_is_linear_between_samples() {
        let samples = vec![
            WaveSample { time_s: 0.0, eta: 0.0 },
            WaveSample { time_s: 10.0, eta: 10.0 },
        ];
        assert_eq!(interpolate_wave(&samples, 5.0), 5.0);
    }

    #[test]
    fn wall_zeroes_normal_flux_on_all_named_edges() {
        use crate::grid::GridHeader;
        let header = GridHeader {
            nx: 3,
            ny: 3,
            x_min: 0.0,
            y_min: 0.0,
            x_inc: 1.0,
            y_inc: 1.0,
            z_min: -10.0,
            z_max: -1.0,
            is_geographic: false,
            coriolis_latitude_ref: None,
        };
        let bat = vec![10.0; 9];
        let mut level = LevelState::allocate(header, &bat, false, false);
        level.flux_m_d.iter_mut().for_each(|f| *f = 5.0);
        level.flux_n_d.iter_mut().for_each(|f| *f = 5.0);
        let config = BorderConfig {
            west: BorderMode::Wall,
            east: BorderMode::Wall,
            south: BorderMode::Wall,
            north: BorderMode::Wall,
            ..BorderConfig::default()
        };
        apply_open_boundaries(&mut level, &config, 0.0);
        // Interior-of-edge cell (the only non-corner row/col with nx=ny=3)
        assert_eq!(level.flux_m_d[level.header.index(0, 1)], 0.0);
        assert_eq!(level.flux_n_d[level.header.index(1, 0)], 0.0);
    }

    #[test]
    fn dry_edge_cell_gets_minus_bat() {
        use crate::grid::GridHeader;
        let header = GridHeader {
            nx: 4,
            ny: 3,
            x_min: 0.0,
            y_min: 0.0,
            x_inc: 1.0,
            y_inc: 1.0,
            z_min: -10.0,
            z_max: 10.0,
            is_geographic: false,
            coriolis_latitude_ref: None,
        };
        let bat = vec![-3.0; 12];
        let mut level = LevelState::allocate(header, &bat, false, false);
        level.h_total_d.iter_mut().for_each(|h| *h = 0.0);
        let config = BorderConfig::default();
        apply_open_boundaries(&mut level, &config, 0.0);
        let ij = level.header.index(0, 1);
        assert_eq!(level.eta_d[ij], 3.0);
    }

    #[test]
    fn forced_west_edge_takes_the_series_value() {
        use crate::grid::GridHeader;
        let header = GridHeader {
            nx: 3,
            ny: 3,
            x_min: 0.0,
            y_min: 0.0,
            x_inc: 1.0,
            y_inc: 1.0,
            z_min: -10.0,
            z_max: -1.0,
            is_geographic: false,
            coriolis_latitude_ref: None,
        };
        let bat = vec![10.0; 9];
        let mut level = LevelState::allocate(header, &bat, false, false);
        let config = BorderConfig {
            west: BorderMode::Forced,
            west_series: vec![
                WaveSample { time_s: 0.0, eta: 0.0 },
                WaveSample { time_s: 10.0, eta: 2.0 },
            ],
            ..BorderConfig::default()
        };
        apply_open_boundaries(&mut level, &config, 5.0);
        let ij = level.header.index(0, 1);
        assert_eq!(level.eta_d[ij], 1.0);
    }
}
