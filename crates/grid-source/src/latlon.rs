//! Lambert Conformal Conic coordinate generation for HRRR grids.
//!
//! HRRR files carry values only; the lat/lon of each cell is derived from
//! the grid's Lambert projection parameters. The full coordinate arrays are
//! generated once per grid shape and shared behind an `Arc` by every field
//! pulled from that grid.

use std::f64::consts::PI;

use hazard_common::normalize_lon;

/// Parallel 2-D latitude/longitude arrays, row-major, longitudes already
/// normalized to (-180, 180].
#[derive(Debug, Clone)]
pub struct LatLonGrid {
    pub lat: Vec<f64>,
    pub lon: Vec<f64>,
    pub ny: usize,
    pub nx: usize,
}

impl LatLonGrid {
    pub fn shape(&self) -> (usize, usize) {
        (self.ny, self.nx)
    }

    pub fn lat_at(&self, row: usize, col: usize) -> f64 {
        self.lat[row * self.nx + col]
    }

    pub fn lon_at(&self, row: usize, col: usize) -> f64 {
        self.lon[row * self.nx + col]
    }
}

/// Lambert Conformal Conic grid definition.
#[derive(Debug, Clone)]
pub struct LambertGrid {
    /// Central meridian (LoV), radians.
    lon0: f64,
    /// Grid spacing, meters.
    dx: f64,
    dy: f64,
    pub nx: usize,
    pub ny: usize,
    earth_radius: f64,
    /// Cone constant.
    n: f64,
    f: f64,
    rho0: f64,
    /// First grid point in projection coordinates.
    x0: f64,
    y0: f64,
}

impl LambertGrid {
    /// Build a grid from GRIB-style parameters (degrees and meters).
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        lat1_deg: f64,
        lon1_deg: f64,
        lov_deg: f64,
        latin1_deg: f64,
        latin2_deg: f64,
        dx: f64,
        dy: f64,
        nx: usize,
        ny: usize,
    ) -> Self {
        let to_rad = PI / 180.0;
        let lat1 = lat1_deg * to_rad;
        let lon1 = lon1_deg * to_rad;
        let lon0 = lov_deg * to_rad;
        let latin1 = latin1_deg * to_rad;
        let latin2 = latin2_deg * to_rad;

        let earth_radius = 6_371_229.0;

        // Cone constant: tangent cone when the standard parallels coincide.
        let n = if (latin1 - latin2).abs() < 1e-10 {
            latin1.sin()
        } else {
            let ln_ratio = (latin1.cos() / latin2.cos()).ln();
            let tan_ratio =
                ((PI / 4.0 + latin2 / 2.0).tan() / (PI / 4.0 + latin1 / 2.0).tan()).ln();
            ln_ratio / tan_ratio
        };

        let f = (latin1.cos() * (PI / 4.0 + latin1 / 2.0).tan().powf(n)) / n;
        let rho0 = earth_radius * f / (PI / 4.0 + lat1 / 2.0).tan().powf(n);

        // First grid point in projection coordinates.
        let mut dlon1 = lon1 - lon0;
        while dlon1 > PI {
            dlon1 -= 2.0 * PI;
        }
        while dlon1 < -PI {
            dlon1 += 2.0 * PI;
        }
        let theta1 = n * dlon1;
        let x0 = rho0 * theta1.sin();
        let y0 = rho0 - rho0 * theta1.cos();

        Self {
            lon0,
            dx,
            dy,
            nx,
            ny,
            earth_radius,
            n,
            f,
            rho0,
            x0,
            y0,
        }
    }

    /// The HRRR CONUS 3-km grid (1799 x 1059).
    pub fn hrrr_conus() -> Self {
        Self::new(
            21.138123,   // lat of first grid point
            -122.719528, // lon of first grid point (237.280472 - 360)
            -97.5,       // LoV (262.5 - 360)
            38.5,        // latin1
            38.5,        // latin2
            3000.0,
            3000.0,
            1799,
            1059,
        )
    }

    /// Convert grid indices (i = column, j = row) to (lat, lon) in degrees.
    pub fn grid_to_geo(&self, i: f64, j: f64) -> (f64, f64) {
        let to_deg = 180.0 / PI;

        let x = self.x0 + i * self.dx;
        let y = self.y0 + j * self.dy;

        let rho = (x * x + (self.rho0 - y) * (self.rho0 - y)).sqrt();
        let rho = if self.n < 0.0 { -rho } else { rho };
        let theta = (x / (self.rho0 - y)).atan();

        let lat = 2.0 * ((self.earth_radius * self.f / rho).powf(1.0 / self.n)).atan() - PI / 2.0;
        let lon = self.lon0 + theta / self.n;

        (lat * to_deg, normalize_lon(lon * to_deg))
    }

    /// Generate the full coordinate arrays for this grid.
    pub fn latlon_arrays(&self) -> LatLonGrid {
        let mut lat = Vec::with_capacity(self.ny * self.nx);
        let mut lon = Vec::with_capacity(self.ny * self.nx);
        for j in 0..self.ny {
            for i in 0..self.nx {
                let (la, lo) = self.grid_to_geo(i as f64, j as f64);
                lat.push(la);
                lon.push(lo);
            }
        }
        LatLonGrid {
            lat,
            lon,
            ny: self.ny,
            nx: self.nx,
        }
    }
}
