//! Grid cell keys and the cell ranges a query circle can touch.

use std::ops::RangeInclusive;

use noise_map_complaint_models::{GeoPoint, MAX_LATITUDE, MAX_LONGITUDE, MIN_LATITUDE, MIN_LONGITUDE};

use crate::geometry::{latitude_span_deg, longitude_span_deg};

/// Extra margin added to every span so that points sitting exactly on the
/// query radius never fall into an uncovered neighbouring cell through
/// rounding.
const EDGE_PADDING_DEG: f64 = 1e-9;

/// Identifies one grid cell: `(floor(lat / size), floor(lon / size))`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    /// Latitude band index.
    pub row: i64,
    /// Longitude band index.
    pub col: i64,
}

impl CellKey {
    /// Returns the cell containing `point` for a grid of `cell_size_deg`.
    #[must_use]
    pub fn containing(point: GeoPoint, cell_size_deg: f64) -> Self {
        Self {
            row: band(point.latitude(), cell_size_deg),
            col: band(point.longitude(), cell_size_deg),
        }
    }
}

#[allow(clippy::cast_possible_truncation)]
fn band(degrees: f64, cell_size_deg: f64) -> i64 {
    (degrees / cell_size_deg).floor() as i64
}

/// The set of cells a query circle may intersect.
///
/// Latitude is a single contiguous band of rows. Longitude is one range of
/// columns, or two when the circle crosses the antimeridian.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRegion {
    rows: RangeInclusive<i64>,
    cols: Vec<RangeInclusive<i64>>,
}

impl CellRegion {
    /// Computes a conservative cover of the circle of `radius_km` around
    /// `center`.
    ///
    /// Every longitude is covered when the circle reaches a pole or the
    /// center lies within one cell of a pole.
    #[must_use]
    pub fn covering(center: GeoPoint, radius_km: f64, cell_size_deg: f64) -> Self {
        let lat_span = latitude_span_deg(radius_km) + EDGE_PADDING_DEG;
        let south = (center.latitude() - lat_span).max(MIN_LATITUDE);
        let north = (center.latitude() + lat_span).min(MAX_LATITUDE);
        let rows = band(south, cell_size_deg)..=band(north, cell_size_deg);

        let near_pole = MAX_LATITUDE - center.latitude().abs() <= cell_size_deg;
        let lon_span = if near_pole {
            None
        } else {
            longitude_span_deg(center.latitude(), radius_km)
        };

        let full = || band(MIN_LONGITUDE, cell_size_deg)..=band(MAX_LONGITUDE, cell_size_deg);

        let cols = match lon_span {
            None => vec![full()],
            Some(span) => {
                let span = span + EDGE_PADDING_DEG;
                let west = center.longitude() - span;
                let east = center.longitude() + span;
                let range = |lo: f64, hi: f64| band(lo, cell_size_deg)..=band(hi, cell_size_deg);

                if west < MIN_LONGITUDE && east > MAX_LONGITUDE {
                    vec![full()]
                } else if west < MIN_LONGITUDE {
                    vec![
                        range(west + 360.0, MAX_LONGITUDE),
                        range(MIN_LONGITUDE, east),
                    ]
                } else if east > MAX_LONGITUDE {
                    vec![
                        range(west, MAX_LONGITUDE),
                        range(MIN_LONGITUDE, east - 360.0),
                    ]
                } else {
                    vec![range(west, east)]
                }
            }
        };

        Self { rows, cols }
    }

    /// Whether `key` lies inside this region.
    #[must_use]
    pub fn contains(&self, key: CellKey) -> bool {
        self.rows.contains(&key.row) && self.cols.iter().any(|cols| cols.contains(&key.col))
    }

    /// Number of cells in the region.
    #[must_use]
    pub fn cell_count(&self) -> u64 {
        let rows = span_len(&self.rows);
        let cols: u64 = self.cols.iter().map(span_len).sum();
        rows.saturating_mul(cols)
    }

    /// Iterates over every cell key in the region.
    pub fn keys(&self) -> impl Iterator<Item = CellKey> + '_ {
        self.rows.clone().flat_map(move |row| {
            self.cols
                .iter()
                .flat_map(|cols| cols.clone())
                .map(move |col| CellKey { row, col })
        })
    }
}

#[allow(clippy::cast_sign_loss)]
fn span_len(range: &RangeInclusive<i64>) -> u64 {
    if range.is_empty() {
        0
    } else {
        (range.end() - range.start()) as u64 + 1
    }
}
