#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! In-memory proximity index for complaint locations.
//!
//! Partitions the sphere into a uniform grid of fixed angular cell size and
//! buckets complaint identifiers by cell. A radius query first collects the
//! identifiers of every cell the query circle can touch, then keeps only the
//! ones whose exact haversine distance is within the radius.
//!
//! Cells are spread over a fixed number of lock shards so concurrent queries
//! only contend with writers touching the same shard.

pub mod geometry;
pub mod grid;

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, HashSet};
use std::hash::BuildHasher as _;
use std::hash::BuildHasherDefault;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{PoisonError, RwLock};

use noise_map_complaint_models::{GeoPoint, InvalidCoordinateError};

use crate::geometry::haversine_km;
use crate::grid::{CellKey, CellRegion};

/// Default grid cell size in degrees (roughly 1.1 km of latitude).
pub const DEFAULT_CELL_SIZE_DEG: f64 = 0.01;

/// Default number of lock shards.
pub const DEFAULT_SHARDS: usize = 16;

/// Errors returned by proximity queries and index construction.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SpatialError {
    /// The query center is outside the valid coordinate range.
    #[error("Invalid coordinate: {0}")]
    InvalidCoordinate(#[from] InvalidCoordinateError),

    /// The query radius is not a positive, finite number of kilometres.
    #[error("Invalid radius {radius_km} km: expected a positive distance")]
    InvalidRadius {
        /// The rejected radius.
        radius_km: f64,
    },

    /// The grid cell size is not usable.
    #[error("Invalid cell size {cell_size_deg}: expected a value in (0, 90]")]
    InvalidCellSize {
        /// The rejected cell size in degrees.
        cell_size_deg: f64,
    },
}

/// Tuning knobs for a [`ProximityIndex`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridConfig {
    /// Angular size of each grid cell in degrees.
    pub cell_size_deg: f64,
    /// Number of independently locked shards. Values below 1 are treated
    /// as 1.
    pub shards: usize,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            cell_size_deg: DEFAULT_CELL_SIZE_DEG,
            shards: DEFAULT_SHARDS,
        }
    }
}

/// Identifiers in one cell, with the point each was indexed at.
type Cell = HashMap<String, GeoPoint>;

type Shard = HashMap<CellKey, Cell>;

/// Grid-based spatial index over complaint identifiers.
///
/// Holds identifiers only; record content lives in the record store. An
/// identifier must be removed with its old coordinates before being
/// re-inserted at new ones.
pub struct ProximityIndex {
    cell_size_deg: f64,
    shards: Vec<RwLock<Shard>>,
    hasher: BuildHasherDefault<DefaultHasher>,
    entries: AtomicUsize,
    occupied_cells: AtomicUsize,
}

impl Default for ProximityIndex {
    fn default() -> Self {
        Self::with_cell_size(DEFAULT_CELL_SIZE_DEG, DEFAULT_SHARDS)
    }
}

impl std::fmt::Debug for ProximityIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProximityIndex")
            .field("cell_size_deg", &self.cell_size_deg)
            .field("shards", &self.shards.len())
            .field("entries", &self.len())
            .field("cells", &self.cell_count())
            .finish()
    }
}

impl ProximityIndex {
    /// Creates an empty index.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidCellSize`] if the cell size is not a
    /// finite value in `(0, 90]`.
    pub fn new(config: GridConfig) -> Result<Self, SpatialError> {
        let size = config.cell_size_deg;
        if !(size.is_finite() && size > 0.0 && size <= 90.0) {
            return Err(SpatialError::InvalidCellSize {
                cell_size_deg: size,
            });
        }
        Ok(Self::with_cell_size(size, config.shards))
    }

    fn with_cell_size(cell_size_deg: f64, shards: usize) -> Self {
        Self {
            cell_size_deg,
            shards: (0..shards.max(1))
                .map(|_| RwLock::new(HashMap::new()))
                .collect(),
            hasher: BuildHasherDefault::default(),
            entries: AtomicUsize::new(0),
            occupied_cells: AtomicUsize::new(0),
        }
    }

    /// Grid cell size in degrees.
    #[must_use]
    pub const fn cell_size_deg(&self) -> f64 {
        self.cell_size_deg
    }

    /// Number of indexed identifiers.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.load(Ordering::Relaxed)
    }

    /// Whether nothing has been indexed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of non-empty grid cells.
    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.occupied_cells.load(Ordering::Relaxed)
    }

    fn shard_for(&self, key: CellKey) -> &RwLock<Shard> {
        #[allow(clippy::cast_possible_truncation)]
        let idx = (self.hasher.hash_one(key) % self.shards.len() as u64) as usize;
        &self.shards[idx]
    }

    /// Indexes `id` at the given coordinates.
    ///
    /// Out-of-range coordinates are logged and ignored; such a record never
    /// appears in query results. Returns whether the id was indexed.
    pub fn insert(&self, id: &str, latitude: f64, longitude: f64) -> bool {
        match GeoPoint::new(latitude, longitude) {
            Ok(point) => {
                self.insert_point(id, point);
                true
            }
            Err(e) => {
                log::warn!("Not indexing complaint {id}: {e}");
                false
            }
        }
    }

    /// Indexes `id` at an already validated point.
    pub fn insert_point(&self, id: &str, point: GeoPoint) {
        let key = CellKey::containing(point, self.cell_size_deg);
        let mut shard = self
            .shard_for(key)
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let cell = shard.entry(key).or_insert_with(|| {
            self.occupied_cells.fetch_add(1, Ordering::Relaxed);
            HashMap::new()
        });

        if cell.insert(id.to_string(), point).is_none() {
            self.entries.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Removes `id` from the cell for the given coordinates.
    ///
    /// Returns whether anything was removed. Invalid coordinates or an id
    /// that is not in that cell are a no-op.
    pub fn remove(&self, id: &str, latitude: f64, longitude: f64) -> bool {
        let Ok(point) = GeoPoint::new(latitude, longitude) else {
            return false;
        };
        let key = CellKey::containing(point, self.cell_size_deg);
        let mut shard = self
            .shard_for(key)
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        let Some(cell) = shard.get_mut(&key) else {
            return false;
        };
        let removed = cell.remove(id).is_some();
        if cell.is_empty() {
            shard.remove(&key);
            self.occupied_cells.fetch_sub(1, Ordering::Relaxed);
        }
        drop(shard);

        if removed {
            self.entries.fetch_sub(1, Ordering::Relaxed);
        }
        removed
    }

    /// Returns the identifiers of every indexed point within `radius_km`
    /// (inclusive) of the center.
    ///
    /// # Errors
    ///
    /// * [`SpatialError::InvalidCoordinate`] if the center is out of range
    /// * [`SpatialError::InvalidRadius`] if `radius_km` is not positive
    pub fn query(
        &self,
        center_lat: f64,
        center_lon: f64,
        radius_km: f64,
    ) -> Result<HashSet<String>, SpatialError> {
        let center = GeoPoint::new(center_lat, center_lon)?;
        if !(radius_km.is_finite() && radius_km > 0.0) {
            return Err(SpatialError::InvalidRadius { radius_km });
        }

        let region = CellRegion::covering(center, radius_km, self.cell_size_deg);
        let mut hits = HashSet::new();
        let mut collect = |cell: &Cell| {
            for (id, point) in cell {
                if haversine_km(center, *point) <= radius_km {
                    hits.insert(id.clone());
                }
            }
        };

        // Probing costs one lookup per candidate cell; scanning costs one
        // range test per occupied cell. Pick whichever touches fewer.
        if region.cell_count() <= self.cell_count() as u64 {
            for key in region.keys() {
                let shard = self
                    .shard_for(key)
                    .read()
                    .unwrap_or_else(PoisonError::into_inner);
                if let Some(cell) = shard.get(&key) {
                    collect(cell);
                }
            }
        } else {
            for shard in &self.shards {
                let shard = shard.read().unwrap_or_else(PoisonError::into_inner);
                for (_, cell) in shard.iter().filter(|(key, _)| region.contains(**key)) {
                    collect(cell);
                }
            }
        }

        log::trace!(
            "Proximity query ({center_lat}, {center_lon}) r={radius_km}km matched {} ids",
            hits.len()
        );

        Ok(hits)
    }
}
