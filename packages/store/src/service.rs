//! Radius queries over stored complaints, ordered by recency.

use std::cmp::Ordering;
use std::sync::Arc;

use noise_map_complaint_models::ComplaintRecord;
use noise_map_spatial::{GridConfig, ProximityIndex, SpatialError};

use crate::{RecordStore, StoreError};

/// Counts produced by a bulk [`ComplaintService::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadSummary {
    /// Records added to the store.
    pub stored: usize,
    /// Stored records that were also added to the proximity index.
    pub indexed: usize,
    /// Records skipped because their id was already stored.
    pub duplicates: usize,
}

/// Current sizes of the store and index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceStats {
    /// Records in the store.
    pub records: usize,
    /// Records reachable through proximity queries.
    pub indexed: usize,
    /// Non-empty grid cells.
    pub cells: usize,
}

/// Owns the record store and its proximity index and keeps them in step.
#[derive(Debug)]
pub struct ComplaintService {
    store: RecordStore,
    index: ProximityIndex,
    grid: GridConfig,
}

impl Default for ComplaintService {
    fn default() -> Self {
        Self {
            store: RecordStore::new(),
            index: ProximityIndex::default(),
            grid: GridConfig::default(),
        }
    }
}

impl ComplaintService {
    /// Creates an empty service with the given grid settings.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidCellSize`] if the grid config is not
    /// usable.
    pub fn new(grid: GridConfig) -> Result<Self, SpatialError> {
        Ok(Self {
            store: RecordStore::new(),
            index: ProximityIndex::new(grid)?,
            grid,
        })
    }

    /// The underlying record store.
    #[must_use]
    pub const fn store(&self) -> &RecordStore {
        &self.store
    }

    /// The underlying proximity index.
    #[must_use]
    pub const fn index(&self) -> &ProximityIndex {
        &self.index
    }

    /// Stores a record and indexes it if its coordinates are valid.
    ///
    /// Returns whether the record was indexed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::DuplicateId`] if the id is already stored; the
    /// index is left unchanged in that case.
    pub fn ingest(&self, record: ComplaintRecord) -> Result<bool, StoreError> {
        let record = self.store.insert(record)?;
        Ok(match record.point() {
            Some(point) => {
                self.index.insert_point(record.id(), point);
                true
            }
            None => {
                log::debug!(
                    "Complaint {} has no valid coordinates ({:?}, {:?}); stored but not indexed",
                    record.id(),
                    record.latitude(),
                    record.longitude()
                );
                false
            }
        })
    }

    /// Ingests a batch of records, skipping ids that are already stored.
    pub fn load<I>(&self, records: I) -> LoadSummary
    where
        I: IntoIterator<Item = ComplaintRecord>,
    {
        let mut summary = LoadSummary::default();
        for record in records {
            match self.ingest(record) {
                Ok(indexed) => {
                    summary.stored += 1;
                    if indexed {
                        summary.indexed += 1;
                    }
                }
                Err(e) => {
                    log::debug!("Skipping record: {e}");
                    summary.duplicates += 1;
                }
            }
        }

        log::info!(
            "Loaded {} complaints ({} indexed, {} duplicates skipped)",
            summary.stored,
            summary.indexed,
            summary.duplicates
        );
        summary
    }

    /// Replaces the proximity index with one rebuilt from the store.
    ///
    /// Takes `&mut self` so no query can observe the index half-built.
    ///
    /// # Errors
    ///
    /// Returns [`SpatialError::InvalidCellSize`] if `grid` is not usable.
    pub fn rebuild_index(&mut self, grid: GridConfig) -> Result<usize, SpatialError> {
        let index = ProximityIndex::new(grid)?;
        for record in self.store.all() {
            if let Some(point) = record.point() {
                index.insert_point(record.id(), point);
            }
        }

        log::info!(
            "Rebuilt proximity index: {} records in {} cells ({}° cells)",
            index.len(),
            index.cell_count(),
            grid.cell_size_deg
        );

        let indexed = index.len();
        self.index = index;
        self.grid = grid;
        Ok(indexed)
    }

    /// Current grid settings.
    #[must_use]
    pub const fn grid(&self) -> GridConfig {
        self.grid
    }

    /// Current store and index sizes.
    #[must_use]
    pub fn stats(&self) -> ServiceStats {
        ServiceStats {
            records: self.store.len(),
            indexed: self.index.len(),
            cells: self.index.cell_count(),
        }
    }

    /// Returns every indexed complaint within `radius_km` of the center,
    /// newest first, ties broken by ascending id.
    ///
    /// `limit` caps the number of results after ordering. An empty vector
    /// means nothing matched.
    ///
    /// # Errors
    ///
    /// * [`SpatialError::InvalidCoordinate`] if the center is out of range
    /// * [`SpatialError::InvalidRadius`] if `radius_km` is not positive
    pub fn find_near(
        &self,
        center_lat: f64,
        center_lon: f64,
        radius_km: f64,
        limit: Option<usize>,
    ) -> Result<Vec<Arc<ComplaintRecord>>, SpatialError> {
        let ids = self.index.query(center_lat, center_lon, radius_km)?;

        let mut results: Vec<Arc<ComplaintRecord>> = ids
            .iter()
            .filter_map(|id| {
                let record = self.store.get(id);
                if record.is_none() {
                    log::warn!("Proximity index references unknown complaint {id}; skipping");
                }
                record
            })
            .collect();

        results.sort_by(|a, b| by_recency(a, b));

        if let Some(limit) = limit {
            results.truncate(limit);
        }

        Ok(results)
    }
}

/// Newest first; equal timestamps ordered by ascending id.
fn by_recency(a: &ComplaintRecord, b: &ComplaintRecord) -> Ordering {
    b.created_at()
        .cmp(&a.created_at())
        .then_with(|| a.id().cmp(b.id()))
}
