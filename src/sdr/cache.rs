//! Lazily synchronized dense, sparse and coordinate encodings of one active-cell set.
//!
//! A [`RepresentationCache`] holds up to three encodings of the same value and a
//! [`Representation`] bit set recording which of them are current. Setting a value through
//! one encoding marks that encoding valid and every other one stale; reading an encoding
//! that is stale derives it from a valid one and caches the result. Derivation is pull-based:
//! nothing is converted until somebody asks for it.
//!
//! Conversions:
//!
//! | from → to            | cost      | method                                 |
//! |----------------------|-----------|----------------------------------------|
//! | sparse → dense       | O(size)   | zero-fill, scatter ones                |
//! | dense → sparse       | O(size)   | linear scan                            |
//! | coordinates → sparse | O(n·rank) | row-major ravel (sorted if needed)     |
//! | sparse → coordinates | O(n·rank) | row-major unravel                      |
//!
//! Dense and coordinate reads always go through the sparse form, so at most two
//! conversions happen per read.

use std::sync::Arc;

use bitflags::bitflags;

use crate::{Error, Result};

/// Dense encoding: one `0`/`1` byte per cell.
pub type SdrDense = Arc<[u8]>;

/// Sparse encoding: strictly ascending flat indices of the active cells.
pub type SdrSparse = Arc<[u32]>;

/// Coordinate encoding: one index list per dimension, all of equal length.
pub type SdrCoordinates = Arc<[Vec<u32>]>;

bitflags! {
    /// The encodings a [`RepresentationCache`] can hold.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Representation: u8 {
        /// Dense bitmap
        const DENSE = 0b001;
        /// Sorted flat index list
        const SPARSE = 0b010;
        /// Per-dimension index lists
        const COORDINATES = 0b100;
    }
}

/// Tagged-validity cache for the encodings of one node's value.
#[derive(Debug)]
pub(crate) struct RepresentationCache {
    dimensions: Vec<u32>,
    size: usize,
    valid: Representation,
    sum: usize,
    dense: SdrDense,
    sparse: SdrSparse,
    coordinates: SdrCoordinates,
}

impl RepresentationCache {
    /// Creates a cache holding the empty set.
    pub fn new(dimensions: &[u32], size: usize) -> Self {
        RepresentationCache {
            dimensions: dimensions.to_vec(),
            size,
            valid: Representation::SPARSE,
            sum: 0,
            dense: Arc::from(Vec::new()),
            sparse: Arc::from(Vec::new()),
            coordinates: Arc::from(Vec::new()),
        }
    }

    /// Returns the set of encodings that are currently valid.
    pub fn valid(&self) -> Representation {
        self.valid
    }

    /// Returns `true` if no encoding is valid and the value has to be reloaded.
    pub fn is_stale(&self) -> bool {
        self.valid.is_empty()
    }

    /// Returns the number of active cells.
    pub fn sum(&self) -> usize {
        self.sum
    }

    /// Marks every encoding stale and releases the buffers.
    pub fn invalidate(&mut self) {
        self.valid = Representation::empty();
        self.sum = 0;
        self.dense = Arc::from(Vec::new());
        self.sparse = Arc::from(Vec::new());
        self.coordinates = Arc::from(Vec::new());
    }

    /// Replaces the value with a validated dense buffer holding `sum` ones.
    pub fn store_dense(&mut self, dense: SdrDense, sum: usize) {
        self.dense = dense;
        self.sum = sum;
        self.valid = Representation::DENSE;
    }

    /// Replaces the value with a validated sparse list.
    pub fn store_sparse(&mut self, sparse: SdrSparse) {
        self.sum = sparse.len();
        self.sparse = sparse;
        self.valid = Representation::SPARSE;
    }

    /// Replaces the value with validated coordinate lists in row-major order.
    pub fn store_coordinates(&mut self, coordinates: SdrCoordinates) {
        self.sum = coordinates.first().map_or(0, Vec::len);
        self.coordinates = coordinates;
        self.valid = Representation::COORDINATES;
    }

    /// Returns the sparse encoding, deriving it if necessary.
    pub fn sparse(&mut self) -> SdrSparse {
        if self.valid.contains(Representation::SPARSE) {
            return self.sparse.clone();
        }

        let sparse: Vec<u32> = if self.valid.contains(Representation::DENSE) {
            log::trace!("deriving sparse from dense over {} cells", self.size);
            sparse_from_dense(&self.dense, self.sum)
        } else if self.valid.contains(Representation::COORDINATES) {
            log::trace!("deriving sparse from {} coordinates", self.sum);
            sparse_from_coordinates(&self.dimensions, &self.coordinates)
        } else {
            Vec::new()
        };

        self.sparse = Arc::from(sparse);
        self.valid |= Representation::SPARSE;
        self.sparse.clone()
    }

    /// Returns the dense encoding, deriving it if necessary.
    pub fn dense(&mut self) -> SdrDense {
        if self.valid.contains(Representation::DENSE) {
            return self.dense.clone();
        }

        let sparse = self.sparse();
        log::trace!("deriving dense from {} active cells", sparse.len());
        let mut dense = vec![0u8; self.size];
        for &index in sparse.iter() {
            dense[index as usize] = 1;
        }

        self.dense = Arc::from(dense);
        self.valid |= Representation::DENSE;
        self.dense.clone()
    }

    /// Returns the coordinate encoding, deriving it if necessary.
    pub fn coordinates(&mut self) -> SdrCoordinates {
        if self.valid.contains(Representation::COORDINATES) {
            return self.coordinates.clone();
        }

        let sparse = self.sparse();
        log::trace!("deriving coordinates from {} active cells", sparse.len());
        self.coordinates = Arc::from(coordinates_from_sparse(&self.dimensions, &sparse));
        self.valid |= Representation::COORDINATES;
        self.coordinates.clone()
    }
}

/// Checks a dense buffer and returns its number of ones.
pub(crate) fn validate_dense(size: usize, dense: &[u8]) -> Result<usize> {
    if dense.len() != size {
        return Err(Error::InvalidLength {
            expected: size,
            actual: dense.len(),
        });
    }

    let mut sum = 0;
    for (index, &value) in dense.iter().enumerate() {
        match value {
            0 => {}
            1 => sum += 1,
            other => {
                return Err(Error::InvalidValue(format!(
                    "dense entry {index} is {other}, expected 0 or 1"
                )))
            }
        }
    }

    Ok(sum)
}

/// Checks that `sparse` is strictly ascending and within `size`.
pub(crate) fn validate_sparse(size: usize, sparse: &[u32]) -> Result<()> {
    let mut previous: Option<u32> = None;
    for (position, &index) in sparse.iter().enumerate() {
        if index as usize >= size {
            return Err(Error::IndexOutOfRange {
                index: index as usize,
                bound: size,
            });
        }
        if previous.is_some_and(|previous| index <= previous) {
            return Err(Error::InvalidOrder(position));
        }
        previous = Some(index);
    }

    Ok(())
}

/// Checks coordinate lists against `dimensions`.
///
/// Requires one list per dimension, lists of equal length, entries within their
/// dimension's bound, and no cell listed twice.
pub(crate) fn validate_coordinates(dimensions: &[u32], coordinates: &[Vec<u32>]) -> Result<()> {
    if coordinates.len() != dimensions.len() {
        return Err(Error::InvalidLength {
            expected: dimensions.len(),
            actual: coordinates.len(),
        });
    }

    let count = coordinates.first().map_or(0, Vec::len);
    for (list, &bound) in coordinates.iter().zip(dimensions) {
        if list.len() != count {
            return Err(Error::InvalidLength {
                expected: count,
                actual: list.len(),
            });
        }
        if let Some(&index) = list.iter().find(|&&index| index >= bound) {
            return Err(Error::IndexOutOfRange {
                index: index as usize,
                bound: bound as usize,
            });
        }
    }

    let flat = sparse_from_coordinates(dimensions, coordinates);
    if let Some(window) = flat.windows(2).find(|window| window[0] == window[1]) {
        return Err(Error::InvalidValue(format!(
            "cell {} is listed more than once",
            window[0]
        )));
    }

    Ok(())
}

/// Returns `coordinates` with the cells reordered into row-major order.
pub(crate) fn row_major_coordinates(
    dimensions: &[u32],
    coordinates: &[Vec<u32>],
) -> Vec<Vec<u32>> {
    let count = coordinates.first().map_or(0, Vec::len);
    let mut order: Vec<usize> = (0..count).collect();
    order.sort_unstable_by_key(|&k| ravel(dimensions, coordinates.iter().map(|list| list[k])));
    coordinates
        .iter()
        .map(|list| order.iter().map(|&k| list[k]).collect())
        .collect()
}

/// Flattens a multi-index in row-major order.
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn ravel(dimensions: &[u32], multi_index: impl Iterator<Item = u32>) -> u32 {
    // Callers validated every coordinate, so the product never exceeds the u32 size bound.
    multi_index
        .zip(dimensions)
        .fold(0u64, |flat, (index, &dim)| {
            flat * u64::from(dim) + u64::from(index)
        }) as u32
}

fn sparse_from_dense(dense: &[u8], sum: usize) -> Vec<u32> {
    let mut sparse = Vec::with_capacity(sum);
    for (index, &value) in dense.iter().enumerate() {
        if value != 0 {
            #[allow(clippy::cast_possible_truncation)]
            sparse.push(index as u32);
        }
    }
    sparse
}

fn sparse_from_coordinates(dimensions: &[u32], coordinates: &[Vec<u32>]) -> Vec<u32> {
    let count = coordinates.first().map_or(0, Vec::len);
    let mut sparse: Vec<u32> = (0..count)
        .map(|k| ravel(dimensions, coordinates.iter().map(|list| list[k])))
        .collect();

    if !sparse.windows(2).all(|pair| pair[0] <= pair[1]) {
        sparse.sort_unstable();
    }
    sparse
}

fn coordinates_from_sparse(dimensions: &[u32], sparse: &[u32]) -> Vec<Vec<u32>> {
    let mut coordinates = vec![Vec::with_capacity(sparse.len()); dimensions.len()];
    for &flat in sparse {
        let mut rest = flat;
        for (list, &dim) in coordinates.iter_mut().zip(dimensions).rev() {
            list.push(rest % dim);
            rest /= dim;
        }
    }
    coordinates
}
