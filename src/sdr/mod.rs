//! Sparse distributed representations.
//!
//! An [`Sdr`] is a binary tensor of fixed dimensions in which only a small fraction of the
//! cells are active. The active set can be written and read in three interchangeable
//! encodings, dense bytes, sorted flat indices and per-dimension coordinates, and every
//! read is served from a [`cache`] that derives missing encodings on demand.
//!
//! Nodes come in two flavours. A canonical node, created by [`Sdr::new`], owns its value.
//! A view, created by [`Sdr::reshape`] or [`Sdr::view`], reinterprets another node's active
//! set under different dimensions of the same size; it follows every change of its parent,
//! rejects all mutation and becomes unusable once the parent is gone. See [`reshape`] for
//! the lifetime rules.
//!
//! # Examples
//!
//! ```rust
//! use sdrscope::Sdr;
//!
//! let mut sdr = Sdr::new(&[4, 4])?;
//! sdr.set_sparse(&[1, 4, 8])?;
//!
//! let view = Sdr::reshape(&sdr, &[8, 2])?;
//! assert_eq!(view.get_coordinates()?.to_vec(), vec![vec![0, 2, 4], vec![1, 0, 0]]);
//!
//! sdr.zero()?;
//! assert_eq!(view.get_sum()?, 0);
//! # Ok::<(), sdrscope::Error>(())
//! ```

pub mod cache;
pub(crate) mod notifier;
mod ops;
pub mod reshape;

use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, Weak,
    },
};

use crate::{
    serialization::{Archive, Serializable},
    utils::{checked_size, to_u32},
    Error, Result,
};

use cache::{
    ravel, row_major_coordinates, validate_coordinates, validate_dense, validate_sparse,
    RepresentationCache, SdrCoordinates, SdrDense, SdrSparse,
};
use notifier::ChangeNotifier;
pub use notifier::{Listener, SdrEvent, SubscriptionToken};

/// The link from a view to the node it reinterprets.
struct ParentLink {
    parent: Weak<SdrNode>,
    token: SubscriptionToken,
}

enum NodeKind {
    Canonical,
    /// `None` once the view has been orphaned or destroyed.
    Reshape(Mutex<Option<ParentLink>>),
}

/// Shared state of one node.
///
/// Views reach their parent through a [`Weak`] reference and are reached by it only through
/// the parent's notifier, so the ownership graph has no cycles.
pub(crate) struct SdrNode {
    dimensions: Vec<u32>,
    size: usize,
    kind: NodeKind,
    orphaned: AtomicBool,
    cache: Mutex<RepresentationCache>,
    notifier: ChangeNotifier,
}

impl SdrNode {
    fn new(dimensions: Vec<u32>, size: usize, kind: NodeKind) -> Self {
        let cache = RepresentationCache::new(&dimensions, size);
        SdrNode {
            dimensions,
            size,
            kind,
            orphaned: AtomicBool::new(false),
            cache: Mutex::new(cache),
            notifier: ChangeNotifier::default(),
        }
    }

    fn is_orphaned(&self) -> bool {
        self.orphaned.load(Ordering::Acquire)
    }

    /// Runs `read` against an up-to-date cache.
    ///
    /// A view whose cache is stale first reloads the sparse form of its parent, which
    /// recursively refreshes the parent if it is a stale view itself. Locks are taken child
    /// first, parent second; mutations release their lock before notifying, so the order
    /// never inverts.
    fn read<T>(&self, read: impl FnOnce(&mut RepresentationCache) -> T) -> Result<T> {
        if self.is_orphaned() {
            return Err(Error::UseAfterFree);
        }

        let mut cache = lock!(self.cache);
        if cache.is_stale() {
            let parent = self.parent()?;
            let sparse = parent.read(RepresentationCache::sparse)?;
            cache.store_sparse(sparse);
        }
        Ok(read(&mut cache))
    }

    /// Applies a validated update and fires [`SdrEvent::ValueChanged`].
    fn write(&self, update: impl FnOnce(&mut RepresentationCache)) {
        update(&mut lock!(self.cache));
        self.notifier.notify(SdrEvent::ValueChanged);
    }

    fn parent(&self) -> Result<Arc<SdrNode>> {
        match &self.kind {
            NodeKind::Canonical => Err(Error::UnsupportedOperation(
                "a canonical SDR has no parent",
            )),
            NodeKind::Reshape(link) => lock!(link)
                .as_ref()
                .and_then(|link| link.parent.upgrade())
                .ok_or(Error::UseAfterFree),
        }
    }
}

/// A sparse distributed representation.
///
/// Reads take `&self` and hand out shared, immutable buffers; mutators take `&mut self`,
/// validate their input completely before changing anything and fire exactly one
/// [`SdrEvent::ValueChanged`] on success. Every mutator fails with
/// [`Error::UnsupportedOperation`] on a view.
///
/// Dropping an `Sdr` destroys the node: its subscribers receive [`SdrEvent::Destroyed`],
/// a view detaches from its parent and views of it become orphaned.
pub struct Sdr {
    node: Arc<SdrNode>,
}

impl Sdr {
    /// Creates a canonical node with every cell inactive.
    ///
    /// # Errors
    /// Returns [`Error::InvalidValue`] if `dimensions` is empty, contains a zero or
    /// describes more than `u32::MAX` cells.
    pub fn new(dimensions: &[u32]) -> Result<Sdr> {
        if dimensions.is_empty() {
            return Err(Error::InvalidValue(
                "an SDR needs at least one dimension".to_string(),
            ));
        }
        if let Some(position) = dimensions.iter().position(|&dim| dim == 0) {
            return Err(Error::InvalidValue(format!(
                "dimension {position} is zero"
            )));
        }
        let size = checked_size(dimensions)
            .filter(|&size| to_u32(size).is_ok())
            .ok_or_else(|| {
                Error::InvalidValue(format!(
                    "dimensions {dimensions:?} exceed the u32 cell limit"
                ))
            })?;

        Ok(Sdr {
            node: Arc::new(SdrNode::new(dimensions.to_vec(), size, NodeKind::Canonical)),
        })
    }

    /// Returns the dimensions of this node.
    #[must_use]
    pub fn dimensions(&self) -> &[u32] {
        &self.node.dimensions
    }

    /// Returns the number of cells, the product of the dimensions.
    #[must_use]
    pub fn size(&self) -> usize {
        self.node.size
    }

    /// Returns the number of dimensions.
    #[must_use]
    pub fn rank(&self) -> usize {
        self.node.dimensions.len()
    }

    /// Returns the dense encoding, one `0`/`1` byte per cell in row-major order.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterFree`] on an orphaned view.
    pub fn get_dense(&self) -> Result<SdrDense> {
        self.node.read(RepresentationCache::dense)
    }

    /// Returns the ascending flat indices of the active cells.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterFree`] on an orphaned view.
    pub fn get_sparse(&self) -> Result<SdrSparse> {
        self.node.read(RepresentationCache::sparse)
    }

    /// Returns one index list per dimension describing the active cells in row-major order.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterFree`] on an orphaned view.
    pub fn get_coordinates(&self) -> Result<SdrCoordinates> {
        self.node.read(RepresentationCache::coordinates)
    }

    /// Returns the number of active cells.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterFree`] on an orphaned view.
    pub fn get_sum(&self) -> Result<usize> {
        self.node.read(|cache| cache.sum())
    }

    /// Returns the fraction of active cells.
    ///
    /// # Errors
    /// Returns [`Error::UseAfterFree`] on an orphaned view.
    #[allow(clippy::cast_precision_loss)]
    pub fn get_sparsity(&self) -> Result<f64> {
        Ok(self.get_sum()? as f64 / self.size() as f64)
    }

    /// Returns whether the cell at `coordinates` is active.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLength`] if `coordinates` does not have one entry per
    /// dimension, [`Error::IndexOutOfRange`] if an entry exceeds its dimension and
    /// [`Error::UseAfterFree`] on an orphaned view.
    pub fn at(&self, coordinates: &[u32]) -> Result<bool> {
        self.ensure_live()?;
        if coordinates.len() != self.rank() {
            return Err(Error::InvalidLength {
                expected: self.rank(),
                actual: coordinates.len(),
            });
        }
        for (&index, &bound) in coordinates.iter().zip(self.dimensions()) {
            if index >= bound {
                return Err(Error::IndexOutOfRange {
                    index: index as usize,
                    bound: bound as usize,
                });
            }
        }

        let flat = ravel(self.dimensions(), coordinates.iter().copied());
        Ok(self.get_sparse()?.binary_search(&flat).is_ok())
    }

    /// Replaces the value with a dense buffer.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLength`] if `dense` does not hold [`Sdr::size`] entries and
    /// [`Error::InvalidValue`] for entries other than `0` and `1`.
    pub fn set_dense(&mut self, dense: &[u8]) -> Result<()> {
        self.ensure_mutable("set_dense")?;
        let sum = validate_dense(self.size(), dense)?;
        self.node.write(|cache| cache.store_dense(Arc::from(dense), sum));
        Ok(())
    }

    /// Replaces the value with a list of flat indices.
    ///
    /// # Errors
    /// Returns [`Error::InvalidOrder`] unless `sparse` is strictly ascending and
    /// [`Error::IndexOutOfRange`] for indices of [`Sdr::size`] or more.
    pub fn set_sparse(&mut self, sparse: &[u32]) -> Result<()> {
        self.ensure_mutable("set_sparse")?;
        validate_sparse(self.size(), sparse)?;
        self.node.write(|cache| cache.store_sparse(Arc::from(sparse)));
        Ok(())
    }

    /// Replaces the value with per-dimension coordinate lists.
    ///
    /// The lists need not be in row-major order; the cells are stored reordered into it.
    ///
    /// # Errors
    /// Returns [`Error::InvalidLength`] unless there is one list per dimension and all lists
    /// have the same length, [`Error::IndexOutOfRange`] for entries outside their dimension
    /// and [`Error::InvalidValue`] if a cell is listed twice.
    pub fn set_coordinates(&mut self, coordinates: &[Vec<u32>]) -> Result<()> {
        self.ensure_mutable("set_coordinates")?;
        validate_coordinates(self.dimensions(), coordinates)?;
        let ordered = row_major_coordinates(self.dimensions(), coordinates);
        self.node.write(|cache| cache.store_coordinates(Arc::from(ordered)));
        Ok(())
    }

    /// Copies the active set of `other`, which may have different dimensions of the same size.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] if the sizes differ and [`Error::UseAfterFree`]
    /// if `other` is an orphaned view.
    pub fn set_sdr(&mut self, other: &Sdr) -> Result<()> {
        self.ensure_mutable("set_sdr")?;
        self.ensure_same_size(other)?;
        let sparse = other.get_sparse()?;
        self.node.write(|cache| cache.store_sparse(sparse));
        Ok(())
    }

    /// Deactivates every cell.
    ///
    /// # Errors
    /// Returns [`Error::UnsupportedOperation`] on a view.
    pub fn zero(&mut self) -> Result<()> {
        self.set_sparse(&[])
    }

    /// Registers `listener` for [`SdrEvent`]s of this node.
    ///
    /// Listeners run synchronously on the thread that changed or destroyed the node and
    /// must not mutate the node that notifies them.
    pub fn subscribe<F>(&self, listener: F) -> SubscriptionToken
    where
        F: Fn(SdrEvent) + Send + Sync + 'static,
    {
        self.node.notifier.subscribe(Arc::new(listener))
    }

    /// Removes a listener. Returns `false` if it was already removed.
    pub fn unsubscribe(&self, token: SubscriptionToken) -> bool {
        self.node.notifier.unsubscribe(token)
    }

    /// Destroys the node; equivalent to dropping it.
    pub fn destroy(self) {
        drop(self);
    }

    fn ensure_mutable(&self, operation: &'static str) -> Result<()> {
        if self.is_view() {
            return Err(Error::UnsupportedOperation(operation));
        }
        Ok(())
    }

    fn ensure_live(&self) -> Result<()> {
        if self.is_orphaned() {
            return Err(Error::UseAfterFree);
        }
        Ok(())
    }

    fn ensure_same_size(&self, other: &Sdr) -> Result<()> {
        if other.size() != self.size() {
            return Err(Error::DimensionMismatch {
                expected: self.size(),
                actual: other.size(),
            });
        }
        Ok(())
    }
}

impl Drop for Sdr {
    fn drop(&mut self) {
        reshape::detach(&self.node);
        self.node.notifier.notify_destroyed();
    }
}

impl PartialEq for Sdr {
    /// Nodes are equal when their dimensions and active sets are equal. An orphaned view
    /// equals nothing.
    fn eq(&self, other: &Self) -> bool {
        if self.dimensions() != other.dimensions() {
            return false;
        }
        match (self.get_sparse(), other.get_sparse()) {
            (Ok(mine), Ok(theirs)) => mine == theirs,
            _ => false,
        }
    }
}

impl fmt::Display for Sdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SDR(")?;
        for (position, dim) in self.dimensions().iter().enumerate() {
            let separator = if position == 0 { " " } else { ", " };
            write!(f, "{separator}{dim}")?;
        }
        write!(f, " )")?;

        match self.get_sparse() {
            Ok(sparse) => {
                for (position, index) in sparse.iter().enumerate() {
                    let separator = if position == 0 { " " } else { ", " };
                    write!(f, "{separator}{index}")?;
                }
                Ok(())
            }
            Err(_) => write!(f, " <orphaned>"),
        }
    }
}

impl fmt::Debug for Sdr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sdr")
            .field("dimensions", &self.node.dimensions)
            .field("view", &self.is_view())
            .field("orphaned", &self.is_orphaned())
            .field("valid", &lock!(self.node.cache).valid())
            .field("subscribers", &self.node.notifier.len())
            .finish()
    }
}

/// Archive kind written for an SDR.
const ARCHIVE_KIND: &str = "SDR";

impl Serializable for Sdr {
    /// Captures dimensions and active set; a view saves its current value.
    fn to_archive(&self) -> Result<Archive> {
        let sparse = self.get_sparse()?;
        let dimensions = self.dimensions().iter().map(|&dim| u64::from(dim));
        Ok(Archive::new(ARCHIVE_KIND)
            .with_list("dimensions", dimensions)
            .with_list("sparse", sparse.iter().map(|&index| u64::from(index))))
    }

    /// Rebuilds a canonical node.
    fn from_archive(archive: &Archive) -> Result<Self> {
        archive.expect_kind(ARCHIVE_KIND)?;

        let dimensions = narrow(archive.list("dimensions")?, "dimension")?;
        let sparse = narrow(archive.list("sparse")?, "sparse index")?;

        let mut sdr = Sdr::new(&dimensions)
            .map_err(|error| corrupt_error!("invalid SDR dimensions: {}", error))?;
        sdr.set_sparse(&sparse)
            .map_err(|error| corrupt_error!("invalid SDR value: {}", error))?;
        Ok(sdr)
    }
}

fn narrow(values: &[u64], what: &str) -> Result<Vec<u32>> {
    values
        .iter()
        .map(|&value| {
            u32::try_from(value).map_err(|_| corrupt_error!("{} {} out of range", what, value))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test::{sdr_with, EventLog};

    #[test]
    fn test_new_validates_dimensions() {
        assert!(matches!(Sdr::new(&[]), Err(Error::InvalidValue(_))));
        assert!(matches!(Sdr::new(&[4, 0]), Err(Error::InvalidValue(_))));
        assert!(matches!(
            Sdr::new(&[u32::MAX, 2]),
            Err(Error::InvalidValue(_))
        ));

        let sdr = Sdr::new(&[3, 4, 5]).unwrap();
        assert_eq!(sdr.size(), 60);
        assert_eq!(sdr.rank(), 3);
        assert_eq!(sdr.get_sum().unwrap(), 0);
        assert!(!sdr.is_view());
    }

    #[test]
    fn test_set_and_convert() {
        let mut sdr = Sdr::new(&[3, 3]).unwrap();
        sdr.set_dense(&[0, 1, 0, 0, 1, 0, 0, 0, 1]).unwrap();
        assert_eq!(sdr.get_sparse().unwrap().to_vec(), vec![1, 4, 8]);
        assert_eq!(
            sdr.get_coordinates().unwrap().to_vec(),
            vec![vec![0, 1, 2], vec![1, 1, 2]]
        );

        sdr.set_coordinates(&[vec![2, 0], vec![0, 2]]).unwrap();
        assert_eq!(sdr.get_sparse().unwrap().to_vec(), vec![2, 6]);
        assert_eq!(
            sdr.get_dense().unwrap().to_vec(),
            vec![0, 0, 1, 0, 0, 0, 1, 0, 0]
        );
        assert_eq!(sdr.get_sum().unwrap(), 2);
        let sparsity = sdr.get_sparsity().unwrap();
        assert!((sparsity - 2.0 / 9.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_failed_mutation_changes_nothing() {
        let mut sdr = sdr_with(&[10], &[1, 2]);
        let log = EventLog::attach(&sdr);

        assert!(matches!(
            sdr.set_sparse(&[3, 3]),
            Err(Error::InvalidOrder(1))
        ));
        assert!(matches!(
            sdr.set_sparse(&[10]),
            Err(Error::IndexOutOfRange {
                index: 10,
                bound: 10
            })
        ));
        assert!(matches!(
            sdr.set_dense(&[0; 9]),
            Err(Error::InvalidLength {
                expected: 10,
                actual: 9
            })
        ));
        assert!(matches!(
            sdr.set_dense(&[2, 0, 0, 0, 0, 0, 0, 0, 0, 0]),
            Err(Error::InvalidValue(_))
        ));
        assert!(matches!(
            sdr.set_coordinates(&[vec![1, 1]]),
            Err(Error::InvalidValue(_))
        ));

        assert_eq!(sdr.get_sparse().unwrap().to_vec(), vec![1, 2]);
        assert!(log.events().is_empty());
    }

    #[test]
    fn test_one_notification_per_mutation() {
        let mut sdr = Sdr::new(&[2, 2]).unwrap();
        let log = EventLog::attach(&sdr);
        sdr.set_sparse(&[0]).unwrap();
        sdr.set_dense(&[1, 1, 0, 0]).unwrap();
        sdr.set_coordinates(&[vec![1], vec![1]]).unwrap();
        sdr.zero().unwrap();
        let other = Sdr::new(&[4]).unwrap();
        sdr.set_sdr(&other).unwrap();
        assert_eq!(log.count(SdrEvent::ValueChanged), 5);
    }

    #[test]
    fn test_coordinates_are_kept_in_row_major_order() {
        let mut sdr = Sdr::new(&[3, 3]).unwrap();
        sdr.set_coordinates(&[vec![2, 1, 1], vec![2, 1, 0]]).unwrap();
        assert_eq!(
            sdr.get_coordinates().unwrap().to_vec(),
            vec![vec![1, 1, 2], vec![0, 1, 2]]
        );
        assert_eq!(sdr.get_sparse().unwrap().to_vec(), vec![3, 4, 8]);

        let view = Sdr::view(&sdr).unwrap();
        assert_eq!(
            view.get_coordinates().unwrap(),
            sdr.get_coordinates().unwrap()
        );
    }

    #[test]
    fn test_set_sdr() {
        let source = sdr_with(&[2, 5], &[0, 9]);

        let mut target = Sdr::new(&[10]).unwrap();
        target.set_sdr(&source).unwrap();
        assert_eq!(target.get_sparse().unwrap().to_vec(), vec![0, 9]);

        let mut wrong = Sdr::new(&[11]).unwrap();
        assert!(matches!(
            wrong.set_sdr(&source),
            Err(Error::DimensionMismatch {
                expected: 11,
                actual: 10
            })
        ));
    }

    #[test]
    fn test_at() {
        let sdr = sdr_with(&[3, 3], &[1, 4, 8]);
        assert!(sdr.at(&[0, 1]).unwrap());
        assert!(sdr.at(&[2, 2]).unwrap());
        assert!(!sdr.at(&[2, 1]).unwrap());
        assert!(matches!(sdr.at(&[1]), Err(Error::InvalidLength { .. })));
        assert!(matches!(
            sdr.at(&[3, 0]),
            Err(Error::IndexOutOfRange { index: 3, bound: 3 })
        ));
    }

    #[test]
    fn test_equality_and_display() {
        let mut a = Sdr::new(&[3, 3]).unwrap();
        let mut b = Sdr::new(&[3, 3]).unwrap();
        let c = Sdr::new(&[9]).unwrap();
        a.set_sparse(&[1, 4, 8]).unwrap();
        b.set_dense(&[0, 1, 0, 0, 1, 0, 0, 0, 1]).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.to_string(), "SDR( 3, 3 ) 1, 4, 8");
        assert_eq!(c.to_string(), "SDR( 9 )");
    }

    #[test]
    fn test_destroyed_fires_once() {
        let sdr = Sdr::new(&[5]).unwrap();
        let log = EventLog::attach(&sdr);

        sdr.destroy();
        assert_eq!(log.events(), vec![SdrEvent::Destroyed]);
    }

    #[test]
    fn test_archive_round_trip() {
        let sdr = sdr_with(&[4, 4], &[0, 5, 15]);
        let archive = sdr.to_archive().unwrap();
        assert_eq!(archive.list("dimensions").unwrap(), &[4, 4]);
        assert_eq!(archive.list("sparse").unwrap(), &[0, 5, 15]);
        assert_eq!(Sdr::from_archive(&archive).unwrap(), sdr);
    }

    #[test]
    fn test_from_archive_rejects_invalid_values() {
        for archive in [
            Archive::new("SDR")
                .with_list("dimensions", [3])
                .with_list("sparse", [2, 1]),
            Archive::new("SDR")
                .with_list("dimensions", [3])
                .with_list("sparse", [3]),
            Archive::new("SDR")
                .with_list("dimensions", [])
                .with_list("sparse", []),
            Archive::new("SDR")
                .with_list("dimensions", [1 << 40])
                .with_list("sparse", []),
            Archive::new("Random")
                .with_list("dimensions", [3])
                .with_list("sparse", []),
            Archive::new("SDR").with_list("dimensions", [3]),
        ] {
            assert!(
                matches!(Sdr::from_archive(&archive), Err(Error::CorruptData { .. })),
                "{archive:?}"
            );
        }
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Sdr>();
    }
}
