// Copyright 2025 Johann Kempter
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.
//
// SPDX-License-Identifier: Apache-2.0

#![doc(html_no_source)]
#![deny(missing_docs)]
//#![deny(unsafe_code)]
// - 'file/physical.rs' uses mmap to map a file into memory

//! # sdrscope
//!
//! Sparse distributed representations (SDRs) for Rust: binary tensors of fixed dimensions
//! with few active cells, readable and writable as dense bytes, sorted flat indices or
//! per-dimension coordinates, with change notification, reshaped views and persistence in
//! four formats.
//!
//! ## Features
//!
//! - **Lazy encodings** - every value is stored in the encoding it was written in; the
//!   others are derived on first read and cached until the next change
//! - **Views** - reinterpret an SDR under other dimensions of the same size; views follow
//!   their parent and become unusable, not dangling, when it is destroyed
//! - **Change notification** - subscribe to value changes and destruction of any node
//! - **Set algebra** - overlap, intersection, union, concatenation, randomisation and noise
//! - **Persistence** - binary, portable text, JSON and XML records, streamable one after
//!   another, with memory-mapped file loading
//!
//! ## Quick Start
//!
//! ```rust
//! use sdrscope::prelude::*;
//!
//! let mut sdr = Sdr::new(&[4, 4])?;
//! sdr.set_sparse(&[1, 4, 8])?;
//! assert_eq!(sdr.get_dense()?[4], 1);
//!
//! let view = Sdr::reshape(&sdr, &[8, 2])?;
//! assert_eq!(view.get_coordinates()?.to_vec(), vec![vec![0, 2, 4], vec![1, 0, 0]]);
//!
//! let mut record = Vec::new();
//! view.save(&mut record, SerializableFormat::Portable)?;
//! let copy = Sdr::load(&mut record.as_slice(), SerializableFormat::Portable)?;
//! assert_eq!(copy.dimensions(), &[8, 2]);
//! assert!(!copy.is_view());
//! # Ok::<(), sdrscope::Error>(())
//! ```
//!
//! ## Architecture
//!
//! - [`prelude`] - Convenient re-exports of commonly used types and traits
//! - [`sdr`] - The [`Sdr`] node, its representation cache, notifier and views
//! - [`serialization`] - The [`Serializable`] trait, [`Archive`] records and the codecs
//! - [`Error`] and [`Result`] - Error handling
//!
//! ## Logging
//!
//! The crate logs through the [`log`] facade: record saves and loads and view lifecycle
//! events at `debug`, encoding derivations at `trace`. No logger is installed.

#[macro_use]
pub(crate) mod macros;

#[macro_use]
pub(crate) mod error;
pub(crate) mod file;
pub(crate) mod utils;

/// Shared functionality which is used in unit tests
#[cfg(test)]
pub(crate) mod test;

/// Convenient re-exports of the most commonly used types and traits.
///
/// # Example
///
/// ```rust
/// use sdrscope::prelude::*;
///
/// let mut sdr = Sdr::new(&[100])?;
/// sdr.randomize(0.05, &mut Random::new(1))?;
/// assert_eq!(sdr.get_sum()?, 5);
/// # Ok::<(), sdrscope::Error>(())
/// ```
pub mod prelude;

/// Sparse distributed representations and their views.
pub mod sdr;

/// Format-tagged persistence of SDRs and random generators.
pub mod serialization;

/// A type alias for [`std::result::Result<T, Error>`] where the error type is always [`Error`].
/// This is used consistently throughout the crate for all fallible operations.
pub type Result<T> = std::result::Result<T, Error>;

/// `sdrscope` Error type
///
/// # Examples
///
/// ```rust
/// use sdrscope::{Error, Sdr};
///
/// let parent = Sdr::new(&[4, 4])?;
/// let mut view = Sdr::view(&parent)?;
/// match view.zero() {
///     Err(Error::UnsupportedOperation(operation)) => assert_eq!(operation, "set_sparse"),
///     other => panic!("views are read-only, got {other:?}"),
/// }
/// # Ok::<(), sdrscope::Error>(())
/// ```
pub use error::Error;

/// The node type, see [`sdr::Sdr`].
pub use sdr::Sdr;

/// Events, subscription handles and listeners of a node's notifier.
pub use sdr::{Listener, SdrEvent, SubscriptionToken};

/// Encodings of an active set and the bit set naming them.
pub use sdr::cache::{Representation, SdrCoordinates, SdrDense, SdrSparse};

/// Persistence entry points.
pub use serialization::{Archive, CodecConfig, Serializable, SerializableFormat};

/// Random number generation consumed by [`Sdr::randomize`] and [`Sdr::add_noise`].
pub use utils::{Random, RandomSource};

/// Low-level byte access used by the binary codec and file loading.
pub use file::{Parser, Physical};
