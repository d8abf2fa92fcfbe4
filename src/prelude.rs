//! # sdrscope Prelude
//!
//! This module provides a convenient prelude for the most commonly used types and traits
//! from the sdrscope library.

// ================================================================================================
// Core Types and Error Handling
// ================================================================================================

/// The main error type for all sdrscope operations
pub use crate::Error;

/// The result type used throughout sdrscope
pub use crate::Result;

// ================================================================================================
// Nodes
// ================================================================================================

/// The SDR node, canonical or view
pub use crate::Sdr;

/// Notification types
pub use crate::{SdrEvent, SubscriptionToken};

/// Shared encodings handed out by reads
pub use crate::{SdrCoordinates, SdrDense, SdrSparse};

// ================================================================================================
// Randomness
// ================================================================================================

/// Seedable generator and the capability SDR operations consume
pub use crate::{Random, RandomSource};

// ================================================================================================
// Persistence
// ================================================================================================

/// Save/load capability, formats and codec settings
pub use crate::{CodecConfig, Serializable, SerializableFormat};
