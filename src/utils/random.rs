//! Random sources for stochastic SDR operations.
//!
//! [`crate::Sdr::randomize`] and [`crate::Sdr::add_noise`] only need two things from a
//! generator: a uniform integer below some bound and an in-place shuffle. Those are
//! expressed by the [`RandomSource`] trait, which is implemented for every
//! [`rand::Rng`], so any seeded `rand` generator can be handed in directly.
//!
//! [`Random`] is the generator the rest of the system persists alongside its SDRs. It is a
//! ChaCha8 stream identified by its seed and its position in the stream, which is exactly
//! the state written by its [`crate::serialization::Serializable`] implementation. A
//! restored generator continues the stream where the saved one left off.
//!
//! # Example
//!
//! ```rust
//! use sdrscope::{Random, RandomSource};
//!
//! let mut a = Random::new(42);
//! let mut b = Random::new(42);
//! assert_eq!(a.uniform_below(100), b.uniform_below(100));
//! assert_eq!(a, b);
//! ```

use rand::{seq::SliceRandom, Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use crate::{
    serialization::{Archive, Serializable},
    Error, Result,
};

/// The random capability consumed by SDR operations.
pub trait RandomSource {
    /// Returns a uniformly distributed integer in `0..bound`; returns 0 when `bound` is 0.
    fn uniform_below(&mut self, bound: u32) -> u32;

    /// Shuffles `items` in place, every permutation equally likely.
    fn shuffle<T>(&mut self, items: &mut [T]);
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn uniform_below(&mut self, bound: u32) -> u32 {
        if bound == 0 {
            return 0;
        }
        self.gen_range(0..bound)
    }

    fn shuffle<T>(&mut self, items: &mut [T]) {
        items.shuffle(self);
    }
}

/// ChaCha addresses 2^64 blocks of 16 words each.
const MAX_WORD_POSITION: u128 = 1 << 68;

/// Seedable, persistable pseudo-random generator.
///
/// Two generators compare equal when they share a seed and stream position, so they
/// will produce identical output from here on.
#[derive(Clone, Debug)]
pub struct Random {
    seed: u64,
    rng: ChaCha8Rng,
}

impl Random {
    /// Archive kind written by the serializer.
    pub const ARCHIVE_KIND: &'static str = "Random";

    /// Creates a generator from `seed`.
    ///
    /// A seed of 0 requests a fresh, non-reproducible seed drawn from the thread-local
    /// entropy source; [`Random::seed`] reports the seed that was chosen.
    #[must_use]
    pub fn new(seed: u64) -> Self {
        let seed = if seed == 0 {
            rand::thread_rng().gen_range(1..=u64::MAX)
        } else {
            seed
        };

        Random {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn from_state(seed: u64, position: u128) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        rng.set_word_pos(position);
        Random { seed, rng }
    }

    /// Returns the seed this generator was created with.
    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Returns the number of 32-bit words consumed from the stream so far.
    #[must_use]
    pub fn position(&self) -> u128 {
        self.rng.get_word_pos()
    }

    /// Returns a uniformly distributed real in `[0, 1)`.
    pub fn get_real64(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Draws `count` distinct elements of `population` without replacement, in the order
    /// they were drawn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidValue`] if `count` exceeds the population size.
    pub fn sample(&mut self, population: &[u32], count: usize) -> Result<Vec<u32>> {
        if count > population.len() {
            return Err(Error::InvalidValue(format!(
                "cannot sample {count} elements from a population of {}",
                population.len()
            )));
        }

        Ok(population
            .choose_multiple(&mut self.rng, count)
            .copied()
            .collect())
    }
}

impl PartialEq for Random {
    fn eq(&self, other: &Self) -> bool {
        self.seed == other.seed && self.position() == other.position()
    }
}

impl Eq for Random {}

impl RngCore for Random {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest);
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> std::result::Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}

impl Serializable for Random {
    #[allow(clippy::cast_possible_truncation)]
    fn to_archive(&self) -> Result<Archive> {
        let position = self.position();
        Ok(Archive::new(Self::ARCHIVE_KIND)
            .with_scalar("seed", self.seed)
            .with_list("position", vec![(position >> 64) as u64, position as u64]))
    }

    fn from_archive(archive: &Archive) -> Result<Self> {
        archive.expect_kind(Self::ARCHIVE_KIND)?;

        let seed = archive.scalar("seed")?;
        let position = match archive.list("position")? {
            [high, low] => (u128::from(*high) << 64) | u128::from(*low),
            other => {
                return Err(corrupt_error!(
                    "random stream position must have 2 words, found {}",
                    other.len()
                ))
            }
        };
        if position >= MAX_WORD_POSITION {
            return Err(corrupt_error!(
                "random stream position {} is beyond the end of the stream",
                position
            ));
        }

        Ok(Random::from_state(seed, position))
    }
}
