//! Randomisation, noise and set algebra over SDRs.
//!
//! Every operation here that changes its receiver validates all inputs first and then fires
//! a single [`super::SdrEvent::ValueChanged`]. Set operations work on the sparse encoding,
//! which is always sorted, so they run as linear merges.

use std::{cmp::Ordering, sync::Arc};

use crate::{
    utils::{check_fraction, checked_size, round_count, RandomSource},
    Error, Result,
};

use super::Sdr;

impl Sdr {
    /// Activates `round(sparsity * size)` cells chosen uniformly without replacement.
    ///
    /// The result depends only on the state of `rng`, so a fixed seed reproduces it.
    ///
    /// # Errors
    /// Returns [`Error::InvalidValue`] unless `sparsity` lies in `[0, 1]`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sdrscope::{Random, Sdr};
    ///
    /// let mut sdr = Sdr::new(&[1000])?;
    /// sdr.randomize(0.2, &mut Random::new(42))?;
    /// assert_eq!(sdr.get_sum()?, 200);
    /// # Ok::<(), sdrscope::Error>(())
    /// ```
    pub fn randomize<R: RandomSource>(&mut self, sparsity: f64, rng: &mut R) -> Result<()> {
        self.ensure_mutable("randomize")?;
        check_fraction("sparsity", sparsity)?;

        let count = round_count(sparsity, self.size());
        let mut population: Vec<u32> = (0..self.size_u32()).collect();
        let mut sparse = choose(&mut population, count, rng).to_vec();
        sparse.sort_unstable();

        self.node.write(|cache| cache.store_sparse(Arc::from(sparse)));
        Ok(())
    }

    /// Moves `round(fraction * active)` active cells to inactive positions.
    ///
    /// That many active cells are turned off and the same number of previously inactive
    /// cells are turned on, so the number of active cells never changes. The count is capped
    /// at the number of inactive cells.
    ///
    /// # Errors
    /// Returns [`Error::InvalidValue`] unless `fraction` lies in `[0, 1]`.
    pub fn add_noise<R: RandomSource>(&mut self, fraction: f64, rng: &mut R) -> Result<()> {
        self.ensure_mutable("add_noise")?;
        check_fraction("noise fraction", fraction)?;

        let active = self.get_sparse()?;
        let count = round_count(fraction, active.len()).min(self.size() - active.len());

        // The first `count` entries after shuffling are the cells that turn off.
        let mut next = active.to_vec();
        rng.shuffle(&mut next);
        next.drain(..count);

        let mut inactive = complement(&active, self.size_u32());
        next.extend_from_slice(choose(&mut inactive, count, rng));
        next.sort_unstable();

        self.node.write(|cache| cache.store_sparse(Arc::from(next)));
        Ok(())
    }

    /// Returns the number of cells active in both `self` and `other`.
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] if the sizes differ and [`Error::UseAfterFree`]
    /// if either side is an orphaned view.
    pub fn get_overlap(&self, other: &Sdr) -> Result<usize> {
        self.ensure_live()?;
        other.ensure_live()?;
        self.ensure_same_size(other)?;
        let mine = self.get_sparse()?;
        let theirs = other.get_sparse()?;
        Ok(intersect(&mine, &theirs).len())
    }

    /// Sets `self` to the cells active in every input.
    ///
    /// # Errors
    /// Returns [`Error::InvalidValue`] for an empty input list, [`Error::DimensionMismatch`]
    /// if an input differs in size and [`Error::UseAfterFree`] for orphaned inputs.
    pub fn intersection(&mut self, inputs: &[&Sdr]) -> Result<()> {
        self.ensure_mutable("intersection")?;
        let sets = self.collect_inputs(inputs)?;

        let mut result = sets[0].to_vec();
        for set in &sets[1..] {
            result = intersect(&result, set);
        }

        self.node.write(|cache| cache.store_sparse(Arc::from(result)));
        Ok(())
    }

    /// Sets `self` to the cells active in at least one input.
    ///
    /// # Errors
    /// Returns [`Error::InvalidValue`] for an empty input list, [`Error::DimensionMismatch`]
    /// if an input differs in size and [`Error::UseAfterFree`] for orphaned inputs.
    pub fn set_union(&mut self, inputs: &[&Sdr]) -> Result<()> {
        self.ensure_mutable("set_union")?;
        let sets = self.collect_inputs(inputs)?;

        let mut result = sets[0].to_vec();
        for set in &sets[1..] {
            result = unite(&result, set);
        }

        self.node.write(|cache| cache.store_sparse(Arc::from(result)));
        Ok(())
    }

    /// Sets `self` to the inputs joined end to end along `axis`.
    ///
    /// Each input must match `self` in every dimension except `axis`, and the inputs'
    /// extents along `axis` must add up to that of `self`.
    ///
    /// # Errors
    /// Returns [`Error::InvalidValue`] if `axis` is not below the rank or no inputs are
    /// given, [`Error::InvalidLength`] for inputs of another rank and
    /// [`Error::DimensionMismatch`] when extents do not line up.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use sdrscope::Sdr;
    ///
    /// let mut top = Sdr::new(&[1, 3])?;
    /// let mut bottom = Sdr::new(&[1, 3])?;
    /// top.set_sparse(&[0])?;
    /// bottom.set_sparse(&[2])?;
    ///
    /// let mut joined = Sdr::new(&[2, 3])?;
    /// joined.concatenate(&[&top, &bottom], 0)?;
    /// assert_eq!(joined.get_sparse()?.to_vec(), vec![0, 5]);
    /// # Ok::<(), sdrscope::Error>(())
    /// ```
    pub fn concatenate(&mut self, inputs: &[&Sdr], axis: usize) -> Result<()> {
        self.ensure_mutable("concatenate")?;
        let rank = self.rank();
        if axis >= rank {
            return Err(Error::InvalidValue(format!(
                "axis {axis} is out of range for {rank} dimensions"
            )));
        }
        if inputs.is_empty() {
            return Err(Error::InvalidValue(
                "concatenate needs at least one input".to_string(),
            ));
        }

        let mut extent = 0usize;
        for input in inputs {
            if input.rank() != rank {
                return Err(Error::InvalidLength {
                    expected: rank,
                    actual: input.rank(),
                });
            }
            let pairs = self.dimensions().iter().zip(input.dimensions());
            for (dim, (&mine, &theirs)) in pairs.enumerate() {
                if dim != axis && mine != theirs {
                    return Err(Error::DimensionMismatch {
                        expected: mine as usize,
                        actual: theirs as usize,
                    });
                }
            }
            extent += input.dimensions()[axis] as usize;
        }
        if extent != self.dimensions()[axis] as usize {
            return Err(Error::DimensionMismatch {
                expected: self.dimensions()[axis] as usize,
                actual: extent,
            });
        }

        // Row-major layout: each input contributes one contiguous block of its inner
        // extent per outer index.
        let outer = checked_size(&self.dimensions()[..axis]).unwrap_or(0);
        let blocks = inputs
            .iter()
            .map(|input| {
                let inner = checked_size(&input.dimensions()[axis..]).unwrap_or(0);
                input.get_dense().map(|dense| (dense, inner))
            })
            .collect::<Result<Vec<_>>>()?;

        let mut dense = Vec::with_capacity(self.size());
        let mut sum = 0;
        for row in 0..outer {
            for (block, inner) in &blocks {
                let slice = &block[row * inner..(row + 1) * inner];
                sum += slice.iter().filter(|&&value| value != 0).count();
                dense.extend_from_slice(slice);
            }
        }

        self.node.write(|cache| cache.store_dense(Arc::from(dense), sum));
        Ok(())
    }

    fn collect_inputs(&self, inputs: &[&Sdr]) -> Result<Vec<super::SdrSparse>> {
        if inputs.is_empty() {
            return Err(Error::InvalidValue(
                "at least one input is required".to_string(),
            ));
        }
        inputs
            .iter()
            .map(|input| {
                self.ensure_same_size(input)?;
                input.get_sparse()
            })
            .collect()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn size_u32(&self) -> u32 {
        // Construction guarantees that every size fits in u32.
        self.size() as u32
    }
}

/// Moves `count` uniformly chosen, distinct entries of `population` to its front and
/// returns them (partial Fisher-Yates).
fn choose<'a, R: RandomSource>(
    population: &'a mut [u32],
    count: usize,
    rng: &mut R,
) -> &'a [u32] {
    let count = count.min(population.len());
    for position in 0..count {
        #[allow(clippy::cast_possible_truncation)]
        let remaining = (population.len() - position) as u32;
        let pick = position + rng.uniform_below(remaining) as usize;
        population.swap(position, pick);
    }
    &population[..count]
}

/// Returns the ascending indices below `size` that are not in `active`.
fn complement(active: &[u32], size: u32) -> Vec<u32> {
    let mut inactive = Vec::with_capacity(size as usize - active.len());
    let mut next = active.iter().peekable();
    for index in 0..size {
        if next.peek() == Some(&&index) {
            next.next();
        } else {
            inactive.push(index);
        }
    }
    inactive
}

fn intersect(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut result = Vec::with_capacity(a.len().min(b.len()));
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => i += 1,
            Ordering::Greater => j += 1,
            Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result
}

fn unite(a: &[u32], b: &[u32]) -> Vec<u32> {
    let mut result = Vec::with_capacity(a.len() + b.len());
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        match a[i].cmp(&b[j]) {
            Ordering::Less => {
                result.push(a[i]);
                i += 1;
            }
            Ordering::Greater => {
                result.push(b[j]);
                j += 1;
            }
            Ordering::Equal => {
                result.push(a[i]);
                i += 1;
                j += 1;
            }
        }
    }
    result.extend_from_slice(&a[i..]);
    result.extend_from_slice(&b[j..]);
    result
}
