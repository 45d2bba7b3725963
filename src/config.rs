//! Construction-time settings shared by [`SkipMap`](crate::SkipMap) and
//! [`SkipMultiMap`](crate::SkipMultiMap).

use crate::error::{Error, Result};
use crate::raw::Handle;

/// Seed used when none is given, so that a freshly built container behaves the same on every run.
pub const DEFAULT_SEED: u64 = 0x5EED_CAFE_F00D_D00D;

/// Settings for a new container.
///
/// # Examples
///
/// ```
/// use balanced_skiplist::{Config, SkipMap};
///
/// let config = Config::new().seed(42).capacity(1_000);
/// let map: SkipMap<u32, &str> = SkipMap::with_config(config).unwrap();
/// assert!(map.capacity() >= 1_000);
/// ```
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub struct Config {
    /// Seed for the level generator.
    pub seed: u64,
    /// Number of elements to reserve room for.
    pub capacity: usize,
}

impl Config {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            seed: DEFAULT_SEED,
            capacity: 0,
        }
    }

    #[must_use]
    pub const fn seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub const fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Largest capacity a container can reserve.
    ///
    /// Nodes and payloads are addressed by the same kind of handle, and a balanced column averages
    /// two nodes, so this is half the handle space. Heavily unbalanced structures use more nodes per
    /// element and can run out of node handles before reaching it.
    #[must_use]
    pub const fn max_capacity() -> usize {
        Handle::MAX / 2
    }

    /// Checks the settings against the limits of the backing arenas.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `capacity` exceeds [`Config::max_capacity`].
    pub const fn validate(&self) -> Result<()> {
        if self.capacity > Self::max_capacity() {
            return Err(Error::InvalidConfig {
                requested: self.capacity,
                max: Self::max_capacity(),
            });
        }
        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let config = Config::new().seed(9).capacity(12);
        assert_eq!(config, Config { seed: 9, capacity: 12 });
        assert_eq!(Config::default().seed, DEFAULT_SEED);
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        let too_big = Config::max_capacity() + 1;
        assert_eq!(
            Config::new().capacity(too_big).validate(),
            Err(Error::InvalidConfig {
                requested: too_big,
                max: Config::max_capacity(),
            })
        );
        assert_eq!(Config::new().capacity(Config::max_capacity()).validate(), Ok(()));
    }

    #[test]
    fn max_capacity_fits_a_balanced_node_graph() {
        let elements = Config::max_capacity() as u64;
        let levels = u64::from(u64::BITS - elements.leading_zeros());
        // The i-th element has 1 + trailing_zeros(i) nodes; one sentinel per level.
        let nodes = 2 * elements - u64::from(elements.count_ones()) + levels;
        assert!(nodes <= Handle::MAX as u64 + 1);
    }
}
