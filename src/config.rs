//! Construction settings and the load-factor driven resize rules.

/// Smallest bucket count a table will ever have.
pub const MIN_CAPACITY: usize = 4;

/// Bucket count used when a caller asks for a capacity of zero.
pub const DEFAULT_CAPACITY: usize = 16;

/// Below this load factor a remove halves the bucket array.
pub const DEFAULT_MIN_LOAD: f64 = 0.25;

/// Above this load factor an add grows the bucket array by half.
pub const DEFAULT_MAX_LOAD: f64 = 0.75;

/// Grow/shrink thresholds on `len / capacity`.
///
/// The two bounds are not checked against each other. With `min >= max`
/// the table still resizes one step per triggering call; it simply never
/// settles inside a band.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct LoadFactor {
    pub min: f64,
    pub max: f64,
}

impl LoadFactor {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Bucket count an add should grow to once the table holds `len`
    /// entries, or `None` when the current capacity is fine.
    pub fn grow_target(&self, len: usize, capacity: usize) -> Option<usize> {
        if ratio(len, capacity) > self.max {
            let target = (capacity + capacity / 2).max(MIN_CAPACITY);
            (target != capacity).then_some(target)
        } else {
            None
        }
    }

    /// Bucket count a remove should shrink to once the table holds `len`
    /// entries, or `None` when no shrink is due or the floor is reached.
    pub fn shrink_target(&self, len: usize, capacity: usize) -> Option<usize> {
        if ratio(len, capacity) < self.min {
            let target = (capacity / 2).max(MIN_CAPACITY);
            (target != capacity).then_some(target)
        } else {
            None
        }
    }
}

impl Default for LoadFactor {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_LOAD, DEFAULT_MAX_LOAD)
    }
}

#[inline]
pub(crate) fn ratio(len: usize, capacity: usize) -> f64 {
    len as f64 / capacity as f64
}

/// Settings a table is built from.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct MapConfig {
    /// Requested bucket count. Zero means `DEFAULT_CAPACITY`; anything below
    /// `MIN_CAPACITY` is raised to it.
    pub initial_capacity: usize,
    pub load_factor: LoadFactor,
}

impl MapConfig {
    pub fn with_capacity(initial_capacity: usize) -> Self {
        Self {
            initial_capacity,
            ..Self::default()
        }
    }

    pub fn load_factor(mut self, load_factor: LoadFactor) -> Self {
        self.load_factor = load_factor;
        self
    }

    /// The bucket count a table built from this config starts with.
    pub fn bucket_count(&self) -> usize {
        normalize_capacity(self.initial_capacity)
    }
}

impl Default for MapConfig {
    fn default() -> Self {
        Self {
            initial_capacity: DEFAULT_CAPACITY,
            load_factor: LoadFactor::default(),
        }
    }
}

pub(crate) fn normalize_capacity(requested: usize) -> usize {
    if requested == 0 {
        DEFAULT_CAPACITY
    } else {
        requested.max(MIN_CAPACITY)
    }
}
