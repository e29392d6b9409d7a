//! Error types for the `chained-map` crate

use core::fmt;

/// Which half of an entry an error refers to.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Part {
    Key,
    Value,
}

impl fmt::Display for Part {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Part::Key => f.write_str("key"),
            Part::Value => f.write_str("value"),
        }
    }
}

/// Returned by copy policies when they cannot produce an owned copy.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, thiserror::Error)]
#[error("allocation failed while copying into the table")]
pub struct AllocError;

/// Errors surfaced by table construction and insertion.
///
/// Lookups never fail: a missing key is reported as `None` or `false`.
#[derive(Clone, Debug, Eq, PartialEq, thiserror::Error)]
#[non_exhaustive]
pub enum Error {
    /// The bucket array could not be allocated.
    ///
    /// Only construction reports this. A resize that cannot allocate is
    /// abandoned and the table keeps its current capacity.
    #[error("could not allocate a bucket array of {0} buckets")]
    BucketArray(usize),

    /// The key copy policy failed; nothing was inserted.
    #[error("could not copy the key into the table")]
    KeyCopy(#[source] AllocError),

    /// The value copy policy failed; the already copied key was destroyed
    /// and nothing was inserted.
    #[error("could not copy the value into the table")]
    ValueCopy(#[source] AllocError),

    /// A byte buffer is longer than the fixed size the table was built with.
    #[error("{part} of {actual} bytes does not fit the table's {expected}-byte {part} size")]
    Oversized {
        part: Part,
        expected: usize,
        actual: usize,
    },
}
