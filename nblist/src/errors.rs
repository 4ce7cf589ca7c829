#[non_exhaustive]
#[derive(Debug)]
pub enum Error {
    /// Got an invalid parameter value in a function
    InvalidParameter(String),
    /// The simulation cell can not be used with the requested cutoff
    Configuration(String),
    /// The neighbor list was invalidated and must be rebuilt before use
    Invalidated(String),
    /// A caller-supplied buffer is too small for the stored neighbor list
    BufferTooSmall {
        /// the atom whose neighbors were requested
        atom: usize,
        /// minimal size of the buffer
        required: usize,
        /// actual size of the buffer
        available: usize,
    },
    /// An operation was called in a state where it can not run
    Precondition(String),
    /// An atom has more neighbors than the configured maximum
    TooManyNeighbors {
        /// the atom with too many neighbors
        atom: usize,
        /// number of neighbors found for this atom
        count: usize,
        /// maximal allowed number of neighbors
        maximum: usize,
    },
    /// The half and full neighbor lists disagree about a pair
    Inconsistent {
        /// first atom in the pair
        first: usize,
        /// second atom in the pair
        second: usize,
        /// measured distance between the atoms
        distance: f64,
        /// distance under which the pair must be consistent
        expected: f64,
    },
    /// Error while serializing/deserializing data
    Json(serde_json::Error),
    /// Internal error, this should never happen
    Internal(String),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::InvalidParameter(e) => write!(f, "invalid parameter: {}", e),
            Error::Configuration(e) => write!(f, "configuration error: {}", e),
            Error::Invalidated(e) => write!(f, "invalidated neighbor list: {}", e),
            Error::BufferTooSmall { atom, required, available } => write!(f,
                "neighbor buffer overflow for atom {}: need space for {} neighbors, got {}",
                atom, required, available
            ),
            Error::Precondition(e) => write!(f, "precondition failed: {}", e),
            Error::TooManyNeighbors { atom, count, maximum } => write!(f,
                "atom {} has {} neighbors, more than the maximum of {} (did you squeeze your atoms?)",
                atom, count, maximum
            ),
            Error::Inconsistent { first, second, distance, expected } => write!(f,
                "inconsistent neighbor list for pair {}-{} at distance {} (expected consistency up to {})",
                first, second, distance, expected
            ),
            Error::Json(e) => write!(f, "json error: {}", e),
            Error::Internal(e) => write!(f, "internal error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::InvalidParameter(_) |
            Error::Configuration(_) |
            Error::Invalidated(_) |
            Error::BufferTooSmall { .. } |
            Error::Precondition(_) |
            Error::TooManyNeighbors { .. } |
            Error::Inconsistent { .. } |
            Error::Internal(_) => None,
            Error::Json(e) => Some(e),
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Error {
        Error::Json(error)
    }
}

// poisoned locks on the shared system are only produced by a panic in
// another thread while it held the lock
impl<T> From<std::sync::PoisonError<T>> for Error {
    fn from(error: std::sync::PoisonError<T>) -> Error {
        Error::Internal(format!("the system lock is poisoned: {}", error))
    }
}
