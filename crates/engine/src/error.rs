use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Every slot holds an active entry for some other field.
    TooManyConditions { capacity: usize },
    /// Entry index outside the parameter's fixed capacity.
    IndexOutOfRange { index: usize, capacity: usize },
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooManyConditions { capacity } => {
                write!(f, "too many conditions: all {capacity} filter slots are in use")
            }
            Self::IndexOutOfRange { index, capacity } => {
                write!(f, "filter entry {index} is out of range (capacity {capacity})")
            }
        }
    }
}

impl std::error::Error for QueryError {}
