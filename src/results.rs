use std::fmt;

/// Values handed to callbacks once a [`Future`](crate::Future) settles.
///
/// A single completion carries a tuple of values ([`Results::Single`]). A
/// future that tracked several completions exposes all of them, in arrival
/// order, as [`Results::Batch`]. Forwarding through `wrap`/`chain` moves a
/// whole `Results` as one completion, which is why the type nests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Results<T> {
    Single(Vec<T>),
    Batch(Vec<Results<T>>),
}

impl<T> Results<T> {
    /// Number of top-level entries: values for a single tuple, tuples for a batch.
    pub fn len(&self) -> usize {
        match self {
            Results::Single(values) => values.len(),
            Results::Batch(entries) => entries.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_single(&self) -> Option<&[T]> {
        match self {
            Results::Single(values) => Some(values),
            Results::Batch(_) => None,
        }
    }

    pub fn as_batch(&self) -> Option<&[Results<T>]> {
        match self {
            Results::Single(_) => None,
            Results::Batch(entries) => Some(entries),
        }
    }

    /// First value of a single tuple, e.g. the response of a one-request future.
    pub fn first(&self) -> Option<&T> {
        self.as_single().and_then(|values| values.first())
    }

    /// Every leaf value, depth first.
    pub fn values(&self) -> Vec<&T> {
        let mut out = Vec::new();
        self.collect_values(&mut out);
        out
    }

    fn collect_values<'a>(&'a self, out: &mut Vec<&'a T>) {
        match self {
            Results::Single(values) => out.extend(values.iter()),
            Results::Batch(entries) => {
                for entry in entries {
                    entry.collect_values(out);
                }
            }
        }
    }
}

impl<T> From<Vec<T>> for Results<T> {
    fn from(values: Vec<T>) -> Self {
        Results::Single(values)
    }
}

impl<T, const N: usize> From<[T; N]> for Results<T> {
    fn from(values: [T; N]) -> Self {
        Results::Single(values.into())
    }
}

/// Which callback queue an entry was attached through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    Then,
    Error,
    Always,
}

impl Kind {
    /// Whether a callback of this kind fires for `outcome`.
    pub fn matches(self, outcome: Outcome) -> bool {
        match self {
            Kind::Then => outcome == Outcome::Success,
            Kind::Error => outcome == Outcome::Failure,
            Kind::Always => true,
        }
    }
}

/// Final verdict of a settled future.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    Success,
    Failure,
}

impl Outcome {
    pub fn from_success(success: bool) -> Self {
        if success {
            Outcome::Success
        } else {
            Outcome::Failure
        }
    }

    pub fn is_success(self) -> bool {
        self == Outcome::Success
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Outcome::Success => write!(f, "success"),
            Outcome::Failure => write!(f, "failure"),
        }
    }
}
