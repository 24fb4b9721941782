use thiserror::Error;

/// An error built from a format string by [`SharedError::store_fmt`] or [`storef!`].
/// 
/// It carries nothing but the rendered message, so two `FormattedError`s are equal when their
/// messages are.
/// 
/// ```
/// # use shared_error::FormattedError;
/// let err = FormattedError::new(format!("disk {} is full", 3));
/// assert_eq!(err.to_string(), "disk 3 is full");
/// assert_eq!(err.message(), "disk 3 is full");
/// ```
/// 
/// [`SharedError::store_fmt`]: crate::SharedError::store_fmt
/// [`storef!`]: crate::storef
#[derive(Error, Debug, Clone, Hash, PartialEq, Eq)]
#[error("{0}")]
pub struct FormattedError(String);

impl FormattedError {
    /// Wraps an already rendered message.
    pub fn new(message: impl Into<String>) -> Self {
        FormattedError(message.into())
    }

    /// The rendered message.
    pub fn message(&self) -> &str {
        &self.0
    }
}

/// Stores a formatted error in a [`SharedError`], with the same syntax as [`format!`].
/// 
/// An empty format string stores nothing. Any other format string stores an error, even if the
/// message it renders is empty.
/// 
/// ```
/// # use shared_error::{storef, SharedError};
/// let shared = SharedError::new();
/// storef!(shared, "worker {} failed", 7);
/// storef!(shared, "");
/// 
/// assert_eq!(shared.len(), 1);
/// assert_eq!(shared.to_string(), "worker 7 failed");
/// 
/// storef!(shared, "{}", "");
/// assert_eq!(shared.len(), 2);
/// ```
/// 
/// [`SharedError`]: crate::SharedError
#[macro_export]
macro_rules! storef {
    ($shared:expr, $fmt:literal $(, $($arg:tt)*)?) => {
        $shared.store_fmt($fmt, ::core::format_args!($fmt $(, $($arg)*)?))
    };
}
