/// Something which accepts errors.
/// 
/// This generalizes pushing into a [`SharedError`], so that code reporting failures does not need
/// to know whether it is writing into a plain [`Vec`] or into an aggregator shared with other
/// threads. [`SharedError::propagate`] drains into any `ErrorCollector`.
/// 
/// Because [`SharedError`] only needs `&self` to store, the trait is also implemented for
/// `&SharedError`:
/// 
/// ```
/// # use shared_error::{ErrorCollector, SharedError};
/// fn check(input: &str, errs: &mut impl ErrorCollector<String>) {
///     if input.is_empty() {
///         errs.push_error("empty input".to_owned());
///     }
/// }
/// 
/// let shared = SharedError::new();
/// std::thread::scope(|s| {
///     for input in ["", "a", ""] {
///         let mut handle = &shared;
///         s.spawn(move || check(input, &mut handle));
///     }
/// });
/// assert_eq!(shared.len(), 2);
/// ```
/// 
/// [`SharedError`]: crate::SharedError
/// [`SharedError::propagate`]: crate::SharedError::propagate
pub trait ErrorCollector<E> {
    /// Add a new error to the collection of errors.
    fn push_error(&mut self, error: E);

    /// Add every error yielded by an iterator, in order.
    fn push_errors(&mut self, errors: impl IntoIterator<Item = E>) {
        for error in errors {
            self.push_error(error);
        }
    }
}

impl<E> ErrorCollector<E> for Vec<E> {
    fn push_error(&mut self, error: E) {
        self.push(error);
    }
}
