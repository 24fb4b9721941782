use std::{
    error::Error,
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use tracing::{debug, trace};

use crate::{ErrorCollector, FormattedError};

/// An error held by a [`SharedError`].
/// 
/// Errors are reference-counted so that [`SharedError::errors`] can hand out a snapshot without
/// cloning the errors themselves.
pub type StoredError = Arc<dyn Error + Send + Sync + 'static>;

const SEPARATOR: &str = " / ";

/// Collects errors reported by any number of threads, and presents them as a single error.
/// 
/// Workers share a `SharedError` by reference (through [`std::thread::scope`] or an [`Arc`]) and
/// call [`store`] whenever something fails. Once they are done, the supervising code can check
/// [`triggered`], inspect the individual [`errors`], test them with [`is_any`] and [`is_all`], or
/// pass the whole thing on as an ordinary error.
/// 
/// [`store`]: SharedError::store
/// [`triggered`]: SharedError::triggered
/// [`errors`]: SharedError::errors
/// [`is_any`]: SharedError::is_any
/// [`is_all`]: SharedError::is_all
/// 
/// ```
/// # use shared_error::SharedError;
/// let shared = SharedError::new();
/// 
/// std::thread::scope(|s| {
///     for i in 0..4 {
///         let shared = &shared;
///         s.spawn(move || {
///             if i % 2 == 1 {
///                 shared.store(format!("task {i} failed"));
///             }
///         });
///     }
/// });
/// 
/// assert!(shared.triggered());
/// assert_eq!(shared.len(), 2);
/// ```
/// 
/// # Message
/// 
/// `SharedError` implements [`Display`](fmt::Display) and [`Error`]. With a single stored error,
/// the message is that error's message. With several, each one is numbered by position and they
/// are joined with `" / "`:
/// 
/// ```
/// # use shared_error::SharedError;
/// let shared = SharedError::new();
/// shared.store("some error");
/// assert_eq!(shared.to_string(), "some error");
/// 
/// shared.store("other error");
/// assert_eq!(shared.to_string(), "error 0: some error / error 1: other error");
/// ```
/// 
/// Positions follow the order in which `store` calls took the lock, which for concurrent workers
/// is not necessarily the order in which they started.
/// 
/// # Locking
/// 
/// Every method takes the same exclusive lock for the duration of the call, reads included. A
/// `SharedError` must not be stored inside itself (for instance through an `Arc<SharedError>`),
/// since rendering it would then try to take its own lock.
#[derive(Default)]
pub struct SharedError {
    errors: Mutex<Vec<StoredError>>,
}

impl SharedError {
    /// Constructs a new `SharedError` with no errors.
    /// 
    /// This is a `const fn`, so a `SharedError` can also live in a `static`:
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// static FAILURES: SharedError = SharedError::new();
    /// 
    /// FAILURES.store("oh no!");
    /// assert!(FAILURES.triggered());
    /// ```
    #[must_use]
    pub const fn new() -> Self {
        SharedError { errors: Mutex::new(Vec::new()) }
    }

    // The list is only ever pushed to or swapped out, so a poisoned lock still guards a valid list.
    fn lock(&self) -> MutexGuard<'_, Vec<StoredError>> {
        self.errors.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn push(&self, error: StoredError) {
        let count = {
            let mut errors = self.lock();
            errors.push(error);
            errors.len()
        };
        trace!(count, "stored error");
    }

    /// Stores an error.
    /// 
    /// Anything convertible into a boxed error is accepted, including plain strings:
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// let shared = SharedError::new();
    /// shared.store("connection refused");
    /// shared.store(std::io::Error::other("disk full"));
    /// 
    /// assert_eq!(shared.len(), 2);
    /// ```
    /// 
    /// A [`StoredError`] taken from another `SharedError` is stored as the same shared error, not
    /// wrapped again, so [`is_any`] and [`is_all`] still see the original value:
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// let first = SharedError::new();
    /// first.store(std::fmt::Error);
    /// 
    /// let second = SharedError::new();
    /// for error in first.errors() {
    ///     second.store(error);
    /// }
    /// assert!(second.is_any(&std::fmt::Error));
    /// ```
    /// 
    /// [`is_any`]: SharedError::is_any
    /// [`is_all`]: SharedError::is_all
    pub fn store<E>(&self, error: E)
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        let error: Box<dyn Error + Send + Sync + 'static> = error.into();
        match error.downcast::<StoredError>() {
            Ok(stored) => self.push(*stored),
            Err(error) => self.push(Arc::from(error)),
        }
    }

    /// Stores an error if there is one. `None` is ignored.
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// let shared = SharedError::new();
    /// shared.store_opt(None::<std::io::Error>);
    /// assert!(!shared.triggered());
    /// 
    /// shared.store_opt(Some("oh no!"));
    /// assert!(shared.triggered());
    /// ```
    pub fn store_opt<E>(&self, error: Option<E>)
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        if let Some(error) = error {
            self.store(error);
        }
    }

    /// Stores the error of a [`Result`], if it is an [`Err`], and returns the value of an [`Ok`].
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// let shared = SharedError::new();
    /// let parsed: Vec<u32> = ["1", "x", "3"]
    ///     .iter()
    ///     .filter_map(|s| shared.store_result(s.parse::<u32>()))
    ///     .collect();
    /// 
    /// assert_eq!(parsed, vec![1, 3]);
    /// assert_eq!(shared.to_string(), "invalid digit found in string");
    /// ```
    pub fn store_result<T, E>(&self, result: Result<T, E>) -> Option<T>
    where
        E: Into<Box<dyn Error + Send + Sync + 'static>>,
    {
        match result {
            Ok(value) => Some(value),
            Err(error) => {
                self.store(error);
                None
            }
        }
    }

    /// Stores a [`FormattedError`] built from format arguments. `template` is the format string
    /// the arguments were built from; if it is empty, nothing is stored. A non-empty template is
    /// always stored, even when the rendered message turns out empty.
    /// 
    /// Usually called through the [`storef!`](crate::storef) macro, which passes the template
    /// along.
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// let shared = SharedError::new();
    /// shared.store_fmt("", format_args!(""));
    /// assert!(!shared.triggered());
    /// 
    /// let template = "{} of {} workers failed";
    /// shared.store_fmt(template, format_args!("{} of {} workers failed", 2, 8));
    /// assert_eq!(shared.to_string(), "2 of 8 workers failed");
    /// ```
    pub fn store_fmt(&self, template: &str, args: fmt::Arguments<'_>) {
        if template.is_empty() {
            return;
        }

        self.push(Arc::new(FormattedError::new(args.to_string())));
    }

    /// Returns `true` if any error has been stored.
    #[must_use]
    pub fn triggered(&self) -> bool {
        !self.lock().is_empty()
    }

    /// The number of stored errors.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Returns `true` if no error has been stored. Opposite of [`triggered`].
    /// 
    /// [`triggered`]: SharedError::triggered
    #[must_use]
    pub fn is_empty(&self) -> bool {
        !self.triggered()
    }

    /// Returns this `SharedError` as an error if it has been triggered, or `None` otherwise.
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// let shared = SharedError::new();
    /// assert!(shared.as_error().is_none());
    /// 
    /// shared.store("some error");
    /// let err: &dyn std::error::Error = shared.as_error().unwrap();
    /// assert_eq!(err.to_string(), "some error");
    /// ```
    #[must_use]
    pub fn as_error(&self) -> Option<&Self> {
        if self.triggered() {
            Some(self)
        } else {
            None
        }
    }

    /// Converts this `SharedError` into a [`Result`]: [`Ok`] if nothing was stored, or [`Err`]
    /// with `self` otherwise. Handy once the workers are done, to propagate with `?`.
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// fn run(inputs: &[&str]) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    ///     let shared = SharedError::new();
    ///     std::thread::scope(|s| {
    ///         for input in inputs {
    ///             let shared = &shared;
    ///             s.spawn(move || shared.store_result(input.parse::<u32>()));
    ///         }
    ///     });
    ///     shared.into_result()?;
    ///     Ok(())
    /// }
    /// 
    /// assert!(run(&["1", "2"]).is_ok());
    /// assert!(run(&["1", "two"]).is_err());
    /// ```
    pub fn into_result(self) -> Result<(), Self> {
        if self.triggered() {
            Err(self)
        } else {
            Ok(())
        }
    }

    /// A snapshot of the stored errors, in storage order.
    /// 
    /// The returned list is independent of this `SharedError`: errors stored afterwards do not
    /// appear in it, and iterating it does not hold the lock.
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// let shared = SharedError::new();
    /// shared.store("first");
    /// 
    /// let snapshot = shared.errors();
    /// shared.store("second");
    /// 
    /// assert_eq!(snapshot.len(), 1);
    /// assert_eq!(snapshot[0].to_string(), "first");
    /// ```
    #[must_use]
    pub fn errors(&self) -> Vec<StoredError> {
        self.lock().clone()
    }

    /// Returns `true` if at least one stored error matches `target`.
    /// 
    /// An error matches if it, or any error in its [`source`](Error::source) chain, is a `T`
    /// equal to `target`.
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// #[derive(Debug, PartialEq, thiserror::Error)]
    /// #[error("resource exhausted")]
    /// struct Exhausted;
    /// 
    /// let shared = SharedError::new();
    /// assert!(!shared.is_any(&Exhausted));
    /// 
    /// shared.store("some other error");
    /// assert!(!shared.is_any(&Exhausted));
    /// 
    /// shared.store(Exhausted);
    /// assert!(shared.is_any(&Exhausted));
    /// ```
    #[must_use]
    pub fn is_any<T>(&self, target: &T) -> bool
    where
        T: Error + PartialEq + 'static,
    {
        self.lock().iter().any(|error| matches(&**error, target))
    }

    /// Returns `true` if errors have been stored and every one of them matches `target`, in the
    /// same sense as [`is_any`].
    /// 
    /// A `SharedError` with no errors never matches.
    /// 
    /// [`is_any`]: SharedError::is_any
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// #[derive(Debug, PartialEq, thiserror::Error)]
    /// #[error("resource exhausted")]
    /// struct Exhausted;
    /// 
    /// let shared = SharedError::new();
    /// assert!(!shared.is_all(&Exhausted));
    /// 
    /// shared.store(Exhausted);
    /// shared.store(Exhausted);
    /// assert!(shared.is_all(&Exhausted));
    /// 
    /// shared.store("some other error");
    /// assert!(!shared.is_all(&Exhausted));
    /// ```
    #[must_use]
    pub fn is_all<T>(&self, target: &T) -> bool
    where
        T: Error + PartialEq + 'static,
    {
        let errors = self.lock();
        !errors.is_empty() && errors.iter().all(|error| matches(&**error, target))
    }

    /// Clears all stored errors, returning them as a new `SharedError`, or `None` if there were
    /// none. Taking the errors and clearing happen under a single lock.
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// let shared = SharedError::new();
    /// assert!(shared.reset().is_none());
    /// 
    /// shared.store("some error");
    /// shared.store("other error");
    /// 
    /// let previous = shared.reset().unwrap();
    /// assert_eq!(previous.to_string(), "error 0: some error / error 1: other error");
    /// assert!(!shared.triggered());
    /// assert!(shared.reset().is_none());
    /// ```
    pub fn reset(&self) -> Option<SharedError> {
        let taken = std::mem::take(&mut *self.lock());
        if taken.is_empty() {
            return None;
        }

        debug!(count = taken.len(), "reset shared error");
        Some(SharedError { errors: Mutex::new(taken) })
    }

    /// Clears all stored errors, moving them into an [`ErrorCollector`] in storage order. Like
    /// [`reset`], the errors are taken under a single lock.
    /// 
    /// ```
    /// # use shared_error::{SharedError, StoredError};
    /// let shared = SharedError::new();
    /// shared.store("error 1");
    /// shared.store("error 2");
    /// 
    /// let mut drained: Vec<StoredError> = vec![];
    /// shared.propagate(&mut drained);
    /// 
    /// assert_eq!(drained.len(), 2);
    /// assert!(!shared.triggered());
    /// ```
    /// 
    /// [`reset`]: SharedError::reset
    pub fn propagate(&self, other: &mut impl ErrorCollector<StoredError>) {
        let taken = std::mem::take(&mut *self.lock());
        if !taken.is_empty() {
            debug!(count = taken.len(), "propagated shared error");
        }

        other.push_errors(taken);
    }
}

/// Walks the source chain of `error`, looking for a `T` equal to `target`.
fn matches<T>(error: &(dyn Error + 'static), target: &T) -> bool
where
    T: Error + PartialEq + 'static,
{
    let mut current = Some(error);
    while let Some(error) = current {
        if error.downcast_ref::<T>() == Some(target) {
            return true;
        }
        current = error.source();
    }
    false
}

impl fmt::Display for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let errors = self.lock();

        match errors.as_slice() {
            [] => Ok(()),
            [only] => write!(f, "{only}"),
            many => {
                for (i, error) in many.iter().enumerate() {
                    if i != 0 {
                        f.write_str(SEPARATOR)?;
                    }
                    write!(f, "error {i}: {error}")?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Debug for SharedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedError")
            .field("errors", &*self.lock())
            .finish()
    }
}

impl Error for SharedError {}

impl<E> ErrorCollector<E> for SharedError
where
    E: Into<Box<dyn Error + Send + Sync + 'static>>,
{
    fn push_error(&mut self, error: E) {
        self.store(error);
    }
}

impl<E> ErrorCollector<E> for &SharedError
where
    E: Into<Box<dyn Error + Send + Sync + 'static>>,
{
    fn push_error(&mut self, error: E) {
        self.store(error);
    }
}

impl<E> Extend<E> for SharedError
where
    E: Into<Box<dyn Error + Send + Sync + 'static>>,
{
    fn extend<I: IntoIterator<Item = E>>(&mut self, iter: I) {
        self.push_errors(iter);
    }
}

impl<E> FromIterator<E> for SharedError
where
    E: Into<Box<dyn Error + Send + Sync + 'static>>,
{
    /// Collects errors into a new `SharedError`, in order.
    /// 
    /// ```
    /// # use shared_error::SharedError;
    /// let shared: SharedError = ["error 1", "error 2"].into_iter().collect();
    /// assert_eq!(shared.to_string(), "error 0: error 1 / error 1: error 2");
    /// ```
    fn from_iter<I: IntoIterator<Item = E>>(iter: I) -> Self {
        let mut shared = SharedError::new();
        shared.extend(iter);
        shared
    }
}
