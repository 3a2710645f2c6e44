//! Unwrap helpers with good error messages.
//!
//! The workspace lints deny `unwrap()` and `expect()`; tests use these
//! instead. `#[track_caller]` keeps the panic location at the call site.

use std::fmt::Debug;

/// Unwrap a `Result`, panicking with the error value on `Err`.
///
/// ```rust
/// use ioutil_test_helpers::must;
///
/// let result: Result<i32, &str> = Ok(42);
/// assert_eq!(must(result), 42);
/// ```
///
/// # Panics
///
/// Panics if the result is `Err`.
#[track_caller]
pub fn must<T, E: Debug>(result: Result<T, E>) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("must: unexpected Err: {e:?}"),
    }
}

/// Unwrap an `Option`, panicking with `msg` if `None`.
///
/// ```rust
/// use ioutil_test_helpers::must_some;
///
/// assert_eq!(must_some(Some(7), "expected a value"), 7);
/// ```
///
/// # Panics
///
/// Panics if the option is `None`.
#[track_caller]
pub fn must_some<T>(option: Option<T>, msg: &str) -> T {
    match option {
        Some(v) => v,
        None => panic!("must_some: {msg}"),
    }
}

/// Unwrap a `Result` with a context message.
///
/// # Panics
///
/// Panics if the result is `Err`, with the context and error value.
#[track_caller]
pub fn must_with<T, E: Debug>(result: Result<T, E>, context: &str) -> T {
    match result {
        Ok(v) => v,
        Err(e) => panic!("must_with: {context}: {e:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_must_ok() {
        let result: Result<i32, &str> = Ok(42);
        assert_eq!(must(result), 42);
    }

    #[test]
    #[should_panic(expected = "must: unexpected Err")]
    fn test_must_err() {
        let result: Result<i32, &str> = Err("queue full");
        let _ = must(result);
    }

    #[test]
    #[should_panic(expected = "must_some: expected value")]
    fn test_must_some_none() {
        let option: Option<i32> = None;
        let _ = must_some(option, "expected value");
    }

    #[test]
    #[should_panic(expected = "must_with: enqueue")]
    fn test_must_with_err() {
        let result: Result<i32, &str> = Err("stopped");
        let _ = must_with(result, "enqueue");
    }
}
