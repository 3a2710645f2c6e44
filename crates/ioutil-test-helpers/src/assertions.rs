//! Custom assertion macros for testing.

/// Assert that a collection is sorted in ascending order.
///
/// ```rust
/// use ioutil_test_helpers::assert_sorted;
///
/// assert_sorted!(&[1, 2, 2, 3]);
/// ```
#[macro_export]
macro_rules! assert_sorted {
    ($collection:expr $(,)?) => {
        let collection = $collection;
        let mut iter = collection.iter();
        if let Some(mut prev) = iter.next() {
            for (i, curr) in iter.enumerate() {
                if prev > curr {
                    panic!(
                        "assertion failed: collection is not sorted\n  first unsorted pair at index {}: {:?} > {:?}",
                        i, prev, curr
                    );
                }
                prev = curr;
            }
        }
    };
}

/// Assert that a value lies within an inclusive range.
///
/// ```rust
/// use ioutil_test_helpers::assert_in_range;
///
/// assert_in_range!(5, 1..=10);
/// ```
#[macro_export]
macro_rules! assert_in_range {
    ($value:expr, $range:expr $(,)?) => {
        let value = $value;
        let range = $range;
        if !range.contains(&value) {
            panic!(
                "assertion failed: value out of range\n  value: `{:?}`,\n  range: `{:?}`",
                value, range
            );
        }
    };
}
