//! Assertions that report failures as [`ConformanceError`] instead of panicking.

use std::fmt::Debug;

use fannypack::RangeIterator;

use crate::error::{ConformanceError, Result};

/// Returns a [`ConformanceError`] from the enclosing function unless both
/// sides are equal.
#[macro_export]
macro_rules! ensure_eq {
    ($left:expr, $right:expr $(,)?) => {
        match (&$left, &$right) {
            (left, right) => {
                if left != right {
                    return Err($crate::ConformanceError::new(format!(
                        "{}:{}: `{}` was {:?}, expected {:?}",
                        file!(),
                        line!(),
                        stringify!($left),
                        left,
                        right
                    )));
                }
            }
        }
    };
}

/// Checks that `iter` yields exactly `expected`, in order, then ends.
pub async fn assert_yields<T>(mut iter: RangeIterator<T>, expected: &[T]) -> Result<()>
where
    T: PartialEq + Debug + Send + Sync + 'static,
{
    for (position, want) in expected.iter().enumerate() {
        match iter.next().await? {
            Some(got) if &got == want => {}
            Some(got) => {
                return Err(ConformanceError::new(format!(
                    "item {} was {:?}, expected {:?}",
                    position, got, want
                )));
            }
            None => {
                return Err(ConformanceError::new(format!(
                    "sequence ended after {} items, expected {:?}",
                    position, expected
                )));
            }
        }
    }
    match iter.next().await? {
        None => Ok(()),
        Some(extra) => Err(ConformanceError::new(format!(
            "sequence continued past {} items with {:?}",
            expected.len(),
            extra
        ))),
    }
}
