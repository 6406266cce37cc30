use num_traits::{AsPrimitive, Float};

/// Returns `n` evenly spaced values from `start` to `end`, inclusive.
///
/// The final value is exactly `end`. A single value is the midpoint of
/// the range.
pub fn linspace<T>(start: T, end: T, n: usize) -> impl Iterator<Item = T>
where
    T: Float + 'static,
    usize: AsPrimitive<T>,
{
    let last = n.saturating_sub(1);
    let step = if last == 0 {
        T::zero()
    } else {
        (end - start) / last.as_()
    };
    let mid = start + (end - start) / (T::one() + T::one());
    (0..n).map(move |i| match i {
        _ if last == 0 => mid,
        i if i == last => end,
        i => start + i.as_() * step,
    })
}
