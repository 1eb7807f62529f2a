//! Fork-join helpers running on the rayon thread pool when the `parallel` feature is enabled.
//!
//! Every helper blocks until all the items have been processed.

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Maps every element of `items` with `f`, preserving the order.
pub(crate) fn map_collect<T: Sync, R: Send>(
    items: &[T],
    f: impl Fn(&T) -> R + Sync + Send,
) -> Vec<R> {
    #[cfg(feature = "parallel")]
    return items.par_iter().map(f).collect();
    #[cfg(not(feature = "parallel"))]
    return items.iter().map(f).collect();
}

/// Writes `f(input[i])` into `output[i]` for every `i`.
pub(crate) fn map_into<T: Sync, R: Send>(
    input: &[T],
    output: &mut [R],
    f: impl Fn(&T) -> R + Sync + Send,
) {
    assert_eq!(input.len(), output.len());
    #[cfg(feature = "parallel")]
    output
        .par_iter_mut()
        .zip(input.par_iter())
        .for_each(|(out, inp)| *out = f(inp));
    #[cfg(not(feature = "parallel"))]
    output
        .iter_mut()
        .zip(input.iter())
        .for_each(|(out, inp)| *out = f(inp));
}
