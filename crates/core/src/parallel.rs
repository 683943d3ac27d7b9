#[cfg(not(target_arch = "wasm32"))]
use rayon::prelude::*;

/// Below this many cells the rayon split costs more than it saves.
#[cfg(not(target_arch = "wasm32"))]
const PARALLEL_THRESHOLD: usize = 4096;

/// Applies `f` to every element. Elements must be independent of each other;
/// order-sensitive passes (the outlier filter) never go through here.
pub fn for_each_mut<T, F>(slice: &mut [T], f: F)
where
    T: Send,
    F: Fn(&mut T) + Sync + Send,
{
    #[cfg(not(target_arch = "wasm32"))]
    {
        if slice.len() >= PARALLEL_THRESHOLD {
            slice.par_iter_mut().for_each(|value| f(value));
            return;
        }
    }

    for value in slice.iter_mut() {
        f(value);
    }
}

#[cfg(test)]
mod tests {
    use super::for_each_mut;

    #[test]
    fn visits_small_and_large_slices() {
        let mut small = vec![1u32; 8];
        for_each_mut(&mut small, |value| *value *= 3);
        assert!(small.iter().all(|value| *value == 3));

        let mut large = vec![2u32; 10_000];
        for_each_mut(&mut large, |value| *value += 1);
        assert!(large.iter().all(|value| *value == 3));
    }
}
