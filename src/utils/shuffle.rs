use rand::seq::SliceRandom;
use rand::thread_rng;

/// Uniform in-place shuffle (Fisher-Yates via `rand`).
pub fn shuffle<T>(items: &mut [T]) {
    items.shuffle(&mut thread_rng());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shuffle_preserves_elements() {
        let mut items: Vec<u32> = (0..50).collect();
        shuffle(&mut items);
        assert_eq!(items.len(), 50);
        let mut sorted = items.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }
}
