use rand::Rng;

use crate::components::Pos;

/// Draws up to `n` distinct cells from `cells`, uniformly and without
/// replacement, skipping anything in `exclude`. Returns fewer than `n`
/// when the pool runs dry.
pub fn pick_random(cells: &[Pos], n: usize, exclude: &[Pos], rng: &mut impl Rng) -> Vec<Pos> {
    let mut pool: Vec<Pos> = cells
        .iter()
        .copied()
        .filter(|pos| !exclude.contains(pos))
        .collect();
    let mut picks = Vec::with_capacity(n.min(pool.len()));
    while picks.len() < n && !pool.is_empty() {
        let idx = rng.gen_range(0..pool.len());
        picks.push(pool.swap_remove(idx));
    }
    picks
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn row(len: usize) -> Vec<Pos> {
        (0..len).map(|x| Pos::new(x, 0)).collect()
    }

    #[test]
    fn picks_are_distinct_and_not_excluded() {
        let cells = row(20);
        let exclude = [Pos::new(0, 0), Pos::new(5, 0), Pos::new(19, 0)];
        for seed in 0..32 {
            let mut rng = StdRng::seed_from_u64(seed);
            let picks = pick_random(&cells, 8, &exclude, &mut rng);
            assert_eq!(picks.len(), 8);
            for (i, pos) in picks.iter().enumerate() {
                assert!(!exclude.contains(pos));
                assert!(cells.contains(pos));
                assert!(!picks[i + 1..].contains(pos));
            }
        }
    }

    #[test]
    fn under_fill_returns_what_is_left() {
        let cells = row(4);
        let mut rng = StdRng::seed_from_u64(7);
        let mut picks = pick_random(&cells, 6, &[Pos::new(1, 0)], &mut rng);
        picks.sort();
        assert_eq!(picks, vec![Pos::new(0, 0), Pos::new(2, 0), Pos::new(3, 0)]);
    }

    #[test]
    fn same_seed_same_placement() {
        let cells = row(50);
        let a = pick_random(&cells, 6, &[], &mut StdRng::seed_from_u64(42));
        let b = pick_random(&cells, 6, &[], &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }
}
