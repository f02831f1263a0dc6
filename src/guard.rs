use rand::Rng;

use crate::components::{Dir, Pos};
use crate::level::Map;

/// Chance of taking the single best step toward the player.
const PURSUIT_BIAS: f64 = 0.7;
/// Otherwise the guard picks uniformly among this many best steps.
const WANDER_SPREAD: usize = 3;
const NEIGHBOR_ORDER: [Dir; 4] = [Dir::Right, Dir::Left, Dir::Down, Dir::Up];

/// Legal steps for a guard, nearest to `target` first. Ties keep
/// `NEIGHBOR_ORDER`.
pub fn candidates(map: &Map, guard: Pos, target: Pos) -> Vec<Pos> {
    let mut options: Vec<Pos> = NEIGHBOR_ORDER
        .iter()
        .filter_map(|dir| map.grid().neighbor(guard, *dir))
        .filter(|next| map.grid().is_walkable(*next) && map.region().contains(*next))
        .collect();
    options.sort_by_key(|next| next.manhattan(target));
    options
}

pub fn next_guard_position(map: &Map, guard: Pos, target: Pos, rng: &mut impl Rng) -> Option<Pos> {
    let options = candidates(map, guard, target);
    if options.is_empty() {
        return None;
    }
    if rng.gen::<f64>() < PURSUIT_BIAS {
        return Some(options[0]);
    }
    let spread = WANDER_SPREAD.min(options.len());
    Some(options[rng.gen_range(0..spread)])
}

/// Moves every guard one step toward `target`. Guards with nowhere to go
/// stay put. Returns whether any guard moved.
pub fn advance_guards(map: &Map, guards: &mut [Pos], target: Pos, rng: &mut impl Rng) -> bool {
    let mut moved = false;
    for guard in guards.iter_mut() {
        if let Some(next) = next_guard_position(map, *guard, target, rng) {
            moved |= next != *guard;
            *guard = next;
        }
    }
    moved
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn open_room() -> Map {
        Map::parse(&[
            "#######", //
            "#.....#", //
            "#.....#", //
            "#.....#", //
            "#....E#", //
            "#######",
        ])
        .unwrap()
    }

    #[test]
    fn candidates_sorted_by_distance() {
        let map = open_room();
        let options = candidates(&map, Pos::new(3, 2), Pos::new(5, 2));
        assert_eq!(
            options,
            vec![
                Pos::new(4, 2),
                Pos::new(2, 2),
                Pos::new(3, 3),
                Pos::new(3, 1)
            ]
        );
    }

    #[test]
    fn pursuit_is_biased_but_not_deterministic() {
        let map = open_room();
        let mut rng = StdRng::seed_from_u64(11);
        let mut nearest = 0;
        let mut others = 0;
        for _ in 0..2000 {
            let next = next_guard_position(&map, Pos::new(3, 2), Pos::new(5, 2), &mut rng)
                .expect("open room has moves");
            assert_ne!(next, Pos::new(3, 1), "only the three nearest are eligible");
            if next == Pos::new(4, 2) {
                nearest += 1;
            } else {
                others += 1;
            }
        }
        assert!(nearest > 1400, "nearest chosen {nearest} times");
        assert!(others > 200, "wandered {others} times");
    }

    #[test]
    fn guard_outside_region_is_stuck() {
        let map = Map::parse(&[
            "#####", //
            "#.E.#", //
            "#####", //
            "#..##", //
            "#####",
        ])
        .unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut guards = [Pos::new(1, 3)];
        assert!(candidates(&map, guards[0], Pos::new(1, 1)).is_empty());
        assert!(!advance_guards(&map, &mut guards, Pos::new(1, 1), &mut rng));
        assert_eq!(guards, [Pos::new(1, 3)]);
    }

    #[test]
    fn guards_stay_in_region() {
        let map = Map::tunnels().unwrap();
        let mut rng = StdRng::seed_from_u64(5);
        let mut guards = [map.exit(), map.start()];
        for _ in 0..500 {
            advance_guards(&map, &mut guards, Pos::new(12, 7), &mut rng);
            for guard in guards {
                assert!(map.region().contains(guard));
            }
        }
    }
}
