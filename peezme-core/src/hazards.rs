use std::collections::BTreeSet;

use peezme_types::{Game, GameError};
use rand::Rng;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TileKind {
    Normal,
    Barrier,
    Obstacle,
    Reward,
}

/// How obstacle and reward tiles change a play.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardEffects {
    pub obstacle_penalty: i32,
    pub reward_bonus: i32,
    pub reward_flips_direction: bool,
}

impl Default for HazardEffects {
    fn default() -> Self {
        Self {
            obstacle_penalty: 2,
            reward_bonus: 3,
            reward_flips_direction: true,
        }
    }
}

/// Number of tiles of each kind laid out on a fresh board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HazardCounts {
    pub barriers: usize,
    pub obstacles: usize,
    pub rewards: usize,
}

impl Default for HazardCounts {
    fn default() -> Self {
        Self {
            barriers: 3,
            obstacles: 4,
            rewards: 3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HazardMap {
    barriers: BTreeSet<u32>,
    obstacles: BTreeSet<u32>,
    rewards: BTreeSet<u32>,
}

impl HazardMap {
    /// Build a map from explicit sets. An index in more than one set is a
    /// configuration error; the lowest such index is reported.
    pub fn new(barriers: &[u32], obstacles: &[u32], rewards: &[u32]) -> Result<Self, GameError> {
        let map = Self {
            barriers: barriers.iter().copied().collect(),
            obstacles: obstacles.iter().copied().collect(),
            rewards: rewards.iter().copied().collect(),
        };

        let overlap = map
            .barriers
            .intersection(&map.obstacles)
            .chain(map.barriers.intersection(&map.rewards))
            .chain(map.obstacles.intersection(&map.rewards))
            .min()
            .copied();

        match overlap {
            Some(index) => Err(GameError::OverlappingHazard { index }),
            None => Ok(map),
        }
    }

    /// The map for a running game. Sets were checked when the game started.
    pub fn from_game(game: &Game) -> Self {
        Self {
            barriers: game.barriers.iter().copied().collect(),
            obstacles: game.obstacles.iter().copied().collect(),
            rewards: game.rewards.iter().copied().collect(),
        }
    }

    /// Scatter hazards over distinct board indices. Counts are trimmed when
    /// the board is too small to hold them all.
    pub fn generate<R: Rng + ?Sized>(board_size: u32, counts: HazardCounts, rng: &mut R) -> Self {
        let wanted = counts.barriers + counts.obstacles + counts.rewards;
        let amount = wanted.min(board_size as usize);
        let mut picked = rand::seq::index::sample(rng, board_size as usize, amount)
            .into_iter()
            .map(|i| i as u32);

        let barriers = picked.by_ref().take(counts.barriers).collect();
        let obstacles = picked.by_ref().take(counts.obstacles).collect();
        let rewards = picked.take(counts.rewards).collect();

        Self {
            barriers,
            obstacles,
            rewards,
        }
    }

    pub fn classify(&self, index: u32) -> TileKind {
        if self.barriers.contains(&index) {
            TileKind::Barrier
        } else if self.obstacles.contains(&index) {
            TileKind::Obstacle
        } else if self.rewards.contains(&index) {
            TileKind::Reward
        } else {
            TileKind::Normal
        }
    }

    pub fn barriers(&self) -> Vec<u32> {
        self.barriers.iter().copied().collect()
    }

    pub fn obstacles(&self) -> Vec<u32> {
        self.obstacles.iter().copied().collect()
    }

    pub fn rewards(&self) -> Vec<u32> {
        self.rewards.iter().copied().collect()
    }

    /// Write the sets onto a game record.
    pub fn install(&self, game: &mut Game) {
        game.barriers = self.barriers();
        game.obstacles = self.obstacles();
        game.rewards = self.rewards();
    }
}

/// Adjust a running score for one placed tile. Barriers never reach here
/// because plays touching them are rejected outright.
pub fn apply_effect(kind: TileKind, base_score: i32, effects: &HazardEffects) -> (i32, bool) {
    match kind {
        TileKind::Normal | TileKind::Barrier => (base_score, false),
        TileKind::Obstacle => (base_score - effects.obstacle_penalty, false),
        TileKind::Reward => (
            base_score + effects.reward_bonus,
            effects.reward_flips_direction,
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_classify() {
        let map = HazardMap::new(&[1, 2], &[5], &[9]).unwrap();
        assert_eq!(map.classify(1), TileKind::Barrier);
        assert_eq!(map.classify(5), TileKind::Obstacle);
        assert_eq!(map.classify(9), TileKind::Reward);
        assert_eq!(map.classify(0), TileKind::Normal);
    }

    #[test]
    fn test_overlap_rejected() {
        let err = HazardMap::new(&[4, 7], &[7], &[4]).unwrap_err();
        assert_eq!(err, GameError::OverlappingHazard { index: 4 });

        let err = HazardMap::new(&[], &[3], &[3]).unwrap_err();
        assert_eq!(err, GameError::OverlappingHazard { index: 3 });
    }

    #[test]
    fn test_apply_effect() {
        let effects = HazardEffects::default();
        assert_eq!(apply_effect(TileKind::Normal, 5, &effects), (5, false));
        assert_eq!(apply_effect(TileKind::Obstacle, 5, &effects), (3, false));
        assert_eq!(apply_effect(TileKind::Reward, 5, &effects), (8, true));

        let no_flip = HazardEffects {
            reward_flips_direction: false,
            ..effects
        };
        assert_eq!(apply_effect(TileKind::Reward, 5, &no_flip), (8, false));
    }

    #[test]
    fn test_generate_is_disjoint_and_on_board() {
        let mut rng = StdRng::seed_from_u64(3);
        let map = HazardMap::generate(25, HazardCounts::default(), &mut rng);

        let (b, o, r) = (map.barriers(), map.obstacles(), map.rewards());
        assert_eq!((b.len(), o.len(), r.len()), (3, 4, 3));
        assert!(HazardMap::new(&b, &o, &r).is_ok());
        assert!(b.iter().chain(&o).chain(&r).all(|&i| i < 25));
    }

    #[test]
    fn test_generate_on_tiny_board() {
        let mut rng = StdRng::seed_from_u64(3);
        let map = HazardMap::generate(4, HazardCounts::default(), &mut rng);
        assert_eq!(map.barriers().len(), 3);
        assert_eq!(map.obstacles().len(), 1);
        assert!(map.rewards().is_empty());
    }
}
