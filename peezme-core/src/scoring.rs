use peezme_types::{Game, Standing};

use crate::hazards::{HazardEffects, TileKind, apply_effect};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayScore {
    pub total: i32,
    pub flips_direction: bool,
}

pub struct ScoringEngine;

impl ScoringEngine {
    pub const MISSING_LETTER_BONUS: i32 = 3;
    pub const SOLVED_WORD_BONUS: i32 = 5;

    /// Score a validated play. `tiles` holds the classification of each
    /// placed tile in placement order.
    pub fn score_play(
        word: &str,
        target: &str,
        missing_letter: Option<char>,
        tiles: &[TileKind],
        effects: &HazardEffects,
    ) -> PlayScore {
        let word = word.to_lowercase();
        let target = target.to_lowercase();

        let mut score = tiles.len() as i32;
        let mut flips_direction = false;
        for &kind in tiles {
            let (adjusted, flip) = apply_effect(kind, score, effects);
            score = adjusted;
            flips_direction |= flip;
        }

        if let Some(letter) = missing_letter {
            if word.contains(letter.to_ascii_lowercase()) {
                score += Self::MISSING_LETTER_BONUS;
            }
        }
        if word == target {
            score += Self::SOLVED_WORD_BONUS;
        }

        PlayScore {
            total: score.max(0),
            flips_direction,
        }
    }

    /// Final ranking: score descending, then whoever led first, then seat.
    pub fn standings(game: &Game) -> Vec<Standing> {
        let mut standings: Vec<(usize, Standing)> = game
            .players
            .iter()
            .enumerate()
            .map(|(seat, player)| {
                (
                    seat,
                    Standing {
                        user_id: player.id.clone(),
                        name: player.name.clone(),
                        score: game.score_of(&player.id),
                        leader_since: game.leader_since.get(&player.id).copied(),
                    },
                )
            })
            .collect();

        standings.sort_by(|(seat_a, a), (seat_b, b)| {
            b.score
                .cmp(&a.score)
                .then_with(|| match (a.leader_since, b.leader_since) {
                    (Some(x), Some(y)) => x.cmp(&y),
                    (Some(_), None) => std::cmp::Ordering::Less,
                    (None, Some(_)) => std::cmp::Ordering::Greater,
                    (None, None) => std::cmp::Ordering::Equal,
                })
                .then_with(|| seat_a.cmp(seat_b))
        });

        standings.into_iter().map(|(_, s)| s).collect()
    }
}
