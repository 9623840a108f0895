use std::sync::Arc;

use chrono::{DateTime, Utc};
use peezme_core::{
    EventBus, GameEngine, GameRules, LeaveOutcome, TicketLifecycle, TimeoutSweep, WordValidator,
};
use peezme_persistence::{GameStore, TicketStore};
use peezme_types::{
    CloseReason, DeleteGameResponse, DeleteRequest, Game, GameError, GameOverReport, Match,
    PeezMeEvent, Play, Standing, TicketClosure, TicketStatus, WordSubmittedResponse,
};
use tracing::{debug, info, warn};

use crate::errors::{ApiError, ApiResult};
use crate::lobby_service::LobbyService;
use crate::locks::KeyedLocks;
use crate::state::Stores;

/// Owns every game record. Each mutation runs under that game's lock as
/// one load, validate, apply, save step.
pub struct GameManager {
    games: Arc<dyn GameStore>,
    tickets: Arc<dyn TicketStore>,
    game_locks: KeyedLocks,
    ticket_locks: Arc<KeyedLocks>,
    dictionary: Arc<WordValidator>,
    rules: GameRules,
    words_per_game: usize,
    lobby: Arc<LobbyService>,
    events: EventBus,
}

impl GameManager {
    pub fn new(
        stores: &Stores,
        ticket_locks: Arc<KeyedLocks>,
        dictionary: Arc<WordValidator>,
        rules: GameRules,
        words_per_game: usize,
        lobby: Arc<LobbyService>,
        events: EventBus,
    ) -> Self {
        Self {
            games: stores.games.clone(),
            tickets: stores.tickets.clone(),
            game_locks: KeyedLocks::new(),
            ticket_locks,
            dictionary,
            rules,
            words_per_game,
            lobby,
            events,
        }
    }

    pub fn rules(&self) -> &GameRules {
        &self.rules
    }

    /// Seed a game for a formed match. Nothing is stored yet.
    pub fn new_game(&self, game_match: &Match, now: DateTime<Utc>) -> ApiResult<Game> {
        let engine = GameEngine::new(&self.rules, self.dictionary.as_ref());
        let mut rng = rand::thread_rng();
        let words = self
            .dictionary
            .random_words(self.words_per_game, &mut rng)
            .map_err(ApiError::Internal)?;
        Ok(engine.start_game(game_match, words, None, now, &mut rng)?)
    }

    pub async fn save_new_game(&self, game: &Game) -> ApiResult<()> {
        self.games.save_game(game).await?;
        info!(game_id = %game.game_id, "Game stored");
        Ok(())
    }

    pub async fn get_game(&self, game_id: &str) -> ApiResult<Game> {
        self.games
            .get_game(game_id)
            .await?
            .ok_or_else(|| ApiError::game_not_found(game_id))
    }

    /// Apply a play by `play.user_id`. A word missing from the dictionary is
    /// not an error: the answer carries `wordIsGood = false` and the game is
    /// left as it was.
    pub async fn submit_play(&self, play: Play) -> ApiResult<WordSubmittedResponse> {
        let _guard = self.game_locks.acquire(&play.game_id).await;
        let mut game = self.get_game(&play.game_id).await?;
        let user_id = play.user_id.clone();

        let result = {
            let engine = GameEngine::new(&self.rules, self.dictionary.as_ref());
            let mut rng = rand::thread_rng();
            engine.submit_play(&mut game, &user_id, play.clone(), Utc::now(), &mut rng)
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(GameError::InvalidWord { word }) => {
                debug!(game_id = %game.game_id, user_id = %user_id, word = %word, "Word rejected");
                return Ok(WordSubmittedResponse::rejected(&game, &play));
            }
            Err(e) => {
                debug!(game_id = %game.game_id, user_id = %user_id, "Play refused: {}", e);
                return Err(e.into());
            }
        };

        self.games.save_game(&game).await?;
        self.events.publish(PeezMeEvent::WordSubmitted {
            data: outcome.response.clone(),
            delta: game.clone(),
        });

        if let Some(standings) = outcome.standings {
            self.finish(&game, standings).await?;
        }
        Ok(outcome.response)
    }

    /// The requesting participant leaves the game.
    pub async fn delete_game(&self, request: DeleteRequest) -> ApiResult<DeleteGameResponse> {
        let _guard = self.game_locks.acquire(&request.game_id).await;
        let mut game = self.get_game(&request.game_id).await?;

        let already_over = game.is_over();
        let engine = GameEngine::new(&self.rules, self.dictionary.as_ref());
        let outcome = engine.leave(&mut game, &request.user_id, Utc::now())?;
        self.release_from_room(&game.game_id, &request.user_id).await;

        match outcome {
            LeaveOutcome::Continued { next_turn } => {
                self.games.save_game(&game).await?;
                self.events.publish(PeezMeEvent::PlayerLeft {
                    data: request.clone(),
                    delta: game.clone(),
                });
                Ok(DeleteGameResponse {
                    game_id: game.game_id,
                    game_over: false,
                    player_turn_id: Some(next_turn),
                })
            }
            LeaveOutcome::GameOver { standings } => {
                self.games.delete_game(&game.game_id).await?;
                info!(game_id = %game.game_id, user_id = %request.user_id, "Game removed");
                self.events.publish(PeezMeEvent::PlayerLeft {
                    data: request.clone(),
                    delta: game.clone(),
                });
                if !already_over {
                    self.finish(&game, standings).await?;
                }
                Ok(DeleteGameResponse {
                    game_id: game.game_id,
                    game_over: true,
                    player_turn_id: None,
                })
            }
        }
    }

    /// Pass the turn in every game whose round clock ran out. Games busy
    /// with a play are left for the next sweep.
    pub async fn skip_expired_turns(&self, now: DateTime<Utc>) -> ApiResult<usize> {
        let active = self.games.active_games().await?;
        let stalled = TimeoutSweep::at(now).stalled_games(active.iter());

        let engine = GameEngine::new(&self.rules, self.dictionary.as_ref());
        let mut skipped = 0;
        for game_id in stalled {
            let Some(_guard) = self.game_locks.try_acquire(&game_id) else {
                debug!(game_id = %game_id, "Game busy, skipping sweep");
                continue;
            };
            let Some(mut game) = self.games.get_game(&game_id).await? else {
                continue;
            };
            if engine.skip_expired_turn(&mut game, now) {
                self.games.save_game(&game).await?;
                skipped += 1;
            }
        }
        self.game_locks.prune();
        Ok(skipped)
    }

    async fn finish(&self, game: &Game, standings: Vec<Standing>) -> ApiResult<()> {
        info!(
            game_id = %game.game_id,
            winner = standings.first().map(|s| s.user_id.as_str()).unwrap_or(""),
            "Game over"
        );
        self.events.publish(PeezMeEvent::GameOver {
            data: GameOverReport {
                game_id: game.game_id.clone(),
                standings,
            },
            delta: game.clone(),
        });
        self.complete_ticket(&game.game_id).await
    }

    /// End the Active ticket that created this game.
    async fn complete_ticket(&self, game_id: &str) -> ApiResult<()> {
        let Some(found) = self.tickets.find_ticket_by_game(game_id).await? else {
            debug!(game_id = %game_id, "No ticket bound to game");
            return Ok(());
        };

        let _guard = self.ticket_locks.acquire(&found.id).await;
        let Some(mut ticket) = self.tickets.get_ticket(&found.id).await? else {
            return Ok(());
        };
        if ticket.status != TicketStatus::Active {
            return Ok(());
        }
        if let Err(e) = TicketLifecycle::complete(&mut ticket) {
            warn!(ticket_id = %ticket.id, "Could not complete ticket: {}", e);
            return Ok(());
        }
        self.tickets.save_ticket(&ticket).await?;
        self.events.publish(PeezMeEvent::TicketClosed {
            data: TicketClosure {
                ticket_id: ticket.id.clone(),
                reason: CloseReason::Completed,
            },
            delta: ticket,
        });
        Ok(())
    }

    async fn release_from_room(&self, game_id: &str, user_id: &str) {
        match self.tickets.find_ticket_by_game(game_id).await {
            Ok(Some(ticket)) => {
                if let Some(room_id) = &ticket.room_id {
                    self.lobby.release_player(room_id, user_id).await;
                }
            }
            Ok(None) => {}
            Err(e) => warn!(game_id = %game_id, "Ticket lookup failed: {:#}", e),
        }
    }
}
