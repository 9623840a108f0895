use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use peezme_core::{EventBus, Invitation, ResponseOutcome, TicketLifecycle, TimeoutSweep};
use peezme_persistence::TicketStore;
use peezme_types::{
    CancelRequest, CloseReason, Game, InviteRequest, InviteResponse, Match, MatchTicketRequest,
    PeezMeEvent, Pool, Ticket, TicketClosure, TicketError, TicketResponse, TicketStatus,
};
use tracing::{debug, error, info, warn};

use crate::errors::{ApiError, ApiResult};
use crate::game_manager::GameManager;
use crate::lobby_service::LobbyService;
use crate::locks::KeyedLocks;
use crate::matchmaking::{MatchmakingQueue, QueueStats};

/// Lock retry policy for `respond`.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub backoff: Duration,
}

/// Owns every ticket record. Mutations hold the ticket's lock from load
/// to save, so a ticket is never modified by two requests at once.
pub struct TicketManager {
    tickets: Arc<dyn TicketStore>,
    locks: Arc<KeyedLocks>,
    queue: MatchmakingQueue,
    games: Arc<GameManager>,
    lobby: Arc<LobbyService>,
    events: EventBus,
    ttl: chrono::Duration,
    retry: RetryPolicy,
}

impl TicketManager {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tickets: Arc<dyn TicketStore>,
        locks: Arc<KeyedLocks>,
        queue: MatchmakingQueue,
        games: Arc<GameManager>,
        lobby: Arc<LobbyService>,
        events: EventBus,
        ttl: chrono::Duration,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            tickets,
            locks,
            queue,
            games,
            lobby,
            events,
            ttl,
            retry,
        }
    }

    pub async fn invite(&self, request: InviteRequest) -> ApiResult<InviteResponse> {
        let invitation = Invitation {
            created_by: request.created_by,
            invitees: request.invitees,
            capacity: request.capacity,
            game_type: request.game_type,
            room_type: request.room_type,
            room_id: request.room_id,
        };
        let mut ticket = TicketLifecycle::invite(invitation, self.ttl, Utc::now())?;
        // Invitations go out as the TicketCreated event.
        ticket.invitation_sent = true;
        self.tickets.save_ticket(&ticket).await?;

        let response = InviteResponse {
            message: format!("Invited {} players", ticket.invitees.len()),
            ticket: ticket.clone(),
        };
        self.events.publish(PeezMeEvent::TicketCreated {
            data: response.clone(),
            delta: ticket,
        });
        Ok(response)
    }

    /// Put one user in the pool for a game and room type. When the pool
    /// fills, the group is launched straight away.
    pub async fn open_match_ticket(&self, request: MatchTicketRequest) -> ApiResult<InviteResponse> {
        let now = Utc::now();
        let ticket = TicketLifecycle::open_match_ticket(
            request.user,
            request.game_type,
            request.room_type,
            self.ttl,
            now,
        );
        let ticket_id = ticket.id.clone();
        let pool_name = ticket.pool_name();

        let guard = self.locks.acquire(&ticket_id).await;
        let (mut position, draw) = self.queue.add_ticket(ticket.clone(), now).await?;
        self.tickets.save_ticket(&ticket).await?;
        self.end_lapsed(draw.expired, now).await?;
        if draw.formed.is_none() {
            position = self.queue.get_queue_position(&ticket_id).await.unwrap_or(position);
        }
        let created = InviteResponse {
            message: format!("Waiting in pool {} at position {}", pool_name, position),
            ticket: ticket.clone(),
        };
        self.events.publish(PeezMeEvent::TicketCreated {
            data: created.clone(),
            delta: ticket,
        });

        let Some((game_match, tickets)) = draw.formed else {
            return Ok(created);
        };
        if let Err(e) = self.launch_pool_match(game_match, tickets, &ticket_id, now).await {
            warn!(ticket_id = %ticket_id, "Matched but not launched: {}", e);
        }
        drop(guard);

        let ticket = self.load(&ticket_id).await?;
        let message = match (&ticket.game_id, self.queue.get_queue_position(&ticket_id).await) {
            (Some(game_id), _) => format!("Matched into game {}", game_id),
            (None, Some(position)) => {
                format!("Waiting in pool {} at position {}", pool_name, position)
            }
            (None, None) => format!("Matched in pool {}", pool_name),
        };
        Ok(InviteResponse { message, ticket })
    }

    /// Record an invitee's answer. Waits for the ticket lock with backoff
    /// and fails with `TicketBusy` when it stays taken.
    pub async fn respond(&self, response: TicketResponse) -> ApiResult<Ticket> {
        let ticket_id = response.ticket_id.clone();
        let _guard = self
            .locks
            .acquire_with_backoff(&ticket_id, self.retry.attempts, self.retry.backoff)
            .await
            .ok_or_else(|| TicketError::TicketBusy {
                ticket_id: ticket_id.clone(),
            })?;

        let mut ticket = self.load(&ticket_id).await?;
        let before = ticket.status;
        let now = Utc::now();

        let outcome =
            match TicketLifecycle::respond(&mut ticket, &response.user_id, response.accepted, now) {
                Ok(outcome) => outcome,
                Err(e) => {
                    if ticket.status != before {
                        self.close(&ticket, CloseReason::Expired).await?;
                    }
                    return Err(e.into());
                }
            };

        match outcome {
            ResponseOutcome::Recorded => {
                self.tickets.save_ticket(&ticket).await?;
                self.publish_update(&response, &ticket);
            }
            ResponseOutcome::Closed(reason) => {
                self.publish_update(&response, &ticket);
                self.close(&ticket, reason).await?;
            }
            ResponseOutcome::MatchFormed(game_match) => {
                // Nothing is saved unless the match gets a room and a game.
                let mut group = vec![ticket];
                self.launch(&game_match, &mut group).await?;
                let ticket = group.remove(0);
                self.tickets.save_ticket(&ticket).await?;
                self.publish_update(&response, &ticket);
                self.publish_match(&game_match, &ticket);
                return Ok(ticket);
            }
        }
        Ok(ticket)
    }

    pub async fn cancel(&self, request: CancelRequest) -> ApiResult<Ticket> {
        let _guard = self
            .locks
            .acquire_with_backoff(&request.ticket_id, self.retry.attempts, self.retry.backoff)
            .await
            .ok_or_else(|| TicketError::TicketBusy {
                ticket_id: request.ticket_id.clone(),
            })?;

        let mut ticket = self.load(&request.ticket_id).await?;
        TicketLifecycle::cancel(&mut ticket, &request.user_id)?;
        if ticket.is_match_ticket {
            self.queue.remove_ticket(&ticket.id).await;
        }
        self.close(&ticket, CloseReason::Cancelled).await?;
        Ok(ticket)
    }

    /// Current record; `isBeingProcessed` reflects whether a mutation holds it now.
    /// A ticket found past its deadline is ended on the spot, or reported as
    /// ended while another request holds it.
    pub async fn get_ticket(&self, ticket_id: &str) -> ApiResult<Ticket> {
        let now = Utc::now();
        let Some(_guard) = self.locks.try_acquire(ticket_id) else {
            let mut ticket = self.load(ticket_id).await?;
            if ticket.is_expired(now) && ticket.status < TicketStatus::Ready {
                ticket.status = TicketStatus::Ended;
                ticket.is_active = false;
            }
            ticket.is_being_processed = true;
            return Ok(ticket);
        };

        let mut ticket = self.load(ticket_id).await?;
        if TicketLifecycle::expire(&mut ticket, now) {
            if ticket.is_match_ticket {
                self.queue.remove_ticket(&ticket.id).await;
            }
            self.close(&ticket, CloseReason::Expired).await?;
        }
        ticket.is_being_processed = false;
        Ok(ticket)
    }

    pub async fn queue_stats(&self) -> Vec<QueueStats> {
        self.queue.get_queue_stats(Utc::now()).await
    }

    /// End every open ticket past its deadline. Returns
    /// (invitation tickets expired, pooled tickets expired).
    pub async fn expire_due(&self, now: DateTime<Utc>) -> ApiResult<(usize, usize)> {
        let lapsed = self.queue.cleanup_expired_tickets(now).await;
        let mut pooled = self.end_lapsed(lapsed, now).await?;

        // The store also holds match tickets the pool no longer knows
        // about, such as those left over from before a restart.
        let open = self.tickets.open_tickets().await?;
        let due = TimeoutSweep::at(now).due_tickets(open.iter());
        let mut expired = 0;
        for ticket_id in due {
            let Some(_guard) = self.locks.try_acquire(&ticket_id) else {
                debug!(ticket_id = %ticket_id, "Ticket busy, skipping sweep");
                continue;
            };
            let Some(mut ticket) = self.tickets.get_ticket(&ticket_id).await? else {
                continue;
            };
            if TicketLifecycle::expire(&mut ticket, now) {
                if ticket.is_match_ticket {
                    self.queue.remove_ticket(&ticket.id).await;
                    pooled += 1;
                } else {
                    expired += 1;
                }
                self.close(&ticket, CloseReason::Expired).await?;
            }
        }
        self.locks.prune();
        Ok((expired, pooled))
    }

    /// Put every staged match ticket in the store back in its pool, oldest
    /// first. Run once at startup; returns how many were queued.
    pub async fn restore_pools(&self, now: DateTime<Utc>) -> ApiResult<usize> {
        let mut waiting: Vec<Ticket> = self
            .tickets
            .open_tickets()
            .await?
            .into_iter()
            .filter(|t| t.is_match_ticket && t.status == TicketStatus::Staged && !t.is_expired(now))
            .collect();
        waiting.sort_by_key(|t| t.created);

        let mut restored = 0;
        for ticket in waiting {
            let ticket_id = ticket.id.clone();
            match self.queue.restore_ticket(ticket).await {
                Ok(_) => restored += 1,
                Err(e) => warn!(ticket_id = %ticket_id, "Could not restore pooled ticket: {}", e),
            }
        }
        if restored > 0 {
            info!(restored, "Restored pooled tickets");
        }
        Ok(restored)
    }

    /// End tickets that left a pool because their deadline passed.
    /// They are out of the pool already, so wait for each lock rather than skip.
    async fn end_lapsed(&self, lapsed: Vec<Ticket>, now: DateTime<Utc>) -> ApiResult<usize> {
        let mut ended = 0;
        for dropped in lapsed {
            let _guard = self.locks.acquire(&dropped.id).await;
            let Some(mut ticket) = self.tickets.get_ticket(&dropped.id).await? else {
                continue;
            };
            if TicketLifecycle::expire(&mut ticket, now) {
                self.close(&ticket, CloseReason::Expired).await?;
                ended += 1;
            }
        }
        Ok(ended)
    }

    /// Seat a match and start its game, then bind every ticket to both.
    /// Tickets are only mutated once the room and game exist.
    async fn launch(&self, game_match: &Match, tickets: &mut [Ticket]) -> ApiResult<Game> {
        let game = self.games.new_game(game_match, Utc::now())?;
        let seated_before = match &game_match.room {
            Some(room_id) => self.lobby.room(room_id).await.map(|r| r.users).unwrap_or_default(),
            None => Vec::new(),
        };
        let room = self.lobby.place_match(game_match).await?;
        if let Err(e) = self.games.save_new_game(&game).await {
            // Undo the seating so the room does not list players of a game that never existed.
            for player in &game_match.players {
                if !seated_before.iter().any(|u| u.id == player.id) {
                    self.lobby.release_player(&room.id, &player.id).await;
                }
            }
            return Err(e);
        }

        for ticket in tickets.iter_mut() {
            TicketLifecycle::activate(ticket, game.game_id.clone(), room.id.clone())?;
        }
        info!(
            match_id = %game_match.id,
            game_id = %game.game_id,
            room_id = %room.id,
            tickets = tickets.len(),
            "Match launched"
        );
        Ok(game)
    }

    /// Launch a pool group. The caller already holds the lock of `held`;
    /// every other grouped ticket is locked and reloaded here. When a member
    /// was cancelled or ended after the group was drawn, the rest go back to
    /// the head of the pool and the pool is grouped again.
    async fn launch_pool_match(
        &self,
        mut game_match: Match,
        mut tickets: Vec<Ticket>,
        held: &str,
        now: DateTime<Utc>,
    ) -> ApiResult<()> {
        loop {
            let mut guards = Vec::new();
            for ticket in tickets.iter().filter(|t| t.id != held) {
                guards.push(self.locks.acquire(&ticket.id).await);
            }

            let drawn = tickets.len();
            let mut live = Vec::with_capacity(drawn);
            let mut staged = Vec::new();
            for ticket in tickets {
                match self.tickets.get_ticket(&ticket.id).await? {
                    Some(stored) if stored.status == TicketStatus::Staged => {
                        staged.push(stored);
                        live.push(ticket);
                    }
                    stored => debug!(
                        ticket_id = %ticket.id,
                        status = ?stored.map(|t| t.status),
                        "Ticket left the group before launch"
                    ),
                }
            }
            if staged.len() == drawn {
                return self.launch_group(&game_match, live).await;
            }

            warn!(
                match_id = %game_match.id,
                kept = staged.len(),
                "Pool group lost players before launch, regrouping"
            );
            let pool_name = Pool::name_for(&game_match.game_type, game_match.room_type);
            self.queue.requeue(staged).await;
            drop(guards);

            let draw = self.queue.try_create_match(&pool_name, now).await;
            self.end_lapsed(draw.expired, now).await?;
            let Some((next_match, next_tickets)) = draw.formed else {
                return Ok(());
            };
            game_match = next_match;
            tickets = next_tickets;
        }
    }

    async fn launch_group(&self, game_match: &Match, mut tickets: Vec<Ticket>) -> ApiResult<()> {
        if let Err(e) = self.launch(game_match, &mut tickets).await {
            error!(match_id = %game_match.id, "Pool match could not launch: {}", e);
            for ticket in &tickets {
                self.tickets.save_ticket(ticket).await?;
            }
            return Err(e);
        }
        for ticket in &tickets {
            self.tickets.save_ticket(ticket).await?;
            self.publish_match(game_match, ticket);
        }
        Ok(())
    }

    async fn load(&self, ticket_id: &str) -> ApiResult<Ticket> {
        self.tickets
            .get_ticket(ticket_id)
            .await?
            .ok_or_else(|| ApiError::ticket_not_found(ticket_id))
    }

    async fn close(&self, ticket: &Ticket, reason: CloseReason) -> ApiResult<()> {
        self.tickets.save_ticket(ticket).await?;
        info!(ticket_id = %ticket.id, ?reason, "Ticket closed");
        self.events.publish(PeezMeEvent::TicketClosed {
            data: TicketClosure {
                ticket_id: ticket.id.clone(),
                reason,
            },
            delta: ticket.clone(),
        });
        Ok(())
    }

    fn publish_update(&self, response: &TicketResponse, ticket: &Ticket) {
        self.events.publish(PeezMeEvent::TicketUpdated {
            data: response.clone(),
            delta: ticket.clone(),
        });
    }

    fn publish_match(&self, game_match: &Match, ticket: &Ticket) {
        self.events.publish(PeezMeEvent::MatchFormed {
            data: game_match.clone(),
            delta: ticket.clone(),
        });
    }
}
