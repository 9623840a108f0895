use std::collections::BTreeMap;

use chrono::{DateTime, Duration, Utc};
use peezme_types::{
    CloseReason, GameId, Match, Privacy, RoomId, Ticket, TicketError, TicketStatus, User,
};
use tracing::{debug, info};
use uuid::Uuid;

/// What a single response did to the ticket.
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    /// Recorded without completing or closing the ticket.
    Recorded,
    /// The acceptance filled the ticket; the match was formed with it.
    MatchFormed(Match),
    /// The rejection left too few pending invitees to fill the ticket.
    Closed(CloseReason),
}

/// Parameters for a new invitation ticket.
#[derive(Debug, Clone)]
pub struct Invitation {
    pub created_by: User,
    pub invitees: Vec<User>,
    pub capacity: u32,
    pub game_type: String,
    pub room_type: Privacy,
    pub room_id: Option<RoomId>,
}

/// State machine for one ticket. Every function takes the ticket by
/// `&mut` and either fully applies its change or returns an error with
/// the ticket untouched.
pub struct TicketLifecycle;

impl TicketLifecycle {
    pub fn invite(
        invitation: Invitation,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<Ticket, TicketError> {
        let mut profiles = BTreeMap::new();
        let mut invitees = Vec::new();
        for user in invitation.invitees {
            if !profiles.contains_key(&user.id) {
                invitees.push(user.id.clone());
                profiles.insert(user.id.clone(), user);
            }
        }

        if invitation.capacity == 0 || invitation.capacity as usize > invitees.len() {
            return Err(TicketError::InvalidCapacity {
                capacity: invitation.capacity,
                invitees: invitees.len() as u32,
            });
        }

        profiles
            .entry(invitation.created_by.id.clone())
            .or_insert_with(|| invitation.created_by.clone());

        let ticket = Ticket {
            id: Uuid::new_v4().to_string(),
            created_by: invitation.created_by.id,
            game_type: invitation.game_type,
            room_type: invitation.room_type,
            is_active: true,
            room_id: invitation.room_id,
            is_match_ticket: false,
            created: now,
            expires: now + ttl,
            invitees,
            accepted_by: Vec::new(),
            rejected_by: Vec::new(),
            is_being_processed: false,
            invitation_sent: false,
            status: TicketStatus::New,
            game_id: None,
            capacity: invitation.capacity,
            profiles,
        };

        info!(
            ticket_id = %ticket.id,
            created_by = %ticket.created_by,
            capacity = ticket.capacity,
            invitees = ticket.invitees.len(),
            "Ticket created"
        );
        Ok(ticket)
    }

    /// Open matchmaking ticket for one user. The user counts as their own
    /// acceptance; the ticket waits in a pool until a group forms.
    pub fn open_match_ticket(
        user: User,
        game_type: String,
        room_type: Privacy,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Ticket {
        Ticket {
            id: Uuid::new_v4().to_string(),
            created_by: user.id.clone(),
            game_type,
            room_type,
            is_active: true,
            room_id: None,
            is_match_ticket: true,
            created: now,
            expires: now + ttl,
            invitees: vec![user.id.clone()],
            accepted_by: vec![user.id.clone()],
            rejected_by: Vec::new(),
            is_being_processed: false,
            invitation_sent: true,
            status: TicketStatus::Staged,
            game_id: None,
            capacity: 1,
            profiles: BTreeMap::from([(user.id.clone(), user)]),
        }
    }

    /// Record an accept or reject. The caller must hold the ticket's
    /// exclusive lock for the whole call.
    pub fn respond(
        ticket: &mut Ticket,
        user_id: &str,
        accept: bool,
        now: DateTime<Utc>,
    ) -> Result<ResponseOutcome, TicketError> {
        if Self::expire(ticket, now) {
            return Err(TicketError::TicketExpired {
                ticket_id: ticket.id.clone(),
            });
        }
        if ticket.status == TicketStatus::Ended {
            return Err(TicketError::TicketClosed {
                ticket_id: ticket.id.clone(),
            });
        }
        if !ticket.is_invited(user_id) {
            return Err(TicketError::NotInvited {
                user_id: user_id.to_string(),
            });
        }
        if ticket.has_responded(user_id) {
            return Err(TicketError::AlreadyResponded {
                user_id: user_id.to_string(),
            });
        }

        if accept {
            if ticket.is_full() {
                return Err(TicketError::CapacityExceeded {
                    ticket_id: ticket.id.clone(),
                });
            }
            ticket.accepted_by.push(user_id.to_string());
            debug!(ticket_id = %ticket.id, user_id = %user_id, "Invite accepted");

            if ticket.is_full() {
                Self::advance(ticket, TicketStatus::Ready)?;
                let game_match = Self::form_match(ticket, now);
                info!(
                    ticket_id = %ticket.id,
                    match_id = %game_match.id,
                    players = game_match.players.len(),
                    "Ticket ready, match formed"
                );
                return Ok(ResponseOutcome::MatchFormed(game_match));
            }
        } else {
            ticket.rejected_by.push(user_id.to_string());
            debug!(ticket_id = %ticket.id, user_id = %user_id, "Invite rejected");

            if ticket.status < TicketStatus::Ready && !ticket.can_still_fill() {
                Self::close(ticket);
                info!(ticket_id = %ticket.id, "Ticket can no longer fill, ended");
                return Ok(ResponseOutcome::Closed(CloseReason::Unfillable));
            }
        }

        if ticket.status == TicketStatus::New {
            Self::advance(ticket, TicketStatus::Staged)?;
        }
        Ok(ResponseOutcome::Recorded)
    }

    /// End an unfilled ticket whose deadline passed. Returns whether this
    /// call ended it; calling again is a no-op.
    pub fn expire(ticket: &mut Ticket, now: DateTime<Utc>) -> bool {
        if ticket.status >= TicketStatus::Ready || !ticket.is_expired(now) {
            return false;
        }
        Self::close(ticket);
        info!(ticket_id = %ticket.id, "Ticket expired");
        true
    }

    pub fn cancel(ticket: &mut Ticket, by_user_id: &str) -> Result<(), TicketError> {
        if ticket.status == TicketStatus::Ended {
            return Err(TicketError::TicketClosed {
                ticket_id: ticket.id.clone(),
            });
        }
        if ticket.created_by != by_user_id {
            return Err(TicketError::NotTicketCreator {
                user_id: by_user_id.to_string(),
            });
        }
        if ticket.status > TicketStatus::Staged {
            return Err(TicketError::InvalidTransition {
                from: ticket.status,
                to: TicketStatus::Ended,
            });
        }
        Self::close(ticket);
        info!(ticket_id = %ticket.id, "Ticket cancelled");
        Ok(())
    }

    /// Bind a ready ticket to the game and room its match was placed in.
    pub fn activate(
        ticket: &mut Ticket,
        game_id: GameId,
        room_id: RoomId,
    ) -> Result<(), TicketError> {
        if ticket.status != TicketStatus::Ready {
            return Err(TicketError::InvalidTransition {
                from: ticket.status,
                to: TicketStatus::Active,
            });
        }
        Self::advance(ticket, TicketStatus::Active)?;
        info!(ticket_id = %ticket.id, game_id = %game_id, room_id = %room_id, "Ticket active");
        ticket.game_id = Some(game_id);
        ticket.room_id = Some(room_id);
        Ok(())
    }

    /// End an active ticket once its game is over.
    pub fn complete(ticket: &mut Ticket) -> Result<(), TicketError> {
        if ticket.status != TicketStatus::Active {
            return Err(TicketError::InvalidTransition {
                from: ticket.status,
                to: TicketStatus::Ended,
            });
        }
        Self::close(ticket);
        info!(ticket_id = %ticket.id, "Ticket completed");
        Ok(())
    }

    /// Promote a pooled ticket to Ready as part of a shared match.
    pub fn fill_from_pool(ticket: &mut Ticket, game_match: &Match) -> Result<(), TicketError> {
        Self::advance(ticket, TicketStatus::Ready)?;
        ticket.room_id = game_match.room.clone();
        for player in &game_match.players {
            ticket
                .profiles
                .entry(player.id.clone())
                .or_insert_with(|| player.clone());
        }
        Ok(())
    }

    /// Build the match for a ticket's accepted players, in acceptance order.
    pub fn form_match(ticket: &Ticket, now: DateTime<Utc>) -> Match {
        Match {
            id: Uuid::new_v4().to_string(),
            ticket_id: ticket.id.clone(),
            players: ticket
                .accepted_by
                .iter()
                .map(|id| ticket.profile(id))
                .collect(),
            room: ticket.room_id.clone(),
            created: now,
            game_type: ticket.game_type.clone(),
            room_type: ticket.room_type,
        }
    }

    fn advance(ticket: &mut Ticket, next: TicketStatus) -> Result<(), TicketError> {
        if !ticket.status.can_advance_to(next) {
            return Err(TicketError::InvalidTransition {
                from: ticket.status,
                to: next,
            });
        }
        ticket.status = next;
        Ok(())
    }

    fn close(ticket: &mut Ticket) {
        ticket.status = TicketStatus::Ended;
        ticket.is_active = false;
    }
}
