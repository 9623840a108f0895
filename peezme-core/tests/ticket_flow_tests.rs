mod common;

use chrono::Duration;
use common::*;
use peezme_core::{
    EventBus, GameEngine, Invitation, LobbyDirectory, PoolRegistry, ResponseOutcome,
    TicketLifecycle,
};
use peezme_types::{
    Match, PeezMeEvent, Privacy, Ticket, TicketError, TicketResponse, TicketStatus, User,
};
use std::sync::Arc;

fn invite(invitees: &[&str], capacity: u32) -> Ticket {
    TicketLifecycle::invite(
        Invitation {
            created_by: User::new("host", "Host"),
            invitees: create_test_players(invitees),
            capacity,
            game_type: "peezme".into(),
            room_type: Privacy::Private,
            room_id: None,
        },
        Duration::minutes(10),
        t0(),
    )
    .unwrap()
}

fn expect_match(outcome: ResponseOutcome) -> Match {
    match outcome {
        ResponseOutcome::MatchFormed(m) => m,
        other => panic!("expected a match, got {other:?}"),
    }
}

#[test]
fn test_capacity_two_with_three_invitees() {
    let mut ticket = invite(&["a", "b", "c"], 2);

    let first = TicketLifecycle::respond(&mut ticket, "b", true, t0()).unwrap();
    assert_eq!(first, ResponseOutcome::Recorded);
    assert_eq!(ticket.status, TicketStatus::Staged);

    let game_match = expect_match(TicketLifecycle::respond(&mut ticket, "a", true, t0()).unwrap());
    assert_eq!(ticket.status, TicketStatus::Ready);
    let players: Vec<_> = game_match.players.iter().map(|p| p.id.as_str()).collect();
    assert_eq!(players, vec!["b", "a"]);
    assert_eq!(game_match.ticket_id, ticket.id);

    let late = TicketLifecycle::respond(&mut ticket, "c", true, t0()).unwrap_err();
    assert_eq!(
        late,
        TicketError::CapacityExceeded {
            ticket_id: ticket.id.clone()
        }
    );
    assert_eq!(ticket.accepted_by.len(), 2);
    assert!(ticket.accepted_by.len() + ticket.rejected_by.len() <= ticket.invitees.len());
}

#[test]
fn test_invitation_through_to_completed_game() {
    let dictionary = create_test_dictionary();
    let rules = test_rules();
    let engine = GameEngine::new(&rules, &dictionary);
    let mut lobby = LobbyDirectory::new(4);

    let collector = Arc::new(EventCollector::default());
    let mut bus = EventBus::new();
    bus.add_handler(collector.clone());

    let mut ticket = invite(&["a", "b"], 2);
    TicketLifecycle::respond(&mut ticket, "a", true, t0()).unwrap();
    let game_match = expect_match(TicketLifecycle::respond(&mut ticket, "b", true, t0()).unwrap());
    bus.publish(PeezMeEvent::MatchFormed {
        data: game_match.clone(),
        delta: ticket.clone(),
    });

    let room = lobby.place_match(&game_match).unwrap();
    assert_eq!(room.users.len(), 2);
    assert_eq!(lobby.list(Privacy::Private).len(), 1);

    let mut game = engine
        .start_game(
            &game_match,
            vec!["house".into(), "mouse".into()],
            None,
            t0(),
            &mut seeded_rng(),
        )
        .unwrap();
    TicketLifecycle::activate(&mut ticket, game.game_id.clone(), room.id.clone()).unwrap();
    assert_eq!(ticket.status, TicketStatus::Active);

    // Generated hazards may cover any tile, so play on tiles known to be clear
    for _ in 0..2 {
        let holder = game.player_turn_id.clone();
        let start = (0..rules.board_size - 2)
            .find(|i| {
                (*i..*i + 3).all(|t| {
                    !game.barriers.contains(&t)
                        && !game.obstacles.contains(&t)
                        && !game.rewards.contains(&t)
                })
            })
            .unwrap();
        let play = play_for(&game, &holder, "cat", start);
        let outcome = engine
            .submit_play(&mut game, &holder, play, t0(), &mut seeded_rng())
            .unwrap();
        bus.publish(PeezMeEvent::WordSubmitted {
            data: outcome.response,
            delta: game.clone(),
        });
    }
    assert!(game.is_over());

    TicketLifecycle::complete(&mut ticket).unwrap();
    assert_eq!(ticket.status, TicketStatus::Ended);
    for player in &game.players {
        lobby.remove_user(&room.id, &player.id).unwrap();
    }
    assert!(lobby.list(Privacy::Private).is_empty());

    assert_eq!(
        collector.type_names(),
        vec!["MatchFormed", "WordSubmitted", "WordSubmitted"]
    );
}

#[test]
fn test_pool_matchmaking_flow() {
    let mut registry = PoolRegistry::new_with_config(2, 2);
    let mut lobby = LobbyDirectory::new(4);

    for user in ["a", "b", "c"] {
        let ticket = TicketLifecycle::open_match_ticket(
            User::new(user, user),
            "peezme".into(),
            Privacy::Public,
            Duration::minutes(1),
            t0(),
        );
        registry.enqueue(ticket).unwrap();
    }

    let (game_match, mut tickets) = registry.form_match("peezme:public", t0()).formed.unwrap();
    assert_eq!(game_match.players.len(), 2);
    let room = lobby.place_match(&game_match).unwrap();
    assert_eq!(room.privacy, Privacy::Public);

    for ticket in &mut tickets {
        TicketLifecycle::activate(ticket, "g1".into(), room.id.clone()).unwrap();
    }
    assert!(tickets.iter().all(|t| t.status == TicketStatus::Active));

    // The leftover ticket times out
    assert!(registry.form_match("peezme:public", t0()).formed.is_none());
    let expired = registry.expire(t0() + Duration::minutes(2));
    assert_eq!(expired.len(), 1);
    assert_eq!(expired[0].created_by, "c");
    assert_eq!(expired[0].status, TicketStatus::Ended);
}

#[test]
fn test_ticket_response_event_round_trip() {
    let mut ticket = invite(&["a", "b"], 2);
    TicketLifecycle::respond(&mut ticket, "a", false, t0()).unwrap();

    let event = PeezMeEvent::TicketUpdated {
        data: TicketResponse {
            response_type: "reject".into(),
            accepted: false,
            ticket_id: ticket.id.clone(),
            user_id: "a".into(),
        },
        delta: ticket.clone(),
    };
    let json = serde_json::to_string(&event).unwrap();
    let back: PeezMeEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(back, event);
    assert_eq!(back.ticket_id(), Some(ticket.id.as_str()));
}
