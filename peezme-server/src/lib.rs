use serde::Serialize;
use tracing::{debug, error};
use warp::Filter;
use warp::http::StatusCode;

use peezme_types::{
    CancelRequest, DeleteRequest, InviteRequest, LobbyRoomRequest, MatchTicketRequest, Play,
    Privacy, RoomCreateRequest, TicketResponse, User,
};

pub mod config;
pub mod errors;
pub mod game_manager;
pub mod lobby_service;
pub mod locks;
pub mod matchmaking;
pub mod state;
pub mod ticket_manager;
pub mod websocket;

use crate::errors::{ApiError, ApiResult};
pub use crate::state::{AppState, Stores};
use crate::websocket::Subscription;

pub fn create_routes(
    state: AppState,
) -> impl Filter<Extract = impl warp::Reply, Error = warp::Rejection> + Clone {
    let state_filter = warp::any().map({
        let state = state.clone();
        move || state.clone()
    });

    // Event stream
    let events = warp::path("events")
        .and(warp::ws())
        .and(warp::query::<Subscription>())
        .and(state_filter.clone())
        .map(|ws: warp::ws::Ws, subscription: Subscription, state: AppState| {
            let connections = state.connections.clone();
            ws.on_upgrade(move |socket| {
                websocket::handle_connection(socket, connections, subscription)
            })
        });

    let index = warp::path::end()
        .and(warp::get())
        .and(state_filter.clone())
        .map(|state: AppState| warp::reply::json(&state.service));

    let health = warp::path("health")
        .and(warp::get())
        .map(|| warp::reply::with_status("OK", StatusCode::OK));

    // Tickets
    let create_ticket = warp::path!("tickets")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_invite);

    let match_ticket = warp::path!("tickets" / "match")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_match_ticket);

    let respond = warp::path!("tickets" / "respond")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_respond);

    let cancel = warp::path!("tickets" / "cancel")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_cancel);

    let get_ticket = warp::path!("tickets" / String)
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(handle_get_ticket);

    let pools = warp::path!("pools")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(handle_pools);

    // Games
    let play = warp::path!("games" / "play")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_play);

    let get_game = warp::path!("games" / String)
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(handle_get_game);

    let delete_game = warp::path!("games")
        .and(warp::delete())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_delete_game);

    // Lobby
    let lobby = warp::path!("lobby")
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(handle_lobby);

    let lobby_by_privacy = warp::path!("lobby" / String)
        .and(warp::get())
        .and(state_filter.clone())
        .and_then(handle_lobby_by_privacy);

    let create_room = warp::path!("lobby" / "rooms")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_create_room);

    let join_room = warp::path!("lobby" / "rooms" / "join")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_join_room);

    let leave_room = warp::path!("lobby" / "rooms" / "leave")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_leave_room);

    let close_room = warp::path!("lobby" / "rooms" / "close")
        .and(warp::post())
        .and(warp::body::json())
        .and(state_filter.clone())
        .and_then(handle_close_room);

    let cors = warp::cors()
        .allow_any_origin()
        .allow_headers(vec!["content-type"])
        .allow_methods(vec!["GET", "POST", "DELETE"]);

    events
        .or(index)
        .or(health)
        .or(create_ticket)
        .or(match_ticket)
        .or(respond)
        .or(cancel)
        .or(get_ticket)
        .or(pools)
        .or(play)
        .or(get_game)
        .or(delete_game)
        .or(lobby)
        .or(lobby_by_privacy)
        .or(create_room)
        .or(join_room)
        .or(leave_room)
        .or(close_room)
        .with(cors)
        .with(warp::log("peezme"))
}

fn reply<T: Serialize>(
    result: ApiResult<T>,
    success: StatusCode,
) -> warp::reply::WithStatus<warp::reply::Json> {
    match result {
        Ok(body) => warp::reply::with_status(warp::reply::json(&body), success),
        Err(err) => {
            if err.status().is_server_error() {
                error!("Request failed: {:#}", err);
            } else {
                debug!("Request refused: {}", err);
            }
            warp::reply::with_status(warp::reply::json(&err.to_response()), err.status())
        }
    }
}

async fn handle_invite(
    request: InviteRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(reply(state.tickets.invite(request).await, StatusCode::CREATED))
}

async fn handle_match_ticket(
    request: MatchTicketRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(reply(
        state.tickets.open_match_ticket(request).await,
        StatusCode::CREATED,
    ))
}

async fn handle_respond(
    response: TicketResponse,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = state
        .tickets
        .respond(response.clone())
        .await
        .map(|_| response);
    Ok(reply(result, StatusCode::OK))
}

async fn handle_cancel(
    request: CancelRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(reply(state.tickets.cancel(request).await, StatusCode::OK))
}

async fn handle_get_ticket(
    ticket_id: String,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(reply(state.tickets.get_ticket(&ticket_id).await, StatusCode::OK))
}

async fn handle_pools(state: AppState) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(reply(Ok(state.tickets.queue_stats().await), StatusCode::OK))
}

async fn handle_play(play: Play, state: AppState) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(reply(state.games.submit_play(play).await, StatusCode::OK))
}

async fn handle_get_game(
    game_id: String,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(reply(state.games.get_game(&game_id).await, StatusCode::OK))
}

async fn handle_delete_game(
    request: DeleteRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(reply(state.games.delete_game(request).await, StatusCode::OK))
}

async fn handle_lobby(state: AppState) -> Result<impl warp::Reply, warp::Rejection> {
    Ok(reply(Ok(state.lobby.lobby().await), StatusCode::OK))
}

async fn handle_lobby_by_privacy(
    privacy: String,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = match privacy.parse::<Privacy>() {
        Ok(privacy) => Ok(state.lobby.list(privacy).await),
        Err(e) => Err(ApiError::BadRequest(e)),
    };
    Ok(reply(result, StatusCode::OK))
}

async fn handle_create_room(
    request: RoomCreateRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = state.lobby.create_room(request).await.map_err(ApiError::from);
    Ok(reply(result, StatusCode::CREATED))
}

async fn handle_join_room(
    request: LobbyRoomRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = state
        .lobby
        .join_room(&request.room_id, User::placeholder(&request.user_id))
        .await
        .map_err(ApiError::from);
    Ok(reply(result, StatusCode::OK))
}

async fn handle_leave_room(
    request: LobbyRoomRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = state
        .lobby
        .leave_room(&request.room_id, &request.user_id)
        .await
        .map_err(ApiError::from);
    Ok(reply(result, StatusCode::OK))
}

async fn handle_close_room(
    request: LobbyRoomRequest,
    state: AppState,
) -> Result<impl warp::Reply, warp::Rejection> {
    let result = state
        .lobby
        .close_room(&request.room_id, &request.user_id)
        .await
        .map_err(ApiError::from);
    Ok(reply(result, StatusCode::OK))
}
