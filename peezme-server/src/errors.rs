use peezme_types::{ErrorKind, ErrorResponse, GameError, LobbyError, TicketError};
use thiserror::Error;
use warp::http::StatusCode;

/// Everything a request handler can fail with.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Ticket(#[from] TicketError),
    #[error(transparent)]
    Game(#[from] GameError),
    #[error(transparent)]
    Lobby(#[from] LobbyError),
    #[error("{0}")]
    BadRequest(String),
    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ApiError::Ticket(e) => e.kind(),
            ApiError::Game(e) => e.kind(),
            ApiError::Lobby(e) => e.kind(),
            ApiError::BadRequest(_) => ErrorKind::Invalid,
            ApiError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Invalid => StatusCode::BAD_REQUEST,
            ErrorKind::Expired => StatusCode::GONE,
            ErrorKind::Busy => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn to_response(&self) -> ErrorResponse {
        match self {
            // Store failures stay in the logs.
            ApiError::Internal(_) => ErrorResponse::new("internal server error"),
            other => ErrorResponse::new(other.to_string()),
        }
    }

    pub fn ticket_not_found(ticket_id: &str) -> Self {
        TicketError::TicketNotFound {
            ticket_id: ticket_id.to_string(),
        }
        .into()
    }

    pub fn game_not_found(game_id: &str) -> Self {
        GameError::GameNotFound {
            game_id: game_id.to_string(),
        }
        .into()
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
