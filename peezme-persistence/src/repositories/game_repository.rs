use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};
use tracing::warn;

use super::GameStore;
use crate::codec::{decode_game, encode_game};
use crate::entities::{games, prelude::*};
use peezme_types::schema::CURRENT_SCHEMA_VERSION;
use peezme_types::{Game, GameStatus};

pub struct GameRepository {
    db: DatabaseConnection,
}

impl GameRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn status_name(status: GameStatus) -> String {
        format!("{:?}", status)
    }

    fn model_to_game(model: games::Model) -> Result<Game> {
        decode_game(&model.payload, model.updated_at.with_timezone(&Utc))
    }
}

#[async_trait]
impl GameStore for GameRepository {
    async fn get_game(&self, id: &str) -> Result<Option<Game>> {
        let model = Games::find_by_id(id.to_string()).one(&self.db).await?;
        model.map(Self::model_to_game).transpose()
    }

    async fn save_game(&self, game: &Game) -> Result<()> {
        let model = games::ActiveModel {
            id: ActiveValue::Set(game.game_id.clone()),
            status: ActiveValue::Set(Self::status_name(game.status)),
            schema_version: ActiveValue::Set(CURRENT_SCHEMA_VERSION as i32),
            payload: ActiveValue::Set(encode_game(game)?),
            updated_at: ActiveValue::Set(Utc::now().into()),
        };

        Games::insert(model)
            .on_conflict(
                OnConflict::column(games::Column::Id)
                    .update_columns([
                        games::Column::Status,
                        games::Column::SchemaVersion,
                        games::Column::Payload,
                        games::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_game(&self, id: &str) -> Result<bool> {
        let result = Games::delete_by_id(id.to_string()).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn active_games(&self) -> Result<Vec<Game>> {
        let models = Games::find()
            .filter(games::Column::Status.ne(Self::status_name(GameStatus::GameOver)))
            .all(&self.db)
            .await?;

        let mut active = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id.clone();
            match Self::model_to_game(model) {
                Ok(game) => active.push(game),
                Err(e) => warn!(game_id = %id, "Skipping unreadable game row: {:#}", e),
            }
        }
        Ok(active)
    }
}
