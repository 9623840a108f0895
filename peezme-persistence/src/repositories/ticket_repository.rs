use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ActiveValue, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use tracing::{debug, warn};

use super::TicketStore;
use crate::codec::{decode_ticket, encode_ticket};
use crate::entities::{prelude::*, tickets};
use peezme_types::schema::CURRENT_SCHEMA_VERSION;
use peezme_types::{Ticket, TicketStatus};

pub struct TicketRepository {
    db: DatabaseConnection,
}

impl TicketRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }

    fn model_to_ticket(model: tickets::Model) -> Result<Ticket> {
        if model.schema_version != CURRENT_SCHEMA_VERSION as i32 {
            debug!(
                ticket_id = %model.id,
                "Ticket row stored at schema v{}", model.schema_version
            );
        }
        decode_ticket(&model.payload)
    }
}

#[async_trait]
impl TicketStore for TicketRepository {
    async fn get_ticket(&self, id: &str) -> Result<Option<Ticket>> {
        let model = Tickets::find_by_id(id.to_string()).one(&self.db).await?;
        model.map(Self::model_to_ticket).transpose()
    }

    async fn save_ticket(&self, ticket: &Ticket) -> Result<()> {
        let model = tickets::ActiveModel {
            id: ActiveValue::Set(ticket.id.clone()),
            status: ActiveValue::Set(ticket.status.to_string()),
            pool: ActiveValue::Set(ticket.pool_name()),
            game_id: ActiveValue::Set(ticket.game_id.clone()),
            schema_version: ActiveValue::Set(CURRENT_SCHEMA_VERSION as i32),
            payload: ActiveValue::Set(encode_ticket(ticket)?),
            expires: ActiveValue::Set(ticket.expires.into()),
            updated_at: ActiveValue::Set(Utc::now().into()),
        };

        Tickets::insert(model)
            .on_conflict(
                OnConflict::column(tickets::Column::Id)
                    .update_columns([
                        tickets::Column::Status,
                        tickets::Column::Pool,
                        tickets::Column::GameId,
                        tickets::Column::SchemaVersion,
                        tickets::Column::Payload,
                        tickets::Column::Expires,
                        tickets::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn delete_ticket(&self, id: &str) -> Result<bool> {
        let result = Tickets::delete_by_id(id.to_string()).exec(&self.db).await?;
        Ok(result.rows_affected > 0)
    }

    async fn find_ticket_by_game(&self, game_id: &str) -> Result<Option<Ticket>> {
        let model = Tickets::find()
            .filter(tickets::Column::GameId.eq(game_id))
            .one(&self.db)
            .await?;
        model.map(Self::model_to_ticket).transpose()
    }

    async fn open_tickets(&self) -> Result<Vec<Ticket>> {
        let models = Tickets::find()
            .filter(
                tickets::Column::Status
                    .is_in([TicketStatus::New.to_string(), TicketStatus::Staged.to_string()]),
            )
            .order_by_asc(tickets::Column::Expires)
            .all(&self.db)
            .await?;

        let mut open = Vec::with_capacity(models.len());
        for model in models {
            let id = model.id.clone();
            match Self::model_to_ticket(model) {
                Ok(ticket) => open.push(ticket),
                Err(e) => warn!(ticket_id = %id, "Skipping unreadable ticket row: {:#}", e),
            }
        }
        Ok(open)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::connect_to_memory_database;
    use chrono::Duration;
    use migration::{Migrator, MigratorTrait};
    use peezme_types::{Privacy, User};
    use sea_orm::{ConnectionTrait, Statement};
    use std::collections::BTreeMap;

    async fn setup_test_db() -> TicketRepository {
        let db = connect_to_memory_database().await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        TicketRepository::new(db)
    }

    fn ticket(id: &str, status: TicketStatus) -> Ticket {
        let now = Utc::now();
        Ticket {
            id: id.into(),
            created_by: "host".into(),
            game_type: "peezme".into(),
            room_type: Privacy::Private,
            is_active: true,
            room_id: None,
            is_match_ticket: false,
            created: now,
            expires: now + Duration::minutes(5),
            invitees: vec!["a".into(), "b".into()],
            accepted_by: vec![],
            rejected_by: vec![],
            is_being_processed: false,
            invitation_sent: true,
            status,
            game_id: None,
            capacity: 2,
            profiles: BTreeMap::from([("a".into(), User::new("a", "Ann"))]),
        }
    }

    #[tokio::test]
    async fn test_save_and_get_ticket() {
        let repo = setup_test_db().await;
        let t = ticket("t1", TicketStatus::New);

        repo.save_ticket(&t).await.unwrap();
        let found = repo.get_ticket("t1").await.unwrap().unwrap();
        assert_eq!(found, t);
        assert!(repo.get_ticket("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites() {
        let repo = setup_test_db().await;
        let mut t = ticket("t1", TicketStatus::New);
        repo.save_ticket(&t).await.unwrap();

        t.accepted_by.push("a".into());
        t.status = TicketStatus::Staged;
        repo.save_ticket(&t).await.unwrap();

        let found = repo.get_ticket("t1").await.unwrap().unwrap();
        assert_eq!(found.status, TicketStatus::Staged);
        assert_eq!(found.accepted_by, vec!["a"]);
    }

    #[tokio::test]
    async fn test_find_by_game_and_open_tickets() {
        let repo = setup_test_db().await;
        let mut active = ticket("active", TicketStatus::Active);
        active.game_id = Some("g1".into());
        repo.save_ticket(&active).await.unwrap();
        repo.save_ticket(&ticket("new", TicketStatus::New)).await.unwrap();
        repo.save_ticket(&ticket("staged", TicketStatus::Staged))
            .await
            .unwrap();
        repo.save_ticket(&ticket("ended", TicketStatus::Ended))
            .await
            .unwrap();

        let found = repo.find_ticket_by_game("g1").await.unwrap().unwrap();
        assert_eq!(found.id, "active");

        let mut open: Vec<String> = repo
            .open_tickets()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.id)
            .collect();
        open.sort();
        assert_eq!(open, vec!["new", "staged"]);
    }

    #[tokio::test]
    async fn test_delete_ticket() {
        let repo = setup_test_db().await;
        repo.save_ticket(&ticket("t1", TicketStatus::New))
            .await
            .unwrap();
        assert!(repo.delete_ticket("t1").await.unwrap());
        assert!(!repo.delete_ticket("t1").await.unwrap());
    }

    #[tokio::test]
    async fn test_legacy_row_upgrades_on_read() {
        let repo = setup_test_db().await;
        let payload = r#"{"id":"old","createdBy":"host","gameType":"peezme","roomType":"public","room":"lobby-1","created":"2024-01-01T00:00:00Z","expires":"2024-01-01T00:05:00Z","invitees":["a","b"],"acceptedBy":["a","b"]}"#;
        repo.db
            .execute(Statement::from_sql_and_values(
                repo.db.get_database_backend(),
                "INSERT INTO tickets (id, status, pool, schema_version, payload, expires, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?)",
                [
                    "old".into(),
                    "".into(),
                    "".into(),
                    1i32.into(),
                    payload.into(),
                    "2024-01-01T00:05:00+00:00".into(),
                    "2024-01-01T00:00:00+00:00".into(),
                ],
            ))
            .await
            .unwrap();

        let upgraded = repo.get_ticket("old").await.unwrap().unwrap();
        assert_eq!(upgraded.status, TicketStatus::Ready);
        assert_eq!(upgraded.capacity, 2);
        assert_eq!(upgraded.room_id.as_deref(), Some("lobby-1"));
        assert_eq!(upgraded.profile("a").id, "a");
    }
}
