//! PostgreSQL implementation of SessionRepository.
//!
//! The aggregate is decomposed into one row per session, participant, work
//! item, and estimate, partitioned by session code. Every row carries a
//! `version` tag incremented on each successful write; delta writes are
//! conditional on the tag and run under the bounded optimistic retry
//! protocol. No in-process lock serializes writers - the per-row version is
//! the sole consistency mechanism, shared across service instances.

use async_trait::async_trait;
use sqlx::PgPool;

use crate::adapters::retry::{with_optimistic_retry, Attempt, RetrySettings};
use crate::domain::foundation::WorkItemId;
use crate::domain::session::{
    Estimate, Participant, Session, SessionCode, SessionError, WorkItem, WorkItemState,
};
use crate::ports::SessionRepository;

use super::rows::{db_err, row_to_estimate, row_to_participant, row_to_session, row_to_work_item};

/// PostgreSQL implementation of [`SessionRepository`].
#[derive(Clone)]
pub struct PostgresSessionRepository {
    pool: PgPool,
    retry: RetrySettings,
}

impl PostgresSessionRepository {
    /// Creates a repository over an existing connection pool.
    pub fn new(pool: PgPool, retry: RetrySettings) -> Self {
        Self { pool, retry }
    }

    /// Runs the bundled schema migrations.
    pub async fn migrate(&self) -> Result<(), SessionError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| SessionError::storage(format!("Migration failed: {}", e)))
    }

    /// Returns a still-revealed work item of the session to active
    /// estimation and drops its estimates, under the retry protocol.
    async fn reset_one_revealed(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
    ) -> Result<(), SessionError> {
        let pool = &self.pool;
        with_optimistic_retry(&self.retry, "work item", |_| async move {
            let current = sqlx::query_as::<_, (String, i64)>(
                "SELECT state, version FROM work_items WHERE session_code = $1 AND id = $2",
            )
            .bind(code.as_str())
            .bind(work_item_id.as_uuid())
            .fetch_optional(pool)
            .await
            .map_err(db_err("Failed to read work item"))?;

            let Some((state, version)) = current else {
                return Ok(Attempt::RowMissing);
            };
            if state != WorkItemState::Revealed.as_str() {
                // Another writer already moved it on; desired end state.
                return Ok(Attempt::Applied(()));
            }

            let updated = sqlx::query(
                r#"
                UPDATE work_items SET
                    state = $3,
                    final_estimate = NULL,
                    revealed_at = NULL,
                    finalized_at = NULL,
                    version = version + 1
                WHERE session_code = $1 AND id = $2 AND version = $4
                "#,
            )
            .bind(code.as_str())
            .bind(work_item_id.as_uuid())
            .bind(WorkItemState::ActiveEstimating.as_str())
            .bind(version)
            .execute(pool)
            .await
            .map_err(db_err("Failed to reset work item"))?;

            if updated.rows_affected() == 0 {
                return Ok(Attempt::Conflict);
            }

            sqlx::query("DELETE FROM estimates WHERE session_code = $1 AND work_item_id = $2")
                .bind(code.as_str())
                .bind(work_item_id.as_uuid())
                .execute(pool)
                .await
                .map_err(db_err("Failed to clear estimates"))?;

            Ok(Attempt::Applied(()))
        })
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionRepository for PostgresSessionRepository {
    async fn add(&self, session: &Session) -> Result<(), SessionError> {
        // Create-if-absent: a racing insert of the same code leaves the
        // first writer's row untouched.
        sqlx::query(
            r#"
            INSERT INTO sessions (code, created_at, deck)
            VALUES ($1, $2, $3)
            ON CONFLICT (code) DO NOTHING
            "#,
        )
        .bind(session.code().as_str())
        .bind(*session.created_at().as_datetime())
        .bind(session.deck().values().to_vec())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to insert session"))?;

        Ok(())
    }

    async fn get(&self, code: &SessionCode) -> Result<Option<Session>, SessionError> {
        let session_row =
            sqlx::query("SELECT code, created_at, deck FROM sessions WHERE code = $1")
                .bind(code.as_str())
                .fetch_optional(&self.pool)
                .await
                .map_err(db_err("Failed to fetch session"))?;

        let Some(session_row) = session_row else {
            return Ok(None);
        };

        let participant_rows = sqlx::query(
            r#"
            SELECT id, display_name, is_host, joined_at
            FROM participants
            WHERE session_code = $1
            ORDER BY joined_at, id
            "#,
        )
        .bind(code.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to fetch participants"))?;

        let participants = participant_rows
            .iter()
            .map(row_to_participant)
            .collect::<Result<Vec<_>, _>>()?;

        let work_item_rows = sqlx::query(
            r#"
            SELECT id, title, state, created_at, revealed_at, finalized_at, final_estimate
            FROM work_items
            WHERE session_code = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(code.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to fetch work items"))?;

        let mut work_items = work_item_rows
            .iter()
            .map(row_to_work_item)
            .collect::<Result<Vec<_>, _>>()?;

        let estimate_rows = sqlx::query(
            r#"
            SELECT work_item_id, participant_id, value, submitted_at
            FROM estimates
            WHERE session_code = $1
            ORDER BY submitted_at, participant_id
            "#,
        )
        .bind(code.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to fetch estimates"))?;

        // Replay estimates into their owning work items; estimates whose
        // work item row has vanished are skipped.
        for row in &estimate_rows {
            let (work_item_id, estimate) = row_to_estimate(row)?;
            if let Some(item) = work_items.iter_mut().find(|w| w.id() == work_item_id) {
                item.apply_estimate(estimate);
            }
        }

        Ok(Some(row_to_session(&session_row, participants, work_items)?))
    }

    async fn exists(&self, code: &SessionCode) -> Result<bool, SessionError> {
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM sessions WHERE code = $1)")
            .bind(code.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(db_err("Failed to check session existence"))
    }

    async fn add_participant(
        &self,
        code: &SessionCode,
        participant: &Participant,
    ) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO participants (session_code, id, display_name, is_host, joined_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (session_code, id) DO NOTHING
            "#,
        )
        .bind(code.as_str())
        .bind(participant.id().as_uuid())
        .bind(participant.display_name())
        .bind(participant.is_host())
        .bind(*participant.joined_at().as_datetime())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to insert participant"))?;

        Ok(())
    }

    async fn add_work_item(
        &self,
        code: &SessionCode,
        work_item: &WorkItem,
    ) -> Result<(), SessionError> {
        sqlx::query(
            r#"
            INSERT INTO work_items
                (session_code, id, title, state, created_at, revealed_at, finalized_at, final_estimate)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (session_code, id) DO NOTHING
            "#,
        )
        .bind(code.as_str())
        .bind(work_item.id().as_uuid())
        .bind(work_item.title())
        .bind(work_item.state().as_str())
        .bind(*work_item.created_at().as_datetime())
        .bind(work_item.revealed_at().map(|t| *t.as_datetime()))
        .bind(work_item.finalized_at().map(|t| *t.as_datetime()))
        .bind(work_item.final_estimate())
        .execute(&self.pool)
        .await
        .map_err(db_err("Failed to insert work item"))?;

        Ok(())
    }

    async fn upsert_estimate(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
        estimate: &Estimate,
    ) -> Result<(), SessionError> {
        let pool = &self.pool;
        with_optimistic_retry(&self.retry, "estimate", |_| async move {
            // Fast path: brand-new estimate row.
            let inserted = sqlx::query(
                r#"
                INSERT INTO estimates (session_code, work_item_id, participant_id, value, submitted_at)
                VALUES ($1, $2, $3, $4, $5)
                ON CONFLICT (session_code, work_item_id, participant_id) DO NOTHING
                "#,
            )
            .bind(code.as_str())
            .bind(work_item_id.as_uuid())
            .bind(estimate.participant_id().as_uuid())
            .bind(estimate.value())
            .bind(*estimate.submitted_at().as_datetime())
            .execute(pool)
            .await
            .map_err(db_err("Failed to insert estimate"))?;

            if inserted.rows_affected() == 1 {
                return Ok(Attempt::Applied(()));
            }

            // The row exists (possibly from a racing insert of the same
            // key); merge into it via read-modify-conditional-write.
            let version = sqlx::query_scalar::<_, i64>(
                r#"
                SELECT version FROM estimates
                WHERE session_code = $1 AND work_item_id = $2 AND participant_id = $3
                "#,
            )
            .bind(code.as_str())
            .bind(work_item_id.as_uuid())
            .bind(estimate.participant_id().as_uuid())
            .fetch_optional(pool)
            .await
            .map_err(db_err("Failed to read estimate"))?;

            let Some(version) = version else {
                return Ok(Attempt::RowMissing);
            };

            let updated = sqlx::query(
                r#"
                UPDATE estimates SET value = $4, submitted_at = $5, version = version + 1
                WHERE session_code = $1 AND work_item_id = $2 AND participant_id = $3
                  AND version = $6
                "#,
            )
            .bind(code.as_str())
            .bind(work_item_id.as_uuid())
            .bind(estimate.participant_id().as_uuid())
            .bind(estimate.value())
            .bind(*estimate.submitted_at().as_datetime())
            .bind(version)
            .execute(pool)
            .await
            .map_err(db_err("Failed to update estimate"))?;

            if updated.rows_affected() == 1 {
                Ok(Attempt::Applied(()))
            } else {
                Ok(Attempt::Conflict)
            }
        })
        .await?;
        Ok(())
    }

    async fn update_work_item_state(
        &self,
        code: &SessionCode,
        work_item: &WorkItem,
    ) -> Result<(), SessionError> {
        let pool = &self.pool;
        with_optimistic_retry(&self.retry, "work item", |_| async move {
            let version = sqlx::query_scalar::<_, i64>(
                "SELECT version FROM work_items WHERE session_code = $1 AND id = $2",
            )
            .bind(code.as_str())
            .bind(work_item.id().as_uuid())
            .fetch_optional(pool)
            .await
            .map_err(db_err("Failed to read work item"))?;

            let Some(version) = version else {
                return Ok(Attempt::RowMissing);
            };

            let updated = sqlx::query(
                r#"
                UPDATE work_items SET
                    state = $3,
                    final_estimate = $4,
                    revealed_at = $5,
                    finalized_at = $6,
                    version = version + 1
                WHERE session_code = $1 AND id = $2 AND version = $7
                "#,
            )
            .bind(code.as_str())
            .bind(work_item.id().as_uuid())
            .bind(work_item.state().as_str())
            .bind(work_item.final_estimate())
            .bind(work_item.revealed_at().map(|t| *t.as_datetime()))
            .bind(work_item.finalized_at().map(|t| *t.as_datetime()))
            .bind(version)
            .execute(pool)
            .await
            .map_err(db_err("Failed to update work item"))?;

            if updated.rows_affected() == 1 {
                Ok(Attempt::Applied(()))
            } else {
                Ok(Attempt::Conflict)
            }
        })
        .await?;
        Ok(())
    }

    async fn clear_work_item_estimates(
        &self,
        code: &SessionCode,
        work_item_id: WorkItemId,
    ) -> Result<(), SessionError> {
        // Already-absent rows are the desired end state, not an error.
        sqlx::query("DELETE FROM estimates WHERE session_code = $1 AND work_item_id = $2")
            .bind(code.as_str())
            .bind(work_item_id.as_uuid())
            .execute(&self.pool)
            .await
            .map_err(db_err("Failed to clear estimates"))?;

        Ok(())
    }

    async fn reset_revealed_work_items(&self, code: &SessionCode) -> Result<(), SessionError> {
        let revealed = sqlx::query_scalar::<_, uuid::Uuid>(
            "SELECT id FROM work_items WHERE session_code = $1 AND state = $2",
        )
        .bind(code.as_str())
        .bind(WorkItemState::Revealed.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(db_err("Failed to list revealed work items"))?;

        for id in revealed {
            self.reset_one_revealed(code, WorkItemId::from_uuid(id))
                .await?;
        }
        Ok(())
    }
}
