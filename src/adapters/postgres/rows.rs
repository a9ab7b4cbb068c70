//! Row-to-domain mapping for the Postgres tables.

use sqlx::postgres::PgRow;
use sqlx::Row;

use crate::domain::foundation::{ParticipantId, Timestamp, WorkItemId};
use crate::domain::session::{
    Deck, Estimate, Participant, Session, SessionCode, SessionError, WorkItem, WorkItemState,
};

pub(super) fn db_err(context: &'static str) -> impl FnOnce(sqlx::Error) -> SessionError {
    move |e| SessionError::storage(format!("{}: {}", context, e))
}

fn column<'r, T>(row: &'r PgRow, name: &str) -> Result<T, SessionError>
where
    T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
{
    row.try_get(name)
        .map_err(|e| SessionError::storage(format!("Failed to read column '{}': {}", name, e)))
}

pub(super) fn row_to_participant(row: &PgRow) -> Result<Participant, SessionError> {
    let id: uuid::Uuid = column(row, "id")?;
    let display_name: String = column(row, "display_name")?;
    let joined_at: chrono::DateTime<chrono::Utc> = column(row, "joined_at")?;
    let is_host: bool = column(row, "is_host")?;

    Ok(Participant::hydrate(
        ParticipantId::from_uuid(id),
        display_name,
        Timestamp::from_datetime(joined_at),
        is_host,
    ))
}

pub(super) fn row_to_work_item(row: &PgRow) -> Result<WorkItem, SessionError> {
    let id: uuid::Uuid = column(row, "id")?;
    let title: String = column(row, "title")?;
    let state: String = column(row, "state")?;
    let created_at: chrono::DateTime<chrono::Utc> = column(row, "created_at")?;
    let revealed_at: Option<chrono::DateTime<chrono::Utc>> = column(row, "revealed_at")?;
    let finalized_at: Option<chrono::DateTime<chrono::Utc>> = column(row, "finalized_at")?;
    let final_estimate: Option<String> = column(row, "final_estimate")?;

    Ok(WorkItem::hydrate(
        WorkItemId::from_uuid(id),
        title,
        Timestamp::from_datetime(created_at),
        state.parse::<WorkItemState>()?,
        revealed_at.map(Timestamp::from_datetime),
        finalized_at.map(Timestamp::from_datetime),
        final_estimate,
        Vec::new(),
    ))
}

pub(super) fn row_to_estimate(row: &PgRow) -> Result<(WorkItemId, Estimate), SessionError> {
    let work_item_id: uuid::Uuid = column(row, "work_item_id")?;
    let participant_id: uuid::Uuid = column(row, "participant_id")?;
    let value: String = column(row, "value")?;
    let submitted_at: chrono::DateTime<chrono::Utc> = column(row, "submitted_at")?;

    Ok((
        WorkItemId::from_uuid(work_item_id),
        Estimate::hydrate(
            ParticipantId::from_uuid(participant_id),
            value,
            Timestamp::from_datetime(submitted_at),
        ),
    ))
}

pub(super) fn row_to_session(
    row: &PgRow,
    participants: Vec<Participant>,
    work_items: Vec<WorkItem>,
) -> Result<Session, SessionError> {
    let code: String = column(row, "code")?;
    let created_at: chrono::DateTime<chrono::Utc> = column(row, "created_at")?;
    let deck_values: Vec<String> = column(row, "deck")?;

    Ok(Session::hydrate(
        SessionCode::parse(&code)
            .map_err(|e| SessionError::storage(format!("Invalid stored code: {}", e)))?,
        Timestamp::from_datetime(created_at),
        Deck::new(deck_values)
            .map_err(|e| SessionError::storage(format!("Invalid stored deck: {}", e)))?,
        participants,
        work_items,
    ))
}
