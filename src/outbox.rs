//! Email outbox. Messages are written in the same transaction as the data
//! they describe and delivered afterwards, either right away or by the
//! background dispatcher.

use std::time::Duration;

use chrono::Utc;
use sea_orm::sea_query::{LockBehavior, LockType};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, DatabaseTransaction,
    DbErr, EntityTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::{
    entity::email_outbox::{
        ActiveModel as OutboxActive, Column as OutboxCol, Entity as EmailOutbox,
        Model as OutboxModel, OutboxStatus,
    },
    error::AppResult,
    integrations::EmailMessage,
    state::AppState,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// Delivered, with the provider message id.
    Sent(String),
    /// Send failed, the message stays pending.
    Retrying(String),
    /// Send failed and the attempt budget is spent.
    Failed(String),
    /// Not pending, or locked by another worker.
    Skipped,
}

pub async fn enqueue<C>(conn: &C, user_id: Option<&str>, message: &EmailMessage) -> Result<Uuid, DbErr>
where
    C: ConnectionTrait,
{
    let id = Uuid::new_v4();
    OutboxActive {
        id: Set(id),
        user_id: Set(user_id.map(str::to_string)),
        recipient: Set(message.to.clone()),
        subject: Set(message.subject.clone()),
        html: Set(message.html.clone()),
        text: Set(message.text.clone()),
        status: Set(OutboxStatus::Pending),
        attempts: Set(0),
        last_error: Set(None),
        created_at: NotSet,
        updated_at: NotSet,
        sent_at: Set(None),
    }
    .insert(conn)
    .await?;
    Ok(id)
}

/// Try to deliver one message now.
pub async fn deliver(state: &AppState, id: Uuid) -> AppResult<DeliveryOutcome> {
    let txn = state.orm.begin().await?;
    let row = EmailOutbox::find_by_id(id)
        .filter(OutboxCol::Status.eq(OutboxStatus::Pending))
        .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
        .one(&txn)
        .await?;

    let outcome = match row {
        Some(row) => attempt(state, &txn, row).await?,
        None => DeliveryOutcome::Skipped,
    };
    txn.commit().await?;
    Ok(outcome)
}

/// Deliver up to `batch` pending messages, oldest first. Rows held by another
/// worker are skipped. Returns the number of messages sent.
pub async fn dispatch_pending(state: &AppState, batch: u64) -> AppResult<usize> {
    let txn = state.orm.begin().await?;
    let rows = EmailOutbox::find()
        .filter(OutboxCol::Status.eq(OutboxStatus::Pending))
        .order_by_asc(OutboxCol::CreatedAt)
        .limit(batch)
        .lock_with_behavior(LockType::Update, LockBehavior::SkipLocked)
        .all(&txn)
        .await?;

    let mut sent = 0;
    for row in rows {
        if let DeliveryOutcome::Sent(_) = attempt(state, &txn, row).await? {
            sent += 1;
        }
    }
    txn.commit().await?;
    Ok(sent)
}

pub fn spawn_dispatcher(state: AppState, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            match dispatch_pending(&state, 20).await {
                Ok(0) => {}
                Ok(sent) => tracing::info!(sent, "outbox dispatched"),
                Err(err) => tracing::warn!(error = %err, "outbox dispatch failed"),
            }
        }
    })
}

async fn attempt(
    state: &AppState,
    txn: &DatabaseTransaction,
    row: OutboxModel,
) -> AppResult<DeliveryOutcome> {
    let message = EmailMessage {
        to: row.recipient.clone(),
        subject: row.subject.clone(),
        html: row.html.clone(),
        text: row.text.clone(),
    };
    let id = row.id;
    let attempts = row.attempts + 1;
    let now = Utc::now().fixed_offset();

    let mut active: OutboxActive = row.into();
    active.attempts = Set(attempts);
    active.updated_at = Set(now);

    let outcome = match state.mailer.send(message).await {
        Ok(message_id) => {
            active.status = Set(OutboxStatus::Sent);
            active.sent_at = Set(Some(now));
            active.last_error = Set(None);
            tracing::info!(outbox_id = %id, message_id = %message_id, "email sent");
            DeliveryOutcome::Sent(message_id)
        }
        Err(err) => {
            let reason = err.to_string();
            active.last_error = Set(Some(reason.clone()));
            if attempts >= state.config.outbox_max_attempts {
                active.status = Set(OutboxStatus::Failed);
                tracing::error!(outbox_id = %id, attempts, error = %reason, "email delivery gave up");
                DeliveryOutcome::Failed(reason)
            } else {
                tracing::warn!(outbox_id = %id, attempts, error = %reason, "email delivery failed");
                DeliveryOutcome::Retrying(reason)
            }
        }
    };

    active.update(txn).await?;
    Ok(outcome)
}
