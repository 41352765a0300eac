use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::SqliteConnection;

use crate::{
    db_types::{NewPaymentRecord, PaymentRecord, PaymentRecordStatus},
    traits::{InsertPaymentResult, LedgerError},
};

/// Stores a new payment record. Inserting the same gateway order id twice returns the existing record.
pub async fn idempotent_insert(
    record: NewPaymentRecord,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<InsertPaymentResult, LedgerError> {
    let result = sqlx::query_as::<_, PaymentRecord>(
        r#"
        INSERT INTO payment_records (gateway_order_id, user_id, amount, currency, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $6)
        RETURNING *
        "#,
    )
    .bind(&record.gateway_order_id)
    .bind(&record.user_id)
    .bind(record.amount)
    .bind(&record.currency)
    .bind(PaymentRecordStatus::Created)
    .bind(now)
    .fetch_one(&mut *conn)
    .await;
    match result {
        Ok(inserted) => {
            debug!("💳 Payment record {} created for {}", inserted.gateway_order_id, inserted.user_id);
            Ok(InsertPaymentResult::Inserted(inserted))
        },
        Err(sqlx::Error::Database(e)) if e.is_unique_violation() => {
            let existing = fetch_payment_record(&record.gateway_order_id, conn)
                .await?
                .ok_or_else(|| LedgerError::PaymentNotFound(record.gateway_order_id.clone()))?;
            Ok(InsertPaymentResult::AlreadyExists(existing))
        },
        Err(e) => Err(e.into()),
    }
}

pub async fn fetch_payment_record(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, LedgerError> {
    let record = sqlx::query_as::<_, PaymentRecord>("SELECT * FROM payment_records WHERE gateway_order_id = $1")
        .bind(gateway_order_id)
        .fetch_optional(conn)
        .await?;
    Ok(record)
}

/// The `created → paid` step. Returns `None` if the record is not (or no longer) in the `created` state, which makes
/// this the single point where a verified payment can take effect.
pub async fn mark_paid(
    gateway_order_id: &str,
    gateway_payment_id: &str,
    signature: &str,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, LedgerError> {
    let record = sqlx::query_as::<_, PaymentRecord>(
        r#"
        UPDATE payment_records
        SET status = $1, gateway_payment_id = $2, signature = $3, updated_at = $4
        WHERE gateway_order_id = $5 AND status = $6
        RETURNING *
        "#,
    )
    .bind(PaymentRecordStatus::Paid)
    .bind(gateway_payment_id)
    .bind(signature)
    .bind(now)
    .bind(gateway_order_id)
    .bind(PaymentRecordStatus::Created)
    .fetch_optional(conn)
    .await?;
    trace!("💳 Payment {gateway_order_id} marked as paid: {}", record.is_some());
    Ok(record)
}

pub async fn mark_failed(
    gateway_order_id: &str,
    gateway_payment_id: Option<&str>,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<PaymentRecord>, LedgerError> {
    let record = sqlx::query_as::<_, PaymentRecord>(
        r#"
        UPDATE payment_records
        SET status = $1, gateway_payment_id = COALESCE($2, gateway_payment_id), updated_at = $3
        WHERE gateway_order_id = $4 AND status = $5
        RETURNING *
        "#,
    )
    .bind(PaymentRecordStatus::Failed)
    .bind(gateway_payment_id)
    .bind(now)
    .bind(gateway_order_id)
    .bind(PaymentRecordStatus::Created)
    .fetch_optional(conn)
    .await?;
    Ok(record)
}

pub async fn link_order(gateway_order_id: &str, order_id: i64, conn: &mut SqliteConnection) -> Result<(), LedgerError> {
    sqlx::query("UPDATE payment_records SET order_id = $1 WHERE gateway_order_id = $2")
        .bind(order_id)
        .bind(gateway_order_id)
        .execute(conn)
        .await?;
    Ok(())
}
