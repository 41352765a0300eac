use chrono::{DateTime, Utc};
use log::{debug, trace};
use sqlx::{types::Json, QueryBuilder, Sqlite, SqliteConnection};

use crate::{
    db_types::{CoinStatus, Order, OrderRecord, OrderStatusType, PaymentStatus},
    order_state::OrderState,
    sfe_api::order_objects::OrderQueryFilter,
    traits::LedgerError,
};

/// Inserts a new order using the given connection. This is not atomic. Embed the call inside a transaction together
/// with the wallet debit, passing `&mut *tx` as the connection argument.
pub async fn insert_order(order: OrderRecord, conn: &mut SqliteConnection) -> Result<Order, LedgerError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        INSERT INTO orders (
            user_id,
            items,
            total_amount,
            payable_amount,
            coins_earned,
            coins_redeemed,
            coin_status,
            coin_credit_date,
            payment_method,
            payment_status,
            order_status,
            address,
            gateway_order_id,
            version,
            created_at,
            updated_at
        ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, 0, $14, $14)
        RETURNING *
        "#,
    )
    .bind(&order.user_id)
    .bind(Json(&order.items))
    .bind(order.total_amount)
    .bind(order.payable_amount)
    .bind(order.coins_earned)
    .bind(order.coins_redeemed)
    .bind(CoinStatus::Pending)
    .bind(order.coin_credit_date)
    .bind(order.payment_method)
    .bind(order.payment_status)
    .bind(OrderStatusType::Pending)
    .bind(Json(&order.address))
    .bind(&order.gateway_order_id)
    .bind(order.created_at)
    .fetch_one(conn)
    .await?;
    debug!("🗃️ Order #{} for {} has been saved in the DB", order.id, order.user_id);
    Ok(order)
}

pub async fn fetch_order(id: i64, conn: &mut SqliteConnection) -> Result<Option<Order>, LedgerError> {
    let order = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE id = $1").bind(id).fetch_optional(conn).await?;
    Ok(order)
}

pub async fn fetch_orders_for_user(user_id: &str, conn: &mut SqliteConnection) -> Result<Vec<Order>, LedgerError> {
    let orders = sqlx::query_as::<_, Order>("SELECT * FROM orders WHERE user_id = $1 ORDER BY created_at DESC, id DESC")
        .bind(user_id)
        .fetch_all(conn)
        .await?;
    Ok(orders)
}

/// Fetches orders according to criteria specified in the `OrderQueryFilter`
///
/// Resulting orders are ordered by `created_at` in ascending order
pub async fn search_orders(query: OrderQueryFilter, conn: &mut SqliteConnection) -> Result<Vec<Order>, LedgerError> {
    let mut builder = QueryBuilder::<Sqlite>::new("SELECT * FROM orders ");
    if !query.is_empty() {
        builder.push("WHERE ");
    }
    let mut where_clause = builder.separated(" AND ");
    if let Some(user_id) = query.user_id {
        where_clause.push("user_id = ");
        where_clause.push_bind_unseparated(user_id);
    }
    if let Some(statuses) = query.status.filter(|s| !s.is_empty()) {
        where_clause.push("order_status IN (");
        let mut first = true;
        for status in statuses {
            if !first {
                where_clause.push_unseparated(", ");
            }
            where_clause.push_bind_unseparated(status);
            first = false;
        }
        where_clause.push_unseparated(")");
    }
    if let Some(status) = query.payment_status {
        where_clause.push("payment_status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(status) = query.coin_status {
        where_clause.push("coin_status = ");
        where_clause.push_bind_unseparated(status);
    }
    if let Some(method) = query.payment_method {
        where_clause.push("payment_method = ");
        where_clause.push_bind_unseparated(method);
    }
    if let Some(since) = query.since {
        where_clause.push("created_at >= ");
        where_clause.push_bind_unseparated(since);
    }
    if let Some(until) = query.until {
        where_clause.push("created_at <= ");
        where_clause.push_bind_unseparated(until);
    }
    builder.push(" ORDER BY created_at ASC, id ASC");
    trace!("🗃️ Executing query: {}", builder.sql());
    let orders = builder.build_query_as::<Order>().fetch_all(conn).await?;
    trace!("🗃️ Result of search_orders: {}", orders.len());
    Ok(orders)
}

pub async fn fetch_settleable_orders(now: DateTime<Utc>, conn: &mut SqliteConnection) -> Result<Vec<Order>, LedgerError> {
    let orders = sqlx::query_as::<_, Order>(
        r#"
        SELECT * FROM orders
        WHERE coin_status = $1
          AND coin_credit_date <= $2
          AND payment_status = $3
          AND order_status NOT IN ($4, $5)
        ORDER BY coin_credit_date ASC, id ASC
        "#,
    )
    .bind(CoinStatus::Pending)
    .bind(now)
    .bind(PaymentStatus::Paid)
    .bind(OrderStatusType::Cancelled)
    .bind(OrderStatusType::Returned)
    .fetch_all(conn)
    .await?;
    Ok(orders)
}

/// Writes every status axis of `next` to the order, but only if the stored version still equals `expected_version`.
///
/// Returns `None` if the guard did not match (the order was changed concurrently, or does not exist).
pub async fn update_order_state(
    id: i64,
    expected_version: i64,
    next: &OrderState,
    now: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, LedgerError> {
    let order = sqlx::query_as::<_, Order>(
        r#"
        UPDATE orders SET
            order_status = $1,
            payment_status = $2,
            coin_status = $3,
            cancellation_requested = $4,
            cancellation_reason = $5,
            cancellation_requested_at = $6,
            cancellation_status = $7,
            return_requested = $8,
            return_reason = $9,
            return_requested_at = $10,
            return_status = $11,
            delivered_at = $12,
            version = version + 1,
            updated_at = $13
        WHERE id = $14 AND version = $15
        RETURNING *
        "#,
    )
    .bind(next.order_status)
    .bind(next.payment_status)
    .bind(next.coin_status)
    .bind(next.cancellation.requested)
    .bind(&next.cancellation.reason)
    .bind(next.cancellation.requested_at)
    .bind(next.cancellation.status)
    .bind(next.return_request.requested)
    .bind(&next.return_request.reason)
    .bind(next.return_request.requested_at)
    .bind(next.return_request.status)
    .bind(next.delivered_at)
    .bind(now)
    .bind(id)
    .bind(expected_version)
    .fetch_optional(conn)
    .await?;
    Ok(order)
}
