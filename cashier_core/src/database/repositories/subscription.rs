//! Subscription repository implementation

use crate::error::InternalError;
use crate::models::{Subscription, SubscriptionItem, SubscriptionStatus, time_utils};
use crate::store::SubscriptionStore;
use crate::{Error, Result};
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

const SUBSCRIPTION_COLUMNS: &str = "id, customer_id, name, stripe_id, stripe_status, stripe_plan, \
     quantity, trial_ends_at, ends_at, created_at, updated_at";

/// Repository for subscriptions and their plan items
#[derive(Clone)]
pub struct SubscriptionRepository {
    pool: SqlitePool,
}

impl SubscriptionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

fn parse_status(raw: &str) -> Result<SubscriptionStatus> {
    raw.parse().map_err(|e| {
        Error::Internal(InternalError::corrupt_record(
            "subscriptions",
            format!("{e}"),
        ))
    })
}

fn row_to_subscription(row: sqlx::sqlite::SqliteRow) -> Result<Subscription> {
    let status: String = row.try_get("stripe_status")?;

    Ok(Subscription {
        id: row.try_get("id")?,
        customer_id: row.try_get("customer_id")?,
        name: row.try_get("name")?,
        stripe_id: row.try_get("stripe_id")?,
        stripe_status: parse_status(&status)?,
        stripe_plan: row.try_get("stripe_plan")?,
        quantity: row.try_get("quantity")?,
        trial_ends_at: row.try_get("trial_ends_at")?,
        ends_at: row.try_get("ends_at")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn row_to_item(row: sqlx::sqlite::SqliteRow) -> Result<SubscriptionItem> {
    Ok(SubscriptionItem {
        id: row.try_get("id")?,
        subscription_id: row.try_get("subscription_id")?,
        stripe_id: row.try_get("stripe_id")?,
        stripe_plan: row.try_get("stripe_plan")?,
        quantity: row.try_get("quantity")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl SubscriptionStore for SubscriptionRepository {
    async fn select_for_reconcile(&self, empty_only: bool) -> Result<Vec<Subscription>> {
        let rows = if empty_only {
            sqlx::query(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE stripe_status = ? ORDER BY id ASC"
            ))
            .bind(SubscriptionStatus::Unsynced.as_str())
            .fetch_all(&self.pool)
            .await?
        } else {
            sqlx::query(&format!(
                "SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions ORDER BY id ASC"
            ))
            .fetch_all(&self.pool)
            .await?
        };

        rows.into_iter().map(row_to_subscription).collect()
    }

    async fn update_status_if(
        &self,
        id: i64,
        expected: SubscriptionStatus,
        new: SubscriptionStatus,
    ) -> Result<bool> {
        let result = sqlx::query(
            r#"
            UPDATE subscriptions
            SET stripe_status = ?, updated_at = ?
            WHERE id = ? AND stripe_status = ?
            "#,
        )
        .bind(new.as_str())
        .bind(time_utils::now_millis())
        .bind(id)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    async fn create_with_items(
        &self,
        subscription: &Subscription,
        items: &[SubscriptionItem],
    ) -> Result<(Subscription, Vec<SubscriptionItem>)> {
        let mut tx = self.pool.begin().await?;
        let now = time_utils::now_millis();

        let result = sqlx::query(
            r#"
            INSERT INTO subscriptions (
                customer_id, name, stripe_id, stripe_status, stripe_plan,
                quantity, trial_ends_at, ends_at, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(subscription.customer_id)
        .bind(&subscription.name)
        .bind(&subscription.stripe_id)
        .bind(subscription.stripe_status.as_str())
        .bind(&subscription.stripe_plan)
        .bind(subscription.quantity)
        .bind(subscription.trial_ends_at)
        .bind(subscription.ends_at)
        .bind(now)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let saved = Subscription {
            id: result.last_insert_rowid(),
            created_at: now,
            updated_at: now,
            ..subscription.clone()
        };

        let mut saved_items = Vec::with_capacity(items.len());
        for item in items {
            let result = sqlx::query(
                r#"
                INSERT INTO subscription_items (
                    subscription_id, stripe_id, stripe_plan, quantity, created_at, updated_at
                ) VALUES (?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(saved.id)
            .bind(&item.stripe_id)
            .bind(&item.stripe_plan)
            .bind(item.quantity)
            .bind(now)
            .bind(now)
            .execute(&mut *tx)
            .await?;

            saved_items.push(SubscriptionItem {
                id: result.last_insert_rowid(),
                subscription_id: saved.id,
                created_at: now,
                updated_at: now,
                ..item.clone()
            });
        }

        // Dropping the transaction on any error above rolls everything back
        tx.commit().await?;
        Ok((saved, saved_items))
    }

    async fn items_for(&self, subscription_id: i64) -> Result<Vec<SubscriptionItem>> {
        let rows = sqlx::query(
            r#"
            SELECT id, subscription_id, stripe_id, stripe_plan, quantity, created_at, updated_at
            FROM subscription_items
            WHERE subscription_id = ?
            ORDER BY id ASC
            "#,
        )
        .bind(subscription_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(row_to_item).collect()
    }
}
