//! Customer repository implementation

use crate::Result;
use crate::models::{Customer, time_utils};
use crate::store::CustomerStore;
use async_trait::async_trait;
use sqlx::{Row, SqlitePool};

/// Repository for subscription owners
#[derive(Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Register a subscription owner, returning its id
    pub async fn create(&self, customer: &Customer) -> Result<i64> {
        let now = time_utils::now_millis();
        let result = sqlx::query(
            r#"
            INSERT INTO customers (name, email, stripe_id, tax_percentage, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.stripe_id)
        .bind(customer.tax_percentage)
        .bind(now)
        .bind(now)
        .execute(&self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }
}

fn row_to_customer(row: sqlx::sqlite::SqliteRow) -> Result<Customer> {
    Ok(Customer {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        email: row.try_get("email")?,
        stripe_id: row.try_get("stripe_id")?,
        tax_percentage: row.try_get("tax_percentage")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

#[async_trait]
impl CustomerStore for CustomerRepository {
    async fn find_customer(&self, id: i64) -> Result<Option<Customer>> {
        let row = sqlx::query(
            r#"
            SELECT id, name, email, stripe_id, tax_percentage, created_at, updated_at
            FROM customers
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(row_to_customer).transpose()
    }

    async fn set_stripe_id(&self, id: i64, stripe_id: &str) -> Result<()> {
        sqlx::query("UPDATE customers SET stripe_id = ?, updated_at = ? WHERE id = ?")
            .bind(stripe_id)
            .bind(time_utils::now_millis())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
