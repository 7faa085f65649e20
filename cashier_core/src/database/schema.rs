//! Database schema definitions

/// Current schema version
pub const CURRENT_SCHEMA_VERSION: i32 = 2;

/// Initial schema creation SQL
pub const SCHEMA_V1: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    applied_at INTEGER NOT NULL
);

-- Subscription owners
CREATE TABLE IF NOT EXISTS customers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    email TEXT,
    stripe_id TEXT UNIQUE,
    tax_percentage REAL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL
);

-- Subscriptions; stripe_status '' means never synced
CREATE TABLE IF NOT EXISTS subscriptions (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    customer_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    stripe_id TEXT NOT NULL UNIQUE,
    stripe_status TEXT NOT NULL DEFAULT '',
    stripe_plan TEXT NOT NULL DEFAULT '',
    quantity INTEGER NOT NULL DEFAULT 0,
    trial_ends_at INTEGER,
    ends_at INTEGER,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (customer_id) REFERENCES customers(id) ON DELETE CASCADE
);

-- Plan lines of multi-plan subscriptions
CREATE TABLE IF NOT EXISTS subscription_items (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    subscription_id INTEGER NOT NULL,
    stripe_id TEXT NOT NULL UNIQUE,
    stripe_plan TEXT NOT NULL,
    quantity INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (subscription_id) REFERENCES subscriptions(id) ON DELETE CASCADE,
    UNIQUE(subscription_id, stripe_plan)
);

CREATE INDEX IF NOT EXISTS idx_subscriptions_customer_id ON subscriptions(customer_id);
CREATE INDEX IF NOT EXISTS idx_subscription_items_subscription_id ON subscription_items(subscription_id);
"#;

/// Status lookups for reconciliation runs
pub const SCHEMA_V2: &str = r#"
CREATE INDEX IF NOT EXISTS idx_subscriptions_stripe_status ON subscriptions(stripe_status);
"#;
