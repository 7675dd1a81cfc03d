//! SQLite account store
//!
//! Accounts live in `accounts`; each account's followers/following sets
//! live in `account_relations`, one row per member. Only the owning side of
//! a row is constrained, so a peer id can outlive the account it names,
//! the same way references behave in a document store.

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{Pool, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::BTreeSet;
use std::path::Path;

use super::models::*;
use super::store::AccountStore;
use crate::error::AppError;

/// Database connection pool wrapper.
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Connect to (or create) the SQLite file at `path` and run migrations.
    pub async fn connect(path: &Path) -> Result<Self, AppError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AppError::Database(sqlx::Error::Io(e)))?;
        }

        let connection_string = format!("sqlite:{}?mode=rwc", path.display());
        let pool = SqlitePool::connect(&connection_string).await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| {
                tracing::error!("Migration failed: {}", e);
                AppError::Internal(anyhow::anyhow!("Migration failed: {}", e))
            })?;

        tracing::debug!(path = %path.display(), "SQLite account store ready");
        Ok(Self { pool })
    }

    /// Add or remove one relation row and refresh the matching count.
    ///
    /// Runs in an IMMEDIATE transaction so the existence check, the row
    /// change and the count refresh are a single atomic step.
    async fn change_relation(
        &self,
        account_id: &str,
        relation: Relation,
        peer_id: &str,
        insert: bool,
    ) -> Result<SetUpdate, AppError> {
        let mut conn = self.pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;

        let result = change_relation_in(&mut *conn, account_id, relation, peer_id, insert).await;

        match result {
            Ok(update) => {
                sqlx::query("COMMIT").execute(&mut *conn).await?;
                Ok(update)
            }
            Err(error) => {
                let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
                Err(error)
            }
        }
    }

    /// Insert a relation row on one side only, leaving the peer untouched.
    ///
    /// Only used by tests to fabricate dangling references.
    #[cfg(test)]
    pub(crate) async fn insert_raw_relation(
        &self,
        account_id: &str,
        relation: Relation,
        peer_id: &str,
    ) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO account_relations (account_id, relation, peer_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(relation.as_str())
        .bind(peer_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        let sql = format!(
            "UPDATE accounts SET {col} = {col} + 1 WHERE id = ?",
            col = relation.count_column()
        );
        sqlx::query(&sql).bind(account_id).execute(&self.pool).await?;
        Ok(())
    }
}

/// Load both relation sets of one account.
async fn load_relations(
    conn: &mut SqliteConnection,
    account_id: &str,
) -> Result<(BTreeSet<String>, BTreeSet<String>), AppError> {
    let rows = sqlx::query_as::<_, (String, String)>(
        "SELECT relation, peer_id FROM account_relations WHERE account_id = ?",
    )
    .bind(account_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut followers = BTreeSet::new();
    let mut following = BTreeSet::new();
    for (relation, peer_id) in rows {
        if relation == Relation::Followers.as_str() {
            followers.insert(peer_id);
        } else if relation == Relation::Following.as_str() {
            following.insert(peer_id);
        } else {
            tracing::warn!(%account_id, %relation, "ignoring unknown relation row");
        }
    }

    Ok((followers, following))
}

/// Load one account row matching `column = value` plus its relation sets.
///
/// Both reads share one transaction so the cached counts always match the
/// sets returned with them.
async fn load_account(
    pool: &SqlitePool,
    column: &str,
    value: &str,
) -> Result<Option<Account>, AppError> {
    let mut tx = pool.begin().await?;

    let sql = format!("SELECT * FROM accounts WHERE {column} = ? LIMIT 1");
    let row = sqlx::query_as::<_, AccountRow>(&sql)
        .bind(value)
        .fetch_optional(&mut *tx)
        .await?;

    let account = match row {
        Some(row) => {
            let (followers, following) = load_relations(&mut *tx, &row.id).await?;
            Some(row.into_account(followers, following))
        }
        None => None,
    };

    tx.commit().await?;
    Ok(account)
}

async fn change_relation_in(
    conn: &mut SqliteConnection,
    account_id: &str,
    relation: Relation,
    peer_id: &str,
    insert: bool,
) -> Result<SetUpdate, AppError> {
    let exists = sqlx::query_scalar::<_, i64>("SELECT 1 FROM accounts WHERE id = ?")
        .bind(account_id)
        .fetch_optional(&mut *conn)
        .await?;
    if exists.is_none() {
        return Ok(SetUpdate::MissingAccount);
    }

    let changed = if insert {
        sqlx::query(
            "INSERT OR IGNORE INTO account_relations (account_id, relation, peer_id, created_at) VALUES (?, ?, ?, ?)",
        )
        .bind(account_id)
        .bind(relation.as_str())
        .bind(peer_id)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?
        .rows_affected()
    } else {
        sqlx::query(
            "DELETE FROM account_relations WHERE account_id = ? AND relation = ? AND peer_id = ?",
        )
        .bind(account_id)
        .bind(relation.as_str())
        .bind(peer_id)
        .execute(&mut *conn)
        .await?
        .rows_affected()
    };

    if changed == 0 {
        return Ok(SetUpdate::Unchanged);
    }

    // Recount rather than apply a delta so the cached value always matches
    // the set, even if it had drifted before.
    let sql = format!(
        r#"
        UPDATE accounts
        SET {col} = (
            SELECT COUNT(*) FROM account_relations WHERE account_id = ? AND relation = ?
        ),
        updated_at = ?
        WHERE id = ?
        "#,
        col = relation.count_column()
    );
    sqlx::query(&sql)
        .bind(account_id)
        .bind(relation.as_str())
        .bind(Utc::now())
        .bind(account_id)
        .execute(&mut *conn)
        .await?;

    Ok(SetUpdate::Applied)
}

#[async_trait]
impl AccountStore for Database {
    async fn find_by_id(&self, id: &str) -> Result<Option<Account>, AppError> {
        load_account(&self.pool, "id", id).await
    }

    async fn find_one(&self, filter: &AccountFilter) -> Result<Option<Account>, AppError> {
        match filter {
            AccountFilter::Id(id) => self.find_by_id(id).await,
            AccountFilter::Email(email) => load_account(&self.pool, "email", email).await,
        }
    }

    async fn create(&self, account: &Account) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        let inserted = sqlx::query(
            r#"
            INSERT OR IGNORE INTO accounts (
                id, name, email, password_hash, dob,
                followers_count, following_count, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&account.id)
        .bind(&account.name)
        .bind(&account.email)
        .bind(&account.password_hash)
        .bind(account.dob)
        .bind(account.followers.len() as i64)
        .bind(account.following.len() as i64)
        .bind(account.created_at)
        .bind(account.updated_at)
        .execute(&mut *tx)
        .await?;

        if inserted.rows_affected() == 0 {
            tx.rollback().await?;
            return Ok(false);
        }

        for relation in [Relation::Followers, Relation::Following] {
            for peer_id in account.relation(relation) {
                sqlx::query(
                    "INSERT INTO account_relations (account_id, relation, peer_id, created_at) VALUES (?, ?, ?, ?)",
                )
                .bind(&account.id)
                .bind(relation.as_str())
                .bind(peer_id)
                .bind(account.created_at)
                .execute(&mut *tx)
                .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    async fn update_fields(
        &self,
        id: &str,
        patch: &AccountPatch,
    ) -> Result<Option<Account>, AppError> {
        if patch.is_empty() {
            return self.find_by_id(id).await;
        }

        let mut builder = QueryBuilder::<Sqlite>::new("UPDATE accounts SET updated_at = ");
        builder.push_bind(Utc::now());
        if let Some(name) = &patch.name {
            builder.push(", name = ").push_bind(name);
        }
        if let Some(dob) = patch.dob {
            builder.push(", dob = ").push_bind(dob);
        }
        if let Some(password_hash) = &patch.password_hash {
            builder.push(", password_hash = ").push_bind(password_hash);
        }
        builder.push(" WHERE id = ").push_bind(id);

        let result = builder.build().execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.find_by_id(id).await
    }

    async fn delete(&self, id: &str) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM account_relations WHERE account_id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        let deleted = sqlx::query("DELETE FROM accounts WHERE id = ?")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(deleted.rows_affected() == 1)
    }

    async fn add_to_relation(
        &self,
        id: &str,
        relation: Relation,
        peer_id: &str,
    ) -> Result<SetUpdate, AppError> {
        self.change_relation(id, relation, peer_id, true).await
    }

    async fn remove_from_relation(
        &self,
        id: &str,
        relation: Relation,
        peer_id: &str,
    ) -> Result<SetUpdate, AppError> {
        self.change_relation(id, relation, peer_id, false).await
    }
}
