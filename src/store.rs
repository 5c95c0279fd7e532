//! Persistence for documents and user accounts.
//!
//! Handlers talk to the [`Store`] trait; [`SqliteStore`] is the only backend.
//! Every document query that can leak or mutate data is scoped by owner.
//!
//! | Method | Purpose |
//! |--------|---------|
//! | [`insert_document`](Store::insert_document) | Persist a freshly extracted document |
//! | [`find_document`](Store::find_document) | One document, owner-scoped |
//! | [`list_documents`](Store::list_documents) | Owner's documents, newest first |
//! | [`update_rules`](Store::update_rules) | Replace a rule-set, owner-scoped |
//! | [`delete_document`](Store::delete_document) | Delete, owner-scoped |
//! | [`count_documents`](Store::count_documents) | Total rows, all owners |
//! | [`insert_user`](Store::insert_user) | Register; `false` if the email is taken |

use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqlitePool};

use crate::models::{Document, Rule, User};

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_document(&self, doc: &Document) -> Result<()>;

    async fn find_document(&self, id: &str, owner_id: &str) -> Result<Option<Document>>;

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>>;

    /// Returns `false` when no row matched `(id, owner_id)`.
    async fn update_rules(&self, id: &str, owner_id: &str, rules: &[Rule]) -> Result<bool>;

    /// Returns the number of rows removed (0 or 1).
    async fn delete_document(&self, id: &str, owner_id: &str) -> Result<u64>;

    async fn count_documents(&self) -> Result<i64>;

    async fn insert_user(&self, user: &User) -> Result<bool>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>>;

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>>;

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<bool>;
}

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

const DOCUMENT_COLUMNS: &str = "id, name, description, source_file_name, source_file_path, owner_id, created_at, extracted_rules";

fn document_from_row(row: &SqliteRow) -> Result<Document> {
    let id: String = row.get("id");
    let rules_json: String = row.get("extracted_rules");
    let extracted_rules: Vec<Rule> = serde_json::from_str(&rules_json)
        .with_context(|| format!("stored rules for document {} are not valid JSON", id))?;

    Ok(Document {
        id,
        name: row.get("name"),
        description: row.get("description"),
        source_file_name: row.get("source_file_name"),
        source_file_path: row.get("source_file_path"),
        owner_id: row.get("owner_id"),
        created_at: row.get("created_at"),
        extracted_rules,
    })
}

fn user_from_row(row: &SqliteRow) -> User {
    User {
        id: row.get("id"),
        name: row.get("name"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        created_at: row.get("created_at"),
    }
}

#[async_trait]
impl Store for SqliteStore {
    async fn insert_document(&self, doc: &Document) -> Result<()> {
        let rules_json = serde_json::to_string(&doc.extracted_rules)?;
        sqlx::query(
            r#"
            INSERT INTO documents (id, name, description, source_file_name, source_file_path,
                                   owner_id, created_at, extracted_rules)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&doc.id)
        .bind(&doc.name)
        .bind(&doc.description)
        .bind(&doc.source_file_name)
        .bind(&doc.source_file_path)
        .bind(&doc.owner_id)
        .bind(doc.created_at)
        .bind(rules_json)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_document(&self, id: &str, owner_id: &str) -> Result<Option<Document>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE id = ? AND owner_id = ?",
            DOCUMENT_COLUMNS
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(document_from_row).transpose()
    }

    async fn list_documents(&self, owner_id: &str) -> Result<Vec<Document>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM documents WHERE owner_id = ? ORDER BY created_at DESC, rowid DESC",
            DOCUMENT_COLUMNS
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(document_from_row).collect()
    }

    async fn update_rules(&self, id: &str, owner_id: &str, rules: &[Rule]) -> Result<bool> {
        let rules_json = serde_json::to_string(rules)?;
        let result =
            sqlx::query("UPDATE documents SET extracted_rules = ? WHERE id = ? AND owner_id = ?")
                .bind(rules_json)
                .bind(id)
                .bind(owner_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_document(&self, id: &str, owner_id: &str) -> Result<u64> {
        let result = sqlx::query("DELETE FROM documents WHERE id = ? AND owner_id = ?")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn count_documents(&self) -> Result<i64> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM documents")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.get("n"))
    }

    async fn insert_user(&self, user: &User) -> Result<bool> {
        let result = sqlx::query(
            r#"
            INSERT INTO users (id, name, email, password_hash, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(email) DO NOTHING
            "#,
        )
        .bind(&user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.created_at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE email = ?",
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn find_user_by_id(&self, id: &str) -> Result<Option<User>> {
        let row = sqlx::query(
            "SELECT id, name, email, password_hash, created_at FROM users WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.as_ref().map(user_from_row))
    }

    async fn update_password(&self, user_id: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query("UPDATE users SET password_hash = ? WHERE id = ?")
            .bind(password_hash)
            .bind(user_id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
