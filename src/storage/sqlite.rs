//! SQLite storage backend using sqlx
//!
//! Provides [`SqliteDataService<T>`] and [`SqliteAssignmentService`] over one
//! shared [`SqliteStore`] pool.
//!
//! # Feature flag
//!
//! Requires the `sqlite` feature (enabled by default).
//!
//! # Schema
//!
//! One table per entity with a column per field, plus the two linking tables.
//! Emails, SKUs, VINs and link pairs carry `UNIQUE` constraints. Link rows
//! reference both sides with `ON DELETE CASCADE`, so deleting a mechanic,
//! part or ticket detaches its assignments. Every multi-step operation runs
//! in one transaction.

use std::marker::PhantomData;
use std::str::FromStr;

use anyhow::Context;
use async_trait::async_trait;
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions, SqliteRow,
};
use sqlx::{Row, SqliteConnection};
use uuid::Uuid;

use crate::core::entity::Entity;
use crate::core::error::{EntityError, WorkshopError, WorkshopResult};
use crate::core::query::{Page, QueryParams, paginate};
use crate::core::service::{DataService, Mutation};
use crate::core::store::select;
use crate::entities::customer::Customer;
use crate::entities::mechanic::{Mechanic, RankedMechanic};
use crate::entities::part::Part;
use crate::entities::ticket::{ServiceTicket, TicketEdit, TicketView};
use crate::links::AssignmentService;

type SqliteQuery<'q> = Query<'q, Sqlite, SqliteArguments<'q>>;

const SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS customers (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT NOT NULL,
        address TEXT NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS mechanics (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        email TEXT NOT NULL UNIQUE,
        phone TEXT NOT NULL,
        address TEXT NOT NULL,
        specialty TEXT NOT NULL,
        salary REAL NOT NULL,
        password_hash TEXT NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS parts (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        name TEXT NOT NULL,
        sku TEXT NOT NULL UNIQUE,
        description TEXT,
        price REAL NOT NULL,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS service_tickets (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        id TEXT NOT NULL UNIQUE,
        description TEXT NOT NULL,
        customer_id TEXT NOT NULL REFERENCES customers(id),
        vin TEXT UNIQUE,
        created_at TEXT NOT NULL,
        updated_at TEXT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_service_tickets_customer ON service_tickets(customer_id)",
    r#"
    CREATE TABLE IF NOT EXISTS ticket_mechanics (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id TEXT NOT NULL REFERENCES service_tickets(id) ON DELETE CASCADE,
        mechanic_id TEXT NOT NULL REFERENCES mechanics(id) ON DELETE CASCADE,
        UNIQUE (ticket_id, mechanic_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ticket_mechanics_mechanic ON ticket_mechanics(mechanic_id)",
    r#"
    CREATE TABLE IF NOT EXISTS ticket_parts (
        seq INTEGER PRIMARY KEY AUTOINCREMENT,
        ticket_id TEXT NOT NULL REFERENCES service_tickets(id) ON DELETE CASCADE,
        part_id TEXT NOT NULL REFERENCES parts(id) ON DELETE CASCADE,
        UNIQUE (ticket_id, part_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_ticket_parts_part ON ticket_parts(part_id)",
];

/// Shared handle to a SQLite connection pool
#[derive(Clone, Debug)]
pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if missing) the database at `url` and ensure the schema
    pub async fn connect(url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let options = SqliteConnectOptions::from_str(url)
            .with_context(|| format!("invalid database url '{url}'"))?
            .create_if_missing(true)
            .foreign_keys(true);

        let in_memory = url.contains(":memory:") || url.contains("mode=memory");
        let pool = if in_memory {
            // every new connection to `:memory:` opens an empty database
            SqlitePoolOptions::new()
                .max_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
                .connect_with(options)
                .await
        } else {
            SqlitePoolOptions::new()
                .max_connections(max_connections.max(1))
                .connect_with(options.journal_mode(SqliteJournalMode::Wal))
                .await
        }
        .with_context(|| format!("failed to open database '{url}'"))?;

        ensure_schema(&pool).await?;
        tracing::info!(%url, "sqlite database ready");
        Ok(Self { pool })
    }

    /// A private in-memory database
    pub async fn in_memory() -> anyhow::Result<Self> {
        Self::connect("sqlite::memory:", 1).await
    }
}

async fn ensure_schema(pool: &SqlitePool) -> anyhow::Result<()> {
    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .context("failed to create schema")?;
    }
    Ok(())
}

/// An entity with its own SQLite table
///
/// Carries the column mapping and the per-table policies: which references
/// must resolve on write and which rows block a delete.
pub trait SqlTable: Entity {
    const TABLE: &'static str;

    /// Written columns in bind order, `id` first
    const COLUMNS: &'static [&'static str];

    /// Columns `search` may match on
    const SEARCHABLE: &'static [&'static str];

    /// Rows elsewhere that refuse a delete: `(table, column, label)`
    const BLOCKED_BY: Option<(&'static str, &'static str, &'static str)> = None;

    /// Bind every column of [`Self::COLUMNS`], in order
    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q>;

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self>;

    /// Rows this one points at: `(id, table, entity type)`
    fn references(&self) -> Vec<(Uuid, &'static str, &'static str)> {
        Vec::new()
    }
}

fn uuid_column(row: &SqliteRow, column: &str) -> sqlx::Result<Uuid> {
    let text: String = row.try_get(column)?;
    Uuid::parse_str(&text).map_err(|e| sqlx::Error::ColumnDecode {
        index: column.to_string(),
        source: Box::new(e),
    })
}

impl SqlTable for Customer {
    const TABLE: &'static str = "customers";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "phone",
        "address",
        "password_hash",
        "created_at",
        "updated_at",
    ];
    const SEARCHABLE: &'static [&'static str] = &["id", "name", "email", "phone", "address"];
    const BLOCKED_BY: Option<(&'static str, &'static str, &'static str)> =
        Some(("service_tickets", "customer_id", "service tickets"));

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(self.name.clone())
            .bind(self.email.clone())
            .bind(self.phone.clone())
            .bind(self.address.clone())
            .bind(self.password_hash.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl SqlTable for Mechanic {
    const TABLE: &'static str = "mechanics";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "email",
        "phone",
        "address",
        "specialty",
        "salary",
        "password_hash",
        "created_at",
        "updated_at",
    ];
    const SEARCHABLE: &'static [&'static str] =
        &["id", "name", "email", "phone", "address", "specialty"];

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(self.name.clone())
            .bind(self.email.clone())
            .bind(self.phone.clone())
            .bind(self.address.clone())
            .bind(self.specialty.clone())
            .bind(self.salary)
            .bind(self.password_hash.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            name: row.try_get("name")?,
            email: row.try_get("email")?,
            phone: row.try_get("phone")?,
            address: row.try_get("address")?,
            specialty: row.try_get("specialty")?,
            salary: row.try_get("salary")?,
            password_hash: row.try_get("password_hash")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl SqlTable for Part {
    const TABLE: &'static str = "parts";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "name",
        "sku",
        "description",
        "price",
        "created_at",
        "updated_at",
    ];
    const SEARCHABLE: &'static [&'static str] = &["id", "name", "sku", "description"];

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(self.name.clone())
            .bind(self.sku.clone())
            .bind(self.description.clone())
            .bind(self.price)
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            name: row.try_get("name")?,
            sku: row.try_get("sku")?,
            description: row.try_get("description")?,
            price: row.try_get("price")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

impl SqlTable for ServiceTicket {
    const TABLE: &'static str = "service_tickets";
    const COLUMNS: &'static [&'static str] = &[
        "id",
        "description",
        "customer_id",
        "vin",
        "created_at",
        "updated_at",
    ];
    const SEARCHABLE: &'static [&'static str] = &["id", "description", "customer_id", "vin"];

    fn bind_columns<'q>(&self, query: SqliteQuery<'q>) -> SqliteQuery<'q> {
        query
            .bind(self.id.to_string())
            .bind(self.description.clone())
            .bind(self.customer_id.to_string())
            .bind(self.vin.clone())
            .bind(self.created_at)
            .bind(self.updated_at)
    }

    fn from_row(row: &SqliteRow) -> sqlx::Result<Self> {
        Ok(Self {
            id: uuid_column(row, "id")?,
            description: row.try_get("description")?,
            customer_id: uuid_column(row, "customer_id")?,
            vin: row.try_get("vin")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn references(&self) -> Vec<(Uuid, &'static str, &'static str)> {
        vec![(
            self.customer_id,
            Customer::TABLE,
            Customer::resource_name_singular(),
        )]
    }
}

async fn fetch_row<T: SqlTable>(conn: &mut SqliteConnection, id: Uuid) -> WorkshopResult<Option<T>> {
    let sql = format!("SELECT * FROM {} WHERE id = ?", T::TABLE);
    let row = sqlx::query(&sql)
        .bind(id.to_string())
        .fetch_optional(&mut *conn)
        .await?;
    Ok(row.as_ref().map(T::from_row).transpose()?)
}

async fn require_row<T: SqlTable>(conn: &mut SqliteConnection, id: Uuid) -> WorkshopResult<T> {
    fetch_row::<T>(conn, id)
        .await?
        .ok_or_else(|| WorkshopError::not_found(T::resource_name_singular(), id))
}

async fn require_exists(
    conn: &mut SqliteConnection,
    table: &str,
    entity_type: &str,
    id: Uuid,
) -> WorkshopResult<()> {
    let sql = format!("SELECT COUNT(*) FROM {table} WHERE id = ?");
    let found: i64 = sqlx::query_scalar(&sql)
        .bind(id.to_string())
        .fetch_one(&mut *conn)
        .await?;
    if found == 0 {
        return Err(WorkshopError::not_found(entity_type, id));
    }
    Ok(())
}

async fn require_all<T: SqlTable>(conn: &mut SqliteConnection, ids: &[Uuid]) -> WorkshopResult<()> {
    for id in ids {
        require_exists(&mut *conn, T::TABLE, T::resource_name_singular(), *id).await?;
    }
    Ok(())
}

/// Resolve references and unique fields before a write
///
/// The schema constraints would reject the same rows; checking first keeps
/// the error naming the offending value.
async fn check_row<T: SqlTable>(conn: &mut SqliteConnection, entity: &T) -> WorkshopResult<()> {
    for (id, table, entity_type) in entity.references() {
        require_exists(&mut *conn, table, entity_type, id).await?;
    }
    for field in T::unique_fields() {
        let Some(value) = entity.field_value(field) else {
            continue;
        };
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {field} = ? AND id <> ?", T::TABLE);
        let taken: i64 = sqlx::query_scalar(&sql)
            .bind(value.clone())
            .bind(entity.id().to_string())
            .fetch_one(&mut *conn)
            .await?;
        if taken > 0 {
            return Err(EntityError::AlreadyExists {
                entity_type: T::resource_name_singular().to_string(),
                field: field.to_string(),
                value,
            }
            .into());
        }
    }
    Ok(())
}

async fn insert_row<T: SqlTable>(conn: &mut SqliteConnection, entity: &T) -> WorkshopResult<()> {
    check_row(&mut *conn, entity).await?;
    let placeholders = vec!["?"; T::COLUMNS.len()].join(", ");
    let sql = format!(
        "INSERT INTO {} ({}) VALUES ({placeholders})",
        T::TABLE,
        T::COLUMNS.join(", ")
    );
    entity.bind_columns(sqlx::query(&sql)).execute(&mut *conn).await?;
    Ok(())
}

async fn write_row<T: SqlTable>(conn: &mut SqliteConnection, entity: &T) -> WorkshopResult<()> {
    check_row(&mut *conn, entity).await?;
    let assignments = T::COLUMNS
        .iter()
        .map(|column| format!("{column} = ?"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("UPDATE {} SET {assignments} WHERE id = ?", T::TABLE);
    entity
        .bind_columns(sqlx::query(&sql))
        .bind(entity.id().to_string())
        .execute(&mut *conn)
        .await?;
    Ok(())
}

/// Generic [`DataService`] over one table of a [`SqliteStore`]
pub struct SqliteDataService<T> {
    pool: SqlitePool,
    _entity: PhantomData<fn() -> T>,
}

impl<T> SqliteDataService<T> {
    pub fn new(store: &SqliteStore) -> Self {
        Self {
            pool: store.pool.clone(),
            _entity: PhantomData,
        }
    }
}

impl<T> Clone for SqliteDataService<T> {
    fn clone(&self) -> Self {
        Self {
            pool: self.pool.clone(),
            _entity: PhantomData,
        }
    }
}

#[async_trait]
impl<T: SqlTable> DataService<T> for SqliteDataService<T> {
    async fn create(&self, entity: T) -> WorkshopResult<T> {
        let mut tx = self.pool.begin().await?;
        insert_row(&mut tx, &entity).await?;
        tx.commit().await?;
        tracing::info!(
            entity = T::resource_name_singular(),
            id = %entity.id(),
            "created"
        );
        Ok(entity)
    }

    async fn get(&self, id: &Uuid) -> WorkshopResult<Option<T>> {
        let mut conn = self.pool.acquire().await?;
        fetch_row(&mut conn, *id).await
    }

    async fn list(&self, params: &QueryParams) -> WorkshopResult<Page<T>> {
        let sql = format!("SELECT * FROM {} ORDER BY seq", T::TABLE);
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        let rows = rows
            .iter()
            .map(T::from_row)
            .collect::<sqlx::Result<Vec<_>>>()?;
        tracing::debug!(entity = T::resource_name(), rows = rows.len(), "listing");
        Ok(paginate(select(rows, params), params))
    }

    async fn update(&self, id: &Uuid, mutation: Mutation<T>) -> WorkshopResult<T> {
        let mut tx = self.pool.begin().await?;
        let mut entity = require_row::<T>(&mut tx, *id).await?;
        mutation(&mut entity)?;
        entity.touch();
        write_row(&mut tx, &entity).await?;
        tx.commit().await?;
        tracing::info!(entity = T::resource_name_singular(), id = %id, "updated");
        Ok(entity)
    }

    async fn delete(&self, id: &Uuid) -> WorkshopResult<()> {
        let mut tx = self.pool.begin().await?;
        require_exists(&mut tx, T::TABLE, T::resource_name_singular(), *id).await?;
        if let Some((table, column, dependents)) = T::BLOCKED_BY {
            let sql = format!("SELECT COUNT(*) FROM {table} WHERE {column} = ?");
            let count: i64 = sqlx::query_scalar(&sql)
                .bind(id.to_string())
                .fetch_one(&mut *tx)
                .await?;
            if count > 0 {
                return Err(EntityError::HasDependents {
                    entity_type: T::resource_name_singular().to_string(),
                    id: *id,
                    dependents: dependents.to_string(),
                    count: count as usize,
                }
                .into());
            }
        }
        let sql = format!("DELETE FROM {} WHERE id = ?", T::TABLE);
        sqlx::query(&sql)
            .bind(id.to_string())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(entity = T::resource_name_singular(), id = %id, "deleted");
        Ok(())
    }

    async fn search(&self, field: &str, value: &str) -> WorkshopResult<Vec<T>> {
        if !T::SEARCHABLE.contains(&field) {
            return Ok(Vec::new());
        }
        let sql = format!("SELECT * FROM {} WHERE {field} = ? ORDER BY seq", T::TABLE);
        let rows = sqlx::query(&sql)
            .bind(value.to_string())
            .fetch_all(&self.pool)
            .await?;
        Ok(rows
            .iter()
            .map(T::from_row)
            .collect::<sqlx::Result<Vec<_>>>()?)
    }
}

/// One of the two ticket linking tables
struct LinkSpec {
    table: &'static str,
    column: &'static str,
}

const MECHANIC_LINKS: LinkSpec = LinkSpec {
    table: "ticket_mechanics",
    column: "mechanic_id",
};

const PART_LINKS: LinkSpec = LinkSpec {
    table: "ticket_parts",
    column: "part_id",
};

impl LinkSpec {
    /// Returns false if the pair was already present
    async fn link(&self, conn: &mut SqliteConnection, ticket_id: Uuid, other: Uuid) -> WorkshopResult<bool> {
        let sql = format!(
            "INSERT OR IGNORE INTO {} (ticket_id, {}) VALUES (?, ?)",
            self.table, self.column
        );
        let result = sqlx::query(&sql)
            .bind(ticket_id.to_string())
            .bind(other.to_string())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Returns false if the pair was absent
    async fn unlink(&self, conn: &mut SqliteConnection, ticket_id: Uuid, other: Uuid) -> WorkshopResult<bool> {
        let sql = format!(
            "DELETE FROM {} WHERE ticket_id = ? AND {} = ?",
            self.table, self.column
        );
        let result = sqlx::query(&sql)
            .bind(ticket_id.to_string())
            .bind(other.to_string())
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Linked rows of `T`, in link order
    async fn linked<T: SqlTable>(&self, conn: &mut SqliteConnection, ticket_id: Uuid) -> WorkshopResult<Vec<T>> {
        let sql = format!(
            "SELECT e.* FROM {link} l JOIN {table} e ON e.id = l.{column} \
             WHERE l.ticket_id = ? ORDER BY l.seq",
            link = self.table,
            table = T::TABLE,
            column = self.column,
        );
        let rows = sqlx::query(&sql)
            .bind(ticket_id.to_string())
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows
            .iter()
            .map(T::from_row)
            .collect::<sqlx::Result<Vec<_>>>()?)
    }
}

async fn view(conn: &mut SqliteConnection, ticket_id: Uuid) -> WorkshopResult<TicketView> {
    let ticket = require_row::<ServiceTicket>(&mut *conn, ticket_id).await?;
    let mechanics = MECHANIC_LINKS.linked(&mut *conn, ticket_id).await?;
    let parts = PART_LINKS.linked(&mut *conn, ticket_id).await?;
    Ok(TicketView {
        ticket,
        mechanics,
        parts,
    })
}

/// [`AssignmentService`] backed by a [`SqliteStore`]
#[derive(Clone, Debug)]
pub struct SqliteAssignmentService {
    pool: SqlitePool,
}

impl SqliteAssignmentService {
    pub fn new(store: &SqliteStore) -> Self {
        Self {
            pool: store.pool.clone(),
        }
    }
}

#[async_trait]
impl AssignmentService for SqliteAssignmentService {
    async fn create_ticket(
        &self,
        ticket: ServiceTicket,
        mechanic_ids: &[Uuid],
    ) -> WorkshopResult<TicketView> {
        let mut tx = self.pool.begin().await?;
        insert_row(&mut tx, &ticket).await?;
        require_all::<Mechanic>(&mut tx, mechanic_ids).await?;
        for mechanic_id in mechanic_ids {
            MECHANIC_LINKS.link(&mut tx, ticket.id, *mechanic_id).await?;
        }
        let view = view(&mut tx, ticket.id).await?;
        tx.commit().await?;
        tracing::info!(
            ticket_id = %view.ticket.id,
            mechanics = view.mechanics.len(),
            "created"
        );
        Ok(view)
    }

    async fn assign_mechanic(&self, ticket_id: &Uuid, mechanic_id: &Uuid) -> WorkshopResult<bool> {
        let mut tx = self.pool.begin().await?;
        require_all::<ServiceTicket>(&mut tx, &[*ticket_id]).await?;
        require_all::<Mechanic>(&mut tx, &[*mechanic_id]).await?;
        let added = MECHANIC_LINKS.link(&mut tx, *ticket_id, *mechanic_id).await?;
        tx.commit().await?;
        tracing::info!(%ticket_id, %mechanic_id, added, "assigned mechanic");
        Ok(added)
    }

    async fn remove_mechanic(&self, ticket_id: &Uuid, mechanic_id: &Uuid) -> WorkshopResult<bool> {
        let mut tx = self.pool.begin().await?;
        require_all::<ServiceTicket>(&mut tx, &[*ticket_id]).await?;
        require_all::<Mechanic>(&mut tx, &[*mechanic_id]).await?;
        let removed = MECHANIC_LINKS.unlink(&mut tx, *ticket_id, *mechanic_id).await?;
        tx.commit().await?;
        tracing::info!(%ticket_id, %mechanic_id, removed, "removed mechanic");
        Ok(removed)
    }

    async fn edit_ticket(&self, ticket_id: &Uuid, edit: TicketEdit) -> WorkshopResult<TicketView> {
        let mut tx = self.pool.begin().await?;
        let mut ticket = require_row::<ServiceTicket>(&mut tx, *ticket_id).await?;
        require_all::<Mechanic>(&mut tx, &edit.remove_ids).await?;
        require_all::<Mechanic>(&mut tx, &edit.add_ids).await?;

        if let Some(description) = &edit.description {
            ticket.description = description.trim().to_string();
        }
        ticket.touch();
        write_row(&mut tx, &ticket).await?;
        for mechanic_id in &edit.remove_ids {
            MECHANIC_LINKS.unlink(&mut tx, *ticket_id, *mechanic_id).await?;
        }
        for mechanic_id in &edit.add_ids {
            MECHANIC_LINKS.link(&mut tx, *ticket_id, *mechanic_id).await?;
        }
        let view = view(&mut tx, *ticket_id).await?;
        tx.commit().await?;
        tracing::info!(
            %ticket_id,
            added = edit.add_ids.len(),
            removed = edit.remove_ids.len(),
            "edited ticket"
        );
        Ok(view)
    }

    async fn add_parts(&self, ticket_id: &Uuid, part_ids: &[Uuid]) -> WorkshopResult<usize> {
        if part_ids.is_empty() {
            return Err(WorkshopError::invalid_field(
                "part_ids",
                "at least one part id is required",
            ));
        }
        let mut tx = self.pool.begin().await?;
        require_all::<ServiceTicket>(&mut tx, &[*ticket_id]).await?;
        require_all::<Part>(&mut tx, part_ids).await?;
        let mut added = 0;
        for part_id in part_ids {
            if PART_LINKS.link(&mut tx, *ticket_id, *part_id).await? {
                added += 1;
            }
        }
        tx.commit().await?;
        tracing::info!(%ticket_id, added, "added parts");
        Ok(added)
    }

    async fn remove_part(&self, ticket_id: &Uuid, part_id: &Uuid) -> WorkshopResult<bool> {
        let mut tx = self.pool.begin().await?;
        require_all::<ServiceTicket>(&mut tx, &[*ticket_id]).await?;
        require_all::<Part>(&mut tx, &[*part_id]).await?;
        let removed = PART_LINKS.unlink(&mut tx, *ticket_id, *part_id).await?;
        tx.commit().await?;
        tracing::info!(%ticket_id, %part_id, removed, "removed part");
        Ok(removed)
    }

    async fn list_parts(&self, ticket_id: &Uuid) -> WorkshopResult<Vec<Part>> {
        let mut conn = self.pool.acquire().await?;
        require_all::<ServiceTicket>(&mut conn, &[*ticket_id]).await?;
        PART_LINKS.linked(&mut conn, *ticket_id).await
    }

    async fn list_mechanics(&self, ticket_id: &Uuid) -> WorkshopResult<Vec<Mechanic>> {
        let mut conn = self.pool.acquire().await?;
        require_all::<ServiceTicket>(&mut conn, &[*ticket_id]).await?;
        MECHANIC_LINKS.linked(&mut conn, *ticket_id).await
    }

    async fn ticket_view(&self, ticket_id: &Uuid) -> WorkshopResult<TicketView> {
        let mut tx = self.pool.begin().await?;
        let view = view(&mut tx, *ticket_id).await?;
        tx.commit().await?;
        Ok(view)
    }

    async fn top_mechanics(&self) -> WorkshopResult<Vec<RankedMechanic>> {
        let rows = sqlx::query(
            "SELECT m.*, COUNT(l.ticket_id) AS ticket_count FROM mechanics m \
             LEFT JOIN ticket_mechanics l ON l.mechanic_id = m.id \
             GROUP BY m.seq ORDER BY ticket_count DESC, m.seq",
        )
        .fetch_all(&self.pool)
        .await?;
        let ranked = rows
            .iter()
            .map(|row| {
                let ticket_count: i64 = row.try_get("ticket_count")?;
                Ok(RankedMechanic {
                    mechanic: Mechanic::from_row(row)?,
                    ticket_count: ticket_count as usize,
                })
            })
            .collect::<sqlx::Result<Vec<_>>>()?;
        Ok(ranked)
    }
}
