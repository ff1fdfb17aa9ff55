use crate::sqlite_column;
use crate::sqlite_persistence::{
    Column, SqlType, Table, VersionedSchema, BASE_DB_VERSION, DEFAULT_TIMESTAMP,
};
use crate::user::auth::StatsHasher;
use crate::user::*;
use anyhow::{bail, Context, Result};
use rusqlite::{params, Connection, OptionalExtension};
use std::{
    path::Path,
    str::FromStr,
    sync::{Arc, Mutex},
    time::{Duration, SystemTime, UNIX_EPOCH},
};
use tracing::info;

/// V 0
const USER_TABLE_V_0: Table = Table {
    name: "user",
    columns: &[
        sqlite_column!(
            "id",
            &SqlType::Integer,
            is_primary_key = true,
            is_unique = true
        ),
        sqlite_column!("handle", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[],
    indices: &[("idx_user_handle", "handle")],
};
const AUTH_TOKEN_TABLE_V_0: Table = Table {
    name: "auth_token",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("value", &SqlType::Text, non_null = true, is_unique = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[("idx_auth_token_value", "value")],
};
const USER_PASSWORD_CREDENTIALS_V_0: Table = Table {
    name: "user_password_credentials",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("salt", &SqlType::Text, non_null = true),
        sqlite_column!("hash", &SqlType::Text, non_null = true),
        sqlite_column!("hasher", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
        sqlite_column!("last_tried", &SqlType::Integer),
        sqlite_column!("last_used", &SqlType::Integer),
    ],
    unique_constraints: &[],
    indices: &[],
};
const USER_ROLE_TABLE_V_0: Table = Table {
    name: "user_role",
    columns: &[
        sqlite_column!("user_id", &SqlType::Integer, non_null = true),
        sqlite_column!("role", &SqlType::Text, non_null = true),
        sqlite_column!(
            "created",
            &SqlType::Integer,
            default_value = Some(DEFAULT_TIMESTAMP)
        ),
    ],
    unique_constraints: &[&["user_id", "role"]],
    indices: &[("idx_user_role_user_id", "user_id")],
};

pub const VERSIONED_SCHEMAS: &[VersionedSchema] = &[VersionedSchema {
    version: 0,
    tables: &[
        USER_TABLE_V_0,
        AUTH_TOKEN_TABLE_V_0,
        USER_PASSWORD_CREDENTIALS_V_0,
        USER_ROLE_TABLE_V_0,
    ],
    migration: None,
}];

fn to_unix_seconds(time: SystemTime) -> i64 {
    time.duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

fn from_unix_seconds(seconds: i64) -> SystemTime {
    UNIX_EPOCH + Duration::from_secs(seconds.max(0) as u64)
}

#[derive(Clone, Debug)]
pub struct SqliteUserStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteUserStore {
    pub fn new<T: AsRef<Path>>(db_path: T) -> Result<Self> {
        let conn = if db_path.as_ref().exists() {
            Connection::open_with_flags(
                db_path,
                rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                    | rusqlite::OpenFlags::SQLITE_OPEN_URI
                    | rusqlite::OpenFlags::SQLITE_OPEN_NO_MUTEX,
            )?
        } else {
            let conn = Connection::open(db_path)?;
            VERSIONED_SCHEMAS.last().unwrap().create(&conn)?;
            conn
        };

        // Read the database version
        let db_version = conn
            .query_row("PRAGMA user_version;", [], |row| row.get::<usize, i64>(0))
            .context("Failed to read database version")?
            - BASE_DB_VERSION as i64;

        if db_version < 0 {
            bail!(
                "Database version {} is too old, does not contain base db version {}",
                db_version,
                BASE_DB_VERSION
            );
        }
        let version = db_version as usize;

        if db_version >= VERSIONED_SCHEMAS.len() as i64 {
            bail!("Database version {} is too new", db_version);
        } else {
            VERSIONED_SCHEMAS
                .get(version)
                .context("Failed to get schema")?
                .validate(&conn)?;
        }

        Self::migrate_if_needed(&conn, version)?;

        Ok(SqliteUserStore {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn migrate_if_needed(conn: &Connection, version: usize) -> Result<()> {
        let mut latest_from = version;
        for schema in VERSIONED_SCHEMAS.iter().skip(version + 1) {
            if let Some(migration_fn) = schema.migration {
                info!(
                    "Migrating user db from version {} to {}",
                    latest_from, schema.version
                );
                migration_fn(conn)?;
                latest_from = schema.version;
            }
        }
        conn.execute(
            &format!("PRAGMA user_version = {}", BASE_DB_VERSION + latest_from),
            [],
        )?;

        Ok(())
    }
}

impl UserStore for SqliteUserStore {
    fn create_user(&self, user_handle: &str) -> Result<usize> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!("INSERT INTO {} (handle) VALUES (?1)", USER_TABLE_V_0.name),
            params![user_handle],
        )
        .with_context(|| format!("Failed to create user {}", user_handle))?;
        Ok(conn.last_insert_rowid() as usize)
    }

    fn get_user_handle(&self, user_id: usize) -> Result<Option<String>> {
        let conn = self.conn.lock().unwrap();
        let handle = conn
            .query_row(
                &format!("SELECT handle FROM {} WHERE id = ?1", USER_TABLE_V_0.name),
                params![user_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(handle)
    }

    fn get_all_user_handles(&self) -> Result<Vec<String>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT handle FROM {} ORDER BY id",
            USER_TABLE_V_0.name
        ))?;
        let handles = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(handles)
    }

    fn get_user_id(&self, user_handle: &str) -> Result<Option<usize>> {
        let conn = self.conn.lock().unwrap();
        let id = conn
            .query_row(
                &format!("SELECT id FROM {} WHERE handle = ?1", USER_TABLE_V_0.name),
                params![user_handle],
                |row| row.get::<_, i64>(0),
            )
            .optional()?;
        Ok(id.map(|id| id as usize))
    }

    fn get_user_roles(&self, user_id: usize) -> Result<Vec<UserRole>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT role FROM {} WHERE user_id = ?1 ORDER BY created",
            USER_ROLE_TABLE_V_0.name
        ))?;
        let names = stmt
            .query_map(params![user_id], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<String>, _>>()?;

        let mut roles = Vec::with_capacity(names.len());
        for name in names {
            match UserRole::from_str(&name) {
                Some(role) => roles.push(role),
                None => bail!("Unknown role {} stored for user {}", name, user_id),
            }
        }
        Ok(roles)
    }

    fn add_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT OR IGNORE INTO {} (user_id, role) VALUES (?1, ?2)",
                USER_ROLE_TABLE_V_0.name
            ),
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }

    fn remove_user_role(&self, user_id: usize, role: UserRole) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1 AND role = ?2",
                USER_ROLE_TABLE_V_0.name
            ),
            params![user_id, role.as_str()],
        )?;
        Ok(())
    }

    fn resolve_user_permissions(&self, user_id: usize) -> Result<Vec<Permission>> {
        let mut permissions: Vec<Permission> = Vec::new();
        for role in self.get_user_roles(user_id)? {
            for permission in role.permissions() {
                if !permissions.contains(permission) {
                    permissions.push(*permission);
                }
            }
        }
        Ok(permissions)
    }
}

impl UserAuthCredentialsStore for SqliteUserStore {
    fn get_user_auth_credentials(&self, user_handle: &str) -> Result<Option<UserAuthCredentials>> {
        let user_id = match self.get_user_id(user_handle)? {
            Some(id) => id,
            None => return Ok(None),
        };

        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                &format!(
                    "SELECT salt, hash, hasher, created, last_tried, last_used FROM {} WHERE user_id = ?1",
                    USER_PASSWORD_CREDENTIALS_V_0.name
                ),
                params![user_id],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, Option<i64>>(4)?,
                        row.get::<_, Option<i64>>(5)?,
                    ))
                },
            )
            .optional()?;

        let username_password = match raw {
            None => None,
            Some((salt, hash, hasher, created, last_tried, last_used)) => {
                Some(UsernamePasswordCredentials {
                    user_id,
                    salt,
                    hash,
                    hasher: StatsHasher::from_str(&hasher)?,
                    created: from_unix_seconds(created),
                    last_tried: last_tried.map(from_unix_seconds),
                    last_used: last_used.map(from_unix_seconds),
                })
            }
        };

        Ok(Some(UserAuthCredentials {
            user_id,
            username_password,
        }))
    }

    fn update_user_auth_credentials(&self, credentials: UserAuthCredentials) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "DELETE FROM {} WHERE user_id = ?1",
                USER_PASSWORD_CREDENTIALS_V_0.name
            ),
            params![credentials.user_id],
        )?;

        if let Some(pw) = credentials.username_password {
            conn.execute(
                &format!(
                    "INSERT INTO {} (user_id, salt, hash, hasher, created, last_tried, last_used) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                    USER_PASSWORD_CREDENTIALS_V_0.name
                ),
                params![
                    pw.user_id,
                    pw.salt,
                    pw.hash,
                    pw.hasher.to_string(),
                    to_unix_seconds(pw.created),
                    pw.last_tried.map(to_unix_seconds),
                    pw.last_used.map(to_unix_seconds),
                ],
            )?;
        }
        Ok(())
    }
}

impl UserAuthTokenStore for SqliteUserStore {
    fn get_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let conn = self.conn.lock().unwrap();
        let raw = conn
            .query_row(
                &format!(
                    "SELECT user_id, value, created, last_used FROM {} WHERE value = ?1",
                    AUTH_TOKEN_TABLE_V_0.name
                ),
                params![token.0],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, i64>(2)?,
                        row.get::<_, Option<i64>>(3)?,
                    ))
                },
            )
            .optional()?;

        Ok(raw.map(|(user_id, value, created, last_used)| AuthToken {
            user_id: user_id as usize,
            created: from_unix_seconds(created),
            last_used: last_used.map(from_unix_seconds),
            value: AuthTokenValue(value),
        }))
    }

    fn delete_user_auth_token(&self, token: &AuthTokenValue) -> Result<Option<AuthToken>> {
        let existing = self.get_user_auth_token(token)?;
        if existing.is_some() {
            let conn = self.conn.lock().unwrap();
            conn.execute(
                &format!(
                    "DELETE FROM {} WHERE value = ?1",
                    AUTH_TOKEN_TABLE_V_0.name
                ),
                params![token.0],
            )?;
        }
        Ok(existing)
    }

    fn update_user_auth_token_last_used_timestamp(&self, token: &AuthTokenValue) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "UPDATE {} SET last_used = ?1 WHERE value = ?2",
                AUTH_TOKEN_TABLE_V_0.name
            ),
            params![to_unix_seconds(SystemTime::now()), token.0],
        )?;
        Ok(())
    }

    fn add_user_auth_token(&self, token: AuthToken) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            &format!(
                "INSERT INTO {} (user_id, value, created, last_used) VALUES (?1, ?2, ?3, ?4)",
                AUTH_TOKEN_TABLE_V_0.name
            ),
            params![
                token.user_id,
                token.value.0,
                to_unix_seconds(token.created),
                token.last_used.map(to_unix_seconds),
            ],
        )?;
        Ok(())
    }

    fn get_all_user_auth_tokens(&self, user_handle: &str) -> Result<Vec<AuthToken>> {
        let user_id = match self.get_user_id(user_handle)? {
            Some(id) => id,
            None => return Ok(vec![]),
        };

        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(&format!(
            "SELECT user_id, value, created, last_used FROM {} WHERE user_id = ?1 ORDER BY created",
            AUTH_TOKEN_TABLE_V_0.name
        ))?;
        let tokens = stmt
            .query_map(params![user_id], |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(tokens
            .into_iter()
            .map(|(user_id, value, created, last_used)| AuthToken {
                user_id: user_id as usize,
                created: from_unix_seconds(created),
                last_used: last_used.map(from_unix_seconds),
                value: AuthTokenValue(value),
            })
            .collect())
    }

    fn prune_unused_auth_tokens(&self, unused_for_days: u64) -> Result<usize> {
        let cutoff = to_unix_seconds(SystemTime::now()) - (unused_for_days as i64 * 24 * 60 * 60);
        let conn = self.conn.lock().unwrap();
        let deleted = conn.execute(
            &format!(
                "DELETE FROM {} WHERE COALESCE(last_used, created) < ?1",
                AUTH_TOKEN_TABLE_V_0.name
            ),
            params![cutoff],
        )?;
        Ok(deleted)
    }
}
