//! User directory contracts and SQLite implementation.
//!
//! # Responsibility
//! - Register users and look them up by id or email.
//! - Answer "who has a birthday on date D" for the scheduler.
//!
//! # Invariants
//! - Emails are stored normalized (trimmed, lowercase) and unique.
//! - Birthday lookups compare month and day only.

use crate::db::DbError;
use crate::model::birthday::birthday_keys_for;
use crate::model::user::{
    normalize_email, NewUser, StoredCredentials, User, UserId, UserValidationError,
};
use chrono::NaiveDate;
use rusqlite::{
    params, params_from_iter, Connection, OptionalExtension, Row, Transaction, TransactionBehavior,
};
use std::error::Error;
use std::fmt::{Display, Formatter};

const USER_SELECT_SQL: &str = "SELECT
    id,
    name,
    email,
    date_of_birth
FROM users";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for user persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Validation(UserValidationError),
    /// Storage could not complete the operation.
    Db(DbError),
    EmailTaken(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::EmailTaken(email) => write!(f, "email already registered: {email}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::EmailTaken(_) => None,
        }
    }
}

impl From<UserValidationError> for RepoError {
    fn from(value: UserValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for the user directory.
pub trait UserRepository {
    fn create_user(&self, new_user: &NewUser) -> RepoResult<User>;
    fn get_user(&self, id: UserId) -> RepoResult<Option<User>>;
    fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<StoredCredentials>>;
    fn users_with_birthday_on(&self, date: NaiveDate) -> RepoResult<Vec<User>>;
}

/// SQLite-backed user directory.
pub struct SqliteUserRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteUserRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl UserRepository for SqliteUserRepository<'_> {
    fn create_user(&self, new_user: &NewUser) -> RepoResult<User> {
        let new_user = new_user.clone().normalized();
        new_user.validate()?;

        let tx = Transaction::new_unchecked(self.conn, TransactionBehavior::Immediate)?;
        let taken: i64 = tx.query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1);",
            [new_user.email.as_str()],
            |row| row.get(0),
        )?;
        if taken == 1 {
            return Err(RepoError::EmailTaken(new_user.email));
        }

        tx.execute(
            "INSERT INTO users (name, email, password_hash, date_of_birth)
             VALUES (?1, ?2, ?3, ?4);",
            params![
                new_user.name.as_str(),
                new_user.email.as_str(),
                new_user.password_hash.as_str(),
                new_user.date_of_birth,
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;

        Ok(User {
            id,
            name: new_user.name,
            email: new_user.email,
            date_of_birth: new_user.date_of_birth,
        })
    }

    fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let user = self
            .conn
            .query_row(
                &format!("{USER_SELECT_SQL} WHERE id = ?1;"),
                [id],
                parse_user_row,
            )
            .optional()?;
        Ok(user)
    }

    fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<StoredCredentials>> {
        let credentials = self
            .conn
            .query_row(
                "SELECT id, name, email, date_of_birth, password_hash
                 FROM users
                 WHERE email = ?1;",
                [normalize_email(email)],
                |row| {
                    Ok(StoredCredentials {
                        user: parse_user_row(row)?,
                        password_hash: row.get("password_hash")?,
                    })
                },
            )
            .optional()?;
        Ok(credentials)
    }

    fn users_with_birthday_on(&self, date: NaiveDate) -> RepoResult<Vec<User>> {
        let keys = birthday_keys_for(date);
        let placeholders = vec!["?"; keys.len()].join(", ");
        let mut stmt = self.conn.prepare(&format!(
            "{USER_SELECT_SQL}
             WHERE birth_month_day IN ({placeholders})
             ORDER BY id ASC;"
        ))?;

        let rows = stmt.query_map(params_from_iter(keys), parse_user_row)?;
        let mut users = Vec::new();
        for user in rows {
            users.push(user?);
        }
        Ok(users)
    }
}

/// Maps the `id, name, email, date_of_birth` projection.
pub(crate) fn parse_user_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get("id")?,
        name: row.get("name")?,
        email: row.get("email")?,
        date_of_birth: row.get("date_of_birth")?,
    })
}

pub(crate) fn user_exists(conn: &Connection, id: UserId) -> rusqlite::Result<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM users WHERE id = ?1);",
        [id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}
