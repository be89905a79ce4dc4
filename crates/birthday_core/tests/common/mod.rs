#![allow(dead_code)]

use async_trait::async_trait;
use birthday_core::{
    MailMessage, MailTransport, NewUser, SqliteUserRepository, TransportError, User,
    UserRepository,
};
use chrono::NaiveDate;
use rusqlite::Connection;
use std::collections::HashSet;
use std::sync::Mutex;
use std::time::Duration;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn register(conn: &Connection, name: &str, date_of_birth: NaiveDate) -> User {
    SqliteUserRepository::new(conn)
        .create_user(&NewUser {
            name: name.to_string(),
            email: format!("{}@example.com", name.to_ascii_lowercase()),
            password_hash: format!("hash-{name}"),
            date_of_birth,
        })
        .unwrap()
}

pub fn edge_count(conn: &Connection, subscriber: i64, honoree: i64) -> i64 {
    conn.query_row(
        "SELECT COUNT(*) FROM subscriptions WHERE user_id = ?1 AND related_user_id = ?2;",
        [subscriber, honoree],
        |row| row.get(0),
    )
    .unwrap()
}

pub fn all_edges(conn: &Connection) -> Vec<(i64, i64)> {
    let mut stmt = conn
        .prepare("SELECT user_id, related_user_id FROM subscriptions ORDER BY 1, 2;")
        .unwrap();
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))
        .unwrap();
    rows.map(Result::unwrap).collect()
}

/// In-memory transport that records deliveries and fails on demand.
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<MailMessage>>,
    calls: Mutex<usize>,
    failing: HashSet<String>,
    hanging: HashSet<String>,
    panics: bool,
}

impl RecordingTransport {
    pub fn failing_for(addresses: &[&str]) -> Self {
        Self {
            failing: addresses.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn hanging_for(addresses: &[&str]) -> Self {
        Self {
            hanging: addresses.iter().map(|a| a.to_string()).collect(),
            ..Self::default()
        }
    }

    pub fn panicking() -> Self {
        Self {
            panics: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn calls(&self) -> usize {
        *self.calls.lock().unwrap()
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn send(&self, message: &MailMessage) -> Result<(), TransportError> {
        *self.calls.lock().unwrap() += 1;
        if self.panics {
            panic!("transport exploded");
        }
        if self.hanging.contains(&message.to) {
            tokio::time::sleep(Duration::from_secs(3600)).await;
        }
        if self.failing.contains(&message.to) {
            return Err(TransportError::Delivery("mailbox unavailable".to_string()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}
