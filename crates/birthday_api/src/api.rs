//! Use-case entry points for the request layer.
//!
//! Each function takes the raw `Authorization` value (when the route is
//! protected) plus a decoded request body, and returns a response envelope.

use crate::auth::{AuthenticatedSubject, CredentialHasher, SessionVerifier};
use birthday_core::{
    NewUser, RepoError, SqliteSubscriptionRepository, SqliteUserRepository, SubscriptionError,
    SubscriptionService, User, UserId, UserService,
};
use chrono::NaiveDate;
use log::{error, warn};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};

/// HTTP status codes used by the facade.
pub mod status {
    pub const OK: u16 = 200;
    pub const CREATED: u16 = 201;
    pub const BAD_REQUEST: u16 = 400;
    pub const UNAUTHORIZED: u16 = 401;
    pub const NOT_FOUND: u16 = 404;
    pub const CONFLICT: u16 = 409;
    pub const INTERNAL_SERVER_ERROR: u16 = 500;
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub date_of_birth: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Body of subscribe and unsubscribe calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct SubscriptionRequest {
    pub related_user_id: UserId,
}

/// Outcome of a command-style call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionResponse {
    pub status: u16,
    /// Human-readable message for clients and diagnostics.
    pub message: String,
    /// Registered or authenticated user, when the call yields one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<UserId>,
}

impl ActionResponse {
    fn new(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            user_id: None,
        }
    }

    fn with_user(mut self, user_id: UserId) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One entry of the "who can I follow" listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableUserItem {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub date_of_birth: NaiveDate,
}

impl From<User> for AvailableUserItem {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            name: user.name,
            email: user.email,
            date_of_birth: user.date_of_birth,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailableUsersResponse {
    pub status: u16,
    pub message: String,
    pub items: Vec<AvailableUserItem>,
}

impl AvailableUsersResponse {
    fn failure(status: u16, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            items: Vec::new(),
        }
    }
}

/// Request facade bound to one connection and the identity collaborators.
pub struct BirthdayApi<'conn, S, H> {
    conn: &'conn Connection,
    sessions: S,
    hasher: H,
}

impl<'conn, S: SessionVerifier, H: CredentialHasher> BirthdayApi<'conn, S, H> {
    pub fn new(conn: &'conn Connection, sessions: S, hasher: H) -> Self {
        Self {
            conn,
            sessions,
            hasher,
        }
    }

    /// Registers a user. 201 on success, 400 on invalid data, 409 when the
    /// email is taken.
    pub fn register(&self, request: &RegisterRequest) -> ActionResponse {
        if request.password.is_empty() {
            return ActionResponse::new(status::BAD_REQUEST, "Invalid user data");
        }
        let password_hash = match self.hasher.hash(&request.password) {
            Ok(hash) => hash,
            Err(err) => {
                error!("event=user_register module=api status=error error={err}");
                return ActionResponse::new(
                    status::INTERNAL_SERVER_ERROR,
                    "Error hashing password",
                );
            }
        };

        let service = UserService::new(SqliteUserRepository::new(self.conn));
        let new_user = NewUser {
            name: request.name.clone(),
            email: request.email.clone(),
            password_hash,
            date_of_birth: request.date_of_birth,
        };
        match service.register(&new_user) {
            Ok(user) => ActionResponse::new(status::CREATED, "User registered successfully")
                .with_user(user.id),
            Err(RepoError::Validation(err)) => {
                ActionResponse::new(status::BAD_REQUEST, format!("Invalid user data: {err}"))
            }
            Err(RepoError::EmailTaken(_)) => {
                ActionResponse::new(status::CONFLICT, "Email is already registered")
            }
            Err(_) => ActionResponse::new(status::INTERNAL_SERVER_ERROR, "Error saving user"),
        }
    }

    /// Checks email and password. 200 with the user id, or 401.
    ///
    /// Token issuance belongs to the session layer.
    pub fn login(&self, request: &LoginRequest) -> ActionResponse {
        let service = UserService::new(SqliteUserRepository::new(self.conn));
        let credentials = match service.find_credentials_by_email(&request.email) {
            Ok(Some(credentials)) => credentials,
            Ok(None) => return invalid_login(),
            Err(err) => {
                error!("event=user_login module=api status=error error={err}");
                return ActionResponse::new(status::INTERNAL_SERVER_ERROR, "Error during login");
            }
        };

        match self
            .hasher
            .verify(&request.password, &credentials.password_hash)
        {
            Ok(true) => ActionResponse::new(status::OK, "Login successful")
                .with_user(credentials.user.id),
            Ok(false) => invalid_login(),
            Err(err) => {
                error!(
                    "event=user_login module=api status=error user_id={} error={err}",
                    credentials.user.id
                );
                invalid_login()
            }
        }
    }

    /// Follows `related_user_id`. 201, or 400/404/409 for client errors.
    pub fn subscribe(
        &self,
        authorization: Option<&str>,
        request: SubscriptionRequest,
    ) -> ActionResponse {
        let subject = match self.authenticate(authorization) {
            Ok(subject) => subject,
            Err(response) => return response,
        };

        let service = SubscriptionService::new(SqliteSubscriptionRepository::new(self.conn));
        match service.subscribe(subject.user_id(), request.related_user_id) {
            Ok(()) => ActionResponse::new(status::CREATED, "Subscription created successfully"),
            Err(err) => subscription_failure(&err, "Error creating subscription"),
        }
    }

    /// Unfollows `related_user_id`. 200, or 400 when no such subscription.
    pub fn unsubscribe(
        &self,
        authorization: Option<&str>,
        request: SubscriptionRequest,
    ) -> ActionResponse {
        let subject = match self.authenticate(authorization) {
            Ok(subject) => subject,
            Err(response) => return response,
        };

        let service = SubscriptionService::new(SqliteSubscriptionRepository::new(self.conn));
        match service.unsubscribe(subject.user_id(), request.related_user_id) {
            Ok(()) => ActionResponse::new(status::OK, "Unsubscribed successfully"),
            Err(err) => subscription_failure(&err, "Error unsubscribing user"),
        }
    }

    /// Lists users the caller does not follow yet.
    pub fn available_users(&self, authorization: Option<&str>) -> AvailableUsersResponse {
        let subject = match self.authenticate(authorization) {
            Ok(subject) => subject,
            Err(response) => {
                return AvailableUsersResponse::failure(response.status, response.message)
            }
        };

        let service = SubscriptionService::new(SqliteSubscriptionRepository::new(self.conn));
        match service.list_available(subject.user_id()) {
            Ok(users) => {
                let items = users
                    .into_iter()
                    .map(AvailableUserItem::from)
                    .collect::<Vec<_>>();
                AvailableUsersResponse {
                    status: status::OK,
                    message: format!("Found {} user(s).", items.len()),
                    items,
                }
            }
            Err(err) => {
                error!(
                    "event=available_users module=api status=error user_id={} error={err}",
                    subject.user_id()
                );
                AvailableUsersResponse::failure(
                    status::INTERNAL_SERVER_ERROR,
                    "Error fetching available users",
                )
            }
        }
    }

    fn authenticate(
        &self,
        authorization: Option<&str>,
    ) -> Result<AuthenticatedSubject, ActionResponse> {
        let token = authorization
            .map(strip_bearer)
            .filter(|token| !token.is_empty());
        let Some(token) = token else {
            warn!("event=auth_check module=api status=error reason=missing_token");
            return Err(ActionResponse::new(
                status::UNAUTHORIZED,
                "Authorization header missing",
            ));
        };
        self.sessions.verify(token).ok_or_else(|| {
            warn!("event=auth_check module=api status=error reason=invalid_token");
            ActionResponse::new(status::UNAUTHORIZED, "Unauthorized")
        })
    }
}

fn strip_bearer(value: &str) -> &str {
    let value = value.trim();
    value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .unwrap_or(value)
}

fn invalid_login() -> ActionResponse {
    ActionResponse::new(status::UNAUTHORIZED, "Invalid email or password")
}

fn subscription_failure(err: &SubscriptionError, server_message: &str) -> ActionResponse {
    match err {
        SubscriptionError::AlreadySubscribed(_) => {
            ActionResponse::new(status::CONFLICT, "You are already subscribed to this user")
        }
        SubscriptionError::NotSubscribed(_) => {
            ActionResponse::new(status::BAD_REQUEST, "You are not subscribed to this user")
        }
        SubscriptionError::UserNotFound(_) => {
            ActionResponse::new(status::NOT_FOUND, "User not found")
        }
        SubscriptionError::Validation(err) => {
            ActionResponse::new(status::BAD_REQUEST, err.to_string())
        }
        SubscriptionError::StoreUnavailable(_) => {
            ActionResponse::new(status::INTERNAL_SERVER_ERROR, server_message)
        }
    }
}
