//! User directory use-case service.
//!
//! # Responsibility
//! - Register users and expose directory lookups to the API layer.

use crate::model::user::{NewUser, StoredCredentials, User, UserId};
use crate::repo::user_repo::{RepoError, RepoResult, UserRepository};
use chrono::NaiveDate;
use log::{error, info, warn};

pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    /// Registers a user and returns the stored read model.
    ///
    /// # Errors
    /// - `Validation` for malformed input.
    /// - `EmailTaken` when the normalized email is already registered.
    pub fn register(&self, new_user: &NewUser) -> RepoResult<User> {
        match self.repo.create_user(new_user) {
            Ok(user) => {
                info!("event=user_register module=user status=ok user_id={}", user.id);
                Ok(user)
            }
            Err(err @ (RepoError::Validation(_) | RepoError::EmailTaken(_))) => {
                warn!("event=user_register module=user status=rejected reason={err}");
                Err(err)
            }
            Err(err) => {
                error!("event=user_register module=user status=error error={err}");
                Err(err)
            }
        }
    }

    pub fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        self.repo.get_user(id)
    }

    pub fn find_credentials_by_email(&self, email: &str) -> RepoResult<Option<StoredCredentials>> {
        self.repo.find_credentials_by_email(email)
    }

    pub fn users_with_birthday_on(&self, date: NaiveDate) -> RepoResult<Vec<User>> {
        self.repo.users_with_birthday_on(date)
    }
}
