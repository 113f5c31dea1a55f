use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::error::ValidationError;
use super::repo_types::{User, UserStatus};
use super::services::{ListQuery, NewUser, UserPatch};

/// Wire value meaning "any status" / "leave status unchanged".
pub const STATUS_UNSET: i16 = -1;

pub const MAX_PAGE_SIZE: u32 = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

fn check_username(username: &str) -> Result<(), ValidationError> {
    let len = username.chars().count();
    if !(3..=20).contains(&len) {
        return Err(ValidationError::new("Username length should be 3-20"));
    }
    Ok(())
}

fn check_email(email: &str) -> Result<(), ValidationError> {
    if !is_valid_email(email) {
        return Err(ValidationError::new("Email format is invalid"));
    }
    Ok(())
}

fn parse_status(raw: i16, message: &str) -> Result<Option<UserStatus>, ValidationError> {
    if raw == STATUS_UNSET {
        return Ok(None);
    }
    UserStatus::try_from(raw)
        .map(Some)
        .map_err(|_| ValidationError::new(message))
}

/// Body of `POST /users`.
#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<NewUser, ValidationError> {
        let username = self.username.trim().to_string();
        let email = self.email.trim().to_string();

        if username.is_empty() {
            return Err(ValidationError::new("Username is required"));
        }
        check_username(&username)?;
        if email.is_empty() {
            return Err(ValidationError::new("Email is required"));
        }
        check_email(&email)?;
        if self.password.is_empty() {
            return Err(ValidationError::new("Password is required"));
        }
        if !(6..=20).contains(&self.password.chars().count()) {
            return Err(ValidationError::new("Password length should be 6-20"));
        }

        Ok(NewUser {
            username,
            email,
            password: self.password,
        })
    }
}

/// Body of `PUT /users/{id}`. Empty strings and status -1 mean "no change".
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub status: Option<i16>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<UserPatch, ValidationError> {
        let username = self
            .username
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        let email = self
            .email
            .map(|e| e.trim().to_string())
            .filter(|e| !e.is_empty());

        if let Some(username) = &username {
            check_username(username)?;
        }
        if let Some(email) = &email {
            check_email(email)?;
        }
        let status = match self.status {
            Some(raw) => parse_status(raw, "Status should be 0 or 1")?,
            None => None,
        };

        Ok(UserPatch {
            username,
            email,
            status,
        })
    }
}

fn default_page() -> u32 {
    1
}

fn default_size() -> u32 {
    10
}

fn default_status() -> i16 {
    STATUS_UNSET
}

/// Query string of `GET /users`.
#[derive(Debug, Deserialize)]
pub struct ListUsersParams {
    #[serde(default = "default_page")]
    pub page: u32,
    #[serde(default = "default_size")]
    pub size: u32,
    #[serde(default)]
    pub search: String,
    #[serde(default = "default_status")]
    pub status: i16,
}

impl Default for ListUsersParams {
    fn default() -> Self {
        Self {
            page: default_page(),
            size: default_size(),
            search: String::new(),
            status: default_status(),
        }
    }
}

impl ListUsersParams {
    pub fn validate(&self) -> Result<ListQuery, ValidationError> {
        if self.page < 1 {
            return Err(ValidationError::new("Page should be at least 1"));
        }
        if !(1..=MAX_PAGE_SIZE).contains(&self.size) {
            return Err(ValidationError::new("Size should be 1-100"));
        }
        let status = parse_status(self.status, "Status should be -1, 0, or 1")?;
        let search = self.search.trim();

        Ok(ListQuery {
            page: self.page,
            page_size: self.size,
            search: (!search.is_empty()).then(|| search.to_string()),
            status,
        })
    }
}

#[derive(Debug, Serialize)]
pub struct UserListResponse {
    pub list: Vec<User>,
    pub total: u64,
    pub page: u32,
    pub size: u32,
}

#[derive(Debug, Serialize)]
pub struct DeleteUserResponse {
    pub success: bool,
}
