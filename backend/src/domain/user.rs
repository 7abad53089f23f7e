//! Accounts, their identity values and the profile fields users may edit.

use std::fmt;
use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::domain::Error;
use crate::domain::access::Tier;

/// Maximum username length in characters.
pub const USERNAME_MAX: usize = 150;
/// Maximum email length in characters.
pub const EMAIL_MAX: usize = 254;
/// Maximum length for first and last names.
pub const PERSON_NAME_MAX: usize = 150;
/// Username reserved for the self-profile route.
pub const RESERVED_USERNAME: &str = "me";

/// Validation failures for account values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UserValidationError {
    #[error("username must not be empty")]
    EmptyUsername,
    #[error("username must be at most {max} characters")]
    UsernameTooLong { max: usize },
    #[error("username may only contain letters, digits and @ . + - _")]
    UsernameInvalidCharacters,
    #[error("username \"me\" is reserved")]
    ReservedUsername,
    #[error("email must not be empty")]
    EmptyEmail,
    #[error("email must be at most {max} characters")]
    EmailTooLong { max: usize },
    #[error("email must have the form local@domain")]
    InvalidEmail,
    #[error("unknown role \"{0}\"")]
    UnknownRole(String),
    #[error("name must be at most {max} characters")]
    NameTooLong { max: usize },
    #[error("confirmation code must not be empty")]
    EmptyConfirmationCode,
    #[error("user id must be a valid UUID")]
    InvalidId,
}

impl UserValidationError {
    /// Request field the failure belongs to.
    pub fn field(&self) -> &'static str {
        match self {
            Self::EmptyUsername
            | Self::UsernameTooLong { .. }
            | Self::UsernameInvalidCharacters
            | Self::ReservedUsername => "username",
            Self::EmptyEmail | Self::EmailTooLong { .. } | Self::InvalidEmail => "email",
            Self::UnknownRole(_) => "role",
            Self::NameTooLong { .. } => "name",
            Self::EmptyConfirmationCode => "confirmation_code",
            Self::InvalidId => "id",
        }
    }

    /// Machine-readable failure code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::EmptyUsername
            | Self::UsernameTooLong { .. }
            | Self::UsernameInvalidCharacters
            | Self::ReservedUsername => "invalid_username",
            Self::EmptyEmail | Self::EmailTooLong { .. } | Self::InvalidEmail => "invalid_email",
            Self::UnknownRole(_) => "invalid_role",
            Self::NameTooLong { .. } => "invalid_name",
            Self::EmptyConfirmationCode => "invalid_code",
            Self::InvalidId => "invalid_id",
        }
    }
}

impl From<UserValidationError> for Error {
    fn from(err: UserValidationError) -> Self {
        Error::invalid_field(err.field(), err.code(), err.to_string())
    }
}

/// Stable account identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(Uuid);

impl UserId {
    /// Generate a new random identifier.
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wrap an existing UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Borrow the UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for UserId {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|_| UserValidationError::InvalidId)
    }
}

static USERNAME_RE: OnceLock<Regex> = OnceLock::new();

fn username_regex() -> &'static Regex {
    USERNAME_RE.get_or_init(|| {
        Regex::new(r"^[\w.@+-]+$")
            .unwrap_or_else(|error| panic!("username regex failed to compile: {error}"))
    })
}

/// Unique, immutable login name.
///
/// ## Invariants
/// - 1 to [`USERNAME_MAX`] characters of word characters or `@ . + -`.
/// - Never equal to [`RESERVED_USERNAME`].
///
/// # Examples
/// ```
/// use critique::domain::{Username, UserValidationError};
///
/// assert!(Username::new("ada.lovelace").is_ok());
/// assert_eq!(Username::new("me"), Err(UserValidationError::ReservedUsername));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Username(String);

impl Username {
    /// Validate and construct a username.
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        if value.is_empty() {
            return Err(UserValidationError::EmptyUsername);
        }
        if value.chars().count() > USERNAME_MAX {
            return Err(UserValidationError::UsernameTooLong { max: USERNAME_MAX });
        }
        if !username_regex().is_match(&value) {
            return Err(UserValidationError::UsernameInvalidCharacters);
        }
        if value == RESERVED_USERNAME {
            return Err(UserValidationError::ReservedUsername);
        }
        Ok(Self(value))
    }

    /// Borrow the username.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for Username {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for Username {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<Username> for String {
    fn from(value: Username) -> Self {
        value.0
    }
}

impl TryFrom<String> for Username {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Unique contact address.
///
/// The domain part is lower-cased so lookups are case-insensitive on the part
/// mail servers treat case-insensitively.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EmailAddress(String);

impl EmailAddress {
    /// Validate and normalise an email address.
    ///
    /// # Examples
    /// ```
    /// use critique::domain::EmailAddress;
    ///
    /// let email = EmailAddress::new("Ada@Example.COM").expect("valid email");
    /// assert_eq!(email.as_str(), "Ada@example.com");
    /// ```
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return Err(UserValidationError::EmptyEmail);
        }
        if trimmed.chars().count() > EMAIL_MAX {
            return Err(UserValidationError::EmailTooLong { max: EMAIL_MAX });
        }
        let Some((local, domain)) = trimmed.split_once('@') else {
            return Err(UserValidationError::InvalidEmail);
        };
        if local.is_empty()
            || domain.is_empty()
            || domain.contains('@')
            || trimmed.chars().any(char::is_whitespace)
        {
            return Err(UserValidationError::InvalidEmail);
        }
        Ok(Self(format!("{local}@{}", domain.to_lowercase())))
    }

    /// Borrow the address.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for EmailAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<EmailAddress> for String {
    fn from(value: EmailAddress) -> Self {
        value.0
    }
}

impl TryFrom<String> for EmailAddress {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Stored account role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Moderator,
    Admin,
}

impl Role {
    /// Parse the persisted or submitted role name.
    pub fn parse(value: &str) -> Result<Self, UserValidationError> {
        match value {
            "user" => Ok(Self::User),
            "moderator" => Ok(Self::Moderator),
            "admin" => Ok(Self::Admin),
            other => Err(UserValidationError::UnknownRole(other.to_owned())),
        }
    }

    /// Name used for persistence and the wire.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Moderator => "moderator",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// First or last name, at most [`PERSON_NAME_MAX`] characters.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct PersonName(String);

impl PersonName {
    /// Validate a name. Blank names are allowed and mean "not set".
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        if value.chars().count() > PERSON_NAME_MAX {
            return Err(UserValidationError::NameTooLong {
                max: PERSON_NAME_MAX,
            });
        }
        Ok(Self(value))
    }

    /// Borrow the name.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl From<PersonName> for String {
    fn from(value: PersonName) -> Self {
        value.0
    }
}

impl TryFrom<String> for PersonName {
    type Error = UserValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// One-time secret delivered by email and exchanged for a token.
///
/// `Debug` never prints the code.
#[derive(Clone, PartialEq, Eq)]
pub struct ConfirmationCode(String);

impl ConfirmationCode {
    /// Wrap a stored or generated code.
    pub fn new(value: impl Into<String>) -> Result<Self, UserValidationError> {
        let value = value.into();
        if value.trim().is_empty() {
            return Err(UserValidationError::EmptyConfirmationCode);
        }
        Ok(Self(value))
    }

    /// Wrap a freshly generated code. Generators never produce blank codes.
    pub(crate) fn from_generated(value: String) -> Self {
        Self(value)
    }

    /// Borrow the raw code for delivery or persistence.
    pub fn expose(&self) -> &str {
        self.0.as_str()
    }

    /// Compare against a presented code without short-circuiting on the first
    /// differing byte.
    ///
    /// # Examples
    /// ```
    /// use critique::domain::ConfirmationCode;
    ///
    /// let code = ConfirmationCode::new("A1b2C3d4E5f6").expect("code");
    /// assert!(code.matches("A1b2C3d4E5f6"));
    /// assert!(!code.matches("a1b2c3d4e5f6"));
    /// ```
    pub fn matches(&self, presented: &str) -> bool {
        let expected = self.0.as_bytes();
        let presented = presented.as_bytes();
        if expected.len() != presented.len() {
            return false;
        }
        expected
            .iter()
            .zip(presented)
            .fold(0_u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for ConfirmationCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ConfirmationCode(..)")
    }
}

/// Account record.
///
/// ## Invariants
/// - `username` and `email` are unique across accounts.
/// - `username` never changes after creation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: UserId,
    pub username: Username,
    pub email: EmailAddress,
    pub role: Role,
    pub is_staff: bool,
    pub is_superuser: bool,
    pub bio: String,
    pub first_name: PersonName,
    pub last_name: PersonName,
    pub confirmation_code: Option<ConfirmationCode>,
    pub date_joined: DateTime<Utc>,
}

impl User {
    /// New account with the default role and empty profile fields.
    pub fn register(
        username: Username,
        email: EmailAddress,
        code: ConfirmationCode,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: UserId::random(),
            username,
            email,
            role: Role::User,
            is_staff: false,
            is_superuser: false,
            bio: String::new(),
            first_name: PersonName::default(),
            last_name: PersonName::default(),
            confirmation_code: Some(code),
            date_joined: joined_at,
        }
    }

    /// Capability tier derived from role and staff flags.
    pub fn tier(&self) -> Tier {
        if self.is_staff || self.is_superuser {
            return Tier::Admin;
        }
        match self.role {
            Role::User => Tier::User,
            Role::Moderator => Tier::Moderator,
            Role::Admin => Tier::Admin,
        }
    }

    /// Apply a profile patch, leaving absent fields untouched.
    pub fn apply(&mut self, patch: ProfilePatch) {
        let ProfilePatch {
            email,
            bio,
            first_name,
            last_name,
        } = patch;
        if let Some(email) = email {
            self.email = email;
        }
        if let Some(bio) = bio {
            self.bio = bio;
        }
        if let Some(first_name) = first_name {
            self.first_name = first_name;
        }
        if let Some(last_name) = last_name {
            self.last_name = last_name;
        }
    }
}

/// Fields a user may change on their own profile.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfilePatch {
    pub email: Option<EmailAddress>,
    pub bio: Option<String>,
    pub first_name: Option<PersonName>,
    pub last_name: Option<PersonName>,
}
