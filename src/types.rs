use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A stored user record. The password only ever exists here as a PHC hash.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub name: String,
    pub age: u32,
}

/// Registration input, as accepted by `IdentityStore::register`.
#[derive(Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub password: String,
    pub name: String,
    pub age: u32,
}

// Keep the plaintext password out of Debug output (and therefore out of logs).
impl std::fmt::Debug for NewUser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewUser")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("name", &self.name)
            .field("age", &self.age)
            .finish()
    }
}

#[derive(Clone, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// A stored book record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Book {
    pub id: Uuid,
    pub title: String,
    pub author: String,
    pub description: String,
    /// Publication month, normalized to the first day of that month.
    #[serde(with = "month_format")]
    pub written_at: NaiveDate,
    #[serde(skip)]
    pub deleted: bool,
}

/// Book input for `BookStore::add_book`; the store assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewBook {
    pub title: String,
    pub author: String,
    pub description: String,
    pub written_at: NaiveDate,
}

impl NewBook {
    pub fn into_book(self, id: Uuid) -> Book {
        Book {
            id,
            title: self.title,
            author: self.author,
            description: self.description,
            written_at: self.written_at,
            deleted: false,
        }
    }
}

// Request/response DTOs

#[derive(Debug, Clone, Deserialize)]
pub struct CreateBookRequest {
    pub title: String,
    pub author: String,
    #[serde(default)]
    pub description: String,
    /// Publication month as `YYYY-MM`.
    #[serde(alias = "month")]
    pub written_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateBookResponse {
    pub id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserTokenResponse {
    pub user_id: Uuid,
}

/// `YYYY-MM` (de)serialization for publication months.
pub mod month_format {
    use chrono::NaiveDate;
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m";

    pub fn format(date: &NaiveDate) -> String {
        date.format(FORMAT).to_string()
    }

    /// Parses `YYYY-MM` into the first day of that month.
    pub fn parse(value: &str) -> Option<NaiveDate> {
        let (year, month) = value.trim().split_once('-')?;
        if year.len() != 4 || month.len() != 2 {
            return None;
        }
        let year: i32 = year.parse().ok()?;
        let month: u32 = month.parse().ok()?;
        NaiveDate::from_ymd_opt(year, month, 1)
    }

    pub fn serialize<S: Serializer>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format(date))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<NaiveDate, D::Error> {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid month '{}', expected YYYY-MM", raw)))
    }
}
