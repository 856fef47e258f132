use crate::error::{Error, ErrorKind};
use crate::validator::{Validate, Validator};
use exn::ResultExt;
use serde::Serialize;
use time::OffsetDateTime;

pub const NAME_MAX_BYTES: usize = 500;
pub const EMAIL_MAX_BYTES: usize = 500;

/// A reader, as registered by a login provider.
///
/// The `id` comes from the provider and is supplied on insert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub id: i64,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub name: String,
    pub email: String,
    pub avatar: Option<String>,
    pub provider: String,
}

impl User {
    pub fn new(id: i64, name: impl Into<String>, email: impl Into<String>, provider: impl Into<String>) -> Self {
        Self {
            id,
            created_at: OffsetDateTime::UNIX_EPOCH,
            name: name.into(),
            email: email.into(),
            avatar: None,
            provider: provider.into(),
        }
    }
}

impl Validate for User {
    fn validate(&self, v: &mut Validator) {
        v.check(self.id != 0, "id", "must be provided");
        v.check(self.id > 0, "id", "must be a positive integer");

        v.check(!self.name.is_empty(), "name", "must be provided");
        v.check(self.name.len() <= NAME_MAX_BYTES, "name", "must not be more than 500 bytes long");

        v.check(!self.email.is_empty(), "email", "must be provided");
        v.check(self.email.len() <= EMAIL_MAX_BYTES, "email", "must not be more than 500 bytes long");
        v.check(self.email.contains('@'), "email", "must be a valid email address");
    }
}

#[derive(sqlx::FromRow)]
pub(crate) struct UserRow {
    pub(crate) id: i64,
    pub(crate) created_at: i64,
    pub(crate) name: String,
    pub(crate) email: String,
    #[sqlx(default)]
    pub(crate) avatar: Option<String>,
    pub(crate) provider: String,
}

impl TryFrom<UserRow> for User {
    type Error = Error;
    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: row.id,
            created_at: OffsetDateTime::from_unix_timestamp(row.created_at).or_raise(|| ErrorKind::Store)?,
            name: row.name,
            email: row.email,
            avatar: row.avatar,
            provider: row.provider,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::validator::validate;
    use rstest::rstest;

    pub(crate) fn reader(id: i64) -> User {
        User::new(id, "Bilbo Baggins", format!("bilbo{id}@example.com"), "github")
    }

    #[test]
    fn test_valid_user() {
        assert!(validate(&reader(1)).is_empty());
    }

    #[rstest]
    #[case::missing_id(User::new(0, "Bilbo", "bilbo@example.com", "github"), "id", "must be provided")]
    #[case::negative_id(User::new(-4, "Bilbo", "bilbo@example.com", "github"), "id", "must be a positive integer")]
    #[case::missing_name(User::new(1, "", "bilbo@example.com", "github"), "name", "must be provided")]
    #[case::long_name(User::new(1, "b".repeat(501), "bilbo@example.com", "github"), "name", "must not be more than 500 bytes long")]
    #[case::missing_email(User::new(1, "Bilbo", "", "github"), "email", "must be provided")]
    #[case::bad_email(User::new(1, "Bilbo", "bilbo.example.com", "github"), "email", "must be a valid email address")]
    fn test_single_field_violation(#[case] user: User, #[case] field: &str, #[case] message: &str) {
        let errors = validate(&user);
        assert_eq!(errors.fields().collect::<Vec<_>>(), vec![field]);
        assert_eq!(errors.get(field), Some(message));
    }
}
