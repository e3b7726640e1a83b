use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// User record as stored in the users file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub password: String,            // plaintext, compared verbatim
    pub profile_pic: Option<String>, // stored image URL, null until set
}

impl UserRecord {
    pub fn new(password: impl Into<String>) -> Self {
        Self {
            password: password.into(),
            profile_pic: None,
        }
    }

    /// Profile picture URL, falling back to `placeholder` when unset.
    pub fn profile_pic_or<'a>(&'a self, placeholder: &'a str) -> &'a str {
        self.profile_pic.as_deref().unwrap_or(placeholder)
    }
}

/// Every shape a users-file entry has had over time.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum StoredUser {
    /// Early versions stored only the password string.
    Legacy(String),
    /// Fields are coerced one by one, so a bad field never drops a good one.
    Structured(Map<String, Value>),
    Unrecognized(Value),
}

fn string_field(obj: &Map<String, Value>, key: &str) -> Option<String> {
    obj.get(key).and_then(Value::as_str).map(str::to_string)
}

impl From<StoredUser> for UserRecord {
    fn from(s: StoredUser) -> Self {
        match s {
            StoredUser::Legacy(password) => UserRecord::new(password),
            StoredUser::Structured(obj) => UserRecord {
                password: string_field(&obj, "password").unwrap_or_default(),
                profile_pic: string_field(&obj, "profile_pic"),
            },
            StoredUser::Unrecognized(_) => UserRecord::new(""),
        }
    }
}
