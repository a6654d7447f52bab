use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionToken(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Who a quote belongs to. Anonymous visitors are keyed by an opaque session
/// token; after login a draft is re-owned by the user id (a pointer update,
/// never a copy).
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "key", rename_all = "snake_case")]
pub enum QuoteOwner {
    Session(SessionToken),
    User(UserId),
}

impl QuoteOwner {
    /// Storage encoding used by repositories to index drafts per owner.
    pub fn as_parts(&self) -> (&'static str, &str) {
        match self {
            Self::Session(token) => ("session", token.0.as_str()),
            Self::User(user) => ("user", user.0.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{QuoteOwner, SessionToken, UserId};

    #[test]
    fn owner_storage_parts_distinguish_session_from_user() {
        let session = QuoteOwner::Session(SessionToken("tok-1".to_owned()));
        let user = QuoteOwner::User(UserId("U-9".to_owned()));

        assert_eq!(session.as_parts(), ("session", "tok-1"));
        assert_eq!(user.as_parts(), ("user", "U-9"));
        assert_ne!(session, user);
    }
}
