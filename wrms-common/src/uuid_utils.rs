//! Voter/observer id helpers
//!
//! A connection id doubles as the voter id. Clients carry it in the
//! `UUID` cookie.

use uuid::Uuid;

/// Name of the cookie holding a client's connection id
pub const ID_COOKIE: &str = "UUID";

/// Generate a new connection id
pub fn generate() -> Uuid {
    Uuid::new_v4()
}

/// Parse a connection id from string
pub fn parse(s: &str) -> Result<Uuid, uuid::Error> {
    Uuid::parse_str(s.trim())
}

/// Extract the value of the `UUID` cookie from a raw `Cookie` header
pub fn id_from_cookie_header(header: &str) -> Option<&str> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == ID_COOKIE)
        .map(|(_, value)| value.trim())
        .filter(|value| !value.is_empty())
}
