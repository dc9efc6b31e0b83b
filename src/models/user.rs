//! User identity stub
//!
//! No authentication flow exists; this is only the identity shape referenced
//! by the schema. Passwords are stored as opaque placeholder strings.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password: String,
}
