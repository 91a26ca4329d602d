use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::loose;

// -- JWT Claims --

/// JWT claims shared by the REST middleware and the gateway upgrade.
/// Exactly one of `email` / `phone` is set, mirroring the account it was issued for.
/// There is no `exp`: tokens do not expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub iat: usize,
}

// -- Auth --

/// Which identifying value an account is keyed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    Email,
    Phone,
}

impl IdentifierKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "email" => Some(Self::Email),
            "phone" => Some(Self::Phone),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
        }
    }
}

/// Body of both `/api/signup` and `/api/login`.
///
/// Every field is optional at the serde level so that a missing field becomes
/// a handler-level 400/401 instead of an extractor rejection. Numbers are
/// taken as their decimal text (a phone number sent as `5550100`).
#[derive(Debug, Default, Deserialize)]
pub struct CredentialsRequest {
    #[serde(default, rename = "type", deserialize_with = "loose::optional_text")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "loose::optional_text")]
    pub value: Option<String>,
    #[serde(default, deserialize_with = "loose::optional_text")]
    pub password: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserSummary,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
