use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Marketplace role of the caller. Hosts open and pay for check-in
/// requests; agents claim and perform them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum ActorRole {
    Host,
    Agent,
}

impl FromStr for ActorRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "host" => Ok(ActorRole::Host),
            "agent" => Ok(ActorRole::Agent),
            _ => Err(anyhow::anyhow!("Invalid actor role: {}", s)),
        }
    }
}

impl Display for ActorRole {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            ActorRole::Host => write!(f, "host"),
            ActorRole::Agent => write!(f, "agent"),
        }
    }
}

/// Authenticated caller identity, as established by the external auth
/// collaborator. Token issuance and verification live outside this core;
/// handlers receive the already-resolved id and role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: ActorRole,
}

impl Actor {
    pub fn host(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::Host,
        }
    }

    pub fn agent(id: Uuid) -> Self {
        Self {
            id,
            role: ActorRole::Agent,
        }
    }
}
