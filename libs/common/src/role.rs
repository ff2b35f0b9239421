//! Platform roles carried on user records and in token claims

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Role of a platform user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    #[default]
    Patient,
    Survivor,
    Caregiver,
    HealthcareProfessional,
    Moderator,
    Admin,
}

impl Role {
    /// Get the role name as stored in the database
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Patient => "PATIENT",
            Role::Survivor => "SURVIVOR",
            Role::Caregiver => "CAREGIVER",
            Role::HealthcareProfessional => "HEALTHCARE_PROFESSIONAL",
            Role::Moderator => "MODERATOR",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PATIENT" => Ok(Role::Patient),
            "SURVIVOR" => Ok(Role::Survivor),
            "CAREGIVER" => Ok(Role::Caregiver),
            "HEALTHCARE_PROFESSIONAL" => Ok(Role::HealthcareProfessional),
            "MODERATOR" => Ok(Role::Moderator),
            "ADMIN" => Ok(Role::Admin),
            other => Err(format!("unknown role: {}", other)),
        }
    }
}
