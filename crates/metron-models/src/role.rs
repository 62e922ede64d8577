use std::fmt;

use serde::{Deserialize, Serialize};

/// Logical function in the decision workflow, decoupled from whichever backend fills it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Scout,
    Strategist,
    Validator,
    RiskOfficer,
    Backup,
}

impl Role {
    pub const ALL: [Role; 5] = [
        Role::Scout,
        Role::Strategist,
        Role::Validator,
        Role::RiskOfficer,
        Role::Backup,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Scout => "scout",
            Role::Strategist => "strategist",
            Role::Validator => "validator",
            Role::RiskOfficer => "risk_officer",
            Role::Backup => "backup",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One of the four capability operations. Part of every cache key.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Sentiment,
    Pattern,
    Risk,
    Decision,
}

impl Operation {
    pub fn as_str(self) -> &'static str {
        match self {
            Operation::Sentiment => "sentiment",
            Operation::Pattern => "pattern",
            Operation::Risk => "risk",
            Operation::Decision => "decision",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
