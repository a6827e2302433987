use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct UserId(pub String);

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[serde(alias = "BU Head")]
    BuHead,
    #[serde(alias = "HR Head")]
    HrHead,
    #[serde(alias = "Admin")]
    Admin,
    #[serde(alias = "HR Executive")]
    HrExecutive,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BuHead => "bu_head",
            Self::HrHead => "hr_head",
            Self::Admin => "admin",
            Self::HrExecutive => "hr_executive",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::BuHead => "BU Head",
            Self::HrHead => "HR Head",
            Self::Admin => "Admin",
            Self::HrExecutive => "HR Executive",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownRole(pub String);

impl fmt::Display for UnknownRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown role `{}` (expected bu_head|hr_head|admin|hr_executive)", self.0)
    }
}

impl std::error::Error for UnknownRole {}

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .map(|c| if c == ' ' || c == '-' { '_' } else { c.to_ascii_lowercase() })
            .collect();
        match normalized.as_str() {
            "bu_head" => Ok(Self::BuHead),
            "hr_head" => Ok(Self::HrHead),
            "admin" => Ok(Self::Admin),
            "hr_executive" => Ok(Self::HrExecutive),
            _ => Err(UnknownRole(value.to_string())),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub business_unit: String,
    /// Remaining hiring budget. Debited on confirmed joins, never below zero.
    pub team_cost: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is(&self, role: Role) -> bool {
        self.role == role
    }
}

#[cfg(test)]
mod tests {
    use super::Role;

    #[test]
    fn role_parses_labels_and_snake_case() {
        assert_eq!("BU Head".parse::<Role>(), Ok(Role::BuHead));
        assert_eq!("hr_head".parse::<Role>(), Ok(Role::HrHead));
        assert_eq!(" HR Executive ".parse::<Role>(), Ok(Role::HrExecutive));
        assert_eq!("ADMIN".parse::<Role>(), Ok(Role::Admin));
        assert!("recruiter".parse::<Role>().is_err());
    }

    #[test]
    fn role_deserializes_from_display_label() {
        let role: Role = serde_json::from_str("\"HR Head\"").expect("label alias");
        assert_eq!(role, Role::HrHead);
        assert_eq!(serde_json::to_string(&role).expect("serialize"), "\"hr_head\"");
    }
}
