use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// The closed set of dashboard roles, ordered from highest to lowest
/// authority. The rank is an explicit total order: "A outranks B" is a
/// single integer comparison.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    Manager,
    Analyst,
    User,
    Volunteer,
    Viewer,
}

pub const ALL_ROLES: [Role; 7] = [
    Role::Superadmin,
    Role::Admin,
    Role::Manager,
    Role::Analyst,
    Role::User,
    Role::Volunteer,
    Role::Viewer,
];

impl Role {
    /// Higher rank means more authority. Viewer is the floor.
    pub fn rank(&self) -> u8 {
        match self {
            Role::Superadmin => 7,
            Role::Admin => 6,
            Role::Manager => 5,
            Role::Analyst => 4,
            Role::User => 3,
            Role::Volunteer => 2,
            Role::Viewer => 1,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::Manager => "manager",
            Role::Analyst => "analyst",
            Role::User => "user",
            Role::Volunteer => "volunteer",
            Role::Viewer => "viewer",
        }
    }

    /// True when `self` is at least as high in the hierarchy as `target`.
    pub fn has_role_or_higher(&self, target: Role) -> bool {
        self.rank() >= target.rank()
    }

    /// A role manages only roles strictly below it; leaf roles manage nobody.
    pub fn can_manage(&self, target: Role) -> bool {
        self.rank() > target.rank()
    }

    pub fn manageable_roles(&self) -> Vec<Role> {
        ALL_ROLES
            .iter()
            .copied()
            .filter(|r| self.can_manage(*r))
            .collect()
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "superadmin" => Ok(Role::Superadmin),
            "admin" => Ok(Role::Admin),
            "manager" => Ok(Role::Manager),
            "analyst" => Ok(Role::Analyst),
            "user" => Ok(Role::User),
            "volunteer" => Ok(Role::Volunteer),
            "viewer" => Ok(Role::Viewer),
            other => Err(format!("invalid role: {}", other)),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub constituency_id: Option<Uuid>,
    pub organization_id: Option<Uuid>,
    pub is_active: bool,
    pub permissions: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn new(name: String, email: String, role: Role) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name,
            email,
            role,
            phone: None,
            city: None,
            constituency_id: None,
            organization_id: None,
            is_active: true,
            permissions: Vec::new(),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_hierarchy_comparisons() {
        assert!(Role::Admin.has_role_or_higher(Role::Manager));
        assert!(Role::Admin.has_role_or_higher(Role::Admin));
        assert!(!Role::User.has_role_or_higher(Role::Admin));
        assert!(Role::Superadmin.has_role_or_higher(Role::Viewer));
    }

    #[test]
    fn test_manageable_roles_are_strictly_lower() {
        let managed = Role::Manager.manageable_roles();
        assert!(managed.contains(&Role::Analyst));
        assert!(managed.contains(&Role::Viewer));
        assert!(!managed.contains(&Role::Manager));
        assert!(!managed.contains(&Role::Admin));

        assert!(Role::Viewer.manageable_roles().is_empty());
    }

    #[test]
    fn test_role_round_trips_through_strings() {
        for role in ALL_ROLES {
            assert_eq!(role.as_str().parse::<Role>().unwrap(), role);
        }
        assert!("governor".parse::<Role>().is_err());
    }
}
