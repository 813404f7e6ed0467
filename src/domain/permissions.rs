use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::user::{Role, User};

/// Permission context built once per authenticated session. Pure lookups,
/// no persistence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserPermissions {
    pub role: Role,
    pub permissions: HashSet<String>,
}

impl UserPermissions {
    pub fn new(role: Role, permissions: impl IntoIterator<Item = String>) -> Self {
        Self {
            role,
            permissions: permissions.into_iter().collect(),
        }
    }

    pub fn for_user(user: &User) -> Self {
        Self::new(user.role, user.permissions.iter().cloned())
    }

    /// Superadmin short-circuits every check, regardless of the granted set.
    pub fn is_superadmin(&self) -> bool {
        self.role == Role::Superadmin
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.is_superadmin() || self.permissions.contains(permission)
    }

    pub fn has_any_permission(&self, permissions: &[&str]) -> bool {
        self.is_superadmin() || permissions.iter().any(|p| self.permissions.contains(*p))
    }

    pub fn has_all_permissions(&self, permissions: &[&str]) -> bool {
        self.is_superadmin() || permissions.iter().all(|p| self.permissions.contains(*p))
    }

    pub fn has_role_or_higher(&self, target: Role) -> bool {
        self.role.has_role_or_higher(target)
    }

    pub fn can_manage_role(&self, target: Role) -> bool {
        self.role.can_manage(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyst_with(perms: &[&str]) -> UserPermissions {
        UserPermissions::new(Role::Analyst, perms.iter().map(|p| p.to_string()))
    }

    #[test]
    fn test_permission_membership() {
        let perms = analyst_with(&["reports.view", "voters.view"]);

        assert!(perms.has_permission("reports.view"));
        assert!(!perms.has_permission("users.create"));
        assert!(perms.has_any_permission(&["users.create", "voters.view"]));
        assert!(!perms.has_any_permission(&["users.create", "users.delete"]));
        assert!(perms.has_all_permissions(&["reports.view", "voters.view"]));
        assert!(!perms.has_all_permissions(&["reports.view", "users.create"]));
    }

    #[test]
    fn test_superadmin_bypasses_everything() {
        let perms = UserPermissions::new(Role::Superadmin, std::iter::empty());

        assert!(perms.is_superadmin());
        assert!(perms.has_permission("anything.at.all"));
        assert!(perms.has_any_permission(&["x"]));
        assert!(perms.has_all_permissions(&["x", "y", "z"]));
        assert!(perms.has_role_or_higher(Role::Admin));
    }

    #[test]
    fn test_role_checks_delegate_to_rank() {
        let perms = analyst_with(&[]);
        assert!(perms.has_role_or_higher(Role::User));
        assert!(!perms.has_role_or_higher(Role::Admin));
        assert!(perms.can_manage_role(Role::Volunteer));
        assert!(!perms.can_manage_role(Role::Analyst));
    }
}
