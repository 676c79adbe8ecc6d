//! Group membership evaluation
//!
//! Every privileged resource names the groups a user must hold. Membership
//! in the admin group satisfies any requirement.

use tracing::debug;
use webdesk_core::GroupRequirement;

/// Group that bypasses every requirement
pub const ADMIN_GROUP: &str = "admin";

/// Check whether a user's groups satisfy a requirement
///
/// A `false` requirement admits everyone. A `true` requirement names no
/// group a user could hold, so only administrators get through. String and
/// list requirements demand membership in every named group; an empty list
/// demands nothing and admits any session user.
pub fn group_satisfies(user_groups: &[String], requirement: &GroupRequirement) -> bool {
    if requirement.is_open() {
        return true;
    }

    if user_groups.iter().any(|g| g == ADMIN_GROUP) {
        return true;
    }

    if matches!(requirement, GroupRequirement::Flag(true)) {
        debug!(held = ?user_groups, "requirement admits administrators only");
        return false;
    }

    let required = requirement.names();
    let satisfied = required
        .iter()
        .all(|r| user_groups.iter().any(|g| g == r));
    if !satisfied {
        debug!(required = ?required, held = ?user_groups, "group requirement not met");
    }
    satisfied
}

/// Check an optional requirement; an absent entry admits everyone
pub fn group_satisfies_opt(
    user_groups: &[String],
    requirement: Option<&GroupRequirement>,
) -> bool {
    match requirement {
        Some(requirement) => group_satisfies(user_groups, requirement),
        None => true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn groups(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn open_requirement_admits_everyone() {
        assert!(group_satisfies(&[], &GroupRequirement::Flag(false)));
        assert!(group_satisfies(
            &groups(&["guest"]),
            &GroupRequirement::Flag(false)
        ));
    }

    #[test]
    fn absent_requirement_admits_everyone() {
        assert!(group_satisfies_opt(&[], None));
    }

    #[test]
    fn admin_bypasses_any_requirement() {
        let admin = groups(&["admin"]);
        assert!(group_satisfies(
            &admin,
            &GroupRequirement::One("curl".to_string())
        ));
        assert!(group_satisfies(
            &admin,
            &GroupRequirement::Many(groups(&["a", "b", "c"]))
        ));
        // Even a requirement nobody could normally satisfy
        assert!(group_satisfies(&admin, &GroupRequirement::Flag(true)));
    }

    #[test]
    fn bare_true_restricts_to_admins() {
        assert!(!group_satisfies(
            &groups(&["curl", "fs"]),
            &GroupRequirement::Flag(true)
        ));
    }

    #[test]
    fn empty_group_list_demands_nothing() {
        assert!(group_satisfies(
            &groups(&["users"]),
            &GroupRequirement::Many(Vec::new())
        ));
        assert!(group_satisfies(&[], &GroupRequirement::Many(Vec::new())));
    }

    #[test]
    fn superset_of_required_groups_passes() {
        let held = groups(&["curl", "fs", "upload"]);
        assert!(group_satisfies(
            &held,
            &GroupRequirement::Many(groups(&["curl", "fs"]))
        ));
    }

    #[test]
    fn missing_one_required_group_fails() {
        let held = groups(&["curl"]);
        assert!(!group_satisfies(
            &held,
            &GroupRequirement::Many(groups(&["curl", "fs"]))
        ));
    }

    #[test]
    fn string_requirement_is_a_single_group() {
        assert!(group_satisfies(
            &groups(&["curl"]),
            &GroupRequirement::One("curl".to_string())
        ));
        assert!(!group_satisfies(
            &groups(&["fs"]),
            &GroupRequirement::One("curl".to_string())
        ));
    }
}
