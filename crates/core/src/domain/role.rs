use serde::{Deserialize, Serialize};

/// Organizational roles, ordered by hierarchy level. This table is the single
/// source of truth for both ranking and visibility scope; nothing else in the
/// workspace carries its own level mapping.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    Mdo,
    Tsm,
    Rbh,
    Rmm,
    Zbh,
    Mh,
    Vp,
    Md,
    Cfo,
    Chro,
    Admin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Territory,
    State,
    Zone,
    All,
}

/// Coarse capabilities attached to a role. Fine-grained approval authority
/// stays with the workflow chain; these gate whole API surfaces.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    SubmitWorkflows,
    ApproveWorkflows,
    ViewLiquidation,
    ManageLiquidationSnapshots,
    ManageUsers,
}

impl Role {
    pub const ALL: [Role; 11] = [
        Role::Mdo,
        Role::Tsm,
        Role::Rbh,
        Role::Rmm,
        Role::Zbh,
        Role::Mh,
        Role::Vp,
        Role::Md,
        Role::Cfo,
        Role::Chro,
        Role::Admin,
    ];

    pub fn from_code(code: &str) -> Option<Role> {
        match normalize_code(code).as_str() {
            "MDO" => Some(Role::Mdo),
            "TSM" => Some(Role::Tsm),
            "RBH" => Some(Role::Rbh),
            "RMM" => Some(Role::Rmm),
            "ZBH" => Some(Role::Zbh),
            "MH" => Some(Role::Mh),
            "VP" => Some(Role::Vp),
            "MD" => Some(Role::Md),
            "CFO" => Some(Role::Cfo),
            "CHRO" => Some(Role::Chro),
            "ADMIN" => Some(Role::Admin),
            _ => None,
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            Role::Mdo => "MDO",
            Role::Tsm => "TSM",
            Role::Rbh => "RBH",
            Role::Rmm => "RMM",
            Role::Zbh => "ZBH",
            Role::Mh => "MH",
            Role::Vp => "VP",
            Role::Md => "MD",
            Role::Cfo => "CFO",
            Role::Chro => "CHRO",
            Role::Admin => "ADMIN",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Role::Mdo => "Market Development Officer",
            Role::Tsm => "Territory Sales Manager",
            Role::Rbh => "Regional Business Head",
            Role::Rmm => "Regional Marketing Manager",
            Role::Zbh => "Zonal Business Head",
            Role::Mh => "Marketing Head",
            Role::Vp => "Vice President",
            Role::Md => "Managing Director",
            Role::Cfo => "Chief Financial Officer",
            Role::Chro => "Chief HR Officer",
            Role::Admin => "Administrator",
        }
    }

    /// RBH and RMM are peers, as are the three C-suite roles.
    pub fn hierarchy_level(&self) -> u8 {
        match self {
            Role::Mdo => 1,
            Role::Tsm => 2,
            Role::Rbh | Role::Rmm => 3,
            Role::Zbh => 4,
            Role::Mh => 5,
            Role::Vp => 6,
            Role::Md | Role::Cfo | Role::Chro => 7,
            Role::Admin => 8,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            Role::Mdo => Scope::Territory,
            Role::Tsm | Role::Rbh | Role::Rmm => Scope::State,
            Role::Zbh => Scope::Zone,
            Role::Mh | Role::Vp | Role::Md | Role::Cfo | Role::Chro | Role::Admin => Scope::All,
        }
    }

    pub fn permissions(&self) -> &'static [Permission] {
        const FIELD: &[Permission] = &[Permission::SubmitWorkflows, Permission::ViewLiquidation];
        const MANAGER: &[Permission] = &[
            Permission::SubmitWorkflows,
            Permission::ApproveWorkflows,
            Permission::ViewLiquidation,
        ];
        const LEADERSHIP: &[Permission] = &[
            Permission::SubmitWorkflows,
            Permission::ApproveWorkflows,
            Permission::ViewLiquidation,
            Permission::ManageLiquidationSnapshots,
        ];
        const ADMIN: &[Permission] = &[
            Permission::SubmitWorkflows,
            Permission::ApproveWorkflows,
            Permission::ViewLiquidation,
            Permission::ManageLiquidationSnapshots,
            Permission::ManageUsers,
        ];

        match self {
            Role::Mdo => FIELD,
            Role::Tsm | Role::Rbh | Role::Rmm | Role::Zbh => MANAGER,
            Role::Mh | Role::Vp | Role::Md | Role::Cfo | Role::Chro => LEADERSHIP,
            Role::Admin => ADMIN,
        }
    }
}

/// Whether a raw role code carries `permission`. Unrecognized codes keep the
/// field-staff baseline: they can submit and see their own data, nothing more.
pub fn permits(code: &str, permission: Permission) -> bool {
    let granted = Role::from_code(code)
        .map(|role| role.permissions())
        .unwrap_or(&[Permission::SubmitWorkflows, Permission::ViewLiquidation]);
    granted.contains(&permission)
}

/// Hierarchy level for a raw role code. Unrecognized codes rank at 0,
/// subordinate to every known role and superior to none.
pub fn hierarchy_level_for_code(code: &str) -> u8 {
    Role::from_code(code).map(|role| role.hierarchy_level()).unwrap_or(0)
}

/// Visibility scope for a raw role code. Unrecognized codes fall back to the
/// narrowest scope rather than failing the caller.
pub fn scope_for_code(code: &str) -> Scope {
    Role::from_code(code).map(|role| role.scope()).unwrap_or(Scope::Territory)
}

pub fn normalize_code(raw: &str) -> String {
    raw.trim().to_ascii_uppercase()
}

pub fn codes_match(left: &str, right: &str) -> bool {
    normalize_code(left) == normalize_code(right)
}

#[cfg(test)]
mod tests {
    use super::{codes_match, hierarchy_level_for_code, scope_for_code, Role, Scope};

    #[test]
    fn role_codes_round_trip() {
        for role in Role::ALL {
            assert_eq!(Role::from_code(role.code()), Some(role));
        }
    }

    #[test]
    fn parsing_is_case_insensitive_and_trims() {
        assert_eq!(Role::from_code("  tsm "), Some(Role::Tsm));
        assert_eq!(Role::from_code("zbh"), Some(Role::Zbh));
        assert_eq!(Role::from_code("field_officer"), None);
    }

    #[test]
    fn hierarchy_is_strictly_ordered_across_level_groups() {
        assert!(Role::Mdo.hierarchy_level() < Role::Tsm.hierarchy_level());
        assert!(Role::Tsm.hierarchy_level() < Role::Rbh.hierarchy_level());
        assert_eq!(Role::Rbh.hierarchy_level(), Role::Rmm.hierarchy_level());
        assert!(Role::Rbh.hierarchy_level() < Role::Zbh.hierarchy_level());
        assert!(Role::Zbh.hierarchy_level() < Role::Mh.hierarchy_level());
        assert!(Role::Mh.hierarchy_level() < Role::Vp.hierarchy_level());
        assert_eq!(Role::Md.hierarchy_level(), Role::Cfo.hierarchy_level());
        assert_eq!(Role::Cfo.hierarchy_level(), Role::Chro.hierarchy_level());
        assert!(Role::Vp.hierarchy_level() < Role::Md.hierarchy_level());
        assert!(Role::Md.hierarchy_level() < Role::Admin.hierarchy_level());
    }

    #[test]
    fn unknown_codes_rank_below_every_known_role() {
        assert_eq!(hierarchy_level_for_code("INTERN"), 0);
        for role in Role::ALL {
            assert!(hierarchy_level_for_code(role.code()) > hierarchy_level_for_code("INTERN"));
        }
    }

    #[test]
    fn unknown_codes_resolve_to_narrowest_scope() {
        assert_eq!(scope_for_code("INTERN"), Scope::Territory);
        assert_eq!(scope_for_code(""), Scope::Territory);
    }

    #[test]
    fn scope_table_matches_hierarchy_bands() {
        assert_eq!(Role::Mdo.scope(), Scope::Territory);
        assert_eq!(Role::Tsm.scope(), Scope::State);
        assert_eq!(Role::Rmm.scope(), Scope::State);
        assert_eq!(Role::Zbh.scope(), Scope::Zone);
        assert_eq!(Role::Mh.scope(), Scope::All);
        assert_eq!(Role::Admin.scope(), Scope::All);
    }

    #[test]
    fn code_matching_normalizes_both_sides() {
        assert!(codes_match(" rbh", "RBH "));
        assert!(!codes_match("RBH", "RMM"));
    }

    #[test]
    fn permission_sets_widen_with_seniority() {
        use super::{permits, Permission};

        assert!(permits("MDO", Permission::SubmitWorkflows));
        assert!(!permits("MDO", Permission::ApproveWorkflows));
        assert!(permits("TSM", Permission::ApproveWorkflows));
        assert!(!permits("ZBH", Permission::ManageLiquidationSnapshots));
        assert!(permits("MH", Permission::ManageLiquidationSnapshots));
        assert!(permits("VP", Permission::ManageLiquidationSnapshots));
        assert!(!permits("VP", Permission::ManageUsers));
        assert!(permits("ADMIN", Permission::ManageUsers));
    }

    #[test]
    fn unknown_codes_keep_the_field_staff_baseline() {
        use super::{permits, Permission};

        assert!(permits("CONSULTANT", Permission::SubmitWorkflows));
        assert!(permits("CONSULTANT", Permission::ViewLiquidation));
        assert!(!permits("CONSULTANT", Permission::ApproveWorkflows));
        assert!(!permits("CONSULTANT", Permission::ManageLiquidationSnapshots));
    }
}
