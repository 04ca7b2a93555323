//! Resolved scope lists for one (user, organization, project) triple.

use std::collections::HashSet;

use serde::Serialize;
use uuid::Uuid;

/// Scopes a user holds at each level, and their union.
///
/// A computed value; nothing here is persisted.
#[derive(Debug, Clone, Serialize)]
pub struct ScopeResolution {
    /// User the scopes were resolved for.
    pub user_id: Uuid,
    /// Organization context, if any.
    pub organization_id: Option<Uuid>,
    /// Project context, if any.
    pub project_id: Option<Uuid>,
    /// Role held in the organization, if a member.
    pub role: Option<String>,
    /// Scopes that apply regardless of organization.
    pub global_scopes: Vec<String>,
    /// Organization-level scopes.
    pub organization_scopes: Vec<String>,
    /// Project-level scopes.
    pub project_scopes: Vec<String>,
    /// Deduplicated union of the three lists, in that order.
    pub effective_scopes: Vec<String>,
    #[serde(skip)]
    lookup: HashSet<String>,
}

impl ScopeResolution {
    /// Build a resolution and its union.
    pub fn new(
        user_id: Uuid,
        organization_id: Option<Uuid>,
        project_id: Option<Uuid>,
        role: Option<String>,
        global_scopes: Vec<String>,
        organization_scopes: Vec<String>,
        project_scopes: Vec<String>,
    ) -> Self {
        let mut lookup = HashSet::new();
        let effective_scopes: Vec<String> = global_scopes
            .iter()
            .chain(&organization_scopes)
            .chain(&project_scopes)
            .filter(|s| lookup.insert((*s).clone()))
            .cloned()
            .collect();

        Self {
            user_id,
            organization_id,
            project_id,
            role,
            global_scopes,
            organization_scopes,
            project_scopes,
            effective_scopes,
            lookup,
        }
    }

    /// Resolution with no scopes at all.
    pub fn empty(user_id: Uuid, organization_id: Option<Uuid>, project_id: Option<Uuid>) -> Self {
        Self::new(
            user_id,
            organization_id,
            project_id,
            None,
            Vec::new(),
            Vec::new(),
            Vec::new(),
        )
    }

    /// Whether `scope` is in the effective set.
    pub fn has_scope(&self, scope: &str) -> bool {
        self.lookup.contains(scope)
    }

    /// Whether any of `scopes` is held.
    pub fn has_any_scope(&self, scopes: &[&str]) -> bool {
        scopes.iter().any(|s| self.has_scope(s))
    }

    /// Whether all of `scopes` are held.
    pub fn has_all_scopes(&self, scopes: &[&str]) -> bool {
        scopes.iter().all(|s| self.has_scope(s))
    }
}
