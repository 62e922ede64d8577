use std::collections::HashMap;
use std::sync::Arc;

use metron_models::{Role, RolesConfig};
use serde::Serialize;
use tracing::{info, warn};

use crate::backend::AnalysisBackend;

/// Resolved state of one role, for the startup role table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoleAssignment {
    pub role: Role,
    /// Id of the backend that currently answers for the role.
    pub backend: Option<String>,
    pub display_name: Option<String>,
    /// Every registered candidate id, in priority order.
    pub candidates: Vec<String>,
}

/// Static, priority-ordered role to backend mapping.
///
/// Resolution picks the first live candidate. No load balancing and no
/// health probing: liveness is fixed when the backend is built.
#[derive(Default)]
pub struct RoleRouter {
    roles: HashMap<Role, Vec<Arc<dyn AnalysisBackend>>>,
}

impl RoleRouter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from configured backend ids. Unknown ids are skipped.
    pub fn from_config(config: &RolesConfig, backends: &[Arc<dyn AnalysisBackend>]) -> Self {
        let mut router = Self::new();
        for role in Role::ALL {
            let mut resolved = Vec::new();
            for name in config.candidates(role) {
                match backends.iter().find(|b| b.id() == name.as_str()) {
                    Some(backend) => resolved.push(Arc::clone(backend)),
                    None => warn!(
                        role = %role,
                        backend = %name,
                        "Unknown backend in role config, skipping"
                    ),
                }
            }
            router.register(role, resolved);
        }
        router
    }

    /// Replace the candidate list for `role`.
    pub fn register(&mut self, role: Role, backends: Vec<Arc<dyn AnalysisBackend>>) {
        self.roles.insert(role, backends);
    }

    /// Builder form of [`RoleRouter::register`].
    pub fn with_role(mut self, role: Role, backends: Vec<Arc<dyn AnalysisBackend>>) -> Self {
        self.register(role, backends);
        self
    }

    /// First live backend for `role`, or `None` when the stage should use its default.
    pub fn resolve(&self, role: Role) -> Option<Arc<dyn AnalysisBackend>> {
        self.candidates(role)
            .iter()
            .find(|b| b.is_live())
            .map(Arc::clone)
    }

    pub fn candidates(&self, role: Role) -> &[Arc<dyn AnalysisBackend>] {
        self.roles.get(&role).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn assignments(&self) -> Vec<RoleAssignment> {
        Role::ALL
            .into_iter()
            .map(|role| {
                let active = self.resolve(role);
                RoleAssignment {
                    role,
                    backend: active.as_ref().map(|b| b.id().to_string()),
                    display_name: active.as_ref().map(|b| b.display_name().to_string()),
                    candidates: self
                        .candidates(role)
                        .iter()
                        .map(|b| b.id().to_string())
                        .collect(),
                }
            })
            .collect()
    }

    /// One line per role naming the backend that will answer for it.
    pub fn log_assignments(&self) {
        for assignment in self.assignments() {
            match &assignment.display_name {
                Some(name) => info!(role = %assignment.role, backend = %name, "Role assigned"),
                None => info!(role = %assignment.role, backend = "none", "Role unassigned"),
            }
        }
    }
}
