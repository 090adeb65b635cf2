use serde::Serialize;
use tracing::{info, info_span};

/// Domain event for audit logging.
/// Structured for JSON serialization to enable machine-readable audit trails.
#[derive(Debug, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    /// Process came up.
    SystemStartup {
        /// Component that started.
        component: String,
    },
    /// Process is going down.
    SystemShutdown {
        /// Why.
        reason: String,
    },
    /// A branch was created as a tree root.
    BranchCreated {
        /// New branch.
        branchid: String,
        /// Creating user.
        creator: String,
        /// Parent the creator asked for.
        requested_parent: String,
    },
    /// A child branch was cut loose with its subtree.
    BranchDetached {
        /// Detached branch.
        branchid: String,
        /// Former strict ancestors.
        former_ancestors: Vec<String>,
        /// Descendants whose tags were rewritten.
        descendants: usize,
    },
    /// A tree root was deleted permanently.
    BranchDeleted {
        /// Deleted branch.
        branchid: String,
        /// Former children, now tree roots.
        reparented: Vec<String>,
    },
}

/// Logs an audit event to the dedicated audit channel as structured JSON.
/// This uses a specific `target` which can be filtered by the subscriber to redirect to a secure file.
pub fn log_audit(event: &AuditEvent) {
    let span = info_span!(target: "audit", "audit_event");
    let _enter = span.enter();

    let json = serde_json::to_string(event).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"));
    info!(target: "audit", audit_json = %json, "Audit Event");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn events_serialize_with_their_type_tag() -> anyhow::Result<()> {
        let json = serde_json::to_value(AuditEvent::BranchDetached {
            branchid: "x".into(),
            former_ancestors: vec!["g".into(), "p".into()],
            descendants: 1,
        })?;
        assert_eq!(json["event_type"], "branch_detached");
        assert_eq!(json["former_ancestors"][1], "p");
        Ok(())
    }

    #[test]
    fn log_audit_accepts_every_variant() {
        log_audit(&AuditEvent::SystemStartup {
            component: "Test".into(),
        });
        log_audit(&AuditEvent::SystemShutdown {
            reason: "Testing".into(),
        });
        log_audit(&AuditEvent::BranchCreated {
            branchid: "science".into(),
            creator: "ann".into(),
            requested_parent: "root".into(),
        });
        log_audit(&AuditEvent::BranchDeleted {
            branchid: "science".into(),
            reparented: vec![],
        });
    }
}
