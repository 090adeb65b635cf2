use sqlparser::{
    ast::{ObjectName, Statement, Visit, Visitor},
    dialect::SQLiteDialect,
    parser::Parser,
};
use std::ops::ControlFlow;
use thiserror::Error;

/// Rejections raised by a [`QueryPolicy`].
#[derive(Debug, Error)]
pub enum PolicyError {
    /// The statement could not be parsed.
    #[error("SQL Parse Error: {0}")]
    ParseError(String),
    /// The statement touches a table outside the namespace.
    #[error("Access Denied: Table '{0}' is outside namespace '{1}'")]
    NamespaceViolation(String, String),
    /// The statement kind is not allowed on the data path.
    #[error("Policy Violation: {0}")]
    Violation(String),
}

/// Authorization contract for statements issued by the store.
pub trait QueryPolicy: Send + Sync {
    /// Verify that `sql` may run against the tables of `namespace`.
    ///
    /// # Errors
    ///
    /// Returns an error if the SQL cannot be parsed or breaks the policy.
    fn authorize(&self, namespace: &str, sql: &str) -> Result<(), PolicyError>;
}

/// Keeps data-path statements inside one table namespace.
///
/// Only plain reads and writes are admitted (`SELECT`, `INSERT`, `UPDATE`,
/// `DELETE`), and every relation they name must carry the `{namespace}_`
/// prefix. Schema changes go through migrations, never through this path.
pub struct NamespacePolicy;

impl QueryPolicy for NamespacePolicy {
    fn authorize(&self, namespace: &str, sql: &str) -> Result<(), PolicyError> {
        let ast = Parser::parse_sql(&SQLiteDialect {}, sql)
            .map_err(|e| PolicyError::ParseError(e.to_string()))?;

        for statement in ast {
            if !matches!(
                statement,
                Statement::Query { .. }
                    | Statement::Insert { .. }
                    | Statement::Update { .. }
                    | Statement::Delete { .. }
            ) {
                return Err(PolicyError::Violation(format!(
                    "statement not allowed on the data path: {statement}"
                )));
            }

            let mut visitor = RelationVisitor {
                prefix: format!("{namespace}_"),
                namespace,
            };
            if let ControlFlow::Break(err) = statement.visit(&mut visitor) {
                return Err(err);
            }
        }

        Ok(())
    }
}

struct RelationVisitor<'a> {
    prefix: String,
    namespace: &'a str,
}

impl Visitor for RelationVisitor<'_> {
    type Break = PolicyError;

    fn pre_visit_relation(&mut self, relation: &ObjectName) -> ControlFlow<Self::Break> {
        if let Some(part) = relation.0.last()
            && let Some(ident) = part.as_ident()
            && !ident.value.starts_with(&self.prefix)
        {
            return ControlFlow::Break(PolicyError::NamespaceViolation(
                ident.value.clone(),
                self.namespace.to_string(),
            ));
        }
        ControlFlow::Continue(())
    }
}
