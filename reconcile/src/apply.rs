//! Executing a plan against pg-meta

use tracing::{Instrument, info, info_span};

use crate::error::{Error, Result};
use crate::introspect::PgMetaApi;
use crate::plan::Plan;

/// Summary of an applied plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Applied {
    pub actions: usize,
    pub statements: usize,
}

/// Run every statement in order, one query each.
///
/// The first failure stops the run. Statements before it stay applied;
/// there is no transaction spanning queries.
pub async fn apply<A: PgMetaApi>(plan: Plan, api: &A) -> Result<Applied> {
    async {
        let mut applied = Applied::default();
        for action in plan.actions {
            for sql in &action.statements {
                info!(action = %action.description, "{sql}");
                if let Err(e) = api.query(sql).await {
                    return Err(Error::ApplyFailed {
                        action: action.description.clone(),
                        sql: sql.clone(),
                        source: Box::new(e),
                    });
                }
                applied.statements += 1;
            }
            applied.actions += 1;
        }
        info!(
            actions = applied.actions,
            statements = applied.statements,
            "plan applied"
        );
        Ok(applied)
    }
    .instrument(info_span!("apply"))
    .await
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::diff::ChangeOp;
    use crate::introspect::{
        PgMetaBucket, PgMetaFunction, PgMetaMembership, PgMetaPolicy, PgMetaRole, PgMetaTable,
        PgMetaType,
    };
    use crate::plan::Action;
    use supaform_types::ResourceKind;

    #[derive(Default)]
    struct Recorder {
        fail_on: Option<&'static str>,
        queries: Mutex<Vec<String>>,
    }

    impl PgMetaApi for Recorder {
        async fn tables(&self, _: &[String]) -> Result<Vec<PgMetaTable>> {
            Ok(Vec::new())
        }
        async fn policies(&self, _: &[String]) -> Result<Vec<PgMetaPolicy>> {
            Ok(Vec::new())
        }
        async fn roles(&self) -> Result<Vec<PgMetaRole>> {
            Ok(Vec::new())
        }
        async fn role_memberships(&self) -> Result<Vec<PgMetaMembership>> {
            Ok(Vec::new())
        }
        async fn functions(&self, _: &[String]) -> Result<Vec<PgMetaFunction>> {
            Ok(Vec::new())
        }
        async fn types(&self, _: &[String]) -> Result<Vec<PgMetaType>> {
            Ok(Vec::new())
        }
        async fn buckets(&self) -> Result<Vec<PgMetaBucket>> {
            Ok(Vec::new())
        }
        async fn query(&self, sql: &str) -> Result<serde_json::Value> {
            if self.fail_on.is_some_and(|f| sql.contains(f)) {
                return Err(Error::Protocol {
                    status: 400,
                    endpoint: "/query".into(),
                    body: "relation does not exist".into(),
                });
            }
            self.queries.lock().unwrap().push(sql.to_string());
            Ok(serde_json::Value::Array(Vec::new()))
        }
    }

    fn action(description: &str, statements: &[&str]) -> Action {
        Action {
            kind: ResourceKind::Table,
            op: ChangeOp::Create,
            identity: description.into(),
            description: description.into(),
            deltas: Vec::new(),
            statements: statements.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn plan() -> Plan {
        Plan {
            actions: vec![
                action("create table public.a", &["CREATE TABLE a ();"]),
                action("create table public.b", &["CREATE TABLE b ();", "ALTER TABLE b;"]),
                action("create table public.c", &["CREATE TABLE c ();"]),
            ],
        }
    }

    #[tokio::test]
    async fn runs_statements_in_order() {
        let api = Recorder::default();
        let applied = apply(plan(), &api).await.unwrap();
        assert_eq!(applied, Applied { actions: 3, statements: 4 });
        assert_eq!(
            *api.queries.lock().unwrap(),
            ["CREATE TABLE a ();", "CREATE TABLE b ();", "ALTER TABLE b;", "CREATE TABLE c ();"]
        );
    }

    #[tokio::test]
    async fn stops_at_first_failure() {
        let api = Recorder {
            fail_on: Some("ALTER TABLE b"),
            ..Recorder::default()
        };
        let err = apply(plan(), &api).await.unwrap_err();
        match &err {
            Error::ApplyFailed { action, sql, .. } => {
                assert_eq!(action, "create table public.b");
                assert_eq!(sql, "ALTER TABLE b;");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(
            err.to_string(),
            "create table public.b failed on `ALTER TABLE b;`: pg-meta answered 400 for /query: relation does not exist"
        );
        assert_eq!(api.queries.lock().unwrap().len(), 2);
    }
}
