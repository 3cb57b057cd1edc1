//! Runs a collection request end to end: pre-request scripts, the HTTP
//! exchange, then test scripts, writing variable changes back to the
//! caller's collection and environment.

mod models;
#[cfg(feature = "cli")]
mod printer;

use anyhow::{anyhow, Result};
use tracing::{dispatcher, info, instrument::WithSubscriber, warn, Dispatch};

use crate::{
    collection::{Collection, Environment, Event, Request},
    config::EngineConfig,
    error::RequestError,
    executor::{HttpExecutor, ResponseData},
    scope::{build_scope_snapshot, ScopeSnapshot},
    script::{ExecutionContext, Sandbox, ScriptPhase, TestResult},
};

pub use models::RequestRun;
#[cfg(feature = "cli")]
pub use printer::print_request_run;

pub struct Engine {
    config: EngineConfig,
    executor: HttpExecutor,
    sandbox: Sandbox,
    dispatch: Dispatch,
}

impl Engine {
    pub fn new(config: EngineConfig, dispatch: Dispatch) -> Result<Self, RequestError> {
        let executor = HttpExecutor::new(config.request_timeout())?;
        let sandbox = Sandbox::new(config.script_memory_limit);
        Ok(Self {
            config,
            executor,
            sandbox,
            dispatch,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Scope snapshot with the configured fallback variables appended last.
    pub fn snapshot(
        &self,
        collection: &Collection,
        breadcrumb: &[String],
        environment: Option<&Environment>,
    ) -> ScopeSnapshot {
        dispatcher::with_default(&self.dispatch, || {
            let mut snapshot = build_scope_snapshot(Some(collection), breadcrumb, environment);
            snapshot.push_scope("Config", &self.config.variable_entries());
            snapshot
        })
    }

    pub fn run_script(
        &self,
        source: &str,
        phase: ScriptPhase,
        context: &ExecutionContext,
    ) -> TestResult {
        dispatcher::with_default(&self.dispatch, || {
            self.sandbox
                .run(source, phase, context, self.config.script_timeout())
        })
    }

    pub async fn execute(&self, request: &Request, snapshot: &ScopeSnapshot) -> ResponseData {
        self.executor
            .execute(request, snapshot)
            .with_subscriber(self.dispatch.clone())
            .await
    }

    /// Runs the request `name` inside the folder `breadcrumb`.
    ///
    /// Scripts run in collection, folder, request order. Variables set by
    /// pre-request scripts are visible when the request is resolved.
    pub async fn run_request(
        &self,
        collection: &mut Collection,
        breadcrumb: &[String],
        name: &str,
        mut environment: Option<&mut Environment>,
    ) -> Result<RequestRun> {
        let item = collection
            .find_request(breadcrumb, name)
            .ok_or_else(|| anyhow!("request '{}' not found", display_path(breadcrumb, name)))?;
        let request = item.request.clone().unwrap_or_default();

        let mut events: Vec<Event> = collection.event.clone();
        for folder in collection.folder_chain(breadcrumb) {
            events.extend(folder.event.iter().cloned());
        }
        events.extend(item.event.iter().cloned());

        let prerequest = self.run_phase(
            ScriptPhase::PreRequest,
            &events,
            None,
            collection,
            environment.as_deref_mut(),
        );

        let snapshot = self.snapshot(collection, breadcrumb, environment.as_deref());
        let response = self.execute(&request, &snapshot).await;

        let tests = if response.error.is_none() {
            self.run_phase(
                ScriptPhase::Test,
                &events,
                Some(&response),
                collection,
                environment.as_deref_mut(),
            )
        } else {
            dispatcher::with_default(&self.dispatch, || {
                warn!(request = name, "skipping test scripts after failed request");
            });
            TestResult::default()
        };

        let run = RequestRun {
            breadcrumb: breadcrumb.to_vec(),
            name: name.to_string(),
            response,
            prerequest,
            tests,
        };
        dispatcher::with_default(&self.dispatch, || {
            info!(
                request = %run.path(),
                passed = run.passed(),
                tests = run.tests.outcomes.len(),
                "request run finished"
            );
        });
        Ok(run)
    }

    fn run_phase(
        &self,
        phase: ScriptPhase,
        events: &[Event],
        response: Option<&ResponseData>,
        collection: &mut Collection,
        environment: Option<&mut Environment>,
    ) -> TestResult {
        let scripts: Vec<String> = events
            .iter()
            .filter(|event| event.phase() == Some(phase))
            .map(|event| event.script.source())
            .filter(|source| !source.trim().is_empty())
            .collect();
        if scripts.is_empty() {
            return TestResult::default();
        }

        let environment_values = environment
            .as_ref()
            .map(|env| env.values.clone())
            .unwrap_or_default();
        let mut context = ExecutionContext::new(collection.variable.clone(), environment_values);
        if let Some(response) = response {
            context = context.with_response(response.clone());
        }

        let mut result = TestResult::default();
        for source in &scripts {
            result.merge(self.run_script(source, phase, &context));
        }

        collection.variable = context.collection_entries();
        if let Some(environment) = environment {
            environment.values = context.environment_entries();
        }
        result
    }
}

fn display_path(breadcrumb: &[String], name: &str) -> String {
    let mut parts = breadcrumb.to_vec();
    parts.push(name.to_string());
    parts.join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{Item, VariableEntry};

    fn engine() -> Engine {
        Engine::new(EngineConfig::default(), Dispatch::none()).unwrap()
    }

    #[tokio::test]
    async fn missing_request_is_an_error() {
        let mut collection = Collection::default();
        let err = engine()
            .run_request(&mut collection, &["Users".to_string()], "List", None)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Users/List"));
    }

    #[test]
    fn snapshot_appends_config_variables_last() {
        let mut config = EngineConfig::default();
        config
            .variables
            .insert("fallback".to_string(), "config".to_string());
        config
            .variables
            .insert("shared".to_string(), "config".to_string());
        let engine = Engine::new(config, Dispatch::none()).unwrap();

        let collection = Collection {
            variable: vec![VariableEntry::new("shared", "collection")],
            item: vec![Item::default()],
            ..Collection::default()
        };
        let snapshot = engine.snapshot(&collection, &[], None);
        assert_eq!(snapshot.get("shared"), Some("collection"));
        assert_eq!(snapshot.get("fallback"), Some("config"));
        assert_eq!(snapshot.source_of("fallback"), Some("Config"));
    }

    #[test]
    fn run_phase_writes_variables_back() {
        let engine = engine();
        let mut collection = Collection::default();
        let mut environment = Environment::default();
        let events = vec![
            Event::new(ScriptPhase::PreRequest, "pm.collectionVariables.set('a', '1');"),
            Event::new(ScriptPhase::Test, "pm.collectionVariables.set('ignored', 'x');"),
            Event::new(
                ScriptPhase::PreRequest,
                "pm.environment.set('b', pm.collectionVariables.get('a'));",
            ),
        ];

        let result = engine.run_phase(
            ScriptPhase::PreRequest,
            &events,
            None,
            &mut collection,
            Some(&mut environment),
        );

        assert!(result.passed(), "{result:?}");
        assert_eq!(collection.variable, vec![VariableEntry::new("a", "1")]);
        assert_eq!(environment.values, vec![VariableEntry::new("b", "1")]);
    }
}
