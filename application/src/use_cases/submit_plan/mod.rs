//! Submit Plan use case
//!
//! Runs a list of possibly-incomplete [`ToolCall`]s:
//!
//! 1. **Resolve** missing parameters against the current registry snapshot,
//!    synthesizing provider calls where needed
//! 2. **Layer** the result into execution groups ([`ExecutionPlan`])
//! 3. **Execute** groups in order; within a group, calls run concurrently
//!    up to the strategy's window (see [`ExecutionStrategy::window`])
//! 4. **Report** per-call status, truncated values and cache keys
//!
//! Per-call failures are data in the [`PlanResult`], not errors. A failed
//! call skips its consumers unless they marked the dependency optional. A
//! failed critical call (or cancellation) skips everything not yet started,
//! while calls already in flight finish and keep their results.

mod binding;
mod invoke;
mod report;

pub use report::{CallReport, PlanResult};

use crate::config::{ConductorConfig, OrchestratorConfig};
use crate::ports::clock::Clock;
use crate::ports::history_sink::{HistoryEvent, HistorySink, NoHistorySink};
use crate::ports::progress::{ExecutionProgressNotifier, NoProgress};
use crate::ports::tool_invoker::ToolInvokerPort;
use crate::registry::{RegistrySnapshot, ToolRegistry};
use crate::use_cases::cache_manager::CacheManager;
use crate::use_cases::shared::check_cancelled;
use conductor_domain::{
    CallId, CallStatus, DefaultToolValidator, DependencyResolver, DomainError, ExecutionHistory,
    ExecutionPlan, ExecutionRecord, ExecutionStrategy, RecordOutcome, SkipReason, ToolCall,
    ToolValidator, TruncatedResult, Truncator,
};
use invoke::{CallExecutor, CallJob, CallOutcome, failed_outcome};
use serde_json::Value;
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum SubmitPlanError {
    #[error("Call id '{0}' is used more than once")]
    DuplicateCallId(CallId),
}

/// Input for the SubmitPlan use case
#[derive(Debug, Clone, Default)]
pub struct SubmitPlanInput {
    pub calls: Vec<ToolCall>,
    /// `None` uses the configured default
    pub strategy: Option<ExecutionStrategy>,
}

impl SubmitPlanInput {
    pub fn new(calls: Vec<ToolCall>) -> Self {
        Self {
            calls,
            strategy: None,
        }
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

/// Successful value of a call, as handed to consumers and to the report
struct Delivered {
    raw: Value,
    truncated: TruncatedResult,
    cache_key: Option<String>,
}

pub struct SubmitPlanUseCase {
    registry: Arc<ToolRegistry>,
    invoker: Arc<dyn ToolInvokerPort>,
    cache: Arc<CacheManager>,
    clock: Arc<dyn Clock>,
    validator: Arc<dyn ToolValidator>,
    history_sink: Arc<dyn HistorySink>,
    config: OrchestratorConfig,
    truncator: Truncator,
    cancellation_token: Option<CancellationToken>,
}

impl SubmitPlanUseCase {
    pub fn new(
        registry: Arc<ToolRegistry>,
        invoker: Arc<dyn ToolInvokerPort>,
        cache: Arc<CacheManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            registry,
            invoker,
            cache,
            clock,
            validator: Arc::new(DefaultToolValidator::default()),
            history_sink: Arc::new(NoHistorySink),
            config: OrchestratorConfig::default(),
            truncator: Truncator::default(),
            cancellation_token: None,
        }
    }

    /// Take orchestrator and truncation settings from a full configuration
    pub fn with_config(mut self, config: &ConductorConfig) -> Self {
        self.config = config.orchestrator().clone();
        self.truncator = config.truncation().truncator();
        self
    }

    pub fn with_orchestrator_config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_truncator(mut self, truncator: Truncator) -> Self {
        self.truncator = truncator;
        self
    }

    pub fn with_validator(mut self, validator: Arc<dyn ToolValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn with_history_sink(mut self, sink: Arc<dyn HistorySink>) -> Self {
        self.history_sink = sink;
        self
    }

    /// Set a cancellation token; cancelling it skips every call not yet started
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Resolve and layer the calls without executing anything
    pub fn plan(&self, calls: Vec<ToolCall>) -> Result<ExecutionPlan, SubmitPlanError> {
        ensure_unique_ids(&calls)?;
        let snapshot = self.registry.snapshot();
        Ok(Self::build_plan(&snapshot, calls))
    }

    fn build_plan(snapshot: &RegistrySnapshot, calls: Vec<ToolCall>) -> ExecutionPlan {
        let resolution =
            DependencyResolver::new(snapshot.catalog(), snapshot.index()).resolve(calls);
        ExecutionPlan::from_resolution(resolution)
    }

    /// Execute the plan without progress reporting
    pub async fn execute(&self, input: SubmitPlanInput) -> Result<PlanResult, SubmitPlanError> {
        self.execute_with_progress(input, Arc::new(NoProgress)).await
    }

    /// Execute the plan with progress callbacks
    pub async fn execute_with_progress(
        &self,
        input: SubmitPlanInput,
        progress: Arc<dyn ExecutionProgressNotifier>,
    ) -> Result<PlanResult, SubmitPlanError> {
        ensure_unique_ids(&input.calls)?;
        let strategy = input.strategy.unwrap_or(self.config.default_strategy);
        let snapshot = self.registry.snapshot();
        let mut plan = Self::build_plan(&snapshot, input.calls);

        info!(
            calls = plan.calls().len(),
            groups = plan.group_count(),
            strategy = %strategy,
            registry_version = snapshot.version(),
            "Executing plan"
        );
        progress.on_plan_start(plan.calls().len(), plan.group_count());

        let executor = CallExecutor {
            invoker: Arc::clone(&self.invoker),
            cache: Arc::clone(&self.cache),
            validator: Arc::clone(&self.validator),
            clock: Arc::clone(&self.clock),
            history_sink: Arc::clone(&self.history_sink),
            progress: Arc::clone(&progress),
            retry: self.config.retry.clone(),
            call_timeout: self.config.call_timeout,
        };

        let mut history = ExecutionHistory::new();
        let mut delivered: HashMap<CallId, Delivered> = HashMap::new();
        let mut aborted: Option<SkipReason> = None;

        // A critical call that could not even be resolved stops the plan up front
        if let Some(by) = plan
            .calls()
            .iter()
            .find(|c| c.status() == CallStatus::Failed && c.call.is_critical())
            .map(|c| c.id().clone())
        {
            warn!(call = %by, "Critical call failed during resolution, aborting plan");
            abort(&mut plan, &mut aborted, SkipReason::PlanAborted { by });
        }

        for k in 0..plan.group_count() {
            if aborted.is_some() {
                break;
            }

            let mut queue: VecDeque<CallId> = plan
                .group(k)
                .into_iter()
                .filter(|id| plan.get(id).is_some_and(|c| !c.is_terminal()))
                .collect();
            if queue.is_empty() {
                continue;
            }
            debug!(group = k, calls = queue.len(), "Starting execution group");
            progress.on_group_start(k, queue.make_contiguous());

            let mut join_set = JoinSet::new();
            let mut failure_seen = false;

            loop {
                while aborted.is_none()
                    && join_set.len() < strategy.window(self.config.max_parallelism, failure_seen)
                {
                    if check_cancelled(&self.cancellation_token).is_err() {
                        info!("Plan cancelled by caller");
                        abort(&mut plan, &mut aborted, SkipReason::Cancelled);
                        break;
                    }
                    let Some(id) = queue.pop_front() else {
                        break;
                    };
                    if plan.get(&id).is_none_or(|c| c.is_terminal()) {
                        continue;
                    }

                    match self.prepare(&plan, &snapshot, &id, &delivered) {
                        Ok(job) => {
                            plan.start(&id);
                            let executor = executor.clone();
                            join_set.spawn(async move { executor.run(job).await });
                        }
                        Err(error) => {
                            failure_seen = true;
                            self.settle_failure(&mut plan, &id, error, &*progress, &mut aborted);
                        }
                    }
                }

                let Some(joined) = join_set.join_next().await else {
                    break;
                };
                match joined {
                    Ok(outcome) => {
                        if outcome.result.is_err() {
                            failure_seen = true;
                        }
                        self.settle(
                            &mut plan,
                            outcome,
                            &mut history,
                            &mut delivered,
                            &*progress,
                            &mut aborted,
                        );
                    }
                    Err(e) => {
                        warn!(error = %e, "Call task did not complete");
                        failure_seen = true;
                    }
                }
            }

            // Calls whose task died never reported back
            for id in plan.group(k) {
                if plan.get(&id).is_some_and(|c| c.status() == CallStatus::Running) {
                    let tool = plan
                        .get(&id)
                        .map(|c| c.call.tool_name.clone())
                        .unwrap_or_default();
                    let error = DomainError::ToolExecution {
                        tool,
                        code: "INTERNAL".to_string(),
                        message: "call task terminated unexpectedly".to_string(),
                        transient: false,
                    };
                    self.settle_failure(&mut plan, &id, error, &*progress, &mut aborted);
                }
            }
        }

        self.record_unexecuted(&plan, &mut history);

        let summary = history.summary();
        self.history_sink.record(HistoryEvent::plan_completed(
            strategy,
            &summary,
            aborted.is_some(),
        ));
        let succeeded = plan.count(CallStatus::Succeeded);
        let failed = plan.count(CallStatus::Failed);
        let skipped = plan.count(CallStatus::Skipped);
        info!(succeeded, failed, skipped, "Plan finished");
        progress.on_plan_complete(succeeded, failed, skipped);

        let calls = plan
            .calls()
            .iter()
            .map(|planned| {
                let report = CallReport {
                    id: planned.id().clone(),
                    tool_name: planned.call.tool_name.clone(),
                    status: planned.status(),
                    synthesized: planned.synthesized,
                    group: planned.group,
                    value: None,
                    truncation: None,
                    truncated_fields: Default::default(),
                    note: None,
                    cache_key: None,
                    error: planned.failure().cloned(),
                    skip_reason: planned.skip_reason().cloned(),
                    bindings: planned.bindings.clone(),
                    omitted: planned.omitted.clone(),
                };
                match delivered.remove(planned.id()) {
                    Some(d) => report.with_result(d.truncated, d.cache_key),
                    None => report,
                }
            })
            .collect();

        Ok(PlanResult {
            strategy,
            groups: plan.groups(),
            calls,
            aborted,
            history,
        })
    }

    /// Fill bound parameters from provider results
    fn prepare(
        &self,
        plan: &ExecutionPlan,
        snapshot: &RegistrySnapshot,
        id: &CallId,
        delivered: &HashMap<CallId, Delivered>,
    ) -> Result<CallJob, DomainError> {
        let planned = plan
            .get(id)
            .ok_or_else(|| DomainError::not_found(format!("call '{}'", id)))?;
        let descriptor = snapshot
            .catalog()
            .lookup(&planned.call.tool_name)?
            .clone();

        let mut arguments = planned.call.arguments.clone();
        let mut omitted = planned.omitted.clone();
        for b in &planned.bindings {
            let value = delivered
                .get(&b.provider)
                .and_then(|d| binding::extract(&d.raw, &b.output_field));
            match value {
                Some(value) => {
                    debug!(
                        call = %id,
                        parameter = %b.parameter,
                        provider = %b.provider,
                        field = %b.output_field,
                        "Bound parameter"
                    );
                    arguments.insert(b.parameter.clone(), value);
                }
                None if b.optional => {
                    omitted.insert(b.parameter.clone());
                }
                None => {
                    return Err(DomainError::DependencyUnresolved {
                        tool: descriptor.name.clone(),
                        parameter: b.parameter.clone(),
                        suggestion: format!(
                            "'{}' returned no '{}' field; call it manually and pass the value as '{}'",
                            b.provider_tool, b.output_field, b.parameter
                        ),
                    });
                }
            }
        }

        Ok(CallJob {
            id: id.clone(),
            descriptor,
            arguments,
            omitted,
        })
    }

    fn settle(
        &self,
        plan: &mut ExecutionPlan,
        outcome: CallOutcome,
        history: &mut ExecutionHistory,
        delivered: &mut HashMap<CallId, Delivered>,
        progress: &dyn ExecutionProgressNotifier,
        aborted: &mut Option<SkipReason>,
    ) {
        let CallOutcome {
            id,
            result,
            from_cache,
            cache_key,
            records,
        } = outcome;
        history.extend(records);

        match result {
            Ok(raw) => {
                plan.succeed(&id);
                let tool = plan
                    .get(&id)
                    .map(|c| c.call.tool_name.as_str())
                    .unwrap_or_default();
                debug!(call = %id, tool, from_cache, "Call succeeded");
                progress.on_call_complete(&id, tool, CallStatus::Succeeded, from_cache);
                let truncated = self.truncator.truncate(raw.clone());
                delivered.insert(
                    id,
                    Delivered {
                        raw,
                        truncated,
                        cache_key,
                    },
                );
            }
            Err(error) => self.settle_failure(plan, &id, error, progress, aborted),
        }
    }

    fn settle_failure(
        &self,
        plan: &mut ExecutionPlan,
        id: &CallId,
        error: DomainError,
        progress: &dyn ExecutionProgressNotifier,
        aborted: &mut Option<SkipReason>,
    ) {
        let (tool, critical) = plan
            .get(id)
            .map(|c| (c.call.tool_name.clone(), c.call.is_critical()))
            .unwrap_or_default();
        warn!(call = %id, tool = %tool, error = %error, critical, "Call failed");

        for (skipped, reason) in plan.fail(id, error) {
            debug!(call = %skipped, reason = %reason, "Skipping consumer");
        }
        progress.on_call_complete(id, &tool, CallStatus::Failed, false);

        if critical {
            abort(plan, aborted, SkipReason::PlanAborted { by: id.clone() });
        }
    }

    /// History entries for calls that never reached the invoker
    fn record_unexecuted(&self, plan: &ExecutionPlan, history: &mut ExecutionHistory) {
        let recorded: HashSet<CallId> = history.records().iter().map(|r| r.call_id.clone()).collect();
        let now = self.clock.now();

        for planned in plan.calls() {
            if recorded.contains(planned.id()) {
                continue;
            }
            let outcome = match (planned.failure(), planned.skip_reason()) {
                (Some(error), _) => failed_outcome(error),
                (None, Some(reason)) => RecordOutcome::Skipped {
                    reason: reason.clone(),
                },
                (None, None) => continue,
            };
            let record = ExecutionRecord {
                call_id: planned.id().clone(),
                tool_name: planned.call.tool_name.clone(),
                attempt: 0,
                started_at: now,
                finished_at: now,
                outcome,
            };
            self.history_sink.record(HistoryEvent::attempt(&record));
            history.push(record);
        }
    }
}

fn abort(plan: &mut ExecutionPlan, aborted: &mut Option<SkipReason>, reason: SkipReason) {
    if aborted.is_some() {
        return;
    }
    let skipped = plan.skip_remaining(reason.clone());
    info!(reason = %reason, skipped = skipped.len(), "Plan aborted");
    *aborted = Some(reason);
}

fn ensure_unique_ids(calls: &[ToolCall]) -> Result<(), SubmitPlanError> {
    let mut seen = HashSet::new();
    for call in calls {
        if !seen.insert(&call.id) {
            return Err(SubmitPlanError::DuplicateCallId(call.id.clone()));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, ResolverConfig, RetryPolicy};
    use crate::ports::clock::ManualClock;
    use crate::use_cases::cache_manager::tests::MapStore;
    use async_trait::async_trait;
    use conductor_domain::{
        ToolCatalog, ToolDescriptor, ToolError, ToolParameter, ToolResult,
    };
    use serde_json::json;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    enum Step {
        Fail(ToolError),
        Hang,
    }

    /// Invoker answering from fixed responses, with optional scripted
    /// failures consumed before the response is served
    #[derive(Default)]
    struct ScriptedInvoker {
        responses: HashMap<String, Value>,
        scripts: Mutex<HashMap<String, VecDeque<Step>>>,
        invocations: Mutex<Vec<(String, HashMap<String, Value>)>>,
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        delay: Duration,
    }

    impl ScriptedInvoker {
        fn new() -> Self {
            Self {
                delay: Duration::from_millis(10),
                ..Default::default()
            }
        }

        fn respond(mut self, tool: &str, value: Value) -> Self {
            self.responses.insert(tool.to_string(), value);
            self
        }

        fn script(self, tool: &str, steps: Vec<Step>) -> Self {
            self.scripts
                .lock()
                .unwrap()
                .insert(tool.to_string(), steps.into());
            self
        }

        fn count(&self, tool: &str) -> usize {
            self.invocations
                .lock()
                .unwrap()
                .iter()
                .filter(|(t, _)| t == tool)
                .count()
        }

        fn arguments_of(&self, tool: &str) -> HashMap<String, Value> {
            self.invocations
                .lock()
                .unwrap()
                .iter()
                .find(|(t, _)| t == tool)
                .map(|(_, a)| a.clone())
                .unwrap()
        }

        fn total(&self) -> usize {
            self.invocations.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl ToolInvokerPort for ScriptedInvoker {
        async fn invoke(
            &self,
            tool: &ToolDescriptor,
            arguments: &HashMap<String, Value>,
        ) -> ToolResult {
            self.invocations
                .lock()
                .unwrap()
                .push((tool.name.clone(), arguments.clone()));

            let step = self
                .scripts
                .lock()
                .unwrap()
                .get_mut(&tool.name)
                .and_then(VecDeque::pop_front);
            match step {
                Some(Step::Fail(error)) => return ToolResult::failure(&tool.name, error),
                Some(Step::Hang) => {
                    tokio::time::sleep(Duration::from_secs(3600)).await;
                }
                None => {}
            }

            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            match self.responses.get(&tool.name) {
                Some(value) => ToolResult::success(&tool.name, value.clone()),
                None => ToolResult::failure(&tool.name, ToolError::not_found("no fixture")),
            }
        }
    }

    fn catalog() -> ToolCatalog {
        ToolCatalog::from_descriptors([
            ToolDescriptor::new("getAccounts").with_output("id"),
            ToolDescriptor::new("getMails")
                .with_parameter(ToolParameter::required("accountId"))
                .with_output("id"),
            ToolDescriptor::new("getPayments"),
            ToolDescriptor::new("getReport"),
            ToolDescriptor::new("sendMail").non_idempotent(),
            ToolDescriptor::new("login"),
            ToolDescriptor::new("getAlpha")
                .with_parameter(ToolParameter::required("betaId"))
                .with_output("id"),
            ToolDescriptor::new("getBeta")
                .with_parameter(ToolParameter::required("alphaId"))
                .with_output("id"),
        ])
        .unwrap()
    }

    fn invoker() -> ScriptedInvoker {
        ScriptedInvoker::new()
            .respond("getAccounts", json!([{"id": "acc-1"}, {"id": "acc-2"}]))
            .respond("getMails", json!({"data": [{"id": "m-1", "subject": "hi"}]}))
            .respond(
                "getPayments",
                Value::Array((0..500).map(|i| json!({"id": i, "amount": i})).collect()),
            )
            .respond("getReport", json!({"status": "ready"}))
            .respond("sendMail", json!({"sent": true}))
            .respond("login", json!({"token": "t"}))
    }

    fn use_case(invoker: Arc<ScriptedInvoker>) -> SubmitPlanUseCase {
        let registry = Arc::new(ToolRegistry::with_catalog(
            catalog(),
            ResolverConfig::default(),
        ));
        let clock = Arc::new(ManualClock::default());
        let cache = Arc::new(CacheManager::new(
            Arc::new(MapStore::default()),
            clock.clone(),
            CacheConfig::default(),
        ));
        SubmitPlanUseCase::new(registry, invoker, cache, clock).with_orchestrator_config(
            OrchestratorConfig::default()
                .with_retry(RetryPolicy::default().with_initial_backoff(Duration::from_millis(1))),
        )
    }

    #[tokio::test]
    async fn test_provider_synthesized_and_bound() {
        let invoker = Arc::new(invoker());
        let result = use_case(invoker.clone())
            .execute(SubmitPlanInput::new(vec![ToolCall::new("mails", "getMails")]))
            .await
            .unwrap();

        assert_eq!(
            result.groups,
            vec![vec![CallId::new("auto:getAccounts")], vec![CallId::new("mails")]]
        );
        assert!(result.is_success());
        assert!(result.get("auto:getAccounts").unwrap().synthesized);
        assert_eq!(
            invoker.arguments_of("getMails").get("accountId"),
            Some(&json!("acc-1"))
        );
        assert!(result.get("mails").unwrap().cache_key.is_some());
    }

    #[tokio::test]
    async fn test_cycle_fails_both_without_invoking() {
        let invoker = Arc::new(invoker());
        let result = use_case(invoker.clone())
            .execute(SubmitPlanInput::new(vec![
                ToolCall::new("a", "getAlpha"),
                ToolCall::new("b", "getBeta"),
            ]))
            .await
            .unwrap();

        for id in ["a", "b"] {
            let report = result.get(id).unwrap();
            assert_eq!(report.status, CallStatus::Failed);
            assert!(matches!(
                report.error,
                Some(DomainError::CyclicDependency { .. })
            ));
        }
        assert_eq!(invoker.total(), 0);
        assert_eq!(result.summary().failed, 2);
    }

    #[tokio::test]
    async fn test_large_list_truncated_but_cached_whole() {
        let invoker = Arc::new(invoker());
        let use_case = use_case(invoker.clone()).with_truncator(Truncator::new(100));
        let result = use_case
            .execute(SubmitPlanInput::new(vec![ToolCall::new("p", "getPayments")]))
            .await
            .unwrap();

        let report = result.get("p").unwrap();
        let info = report.truncation.unwrap();
        assert_eq!(info.returned_count, 100);
        assert_eq!(info.total_count, 500);
        assert!(info.truncated);
        assert_eq!(report.value.as_ref().unwrap().as_array().unwrap().len(), 100);

        let key = report.cache_key.as_deref().unwrap();
        let full = use_case.cache.get(key).await.unwrap();
        assert_eq!(full.as_array().unwrap().len(), 500);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeouts_retried_until_success() {
        let invoker = Arc::new(invoker().script("getReport", vec![Step::Hang, Step::Hang]));
        let use_case = use_case(invoker.clone()).with_orchestrator_config(
            OrchestratorConfig::default()
                .with_call_timeout(Duration::from_secs(1))
                .with_retry(RetryPolicy::default().with_max_attempts(3)),
        );

        let result = use_case
            .execute(SubmitPlanInput::new(vec![ToolCall::new("r", "getReport")]))
            .await
            .unwrap();

        assert!(result.is_success());
        assert_eq!(invoker.count("getReport"), 3);

        let records: Vec<_> = result.history.for_call(&CallId::new("r")).collect();
        assert_eq!(records.len(), 3);
        assert!(matches!(
            &records[0].outcome,
            RecordOutcome::Failed { code, transient: true, .. } if code == "TIMEOUT"
        ));
        assert_eq!(records[2].outcome, RecordOutcome::Succeeded);
        assert_eq!(result.summary().retries, 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_bound_exhausted() {
        let invoker = Arc::new(invoker().script(
            "getReport",
            vec![
                Step::Fail(ToolError::unavailable("down")),
                Step::Fail(ToolError::unavailable("down")),
                Step::Fail(ToolError::unavailable("down")),
            ],
        ));
        let result = use_case(invoker.clone())
            .execute(SubmitPlanInput::new(vec![ToolCall::new("r", "getReport")]))
            .await
            .unwrap();

        assert_eq!(result.get("r").unwrap().status, CallStatus::Failed);
        assert_eq!(invoker.count("getReport"), 3);
    }

    #[tokio::test]
    async fn test_non_transient_failure_not_retried_and_skips_consumer() {
        let invoker = Arc::new(invoker().script(
            "getAccounts",
            vec![Step::Fail(ToolError::invalid_argument("bad filter"))],
        ));
        let result = use_case(invoker.clone())
            .execute(SubmitPlanInput::new(vec![ToolCall::new("mails", "getMails")]))
            .await
            .unwrap();

        assert_eq!(invoker.count("getAccounts"), 1);
        assert_eq!(invoker.count("getMails"), 0);
        let mails = result.get("mails").unwrap();
        assert_eq!(mails.status, CallStatus::Skipped);
        assert_eq!(
            mails.skip_reason,
            Some(SkipReason::ProviderFailed {
                provider: CallId::new("auto:getAccounts"),
                parameter: "accountId".into(),
            })
        );
        assert!(result.aborted.is_none());
    }

    #[tokio::test]
    async fn test_optional_dependency_omitted_on_provider_failure() {
        let invoker = Arc::new(invoker().script(
            "getAccounts",
            vec![Step::Fail(ToolError::permission_denied("no access"))],
        ));
        let result = use_case(invoker.clone())
            .execute(SubmitPlanInput::new(vec![
                ToolCall::new("mails", "getMails").with_optional_dependency("accountId"),
            ]))
            .await
            .unwrap();

        let mails = result.get("mails").unwrap();
        assert_eq!(mails.status, CallStatus::Succeeded);
        assert!(mails.omitted.contains("accountId"));
        assert!(!invoker.arguments_of("getMails").contains_key("accountId"));
    }

    #[tokio::test]
    async fn test_warm_cache_skips_invoker() {
        let invoker = Arc::new(invoker());
        let use_case = use_case(invoker.clone());
        let calls = vec![
            ToolCall::new("mails", "getMails"),
            ToolCall::new("p", "getPayments"),
        ];

        let first = use_case
            .execute(SubmitPlanInput::new(calls.clone()))
            .await
            .unwrap();
        let second = use_case.execute(SubmitPlanInput::new(calls)).await.unwrap();

        assert_eq!(first.calls, second.calls);
        assert_eq!(invoker.count("getAccounts"), 1);
        assert_eq!(invoker.count("getMails"), 1);
        assert_eq!(invoker.count("getPayments"), 1);
        assert_eq!(second.summary().cache_hits, 3);
    }

    #[tokio::test]
    async fn test_non_idempotent_tool_never_cached() {
        let invoker = Arc::new(invoker());
        let use_case = use_case(invoker.clone());
        for _ in 0..2 {
            let result = use_case
                .execute(SubmitPlanInput::new(vec![ToolCall::new("s", "sendMail")]))
                .await
                .unwrap();
            assert!(result.get("s").unwrap().cache_key.is_none());
        }
        assert_eq!(invoker.count("sendMail"), 2);
    }

    #[tokio::test]
    async fn test_critical_failure_aborts_remaining() {
        let invoker = Arc::new(invoker().script(
            "login",
            vec![Step::Fail(ToolError::permission_denied("bad credentials"))],
        ));
        let result = use_case(invoker.clone())
            .execute(
                SubmitPlanInput::new(vec![
                    ToolCall::new("login", "login"),
                    ToolCall::new("r", "getReport"),
                    ToolCall::new("mails", "getMails"),
                ])
                .with_strategy(ExecutionStrategy::Sequential),
            )
            .await
            .unwrap();

        assert_eq!(
            result.aborted,
            Some(SkipReason::PlanAborted {
                by: CallId::new("login")
            })
        );
        assert_eq!(result.get("login").unwrap().status, CallStatus::Failed);
        assert_eq!(result.get("r").unwrap().status, CallStatus::Skipped);
        assert_eq!(result.get("mails").unwrap().status, CallStatus::Skipped);
        assert_eq!(invoker.total(), 1);
    }

    #[tokio::test]
    async fn test_critical_override_false_continues() {
        let invoker = Arc::new(invoker().script(
            "login",
            vec![Step::Fail(ToolError::permission_denied("bad credentials"))],
        ));
        let result = use_case(invoker.clone())
            .execute(
                SubmitPlanInput::new(vec![
                    ToolCall::new("login", "login").with_critical(false),
                    ToolCall::new("r", "getReport"),
                ])
                .with_strategy(ExecutionStrategy::Sequential),
            )
            .await
            .unwrap();

        assert!(result.aborted.is_none());
        assert_eq!(result.get("r").unwrap().status, CallStatus::Succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_critical_failure_lets_in_flight_sibling_finish() {
        let invoker = Arc::new(invoker().script(
            "login",
            vec![Step::Fail(ToolError::permission_denied("bad credentials"))],
        ));
        let result = use_case(invoker.clone())
            .with_orchestrator_config(OrchestratorConfig::default().with_max_parallelism(2))
            .execute(
                SubmitPlanInput::new(vec![
                    ToolCall::new("login", "login"),
                    ToolCall::new("r", "getReport"),
                    ToolCall::new("p", "getPayments"),
                    ToolCall::new("a", "getAccounts"),
                    ToolCall::new("mails", "getMails"),
                ])
                .with_strategy(ExecutionStrategy::Parallel),
            )
            .await
            .unwrap();

        assert_eq!(
            result.aborted,
            Some(SkipReason::PlanAborted {
                by: CallId::new("login")
            })
        );
        assert_eq!(result.get("login").unwrap().status, CallStatus::Failed);

        // Started alongside the failing call, so it runs to completion
        let report = result.get("r").unwrap();
        assert_eq!(report.status, CallStatus::Succeeded);
        assert!(report.cache_key.is_some());
        assert_eq!(report.value, Some(json!({"status": "ready"})));

        for id in ["p", "a", "mails"] {
            let skipped = result.get(id).unwrap();
            assert_eq!(skipped.status, CallStatus::Skipped, "{id}");
            assert_eq!(
                skipped.skip_reason,
                Some(SkipReason::PlanAborted {
                    by: CallId::new("login")
                })
            );
        }
        assert_eq!(invoker.count("getReport"), 1);
        assert_eq!(invoker.count("getPayments"), 0);
        assert_eq!(invoker.count("getAccounts"), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sequential_runs_one_at_a_time() {
        let invoker = Arc::new(invoker());
        use_case(invoker.clone())
            .execute(
                SubmitPlanInput::new(vec![
                    ToolCall::new("r", "getReport"),
                    ToolCall::new("p", "getPayments"),
                    ToolCall::new("a", "getAccounts"),
                ])
                .with_strategy(ExecutionStrategy::Sequential),
            )
            .await
            .unwrap();

        assert_eq!(invoker.total(), 3);
        assert_eq!(invoker.max_in_flight.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_parallel_bounded_by_max_parallelism() {
        let invoker = Arc::new(invoker());
        let use_case = use_case(invoker.clone())
            .with_orchestrator_config(OrchestratorConfig::default().with_max_parallelism(2));
        use_case
            .execute(
                SubmitPlanInput::new(vec![
                    ToolCall::new("r", "getReport"),
                    ToolCall::new("p", "getPayments"),
                    ToolCall::new("a", "getAccounts"),
                ])
                .with_strategy(ExecutionStrategy::Parallel),
            )
            .await
            .unwrap();

        assert_eq!(invoker.max_in_flight.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_adaptive_keeps_sibling_successes() {
        let invoker = Arc::new(invoker().script(
            "getReport",
            vec![Step::Fail(ToolError::invalid_argument("bad range"))],
        ));
        let result = use_case(invoker.clone())
            .execute(
                SubmitPlanInput::new(vec![
                    ToolCall::new("r", "getReport"),
                    ToolCall::new("p", "getPayments"),
                    ToolCall::new("a", "getAccounts"),
                ])
                .with_strategy(ExecutionStrategy::Adaptive),
            )
            .await
            .unwrap();

        assert_eq!(result.get("r").unwrap().status, CallStatus::Failed);
        assert_eq!(result.get("p").unwrap().status, CallStatus::Succeeded);
        assert_eq!(result.get("a").unwrap().status, CallStatus::Succeeded);
        assert!(result.aborted.is_none());
    }

    #[tokio::test]
    async fn test_cancelled_before_start_skips_everything() {
        let invoker = Arc::new(invoker());
        let token = CancellationToken::new();
        token.cancel();
        let result = use_case(invoker.clone())
            .with_cancellation(token)
            .execute(SubmitPlanInput::new(vec![ToolCall::new("mails", "getMails")]))
            .await
            .unwrap();

        assert_eq!(result.aborted, Some(SkipReason::Cancelled));
        assert_eq!(result.count(CallStatus::Skipped), 2);
        assert_eq!(invoker.total(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_while_running_finishes_in_flight_call() {
        let invoker = Arc::new(invoker());
        let token = CancellationToken::new();
        let canceller = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            canceller.cancel();
        });

        let result = use_case(invoker.clone())
            .with_cancellation(token)
            .execute(
                SubmitPlanInput::new(vec![
                    ToolCall::new("r", "getReport"),
                    ToolCall::new("p", "getPayments"),
                    ToolCall::new("mails", "getMails"),
                ])
                .with_strategy(ExecutionStrategy::Sequential),
            )
            .await
            .unwrap();

        assert_eq!(result.aborted, Some(SkipReason::Cancelled));
        let report = result.get("r").unwrap();
        assert_eq!(report.status, CallStatus::Succeeded);
        assert!(report.cache_key.is_some());
        assert_eq!(result.get("p").unwrap().status, CallStatus::Skipped);
        assert_eq!(result.get("mails").unwrap().status, CallStatus::Skipped);
        assert_eq!(
            result.get("p").unwrap().skip_reason,
            Some(SkipReason::Cancelled)
        );
        assert_eq!(invoker.total(), 1);
    }

    #[tokio::test]
    async fn test_unknown_tool_fails_alone() {
        let invoker = Arc::new(invoker());
        let result = use_case(invoker)
            .execute(SubmitPlanInput::new(vec![
                ToolCall::new("x", "getNothing"),
                ToolCall::new("r", "getReport"),
            ]))
            .await
            .unwrap();

        assert!(matches!(
            result.get("x").unwrap().error,
            Some(DomainError::NotFound { .. })
        ));
        assert_eq!(result.get("r").unwrap().status, CallStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_missing_bound_field_fails_consumer() {
        let invoker = Arc::new(invoker().respond("getAccounts", json!({"count": 0})));
        let result = use_case(invoker.clone())
            .execute(SubmitPlanInput::new(vec![ToolCall::new("mails", "getMails")]))
            .await
            .unwrap();

        let mails = result.get("mails").unwrap();
        assert_eq!(mails.status, CallStatus::Failed);
        assert!(matches!(
            &mails.error,
            Some(DomainError::DependencyUnresolved { parameter, .. }) if parameter == "accountId"
        ));
        assert_eq!(invoker.count("getMails"), 0);
    }

    #[tokio::test]
    async fn test_duplicate_ids_rejected() {
        let err = use_case(Arc::new(invoker()))
            .execute(SubmitPlanInput::new(vec![
                ToolCall::new("x", "getReport"),
                ToolCall::new("x", "getPayments"),
            ]))
            .await
            .unwrap_err();
        assert!(matches!(err, SubmitPlanError::DuplicateCallId(id) if id.as_str() == "x"));
    }

    #[test]
    fn test_plan_without_execution() {
        let plan = use_case(Arc::new(invoker()))
            .plan(vec![ToolCall::new("mails", "getMails")])
            .unwrap();
        assert_eq!(plan.group_count(), 2);
        assert_eq!(plan.calls().len(), 2);
    }
}
