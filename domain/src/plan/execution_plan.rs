//! Execution plan
//!
//! An [`ExecutionPlan`] layers a [`Resolution`] into execution groups:
//! group *k* holds every live call whose providers all sit in groups `< k`.
//! Groups run strictly in order, so no consumer starts before its providers
//! reach a terminal state.
//!
//! The plan structure is fixed at construction. Afterwards only call
//! statuses change, through the methods here, which also propagate a
//! failure to the calls that depended on it.

use crate::core::error::DomainError;
use crate::dependency::resolver::{Binding, Resolution};
use crate::tool::call::{CallId, CallStatus, ToolCall};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, VecDeque};

/// Why a call never ran
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    /// A required input comes from a call that failed or was skipped
    ProviderFailed { provider: CallId, parameter: String },
    /// A critical call failed
    PlanAborted { by: CallId },
    /// The caller cancelled the plan
    Cancelled,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::ProviderFailed {
                provider,
                parameter,
            } => write!(
                f,
                "provider '{}' of parameter '{}' did not succeed",
                provider, parameter
            ),
            SkipReason::PlanAborted { by } => {
                write!(f, "plan aborted after critical call '{}' failed", by)
            }
            SkipReason::Cancelled => write!(f, "plan cancelled"),
        }
    }
}

/// One call inside a plan
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedCall {
    pub call: ToolCall,
    pub bindings: Vec<Binding>,
    pub omitted: BTreeSet<String>,
    pub synthesized: bool,
    /// Group index; `None` for calls that were terminal before execution
    pub group: Option<usize>,
    failure: Option<DomainError>,
    skip_reason: Option<SkipReason>,
}

impl PlannedCall {
    pub fn id(&self) -> &CallId {
        &self.call.id
    }

    pub fn status(&self) -> CallStatus {
        self.call.status()
    }

    pub fn failure(&self) -> Option<&DomainError> {
        self.failure.as_ref()
    }

    pub fn skip_reason(&self) -> Option<&SkipReason> {
        self.skip_reason.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.status().is_terminal()
    }

    fn not_started(&self) -> bool {
        matches!(
            self.status(),
            CallStatus::Pending | CallStatus::AwaitingDependency | CallStatus::Ready
        )
    }
}

/// Calls layered into ordered execution groups
#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionPlan {
    calls: Vec<PlannedCall>,
    index: HashMap<CallId, usize>,
    groups: Vec<Vec<usize>>,
}

impl ExecutionPlan {
    /// Build the plan, cascading resolution failures to their consumers.
    pub fn from_resolution(resolution: Resolution) -> Self {
        let calls: Vec<PlannedCall> = resolution
            .calls
            .into_iter()
            .map(|rc| PlannedCall {
                call: rc.call,
                bindings: rc.bindings,
                omitted: rc.omitted,
                synthesized: rc.synthesized,
                group: None,
                failure: rc.failure,
                skip_reason: None,
            })
            .collect();
        let index = calls
            .iter()
            .enumerate()
            .map(|(i, c)| (c.id().clone(), i))
            .collect();

        let mut plan = Self {
            calls,
            index,
            groups: Vec::new(),
        };

        let failed: Vec<usize> = (0..plan.calls.len())
            .filter(|&i| plan.calls[i].failure.is_some())
            .collect();
        for i in failed {
            plan.calls[i].call.transition(CallStatus::Failed);
            plan.propagate(i);
        }

        plan.layer();
        plan
    }

    /// Kahn's algorithm over the live calls; each wave is one group.
    fn layer(&mut self) {
        let live: Vec<usize> = (0..self.calls.len())
            .filter(|&i| !self.calls[i].is_terminal())
            .collect();

        let mut providers_left: HashMap<usize, BTreeSet<usize>> = HashMap::new();
        let mut consumers: HashMap<usize, Vec<usize>> = HashMap::new();
        for &i in &live {
            let providers: BTreeSet<usize> = self.calls[i]
                .bindings
                .iter()
                .filter_map(|b| self.index.get(&b.provider).copied())
                .collect();
            for &p in &providers {
                consumers.entry(p).or_default().push(i);
            }
            providers_left.insert(i, providers);
        }

        let mut frontier: Vec<usize> = live
            .iter()
            .copied()
            .filter(|i| providers_left[i].is_empty())
            .collect();

        while !frontier.is_empty() {
            let k = self.groups.len();
            let mut next = Vec::new();
            for &i in &frontier {
                self.calls[i].group = Some(k);
                for &c in consumers.get(&i).map(Vec::as_slice).unwrap_or(&[]) {
                    if let Some(left) = providers_left.get_mut(&c) {
                        left.remove(&i);
                        if left.is_empty() {
                            next.push(c);
                        }
                    }
                }
            }
            next.sort_unstable();
            self.groups.push(std::mem::take(&mut frontier));
            frontier = next;
        }
    }

    /// Skip or relax every consumer of a call that did not succeed.
    ///
    /// Returns the calls that were skipped as a consequence.
    fn propagate(&mut self, failed: usize) -> Vec<(CallId, SkipReason)> {
        let mut skipped = Vec::new();
        let mut queue = VecDeque::from([failed]);

        while let Some(source) = queue.pop_front() {
            let source_id = self.calls[source].id().clone();
            for i in 0..self.calls.len() {
                if !self.calls[i].not_started() {
                    continue;
                }
                let consumer = &mut self.calls[i];
                let Some(pos) = consumer.bindings.iter().position(|b| b.provider == source_id)
                else {
                    continue;
                };

                if consumer.bindings[pos].optional {
                    let dropped: Vec<Binding> = consumer
                        .bindings
                        .iter()
                        .filter(|b| b.provider == source_id)
                        .cloned()
                        .collect();
                    consumer.bindings.retain(|b| b.provider != source_id);
                    consumer
                        .omitted
                        .extend(dropped.into_iter().map(|b| b.parameter));
                    // A required binding to the same provider still skips
                    continue;
                }

                let reason = SkipReason::ProviderFailed {
                    provider: source_id.clone(),
                    parameter: consumer.bindings[pos].parameter.clone(),
                };
                if consumer.call.transition(CallStatus::Skipped) {
                    consumer.skip_reason = Some(reason.clone());
                    skipped.push((consumer.id().clone(), reason));
                    queue.push_back(i);
                }
            }
        }
        skipped
    }

    pub fn calls(&self) -> &[PlannedCall] {
        &self.calls
    }

    pub fn get(&self, id: &CallId) -> Option<&PlannedCall> {
        self.index.get(id).map(|&i| &self.calls[i])
    }

    pub fn group_count(&self) -> usize {
        self.groups.len()
    }

    /// Call ids of group `k`, in plan order
    pub fn group(&self, k: usize) -> Vec<CallId> {
        self.groups
            .get(k)
            .map(|g| g.iter().map(|&i| self.calls[i].id().clone()).collect())
            .unwrap_or_default()
    }

    pub fn groups(&self) -> Vec<Vec<CallId>> {
        (0..self.groups.len()).map(|k| self.group(k)).collect()
    }

    /// Whether every provider of `id` has reached a terminal state
    pub fn providers_settled(&self, id: &CallId) -> bool {
        self.get(id).is_some_and(|c| {
            c.bindings
                .iter()
                .all(|b| self.get(&b.provider).is_none_or(PlannedCall::is_terminal))
        })
    }

    /// Move a waiting call to `Running`
    pub fn start(&mut self, id: &CallId) -> bool {
        let Some(&i) = self.index.get(id) else {
            return false;
        };
        let call = &mut self.calls[i].call;
        if call.status() == CallStatus::AwaitingDependency {
            call.transition(CallStatus::Ready);
        }
        call.transition(CallStatus::Running)
    }

    pub fn succeed(&mut self, id: &CallId) -> bool {
        match self.index.get(id) {
            Some(&i) => self.calls[i].call.transition(CallStatus::Succeeded),
            None => false,
        }
    }

    /// Record a failure and cascade it. Returns the consumers that were skipped.
    pub fn fail(&mut self, id: &CallId, error: DomainError) -> Vec<(CallId, SkipReason)> {
        let Some(&i) = self.index.get(id) else {
            return Vec::new();
        };
        if !self.calls[i].call.transition(CallStatus::Failed) {
            return Vec::new();
        }
        self.calls[i].failure = Some(error);
        self.propagate(i)
    }

    /// Skip every call that has not started yet
    pub fn skip_remaining(&mut self, reason: SkipReason) -> Vec<CallId> {
        let mut skipped = Vec::new();
        for call in &mut self.calls {
            if call.not_started() && call.call.transition(CallStatus::Skipped) {
                call.skip_reason = Some(reason.clone());
                skipped.push(call.id().clone());
            }
        }
        skipped
    }

    pub fn count(&self, status: CallStatus) -> usize {
        self.calls.iter().filter(|c| c.status() == status).count()
    }

    pub fn is_complete(&self) -> bool {
        self.calls.iter().all(PlannedCall::is_terminal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dependency::{DependencyIndex, DependencyResolver, HeuristicScoring};
    use crate::tool::entities::{ToolCatalog, ToolDescriptor, ToolParameter};

    fn catalog() -> ToolCatalog {
        ToolCatalog::from_descriptors([
            ToolDescriptor::new("getAccounts").with_outputs(["id"]),
            ToolDescriptor::new("getMails")
                .with_parameter(ToolParameter::required("accountId"))
                .with_outputs(["id"]),
            ToolDescriptor::new("getAttachments")
                .with_parameter(ToolParameter::required("mailId"))
                .with_output("url"),
            ToolDescriptor::new("getProfile"),
            ToolDescriptor::new("getUser")
                .with_parameter(ToolParameter::required("sessionToken"))
                .with_output("userId"),
            ToolDescriptor::new("getSession")
                .with_parameter(ToolParameter::required("userId"))
                .with_output("sessionToken"),
        ])
        .unwrap()
    }

    fn plan(calls: Vec<ToolCall>) -> ExecutionPlan {
        let catalog = catalog();
        let index = DependencyIndex::build(&catalog, &HeuristicScoring::default(), &[]);
        ExecutionPlan::from_resolution(DependencyResolver::new(&catalog, &index).resolve(calls))
    }

    fn ids(v: &[&str]) -> Vec<CallId> {
        v.iter().map(|s| CallId::new(*s)).collect()
    }

    #[test]
    fn test_two_groups_for_simple_dependency() {
        let plan = plan(vec![ToolCall::new("m", "getMails")]);

        assert_eq!(plan.group_count(), 2);
        assert_eq!(plan.group(0), ids(&["auto:getAccounts"]));
        assert_eq!(plan.group(1), ids(&["m"]));
    }

    #[test]
    fn test_independent_calls_share_a_group() {
        let plan = plan(vec![
            ToolCall::new("p", "getProfile"),
            ToolCall::new("a", "getAccounts"),
            ToolCall::new("m", "getMails"),
            ToolCall::new("x", "getAttachments"),
        ]);

        assert_eq!(
            plan.groups(),
            vec![ids(&["p", "a"]), ids(&["m"]), ids(&["x"])]
        );
    }

    #[test]
    fn test_groups_form_topological_order() {
        let plan = plan(vec![
            ToolCall::new("x", "getAttachments"),
            ToolCall::new("m", "getMails"),
            ToolCall::new("p", "getProfile"),
        ]);

        for call in plan.calls() {
            let group = call.group.unwrap();
            for binding in &call.bindings {
                let provider_group = plan.get(&binding.provider).unwrap().group.unwrap();
                assert!(provider_group < group, "{} before {}", binding.provider, call.id());
            }
        }
    }

    #[test]
    fn test_cycle_is_failed_and_ungrouped() {
        let plan = plan(vec![
            ToolCall::new("u", "getUser"),
            ToolCall::new("s", "getSession"),
        ]);

        assert_eq!(plan.group_count(), 0);
        assert_eq!(plan.count(CallStatus::Failed), 2);
        assert!(plan.is_complete());
    }

    #[test]
    fn test_failure_cascades_to_consumers() {
        let mut plan = plan(vec![
            ToolCall::new("x", "getAttachments"),
            ToolCall::new("p", "getProfile"),
        ]);

        let accounts = CallId::new("auto:getAccounts");
        assert!(plan.start(&accounts));
        let skipped = plan.fail(
            &accounts,
            DomainError::Timeout {
                tool: "getAccounts".into(),
                after_ms: 10,
            },
        );

        let skipped_ids: Vec<CallId> = skipped.iter().map(|(id, _)| id.clone()).collect();
        assert_eq!(skipped_ids, ids(&["auto:getMails", "x"]));
        assert_eq!(
            plan.get(&CallId::new("x")).unwrap().skip_reason(),
            Some(&SkipReason::ProviderFailed {
                provider: CallId::new("auto:getMails"),
                parameter: "mailId".into(),
            })
        );
        assert_eq!(plan.get(&CallId::new("p")).unwrap().status(), CallStatus::Ready);
    }

    #[test]
    fn test_optional_dependency_survives_provider_failure() {
        let mut plan = plan(vec![
            ToolCall::new("m", "getMails").with_optional_dependency("accountId"),
        ]);

        let accounts = CallId::new("auto:getAccounts");
        plan.start(&accounts);
        let skipped = plan.fail(&accounts, DomainError::Cancelled);

        assert!(skipped.is_empty());
        let mails = plan.get(&CallId::new("m")).unwrap();
        assert_eq!(mails.status(), CallStatus::AwaitingDependency);
        assert!(mails.bindings.is_empty());
        assert!(mails.omitted.contains("accountId"));
        assert!(plan.providers_settled(&CallId::new("m")));
    }

    #[test]
    fn test_skip_remaining_leaves_running_calls() {
        let mut plan = plan(vec![
            ToolCall::new("p", "getProfile"),
            ToolCall::new("a", "getAccounts"),
            ToolCall::new("m", "getMails"),
        ]);

        plan.start(&CallId::new("p"));
        let skipped = plan.skip_remaining(SkipReason::PlanAborted {
            by: CallId::new("a"),
        });

        assert_eq!(skipped, ids(&["a", "m"]));
        assert_eq!(plan.get(&CallId::new("p")).unwrap().status(), CallStatus::Running);
        assert!(plan.succeed(&CallId::new("p")));
        assert!(plan.is_complete());
    }
}
