//! Dependency resolver
//!
//! Turns a list of possibly-incomplete [`ToolCall`]s into a dependency graph:
//!
//! 1. For each missing required parameter, pick the strongest candidate edge
//!    from the [`DependencyIndex`] (ties: fewest unresolved provider
//!    parameters, then provider name).
//! 2. Bind to a call of the provider tool already in the plan, or add a
//!    synthesized provider call (`auto:<tool>`) and resolve it in turn.
//! 3. Parameters without candidates fail the call with
//!    [`DomainError::DependencyUnresolved`], unless the caller marked the
//!    dependency optional.
//! 4. Cycles among bindings fail every call on the cycle with
//!    [`DomainError::CyclicDependency`]. Cycles are never broken by guessing.
//!
//! Resolution is synchronous and does no I/O.

use super::edge::{DependencyEdge, DependencyIndex, rank_edges};
use super::match_rule::MatchRule;
use crate::core::error::DomainError;
use crate::core::string::split_identifier;
use crate::tool::call::{CallId, CallStatus, ToolCall};
use crate::tool::entities::ToolCatalog;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

/// Prefix of calls added by the resolver
pub const SYNTHESIZED_PREFIX: &str = "auto:";

/// A parameter of one call filled from an output of another call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Binding {
    pub parameter: String,
    pub provider: CallId,
    pub provider_tool: String,
    pub output_field: String,
    pub rule: MatchRule,
    /// The consumer may run without this parameter if the provider fails
    #[serde(default)]
    pub optional: bool,
}

/// A call together with everything the resolver decided about it
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedCall {
    pub call: ToolCall,
    pub bindings: Vec<Binding>,
    /// Optional dependencies left unfilled
    pub omitted: BTreeSet<String>,
    /// Added by the resolver rather than requested by the caller
    pub synthesized: bool,
    pub failure: Option<DomainError>,
}

impl ResolvedCall {
    fn new(call: ToolCall, synthesized: bool) -> Self {
        Self {
            call,
            bindings: Vec::new(),
            omitted: BTreeSet::new(),
            synthesized,
            failure: None,
        }
    }

    pub fn id(&self) -> &CallId {
        &self.call.id
    }

    pub fn providers(&self) -> impl Iterator<Item = &CallId> {
        self.bindings.iter().map(|b| &b.provider)
    }
}

/// Output of [`DependencyResolver::resolve`]: caller calls in their
/// original order, followed by synthesized provider calls.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Resolution {
    pub calls: Vec<ResolvedCall>,
}

impl Resolution {
    pub fn get(&self, id: &CallId) -> Option<&ResolvedCall> {
        self.calls.iter().find(|c| c.id() == id)
    }

    pub fn failed(&self) -> impl Iterator<Item = &ResolvedCall> {
        self.calls.iter().filter(|c| c.failure.is_some())
    }

    pub fn synthesized(&self) -> impl Iterator<Item = &ResolvedCall> {
        self.calls.iter().filter(|c| c.synthesized)
    }

    pub fn len(&self) -> usize {
        self.calls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.calls.is_empty()
    }
}

/// Resolves missing parameters against a catalog and its derived edges
pub struct DependencyResolver<'a> {
    catalog: &'a ToolCatalog,
    index: &'a DependencyIndex,
}

enum Choice {
    Bind(DependencyEdge),
    Omit(String),
}

impl<'a> DependencyResolver<'a> {
    pub fn new(catalog: &'a ToolCatalog, index: &'a DependencyIndex) -> Self {
        Self { catalog, index }
    }

    pub fn resolve(&self, calls: Vec<ToolCall>) -> Resolution {
        let mut resolved: Vec<ResolvedCall> = calls
            .into_iter()
            .map(|c| ResolvedCall::new(c, false))
            .collect();

        let mut by_tool: HashMap<String, usize> = HashMap::new();
        for (i, rc) in resolved.iter().enumerate() {
            by_tool.entry(rc.call.tool_name.clone()).or_insert(i);
        }

        let mut next = 0;
        while next < resolved.len() {
            self.resolve_one(next, &mut resolved, &mut by_tool);
            next += 1;
        }

        mark_cycles(&mut resolved);

        for rc in &mut resolved {
            let status = if rc.failure.is_some() {
                CallStatus::Failed
            } else if rc.bindings.is_empty() {
                CallStatus::Ready
            } else {
                CallStatus::AwaitingDependency
            };
            rc.call.transition(status);
        }

        Resolution { calls: resolved }
    }

    fn resolve_one(
        &self,
        idx: usize,
        resolved: &mut Vec<ResolvedCall>,
        by_tool: &mut HashMap<String, usize>,
    ) {
        let tool_name = resolved[idx].call.tool_name.clone();
        let Some(descriptor) = self.catalog.get(&tool_name) else {
            resolved[idx].failure = Some(DomainError::not_found(format!("tool '{}'", tool_name)));
            return;
        };

        let mut choices = Vec::new();
        let mut failure = None;
        {
            let view: &[ResolvedCall] = resolved;
            let tools: &HashMap<String, usize> = by_tool;
            let call = &view[idx].call;

            for param in descriptor.missing_required(&call.arguments) {
                let best = self
                    .index
                    .candidates(&tool_name, &param.name)
                    .iter()
                    .filter(|e| e.provider_tool != tool_name)
                    .min_by(|a, b| rank_edges(a, b, |t| self.unresolved_count(t, view, tools)));

                match best {
                    Some(edge) => choices.push(Choice::Bind(edge.clone())),
                    None if call.is_optional_dependency(&param.name) => {
                        choices.push(Choice::Omit(param.name.clone()))
                    }
                    None => {
                        failure = Some(DomainError::DependencyUnresolved {
                            tool: tool_name.clone(),
                            parameter: param.name.clone(),
                            suggestion: self.suggest(&param.name),
                        });
                        break;
                    }
                }
            }
        }

        if failure.is_some() {
            resolved[idx].failure = failure;
            return;
        }

        for choice in choices {
            match choice {
                Choice::Omit(param) => {
                    resolved[idx].omitted.insert(param);
                }
                Choice::Bind(edge) => {
                    let provider_idx = match by_tool.get(&edge.provider_tool) {
                        Some(&i) => i,
                        None => {
                            let id = synthesized_id(&edge.provider_tool, resolved);
                            resolved.push(ResolvedCall::new(
                                ToolCall::new(id, edge.provider_tool.clone()),
                                true,
                            ));
                            let i = resolved.len() - 1;
                            by_tool.insert(edge.provider_tool.clone(), i);
                            i
                        }
                    };

                    let optional = resolved[idx].call.is_optional_dependency(&edge.consumer_parameter);
                    let binding = Binding {
                        parameter: edge.consumer_parameter,
                        provider: resolved[provider_idx].call.id.clone(),
                        provider_tool: edge.provider_tool,
                        output_field: edge.provider_output,
                        rule: edge.rule,
                        optional,
                    };
                    resolved[idx].bindings.push(binding);
                }
            }
        }
    }

    /// Required parameters the provider would still be missing in this plan
    fn unresolved_count(
        &self,
        tool: &str,
        resolved: &[ResolvedCall],
        by_tool: &HashMap<String, usize>,
    ) -> usize {
        let Some(descriptor) = self.catalog.get(tool) else {
            return usize::MAX;
        };
        match by_tool.get(tool) {
            Some(&i) => descriptor.missing_required(&resolved[i].call.arguments).len(),
            None => descriptor.required_parameters().count(),
        }
    }

    fn suggest(&self, parameter: &str) -> String {
        let tokens = split_identifier(parameter);
        let field = tokens.last().map(String::as_str).unwrap_or(parameter);

        let producers: Vec<&str> = self
            .catalog
            .all()
            .filter(|d| d.declared_outputs.iter().any(|o| o.eq_ignore_ascii_case(field)))
            .map(|d| d.name.as_str())
            .take(5)
            .collect();

        if producers.is_empty() {
            format!(
                "no registered tool declares an output for '{}'; pass '{}' explicitly",
                parameter, parameter
            )
        } else {
            format!(
                "call one of [{}] first and pass its '{}' as '{}'",
                producers.join(", "),
                field,
                parameter
            )
        }
    }
}

fn synthesized_id(tool: &str, resolved: &[ResolvedCall]) -> CallId {
    let taken: HashSet<&str> = resolved.iter().map(|c| c.id().as_str()).collect();
    let base = format!("{}{}", SYNTHESIZED_PREFIX, tool);
    if !taken.contains(base.as_str()) {
        return CallId::new(base);
    }
    let mut n = 2;
    loop {
        let candidate = format!("{}#{}", base, n);
        if !taken.contains(candidate.as_str()) {
            return CallId::new(candidate);
        }
        n += 1;
    }
}

/// Every call in a strongly connected component of the binding graph gets a
/// `CyclicDependency` failure naming the shortest cycle through it.
fn mark_cycles(resolved: &mut [ResolvedCall]) {
    let index_of: HashMap<&CallId, usize> =
        resolved.iter().enumerate().map(|(i, c)| (c.id(), i)).collect();
    let adjacency: Vec<Vec<usize>> = resolved
        .iter()
        .map(|c| c.providers().filter_map(|p| index_of.get(p).copied()).collect())
        .collect();

    let mut failures = Vec::new();
    for component in Tarjan::components(&adjacency) {
        let cyclic = component.len() > 1
            || component.iter().any(|&n| adjacency[n].contains(&n));
        if !cyclic {
            continue;
        }
        let members: HashSet<usize> = component.iter().copied().collect();
        for &node in &component {
            if resolved[node].failure.is_some() {
                continue;
            }
            let Some(path) = shortest_cycle(node, &adjacency, &members) else {
                continue;
            };
            let cycle: Vec<String> = path
                .iter()
                .map(|&i| resolved[i].call.tool_name.clone())
                .collect();
            failures.push((node, cycle));
        }
    }

    for (node, cycle) in failures {
        resolved[node].failure = Some(DomainError::CyclicDependency {
            tool: resolved[node].call.tool_name.clone(),
            cycle,
        });
    }
}

/// Tarjan's strongly connected components
struct Tarjan<'g> {
    adjacency: &'g [Vec<usize>],
    index: Vec<Option<usize>>,
    lowlink: Vec<usize>,
    on_stack: Vec<bool>,
    stack: Vec<usize>,
    next_index: usize,
    components: Vec<Vec<usize>>,
}

impl<'g> Tarjan<'g> {
    fn components(adjacency: &'g [Vec<usize>]) -> Vec<Vec<usize>> {
        let n = adjacency.len();
        let mut tarjan = Tarjan {
            adjacency,
            index: vec![None; n],
            lowlink: vec![0; n],
            on_stack: vec![false; n],
            stack: Vec::new(),
            next_index: 0,
            components: Vec::new(),
        };
        for node in 0..n {
            if tarjan.index[node].is_none() {
                tarjan.connect(node);
            }
        }
        tarjan.components
    }

    fn connect(&mut self, node: usize) {
        self.index[node] = Some(self.next_index);
        self.lowlink[node] = self.next_index;
        self.next_index += 1;
        self.stack.push(node);
        self.on_stack[node] = true;

        for &next in &self.adjacency[node] {
            match self.index[next] {
                None => {
                    self.connect(next);
                    self.lowlink[node] = self.lowlink[node].min(self.lowlink[next]);
                }
                Some(idx) if self.on_stack[next] => {
                    self.lowlink[node] = self.lowlink[node].min(idx);
                }
                Some(_) => {}
            }
        }

        if self.index[node] == Some(self.lowlink[node]) {
            let mut component = Vec::new();
            while let Some(member) = self.stack.pop() {
                self.on_stack[member] = false;
                component.push(member);
                if member == node {
                    break;
                }
            }
            component.reverse();
            self.components.push(component);
        }
    }
}

/// Breadth-first path `start → … → start` inside one component
fn shortest_cycle(
    start: usize,
    adjacency: &[Vec<usize>],
    members: &HashSet<usize>,
) -> Option<Vec<usize>> {
    let mut parent: HashMap<usize, usize> = HashMap::new();
    let mut queue = VecDeque::from([start]);

    while let Some(node) = queue.pop_front() {
        for &next in &adjacency[node] {
            if !members.contains(&next) {
                continue;
            }
            if next == start {
                let mut back = vec![node];
                while let Some(&prev) = back.last().and_then(|n| parent.get(n)) {
                    back.push(prev);
                }
                let mut path = vec![start];
                path.extend(back.into_iter().rev().filter(|&n| n != start));
                path.push(start);
                return Some(path);
            }
            if !parent.contains_key(&next) {
                parent.insert(next, node);
                queue.push_back(next);
            }
        }
    }
    None
}
