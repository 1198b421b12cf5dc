//! Running a single call: cache lookup, validation, timed attempts with
//! retry, and offering the result back to the cache.

use crate::config::RetryPolicy;
use crate::ports::clock::Clock;
use crate::ports::history_sink::{HistoryEvent, HistorySink};
use crate::ports::progress::ExecutionProgressNotifier;
use crate::ports::tool_invoker::ToolInvokerPort;
use crate::use_cases::cache_manager::{CacheError, CacheManager};
use conductor_domain::{
    CallId, DomainError, ExecutionRecord, RecordOutcome, ToolDescriptor, ToolValidator,
    result_key,
};
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Everything a spawned call needs, owned
pub(crate) struct CallJob {
    pub id: CallId,
    pub descriptor: ToolDescriptor,
    pub arguments: HashMap<String, Value>,
    /// Parameters whose optional provider did not deliver
    pub omitted: BTreeSet<String>,
}

pub(crate) struct CallOutcome {
    pub id: CallId,
    pub result: Result<Value, DomainError>,
    pub from_cache: bool,
    pub cache_key: Option<String>,
    pub records: Vec<ExecutionRecord>,
}

/// Shared, cloneable collaborators of a call
#[derive(Clone)]
pub(crate) struct CallExecutor {
    pub invoker: Arc<dyn ToolInvokerPort>,
    pub cache: Arc<CacheManager>,
    pub validator: Arc<dyn ToolValidator>,
    pub clock: Arc<dyn Clock>,
    pub history_sink: Arc<dyn HistorySink>,
    pub progress: Arc<dyn ExecutionProgressNotifier>,
    pub retry: RetryPolicy,
    pub call_timeout: Duration,
}

impl CallExecutor {
    pub async fn run(&self, job: CallJob) -> CallOutcome {
        let CallJob {
            id,
            descriptor,
            arguments,
            omitted,
        } = job;
        let tool = descriptor.name.clone();
        let cacheable = self.cache.config().enabled && descriptor.idempotent;
        let key = result_key(&tool, &arguments);
        let mut records = Vec::new();

        self.progress.on_call_start(&id, &tool);

        if cacheable {
            let started_at = self.clock.now();
            match self.cache.get(&key).await {
                Ok(value) => {
                    debug!(call = %id, tool = %tool, key = %key, "Served from cache");
                    self.record(
                        &mut records,
                        &id,
                        &tool,
                        0,
                        started_at,
                        RecordOutcome::CacheHit,
                    );
                    return CallOutcome {
                        id,
                        result: Ok(value),
                        from_cache: true,
                        cache_key: Some(key),
                        records,
                    };
                }
                Err(CacheError::Miss(_)) => {}
                Err(e) => {
                    // Never serve a damaged entry; drop it and run the tool
                    warn!(call = %id, key = %key, error = %e, "Discarding unusable cache entry");
                    if let Err(e) = self.cache.evict(&key).await {
                        warn!(key = %key, error = %e, "Failed to evict cache entry");
                    }
                }
            }
        }

        if let Err(e) = self
            .validator
            .validate(&relax(&descriptor, &omitted), &arguments)
        {
            let error = e.into_domain(&tool);
            let now = self.clock.now();
            self.record(&mut records, &id, &tool, 1, now, failed_outcome(&error));
            return CallOutcome {
                id,
                result: Err(error),
                from_cache: false,
                cache_key: None,
                records,
            };
        }

        let mut attempt = 1u32;
        let result = loop {
            let started_at = self.clock.now();
            let result = match tokio::time::timeout(
                self.call_timeout,
                self.invoker.invoke(&descriptor, &arguments),
            )
            .await
            {
                Ok(result) => result.into_result().map_err(|e| e.into_domain(&tool)),
                Err(_) => Err(DomainError::Timeout {
                    tool: tool.clone(),
                    after_ms: self.call_timeout.as_millis() as u64,
                }),
            };

            match result {
                Ok(value) => {
                    self.record(
                        &mut records,
                        &id,
                        &tool,
                        attempt,
                        started_at,
                        RecordOutcome::Succeeded,
                    );
                    break Ok(value);
                }
                Err(error) => {
                    self.record(
                        &mut records,
                        &id,
                        &tool,
                        attempt,
                        started_at,
                        failed_outcome(&error),
                    );
                    if !self
                        .retry
                        .should_retry(attempt, &error, descriptor.idempotent)
                    {
                        break Err(error);
                    }
                    let backoff = self.retry.backoff_for(attempt);
                    info!(
                        call = %id,
                        tool = %tool,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %error,
                        "Retrying after transient failure"
                    );
                    self.progress
                        .on_call_retry(&id, &tool, attempt, &error, backoff);
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
            }
        };

        let mut cache_key = None;
        if let Ok(value) = &result
            && cacheable
        {
            match self.cache.put(&key, value, None).await {
                Ok(stored) => cache_key = Some(stored),
                Err(e) => warn!(call = %id, key = %key, error = %e, "Failed to cache result"),
            }
        }

        CallOutcome {
            id,
            result,
            from_cache: false,
            cache_key,
            records,
        }
    }

    fn record(
        &self,
        records: &mut Vec<ExecutionRecord>,
        id: &CallId,
        tool: &str,
        attempt: u32,
        started_at: chrono::DateTime<chrono::Utc>,
        outcome: RecordOutcome,
    ) {
        let record = ExecutionRecord {
            call_id: id.clone(),
            tool_name: tool.to_string(),
            attempt,
            started_at,
            finished_at: self.clock.now(),
            outcome,
        };
        self.history_sink.record(HistoryEvent::attempt(&record));
        records.push(record);
    }
}

pub(crate) fn failed_outcome(error: &DomainError) -> RecordOutcome {
    RecordOutcome::Failed {
        code: match error {
            DomainError::ToolExecution { code, .. } => code.clone(),
            other => other.code().to_string(),
        },
        message: error.to_string(),
        transient: error.is_transient(),
    }
}

/// Descriptor with omitted parameters no longer required
fn relax(descriptor: &ToolDescriptor, omitted: &BTreeSet<String>) -> ToolDescriptor {
    let mut relaxed = descriptor.clone();
    for param in &mut relaxed.parameters {
        if omitted.contains(&param.name) {
            param.required = false;
        }
    }
    relaxed
}
