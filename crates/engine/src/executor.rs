// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Time-boxed chain executor
//!
//! A chain's queue entry stays in place while it runs and is removed only
//! once a terminal outcome has been recorded, so a kill at any point leaves
//! the chain queued with its last checkpoint. Terminal events use an id
//! derived from the chain, which makes re-running the finalization after a
//! crash a no-op for the event log.

use crate::budget::{effective_budget, TimeBudget};
use crate::bus::ProgressBus;
use crate::error::ExecutorError;
use crate::events::EventManager;
use crate::shutdown::ShutdownController;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tide_adapters::TracedWorkerFactory;
use tide_core::{
    Chain, ChainId, ChainProgress, Clock, CorruptionPolicy, EngineConfig, EventId,
    ExecutionMetrics, RequeuePolicy, TaskCompletionEvent, WorkerFactory, WorkerResult,
};
use tide_storage::{
    ChainStore, Corruption, DocumentStore, DurableQueue, EventStore, ProgressStore,
    StorageError, Substrate,
};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

/// Executor dependencies
pub struct ExecutorDeps<C> {
    pub substrate: Arc<dyn Substrate>,
    pub workers: Arc<dyn WorkerFactory>,
    pub clock: C,
    pub config: EngineConfig,
}

/// What `enqueue_chain` does when the chain id is already queued
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExistingPolicy {
    /// Leave the queued chain and its progress untouched
    #[default]
    Keep,
    /// Overwrite the definition and discard progress
    Replace,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    Accepted,
    Kept,
}

/// How one attempt at a chain ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainOutcome {
    Completed,
    /// Failed and left queued for another attempt
    Requeued,
    /// Failed terminally; removed with a failure event
    Abandoned,
    /// Out of budget; stays queued, not a failure
    Deferred,
    /// Shutdown interrupted it; stays queued, not a failure
    Suspended,
}

enum StepOutcome {
    Done(Option<Value>),
    Failed { message: String, retryable: bool },
    Interrupted,
}

enum TaskOutcome {
    Succeeded(Option<Value>),
    Failed { message: String, retryable: bool },
    TimedOut,
    Cancelled,
}

/// Executes queued chains inside host-imposed time windows
pub struct ChainExecutor<C: Clock> {
    config: EngineConfig,
    clock: C,
    workers: TracedWorkerFactory<Arc<dyn WorkerFactory>>,
    queue: DurableQueue,
    chains: ChainStore,
    progress: ProgressStore,
    docs: DocumentStore,
    events: EventManager<C>,
    budget: Mutex<TimeBudget>,
    shutdown: ShutdownController,
    batch_lock: tokio::sync::Mutex<()>,
    closed: AtomicBool,
    last_metrics: Mutex<Option<ExecutionMetrics>>,
    recovered: Vec<Corruption>,
}

impl<C: Clock> ChainExecutor<C> {
    /// Open the executor over persisted state
    ///
    /// Log corruption is handled per `queue.on_corruption`: `halt` fails with
    /// `StorageError::Corrupt`, `truncate` repairs and keeps the report in
    /// [`ChainExecutor::recovered_corruption`].
    pub fn open(deps: ExecutorDeps<C>) -> Result<Self, ExecutorError> {
        let ExecutorDeps {
            substrate,
            workers,
            clock,
            config,
        } = deps;

        let mut recovered = Vec::new();
        let (queue, store) = match config.queue.on_corruption {
            CorruptionPolicy::Halt => (
                DurableQueue::open(Arc::clone(&substrate), &config.queue)?,
                EventStore::open(
                    Arc::clone(&substrate),
                    clock.clone(),
                    config.event_store.clone(),
                )?,
            ),
            CorruptionPolicy::Truncate => {
                let (queue, queue_corruption) =
                    DurableQueue::open_recovering(Arc::clone(&substrate), &config.queue)?;
                let (store, event_corruption) = EventStore::open_recovering(
                    Arc::clone(&substrate),
                    clock.clone(),
                    config.event_store.clone(),
                )?;
                for corruption in queue_corruption.into_iter().chain(event_corruption) {
                    tracing::error!(%corruption, "recovered from corrupt log");
                    recovered.push(corruption);
                }
                (queue, store)
            }
        };

        let docs = DocumentStore::new(Arc::clone(&substrate));
        let budget = TimeBudget::load(&docs, &config.executor);
        tracing::info!(queued = queue.len(), "executor opened");

        Ok(Self {
            clock,
            workers: TracedWorkerFactory::new(workers),
            queue,
            chains: ChainStore::new(Arc::clone(&substrate)),
            progress: ProgressStore::new(Arc::clone(&substrate)),
            docs,
            events: EventManager::new(Arc::new(store), ProgressBus::new()),
            budget: Mutex::new(budget),
            shutdown: ShutdownController::new(None),
            batch_lock: tokio::sync::Mutex::new(()),
            closed: AtomicBool::new(false),
            last_metrics: Mutex::new(None),
            recovered,
            config,
        })
    }

    /// Run under the host's cancellation scope
    ///
    /// Cancelling `parent` behaves like [`ChainExecutor::request_shutdown`]
    /// without the grace wait.
    pub fn with_parent_token(mut self, parent: CancellationToken) -> Self {
        self.shutdown = ShutdownController::new(Some(parent));
        self
    }

    fn ensure_open(&self) -> Result<(), ExecutorError> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(ExecutorError::Closed);
        }
        Ok(())
    }

    fn budget(&self) -> std::sync::MutexGuard<'_, TimeBudget> {
        self.budget.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn remaining(&self, deadline: Option<Instant>) -> Duration {
        match deadline {
            Some(deadline) => deadline.saturating_duration_since(self.clock.now()),
            None => Duration::MAX,
        }
    }

    /// Persist a chain definition and queue it
    pub fn enqueue_chain(
        &self,
        chain: &Chain,
        policy: ExistingPolicy,
    ) -> Result<EnqueueOutcome, ExecutorError> {
        self.ensure_open()?;
        chain.validate()?;

        if self.queue.contains(&chain.id) && policy == ExistingPolicy::Keep {
            tracing::debug!(chain_id = %chain.id, "chain already queued");
            return Ok(EnqueueOutcome::Kept);
        }
        // Stale progress from an earlier chain with this id must not resume
        self.progress.delete(&chain.id)?;
        let chain = chain.stamped(&self.clock);
        self.chains.save(&chain)?;
        self.queue.enqueue(chain.id.clone())?;
        tracing::info!(
            chain_id = %chain.id,
            steps = chain.total_steps(),
            ?policy,
            "chain enqueued"
        );
        Ok(EnqueueOutcome::Accepted)
    }

    /// Drop a chain with its progress and definition; no event is recorded
    pub fn cancel_chain(&self, chain_id: &ChainId) -> Result<bool, ExecutorError> {
        self.ensure_open()?;
        let dequeued = self.queue.remove(chain_id)?;
        self.progress.delete(chain_id)?;
        let deleted = self.chains.delete(chain_id)?;
        if dequeued || deleted {
            tracing::info!(%chain_id, "chain cancelled");
        }
        Ok(dequeued || deleted)
    }

    /// Execute up to `max_chains` queued chains inside the time budget
    ///
    /// With a host deadline the budget is the time left until
    /// `deadline_epoch_ms` minus the shutdown grace period; otherwise it is
    /// `total_timeout`. Returns the number of chains attempted.
    pub async fn execute_chains_in_batch(
        &self,
        max_chains: usize,
        total_timeout: Duration,
        deadline_epoch_ms: Option<u64>,
    ) -> Result<usize, ExecutorError> {
        self.ensure_open()?;
        let _batch = self
            .batch_lock
            .try_lock()
            .map_err(|_| ExecutorError::BatchInProgress)?;

        let start_ms = self.clock.epoch_ms();
        let budget = effective_budget(
            total_timeout,
            deadline_epoch_ms,
            start_ms,
            self.config.executor.shutdown_grace_period,
        );
        let deadline = self.clock.now().checked_add(budget);
        let mut metrics = ExecutionMetrics::started(&self.config.executor.task_type, start_ms);

        let span = tracing::info_span!(
            "batch",
            max_chains,
            budget_ms = budget.as_millis() as u64,
            queued = self.queue.len()
        );
        let result = self
            .run_batch(max_chains, deadline, &mut metrics)
            .instrument(span)
            .await;

        if let Err(e) = self.budget().save(&self.docs) {
            tracing::warn!(error = %e, "failed to persist time budget");
        }
        metrics.finish(
            self.clock.epoch_ms(),
            budget.as_millis() as u64,
            self.queue.len(),
        );
        tracing::info!(
            attempted = metrics.chains_attempted,
            succeeded = metrics.chains_succeeded,
            failed = metrics.chains_failed,
            killed = metrics.was_killed_by_system,
            remaining = metrics.queue_size_remaining,
            elapsed_ms = metrics.duration_ms,
            "batch finished"
        );
        let attempted = metrics.chains_attempted;
        *self.last_metrics.lock().unwrap_or_else(|e| e.into_inner()) = Some(metrics);
        result.map(|()| attempted)
    }

    async fn run_batch(
        &self,
        max_chains: usize,
        deadline: Option<Instant>,
        metrics: &mut ExecutionMetrics,
    ) -> Result<(), ExecutorError> {
        // Chains already tried in this batch are not picked again
        let mut attempted: HashSet<ChainId> = HashSet::new();

        while metrics.chains_attempted < max_chains {
            if self.shutdown.is_requested() {
                metrics.was_killed_by_system = true;
                break;
            }
            let can_attempt = self.budget().can_attempt(self.remaining(deadline));
            if !can_attempt {
                tracing::debug!("budget exhausted, deferring remaining chains");
                break;
            }
            let next = self
                .queue
                .list()
                .into_iter()
                .find(|id| !attempted.contains(id));
            let Some(chain_id) = next else {
                break;
            };
            attempted.insert(chain_id.clone());
            metrics.chains_attempted += 1;

            match self.run_chain(&chain_id, deadline).await? {
                ChainOutcome::Completed => metrics.chains_succeeded += 1,
                ChainOutcome::Requeued | ChainOutcome::Abandoned => metrics.chains_failed += 1,
                ChainOutcome::Deferred => break,
                ChainOutcome::Suspended => {
                    metrics.was_killed_by_system = true;
                    break;
                }
            }
        }
        Ok(())
    }

    /// Execute the chain at the head of the queue with no outer budget
    ///
    /// Returns false only when the chain failed.
    pub async fn execute_next_chain_from_queue(&self) -> Result<bool, ExecutorError> {
        self.ensure_open()?;
        let _batch = self
            .batch_lock
            .try_lock()
            .map_err(|_| ExecutorError::BatchInProgress)?;
        if self.shutdown.is_requested() {
            return Ok(true);
        }
        let Some(chain_id) = self.queue.peek() else {
            return Ok(true);
        };
        let outcome = self.run_chain(&chain_id, None).await?;
        Ok(!matches!(
            outcome,
            ChainOutcome::Requeued | ChainOutcome::Abandoned
        ))
    }

    async fn run_chain(
        &self,
        chain_id: &ChainId,
        deadline: Option<Instant>,
    ) -> Result<ChainOutcome, ExecutorError> {
        let span = tracing::info_span!("chain", %chain_id);
        self.run_chain_inner(chain_id, deadline)
            .instrument(span)
            .await
    }

    async fn run_chain_inner(
        &self,
        chain_id: &ChainId,
        deadline: Option<Instant>,
    ) -> Result<ChainOutcome, ExecutorError> {
        let chain = match self.chains.load(chain_id) {
            Ok(Some(chain)) => chain,
            Ok(None) => return self.abandon_unreadable(chain_id, "chain definition missing"),
            Err(StorageError::Corrupt(c)) => {
                tracing::error!(corruption = %c, "corrupt chain definition");
                return self.abandon_unreadable(chain_id, "chain definition corrupt");
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = chain.validate() {
            return self.abandon_unreadable(chain_id, &e.to_string());
        }

        let mut progress = match self.progress.load(chain_id) {
            Ok(Some(progress)) if progress.total_steps == chain.total_steps() => progress,
            Ok(Some(progress)) => {
                tracing::error!(
                    recorded = progress.total_steps,
                    defined = chain.total_steps(),
                    "progress does not match chain definition"
                );
                return self.abandon(&chain, "progress does not match chain definition");
            }
            Ok(None) => {
                let fresh = ChainProgress::new(
                    chain.id.clone(),
                    chain.total_steps(),
                    self.config.executor.max_retries,
                );
                self.progress.save(&fresh)?;
                fresh
            }
            Err(StorageError::Corrupt(c)) => {
                tracing::error!(corruption = %c, "corrupt chain progress");
                return self.abandon(&chain, "chain progress corrupt");
            }
            Err(e) => return Err(e.into()),
        };

        if progress.has_exceeded_retries() {
            return self.abandon(&chain, "retries exhausted");
        }
        tracing::info!(
            next_step = progress.next_step_index(),
            retry_count = progress.retry_count,
            "running chain"
        );

        let reporter = self.events.bus().reporter(chain.display_name());
        let mut output = None;
        while let Some(step) = progress.next_step_index() {
            if self.shutdown.is_requested() {
                tracing::info!(step, "chain suspended by shutdown");
                return Ok(ChainOutcome::Suspended);
            }
            let remaining = self.remaining(deadline);
            let configured = self.config.executor.task_timeout;
            let (can_attempt, task_timeout) = {
                let budget = self.budget();
                (
                    budget.can_attempt(remaining),
                    budget.task_timeout(configured, remaining),
                )
            };
            if !can_attempt {
                tracing::info!(step, "chain deferred, budget exhausted");
                return Ok(ChainOutcome::Deferred);
            }

            let started = self.clock.now();
            let outcome = self
                .run_step(&chain, step, &mut progress, task_timeout)
                .await?;
            let step_elapsed = self.clock.now().saturating_duration_since(started);

            match outcome {
                StepOutcome::Done(data) => {
                    self.budget().record_step(step_elapsed);
                    let saving = self.clock.now();
                    progress = progress.with_completed_step(step);
                    self.progress.save(&progress)?;
                    reporter.report_step(
                        progress.completed_steps.len(),
                        progress.total_steps,
                        None,
                    );
                    let overhead = self.clock.now().saturating_duration_since(saving);
                    self.budget().record_overhead(overhead);
                    tracing::info!(
                        step,
                        elapsed_ms = step_elapsed.as_millis() as u64,
                        "step completed"
                    );
                    output = data;
                }
                StepOutcome::Failed { message, retryable } => {
                    return self.fail(&chain, progress, step, message, retryable);
                }
                StepOutcome::Interrupted => {
                    tracing::info!(step, "step interrupted by shutdown");
                    return Ok(ChainOutcome::Suspended);
                }
            }
        }

        self.finalize(
            &chain.id,
            terminal_event_id(&chain),
            TaskCompletionEvent::success(chain.display_name(), output),
        )?;
        tracing::info!("chain completed");
        Ok(ChainOutcome::Completed)
    }

    /// Run the unfinished tasks of one step concurrently
    ///
    /// Every task is awaited; one task failing or timing out does not cancel
    /// its siblings. Every timeout counts as a failure, including one
    /// shortened to fit the remaining budget.
    async fn run_step(
        &self,
        chain: &Chain,
        step_index: usize,
        progress: &mut ChainProgress,
        task_timeout: Duration,
    ) -> Result<StepOutcome, ExecutorError> {
        let Some(step) = chain.step(step_index) else {
            return Ok(StepOutcome::Failed {
                message: format!("step {step_index} missing"),
                retryable: false,
            });
        };
        let done = progress.completed_tasks(step_index);

        let mut pending = Vec::new();
        for (index, task) in step.tasks.iter().enumerate() {
            if done.contains(&index) {
                continue;
            }
            let Some(worker) = self.workers.create_worker(&task.worker_id) else {
                return Ok(StepOutcome::Failed {
                    message: format!("unknown worker: {}", task.worker_id),
                    retryable: false,
                });
            };
            pending.push((index, task, worker));
        }
        tracing::debug!(
            step = step_index,
            pending = pending.len(),
            skipped = done.len(),
            timeout_ms = task_timeout.as_millis() as u64,
            "starting step"
        );

        let token = self.shutdown.scope();
        let mut set = JoinSet::new();
        let mut slots = HashMap::new();
        for (index, task, worker) in pending {
            let input = task.input.clone();
            let token = token.clone();
            let span = tracing::debug_span!("task", step = step_index, task = index);
            let handle = set.spawn(
                async move {
                    tokio::select! {
                        biased;
                        _ = token.cancelled() => TaskOutcome::Cancelled,
                        result = tokio::time::timeout(task_timeout, worker.do_work(input.as_ref())) => {
                            match result {
                                Err(_) => TaskOutcome::TimedOut,
                                Ok(Ok(WorkerResult::Success { data, .. })) => TaskOutcome::Succeeded(data),
                                Ok(Ok(WorkerResult::Failure { message, should_retry })) => {
                                    TaskOutcome::Failed { message, retryable: should_retry }
                                }
                                Ok(Err(e)) => TaskOutcome::Failed {
                                    message: e.to_string(),
                                    retryable: true,
                                },
                            }
                        }
                    }
                }
                .instrument(span),
            );
            slots.insert(handle.id(), (index, task.display_name().to_string()));
        }

        let mut outputs = serde_json::Map::new();
        let mut failures: Vec<(String, String, bool)> = Vec::new();
        let mut interrupted = false;

        while let Some(joined) = set.join_next_with_id().await {
            let (id, outcome) = match joined {
                Ok((id, outcome)) => (id, outcome),
                Err(e) if e.is_panic() => (
                    e.id(),
                    TaskOutcome::Failed {
                        message: "worker panicked".to_string(),
                        retryable: true,
                    },
                ),
                Err(e) => (e.id(), TaskOutcome::Cancelled),
            };
            let Some((index, name)) = slots.get(&id).cloned() else {
                continue;
            };
            match outcome {
                TaskOutcome::Succeeded(data) => {
                    *progress = progress.with_completed_task_in_step(step_index, index);
                    self.progress.save(progress)?;
                    if let Some(data) = data {
                        outputs.insert(name, data);
                    }
                }
                TaskOutcome::Failed { message, retryable } => {
                    tracing::warn!(task = index, reason = %message, retryable, "task failed");
                    failures.push((name, message, retryable));
                }
                TaskOutcome::TimedOut => {
                    let message = format!("timed out after {}ms", task_timeout.as_millis());
                    tracing::warn!(task = index, reason = %message, "task failed");
                    failures.push((name, message, true));
                }
                TaskOutcome::Cancelled => interrupted = true,
            }
        }

        if !failures.is_empty() {
            let retryable = failures.iter().all(|(_, _, retryable)| *retryable);
            let message = failures
                .iter()
                .map(|(name, message, _)| format!("{name}: {message}"))
                .collect::<Vec<_>>()
                .join("; ");
            return Ok(StepOutcome::Failed { message, retryable });
        }
        if interrupted {
            return Ok(StepOutcome::Interrupted);
        }

        let output = if step.tasks.len() == 1 {
            outputs.into_iter().next().map(|(_, data)| data)
        } else if outputs.is_empty() {
            None
        } else {
            Some(Value::Object(outputs))
        };
        Ok(StepOutcome::Done(output))
    }

    fn fail(
        &self,
        chain: &Chain,
        progress: ChainProgress,
        step: usize,
        message: String,
        retryable: bool,
    ) -> Result<ChainOutcome, ExecutorError> {
        let progress = progress.with_failure(step);
        self.progress.save(&progress)?;

        if !retryable || progress.has_exceeded_retries() {
            tracing::warn!(
                step,
                retry_count = progress.retry_count,
                retryable,
                reason = %message,
                "chain failed terminally"
            );
            return self.abandon(chain, &message);
        }

        if self.config.executor.requeue_policy == RequeuePolicy::Tail {
            self.queue.remove(&chain.id)?;
            self.queue.enqueue(chain.id.clone())?;
        }
        tracing::info!(
            step,
            retry_count = progress.retry_count,
            max_retries = progress.max_retries,
            reason = %message,
            "chain requeued after failure"
        );
        Ok(ChainOutcome::Requeued)
    }

    fn abandon(&self, chain: &Chain, message: &str) -> Result<ChainOutcome, ExecutorError> {
        self.finalize(
            &chain.id,
            terminal_event_id(chain),
            TaskCompletionEvent::failure(chain.display_name(), message),
        )?;
        Ok(ChainOutcome::Abandoned)
    }

    fn abandon_unreadable(
        &self,
        chain_id: &ChainId,
        message: &str,
    ) -> Result<ChainOutcome, ExecutorError> {
        tracing::error!(reason = message, "abandoning unreadable chain");
        let event_id = EventId(format!(
            "{chain_id}@unreadable-{}",
            self.clock.epoch_ms()
        ));
        self.finalize(
            chain_id,
            event_id,
            TaskCompletionEvent::failure(chain_id.as_str(), message),
        )?;
        Ok(ChainOutcome::Abandoned)
    }

    /// Record the terminal event, then drop every trace of the chain
    fn finalize(
        &self,
        chain_id: &ChainId,
        event_id: EventId,
        event: TaskCompletionEvent,
    ) -> Result<(), ExecutorError> {
        self.events.record_once(event_id, event)?;
        self.queue.remove(chain_id)?;
        self.progress.delete(chain_id)?;
        self.chains.delete(chain_id)?;
        Ok(())
    }

    /// Ask running work to stop and wait up to the grace period for it
    ///
    /// Interrupted chains keep their queue position and retry count.
    pub async fn request_shutdown(&self) {
        if self.shutdown.request() {
            tracing::info!("shutdown requested");
        }
        let grace = self.config.executor.shutdown_grace_period;
        match tokio::time::timeout(grace, self.batch_lock.lock()).await {
            Ok(_idle) => tracing::debug!("no batch running"),
            Err(_) => tracing::warn!(
                grace_ms = grace.as_millis() as u64,
                "batch still draining after grace period"
            ),
        }
    }

    /// Allow new batches after a shutdown; waits for a draining batch first
    pub async fn reset_shutdown_state(&self) {
        let _idle = self.batch_lock.lock().await;
        self.shutdown.reset();
        tracing::debug!("shutdown state reset");
    }

    pub fn is_shutdown_requested(&self) -> bool {
        self.shutdown.is_requested()
    }

    pub fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            tracing::info!("executor closed");
        }
    }

    /// Shut down, then close
    pub async fn close_async(&self) {
        self.request_shutdown().await;
        self.close();
    }

    pub fn chain_queue_size(&self) -> usize {
        self.queue.len()
    }

    pub fn queued_chains(&self) -> Vec<ChainId> {
        self.queue.list()
    }

    pub fn chain_progress(&self, chain_id: &ChainId) -> Result<Option<ChainProgress>, ExecutorError> {
        Ok(self.progress.load(chain_id)?)
    }

    /// Metrics of the most recent batch
    pub fn last_metrics(&self) -> Option<ExecutionMetrics> {
        self.last_metrics
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn events(&self) -> &EventManager<C> {
        &self.events
    }

    pub fn bus(&self) -> &ProgressBus {
        self.events.bus()
    }

    /// Log corruption repaired while opening
    pub fn recovered_corruption(&self) -> &[Corruption] {
        &self.recovered
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

fn terminal_event_id(chain: &Chain) -> EventId {
    EventId(format!(
        "{}@{}",
        chain.id,
        chain.created_at.timestamp_millis()
    ))
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
