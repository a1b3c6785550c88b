//! Graph evaluation engine.
//!
//! The [`Evaluator`] walks a [`DependencyGraph`] in dependency order. For each
//! resource it substitutes every output reference in the inputs with the
//! value already recorded in [`ResolvedOutputs`], calls the provider, and
//! records the returned fields so that dependents can consume them.
//!
//! # Example
//!
//! ```ignore
//! use stratus_graph::Evaluator;
//! use stratus_provider::SimulatedCloud;
//!
//! let graph = stack.build()?;
//! let evaluation = Evaluator::new().evaluate(&graph, &SimulatedCloud::new()).await;
//! let outputs = evaluation.into_result()?;
//! ```

use core::fmt;
use core::time::Duration;
use std::collections::BTreeSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use futures::StreamExt;
use futures::stream::FuturesUnordered;
use indexmap::IndexMap;
use stratus_provider::{CreateRequest, Fields, Provider, ProviderError};
use tracing::Instrument;

use crate::graph::DependencyGraph;
use crate::hooks::{EvaluationEvent, Hooks};
use crate::outputs::{OutputsError, ResolvedOutputs};
use crate::resource::{ResourceDescriptor, ResourceId};
use crate::value::ResolveError;

/// Lifecycle state of one resource during evaluation.
///
/// `Materialized` and `Failed` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceState {
    /// Part of the graph, evaluation not started.
    Declared,
    /// Waiting for its dependencies or for a free provisioning slot.
    Queued,
    /// Output references in the inputs are being substituted.
    ResolvingInputs,
    /// The provider call is in flight.
    Provisioning,
    /// The provider call succeeded and outputs were recorded.
    Materialized,
    /// Input resolution or the provider call failed.
    Failed,
}

impl ResourceState {
    /// Returns true for `Materialized` and `Failed`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, ResourceState::Materialized | ResourceState::Failed)
    }
}

impl fmt::Display for ResourceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ResourceState::Declared => "declared",
            ResourceState::Queued => "queued",
            ResourceState::ResolvingInputs => "resolving-inputs",
            ResourceState::Provisioning => "provisioning",
            ResourceState::Materialized => "materialized",
            ResourceState::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Why a resource could not be provisioned.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionCause {
    /// The provider call failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// An output reference in the inputs could not be substituted.
    #[error("input resolution failed: {0}")]
    Input(#[from] ResolveError),

    /// The outputs could not be recorded.
    #[error(transparent)]
    Outputs(#[from] OutputsError),
}

/// A resource failed; evaluation halted.
#[derive(Debug, thiserror::Error)]
#[error("failed to provision '{resource}' ({kind}): {cause}")]
pub struct ProvisioningError {
    /// The failing resource.
    pub resource: ResourceId,
    /// Its provider kind.
    pub kind: String,
    /// The underlying cause.
    #[source]
    pub cause: ProvisionCause,
}

/// Errors returned by [`Evaluation::into_result`].
#[derive(Debug, thiserror::Error)]
pub enum EvaluationError {
    /// A resource failed to provision.
    #[error(transparent)]
    Provisioning(#[from] ProvisioningError),

    /// Evaluation was cancelled before every resource was materialized.
    #[error("evaluation cancelled after {materialized} of {total} resources were materialized")]
    Cancelled {
        /// Resources materialized before halting.
        materialized: usize,
        /// Resources in the graph.
        total: usize,
    },
}

/// Cooperative cancellation for a running evaluation.
///
/// Once cancelled, no new provider calls are started. Calls already in
/// flight run to completion and their outputs are recorded. A request
/// applies to the run in progress, or to the next run if none is active,
/// and is cleared when that run returns.
#[derive(Debug, Clone, Default)]
pub struct CancellationHandle {
    cancelled: Arc<AtomicBool>,
}

impl CancellationHandle {
    /// Creates a handle that is not cancelled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Returns true once cancellation was requested.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Clears a pending request.
    pub fn reset(&self) {
        self.cancelled.store(false, Ordering::SeqCst);
    }
}

/// Outcome of one evaluation run.
///
/// Always returned, whether or not every resource was materialized, so that
/// callers can report partially applied state.
#[derive(Debug)]
pub struct Evaluation {
    outputs: ResolvedOutputs,
    states: IndexMap<ResourceId, ResourceState>,
    order: Vec<ResourceId>,
    failures: Vec<ProvisioningError>,
    cancelled: bool,
    duration: Duration,
}

impl Evaluation {
    /// Returns the recorded outputs.
    #[must_use]
    pub fn outputs(&self) -> &ResolvedOutputs {
        &self.outputs
    }

    /// Returns the final state of a resource.
    #[must_use]
    pub fn state(&self, id: &str) -> Option<ResourceState> {
        self.states.get(id).copied()
    }

    /// Returns the final state of every resource in declaration order.
    #[must_use]
    pub fn states(&self) -> &IndexMap<ResourceId, ResourceState> {
        &self.states
    }

    /// Returns the resources in the order they were materialized.
    #[must_use]
    pub fn order(&self) -> &[ResourceId] {
        &self.order
    }

    /// Returns the first failure, if evaluation halted on one.
    #[must_use]
    pub fn failure(&self) -> Option<&ProvisioningError> {
        self.failures.first()
    }

    /// Returns every failure in the order it was observed.
    ///
    /// Calls still in flight when the first failure arrives are drained, so
    /// more than one resource can fail in a single run.
    #[must_use]
    pub fn failures(&self) -> &[ProvisioningError] {
        &self.failures
    }

    /// Returns true if evaluation was cancelled before finishing.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled
    }

    /// Returns true if every resource was materialized.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && !self.cancelled && self.order.len() == self.states.len()
    }

    /// Returns resources that reached `Materialized`, in declaration order.
    #[must_use]
    pub fn materialized(&self) -> Vec<&ResourceId> {
        self.with_state(|state| state == ResourceState::Materialized)
    }

    /// Returns resources that ended in `Failed`, in declaration order.
    #[must_use]
    pub fn failed(&self) -> Vec<&ResourceId> {
        self.with_state(|state| state == ResourceState::Failed)
    }

    /// Returns resources whose provisioning never started.
    ///
    /// These are left `Declared` when a dependency never materialized, or
    /// `Queued` when they were ready but evaluation halted first.
    #[must_use]
    pub fn unreached(&self) -> Vec<&ResourceId> {
        self.with_state(|state| !state.is_terminal())
    }

    fn with_state(&self, keep: impl Fn(ResourceState) -> bool) -> Vec<&ResourceId> {
        self.states
            .iter()
            .filter(|(_, state)| keep(**state))
            .map(|(id, _)| id)
            .collect()
    }

    /// Returns the wall-clock duration of the run.
    #[must_use]
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Converts into the resolved outputs, or the reason evaluation halted.
    ///
    /// # Errors
    ///
    /// Returns [`EvaluationError::Provisioning`] if a resource failed, or
    /// [`EvaluationError::Cancelled`] if evaluation was cancelled first.
    pub fn into_result(self) -> Result<ResolvedOutputs, EvaluationError> {
        if let Some(failure) = self.failures.into_iter().next() {
            return Err(failure.into());
        }
        if self.cancelled {
            return Err(EvaluationError::Cancelled {
                materialized: self.order.len(),
                total: self.states.len(),
            });
        }
        Ok(self.outputs)
    }
}

/// Graph evaluation engine.
///
/// Provisioning is strictly sequential by default. With
/// [`with_max_concurrency`](Self::with_max_concurrency), resources whose
/// dependencies are all materialized may be provisioned concurrently; the
/// observable result is the same as a sequential run, because outputs are
/// only recorded by the scheduling loop and every resource is provisioned at
/// most once.
///
/// Evaluation is fail-fast: after the first failure no new provider calls
/// are started. Nothing is rolled back.
#[derive(Debug)]
pub struct Evaluator {
    /// Maximum number of provider calls in flight.
    max_concurrency: usize,
    /// Observers notified of lifecycle events.
    hooks: Hooks,
    /// Shared cancellation flag.
    cancellation: CancellationHandle,
}

impl Default for Evaluator {
    fn default() -> Self {
        Self::new()
    }
}

impl Evaluator {
    /// Creates a sequential evaluator with no observers.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_concurrency: 1,
            hooks: Hooks::new(),
            cancellation: CancellationHandle::new(),
        }
    }

    /// Sets the maximum number of concurrent provider calls (minimum 1).
    #[must_use]
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }

    /// Replaces the lifecycle observers.
    #[must_use]
    pub fn with_hooks(mut self, hooks: Hooks) -> Self {
        self.hooks = hooks;
        self
    }

    /// Returns the lifecycle observers for registration.
    pub fn hooks_mut(&mut self) -> &mut Hooks {
        &mut self.hooks
    }

    /// Returns the maximum number of concurrent provider calls.
    #[must_use]
    pub fn max_concurrency(&self) -> usize {
        self.max_concurrency
    }

    /// Returns a handle that cancels this evaluator's runs.
    #[must_use]
    pub fn cancellation_handle(&self) -> CancellationHandle {
        self.cancellation.clone()
    }

    /// Evaluates the graph against a provider.
    ///
    /// Resources are released in topological order, ties broken by
    /// declaration order. A resource's provider call receives its inputs with
    /// every output reference replaced by the concrete value returned for the
    /// referenced resource.
    ///
    /// A cancellation request is consumed by the run it stops, so the
    /// evaluator can be reused afterwards.
    pub async fn evaluate<P>(&self, graph: &DependencyGraph, provider: &P) -> Evaluation
    where
        P: Provider + ?Sized,
    {
        let start = Instant::now();
        let total = graph.len();

        let mut outputs = ResolvedOutputs::new();
        let mut states = vec![ResourceState::Declared; total];
        let mut pending: Vec<usize> = (0..total).map(|n| graph.dependencies_at(n).len()).collect();
        let mut ready: BTreeSet<usize> = (0..total).filter(|&n| pending[n] == 0).collect();
        for &n in &ready {
            states[n] = ResourceState::Queued;
        }
        let mut in_flight = FuturesUnordered::new();
        let mut order = Vec::with_capacity(total);
        let mut failures: Vec<ProvisioningError> = Vec::new();
        let mut cancelled = false;

        tracing::info!(
            resources = total,
            max_concurrency = self.max_concurrency,
            "evaluation started"
        );
        self.hooks.invoke(&EvaluationEvent::EvaluationStart {
            resource_count: total,
        });

        loop {
            while failures.is_empty() && !cancelled && in_flight.len() < self.max_concurrency {
                let Some(&next) = ready.first() else {
                    break;
                };
                if self.cancellation.is_cancelled() {
                    tracing::warn!(
                        in_flight = in_flight.len(),
                        "cancellation requested, no new provider calls will start"
                    );
                    cancelled = true;
                    break;
                }
                ready.remove(&next);

                let descriptor = graph.descriptor_at(next);
                states[next] = ResourceState::ResolvingInputs;

                let inputs = match resolve_inputs(descriptor, &outputs) {
                    Ok(inputs) => inputs,
                    Err(err) => {
                        states[next] = ResourceState::Failed;
                        failures.push(self.record_failure(descriptor, err.into()));
                        break;
                    }
                };

                states[next] = ResourceState::Provisioning;
                self.hooks.invoke(&EvaluationEvent::ResourceStart {
                    resource: descriptor.id().clone(),
                    kind: descriptor.kind().to_string(),
                });

                let span = tracing::info_span!(
                    "provision",
                    resource = %descriptor.id(),
                    kind = descriptor.kind()
                );
                let request = CreateRequest::new(descriptor.id().as_str(), descriptor.kind(), inputs);
                in_flight.push(
                    async move {
                        let started = Instant::now();
                        let result = provider.create(request).await;
                        (next, started.elapsed(), result)
                    }
                    .instrument(span),
                );
            }

            let Some((position, elapsed, result)) = in_flight.next().await else {
                break;
            };
            let descriptor = graph.descriptor_at(position);

            let recorded = result
                .map_err(ProvisionCause::from)
                .and_then(|fields| {
                    outputs
                        .insert(descriptor.id().clone(), fields)
                        .map_err(ProvisionCause::from)
                });

            match recorded {
                Ok(()) => {
                    states[position] = ResourceState::Materialized;
                    order.push(descriptor.id().clone());
                    tracing::info!(
                        resource = %descriptor.id(),
                        kind = descriptor.kind(),
                        elapsed_ms = elapsed.as_millis(),
                        "resource materialized"
                    );
                    self.hooks.invoke(&EvaluationEvent::ResourceMaterialized {
                        resource: descriptor.id().clone(),
                        kind: descriptor.kind().to_string(),
                        duration: elapsed,
                    });

                    for &dependent in graph.dependents_at(position) {
                        pending[dependent] -= 1;
                        if pending[dependent] == 0 {
                            states[dependent] = ResourceState::Queued;
                            ready.insert(dependent);
                        }
                    }
                }
                Err(cause) => {
                    states[position] = ResourceState::Failed;
                    failures.push(self.record_failure(descriptor, cause));
                }
            }
        }

        self.cancellation.reset();
        let duration = start.elapsed();
        if let Some(err) = failures.first() {
            tracing::warn!(
                resource = %err.resource,
                failed = failures.len(),
                materialized = order.len(),
                total,
                "evaluation halted"
            );
            self.hooks.invoke(&EvaluationEvent::EvaluationFailure {
                resource: err.resource.clone(),
                error: err.to_string(),
            });
        } else if cancelled {
            self.hooks.invoke(&EvaluationEvent::EvaluationCancelled {
                materialized: order.len(),
            });
        } else {
            tracing::info!(
                materialized = order.len(),
                elapsed_ms = duration.as_millis(),
                "evaluation complete"
            );
            self.hooks.invoke(&EvaluationEvent::EvaluationComplete {
                materialized: order.len(),
                duration,
            });
        }

        let states = graph
            .descriptors()
            .iter()
            .zip(states)
            .map(|(descriptor, state)| (descriptor.id().clone(), state))
            .collect();

        Evaluation {
            outputs,
            states,
            order,
            failures,
            cancelled,
            duration,
        }
    }

    fn record_failure(&self, descriptor: &ResourceDescriptor, cause: ProvisionCause) -> ProvisioningError {
        let err = ProvisioningError {
            resource: descriptor.id().clone(),
            kind: descriptor.kind().to_string(),
            cause,
        };
        tracing::error!(resource = %descriptor.id(), error = %err.cause, "resource failed");
        self.hooks.invoke(&EvaluationEvent::ResourceFailed {
            resource: descriptor.id().clone(),
            kind: descriptor.kind().to_string(),
            error: err.cause.to_string(),
        });
        err
    }
}

/// Substitutes every output reference in a descriptor's inputs.
fn resolve_inputs(
    descriptor: &ResourceDescriptor,
    outputs: &ResolvedOutputs,
) -> Result<Fields, ResolveError> {
    descriptor
        .inputs()
        .iter()
        .map(|(name, value)| Ok((name.clone(), value.resolve(outputs)?)))
        .collect()
}
