//! One-call deployment: build, evaluate, resolve exports.

use core::fmt;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;
use stratus_provider::Provider;
use tracing::Instrument;

use crate::executor::{Evaluation, Evaluator};
use crate::exports::ExportTable;
use crate::graph::BuildError;
use crate::resource::ResourceId;
use crate::stack::Stack;

/// Overall outcome of a deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DeploymentStatus {
    /// Every resource was materialized.
    Succeeded,
    /// A resource failed and evaluation halted.
    Failed,
    /// Evaluation was cancelled before finishing.
    Cancelled,
}

impl fmt::Display for DeploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DeploymentStatus::Succeeded => "succeeded",
            DeploymentStatus::Failed => "failed",
            DeploymentStatus::Cancelled => "cancelled",
        })
    }
}

/// Everything known after deploying a stack, successful or not.
#[derive(Debug)]
pub struct DeploymentReport {
    stack: String,
    evaluation: Evaluation,
    exports: ExportTable,
}

impl DeploymentReport {
    /// Returns the stack name.
    #[must_use]
    pub fn stack(&self) -> &str {
        &self.stack
    }

    /// Returns the evaluation outcome.
    #[must_use]
    pub fn evaluation(&self) -> &Evaluation {
        &self.evaluation
    }

    /// Returns the resolved exports.
    #[must_use]
    pub fn exports(&self) -> &ExportTable {
        &self.exports
    }

    /// Returns the overall status.
    #[must_use]
    pub fn status(&self) -> DeploymentStatus {
        if self.evaluation.failure().is_some() {
            DeploymentStatus::Failed
        } else if self.evaluation.is_cancelled() {
            DeploymentStatus::Cancelled
        } else {
            DeploymentStatus::Succeeded
        }
    }

    /// Returns true if every resource was materialized.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status() == DeploymentStatus::Succeeded
    }

    /// Splits the report into its parts.
    #[must_use]
    pub fn into_parts(self) -> (Evaluation, ExportTable) {
        (self.evaluation, self.exports)
    }

    /// Builds a serializable summary for display.
    #[must_use]
    pub fn summary(&self) -> DeploymentSummary {
        DeploymentSummary {
            stack: self.stack.clone(),
            status: self.status(),
            failed: self
                .evaluation
                .failures()
                .iter()
                .map(|err| FailedResource {
                    resource: err.resource.clone(),
                    cause: err.cause.to_string(),
                })
                .collect(),
            materialized: self.evaluation.order().to_vec(),
            unreached: self.evaluation.unreached().into_iter().cloned().collect(),
            exports: self.exports.values().clone(),
            unresolved_exports: self
                .exports
                .errors()
                .iter()
                .map(|(name, err)| (name.clone(), err.to_string()))
                .collect(),
            duration_ms: self.evaluation.duration().as_millis(),
        }
    }
}

/// A resource that failed, with the rendered cause.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FailedResource {
    /// The failing resource.
    pub resource: ResourceId,
    /// Why it failed.
    pub cause: String,
}

/// Flat, serializable view of a [`DeploymentReport`].
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct DeploymentSummary {
    /// Stack name.
    pub stack: String,
    /// Overall status.
    pub status: DeploymentStatus,
    /// Resources that failed, first failure first.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub failed: Vec<FailedResource>,
    /// Resources materialized, in completion order.
    pub materialized: Vec<ResourceId>,
    /// Resources never provisioned.
    pub unreached: Vec<ResourceId>,
    /// Resolved exports.
    pub exports: IndexMap<String, JsonValue>,
    /// Exports that could not be resolved, with the reason.
    pub unresolved_exports: IndexMap<String, String>,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u128,
}

impl fmt::Display for DeploymentSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "stack '{}': {}", self.stack, self.status)?;
        for FailedResource { resource, cause } in &self.failed {
            writeln!(f, "  failed: {resource}: {cause}")?;
        }
        writeln!(f, "  materialized ({}):", self.materialized.len())?;
        for id in &self.materialized {
            writeln!(f, "    {id}")?;
        }
        if !self.unreached.is_empty() {
            writeln!(f, "  unreached ({}):", self.unreached.len())?;
            for id in &self.unreached {
                writeln!(f, "    {id}")?;
            }
        }
        writeln!(f, "  exports:")?;
        for (name, value) in &self.exports {
            writeln!(f, "    {name} = {value}")?;
        }
        for (name, reason) in &self.unresolved_exports {
            writeln!(f, "    {name} = <unresolved: {reason}>")?;
        }
        Ok(())
    }
}

impl Evaluator {
    /// Builds the stack's graph, evaluates it, and resolves its exports.
    ///
    /// A provisioning failure does not make this return `Err`; it is reported
    /// through the returned [`DeploymentReport`] alongside whatever was
    /// already materialized.
    ///
    /// # Errors
    ///
    /// Returns a [`BuildError`] if the stack is invalid. No provider call is
    /// made in that case.
    pub async fn deploy<P>(&self, stack: &Stack, provider: &P) -> Result<DeploymentReport, BuildError>
    where
        P: Provider + ?Sized,
    {
        let graph = stack.build().inspect_err(|err| {
            tracing::error!(stack = stack.name(), error = %err, "stack rejected");
        })?;

        let span = tracing::info_span!("deploy", stack = stack.name());
        let evaluation = self.evaluate(&graph, provider).instrument(span).await;
        let exports = stack.exports().resolve(evaluation.outputs());

        Ok(DeploymentReport {
            stack: stack.name().to_string(),
            evaluation,
            exports,
        })
    }
}
