//! In-memory provider that stands in for a real cloud account.
//!
//! [`SimulatedCloud`] accepts every resource kind. It echoes the resolved
//! inputs back as outputs and fills in the identifiers a real provider would
//! assign, so that downstream references have something concrete to resolve
//! against. Dry runs of the CLI and most tests use it.

use crate::error::ProviderError;
use crate::provider::{CreateRequest, Fields, Provider};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

const SUFFIX_ALPHABET: [char; 16] = [
    '0', '1', '2', '3', '4', '5', '6', '7', '8', '9', 'a', 'b', 'c', 'd', 'e', 'f',
];

const SUFFIX_LEN: usize = 7;

/// How physical ids are suffixed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Suffixes {
    Random,
    Sequential,
}

/// In-memory provider with call recording and failure injection.
///
/// Every created resource gets:
///
/// - `id`: `<logical-id>-<7 hex chars>` unless the inputs carry a string
///   `id`; any other `id` input is rejected as invalid
/// - `arn`: `arn:sim:<module>:::<id>`
/// - `name`: the physical id, unless the inputs carry a `name`
///
/// plus any static outputs configured for its kind.
///
/// # Example
///
/// ```
/// # use stratus_provider::{CreateRequest, Fields, Provider, SimulatedCloud};
/// let cloud = SimulatedCloud::new().with_sequential_ids();
/// # let rt = tokio::runtime::Runtime::new().unwrap();
/// # rt.block_on(async {
/// let fields = cloud
///     .create(CreateRequest::new("logs", "aws:s3/bucket:Bucket", Fields::new()))
///     .await
///     .unwrap();
///
/// assert_eq!(fields["id"], "logs-0000000");
/// assert_eq!(fields["arn"], "arn:sim:s3:::logs-0000000");
/// # });
/// ```
#[derive(Debug)]
pub struct SimulatedCloud {
    suffixes: Suffixes,
    counter: AtomicUsize,
    static_outputs: HashMap<String, Fields>,
    failures: HashMap<String, String>,
    calls: Mutex<Vec<CreateRequest>>,
}

impl Default for SimulatedCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulatedCloud {
    /// Creates a simulated cloud with random id suffixes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            suffixes: Suffixes::Random,
            counter: AtomicUsize::new(0),
            static_outputs: HashMap::new(),
            failures: HashMap::new(),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Uses a monotonically increasing counter for id suffixes.
    ///
    /// Makes outputs reproducible across runs with the same creation order.
    #[must_use]
    pub fn with_sequential_ids(mut self) -> Self {
        self.suffixes = Suffixes::Sequential;
        self
    }

    /// Adds a static output field returned for every resource of `kind`.
    ///
    /// Static outputs take precedence over echoed inputs and generated ids.
    #[must_use]
    pub fn with_static_output(
        mut self,
        kind: impl Into<String>,
        field: impl Into<String>,
        value: impl Into<JsonValue>,
    ) -> Self {
        self.static_outputs
            .entry(kind.into())
            .or_default()
            .insert(field.into(), value.into());
        self
    }

    /// Makes creation of the resource with the given logical id fail.
    #[must_use]
    pub fn fail_on(mut self, id: impl Into<String>, message: impl Into<String>) -> Self {
        self.failures.insert(id.into(), message.into());
        self
    }

    /// Returns every creation request received so far, in call order.
    #[must_use]
    pub fn calls(&self) -> Vec<CreateRequest> {
        self.calls.lock().clone()
    }

    /// Returns the logical ids of every creation request, in call order.
    #[must_use]
    pub fn call_ids(&self) -> Vec<String> {
        self.calls.lock().iter().map(|call| call.id.clone()).collect()
    }

    fn next_suffix(&self) -> String {
        match self.suffixes {
            Suffixes::Random => nanoid::nanoid!(SUFFIX_LEN, &SUFFIX_ALPHABET),
            Suffixes::Sequential => {
                let n = self.counter.fetch_add(1, Ordering::Relaxed);
                format!("{n:0width$x}", width = SUFFIX_LEN)
            }
        }
    }
}

/// Extracts the module segment of a kind: `aws:s3/bucket:Bucket` -> `s3`.
fn module_of(kind: &str) -> &str {
    let rest = kind.split_once(':').map_or(kind, |(_, rest)| rest);
    rest.split(['/', ':']).next().unwrap_or(rest)
}

#[async_trait]
impl Provider for SimulatedCloud {
    async fn create(&self, request: CreateRequest) -> Result<Fields, ProviderError> {
        self.calls.lock().push(request.clone());

        if let Some(message) = self.failures.get(&request.id) {
            tracing::debug!(resource = %request.id, "simulated failure");
            return Err(ProviderError::Api {
                code: Some("SimulatedFailure".to_string()),
                message: message.clone(),
                source: None,
            });
        }

        let mut fields = request.inputs.clone();

        let physical_id = match fields.get("id") {
            Some(JsonValue::String(id)) => id.clone(),
            None => format!("{}-{}", request.id, self.next_suffix()),
            Some(other) => {
                return Err(ProviderError::InvalidInputs(format!(
                    "'id' of '{}' must be a string, got {other}",
                    request.id
                )));
            }
        };
        let arn = format!("arn:sim:{}:::{}", module_of(&request.kind), physical_id);

        fields.insert("id".to_string(), JsonValue::String(physical_id.clone()));
        fields.insert("arn".to_string(), JsonValue::String(arn));
        fields
            .entry("name".to_string())
            .or_insert(JsonValue::String(physical_id));

        if let Some(extra) = self.static_outputs.get(&request.kind) {
            for (field, value) in extra {
                fields.insert(field.clone(), value.clone());
            }
        }

        Ok(fields)
    }
}
