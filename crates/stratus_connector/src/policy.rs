//! IAM policy documents for the connector.

use serde_json::{Value as JsonValue, json};
use stratus_graph::Value;

/// IAM policy language version used by every document.
pub const POLICY_VERSION: &str = "2012-10-17";

/// Actions the connector needs on Glue, Secrets Manager and Athena.
pub const CONNECTOR_ACTIONS: [&str; 4] = [
    "glue:GetConnection",
    "glue:GetConnections",
    "secretsmanager:GetSecretValue",
    "athena:*",
];

/// Trust policy letting Lambda assume the execution role.
#[must_use]
pub fn assume_role_policy() -> JsonValue {
    json!({
        "Version": POLICY_VERSION,
        "Statement": [{
            "Effect": "Allow",
            "Principal": { "Service": "lambda.amazonaws.com" },
            "Action": "sts:AssumeRole"
        }]
    })
}

/// Inline policy granting connector access and writes into the spill bucket.
///
/// `bucket_arn` is usually the bucket's `arn` output; the document is
/// serialized to a JSON string once it resolves.
#[must_use]
pub fn inline_policy(bucket_arn: Value) -> Value {
    Value::json(Value::map([
        ("Version", Value::from(POLICY_VERSION)),
        (
            "Statement",
            Value::list([
                Value::map([
                    ("Effect", Value::from("Allow")),
                    ("Action", Value::literal(json!(CONNECTOR_ACTIONS))),
                    ("Resource", Value::from("*")),
                ]),
                Value::map([
                    ("Effect", Value::from("Allow")),
                    ("Action", Value::literal(json!(["s3:PutObject"]))),
                    ("Resource", Value::concat([bucket_arn, Value::from("/*")])),
                ]),
            ]),
        ),
    ]))
}
