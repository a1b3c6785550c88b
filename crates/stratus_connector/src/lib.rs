//! Federated-query connector topology.
//!
//! Declares the resources that expose a Redshift cluster to Athena through a
//! packaged Lambda connector:
//!
//! | Resource | Kind | Depends on |
//! |----------|------|------------|
//! | `{name}-spill` | S3 bucket with an expiry lifecycle rule | |
//! | `{name}-lambda-role` | IAM role trusted by Lambda | |
//! | `{name}-lambda-basic-exec` | Managed basic-execution policy attachment | role `name` |
//! | `{name}-lambda-inline` | Inline policy | role `id`, bucket `arn` |
//! | `{name}-connector` | Serverless application deployment | bucket `id` |
//! | `{name}-caller-identity` | Account lookup | |
//! | `{name}-catalog` | Athena data catalog of type `LAMBDA` | account, connector |
//!
//! The last two are only declared when catalog registration is enabled.
//!
//! # Example
//!
//! ```
//! use stratus_connector::{ConnectorSettings, declare_connector};
//! use stratus_graph::Stack;
//!
//! let settings = ConnectorSettings::new("analytics", "jdbc:redshift://cluster:5439/dev")
//!     .with_subnet_ids(["subnet-a", "subnet-b"])
//!     .with_security_group_ids(["sg-1"]);
//!
//! let mut stack = Stack::new("dev");
//! let handles = declare_connector(&mut stack, &settings).unwrap();
//!
//! assert_eq!(handles.lambda_name, "analytics-lambda");
//! assert_eq!(stack.len(), 7);
//! ```

pub mod policy;
pub mod settings;
pub mod topology;

pub use settings::{ConnectorSettings, OPTIONAL_KEYS, REQUIRED_KEYS};
pub use topology::{ConnectorHandles, declare_connector};
