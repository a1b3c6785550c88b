//! Resource declarations for the connector.

use serde_json::json;
use stratus_graph::{BuildError, ResourceDescriptor, ResourceHandle, Stack, Value};

use crate::policy;
use crate::settings::ConnectorSettings;

/// S3 bucket kind.
pub const BUCKET_KIND: &str = "aws:s3/bucket:Bucket";
/// IAM role kind.
pub const ROLE_KIND: &str = "aws:iam/role:Role";
/// Managed policy attachment kind.
pub const ROLE_POLICY_ATTACHMENT_KIND: &str = "aws:iam/rolePolicyAttachment:RolePolicyAttachment";
/// Inline role policy kind.
pub const ROLE_POLICY_KIND: &str = "aws:iam/rolePolicy:RolePolicy";
/// Serverless application repository deployment kind.
pub const APPLICATION_KIND: &str =
    "aws:serverlessrepository/cloudFormationStack:CloudFormationStack";
/// Account lookup kind; the provider returns `accountId`.
pub const CALLER_IDENTITY_KIND: &str = "aws:index/getCallerIdentity:getCallerIdentity";
/// Athena data catalog kind.
pub const DATA_CATALOG_KIND: &str = "aws:athena/dataCatalog:DataCatalog";

/// Managed policy granting CloudWatch Logs access to Lambda.
pub const BASIC_EXECUTION_POLICY_ARN: &str =
    "arn:aws:iam::aws:policy/service-role/AWSLambdaBasicExecutionRole";
/// The packaged Redshift connector.
pub const CONNECTOR_APPLICATION_ID: &str =
    "arn:aws:serverlessrepo:us-east-1:292517598671:applications/AthenaRedshiftConnector";
/// Pinned connector release.
pub const CONNECTOR_VERSION: &str = "2025.8.1";
/// Prefix of the Secrets Manager secrets the connector may read.
pub const SECRET_NAME_PREFIX: &str = "athena-redshift-";
/// Capabilities the connector template requires.
pub const CONNECTOR_CAPABILITIES: [&str; 2] = ["CAPABILITY_NAMED_IAM", "CAPABILITY_RESOURCE_POLICY"];

/// Handles to the declared resources.
#[derive(Debug, Clone)]
pub struct ConnectorHandles {
    /// Spill bucket.
    pub spill_bucket: ResourceHandle,
    /// Lambda execution role.
    pub role: ResourceHandle,
    /// Basic execution policy attachment.
    pub basic_execution: ResourceHandle,
    /// Inline connector policy.
    pub inline_policy: ResourceHandle,
    /// Connector application deployment.
    pub connector: ResourceHandle,
    /// Account lookup, when the catalog is registered.
    pub caller_identity: Option<ResourceHandle>,
    /// Athena data catalog, when registered.
    pub catalog: Option<ResourceHandle>,
    /// Name of the connector Lambda function.
    pub lambda_name: String,
}

/// Declares the connector resources and exports on a stack.
///
/// Exports `spill_bucket`, `lambda_name` and `catalog_name`. Without
/// catalog registration, `catalog_name` is the name the catalog would have.
///
/// # Errors
///
/// Returns [`BuildError::DuplicateId`] or [`BuildError::DuplicateExport`] if
/// the stack already holds a resource or export of the same name.
pub fn declare_connector(
    stack: &mut Stack,
    settings: &ConnectorSettings,
) -> Result<ConnectorHandles, BuildError> {
    let name = &settings.name;
    let lambda_name = settings.lambda_name();

    let spill_bucket = stack.declare(
        ResourceDescriptor::new(format!("{name}-spill"), BUCKET_KIND).with_input(
            "lifecycleRules",
            json!([{
                "id": "auto-delete",
                "enabled": true,
                "expiration": { "days": settings.spill_retention_days }
            }]),
        ),
    )?;

    let role = stack.declare(
        ResourceDescriptor::new(format!("{name}-lambda-role"), ROLE_KIND).with_input(
            "assumeRolePolicy",
            policy::assume_role_policy().to_string(),
        ),
    )?;

    let basic_execution = stack.declare(
        ResourceDescriptor::new(format!("{name}-lambda-basic-exec"), ROLE_POLICY_ATTACHMENT_KIND)
            .with_input("role", role.output("name"))
            .with_input("policyArn", BASIC_EXECUTION_POLICY_ARN),
    )?;

    let inline_policy = stack.declare(
        ResourceDescriptor::new(format!("{name}-lambda-inline"), ROLE_POLICY_KIND)
            .with_input("role", role.output("id"))
            .with_input("policy", policy::inline_policy(spill_bucket.output("arn"))),
    )?;

    let connector = stack.declare(
        ResourceDescriptor::new(format!("{name}-connector"), APPLICATION_KIND)
            .with_input("applicationId", CONNECTOR_APPLICATION_ID)
            .with_input("semanticVersion", CONNECTOR_VERSION)
            .with_input(
                "parameters",
                Value::map([
                    ("SecretNamePrefix", Value::from(SECRET_NAME_PREFIX)),
                    ("LambdaFunctionName", Value::from(lambda_name.as_str())),
                    ("SecurityGroupIds", Value::from(settings.security_group_ids.join(","))),
                    ("SubnetIds", Value::from(settings.subnet_ids.join(","))),
                    ("SpillBucket", spill_bucket.output("id")),
                    ("DefaultConnectionString", Value::from(settings.default_connection.as_str())),
                ]),
            )
            .with_input("capabilities", json!(CONNECTOR_CAPABILITIES)),
    )?;

    let (caller_identity, catalog) = if settings.register_catalog {
        let identity = stack.declare(ResourceDescriptor::new(
            format!("{name}-caller-identity"),
            CALLER_IDENTITY_KIND,
        ))?;
        let function_arn = Value::concat([
            Value::from(format!("arn:aws:lambda:{}:", settings.region)),
            identity.output("accountId"),
            Value::from(format!(":function:{lambda_name}")),
        ]);
        let catalog = stack.declare(
            ResourceDescriptor::new(format!("{name}-catalog"), DATA_CATALOG_KIND)
                .with_input("name", settings.catalog_name())
                .with_input("type", "LAMBDA")
                .with_input(
                    "description",
                    "Athena Federated Query Catalog for Redshift Connector",
                )
                .with_input("parameters", Value::map([("function", function_arn)]))
                .depends_on(&connector),
        )?;
        (Some(identity), Some(catalog))
    } else {
        (None, None)
    };

    stack.export("spill_bucket", spill_bucket.output("id"))?;
    stack.export("lambda_name", lambda_name.as_str())?;
    match &catalog {
        Some(catalog) => stack.export("catalog_name", catalog.output("name"))?,
        None => stack.export("catalog_name", settings.catalog_name())?,
    }

    tracing::debug!(
        name = %name,
        resources = stack.len(),
        catalog = settings.register_catalog,
        "connector declared"
    );

    Ok(ConnectorHandles {
        spill_bucket,
        role,
        basic_execution,
        inline_policy,
        connector,
        caller_identity,
        catalog,
        lambda_name,
    })
}
