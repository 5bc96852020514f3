//! Data transfer types for the Microcks APIs

use serde::{Deserialize, Serialize};

use crate::error::MicrocksError;

/// Test strategy executed by the server against a deployed endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RunnerType {
    Http,
    SoapHttp,
    SoapUi,
    Postman,
    OpenApiSchema,
    AsyncApiSchema,
    GrpcProtobuf,
    GraphqlSchema,
}

impl RunnerType {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerType::Http => "HTTP",
            RunnerType::SoapHttp => "SOAP_HTTP",
            RunnerType::SoapUi => "SOAP_UI",
            RunnerType::Postman => "POSTMAN",
            RunnerType::OpenApiSchema => "OPEN_API_SCHEMA",
            RunnerType::AsyncApiSchema => "ASYNC_API_SCHEMA",
            RunnerType::GrpcProtobuf => "GRPC_PROTOBUF",
            RunnerType::GraphqlSchema => "GRAPHQL_SCHEMA",
        }
    }
}

impl std::fmt::Display for RunnerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for RunnerType {
    type Err = MicrocksError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "HTTP" => Ok(RunnerType::Http),
            "SOAP_HTTP" => Ok(RunnerType::SoapHttp),
            "SOAP_UI" => Ok(RunnerType::SoapUi),
            "POSTMAN" => Ok(RunnerType::Postman),
            "OPEN_API_SCHEMA" => Ok(RunnerType::OpenApiSchema),
            "ASYNC_API_SCHEMA" => Ok(RunnerType::AsyncApiSchema),
            "GRPC_PROTOBUF" => Ok(RunnerType::GrpcProtobuf),
            "GRAPHQL_SCHEMA" => Ok(RunnerType::GraphqlSchema),
            other => Err(MicrocksError::Validation(format!(
                "unknown runner type '{other}'"
            ))),
        }
    }
}

/// Grant types accepted in an OAuth2 client context for tests.
pub const OAUTH2_GRANT_TYPES: &[&str] = &["PASSWORD", "CLIENT_CREDENTIALS", "REFRESH_TOKEN"];

/// Body of `POST /api/tests`. The pass-through fields keep whatever JSON the
/// user supplied after it validated against the typed shapes below.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TestRequest {
    pub service_id: String,
    pub test_endpoint: String,
    pub runner_type: RunnerType,
    /// Max test duration in milliseconds
    pub timeout: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filtered_operations: Option<serde_json::Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operations_headers: Option<serde_json::Value>,
    #[serde(rename = "oAuth2Context", skip_serializing_if = "Option::is_none")]
    pub o_auth2_context: Option<serde_json::Value>,
}

/// Condensed view of a Microcks TestResult.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TestResultSummary {
    pub id: String,
    pub version: i32,
    pub test_number: i32,
    pub test_date: i64,
    pub tested_endpoint: String,
    pub service_id: String,
    pub elapsed_time: i32,
    pub success: bool,
    pub in_progress: bool,
}

/// An operation header attached to a test request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HeaderDto {
    pub name: String,
    /// Comma-separated header values
    pub values: String,
}

/// OAuth2 client context attached to a test request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OAuth2ClientContext {
    pub client_id: String,
    pub client_secret: String,
    pub token_uri: String,
    pub username: String,
    pub password: String,
    pub refresh_token: String,
    pub grant_type: String,
    pub scopes: String,
}
