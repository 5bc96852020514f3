//! `test` launches a conformance test against a deployed endpoint and
//! polls the result until it completes or the wait window closes.

use std::time::{Duration, Instant};

use clap::Args;
use microcks_client::{ConnectOptions, TestSpec};
use microcks_shared::{Result, RunnerType};
use tracing::warn;

use super::ServerArgs;

#[derive(Args, Debug)]
pub struct TestArgs {
    /// Service to test, `apiName:apiVersion`
    #[arg(value_name = "SERVICE")]
    pub service: String,

    /// URL of the endpoint under test
    #[arg(value_name = "TESTENDPOINT")]
    pub test_endpoint: String,

    /// Test strategy to apply
    #[arg(value_name = "RUNNER")]
    pub runner: RunnerType,

    #[command(flatten)]
    pub server: ServerArgs,

    /// Time to wait for the test to finish, e.g. 500milli, 20sec or 1min
    #[arg(long = "waitFor", default_value = "5sec")]
    pub wait_for: String,

    /// Secret to use for connecting the test endpoint
    #[arg(long = "secretName")]
    pub secret_name: Option<String>,

    /// List of operations to launch the test for, as a JSON array
    #[arg(long = "filteredOperations")]
    pub filtered_operations: Option<String>,

    /// Override of operations headers, as a JSON object
    #[arg(long = "operationsHeaders")]
    pub operations_headers: Option<String>,

    /// OAuth2 client context for the tested endpoint, as a JSON object
    #[arg(long = "oAuth2Context")]
    pub oauth2_context: Option<String>,
}

/// Runs the test and returns whether it succeeded. The caller decides the
/// process exit code.
pub async fn execute(args: TestArgs, context: &str, options: &ConnectOptions) -> Result<bool> {
    let timeout = parse_wait_for(&args.wait_for);
    let handle = super::connect(&args.server, context, options).await?;

    let spec = TestSpec {
        service_id: args.service,
        test_endpoint: args.test_endpoint,
        runner_type: args.runner,
        timeout,
        secret_name: args.secret_name,
        filtered_operations: args.filtered_operations,
        operations_headers: args.operations_headers,
        oauth2_context: args.oauth2_context,
    };
    let test_result_id = handle.client.create_test_result(&spec).await?;

    // Give the server a moment to get the test underway before polling.
    tokio::time::sleep(Duration::from_secs(1)).await;

    // The wait time is the server-side test timeout, leave it a margin.
    let deadline = Instant::now() + Duration::from_millis(timeout.max(0) as u64 + 10_000);

    let mut success = false;
    while Instant::now() < deadline {
        let summary = handle.client.get_test_result(&test_result_id).await?;
        success = summary.success;
        println!(
            "MicrocksClient got status for test \"{test_result_id}\" - success: {}, inProgress: {}",
            summary.success, summary.in_progress
        );

        if !summary.in_progress {
            break;
        }
        println!("MicrocksTester waiting for 2 seconds before checking again or exiting.");
        tokio::time::sleep(Duration::from_secs(2)).await;
    }

    println!(
        "Full TestResult details are available here: {}/#/tests/{}",
        handle.server_addr, test_result_id
    );
    Ok(success)
}

/// Parses the `--waitFor` value into milliseconds. Accepts `<n>milli`,
/// `<n>sec` and `<n>min`; anything else falls back to 5 seconds.
fn parse_wait_for(value: &str) -> i64 {
    let parsed = if let Some(n) = value.strip_suffix("milli") {
        n.parse::<i64>().ok()
    } else if let Some(n) = value.strip_suffix("sec") {
        n.parse::<i64>().ok().map(|n| n * 1000)
    } else if let Some(n) = value.strip_suffix("min") {
        n.parse::<i64>().ok().map(|n| n * 60 * 1000)
    } else {
        None
    };

    match parsed {
        Some(ms) => ms,
        None => {
            warn!("--waitFor format is wrong. Applying default 5sec");
            5000
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wait_for_accepts_all_units() {
        assert_eq!(parse_wait_for("500milli"), 500);
        assert_eq!(parse_wait_for("20sec"), 20_000);
        assert_eq!(parse_wait_for("1min"), 60_000);
    }

    #[test]
    fn wait_for_falls_back_to_five_seconds() {
        assert_eq!(parse_wait_for("20"), 5000);
        assert_eq!(parse_wait_for("sec"), 5000);
        assert_eq!(parse_wait_for("2hours"), 5000);
        assert_eq!(parse_wait_for(""), 5000);
    }
}
