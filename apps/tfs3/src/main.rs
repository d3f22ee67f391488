//! tfs3 - drive the S3 resources from the command line.
//!
//! Each invocation performs one lifecycle operation on one resource. Input
//! is JSON (a file path, or `-` for stdin); the resulting state is printed
//! to stdout as JSON. Logs go to stderr.
//!
//! # Usage
//!
//! ```text
//! tfs3 [--in-memory] create <type> <plan.json>
//! tfs3 [--in-memory] read   <type> <state.json>
//! tfs3 [--in-memory] update <type> <plan.json> <prior.json>
//! tfs3 [--in-memory] delete <type> <state.json>
//! tfs3 [--in-memory] import <type> <id>
//! tfs3 [--in-memory] data   <type> <config.json>
//! tfs3 --list
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `AWS_REGION` | `us-east-1` | Provider region |
//! | `AWS_ACCOUNT_ID` | `000000000000` | Account used in ARNs |
//! | `AWS_ENDPOINT_URL_S3` | *(unset)* | Custom S3 endpoint |
//! | `AWS_S3_USE_PATH_STYLE` | `false` | Path-style addressing |
//! | `TFS3_DEFAULT_TAGS` | *(unset)* | `k=v,k2=v2` tags applied to every taggable resource |
//! | `TFS3_IGNORE_TAG_KEYS` | *(unset)* | Comma-separated tag keys to ignore |
//! | `TFS3_IGNORE_TAG_KEY_PREFIXES` | *(unset)* | Comma-separated tag key prefixes to ignore |
//! | `TFS3_PROPAGATION_TIMEOUT_SECS` | `120` | Eventual-consistency wait bound |
//! | `LOG_LEVEL` | `info` | Log level filter |
//! | `RUST_LOG` | *(unset)* | Fine-grained tracing filter (overrides `LOG_LEVEL`) |

use std::io::Read;

use anyhow::{Context, Result, bail};
use serde_json::Value;
use tfs3_core::ProviderConfig;
use tfs3_provider::{AwsClient, ResourceRegistry};
use tracing::info;
use tracing_subscriber::EnvFilter;

const VERSION: &str = env!("CARGO_PKG_VERSION");

const USAGE: &str = "usage: tfs3 [--in-memory] <create|read|update|delete|import|data> <type> [file|id] [prior-file]
       tfs3 --list";

/// Initialize the tracing subscriber on stderr.
///
/// Uses `RUST_LOG` if set, otherwise falls back to the `LOG_LEVEL` config value.
fn init_tracing(log_level: &str) -> Result<()> {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        EnvFilter::try_new(log_level)
            .with_context(|| format!("invalid log level filter: {log_level}"))?
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

/// A parsed command line.
#[derive(Debug)]
struct Command {
    operation: String,
    type_name: String,
    input: Option<String>,
    prior: Option<String>,
    in_memory: bool,
}

fn parse_args(args: impl IntoIterator<Item = String>) -> Result<Command> {
    let mut in_memory = false;
    let mut positional = Vec::new();
    for arg in args {
        match arg.as_str() {
            "--in-memory" => in_memory = true,
            "-h" | "--help" => bail!("{USAGE}"),
            _ => positional.push(arg),
        }
    }
    let mut positional = positional.into_iter();
    let (Some(operation), Some(type_name)) = (positional.next(), positional.next()) else {
        bail!("{USAGE}");
    };
    let command = Command {
        operation,
        type_name,
        input: positional.next(),
        prior: positional.next(),
        in_memory,
    };
    if let Some(extra) = positional.next() {
        bail!("unexpected argument {extra:?}\n{USAGE}");
    }
    Ok(command)
}

/// Read a JSON document from a path, or stdin for `-`.
fn read_json(path: Option<&str>) -> Result<Value> {
    let path = path.context("missing JSON input file")?;
    let text = if path == "-" {
        let mut buf = String::new();
        std::io::stdin()
            .read_to_string(&mut buf)
            .context("cannot read stdin")?;
        buf
    } else {
        std::fs::read_to_string(path).with_context(|| format!("cannot read {path}"))?
    };
    serde_json::from_str(&text).with_context(|| format!("invalid JSON in {path}"))
}

fn print_types(registry: &ResourceRegistry) {
    println!("resources:");
    for name in registry.resource_types() {
        println!("  {name}");
    }
    println!("data sources:");
    for name in registry.data_source_types() {
        println!("  {name}");
    }
}

async fn run(registry: &ResourceRegistry, client: &AwsClient, cmd: &Command) -> Result<Value> {
    let ty = cmd.type_name.as_str();
    let state = match cmd.operation.as_str() {
        "create" => registry.create(client, ty, read_json(cmd.input.as_deref())?).await?,
        "read" => registry
            .read(client, ty, read_json(cmd.input.as_deref())?)
            .await?
            .unwrap_or(Value::Null),
        "update" => {
            let plan = read_json(cmd.input.as_deref())?;
            let prior = read_json(cmd.prior.as_deref()).context("update needs a prior state")?;
            registry.update(client, ty, prior, plan).await?
        }
        "delete" => {
            registry.delete(client, ty, read_json(cmd.input.as_deref())?).await?;
            Value::Null
        }
        "import" => {
            let id = cmd.input.as_deref().context("import needs a resource ID")?;
            registry.import(client, ty, id).await?
        }
        "data" => registry.read_data(client, ty, read_json(cmd.input.as_deref())?).await?,
        other => bail!("unknown operation {other:?}\n{USAGE}"),
    };
    Ok(state)
}

#[tokio::main]
async fn main() -> Result<()> {
    let registry = ResourceRegistry::s3();
    if std::env::args().any(|a| a == "--list") {
        print_types(&registry);
        return Ok(());
    }

    let config = ProviderConfig::from_env();
    init_tracing(&config.log_level)?;

    let cmd = parse_args(std::env::args().skip(1))?;
    info!(
        operation = %cmd.operation,
        resource = %cmd.type_name,
        region = %config.region,
        in_memory = cmd.in_memory,
        version = VERSION,
        "starting tfs3",
    );

    let client = if cmd.in_memory {
        AwsClient::in_memory(&config)
    } else {
        AwsClient::connect(&config).await
    };

    let state = run(&registry, &client, &cmd)
        .await
        .with_context(|| format!("{} {} failed", cmd.operation, cmd.type_name))?;
    println!(
        "{}",
        serde_json::to_string_pretty(&state).context("cannot encode state")?
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_owned()).collect()
    }

    #[test]
    fn test_should_parse_update_with_prior_state() {
        let cmd = parse_args(args(&["--in-memory", "update", "aws_s3_bucket", "plan.json", "prior.json"]))
            .unwrap();
        assert!(cmd.in_memory);
        assert_eq!(cmd.operation, "update");
        assert_eq!(cmd.type_name, "aws_s3_bucket");
        assert_eq!(cmd.input.as_deref(), Some("plan.json"));
        assert_eq!(cmd.prior.as_deref(), Some("prior.json"));
    }

    #[test]
    fn test_should_reject_incomplete_command_line() {
        assert!(parse_args(args(&["create"])).is_err());
        assert!(parse_args(args(&["read", "aws_s3_bucket", "a", "b", "c"])).is_err());
    }

    #[tokio::test]
    async fn test_should_import_and_delete_in_memory() {
        let registry = ResourceRegistry::s3();
        let client = AwsClient::in_memory(&ProviderConfig::default());
        let dir = tempfile::tempdir().unwrap();
        let plan = dir.path().join("plan.json");
        std::fs::write(&plan, r#"{"bucket": "cli-bucket"}"#).unwrap();

        let create = Command {
            operation: "create".to_owned(),
            type_name: "aws_s3_bucket".to_owned(),
            input: Some(plan.to_string_lossy().into_owned()),
            prior: None,
            in_memory: true,
        };
        let state = run(&registry, &client, &create).await.unwrap();
        assert_eq!(state["id"], "cli-bucket");

        let import = Command {
            operation: "import".to_owned(),
            input: Some("cli-bucket".to_owned()),
            ..create
        };
        let imported = run(&registry, &client, &import).await.unwrap();
        assert_eq!(imported["bucket"], "cli-bucket");

        let unknown = Command {
            operation: "plan".to_owned(),
            ..import
        };
        assert!(run(&registry, &client, &unknown).await.is_err());
    }
}
