//! restbind CLI
//!
//! Command-line interface for inspecting route manifests: generate their
//! OpenAPI document, list their routes and run payloads through their
//! transformers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use restbind::{
    load_json, load_json_auto, FieldError, LoadedManifest, Manifest, Payload, TransformError,
    API_KEY_SCHEME,
};
use serde_json::{json, Value};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "restbind")]
#[command(about = "Inspect route manifests and generate OpenAPI documents")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate the OpenAPI document for a manifest
    Openapi {
        /// Manifest source: file path or URL (http:// or https://)
        manifest: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Pretty-print JSON output
        #[arg(long)]
        pretty: bool,
    },

    /// List every (verb, path) pair and the handler bound to it
    Routes {
        /// Manifest source: file path or URL (http:// or https://)
        manifest: String,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },

    /// Run a payload through a route's input or output transformer
    Validate {
        /// Manifest source: file path or URL (http:// or https://)
        manifest: String,

        /// Payload file to validate
        payload: PathBuf,

        /// Handler as owner.name (e.g., pets.search)
        #[arg(long)]
        route: String,

        /// Treat the payload as request parameters
        #[arg(long, conflicts_with = "output", required_unless_present = "output")]
        input: bool,

        /// Treat the payload as the handler's result
        #[arg(long, conflicts_with = "input", required_unless_present = "input")]
        output: bool,

        /// Output results as JSON (for automation)
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Openapi {
            manifest,
            output,
            pretty,
        } => run_openapi(&manifest, output, pretty),

        Commands::Routes { manifest, json } => run_routes(&manifest, json),

        Commands::Validate {
            manifest,
            payload,
            route,
            input,
            output: _,
            json,
        } => run_validate(&manifest, payload, &route, input, json),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

/// Logs go to stderr so stdout stays machine-readable. `RUST_LOG` overrides
/// the default `warn` level.
fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_manifest(source: &str) -> Result<LoadedManifest, u8> {
    let value = load_json_auto(source).map_err(|e| {
        eprintln!("Error loading manifest: {}", e);
        e.exit_code() as u8
    })?;
    Manifest::from_value(value)
        .and_then(Manifest::load)
        .map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        })
}

fn run_openapi(source: &str, output: Option<PathBuf>, pretty: bool) -> Result<(), u8> {
    let manifest = load_manifest(source)?;

    let document = manifest.openapi().map_err(|e| {
        eprintln!("Error: {}", e);
        2u8
    })?;

    let json_output = if pretty {
        serde_json::to_string_pretty(&document)
    } else {
        serde_json::to_string(&document)
    }
    .map_err(|e| {
        eprintln!("Error serializing output: {}", e);
        2u8
    })?;

    match output {
        Some(path) => {
            std::fs::write(&path, &json_output).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", json_output);
        }
    }

    Ok(())
}

fn run_routes(source: &str, json_output: bool) -> Result<(), u8> {
    let manifest = load_manifest(source)?;

    let mut rows = Vec::new();
    for entry in manifest.registry.entries() {
        let auth = entry
            .descriptor
            .auth()
            .or(manifest.options.default_auth.as_ref())
            .map(|a| a.to_string())
            .unwrap_or_else(|| "-".to_string());
        for (path, verb) in entry.descriptor.routes() {
            rows.push((
                verb.to_string(),
                path.clone(),
                entry.qualified_name(),
                auth.clone(),
            ));
        }
    }

    if json_output {
        let routes: Vec<Value> = rows
            .iter()
            .map(|(verb, path, handler, auth)| {
                json!({ "verb": verb, "path": path, "handler": handler, "auth": auth })
            })
            .collect();
        println!("{}", Value::Array(routes));
    } else {
        for (verb, path, handler, auth) in &rows {
            let marker = if auth == API_KEY_SCHEME { " (api key)" } else { "" };
            println!("{:<8}{:<40}{}{}", verb, path, handler, marker);
        }
    }

    Ok(())
}

fn run_validate(
    source: &str,
    payload_path: PathBuf,
    route: &str,
    input: bool,
    json_output: bool,
) -> Result<(), u8> {
    let manifest = load_manifest(source)?;

    let payload = load_json(&payload_path).map_err(|e| {
        report_error(json_output, &format!("loading payload: {}", e));
        e.exit_code() as u8
    })?;

    let Some(entry) = manifest.route(route) else {
        report_error(json_output, &format!("unknown route \"{}\"", route));
        return Err(2);
    };

    let descriptor = &entry.descriptor;
    let result = if input {
        descriptor
            .input_or_passthrough()
            .from_params(&manifest.schemas, payload)
            .map(Payload::Json)
    } else {
        descriptor
            .output_or_passthrough()
            .to_response(&manifest.schemas, Payload::Json(payload))
    };

    match result {
        Ok(payload) => {
            let document = describe_payload(payload);
            if json_output {
                println!("{}", json!({ "valid": true, "document": document }));
            } else {
                println!(
                    "{}",
                    serde_json::to_string_pretty(&document).unwrap_or_default()
                );
            }
            Ok(())
        }
        Err(TransformError::Validation(e)) => report_invalid(json_output, &e.errors, "Validation"),
        Err(TransformError::InternalContract(e)) => {
            report_invalid(json_output, &e.errors, "Output contract")
        }
        Err(e) => {
            report_error(json_output, &e.to_string());
            Err(2)
        }
    }
}

/// JSON view of a transformed payload.
fn describe_payload(payload: Payload) -> Value {
    match payload {
        Payload::Json(value) => value,
        Payload::Bytes(bytes) => json!({ "length": bytes.len() }),
        Payload::Http(response) => {
            let headers: serde_json::Map<String, Value> = response
                .headers()
                .iter()
                .map(|(name, value)| {
                    (
                        name.to_string(),
                        Value::String(value.to_str().unwrap_or_default().to_string()),
                    )
                })
                .collect();
            json!({
                "status": response.status().as_u16(),
                "headers": headers,
                "length": response.body().len(),
            })
        }
    }
}

fn report_invalid(json_output: bool, errors: &[FieldError], what: &str) -> Result<(), u8> {
    if json_output {
        println!("{}", json!({ "valid": false, "errors": errors }));
    } else {
        eprintln!("{} failed:", what);
        for error in errors {
            eprintln!("  {}", error);
        }
    }
    Err(1)
}

/// Output an error message in plain text or JSON format.
fn report_error(json_output: bool, msg: &str) {
    if json_output {
        println!("{}", json!({ "valid": false, "error": msg }));
    } else {
        eprintln!("Error: {}", msg);
    }
}
