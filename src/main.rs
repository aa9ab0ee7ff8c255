//! flowctx - correlation propagation playground
//!
//! Simulates one inbound request under the configured correlation settings,
//! issues outbound calls against a loopback sender and prints what each
//! call carried on the wire.

use anyhow::Context as _;
use async_trait::async_trait;
use clap::{Parser, Subcommand};
use flowctx::observability::tracing_setup;
use flowctx::{
    ClientBuilder, CorrelationConfig, CorrelationContext, CorrelationSettings, RequestSender,
    TraceIdentifier, TracingRequestNotifier, ambient,
};
use serde_json::{Map, Value, json};
use std::path::PathBuf;

const CONFIG_ENV: &str = "FLOWCTX_CONFIG";

type HttpRequest = http::Request<()>;
type HttpResponse = http::Response<()>;

#[derive(Parser)]
#[command(name = "flowctx")]
#[command(about = "Simulate correlation propagation across service calls", long_about = None)]
#[command(version)]
struct Cli {
    /// Settings file (JSON). Falls back to $FLOWCTX_CONFIG, then defaults.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Handle one simulated inbound request and its outbound calls
    Simulate {
        /// Inbound header as NAME=VALUE (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,

        /// Host trace identifier for the inbound request
        #[arg(long)]
        trace_id: Option<String>,

        /// Custom context field as KEY=VALUE; VALUE is parsed as JSON when possible
        #[arg(short, long = "field")]
        fields: Vec<String>,

        /// Outbound call target (repeatable)
        #[arg(short, long = "outbound")]
        outbound: Vec<String>,
    },

    /// Validate settings and print the effective configuration
    CheckConfig,
}

/// Answers with the request's own headers.
struct EchoSender;

#[async_trait]
impl RequestSender<HttpRequest, HttpResponse> for EchoSender {
    async fn send(&self, request: HttpRequest) -> flowctx::Result<HttpResponse> {
        let mut response = http::Response::new(());
        *response.headers_mut() = request.headers().clone();
        Ok(response)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_setup::init_tracing();

    let cli = Cli::parse();
    let settings = load_settings(cli.config)?;

    let report = match cli.command {
        Commands::Simulate {
            headers,
            trace_id,
            fields,
            outbound,
        } => simulate(&settings, &headers, trace_id, &fields, &outbound).await?,
        Commands::CheckConfig => describe_settings(&settings),
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn load_settings(path: Option<PathBuf>) -> anyhow::Result<CorrelationSettings> {
    let path = path.or_else(|| std::env::var_os(CONFIG_ENV).map(PathBuf::from));
    match path {
        Some(path) => CorrelationSettings::from_path(&path)
            .with_context(|| format!("failed to load settings from {}", path.display())),
        None => Ok(CorrelationSettings::default()),
    }
}

async fn simulate(
    settings: &CorrelationSettings,
    headers: &[String],
    trace_id: Option<String>,
    fields: &[String],
    outbound: &[String],
) -> anyhow::Result<Value> {
    let instrumentation = CorrelationConfig::<HttpRequest, HttpRequest, HttpResponse>::from_settings(settings)
        .with_notifier(TracingRequestNotifier::new())
        .enable()?;
    let client = ClientBuilder::new(&instrumentation).build(EchoSender);

    let mut builder = http::Request::builder().uri("http://flowctx.local/simulate");
    for header in headers {
        let (name, value) = split_pair(header)?;
        builder = builder.header(name, value);
    }
    let mut inbound = builder.body(()).context("invalid inbound header")?;
    if let Some(trace_id) = trace_id {
        inbound.extensions_mut().insert(TraceIdentifier(trace_id));
    }

    tracing::info!(outbound = outbound.len(), "simulating inbound request");
    instrumentation
        .handle_inbound(&inbound, async {
            if !fields.is_empty() {
                let mut ctx = ambient::get_context::<CorrelationContext>()
                    .context("incoming requests are not instrumented")?;
                for field in fields {
                    let (key, value) = split_pair(field)?;
                    let value = serde_json::from_str(value)
                        .unwrap_or_else(|_| Value::String(value.to_string()));
                    ctx.set(key, value)?;
                }
                ambient::set_context(ctx);
            }

            let mut calls = Vec::new();
            for uri in outbound {
                let request = http::Request::builder()
                    .uri(uri.as_str())
                    .body(())
                    .with_context(|| format!("invalid outbound uri `{}`", uri))?;
                let response = client.send(request).await?;
                let wire: Map<String, Value> = response
                    .headers()
                    .iter()
                    .filter_map(|(name, value)| {
                        value
                            .to_str()
                            .ok()
                            .map(|v| (name.to_string(), Value::String(v.to_string())))
                    })
                    .collect();
                calls.push(json!({ "uri": uri, "headers": wire }));
            }

            Ok::<_, anyhow::Error>(json!({
                "context": ambient::get_context::<CorrelationContext>(),
                "outbound": calls,
            }))
        })
        .await?
}

fn describe_settings(settings: &CorrelationSettings) -> Value {
    json!({
        "InstrumentIncomingRequests": settings.instrument_incoming_requests,
        "InstrumentOutgoingRequests": settings.instrument_outgoing_requests,
        "Headers": {
            "CorrelationIdHeaderName": settings.headers.correlation_id().as_str(),
            "RequestIdHeaderName": settings.headers.request_id().as_str(),
        },
        "EndpointFilter": {
            "Allow": settings.endpoint_filter.is_allow_list(),
            "Endpoints": settings.endpoint_filter.patterns().collect::<Vec<_>>(),
        },
    })
}

fn split_pair(pair: &str) -> anyhow::Result<(&str, &str)> {
    pair.split_once('=')
        .map(|(k, v)| (k.trim(), v.trim()))
        .filter(|(k, _)| !k.is_empty())
        .with_context(|| format!("expected KEY=VALUE, got `{}`", pair))
}
