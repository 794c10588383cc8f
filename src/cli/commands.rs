use std::fmt::Write as _;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use http::Method;
use tracing::info;

use crate::config::{DispatchConfig, RouteTable};
use crate::dispatcher::{Dispatcher, ServiceHandler, StaticHandlerMapping};
use crate::echo::echo_handler;
use crate::media::MediaType;
use crate::registry::HandlerTable;
use crate::router::Router;
use crate::server::{RequestContext, ServerRequest, ServerResponse};

/// Command-line interface for routeforge
#[derive(Parser)]
#[command(name = "routeforge", version)]
#[command(about = "Inspect and exercise request dispatch for a route table", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List registered mappings
    Routes {
        /// Route table (YAML, TOML or JSON)
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Validate a route table
    Check {
        #[arg(short, long)]
        file: PathBuf,
    },
    /// Dispatch one request and print the response
    Resolve {
        #[arg(short, long)]
        file: PathBuf,

        /// HTTP method
        #[arg(short, long, default_value = "GET")]
        method: String,

        /// Request target, with optional query string
        #[arg(short, long)]
        path: String,

        /// Accept header value
        #[arg(short, long)]
        accept: Option<String>,

        /// Extra header, `Name: value` (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },
}

/// Answers `/health` without going through the router.
#[derive(Debug, Default)]
pub struct HealthHandler;

impl ServiceHandler for HealthHandler {
    fn name(&self) -> &str {
        "health"
    }

    fn service(
        &self,
        _request: &ServerRequest,
        _ctx: &RequestContext,
        response: &mut ServerResponse,
    ) -> anyhow::Result<()> {
        let body = br#"{"status":"ok"}"#;
        response.set_content_type(&MediaType::application_json());
        response.set_content_length(body.len());
        response.body_mut().write_all(body)?;
        response.body_mut().flush()?;
        Ok(())
    }
}

fn load_router(config: &DispatchConfig, file: &Path) -> anyhow::Result<(Router, HandlerTable)> {
    let table = RouteTable::load(file)?;
    let router = config.router(Arc::new(config.negotiation_manager()));
    let handlers = HandlerTable::from_route_table(&table, &router, echo_handler)
        .with_context(|| format!("failed to register routes from {}", file.display()))?;
    Ok((router, handlers))
}

/// Router and handler table from `file`, wired into a dispatcher with a static
/// `/health` mapping in front.
///
/// # Errors
///
/// Unreadable or invalid route tables and ambiguous mappings.
pub fn build_dispatcher(config: &DispatchConfig, file: &Path) -> anyhow::Result<Dispatcher> {
    let (router, handlers) = load_router(config, file)?;
    let health = StaticHandlerMapping::new()
        .with_order(-1)
        .with_path_resolver(config.path_resolver())
        .with_handler("/health", Arc::new(HealthHandler));
    Ok(config
        .dispatcher(Arc::new(router), Arc::new(handlers))
        .with_mapping(Arc::new(health)))
}

/// One line per mapping: `<methods> <patterns> -> <handler>`.
#[must_use]
pub fn render_routes(router: &Router) -> String {
    let mut out = String::new();
    for (key, handler) in router.routes() {
        let _ = writeln!(out, "{key} -> {handler}");
    }
    out
}

/// Status line, headers and body (lossy UTF-8).
#[must_use]
pub fn render_response(response: &ServerResponse) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", response.status());
    for (name, value) in response.headers() {
        let _ = writeln!(out, "{name}: {}", value.to_str().unwrap_or("<binary>"));
    }
    if !response.body_bytes().is_empty() {
        let _ = writeln!(out);
        out.push_str(&String::from_utf8_lossy(response.body_bytes()));
        out.push('\n');
    }
    out
}

fn build_request(
    config: &DispatchConfig,
    method: &str,
    path: &str,
    accept: Option<&str>,
    headers: &[String],
) -> anyhow::Result<ServerRequest> {
    let method = Method::from_bytes(method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid HTTP method '{method}'"))?;
    let target = format!("{}{path}", config.context_path);
    let mut request = ServerRequest::new(method, &target).with_context_path(&config.context_path);
    if let Some(accept) = accept {
        request = request.with_accept(accept);
    }
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .with_context(|| format!("header '{header}' is not 'Name: value'"))?;
        request = request.with_header(name.trim(), value.trim());
    }
    Ok(request)
}

/// Run a parsed command.
///
/// # Errors
///
/// Route table and request construction failures. A non-2xx dispatch result is
/// printed, not returned as an error.
pub fn run_cli(cli: Cli) -> anyhow::Result<()> {
    let config = DispatchConfig::from_env();
    match &cli.command {
        Commands::Routes { file } => {
            let (router, _) = load_router(&config, file)?;
            print!("{}", render_routes(&router));
            Ok(())
        }
        Commands::Check { file } => {
            let (router, handlers) = load_router(&config, file)?;
            info!(
                path = %file.display(),
                mappings_count = router.registry().len(),
                handlers_count = handlers.len(),
                "Route table is valid"
            );
            println!(
                "{}: {} mappings, {} handlers",
                file.display(),
                router.registry().len(),
                handlers.len()
            );
            Ok(())
        }
        Commands::Resolve {
            file,
            method,
            path,
            accept,
            headers,
        } => {
            let dispatcher = build_dispatcher(&config, file)?;
            let request = build_request(&config, method, path, accept.as_deref(), headers)?;
            let mut response = ServerResponse::new();
            dispatcher.service(&request, &mut response);
            print!("{}", render_response(&response));
            Ok(())
        }
    }
}
