//! TinyRequest - command-line front end over the headless core
//!
//! Every invocation loads the storage root, applies one command, and saves
//! what changed. The UI layer drives the same `AppState` operations.

use std::path::PathBuf;

use anyhow::{anyhow, bail, Context};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use tinyrequest::app::BodyKind;
use tinyrequest::constants::{HTTP_METHODS, LOG_FILE};
use tinyrequest::{AppState, HttpExecutor, ReqwestTransport, SendOutcome, StorageLayout};

#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(long, help = "storage root (defaults to the platform config directory)")]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List collections and their requests
    List,
    /// Create an empty collection
    NewCollection {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
    },
    /// Save a request into a collection
    AddRequest {
        #[arg(short, long, help = "collection name or id")]
        collection: String,
        name: String,
        method: String,
        url: String,
        #[arg(short = 'H', long = "header", help = "header as 'Name: value'")]
        headers: Vec<String>,
        #[arg(short = 'd', long, help = "request body")]
        body: Option<String>,
    },
    /// Send a saved request, or an ad-hoc one with --url
    Send {
        #[arg(short, long, help = "collection name or id")]
        collection: Option<String>,
        #[arg(short, long, help = "request name inside the collection")]
        request: Option<String>,
        #[arg(long)]
        url: Option<String>,
        #[arg(short = 'X', long, default_value = "GET")]
        method: String,
        #[arg(short = 'H', long = "header", help = "header as 'Name: value'")]
        headers: Vec<String>,
    },
    /// Show a collection's cookie jar
    Cookies {
        #[arg(short, long, help = "collection name or id")]
        collection: String,
        #[arg(long, help = "drop expired cookies")]
        sweep: bool,
    },
    /// Show or change settings
    Settings {
        #[arg(long)]
        auto_save: Option<bool>,
        #[arg(long, help = "auto-save interval in seconds (30-3600)")]
        auto_save_interval: Option<u64>,
        #[arg(long, help = "request timeout in seconds")]
        timeout: Option<u64>,
        #[arg(long)]
        ssl_verify: Option<bool>,
    },
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let layout = match &cli.root {
        Some(root) => StorageLayout::new(root),
        None => StorageLayout::from_default_root()?,
    };
    layout.ensure_dirs()?;

    // Initialize logging to file
    let file_appender = tracing_appender::rolling::never(layout.root(), LOG_FILE);
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut state = AppState::create(layout).context("failed to open storage")?;
    report_load_problems(&state);

    match cli.command {
        Command::List => list(&state),
        Command::NewCollection { name, description } => {
            state.create_collection(&name, &description)?;
            state.save_all_collections()?;
            println!("Created collection '{}'", name);
        }
        Command::AddRequest {
            collection,
            name,
            method,
            url,
            headers,
            body,
        } => {
            select_collection(&mut state, &collection)?;
            state.new_scratch_request();
            fill_scratch(&mut state, &method, &url, &headers)?;
            if let Some(body) = body {
                let kind = BodyKind::sniff(&body);
                state
                    .target_request_mut()
                    .headers
                    .update("Content-Type", &kind.content_type())?;
                state.body_kind = kind;
                state.set_content_buffer(kind, &body);
            }
            state.add_request_to_active_collection(&name)?;
            state.save_all_collections()?;
            println!("Saved '{}' to '{}'", name, collection);
        }
        Command::Send {
            collection,
            request,
            url,
            method,
            headers,
        } => {
            match (&collection, &request, &url) {
                (Some(collection), Some(request), None) => {
                    select_collection(&mut state, collection)?;
                    let index = state
                        .active_collection()
                        .and_then(|c| c.find_request_by_name(request))
                        .ok_or_else(|| anyhow!("no request named '{}'", request))?;
                    state.set_active_request(index)?;
                }
                (_, None, Some(url)) => {
                    if let Some(collection) = &collection {
                        select_collection(&mut state, collection)?;
                    }
                    state.new_scratch_request();
                    fill_scratch(&mut state, &method, url, &headers)?;
                }
                _ => bail!("use --collection with --request, or --url"),
            }

            let transport = ReqwestTransport::from_settings(&state.settings.http)?;
            let mut executor = HttpExecutor::new(transport);
            let outcome = executor.send(&mut state);
            println!("{}", state.status_message);
            if let Ok(SendOutcome::Completed { .. }) = outcome {
                print_response(&state);
            }
            if state.has_unsaved_changes() {
                state.shutdown()?;
            }
            outcome?;
        }
        Command::Cookies { collection, sweep } => {
            let index = select_collection(&mut state, &collection)?;
            if sweep {
                let removed = state
                    .manager
                    .collection_mut(index)
                    .map(|c| c.cookie_jar.cleanup_expired())
                    .unwrap_or(0);
                if removed > 0 {
                    state.mark_changed();
                    state.save_all_collections()?;
                }
                println!("Removed {} expired cookie(s)", removed);
            }
            if let Some(c) = state.manager.collection(index) {
                for cookie in c.cookie_jar.iter() {
                    let expires = if cookie.is_session() {
                        "session".to_string()
                    } else {
                        chrono::DateTime::from_timestamp(cookie.expires, 0)
                            .map(|t| t.to_rfc2822())
                            .unwrap_or_else(|| cookie.expires.to_string())
                    };
                    println!(
                        "{}={}  domain={} path={} expires={}{}{}",
                        cookie.name,
                        cookie.value,
                        cookie.domain,
                        cookie.path,
                        expires,
                        if cookie.secure { " secure" } else { "" },
                        if cookie.http_only { " httponly" } else { "" },
                    );
                }
            }
        }
        Command::Settings {
            auto_save,
            auto_save_interval,
            timeout,
            ssl_verify,
        } => {
            let changed = auto_save.is_some()
                || auto_save_interval.is_some()
                || timeout.is_some()
                || ssl_verify.is_some();
            if let Some(enabled) = auto_save {
                state.settings.collections.auto_save_enabled = enabled;
            }
            if let Some(seconds) = auto_save_interval {
                state.settings.set_auto_save_interval(seconds);
            }
            if let Some(seconds) = timeout {
                state.settings.http.timeout = seconds;
            }
            if let Some(verify) = ssl_verify {
                state.settings.http.ssl_verify_enabled = verify;
            }
            if changed {
                state.settings.save(&state.layout.settings_path())?;
            }
            println!("{}", serde_json::to_string_pretty(&state.settings)?);
        }
    }
    Ok(())
}

fn report_load_problems(state: &AppState) {
    let report = &state.load_report;
    for (path, err) in &report.errors {
        eprintln!("warning: {}: {}", path.display(), err);
    }
    if report.skipped_duplicates > 0 {
        eprintln!("warning: skipped {} duplicate collection file(s)", report.skipped_duplicates);
    }
}

fn select_collection(state: &mut AppState, key: &str) -> anyhow::Result<usize> {
    let index = state
        .manager
        .find_collection_by_id(key)
        .or_else(|| state.manager.find_collection_by_name(key))
        .ok_or_else(|| anyhow!("no collection named '{}'", key))?;
    state.set_active_collection(index)?;
    Ok(index)
}

/// Load method, URL and headers into the scratch buffers.
fn fill_scratch(state: &mut AppState, method: &str, url: &str, headers: &[String]) -> anyhow::Result<()> {
    let method = method.to_ascii_uppercase();
    state.method_index = HTTP_METHODS
        .iter()
        .position(|m| *m == method)
        .ok_or_else(|| anyhow!("unsupported method {}", method))?;
    state.url_buffer = url.to_string();
    for header in headers {
        let (name, value) = header
            .split_once(':')
            .ok_or_else(|| anyhow!("header '{}' is not 'Name: value'", header))?;
        state.header_name_buffer = name.to_string();
        state.header_value_buffer = value.to_string();
        state.add_header_from_scratch()?;
    }
    state.mark_ui_dirty();
    Ok(())
}

fn list(state: &AppState) {
    if state.manager.is_empty() {
        println!("No collections");
        return;
    }
    for (i, c) in state.manager.collections().iter().enumerate() {
        let marker = if state.manager.active_collection_index() == Some(i) { "*" } else { " " };
        println!("{} {} [{}] - {} request(s), {} cookie(s)", marker, c.name(), c.id, c.len(), c.cookie_jar.len());
        for entry in c.entries() {
            println!("    {:7} {}  {}", entry.request.method(), entry.name, entry.request.url());
        }
    }
}

fn print_response(state: &AppState) {
    let response = &state.current_response;
    for header in &response.headers {
        println!("{}: {}", header.name, header.value);
    }
    println!();
    if let Some(body) = response.body_text() {
        println!("{}", body);
    }
    if response.truncated {
        eprintln!("warning: body truncated");
    }
}
