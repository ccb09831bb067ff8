use std::io::{Read, Write};
use std::path::PathBuf;
use std::sync::Arc;

use parley::parley_orchestrator::Orchestrator;
use parley::parley_types::Message;
use parley::{ChatRequest, ChatService, ParleyConfig, ParleyError};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    if let Err(err) = run_cli().await {
        eprintln!("parley error: {err}");
        std::process::exit(1);
    }
}

async fn run_cli() -> Result<(), ParleyError> {
    let mut remaining: Vec<String> = std::env::args().skip(1).collect();
    let mut config_path: Option<PathBuf> = None;
    let mut prompt: Option<String> = None;
    let mut no_stream = false;

    while let Some(flag) = remaining.first().cloned() {
        remaining.remove(0);
        match flag.as_str() {
            "--config" => config_path = Some(PathBuf::from(take_arg("--config", &mut remaining)?)),
            "--prompt" => prompt = Some(take_arg("--prompt", &mut remaining)?),
            "--no-stream" => no_stream = true,
            "--help" | "-h" => {
                print_usage();
                return Ok(());
            }
            other => return Err(ParleyError::Config(format!("unknown flag: {other}"))),
        }
    }

    let config = ParleyConfig::load(config_path.as_deref())?;
    init_tracing(config.debug);

    let messages = match prompt {
        Some(text) => vec![Message::user(text)],
        None => read_request()?.messages,
    };

    let registry = Arc::new(config.build_registry()?);
    let orchestrator =
        Orchestrator::new(config.build_model()?, registry).with_config(config.orchestrator_config());
    let service = ChatService::new(orchestrator);

    let mut stdout = std::io::stdout().lock();
    if no_stream {
        let response = service.complete(messages).await?;
        writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
        return Ok(());
    }

    let mut events = service.stream(messages).await?;
    while let Some(event) = events.next().await {
        writeln!(stdout, "{}", serde_json::to_string(&event)?)?;
        stdout.flush()?;
    }
    Ok(())
}

fn read_request() -> Result<ChatRequest, ParleyError> {
    let mut buffer = String::new();
    std::io::stdin().read_to_string(&mut buffer)?;
    if buffer.trim().is_empty() {
        return Err(ParleyError::Config(
            "missing input: pass --prompt or pipe {\"messages\": [...]} on stdin".to_string(),
        ));
    }
    Ok(serde_json::from_str(&buffer)?)
}

fn init_tracing(debug: bool) {
    let default = if debug { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env("PARLEY_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn take_arg(flag: &str, remaining: &mut Vec<String>) -> Result<String, ParleyError> {
    if remaining.is_empty() {
        return Err(ParleyError::Config(format!("missing value for {flag}")));
    }
    Ok(remaining.remove(0))
}

fn print_usage() {
    println!("parley [--config parley.json] [--prompt TEXT] [--no-stream]");
    println!();
    println!("Reads {{\"messages\": [...]}} from stdin unless --prompt is given.");
    println!("Writes one JSON event per line, or a single {{content, steps}} object with --no-stream.");
}
