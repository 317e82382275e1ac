use anyhow::Result;
use colored::Colorize;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use recommend_demo::build_controller;
use recommend_demo::config::Config;
use recommend_demo::controller::{Surface, ViewController};
use recommend_demo::error::ClientError;
use recommend_demo::field::{FieldAccessor, MemoryField};
use recommend_demo::models::Outcome;
use recommend_demo::render::{PresentationSink, TerminalSink};

const HELP: &str = "Type a query and press Enter to get recommendations.
  <empty line>     submit the current query (kept after a failed request)
  :health          check backend readiness
  :url [value]     show or set the backend base URL (`:url clear` forgets it)
  :examples        list example prompts
  :example <n>     load example prompt n
  :help            show this help
  :quit            exit";

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so they never interleave with rendered answers
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Config::load();

    let query = Arc::new(MemoryField::new(""));
    let base_url = Arc::new(MemoryField::new(""));
    let sink: Arc<dyn PresentationSink> = Arc::new(TerminalSink::stdout());
    let surface = Surface {
        query: Arc::clone(&query) as Arc<dyn FieldAccessor>,
        mirror: None,
        base_url: Arc::clone(&base_url) as Arc<dyn FieldAccessor>,
    };

    let mut controller = build_controller(&config, sink, surface)?;
    controller.init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    match args.first().map(String::as_str) {
        Some("--health") => {
            let healthy = controller.check_health().await.is_ok();
            std::process::exit(if healthy { 0 } else { 1 });
        }
        Some("--help") | Some("-h") => {
            println!("usage: recommend-demo [--health | <query>...]\n\n{HELP}");
            Ok(())
        }
        Some(_) => {
            controller.on_query_input(&args.join(" "));
            let succeeded = match controller.submit().await {
                Ok(Outcome::Success { .. }) => true,
                Ok(Outcome::Failure { .. }) => false,
                Err(e) => {
                    if e.is_local() {
                        eprintln!("{e}");
                    }
                    false
                }
            };
            std::process::exit(if succeeded { 0 } else { 1 });
        }
        None => run_interactive(&mut controller, &config, &base_url).await,
    }
}

async fn run_interactive(
    controller: &mut ViewController,
    config: &Config,
    base_url: &MemoryField,
) -> Result<()> {
    println!("{}", "Food recommendation demo".bold());
    println!("Backend: {}  (:help for commands)", controller.base_url().cyan());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("{} ", ">".green().bold());
        std::io::Write::flush(&mut std::io::stdout())?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();

        match line.split_once(' ').unwrap_or((line, "")) {
            (":quit", _) | (":q", _) => break,
            (":help", _) => println!("{HELP}"),
            (":health", _) => {
                if let Err(e) = controller.check_health().await {
                    log_action_error(&e);
                }
            }
            (":url", "") => {
                let current = base_url.get();
                if current.is_empty() {
                    println!("(unset, using {})", controller.base_url());
                } else {
                    println!("{current}");
                }
            }
            (":url", value) => {
                let value = value.trim();
                controller.on_base_url_change(if value == "clear" { "" } else { value });
                println!("Backend: {}", controller.base_url().cyan());
            }
            (":examples", _) => {
                for (i, example) in config.ui.examples.iter().enumerate() {
                    println!("  {}. {}", i + 1, example);
                }
            }
            (":example", n) => match n
                .trim()
                .parse::<usize>()
                .ok()
                .and_then(|n| n.checked_sub(1))
                .and_then(|i| config.ui.examples.get(i))
            {
                Some(example) => {
                    controller.apply_example(example);
                    println!("Loaded: {example}  (press Enter to submit)");
                }
                None => println!("No such example; see :examples"),
            },
            ("", _) => {
                if let Err(e) = controller.submit().await {
                    log_action_error(&e);
                }
            }
            _ if line.starts_with(':') => println!("Unknown command; see :help"),
            _ => {
                controller.on_query_input(line);
                if let Err(e) = controller.submit().await {
                    log_action_error(&e);
                }
            }
        }
    }

    Ok(())
}

/// The sink has already rendered the outcome; keep the error visible in the log.
fn log_action_error(e: &ClientError) {
    if e.is_local() {
        tracing::debug!("action rejected: {}", e);
    } else {
        tracing::warn!("action failed: {}", e);
    }
}
