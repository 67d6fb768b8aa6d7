use anyhow::Result;
use colored::Colorize;
use std::io::{self, BufRead, Write};
use std::sync::Arc;

use workchat::analytics::AnalysisPreset;
use workchat::config::{Config, HistoryBackend};
use workchat::models::{ForecastRequest, ForecastResponse, Task, TaskStatus};
use workchat::redis::RedisManager;
use workchat::repository::{
    ChatHistoryRepository, InMemoryChatHistoryRepository, RedisChatHistoryRepository,
};
use workchat::series::{self, SeriesConfig};
use workchat::service::AssistantService;
use workchat::services;

/// Shown when a submit-and-poll round trip fails for any reason.
const FALLBACK_ANSWER: &str =
    "Sorry, something went wrong while answering your question. Please try again.";

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the chat stream on stdout stays clean.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .with_ansi(false)
        .with_writer(std::io::stderr)
        .init();

    let config = Arc::new(Config::load());

    let history: Arc<dyn ChatHistoryRepository> = match config.history.backend {
        HistoryBackend::Redis => {
            let redis = RedisManager::new_with_config(&config).await?;
            Arc::new(RedisChatHistoryRepository::new(redis))
        }
        HistoryBackend::Memory => {
            if config.history.seed_demo_data {
                Arc::new(InMemoryChatHistoryRepository::with_demo_data())
            } else {
                Arc::new(InMemoryChatHistoryRepository::new())
            }
        }
    };

    let service = AssistantService::new(Arc::clone(&config), history)?;
    let chat = service.new_chat().await?;
    let mut active_service = services::all()[0].id.to_string();

    println!("{}", "workchat".bold());
    println!("Ask a question, or type /help for commands.\n");

    let stdin = io::stdin();
    loop {
        print!("{} ", format!("[{active_service}]>").cyan());
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        if let Some(command) = line.strip_prefix('/') {
            match run_command(&service, &chat.id, &mut active_service, command).await {
                Ok(true) => break,
                Ok(false) => {}
                Err(e) => println!("{}", format!("error: {e}").red()),
            }
            continue;
        }

        match service.ask(&chat.id, line, &active_service, None).await {
            Ok(task) => render_task(&task),
            Err(e) => {
                tracing::error!("ask failed: {e}");
                println!("{}", FALLBACK_ANSWER.yellow());
            }
        }
    }

    Ok(())
}

/// Dispatch a slash command. Returns true when the loop should exit.
async fn run_command(
    service: &AssistantService,
    chat_id: &str,
    active_service: &mut String,
    command: &str,
) -> Result<bool> {
    let mut parts = command.split_whitespace();
    match parts.next().unwrap_or("") {
        "help" => print_help(),
        "services" => {
            for info in services::all() {
                let marker = if info.id == active_service.as_str() { "*" } else { " " };
                println!("{marker} {:<22} {} - {}", info.id.bold(), info.name, info.description);
            }
        }
        "use" => {
            let id = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("usage: /use <service-id>"))?;
            *active_service = id.to_string();
            let info = services::get_or_default(id);
            println!("Now asking {} ({})", info.name.bold(), info.api_name);
        }
        "history" => {
            for chat in service.history().list_chats().await? {
                println!(
                    "{}  {} ({} messages)",
                    chat.id.dimmed(),
                    chat.title,
                    chat.messages.len()
                );
            }
        }
        "tasks" => {
            for task in service.list_tasks().await? {
                println!(
                    "{}  [{}] {}",
                    task.task_id.dimmed(),
                    status_badge(&task.status),
                    task.payload.query
                );
            }
        }
        "generate" => {
            let config = match parts.next() {
                Some(name) => series::preset(name)
                    .ok_or_else(|| anyhow::anyhow!("unknown preset: {name} (see /presets)"))?,
                None => SeriesConfig::default(),
            };
            let values = config.generate(&mut rand::thread_rng())?;
            render_series(&values);
        }
        "presets" => {
            for (name, config) in series::PRESETS {
                println!(
                    "{:<20} {} periods, seasonality {}",
                    name.bold(),
                    config.length,
                    config.seasonal_period
                );
            }
        }
        "forecast" => {
            let rest: Vec<&str> = parts.collect();
            let values = if rest.is_empty() {
                // No numbers given: feed the forecaster a generated series.
                SeriesConfig::default().generate(&mut rand::thread_rng())?
            } else {
                parse_series(&rest)
            };
            let request = ForecastRequest::new(values);
            let response = service.forecast(&request).await?;
            render_forecast(&response);
        }
        "analyze" => {
            let label = parts
                .next()
                .ok_or_else(|| anyhow::anyhow!("usage: /analyze <credit|revenue|expenses|profit|cash-flow>"))?;
            let preset = AnalysisPreset::from_label(label)
                .ok_or_else(|| anyhow::anyhow!("unknown analysis: {label}"))?;
            let answer = service.analytics_ask(preset.question()).await?;
            println!("{}", answer.answer);
            if !answer.recommendations.is_empty() {
                println!("{}", "Recommendations:".bold());
                for rec in &answer.recommendations {
                    println!("  - {rec}");
                }
            }
        }
        "quit" | "exit" => return Ok(true),
        other => println!("unknown command: /{other} (try /help)"),
    }
    Ok(false)
}

fn print_help() {
    println!("  /services            list available services");
    println!("  /use <id>            switch the active service");
    println!("  /history             list stored chats");
    println!("  /tasks               list backend tasks");
    println!("  /generate [preset]   generate a demo time series");
    println!("  /presets             list generator presets");
    println!("  /forecast [n n ...]  forecast the given (or a generated) series");
    println!("  /analyze <kind>      run a canned financial analysis");
    println!("  /quit                exit");
}

fn status_badge(status: &TaskStatus) -> colored::ColoredString {
    match status {
        TaskStatus::Completed => status.to_string().green(),
        TaskStatus::Failed => status.to_string().red(),
        _ => status.to_string().yellow(),
    }
}

fn render_task(task: &Task) {
    println!(
        "{} [{}] {}",
        task.service_name.dimmed(),
        status_badge(&task.status),
        task.task_type.dimmed()
    );
    if let Some(result) = &task.result {
        println!("{}", result.answer);
        println!(
            "{}",
            format!("processed in {}ms", result.processing_time_ms).dimmed()
        );
    } else if let Some(error) = &task.error {
        println!("{}", format!("task error: {error}").red());
    }
}

fn render_series(values: &[f64]) {
    if let Some(summary) = series::summarize(values) {
        println!(
            "{} points  min {:.2}  max {:.2}  mean {:.2}",
            summary.count, summary.min, summary.max, summary.mean
        );
    }
    let preview: Vec<String> = values.iter().take(20).map(|v| format!("{v:.2}")).collect();
    println!("{}", preview.join(", "));
    if values.len() > 20 {
        println!("...");
    }
}

fn render_forecast(response: &ForecastResponse) {
    if !response.success {
        let reason = response.error.as_deref().unwrap_or("unknown error");
        println!("{}", format!("forecast failed: {reason}").red());
        return;
    }
    println!("method: {}", response.method.bold());
    for (i, value) in response.forecast.iter().enumerate() {
        let lower = response.lower.get(i).copied().unwrap_or(f64::NAN);
        let upper = response.upper.get(i).copied().unwrap_or(f64::NAN);
        println!("  t+{:<3} {:>10.2}  [{:.2}, {:.2}]", i + 1, value, lower, upper);
    }
}

/// Parse whitespace/comma separated numbers, ignoring anything unparseable.
fn parse_series(parts: &[&str]) -> Vec<f64> {
    parts
        .iter()
        .flat_map(|p| p.split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .filter_map(|p| p.parse::<f64>().ok())
        .collect()
}
