use std::io::{self, Write};

use clap::{Args, Subcommand};

use crate::config::{DEFAULT_BASE_URL, StoredConfig, config_file_path};
use crate::error::{AppError, AppResult};

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigCommand {
    /// Run the interactive configuration wizard.
    Init,
    /// Show the stored configuration.
    Show,
}

pub fn run(command: ConfigCommand) -> AppResult<()> {
    match command {
        ConfigCommand::Init => run_init(),
        ConfigCommand::Show => run_show(),
    }
}

fn run_init() -> AppResult<()> {
    let mut cfg = StoredConfig::load()?;

    println!("Configuring ticketdesk.");
    println!("Press Enter to keep the current value, '-' to clear it.");
    println!();

    apply_prompt(
        &format!("Backend base URL (e.g., {DEFAULT_BASE_URL})"),
        &mut cfg.base_url,
    )?;

    let mut timeout = cfg.timeout_secs.map(|secs| secs.to_string());
    apply_prompt("Request timeout in seconds", &mut timeout)?;
    cfg.timeout_secs = parse_optional("request timeout", timeout)?;

    let mut min_chars = cfg.min_classify_chars.map(|chars| chars.to_string());
    apply_prompt("Minimum description length to classify", &mut min_chars)?;
    cfg.min_classify_chars = parse_optional("minimum description length", min_chars)?;

    cfg.save()?;

    let path = config_file_path()?;
    println!("\nConfiguration saved to {}", path.display());
    Ok(())
}

fn run_show() -> AppResult<()> {
    let cfg = StoredConfig::load()?;
    let path = config_file_path()?;

    println!("Configuration file: {}", path.display());
    println!("Backend base URL: {}", display_value(&cfg.base_url));
    println!(
        "Request timeout: {}",
        display_value(&cfg.timeout_secs.map(|secs| format!("{secs}s")))
    );
    println!(
        "Minimum description length to classify: {}",
        display_value(&cfg.min_classify_chars.map(|chars| chars.to_string()))
    );

    Ok(())
}

fn apply_prompt(field: &str, target: &mut Option<String>) -> AppResult<()> {
    match prompt(field, target.as_deref())? {
        PromptAction::Keep => {}
        PromptAction::Clear => *target = None,
        PromptAction::Set(value) => *target = Some(value),
    }
    Ok(())
}

fn prompt(field: &str, current: Option<&str>) -> AppResult<PromptAction> {
    let mut stdout = io::stdout();

    match current {
        Some(value) => write!(stdout, "{field} [{value}] (Enter to keep, '-' to clear): ")?,
        None => write!(stdout, "{field} (Enter to skip): ")?,
    }
    stdout.flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(PromptAction::parse(&input))
}

fn parse_optional<T: std::str::FromStr>(field: &str, value: Option<String>) -> AppResult<Option<T>> {
    value
        .map(|raw| {
            raw.parse::<T>().map_err(|_| {
                AppError::Configuration(format!("{field} must be a whole number, got '{raw}'"))
            })
        })
        .transpose()
}

fn display_value(value: &Option<String>) -> String {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .unwrap_or_else(|| "<not set>".to_string())
}

#[derive(Debug, PartialEq, Eq)]
enum PromptAction {
    Keep,
    Clear,
    Set(String),
}

impl PromptAction {
    fn parse(input: &str) -> Self {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            PromptAction::Keep
        } else if trimmed == "-" {
            PromptAction::Clear
        } else {
            PromptAction::Set(trimmed.to_string())
        }
    }
}
