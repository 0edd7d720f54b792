//! Veritas command line
//!
//! ```bash
//! veritas detect --text "..." [--image scan.png] [--json]
//! veritas history list
//! veritas theme dark
//! veritas config set-key <KEY>
//! veritas config set-url [URL]
//! ```

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, warn};

use veritas_lib::api::load_image;
use veritas_lib::models::{HistoryItem, Theme};
use veritas_lib::services::{
    ConfigStore, HistoryStore, LocalStore, Preferences, ResultView, Verdict,
};
use veritas_lib::{DetectionReport, DetectionService};

#[derive(Parser, Debug)]
#[clap(name = "veritas")]
#[clap(about = "Estimate whether text or an image of text was written by AI")]
#[clap(version)]
struct Args {
    /// Config directory (defaults to the platform config dir)
    #[clap(long, value_name = "DIR", global = true)]
    config_dir: Option<PathBuf>,

    /// State file holding history and preferences
    #[clap(long, value_name = "FILE", global = true)]
    state_file: Option<PathBuf>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Analyze text and/or an image
    Detect {
        #[clap(long)]
        text: Option<String>,

        #[clap(long, value_name = "FILE")]
        image: Option<PathBuf>,

        /// Override the MIME type guessed from the image extension
        #[clap(long)]
        mime: Option<String>,

        /// Print the full report as JSON
        #[clap(long)]
        json: bool,
    },
    /// Browse past analyses
    History {
        #[clap(subcommand)]
        action: HistoryAction,
    },
    /// Show or set the color theme (light, dark, system)
    Theme { value: Option<String> },
    /// Show or edit settings
    Config {
        #[clap(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
enum HistoryAction {
    List,
    Show { id: String },
    Delete { id: String },
    Clear,
}

#[derive(Subcommand, Debug)]
enum ConfigAction {
    Show,
    SetKey { key: String },
    DeleteKey,
    SetModel { model: String },
    /// Override the Gemini endpoint base; omit to restore the default
    SetUrl { url: Option<String> },
}

#[tokio::main]
async fn main() -> Result<()> {
    veritas_lib::init_logging();
    let args = Args::parse();

    let config_dir = match args.config_dir {
        Some(dir) => dir,
        None => ConfigStore::default_config_dir().context("no config directory available")?,
    };
    let config_store = ConfigStore::new(config_dir);
    let local_store = Arc::new(match args.state_file {
        Some(path) => LocalStore::new(path),
        None => LocalStore::open_default()?,
    });

    match args.command {
        Command::Detect { text, image, mime, json } => {
            let config = config_store.load()?;
            let history = HistoryStore::with_limit(local_store, config.detection.history_limit);
            let service = DetectionService::from_config(&config, Some(history))
                .context("set an API key with `veritas config set-key` or GEMINI_API_KEY")?;

            let image = match image {
                Some(path) => Some(load_image(&path, mime.as_deref())?),
                None => None,
            };

            let cancel = async {
                if tokio::signal::ctrl_c().await.is_err() {
                    std::future::pending::<()>().await;
                }
            };

            match service.detect_cancellable(text.as_deref(), image, cancel).await {
                Ok(Some(report)) => print_report(&report, json)?,
                Ok(None) => {
                    info!("[CLI] analysis cancelled");
                    eprintln!("Analysis cancelled.");
                }
                Err(e) => {
                    warn!("[CLI] detect failed: {:?}", e);
                    bail!(e.user_message());
                }
            }
        }
        Command::History { action } => {
            let history = HistoryStore::new(local_store);
            match action {
                HistoryAction::List => {
                    let items = history.list()?;
                    if items.is_empty() {
                        println!("No analyses yet.");
                    }
                    for item in &items {
                        print_history_line(item);
                    }
                }
                HistoryAction::Show { id } => match history.get(&id)? {
                    Some(item) => {
                        let view = ResultView::of(&item.result);
                        println!("{}", item.input_snippet);
                        print_view(&view, &item.result.detected_language, &item.result.analysis_summary);
                    }
                    None => bail!("no history entry with id {}", id),
                },
                HistoryAction::Delete { id } => {
                    if !history.delete(&id)? {
                        bail!("no history entry with id {}", id);
                    }
                }
                HistoryAction::Clear => history.clear()?,
            }
        }
        Command::Theme { value } => {
            let prefs = Preferences::new(local_store);
            match value.as_deref() {
                None => {
                    let name = match prefs.theme()? {
                        Some(Theme::Light) => "light",
                        Some(Theme::Dark) => "dark",
                        None => "system",
                    };
                    println!("{}", name);
                }
                Some("system") => prefs.set_theme(None)?,
                Some(v) => match Theme::parse(v) {
                    Some(theme) => prefs.set_theme(Some(theme))?,
                    None => bail!("unknown theme '{}', expected light, dark or system", v),
                },
            }
        }
        Command::Config { action } => match action {
            ConfigAction::Show => {
                let mut config = config_store.load()?;
                for key in config.api_keys.values_mut() {
                    *key = mask_key(key);
                }
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
            ConfigAction::SetKey { key } => config_store.set_api_key("gemini", &key)?,
            ConfigAction::DeleteKey => config_store.delete_api_key("gemini")?,
            ConfigAction::SetModel { model } => config_store.set_model(&model)?,
            ConfigAction::SetUrl { url } => config_store.set_base_url(url.as_deref())?,
        },
    }

    Ok(())
}

fn print_report(report: &DetectionReport, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(report)?);
        return Ok(());
    }
    print_view(
        &report.view,
        &report.result.detected_language,
        &report.result.analysis_summary,
    );
    if let Some(id) = &report.history_id {
        println!("History id: {}", id);
    }
    Ok(())
}

fn print_view(view: &ResultView, language: &str, summary: &str) {
    println!("{}", view.headline);
    match view.display_percent {
        Some(p) => println!("AI probability: {}%", p),
        None => println!("AI probability: n/a"),
    }
    println!("Language: {}", language);
    println!();
    println!("{}", summary);
}

fn print_history_line(item: &HistoryItem) {
    let when = chrono::DateTime::from_timestamp_millis(item.timestamp)
        .map(|t| t.with_timezone(&chrono::Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default();
    let score = match (Verdict::of(&item.result), item.result.ai_probability_percent) {
        (Verdict::Inconclusive, _) | (_, None) => "  --".to_string(),
        (_, Some(p)) => format!("{:>3}%", p.round() as u32),
    };
    println!("{}  {}  {}  {}", item.id, when, score, item.input_snippet);
}

fn mask_key(key: &str) -> String {
    let chars: Vec<char> = key.chars().collect();
    if chars.len() <= 8 {
        return "****".to_string();
    }
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("****{}", tail)
}
