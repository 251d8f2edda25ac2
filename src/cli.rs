use std::error::Error;
use std::time::Duration;

use atty::Stream;
use clap::{Parser, Subcommand};
use learncjk_web::view::LookupView;
use learncjk_web::{ClientConfig, LookupClient, LookupResponse, ViewMode};
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;

const DEFAULT_LOG_FILTER: &str = "learncjk_web=info,tower_http=info";

#[derive(Parser, Debug)]
#[command(name = "learncjk", about = "Look up CJK characters via the learnCJK.dev API", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Base URL of the lookup API.
    #[arg(
        long,
        global = true,
        env = "LEARNCJK_API_URL",
        default_value = "http://127.0.0.1:8000"
    )]
    api_url: String,

    /// Request timeout for the lookup API, in seconds.
    #[arg(long, global = true, env = "LEARNCJK_TIMEOUT_SECS", default_value_t = 10)]
    timeout_secs: u64,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Look up one or more characters.
    Lookup {
        /// Characters to look up.
        #[arg(required = true)]
        chars: Vec<String>,
        /// Ask the API for its markdown summary as well.
        #[arg(long)]
        markdown: bool,
        /// Show forms as a region table.
        #[arg(long)]
        table: bool,
    },
    /// Check that the lookup API is reachable.
    Health,
    /// Serve the web UI.
    #[cfg(feature = "web")]
    Serve {
        /// Address to bind.
        #[arg(long, env = "LEARNCJK_ADDR", default_value = "127.0.0.1:8080")]
        addr: std::net::SocketAddr,
        /// Public base URL used for canonical links.
        #[arg(long, env = "LEARNCJK_BASE_URL", default_value = "http://127.0.0.1:8080")]
        base_url: String,
        /// CSS theme: `bulma` or `tailwind`.
        #[arg(long, default_value = "bulma")]
        theme: learncjk_web::web::WebTheme,
        /// Ask the API for markdown summaries and render them on each page.
        #[arg(long)]
        markdown: bool,
    },
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing()?;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let client_config = |markdown: bool| ClientConfig {
        api_base_url: cli.api_url.clone(),
        timeout: Duration::from_secs(cli.timeout_secs.max(1)),
        markdown,
    };
    match &cli.command {
        Command::Lookup {
            chars,
            markdown,
            table,
        } => {
            let client = LookupClient::new(client_config(*markdown))?;
            let view = if *table {
                ViewMode::Table
            } else {
                ViewMode::List
            };
            runtime.block_on(handle_lookup(&client, chars, view, cli.json))
        }
        Command::Health => {
            let client = LookupClient::new(client_config(false))?;
            runtime.block_on(handle_health(&client, cli.json))
        }
        #[cfg(feature = "web")]
        Command::Serve {
            addr,
            base_url,
            theme,
            markdown,
        } => {
            let config = learncjk_web::web::WebConfig {
                addr: *addr,
                theme: *theme,
                base_url: base_url.clone(),
                client: client_config(*markdown),
            };
            runtime.block_on(learncjk_web::web::serve(config))?;
            Ok(())
        }
    }
}

fn init_tracing() -> Result<(), Box<dyn Error>> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| format!("failed to initialise logging: {err}"))?;
    Ok(())
}

async fn handle_lookup(
    client: &LookupClient,
    chars: &[String],
    view: ViewMode,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let mut responses: Vec<LookupResponse> = Vec::new();
    let mut failures = 0usize;
    for ch in chars {
        match client.lookup(ch).await {
            Ok(response) => {
                if !as_json {
                    print_lookup(&LookupView::from_response(&response, view));
                }
                responses.push(response);
            }
            Err(err) => {
                failures += 1;
                eprintln!("{ch}: {err}");
            }
        }
    }
    if as_json {
        println!("{}", serde_json::to_string_pretty(&responses)?);
    }
    if failures > 0 {
        return Err(format!("{failures} of {} lookups failed", chars.len()).into());
    }
    Ok(())
}

async fn handle_health(client: &LookupClient, as_json: bool) -> Result<(), Box<dyn Error>> {
    client.health().await?;
    if as_json {
        println!(
            "{}",
            serde_json::json!({ "status": "ok", "api": client.base_url() })
        );
    } else {
        println!("Lookup API at {} is healthy.", client.base_url());
    }
    Ok(())
}

fn print_lookup(view: &LookupView) {
    println!("Character: {} ({})", view.char, view.lang);

    if view.view.is_table() {
        print_region_table(view);
    } else {
        println!("\nForms:");
        let width = label_width(view.forms.iter().map(|row| row.label));
        for row in &view.forms {
            println!("  {:<width$}  {}", row.label, row.value, width = width);
        }
    }

    println!("\nComposition:");
    let width = label_width(view.composition.iter().map(|row| row.label));
    for row in &view.composition {
        println!("  {:<width$}  {}", row.label, row.joined(), width = width);
    }

    println!("\nVariants: {}", view.variants_text());
    println!("Unihan definition: {}", view.definition);

    println!("\nStudy lists:");
    for line in view.study_text().lines() {
        println!("  {line}");
    }

    if let Some(notes) = &view.notes_markdown {
        render_markdown_block("Notes", notes);
    }
    println!();
}

fn print_region_table(view: &LookupView) {
    let width = label_width(view.regions.iter().map(|row| row.region)).max("REGION".len());
    println!();
    println!("{:<width$}  {:<11}  {:<4}  {}", "REGION", "SCRIPT", "FORM", "SAME", width = width);
    println!("{:-<width$}  {:-<11}  {:-<4}  {}", "", "", "", "----", width = width);
    for row in &view.regions {
        let form = row
            .chip
            .as_ref()
            .map(|chip| chip.ch.as_str())
            .unwrap_or(learncjk_web::view::EMPTY);
        let same = if row.same_as_input { "same" } else { "diff" };
        println!(
            "{:<width$}  {:<11}  {:<4}  {}",
            row.region,
            row.script,
            form,
            same,
            width = width
        );
    }
}

fn label_width<'a>(labels: impl Iterator<Item = &'a str>) -> usize {
    labels.map(|label| label.chars().count()).max().unwrap_or(4)
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("\n{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
