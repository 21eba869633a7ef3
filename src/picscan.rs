use anyhow::{Context, Result};
use clap::Parser;
use console::style;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;
use tracing::info;

use descpics::display::{self, LabelScore};
use descpics::{ApiClient, Config, Flow, Outcome, Session, logging};

#[derive(Parser, Debug)]
#[command(
    name = "picscan",
    version = env!("CARGO_PKG_VERSION"),
    about = "Get a generated description for your pictures",
    long_about = "Uploads each picture through a single-use presigned authorization and asks the \
                  inference service to describe it. Pictures are processed one after another, \
                  each with a fresh authorization.",
    after_help = "Examples:\n  \
                  picscan cat.jpg                         # Describe one picture\n  \
                  picscan *.png --json                    # Describe several, print JSON\n\n\
                  Configuration (.env):\n  \
                  DESCPICS_API_URL=https://description.pics\n  \
                  DESCPICS_TIMEOUT_SECS=30\n  \
                  LOG_LEVEL=info"
)]
struct Cli {
    /// Pictures to describe (jpg, jpeg or png)
    #[arg(required = true)]
    paths: Vec<PathBuf>,

    /// Print the descriptions as JSON
    #[arg(long)]
    json: bool,

    /// API base URL (overrides DESCPICS_API_URL)
    #[arg(long)]
    api_url: Option<String>,
}

#[derive(Debug, Serialize)]
struct ScanReport<'a> {
    file: String,
    object_key: &'a str,
    labels: Vec<LabelScore<'a>>,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    info!("Picture scan v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url)?;
    }

    let client = ApiClient::new(&config)?;
    let mut session = Session::new(client, Flow::Describe);

    let start = Instant::now();
    let mut outcomes = Vec::new();
    let mut failed = 0usize;

    for (i, path) in cli.paths.iter().enumerate() {
        let authorized = if i == 0 {
            session.ensure_authorization().await
        } else {
            session.start_over().await
        };
        if let Err(e) = authorized {
            display::toast_error(&e.user_message());
        }

        if !cli.json {
            println!("\n{}", style(path.display()).cyan().bold());
        }

        if let Err(e) = session.select_file(path).await {
            display::toast_error(&e.to_string());
            failed += 1;
            continue;
        }
        if !cli.json {
            if let Some(picture) = session.picture() {
                println!("{}", display::preview_line(picture));
            }
        }

        let pb = display::spinner("Describing picture...");
        let submitted = session.submit().await;
        pb.finish_and_clear();

        match submitted {
            Ok(Outcome::Described { object_key, result }) => {
                if !cli.json {
                    println!("{}", style("Result:").bold());
                    for line in display::render_description(&result) {
                        println!("  • {}", line);
                    }
                }
                outcomes.push((path.display().to_string(), object_key, result));
            }
            Ok(Outcome::Labelled { .. }) => {}
            Err(e) => {
                display::report_failure(&session, &e);
                failed += 1;
            }
        }
    }

    if cli.json {
        let reports: Vec<_> = outcomes
            .iter()
            .map(|(file, object_key, result)| ScanReport {
                file: file.clone(),
                object_key,
                labels: display::label_scores(result),
            })
            .collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&reports).context("Failed to serialize results")?
        );
    } else {
        println!("\n{}", style("═".repeat(70)).dim());
        println!(
            "{}",
            style(format!(
                "Summary: {} described, {} failed",
                outcomes.len(),
                failed
            ))
            .bold()
        );
        println!(
            "{}",
            style(format!("Time: {:.2}s", start.elapsed().as_secs_f64())).dim()
        );
    }

    if failed > 0 {
        std::process::exit(1);
    }

    Ok(())
}
