use anyhow::Result;
use clap::Parser;
use console::{Term, style};
use std::path::PathBuf;
use tracing::info;

use descpics::{ApiClient, Config, Flow, Session, display, logging};

#[derive(Parser, Debug)]
#[command(
    name = "picupload",
    version = env!("CARGO_PKG_VERSION"),
    about = "Upload a picture with its description to grow the training set",
    long_about = "Uploads a jpg, jpeg or png picture (under 15MB) straight to object storage \
                  through a single-use presigned authorization, then stores your description \
                  alongside it.",
    after_help = "Examples:\n  \
                  picupload apple.png -d \"a red apple\"        # Upload and describe\n  \
                  picupload apple.png -d \"a red apple\" --dry-run  # Validate only\n\n\
                  Configuration (.env):\n  \
                  DESCPICS_API_URL=https://description.pics\n  \
                  DESCPICS_TIMEOUT_SECS=30\n  \
                  LOG_LEVEL=info"
)]
struct Cli {
    /// Picture to upload (jpg, jpeg or png)
    path: PathBuf,

    /// Description of what the picture shows
    #[arg(long, short = 'd')]
    description: Option<String>,

    /// API base URL (overrides DESCPICS_API_URL)
    #[arg(long)]
    api_url: Option<String>,

    /// Validate the picture and description without uploading
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();

    info!("Picture upload v{}", env!("CARGO_PKG_VERSION"));

    let mut config = Config::from_env()?;
    if let Some(api_url) = &cli.api_url {
        config = config.with_api_url(api_url)?;
    }

    let client = ApiClient::new(&config)?;
    let mut session = Session::new(client, Flow::Label);

    if !cli.dry_run {
        if let Err(e) = session.ensure_authorization().await {
            display::toast_error(&e.user_message());
        }
    }

    if let Err(e) = session.select_file(&cli.path).await {
        display::toast_error(&e.to_string());
        std::process::exit(1);
    }
    if let Some(picture) = session.picture() {
        println!("{}", display::preview_line(picture));
    }

    if let Some(description) = cli.description {
        session.set_caption(description);
    }

    if cli.dry_run {
        if session.caption().trim().is_empty() {
            display::field_error(descpics::workflow::CAPTION_REQUIRED);
            std::process::exit(1);
        }
        println!(
            "{}",
            style(format!(
                "🔍 DRY RUN - would upload to {}",
                session.api().config().api_url
            ))
            .yellow()
            .bold()
        );
        return Ok(());
    }

    loop {
        let pb = display::spinner("Uploading picture...");
        let submitted = session.submit().await;
        pb.finish_and_clear();

        match submitted {
            Ok(_) => {
                display::success("Thank you for your upload!");
                return Ok(());
            }
            Err(e) => {
                display::report_failure(&session, &e);
                let retryable =
                    !e.is_form_error() && session.can_submit() && session.has_authorization();
                if !retryable || !confirm_retry()? {
                    std::process::exit(1);
                }
            }
        }
    }
}

/// Ask whether to submit the same picture again; never asks when unattended
fn confirm_retry() -> Result<bool> {
    if !console::user_attended_stderr() {
        return Ok(false);
    }
    let term = Term::stderr();
    term.write_str("Retry the upload? [y/N] ")?;
    let answer = term.read_line()?;
    Ok(matches!(answer.trim(), "y" | "Y" | "yes"))
}
