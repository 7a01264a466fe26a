//! vidopt CLI entry point

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;
use anyhow::{bail, Result};
use vidopt::api::AnalysisType;
use vidopt::app::{App, BrowserNavigator};
use vidopt::auth::Destination;
use vidopt::config::Config;
use vidopt::ui;

#[derive(Parser)]
#[command(name = "vidopt")]
#[command(about = "▶ vidopt - SEO metadata and blog posts from video transcripts")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write the identity provider and backend configuration
    Onboard,

    /// Show configuration status
    Status,

    /// Print the sign-in and sign-out URLs without opening them
    Urls,

    /// Sign in, run one analysis and print it
    Analyze {
        /// Analysis to run
        #[arg(short, long, value_enum, default_value_t = AnalysisType::Seo)]
        kind: AnalysisType,

        /// Transcript file, or "-" for stdin
        #[arg(short, long)]
        transcript: PathBuf,

        /// Print the sign-in URL instead of opening a browser
        #[arg(long)]
        no_browser: bool,

        /// Sign out at the provider afterwards
        #[arg(long)]
        sign_out: bool,
    },

    /// Sign in and generate content interactively
    Session {
        /// Transcript file, or "-" for stdin
        #[arg(short, long)]
        transcript: PathBuf,

        /// Print URLs instead of opening a browser
        #[arg(long)]
        no_browser: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Ctrl+C twice within 3 seconds exits
    let exit_flag = std::sync::Arc::new(std::sync::atomic::AtomicBool::new(false));
    let r = exit_flag.clone();

    ctrlc::set_handler(move || {
        if r.swap(true, std::sync::atomic::Ordering::SeqCst) {
            println!("\n👋 Bye!");
            std::process::exit(130);
        }
        println!("\n⚠️  Press Ctrl+C again to exit");

        let r2 = r.clone();
        std::thread::spawn(move || {
            std::thread::sleep(std::time::Duration::from_secs(3));
            r2.store(false, std::sync::atomic::Ordering::SeqCst);
        });
    }).ok();

    let cli = Cli::parse();

    match cli.command {
        Commands::Onboard => {
            vidopt::config::onboard()?;
        }

        Commands::Status => {
            let config = vidopt::config::load()?;
            print_status(&config);
        }

        Commands::Urls => {
            let config = vidopt::config::load()?;
            let sign_in = vidopt::auth::build_authorization_url(&config, &config.origin)?;
            let sign_out = vidopt::auth::build_logout_url(&config, &config.origin)?;
            println!("Sign in:  {}", sign_in.url);
            println!("Sign out: {}", sign_out);
        }

        Commands::Analyze { kind, transcript, no_browser, sign_out } => {
            let transcript = read_transcript(&transcript)?;
            let config = vidopt::config::load()?;
            let mut app = App::new(config, BrowserNavigator::new(no_browser))?;

            sign_in(&mut app).await?;

            let outcome = run_analysis(&app, &transcript, kind).await;

            if sign_out {
                app.sign_out()?;
                ui::print_success("Signed out");
            }
            outcome?;
        }

        Commands::Session { transcript, no_browser } => {
            let transcript = read_transcript(&transcript)?;
            let config = vidopt::config::load()?;
            let mut app = App::new(config, BrowserNavigator::new(no_browser))?;

            sign_in(&mut app).await?;
            run_session(&mut app, &transcript).await?;
        }
    }

    Ok(())
}

fn print_status(config: &Config) {
    ui::print_header("Status");
    println!("Config file: {:?}", vidopt::config::config_path());
    println!("Origin:      {}", config.origin);
    println!("Region:      {}", config.region);
    println!("API URL:     {}", if config.api_url.is_empty() { "not set" } else { config.api_url.as_str() });

    let missing = config.missing_keys();
    if missing.is_empty() {
        ui::print_success("Configuration complete");
        match vidopt::auth::redirect_uri(&config.origin) {
            Ok(uri) => ui::print_step(&format!("Registered callback URL must be {}", uri)),
            Err(e) => ui::print_error(&e.to_string()),
        }
    } else {
        ui::print_warning(&format!("Missing: {} (run 'vidopt onboard')", missing.join(", ")));
    }
}

fn read_transcript(path: &Path) -> Result<String> {
    let transcript = if path == Path::new("-") {
        std::io::read_to_string(std::io::stdin())?
    } else {
        std::fs::read_to_string(path)?
    };

    if transcript.trim().is_empty() {
        bail!("Please provide a non-empty transcript");
    }
    Ok(transcript)
}

async fn sign_in(app: &mut App<BrowserNavigator>) -> Result<()> {
    ui::print_step("Opening identity provider sign-in...");
    ui::print_thinking("Waiting for authorization");

    match app.sign_in_with_browser().await {
        Ok(Destination::App) => {
            ui::print_success("Signed in");
            Ok(())
        }
        Ok(Destination::Landing) => {
            bail!("No authorization code received; sign-in was not completed")
        }
        Err(e) => {
            ui::print_error(&format!("Sign-in failed: {}", e));
            Err(e.into())
        }
    }
}

async fn run_analysis(app: &App<BrowserNavigator>, transcript: &str, kind: AnalysisType) -> Result<()> {
    let spinner = ui::spinner(kind.progress_label());
    let result = app.analyze(transcript, kind).await;
    spinner.finish_and_clear();

    match result {
        Ok(response) => {
            println!("\n{}\n", ui::render_analysis(&response));
            Ok(())
        }
        Err(e) => {
            ui::print_error(&format!("Failed to analyze content: {}", e));
            Err(e.into())
        }
    }
}

async fn run_session(app: &mut App<BrowserNavigator>, transcript: &str) -> Result<()> {
    use inquire::Select;

    const SEO: &str = "Generate SEO metadata";
    const BLOG: &str = "Generate blog post";
    const SIGN_OUT: &str = "Sign out";
    const QUIT: &str = "Quit";

    loop {
        let choice = Select::new("What next?", vec![SEO, BLOG, SIGN_OUT, QUIT]).prompt()?;

        match choice {
            SEO | BLOG => {
                let kind = if choice == SEO { AnalysisType::Seo } else { AnalysisType::Blog };
                // Failures are reported and the session stays signed in
                let _ = run_analysis(app, transcript, kind).await;
            }
            SIGN_OUT => {
                app.sign_out()?;
                ui::print_success("Signed out");
                return Ok(());
            }
            _ => return Ok(()),
        }
    }
}
