use clap::Parser;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use vacancy_harvest::{Config, ErrorReport, Harvester, Params};

#[derive(Parser)]
#[command(name = "vacancy-harvest")]
#[command(about = "Harvest job vacancies from a paginated list with detail overlays")]
#[command(version)]
struct Cli {
    /// Config file to run
    config: PathBuf,

    /// Run in headless mode (overrides config)
    #[arg(long)]
    headless: bool,

    /// Set a parameter (can be used multiple times)
    #[arg(short = 'P', long = "param", value_name = "KEY=VALUE")]
    params: Vec<String>,

    /// Verbose output (-v for info, -vv for debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Validate config without running
    #[arg(long)]
    check: bool,

    /// Quiet mode (only errors)
    #[arg(short, long)]
    quiet: bool,

    /// Stop after this many vacancies (overrides config, 0 = no cap)
    #[arg(long, value_name = "N")]
    max_records: Option<usize>,

    /// Write the JSON report to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Pretty-print the JSON report
    #[arg(long)]
    pretty: bool,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // RUST_LOG wins over -v/-q
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => "warn",
            1 => "info",
            _ => "debug",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .init();

    let code = match run(&cli).await {
        Ok(()) => 0,
        Err(e) => {
            let report = ErrorReport::from(&e);
            if let Err(write_err) = emit(&report, cli.output.as_deref(), cli.pretty) {
                eprintln!("{}", e);
                eprintln!("failed to write error report: {}", write_err);
            }
            e.exit_code()
        }
    };
    std::process::exit(code);
}

async fn run(cli: &Cli) -> vacancy_harvest::Result<()> {
    let params = Params::from_args(&cli.params)?;
    let mut config = Config::load_with_params(&cli.config, &params)?;

    if cli.check {
        print_check(&config);
        return Ok(());
    }

    if cli.headless {
        config.browser.headless = true;
    }
    if let Some(max) = cli.max_records {
        config.extraction.max_records = Some(max);
    }

    info!("Running: {}", config.name);
    let mut harvester = Harvester::launch(&config.browser).await?;

    let cancel = harvester.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received, stopping after the current row");
            cancel.cancel();
        }
    });

    let result = harvester.run(&config).await;
    if let Err(e) = harvester.close().await {
        warn!("closing the browser failed: {}", e);
    }
    emit(&result?, cli.output.as_deref(), cli.pretty)
}

fn emit<T: Serialize>(report: &T, output: Option<&Path>, pretty: bool) -> vacancy_harvest::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(report)?
    } else {
        serde_json::to_string(report)?
    };
    match output {
        Some(path) => {
            std::fs::write(path, json)?;
            info!("Report written to {}", path.display());
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn print_check(config: &Config) {
    println!("Config valid: {}", config.name);
    println!("  Target: {}", config.redact(&config.target.url));
    if let Some(ref login) = config.login {
        println!(
            "  Login: {} as {}",
            config.redact(&login.url),
            config.redact(&login.username)
        );
    }
    if !config.params.is_empty() {
        println!("  Parameters: {}", config.params.len());
        let mut names: Vec<_> = config.params.iter().collect();
        names.sort_by(|a, b| a.0.cmp(b.0));
        for (name, def) in names {
            let req = if def.required { " (required)" } else { "" };
            let secret = if def.secret { " (secret)" } else { "" };
            let env = def
                .env
                .as_deref()
                .map(|v| format!(" [env {}]", v))
                .unwrap_or_default();
            let desc = def.description.as_deref().unwrap_or("");
            println!("    - {}{}{}{}: {}", name, req, secret, env, desc);
        }
    }
    println!(
        "  Content match: {} reads, {}ms apart",
        config.timing.content_match.attempts, config.timing.content_match.interval_ms
    );
    if let Some(cap) = config.extraction.record_cap() {
        println!("  Max records: {}", cap);
    }
    if let Some(pages) = config.extraction.max_pages {
        println!("  Max pages: {}", pages);
    }
    println!("  Navigation attempts: {}", config.retry().attempts);
}
