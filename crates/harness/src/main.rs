use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use citadel_harness::{
    clean_lines, line_cleaning_policy, record, AuditOutcome, DirectorySink, Driver, FindingSink,
    HarnessConfig, LogSink,
};
use citadel_parser::{HtmlParser, Sanitizer};
use clap::{Parser, Subcommand};

/// Sanitizer bypass auditing tools.
#[derive(Parser, Debug)]
#[command(
    name = "citadel-audit",
    version = env!("CARGO_PKG_VERSION"),
    about = "Clean HTML payloads and report script-capable content that survives"
)]
struct Cli {
    /// Harness configuration file (JSON). Defaults to $CITADEL_AUDIT_CONFIG.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Clean and classify one payload file, printing raw, clean, DOM and verdict.
    Check {
        /// Payload file.
        file: PathBuf,

        /// Also save findings and leads under the configured directories.
        #[arg(short, long)]
        record: bool,
    },

    /// Clean a file line by line into findings/<name>.clean.txt.
    Lines {
        /// Input file, one HTML snippet per line.
        file: PathBuf,

        /// Output file name under findings/ (default: <input>.clean.txt).
        #[arg(short, long)]
        out: Option<String>,
    },

    /// Print the element outline of a file as the parser sees it.
    Dom {
        /// HTML file.
        file: PathBuf,

        /// Clean the file with the configured allow-list first.
        #[arg(long)]
        clean: bool,
    },

    /// Run the multi-candidate suite (href, src, action, xlink:href, srcset).
    Candidates {
        /// Payload file.
        file: PathBuf,
    },
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => HarnessConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => HarnessConfig::from_env().context("loading configuration")?,
    };
    log::debug!("Harness configuration: {:?}", config);

    match cli.command {
        Command::Check { file, record: save } => check(&config, &file, save),
        Command::Lines { file, out } => lines(&config, &file, out),
        Command::Dom { file, clean } => dom(&config, &file, clean),
        Command::Candidates { file } => candidates(&config, &file),
    }
}

fn read_input(path: &Path) -> anyhow::Result<String> {
    let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

fn print_outcome(outcome: &AuditOutcome) -> anyhow::Result<()> {
    println!("--- RAW ---\n{}\n", outcome.raw);
    println!("--- DOCUMENT ---\n{}\n", outcome.document);
    println!("--- CLEAN ---\n{}\n", outcome.cleaned);
    println!("--- DOM ---\n{}", outcome.dom_dump);
    println!("--- VERDICT ---\n{}", outcome.verdict.to_json()?);
    Ok(())
}

fn check(config: &HarnessConfig, file: &Path, save: bool) -> anyhow::Result<()> {
    let driver = Driver::new(config.clone())?;
    let raw = read_input(file)?;
    let outcome = driver.run(&raw)?;
    print_outcome(&outcome)?;

    record(&LogSink, &outcome);
    if save {
        record(&DirectorySink::from_config(config), &outcome);
    }
    if !outcome.is_safe() {
        anyhow::bail!("{} finding(s) survived cleaning", outcome.verdict.findings().len());
    }
    Ok(())
}

fn lines(config: &HarnessConfig, file: &Path, out: Option<String>) -> anyhow::Result<()> {
    let input = read_input(file)?;
    let sanitizer = Sanitizer::new(line_cleaning_policy())?;
    let report = clean_lines(&sanitizer, &input);

    fs::create_dir_all(&config.findings_dir)?;
    let name = match out {
        Some(name) => name,
        None => {
            let base = file
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| "input".to_string());
            format!("{}.clean.txt", base)
        }
    };
    let out_path = config.findings_dir.join(name);
    let mut content = report.cleaned.join("\n");
    content.push('\n');
    fs::write(&out_path, content).with_context(|| format!("writing {}", out_path.display()))?;

    println!("Processed {} lines, {} unstable under re-cleaning", report.lines, report.unstable);
    println!("Wrote cleaned output to: {}", out_path.display());
    Ok(())
}

fn dom(config: &HarnessConfig, file: &Path, clean: bool) -> anyhow::Result<()> {
    let mut html = read_input(file)?;
    if clean {
        html = config.sanitizer()?.clean(&html);
        println!("--- CLEAN ---\n{}\n", html);
    }
    let root = HtmlParser::default().parse_document(&html)?;
    print!("{}", root.outline());
    Ok(())
}

fn candidates(config: &HarnessConfig, file: &Path) -> anyhow::Result<()> {
    let driver = Driver::new(config.clone())?;
    let payload = read_input(file)?;
    let payload = payload.trim_end_matches(&['\r', '\n'][..]);
    let sink = LogSink;

    let mut findings = 0;
    for outcome in driver.run_candidates(payload)? {
        println!(
            "{:<6} {}",
            if outcome.is_safe() { "ok" } else { "BYPASS" },
            outcome.cleaned
        );
        if outcome.is_notable() {
            sink.record(&outcome)?;
        }
        findings += outcome.verdict.findings().len();
    }
    if findings > 0 {
        anyhow::bail!("{} finding(s) survived cleaning", findings);
    }
    Ok(())
}
