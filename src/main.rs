use clap::{Parser, Subcommand};
use flashbulb::{
    combine_reports, normalize_prefix, AnalyzerConfigBuilder, Dispatcher, FlashResult,
    FlashbulbError, LocalDirSink, RawObservation, SignatureOrigin, TechAnalyzer,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use walkdir::WalkDir;

const COMBINED_FILE: &str = "combined.json";

#[derive(Parser)]
#[command(name = "flashbulb")]
#[command(version, about = "Fingerprint the technologies behind captured web pages")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true, help = "Enable debug logging")]
    debug: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Analyze one captured page observation
    Analyze {
        #[arg(help = "Observation JSON produced by the capture stage")]
        observation: PathBuf,
        #[arg(long, short, help = "Signature database (Wappalyzer apps.json format)")]
        signatures: PathBuf,
        #[arg(long, short, help = "Store the report under this directory")]
        out: Option<PathBuf>,
        #[arg(long, default_value = "", help = "Key prefix for stored objects")]
        prefix: String,
        #[arg(long, help = "Compile every pattern case-insensitively")]
        case_insensitive: bool,
        #[arg(long, help = "Do not extract meta tags and script sources from the HTML")]
        no_html_extract: bool,
    },

    /// Merge stored reports into combined.json
    Combine {
        #[arg(help = "Directory holding stored reports")]
        dir: PathBuf,
        #[arg(long, default_value = "", help = "Key prefix of the reports")]
        prefix: String,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let result = match cli.command {
        Commands::Analyze {
            observation,
            signatures,
            out,
            prefix,
            case_insensitive,
            no_html_extract,
        } => {
            analyze(
                &observation,
                signatures,
                out,
                &prefix,
                case_insensitive,
                !no_html_extract,
            )
            .await
        }
        Commands::Combine { dir, prefix } => combine(&dir, &prefix).await,
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            log::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

async fn analyze(
    observation: &Path,
    signatures: PathBuf,
    out: Option<PathBuf>,
    prefix: &str,
    case_insensitive: bool,
    extract_from_html: bool,
) -> FlashResult<()> {
    let mut builder = AnalyzerConfigBuilder::new()
        .origin(SignatureOrigin::LocalFile(signatures))
        .case_insensitive(case_insensitive)
        .extract_from_html(extract_from_html)
        .prefix(prefix);
    if let Some(dir) = &out {
        builder = builder.output_dir(dir);
    }
    let config = builder.build();

    let content = tokio::fs::read_to_string(observation).await?;
    let obs = RawObservation::from_json_str(&content)?;
    let analyzer = TechAnalyzer::new(config).await?;

    let report = if out.is_some() {
        let sink = Arc::new(LocalDirSink::from_config(analyzer.config()));
        Dispatcher::new(analyzer, sink).run(&obs).await?
    } else {
        analyzer.report(&obs)
    };

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

async fn combine(dir: &Path, prefix: &str) -> FlashResult<()> {
    let prefix = normalize_prefix(prefix);
    let report_dir = dir.join(&prefix);

    let mut paths: Vec<PathBuf> = WalkDir::new(&report_dir)
        .max_depth(1)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_some_and(|name| name != COMBINED_FILE)
        })
        .collect();
    paths.sort();

    let mut reports: Vec<serde_json::Value> = Vec::with_capacity(paths.len());
    for path in &paths {
        let body = tokio::fs::read(path).await?;
        match serde_json::from_slice(&body) {
            Ok(value) => reports.push(value),
            Err(e) => log::warn!("Skipping unreadable report | Path: {} | Reason: {}", path.display(), e),
        }
    }

    if reports.is_empty() {
        return Err(FlashbulbError::InvalidInput(format!(
            "no reports found under {}",
            report_dir.display()
        )));
    }

    let target = report_dir.join(COMBINED_FILE);
    let combined = combine_reports(reports);
    tokio::fs::write(&target, serde_json::to_vec(&combined)?).await?;
    log::info!(
        "Combined {} reports | Output: {}",
        combined["targets"].as_array().map_or(0, Vec::len),
        target.display()
    );
    Ok(())
}
