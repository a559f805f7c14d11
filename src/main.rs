use std::net::SocketAddr;
use std::path::PathBuf;

use admission_oracle::config::{Config, ConfigOverrides};
use admission_oracle::dataset::ProgrammeStore;
use admission_oracle::engine::recommender::{RecommendRequest, Recommender};
use admission_oracle::engine::{classify_programme, Band};
use admission_oracle::output::json::render_json;
use admission_oracle::output::table::{
    render_classification_table, render_dataset_status_table, render_recommendations_table,
};
use admission_oracle::programme::prestige::PrestigeTable;
use admission_oracle::scores::{normalize_scores, ScoreMap};
use admission_oracle::server::run_server;
use anyhow::{anyhow, bail, Result};
use clap::{Parser, Subcommand, ValueEnum};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "admission-oracle",
    about = "JUPAS admission likelihood classification and recommendations"
)]
struct Cli {
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Path to the programme dataset, overriding the configured one.
    #[arg(short, long)]
    data: Option<String>,
    #[arg(short, long, value_enum, default_value_t = OutputFormat::Table)]
    output: OutputFormat,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Classify one programme against a set of subject scores.
    Classify {
        #[arg(long)]
        code: String,
        /// Subject scores as SUBJECT=GRADE pairs, e.g. CHI=5 ENG=4 BIO=5*
        #[arg(required = true)]
        scores: Vec<String>,
    },
    /// Rank programmes at or above a target likelihood band.
    Recommend {
        /// Target band, 0 (mission impossible) to 8 (golden ticket).
        #[arg(long)]
        band: i8,
        #[arg(long)]
        count: Option<usize>,
        /// Programme codes to leave out, comma separated.
        #[arg(long)]
        exclude: Option<String>,
        /// Institution name filter, comma separated substrings.
        #[arg(long)]
        institutions: Option<String>,
        #[arg(required = true)]
        scores: Vec<String>,
    },
    /// Inspect or reload the programme dataset.
    Dataset {
        #[command(subcommand)]
        command: DatasetCommands,
    },
    Serve {
        #[arg(long)]
        host: Option<String>,
        #[arg(long)]
        port: Option<u16>,
    },
    Config {
        #[arg(long)]
        init: bool,
        #[arg(long)]
        show: bool,
    },
}

#[derive(Debug, Subcommand)]
enum DatasetCommands {
    Status,
    Reload,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load(Some(&config_path))?;
    config.apply_overrides(ConfigOverrides {
        dataset_path: cli.data.clone(),
        host: None,
        port: None,
    });

    if matches!(cli.command, Commands::Config { .. }) {
        return handle_config_command(&cli.command, &config, &config_path);
    }
    if let Commands::Serve { host, port } = &cli.command {
        let host = host.clone().unwrap_or_else(|| config.server.host.clone());
        let port = port.unwrap_or(config.server.port);
        let bind = format!("{host}:{port}");
        let addr: SocketAddr = bind
            .parse()
            .map_err(|e| anyhow!("invalid bind address {bind}: {e}"))?;
        return run_server(config, addr).await;
    }

    let store = ProgrammeStore::new(config.resolved_dataset_path());

    match &cli.command {
        Commands::Classify { code, scores } => {
            let scores = parse_score_args(scores)?;
            let snapshot = store.snapshot()?;
            let programme = snapshot
                .find_programme(code)
                .ok_or_else(|| anyhow!("unknown programme code: {code}"))?;
            let result = classify_programme(&scores, programme);
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_classification_table(programme, &result))
                }
                OutputFormat::Json => println!("{}", render_json(&result)?),
            }
        }
        Commands::Recommend {
            band,
            count,
            exclude,
            institutions,
            scores,
        } => {
            let scores = parse_score_args(scores)?;
            let target_band =
                Band::try_from(*band).map_err(|e| anyhow!("invalid --band: {e}"))?;
            let request = RecommendRequest {
                target_band,
                exclude_codes: parse_list(exclude.as_deref()),
                institutions: institutions
                    .as_deref()
                    .map(|raw| parse_list(Some(raw)))
                    .filter(|list| !list.is_empty()),
                count: count.unwrap_or(config.engine.default_recommendations),
            };
            let recommender =
                Recommender::new(PrestigeTable::with_defaults(), config.scan_limits());
            let snapshot = store.snapshot()?;
            let (entries, summary) = recommender.recommend(&scores, &snapshot, &request)?;
            match cli.output {
                OutputFormat::Table => {
                    println!("{}", render_recommendations_table(&entries, &summary))
                }
                OutputFormat::Json => {
                    println!(
                        "{}",
                        render_json(&serde_json::json!({
                            "recommendations": entries,
                            "summary": summary,
                        }))?
                    )
                }
            }
        }
        Commands::Dataset { command } => match command {
            DatasetCommands::Status => {
                if let Err(err) = store.snapshot() {
                    tracing::warn!("dataset unavailable: {err}");
                }
                let status = store.status();
                match cli.output {
                    OutputFormat::Table => {
                        println!("{}", render_dataset_status_table(&status))
                    }
                    OutputFormat::Json => println!("{}", render_json(&status)?),
                }
            }
            DatasetCommands::Reload => {
                let snapshot = store.force_reload()?;
                println!(
                    "Reloaded {} programmes (generation {})",
                    snapshot.programmes.len(),
                    snapshot.generation
                );
            }
        },
        Commands::Config { .. } => {}
        Commands::Serve { .. } => unreachable!("serve command handled before dispatch"),
    }

    Ok(())
}

fn handle_config_command(command: &Commands, config: &Config, config_path: &PathBuf) -> Result<()> {
    let Commands::Config { init, show } = command else {
        return Ok(());
    };
    if *init {
        Config::write_template(config_path)?;
        println!("Wrote config template to {}", config_path.display());
    }
    if *show || !*init {
        println!("{}", render_json(config)?);
    }
    Ok(())
}

fn parse_score_args(raw: &[String]) -> Result<ScoreMap> {
    let mut pairs = Vec::new();
    for piece in raw {
        let Some((subject, grade)) = piece.split_once('=') else {
            bail!("malformed score argument {piece:?}, expected SUBJECT=GRADE");
        };
        let subject = subject.trim();
        if subject.is_empty() {
            bail!("malformed score argument {piece:?}, empty subject");
        }
        pairs.push((subject, grade.trim()));
    }
    if pairs.is_empty() {
        bail!("at least one SUBJECT=GRADE pair is required");
    }
    Ok(normalize_scores(pairs))
}

fn parse_list(raw: Option<&str>) -> Vec<String> {
    raw.map(|raw| {
        raw.split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    })
    .unwrap_or_default()
}
