use std::path::{Path, PathBuf};
use std::sync::Arc;

use termweave::cli::{Cli, Commands, ConfigAction};
use termweave::config::Config;
use termweave::embedding::{EmbeddingProvider, FastEmbedProvider, IngestItem, IngestPipeline};
use termweave::error::{Result, TermweaveError};
use termweave::retrieval::{FusionMethod, HybridQuery, SearchMode, SearchResult};
use termweave::{extract_candidate_terms, Engine};

fn main() -> Result<()> {
    let cli = Cli::parse_args();

    init_logging(cli.verbose);

    match cli.command {
        Commands::Terms {
            file,
            chunk_size,
            overlap,
            max_candidates,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_terms(&config, &file, chunk_size, overlap, max_candidates, json)?;
        }
        Commands::Search {
            query,
            corpus,
            mode,
            fusion,
            limit,
            json,
        } => {
            let config = load_config(cli.config, cli.profile)?;
            cmd_search(config, &query, &corpus, mode, fusion, limit, json)?;
        }
        Commands::Config { action } => {
            cmd_config(cli.config, action)?;
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    use tracing_subscriber::{fmt, EnvFilter};

    let default = if verbose { "termweave=debug" } else { "termweave=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn read_file(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| TermweaveError::Io {
        source: e,
        context: format!("Failed to read {:?}", path),
    })
}

fn cmd_terms(
    config: &Config,
    file: &Path,
    chunk_size: Option<usize>,
    overlap: Option<usize>,
    max_candidates: Option<usize>,
    json: bool,
) -> Result<()> {
    let text = read_file(file)?;

    let mut options = config.terms.clone();
    if let Some(size) = chunk_size {
        options.chunk_size = size;
    }
    if let Some(overlap) = overlap {
        options.overlap = overlap;
    }
    if let Some(max) = max_candidates {
        options.max_candidates = max;
    }

    let terms = extract_candidate_terms(&text, &options);

    if json {
        let out = serde_json::to_string_pretty(&terms).map_err(|e| TermweaveError::Json {
            source: e,
            context: "Failed to serialize terms".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    if terms.is_empty() {
        println!("No term candidates found");
        return Ok(());
    }

    println!("{:<4} {:<32} {:>6} {:>8}", "#", "TERM", "COUNT", "SCORE");
    for (i, term) in terms.iter().enumerate() {
        println!("{:<4} {:<32} {:>6} {:>8.3}", i + 1, term.term, term.count, term.score);
    }

    Ok(())
}

fn load_corpus(path: &Path) -> Result<Vec<IngestItem>> {
    let content = read_file(path)?;
    content
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(i, line)| {
            serde_json::from_str(line).map_err(|e| TermweaveError::Json {
                source: e,
                context: format!("Invalid corpus entry on line {}", i + 1),
            })
        })
        .collect()
}

fn cmd_search(
    mut config: Config,
    query: &str,
    corpus: &Path,
    mode: Option<SearchMode>,
    fusion: Option<FusionMethod>,
    limit: Option<usize>,
    json: bool,
) -> Result<()> {
    if let Some(mode) = mode {
        config.retrieval.mode = mode;
    }
    if let Some(fusion) = fusion {
        config.retrieval.fusion_strategy = Some(fusion);
    }
    if let Some(limit) = limit {
        config.retrieval.final_top_k = limit;
        config.retrieval.vector_search.top_k = limit;
        config.retrieval.keyword_search.top_k = limit;
    }

    let items = load_corpus(corpus)?;
    let provider: Arc<dyn EmbeddingProvider> =
        Arc::new(FastEmbedProvider::new(&config.embedding.model)?);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|e| TermweaveError::Io {
            source: e,
            context: "Failed to start async runtime".to_string(),
        })?;

    let results = runtime.block_on(async {
        let engine = Engine::local(config.store.settings());
        let collection = config.ingest.collection.clone();

        let pipeline = IngestPipeline::new(provider.clone(), engine.manager(), collection.clone())
            .with_batch_size(config.embedding.batch_size);
        let report = pipeline.process(items).await?;
        if report.failed > 0 {
            tracing::warn!("{} corpus entries failed to ingest", report.failed);
        }

        let mut request = HybridQuery::new(collection, query).with_config(config.retrieval.clone());
        if config.retrieval.mode != SearchMode::Keyword {
            request = request.with_vector(provider.embed(query)?);
        }

        Ok::<Vec<SearchResult>, TermweaveError>(engine.hybrid_search(&request).await?)
    })?;

    if json {
        let out = serde_json::to_string_pretty(&results).map_err(|e| TermweaveError::Json {
            source: e,
            context: "Failed to serialize results".to_string(),
        })?;
        println!("{}", out);
        return Ok(());
    }

    if results.is_empty() {
        println!("No results found");
        return Ok(());
    }

    for (i, result) in results.iter().enumerate() {
        println!(
            "{}. [{:.4}] {} ({:?})",
            i + 1,
            result.score,
            result.id,
            result.source
        );
        println!("   {}", result.preview(120).replace('\n', " "));
        if !result.highlights.is_empty() {
            println!("   matched: {}", result.highlights.join(", "));
        }
    }

    Ok(())
}

fn cmd_config(config_path: Option<PathBuf>, action: ConfigAction) -> Result<()> {
    match action {
        ConfigAction::Show => {
            let config = load_config(config_path, None)?;
            let out = toml::to_string_pretty(&config)?;
            println!("{}", out);
        }
        ConfigAction::Validate { file } => {
            let path = match file.or(config_path) {
                Some(path) => path,
                None => Config::default_path()?,
            };
            let config = Config::load(&path)?;
            println!("✓ Configuration is valid");
            println!("  Schema version: {}", config.meta.schema_version);
        }
        ConfigAction::Init { force } => {
            let path = match config_path {
                Some(path) => path,
                None => Config::default_path()?,
            };

            if path.exists() && !force {
                println!("Configuration file already exists at: {}", path.display());
                println!("Use --force to overwrite");
                return Ok(());
            }

            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| TermweaveError::Io {
                    source: e,
                    context: format!("Failed to create config directory: {:?}", parent),
                })?;
            }

            Config::default().save(&path)?;
            println!("✓ Configuration initialized at: {}", path.display());
        }
        ConfigAction::Path => {
            println!("{}", Config::default_path()?.display());
        }
    }

    Ok(())
}

fn load_config(config_path: Option<PathBuf>, profile: Option<String>) -> Result<Config> {
    let path = match config_path {
        Some(path) => path,
        None => Config::default_path()?,
    };

    if !path.exists() {
        tracing::debug!(
            "Config file not found, using defaults. Run 'termweave config init' to create one."
        );
        let mut config = Config::default();
        config.apply_env_overrides();
        if let Some(profile) = profile {
            config.apply_profile(&profile)?;
        }
        return Ok(config);
    }

    match profile {
        Some(profile) => Config::load_with_profile(&path, &profile),
        None => Config::load(&path),
    }
}
