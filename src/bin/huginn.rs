//! huginn: tag reference entity records from their images.

use std::path::PathBuf;
use std::process;
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use tracing::info;

use huginn::classifier::{RekognitionClassifier, RekognitionConfig};
use huginn::config::{Config, Secrets};
use huginn::{AkeneoClient, AkeneoCredentials, BatchTagger, HuginnError, LabelCache, TaggerConfig};

/// Huginn: image-recognition tagging for PIM reference entities.
#[derive(Parser)]
#[command(name = "huginn")]
#[command(version = huginn::PKG_VERSION)]
#[command(about = "Tag reference entity records with labels detected in their images")]
struct Args {
    /// Path to configuration file.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Classify a reference entity based on its images
    Classify(ClassifyArgs),
}

#[derive(ClapArgs)]
struct ClassifyArgs {
    /// The reference entity code the records belong to
    reference_entity: String,

    /// Text attribute that receives the tags
    #[arg(long, env = "TAG_ATTRIBUTE")]
    tag_attribute: Option<String>,

    /// Labels must be strictly more confident than this (percent)
    #[arg(long)]
    confidence_threshold: Option<f64>,

    /// PIM base URL
    #[arg(long, env = "AKENEO_BASE_URL")]
    base_url: Option<String>,

    /// The username of the API user
    #[arg(long, env = "AKENEO_API_USERNAME")]
    api_username: Option<String>,

    /// The password of the API user
    #[arg(long, env = "AKENEO_API_PASSWORD", hide_env_values = true)]
    api_password: Option<String>,

    /// API client id
    #[arg(long, env = "AKENEO_API_CLIENT_ID")]
    api_client_id: Option<String>,

    /// API client secret
    #[arg(long, env = "AKENEO_API_CLIENT_SECRET", hide_env_values = true)]
    api_client_secret: Option<String>,

    /// AWS access key id (default: AWS credential chain)
    #[arg(long, env = "AWS_ACCESS_KEY_ID")]
    aws_access_key_id: Option<String>,

    /// AWS secret access key
    #[arg(long, env = "AWS_SECRET_ACCESS_KEY", hide_env_values = true)]
    aws_secret_access_key: Option<String>,

    /// AWS region for the recognition service
    #[arg(long)]
    region: Option<String>,

    /// Label cache document (default: ~/.cache/huginn/labels.json)
    #[arg(long)]
    cache_path: Option<PathBuf>,
}

#[tokio::main]
async fn main() {
    // Initialise tracing (default: info; override with RUST_LOG).
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    info!(version = huginn::version_string(), "huginn starting");

    let result = match args.command {
        Command::Classify(classify_args) => classify(args.config.as_deref(), classify_args).await,
    };

    match result {
        Ok(tagged) => println!("tagged {tagged} records"),
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    }
}

async fn classify(config_path: Option<&std::path::Path>, args: ClassifyArgs) -> huginn::Result<usize> {
    let config = Config::load(config_path)?;
    let secrets = Secrets::load()?;

    let tag_attribute = args
        .tag_attribute
        .or(config.tagging.tag_attribute)
        .ok_or_else(|| missing("tag attribute (--tag-attribute or TAG_ATTRIBUTE)"))?;
    let base_url = args
        .base_url
        .or(config.pim.base_url)
        .ok_or_else(|| missing("PIM base URL (--base-url or AKENEO_BASE_URL)"))?;

    let credentials = AkeneoCredentials {
        username: args
            .api_username
            .or_else(|| secrets.pim_username())
            .ok_or_else(|| missing("API username"))?,
        password: args
            .api_password
            .or_else(|| secrets.pim_password())
            .ok_or_else(|| missing("API password"))?,
        client_id: args
            .api_client_id
            .or_else(|| secrets.pim_client_id())
            .ok_or_else(|| missing("API client id"))?,
        client_secret: args
            .api_client_secret
            .or_else(|| secrets.pim_client_secret())
            .ok_or_else(|| missing("API client secret"))?,
    };
    let pim = Arc::new(AkeneoClient::new(base_url, credentials)?);

    let aws = secrets.aws.as_ref();
    let rekognition = RekognitionClassifier::new(
        RekognitionConfig {
            region: args.region.or(config.classifier.region),
            endpoint_url: config.classifier.endpoint_url,
            access_key_id: args
                .aws_access_key_id
                .or_else(|| aws.map(|a| a.access_key_id.clone())),
            secret_access_key: args
                .aws_secret_access_key
                .or_else(|| aws.map(|a| a.secret_access_key.clone())),
            max_labels: config.classifier.max_labels,
            min_confidence: config.classifier.min_confidence,
        },
        pim.clone(),
    )
    .await?;

    let cache_path = args.cache_path.unwrap_or(config.cache.path);
    info!(path = %cache_path.display(), "using label cache");
    let classifier = LabelCache::with_file(Arc::new(rekognition), cache_path);

    let tagger_config = TaggerConfig::new(tag_attribute)
        .confidence_threshold(
            args.confidence_threshold
                .unwrap_or(config.tagging.confidence_threshold),
        )
        .batch_size(config.tagging.batch_size);

    let tagger = BatchTagger::new(pim, Arc::new(classifier), tagger_config);
    let report = tagger.run(&args.reference_entity).await?;
    Ok(report.records_tagged)
}

fn missing(what: &str) -> HuginnError {
    HuginnError::Configuration(format!("missing {what}"))
}
