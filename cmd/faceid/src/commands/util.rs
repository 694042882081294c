//! Utility functions for CLI commands.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use faceid_cli::{Config, Context, Output, OutputFormat, Paths, StoreKind, load_config};
use faceid_extractor::{ExtractorConfig, HttpExtractor};
use faceid_gallery::{
    Config as GalleryConfig, DirBackend, EmbeddingVector, FaceService, KvBackend, MemoryBackend,
    Payload, StoreBackend,
};
use tracing::debug;

use crate::Cli;

pub const APP_NAME: &str = "faceid";

/// Gets the global configuration.
pub fn get_config(cli: &Cli) -> anyhow::Result<Config> {
    load_config(APP_NAME, cli.config.as_deref())
}

/// Gets the context configuration to use.
pub fn get_context(cli: &Cli) -> anyhow::Result<Context> {
    let cfg = get_config(cli)?;

    match cfg.resolve_context(cli.context.as_deref()) {
        Some(ctx) => Ok(ctx.clone()),
        None => match cli.context.as_deref() {
            None => anyhow::bail!(
                "no context specified. Use -c flag or set a default context with 'faceid config use-context'"
            ),
            Some(name) => anyhow::bail!("context '{}' not found", name),
        },
    }
}

/// Opens the gallery service described by the selected context.
pub fn open_service(cli: &Cli) -> anyhow::Result<FaceService> {
    let ctx = get_context(cli)?;
    let paths = Paths::new(APP_NAME)?;
    paths.ensure_data_dir()?;
    build_service(&ctx, &paths.data_dir())
}

/// Wires backend, extractor and gallery config for `ctx`.
pub fn build_service(ctx: &Context, data_dir: &Path) -> anyhow::Result<FaceService> {
    let ext_cfg = ExtractorConfig::default()
        .with_base_url(&ctx.extractor_url)
        .with_timeout(Duration::from_secs(ctx.timeout))
        .with_dimension(ctx.dimension);
    let gallery_cfg = GalleryConfig::new(ext_cfg.dimension)
        .with_threshold(ctx.threshold)
        .with_unknown_fallback(ctx.unknown_fallback);

    let backend: Box<dyn StoreBackend> = match ctx.store {
        StoreKind::Memory => Box::new(MemoryBackend),
        StoreKind::Redb => {
            let path = store_path(ctx, data_dir)?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            Box::new(KvBackend::open_redb(&path)?)
        }
        StoreKind::Dir => Box::new(DirBackend::open(store_path(ctx, data_dir)?)?),
    };
    debug!(context = %ctx.name, store = %ctx.store, url = %ext_cfg.base_url, "opening gallery");

    let extractor = Arc::new(HttpExtractor::new(ext_cfg));
    Ok(FaceService::new(gallery_cfg, backend, extractor)?)
}

fn store_path(ctx: &Context, data_dir: &Path) -> anyhow::Result<PathBuf> {
    ctx.store_location(data_dir)
        .ok_or_else(|| anyhow::anyhow!("context '{}' has no store path", ctx.name))
}

/// Reads `path` as an image, or as a JSON float array when `vector` is set.
pub fn read_payload(path: &str, vector: bool) -> anyhow::Result<Payload> {
    let bytes = std::fs::read(path)
        .map_err(|e| anyhow::anyhow!("read {}: {}", path, e))?;
    if !vector {
        return Ok(Payload::Image(bytes));
    }
    let values: Vec<f32> = serde_json::from_slice(&bytes)
        .map_err(|e| anyhow::anyhow!("{}: expected a JSON array of numbers: {}", path, e))?;
    Ok(Payload::Vector(EmbeddingVector::new(values)?))
}

/// Outputs result as JSON or YAML.
pub fn output_result<T: serde::Serialize>(result: &T, cli: &Cli) -> anyhow::Result<()> {
    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Yaml
    };
    Output::new(format, cli.output.clone()).write(result)
}

/// Prints success message.
pub fn print_success(msg: &str) {
    eprintln!("\x1b[32m✓\x1b[0m {}", msg);
}
