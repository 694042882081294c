//! Ranked search command.

use clap::Args;

use super::{open_service, output_result, read_payload};
use crate::Cli;

/// Rank gallery identities by similarity to a face.
#[derive(Args)]
pub struct SearchCommand {
    /// Match threshold (default: from context)
    #[arg(long)]
    threshold: Option<f32>,

    /// Maximum number of candidates, 0 for all
    #[arg(long, default_value_t = 5)]
    limit: usize,

    /// Treat the file as a JSON embedding array instead of an image
    #[arg(long)]
    vector: bool,

    /// Probe image (or vector) file
    file: String,
}

impl SearchCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;
        let probe = read_payload(&self.file, self.vector)?;
        let threshold = self.threshold.unwrap_or(svc.config().threshold);
        let candidates = svc.search(&probe, threshold, self.limit)?;
        output_result(&candidates, cli)
    }
}
