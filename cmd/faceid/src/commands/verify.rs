//! Verification command.

use clap::Args;

use super::{open_service, output_result, read_payload};
use crate::Cli;

/// Check whether a face matches the gallery.
///
/// Prints the nearest identity when it lies within the threshold. A probe
/// without a detectable face is an error, not a non-match.
#[derive(Args)]
pub struct VerifyCommand {
    /// Only compare against this identity
    #[arg(long)]
    identity: Option<String>,

    /// Match threshold (default: from context)
    #[arg(long)]
    threshold: Option<f32>,

    /// Treat the file as a JSON embedding array instead of an image
    #[arg(long)]
    vector: bool,

    /// Print the closest record and its distance, ignoring the threshold
    #[arg(long, conflicts_with = "threshold")]
    nearest: bool,

    /// Probe image (or vector) file
    file: String,
}

impl VerifyCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;
        let probe = read_payload(&self.file, self.vector)?;
        let scope = self.identity.as_deref();

        if self.nearest {
            return output_result(&svc.nearest(&probe, scope)?, cli);
        }
        let result = match self.threshold {
            Some(t) => svc.verify_with_threshold(&probe, scope, t)?,
            None => svc.verify(&probe, scope)?,
        };
        output_result(&result, cli)
    }
}
