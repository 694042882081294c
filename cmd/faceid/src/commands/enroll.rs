//! Enrollment command.

use clap::Args;
use faceid_gallery::{naming, Source};
use tracing::info;

use super::{open_service, output_result, read_payload};
use crate::Cli;

/// Enroll face images under one identity.
///
/// Replaces every record previously enrolled for that identity. Without
/// --identity the name is taken from the parent directory of each file,
/// e.g. `faces/alice/1.jpg` enrolls `alice`.
#[derive(Args)]
pub struct EnrollCommand {
    /// Identity name (default: derived from the file paths)
    #[arg(long)]
    identity: Option<String>,

    /// Treat each file as a JSON embedding array instead of an image
    #[arg(long)]
    vector: bool,

    /// Image (or vector) files
    #[arg(required = true)]
    files: Vec<String>,
}

impl EnrollCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;

        let receipt = match &self.identity {
            Some(identity) => {
                let sources = self
                    .files
                    .iter()
                    .map(|path| {
                        let name = naming::file_name(path)?;
                        Ok(Source {
                            source_ref: name.to_string(),
                            payload: read_payload(path, self.vector)?,
                        })
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                svc.enroll(identity, sources)?
            }
            None => {
                let sources = self
                    .files
                    .iter()
                    .map(|path| {
                        Ok(Source {
                            source_ref: path.clone(),
                            payload: read_payload(path, self.vector)?,
                        })
                    })
                    .collect::<anyhow::Result<Vec<_>>>()?;
                svc.enroll_paths(sources)?
            }
        };

        info!(identity = %receipt.identity, records = receipt.records, "enrolled");
        output_result(&receipt, cli)
    }
}
