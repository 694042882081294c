//! Identity deletion command.

use clap::Args;
use serde::Serialize;

use super::{open_service, output_result};
use crate::Cli;

#[derive(Serialize)]
struct Deleted<'a> {
    identity: &'a str,
    removed: usize,
}

/// Delete an identity and all its records.
#[derive(Args)]
pub struct DeleteCommand {
    /// Identity name
    name: String,
}

impl DeleteCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;
        let removed = svc.delete_identity(&self.name)?;
        output_result(
            &Deleted {
                identity: &self.name,
                removed,
            },
            cli,
        )
    }
}
