//! Identity listing command.

use clap::Args;
use serde::Serialize;

use super::{open_service, output_result};
use crate::Cli;

#[derive(Serialize)]
struct IdentitySummary<'a> {
    identity: &'a str,
    records: usize,
}

/// List enrolled identities.
#[derive(Args)]
pub struct ListCommand {}

impl ListCommand {
    pub fn run(&self, cli: &Cli) -> anyhow::Result<()> {
        let svc = open_service(cli)?;
        let snapshot = svc.store().all_records();
        let rows: Vec<IdentitySummary<'_>> = snapshot
            .entries()
            .iter()
            .map(|e| IdentitySummary {
                identity: e.identity(),
                records: e.len(),
            })
            .collect();
        output_result(&rows, cli)
    }
}
