//! `docsnap search`: rank a snapshot's chunks against a query without
//! calling the generator.

use anyhow::{Context, Result};
use clap::Args;

use crate::cli::context::{parse_tenant, AppContext};
use crate::cli::output::{one_line, output, truncate, CommandOutput};
use crate::cli::table::{list_table, render_list};
use crate::domain::models::{ScoredChunk, SnapshotId};

#[derive(Args, Debug)]
pub struct SearchArgs {
    /// Tenant whose corpus is searched
    #[arg(short, long)]
    pub tenant: String,
    /// Search this snapshot instead of the latest
    #[arg(short, long)]
    pub snapshot: Option<String>,
    /// Number of chunks to return (defaults to retrieval.top_k)
    #[arg(short = 'k', long)]
    pub top_k: Option<usize>,
    /// Free-text query
    pub query: String,
}

/// One ranked chunk, shared by `search` and `ask`
#[derive(Debug, serde::Serialize)]
pub struct HitOutput {
    pub ordinal: usize,
    pub score: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub text: String,
}

impl From<&ScoredChunk> for HitOutput {
    fn from(hit: &ScoredChunk) -> Self {
        Self {
            ordinal: hit.ordinal(),
            score: hit.score,
            source: hit.item.chunk.source.clone(),
            text: hit.text().to_string(),
        }
    }
}

/// Human rendering of ranked hits
pub fn hits_table(hits: &[HitOutput]) -> String {
    let mut table = list_table(&["#", "score", "source", "text"]);
    for hit in hits {
        table.add_row(vec![
            hit.ordinal.to_string(),
            format!("{:.4}", hit.score),
            hit.source.as_deref().unwrap_or("-").to_string(),
            truncate(&one_line(&hit.text), 80),
        ]);
    }
    render_list("chunk", &table, hits.len())
}

#[derive(Debug, serde::Serialize)]
pub struct SearchOutput {
    pub snapshot_id: String,
    pub results: Vec<HitOutput>,
}

impl CommandOutput for SearchOutput {
    fn to_human(&self) -> String {
        format!("Snapshot {}\n{}", self.snapshot_id, hits_table(&self.results))
    }
}

/// Parse an optional `--snapshot` argument
pub fn parse_snapshot(value: Option<&str>) -> Result<Option<SnapshotId>> {
    value
        .map(|raw| SnapshotId::parse(raw).with_context(|| format!("Invalid snapshot id '{raw}'")))
        .transpose()
}

pub async fn execute(args: SearchArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let tenant = parse_tenant(&args.tenant)?;
    let snapshot = parse_snapshot(args.snapshot.as_deref())?;
    let service = ctx.retrieval_service()?;
    let top_k = args.top_k.unwrap_or(service.options().top_k);

    let retrieved = service
        .retrieve_top_k(&tenant, snapshot.as_ref(), &args.query, top_k)
        .await?;

    let out = SearchOutput {
        snapshot_id: retrieved.snapshot_id.to_string(),
        results: retrieved.results.iter().map(HitOutput::from).collect(),
    };
    output(&out, json_mode);
    Ok(())
}
