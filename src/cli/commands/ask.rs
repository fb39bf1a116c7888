//! `docsnap ask`: answer a question from a tenant's snapshot.

use anyhow::Result;
use clap::Args;

use super::search::{hits_table, parse_snapshot, HitOutput};
use crate::cli::context::{parse_tenant, AppContext};
use crate::cli::output::{output, CommandOutput};
use crate::cli::progress::create_spinner;

#[derive(Args, Debug)]
pub struct AskArgs {
    /// Tenant whose corpus answers the question
    #[arg(short, long)]
    pub tenant: String,
    /// Answer from this snapshot instead of the latest
    #[arg(short, long)]
    pub snapshot: Option<String>,
    /// The question
    pub question: String,
}

#[derive(Debug, serde::Serialize)]
pub struct AskOutput {
    pub answer: String,
    pub snapshot_id: String,
    pub sources: Vec<HitOutput>,
}

impl CommandOutput for AskOutput {
    fn to_human(&self) -> String {
        format!(
            "{}\n\nSnapshot {}\n{}",
            self.answer.trim_end(),
            self.snapshot_id,
            hits_table(&self.sources)
        )
    }
}

pub async fn execute(args: AskArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let tenant = parse_tenant(&args.tenant)?;
    let snapshot = parse_snapshot(args.snapshot.as_deref())?;
    let service = ctx.retrieval_service()?;

    let spinner = create_spinner("Thinking...", json_mode);
    let result = match snapshot {
        Some(ref snapshot_id) => service.ask_at(&tenant, snapshot_id, &args.question).await,
        None => service.ask(&tenant, &args.question).await,
    };
    spinner.finish_and_clear();
    let answer = result?;

    let out = AskOutput {
        answer: answer.answer,
        snapshot_id: answer.snapshot_id.to_string(),
        sources: answer.sources.iter().map(HitOutput::from).collect(),
    };
    output(&out, json_mode);
    Ok(())
}
