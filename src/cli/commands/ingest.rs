//! `docsnap ingest`: publish a new snapshot from text files or stdin.

use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

use crate::cli::context::{parse_tenant, AppContext};
use crate::cli::output::{output, CommandOutput};
use crate::cli::progress::create_spinner;
use crate::domain::models::SourceDocument;

const STDIN_ARG: &str = "-";

#[derive(Args, Debug)]
pub struct IngestArgs {
    /// Tenant that owns the corpus
    #[arg(short, long)]
    pub tenant: String,
    /// Document name for text read from stdin
    #[arg(short, long)]
    pub name: Option<String>,
    /// UTF-8 text files to index, or `-` for stdin
    #[arg(required = true)]
    pub files: Vec<PathBuf>,
}

#[derive(Debug, serde::Serialize)]
pub struct IngestOutput {
    pub tenant: String,
    pub snapshot_id: String,
    pub documents: usize,
    pub chunks: usize,
    pub dimension: usize,
}

impl CommandOutput for IngestOutput {
    fn to_human(&self) -> String {
        format!(
            "Published snapshot {} for tenant {}\n  documents: {}\n  chunks:    {}\n  dimension: {}",
            self.snapshot_id, self.tenant, self.documents, self.chunks, self.dimension
        )
    }
}

pub async fn execute(args: IngestArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let tenant = parse_tenant(&args.tenant)?;
    let documents = read_documents(&args.files, args.name.as_deref()).await?;
    let service = ctx.ingestion_service()?;

    let spinner = create_spinner(
        &format!("Indexing {} document(s)...", documents.len()),
        json_mode,
    );
    let result = service.ingest(&tenant, &documents).await;
    spinner.finish_and_clear();

    let report = result.context("Ingestion failed; no snapshot was published")?;

    let out = IngestOutput {
        tenant: tenant.to_string(),
        snapshot_id: report.snapshot_id.to_string(),
        documents: report.document_count,
        chunks: report.chunk_count,
        dimension: report.dimension,
    };
    output(&out, json_mode);
    Ok(())
}

async fn read_documents(files: &[PathBuf], stdin_name: Option<&str>) -> Result<Vec<SourceDocument>> {
    let mut documents = Vec::with_capacity(files.len());
    let mut read_stdin = false;

    for path in files {
        if path.as_os_str() == STDIN_ARG {
            if read_stdin {
                bail!("stdin ('-') can only be given once");
            }
            read_stdin = true;
            let text = read_stdin_text().await?;
            documents.push(SourceDocument::named(stdin_name.unwrap_or("stdin"), text));
        } else {
            documents.push(read_file(path).await?);
        }
    }

    Ok(documents)
}

async fn read_file(path: &Path) -> Result<SourceDocument> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let text = String::from_utf8(bytes)
        .with_context(|| format!("{} is not valid UTF-8 text", path.display()))?;
    Ok(SourceDocument::named(path.display().to_string(), text))
}

async fn read_stdin_text() -> Result<String> {
    let mut text = String::new();
    tokio::io::stdin()
        .read_to_string(&mut text)
        .await
        .context("Failed to read stdin as UTF-8 text")?;
    Ok(text)
}
