//! `docsnap snapshots`: inspect a tenant's published snapshots.

use anyhow::{Context, Result};
use clap::{Args, Subcommand};

use crate::cli::context::{parse_tenant, AppContext};
use crate::cli::output::{one_line, output, truncate, CommandOutput};
use crate::cli::table::{list_table, render_list};
use crate::domain::models::{Snapshot, SnapshotId};

#[derive(Args, Debug)]
pub struct SnapshotsArgs {
    #[command(subcommand)]
    pub command: SnapshotsCommands,
}

#[derive(Subcommand, Debug)]
pub enum SnapshotsCommands {
    /// List published snapshots, oldest first
    List {
        #[arg(short, long)]
        tenant: String,
    },
    /// Print the latest published snapshot id
    Latest {
        #[arg(short, long)]
        tenant: String,
    },
    /// Show a snapshot's chunks
    Show {
        #[arg(short, long)]
        tenant: String,
        /// Snapshot ID
        id: String,
    },
}

#[derive(Debug, serde::Serialize)]
pub struct SnapshotEntry {
    pub snapshot_id: String,
    pub created_at: String,
}

impl From<&SnapshotId> for SnapshotEntry {
    fn from(id: &SnapshotId) -> Self {
        Self {
            snapshot_id: id.to_string(),
            created_at: id.timestamp().to_rfc3339(),
        }
    }
}

#[derive(Debug, serde::Serialize)]
pub struct SnapshotListOutput {
    pub tenant: String,
    pub snapshots: Vec<SnapshotEntry>,
    pub total: usize,
}

impl CommandOutput for SnapshotListOutput {
    fn to_human(&self) -> String {
        let mut table = list_table(&["snapshot id", "created"]);
        for entry in &self.snapshots {
            table.add_row(vec![entry.snapshot_id.clone(), entry.created_at.clone()]);
        }
        render_list("snapshot", &table, self.total)
    }
}

#[derive(Debug, serde::Serialize)]
pub struct LatestOutput {
    pub tenant: String,
    pub snapshot_id: String,
}

impl CommandOutput for LatestOutput {
    fn to_human(&self) -> String {
        self.snapshot_id.clone()
    }
}

#[derive(Debug, serde::Serialize)]
pub struct ChunkEntry {
    pub ordinal: usize,
    pub start_offset: usize,
    pub overlap: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    pub text: String,
}

#[derive(Debug, serde::Serialize)]
pub struct SnapshotDetailOutput {
    pub snapshot_id: String,
    pub tenant: String,
    pub created_at: String,
    pub dimension: usize,
    pub chunk_count: usize,
    pub chunks: Vec<ChunkEntry>,
}

impl From<&Snapshot> for SnapshotDetailOutput {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            snapshot_id: snapshot.snapshot_id.to_string(),
            tenant: snapshot.tenant_id.to_string(),
            created_at: snapshot.created_at.to_rfc3339(),
            dimension: snapshot.dimension,
            chunk_count: snapshot.len(),
            chunks: snapshot
                .chunks
                .iter()
                .map(|item| ChunkEntry {
                    ordinal: item.chunk.ordinal,
                    start_offset: item.chunk.start_offset,
                    overlap: item.chunk.overlap,
                    source: item.chunk.source.clone(),
                    text: item.chunk.text.clone(),
                })
                .collect(),
        }
    }
}

impl CommandOutput for SnapshotDetailOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![
            format!("Snapshot:  {}", self.snapshot_id),
            format!("Tenant:    {}", self.tenant),
            format!("Created:   {}", self.created_at),
            format!("Dimension: {}", self.dimension),
        ];

        let mut table = list_table(&["#", "offset", "overlap", "source", "text"]);
        for chunk in &self.chunks {
            table.add_row(vec![
                chunk.ordinal.to_string(),
                chunk.start_offset.to_string(),
                chunk.overlap.to_string(),
                chunk.source.as_deref().unwrap_or("-").to_string(),
                truncate(&one_line(&chunk.text), 60),
            ]);
        }
        lines.push(render_list("chunk", &table, self.chunk_count));
        lines.join("\n")
    }
}

pub async fn execute(args: SnapshotsArgs, ctx: &AppContext, json_mode: bool) -> Result<()> {
    let store = ctx.store();

    match args.command {
        SnapshotsCommands::List { tenant } => {
            let tenant = parse_tenant(&tenant)?;
            let ids = store.list_snapshots(&tenant).await?;
            let out = SnapshotListOutput {
                tenant: tenant.to_string(),
                total: ids.len(),
                snapshots: ids.iter().map(SnapshotEntry::from).collect(),
            };
            output(&out, json_mode);
        }
        SnapshotsCommands::Latest { tenant } => {
            let tenant = parse_tenant(&tenant)?;
            let snapshot_id = store.latest(&tenant).await?;
            let out = LatestOutput {
                tenant: tenant.to_string(),
                snapshot_id: snapshot_id.to_string(),
            };
            output(&out, json_mode);
        }
        SnapshotsCommands::Show { tenant, id } => {
            let tenant = parse_tenant(&tenant)?;
            let snapshot_id =
                SnapshotId::parse(&id).with_context(|| format!("Invalid snapshot id '{id}'"))?;
            let snapshot = store.load(&tenant, &snapshot_id).await?;
            output(&SnapshotDetailOutput::from(&snapshot), json_mode);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{Chunk, EmbeddedChunk, TenantId};

    #[test]
    fn test_detail_output_lists_chunks() {
        let snapshot = Snapshot::new(
            SnapshotId::parse("20260102T030405Z-000000-0a1b2c3d").unwrap(),
            TenantId::new("tenant-a").unwrap(),
            vec![EmbeddedChunk::new(
                Chunk::new(0, "Cats purr.".to_string(), 0, 0).with_source(Some("cats.txt".into())),
                vec![1.0, 0.0],
            )],
        );

        let out = SnapshotDetailOutput::from(&snapshot);
        assert_eq!(out.dimension, 2);
        assert_eq!(out.chunk_count, 1);

        let human = out.to_human();
        assert!(human.contains("cats.txt"));
        assert!(human.contains("1 chunk:"));

        let json = out.to_json();
        assert_eq!(json["chunks"][0]["text"], "Cats purr.");
    }

    #[test]
    fn test_empty_list_output() {
        let out = SnapshotListOutput {
            tenant: "tenant-x".to_string(),
            snapshots: Vec::new(),
            total: 0,
        };
        assert_eq!(out.to_human(), "No snapshots found.");
    }
}
