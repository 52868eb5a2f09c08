/*!
Carnet CLI - inspect and manage backup archive directories.

Operates on a filesystem archive (blobs + catalog rows) as written by the
durable variant's Fs backend: listing, inspecting, verifying, exporting and
deleting a tenant's archived snapshots.
*/

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::PathBuf;
use tabled::{Table, Tabled};
use tracing::warn;

use carnet_core::{ArchiveIndex, FsBlobStore, FsCatalog, GzipCompressor, TenantId};

type FsArchive = ArchiveIndex<FsBlobStore, FsCatalog, GzipCompressor>;

#[derive(Parser)]
#[command(name = "carnet")]
#[command(about = "CLI for Carnet backup archives")]
#[command(version)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Archive directory (contains blobs/ and index/)
    #[arg(short, long, global = true, env = "CARNET_ARCHIVE_DIR", default_value = "./archive")]
    archive_dir: PathBuf,

    /// Tenant whose archive to operate on
    #[arg(short, long, global = true, env = "CARNET_TENANT")]
    tenant: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the tenant's archived snapshots, newest first
    List,
    /// Show one archive entry's metadata
    Show {
        /// Archive entry id
        entry_id: String,
    },
    /// Verify an entry: decompress, checksum and parse its document
    Verify {
        entry_id: String,
    },
    /// Write an entry's raw document to a file
    Export {
        entry_id: String,
        /// Output path for the JSON document
        #[arg(short, long)]
        output: PathBuf,
    },
    /// Delete one archived snapshot
    Delete {
        entry_id: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },
    /// Aggregate count, size and recency figures
    Stats,
}

#[derive(Tabled)]
struct EntryRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Created")]
    created: String,
    #[tabled(rename = "Size")]
    size: String,
    #[tabled(rename = "Version")]
    version: String,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let index = open_archive(&cli.archive_dir);
    let tenant = cli
        .tenant
        .as_deref()
        .map(TenantId::new)
        .context("a tenant is required: pass --tenant or set CARNET_TENANT")?;

    match cli.command {
        Commands::List => list(&index, &tenant),
        Commands::Show { entry_id } => show(&index, &entry_id, &tenant),
        Commands::Verify { entry_id } => verify(&index, &entry_id, &tenant),
        Commands::Export { entry_id, output } => export(&index, &entry_id, &tenant, &output),
        Commands::Delete { entry_id, force } => delete(&index, &entry_id, &tenant, force),
        Commands::Stats => stats(&index, &tenant),
    }
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

fn open_archive(root: &std::path::Path) -> FsArchive {
    ArchiveIndex::with_gzip(
        FsBlobStore::new(root.join("blobs")),
        FsCatalog::new(root.join("index")),
    )
}

fn list(index: &FsArchive, tenant: &TenantId) -> anyhow::Result<()> {
    let entries = index.list(tenant).context("failed to list archive")?;
    if entries.is_empty() {
        println!("No snapshots archived for tenant {tenant}");
        return Ok(());
    }

    let rows: Vec<EntryRow> = entries
        .iter()
        .map(|e| EntryRow {
            id: e.id.clone(),
            created: e.created_at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
            size: format_size(e.size_bytes),
            version: e.format_version.clone(),
        })
        .collect();
    println!("{}", Table::new(rows));
    Ok(())
}

fn show(index: &FsArchive, entry_id: &str, tenant: &TenantId) -> anyhow::Result<()> {
    let entry = index
        .entry(entry_id, tenant)
        .context("failed to load archive entry")?;
    println!("{}", serde_json::to_string_pretty(&entry)?);
    Ok(())
}

fn verify(index: &FsArchive, entry_id: &str, tenant: &TenantId) -> anyhow::Result<()> {
    match index.fetch(entry_id, tenant) {
        Ok(snapshot) => {
            println!(
                "OK: {} entities across {} students, {} booklets, {} photos, {} pending",
                snapshot.collections.students.len()
                    + snapshot.collections.booklets.len()
                    + snapshot.collections.photos.len()
                    + snapshot.collections.pending_photos.len(),
                snapshot.collections.students.len(),
                snapshot.collections.booklets.len(),
                snapshot.collections.photos.len(),
                snapshot.collections.pending_photos.len(),
            );
            Ok(())
        }
        Err(e) => {
            warn!(entry_id = %entry_id, error = %e, "verification failed");
            bail!("verification failed: {e}");
        }
    }
}

fn export(
    index: &FsArchive,
    entry_id: &str,
    tenant: &TenantId,
    output: &std::path::Path,
) -> anyhow::Result<()> {
    let document = index
        .fetch_raw(entry_id, tenant)
        .context("failed to fetch document")?;
    std::fs::write(output, &document)
        .with_context(|| format!("failed to write {}", output.display()))?;
    println!("Wrote {} bytes to {}", document.len(), output.display());
    Ok(())
}

fn delete(index: &FsArchive, entry_id: &str, tenant: &TenantId, force: bool) -> anyhow::Result<()> {
    if !force {
        print!("Delete snapshot {entry_id}? This cannot be undone. [y/N] ");
        std::io::stdout().flush()?;
        let mut answer = String::new();
        std::io::stdin().read_line(&mut answer)?;
        if !matches!(answer.trim(), "y" | "Y" | "yes") {
            println!("Aborted.");
            return Ok(());
        }
    }

    if index.remove(entry_id, tenant)? {
        println!("Deleted snapshot {entry_id}");
    } else {
        println!("Snapshot {entry_id} not found for tenant {tenant}");
    }
    Ok(())
}

fn stats(index: &FsArchive, tenant: &TenantId) -> anyhow::Result<()> {
    let stats = index.stats(tenant)?;
    println!("Snapshots: {}", stats.count);
    println!("Total size: {}", format_size(stats.total_bytes));
    match stats.newest {
        Some(ts) => println!("Most recent: {}", ts.format("%Y-%m-%d %H:%M:%S UTC")),
        None => println!("Most recent: -"),
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    const KIB: u64 = 1024;
    const MIB: u64 = 1024 * KIB;
    if bytes >= MIB {
        format!("{:.1} MiB", bytes as f64 / MIB as f64)
    } else if bytes >= KIB {
        format!("{:.1} KiB", bytes as f64 / KIB as f64)
    } else {
        format!("{bytes} B")
    }
}
