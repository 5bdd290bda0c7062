use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::Level;
use xablob::arch::{discover_stores, Arch, MANIFEST_FILE};
use xablob::codec::Encoding;
use xablob::extract::{unpack_bundle, ExtractOptions};
use xablob::manifest::{Manifest, ManifestIndex};
use xablob::Store;

#[derive(Parser)]
#[command(name = "xablob", about = "Extract managed assemblies from XABA assembly stores")]
struct Cli {
    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Extract every named assembly from the stores in a bundle directory
    Unpack {
        /// Directory holding assemblies.manifest and the *.blob stores
        input: PathBuf,
        #[arg(short = 'C', long, default_value = "out")]
        output_dir: PathBuf,
        /// Restrict per-ABI stores (repeatable); the generic store is always read
        #[arg(short, long, value_enum)]
        arch: Vec<Arch>,
        /// Output file extension
        #[arg(long, default_value = "dll")]
        extension: String,
        /// Also write debug data as <name>.pdb
        #[arg(long)]
        debug: bool,
        /// Also write config data as <name>.<ext>.config
        #[arg(long)]
        config: bool,
    },
    /// List directory slots and their manifest names without writing anything
    List {
        input: PathBuf,
        #[arg(short, long, value_enum)]
        arch: Vec<Arch>,
    },
    /// Show store header and table sizes
    Info {
        store: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let level = match cli.verbose {
        0 => Level::INFO,
        1 => Level::DEBUG,
        _ => Level::TRACE,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {

        // ── Unpack ───────────────────────────────────────────────────────────
        Commands::Unpack { input, output_dir, arch, extension, debug, config } => {
            let opts = ExtractOptions {
                output_dir: output_dir.clone(),
                extension,
                include_debug:  debug,
                include_config: config,
            };
            let report = unpack_bundle(&input, &arch, opts)?;
            let failed = report.failures().count();
            println!(
                "Extracted {} assemblies from {} store(s) to {}",
                report.assemblies.len() - failed,
                report.stores.len(),
                output_dir.display()
            );
            for s in report.failed_stores() {
                println!("  skipped {:<40} {}", s.file, s.error.as_deref().unwrap_or(""));
            }
            for f in report.failures() {
                println!("  failed  {:<40} {}", f.name, f.error.as_deref().unwrap_or(""));
            }
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, arch } => {
            let manifest = Manifest::open(input.join(MANIFEST_FILE))?;
            for (a, path) in discover_stores(&input, &arch) {
                let store = Store::open(&path)?;
                println!("Store: {} ({}, id {})", path.display(), a.name(), store.store_id());
                println!("{:>5}  {:<40} {:>10} {:>10} {:>5}  Hash 32",
                         "Idx", "Name", "Offset", "Size", "Enc");
                for (i, rec) in store.directory.iter().enumerate() {
                    let key = store.key(i as u32);
                    let name = manifest.lookup(key).map(|e| e.name.as_str()).unwrap_or("-");
                    let enc = store.locate(rec.data)
                        .map(|d| Encoding::detect(d).name())
                        .unwrap_or("-");
                    let hash = store.hash_entries(key).0
                        .map(|h| h.hash_hex())
                        .unwrap_or_else(|| "-".into());
                    println!("{:>5}  {:<40} {:>10} {:>10} {:>5}  {}",
                        i, name, rec.data.offset, rec.data.size, enc, hash);
                }
            }
        }

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { store } => {
            let st = Store::open(&store)?;
            let h  = &st.header;
            println!("── Assembly store ───────────────────────────────────────");
            println!("  Path           {}", store.display());
            println!("  Size           {} B", st.len());
            println!("  Magic          {}", h.magic_str());
            println!("  Format version {}", h.version);
            println!("  Local entries  {}", h.local_count);
            println!("  Global entries {}", h.global_count);
            println!("  Store id       {}", h.store_id);
            println!("  Directory      {} records", st.directory.len());
            println!("  Hash32 table   {} records", st.hash32.len());
            println!("  Hash64 table   {} records", st.hash64.len());
        }
    }

    Ok(())
}
