use clap::{Parser, Subcommand};
use segyscan::field::parse_trace_fields;
use segyscan::header::read_file_header;
use segyscan::{Concurrency, Endianness, FileField, ScanConfig, ShotCatalog, TraceField};
use std::fs::File;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "segyscan", about = "SEG-Y reader and shot scanner")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the file header of a SEG-Y file
    Info {
        input: PathBuf,
        #[arg(long)]
        little_endian: bool,
    },
    /// Scan a file or directory into a shot catalog
    Scan {
        path: PathBuf,
        /// Shell-style file name pattern (directories only)
        #[arg(short, long)]
        pattern: Option<String>,
        /// Extra trace header field to summarise per shot (repeatable)
        #[arg(short, long = "key")]
        keys: Vec<String>,
        /// Trace headers read per chunk
        #[arg(long, default_value = "1024")]
        chunk: usize,
        /// Worker threads per level (default: available parallelism)
        #[arg(short, long)]
        threads: Option<usize>,
        /// Field used as the shot key's depth coordinate
        #[arg(long, default_value = "SourceDepth")]
        depth_key: TraceField,
        #[arg(long)]
        little_endian: bool,
        /// Write the catalog as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read one shot of a saved catalog
    Shot {
        catalog: PathBuf,
        index:   usize,
        /// Trace header fields to decode (default: all)
        #[arg(short, long = "key")]
        keys: Vec<String>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    match Cli::parse().command {

        // ── Info ─────────────────────────────────────────────────────────────
        Commands::Info { input, little_endian } => {
            let mut f = File::open(&input)?;
            let fh = read_file_header(&mut f, FileField::ALL, endianness(little_endian))?;
            let size = f.metadata()?.len();
            println!("── SEG-Y file ───────────────────────────────────────────");
            println!("  Path           {}", input.display());
            println!("  Size           {} B", size);
            println!("  Traces         {}", fh.trace_count(size)?);
            for &field in FileField::ALL {
                println!("  {:<22} {}", field.name(), fh.binary.get(field));
            }
        }

        // ── Scan ─────────────────────────────────────────────────────────────
        Commands::Scan { path, pattern, keys, chunk, threads, depth_key, little_endian, output } => {
            let concurrency = threads.map(Concurrency::threads).unwrap_or_default();
            let config = ScanConfig::default()
                .with_keys(parse_trace_fields(&keys)?)
                .with_chunk_size(chunk)
                .with_depth_key(depth_key)
                .with_endianness(endianness(little_endian))
                .with_concurrency(concurrency);
            let catalog = if pattern.is_none() && path.is_file() {
                segyscan::scan(&[path], &config)?
            } else {
                segyscan::scan_dir(&path, pattern.as_deref(), &config)?
            };

            println!("{catalog}");
            println!("{:>6} {:>24} {:>8} {:>6}  File", "Index", "Source", "Traces", "Segs");
            for (i, r) in catalog.records.iter().enumerate() {
                println!("{:>6} {:>24} {:>8} {:>6}  {}",
                    i, r.shot.to_string(), r.trace_count(), r.segments.len(), r.path.display());
            }
            if let Some(out) = output {
                std::fs::write(&out, catalog.to_bytes()?)?;
                println!("Catalog written: {}", out.display());
            }
        }

        // ── Shot ─────────────────────────────────────────────────────────────
        Commands::Shot { catalog, index, keys } => {
            let catalog = ShotCatalog::from_bytes(&std::fs::read(&catalog)?)?;
            let keys = if keys.is_empty() { TraceField::ALL.to_vec() } else { parse_trace_fields(&keys)? };
            let record = catalog.record(index)?;
            let block = record.read(&keys)?;
            println!("{record}");
            println!("  read {} traces x {} samples", block.ntraces(), block.data.ns());
            if block.ntraces() > 0 {
                let first = block.data.trace(0);
                let peak = first.iter().fold(0.0f64, |m, v| m.max(v.abs()));
                println!("  first trace peak amplitude {peak}");
            }
        }
    }

    Ok(())
}

fn endianness(little: bool) -> Endianness {
    if little { Endianness::Little } else { Endianness::Big }
}
