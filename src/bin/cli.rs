//! seglog CLI Client
//!
//! Command-line interface for talking to a seglog server, plus offline
//! inspection of a log directory.

use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use seglog::network::Client;
use seglog::{Log, SegmentConfig};

/// seglog CLI
#[derive(Parser, Debug)]
#[command(name = "seglog-cli")]
#[command(about = "CLI for the seglog commit log")]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:7070")]
    server: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Append a record, printing its offset
    Append {
        /// The record contents
        value: String,
    },

    /// Read the record at an offset
    Read {
        offset: u64,
    },

    /// Print records starting at an offset
    Tail {
        offset: u64,

        /// Maximum number of records (0 = up to the end of the log)
        #[arg(short, long, default_value = "0")]
        limit: u32,
    },

    /// Print the lowest and highest offsets
    Bounds,

    /// Ping the server
    Ping,

    /// Inspect a log directory directly (the server must not be running on it)
    Inspect {
        dir: PathBuf,
    },

    /// Write the raw store bytes of a log directory to a file
    Export {
        dir: PathBuf,
        output: PathBuf,
    },
}

fn main() {
    let args = Args::parse();

    if let Err(e) = run(args) {
        eprintln!("error: {}", e);
        let code = if e.is_out_of_range() { 2 } else { 1 };
        std::process::exit(code);
    }
}

fn run(args: Args) -> seglog::Result<()> {
    match args.command {
        Commands::Append { value } => {
            let offset = Client::connect(&args.server)?.append(value.as_bytes())?;
            println!("{}", offset);
        }
        Commands::Read { offset } => {
            let value = Client::connect(&args.server)?.read(offset)?;
            io::stdout().write_all(&value)?;
            println!();
        }
        Commands::Tail { offset, limit } => {
            let records = Client::connect(&args.server)?.read_from(offset, limit)?;
            let mut stdout = io::stdout().lock();
            for record in records {
                write!(stdout, "{}\t", record.offset)?;
                stdout.write_all(&record.value)?;
                writeln!(stdout)?;
            }
        }
        Commands::Bounds => {
            let (lowest, highest) = Client::connect(&args.server)?.bounds()?;
            match highest {
                Some(highest) => println!("{}..={}", lowest, highest),
                None => println!("empty (next offset {})", lowest),
            }
        }
        Commands::Ping => {
            Client::connect(&args.server)?.ping()?;
            println!("PONG");
        }
        Commands::Inspect { dir } => {
            let log = open_existing(dir)?;
            for range in log.segment_ranges() {
                println!("segment {:>20}  records {}", range.start, range.end - range.start);
            }
            println!("lowest: {}  highest: {:?}", log.lowest_offset(), log.highest_offset());
            log.close()?;
        }
        Commands::Export { dir, output } => {
            let log = open_existing(dir)?;
            let mut reader = log.reader();
            let mut file = File::create(&output)?;
            let copied = io::copy(&mut reader, &mut file)?;
            file.sync_all()?;
            println!("exported {} bytes to {}", copied, output.display());
            drop(reader);
            log.close()?;
        }
    }

    Ok(())
}

/// Open a log directory without creating one or rolling it over
fn open_existing(dir: PathBuf) -> seglog::Result<Log> {
    let config = SegmentConfig {
        max_store_bytes: u64::MAX,
        ..SegmentConfig::default()
    };
    Log::open_existing(dir, config)
}
