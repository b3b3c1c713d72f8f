//! CLI tool for xlgrid - loads a CSV/TSV file or a snapshot record, optionally
//! sorts it, and prints the view or writes a snapshot record.
//!
//! Usage:
//!   xlgrid_cli <input.csv>                          # Print rows to stdout
//!   xlgrid_cli <input.csv> --header --sort 1 --desc # Sort by column 1, descending
//!   xlgrid_cli <input.csv> -o table.json            # Write a snapshot record
//!   xlgrid_cli <table.json>                         # Print a stored record
//!   add -v for debug logging on stderr

#![allow(clippy::exit)]
#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::indexing_slicing)]

use std::env;
use std::fs;
use std::io::{self, Write};

use simplelog::{Config, LevelFilter, SimpleLogger};
use xlgrid::csv::{escape_field, parse_delimited, Delimiter};
use xlgrid::{GrowthPolicy, PersistedRecord, Table};

struct Args {
    input: String,
    header: bool,
    sort: Option<usize>,
    descending: bool,
    output: Option<String>,
    verbose: bool,
}

fn parse_args() -> Result<Args, String> {
    let mut args = env::args().skip(1);
    let mut parsed = Args {
        input: String::new(),
        header: false,
        sort: None,
        descending: false,
        output: None,
        verbose: false,
    };
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--header" => parsed.header = true,
            "--desc" => parsed.descending = true,
            "-v" | "--verbose" => parsed.verbose = true,
            "--sort" => {
                let col = args.next().ok_or("--sort needs a column index")?;
                parsed.sort = Some(col.parse().map_err(|_| format!("bad column '{col}'"))?);
            }
            "-o" => parsed.output = Some(args.next().ok_or("-o needs a path")?),
            other if parsed.input.is_empty() => parsed.input = other.to_string(),
            other => return Err(format!("unexpected argument '{other}'")),
        }
    }
    if parsed.input.is_empty() {
        return Err("missing input file".into());
    }
    Ok(parsed)
}

fn main() {
    let args = match parse_args() {
        Ok(a) => a,
        Err(e) => {
            eprintln!("{e}");
            eprintln!(
                "Usage: xlgrid_cli <input.csv|input.tsv|record.json> [--header] [--sort COL] [--desc] [-o out.json] [-v]"
            );
            std::process::exit(1);
        }
    };

    let level = if args.verbose {
        LevelFilter::Debug
    } else {
        LevelFilter::Warn
    };
    let _ = SimpleLogger::init(level, Config::default());

    // Read input file
    let data = match fs::read(&args.input) {
        Ok(d) => d,
        Err(e) => {
            eprintln!("Error reading {}: {}", args.input, e);
            std::process::exit(1);
        }
    };

    let delim = Delimiter::from_path(&args.input);
    let (headers, mut table) = if args.input.to_ascii_lowercase().ends_with(".json") {
        let record = match PersistedRecord::from_bytes(&data) {
            Ok(r) => r,
            Err(e) => {
                eprintln!("Error decoding record: {}", e);
                std::process::exit(1);
            }
        };
        match Table::from_snapshot(&record.snapshot, GrowthPolicy::Doubling) {
            Ok(t) => (Vec::new(), t),
            Err(e) => {
                eprintln!("Error restoring record: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        match parse_delimited(&data, delim, args.header) {
            Ok(import) => (import.headers, import.table),
            Err(e) => {
                eprintln!("Error parsing {}: {}", args.input, e);
                std::process::exit(1);
            }
        }
    };

    if let Some(col) = args.sort {
        match table.sort_by_column(col, !args.descending) {
            Ok(outcome) => eprintln!(
                "Sorted {} rows in {:?}",
                outcome.rows_affected, outcome.elapsed
            ),
            Err(e) => {
                eprintln!("Error sorting: {}", e);
                std::process::exit(1);
            }
        }
    }

    match args.output {
        Some(path) => {
            let id = path.trim_end_matches(".json").to_string();
            let bytes = PersistedRecord::new(&id, table.snapshot()).to_bytes().unwrap();
            if let Err(e) = fs::write(&path, &bytes) {
                eprintln!("Error writing {}: {}", path, e);
                std::process::exit(1);
            }
            eprintln!("Written: {} ({} bytes)", path, bytes.len());
        }
        None => {
            let sep = match delim {
                Delimiter::Comma => ",",
                Delimiter::Tab => "\t",
            };
            let mut out = io::stdout().lock();
            if !headers.is_empty() {
                let line: Vec<String> = headers.iter().map(|h| escape_field(h, delim)).collect();
                writeln!(out, "{}", line.join(sep)).unwrap();
            }
            for view_row in 0..table.occupied_rows() {
                let row = table.display_row(view_row).unwrap();
                let line: Vec<String> = row.iter().map(|v| escape_field(v, delim)).collect();
                writeln!(out, "{}", line.join(sep)).unwrap();
            }
        }
    }
}
