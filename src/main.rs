use clap::{Parser, Subcommand};
use bar::archive::{self, ExtractOptions, PackOptions};
use bar::Entry;
use std::path::PathBuf;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "bar", about = "The BAR archive format CLI")]
struct Cli {
    /// Log debug details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack files and directories into a BAR archive
    Pack {
        #[arg(short, long)]
        output: PathBuf,
        /// DEFLATE level, 0-9
        #[arg(short, long, default_value = "9")]
        level: u32,
        /// Replace the output file if it exists
        #[arg(long)]
        overwrite: bool,
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
    },
    /// List archive contents
    List {
        input: PathBuf,
        /// Print entries as JSON
        #[arg(long)]
        json: bool,
    },
    /// Extract a BAR archive
    Extract {
        input: PathBuf,
        /// Extract only this entry
        #[arg(short, long)]
        name: Option<String>,
        #[arg(short = 'C', long, default_value = ".")]
        output_dir: PathBuf,
        /// Replace files that already exist
        #[arg(long)]
        overwrite: bool,
    },
    /// Print the format version
    Version,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {

        // ── Pack ─────────────────────────────────────────────────────────────
        Commands::Pack { output, level, overwrite, input } => {
            let opts = PackOptions { level, overwrite };
            let entries = archive::pack(&output, &input, &opts)?;
            for e in &entries {
                println!("  packed  {}", e.name());
            }
            info!("Created: {}", output.display());
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input, json } => {
            let entries = archive::list(&input)?;
            if json {
                println!("{}", serde_json::to_string_pretty(&entries)?);
            } else {
                print_table(&entries);
            }
        }

        // ── Extract ──────────────────────────────────────────────────────────
        Commands::Extract { input, name, output_dir, overwrite } => {
            let opts = ExtractOptions { dest: output_dir, name, overwrite };
            let report = archive::extract(&input, &opts)?;
            if !report.corrupt.is_empty() {
                warn!("{} file(s) failed verification", report.corrupt.len());
            }
            if !report.truncated.is_empty() {
                warn!("{} file(s) ended early", report.truncated.len());
            }
            info!("Extracted {} file(s) to {}", report.extracted.len(), opts.dest.display());
        }

        // ── Version ──────────────────────────────────────────────────────────
        Commands::Version => {
            println!("version: {}", bar::VERSION);
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn print_table(entries: &[Entry]) {
    let width = entries.iter().map(|e| e.name().len()).max().unwrap_or(0);
    for e in entries {
        println!("{}", table_row(e.name(), e.permissions(), e.ratio(), width));
    }
}

fn table_row(name: &str, permissions: u16, ratio: f64, width: usize) -> String {
    let mode = format!("0{permissions:o}");
    format!("{name:<width$}  {mode:<7}  {:.2}%", ratio * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mode_column_is_padded_as_a_whole() {
        assert_eq!(table_row("a", 0o7, 0.5, 3), "a    07       50.00%");
        assert_eq!(table_row("abc", 0o644, 0.0, 3), "abc  0644     0.00%");
        assert_eq!(table_row("x", 0o100755, 1.0, 1), "x  0100755  100.00%");
    }
}
