//! Marker store inspector.
//!
//! # Responsibility
//! - Open (and migrate) a marker store file and print one line per marker.
//! - Keep output deterministic for quick local sanity checks.

use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::process::ExitCode;
use tacmap_core::{default_log_level, init_logging, open_store, Marker};

#[derive(Parser, Debug)]
#[command(name = "tacmap_cli", about = "Inspect and migrate a tactical marker store")]
struct Cli {
    /// Marker store file; created when absent.
    store: PathBuf,

    /// Absolute directory for rotating log files.
    #[arg(long)]
    log_dir: Option<PathBuf>,

    /// Log level used with `--log-dir`.
    #[arg(long, default_value_t = default_log_level().to_string())]
    log_level: String,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Some(dir) = &cli.log_dir {
        if let Err(err) = init_logging(&cli.log_level, &dir.to_string_lossy()) {
            eprintln!("logging disabled: {err}");
        }
    }

    println!("tacmap_core ping={}", tacmap_core::ping());
    println!("tacmap_core version={}", tacmap_core::core_version());

    let store = match open_store(&cli.store) {
        Ok(store) => store,
        Err(err) => {
            eprintln!("failed to open `{}`: {err}", cli.store.display());
            return ExitCode::FAILURE;
        }
    };
    let markers = match store.list() {
        Ok(markers) => markers.collect::<Vec<_>>(),
        Err(err) => {
            eprintln!("failed to list markers: {err}");
            return ExitCode::FAILURE;
        }
    };

    println!("markers={}", markers.len());
    for marker in &markers {
        println!("{}", format_marker(marker));
    }
    info!(
        "event=cli_inspect module=cli status=ok markers={}",
        markers.len()
    );
    ExitCode::SUCCESS
}

fn format_marker(marker: &Marker) -> String {
    format!(
        "id={} unique_id={} x={:.3} y={:.3} size={:.1} scale_with_view={} name={:?} label={:?}",
        marker.id,
        marker.unique_id,
        marker.position.x,
        marker.position.y,
        marker.size,
        marker.scale_with_view,
        marker.name,
        marker.visible_label().unwrap_or("")
    )
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::{CommandFactory, Parser};
    use std::path::PathBuf;
    use tacmap_core::default_log_level;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_store_and_optional_log_dir() {
        let cli = Cli::try_parse_from(["tacmap_cli", "ops_markers.db", "--log-dir", "/tmp/logs"])
            .unwrap();
        assert_eq!(cli.store, PathBuf::from("ops_markers.db"));
        assert_eq!(cli.log_dir, Some(PathBuf::from("/tmp/logs")));
        assert_eq!(cli.log_level, default_log_level());

        let cli = Cli::try_parse_from(["tacmap_cli", "ops_markers.db", "--log-level", "warn"])
            .unwrap();
        assert_eq!(cli.log_dir, None);
        assert_eq!(cli.log_level, "warn");
    }

    #[test]
    fn rejects_missing_store_and_extra_arguments() {
        assert!(Cli::try_parse_from(["tacmap_cli"]).is_err());
        assert!(Cli::try_parse_from(["tacmap_cli", "a.db", "b.db"]).is_err());
        assert!(Cli::try_parse_from(["tacmap_cli", "a.db", "--log-dir"]).is_err());
    }
}
