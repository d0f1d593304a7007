//! Report Command
//!
//! Runs the full collect → analyze → report pipeline for one board.
//!
//! Usage:
//!   board-insights report --board-id <ID> [--output report.md] [--json]

use std::fs;
use std::path::PathBuf;

use tokio::runtime::Runtime;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::cli::ui::Output;
use crate::cli::{ConfigOverrides, CredentialArgs, load_config};
use crate::pipeline::{Report, ReportGenerator};
use crate::types::Result;

/// Report run options (consolidated parameters)
#[derive(Default)]
pub struct ReportRunOptions {
    pub config_path: Option<PathBuf>,
    pub credentials: CredentialArgs,
    /// Write the report here instead of stdout
    pub output: Option<PathBuf>,
    /// Print the full run record (provenance included) as JSON
    pub json: bool,
    pub overrides: ConfigOverrides,
    pub quiet: bool,
}

pub fn run(options: ReportRunOptions) -> Result<()> {
    let ReportRunOptions {
        config_path,
        credentials,
        output,
        json,
        overrides,
        quiet,
    } = options;
    let out = Output::quiet(quiet);

    // Validate credentials before anything touches the network
    let credentials = credentials.resolve()?;
    let config = load_config(config_path.as_deref(), overrides)?;
    let generator = ReportGenerator::from_config(&config)?;

    out.info(&format!(
        "Generating report for board {} ({} / {})",
        credentials.board_id(),
        config.llm.provider,
        config.llm.model
    ));

    let rt = Runtime::new()?;
    let report = rt.block_on(async {
        let cancel = CancellationToken::new();
        let watcher = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

        if let Err(e) = generator.preflight().await {
            out.warning(&format!("{}; the report run will likely fail", e));
        }

        let result = generator.pipeline().start(credentials).execute(&cancel).await;
        watcher.abort();
        result
    })?;

    write_report(&report, output, json, &out)
}

async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            warn!("Interrupt received, cancelling report run");
            cancel.cancel();
        }
        Err(e) => warn!("Cannot listen for Ctrl-C: {}", e),
    }
}

fn write_report(report: &Report, output: Option<PathBuf>, json: bool, out: &Output) -> Result<()> {
    let rendered = if json {
        serde_json::to_string_pretty(report)?
    } else {
        report.text.clone()
    };

    match output {
        Some(path) => {
            if let Some(parent) = path.parent()
                && !parent.as_os_str().is_empty()
            {
                fs::create_dir_all(parent)?;
            }
            fs::write(&path, rendered)?;
            info!(path = %path.display(), "Report written");
            out.success(&format!(
                "Report written to {} ({} ms, run {})",
                path.display(),
                report.duration_ms,
                report.run_id
            ));
        }
        None => {
            println!("{}", rendered);
            out.success(&format!("Report complete ({} ms)", report.duration_ms));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::CapabilitySet;
    use crate::types::{ErrorKind, StageBinding, StageKind};
    use tempfile::TempDir;
    use uuid::Uuid;

    fn report() -> Report {
        Report {
            run_id: Uuid::new_v4(),
            board_id: "board-1".to_string(),
            text: "# Sprint Report".to_string(),
            stages: vec![StageBinding {
                stage: StageKind::DataCollection,
                agent: "data_collection_agent".to_string(),
                capabilities: CapabilitySet::fetch_all(),
            }],
            duration_ms: 12,
        }
    }

    #[test]
    fn test_write_report_to_file() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("out/report.md");

        write_report(&report(), Some(path.clone()), false, &Output::quiet(true)).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "# Sprint Report");
    }

    #[test]
    fn test_write_report_as_json() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("report.json");

        write_report(&report(), Some(path.clone()), true, &Output::quiet(true)).unwrap();
        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["board_id"], "board-1");
        assert_eq!(value["stages"][0]["capabilities"][0], "board_fetch");
    }

    #[test]
    fn test_missing_credentials_fail_first() {
        let err = run(ReportRunOptions {
            credentials: CredentialArgs {
                api_key: Some("key".to_string()),
                ..CredentialArgs::default()
            },
            quiet: true,
            ..ReportRunOptions::default()
        })
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Configuration);
    }
}
