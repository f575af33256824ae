use super::{colorize_count, json_pretty, spin_fail, spin_ok, spinner, EXIT_SUCCESS};
use cardcut_core::{ExtractReport, Pipeline, RunLock, RunReport};
use cardcut_remote::{HttpFetcher, RemoteConfig};
use cardcut_store::{CardStore, DataLayout};
use std::path::Path;

pub fn run(
    data_dir: &Path,
    manifest: &Path,
    remote: RemoteConfig,
    json: bool,
) -> Result<u8, String> {
    let layout = DataLayout::new(data_dir);
    let _lock = RunLock::try_acquire(&layout.lock_file())
        .map_err(|e| format!("store lock: {e}"))?
        .ok_or_else(|| {
            format!(
                "store lock: {} is in use by another cardcut run",
                data_dir.display()
            )
        })?;

    let pb = if json {
        None
    } else {
        Some(spinner("extracting cards..."))
    };

    let manifest_base = remote.manifest_base.clone();
    let pipeline = Pipeline::new(layout.clone(), remote, HttpFetcher::new());
    let report = match pipeline.run(manifest) {
        Ok(r) => {
            if let Some(ref pb) = pb {
                spin_ok(pb, "extraction finished");
            }
            r
        }
        Err(e) => {
            if let Some(ref pb) = pb {
                spin_fail(pb, "extraction failed");
            }
            return Err(e.to_string());
        }
    };

    let on_disk = CardStore::new(layout)
        .list()
        .map_err(|e| format!("store error: {e}"))?
        .len();

    if json {
        let payload = serde_json::json!({
            "data_dir": data_dir.display().to_string(),
            "manifest_base": manifest_base,
            "cards_on_disk": on_disk,
            "report": report,
        });
        println!("{}", json_pretty(&payload)?);
    } else {
        print_summary(&report, on_disk);
    }
    Ok(EXIT_SUCCESS)
}

fn summary_line(report: &ExtractReport) -> String {
    format!(
        "{}, {}, {}, {}",
        colorize_count("written", report.written),
        colorize_count("existing", report.existing),
        colorize_count("skipped", report.skipped),
        colorize_count("failed", report.failed),
    )
}

fn print_summary(report: &RunReport, on_disk: usize) {
    println!("player cards: {}", summary_line(&report.player_cards));
    for reference in &report.references {
        println!(
            "{} {}: {}",
            reference.kind,
            reference.path,
            summary_line(&reference.report)
        );
    }
    println!("total: {}", summary_line(&report.totals));
    println!("{on_disk} card images on disk");
}
