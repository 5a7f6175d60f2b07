// Writing the results as CSV.

use std::io::Write;
use std::path::PathBuf;

use ballot_box::ResultRow;
use chrono::NaiveDateTime;

use crate::evm::*;

#[derive(Eq, PartialEq, Debug, Clone)]
pub enum ExportTarget {
    Stdout,
    File(PathBuf),
}

pub fn default_export_name(now: &NaiveDateTime) -> String {
    format!("election_results_{}.csv", now.format("%Y%m%d_%H%M%S"))
}

/// Resolves the --out option: nothing means a time-stamped file in the
/// current directory, a directory means a time-stamped file inside it.
pub fn export_target(out: Option<&str>, now: &NaiveDateTime) -> ExportTarget {
    match out {
        Some("stdout") => ExportTarget::Stdout,
        Some(p) if Path::new(p).is_dir() => ExportTarget::File(Path::new(p).join(default_export_name(now))),
        Some(p) => ExportTarget::File(PathBuf::from(p)),
        None => ExportTarget::File(PathBuf::from(default_export_name(now))),
    }
}

pub fn write_results<W: Write>(w: W, rows: &[ResultRow]) -> csv::Result<()> {
    let mut wtr = csv::Writer::from_writer(w);
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn export_results(target: &ExportTarget, rows: &[ResultRow]) -> EvmResult<()> {
    match target {
        ExportTarget::Stdout => {
            write_results(std::io::stdout(), rows).context(WritingCsvSnafu { path: "stdout" })
        }
        ExportTarget::File(p) => {
            let path = p.display().to_string();
            let f = fs::File::create(p)
                .map_err(csv::Error::from)
                .context(WritingCsvSnafu { path: path.clone() })?;
            write_results(f, rows).context(WritingCsvSnafu { path: path.clone() })?;
            info!("Results written to {}", path);
            Ok(())
        }
    }
}
