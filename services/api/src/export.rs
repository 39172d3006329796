use crate::infra::ConfiguredStore;
use clap::Args;
use lead_funnel::config::AppConfig;
use lead_funnel::error::AppError;
use lead_funnel::workflows::admin::{export_csv, filter_rows};
use lead_funnel::workflows::registration::RecordStore;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct ExportArgs {
    /// Collection to export, e.g. leads or masterclass_registrations
    pub(crate) table: String,
    /// Keep only rows whose email or name contains this text
    #[arg(long)]
    pub(crate) search: Option<String>,
    /// Write the CSV to this file instead of stdout
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) async fn run_export(args: ExportArgs) -> Result<(), AppError> {
    let ExportArgs {
        table,
        search,
        output,
    } = args;

    let config = AppConfig::load()?;
    let store = ConfiguredStore::from_config(&config)?;
    let rows = store.select(&table).await?;
    let rows = filter_rows(rows, search.as_deref().unwrap_or_default());
    let csv = export_csv(&rows)?;

    match output {
        Some(path) => {
            std::fs::write(&path, csv)?;
            println!(
                "Exported {} row(s) from {} to {} ({} store)",
                rows.len(),
                table,
                path.display(),
                store.describe()
            );
        }
        None => print!("{csv}"),
    }
    Ok(())
}
