mod bootstrap;

use anyhow::{Context, Result};
use clap::Parser;
use sensor_core::settings::{ReportFormat, Settings};
use sensor_data::analysis::run_pipeline;
use sensor_data::report::RunReport;

fn main() -> Result<()> {
    let settings = Settings::parse();

    bootstrap::setup_logging(settings.effective_log_level())?;

    tracing::info!("Sensor KPI v{} starting", env!("CARGO_PKG_VERSION"));

    let config = settings
        .resolve_config()
        .context("failed to resolve configuration")?;
    tracing::info!(
        "Preset: {:?}, input: {}, output: {}",
        settings.preset,
        config.input_path.display(),
        config.output_path.display()
    );

    let outcome = run_pipeline(&config)?;
    tracing::info!(
        "Finished: {} of {} rows kept",
        outcome.totals.kept,
        outcome.totals.total
    );

    let report = RunReport::new(&config, &outcome);
    match settings.report_format {
        ReportFormat::Text => print!("{}", report.render_text()),
        ReportFormat::Json => println!("{}", report.render_json()?),
    }

    Ok(())
}
