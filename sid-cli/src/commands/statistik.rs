//! Population statistics command.

use console::style;

use sid_core::config::ConfigHandle;
use sid_core::error::SidResult;
use sid_services::routes::Route;
use sid_services::{PopulationStats, StatsService};
use crate::OutputFormat;

pub async fn run(config: ConfigHandle, lokal: bool, format: OutputFormat) -> SidResult<()> {
    let registry = super::connect(&config).await?;
    super::require(&registry, Route::Dashboard).await?;
    let service = StatsService::new(registry.database.clone(), registry.capabilities.clone());

    let stats = if lokal {
        service.local()?
    } else {
        service.fetch(registry.backend()).await.map_err(super::report_failure)?
    };

    match format {
        OutputFormat::Json => super::print_json(&stats),
        OutputFormat::Text => print_stats(&stats, lokal),
    }
    Ok(())
}

fn print_stats(stats: &PopulationStats, lokal: bool) {
    let source = if lokal { "cache lokal" } else { "server" };
    println!("{} ({source})", style("Statistik Penduduk").bold().underlined());
    println!("  Total penduduk   {}", stats.total);
    println!("  Laki-laki        {}", stats.laki_laki);
    println!("  Perempuan        {}", stats.perempuan);
    println!("  Kepala keluarga  {}", stats.keluarga);

    if !stats.per_dusun.is_empty() {
        let mut table = super::new_table(vec!["Dusun", "Jumlah"]);
        for d in &stats.per_dusun {
            table.add_row(vec![
                super::or_dash(d.dusun.as_deref()).to_string(),
                d.jumlah.to_string(),
            ]);
        }
        println!("{table}");
    }
}
