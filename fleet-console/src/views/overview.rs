use fleet_client::{ClientError, ControlPlane};
use fleet_models::FleetStats;
use std::fmt;

pub async fn load(api: &dyn ControlPlane) -> Result<FleetStats, ClientError> {
    let instances = api.list_instances().await?;
    Ok(FleetStats::from_instances(&instances))
}

fn format_percentage(count: usize, total: usize) -> String {
    if total == 0 {
        return String::new();
    }
    format!("({:.1}%)", count as f64 / total as f64 * 100.0)
}

pub fn render(stats: &FleetStats) -> String {
    Overview(stats).to_string()
}

struct Overview<'a>(&'a FleetStats);

impl fmt::Display for Overview<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stats = self.0;
        writeln!(f, "Fleet Overview")?;
        writeln!(f, "{}", "=".repeat(60))?;
        writeln!(f, "  Total:             {}", stats.total)?;
        for (label, count) in [
            ("Running:", stats.running),
            ("Stopped:", stats.stopped),
            ("Building:", stats.building),
            ("Error:", stats.error),
        ] {
            writeln!(
                f,
                "  {:<18} {}  {}",
                label,
                count,
                format_percentage(count, stats.total)
            )?;
        }
        Ok(())
    }
}
