//! The `vista tiers` command.

use vista_core::Config;

use super::theme;

pub fn execute(config: &Config) -> anyhow::Result<()> {
    println!("{}", render(config));
    Ok(())
}

fn render(config: &Config) -> String {
    let mut out = format!(
        "  {:<10} {:>8} {:>8} {:>14} {:>16} {:>8}",
        "TIER", "RPM", "RPD", "TPM", "BATCH LIMIT", "WORKERS"
    );
    for (name, limits) in config.tiers.iter() {
        let marker = if *name == config.run.tier { "*" } else { " " };
        let line = format!(
            "{marker} {:<10} {:>8} {:>8} {:>14} {:>16} {:>8}",
            name,
            limits.rpm,
            or_dash(u64::from(limits.rpd)),
            or_dash(limits.tpm),
            or_dash(limits.batch_limit),
            limits.max_workers()
        );
        out.push('\n');
        if *name == config.run.tier {
            out.push_str(&theme::accent().apply_to(line).to_string());
        } else {
            out.push_str(&line);
        }
    }
    out
}

/// Zero means no published limit.
fn or_dash(value: u64) -> String {
    if value == 0 {
        "-".to_string()
    } else {
        value.to_string()
    }
}
