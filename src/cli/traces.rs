use anyhow::Result;

use moat::config::MoatConfig;
use moat::tracer::read_traces;

/// Print the most recent traced decisions.
pub fn traces(config: &MoatConfig, limit: usize) -> Result<()> {
    let path = config.resolved_trace_log();
    let entries = read_traces(&path, limit)?;
    if entries.is_empty() {
        println!("No traces in {}", path.display());
        return Ok(());
    }
    for e in entries {
        println!("#{} [{}] {}", e.id, e.step, e.decision);
        println!("    {}", e.rationale);
    }
    Ok(())
}
