use anyhow::Result;

use mindcache::config::MindCacheConfig;
use mindcache::tracking::summary::SummaryLog;

/// Print recent summaries, newest last.
pub async fn summaries(config: &MindCacheConfig, limit: Option<usize>) -> Result<()> {
    let log = SummaryLog::new(super::open(config)?, config.tracking.summary_cap);
    let summaries = log.recent(limit).await?;

    if summaries.is_empty() {
        println!("No summaries yet.");
        return Ok(());
    }

    for summary in &summaries {
        let when = chrono::DateTime::from_timestamp_millis(summary.timestamp)
            .map(|t| t.to_rfc3339())
            .unwrap_or_else(|| summary.timestamp.to_string());
        let most_common = summary
            .activity_pattern
            .most_common_activity
            .map(|k| k.to_string())
            .unwrap_or_else(|| "-".into());
        let sites: Vec<String> = summary
            .top_sites
            .iter()
            .map(|s| format!("{} ({})", s.domain, s.count))
            .collect();
        println!("{when}  {} interactions, mostly {most_common}", summary.interactions);
        if !sites.is_empty() {
            println!("    {}", sites.join(", "));
        }
    }
    Ok(())
}
