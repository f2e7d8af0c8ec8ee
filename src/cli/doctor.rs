//! CLI `doctor` command: run storage diagnostics and print a health report.

use anyhow::{Context, Result};

use mindcache::config::MindCacheConfig;
use mindcache::db;

/// Run storage diagnostics and print a health report.
pub fn doctor(config: &MindCacheConfig) -> Result<()> {
    let db_path = config.resolved_db_path();

    if !db_path.exists() {
        println!("Storage: not found at {}", db_path.display());
        println!("Run `mindcache serve` to initialize.");
        return Ok(());
    }

    let file_size = std::fs::metadata(&db_path)
        .map(|m| m.len())
        .unwrap_or(0);

    let conn = db::open_database(&db_path)
        .context("failed to open storage (may be corrupt)")?;

    let report = db::check_database_health(&conn)
        .context("failed to run health check")?;

    println!("MindCache Health Report");
    println!("=======================");
    println!();
    println!("Storage:           {}", db_path.display());
    println!("File size:         {}", format_bytes(file_size));
    println!("Schema version:    {}", report.schema_version);
    println!(
        "Installed:         {}",
        report.installed_at.as_deref().unwrap_or("(unknown)")
    );
    println!();
    println!("Keys ({}):", report.key_count);
    for (key, size) in &report.key_sizes {
        println!("  {:<28} {}", key, format_bytes(*size));
    }
    println!();
    if report.integrity_ok {
        println!("Integrity check:   PASSED");
    } else {
        println!("Integrity check:   FAILED ({})", report.integrity_details);
        println!();
        println!("Recovery steps:");
        println!("  1. Restore from a copy: cp backup.db ~/.mindcache/storage.db");
        println!("  2. Or dump what is readable and reimport:");
        println!("     mindcache backup > backup.json");
        println!("     mindcache import backup.json");
    }

    Ok(())
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
