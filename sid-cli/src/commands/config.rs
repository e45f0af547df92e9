//! Config commands.

use clap::Subcommand;
use console::style;

use sid_core::config::{AppConfig, ConfigHandle};
use sid_core::constants::PAGE_SIZES;
use sid_core::error::{SidError, SidResult};
use crate::OutputFormat;

#[derive(Subcommand)]
pub enum ConfigAction {
    /// Show all settings.
    Show,
    /// Get a specific setting value by key path.
    Get {
        /// Setting key path (e.g., "backend.url", "grid.default_page_size").
        key: String,
    },
    /// Set a specific setting value by key path.
    Set {
        /// Setting key path (e.g., "backend.url", "storage.bucket").
        key: String,
        /// New value.
        value: String,
    },
    /// Print the path of the configuration file.
    Path,
}

/// Resolve a dot-separated key path to a value from the config.
fn get_setting_value(cfg: &AppConfig, key: &str) -> Option<String> {
    match key {
        "backend.url" => Some(cfg.backend.url.clone()),
        "backend.anon_key" => Some(mask(&cfg.backend.anon_key)),
        "backend.api_timeout_ms" => Some(cfg.backend.api_timeout_ms.to_string()),
        "backend.accept_invalid_certs" => Some(cfg.backend.accept_invalid_certs.to_string()),
        "render.endpoint" => Some(cfg.effective_render_endpoint()),
        "render.timeout_ms" => Some(cfg.render.timeout_ms.to_string()),
        "storage.bucket" => Some(cfg.storage.bucket.clone()),
        "database.path" => Some(cfg.database.path.clone()),
        "database.wal_mode" => Some(cfg.database.wal_mode.to_string()),
        "database.pool_size" => Some(cfg.database.pool_size.to_string()),
        "database.integrity_check_on_startup" => Some(cfg.database.integrity_check_on_startup.to_string()),
        "logging.level" => Some(cfg.logging.level.clone()),
        "logging.directory" => Some(cfg.logging.directory.clone()),
        "logging.json_output" => Some(cfg.logging.json_output.to_string()),
        "import.batch_size" => Some(cfg.import.batch_size.to_string()),
        "grid.default_page_size" => Some(cfg.grid.default_page_size.to_string()),
        "village.sebutan_desa" => cfg.village.sebutan_desa.clone(),
        "village.sebutan_kecamatan" => cfg.village.sebutan_kecamatan.clone(),
        "village.sebutan_kabupaten" => cfg.village.sebutan_kabupaten.clone(),
        "session.email" => Some(cfg.session.email.clone()),
        _ => None,
    }
}

fn parse_bool(value: &str) -> Result<bool, String> {
    value.parse().map_err(|_| "expected true/false".to_string())
}

fn optional(value: &str) -> Option<String> {
    let v = value.trim();
    (!v.is_empty()).then(|| v.to_string())
}

/// Apply a value to a dot-separated key path on the config.
fn set_setting_value(cfg: &mut AppConfig, key: &str, value: &str) -> Result<(), String> {
    match key {
        "backend.url" => cfg.backend.url = AppConfig::sanitize_backend_url(value),
        "backend.anon_key" => cfg.backend.anon_key = value.trim().to_string(),
        "backend.api_timeout_ms" => {
            cfg.backend.api_timeout_ms = value.parse().map_err(|_| "invalid integer".to_string())?;
        }
        "backend.accept_invalid_certs" => cfg.backend.accept_invalid_certs = parse_bool(value)?,
        "render.endpoint" => cfg.render.endpoint = value.trim().to_string(),
        "render.timeout_ms" => {
            cfg.render.timeout_ms = value.parse().map_err(|_| "invalid integer".to_string())?;
        }
        "storage.bucket" => {
            if value.trim().is_empty() {
                return Err("bucket name cannot be empty".to_string());
            }
            cfg.storage.bucket = value.trim().to_string();
        }
        "database.path" => cfg.database.path = value.to_string(),
        "database.wal_mode" => cfg.database.wal_mode = parse_bool(value)?,
        "database.pool_size" => {
            cfg.database.pool_size = value.parse().map_err(|_| "invalid integer".to_string())?;
        }
        "database.integrity_check_on_startup" => {
            cfg.database.integrity_check_on_startup = parse_bool(value)?;
        }
        "logging.level" => {
            let v = value.to_lowercase();
            if !["trace", "debug", "info", "warn", "error"].contains(&v.as_str()) {
                return Err("expected one of: trace, debug, info, warn, error".to_string());
            }
            cfg.logging.level = v;
        }
        "logging.directory" => cfg.logging.directory = value.to_string(),
        "logging.json_output" => cfg.logging.json_output = parse_bool(value)?,
        "import.batch_size" => {
            let size: usize = value.parse().map_err(|_| "invalid integer".to_string())?;
            if size == 0 {
                return Err("batch size must be positive".to_string());
            }
            cfg.import.batch_size = size;
        }
        "grid.default_page_size" => {
            let size: usize = value.parse().map_err(|_| "invalid integer".to_string())?;
            if !PAGE_SIZES.contains(&size) {
                return Err(format!("expected one of {PAGE_SIZES:?}"));
            }
            cfg.grid.default_page_size = size;
        }
        "village.sebutan_desa" => cfg.village.sebutan_desa = optional(value),
        "village.sebutan_kecamatan" => cfg.village.sebutan_kecamatan = optional(value),
        "village.sebutan_kabupaten" => cfg.village.sebutan_kabupaten = optional(value),
        _ => return Err(format!("unknown setting key: {key}")),
    }
    Ok(())
}

fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        "********".to_string()
    }
}

fn print_settings_text(cfg: &AppConfig) {
    println!("{}", style("Backend").bold().underlined());
    println!("  backend.url                       {}", cfg.backend.url);
    println!("  backend.anon_key                  {}", mask(&cfg.backend.anon_key));
    println!("  backend.api_timeout_ms            {}", cfg.backend.api_timeout_ms);
    println!("  backend.accept_invalid_certs      {}", cfg.backend.accept_invalid_certs);
    println!("  render.endpoint                   {}", cfg.effective_render_endpoint());
    println!("  render.timeout_ms                 {}", cfg.render.timeout_ms);
    println!("  storage.bucket                    {}", cfg.storage.bucket);

    println!();
    println!("{}", style("Cache").bold().underlined());
    println!("  database.path                     {}", cfg.database.path);
    println!("  database.wal_mode                 {}", cfg.database.wal_mode);
    println!("  database.pool_size                {}", cfg.database.pool_size);
    println!("  database.integrity_check_on_startup {}", cfg.database.integrity_check_on_startup);

    println!();
    println!("{}", style("Logging").bold().underlined());
    println!("  logging.level                     {}", cfg.logging.level);
    println!("  logging.directory                 {}", cfg.logging.directory);
    println!("  logging.json_output               {}", cfg.logging.json_output);

    println!();
    println!("{}", style("Data").bold().underlined());
    println!("  import.batch_size                 {}", cfg.import.batch_size);
    println!("  grid.default_page_size            {}", cfg.grid.default_page_size);

    println!();
    println!("{}", style("Village").bold().underlined());
    println!("  village.sebutan_desa              {}", cfg.village.sebutan_desa.as_deref().unwrap_or(""));
    println!("  village.sebutan_kecamatan         {}", cfg.village.sebutan_kecamatan.as_deref().unwrap_or(""));
    println!("  village.sebutan_kabupaten         {}", cfg.village.sebutan_kabupaten.as_deref().unwrap_or(""));

    println!();
    println!("{}", style("Session").bold().underlined());
    if cfg.session.is_present() {
        println!("  session.email                     {}", cfg.session.email);
    } else {
        println!("  {}", style("not signed in").dim());
    }
}

fn settings_json(cfg: &AppConfig) -> serde_json::Value {
    serde_json::json!({
        "backend": {
            "url": cfg.backend.url,
            "anon_key_set": !cfg.backend.anon_key.is_empty(),
            "api_timeout_ms": cfg.backend.api_timeout_ms,
            "accept_invalid_certs": cfg.backend.accept_invalid_certs,
        },
        "render": {
            "endpoint": cfg.effective_render_endpoint(),
            "timeout_ms": cfg.render.timeout_ms,
        },
        "storage": { "bucket": cfg.storage.bucket },
        "database": {
            "path": cfg.database.path,
            "wal_mode": cfg.database.wal_mode,
            "pool_size": cfg.database.pool_size,
            "integrity_check_on_startup": cfg.database.integrity_check_on_startup,
        },
        "logging": {
            "level": cfg.logging.level,
            "directory": cfg.logging.directory,
            "json_output": cfg.logging.json_output,
        },
        "import": { "batch_size": cfg.import.batch_size },
        "grid": { "default_page_size": cfg.grid.default_page_size },
        "village": cfg.village,
        "session": {
            "signed_in": cfg.session.is_present(),
            "email": cfg.session.email,
        },
    })
}

pub async fn run(config: ConfigHandle, action: ConfigAction, format: OutputFormat) -> SidResult<()> {
    match action {
        ConfigAction::Show => {
            let cfg = config.read().await;
            match format {
                OutputFormat::Json => super::print_json(&settings_json(&cfg)),
                OutputFormat::Text => print_settings_text(&cfg),
            }
        }
        ConfigAction::Get { key } => {
            let cfg = config.read().await;
            let value = get_setting_value(&cfg, &key)
                .ok_or_else(|| SidError::Config(format!("unknown or unset setting key: {key}")))?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "key": key, "value": value })),
                OutputFormat::Text => println!("{value}"),
            }
        }
        ConfigAction::Set { key, value } => {
            {
                let mut cfg = config.write().await;
                set_setting_value(&mut cfg, &key, &value).map_err(SidError::Config)?;
                cfg.validate()?;
            }
            config.save().await?;
            println!("{} {key} updated", style("OK").green().bold());
        }
        ConfigAction::Path => {
            let path = config.path()?;
            match format {
                OutputFormat::Json => super::print_json(&serde_json::json!({ "path": path })),
                OutputFormat::Text => println!("{}", path.display()),
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_roundtrip_through_key_paths() {
        let mut cfg = AppConfig::default();
        set_setting_value(&mut cfg, "backend.url", "desa.example.id/").unwrap();
        assert_eq!(get_setting_value(&cfg, "backend.url").as_deref(), Some("https://desa.example.id"));

        set_setting_value(&mut cfg, "backend.anon_key", "secret").unwrap();
        assert_eq!(get_setting_value(&cfg, "backend.anon_key").as_deref(), Some("********"));

        set_setting_value(&mut cfg, "village.sebutan_desa", "Kelurahan").unwrap();
        assert_eq!(cfg.village.sebutan_desa.as_deref(), Some("Kelurahan"));
        set_setting_value(&mut cfg, "village.sebutan_desa", " ").unwrap();
        assert_eq!(cfg.village.sebutan_desa, None);
    }

    #[test]
    fn test_set_rejects_invalid_values() {
        let mut cfg = AppConfig::default();
        assert!(set_setting_value(&mut cfg, "grid.default_page_size", "25").is_err());
        assert!(set_setting_value(&mut cfg, "import.batch_size", "0").is_err());
        assert!(set_setting_value(&mut cfg, "logging.level", "loud").is_err());
        assert!(set_setting_value(&mut cfg, "storage.bucket", "").is_err());
        assert!(set_setting_value(&mut cfg, "nope", "1").is_err());

        set_setting_value(&mut cfg, "grid.default_page_size", "50").unwrap();
        assert_eq!(cfg.grid.default_page_size, 50);
    }
}
