//! Login, logout and status commands.

use console::style;
use dialoguer::{Input, Password};

use sid_core::config::ConfigHandle;
use sid_core::error::SidResult;
use crate::OutputFormat;

/// Sign in and persist the session tokens.
pub async fn login(
    config: ConfigHandle,
    email: Option<String>,
    password: Option<String>,
    format: OutputFormat,
) -> SidResult<()> {
    // Determine email: arg > saved session > interactive prompt
    let email = match email {
        Some(e) => e,
        None => {
            let saved = config.read().await.session.email.clone();
            let mut prompt = Input::<String>::new().with_prompt("Email");
            if !saved.is_empty() {
                prompt = prompt.default(saved);
            }
            prompt.interact_text().map_err(super::prompt_err)?
        }
    };
    let password = match password {
        Some(p) => p,
        None => Password::new()
            .with_prompt("Kata sandi")
            .interact()
            .map_err(super::prompt_err)?,
    };

    let registry = super::connect(&config).await?;
    let ctx = super::session_service(&registry)
        .login(registry.backend(), email.trim(), &password)
        .await?;

    let role = ctx.role().unwrap_or_default();
    match format {
        OutputFormat::Json => super::print_json(&serde_json::json!({
            "user_id": ctx.user_id(),
            "email": email.trim(),
            "role": role.as_str(),
            "dusun": ctx.profile.as_ref().and_then(|p| p.dusun.clone()),
        })),
        OutputFormat::Text => {
            println!("{} Masuk sebagai {} ({role})", style("OK").green().bold(), email.trim());
            if !role.is_staff() {
                println!(
                    "  {} akun warga tidak dapat membuka halaman admin",
                    style("!").yellow().bold()
                );
            }
        }
    }
    Ok(())
}

pub async fn logout(config: ConfigHandle) -> SidResult<()> {
    if !config.read().await.session.is_present() {
        println!("Tidak ada sesi yang tersimpan.");
        return Ok(());
    }
    let registry = super::connect(&config).await?;
    super::session_service(&registry).logout(registry.backend()).await?;
    println!("{} Sesi diakhiri.", style("OK").green().bold());
    Ok(())
}

/// Show the session, role and backend capabilities.
pub async fn status(config: ConfigHandle, format: OutputFormat) -> SidResult<()> {
    let backend_url = config.read().await.backend.url.clone();
    let registry = super::connect(&config).await?;
    let auth = registry.auth_snapshot().await;
    let capabilities = registry.capabilities().await;
    let health = registry.health_check().await;

    match format {
        OutputFormat::Json => {
            let services: Vec<serde_json::Value> = health
                .iter()
                .map(|(name, state, healthy)| {
                    serde_json::json!({
                        "name": name,
                        "state": format!("{state:?}"),
                        "healthy": healthy,
                    })
                })
                .collect();
            super::print_json(&serde_json::json!({
                "app": sid_core::constants::APP_NAME,
                "version": sid_core::constants::APP_VERSION,
                "backend": backend_url,
                "signed_in": auth.is_authenticated(),
                "user_id": auth.user_id(),
                "role": auth.role().map(|r| r.as_str()),
                "dusun_scope": auth.dusun_scope(),
                "capabilities": capabilities.iter().collect::<Vec<_>>(),
                "services": services,
            }));
        }
        OutputFormat::Text => {
            println!(
                "{} v{}",
                style(sid_core::constants::APP_NAME).bold(),
                sid_core::constants::APP_VERSION
            );
            println!("  Backend       {backend_url}");
            match auth.role() {
                Some(role) => {
                    let name = auth
                        .profile
                        .as_ref()
                        .map(|p| p.display_name().to_string())
                        .unwrap_or_else(|| auth.user_id().unwrap_or("?").to_string());
                    println!("  Pengguna      {name}");
                    println!("  Peran         {role}");
                    if let Some(scope) = auth.dusun_scope() {
                        println!("  Dusun         {}", super::or_dash(Some(scope.as_str())));
                    }
                }
                None => println!("  Pengguna      {}", style("belum masuk").dim()),
            }

            println!();
            println!("{}", style("Kemampuan backend").bold().underlined());
            if capabilities.is_empty() {
                println!("  {}", style("(tidak ada prosedur opsional)").dim());
            }
            for name in capabilities.iter() {
                println!("  {} {name}", style("+").green());
            }

            println!();
            println!("{}", style("Layanan").bold().underlined());
            for (name, state, healthy) in &health {
                let mark = if *healthy {
                    style("OK").green().bold()
                } else {
                    style("FAIL").red().bold()
                };
                println!("  {mark} {name} ({state:?})");
            }
        }
    }
    Ok(())
}
