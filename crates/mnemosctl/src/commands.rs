//! One-shot command implementations

use crate::cli::BioArgs;
use crate::progress::with_busy;
use anyhow::{Context, Result};
use mnemos_common::api_client::ApiClient;
use mnemos_common::render::{self, color_enabled, paint, RenderOptions};
use mnemos_common::{
    AnalysisResult, ChatMessage, Credentials, GatewayError, HttpInferenceGateway, ImageUpload,
    InferenceGateway, MnemosConfig, SessionStore,
};
use owo_colors::OwoColorize;
use std::io::{self, BufRead, Write};
use std::path::Path;
use tracing::debug;

/// Password fallback for non-interactive sign-in
pub const ENV_PASSWORD: &str = "MNEMOS_PASSWORD";

/// Effective settings shared by all commands
pub struct AppContext {
    pub config: MnemosConfig,
    pub sessions: SessionStore,
    pub render: RenderOptions,
}

impl AppContext {
    /// Config file, then env, then command-line flags
    pub fn load(inference_url: Option<String>, api_url: Option<String>) -> Result<Self> {
        let mut config = MnemosConfig::load().context("Failed to load configuration")?;
        config.apply_overrides(inference_url, api_url);
        debug!(
            inference = %config.inference.base_url,
            api = %config.api.base_url,
            "configuration loaded"
        );

        Ok(Self {
            config,
            sessions: SessionStore::default_location(),
            render: RenderOptions::detect(),
        })
    }

    pub fn gateway(&self) -> Result<HttpInferenceGateway> {
        Ok(HttpInferenceGateway::new(&self.config.inference)?)
    }

    pub fn api(&self) -> Result<ApiClient> {
        Ok(ApiClient::new(&self.config.api)?)
    }
}

fn print_result(ctx: &AppContext, result: AnalysisResult, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        let message = ChatMessage::analysis_reply(result);
        println!("{}", render::format_message(&message, ctx.render));
    }
    Ok(())
}

pub async fn analyze_image(ctx: &AppContext, path: &Path, json: bool) -> Result<()> {
    let upload = ImageUpload::from_path(path)
        .with_context(|| format!("Cannot use {}", path.display()))?;
    let gateway = ctx.gateway()?;

    let result = with_busy(
        &format!("Analyzing {}...", upload.file_name),
        gateway.analyze_image(&upload),
    )
    .await
    .context("Image analysis failed")?;

    print_result(ctx, result, json)
}

pub async fn analyze_bio(ctx: &AppContext, bio: &BioArgs, json: bool) -> Result<()> {
    let panel = bio.to_panel()?;
    let color = color_enabled(&io::stderr());
    for warning in panel.range_warnings() {
        let label = paint(color, "warning:", |t| t.yellow().bold().to_string());
        eprintln!("{} {}", label, warning);
    }

    let gateway = ctx.gateway()?;
    let result = with_busy("Analyzing biomarkers...", gateway.analyze_features(&panel))
        .await
        .context("Biomarker analysis failed")?;

    print_result(ctx, result, json)
}

pub async fn health(ctx: &AppContext, json: bool) -> Result<()> {
    let gateway = ctx.gateway()?;
    let report = with_busy("Checking inference service...", gateway.health_check()).await;

    let color = ctx.render.color;
    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("Inference service: {}", gateway.base_url());
        if report.reachable {
            println!(
                "  {} {} ({} ms)",
                paint(color, "reachable", |t| t.green().bold().to_string()),
                report.status.as_deref().unwrap_or("ok"),
                report.latency_ms
            );
            if let Some(loaded) = report.models_loaded {
                println!("  models loaded: {}", if loaded { "yes" } else { "no" });
            }
        } else {
            println!(
                "  {}",
                paint(color, "unreachable", |t| t.red().bold().to_string())
            );
        }
        if let Some(error) = &report.error {
            println!("  {}", paint(color, error, |t| t.dimmed().to_string()));
        }
    }

    if !report.reachable {
        let reason = report.error.unwrap_or_else(|| "no response".to_string());
        return Err(GatewayError::Network(reason)).context("Inference service is not reachable");
    }
    Ok(())
}

fn prompt_password() -> Result<String> {
    eprint!("Password: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin()
        .lock()
        .read_line(&mut line)
        .context("Failed to read password")?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

pub async fn login(ctx: &AppContext, email: &str, password: Option<String>) -> Result<()> {
    let password = match password.or_else(|| std::env::var(ENV_PASSWORD).ok()) {
        Some(p) => p,
        None => prompt_password()?,
    };
    let credentials = Credentials {
        email: email.to_string(),
        password,
    };

    let api = ctx.api()?;
    let mut session = ctx.sessions.load();
    let user = with_busy("Signing in...", api.login(&mut session, &credentials))
        .await
        .context("Sign-in failed")?;

    ctx.sessions
        .save(&session)
        .with_context(|| format!("Failed to save session to {}", ctx.sessions.path().display()))?;

    println!(
        "Signed in as {} ({})",
        paint(ctx.render.color, &user.email, |t| t.bold().to_string()),
        user.role
    );
    Ok(())
}

pub fn logout(ctx: &AppContext) -> Result<()> {
    let session = ctx.sessions.load();
    ctx.sessions.clear().context("Failed to remove session")?;

    match session.user() {
        Some(user) => println!("Signed out {}", user.email),
        None => println!("Not signed in"),
    }
    Ok(())
}

pub async fn whoami(ctx: &AppContext) -> Result<()> {
    let mut session = ctx.sessions.load();
    if !session.is_signed_in() {
        return Err(GatewayError::Unauthorized).context("Not signed in; run `mnemosctl login`");
    }

    let api = ctx.api()?;
    match api.current_user(&mut session).await {
        Ok(profile) => {
            println!(
                "{}",
                paint(ctx.render.color, &profile.email, |t| t.bold().to_string())
            );
            if let Some(name) = &profile.full_name {
                println!("  name: {}", name);
            }
            println!("  role: {}", profile.role);
            Ok(())
        }
        Err(GatewayError::Unauthorized) => {
            // The client already cleared the in-memory session
            ctx.sessions.clear().context("Failed to remove session")?;
            Err(GatewayError::Unauthorized).context("Session expired; run `mnemosctl login`")
        }
        Err(err) => Err(err).context("Failed to fetch account"),
    }
}

pub fn config(ctx: &AppContext, init: bool) -> Result<()> {
    let path = mnemos_common::paths::config_file();

    if init {
        if path.exists() {
            println!("Config already exists: {}", path.display());
        } else {
            MnemosConfig::default()
                .save_to(&path)
                .context("Failed to write default config")?;
            println!("Wrote default config: {}", path.display());
        }
        return Ok(());
    }

    let state = if path.exists() { "" } else { " (not present, using defaults)" };
    println!("# {}{}", path.display(), state);
    print!(
        "{}",
        toml::to_string_pretty(&ctx.config).context("Failed to render config")?
    );
    println!("# session: {}", ctx.sessions.path().display());
    Ok(())
}
