//! Session command handlers: login, register, logout, whoami, status, refresh.

use chrono::Utc;
use serde_json::{Value, json};

use mebelplace_api::RegisterRequest;
use mebelplace_core::{QueryClient, keys};

use super::util;
use crate::cli::{LoginArgs, RegisterArgs};
use crate::config::Config;
use crate::error::CliError;
use crate::output::Printer;

/// Path of the current-user record.
const CURRENT_USER_PATH: &str = "/users/me";

fn display_name(user: &Value) -> String {
    ["username", "phone", "id"]
        .iter()
        .find_map(|field| match user.get(*field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        })
        .unwrap_or_else(|| "unknown user".into())
}

pub async fn login(
    args: &LoginArgs,
    client: &QueryClient,
    printer: &Printer,
) -> Result<(), CliError> {
    let password = util::resolve_password(args.password.as_deref())?;
    let session = client
        .login(&args.phone, &password, args.sms_code.as_deref())
        .await?;

    if printer.is_plain() {
        printer.message(&format!("Logged in as {}", display_name(&session.user)));
        Ok(())
    } else {
        printer.value(&session.user)
    }
}

pub async fn register(
    args: RegisterArgs,
    client: &QueryClient,
    printer: &Printer,
) -> Result<(), CliError> {
    let password = util::resolve_password(args.password.as_deref())?;
    let request = RegisterRequest {
        phone: args.phone,
        username: args.username,
        password,
        first_name: args.first_name,
        last_name: args.last_name,
        role: args.role.into(),
    };
    let session = client.register(&request).await?;

    if printer.is_plain() {
        printer.message(&format!(
            "Registered and logged in as {}",
            display_name(&session.user)
        ));
        Ok(())
    } else {
        printer.value(&session.user)
    }
}

/// Server-side failure only warns: the local session is gone either way.
pub async fn logout(client: &QueryClient, printer: &Printer) -> Result<(), CliError> {
    if !client.api().credentials().is_authenticated() {
        printer.message("Not logged in");
        return Ok(());
    }

    match client.logout().await {
        Ok(()) => printer.message("Logged out"),
        Err(e) => {
            tracing::warn!(error = %e, "server did not confirm logout");
            printer.message("Logged out locally (server did not confirm)");
        }
    }
    Ok(())
}

pub async fn whoami(client: &QueryClient, printer: &Printer) -> Result<(), CliError> {
    if !client.api().credentials().is_authenticated() {
        return Err(CliError::NotLoggedIn);
    }
    let user = client
        .query::<Value>(&keys::auth::current_user(), CURRENT_USER_PATH)
        .await?;
    printer.value(&user)
}

/// Local view of the stored session; never touches the network.
pub fn status(client: &QueryClient, cfg: &Config, printer: &Printer) -> Result<(), CliError> {
    let credential = client.api().credentials().get();
    let status = json!({
        "api_url": client.api().base_url().as_str(),
        "credential_store": cfg.credential_store.as_ref(),
        "authenticated": credential.is_authenticated(),
        "can_refresh": credential.can_refresh(),
        "expires_at": credential.expires_at.map(|at| at.to_rfc3339()),
        "expired": credential.is_expired(Utc::now()),
    });
    printer.value(&status)
}

pub async fn refresh(client: &QueryClient, printer: &Printer) -> Result<(), CliError> {
    if !client.api().credentials().get().can_refresh() {
        return Err(CliError::NotLoggedIn);
    }
    client.api().refresh().await?;

    let expires_at = client.api().credentials().get().expires_at;
    if printer.is_plain() {
        match expires_at {
            Some(at) => printer.message(&format!("Session refreshed, expires {}", at.to_rfc3339())),
            None => printer.message("Session refreshed"),
        }
        Ok(())
    } else {
        printer.value(&json!({ "expires_at": expires_at.map(|at| at.to_rfc3339()) }))
    }
}
