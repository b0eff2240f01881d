//! # Authentication Commands

use serde::Serialize;

use crate::commands::MessageView;
use crate::error::CliResult;
use crate::output::Render;
use crate::state::AppContext;

#[derive(Debug, Clone, Serialize)]
pub struct LoginView {
    pub user_id: Option<i64>,
    pub name: Option<String>,
    pub email: Option<String>,
}

impl Render for LoginView {
    fn render(&self) -> String {
        match (&self.name, &self.email) {
            (Some(name), Some(email)) => format!("Logged in as {name} <{email}>"),
            (_, Some(email)) => format!("Logged in as {email}"),
            _ => "Logged in".to_string(),
        }
    }
}

pub async fn login(ctx: &AppContext, email: &str, password: &str) -> CliResult<LoginView> {
    let login = ctx.api.login(email, password).await?;
    let user = login.user.as_ref();
    Ok(LoginView {
        user_id: user.and_then(|u| u.id),
        name: user.map(|u| u.name.clone()).filter(|n| !n.is_empty()),
        email: user
            .map(|u| u.email.clone())
            .filter(|e| !e.is_empty())
            .or_else(|| Some(email.trim().to_string())),
    })
}

/// Clears the stored session. Queued attendance is kept and uploads after
/// the next login.
pub async fn logout(ctx: &AppContext) -> CliResult<MessageView> {
    ctx.api.logout().await?;
    let pending = ctx.engine.pending_count().await?;
    let message = if pending > 0 {
        format!("Logged out ({pending} attendance still queued)")
    } else {
        "Logged out".to_string()
    };
    Ok(MessageView::ok(Some(message)))
}

pub async fn forgot_password(ctx: &AppContext, email: &str) -> CliResult<MessageView> {
    let message = ctx.api.forgot_password(email).await?;
    Ok(MessageView::ok(message.or_else(|| {
        Some("Password reset link sent".to_string())
    })))
}

pub async fn reset_password(
    ctx: &AppContext,
    email: &str,
    token: &str,
    password: &str,
    confirmation: Option<&str>,
) -> CliResult<MessageView> {
    let confirmation = confirmation.unwrap_or(password);
    let message = ctx
        .api
        .reset_password(email, token, password, confirmation)
        .await?;
    Ok(MessageView::ok(message.or_else(|| Some("Password updated".to_string()))))
}
