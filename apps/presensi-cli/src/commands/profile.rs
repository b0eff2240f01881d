//! # Profile Commands

use std::path::Path;

use presensi_core::{EmployeeProfile, ProfileUpdate};

use crate::error::{CliError, CliResult};
use crate::state::AppContext;

/// The server profile, or the cached copy with `cached`.
pub async fn show(ctx: &AppContext, cached: bool) -> CliResult<Option<EmployeeProfile>> {
    if cached {
        return Ok(ctx.db.settings().cached_profile().await?);
    }
    Ok(Some(ctx.api.profile().await?))
}

pub async fn update(
    ctx: &AppContext,
    update: ProfileUpdate,
    photo: Option<&Path>,
) -> CliResult<EmployeeProfile> {
    if update.is_empty() && photo.is_none() {
        return Err(CliError::InvalidArgument(
            "nothing to update; pass at least one field or --photo".into(),
        ));
    }
    if let Some(path) = photo {
        if !path.is_file() {
            return Err(CliError::InvalidArgument(format!(
                "photo not found: {}",
                path.display()
            )));
        }
    }

    Ok(ctx.api.update_profile(&update, photo).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_context;

    #[tokio::test]
    async fn test_show_cached() {
        let ctx = test_context(None).await;
        assert!(show(&ctx, true).await.unwrap().is_none());

        let profile = EmployeeProfile {
            id: Some(7),
            name: "Sari".into(),
            email: "sari@example.com".into(),
            ..Default::default()
        };
        ctx.db.settings().cache_profile(&profile).await.unwrap();

        assert_eq!(show(&ctx, true).await.unwrap(), Some(profile));
    }

    #[tokio::test]
    async fn test_empty_update_rejected() {
        let ctx = test_context(None).await;
        let err = update(&ctx, ProfileUpdate::default(), None).await.unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
