//! # Office Geofence Commands

use serde::Serialize;

use presensi_core::OfficeGeofence;

use crate::error::CliResult;
use crate::output::Render;
use crate::state::AppContext;

#[derive(Debug, Clone, Serialize)]
pub struct OfficeView {
    #[serde(flatten)]
    pub fence: OfficeGeofence,
    /// True when the fence comes from settings rather than the config file.
    pub saved: bool,
}

impl Render for OfficeView {
    fn render(&self) -> String {
        format!(
            "Office at ({:.6}, {:.6}), radius {:.0} m{}",
            self.fence.latitude,
            self.fence.longitude,
            self.fence.radius_meters,
            if self.saved { " (saved)" } else { "" }
        )
    }
}

pub async fn show(ctx: &AppContext) -> CliResult<OfficeView> {
    let saved = ctx.db.settings().office_geofence().await?.is_some();
    Ok(OfficeView {
        fence: ctx.engine.fence(),
        saved,
    })
}

pub async fn set(ctx: &AppContext, fence: OfficeGeofence) -> CliResult<OfficeView> {
    ctx.engine.save_office_geofence(fence).await?;
    Ok(OfficeView {
        fence: ctx.engine.fence(),
        saved: true,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::test_context;

    #[tokio::test]
    async fn test_show_defaults() {
        let ctx = test_context(None).await;
        let view = show(&ctx).await.unwrap();
        assert!(!view.saved);
        assert_eq!(view.fence, ctx.config.office_geofence());
    }

    #[tokio::test]
    async fn test_set_persists() {
        let ctx = test_context(None).await;
        let fence = OfficeGeofence::new(-6.2, 106.8, 300.0);

        let view = set(&ctx, fence).await.unwrap();
        assert!(view.saved);
        assert_eq!(view.fence, fence);
        assert_eq!(show(&ctx).await.unwrap().fence, fence);
        assert_eq!(ctx.db.settings().office_geofence().await.unwrap(), Some(fence));
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_radius() {
        let ctx = test_context(None).await;
        let err = set(&ctx, OfficeGeofence::new(-6.2, 106.8, 0.0)).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
        assert!(!show(&ctx).await.unwrap().saved);
    }
}
