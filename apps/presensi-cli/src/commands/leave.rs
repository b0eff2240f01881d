//! # Leave Commands

use chrono::NaiveDate;
use std::path::Path;

use presensi_core::{LeaveRequest, NewLeaveRequest};

use crate::commands::MessageView;
use crate::error::{CliError, CliResult};
use crate::state::AppContext;

pub async fn list(ctx: &AppContext) -> CliResult<Vec<LeaveRequest>> {
    Ok(ctx.api.leave_history().await?)
}

pub async fn submit(
    ctx: &AppContext,
    request: NewLeaveRequest,
    support_file: Option<&Path>,
) -> CliResult<MessageView> {
    if let Some(path) = support_file {
        if !path.is_file() {
            return Err(CliError::InvalidArgument(format!(
                "support file not found: {}",
                path.display()
            )));
        }
    }

    let message = ctx.api.submit_leave(&request, support_file).await?;
    Ok(MessageView::ok(message.or_else(|| Some("Leave request submitted".to_string()))))
}

/// Builds the request from command line values.
pub fn new_request(
    reason: String,
    description: Option<String>,
    start_date: NaiveDate,
    end_date: NaiveDate,
    duration: String,
) -> NewLeaveRequest {
    NewLeaveRequest {
        reason,
        description,
        start_date,
        end_date,
        duration,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::state::test_context;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[tokio::test]
    async fn test_submit_rejects_reversed_dates() {
        let ctx = test_context(None).await;
        let request = new_request("Sick".into(), None, day(5), day(4), "2 days".into());

        let err = submit(&ctx, request, None).await.unwrap_err();
        assert_eq!(err.code(), ErrorCode::InvalidInput);
    }

    #[tokio::test]
    async fn test_submit_missing_file() {
        let ctx = test_context(None).await;
        let request = new_request("Sick".into(), None, day(4), day(5), "2 days".into());

        let err = submit(&ctx, request, Some(Path::new("/nonexistent/letter.pdf")))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument(_)));
    }
}
