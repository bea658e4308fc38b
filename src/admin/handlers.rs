use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::http::server::AppState;
use crate::media::MediaSource;
use crate::signing::UrlSigner;

const VERIFY_LIMIT: usize = 12;
const VERIFY_SIZE: &str = "m";

/// Outcome of an end-to-end configuration check.
///
/// Failures name the `step` that broke; success carries the account id, how
/// many items came back and a proxied URL for the first of them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifyReport {
    pub ok: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ig_user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_image_url: Option<String>,
}

impl VerifyReport {
    fn failed(step: &str, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            step: Some(step.to_string()),
            message: Some(message.into()),
            ig_user_id: None,
            media_count: None,
            test_image_url: None,
        }
    }
}

/// Walk token → account id → media list, stopping at the first gap.
pub async fn run_verification(media: &MediaSource, signer: &UrlSigner) -> VerifyReport {
    media.forget_account_id();

    let Some(token) = media.token() else {
        return VerifyReport::failed(
            "token",
            "No access token. Set media.access_token or the configured environment variable.",
        );
    };

    let Some(account_id) = media.account_id(&token).await else {
        return VerifyReport::failed(
            "ig_user_id",
            "Could not resolve the Instagram user id. Set media.account_id or grant pages_show_list.",
        );
    };

    let items = media.fetch_media(VERIFY_LIMIT, VERIFY_SIZE).await;
    let Some(first) = items.first() else {
        let reason = media
            .last_error()
            .unwrap_or_else(|| "no media returned".to_string());
        return VerifyReport {
            ig_user_id: Some(account_id),
            ..VerifyReport::failed("media", reason)
        };
    };

    VerifyReport {
        ok: true,
        step: None,
        message: None,
        test_image_url: Some(signer.sign(&first.image_url, VERIFY_SIZE)),
        media_count: Some(items.len()),
        ig_user_id: Some(account_id),
    }
}

pub async fn get_verify(State(state): State<AppState>) -> Json<VerifyReport> {
    let report = run_verification(&state.media, &state.signer).await;
    tracing::info!(ok = report.ok, step = ?report.step, "Verification finished");
    Json(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MediaConfig;

    #[tokio::test]
    async fn test_missing_token_stops_at_first_step() {
        let media = MediaSource::from_config(
            &MediaConfig {
                access_token: String::new(),
                access_token_env: String::new(),
                ..MediaConfig::default()
            },
            false,
        )
        .unwrap();
        let signer = UrlSigner::new(None, "/proxy");

        let report = run_verification(&media, &signer).await;
        assert!(!report.ok);
        assert_eq!(report.step.as_deref(), Some("token"));
        assert!(report.ig_user_id.is_none());
    }

    #[test]
    fn test_report_serialization_omits_empty_fields() {
        let json = serde_json::to_value(VerifyReport::failed("token", "x")).unwrap();
        assert_eq!(json, serde_json::json!({"ok": false, "step": "token", "message": "x"}));
    }
}
