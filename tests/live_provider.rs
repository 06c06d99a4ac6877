#![cfg(feature = "live_provider")]
//! Calls the configured provider. Needs OPENAI_API_KEY.

use compare_brief::brief::{BriefRequest, COLUMN_COUNT};
use compare_brief::config::Config;
use compare_brief::service::BriefService;

#[tokio::test]
async fn live_brief_has_full_shape() {
    let config = Config::load().expect("config loads");
    if !config.has_credential() {
        eprintln!("OPENAI_API_KEY not set, skipping");
        return;
    }
    let service = BriefService::from_config(&config).expect("client builds");
    let brief = service
        .generate(&BriefRequest::new("best noise cancelling headphones for calls"))
        .await
        .expect("live generation succeeds");

    assert!(brief.mode.is_none());
    assert_eq!(brief.columns.len(), COLUMN_COUNT);
    assert_eq!(brief.column_help.len(), COLUMN_COUNT);
    assert!(brief.rows.iter().all(|r| r.values.len() == COLUMN_COUNT));
}
