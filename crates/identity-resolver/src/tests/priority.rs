//! Source ordering when the caller does not wait.

use super::harness::Fixture;
use crate::IdentitySource;

#[tokio::test]
async fn host_sdk_wins_over_cache_and_url() {
    let fixture = Fixture::new().with_launch_query("user_id=3");
    fixture.host.set_init_data(Some("user_id=1".to_string()));
    fixture.credentials.set_cross_message_payload("user_id=2").unwrap();

    let envelope = fixture.resolver().resolve(false).await.unwrap();
    assert_eq!(envelope.source(), IdentitySource::HostSdk);
    assert_eq!(envelope.field("user_id"), Some("1"));
}

#[tokio::test]
async fn cached_message_wins_over_url() {
    let fixture = Fixture::new().with_launch_query("user_id=3");
    fixture.credentials.set_cross_message_payload("user_id=2").unwrap();

    let envelope = fixture.resolver().resolve(false).await.unwrap();
    assert_eq!(envelope.source(), IdentitySource::CrossMessage);
    assert_eq!(envelope.field("user_id"), Some("2"));
}

#[tokio::test]
async fn url_params_used_last() {
    let fixture = Fixture::new()
        .without_host()
        .with_launch_query("initData=user_id%3D3%26first_name%3DCy");

    let envelope = fixture.resolver().resolve(false).await.unwrap();
    assert_eq!(envelope.source(), IdentitySource::UrlParams);
    assert_eq!(envelope.field("first_name"), Some("Cy"));
}

#[tokio::test]
async fn unparseable_sdk_payload_falls_through() {
    let fixture = Fixture::new().with_launch_query("user_id=3");
    fixture.host.set_init_data(Some("garbage".to_string()));

    let envelope = fixture.resolver().resolve(false).await.unwrap();
    assert_eq!(envelope.source(), IdentitySource::UrlParams);
}

#[tokio::test]
async fn nothing_available_without_wait_is_none() {
    let fixture = Fixture::new();
    assert!(fixture.resolver().resolve(false).await.is_none());
    assert_eq!(fixture.bus.listener_count(), 0);
}
