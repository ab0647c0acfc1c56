use action_primitives::testing::{BrowserCall, MockBrowser};
use action_primitives::{BrowserDriver, BrowserError, ScrollDirection};

#[tokio::test]
async fn records_calls_in_order() {
    let browser = MockBrowser::new().with_content("<h1>hello</h1>");
    browser.navigate("https://example.com").await.expect("navigate");
    browser.click("#go").await.expect("click");
    browser
        .scroll(ScrollDirection::Down)
        .await
        .expect("scroll");

    assert_eq!(
        browser.calls(),
        vec![
            BrowserCall::Navigate("https://example.com".into()),
            BrowserCall::Click("#go".into()),
            BrowserCall::Scroll(ScrollDirection::Down),
        ]
    );
    let snapshot = browser.snapshot().await.expect("snapshot");
    assert_eq!(snapshot.url, "https://example.com");
    assert_eq!(snapshot.content, "<h1>hello</h1>");
}

#[tokio::test]
async fn transient_failures_recover() {
    let browser = MockBrowser::new().fail_times(
        "#submit",
        1,
        BrowserError::Interaction("captcha challenge".into()),
    );
    assert!(browser.click("#submit").await.is_err());
    assert!(browser.click("#submit").await.is_ok());
}

#[tokio::test]
async fn closed_session_rejects_operations() {
    let browser = MockBrowser::new();
    browser.close().await.expect("close");
    assert!(browser.is_closed());
    assert_eq!(
        browser.click("#x").await,
        Err(BrowserError::NotInitialized)
    );
    assert!(browser.snapshot().await.is_err());
}
