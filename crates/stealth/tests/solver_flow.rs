use action_primitives::testing::{BrowserCall, MockBrowser};
use async_trait::async_trait;
use stealth::{CaptchaChallenge, CaptchaKind, CaptchaSolver, StealthError};

struct FixedSolver {
    token: Option<&'static str>,
}

#[async_trait]
impl CaptchaSolver for FixedSolver {
    async fn solve(&self, challenge: &CaptchaChallenge) -> Result<String, StealthError> {
        assert_eq!(challenge.kind, CaptchaKind::Recaptcha);
        self.token
            .map(str::to_string)
            .ok_or_else(|| StealthError::Captcha("service rejected".into()))
    }
}

const RECAPTCHA_PAGE: &str = r#"<form><div class="g-recaptcha" data-sitekey="site"></div></form>"#;

#[tokio::test]
async fn applies_solved_token_to_page() {
    let browser = MockBrowser::new().with_content(RECAPTCHA_PAGE);
    let solver = FixedSolver {
        token: Some("tok-123"),
    };
    let solved = solver.solve_on_page(&browser).await.expect("solve");
    assert!(solved);
    assert_eq!(
        browser.calls(),
        vec![BrowserCall::Type {
            target: "#g-recaptcha-response".into(),
            text: "tok-123".into(),
        }]
    );
}

#[tokio::test]
async fn reports_unsolved_captcha() {
    let browser = MockBrowser::new().with_content(RECAPTCHA_PAGE);
    let solver = FixedSolver { token: None };
    let solved = solver.solve_on_page(&browser).await.expect("solve");
    assert!(!solved);
}

#[tokio::test]
async fn pages_without_captcha_count_as_solved() {
    let browser = MockBrowser::new();
    let solver = FixedSolver { token: None };
    assert!(solver.solve_on_page(&browser).await.expect("solve"));
}
