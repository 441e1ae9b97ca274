//! End-to-end harness tests
//!
//! These tests validate complete workflows from session acquisition through
//! element interaction to guaranteed teardown, running over the mock driver.

use std::sync::Arc;
use std::time::Duration;

use tokio_test::assert_ok;

use webrig::config::{Config, ModelConfig};
use webrig::driver::{BrowserDriver, MockDriver, MockElement};
use webrig::element::Locator;
use webrig::session::SessionManager;
use webrig::Error;

/// Config with a short settle delay so teardown-heavy tests stay fast
fn fast_config() -> Config {
    Config {
        settle_delay: 10,
        ..Default::default()
    }
}

fn harness() -> (Arc<MockDriver>, SessionManager) {
    let driver = Arc::new(MockDriver::new());
    let manager = SessionManager::new(
        Arc::clone(&driver) as Arc<dyn BrowserDriver>,
        fast_config(),
    );
    (driver, manager)
}

/// Test 1: Session lifecycle from acquire to release
#[tokio::test]
async fn test_session_lifecycle() {
    let (driver, manager) = harness();

    let session = assert_ok!(
        manager
            .acquire("desktop", true, ModelConfig::default())
            .await
    );

    // The launch carried the emulation plan.
    let options = driver.launch_options();
    assert_eq!(options.len(), 1);
    assert_eq!(options[0].window_width, 1920);
    assert_eq!(options[0].window_height, 1080);
    assert_eq!(options[0].debug_port, session.debug_port());

    // The session owns live, isolated resources.
    assert!(session.scratch_path().is_dir());
    assert!((9222..=10222).contains(&session.debug_port()));
    assert!(!session.is_released());

    let scratch = session.scratch_path().to_path_buf();
    manager.release(&session).await;

    assert!(session.is_released());
    assert!(!scratch.exists());
    assert!(!driver.browsers()[0].is_active());
}

/// Test 2: Scoped session returns the body's value and still tears down
#[tokio::test]
async fn test_scoped_session_returns_result() {
    let (driver, manager) = harness();

    let title = manager
        .scoped("mobile", true, ModelConfig::default(), |session| {
            let driver = Arc::clone(&driver);
            async move {
                driver.browsers()[0].page(0).unwrap().set_title("Checkout");
                session.page().title().await
            }
        })
        .await
        .unwrap();

    assert_eq!(title, "Checkout");
    assert!(!driver.browsers()[0].is_active());
}

/// Test 3: Scoped session cleans up when the body fails
#[tokio::test]
async fn test_scoped_session_cleans_up_on_failure() {
    let (driver, manager) = harness();

    let outcome: webrig::Result<()> = manager
        .scoped("desktop", true, ModelConfig::default(), |_session| async {
            Err(Error::timeout("order confirmation never appeared"))
        })
        .await;

    assert!(outcome.unwrap_err().is_timeout());
    assert!(!driver.browsers()[0].is_active());
}

/// Test 4: Login form workflow with a stubborn prefilled field
#[tokio::test]
async fn test_login_form_workflow() {
    let (driver, manager) = harness();
    let session = manager
        .acquire("desktop", true, ModelConfig::default())
        .await
        .unwrap();
    let page = driver.browsers()[0].page(0).unwrap();

    // A remembered email whose change handler restores it once.
    let email = Arc::new(MockElement::new("#email"));
    email.set_value("stale@example.com");
    email.set_sticky_clears(1);
    page.install_element("#email", Arc::clone(&email));

    let submit = Arc::new(MockElement::new("#submit"));
    page.install_element("#submit", Arc::clone(&submit));

    let spinner = Arc::new(MockElement::new(".spinner"));
    page.install_element(".spinner", Arc::clone(&spinner));

    let interactor = session.interactor();
    interactor
        .open_url("https://example.com/login")
        .await
        .unwrap();
    assert_eq!(page.navigations(), vec!["https://example.com/login"]);

    interactor
        .set_text(Locator::css("#email"), "user@example.com")
        .await
        .unwrap();
    // The first clear bounced, so the fill needed a second one.
    assert_eq!(email.clear_calls(), 2);
    assert_eq!(email.fills(), vec!["user@example.com"]);

    interactor.click("#submit").await.unwrap();
    assert_eq!(submit.click_count(), 1);

    spinner.set_present(false);
    interactor
        .wait_disappeared(".spinner", Some(Duration::from_millis(200)))
        .await
        .unwrap();

    manager.release(&session).await;
}

/// Test 5: Popup window workflow with switch and switch back
#[tokio::test]
async fn test_popup_window_workflow() {
    let (driver, manager) = harness();
    let session = manager
        .acquire("desktop", true, ModelConfig::default())
        .await
        .unwrap();

    let browser = driver.browsers()[0].clone();
    let original = session.page();
    let mut interactor = session.interactor();

    // No popup yet, so the wait runs out.
    let err = interactor
        .switch_to_new_window(Some(Duration::from_millis(100)))
        .await
        .unwrap_err();
    assert!(err.is_timeout());

    // The popup opens and the interactor repoints to it.
    let popup = browser.open_extra_page();
    popup.set_title("Terms of Service");
    let switched = interactor
        .switch_to_new_window(Some(Duration::from_secs(2)))
        .await
        .unwrap();
    assert_eq!(switched.id(), popup.id());
    assert!(popup.front_switch_count() >= 1);
    assert_eq!(interactor.page().title().await.unwrap(), "Terms of Service");

    // Closing extra windows lands us back where we started.
    interactor
        .close_window_and_switch_back(Arc::clone(&original))
        .await
        .unwrap();
    assert!(popup.is_closed());
    assert_eq!(interactor.page().id(), original.id());

    manager.release(&session).await;
}

/// Test 6: Launch failure surfaces and leaves no scratch directories behind
#[tokio::test]
async fn test_launch_failure_leaves_no_scratch() {
    let root = tempfile::tempdir().unwrap();
    let config = Config {
        scratch_root: Some(root.path().to_path_buf()),
        settle_delay: 10,
        ..Default::default()
    };
    let manager = SessionManager::new(Arc::new(MockDriver::failing()), config);

    let err = manager
        .acquire("desktop", true, ModelConfig::default())
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Launch(_)));
    let leftovers: Vec<_> = std::fs::read_dir(root.path()).unwrap().collect();
    assert!(leftovers.is_empty());
}

/// Test 7: Back-to-back sessions never share resources
#[tokio::test]
async fn test_sessions_are_isolated() {
    let (_driver, manager) = harness();

    let first = manager
        .acquire("desktop", true, ModelConfig::default())
        .await
        .unwrap();
    let first_scratch = first.scratch_path().to_path_buf();
    manager.release(&first).await;

    let second = manager
        .acquire("desktop", true, ModelConfig::default())
        .await
        .unwrap();

    assert_ne!(first.id(), second.id());
    assert_ne!(first_scratch, second.scratch_path().to_path_buf());
    manager.release(&second).await;
}
