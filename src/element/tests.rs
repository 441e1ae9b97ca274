//! ElementInteractor unit tests

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::driver::mock::{MockBrowser, MockElement, MockPage};
use crate::driver::traits::{BrowserHandle, ElementHandle, PageHandle};
use crate::element::{ElementInteractor, Locator};
use crate::error::Error;

fn harness(default_timeout: Duration) -> (Arc<MockBrowser>, Arc<MockPage>, ElementInteractor) {
    let browser = MockBrowser::new();
    let page = browser.page(0).expect("mock browser has an initial page");
    let interactor = ElementInteractor::new(
        Arc::clone(&browser) as Arc<dyn BrowserHandle>,
        Arc::clone(&page) as Arc<dyn PageHandle>,
        default_timeout,
    );
    (browser, page, interactor)
}

fn install(page: &MockPage, selector: &str) -> Arc<MockElement> {
    let element = Arc::new(MockElement::new(selector));
    page.install_element(selector, Arc::clone(&element));
    element
}

#[tokio::test]
async fn test_find_element_returns_handle() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#login");
    element.set_text("Login");

    let handle = interactor.find_element("#login").await.unwrap();
    assert_eq!(handle.text().await.unwrap(), "Login");
}

#[tokio::test]
async fn test_find_element_missing_reports_not_found() {
    let (_browser, _page, interactor) = harness(Duration::from_millis(200));

    let result = interactor.find_element("#ghost").await;
    assert!(matches!(result, Err(Error::ElementNotFound(_))));
}

#[tokio::test]
async fn test_wait_visible_after_probe_countdown() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#banner");
    element.set_visible_after(3);

    let started = Instant::now();
    interactor.wait_visible("#banner", None).await.unwrap();

    // Three probes reported not-visible first, 100ms apart.
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_wait_visible_timeout_is_bounded() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#banner");
    element.set_visible(false);

    let started = Instant::now();
    let err = interactor
        .wait_visible("#banner", Some(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("not found or not visible"));
    assert!(started.elapsed() >= Duration::from_millis(300));
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_wait_visible_swallows_transient_probe_errors() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#banner");
    element.fail_visibility_probes(2);

    let started = Instant::now();
    interactor.wait_visible("#banner", None).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(200));
}

#[tokio::test]
async fn test_is_visible_never_throws() {
    let (_browser, page, interactor) = harness(Duration::from_millis(300));

    assert!(!interactor.is_visible("#missing").await);

    install(&page, "#present");
    assert!(interactor.is_visible("#present").await);
}

#[tokio::test]
async fn test_xpath_locators_resolve() {
    let (_browser, page, interactor) = harness(Duration::from_millis(500));
    install(&page, "//button[@type='submit']");

    assert!(interactor.is_visible("//button[@type='submit']").await);
}

#[tokio::test]
async fn test_click_waits_for_clickable() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#submit");
    element.set_visible_after(2);

    interactor.click("#submit").await.unwrap();
    assert_eq!(element.click_count(), 1);
}

#[tokio::test]
async fn test_wait_clickable_reports_disabled() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#submit");
    element.set_enabled(false);

    let err = interactor
        .wait_clickable("#submit", Some(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("Element is disabled"));
}

#[tokio::test]
async fn test_wait_clickable_reports_invisible() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#submit");
    element.set_visible(false);

    let err = interactor
        .wait_clickable("#submit", Some(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("not clickable within"));
    assert!(err.to_string().contains("not found or not visible"));
}

#[tokio::test]
async fn test_click_if_present_skips_missing_element() {
    let (_browser, page, interactor) = harness(Duration::from_millis(300));

    assert!(!interactor.click_if_present("#maybe").await.unwrap());

    let element = install(&page, "#there");
    assert!(interactor.click_if_present("#there").await.unwrap());
    assert_eq!(element.click_count(), 1);
}

#[tokio::test]
async fn test_clear_text_skips_blank_field() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "input#q");
    element.set_value("   ");

    assert!(interactor.clear_text("input#q").await.unwrap());
    assert_eq!(element.clear_calls(), 0);
}

#[tokio::test]
async fn test_clear_text_retries_sticky_field() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "input#q");
    element.set_value("persistent");
    element.set_sticky_clears(3);

    let started = Instant::now();
    assert!(interactor.clear_text("input#q").await.unwrap());

    // Initial clear plus three paced retries before the field stayed empty.
    assert_eq!(element.clear_calls(), 4);
    assert!(started.elapsed() >= Duration::from_millis(600));
    assert_eq!(element.input_value().await.unwrap(), "");
}

#[tokio::test]
async fn test_clear_text_gives_up_after_budget() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "input#q");
    element.set_value("sticky");
    element.set_sticky_clears(10);

    assert!(!interactor.clear_text("input#q").await.unwrap());
    assert_eq!(element.clear_calls(), 6);
    assert_eq!(element.input_value().await.unwrap(), "sticky");
}

#[tokio::test]
async fn test_set_text_fills_even_when_clear_fails() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "input#q");
    element.set_value("old");
    element.set_sticky_clears(10);

    let started = Instant::now();
    interactor.set_text("input#q", "new").await.unwrap();

    // Retries run back to back here, so exhaustion must still be fast.
    assert!(started.elapsed() < Duration::from_secs(1));
    assert_eq!(element.clear_calls(), 6);
    assert_eq!(element.fills(), vec!["new".to_string()]);
    assert_eq!(element.input_value().await.unwrap(), "new");
}

#[tokio::test]
async fn test_set_text_skips_clear_for_empty_field() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "input#q");

    interactor.set_text("input#q", "hello").await.unwrap();
    assert_eq!(element.clear_calls(), 0);
    assert_eq!(element.fills(), vec!["hello".to_string()]);
}

#[tokio::test]
async fn test_set_text_accepts_display_values() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "input#amount");

    interactor.set_text("input#amount", 42).await.unwrap();
    assert_eq!(element.fills(), vec!["42".to_string()]);
}

#[tokio::test]
async fn test_get_text_and_verify_text() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#msg");
    element.set_text("Welcome back");

    assert_eq!(interactor.get_text("#msg").await.unwrap(), "Welcome back");
    assert!(interactor.verify_text("#msg", "Welcome back").await.unwrap());
    assert!(!interactor.verify_text("#msg", "Goodbye").await.unwrap());
}

#[tokio::test]
async fn test_scroll_to_returns_handle() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#footer");

    let handle = interactor.scroll_to("#footer").await.unwrap();
    assert_eq!(element.scroll_count(), 1);
    assert!(handle.is_visible().await.unwrap());
}

#[tokio::test]
async fn test_wait_present_timeout_is_bounded() {
    let (_browser, _page, interactor) = harness(Duration::from_secs(5));

    let started = Instant::now();
    let err = interactor
        .wait_present("#never", Some(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(started.elapsed() < Duration::from_secs(3));
}

#[tokio::test]
async fn test_flash_appears_then_disappears() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, ".toast");

    let worker = Arc::clone(&element);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        worker.set_present(false);
    });

    let started = Instant::now();
    interactor
        .wait_flash_present_then_gone(".toast", None, None)
        .await
        .unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_flash_that_never_shows_fails() {
    let (_browser, _page, interactor) = harness(Duration::from_secs(5));

    let err = interactor
        .wait_flash_present_then_gone(".ghost", Some(Duration::from_millis(200)), None)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("not present"));
}

#[tokio::test]
async fn test_wait_disappeared_sees_late_removal() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "#modal");

    let worker = Arc::clone(&element);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        worker.set_visible(false);
    });

    let started = Instant::now();
    interactor.wait_disappeared("#modal", None).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_wait_disappeared_times_out_on_stuck_element() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    install(&page, "#modal");

    let err = interactor
        .wait_disappeared("#modal", Some(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("did not disappear"));
}

#[tokio::test]
async fn test_wait_has_value_swallows_read_errors() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "input#token");
    element.set_value("ready");
    element.fail_value_reads(2);

    interactor.wait_has_value("input#token", None).await.unwrap();
}

#[tokio::test]
async fn test_wait_has_value_sees_late_value() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "input#token");

    let worker = Arc::clone(&element);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        worker.set_value("abc123");
    });

    let started = Instant::now();
    interactor.wait_has_value("input#token", None).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_wait_has_value_ignores_whitespace() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));
    let element = install(&page, "input#token");
    element.set_value("  ");

    let err = interactor
        .wait_has_value("input#token", Some(Duration::from_millis(300)))
        .await
        .unwrap_err();

    assert!(err.is_timeout());
    assert!(err.to_string().contains("did not get a value"));
}

#[tokio::test]
async fn test_switch_to_new_window() {
    let (browser, page, mut interactor) = harness(Duration::from_secs(5));
    let original_id = page.id().to_string();

    let opener = Arc::clone(&browser);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        opener.open_extra_page();
    });

    let new_page = interactor.switch_to_new_window(None).await.unwrap();
    assert_ne!(new_page.id(), original_id);
    assert_eq!(interactor.page().id(), new_page.id());

    // The new window was brought to front exactly once.
    assert_eq!(browser.page(1).unwrap().front_switch_count(), 1);
}

#[tokio::test]
async fn test_switch_times_out_without_new_window() {
    let (_browser, _page, mut interactor) = harness(Duration::from_secs(5));

    let err = interactor
        .switch_to_new_window(Some(Duration::from_millis(400)))
        .await
        .unwrap_err();
    assert!(err.is_timeout());
}

#[tokio::test]
async fn test_close_window_and_switch_back() {
    let (browser, page, mut interactor) = harness(Duration::from_secs(5));
    let original = interactor.page();
    browser.open_extra_page();
    browser.open_extra_page();

    interactor
        .close_window_and_switch_back(original)
        .await
        .unwrap();

    assert!(browser.page(1).unwrap().is_closed());
    assert!(browser.page(2).unwrap().is_closed());
    assert!(!page.is_closed());
    assert_eq!(interactor.page().id(), page.id());
    assert_eq!(page.front_switch_count(), 1);
}

#[tokio::test]
async fn test_switch_back_to_closed_original_fails() {
    let (_browser, _page, mut interactor) = harness(Duration::from_secs(5));
    let original = interactor.page();
    original.close().await.unwrap();

    let result = interactor.close_window_and_switch_back(original).await;
    assert!(matches!(result, Err(Error::InvalidState(_))));
}

#[tokio::test]
async fn test_act_delegates_to_page() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));

    interactor.act("click the login button").await.unwrap();
    assert_eq!(page.actions(), vec!["click the login button".to_string()]);

    page.fail_acts();
    assert!(matches!(interactor.act("again").await, Err(Error::Act(_))));
}

#[tokio::test]
async fn test_open_url_and_refresh() {
    let (_browser, page, interactor) = harness(Duration::from_secs(5));

    interactor.open_url("https://example.com/login").await.unwrap();
    assert_eq!(
        page.navigations(),
        vec!["https://example.com/login".to_string()]
    );

    interactor.refresh_page().await.unwrap();
    assert_eq!(page.reload_count(), 1);

    install(&page, "#ready");
    interactor
        .refresh_and_wait_visible("#ready", None)
        .await
        .unwrap();
    assert_eq!(page.reload_count(), 2);

    interactor.wait_for_page_loaded().await.unwrap();
}

#[tokio::test]
async fn test_handle_locator_skips_page_query() {
    let (_browser, _page, interactor) = harness(Duration::from_secs(5));
    // Never installed on the page; only reachable through the handle.
    let element = Arc::new(MockElement::new("#detached"));
    let handle = Arc::clone(&element) as Arc<dyn ElementHandle>;

    interactor
        .wait_visible(Locator::handle(Arc::clone(&handle)), None)
        .await
        .unwrap();
    interactor.click(Locator::handle(handle)).await.unwrap();
    assert_eq!(element.click_count(), 1);
}

#[tokio::test]
async fn test_handle_locator_probes_live_state() {
    let (_browser, _page, interactor) = harness(Duration::from_secs(5));
    let element = Arc::new(MockElement::new(".toast"));
    let locator = Locator::from(Arc::clone(&element) as Arc<dyn ElementHandle>);

    let worker = Arc::clone(&element);
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(300)).await;
        worker.set_visible(false);
    });

    let started = Instant::now();
    interactor.wait_disappeared(locator, None).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(300));
}

#[tokio::test]
async fn test_set_text_through_resolved_handle() {
    let (_browser, _page, interactor) = harness(Duration::from_secs(5));
    let element = Arc::new(MockElement::new("input#q"));
    element.set_value("old");
    let handle = Arc::clone(&element) as Arc<dyn ElementHandle>;

    interactor
        .set_text(Locator::handle(handle), "new")
        .await
        .unwrap();
    assert_eq!(element.clear_calls(), 1);
    assert_eq!(element.fills(), vec!["new".to_string()]);
}
