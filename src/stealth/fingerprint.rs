//! Browser fingerprint patching — hide automation signals.

/// JavaScript injected on every new document before page scripts run.
/// Patches navigator.webdriver and friends to look like a real browser.
pub const STEALTH_SCRIPT: &str = r#"
(() => {
    // Hide webdriver flag
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true,
    });

    // Patch chrome.runtime to look like a real browser
    if (!window.chrome) {
        window.chrome = {};
    }
    if (!window.chrome.runtime) {
        window.chrome.runtime = {
            connect: function() {},
            sendMessage: function() {},
        };
    }

    // Patch plugins to appear non-empty
    Object.defineProperty(navigator, 'plugins', {
        get: () => [1, 2, 3, 4, 5],
        configurable: true,
    });

    // Patch languages
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true,
    });
})();
"#;

/// Get the stealth injection script.
pub fn stealth_script() -> &'static str {
    STEALTH_SCRIPT
}
