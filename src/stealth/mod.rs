//! Stealth measures for the browser-rendering backend.
//!
//! Patches browser fingerprint signals and strips automation flags from
//! the Chromium launch so the rendered session resembles an ordinary
//! desktop browser.

pub mod fingerprint;

/// Chromium launch arguments that suppress automation tells.
pub fn launch_args() -> Vec<String> {
    [
        "--disable-blink-features=AutomationControlled",
        "--disable-infobars",
        "--no-sandbox",
        "--disable-dev-shm-usage",
        "--disable-gpu",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}
