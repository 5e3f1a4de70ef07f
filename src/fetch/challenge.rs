//! Challenge/readiness detection for the browser-rendering backend.
//!
//! The detector is a pure state machine: the browser backend navigates,
//! dwells, captures content, and feeds it in; the detector decides whether
//! the page is real, an anti-bot interstitial, or not yet settled, and
//! whether another attempt is allowed. Keeping it free of browser handles
//! makes every transition testable without Chromium.

use crate::config::ChallengeConfig;

/// What a content scan concluded about a captured page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// A challenge marker is present; the content is an interstitial.
    Challenged,
    /// An expected structural marker is present; the page is real.
    Ready,
    /// Neither signal found; the page may still be hydrating.
    Indeterminate,
}

/// Scan content for challenge markers, then for expected structural
/// markers in priority order. Challenge markers win over ready markers.
/// All scans are case-insensitive.
pub fn inspect(rules: &ChallengeConfig, html: &str) -> Verdict {
    let lowered = html.to_lowercase();
    if rules
        .challenge_markers
        .iter()
        .any(|m| lowered.contains(&m.to_lowercase()))
    {
        return Verdict::Challenged;
    }
    if rules
        .ready_markers
        .iter()
        .any(|m| lowered.contains(&m.to_lowercase()))
    {
        return Verdict::Ready;
    }
    Verdict::Indeterminate
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectorState {
    Navigating,
    Waiting,
    Checking,
    Ready,
    Challenged,
    Exhausted,
}

/// How the caller should load the page for the next attempt. The first
/// attempt navigates fresh; later attempts reload in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    Navigate,
    Reload,
}

/// Outcome of feeding one captured page into the detector.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    /// Real content; stop and return it.
    Ready(String),
    /// Interstitial detected; cool down, then begin the next attempt.
    Challenged,
    /// Nothing conclusive; short pause, then begin the next attempt.
    Continue,
    /// Attempt budget spent; whatever was last captured (possibly
    /// nothing) goes back to the fetch chain.
    Exhausted(Option<String>),
}

/// Bounded retry state machine for one page fetch.
pub struct ChallengeDetector {
    rules: ChallengeConfig,
    max_attempts: u32,
    attempts: u32,
    state: DetectorState,
    last_content: Option<String>,
    challenged_last: bool,
}

impl ChallengeDetector {
    pub fn new(rules: ChallengeConfig) -> Self {
        let max_attempts = rules.max_attempts;
        Self {
            rules,
            max_attempts,
            attempts: 0,
            state: DetectorState::Navigating,
            last_content: None,
            challenged_last: false,
        }
    }

    pub fn state(&self) -> DetectorState {
        self.state
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Whether the most recent observation hit a challenge page.
    pub fn challenged_last(&self) -> bool {
        self.challenged_last
    }

    /// Start the next attempt. After this the caller loads the page and
    /// dwells before capturing content.
    pub fn begin_attempt(&mut self) -> NavAction {
        self.attempts += 1;
        self.state = DetectorState::Waiting;
        if self.attempts == 1 {
            NavAction::Navigate
        } else {
            NavAction::Reload
        }
    }

    /// Feed the captured content (or `None` if the capture itself failed)
    /// and get the next step.
    pub fn observe(&mut self, html: Option<String>) -> Observation {
        self.state = DetectorState::Checking;

        if let Some(content) = html {
            match inspect(&self.rules, &content) {
                Verdict::Ready => {
                    self.state = DetectorState::Ready;
                    self.challenged_last = false;
                    return Observation::Ready(content);
                }
                Verdict::Challenged => {
                    // Interstitial content is never worth keeping.
                    self.last_content = None;
                    self.challenged_last = true;
                    if self.attempts >= self.max_attempts {
                        self.state = DetectorState::Exhausted;
                        return Observation::Exhausted(None);
                    }
                    self.state = DetectorState::Challenged;
                    return Observation::Challenged;
                }
                Verdict::Indeterminate => {
                    self.challenged_last = false;
                    self.last_content = Some(content);
                }
            }
        }

        if self.attempts >= self.max_attempts {
            self.state = DetectorState::Exhausted;
            Observation::Exhausted(self.last_content.take())
        } else {
            self.state = DetectorState::Waiting;
            Observation::Continue
        }
    }
}
