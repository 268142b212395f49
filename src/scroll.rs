use crate::config::ScrollConfig;
use crate::error::{ComicSaverError, Result};
use crate::models::ScrollOutcome;
use crate::traits::PageDriver;
use indicatif::{ProgressBar, ProgressStyle};
use tracing::{debug, info, warn};

pub const SCROLL_SCRIPT: &str = "window.scrollBy(0, window.innerHeight); true";
pub const HEIGHT_SCRIPT: &str = "document.body.scrollHeight";
pub const BOTTOM_SCRIPT: &str = "window.pageYOffset + window.innerHeight";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScrollPhase {
    Scrolling,
    CheckingBottom,
    Stable,
    BoundReached,
}

impl ScrollPhase {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ScrollPhase::Stable | ScrollPhase::BoundReached)
    }
}

/// One reading taken after a scroll step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollProbe {
    pub height: i64,
    /// Scroll offset plus viewport height.
    pub bottom: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollLimits {
    pub stable_streak: u32,
    pub max_attempts: u32,
}

impl From<&ScrollConfig> for ScrollLimits {
    fn from(config: &ScrollConfig) -> Self {
        Self {
            stable_streak: config.stable_streak.max(1),
            max_attempts: config.max_attempts.max(1),
        }
    }
}

/// Stabilization state for one issue page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScrollState {
    pub last_height: i64,
    pub attempt_count: u32,
    pub no_change_streak: u32,
}

impl ScrollState {
    pub fn new(initial_height: i64) -> Self {
        Self {
            last_height: initial_height,
            attempt_count: 0,
            no_change_streak: 0,
        }
    }

    /// Transition out of `Scrolling` after one scroll step has settled.
    pub fn observe_scroll(&mut self, probe: ScrollProbe, limits: &ScrollLimits) -> ScrollPhase {
        self.attempt_count += 1;

        if probe.height == self.last_height && probe.bottom >= probe.height {
            return ScrollPhase::CheckingBottom;
        }

        self.no_change_streak = 0;
        self.last_height = probe.height;
        self.continue_or_bound(limits)
    }

    /// Transition out of `CheckingBottom` after the confirmation pause.
    pub fn observe_confirmation(&mut self, height: i64, limits: &ScrollLimits) -> ScrollPhase {
        if height != self.last_height {
            self.no_change_streak = 0;
            self.last_height = height;
            return self.continue_or_bound(limits);
        }

        self.no_change_streak += 1;
        if self.no_change_streak >= limits.stable_streak {
            ScrollPhase::Stable
        } else {
            self.continue_or_bound(limits)
        }
    }

    fn continue_or_bound(&self, limits: &ScrollLimits) -> ScrollPhase {
        if self.attempt_count >= limits.max_attempts {
            ScrollPhase::BoundReached
        } else {
            ScrollPhase::Scrolling
        }
    }
}

/// Scrolls a loaded page until lazily attached content stops arriving.
pub struct ScrollStabilizer<'a> {
    driver: &'a dyn PageDriver,
    config: &'a ScrollConfig,
    progress: bool,
}

impl<'a> ScrollStabilizer<'a> {
    pub fn new(driver: &'a dyn PageDriver, config: &'a ScrollConfig, progress: bool) -> Self {
        Self {
            driver,
            config,
            progress,
        }
    }

    pub async fn stabilize(&self) -> Result<ScrollOutcome> {
        let limits = ScrollLimits::from(self.config);
        let mut state = ScrollState::new(self.read_i64(HEIGHT_SCRIPT).await?);
        let mut phase = ScrollPhase::Scrolling;
        let bar = self.progress_bar(limits.max_attempts);

        info!("Scrolling to load all images...");
        while !phase.is_terminal() {
            phase = match phase {
                ScrollPhase::Scrolling => {
                    self.driver.evaluate(SCROLL_SCRIPT).await?;
                    tokio::time::sleep(self.config.settle()).await;

                    let probe = ScrollProbe {
                        height: self.read_i64(HEIGHT_SCRIPT).await?,
                        bottom: self.read_i64(BOTTOM_SCRIPT).await?,
                    };
                    let next = state.observe_scroll(probe, &limits);
                    bar.set_position(state.attempt_count as u64);
                    next
                }
                ScrollPhase::CheckingBottom => {
                    bar.set_message(format!(
                        "checking bottom {}/{}",
                        state.no_change_streak + 1,
                        limits.stable_streak
                    ));
                    tokio::time::sleep(self.config.confirm()).await;

                    let height = self.read_i64(HEIGHT_SCRIPT).await?;
                    let next = state.observe_confirmation(height, &limits);
                    if next == ScrollPhase::Scrolling && state.no_change_streak == 0 {
                        bar.set_message("");
                    }
                    next
                }
                terminal => terminal,
            };
            debug!(
                "Scroll phase {:?} (attempt {}, height {}, streak {})",
                phase, state.attempt_count, state.last_height, state.no_change_streak
            );
        }
        bar.finish_and_clear();

        if phase == ScrollPhase::Stable {
            info!("Reached bottom of page (confirmed) after {} steps", state.attempt_count);
            Ok(ScrollOutcome::Stable {
                attempts: state.attempt_count,
            })
        } else {
            warn!(
                "Page kept growing after {} scroll steps, continuing with what has loaded",
                state.attempt_count
            );
            Ok(ScrollOutcome::BoundReached {
                attempts: state.attempt_count,
            })
        }
    }

    async fn read_i64(&self, script: &str) -> Result<i64> {
        let value = self.driver.evaluate(script).await?;
        value
            .as_i64()
            .or_else(|| value.as_f64().map(|f| f.round() as i64))
            .ok_or_else(|| ComicSaverError::script(format!("`{}` returned {}", script, value)))
    }

    fn progress_bar(&self, len: u32) -> ProgressBar {
        if !self.progress {
            return ProgressBar::hidden();
        }
        let bar = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::with_template("Scrolling {bar:30} {pos}/{len} {msg}") {
            bar.set_style(style);
        }
        bar
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeDriver;

    fn limits() -> ScrollLimits {
        ScrollLimits {
            stable_streak: 3,
            max_attempts: 150,
        }
    }

    fn quick_config(max_attempts: u32) -> ScrollConfig {
        ScrollConfig {
            settle_ms: 0,
            confirm_ms: 0,
            max_attempts,
            ..ScrollConfig::default()
        }
    }

    #[test]
    fn test_growth_keeps_scrolling() {
        let mut state = ScrollState::new(1000);
        state.no_change_streak = 2;

        let phase = state.observe_scroll(ScrollProbe { height: 2000, bottom: 2000 }, &limits());
        assert_eq!(phase, ScrollPhase::Scrolling);
        assert_eq!(state.no_change_streak, 0);
        assert_eq!(state.last_height, 2000);
        assert_eq!(state.attempt_count, 1);
    }

    #[test]
    fn test_not_at_bottom_keeps_scrolling() {
        let mut state = ScrollState::new(3000);
        let phase = state.observe_scroll(ScrollProbe { height: 3000, bottom: 2000 }, &limits());
        assert_eq!(phase, ScrollPhase::Scrolling);
    }

    #[test]
    fn test_bottom_moves_to_confirmation() {
        let mut state = ScrollState::new(3000);
        let phase = state.observe_scroll(ScrollProbe { height: 3000, bottom: 3000 }, &limits());
        assert_eq!(phase, ScrollPhase::CheckingBottom);
    }

    #[test]
    fn test_growth_during_confirmation_resets_streak() {
        let mut state = ScrollState::new(3000);
        state.no_change_streak = 2;

        let phase = state.observe_confirmation(3500, &limits());
        assert_eq!(phase, ScrollPhase::Scrolling);
        assert_eq!(state.no_change_streak, 0);
        assert_eq!(state.last_height, 3500);
    }

    #[test]
    fn test_streak_threshold_reaches_stable() {
        let mut state = ScrollState::new(3000);
        assert_eq!(state.observe_confirmation(3000, &limits()), ScrollPhase::Scrolling);
        assert_eq!(state.observe_confirmation(3000, &limits()), ScrollPhase::Scrolling);
        assert_eq!(state.observe_confirmation(3000, &limits()), ScrollPhase::Stable);
    }

    #[test]
    fn test_attempt_bound() {
        let limits = ScrollLimits {
            stable_streak: 3,
            max_attempts: 2,
        };
        let mut state = ScrollState::new(0);
        assert_eq!(
            state.observe_scroll(ScrollProbe { height: 100, bottom: 50 }, &limits),
            ScrollPhase::Scrolling
        );
        assert_eq!(
            state.observe_scroll(ScrollProbe { height: 200, bottom: 100 }, &limits),
            ScrollPhase::BoundReached
        );
    }

    #[tokio::test]
    async fn test_stabilizes_once_height_stops_growing() {
        let driver = FakeDriver::with_heights(vec![1000, 2000, 3000], 1000);
        let config = quick_config(150);

        let outcome = ScrollStabilizer::new(&driver, &config, false).stabilize().await.unwrap();

        // two growing steps, then three confirmed bottom readings
        assert_eq!(outcome, ScrollOutcome::Stable { attempts: 5 });
    }

    #[tokio::test]
    async fn test_bound_reached_when_page_keeps_growing() {
        let driver = FakeDriver::growing(1000);
        let config = quick_config(150);

        let outcome = ScrollStabilizer::new(&driver, &config, false).stabilize().await.unwrap();

        assert_eq!(outcome, ScrollOutcome::BoundReached { attempts: 150 });
        assert_eq!(driver.scroll_count(), 150);
    }

    #[tokio::test]
    async fn test_short_page_is_stable_immediately() {
        let driver = FakeDriver::with_heights(vec![800], 1000);
        let config = quick_config(150);

        let outcome = ScrollStabilizer::new(&driver, &config, false).stabilize().await.unwrap();
        assert_eq!(outcome, ScrollOutcome::Stable { attempts: 3 });
    }
}
