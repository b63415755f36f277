//! Position tracking for the current song
//!
//! The engine only reports the position of whatever it is playing now, so
//! by the time an item-changed event arrives the outgoing song's position
//! is gone. The clock keeps it.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct PositionClock {
    anchor: Duration,
    running_since: Option<Instant>,
}

impl PositionClock {
    pub(crate) fn reset(&mut self, position: Duration, running: bool) {
        self.anchor = position;
        self.running_since = running.then(Instant::now);
    }

    pub(crate) fn position(&self) -> Duration {
        self.anchor + self.running_since.map_or(Duration::ZERO, |since| since.elapsed())
    }

    pub(crate) fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub(crate) fn pause(&mut self) {
        self.anchor = self.position();
        self.running_since = None;
    }

    pub(crate) fn resume(&mut self) {
        if self.running_since.is_none() {
            self.running_since = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn advances_only_while_running() {
        let mut clock = PositionClock::default();
        clock.reset(Duration::from_secs(2), true);

        tokio::time::advance(Duration::from_secs(3)).await;
        assert_eq!(clock.position(), Duration::from_secs(5));

        clock.pause();
        tokio::time::advance(Duration::from_secs(10)).await;
        assert_eq!(clock.position(), Duration::from_secs(5));

        clock.resume();
        clock.resume();
        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(clock.position(), Duration::from_secs(6));
    }
}
