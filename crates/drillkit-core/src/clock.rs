//! Countdown and stopwatch primitives.
//!
//! A [`Clock`] holds at most one live countdown. Arming a new countdown
//! cancels the previous one, and every countdown is identified by a
//! [`ClockTicket`]; an expiry that presents a ticket which is no longer live
//! is stale and must be ignored. Time is read from `tokio::time::Instant` so
//! tests can drive it with a paused runtime clock.

use std::time::Duration;

use tokio::time::Instant;

/// What an expiring countdown ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockScope {
    /// The current item; expiry scores it as a timeout and moves on.
    Item,
    /// The whole session; expiry completes it.
    Session,
}

/// Identity of one armed countdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockTicket {
    generation: u64,
    scope: ClockScope,
}

impl ClockTicket {
    pub fn scope(&self) -> ClockScope {
        self.scope
    }
}

#[derive(Debug, Clone, Copy)]
enum Countdown {
    Running { deadline: Instant },
    Paused { remaining: Duration },
}

#[derive(Debug, Clone, Copy)]
struct Live {
    ticket: ClockTicket,
    countdown: Countdown,
}

/// Owner of the single live countdown of a session.
#[derive(Debug, Default)]
pub struct Clock {
    generation: u64,
    live: Option<Live>,
}

impl Clock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a countdown of `budget`, cancelling whatever was live.
    pub fn arm(&mut self, scope: ClockScope, budget: Duration, now: Instant) -> ClockTicket {
        self.generation += 1;
        let ticket = ClockTicket {
            generation: self.generation,
            scope,
        };
        self.live = Some(Live {
            ticket,
            countdown: Countdown::Running {
                deadline: now + budget,
            },
        });
        ticket
    }

    /// Cancel the live countdown, if any.
    pub fn cancel(&mut self) -> Option<ClockTicket> {
        self.live.take().map(|live| live.ticket)
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(live) = self.live.as_mut() {
            if let Countdown::Running { deadline } = live.countdown {
                live.countdown = Countdown::Paused {
                    remaining: deadline.saturating_duration_since(now),
                };
            }
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if let Some(live) = self.live.as_mut() {
            if let Countdown::Paused { remaining } = live.countdown {
                live.countdown = Countdown::Running {
                    deadline: now + remaining,
                };
            }
        }
    }

    pub fn is_live(&self, ticket: ClockTicket) -> bool {
        self.live.is_some_and(|live| live.ticket == ticket)
    }

    pub fn scope(&self) -> Option<ClockScope> {
        self.live.map(|live| live.ticket.scope)
    }

    pub fn is_paused(&self) -> bool {
        matches!(
            self.live,
            Some(Live {
                countdown: Countdown::Paused { .. },
                ..
            })
        )
    }

    /// Time left on the live countdown.
    pub fn remaining(&self, now: Instant) -> Option<Duration> {
        self.live.map(|live| match live.countdown {
            Countdown::Running { deadline } => deadline.saturating_duration_since(now),
            Countdown::Paused { remaining } => remaining,
        })
    }

    /// When the live countdown fires. `None` if nothing is armed or it is paused.
    pub fn deadline(&self) -> Option<(Instant, ClockTicket)> {
        match self.live {
            Some(Live {
                ticket,
                countdown: Countdown::Running { deadline },
            }) => Some((deadline, ticket)),
            _ => None,
        }
    }

    /// Consume an expiry. Returns `true` only for the live, running
    /// countdown; stale or paused tickets leave the clock untouched.
    pub fn expire(&mut self, ticket: ClockTicket) -> bool {
        match self.live {
            Some(Live {
                ticket: live,
                countdown: Countdown::Running { .. },
            }) if live == ticket => {
                self.live = None;
                true
            }
            _ => false,
        }
    }
}

/// Accumulates active time, excluding paused stretches.
#[derive(Debug, Clone, Copy, Default)]
pub struct Stopwatch {
    accumulated: Duration,
    running_since: Option<Instant>,
}

impl Stopwatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to zero and start running.
    pub fn restart(&mut self, now: Instant) {
        self.accumulated = Duration::ZERO;
        self.running_since = Some(now);
    }

    pub fn pause(&mut self, now: Instant) {
        if let Some(since) = self.running_since.take() {
            self.accumulated += now.saturating_duration_since(since);
        }
    }

    pub fn resume(&mut self, now: Instant) {
        if self.running_since.is_none() {
            self.running_since = Some(now);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running_since.is_some()
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        match self.running_since {
            Some(since) => self.accumulated + now.saturating_duration_since(since),
            None => self.accumulated,
        }
    }
}
