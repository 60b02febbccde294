// ABOUTME: Periodic inactivity watchdog injecting roast and stall stimuli
// ABOUTME: One stimulus per tick at most; user inactivity takes priority over a stalled conversation

use crate::conversation::Speaker;
use crate::dispatcher::ResponseDispatcher;
use crate::metrics;
use rand::seq::SliceRandom;
use rand::Rng;
use tokio::time::{interval, Instant, MissedTickBehavior};

/// What a single tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickOutcome {
    /// Pause flag set; nothing inspected, nothing changed
    Paused,
    /// Roast stimulus appended and this agent dispatched
    Roast(String),
    /// Continuation stimulus appended and this agent dispatched
    Stall(String),
    /// Neither threshold crossed
    Idle,
}

pub struct InactivityWatchdog {
    dispatcher: ResponseDispatcher,
    last_roast: Instant,
}

impl InactivityWatchdog {
    pub fn new(dispatcher: ResponseDispatcher) -> Self {
        Self {
            dispatcher,
            last_roast: Instant::now(),
        }
    }

    pub fn last_roast(&self) -> Instant {
        self.last_roast
    }

    /// Evaluate both branches against `now` and inject at most one stimulus
    pub fn tick(&mut self, now: Instant) -> TickOutcome {
        let ctx = self.dispatcher.context().clone();
        if ctx.is_paused() {
            return TickOutcome::Paused;
        }

        let settings = ctx.settings();
        let (since_message, since_user, last_speaker) = ctx.with_state(|s| {
            (
                now.saturating_duration_since(s.last_message_time()),
                now.saturating_duration_since(s.last_user_message_time()),
                s.last_speaker().cloned(),
            )
        });
        let since_roast = now.saturating_duration_since(self.last_roast);

        let roast_agent = settings
            .roast_agent
            .as_deref()
            .filter(|id| ctx.agent(id).is_some());

        if let Some(roast_agent) = roast_agent {
            if since_user > settings.user_inactivity && since_roast > settings.user_inactivity {
                tracing::info!(
                    agent = %roast_agent,
                    silent_secs = since_user.as_secs(),
                    "User inactive, triggering a roast"
                );
                ctx.append(Speaker::System, settings.roast_prompt.clone());
                metrics::record_stimulus("roast");
                self.dispatcher.dispatch(roast_agent, None);
                self.last_roast = now;
                return TickOutcome::Roast(roast_agent.to_string());
            }
        }

        if since_message > settings.stall_after {
            let ids = ctx.agent_ids();
            let mut rng = rand::thread_rng();
            let Some(agent_id) = choose_stall_agent(&ids, last_speaker.as_ref(), &mut rng) else {
                return TickOutcome::Idle;
            };
            tracing::info!(
                agent = %agent_id,
                quiet_secs = since_message.as_secs(),
                "Conversation stalled, nudging an agent"
            );
            ctx.append(Speaker::System, settings.continuation_prompt.clone());
            metrics::record_stimulus("stall");
            self.dispatcher.dispatch(&agent_id, None);
            return TickOutcome::Stall(agent_id);
        }

        TickOutcome::Idle
    }

    /// Tick forever at the configured interval
    pub async fn run(mut self) {
        let period = self.dispatcher.context().settings().tick_interval;
        tracing::info!(interval_secs = period.as_secs(), "Starting inactivity watchdog");

        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // First tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let outcome = self.tick(Instant::now());
            tracing::trace!(?outcome, "Watchdog tick");
        }
    }
}

/// Pick the agent to nudge after a stall: anyone but the last speaker, or
/// anyone at all if that leaves nobody.
pub fn choose_stall_agent<R: Rng + ?Sized>(
    agent_ids: &[String],
    last_speaker: Option<&Speaker>,
    rng: &mut R,
) -> Option<String> {
    let excluded = last_speaker.and_then(Speaker::agent_id);
    let candidates: Vec<&String> = agent_ids
        .iter()
        .filter(|id| Some(id.as_str()) != excluded)
        .collect();

    if candidates.is_empty() {
        agent_ids.choose(rng).cloned()
    } else {
        candidates.choose(rng).map(|id| (*id).clone())
    }
}
