// ABOUTME: Integration tests for conversation state invariants
// ABOUTME: Randomised append sequences plus the fixed eviction and reset scenarios

use banter_core::{ConversationContext, ConversationState, Settings, Speaker};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

fn random_speaker(rng: &mut StdRng) -> Speaker {
    match rng.gen_range(0..5) {
        0 => Speaker::User,
        1 => Speaker::System,
        2 => Speaker::agent("bot1"),
        3 => Speaker::agent("bot2"),
        _ => Speaker::agent("bot3"),
    }
}

#[test]
fn test_history_never_exceeds_capacity_and_evicts_oldest() {
    let mut rng = StdRng::seed_from_u64(42);
    for capacity in [1usize, 2, 3, 7, 30] {
        let mut state = ConversationState::new(capacity);
        for i in 0..200usize {
            state.append(random_speaker(&mut rng), format!("m{}", i));
            assert!(state.len() <= capacity);

            let kept: Vec<String> = state.history().map(|m| m.content.clone()).collect();
            let first = (i + 1).saturating_sub(capacity);
            let expected: Vec<String> = (first..=i).map(|n| format!("m{}", n)).collect();
            assert_eq!(kept, expected);
        }
    }
}

#[test]
fn test_turn_count_rules_hold_for_random_sequences() {
    let mut rng = StdRng::seed_from_u64(9);
    let mut state = ConversationState::new(30);

    for _ in 0..500 {
        let before = state.turn_count();
        let previous = state.last_speaker().cloned();
        let speaker = random_speaker(&mut rng);
        state.append(speaker.clone(), "x");

        match speaker {
            Speaker::User if previous != Some(Speaker::User) => assert_eq!(state.turn_count(), 0),
            Speaker::User | Speaker::System => assert_eq!(state.turn_count(), before),
            Speaker::Agent(_) => assert_eq!(state.turn_count(), before + 1),
        }
        assert_eq!(state.last_speaker(), Some(&speaker));
    }
}

#[test]
fn test_eligibility_after_each_append() {
    let mut rng = StdRng::seed_from_u64(3);
    let mut state = ConversationState::new(5);
    assert!(!state.eligible("bot1"));

    for _ in 0..200 {
        let speaker = random_speaker(&mut rng);
        state.append(speaker.clone(), "x");
        for id in ["bot1", "bot2", "bot3"] {
            let own = speaker.agent_id() == Some(id);
            assert_eq!(state.eligible(id), !own);
        }
    }
}

#[test]
fn test_eviction_scenario() {
    let mut state = ConversationState::new(3);
    for content in ["A", "B", "C", "D"] {
        state.append(Speaker::User, content);
    }
    let contents: Vec<&str> = state.history().map(|m| m.content.as_str()).collect();
    assert_eq!(contents, vec!["B", "C", "D"]);
}

#[tokio::test(start_paused = true)]
async fn test_timestamps_follow_speakers() {
    let mut state = ConversationState::new(10);
    let created = state.last_user_message_time();

    tokio::time::advance(Duration::from_secs(5)).await;
    state.append(Speaker::agent("bot1"), "hello");
    assert_eq!(state.last_user_message_time(), created);
    assert_eq!(state.last_message_time(), created + Duration::from_secs(5));

    tokio::time::advance(Duration::from_secs(5)).await;
    state.append(Speaker::System, "nudge");
    assert_eq!(state.last_user_message_time(), created);
    assert_eq!(state.last_message_time(), created + Duration::from_secs(10));

    tokio::time::advance(Duration::from_secs(5)).await;
    state.append(Speaker::User, "back");
    assert_eq!(state.last_user_message_time(), created + Duration::from_secs(15));
    assert_eq!(state.last_message_time(), created + Duration::from_secs(15));
}

#[tokio::test(start_paused = true)]
async fn test_reset_refreshes_message_time_only() {
    let ctx = ConversationContext::new(Settings::default(), banter_core::profile::default_agents());
    ctx.append(Speaker::User, "hi");
    ctx.append(Speaker::agent("bot1"), "hello");
    let user_time = ctx.with_state(|s| s.last_user_message_time());

    tokio::time::advance(Duration::from_secs(100)).await;
    ctx.reset_conversation();

    ctx.with_state(|s| {
        assert!(s.is_empty());
        assert_eq!(s.turn_count(), 0);
        assert!(s.last_speaker().is_none());
        assert_eq!(s.last_user_message_time(), user_time);
        assert_eq!(s.last_message_time(), user_time + Duration::from_secs(100));
    });
    assert!(!ctx.eligible("bot1"));
}
