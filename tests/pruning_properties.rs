//! Behavioural properties of context-window pruning, checked over a
//! deterministic family of generated conversations.

use std::borrow::Cow;

use ctxwindow::tokens::{MESSAGE_OVERHEAD_TOKENS, PRIMING_OVERHEAD_TOKENS};
use ctxwindow::{
    prune, remaining_tokens, would_exceed_limit, ContextWindowManager, Message, PruneOptions, Role,
};

/// Small deterministic generator (xorshift) so cases are reproducible.
struct Rng(u64);

impl Rng {
    fn next(&mut self) -> u64 {
        self.0 ^= self.0 << 13;
        self.0 ^= self.0 >> 7;
        self.0 ^= self.0 << 17;
        self.0
    }

    fn below(&mut self, n: u64) -> usize {
        (self.next() % n) as usize
    }
}

/// Conversation with a mix of roles and lengths. Content embeds the index
/// so every message is distinct.
fn conversation(seed: u64, len: usize) -> Vec<Message> {
    let mut rng = Rng(seed.wrapping_mul(0x9E37_79B9_7F4A_7C15) | 1);
    (0..len)
        .map(|i| {
            let body = format!("#{i} {}", "x".repeat(rng.below(400)));
            match rng.below(10) {
                0 => Message::system(body),
                n if n % 2 == 0 => Message::user(body),
                _ => Message::assistant(body),
            }
        })
        .collect()
}

fn cases() -> impl Iterator<Item = (Vec<Message>, usize)> {
    (0..60u64).map(|seed| {
        let messages = conversation(seed, (seed as usize % 25) + 1);
        let budget = 20 + (seed as usize * 37) % 900;
        (messages, budget)
    })
}

fn budget(max_tokens: usize) -> PruneOptions {
    PruneOptions::default().with_max_tokens(max_tokens)
}

fn position(messages: &[Message], m: &Message) -> usize {
    messages
        .iter()
        .position(|x| x == m)
        .expect("output message must come from the input")
}

#[test]
fn identity_when_within_budget() {
    let manager = ContextWindowManager::default();
    for (messages, _) in cases() {
        let total = manager.counter().count_messages_tokens(&messages, "gpt-4");
        let pruned = manager.prune(&messages, "gpt-4", &budget(total)).unwrap();
        assert!(matches!(pruned, Cow::Borrowed(_)));
        assert_eq!(pruned.as_ref(), messages.as_slice());
    }
}

#[test]
fn system_messages_always_preserved_in_order() {
    for (messages, limit) in cases() {
        let pruned = prune(&messages, "gpt-4", &budget(limit)).unwrap();
        let expected: Vec<&Message> = messages.iter().filter(|m| m.is_system()).collect();
        let actual: Vec<&Message> = pruned.iter().filter(|m| m.is_system()).collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn conversation_stays_chronological() {
    for (messages, limit) in cases() {
        let pruned = prune(&messages, "gpt-4", &budget(limit)).unwrap();
        let positions: Vec<usize> = pruned
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| position(&messages, m))
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }
}

#[test]
fn whole_output_follows_input_order() {
    for (messages, limit) in cases() {
        let pruned = prune(&messages, "gpt-4", &budget(limit)).unwrap();
        let positions: Vec<usize> = pruned.iter().map(|m| position(&messages, m)).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{positions:?}");
    }
}

#[test]
fn mid_conversation_system_message_stays_in_place() {
    let messages = vec![
        Message::user("u".repeat(200)),
        Message::user("first"),
        Message::system("late instructions"),
        Message::assistant("reply"),
    ];
    let pruned = prune(&messages, "gpt-4", &budget(40)).unwrap();
    assert_eq!(pruned.as_ref(), &messages[1..]);
}

#[test]
fn kept_conversation_is_a_strict_suffix() {
    for (messages, limit) in cases() {
        let pruned = prune(&messages, "gpt-4", &budget(limit)).unwrap();
        let conversational: Vec<usize> = (0..messages.len())
            .filter(|&i| !messages[i].is_system())
            .collect();
        let kept = pruned.iter().filter(|m| !m.is_system()).count();
        let expected: Vec<&Message> = conversational[conversational.len() - kept..]
            .iter()
            .map(|&i| &messages[i])
            .collect();
        let actual: Vec<&Message> = pruned.iter().filter(|m| !m.is_system()).collect();
        assert_eq!(actual, expected);
    }
}

#[test]
fn output_fits_unless_system_messages_alone_do_not() {
    let manager = ContextWindowManager::default();
    for (messages, limit) in cases() {
        let plan = manager.plan(&messages, "gpt-4", &budget(limit)).unwrap();
        let pruned = plan.apply(&messages);
        let cost = manager.counter().count_messages_tokens(pruned.iter(), "gpt-4");
        let system_cost = manager
            .counter()
            .count_messages_tokens(messages.iter().filter(|m| m.is_system()), "gpt-4");
        if system_cost <= limit {
            assert!(cost <= limit, "cost {cost} > limit {limit}");
        } else {
            assert!(plan.over_budget());
        }
        assert_eq!(plan.kept.len() + plan.dropped.len(), messages.len());
    }
}

#[test]
fn larger_reserve_never_keeps_more() {
    let manager = ContextWindowManager::default();
    for seed in 0..20u64 {
        // Long enough that gpt-4's 8192 window forces pruning.
        let messages = conversation(seed, 150);
        let mut previous = usize::MAX;
        for reserve in (0..8000).step_by(500) {
            let options = PruneOptions::default().with_reserve(reserve);
            let kept = manager
                .prune(&messages, "gpt-4", &options)
                .unwrap()
                .iter()
                .filter(|m| !m.is_system())
                .count();
            assert!(kept <= previous, "reserve {reserve}: {kept} > {previous}");
            previous = kept;
        }
    }
}

#[test]
fn pruning_is_idempotent() {
    for (messages, limit) in cases() {
        let options = budget(limit);
        let once = prune(&messages, "gpt-4", &options).unwrap().into_owned();
        let twice = prune(&once, "gpt-4", &options).unwrap();
        // System messages over budget make the first result over budget too,
        // and pruning it again keeps the same system-only output.
        assert_eq!(twice.as_ref(), once.as_slice());
    }
}

#[test]
fn pruning_is_idempotent_with_default_budget() {
    let messages = conversation(7, 200);
    let once = prune(&messages, "gpt-4", &PruneOptions::default())
        .unwrap()
        .into_owned();
    assert!(once.len() < messages.len());
    let twice = prune(&once, "gpt-4", &PruneOptions::default()).unwrap();
    assert!(matches!(twice, Cow::Borrowed(_)));
}

#[test]
fn scenario_short_conversation_is_unchanged() {
    // gpt-3.5-turbo has a 16385 window; three short messages fit easily.
    let messages = vec![
        Message::system("You are helpful."),
        Message::user("Hi!"),
        Message::assistant("Hello, how can I help?"),
    ];
    let pruned = prune(&messages, "gpt-3.5-turbo", &PruneOptions::default()).unwrap();
    assert_eq!(pruned.as_ref(), messages.as_slice());
}

#[test]
fn scenario_long_conversation_keeps_recent_suffix() {
    // gpt-4: 8192 window, 7192 after the reserve.
    let system = Message::system("s".repeat(46 * 4)); // 46 + 4 = 50 tokens
    let mut messages = vec![system.clone()];
    for i in 0..50 {
        let body = "m".repeat(196 * 4); // 196 + 4 + 3 = 203 tokens as a candidate
        messages.push(if i % 2 == 0 {
            Message::user(body)
        } else {
            Message::assistant(body)
        });
    }

    let pruned = prune(&messages, "gpt-4", &PruneOptions::default()).unwrap();

    // 3 priming + 50 system + 35 * 203 = 7158 <= 7192; a 36th would be 7361.
    assert_eq!(pruned.len(), 36);
    assert_eq!(pruned[0], system);
    assert_eq!(&pruned[1..], &messages[16..]);
}

#[test]
fn scenario_would_exceed_limit_on_empty_history() {
    let candidate = "c".repeat(2000 * 4);
    // 2000 + 4 + 3 + 1000 = 3007 <= 8192.
    assert!(!would_exceed_limit(&[], &candidate, "gpt-4"));
    // Default 4096 window: 3089 + 4 + 3 + 1000 = 4096 fits, one more does not.
    assert!(!would_exceed_limit(&[], &"c".repeat(3089 * 4), "unknown"));
    assert!(would_exceed_limit(&[], &"c".repeat(3090 * 4), "unknown"));
}

#[test]
fn scenario_unknown_model_uses_default_window() {
    let messages = vec![Message::user("abcd")];
    let used = 1 + MESSAGE_OVERHEAD_TOKENS + PRIMING_OVERHEAD_TOKENS;
    assert_eq!(
        remaining_tokens(&messages, "definitely-not-a-model"),
        4096 - used - 1000
    );
}

#[test]
fn manager_is_shareable_across_threads() {
    let manager = ContextWindowManager::default();
    let messages = conversation(3, 100);
    let expected = manager
        .prune(&messages, "gpt-4", &budget(2000))
        .unwrap()
        .into_owned();
    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                let pruned = manager.prune(&messages, "gpt-4", &budget(2000)).unwrap();
                assert_eq!(pruned.as_ref(), expected.as_slice());
            });
        }
    });
}
