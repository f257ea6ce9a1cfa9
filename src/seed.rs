//! Random fixture states for trying the reader against real feeds.

use chrono::{DateTime, Duration, Utc};
use rand::seq::IndexedRandom;
use rand::Rng;

use crate::store::ApplicationState;

/// Feeds the fixture picks from.
pub const KNOWN_FEEDS: &[&str] = &[
    "http://feeds.bbci.co.uk/news/rss.xml",
    "https://rss.nytimes.com/services/xml/rss/nyt/World.xml",
    "https://www.nasa.gov/rss/dyn/breaking_news.rss",
    "http://www.espn.com/espn/rss/news",
    "https://github.blog/all.atom",
];

/// Upper bound for a random subscription count.
pub const MAX_RANDOM_SUBSCRIPTIONS: usize = 5;

/// Build a state with `count` draws from [`KNOWN_FEEDS`], each with a random
/// watermark within the week before `now`.
///
/// Draws that land on an already-subscribed URL are dropped, so the result
/// may hold fewer than `count` subscriptions.
pub fn random_state<R: Rng + ?Sized>(rng: &mut R, count: usize, now: DateTime<Utc>) -> ApplicationState {
    let week = Duration::days(7).num_seconds();
    let mut state = ApplicationState::default();

    for i in 1..=count {
        let Some(url) = KNOWN_FEEDS.choose(rng) else {
            break;
        };
        if !state.subscribe(format!("Feed {i}"), *url) {
            continue;
        }

        if let Some(sub) = state.subscriptions.last_mut() {
            sub.last_read = Some(now - Duration::seconds(rng.random_range(0..week)));
            sub.last_read_index = Some(rng.random_range(0..10));
        }
    }

    state
}

/// A random subscription count in `1..=MAX_RANDOM_SUBSCRIPTIONS`.
pub fn random_count<R: Rng + ?Sized>(rng: &mut R) -> usize {
    rng.random_range(1..=MAX_RANDOM_SUBSCRIPTIONS)
}
