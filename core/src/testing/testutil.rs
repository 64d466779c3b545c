//! Assertion helpers shared by the batch tests.

use std::{collections::HashMap, time::Duration};

use super::{pool::SpyThreadPool, verdict::Verdict};

/// Measured times may be rounded up to the timer resolution.
const TIME_RESOLUTION: Duration = Duration::from_millis(1);

#[track_caller]
pub fn assert_verdicts(got: &HashMap<usize, Verdict>, want: &HashMap<usize, Verdict>) {
    let mut got: Vec<_> = got.iter().map(|(&id, &v)| (id, v)).collect();
    let mut want: Vec<_> = want.iter().map(|(&id, &v)| (id, v)).collect();
    got.sort();
    want.sort();
    assert_eq!(got, want, "got verdicts {:?}, want {:?}", got, want);
}

#[track_caller]
pub fn assert_times(got: &HashMap<usize, Duration>, want: &HashMap<usize, Duration>) {
    assert_eq!(
        got.len(),
        want.len(),
        "got times for {} tests, want {} ({:?})",
        got.len(),
        want.len(),
        got
    );
    for (id, &want_time) in want {
        let Some(&got_time) = got.get(id) else {
            panic!("no time recorded for test #{}", id)
        };
        assert!(
            got_time >= want_time && got_time - want_time <= TIME_RESOLUTION,
            "got time {:?} for test #{}, want {:?}",
            got_time,
            id,
            want_time
        );
    }
}

#[track_caller]
pub fn assert_call_count(what: &str, got: usize, want: usize) {
    assert_eq!(got, want, "{} was called {} times, want {}", what, got, want);
}

#[track_caller]
pub fn assert_thread_count(pool: &SpyThreadPool, want: usize) {
    let got = pool.thread_count();
    assert_eq!(got, want, "used {} worker slots, want {}", got, want);
}
