// AssocTable unit test suite (public API).
//
// Each test documents what behavior is being verified and which
// invariants are assumed or asserted. The core invariants exercised:
// - Round-trip: inserted keys look up to their values; others to the default.
// - Count: inserts minus successful removes, at every step.
// - Ownership: destroy policies run once per key/value, never on the default.
// - Walks: `walk` and continuation walks cover every entry exactly once.
// - Tokens: out-of-range continuations are rejected, not misread.
// - Creation: a bin array that cannot be allocated is OutOfMemory, not abort.
//
// Not covered here: `insert` returning `InsertError`. A one-entry reserve
// cannot be made to fail through the public API without a failing
// allocator; the error's ownership hand-back is unit-tested in `error.rs`.
use assoc_table::{
    AssocTable, Continuation, Error, FnPolicy, HashedPolicy, Step, MAX_BINS, MIN_BINS,
    POSITION_SPAN,
};
use std::cell::RefCell;
use std::collections::BTreeSet;

fn drain(t: &AssocTable<String, String>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut cont = Continuation::START;
    loop {
        match t.walk_continuation(cont).expect("valid continuation") {
            Step::Item { key, value, next } => {
                out.push((key.clone(), value.clone()));
                cont = next;
            }
            Step::End => return out,
        }
    }
}

// Test: the reference scenario with string policies.
// Assumes: default "n/a", four-bin hint.
// Verifies: hits, miss -> default, count, and a full continuation traversal
// that yields each inserted pair exactly once.
#[test]
fn blade_runner_scenario() {
    let mut t = AssocTable::new("n/a".to_string(), 4).expect("create");
    for (k, v) in [("deckard", "rick"), ("batty", "roy"), ("tyrell", "rachael")] {
        t.insert(k.to_string(), v.to_string()).expect("insert");
    }
    assert_eq!(t.lookup("deckard"), "rick");
    assert_eq!(t.lookup("gaff"), "n/a");
    assert_eq!(t.count(), 3);

    let mut pairs = drain(&t);
    pairs.sort();
    assert_eq!(
        pairs,
        vec![
            ("batty".to_string(), "roy".to_string()),
            ("deckard".to_string(), "rick".to_string()),
            ("tyrell".to_string(), "rachael".to_string()),
        ]
    );
}

// Test: count consistency over a mixed sequence.
// Assumes: distinct keys.
// Verifies: count tracks inserts minus successful removes; absent removes
// change nothing.
#[test]
fn count_tracks_inserts_and_removes() {
    let mut t: AssocTable<String, u32> = AssocTable::new(0, 7).unwrap();
    let mut expected = 0;
    for i in 0..50u32 {
        t.insert(format!("k{i}"), i).unwrap();
        expected += 1;
        assert_eq!(t.count(), expected);
    }
    for i in (0..50u32).step_by(3) {
        t.remove(format!("k{i}").as_str());
        expected -= 1;
        assert_eq!(t.count(), expected);
    }
    t.remove("never-inserted");
    assert_eq!(t.count(), expected);
    for i in 0..50u32 {
        let want = if i % 3 == 0 { 0 } else { i };
        assert_eq!(*t.lookup(format!("k{i}").as_str()), want);
    }
}

// Test: bulk walk covers everything once; early exit propagates the
// callback's own error.
#[test]
fn walk_visits_each_entry_once_and_stops_on_error() {
    let mut t: AssocTable<u64, u64, HashedPolicy> =
        AssocTable::create(0, 16, HashedPolicy::default()).unwrap();
    for i in 0..200 {
        t.insert(i, i * 2).unwrap();
    }
    let mut seen = BTreeSet::new();
    t.walk(|k, v| {
        assert_eq!(*v, k * 2);
        assert!(seen.insert(*k), "visited {k} twice");
        Ok::<(), ()>(())
    })
    .unwrap();
    assert_eq!(seen.len(), 200);

    #[derive(Debug, PartialEq)]
    struct Found(u64);
    let r = t.walk(|k, _| if *k == 77 { Err(Found(*k)) } else { Ok(()) });
    assert_eq!(r, Err(Found(77)));
}

// Test: continuation walk equals `walk` order and terminates with End.
#[test]
fn continuation_walk_matches_bulk_walk() {
    let mut t = AssocTable::new(String::new(), 5).unwrap();
    for i in 0..64 {
        t.insert(format!("key-{i}"), format!("val-{i}")).unwrap();
    }
    let by_token = drain(&t);
    let mut by_walk = Vec::new();
    t.walk(|k, v| {
        by_walk.push((k.clone(), v.clone()));
        Ok::<(), ()>(())
    })
    .unwrap();
    assert_eq!(by_token, by_walk);
    assert_eq!(by_token.len(), t.count());
}

// Test: a continuation can be parked as a plain integer and resumed later.
// Verifies: raw round-trip through i64 does not change the walk.
#[test]
fn continuation_survives_as_plain_integer() {
    let mut t = AssocTable::new(String::new(), 3).unwrap();
    for k in ["leon", "zhora", "pris", "roy"] {
        t.insert(k.to_string(), k.to_uppercase()).unwrap();
    }
    let mut parked: i64 = Continuation::START.raw();
    let mut keys = Vec::new();
    while let Step::Item { key, next, .. } =
        t.walk_continuation(Continuation::from_raw(parked)).unwrap()
    {
        keys.push(key.clone());
        parked = next.into();
    }
    let expected: Vec<String> = t.iter().map(|(k, _)| k.clone()).collect();
    assert_eq!(keys, expected);
}

// Test: removing the just-visited entry while walking by continuation.
// Assumes: the caller resumes with the token that produced the removed entry.
// Verifies: every entry present at the start is visited exactly once and the
// table ends up holding only the entries that were kept.
#[test]
fn remove_while_walking_by_continuation() {
    let mut t: AssocTable<String, u32> = AssocTable::new(0, 3).unwrap();
    for i in 0..30u32 {
        t.insert(format!("n{i}"), i).unwrap();
    }
    let mut visited = BTreeSet::new();
    let mut cont = Continuation::START;
    loop {
        let (key, value, next) = match t.walk_continuation(cont).unwrap() {
            Step::Item { key, value, next } => (key.clone(), *value, next),
            Step::End => break,
        };
        assert!(visited.insert(key.clone()), "revisited {key}");
        if value % 2 == 0 {
            t.remove(key.as_str());
        } else {
            cont = next;
        }
    }
    assert_eq!(visited.len(), 30);
    assert_eq!(t.count(), 15);
    assert!(t.iter().all(|(_, v)| v % 2 == 1));
}

// Test: bad-token rejection.
// Verifies: bin >= bin_count and negative raw values return BadContinuation.
#[test]
fn bad_continuations_are_rejected() {
    let mut t = AssocTable::new(String::new(), 6).unwrap();
    t.insert("k".to_string(), "v".to_string()).unwrap();
    let bins = t.bin_count() as i64;
    for raw in [bins * POSITION_SPAN, (bins + 9) * POSITION_SPAN + 3, -1, -POSITION_SPAN] {
        match t.walk_continuation(Continuation::from_raw(raw)) {
            Err(Error::BadContinuation { raw: r }) => assert_eq!(r, raw),
            other => panic!("expected BadContinuation for {raw}, got {other:?}"),
        }
    }
}

// Test: a token from a larger table is only range-checked.
// Verifies: an in-range foreign token walks this table; an out-of-range one
// is rejected.
#[test]
fn foreign_tokens_are_range_checked_only() {
    let small: AssocTable<String, String> = AssocTable::new(String::new(), 2).unwrap();
    let mut big = AssocTable::new(String::new(), 64).unwrap();
    for i in 0..128 {
        big.insert(format!("k{i}"), String::new()).unwrap();
    }
    let mut cont = Continuation::START;
    let mut last_in_range = None;
    while let Step::Item { next, .. } = big.walk_continuation(cont).unwrap() {
        let bin = next.raw() / POSITION_SPAN;
        if bin < 2 {
            last_in_range = Some(next);
        } else {
            assert!(matches!(
                small.walk_continuation(next),
                Err(Error::BadContinuation { .. })
            ));
        }
        cont = next;
    }
    if let Some(c) = last_in_range {
        assert_eq!(small.walk_continuation(c), Ok(Step::End));
    }
}

// Test: function-pointer policies.
// Assumes: omitted functions default to byte-string handling.
// Verifies: a caller-supplied hash that sends everything to one bin still
// resolves lookups by compare, and destroy hooks see every released key.
#[test]
fn fn_policy_with_custom_hash_and_destroy_hook() {
    thread_local! {
        static RELEASED: RefCell<Vec<String>> = const { RefCell::new(Vec::new()) };
    }
    fn one_bin(_: &String) -> u32 {
        7
    }
    fn release(k: String) {
        RELEASED.with(|r| r.borrow_mut().push(k));
    }
    let policy: FnPolicy<String, u8> = FnPolicy::new(Some(one_bin), None, Some(release), None);
    let mut t = AssocTable::create(0u8, 5, policy).unwrap();
    for (i, k) in ["holden", "leon", "zhora"].into_iter().enumerate() {
        t.insert(k.to_string(), i as u8 + 1).unwrap();
    }
    assert_eq!(*t.lookup(&"leon".to_string()), 2);
    assert_eq!(*t.lookup(&"rachael".to_string()), 0);

    t.remove(&"holden".to_string());
    drop(t);
    let mut released = RELEASED.with(|r| r.borrow().clone());
    assert_eq!(released[0], "holden");
    released.sort();
    assert_eq!(released, vec!["holden", "leon", "zhora"]);
}

// Test: creation clamps the hint and never yields zero bins.
#[test]
fn zero_hint_still_creates_a_usable_table() {
    let mut t = AssocTable::new(String::new(), 0).unwrap();
    assert_eq!(t.bin_count(), MIN_BINS);
    t.insert("only".to_string(), "bin".to_string()).unwrap();
    assert_eq!(t.lookup("only"), "bin");
}

// Test: an oversized hint is clamped to MAX_BINS and the bin array then
// fails to allocate.
// Assumes: 64-bit target, where MAX_BINS bins need terabytes.
// Verifies: create returns OutOfMemory naming the clamped bin count.
#[cfg(target_pointer_width = "64")]
#[test]
fn oversized_hint_reports_out_of_memory() {
    let r = AssocTable::<String, u32>::new(0, usize::MAX);
    match r {
        Err(Error::OutOfMemory { bins }) => assert_eq!(bins, MAX_BINS),
        Err(other) => panic!("expected OutOfMemory, got {other:?}"),
        Ok(t) => panic!("allocated {} bins", t.bin_count()),
    }
}

// Test: duplicate keys coexist (no de-duplication on insert).
// Verifies: count includes both, lookup sees the newest, walks see both.
#[test]
fn duplicate_insert_coexists() {
    let mut t = AssocTable::new(String::new(), 4).unwrap();
    t.insert("dup".to_string(), "first".to_string()).unwrap();
    t.insert("dup".to_string(), "second".to_string()).unwrap();
    assert_eq!(t.count(), 2);
    assert_eq!(t.lookup("dup"), "second");
    let values: Vec<String> = drain(&t).into_iter().map(|(_, v)| v).collect();
    assert_eq!(values, vec!["second", "first"]);
    t.remove("dup");
    assert_eq!(t.lookup("dup"), "first");
}
