use proptest::prelude::*;
use std::cmp::Ordering;
use tessera_schema::{SemVer, VersionError};

// ── Parsing ──────────────────────────────────────────────────────

#[test]
fn parses_three_components() {
    let v = SemVer::parse("1.2.3").unwrap();
    assert_eq!((v.major(), v.minor(), v.patch()), (1, 2, 3));
}

#[test]
fn rejects_malformed_input() {
    for bad in ["", "1", "1.2", "1.2.3.4", "v1.2.3", "1.2.x", "1..3", " 1.2.3", "1.2.3 ", "-1.2.3", "+1.2.3", "1.2.3-beta"] {
        assert!(
            matches!(SemVer::parse(bad), Err(VersionError::Parse(_))),
            "{bad:?} should not parse"
        );
    }
}

#[test]
fn from_str_matches_parse() {
    let v: SemVer = "4.0.11".parse().unwrap();
    assert_eq!(v, SemVer::new(4, 0, 11));
}

// ── Ordering ─────────────────────────────────────────────────────

#[test]
fn compare_is_numeric_not_lexicographic_text() {
    let a = SemVer::parse("1.10.0").unwrap();
    let b = SemVer::parse("1.9.9").unwrap();
    assert_eq!(a.cmp(&b), Ordering::Greater);
    assert!(SemVer::parse("2.0.0").unwrap() > SemVer::parse("1.99.99").unwrap());
    assert!(SemVer::parse("1.0.2").unwrap() < SemVer::parse("1.0.10").unwrap());
}

// ── Next version ─────────────────────────────────────────────────

#[test]
fn next_patch_only_bumps_patch() {
    let v = SemVer::new(1, 2, 3).next_patch().unwrap();
    assert_eq!(v, SemVer::new(1, 2, 4));
}

#[test]
fn resolve_next_without_history_is_initial() {
    let none: Vec<SemVer> = Vec::new();
    assert_eq!(SemVer::resolve_next(&none).unwrap(), SemVer::new(1, 0, 0));
    assert_eq!(SemVer::INITIAL.to_string(), "1.0.0");
}

#[test]
fn resolve_next_uses_maximum() {
    let existing = [
        SemVer::new(1, 0, 0),
        SemVer::new(1, 2, 3),
        SemVer::new(1, 0, 9),
    ];
    assert_eq!(SemVer::resolve_next(&existing).unwrap().to_string(), "1.2.4");
}

// ── Serde ────────────────────────────────────────────────────────

#[test]
fn serializes_as_string() {
    let v = SemVer::new(3, 1, 4);
    assert_eq!(serde_json::to_string(&v).unwrap(), "\"3.1.4\"");
    let back: SemVer = serde_json::from_str("\"3.1.4\"").unwrap();
    assert_eq!(back, v);
    assert!(serde_json::from_str::<SemVer>("\"3.1\"").is_err());
}

// ── Properties ───────────────────────────────────────────────────

fn semver_strategy() -> impl Strategy<Value = SemVer> {
    (0u64..1000, 0u64..1000, 0u64..1000).prop_map(|(a, b, c)| SemVer::new(a, b, c))
}

proptest! {
    /// Version ordering agrees with numeric tuple ordering.
    #[test]
    fn ordering_matches_tuples(a in semver_strategy(), b in semver_strategy()) {
        let ta = (a.major(), a.minor(), a.patch());
        let tb = (b.major(), b.minor(), b.patch());
        prop_assert_eq!(a.cmp(&b), ta.cmp(&tb));
    }

    /// The next patch is strictly greater and keeps major/minor.
    #[test]
    fn next_patch_is_greater(v in semver_strategy()) {
        let next = v.next_patch().unwrap();
        prop_assert!(next > v);
        prop_assert_eq!(next.major(), v.major());
        prop_assert_eq!(next.minor(), v.minor());
    }

    /// The resolved next version is greater than every existing version.
    #[test]
    fn resolved_version_is_fresh(existing in prop::collection::vec(semver_strategy(), 0..20)) {
        let next = SemVer::resolve_next(&existing).unwrap();
        prop_assert!(existing.iter().all(|v| *v < next));
    }

    #[test]
    fn display_parse_roundtrip(v in semver_strategy()) {
        prop_assert_eq!(SemVer::parse(&v.to_string()).unwrap(), v);
    }
}
