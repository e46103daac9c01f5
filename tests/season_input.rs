use std::fs;
use std::path::PathBuf;

use season_projector::fixtures::FixtureStatus;
use season_projector::season_input::parse_season_json;

fn read_fixture(name: &str) -> String {
    let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    path.push("tests");
    path.push("fixtures");
    path.push(name);
    fs::read_to_string(path).expect("fixture file should be readable")
}

#[test]
fn parses_season_fixture() {
    let input = parse_season_json(&read_fixture("season_small.json")).expect("fixture should parse");
    assert_eq!(input.ratings.len(), 6);
    assert_eq!(input.fixtures.len(), 30);
    assert_eq!(input.fixtures.iter().filter(|f| f.is_played()).count(), 6);
    assert_eq!(input.ratings.rating("Brann"), Some(1661.0));
    assert_eq!(input.tilts.get("Bodø/Glimt"), 1.12);
    assert_eq!(input.tilts.get("Molde"), 1.0);

    let last = input.fixtures.last().expect("fixtures present");
    assert_eq!(last.status, FixtureStatus::Postponed);
    assert!(last.kickoff.is_none());
    assert!(!last.is_projectable(None));
}

#[test]
fn every_fixture_club_has_a_rating() {
    let input = parse_season_json(&read_fixture("season_small.json")).expect("fixture should parse");
    for f in &input.fixtures {
        assert!(input.ratings.contains(&f.home), "{}", f.home);
        assert!(input.ratings.contains(&f.away), "{}", f.away);
    }
}

#[test]
fn rejects_malformed_json() {
    assert!(parse_season_json("{\"ratings\": [").is_err());
    assert!(parse_season_json("{\"ratings\": [{\"club\": \"A\"}]}").is_err());
}
