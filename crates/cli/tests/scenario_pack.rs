//! The shipped scenario pack must always load cleanly

use std::path::PathBuf;

use taskprobe_common::{Scenario, ScenarioKind};

fn pack_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../scenarios")
}

#[test]
fn every_shipped_scenario_parses() {
    let scenarios = Scenario::load_all(&pack_dir()).expect("scenario pack loads");
    assert!(scenarios.len() >= 10, "pack has {} scenarios", scenarios.len());

    // Names are unique across the pack
    let mut names: Vec<_> = scenarios.iter().map(|s| s.name.as_str()).collect();
    names.sort_unstable();
    let before = names.len();
    names.dedup();
    assert_eq!(before, names.len(), "duplicate scenario names in pack");
}

#[test]
fn pack_covers_both_runner_kinds() {
    let scenarios = Scenario::load_all(&pack_dir()).unwrap();
    assert!(scenarios.iter().any(|s| s.kind == ScenarioKind::Api));
    assert!(scenarios.iter().any(|s| s.kind == ScenarioKind::Ui));
}

#[test]
fn pack_exercises_a_narrow_viewport() {
    let scenarios = Scenario::load_all(&pack_dir()).unwrap();
    assert!(
        scenarios
            .iter()
            .any(|s| s.kind == ScenarioKind::Ui && s.viewport.width < 500),
        "no mobile-width UI scenario in pack"
    );
}

#[test]
fn cleanup_steps_trail_their_scenarios() {
    // A cleanup step makes no sense before the step that creates the
    // resource it deletes; the pack keeps them at the tail.
    for scenario in Scenario::load_all(&pack_dir()).unwrap() {
        let steps = scenario.api_steps();
        if let Some(first_cleanup) = steps.iter().position(|s| s.cleanup) {
            assert!(
                steps[first_cleanup..].iter().all(|s| s.cleanup),
                "scenario '{}' has non-cleanup steps after a cleanup step",
                scenario.name
            );
        }
    }
}
