use std::path::PathBuf;

use anyhow::Result;
use rune_animate::{AnimateConfig, RunnerState, Scenario, run_scenario};

fn demo(name: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../../demos")
        .join(name)
}

#[test]
fn nested_list_demo_orders_by_depth() -> Result<()> {
    let scenario = Scenario::load(demo("nested_list.json"))?;
    let trace = run_scenario(&scenario, &AnimateConfig::default())?;

    let frames: Vec<(u64, &str)> = trace
        .dispatched
        .iter()
        .map(|d| (d.frame, d.elements[0].as_str()))
        .collect();
    assert_eq!(
        frames,
        vec![
            (0, "list"),
            (0, "footer"),
            (1, "first"),
            (1, "second"),
            (2, "badge"),
        ]
    );

    let js: Vec<&str> = trace
        .dispatched
        .iter()
        .filter(|d| d.driver == "js")
        .map(|d| d.event.as_str())
        .collect();
    assert_eq!(js, vec!["addClass"]);

    assert_eq!(trace.runners["list-enter"], RunnerState::Completed);
    assert_eq!(trace.runners["badge-enter"], RunnerState::Completed);
    assert_eq!(trace.runners["footer-highlight"], RunnerState::Cancelled);
    assert_eq!(trace.classes["footer"], "highlight");
    assert_eq!(trace.classes["second"], "item");
    Ok(())
}

#[test]
fn anchored_views_demo_merges_the_pair() -> Result<()> {
    let scenario = Scenario::load(demo("anchored_views.json"))?;
    let trace = run_scenario(&scenario, &AnimateConfig::default())?;

    assert_eq!(trace.dispatched.len(), 1);
    let record = &trace.dispatched[0];
    assert!(record.anchored);
    assert_eq!(record.elements, vec!["inbox", "detail"]);
    assert_eq!(record.event, "enter");
    assert_eq!(trace.runners["inbox-leave"], RunnerState::Completed);
    assert_eq!(trace.runners["detail-enter"], RunnerState::Completed);
    Ok(())
}

#[test]
fn custom_anchor_attribute_disables_default_pairing() -> Result<()> {
    let scenario = Scenario::load(demo("anchored_views.json"))?;
    let config = AnimateConfig {
        anchor_attribute: "data-anchor".to_string(),
        ..AnimateConfig::default()
    };
    let trace = run_scenario(&scenario, &config)?;

    assert_eq!(trace.dispatched.len(), 2);
    assert!(trace.dispatched.iter().all(|d| !d.anchored));
    Ok(())
}
