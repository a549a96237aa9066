use std::path::PathBuf;
use std::process::Command;

use serde_json::Value;

fn cli() -> Command {
    Command::new(env!("CARGO_BIN_EXE_bird_log_cli"))
}

fn fixture_file(name: &str) -> String {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name)
        .to_string_lossy()
        .into_owned()
}

#[test]
fn compose_demo_prints_sorted_json_lines() {
    let output = cli()
        .args(["compose", "--demo", "--seed", "7"])
        .output()
        .expect("failed to run bird_log_cli compose");
    assert!(
        output.status.success(),
        "CLI exited with {:?}",
        output.status.code()
    );

    let stdout = String::from_utf8(output.stdout).expect("stdout UTF-8");
    let events: Vec<Value> = stdout
        .lines()
        .map(|line| serde_json::from_str(line).expect("event JSON line"))
        .collect();
    assert!(!events.is_empty());

    let times: Vec<f64> = events
        .iter()
        .map(|e| e["time"].as_f64().expect("time field"))
        .collect();
    assert!(times.windows(2).all(|w| w[0] <= w[1]));
    // 720 demo segments compress to a 360 s piece
    assert!(times.iter().all(|t| *t >= 0.0 && *t < 360.0));

    let layers: Vec<&str> = events
        .iter()
        .filter_map(|e| e["layer"].as_str())
        .collect();
    assert_eq!(layers.len(), events.len());
    assert!(layers.contains(&"bass"));
    assert!(layers.contains(&"lead"));
}

#[test]
fn compose_is_reproducible_with_seed() {
    let run = || {
        cli()
            .args(["compose", "--demo", "--seed", "11", "--scale", "minor"])
            .output()
            .expect("failed to run compose")
            .stdout
    };
    assert_eq!(run(), run());
}

#[test]
fn compose_rejects_unknown_scale() {
    let output = cli()
        .args(["compose", "--demo", "--scale", "lydian"])
        .output()
        .expect("failed to run compose");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8(output.stderr).expect("stderr UTF-8");
    assert!(stderr.contains("lydian"), "unexpected stderr: {stderr}");
}

#[test]
fn summary_of_resting_segment() {
    let output = cli()
        .args(["summary", "--input", &fixture_file("rest_segment.json")])
        .output()
        .expect("failed to run summary");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("summary JSON");
    assert_eq!(json["metadata"]["sample_count"], 60);
    assert_eq!(json["metadata"]["segment_count"], 1);
    assert_eq!(json["summary"]["total_steps"], 0);
}

#[test]
fn feed_log_replays_into_dataset() {
    let output = cli()
        .args(["feed", "--log", &fixture_file("two_segment_dump.jsonl")])
        .output()
        .expect("failed to run feed");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("summary JSON");
    assert_eq!(json["metadata"]["sample_count"], 120);
    assert_eq!(json["metadata"]["segment_count"], 2);
    assert_eq!(json["summary"]["total_steps"], 8);
    assert_eq!(json["summary"]["total_fidgets"], 12);
}

#[test]
fn missing_source_is_an_error() {
    let output = cli()
        .args(["summary"])
        .output()
        .expect("failed to run summary");
    assert_eq!(output.status.code(), Some(1));
}
