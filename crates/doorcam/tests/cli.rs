use std::path::{Path, PathBuf};

use assert_cmd::Command;
use predicates::prelude::*;

const DARK_DOOR: u8 = 40;
const BRIGHT_DOOR: u8 = 230;

fn template_pixels() -> Vec<u8> {
    (0..30).map(|i| if (i / 2) % 2 == 0 { 250 } else { 10 }).collect()
}

/// 40x30 frame: template at (5, 4), uniform door at x 15..21, y 4..12.
fn write_frame(dir: &Path, name: &str, door: u8) -> PathBuf {
    let mut img = image::RgbImage::from_pixel(40, 30, image::Rgb([90, 90, 90]));
    let t = template_pixels();
    for y in 0..5u32 {
        for x in 0..6u32 {
            let v = t[(y * 6 + x) as usize];
            img.put_pixel(5 + x, 4 + y, image::Rgb([v, v, v]));
        }
    }
    for y in 4..12 {
        for x in 15..21 {
            img.put_pixel(x, y, image::Rgb([door, door, door]));
        }
    }
    let path = dir.join(name);
    img.save(&path).unwrap();
    path
}

/// Template, config and a small labelled snapshot folder.
fn fixture() -> (tempfile::TempDir, PathBuf, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    image::GrayImage::from_raw(6, 5, template_pixels())
        .unwrap()
        .save(dir.path().join("template.png"))
        .unwrap();

    let config = dir.path().join("doorcam.json");
    std::fs::write(
        &config,
        r#"{
  "template_path": "template.png",
  "pipeline": {
    "normalize": { "smoothing": "none", "clip_limit": 2.0, "grid_size": 2 },
    "door_offset": [10, 0, 6, 8],
    "target_offset": [0, 10, 4, 4],
    "decision": { "threshold": 128.0 }
  }
}"#,
    )
    .unwrap();

    let folder = dir.path().join("snapshots");
    std::fs::create_dir(&folder).unwrap();
    write_frame(&folder, "2017-11-10_06_00_open.png", DARK_DOOR);
    write_frame(&folder, "2017-11-10_18_00_close.png", BRIGHT_DOOR);
    // Mislabelled on purpose.
    write_frame(&folder, "2017-11-12_07_30_open.png", BRIGHT_DOOR);
    write_frame(&folder, "2017-11-20_06_00_close.png", BRIGHT_DOOR);
    (dir, config, folder)
}

fn doorcam() -> Command {
    Command::cargo_bin("doorcam").unwrap()
}

#[test]
fn classify_prints_the_verdict() {
    let (_dir, config, folder) = fixture();
    let out = doorcam()
        .arg("classify")
        .arg("--config")
        .arg(&config)
        .arg("--image")
        .arg(folder.join("2017-11-10_06_00_open.png"))
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let json: serde_json::Value = serde_json::from_slice(&out).unwrap();
    assert_eq!(json["decision"]["state"], "open");
    assert_eq!(json["recorded"], "open");
    assert_eq!(json["agrees"], true);
}

#[test]
fn classify_flags_a_mismatch() {
    let (_dir, config, folder) = fixture();
    doorcam()
        .arg("classify")
        .arg("--config")
        .arg(&config)
        .arg("--image")
        .arg(folder.join("2017-11-12_07_30_open.png"))
        .assert()
        .success()
        .stdout(predicate::str::contains("OOPS"))
        .stdout(predicate::str::contains("detected closed"));
}

#[test]
fn classify_writes_markup() {
    let (dir, config, folder) = fixture();
    let markup = dir.path().join("markup.png");
    doorcam()
        .arg("classify")
        .arg("--config")
        .arg(&config)
        .arg("--image")
        .arg(folder.join("2017-11-10_18_00_close.png"))
        .arg("--markup")
        .arg(&markup)
        .assert()
        .success();
    let img = image::open(&markup).unwrap();
    assert_eq!((img.width(), img.height()), (80, 30));
}

#[test]
fn unreadable_snapshot_reports_the_stage() {
    let (dir, config, _folder) = fixture();
    let broken = dir.path().join("2017-11-10_06_00_open.jpg");
    std::fs::write(&broken, b"not a jpeg").unwrap();
    doorcam()
        .arg("classify")
        .arg("--config")
        .arg(&config)
        .arg("--image")
        .arg(&broken)
        .assert()
        .failure()
        .stderr(predicate::str::contains("load_frame"))
        .stderr(predicate::str::contains("unreadable_image"));
}

#[test]
fn batch_scores_the_selected_week() {
    let (dir, config, folder) = fixture();
    let report = dir.path().join("report.json");
    doorcam()
        .arg("batch")
        .arg("--config")
        .arg(&config)
        .arg("--folder")
        .arg(&folder)
        .args(["--start", "2017-11-10", "--stop", "2017-11-17"])
        .arg("--out")
        .arg(&report)
        .assert()
        .success()
        .stdout(predicate::str::contains("3 decided, 0 failed"))
        .stdout(predicate::str::contains("2/3 agree"))
        .stdout(predicate::str::contains("OOPS").count(1));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report).unwrap()).unwrap();
    assert_eq!(json["outcomes"].as_array().unwrap().len(), 3);
}

#[test]
fn batch_filters_by_morning_and_state() {
    let (_dir, config, folder) = fixture();
    doorcam()
        .arg("batch")
        .arg("--config")
        .arg(&config)
        .arg("--folder")
        .arg(&folder)
        .args(["--start", "2017-11-10", "--stop", "2017-11-17"])
        .arg("--morning")
        .args(["--state", "close"])
        .assert()
        .success()
        .stdout(predicate::str::contains("0 decided, 0 failed"))
        .stdout(predicate::str::contains("nothing to compare"));
}

#[test]
fn latest_picks_by_age_and_date() {
    let (_dir, config, folder) = fixture();
    doorcam()
        .arg("latest")
        .arg("--config")
        .arg(&config)
        .arg("--folder")
        .arg(&folder)
        .args(["--age", "oldest"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2017-11-10_06_00_open.png"));

    doorcam()
        .arg("latest")
        .arg("--config")
        .arg(&config)
        .arg("--folder")
        .arg(&folder)
        .args(["--date", "2017-11-10"])
        .assert()
        .success()
        .stdout(predicate::str::contains("2017-11-10_18_00_close.png"));

    doorcam()
        .arg("latest")
        .arg("--config")
        .arg(&config)
        .arg("--folder")
        .arg(&folder)
        .args(["--date", "2017-12-01"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("no snapshots"));
}

#[test]
fn overrides_are_validated() {
    let (_dir, config, _folder) = fixture();
    doorcam()
        .arg("config")
        .arg("--config")
        .arg(&config)
        .args(["--clip-limit", "0"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("clip limit"));

    doorcam()
        .arg("config")
        .arg("--config")
        .arg(&config)
        .args(["--blur-size", "4"])
        .assert()
        .failure();

    doorcam()
        .arg("config")
        .arg("--config")
        .arg(&config)
        .args(["--blur-size", "7", "--threshold", "150"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"smoothing\": 7"))
        .stdout(predicate::str::contains("\"threshold\": 150.0"));
}
