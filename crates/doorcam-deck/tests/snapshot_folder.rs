use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use doorcam_core::{
    DecisionParams, DecisionSource, DoorState, NormalizeParams, OffsetBox, PipelineParams,
    Smoothing,
};
use doorcam_deck::{
    analyze_batch, annotate, list_snapshots, records_from_paths, save_rgb, select_by_age, Age,
    CollectionFilter, DoorcamConfig, FilteredSet, ImageRecord, RecordedState, Stage,
    TemplateCache,
};

const DARK_DOOR: u8 = 40;
const BRIGHT_DOOR: u8 = 230;

fn template_pixels() -> Vec<u8> {
    (0..30).map(|i| if (i / 2) % 2 == 0 { 250 } else { 10 }).collect()
}

fn write_template(dir: &Path) -> PathBuf {
    let path = dir.join("template.png");
    image::GrayImage::from_raw(6, 5, template_pixels())
        .unwrap()
        .save(&path)
        .unwrap();
    path
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

fn write_config(dir: &Path) -> PathBuf {
    let cfg = DoorcamConfig {
        template_path: PathBuf::from("template.png"),
        pipeline: PipelineParams {
            normalize: NormalizeParams {
                smoothing: Smoothing::None,
                clip_limit: 2.0,
                grid_size: 2,
            },
            door_offset: OffsetBox::new(10, 0, 6, 8).unwrap(),
            target_offset: Some(OffsetBox::new(0, 10, 4, 4).unwrap()),
            decision: DecisionParams { threshold: 128.0 },
            decision_source: DecisionSource::NormalizedCrop,
        },
    };
    let path = dir.join("doorcam.json");
    cfg.write_json(&path).unwrap();
    path
}

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn basenames(paths: &[PathBuf]) -> Vec<String> {
    paths
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect()
}

#[test]
fn filter_scenarios_on_a_real_folder() {
    let dir = tempfile::tempdir().unwrap();
    write_frame(dir.path(), "2017-11-10_06_00_open.png", DARK_DOOR);
    write_frame(dir.path(), "2017-11-10_18_00_close.png", BRIGHT_DOOR);
    write_frame(dir.path(), "2017-11-20_06_00_close.png", BRIGHT_DOOR);
    write_template(dir.path());

    let all = list_snapshots(dir.path()).unwrap();
    assert_eq!(all.len(), 3);

    let week = CollectionFilter::new(d(2017, 11, 10), d(2017, 11, 17));
    let set = FilteredSet::new(week.clone(), all.clone());
    assert_eq!(
        basenames(&set.sorted()),
        vec!["2017-11-10_06_00_open.png", "2017-11-10_18_00_close.png"]
    );

    let set = FilteredSet::new(week.clone().morning_only(true), all.clone());
    assert_eq!(basenames(&set.sorted()), vec!["2017-11-10_06_00_open.png"]);

    let set = FilteredSet::new(week.with_state(Some(RecordedState::Closed)), all.clone());
    assert_eq!(basenames(&set.sorted()), vec!["2017-11-10_18_00_close.png"]);

    let youngest = select_by_age(&all, None, Age::Youngest).unwrap();
    assert!(youngest.ends_with("2017-11-20_06_00_close.png"));
}

#[test]
fn batch_agrees_with_recorded_states() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path());
    write_frame(dir.path(), "2017-11-10_06_00_open.png", DARK_DOOR);
    write_frame(dir.path(), "2017-11-10_18_00_close.png", BRIGHT_DOOR);
    write_frame(dir.path(), "2017-11-11_06_00_open.png", DARK_DOOR);
    let cfg = DoorcamConfig::load_json(write_config(dir.path())).unwrap();
    let template = cfg.template(&mut TemplateCache::new()).unwrap();

    let paths = list_snapshots(dir.path()).unwrap();
    let report = analyze_batch(records_from_paths(paths, &template, &cfg.shared_pipeline()));

    assert!(report.failures.is_empty());
    let states: Vec<_> = report.outcomes.iter().map(|o| o.decision.state).collect();
    assert_eq!(
        states,
        vec![DoorState::Open, DoorState::Closed, DoorState::Open]
    );
    let a = report.agreement();
    assert_eq!((a.compared, a.agreed), (3, 3));
    assert_eq!(report.mismatches().count(), 0);

    let out = dir.path().join("report.json");
    report.write_json(&out).unwrap();
    let back = doorcam_deck::BatchReport::load_json(&out).unwrap();
    assert_eq!(back.outcomes.len(), 3);
}

#[test]
fn one_broken_file_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path());
    let names = [
        "2017-11-10_06_00_open.png",
        "2017-11-10_07_00_open.png",
        "2017-11-10_08_00_open.png",
        "2017-11-10_09_00_close.png",
        "2017-11-10_10_00_close.png",
    ];
    for (i, name) in names.iter().enumerate() {
        if i == 2 {
            std::fs::write(dir.path().join(name), b"\x89PNG truncated").unwrap();
        } else {
            write_frame(dir.path(), name, if i < 3 { DARK_DOOR } else { BRIGHT_DOOR });
        }
    }
    let cfg = DoorcamConfig::load_json(write_config(dir.path())).unwrap();
    let template = cfg.template(&mut TemplateCache::new()).unwrap();

    let paths = list_snapshots(dir.path()).unwrap();
    let report = analyze_batch(records_from_paths(paths, &template, &cfg.shared_pipeline()));

    assert_eq!(report.outcomes.len(), 4);
    assert_eq!(report.failures.len(), 1);
    let failure = &report.failures[0];
    assert!(failure.path.ends_with(names[2]));
    assert_eq!(failure.stage, Stage::LoadFrame);
    assert_eq!(failure.kind, "unreadable_image");
}

#[test]
fn markup_is_written_side_by_side() {
    let dir = tempfile::tempdir().unwrap();
    write_template(dir.path());
    let frame = write_frame(dir.path(), "2017-11-10_06_00_open.png", DARK_DOOR);
    let cfg = DoorcamConfig::load_json(write_config(dir.path())).unwrap();
    let template = cfg.template(&mut TemplateCache::new()).unwrap();

    let mut record = ImageRecord::new(&frame, template, cfg.shared_pipeline());
    let markup = annotate(&mut record).unwrap();
    assert_eq!((markup.width, markup.height), (80, 30));
    // Left half is the untouched frame.
    assert_eq!(markup.get(0, 0), [90, 90, 90]);
    // Door box outline on the right half.
    assert_eq!(markup.get(40 + 15, 4), doorcam_deck::DOOR_COLOR);

    let saved = save_rgb(&markup, dir.path().join("markup.png")).unwrap();
    let back = image::open(saved).unwrap();
    assert_eq!((back.width(), back.height()), (80, 30));
}
