//! Running many records and scoring them against their recorded states.
//!
//! A failing record never aborts a batch: it lands in
//! [`BatchReport::failures`] next to the successful outcomes.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::NaiveDateTime;
use doorcam_core::{Decision, PipelineParams};
use serde::{Deserialize, Serialize};

#[cfg(feature = "tracing")]
use tracing::instrument;

use crate::filename::RecordedState;
use crate::record::{ImageRecord, Stage};
use crate::template::Template;

/// A record that made it through the whole pipeline.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecordOutcome {
    pub path: PathBuf,
    pub timestamp: Option<NaiveDateTime>,
    pub recorded: RecordedState,
    pub decision: Decision,
    /// `None` when the recorded state is unknown.
    pub agrees: Option<bool>,
}

/// A record whose pipeline stopped early.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordFailure {
    pub path: PathBuf,
    pub stage: Stage,
    /// Snake_case error tag, e.g. `unreadable_image`.
    pub kind: String,
    pub message: String,
}

/// Summed decision-ROI histograms, split by recorded state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoiHistograms {
    pub open: Vec<u32>,
    pub closed: Vec<u32>,
    pub unknown: Vec<u32>,
}

impl Default for RoiHistograms {
    fn default() -> Self {
        Self {
            open: vec![0; 256],
            closed: vec![0; 256],
            unknown: vec![0; 256],
        }
    }
}

impl RoiHistograms {
    fn add(&mut self, state: RecordedState, hist: &[u32; 256]) {
        let bins = match state {
            RecordedState::Open => &mut self.open,
            RecordedState::Closed => &mut self.closed,
            RecordedState::Unknown => &mut self.unknown,
        };
        for (acc, &h) in bins.iter_mut().zip(hist.iter()) {
            *acc += h;
        }
    }

    fn merge(&mut self, other: &RoiHistograms) {
        for (mine, theirs) in [
            (&mut self.open, &other.open),
            (&mut self.closed, &other.closed),
            (&mut self.unknown, &other.unknown),
        ] {
            for (a, &b) in mine.iter_mut().zip(theirs) {
                *a += b;
            }
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementSummary {
    /// Outcomes with a known recorded state.
    pub compared: usize,
    pub agreed: usize,
    pub disagreed: usize,
}

impl AgreementSummary {
    /// Share of compared outcomes that agree, `None` if nothing was compared.
    pub fn rate(&self) -> Option<f64> {
        (self.compared > 0).then(|| self.agreed as f64 / self.compared as f64)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<RecordOutcome>,
    pub failures: Vec<RecordFailure>,
    pub histograms: RoiHistograms,
}

impl BatchReport {
    pub fn len(&self) -> usize {
        self.outcomes.len() + self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn agreement(&self) -> AgreementSummary {
        self.outcomes
            .iter()
            .fold(AgreementSummary::default(), |mut acc, o| {
                match o.agrees {
                    Some(true) => {
                        acc.compared += 1;
                        acc.agreed += 1;
                    }
                    Some(false) => {
                        acc.compared += 1;
                        acc.disagreed += 1;
                    }
                    None => {}
                }
                acc
            })
    }

    /// Outcomes whose verdict contradicts the recorded state.
    pub fn mismatches(&self) -> impl Iterator<Item = &RecordOutcome> {
        self.outcomes.iter().filter(|o| o.agrees == Some(false))
    }

    fn absorb(mut self, analyzed: Analyzed) -> Self {
        match analyzed {
            Analyzed::Outcome(outcome, hist) => {
                self.histograms.add(outcome.recorded, &hist);
                self.outcomes.push(outcome);
            }
            Analyzed::Failure(failure) => self.failures.push(failure),
        }
        self
    }

    #[cfg_attr(not(feature = "rayon"), allow(dead_code))]
    fn merge(mut self, other: BatchReport) -> Self {
        self.outcomes.extend(other.outcomes);
        self.failures.extend(other.failures);
        self.histograms.merge(&other.histograms);
        self
    }
}

/// Result of running one record.
#[derive(Debug)]
pub enum Analyzed {
    Outcome(RecordOutcome, [u32; 256]),
    Failure(RecordFailure),
}

/// Run one record to its decision.
pub fn analyze_record(record: &mut ImageRecord) -> Analyzed {
    let decided = record
        .decision()
        .and_then(|d| record.roi_histogram().map(|h| (d, h)));
    match decided {
        Ok((decision, hist)) => {
            let recorded = record.recorded_state();
            Analyzed::Outcome(
                RecordOutcome {
                    path: record.path().to_path_buf(),
                    timestamp: record.timestamp(),
                    recorded,
                    decision,
                    agrees: recorded.agrees_with(decision.state),
                },
                hist,
            )
        }
        Err(e) => {
            log::warn!("{}: {e}", record.path().display());
            Analyzed::Failure(RecordFailure {
                path: record.path().to_path_buf(),
                stage: e.stage,
                kind: e.kind.tag().to_string(),
                message: e.kind.to_string(),
            })
        }
    }
}

/// One record per path, all sharing `template` and `params`.
pub fn records_from_paths<I>(
    paths: I,
    template: &Template,
    params: &Arc<PipelineParams>,
) -> Vec<ImageRecord>
where
    I: IntoIterator,
    I::Item: Into<PathBuf>,
{
    paths
        .into_iter()
        .map(|p| ImageRecord::new(p, template.clone(), Arc::clone(params)))
        .collect()
}

fn log_summary(report: &BatchReport) {
    let a = report.agreement();
    log::info!(
        "batch: {} decided, {} failed, {}/{} agree with recorded state",
        report.outcomes.len(),
        report.failures.len(),
        a.agreed,
        a.compared
    );
}

/// Run every record in order, isolating failures.
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn analyze_batch<I>(records: I) -> BatchReport
where
    I: IntoIterator<Item = ImageRecord>,
{
    let report = records
        .into_iter()
        .map(|mut r| analyze_record(&mut r))
        .fold(BatchReport::default(), BatchReport::absorb);
    log_summary(&report);
    report
}

/// [`analyze_batch`] across the rayon thread pool.
///
/// Each worker owns the records it processes; the template raster is shared
/// through its `Arc`. Outcomes and failures come back sorted by path.
#[cfg(feature = "rayon")]
#[cfg_attr(feature = "tracing", instrument(level = "info", skip_all))]
pub fn analyze_batch_parallel(records: Vec<ImageRecord>) -> BatchReport {
    use rayon::prelude::*;

    let mut report = records
        .into_par_iter()
        .map(|mut r| analyze_record(&mut r))
        .fold(BatchReport::default, BatchReport::absorb)
        .reduce(BatchReport::default, BatchReport::merge);
    report.outcomes.sort_by(|a, b| a.path.cmp(&b.path));
    report.failures.sort_by(|a, b| a.path.cmp(&b.path));
    log_summary(&report);
    report
}
