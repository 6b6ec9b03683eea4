//! JitterMark Report
//!
//! Turns the finished histograms of a run, the sink's underrun count and the
//! CPU analyzer text into a `MarkResult`: one headline number plus a text
//! table with one row per populated bin.
//!
//! Report generation only reads its inputs, so calling it twice on the same
//! histograms yields the same result.

use std::fmt::Write;

use serde::{Deserialize, Serialize};

use super::bin_counter::BinCounter;
use super::sampler::JitterHistograms;
use super::summary::SummaryStatistic;
use super::{NANOS_PER_MICRO, NANOS_PER_MILLI};

/// Header row of the jitter table
pub const TABLE_HEADER: &str =
    " bin#,  msec,   wakeup#,  wlast,   render#,  rlast, delivery#,  clast";

/// Replaces the table when the histograms are unavailable
pub const NO_DATA_MARKER: &str = "ERROR: no jitter data";

/// Final result of a measurement run
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MarkResult {
    pub test_name: String,
    pub measurement: f64,
    pub result_message: String,
}

/// Builds the JitterMark report
pub struct JitterReport;

impl JitterReport {
    /// Render the report for a finished run.
    ///
    /// `histograms` is `None` when the run never configured its histograms;
    /// the table is then replaced by an explicit marker and the underrun and
    /// CPU lines are still produced.
    pub fn generate(
        test_name: &str,
        histograms: Option<&JitterHistograms<'_>>,
        underrun_count: u64,
        cpu_summary: &str,
        statistic: &dyn SummaryStatistic,
    ) -> MarkResult {
        let measurement = histograms.map_or(0.0, |h| statistic.summarize(h));

        let mut message = String::new();
        let _ = writeln!(message, "{} = {}", test_name, measurement);

        match histograms {
            Some(histograms) => write_table(&mut message, histograms),
            None => {
                let _ = writeln!(message, "{}", NO_DATA_MARKER);
            }
        }

        let _ = writeln!(message, "Underruns {}", underrun_count);
        message.push_str(cpu_summary);

        MarkResult {
            test_name: test_name.to_string(),
            measurement,
            result_message: message,
        }
    }
}

fn write_table(out: &mut String, histograms: &JitterHistograms<'_>) {
    let _ = writeln!(out, "{}", TABLE_HEADER);

    let num_bins = histograms.num_bins();
    let bin_width = histograms.bin_width();
    let streams = [histograms.wakeup, histograms.render, histograms.delivery];

    for index in 0..num_bins {
        if streams.iter().all(|bins| bins.counts()[index] == 0) {
            continue;
        }
        let msec = (index as u64 * bin_width) as f64 / NANOS_PER_MILLI as f64;
        let _ = write!(out, "  {:>3}, {:>5.2}", index, msec);
        for bins in streams {
            let _ = write!(
                out,
                ", {:>9}, {:>6}",
                bins.counts()[index],
                last_value_label(bins, index)
            );
        }
        out.push('\n');
    }
}

/// Last value of a bin in whole microseconds, or "-" if never written
fn last_value_label(bins: &BinCounter, index: usize) -> String {
    match bins.last_value(index) {
        Some(value) => (value / NANOS_PER_MICRO).to_string(),
        None => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::measurement::sampler::{JitterGeometry, JitterSampler};
    use crate::measurement::summary::{WorstCase, ZeroMeasurement};
    use crate::measurement::JitterStream;

    #[test]
    fn test_row_format() {
        let mut sampler = JitterSampler::new();
        sampler.begin_run(JitterGeometry::default()).unwrap();
        sampler.record_wakeup(150_000);
        sampler.record_delivery(120_000);

        let histograms = sampler.histograms().unwrap();
        let result = JitterReport::generate("JitterMark", Some(&histograms), 0, "", &ZeroMeasurement);
        let lines: Vec<&str> = result.result_message.lines().collect();
        assert_eq!(lines[0], "JitterMark = 0");
        assert_eq!(lines[1], TABLE_HEADER);
        assert_eq!(
            lines[2],
            "    1,  0.10,         1,    150,         0,      -,         1,    120"
        );
        assert_eq!(lines[3], "Underruns 0");
    }

    #[test]
    fn test_measurement_uses_statistic() {
        let mut sampler = JitterSampler::new();
        sampler.begin_run(JitterGeometry::default()).unwrap();
        sampler.record_render(3_000_000);
        let histograms = sampler.histograms().unwrap();
        let stat = WorstCase {
            stream: JitterStream::Render,
        };
        let result = JitterReport::generate("JitterMark", Some(&histograms), 2, "", &stat);
        assert!((result.measurement - 3.0).abs() < 1e-9);
        assert!(result.result_message.starts_with("JitterMark = 3\n"));
    }

    #[test]
    fn test_missing_histograms_still_reports_underruns_and_cpu() {
        let result = JitterReport::generate("JitterMark", None, 7, "CPU load 12%\n", &ZeroMeasurement);
        assert_eq!(
            result.result_message,
            "JitterMark = 0\nERROR: no jitter data\nUnderruns 7\nCPU load 12%\n"
        );
    }
}
