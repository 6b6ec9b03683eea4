//! Report Generation Tests
//!
//! Table layout, all-zero bin suppression, missing-data handling and
//! idempotence of report generation.

#[cfg(test)]
mod report_tests {
    use jittermark::measurement::report::{NO_DATA_MARKER, TABLE_HEADER};
    use jittermark::measurement::{Percentile, ZeroMeasurement};
    use jittermark::{JitterGeometry, JitterReport, JitterSampler, JitterStream, MeasurementRun};

    fn recorded_sampler() -> JitterSampler {
        let mut sampler = JitterSampler::new();
        sampler.begin_run(JitterGeometry::default()).unwrap();
        sampler.record_wakeup(20_000);
        sampler.record_render(450_000);
        sampler.record_delivery(480_000);
        sampler.record_wakeup(30_000);
        sampler.record_render(1_250_000);
        sampler.record_delivery(250_000_000);
        sampler
    }

    #[test]
    fn test_no_recordings_produces_empty_table() {
        let run = MeasurementRun::begin(JitterGeometry::default()).unwrap();
        let result = run.report("JitterMark", 4, "CPU callbacks 0, migrations 0\n", &ZeroMeasurement);

        assert_eq!(result.measurement, 0.0);
        assert_eq!(
            result.result_message,
            format!(
                "JitterMark = 0\n{}\nUnderruns 4\nCPU callbacks 0, migrations 0\n",
                TABLE_HEADER
            )
        );
    }

    #[test]
    fn test_only_populated_bins_are_listed() {
        let sampler = recorded_sampler();
        let histograms = sampler.histograms().unwrap();
        let result = JitterReport::generate("JitterMark", Some(&histograms), 1, "", &ZeroMeasurement);

        let rows: Vec<&str> = result
            .result_message
            .lines()
            .skip(2)
            .take_while(|line| !line.starts_with("Underruns"))
            .collect();
        // Bins 0, 4, 12 and the saturated 999
        assert_eq!(rows.len(), 4);
        assert!(rows[0].starts_with("    0,  0.00,         2,     30,"));
        assert!(rows[1].starts_with("    4,  0.40,         0,      -,         1,    450,         1,    480"));
        assert!(rows[2].starts_with("   12,  1.20,"));
        assert!(rows[3].starts_with("  999, 99.90,"));
        assert!(rows[3].ends_with("250000"));
    }

    #[test]
    fn test_report_is_idempotent() {
        let sampler = recorded_sampler();
        let histograms = sampler.histograms().unwrap();
        let stat = Percentile {
            stream: JitterStream::Render,
            percentile: 99.0,
        };
        let first = JitterReport::generate("JitterMark", Some(&histograms), 3, "load\n", &stat);
        let second = JitterReport::generate("JitterMark", Some(&histograms), 3, "load\n", &stat);
        assert_eq!(first, second);
    }

    #[test]
    fn test_missing_histograms_marker() {
        let sampler = JitterSampler::new();
        let histograms = sampler.histograms();
        let result = JitterReport::generate(
            "JitterMark",
            histograms.as_ref(),
            9,
            "System CPU load 5.0%\n",
            &ZeroMeasurement,
        );
        assert!(result.result_message.contains(NO_DATA_MARKER));
        assert!(result.result_message.contains("Underruns 9\n"));
        assert!(result.result_message.ends_with("System CPU load 5.0%\n"));
        assert!(!result.result_message.contains(TABLE_HEADER));
    }

    #[test]
    fn test_result_serializes_to_json() {
        let run = MeasurementRun::begin(JitterGeometry::default()).unwrap();
        let result = run.report("JitterMark", 0, "", &ZeroMeasurement);
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["test_name"], "JitterMark");
        assert_eq!(json["measurement"], 0.0);
    }
}
