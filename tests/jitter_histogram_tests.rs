//! Jitter Histogram Verification Suite
//!
//! Exercises the bin counter and the sampler through the public API:
//! bin selection, saturation, last-value tracking and the total-count
//! invariant over arbitrary sample sequences.

#[cfg(test)]
mod jitter_histogram_tests {
    use jittermark::measurement::NANOS_PER_MICRO;
    use jittermark::{BinCounter, JitterGeometry, JitterSampler, JitterStream};
    use proptest::prelude::*;

    const US: u64 = NANOS_PER_MICRO;

    // ============================================================================
    // Scenario: 100 µs bins, 1000 bins
    // ============================================================================

    #[test]
    fn test_reference_scenario() {
        let mut bins = BinCounter::new(100 * US, 1000).unwrap();
        for value in [50 * US, 150 * US, 150 * US, 99_990 * US, 5_000_000 * US] {
            bins.record(value);
        }

        assert_eq!(bins.counts()[0], 1);
        assert_eq!(bins.counts()[1], 2);
        assert_eq!(bins.last_value(1), Some(150 * US));
        // One genuine sample in the last bin, one saturated
        assert_eq!(bins.counts()[999], 2);
        assert_eq!(bins.last_value(999), Some(5_000_000 * US));
        assert_eq!(bins.counts().iter().sum::<u64>(), 5);
        assert_eq!(bins.total(), 5);
    }

    #[test]
    fn test_far_out_of_range_sample_saturates() {
        let mut bins = BinCounter::new(100 * US, 1000).unwrap();
        bins.record(999_900 * US);
        assert_eq!(bins.counts()[999], 1);
    }

    #[test]
    fn test_sampler_default_geometry_matches_scenario() {
        let mut sampler = JitterSampler::new();
        sampler.begin_run(JitterGeometry::default()).unwrap();
        for value in [50 * US, 150 * US, 150 * US, 99_990 * US, 5_000_000 * US] {
            assert!(sampler.record_delivery(value));
        }
        let histograms = sampler.histograms().unwrap();
        let delivery = histograms.stream(JitterStream::Delivery);
        assert_eq!(delivery.bin_width(), 100 * US);
        assert_eq!(delivery.counts()[0], 1);
        assert_eq!(delivery.counts()[1], 2);
        assert_eq!(delivery.counts()[999], 2);
        assert!(histograms.wakeup.is_empty());
        assert!(histograms.render.is_empty());
    }

    // ============================================================================
    // Precondition: recording before begin_run
    // ============================================================================

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "begin_run")]
    fn test_record_before_begin_run_asserts_in_debug() {
        let mut sampler = JitterSampler::new();
        sampler.record_wakeup(1);
    }

    #[test]
    #[cfg(not(debug_assertions))]
    fn test_record_before_begin_run_returns_false() {
        let mut sampler = JitterSampler::new();
        assert!(!sampler.record_wakeup(1));
        assert!(sampler.histograms().is_none());
    }

    // ============================================================================
    // Properties
    // ============================================================================

    proptest! {
        #[test]
        fn prop_total_equals_record_calls(
            width in 1u64..1_000_000,
            num_bins in 1usize..512,
            values in proptest::collection::vec(any::<u64>(), 0..500),
        ) {
            let mut bins = BinCounter::new(width, num_bins).unwrap();
            for &v in &values {
                bins.record(v);
            }
            prop_assert_eq!(bins.counts().iter().sum::<u64>(), values.len() as u64);
            prop_assert_eq!(bins.total(), values.len() as u64);
        }

        #[test]
        fn prop_in_range_value_lands_between_edges(
            width in 1u64..1_000_000,
            num_bins in 1usize..512,
            seed in any::<u64>(),
        ) {
            let range = width * num_bins as u64;
            let v = seed % range;
            let bins = BinCounter::new(width, num_bins).unwrap();
            let i = bins.bin_for(v);
            prop_assert!(bins.lower_edge(i) <= v);
            prop_assert!(v < bins.lower_edge(i) + width);
        }

        #[test]
        fn prop_out_of_range_value_saturates(
            width in 1u64..1_000_000,
            num_bins in 1usize..512,
            excess in 0u64..u32::MAX as u64,
        ) {
            let v = width * num_bins as u64 + excess;
            let mut bins = BinCounter::new(width, num_bins).unwrap();
            bins.record(v);
            prop_assert_eq!(bins.counts()[num_bins - 1], 1);
        }

        #[test]
        fn prop_last_value_is_most_recent(
            values in proptest::collection::vec(0u64..1_000, 1..100),
        ) {
            // All values share bin 0
            let mut bins = BinCounter::new(1_000, 4).unwrap();
            for &v in &values {
                bins.record(v);
            }
            prop_assert_eq!(bins.last_value(0), values.last().copied());
        }
    }
}
