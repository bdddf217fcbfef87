//! Caller-facing configuration surface (spec §6).

/// Coarse presets that adjust tolerance/threshold fields together.
/// Applied before any explicit per-field override, so a caller can start
/// from a preset and still fine-tune individual fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    Fast,
    #[default]
    Balanced,
    Accurate,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOptions {
    pub confidence_threshold: f64,
    pub min_rows: usize,
    pub min_cols: usize,
    pub cell_merging: bool,
    pub row_tolerance: f64,
    pub col_tolerance: f64,
    pub processing_mode: ProcessingMode,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        ExtractionOptions::for_mode(ProcessingMode::Balanced)
    }
}

impl ExtractionOptions {
    /// Builds the default options for a given preset. `min_rows`,
    /// `min_cols` and `cell_merging` do not vary across presets — only the
    /// tolerance/threshold fields do.
    pub fn for_mode(mode: ProcessingMode) -> Self {
        let (confidence_threshold, row_tolerance, col_tolerance) = match mode {
            ProcessingMode::Fast => (0.6, 3.0, 4.0),
            ProcessingMode::Balanced => (0.7, 2.0, 3.0),
            ProcessingMode::Accurate => (0.8, 1.5, 2.0),
        };
        ExtractionOptions {
            confidence_threshold,
            min_rows: 3,
            min_cols: 2,
            cell_merging: true,
            row_tolerance,
            col_tolerance,
            processing_mode: mode,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_balanced() {
        let opts = ExtractionOptions::default();
        assert_eq!(opts.processing_mode, ProcessingMode::Balanced);
        assert_eq!(opts.confidence_threshold, 0.7);
        assert_eq!(opts.row_tolerance, 2.0);
        assert_eq!(opts.col_tolerance, 3.0);
    }

    #[test]
    fn test_fast_preset_is_coarser() {
        let fast = ExtractionOptions::for_mode(ProcessingMode::Fast);
        let balanced = ExtractionOptions::for_mode(ProcessingMode::Balanced);
        assert!(fast.confidence_threshold < balanced.confidence_threshold);
        assert!(fast.row_tolerance > balanced.row_tolerance);
    }

    #[test]
    fn test_accurate_preset_is_tighter() {
        let accurate = ExtractionOptions::for_mode(ProcessingMode::Accurate);
        let balanced = ExtractionOptions::for_mode(ProcessingMode::Balanced);
        assert!(accurate.confidence_threshold > balanced.confidence_threshold);
        assert!(accurate.col_tolerance < balanced.col_tolerance);
    }

    #[test]
    fn test_presets_share_row_col_minimums() {
        for mode in [ProcessingMode::Fast, ProcessingMode::Balanced, ProcessingMode::Accurate] {
            let opts = ExtractionOptions::for_mode(mode);
            assert_eq!(opts.min_rows, 3);
            assert_eq!(opts.min_cols, 2);
            assert!(opts.cell_merging);
        }
    }
}
