/// Age threshold, in days, used by the periodic archive sweep.
pub const DEFAULT_ARCHIVE_AFTER_DAYS: i64 = 7;

/// Largest accepted archive threshold (100 years).
pub const MAX_ARCHIVE_AFTER_DAYS: i64 = 36_500;

/// Default number of flyers handed to an extraction worker per poll.
pub const DEFAULT_PROCESSING_BATCH_LIMIT: i64 = 50;

/// Interval between two archive sweeps.
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 60 * 60;

/// Delay before the first sweep after startup.
pub const DEFAULT_SWEEP_INITIAL_DELAY_SECS: u64 = 60;

/// Page size applied to listings when the caller does not set a limit.
pub const DEFAULT_PAGE_LIMIT: i64 = 100;

/// Upper bound for a single page.
pub const MAX_PAGE_LIMIT: i64 = 1_000;
