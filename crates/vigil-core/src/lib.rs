pub mod filter;
pub mod keys;
pub mod recorder;
pub mod retention;
pub mod status;

pub use filter::MetricFilter;
pub use keys::{series_key, DEFAULT_KEY_PREFIX};
pub use recorder::RollupRecorder;
pub use retention::{RetentionPolicy, RetentionTrimmer, TrimStats};
pub use status::{expand_fields, parse_status, StatusField};
