pub mod sample;
pub mod server;
pub mod value;

pub use sample::{Bucket, Resolution, StatusSample};
pub use server::ServerId;
pub use value::MetricValue;
