pub mod buckets;
pub mod core;
