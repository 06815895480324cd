mod aggregation;
mod common;
mod phase;
