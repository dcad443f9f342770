pub mod aggregator;
pub mod mailbox;
pub mod pipeline;
pub mod sample_converter;
pub mod transform;
pub mod window;
