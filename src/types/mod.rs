pub mod dataset;
pub mod request;
