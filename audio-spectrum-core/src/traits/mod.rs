pub mod capture_provider;
pub mod spectrum_delegate;
