pub mod capture_session;
mod dispatcher;
