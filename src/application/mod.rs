// Application layer - Use cases and ports
pub mod errors;
pub mod refresh;
pub mod report_service;
pub mod ticket_repository;
pub mod timer_stream_service;
