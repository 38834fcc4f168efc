// Domain layer - Pure types and calculations, no I/O
pub mod completion;
pub mod permissions;
pub mod report;
pub mod session;
pub mod ticket;
pub mod timer;
