pub mod attendance;
pub mod backup;
pub mod classes;
pub mod core;
pub mod history;
pub mod reports;
pub mod students;
