pub mod session;
pub mod timetable;
pub mod user;
