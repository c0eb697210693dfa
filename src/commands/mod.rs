pub mod open;
pub mod projects;
