pub mod course;
pub mod group;
pub mod project;
pub mod store;
pub mod user;
