pub mod analytics;
pub mod courses;
pub mod items;
pub mod quiz;
