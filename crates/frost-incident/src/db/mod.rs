pub mod entity;

mod converter;

pub use entity::{alert, incident, incident_comment, incident_timeline_event};
