//! Infrastructure services

mod assistant_service;

pub use assistant_service::{AssistantAnswer, AssistantService, WarmReport, WARM_UP_QUERIES};
