use crate::repository::StudentRepository;
use lens_inference::Pipeline;
use std::sync::Arc;

pub type AppState = Arc<State>;

/// Process-wide handles, built once at startup and only read by handlers
pub struct State {
    pub pipeline: Arc<Pipeline>,
    pub students: StudentRepository,
}

impl State {
    pub fn new(pipeline: Arc<Pipeline>, students: StudentRepository) -> Self {
        Self { pipeline, students }
    }
}
