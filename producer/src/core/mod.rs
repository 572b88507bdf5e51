//! Producer core business logic

pub mod generator;
pub mod processor;
pub mod prompt;
pub mod simulated;

pub use generator::LlmSampleGenerator;
pub use processor::{extract_json, process_response, strip_thinking};
pub use prompt::{build_prompt, structure_headings, DifficultySpec};
pub use simulated::SimulatedGenerator;
