// Resume analysis: job-field extraction, prompt rendering, and the pipeline
// that carries one request through rasterizer → throttle → model.
// All model calls go through llm_client; the pipeline only sees the trait.

pub mod handlers;
pub mod job_field;
pub mod pipeline;
pub mod prompts;
