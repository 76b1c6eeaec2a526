// Lead-gated report export: lead capture, PDF layout and the download endpoint.
// PDF building is CPU-bound and must run inside tokio::task::spawn_blocking.

pub mod document;
pub mod font_metrics;
pub mod handlers;
pub mod lead;
