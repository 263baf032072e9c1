//! Embedded prompts
//!
//! These are compiled into the binary from .pmt files at build time.

use tracing::debug;

/// Writer agent instructions
pub const WRITER: &str = include_str!("../../prompts/writer.pmt");

/// Reviewer agent instructions
pub const REVIEWER: &str = include_str!("../../prompts/reviewer.pmt");

/// Request sent to the reviewer for each captured draft
pub const REVIEW_REQUEST: &str = include_str!("../../prompts/review-request.pmt");

/// Revision request sent back to the writer
pub const REVISION: &str = include_str!("../../prompts/revision.pmt");

/// Fixed instruction shown to the human operator
pub const HUMAN_INSTRUCTION: &str = include_str!("../../prompts/human-instruction.pmt");

/// Get the embedded prompt by name
pub fn get_embedded(name: &str) -> Option<&'static str> {
    debug!(%name, "get_embedded: called");
    match name {
        "writer" => Some(WRITER),
        "reviewer" => Some(REVIEWER),
        "review-request" => Some(REVIEW_REQUEST),
        "revision" => Some(REVISION),
        "human-instruction" => Some(HUMAN_INSTRUCTION),
        _ => {
            debug!("get_embedded: no match found");
            None
        }
    }
}
