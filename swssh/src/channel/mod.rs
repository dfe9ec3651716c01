//! Channel layer for output capture and prompt detection.
//!
//! This module handles the byte stream coming back from the remote
//! shell: the background reader that queues it, the buffer commands
//! accumulate it in, and the prompt heuristic that decides when a
//! response is complete.

mod buffer;
pub mod prompt;
mod reader;

pub use buffer::ResponseBuffer;
pub use prompt::{ends_with_prompt, is_prompt, last_line};
pub use reader::{Poll, ResponseReader, normalize_line_feeds};
