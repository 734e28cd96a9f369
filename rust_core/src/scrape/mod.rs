//! Scraping: embedded-JSON extraction and page decoding.

pub mod decoder;
pub mod extract;

pub use decoder::{EspnPageDecoder, ScheduleDecoder};
pub use extract::{balanced, extract_last_array, extract_object, flatten, Occurrence};
