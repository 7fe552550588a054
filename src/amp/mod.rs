//! AMP rendering support.

pub mod sanitizer;

pub use sanitizer::sanitize_amp_html;
