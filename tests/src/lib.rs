//! Cross-crate scenarios: fixture files in, rendered exposition out.

mod probing;
mod scrape;
