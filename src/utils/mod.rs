//! Shared helpers: input limits, value normalization, numeric sanitization.

pub mod validation;
