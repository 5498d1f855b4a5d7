//! Utility functions for string formatting and school grade math.

pub mod format;
pub mod grade;

// Re-export commonly used functions at module level
pub use format::{
    cmp_ignore_case, contains_ignore_case, digits_only, format_date, format_phone,
    parse_date, starts_with_ignore_case,
};
pub use grade::{format_grade, GraduationDate};
