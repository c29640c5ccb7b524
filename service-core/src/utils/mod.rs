pub mod format;

pub use format::{
    format_date, format_date_and_time, format_terms_agreement_date, format_time,
    parse_json_safely,
};
