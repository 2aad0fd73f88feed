//! Common regex patterns for text layout and file names.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Column separator in extracted page text: a tab, or a run of 2+ spaces
    pub static ref COLUMN_GAP: Regex = Regex::new(
        r"\t| {2,}"
    ).unwrap();

    // Anything a stored upload name may not contain
    pub static ref UNSAFE_FILENAME_CHARS: Regex = Regex::new(
        r"[^A-Za-z0-9_.\-]"
    ).unwrap();

    // Whitespace runs collapsed to one underscore in stored upload names
    pub static ref FILENAME_WHITESPACE: Regex = Regex::new(
        r"\s+"
    ).unwrap();

    // Plain decimal amount: digits, optional sign, optional `.` fraction
    pub static ref PLAIN_AMOUNT: Regex = Regex::new(
        r"^-?\d+(?:\.\d+)?$"
    ).unwrap();
}
