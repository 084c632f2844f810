// Parser module: turns a rendered results page into listing records.

pub mod card_parser;

pub use card_parser::CardParser;

use crate::model::ListingRecord;

pub trait Parser {
    /// Returns one candidate record per result card, in page order. Records may be incomplete.
    fn parse(&self, html: &str) -> Vec<ListingRecord>;
}
