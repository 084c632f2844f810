// Result-card field extraction for the storage directory
use crate::config::SelectorMap;
use crate::model::{ListingRecord, ParserError};
use crate::normalizer::clean_phone;
use crate::parser::Parser;
use crate::utils::collapse_whitespace;
use scraper::{ElementRef, Html, Selector};

pub struct CardParser {
    card: Selector,
    title: Selector,
    street: Selector,
    city: Selector,
    state: Selector,
    zipcode: Selector,
    phone: Selector,
    email: Selector,
}

impl CardParser {
    /// Compiles every locator up front so a bad selector map fails at startup, not per card.
    pub fn new(selectors: &SelectorMap) -> Result<Self, ParserError> {
        Ok(Self {
            card: compile("card", &selectors.card)?,
            title: compile("title", &selectors.title)?,
            street: compile("street", &selectors.street)?,
            city: compile("city", &selectors.city)?,
            state: compile("state", &selectors.state)?,
            zipcode: compile("zipcode", &selectors.zipcode)?,
            phone: compile("phone", &selectors.phone)?,
            email: compile("email", &selectors.email)?,
        })
    }

    fn parse_card(&self, card: ElementRef<'_>) -> ListingRecord {
        ListingRecord {
            title: field_text(card, &self.title),
            street: field_text(card, &self.street),
            city: field_text(card, &self.city),
            state: field_text(card, &self.state),
            zipcode: field_text(card, &self.zipcode),
            phone: clean_phone(&field_text(card, &self.phone)),
            email: field_text(card, &self.email),
        }
    }
}

impl Parser for CardParser {
    fn parse(&self, html: &str) -> Vec<ListingRecord> {
        let document = Html::parse_document(html);
        document
            .select(&self.card)
            .map(|card| self.parse_card(card))
            .collect()
    }
}

fn compile(field: &'static str, selector: &str) -> Result<Selector, ParserError> {
    Selector::parse(selector).map_err(|e| ParserError::InvalidSelector {
        field,
        selector: selector.to_string(),
        reason: e.to_string(),
    })
}

/// Text of the first match inside the card, or an empty string when nothing matches.
fn field_text(card: ElementRef<'_>, selector: &Selector) -> String {
    card.select(selector)
        .next()
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .unwrap_or_default()
}
