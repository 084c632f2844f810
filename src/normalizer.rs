/// Trims and lowercases a city name for resume comparisons.
pub fn normalize_city(city: &str) -> String {
    city.trim().to_lowercase()
}

/// Keeps only the digits of a phone number, in order.
pub fn clean_phone(phone: &str) -> String {
    phone.chars().filter(|c| c.is_ascii_digit()).collect()
}
