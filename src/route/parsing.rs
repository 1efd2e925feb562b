/// Extract the first integer token of an advisory duration label.
///
/// `"15 mins"` gives 15, `"about 7 min"` gives 7, `"n/a"` gives `None`.
pub fn parse_duration_minutes(label: &str) -> Option<u32> {
    let start = label.find(|c: char| c.is_ascii_digit())?;
    let digits: String = label[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}
