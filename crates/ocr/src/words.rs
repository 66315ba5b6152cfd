//! Worded-amount parsing for receipts that spell the value out
//! ("Rupees Five Hundred Only"). Handles the Indian scales (lakh, crore)
//! alongside thousand/million.

fn unit_value(token: &str) -> Option<u64> {
    Some(match token {
        "zero" => 0,
        "one" => 1,
        "two" => 2,
        "three" => 3,
        "four" => 4,
        "five" => 5,
        "six" => 6,
        "seven" => 7,
        "eight" => 8,
        "nine" => 9,
        "ten" => 10,
        "eleven" => 11,
        "twelve" => 12,
        "thirteen" => 13,
        "fourteen" => 14,
        "fifteen" => 15,
        "sixteen" => 16,
        "seventeen" => 17,
        "eighteen" => 18,
        "nineteen" => 19,
        "twenty" => 20,
        "thirty" => 30,
        "forty" => 40,
        "fifty" => 50,
        "sixty" => 60,
        "seventy" => 70,
        "eighty" => 80,
        "ninety" => 90,
        _ => return None,
    })
}

fn scale_value(token: &str) -> Option<u64> {
    Some(match token {
        "thousand" => 1_000,
        "lakh" | "lac" => 100_000,
        "million" => 1_000_000,
        "crore" => 10_000_000,
        _ => return None,
    })
}

/// Parse a worded number. Returns `None` on any unrecognized token, so a
/// garbled OCR capture falls through instead of producing a wrong value.
pub fn words_to_number(text: &str) -> Option<u64> {
    let mut total: u64 = 0;
    let mut current: u64 = 0;
    let mut seen = false;

    for raw in text.split(|c: char| c.is_whitespace() || c == '-') {
        let token = raw.to_lowercase();
        if token.is_empty() || token == "and" {
            continue;
        }
        if let Some(v) = unit_value(&token) {
            current += v;
        } else if token == "hundred" {
            current = current.max(1) * 100;
        } else if let Some(scale) = scale_value(&token) {
            total += current.max(1) * scale;
            current = 0;
        } else {
            return None;
        }
        seen = true;
    }

    seen.then_some(total + current)
}
