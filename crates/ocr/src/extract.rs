use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use rust_decimal::Decimal;

use crate::words::words_to_number;
use rasid_core::{ExtractedFields, NOT_FOUND};

// ── Compiled regex cache ─────────────────────────────────────────────────────

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_amount_symbol, r"₹\s*([0-9,]+(?:\.[0-9]{1,2})?)");
re!(re_amount_words, r"(?i)Rupees\s+([A-Za-z\s\-]+?)\s+Only");
re!(re_amount_grouped, r"\b(\d{1,3}(?:,\d{3})+(?:\.\d{1,2})?)\b");
re!(re_amount_keyword,
    r"(?i)(?:Amount|Total|INR|Rs\.?|Value|Paid|Payment)\s*[:\-]?\s*([0-9,]+(?:\.[0-9]{1,2})?)");
re!(re_amount_bare, r"\b([0-9]{3,7}(?:\.[0-9]{1,2})?)\b");
re!(re_year_token, r"^(?:19|20)\d{2}$");

re!(re_txn_phonepe, r"\b(T\d{18,25})\b");
re!(re_txn_ref_spaced, r"(?i)UPI\s*Ref\.?\s*No[:\s\-]*(\d{6,8}\s+\d{5,6})");
re!(re_txn_ref_compact, r"(?i)UPI\s*Ref\.?\s*No[:\s\-]*(\d{12,13})");
re!(re_txn_labeled, r"(?i)Transaction\s*ID\s*[:\-\s]*([A-Z0-9\-]{6,60})");
re!(re_txn_utr, r"(?i)UTR[:\s]+(\d{10,15})");
re!(re_txn_t_prefixed, r"\b(T\d{15,30})\b");
re!(re_txn_bare, r"\b(\d{12,15})\b");

re!(re_name_paid_to, r"(?i)Paid\s+to\s*[:\-\s]*([A-Z][A-Za-z\s\.\-&]{2,50})");
re!(re_name_to, r"(?i)\bTo\s*[:\-\s]*([A-Z][A-Za-z\s\.\-&]{2,50})");
re!(re_name_verified,
    r"(?i)(?:Verified|Banking)\s+Name\s*[:\-\s]*([A-Za-z][A-Za-z\s\.\-&]{2,50})");
re!(re_name_junk, r"[^A-Za-z0-9 &\.\-]");
re!(re_whitespace, r"\s+");

re!(re_upi_id, r"\b([A-Za-z0-9._\-]+@[A-Za-z0-9._\-]+)\b");

re!(re_dt_time_first,
    r"(?i)(\d{1,2}:\d{2})\s*(?:am|pm)?\s+on\s+(\d{1,2}\s+[A-Za-z]{3,9}\s+\d{4})");
re!(re_dt_date_first,
    r"(\d{1,2}\s+[A-Za-z]{3,9}\s+\d{4})\s*,?\s+(\d{1,2}:\d{2}\s*[APap][Mm])");
re!(re_dt_numeric, r"\d{1,2}/\d{1,2}/\d{4}[ \t]+\d{1,2}:\d{2}");

// ── Public extraction API ─────────────────────────────────────────────────────

pub struct Extractor;

impl Extractor {
    /// Run all five field cascades over a transcript. Pure and total: every
    /// field comes back as a validated value or the `"Not Found"` sentinel,
    /// and no input can make this panic.
    pub fn extract(transcript: &str) -> ExtractedFields {
        ExtractedFields {
            amount: extract_amount(transcript),
            date_time: extract_date_time(transcript),
            transaction_id: extract_transaction_id(transcript),
            person_name: extract_person_name(transcript),
            upi_id: extract_upi_id(transcript),
        }
    }
}

// ── Amount ────────────────────────────────────────────────────────────────────

type AmountRule = fn(&str) -> Vec<String>;

/// Ordered most-reliable first: a ₹-prefixed figure beats a worded amount
/// beats a comma-grouped number, and a bare digit run is the last resort.
const AMOUNT_RULES: &[AmountRule] = &[
    symbol_amounts,
    worded_amounts,
    grouped_amounts,
    keyword_amounts,
    bare_amounts,
];

fn extract_amount(text: &str) -> String {
    for rule in AMOUNT_RULES {
        for candidate in rule(text) {
            if !is_valid_amount(&candidate) {
                continue;
            }
            if let Some(formatted) = format_amount(&candidate) {
                return formatted;
            }
        }
    }
    NOT_FOUND.to_string()
}

fn symbol_amounts(text: &str) -> Vec<String> {
    re_amount_symbol()
        .captures_iter(text)
        .map(|c| c[1].replace([',', ' '], ""))
        .collect()
}

fn worded_amounts(text: &str) -> Vec<String> {
    re_amount_words()
        .captures_iter(text)
        .filter_map(|c| words_to_number(c[1].trim()))
        .map(|n| n.to_string())
        .collect()
}

fn grouped_amounts(text: &str) -> Vec<String> {
    re_amount_grouped()
        .captures_iter(text)
        .map(|c| c[1].replace(',', ""))
        .collect()
}

fn keyword_amounts(text: &str) -> Vec<String> {
    re_amount_keyword()
        .captures(text)
        .map(|c| c[1].replace(',', ""))
        .into_iter()
        .collect()
}

fn bare_amounts(text: &str) -> Vec<String> {
    // Exactly-four-digit tokens in 1900..=2099 are assumed to be years.
    // Known limitation: a genuine amount in that band is skipped here too.
    re_amount_bare()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .filter(|v| !re_year_token().is_match(v))
        .collect()
}

/// Plausibility band for this domain; candidates outside it are rejected
/// and the cascade continues.
fn is_valid_amount(candidate: &str) -> bool {
    let clean = candidate.replace([',', ' '], "");
    match Decimal::from_str(&clean) {
        Ok(v) => v >= Decimal::from(10) && v <= Decimal::from(100_000_000),
        Err(_) => false,
    }
}

/// Normalize to a ₹-prefixed string: integers unpadded, fractions trimmed
/// of trailing zeros ("1250.00" → "₹1250", "99.50" → "₹99.5").
fn format_amount(candidate: &str) -> Option<String> {
    let clean = candidate.replace([',', ' '], "");
    let value = Decimal::from_str(&clean).ok()?;
    Some(format!("₹{}", value.round_dp(2).normalize()))
}

// ── Transaction ID ────────────────────────────────────────────────────────────

type IdRule = fn(&str) -> Option<String>;

const ID_RULES: &[IdRule] = &[
    phonepe_id,
    upi_ref_spaced,
    upi_ref_compact,
    labeled_transaction_id,
    utr_number,
    t_prefixed_fallback,
    bare_long_number,
];

fn extract_transaction_id(text: &str) -> String {
    ID_RULES
        .iter()
        .find_map(|rule| rule(text))
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

fn phonepe_id(text: &str) -> Option<String> {
    re_txn_phonepe().captures(text).map(|c| c[1].to_string())
}

fn upi_ref_spaced(text: &str) -> Option<String> {
    re_txn_ref_spaced()
        .captures(text)
        .map(|c| c[1].replace(' ', ""))
}

fn upi_ref_compact(text: &str) -> Option<String> {
    re_txn_ref_compact().captures(text).map(|c| c[1].to_string())
}

fn labeled_transaction_id(text: &str) -> Option<String> {
    re_txn_labeled()
        .captures(text)
        .map(|c| c[1].trim().to_string())
}

fn utr_number(text: &str) -> Option<String> {
    re_txn_utr().captures(text).map(|c| c[1].to_string())
}

fn t_prefixed_fallback(text: &str) -> Option<String> {
    re_txn_t_prefixed().captures(text).map(|c| c[1].to_string())
}

fn bare_long_number(text: &str) -> Option<String> {
    // Indian mobile numbers start with these digits and show up on
    // receipts constantly; skip anything that looks like one.
    const MOBILE_PREFIXES: [&str; 5] = ["91", "90", "80", "70", "60"];
    re_txn_bare()
        .captures_iter(text)
        .map(|c| c[1].to_string())
        .find(|n| !MOBILE_PREFIXES.iter().any(|p| n.starts_with(p)))
}

// ── Person name ──────────────────────────────────────────────────────────────

fn extract_person_name(text: &str) -> String {
    // (matcher, apply generic-word denylist). The denylist only guards the
    // bare "To" pattern, which mis-captures phrases like "To Transaction".
    const NAME_RULES: &[(fn() -> &'static Regex, bool)] = &[
        (re_name_paid_to, false),
        (re_name_to, true),
        (re_name_verified, false),
    ];
    const GENERIC_WORDS: [&str; 3] = ["transaction", "payment", "successful"];

    for (rule, denylist) in NAME_RULES {
        let Some(c) = rule().captures(text) else {
            continue;
        };
        let name = clean_name(&c[1]);
        if name.chars().count() < 3 {
            continue;
        }
        if *denylist && GENERIC_WORDS.contains(&name.to_lowercase().as_str()) {
            continue;
        }
        return name;
    }
    NOT_FOUND.to_string()
}

fn clean_name(raw: &str) -> String {
    let collapsed = re_whitespace().replace_all(raw, " ");
    let trimmed = collapsed.trim().trim_matches(|c| c == ':' || c == '.');
    re_name_junk().replace_all(trimmed, "").trim().to_string()
}

// ── UPI ID ───────────────────────────────────────────────────────────────────

fn extract_upi_id(text: &str) -> String {
    re_upi_id()
        .captures(text)
        .map(|c| c[1].to_lowercase())
        .unwrap_or_else(|| NOT_FOUND.to_string())
}

// ── Date & time ──────────────────────────────────────────────────────────────

fn extract_date_time(text: &str) -> String {
    // "09:15 am on 4 Mar 2024" — normalized as "<time> on <date>".
    if let Some(c) = re_dt_time_first().captures(text) {
        return format!("{} on {}", &c[1], &c[2]);
    }
    // "4 Mar 2024, 09:15 AM" — reordered to the same shape.
    if let Some(c) = re_dt_date_first().captures(text) {
        return format!("{} on {}", &c[2], &c[1]);
    }
    // Raw numeric "4/3/2024 09:15" passes through verbatim.
    if let Some(m) = re_dt_numeric().find(text) {
        return m.as_str().trim().to_string();
    }
    NOT_FOUND.to_string()
}

// ── Tests ─────────────────────────────────────────────────────────────────────
