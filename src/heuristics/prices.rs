use once_cell::sync::Lazy;
use regex::Regex;

/// Fallback display price when nothing could be determined.
pub const SEE_WEBSITE: &str = "See website";
pub const FREE: &str = "Free";

/// Collapses a structured lowPrice/highPrice pair into a display string:
/// `"Free"` when both are zero, `"$N"` when equal, else `"$N - $M"`, each
/// rounded to the nearest whole dollar.
pub fn price_from_range(low: f64, high: f64) -> String {
    let low_rounded = low.round() as i64;
    let high_rounded = high.round() as i64;
    if low_rounded == 0 && high_rounded == 0 {
        FREE.to_string()
    } else if low_rounded == high_rounded {
        format!("${}", low_rounded)
    } else {
        format!("${} - ${}", low_rounded, high_rounded)
    }
}

static MEMBER_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Members?:\s*\$(\d+(?:\.\d+)?)").unwrap());
static PUBLIC_PRICE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Public:\s*\$(\d+(?:\.\d+)?)").unwrap());

/// Scans page text for a `Members: $N` price, optionally paired with a
/// `Public: $N` price. The member price is the headline figure.
pub fn price_from_member_text(text: &str) -> Option<String> {
    let member: f64 = MEMBER_PRICE.captures(text)?.get(1)?.as_str().parse().ok()?;
    let member = member.round() as i64;

    if let Some(public) = PUBLIC_PRICE
        .captures(text)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse::<f64>().ok())
    {
        return Some(format!("${} members, ${} public", member, public.round() as i64));
    }
    Some(format!("${}", member))
}

/// Keyword scan: "free" co-occurring with "admission" anywhere in the text.
pub fn free_admission_in_text(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower.contains("free") && lower.contains("admission")
}
