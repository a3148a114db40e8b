use crate::domain::model::{DealListing, FormattedMessage};

pub const MAX_TITLE_CHARS: usize = 200;

const MARKDOWN_V2_SPECIAL: &[char] = &[
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
    '\\',
];

/// Escapes free text for Telegram MarkdownV2.
pub fn escape_markdown(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&ch) {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

/// Inside `(...)` of an inline link only `)` and `\` need escaping.
pub fn escape_link_url(url: &str) -> String {
    let mut out = String::with_capacity(url.len());
    for ch in url.chars() {
        if ch == ')' || ch == '\\' {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

pub fn format_price(currency: &str, price: f64) -> String {
    let cents = (price * 100.0).round() as u64;
    let whole = group_thousands(cents / 100);
    match cents % 100 {
        0 => format!("{}{}", currency, whole),
        fraction => format!("{}{}.{:02}", currency, whole, fraction),
    }
}

fn truncate_title(title: &str) -> String {
    if title.chars().count() <= MAX_TITLE_CHARS {
        return title.to_string();
    }
    let mut short: String = title.chars().take(MAX_TITLE_CHARS - 1).collect();
    short.push('…');
    short
}

pub fn format_message(listing: &DealListing, affiliate_url: &str) -> FormattedMessage {
    let mut text = format!("*{}*\n\n", escape_markdown(&truncate_title(&listing.title)));

    text.push_str(&format!(
        "💰 *Price:* {}\n",
        escape_markdown(&format_price(&listing.currency, listing.price))
    ));

    if let Some(rating) = &listing.rating {
        text.push_str(&format!("⭐ *Rating:* {}\n", escape_markdown(rating)));
    }

    text.push_str(&format!(
        "🛍️ *Available on:* {}\n",
        escape_markdown(&listing.marketplace)
    ));
    text.push_str(&format!("\n🔗 [Buy Now]({})", escape_link_url(affiliate_url)));

    FormattedMessage {
        product_id: listing.product_id.clone(),
        text,
        image_url: listing.image_url.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn listing(title: &str, rating: Option<&str>) -> DealListing {
        DealListing {
            product_id: "B0TEST0001".to_string(),
            title: title.to_string(),
            price: 1299.0,
            currency: "₹".to_string(),
            original_url: "https://www.amazon.in/dp/B0TEST0001".to_string(),
            image_url: Some("https://m.media-amazon.com/images/I/test.jpg".to_string()),
            rating: rating.map(str::to_string),
            marketplace: "Amazon".to_string(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn test_escape_markdown() {
        assert_eq!(escape_markdown("Wi-Fi 6 (2024)!"), "Wi\\-Fi 6 \\(2024\\)\\!");
        assert_eq!(escape_markdown("plain text"), "plain text");
    }

    #[test]
    fn test_escape_link_url() {
        assert_eq!(
            escape_link_url("https://x.example/a_(b)?q=1.5"),
            "https://x.example/a_(b\\)?q=1.5"
        );
    }

    #[test]
    fn test_format_price() {
        assert_eq!(format_price("₹", 1299.0), "₹1,299");
        assert_eq!(format_price("₹", 129999.5), "₹129,999.50");
        assert_eq!(format_price("$", 9.99), "$9.99");
        assert_eq!(format_price("₹", 999.0), "₹999");
    }

    #[test]
    fn test_format_message_contains_required_parts() {
        let message = format_message(
            &listing("Boat Rockerz 450", Some("4.1 out of 5 stars")),
            "https://ek.example/x?subid=42",
        );

        assert_eq!(message.product_id, "B0TEST0001");
        assert!(message.text.starts_with("*Boat Rockerz 450*"));
        assert!(message.text.contains("₹1,299"));
        assert!(message.text.contains("4\\.1 out of 5 stars"));
        assert!(message.text.contains("Amazon"));
        assert!(message.text.contains("[Buy Now](https://ek.example/x?subid=42)"));
        assert_eq!(
            message.image_url.as_deref(),
            Some("https://m.media-amazon.com/images/I/test.jpg")
        );
    }

    #[test]
    fn test_format_message_without_rating() {
        let message = format_message(&listing("Kindle", None), "https://ek.example/k");
        assert!(!message.text.contains("Rating"));
    }

    #[test]
    fn test_long_titles_are_truncated() {
        let long = "a".repeat(500);
        let message = format_message(&listing(&long, None), "https://ek.example/k");
        let first_line = message.text.lines().next().unwrap();
        assert_eq!(first_line.chars().count(), MAX_TITLE_CHARS + 2);
        assert!(first_line.ends_with("…*"));
    }
}
