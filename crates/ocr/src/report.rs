use crate::types::ExtractedFields;

pub const NO_ITEMS: &str = "No items detected.";

/// Render extracted fields as the human-readable receipt summary.
pub fn render(fields: &ExtractedFields) -> String {
    let mut lines = Vec::new();
    if let Some(merchant) = &fields.merchant {
        lines.push(format!("🛒 Merchant: {merchant}"));
    }
    if let Some(date) = &fields.date {
        lines.push(format!("📅 Date: {date}"));
    }
    if let Some(total) = &fields.total {
        lines.push(format!("💰 Total: ${total}"));
    }

    lines.push("\n🧾 Detected Items:".to_string());
    if fields.items.is_empty() {
        lines.push(NO_ITEMS.to_string());
    } else {
        lines.extend(
            fields
                .items
                .iter()
                .enumerate()
                .map(|(i, item)| format!("{}. {item}", i + 1)),
        );
    }

    lines.join("\n")
}
