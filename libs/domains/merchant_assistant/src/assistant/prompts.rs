//! Prompt assembly for the merchant assistant

use crate::models::{MerchantProfile, RetrievedContext};

/// Fixed framing placed at the top of every prompt
pub const MERCHANT_SYSTEM_PROMPT: &str = r#"You are a business advisor for small and mid-sized merchants using a financial back-office platform.
Give concise, actionable insights the merchant can apply this week. Focus on:

1. **Operational efficiency**: reducing costs, fees, and manual work
2. **Marketing**: reaching and retaining customers
3. **Sales growth**: pricing, upselling, and new revenue channels

Ground your advice in the merchant context and earlier conversations when they are relevant.
If information is missing, say what you would need instead of inventing figures."#;

/// Build the full completion prompt.
///
/// Sections appear in a fixed order: framing, previous conversations (only
/// when there are any), merchant context, then the new query.
pub fn build_prompt(
    query: &str,
    merchant_id: &str,
    profile: Option<&MerchantProfile>,
    context: &RetrievedContext,
) -> String {
    let mut prompt = String::new();

    prompt.push_str(MERCHANT_SYSTEM_PROMPT);
    prompt.push_str("\n\n");

    if !context.is_empty() {
        prompt.push_str("## Previous Conversations\n\n");
        for pair in &context.pairs {
            prompt.push_str(&format!("Previous Query: {}\n", pair.query));
            prompt.push_str(&format!("Previous Response: {}\n\n", pair.response));
        }
    }

    prompt.push_str("## Merchant Context\n\n");
    prompt.push_str(&format!("- Merchant ID: {}\n", merchant_id));
    if let Some(profile) = profile {
        push_profile(&mut prompt, profile);
    }
    prompt.push('\n');

    prompt.push_str("## Current Query\n\n");
    prompt.push_str(query);
    prompt.push('\n');

    prompt
}

fn push_profile(prompt: &mut String, profile: &MerchantProfile) {
    if let Some(name) = &profile.business_name {
        prompt.push_str(&format!("- Business name: {}\n", name));
    }
    if let Some(industry) = &profile.industry {
        prompt.push_str(&format!("- Industry: {}\n", industry));
    }
    if let Some(location) = &profile.location {
        prompt.push_str(&format!("- Location: {}\n", location));
    }
    if let Some(currency) = &profile.currency {
        prompt.push_str(&format!("- Currency: {}\n", currency));
    }
    if let Some(revenue) = profile.monthly_revenue {
        let currency = profile.currency.as_deref().unwrap_or("");
        prompt.push_str(&format!(
            "- Monthly revenue: {} {}\n",
            format_minor_units(revenue),
            currency
        ));
    }
    if !profile.goals.is_empty() {
        prompt.push_str(&format!("- Goals: {}\n", profile.goals.join("; ")));
    }
}

/// Render an amount in minor units with two decimals, exactly
fn format_minor_units(amount: i64) -> String {
    let sign = if amount < 0 { "-" } else { "" };
    let abs = amount.unsigned_abs();
    format!("{}{}.{:02}", sign, abs / 100, abs % 100)
}
