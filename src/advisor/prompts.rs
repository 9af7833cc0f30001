//! Prompt construction for the two proposal patterns.

use super::types::InvestmentInput;

const ALLOCATION_FORMAT: &str = r#"  "allocations": [
    {
      "category": "category name",
      "percentage": share (number),
      "amount": amount (number),
      "reasoning": "why this category"
    }
  ],
  "summary": "overall recommendation (about 200 characters)""#;

/// Prompt for sub-allocations within the user's chosen category.
pub fn build_user_based_prompt(input: &InvestmentInput) -> String {
    format!(
        r#"You are a marketing investment expert. Propose an investment allocation based on the information below.

[Company]
- Company name: {company}
- Investment category: {industry}
- Budget: {budget} JPY
{details}
[Instructions]
1. Break the user's investment category "{industry}" down into concrete sub-categories and allocate the budget across them.
2. Example: "SNS ads, YouTube ads" -> "Instagram ads (40%)", "Facebook ads (30%)", "YouTube TrueView ads (30%)".
3. For each sub-category give the share (%), the amount and the reasoning.
4. The shares must add up to 100%.

[Answer format] (answer in JSON only)
{{
{format}
}}"#,
        company = input.company_name,
        industry = input.industry,
        budget = format_amount(input.budget),
        details = details_line(input),
        format = ALLOCATION_FORMAT,
    )
}

/// Prompt leaving the choice of categories entirely to the model.
pub fn build_ai_based_prompt(input: &InvestmentInput) -> String {
    format!(
        r#"You are a marketing investment expert. Freely propose the best investment allocation based on the information below.

[Company]
- Company name: {company}
- Budget: {budget} JPY
{details}
[Instructions]
1. Choose the investment categories yourself; nothing is fixed in advance.
2. Take current marketing trends into account and pick effective channels.
3. Consider a wide range of options such as SNS ads, content marketing, SEO and influencer marketing.
4. For each category give the share (%), the amount and the reasoning.
5. The shares must add up to 100%.

[Answer format] (answer in JSON only)
{{
{format},
  "recommendedCategories": ["main category 1", "category 2"]
}}"#,
        company = input.company_name,
        budget = format_amount(input.budget),
        details = details_line(input),
        format = ALLOCATION_FORMAT,
    )
}

fn details_line(input: &InvestmentInput) -> String {
    match input.details.as_deref().map(str::trim) {
        Some(details) if !details.is_empty() => format!("- Concerns: {}\n", details),
        _ => String::new(),
    }
}

/// `1234567` -> `"1,234,567"`.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(details: Option<&str>) -> InvestmentInput {
        InvestmentInput {
            company_name: "Acme".into(),
            industry: "SNS ads".into(),
            budget: 1_500_000,
            details: details.map(str::to_string),
        }
    }

    #[test]
    fn test_format_amount() {
        assert_eq!(format_amount(0), "0");
        assert_eq!(format_amount(999), "999");
        assert_eq!(format_amount(1_000), "1,000");
        assert_eq!(format_amount(1_500_000), "1,500,000");
        assert_eq!(format_amount(12_345_678), "12,345,678");
    }

    #[test]
    fn test_user_based_prompt_mentions_category() {
        let prompt = build_user_based_prompt(&input(Some("low brand awareness")));
        assert!(prompt.contains("Acme"));
        assert!(prompt.contains("\"SNS ads\""));
        assert!(prompt.contains("1,500,000"));
        assert!(prompt.contains("Concerns: low brand awareness"));
        assert!(!prompt.contains("recommendedCategories"));
    }

    #[test]
    fn test_ai_based_prompt_omits_category() {
        let prompt = build_ai_based_prompt(&input(None));
        assert!(!prompt.contains("SNS ads\""));
        assert!(!prompt.contains("Concerns"));
        assert!(prompt.contains("recommendedCategories"));
    }
}
