//! 提示词模板

pub const CATEGORY_SYSTEM_PROMPT: &str = r#"You are an expert cultural anthropologist and data analyst.
Generate comprehensive categories for documenting a specific culture, country or region:
traditional customs, social life, arts, cuisine, clothing, architecture, language,
modern trends, geography and economic life.

Output a JSON object with the following structure:
{
    "categories": [
        {"name": "category_name_in_english", "description": "what this category covers"}
    ]
}

Generate 8-15 categories, each specific enough to drive data collection.
Return only valid JSON."#;

pub const SUBCATEGORY_SYSTEM_PROMPT: &str = r#"You are an expert cultural analyst who breaks broad cultural
categories into specific, non-overlapping subcategories for data collection.
Account for the cultural context, cover traditional and contemporary elements and
regional variations.

Output a JSON object with the following structure:
{
    "subcategories": [
        {"name": "subcategory_name_in_english", "description": "what this subcategory covers"}
    ]
}

Generate 4-10 subcategories per category.
Return only valid JSON."#;

pub const KEYWORD_SYSTEM_PROMPT: &str = r#"You are an expert at creating search keywords for image search engines.
Keywords are 2-5 word phrases people actually search for. They MUST mix the native
language(s) of the country in its native script, English, and a few mixed-language phrases.

Output a JSON object with the following structure:
{
    "keywords": ["keyword phrase 1", "keyword phrase 2"]
}

Generate 8-12 keywords. Return a list of strings, not objects.
Return only valid JSON."#;

pub fn category_user_message(country_or_culture: &str) -> String {
    format!(
        "Generate comprehensive data categories for documenting the culture, customs, \
         traditions and recent trends of: {}",
        country_or_culture
    )
}

pub fn subcategory_user_message(category_name: &str, category_description: &str, country_or_culture: &str) -> String {
    let mut message = format!(
        "Generate subcategories for the following cultural category:\n\n\
         Category: {}\nCategory Description: {}\n",
        category_name, category_description
    );
    if !country_or_culture.is_empty() {
        message.push_str(&format!("\nCountry/Culture Context: {}\n", country_or_culture));
    }
    message
}

pub fn keyword_user_message(
    category_name: &str,
    subcategory_name: &str,
    subcategory_description: &str,
    country_or_culture: &str,
) -> String {
    let mut message = format!(
        "Generate image search keywords for the following subcategory:\n\n\
         Category: {}\nSubcategory: {}\nSubcategory Description: {}\n",
        category_name, subcategory_name, subcategory_description
    );
    if !country_or_culture.is_empty() {
        message.push_str(&format!("\nCountry/Culture: {}\n", country_or_culture));
    }
    message
}
