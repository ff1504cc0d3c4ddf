//! Default colors for categories that were created without one.

/// The color used for category names that are not in the lookup table.
pub const FALLBACK_COLOR: &str = "#9E9E9E";

const CATEGORY_COLORS: &[(&str, &str)] = &[
    ("food", "#FF6B6B"),
    ("fooddrink", "#FF6B6B"),
    ("fooddining", "#FF6B6B"),
    ("groceries", "#FF6B6B"),
    ("transportation", "#4ECDC4"),
    ("transport", "#4ECDC4"),
    ("travel", "#F7DC6F"),
    ("utilities", "#45B7D1"),
    ("generalservices", "#45B7D1"),
    ("loanpayments", "#DDA0DD"),
    ("payment", "#DDA0DD"),
    ("entertainment", "#96CEB4"),
    ("recreation", "#96CEB4"),
    ("shopping", "#FFEAA7"),
    ("shops", "#FFEAA7"),
    ("generalmerchise", "#FFEAA7"),
    ("healthcare", "#DDA0DD"),
    ("personalcare", "#DDA0DD"),
    ("education", "#98D8C8"),
    ("transfer", "#A0A0A0"),
    ("transferout", "#A0A0A0"),
    ("income", "#4CAF50"),
    ("other", "#95A5A6"),
    ("recurring", "#E17055"),
    ("subscription", "#E17055"),
];

/// Look up the default color for a category called `name`.
///
/// Names are compared after lowercasing and removing spaces, underscores and the
/// substring "and", so "Food and Drink", "food_drink" and "FOOD & DRINK" would all
/// be normalised before the lookup. Unknown names get [FALLBACK_COLOR].
pub fn color_for_category_name(name: &str) -> &'static str {
    let normalized = normalize_category_name(name);

    CATEGORY_COLORS
        .iter()
        .find(|(key, _)| *key == normalized)
        .map(|(_, color)| *color)
        .unwrap_or(FALLBACK_COLOR)
}

fn normalize_category_name(name: &str) -> String {
    name.to_lowercase()
        .replace([' ', '_', '&'], "")
        .replace("and", "")
}
