//! Core category domain types.

use std::{fmt::Display, str::FromStr};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{CategoryId, Error, UserId, category::color::color_for_category_name};

/// A validated, non-empty category name.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct CategoryName(String);

impl CategoryName {
    /// Create a category name.
    ///
    /// # Errors
    ///
    /// This function will return an [Error::EmptyCategoryName] if `name` is empty or
    /// only whitespace.
    pub fn new(name: &str) -> Result<Self, Error> {
        let name = name.trim();

        if name.is_empty() {
            Err(Error::EmptyCategoryName)
        } else {
            Ok(Self(name.to_string()))
        }
    }

    /// Create a category name without validation.
    ///
    /// The caller should ensure that the string is not empty.
    ///
    /// This function has `_unchecked` in the name but is not `unsafe`, because if the non-empty invariant is violated it will cause incorrect behaviour but not affect memory safety.
    pub fn new_unchecked(name: &str) -> Self {
        Self(name.to_string())
    }
}

impl AsRef<str> for CategoryName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for CategoryName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CategoryName::new(s)
    }
}

impl TryFrom<String> for CategoryName {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        CategoryName::new(&value)
    }
}

impl From<CategoryName> for String {
    fn from(name: CategoryName) -> Self {
        name.0
    }
}

impl Display for CategoryName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// An RGB color written as `#RRGGBB`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct HexColor(String);

impl HexColor {
    /// Parse a `#RRGGBB` color. Hex digits are stored uppercase.
    ///
    /// # Errors
    ///
    /// Returns [Error::InvalidColor] if `color` is not a `#` followed by six hex digits.
    pub fn new(color: &str) -> Result<Self, Error> {
        let color = color.trim();

        match color.strip_prefix('#') {
            Some(digits) if digits.len() == 6 && digits.chars().all(|c| c.is_ascii_hexdigit()) => {
                Ok(Self(format!("#{}", digits.to_ascii_uppercase())))
            }
            _ => Err(Error::InvalidColor(color.to_owned())),
        }
    }

    /// The default color for a category called `name`.
    pub fn default_for(name: &CategoryName) -> Self {
        Self(color_for_category_name(name.as_ref()).to_owned())
    }
}

impl AsRef<str> for HexColor {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for HexColor {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        HexColor::new(&value)
    }
}

impl From<HexColor> for String {
    fn from(color: HexColor) -> Self {
        color.0
    }
}

/// A spending category for grouping transactions (e.g., 'Groceries', 'Rent').
///
/// Category names are unique per owner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    /// The ID of the category.
    pub id: CategoryId,
    /// The owner of the category.
    pub user_id: UserId,
    /// The display name of the category.
    pub name: CategoryName,
    /// The color used for the category in charts.
    pub color: HexColor,
    /// The most the owner wants to spend in this category in a week.
    pub weekly_limit: Option<Decimal>,
}

/// The fields needed to create a [Category].
#[derive(Debug, Clone, PartialEq)]
pub struct NewCategory {
    /// The display name of the category.
    pub name: CategoryName,
    /// The color for charts, or `None` to pick one from the name.
    pub color: Option<HexColor>,
    /// The weekly spending limit, if any.
    pub weekly_limit: Option<Decimal>,
}

impl NewCategory {
    /// A category with a default color and no weekly limit.
    pub fn named(name: CategoryName) -> Self {
        Self {
            name,
            color: None,
            weekly_limit: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{
        Error,
        category::domain::{CategoryName, HexColor},
    };

    #[test]
    fn new_fails_on_empty_string() {
        assert_eq!(CategoryName::new(""), Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_fails_on_just_whitespace() {
        assert_eq!(CategoryName::new("\n\t \r"), Err(Error::EmptyCategoryName));
    }

    #[test]
    fn new_trims_whitespace() {
        assert_eq!(
            CategoryName::new("  Groceries "),
            Ok(CategoryName::new_unchecked("Groceries"))
        );
    }

    #[test]
    fn hex_color_accepts_six_digits() {
        assert_eq!(
            HexColor::new("#4ecdc4").map(String::from),
            Ok("#4ECDC4".to_owned())
        );
    }

    #[test]
    fn hex_color_rejects_other_strings() {
        for color in ["4ECDC4", "#FFF", "#GGGGGG", "#1234567", "red"] {
            assert_eq!(
                HexColor::new(color),
                Err(Error::InvalidColor(color.to_owned()))
            );
        }
    }

    #[test]
    fn default_color_comes_from_the_name() {
        let name = CategoryName::new_unchecked("Entertainment");

        assert_eq!(HexColor::default_for(&name).as_ref(), "#96CEB4");
    }
}
