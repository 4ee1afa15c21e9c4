// ABOUTME: Recipe aggregate models: submitted desired state, stored detail and search
// ABOUTME: Nested sections, ingredients and pictures carry optional ids for reconciliation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use recipe_core::constants::{limits, messages, paging};
use recipe_core::errors::AppResult;
use recipe_core::pagination::PageRequest;
use recipe_core::reconcile::Submitted;
use serde::{Deserialize, Serialize};

use super::{NamedRecord, PictureInfo, UserSummary};
use crate::validation::{nested_field, trim_optional, Validator};

/// Reference to another row by id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IdRef {
    /// Referenced row
    pub id: i64,
}

/// Complete desired state of a recipe as submitted by a client
///
/// Every collection must be present in the body. An absent key is a
/// validation failure rather than an empty list, so a partial body can never
/// wipe the stored rows.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeInput {
    /// Globally unique name
    #[serde(default)]
    pub name: String,
    /// Short description
    pub description: Option<String>,
    /// Number of servings
    pub serves: Option<i64>,
    /// Preparation method
    pub method: Option<String>,
    /// Where the recipe comes from (URLs, books)
    pub sources: Option<Vec<String>>,
    /// Category of the recipe
    #[serde(default)]
    pub category_id: i64,
    /// Sections with their ingredients
    pub recipe_sections: Option<Vec<SectionInput>>,
    /// Ids of related recipes
    pub associated_recipes: Option<Vec<i64>>,
    /// Tag ids
    pub tags: Option<Vec<i64>>,
    /// Uploaded pictures to attach
    pub pictures: Option<Vec<PictureInput>>,
}

/// Submitted recipe section
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SectionInput {
    /// Persisted section id, absent for new sections
    pub id: Option<i64>,
    /// Section title, may be empty
    #[serde(default)]
    pub name: String,
    /// Position within the recipe
    #[serde(default)]
    pub sort_number: i64,
    /// Section-specific method
    pub method: Option<String>,
    /// Ingredients of the section
    pub ingredients: Option<Vec<IngredientInput>>,
}

impl SectionInput {
    /// Whether this section refers to a persisted row
    #[must_use]
    pub fn key(&self) -> Submitted<i64> {
        self.id.into()
    }

    /// Submitted ingredients
    #[must_use]
    pub fn ingredients(&self) -> &[IngredientInput] {
        self.ingredients.as_deref().unwrap_or_default()
    }
}

/// Submitted ingredient
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IngredientInput {
    /// Persisted ingredient id, absent for new ingredients
    pub id: Option<i64>,
    /// Ingredient name
    #[serde(default)]
    pub name: String,
    /// Position within the section
    #[serde(default)]
    pub sort_number: i64,
    /// Amount in `unit_id`
    pub value: Option<f64>,
    /// Unit of the amount
    #[serde(default)]
    pub unit_id: i64,
}

impl IngredientInput {
    /// Whether this ingredient refers to a persisted row
    #[must_use]
    pub fn key(&self) -> Submitted<i64> {
        self.id.into()
    }
}

/// Picture to attach to the recipe
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct PictureInput {
    /// Uploaded picture id
    #[serde(default)]
    pub id: i64,
    /// Display name
    #[serde(default)]
    pub name: String,
    /// Position within the gallery
    #[serde(default)]
    pub sort_number: i64,
}

impl RecipeInput {
    /// Trim, deduplicate references and validate
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` listing every invalid field
    pub fn validated(mut self) -> AppResult<Self> {
        self.normalize();

        let mut v = Validator::new();
        v.required_text("name", &self.name, limits::NAME_MAX)
            .optional_text("description", self.description.as_deref(), limits::DESCRIPTION_MAX);
        if let Some(serves) = self.serves {
            v.between("serves", serves, limits::SERVES_MIN, limits::SERVES_MAX);
        }
        if self.category_id == 0 {
            v.fail("categoryId", messages::REQUIRED);
        } else {
            v.id("categoryId", self.category_id);
        }

        v.present("sources", self.sources.is_some())
            .present("recipeSections", self.recipe_sections.is_some())
            .present("associatedRecipes", self.associated_recipes.is_some())
            .present("tags", self.tags.is_some())
            .present("pictures", self.pictures.is_some());

        for (index, source) in self.sources().iter().enumerate() {
            v.max_length(&format!("sources.{index}"), source, limits::SOURCE_MAX);
        }

        self.validate_sections(&mut v);

        for (index, associated) in self.associated_recipes().iter().enumerate() {
            v.id(&format!("associatedRecipes.{index}"), *associated);
        }
        for (index, tag) in self.tags().iter().enumerate() {
            v.id(&format!("tags.{index}"), *tag);
        }
        for (index, picture) in self.pictures().iter().enumerate() {
            v.id(&nested_field("pictures", index, "id"), picture.id)
                .required_text(&nested_field("pictures", index, "name"), &picture.name, limits::NAME_MAX)
                .at_least(&nested_field("pictures", index, "sortNumber"), picture.sort_number, 1);
        }

        v.finish()?;
        Ok(self)
    }

    /// Sources of the recipe
    #[must_use]
    pub fn sources(&self) -> &[String] {
        self.sources.as_deref().unwrap_or_default()
    }

    /// Submitted sections
    #[must_use]
    pub fn sections(&self) -> &[SectionInput] {
        self.recipe_sections.as_deref().unwrap_or_default()
    }

    /// Ids of associated recipes
    #[must_use]
    pub fn associated_recipes(&self) -> &[i64] {
        self.associated_recipes.as_deref().unwrap_or_default()
    }

    /// Tag ids
    #[must_use]
    pub fn tags(&self) -> &[i64] {
        self.tags.as_deref().unwrap_or_default()
    }

    /// Pictures to attach
    #[must_use]
    pub fn pictures(&self) -> &[PictureInput] {
        self.pictures.as_deref().unwrap_or_default()
    }

    fn normalize(&mut self) {
        self.name = self.name.trim().to_owned();
        self.description = trim_optional(self.description.take());
        self.method = trim_optional(self.method.take());
        self.sources = self.sources.take().map(|sources| {
            sources
                .into_iter()
                .map(|source| source.trim().to_owned())
                .filter(|source| !source.is_empty())
                .collect()
        });

        for section in self.recipe_sections.iter_mut().flatten() {
            section.name = section.name.trim().to_owned();
            section.method = trim_optional(section.method.take());
            for ingredient in section.ingredients.iter_mut().flatten() {
                ingredient.name = ingredient.name.trim().to_owned();
            }
        }
        for picture in self.pictures.iter_mut().flatten() {
            picture.name = picture.name.trim().to_owned();
        }

        if let Some(tags) = self.tags.as_mut() {
            let mut seen = HashSet::new();
            tags.retain(|tag| seen.insert(*tag));
        }
        if let Some(recipes) = self.associated_recipes.as_mut() {
            let mut seen = HashSet::new();
            recipes.retain(|recipe| seen.insert(*recipe));
        }
    }

    fn validate_sections(&self, v: &mut Validator) {
        let mut section_ids = HashSet::new();
        let mut ingredient_ids = HashSet::new();

        for (s, section) in self.sections().iter().enumerate() {
            let field = |name: &str| nested_field("recipeSections", s, name);
            if let Some(id) = section.id {
                v.id(&field("id"), id);
                v.check(&field("id"), section_ids.insert(id), messages::INVALID_VALUE);
            }
            v.max_length(&field("name"), &section.name, limits::NAME_MAX)
                .at_least(&field("sortNumber"), section.sort_number, 1)
                .present(&field("ingredients"), section.ingredients.is_some());

            for (i, ingredient) in section.ingredients().iter().enumerate() {
                let field = |name: &str| format!("recipeSections.{s}.ingredients.{i}.{name}");
                if let Some(id) = ingredient.id {
                    v.id(&field("id"), id);
                    v.check(&field("id"), ingredient_ids.insert(id), messages::INVALID_VALUE);
                }
                v.required_text(&field("name"), &ingredient.name, limits::NAME_MAX)
                    .at_least(&field("sortNumber"), ingredient.sort_number, 1)
                    .id(&field("unitId"), ingredient.unit_id);
                if let Some(value) = ingredient.value {
                    v.number_at_least(&field("value"), value, 0.0);
                }
            }
        }
    }
}

/// Unit name and abbreviation shown next to an ingredient
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct UnitSummary {
    /// Unit name
    pub name: String,
    /// Unit abbreviation
    pub abbreviation: String,
}

/// Stored ingredient
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct IngredientDetail {
    /// Row id
    pub id: i64,
    /// Ingredient name
    pub name: String,
    /// Position within the section
    pub sort_number: i64,
    /// Amount
    pub value: Option<f64>,
    /// Unit id
    pub unit_id: i64,
    /// Unit name and abbreviation
    pub unit: UnitSummary,
}

/// Stored section with ingredients ordered by sort number
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct SectionDetail {
    /// Row id
    pub id: i64,
    /// Section title
    pub name: String,
    /// Position within the recipe
    pub sort_number: i64,
    /// Section-specific method
    pub method: Option<String>,
    /// Ingredients ordered by sort number
    pub ingredients: Vec<IngredientDetail>,
}

/// Short form of a recipe used for associations
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeSummary {
    /// Row id
    pub id: i64,
    /// Recipe name
    pub name: String,
    /// Recipe description
    pub description: Option<String>,
}

/// Complete stored recipe graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeDetail {
    /// Row id
    pub id: i64,
    /// Unique name
    pub name: String,
    /// Short description
    pub description: Option<String>,
    /// Number of servings
    pub serves: Option<i64>,
    /// Preparation method
    pub method: Option<String>,
    /// Sources of the recipe
    pub sources: Vec<String>,
    /// Category id
    pub category_id: i64,
    /// Sections ordered by sort number
    pub recipe_sections: Vec<SectionDetail>,
    /// Associated recipes ordered by name
    pub associated_recipes: Vec<RecipeSummary>,
    /// Tags ordered by name
    pub tags: Vec<NamedRecord>,
    /// Pictures ordered by sort number
    pub pictures: Vec<PictureInfo>,
    /// User who created the recipe
    pub creator: Option<UserSummary>,
    /// User who last modified the recipe
    pub modifier: Option<UserSummary>,
    /// Creation time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Search result row with at most the first picture
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeListItem {
    /// Row id
    pub id: i64,
    /// Recipe name
    pub name: String,
    /// Recipe description
    pub description: Option<String>,
    /// First picture by sort number, if any
    pub pictures: Vec<IdRef>,
}

/// Search body of `POST /recipe/find`
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "openapi", derive(utoipa::ToSchema))]
pub struct RecipeQuery {
    /// Substring of name or description
    pub search: Option<String>,
    /// Restrict to one category
    pub category_id: Option<i64>,
    /// Recipes must carry all of these tags
    pub tags: Option<Vec<i64>>,
    /// Zero-based page
    pub page: Option<i64>,
    /// Rows per page
    pub page_size: Option<i64>,
    /// `name`, `createdAt` or `updatedAt`
    pub order_by: Option<String>,
    /// `ASC` or `DESC`
    pub order: Option<String>,
}

/// Ordering column of a recipe search
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecipeOrderBy {
    /// Diacritic-insensitive name
    #[default]
    Name,
    /// Creation time
    CreatedAt,
    /// Last modification time
    UpdatedAt,
}

impl RecipeOrderBy {
    const NAMES: [&'static str; 3] = ["name", "createdAt", "updatedAt"];

    fn parse(value: &str) -> Option<Self> {
        match value {
            "name" => Some(Self::Name),
            "createdAt" => Some(Self::CreatedAt),
            "updatedAt" => Some(Self::UpdatedAt),
            _ => None,
        }
    }

    /// Column to order by
    #[must_use]
    pub const fn column(&self) -> &'static str {
        match self {
            Self::Name => "r.name_search",
            Self::CreatedAt => "r.created_at",
            Self::UpdatedAt => "r.updated_at",
        }
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Ascending
    #[default]
    Asc,
    /// Descending
    Desc,
}

impl SortOrder {
    const NAMES: [&'static str; 2] = ["ASC", "DESC"];

    fn parse(value: &str) -> Option<Self> {
        match value.to_ascii_uppercase().as_str() {
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            _ => None,
        }
    }

    /// SQL keyword
    #[must_use]
    pub const fn sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Validated recipe search
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecipeSearch {
    /// Trimmed search text
    pub search: Option<String>,
    /// Category filter
    pub category_id: Option<i64>,
    /// Deduplicated tag filter
    pub tags: Vec<i64>,
    /// Requested page
    pub page: PageRequest,
    /// Ordering column
    pub order_by: RecipeOrderBy,
    /// Ordering direction
    pub order: SortOrder,
}

impl RecipeQuery {
    /// Validate a search body
    ///
    /// # Errors
    ///
    /// Returns `VALIDATION_FAILED` listing every invalid field
    pub fn validated(self) -> AppResult<RecipeSearch> {
        let mut v = Validator::new();
        let search = trim_optional(self.search);
        v.optional_text("search", search.as_deref(), limits::SEARCH_MAX);
        if let Some(category_id) = self.category_id {
            v.id("categoryId", category_id);
        }
        v.present("tags", self.tags.is_some());
        let mut tags = self.tags.unwrap_or_default();
        for (index, tag) in tags.iter().enumerate() {
            v.id(&format!("tags.{index}"), *tag);
        }

        match self.page {
            Some(page) => v.between("page", page, 0, paging::MAX_PAGE),
            None => v.fail("page", messages::REQUIRED),
        };
        match self.page_size {
            Some(page_size) => v.between("pageSize", page_size, 1, paging::MAX_PAGE_SIZE),
            None => v.fail("pageSize", messages::REQUIRED),
        };
        let page = PageRequest::new(self.page.unwrap_or_default(), self.page_size.unwrap_or_default());

        let order_by = match self.order_by.as_deref().map(str::trim) {
            None => {
                v.fail("orderBy", messages::REQUIRED);
                RecipeOrderBy::default()
            }
            Some(value) => RecipeOrderBy::parse(value).unwrap_or_else(|| {
                v.allowed("orderBy", value, &RecipeOrderBy::NAMES);
                RecipeOrderBy::default()
            }),
        };
        let order = match self.order.as_deref().map(str::trim) {
            None => {
                v.fail("order", messages::REQUIRED);
                SortOrder::default()
            }
            Some(value) => SortOrder::parse(value).unwrap_or_else(|| {
                v.allowed("order", value, &SortOrder::NAMES);
                SortOrder::default()
            }),
        };
        v.finish()?;

        let mut seen = HashSet::new();
        tags.retain(|tag| seen.insert(*tag));

        Ok(RecipeSearch {
            search,
            category_id: self.category_id,
            tags,
            page,
            order_by,
            order,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn input(body: serde_json::Value) -> RecipeInput {
        serde_json::from_value(body).unwrap()
    }

    fn query(body: serde_json::Value) -> RecipeQuery {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_valid_recipe_is_normalized() {
        let recipe = input(json!({
            "name": "  Goulash ",
            "description": "   ",
            "categoryId": 1,
            "sources": [" https://example.com ", ""],
            "tags": [2, 2, 3],
            "associatedRecipes": [4, 4],
            "pictures": [],
            "recipeSections": [{"name": " Main ", "sortNumber": 1, "ingredients": [
                {"name": "Beef", "sortNumber": 1, "value": 500, "unitId": 1}
            ]}]
        }))
        .validated()
        .unwrap();

        assert_eq!(recipe.name, "Goulash");
        assert_eq!(recipe.description, None);
        assert_eq!(recipe.sources(), ["https://example.com"]);
        assert_eq!(recipe.tags(), [2, 3]);
        assert_eq!(recipe.associated_recipes(), [4]);
        assert_eq!(recipe.sections()[0].name, "Main");
    }

    #[test]
    fn test_invalid_recipe_reports_nested_paths() {
        let error = input(json!({
            "name": "",
            "serves": 0,
            "sources": [],
            "tags": [],
            "associatedRecipes": [0],
            "pictures": [],
            "recipeSections": [{"id": 1, "sortNumber": 0, "ingredients": [
                {"name": "", "sortNumber": 1, "value": -1, "unitId": 0}
            ]}, {"id": 1, "sortNumber": 2}]
        }))
        .validated()
        .unwrap_err();

        let fields = error.fields.unwrap();
        assert_eq!(fields["name"], "required");
        assert_eq!(fields["serves"], "min");
        assert_eq!(fields["categoryId"], "required");
        assert_eq!(fields["associatedRecipes.0"], "min");
        assert_eq!(fields["recipeSections.0.sortNumber"], "min");
        assert_eq!(fields["recipeSections.0.ingredients.0.name"], "required");
        assert_eq!(fields["recipeSections.0.ingredients.0.value"], "min");
        assert_eq!(fields["recipeSections.0.ingredients.0.unitId"], "min");
        assert_eq!(fields["recipeSections.1.id"], "invalidValue");
        assert_eq!(fields["recipeSections.1.ingredients"], "required");
    }

    #[test]
    fn test_missing_collections_are_required() {
        let error = input(json!({ "name": "Goulash", "categoryId": 1 }))
            .validated()
            .unwrap_err();

        let fields = error.fields.unwrap();
        for key in ["sources", "recipeSections", "associatedRecipes", "tags", "pictures"] {
            assert_eq!(fields[key], "required", "{key}");
        }
    }

    #[test]
    fn test_query_requires_paging_and_ordering() {
        let fields = RecipeQuery::default().validated().unwrap_err().fields.unwrap();
        for key in ["tags", "page", "pageSize", "orderBy", "order"] {
            assert_eq!(fields[key], "required", "{key}");
        }
    }

    #[test]
    fn test_query_pages_are_zero_based() {
        let search = query(json!({
            "search": null,
            "categoryId": null,
            "tags": [5, 5],
            "page": 0,
            "pageSize": 30,
            "orderBy": "createdAt",
            "order": "DESC"
        }))
        .validated()
        .unwrap();
        assert_eq!(search.page, PageRequest::new(0, 30));
        assert_eq!(search.page.offset(), 0);
        assert_eq!(search.tags, vec![5]);
        assert_eq!(search.order_by, RecipeOrderBy::CreatedAt);
        assert_eq!(search.order, SortOrder::Desc);
    }

    #[test]
    fn test_query_rejects_out_of_range_values() {
        let fields = query(json!({
            "search": "x".repeat(161),
            "tags": [],
            "page": i64::MAX,
            "pageSize": 500,
            "orderBy": "calories",
            "order": "sideways"
        }))
        .validated()
        .unwrap_err()
        .fields
        .unwrap();
        assert_eq!(fields["search"], "maxLength");
        assert_eq!(fields["page"], "max");
        assert_eq!(fields["orderBy"], "allowed");
        assert_eq!(fields["order"], "allowed");
        assert_eq!(fields["pageSize"], "max");
    }

    #[test]
    fn test_submitted_keys() {
        let section: SectionInput = serde_json::from_value(json!({"sortNumber": 1})).unwrap();
        assert_eq!(section.key(), Submitted::New);
        let section: SectionInput = serde_json::from_value(json!({"id": 3, "sortNumber": 1})).unwrap();
        assert_eq!(section.key(), Submitted::Existing(3));
    }
}
