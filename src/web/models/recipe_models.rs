//! Request and response bodies of the recipe, tag and ingredient endpoints.
//!
//! Requests are deserialized leniently (every field optional, unknown keys such
//! as `user` ignored) and then validated into the typed inputs of
//! [`recipe_service`](crate::db::services::recipe_service), so that a bad
//! payload is reported field by field before any database access.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

use crate::db::entities::{ingredient, tag};
use crate::db::services::Label;
use crate::db::services::recipe_service::{NewRecipe, RecipeChanges, RecipeWithLabels};
use crate::web::error::{AppError, FieldErrors};

pub const MAX_CHAR_LEN: usize = 255;
const PRICE_DECIMAL_PLACES: u32 = 2;
const PRICE_WHOLE_DIGITS: u32 = 3;

const REQUIRED: &str = "This field is required.";
const BLANK: &str = "This field may not be blank.";
const NULL: &str = "This field may not be null.";

/// A nested `{ "name": ... }` object in a recipe's `tags` or `ingredients`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelPayload {
    #[serde(default)]
    pub name: String,
}

/// Body of `POST`/`PUT`/`PATCH` on recipes.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub description: Option<String>,
    pub link: Option<String>,
    /// `None` when the key is absent, `Some(None)` for an explicit `null`.
    #[serde(default, deserialize_with = "present")]
    pub tags: Option<Option<Vec<LabelPayload>>>,
    #[serde(default, deserialize_with = "present")]
    pub ingredients: Option<Option<Vec<LabelPayload>>>,
}

/// Wraps any present value (including `null`) in `Some`; absent keys fall back
/// to the field default.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl RecipeRequest {
    /// Validates a creation payload. `title`, `time_minutes` and `price` are required.
    pub fn into_new_recipe(self) -> Result<NewRecipe, AppError> {
        let changes = self.into_changes(true)?;
        match (changes.title, changes.time_minutes, changes.price) {
            (Some(title), Some(time_minutes), Some(price)) => Ok(NewRecipe {
                title,
                time_minutes,
                price,
                description: changes.description.unwrap_or_default(),
                link: changes.link.unwrap_or_default(),
                tags: changes.tags,
                ingredients: changes.ingredients,
            }),
            _ => Err(AppError::InvalidInput(
                "title, time_minutes and price are required".to_string(),
            )),
        }
    }

    /// Validates an update payload. With `require_scalars` (PUT) the required
    /// fields must be present; otherwise (PATCH) every field is optional.
    pub fn into_changes(self, require_scalars: bool) -> Result<RecipeChanges, AppError> {
        let mut errors = FieldErrors::new();

        if require_scalars {
            if self.title.is_none() {
                errors.add("title", REQUIRED);
            }
            if self.time_minutes.is_none() {
                errors.add("time_minutes", REQUIRED);
            }
            if self.price.is_none() {
                errors.add("price", REQUIRED);
            }
        }

        let title = self.title.map(|t| t.trim().to_string());
        if let Some(title) = &title {
            check_char_field("title", title, false, &mut errors);
        }
        if let Some(minutes) = self.time_minutes {
            if minutes < 0 {
                errors.add("time_minutes", "Ensure this value is greater than or equal to 0.");
            }
        }
        if let Some(price) = &self.price {
            check_price(price, &mut errors);
        }
        let description = self.description.map(|d| d.trim().to_string());
        let link = self.link.map(|l| l.trim().to_string());
        if let Some(link) = &link {
            check_char_field("link", link, true, &mut errors);
        }
        let tags = self.tags.map(|labels| label_names("tags", labels, &mut errors));
        let ingredients = self
            .ingredients
            .map(|labels| label_names("ingredients", labels, &mut errors));

        errors.into_result()?;

        Ok(RecipeChanges {
            title,
            time_minutes: self.time_minutes,
            price: self.price,
            description,
            link,
            tags,
            ingredients,
        })
    }
}

fn check_char_field(field: &str, value: &str, allow_blank: bool, errors: &mut FieldErrors) {
    if value.is_empty() && !allow_blank {
        errors.add(field, BLANK);
    }
    if value.chars().count() > MAX_CHAR_LEN {
        errors.add(
            field,
            format!("Ensure this field has no more than {MAX_CHAR_LEN} characters."),
        );
    }
}

fn check_price(price: &Decimal, errors: &mut FieldErrors) {
    let normalized = price.normalize();
    if normalized.scale() > PRICE_DECIMAL_PLACES {
        errors.add(
            "price",
            format!("Ensure that there are no more than {PRICE_DECIMAL_PLACES} decimal places."),
        );
    }
    if normalized.trunc().abs() >= Decimal::from(10_i64.pow(PRICE_WHOLE_DIGITS)) {
        errors.add(
            "price",
            format!(
                "Ensure that there are no more than {PRICE_WHOLE_DIGITS} digits before the decimal point."
            ),
        );
    }
}

/// Trims and validates nested names, keeping their order of appearance.
fn label_names(field: &str, labels: Option<Vec<LabelPayload>>, errors: &mut FieldErrors) -> Vec<String> {
    let Some(labels) = labels else {
        errors.add(field, NULL);
        return Vec::new();
    };
    labels
        .into_iter()
        .map(|label| {
            let name = label.name.trim().to_string();
            check_char_field(field, &name, false, errors);
            name
        })
        .collect()
}

/// Validates the body of a standalone tag/ingredient create or rename.
pub fn validate_label_name(payload: LabelPayload) -> Result<String, AppError> {
    let mut errors = FieldErrors::new();
    let name = payload.name.trim().to_string();
    check_char_field("name", &name, false, &mut errors);
    errors.into_result()?;
    Ok(name)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelResponse {
    pub id: i32,
    pub name: String,
}

impl LabelResponse {
    pub fn from_label<E: Label>(model: &E::Model) -> Self {
        Self {
            id: E::label_id(model),
            name: E::label_name(model).to_owned(),
        }
    }
}

impl From<tag::Model> for LabelResponse {
    fn from(model: tag::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

impl From<ingredient::Model> for LabelResponse {
    fn from(model: ingredient::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
        }
    }
}

/// List representation of a recipe.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeResponse {
    pub id: i32,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<LabelResponse>,
    pub ingredients: Vec<LabelResponse>,
}

/// Detail representation: the list fields plus `description`.
#[derive(Debug, Clone, Serialize)]
pub struct RecipeDetailResponse {
    #[serde(flatten)]
    pub recipe: RecipeResponse,
    pub description: String,
}

impl From<RecipeWithLabels> for RecipeDetailResponse {
    fn from(value: RecipeWithLabels) -> Self {
        let description = value.recipe.description.clone();
        Self {
            recipe: value.into(),
            description,
        }
    }
}

impl From<RecipeWithLabels> for RecipeResponse {
    fn from(value: RecipeWithLabels) -> Self {
        let RecipeWithLabels {
            recipe,
            tags,
            ingredients,
        } = value;
        // Always two decimals on the wire ("5.00"), whatever the backend returned.
        let mut price = recipe.price;
        price.rescale(PRICE_DECIMAL_PLACES);
        Self {
            id: recipe.id,
            title: recipe.title,
            time_minutes: recipe.time_minutes,
            price,
            link: recipe.link,
            tags: tags.into_iter().map(LabelResponse::from).collect(),
            ingredients: ingredients.into_iter().map(LabelResponse::from).collect(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

impl RecipeListQuery {
    pub fn tag_ids(&self) -> Result<Vec<i32>, AppError> {
        parse_ids("tags", self.tags.as_deref())
    }

    pub fn ingredient_ids(&self) -> Result<Vec<i32>, AppError> {
        parse_ids("ingredients", self.ingredients.as_deref())
    }
}

/// Parses a comma-separated id list such as `"1,2,3"`. Missing or empty means no filter.
fn parse_ids(field: &str, raw: Option<&str>) -> Result<Vec<i32>, AppError> {
    let Some(raw) = raw else {
        return Ok(Vec::new());
    };
    raw.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<i32>().map_err(|_| {
                AppError::InvalidInput(format!("Invalid id '{part}' in '{field}' filter."))
            })
        })
        .collect()
}

#[derive(Debug, Default, Deserialize)]
pub struct LabelListQuery {
    pub assigned_only: Option<i32>,
}

impl LabelListQuery {
    pub fn assigned_only(&self) -> bool {
        self.assigned_only.is_some_and(|flag| flag != 0)
    }
}
