//! Records exchanged with the backend collaborators.

use serde::{Deserialize, Serialize};

/// The signed-in user as reported by identity resolution.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Identity {
    pub id: String,
}

/// Fields returned by the remote dish-identification function.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct DishIdentification {
    pub dish_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub confidence: f64,
}

/// One persisted meal row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealRecord {
    pub user_id: String,
    pub dish_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub confidence: f64,
    pub image_url: String,
}

impl MealRecord {
    pub fn new(identity: &Identity, dish: &DishIdentification, image_url: &str) -> Self {
        Self {
            user_id: identity.id.clone(),
            dish_name: dish.dish_name.clone(),
            calories: dish.calories,
            protein: dish.protein,
            carbs: dish.carbs,
            fat: dish.fat,
            confidence: dish.confidence,
            image_url: image_url.to_string(),
        }
    }
}

/// The combined record handed to the completion handler after a successful run.
///
/// Every field except `image_url` comes from the inference call; `image_url`
/// comes from object storage.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalysisResult {
    pub dish_name: String,
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub confidence: f64,
    pub image_url: String,
}

impl AnalysisResult {
    pub fn new(dish: DishIdentification, image_url: String) -> Self {
        Self {
            dish_name: dish.dish_name,
            calories: dish.calories,
            protein: dish.protein,
            carbs: dish.carbs,
            fat: dish.fat,
            confidence: dish.confidence,
            image_url,
        }
    }
}
