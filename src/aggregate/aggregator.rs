use serde::Serialize;
use time::Date;
use tracing::{debug, instrument};
use uuid::Uuid;

use super::period::{resolve_range, DateRange, Period, PeriodQuery};
use crate::error::AppError;
use crate::meals::{repo::MealStore, repo_types::MealRecord};
use crate::nutrition::{Nutrient, NutritionInfo};

/// Totals over every meal in a bucket. Recomputed on every request.
///
/// `vitamins` and `minerals` hold one entry per nutrient name, in the order
/// the names were first seen. Amounts are summed as-is: the unit is taken
/// from the first record that mentioned the nutrient and later records with
/// a different unit are added without conversion.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct AggregateResult {
    pub calories: f64,
    pub protein: f64,
    pub carbs: f64,
    pub fat: f64,
    pub fiber: f64,
    pub sugar: f64,
    pub sodium: f64,
    pub cholesterol: f64,
    pub vitamins: Vec<Nutrient>,
    pub minerals: Vec<Nutrient>,
    /// Newest first.
    pub meals: Vec<MealSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MealSummary {
    pub id: Uuid,
    pub name: String,
    pub time: String,
    #[serde(with = "crate::meals::repo_types::iso_date")]
    pub date: Date,
    pub calories: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub nutrition: NutritionInfo,
}

impl From<&MealRecord> for MealSummary {
    fn from(r: &MealRecord) -> Self {
        Self {
            id: r.id,
            name: r.name.clone(),
            time: r.time.clone(),
            date: r.date,
            calories: r.calories,
            image_url: r.image.as_ref().map(|_| format!("/api/meal-image/{}", r.id)),
            nutrition: r.nutrition.clone(),
        }
    }
}

impl AggregateResult {
    fn fold(&mut self, record: &MealRecord) {
        let n = &record.nutrition;
        self.calories += n.calories;
        self.protein += n.macronutrients.protein;
        self.carbs += n.macronutrients.carbs;
        self.fat += n.macronutrients.fat;
        self.fiber += n.macronutrients.fiber;
        self.sugar += n.macronutrients.sugar;
        self.sodium += n.other_nutrients.sodium;
        self.cholesterol += n.other_nutrients.cholesterol;
        add_nutrients(&mut self.vitamins, &n.micronutrients.vitamins);
        add_nutrients(&mut self.minerals, &n.micronutrients.minerals);
        self.meals.push(MealSummary::from(record));
    }
}

fn add_nutrients(totals: &mut Vec<Nutrient>, items: &[Nutrient]) {
    for item in items {
        match totals.iter_mut().find(|t| t.name == item.name) {
            Some(total) => total.amount += item.amount,
            None => totals.push(Nutrient::new(&item.name, item.amount, &item.unit)),
        }
    }
}

/// Folds the records of `user_id` that fall inside `range`.
///
/// Records are folded oldest first, so "first seen" means earliest upload;
/// the meal list comes back newest first.
pub fn aggregate(records: &[MealRecord], user_id: &str, range: &DateRange) -> AggregateResult {
    let mut matching: Vec<&MealRecord> = records
        .iter()
        .filter(|r| r.user_id == user_id && range.contains(r.date))
        .collect();
    matching.sort_by_key(|r| r.timestamp);

    let mut result = AggregateResult::default();
    for record in matching {
        result.fold(record);
    }
    result.meals.reverse();
    result
}

/// Resolves the bucket and aggregates the user's records over it. A bad
/// period or date fails before the store is touched.
#[instrument(skip(store, query))]
pub async fn aggregate_for_user(
    store: &dyn MealStore,
    user_id: &str,
    period: Period,
    query: &PeriodQuery,
    today: Date,
) -> Result<AggregateResult, AppError> {
    let range = resolve_range(period, query, today)?;
    let records = store.list_by_user(user_id, range.single_day()).await?;
    let result = aggregate(&records, user_id, &range);
    debug!(
        start = %range.start,
        end = %range.end,
        meals = result.meals.len(),
        calories = result.calories,
        "nutrition aggregated"
    );
    Ok(result)
}
