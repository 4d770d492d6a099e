/// Sent with every image. The JSON shape mirrors [`super::NutritionInfo`].
pub const NUTRITION_PROMPT: &str = r#"Analyze this food image and provide detailed nutritional information in JSON format.

Return the data in exactly this structure:
{
    "food_name": "Name of the food/dish",
    "serving_size": "Estimated serving size",
    "calories": number,
    "macronutrients": {
        "protein": number (grams),
        "carbs": number (grams),
        "fat": number (grams),
        "fiber": number (grams),
        "sugar": number (grams)
    },
    "micronutrients": {
        "vitamins": [
            {"name": "Vitamin A", "amount": number, "unit": "μg"},
            {"name": "Vitamin C", "amount": number, "unit": "mg"},
            {"name": "Vitamin D", "amount": number, "unit": "μg"},
            {"name": "Vitamin E", "amount": number, "unit": "mg"},
            {"name": "Vitamin K", "amount": number, "unit": "μg"},
            {"name": "Folate", "amount": number, "unit": "μg"},
            {"name": "B12", "amount": number, "unit": "μg"}
        ],
        "minerals": [
            {"name": "Calcium", "amount": number, "unit": "mg"},
            {"name": "Iron", "amount": number, "unit": "mg"},
            {"name": "Magnesium", "amount": number, "unit": "mg"},
            {"name": "Phosphorus", "amount": number, "unit": "mg"},
            {"name": "Potassium", "amount": number, "unit": "mg"},
            {"name": "Zinc", "amount": number, "unit": "mg"}
        ]
    },
    "other_nutrients": {
        "sodium": number (mg),
        "cholesterol": number (mg)
    },
    "confidence": number (0-100, how confident you are in the analysis)
}

Base the values on typical serving sizes and reply with the JSON object only."#;
