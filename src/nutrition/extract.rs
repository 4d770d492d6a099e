use thiserror::Error;

use super::model::NutritionInfo;

#[derive(Debug, Error)]
pub enum ExtractionError {
    #[error("no JSON object found in model reply")]
    NoJsonObject,
    #[error("model reply JSON is not a nutrition object: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Pulls the nutrition object out of a free-form model reply.
///
/// Takes everything from the first `{` to the last `}` and parses it. Prose or
/// markdown fences around the object are fine; a reply with more than one
/// brace-delimited fragment is not, and usually ends up `Malformed`.
pub fn extract_nutrition(reply: &str) -> Result<NutritionInfo, ExtractionError> {
    let start = reply.find('{').ok_or(ExtractionError::NoJsonObject)?;
    let end = reply.rfind('}').ok_or(ExtractionError::NoJsonObject)?;
    if end < start {
        return Err(ExtractionError::NoJsonObject);
    }
    let info = serde_json::from_str::<NutritionInfo>(&reply[start..=end])?;
    Ok(info)
}
