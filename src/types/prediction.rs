//! Prediction result returned to clients

use crate::types::class_info::ClassRecord;
use serde::Serialize;

/// Top-1 classification of a single uploaded image
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Model output index of the winning class
    pub class_index: usize,

    /// Human-readable class title
    pub title: String,

    /// Longer explanation of the sign
    pub description: String,

    /// Probability assigned to the winning class
    pub confidence: f64,
}

impl Prediction {
    /// Assemble a prediction from the winning class and its score
    pub fn new(record: ClassRecord, confidence: f32) -> Self {
        Self {
            class_index: record.index,
            title: record.title.into_owned(),
            description: record.description.into_owned(),
            confidence: confidence as f64,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::class_info::ClassRegistry;

    #[test]
    fn test_prediction_json_shape() {
        let registry = ClassRegistry::builtin();
        let prediction = Prediction::new(registry.lookup(52), 0.5);

        let json = serde_json::to_value(&prediction).unwrap();
        assert_eq!(json["class_index"], 52);
        assert_eq!(json["title"], "Stop");
        assert_eq!(json["confidence"], 0.5);
        assert_eq!(json.as_object().unwrap().len(), 4);
    }
}
