use serde::{Deserialize, Serialize};

/// A message waiting to be relayed to the configured recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryJob {
    text: String,
}

impl DeliveryJob {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_as_plain_text_field() {
        let job = DeliveryJob::new("hello");
        let json = serde_json::to_value(&job).unwrap();
        assert_eq!(json, serde_json::json!({ "text": "hello" }));
        assert_eq!(job.into_text(), "hello");
    }
}
