use serde_json::Value;

use crate::domain::Dimension;
use crate::error::BrapiError;

/// Total-page count for one pagination axis.
///
/// The count is only trustworthy once a page of that axis has been read; until
/// then it assumes a single page so the first request is always issued. Each
/// later response may raise the total but never lower it.
#[derive(Debug, Clone)]
pub struct PageCounter {
    axis: String,
    total: usize,
    reported: Option<usize>,
}

impl PageCounter {
    pub fn new(axis: impl Into<String>) -> Self {
        Self {
            axis: axis.into(),
            total: 1,
            reported: None,
        }
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn has_more(&self, page: usize) -> bool {
        page < self.total
    }

    /// Applies the `totalPages` value of a response. A response without
    /// pagination metadata keeps the current total.
    pub fn observe(&mut self, total_pages: Option<&Value>) -> Result<(), BrapiError> {
        let Some(value) = total_pages else {
            return Ok(());
        };
        let total = value
            .as_u64()
            .and_then(|total| usize::try_from(total).ok())
            .ok_or_else(|| {
                BrapiError::MalformedPage(format!(
                    "totalPages for {} is not a non-negative integer: {value}",
                    self.axis
                ))
            })?;
        if let Some(previous) = self.reported {
            if total < previous {
                return Err(BrapiError::MalformedPage(format!(
                    "totalPages for {} regressed from {previous} to {total}",
                    self.axis
                )));
            }
        }
        self.reported = Some(total);
        self.total = total;
        Ok(())
    }
}

/// `totalPages` of one dimension in an allele-matrix `result.pagination` list.
pub fn dimension_total_pages(response: &Value, dimension: Dimension) -> Option<&Value> {
    response
        .get("result")
        .and_then(|value| value.get("pagination"))
        .and_then(|value| value.as_array())
        .and_then(|entries| {
            entries.iter().find(|entry| {
                entry.get("dimension").and_then(|value| value.as_str())
                    == Some(dimension.as_str())
            })
        })
        .and_then(|entry| entry.get("totalPages"))
}

/// `totalPages` from the standard `metadata.pagination` block.
pub fn metadata_total_pages(response: &Value) -> Option<&Value> {
    response
        .get("metadata")
        .and_then(|value| value.get("pagination"))
        .and_then(|value| value.get("totalPages"))
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;
    use serde_json::json;

    use super::*;

    #[test]
    fn defaults_to_single_page() {
        let mut counter = PageCounter::new("variants");
        assert!(counter.has_more(0));
        assert!(!counter.has_more(1));
        counter.observe(None).unwrap();
        assert_eq!(counter.total(), 1);
    }

    #[test]
    fn grows_and_rejects_regression() {
        let mut counter = PageCounter::new("VARIANTS");
        counter.observe(Some(&json!(3))).unwrap();
        assert_eq!(counter.total(), 3);
        counter.observe(Some(&json!(3))).unwrap();
        let err = counter.observe(Some(&json!(2))).unwrap_err();
        assert_matches!(err, BrapiError::MalformedPage(message) if message.contains("regressed"));
    }

    #[test]
    fn rejects_non_integer_total() {
        let mut counter = PageCounter::new("CALLSETS");
        assert_matches!(
            counter.observe(Some(&json!("two"))),
            Err(BrapiError::MalformedPage(_))
        );
        assert_matches!(
            counter.observe(Some(&json!(-1))),
            Err(BrapiError::MalformedPage(_))
        );
    }

    #[test]
    fn zero_pages_stops_iteration() {
        let mut counter = PageCounter::new("variants");
        counter.observe(Some(&json!(0))).unwrap();
        assert!(!counter.has_more(0));
    }

    #[test]
    fn finds_dimension_entries() {
        let response = json!({
            "result": {
                "pagination": [
                    {"dimension": "VARIANTS", "page": 0, "pageSize": 100, "totalPages": 4},
                    {"dimension": "CALLSETS", "page": 0, "pageSize": 100, "totalPages": 2}
                ]
            }
        });
        assert_eq!(
            dimension_total_pages(&response, Dimension::Variants),
            Some(&json!(4))
        );
        assert_eq!(
            dimension_total_pages(&response, Dimension::CallSets),
            Some(&json!(2))
        );
        assert_eq!(metadata_total_pages(&response), None);
    }
}
