use std::collections::BTreeMap;

use minivault_core::catalog::SALES;
use minivault_core::NormalizedRecord;
use serde::Serialize;

use crate::records::ListQuery;
use crate::{MiniVault, ServiceResult};

const UNKNOWN: &str = "unknown";

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SalesSummary {
    pub order_count: usize,
    pub total_amount: f64,
    pub by_status: BTreeMap<String, usize>,
    pub by_channel: BTreeMap<String, f64>,
}

pub fn summarize(records: &[NormalizedRecord]) -> SalesSummary {
    let mut summary = SalesSummary {
        order_count: records.len(),
        total_amount: 0.0,
        by_status: BTreeMap::new(),
        by_channel: BTreeMap::new(),
    };
    for record in records {
        let amount = record.number("amount").unwrap_or(0.0);
        summary.total_amount += amount;
        let status = record.text("status").unwrap_or(UNKNOWN).to_string();
        *summary.by_status.entry(status).or_default() += 1;
        let channel = record.text("channel").unwrap_or(UNKNOWN).to_string();
        *summary.by_channel.entry(channel).or_default() += amount;
    }
    summary
}

impl MiniVault {
    pub async fn sales_summary(&self, database_id: Option<&str>) -> ServiceResult<SalesSummary> {
        let query = ListQuery {
            database_id: database_id.map(ToString::to_string),
            ..ListQuery::default()
        };
        let records = self.list_records(&SALES, &query).await?;
        Ok(summarize(&records))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use minivault_core::PrimitiveValue;

    fn sale(amount: Option<f64>, status: Option<&str>, channel: Option<&str>) -> NormalizedRecord {
        let mut fields = BTreeMap::new();
        fields.insert("amount".to_string(), amount.map(PrimitiveValue::Number));
        fields.insert("status".to_string(), status.map(|s| PrimitiveValue::Text(s.into())));
        fields.insert("channel".to_string(), channel.map(|c| PrimitiveValue::Text(c.into())));
        NormalizedRecord {
            id: "s".into(),
            url: String::new(),
            created_time: None,
            last_edited_time: None,
            fields,
        }
    }

    #[test]
    fn totals_group_by_status_and_channel() {
        let summary = summarize(&[
            sale(Some(120.0), Some("paid"), Some("web")),
            sale(Some(30.5), Some("paid"), None),
            sale(None, None, Some("web")),
        ]);
        assert_eq!(summary.order_count, 3);
        assert_eq!(summary.total_amount, 150.5);
        assert_eq!(summary.by_status["paid"], 2);
        assert_eq!(summary.by_status["unknown"], 1);
        assert_eq!(summary.by_channel["web"], 120.0);
        assert_eq!(summary.by_channel["unknown"], 30.5);
    }

    #[test]
    fn empty_database_summarizes_to_zero() {
        let summary = summarize(&[]);
        assert_eq!(summary.order_count, 0);
        assert_eq!(summary.total_amount, 0.0);
        assert!(summary.by_status.is_empty());
        let value = serde_json::to_value(&summary).unwrap();
        assert!(value.get("byChannel").is_some());
    }
}
