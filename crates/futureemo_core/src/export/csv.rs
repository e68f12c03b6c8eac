//! CSV rendering for the label report.

use crate::export::ExportError;
use crate::service::review_service::ItemDetail;
use std::collections::BTreeSet;

const MAJORITY_PLACEHOLDER: &str = "No Consensus";
const RESOLVED_PLACEHOLDER: &str = "Not Set";
const KAPPA_SINGLE_RATER: &str = "N/A";

/// Renders one header row plus one row per item.
///
/// Annotator columns are the sorted union of everyone who labeled any of
/// `details`, abstentions included.
pub fn render_report(details: &[ItemDetail]) -> Result<String, ExportError> {
    if details.is_empty() {
        return Err(ExportError::NothingToExport);
    }

    let annotators: BTreeSet<&str> = details
        .iter()
        .flat_map(|detail| detail.annotators.iter().map(String::as_str))
        .collect();

    let mut header: Vec<String> = [
        "Item ID",
        "Item Text",
        "Majority Label",
        "Resolved Label",
        "Status",
        "Total Labels",
    ]
    .iter()
    .map(|column| column.to_string())
    .collect();
    header.extend(annotators.iter().map(|name| format!("{name}'s Label")));
    header.push("Agreement %".to_string());
    header.push("Fleiss Kappa".to_string());

    let mut lines = Vec::with_capacity(details.len() + 1);
    lines.push(join_row(&header));
    for detail in details {
        lines.push(join_row(&item_row(detail, &annotators)));
    }
    Ok(lines.join("\n"))
}

fn item_row(detail: &ItemDetail, annotators: &BTreeSet<&str>) -> Vec<String> {
    let agreement = &detail.agreement;
    let mut row = vec![
        detail.item.uuid.to_string(),
        detail.item.text.clone(),
        agreement
            .majority_label
            .map(|label| label.as_str())
            .unwrap_or(MAJORITY_PLACEHOLDER)
            .to_string(),
        detail
            .item
            .resolved_label()
            .map(|label| label.as_str())
            .unwrap_or(RESOLVED_PLACEHOLDER)
            .to_string(),
        detail.item.status().as_str().to_string(),
        detail.labels.len().to_string(),
    ];
    for name in annotators {
        row.push(
            detail
                .label_by(name)
                .map(|label| label.value.as_str().to_string())
                .unwrap_or_default(),
        );
    }
    row.push(
        agreement
            .agreement_pct
            .map(|pct| format!("{pct}%"))
            .unwrap_or_default(),
    );
    row.push(match (agreement.rater_count, agreement.kappa) {
        (1, _) => KAPPA_SINGLE_RATER.to_string(),
        (_, Some(kappa)) => format!("{kappa:.3}"),
        (_, None) => String::new(),
    });
    row
}

fn join_row(fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| escape_field(field))
        .collect::<Vec<_>>()
        .join(",")
}

/// Quotes a field containing a comma, quote or newline, doubling quotes.
pub fn escape_field(field: &str) -> String {
    if field.contains([',', '"', '\n']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::{escape_field, render_report};
    use crate::export::ExportError;

    #[test]
    fn plain_fields_pass_through() {
        assert_eq!(escape_field("Hope"), "Hope");
        assert_eq!(escape_field(""), "");
    }

    #[test]
    fn fields_with_separators_are_quoted() {
        assert_eq!(escape_field("yes, we can"), "\"yes, we can\"");
        assert_eq!(escape_field("line one\nline two"), "\"line one\nline two\"");
        assert_eq!(escape_field("she said \"no\""), "\"she said \"\"no\"\"\"");
    }

    #[test]
    fn empty_report_is_rejected() {
        assert!(matches!(
            render_report(&[]),
            Err(ExportError::NothingToExport)
        ));
    }
}
