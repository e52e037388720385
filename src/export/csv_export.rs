use super::{column_headers, export_rows, StatementHeader};
use crate::error::{AppError, AppResult};
use crate::models::StatementResult;
use csv::Writer;

fn csv_error(e: impl std::fmt::Display) -> AppError {
    AppError::Export(e.to_string())
}

/// 导出明细到 CSV (表头 + 每单一行, 金额两位小数)
pub fn render_csv(header: &StatementHeader, result: &StatementResult) -> AppResult<Vec<u8>> {
    let mut writer = Writer::from_writer(Vec::new());

    writer
        .write_record(column_headers(&header.currency_label))
        .map_err(csv_error)?;
    for row in export_rows(result) {
        writer.write_record(row.cells()).map_err(csv_error)?;
    }

    writer.flush().map_err(csv_error)?;
    writer.into_inner().map_err(csv_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{header, sample_result};
    use crate::models::CustomerFilter;

    #[test]
    fn writes_header_and_order_rows() {
        let bytes = render_csv(&header(CustomerFilter::All, "All Customers"), &sample_result()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "Date,Customer,Status,Total (Rs),Paid (Rs),Remaining (Rs)");
        assert_eq!(lines[1], "2/1/2024,Ravi Kumar,pending,50.00,0.00,50.00");
        assert_eq!(lines[2], "1/1/2024,Ravi Kumar,delivered,100.00,100.00,0.00");
    }

    #[test]
    fn names_with_commas_are_quoted() {
        let mut result = sample_result();
        result.orders[0].customer_name = "Patel, Mehul".to_string();
        let bytes = render_csv(&header(CustomerFilter::All, "All Customers"), &result).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains("\"Patel, Mehul\""));
    }
}
