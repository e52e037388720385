use super::{column_headers, export_rows, StatementHeader};
use bigdecimal::{BigDecimal, ToPrimitive};
use crate::error::{AppError, AppResult};
use crate::models::StatementResult;
use rust_xlsxwriter::{Format, Workbook, XlsxError};

pub const SHEET_NAME: &str = "Statement";

/// 列宽 (字符数)
pub const COLUMN_WIDTHS: [f64; 6] = [12.0, 20.0, 10.0, 12.0, 12.0, 12.0];

impl From<XlsxError> for AppError {
    fn from(e: XlsxError) -> Self {
        AppError::Export(e.to_string())
    }
}

fn number(value: &BigDecimal) -> f64 {
    value.to_f64().unwrap_or_default()
}

/// 渲染 Excel 工作簿
///
/// 行布局: 标题 / 期间 / 客户 / 空行 / Summary / 三行汇总 / 空行 / Order Details / 表头 / 明细
pub fn render_xlsx(header: &StatementHeader, result: &StatementResult) -> AppResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let money = Format::new().set_num_format("0.00");

    let sheet = workbook.add_worksheet();
    sheet.set_name(SHEET_NAME)?;
    for (col, width) in COLUMN_WIDTHS.iter().enumerate() {
        sheet.set_column_width(col as u16, *width)?;
    }

    sheet.write_string_with_format(0, 0, header.title(), &bold)?;
    sheet.write_string(1, 0, header.period())?;
    sheet.write_string(2, 0, header.customer_line())?;

    sheet.write_string_with_format(4, 0, "Summary", &bold)?;
    let mut row: u32 = 5;
    for (label, amount) in header.summary_lines(result) {
        sheet.write_string(row, 0, label)?;
        sheet.write_string(row, 1, amount)?;
        row += 1;
    }

    row += 1;
    sheet.write_string_with_format(row, 0, "Order Details", &bold)?;
    row += 1;
    for (col, title) in column_headers(&header.currency_label).iter().enumerate() {
        sheet.write_string_with_format(row, col as u16, title.as_str(), &bold)?;
    }

    for line in export_rows(result) {
        row += 1;
        sheet.write_string(row, 0, line.date.as_str())?;
        sheet.write_string(row, 1, line.customer.as_str())?;
        sheet.write_string(row, 2, line.status.as_str())?;
        sheet.write_number_with_format(row, 3, number(&line.total), &money)?;
        sheet.write_number_with_format(row, 4, number(&line.paid), &money)?;
        sheet.write_number_with_format(row, 5, number(&line.remaining), &money)?;
    }

    Ok(workbook.save_to_buffer()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{dec, header, sample_result};
    use crate::models::CustomerFilter;
    use std::collections::BTreeMap;
    use std::io::{Cursor, Read};

    fn part(bytes: &[u8], name: &str) -> String {
        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let mut xml = String::new();
        archive.by_name(name).unwrap().read_to_string(&mut xml).unwrap();
        xml
    }

    fn shared_strings(xml: &str) -> Vec<String> {
        xml.split("<si>")
            .skip(1)
            .map(|si| {
                let open = si.find("<t").unwrap();
                let text = &si[open..];
                let text = &text[text.find('>').unwrap() + 1..];
                text[..text.find("</t>").unwrap()].to_string()
            })
            .collect()
    }

    /// 单元格引用 -> (是否文本, 值)
    fn cells(bytes: &[u8]) -> BTreeMap<String, (bool, String)> {
        let strings = shared_strings(&part(bytes, "xl/sharedStrings.xml"));
        let sheet = part(bytes, "xl/worksheets/sheet1.xml");

        let mut out = BTreeMap::new();
        for cell in sheet.split("<c r=\"").skip(1) {
            let reference = cell[..cell.find('"').unwrap()].to_string();
            let is_text = cell[..cell.find('>').unwrap()].contains("t=\"s\"");
            let value = match (cell.find("<v>"), cell.find("</v>")) {
                (Some(start), Some(end)) if end > start => &cell[start + 3..end],
                _ => continue,
            };
            let value = if is_text {
                strings[value.parse::<usize>().unwrap()].clone()
            } else {
                value.to_string()
            };
            out.insert(reference, (is_text, value));
        }
        out
    }

    fn text(cells: &BTreeMap<String, (bool, String)>, reference: &str) -> String {
        let (is_text, value) = &cells[reference];
        assert!(is_text, "{} should be text", reference);
        value.clone()
    }

    fn numeric(cells: &BTreeMap<String, (bool, String)>, reference: &str) -> String {
        let (is_text, value) = &cells[reference];
        assert!(!is_text, "{} should be numeric", reference);
        value.clone()
    }

    #[test]
    fn sheet_name_and_column_widths() {
        let bytes = render_xlsx(&header(CustomerFilter::All, "All Customers"), &sample_result()).unwrap();

        assert!(part(&bytes, "xl/workbook.xml").contains("name=\"Statement\""));
        let sheet = part(&bytes, "xl/worksheets/sheet1.xml");
        for width in ["12.7109375", "20.7109375", "10.7109375"] {
            assert!(sheet.contains(&format!("width=\"{}\"", width)), "missing width {}", width);
        }
    }

    #[test]
    fn header_block_then_order_rows() {
        let bytes = render_xlsx(&header(CustomerFilter::All, "All Customers"), &sample_result()).unwrap();
        let cells = cells(&bytes);

        assert_eq!(text(&cells, "A1"), "Jay Goga Milk - Statement");
        assert_eq!(text(&cells, "A2"), "Period: 2024-01-01 to 2024-01-31");
        assert_eq!(text(&cells, "A3"), "Customer: All Customers");
        assert!(!cells.contains_key("A4"));
        assert_eq!(text(&cells, "A5"), "Summary");
        assert_eq!(text(&cells, "A6"), "Total Order Value");
        assert_eq!(text(&cells, "B6"), "Rs 150.00");
        assert_eq!(text(&cells, "A7"), "Total Amount Paid");
        assert_eq!(text(&cells, "B7"), "Rs 100.00");
        assert_eq!(text(&cells, "A8"), "Total Pending Amount");
        assert_eq!(text(&cells, "B8"), "Rs 50.00");
        assert!(!cells.contains_key("A9"));
        assert_eq!(text(&cells, "A10"), "Order Details");

        let headings: Vec<String> = ["A11", "B11", "C11", "D11", "E11", "F11"]
            .iter()
            .map(|r| text(&cells, r))
            .collect();
        assert_eq!(
            headings,
            ["Date", "Customer", "Status", "Total (Rs)", "Paid (Rs)", "Remaining (Rs)"]
        );

        assert_eq!(text(&cells, "A12"), "2/1/2024");
        assert_eq!(text(&cells, "B12"), "Ravi Kumar");
        assert_eq!(text(&cells, "C12"), "pending");
        assert_eq!(numeric(&cells, "D12"), "50");
        assert_eq!(numeric(&cells, "E12"), "0");
        assert_eq!(numeric(&cells, "F12"), "50");
        assert_eq!(text(&cells, "C13"), "delivered");
        assert_eq!(numeric(&cells, "E13"), "100");
        assert!(!cells.contains_key("A14"));
    }

    #[test]
    fn produces_xlsx_container() {
        let bytes = render_xlsx(&header(CustomerFilter::All, "All Customers"), &sample_result()).unwrap();
        // xlsx 是 zip 包
        assert!(bytes.starts_with(b"PK"));
        assert!(bytes.len() > 1000);
    }

    #[test]
    fn empty_statement_renders_header_block_only() {
        let bytes = render_xlsx(
            &header(CustomerFilter::All, "All Customers"),
            &StatementResult::empty(),
        )
        .unwrap();
        assert!(bytes.starts_with(b"PK"));
    }

    #[test]
    fn amounts_become_numbers() {
        assert_eq!(number(&dec("150.25")), 150.25);
        assert_eq!(number(&dec("-24.5")), -24.5);
    }
}
