//! 对账单导出: PDF 表格 / Excel 工作簿 / CSV
//!
//! 三种格式共用同一个文件名和同一组行数据, 全部在内存中生成.

pub mod csv_export;
pub mod pdf;
pub mod xlsx;

use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use crate::error::{AppError, AppResult};
use crate::models::{CustomerFilter, GeneratedStatement, Order, StatementResult};
use std::fmt;
use std::str::FromStr;

/// 明细表列 (货币列带单位)
pub fn column_headers(currency: &str) -> [String; 6] {
    [
        "Date".to_string(),
        "Customer".to_string(),
        "Status".to_string(),
        format!("Total ({})", currency),
        format!("Paid ({})", currency),
        format!("Remaining ({})", currency),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Pdf,
    Xlsx,
    Csv,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "pdf",
            ExportFormat::Xlsx => "xlsx",
            ExportFormat::Csv => "csv",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Pdf => "application/pdf",
            ExportFormat::Xlsx => {
                "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
            }
            ExportFormat::Csv => "text/csv; charset=utf-8",
        }
    }
}

impl FromStr for ExportFormat {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "pdf" => Ok(ExportFormat::Pdf),
            "xlsx" | "excel" => Ok(ExportFormat::Xlsx),
            "csv" => Ok(ExportFormat::Csv),
            other => Err(AppError::BadRequest(format!("unsupported export format `{}`", other))),
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// 导出抬头信息
#[derive(Debug, Clone)]
pub struct StatementHeader {
    pub business_name: String,
    pub currency_label: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub customer: CustomerFilter,
    pub customer_name: String,
}

impl StatementHeader {
    pub fn for_statement(
        statement: &GeneratedStatement,
        business_name: &str,
        currency_label: &str,
    ) -> Self {
        Self {
            business_name: business_name.to_string(),
            currency_label: currency_label.to_string(),
            start_date: statement.query.start_date,
            end_date: statement.query.end_date,
            customer: statement.query.customer,
            customer_name: statement.customer_name.clone(),
        }
    }

    pub fn title(&self) -> String {
        format!("{} - Statement", self.business_name)
    }

    pub fn period(&self) -> String {
        format!("Period: {} to {}", self.start_date, self.end_date)
    }

    pub fn customer_line(&self) -> String {
        format!("Customer: {}", self.customer_name)
    }

    pub fn money(&self, value: &BigDecimal) -> String {
        format!("{} {}", self.currency_label, format_money(value))
    }

    /// 汇总三行: (标签, 金额文本)
    pub fn summary_lines(&self, result: &StatementResult) -> [(&'static str, String); 3] {
        [
            ("Total Order Value", self.money(&result.total_amount)),
            ("Total Amount Paid", self.money(&result.total_paid)),
            ("Total Pending Amount", self.money(&result.pending_amount)),
        ]
    }

    pub fn file_name(&self, format: ExportFormat) -> String {
        statement_file_name(
            &self.customer,
            &self.customer_name,
            self.start_date,
            self.end_date,
            format.extension(),
        )
    }
}

/// Statement_<客户>_<起>_to_<止>.<扩展名>
///
/// 客户名中的空白和 `"` `\\` `/` 替换为下划线, 控制字符丢弃.
pub fn statement_file_name(
    customer: &CustomerFilter,
    customer_name: &str,
    start: NaiveDate,
    end: NaiveDate,
    extension: &str,
) -> String {
    let customer_part = match customer {
        CustomerFilter::All => "All_Customers".to_string(),
        CustomerFilter::Customer(_) => customer_name
            .chars()
            .filter(|c| !c.is_control() || c.is_whitespace())
            .map(|c| match c {
                '"' | '\\' | '/' => '_',
                c if c.is_whitespace() => '_',
                c => c,
            })
            .collect(),
    };
    format!("Statement_{}_{}_to_{}.{}", customer_part, start, end, extension)
}

/// 下载头: ASCII 文件名 + RFC 6266 的 UTF-8 文件名
pub fn content_disposition(file_name: &str) -> String {
    let fallback: String = file_name
        .chars()
        .map(|c| if c.is_ascii() && !c.is_ascii_control() { c } else { '_' })
        .collect();
    if fallback == file_name {
        return format!("attachment; filename=\"{}\"", file_name);
    }
    format!(
        "attachment; filename=\"{}\"; filename*=UTF-8''{}",
        fallback,
        urlencoding::encode(file_name)
    )
}

/// 保留两位小数 (四舍五入)
pub fn format_money(value: &BigDecimal) -> String {
    value.round(2).with_scale(2).to_string()
}

/// 日/月/年, 不补零
pub fn format_day(date: NaiveDate) -> String {
    format!("{}/{}/{}", date.day(), date.month(), date.year())
}

/// 一行明细 (导出用文本)
#[derive(Debug, Clone, PartialEq)]
pub struct ExportRow {
    pub date: String,
    pub customer: String,
    pub status: String,
    pub total: BigDecimal,
    pub paid: BigDecimal,
    pub remaining: BigDecimal,
}

impl ExportRow {
    pub fn from_order(order: &Order) -> Self {
        Self {
            date: format_day(order.date),
            customer: order.customer_name.clone(),
            status: order.status.to_string(),
            total: order.total_amount.clone(),
            paid: order.paid(),
            remaining: order.remaining(),
        }
    }

    pub fn cells(&self) -> [String; 6] {
        [
            self.date.clone(),
            self.customer.clone(),
            self.status.clone(),
            format_money(&self.total),
            format_money(&self.paid),
            format_money(&self.remaining),
        ]
    }
}

pub fn export_rows(result: &StatementResult) -> Vec<ExportRow> {
    result.orders.iter().map(ExportRow::from_order).collect()
}

/// 生成好的下载文件
#[derive(Debug, Clone)]
pub struct ExportArtifact {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// 按格式渲染对账单
pub fn render(
    format: ExportFormat,
    header: &StatementHeader,
    result: &StatementResult,
) -> AppResult<ExportArtifact> {
    let bytes = match format {
        ExportFormat::Pdf => pdf::render_pdf(header, result)?,
        ExportFormat::Xlsx => xlsx::render_xlsx(header, result)?,
        ExportFormat::Csv => csv_export::render_csv(header, result)?,
    };
    tracing::info!(
        "Rendered {} statement ({} orders, {} bytes)",
        format,
        result.total_orders,
        bytes.len()
    );
    Ok(ExportArtifact {
        file_name: header.file_name(format),
        content_type: format.content_type(),
        bytes,
    })
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::models::OrderStatus;
    use chrono::Utc;
    use uuid::Uuid;

    pub fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    pub fn order(date: NaiveDate, name: &str, total: &str, paid: Option<&str>, status: OrderStatus) -> Order {
        Order {
            id: Uuid::new_v4(),
            date,
            customer_id: Uuid::new_v4(),
            customer_name: name.to_string(),
            items: Vec::new(),
            total_amount: dec(total),
            amount_paid: paid.map(dec),
            status,
            created_at: Utc::now(),
        }
    }

    pub fn header(customer: CustomerFilter, customer_name: &str) -> StatementHeader {
        StatementHeader {
            business_name: "Jay Goga Milk".to_string(),
            currency_label: "Rs".to_string(),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(),
            customer,
            customer_name: customer_name.to_string(),
        }
    }

    pub fn sample_result() -> StatementResult {
        let orders = vec![
            order(NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(), "Ravi Kumar", "50", Some("0"), OrderStatus::Pending),
            order(NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(), "Ravi Kumar", "100", Some("100"), OrderStatus::Delivered),
        ];
        StatementResult {
            orders,
            total_amount: dec("150"),
            total_paid: dec("100"),
            pending_amount: dec("50"),
            total_orders: 2,
            delivered_orders: 1,
            pending_orders: 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use uuid::Uuid;

    #[test]
    fn file_name_for_all_customers() {
        let h = header(CustomerFilter::All, "All Customers");
        assert_eq!(
            h.file_name(ExportFormat::Pdf),
            "Statement_All_Customers_2024-01-01_to_2024-01-31.pdf"
        );
        assert_eq!(
            h.file_name(ExportFormat::Xlsx),
            "Statement_All_Customers_2024-01-01_to_2024-01-31.xlsx"
        );
    }

    #[test]
    fn file_name_replaces_every_whitespace() {
        let h = header(CustomerFilter::Customer(Uuid::new_v4()), "Shree  Ganesh\tDairy");
        assert_eq!(
            h.file_name(ExportFormat::Csv),
            "Statement_Shree__Ganesh_Dairy_2024-01-01_to_2024-01-31.csv"
        );
    }

    #[test]
    fn file_name_is_safe_in_a_header() {
        let h = header(CustomerFilter::Customer(Uuid::new_v4()), "Sharma \"Bhaiya\" Dairy\u{1}");
        let name = h.file_name(ExportFormat::Pdf);
        assert_eq!(name, "Statement_Sharma__Bhaiya__Dairy_2024-01-01_to_2024-01-31.pdf");
        assert_eq!(
            content_disposition(&name),
            "attachment; filename=\"Statement_Sharma__Bhaiya__Dairy_2024-01-01_to_2024-01-31.pdf\""
        );

        let h = header(CustomerFilter::Customer(Uuid::new_v4()), "a\\b/c");
        assert_eq!(h.file_name(ExportFormat::Csv), "Statement_a_b_c_2024-01-01_to_2024-01-31.csv");
    }

    #[test]
    fn non_ascii_names_get_an_encoded_file_name() {
        let value = content_disposition("Statement_Rāmu_2024-01-01_to_2024-01-31.pdf");
        assert_eq!(
            value,
            "attachment; filename=\"Statement_R_mu_2024-01-01_to_2024-01-31.pdf\"; \
             filename*=UTF-8''Statement_R%C4%81mu_2024-01-01_to_2024-01-31.pdf"
        );
    }

    #[test]
    fn money_has_two_decimals() {
        assert_eq!(format_money(&dec("150")), "150.00");
        assert_eq!(format_money(&dec("12.5")), "12.50");
        assert_eq!(format_money(&dec("9.999")), "10.00");
        assert_eq!(format_money(&dec("-24.5")), "-24.50");
        assert_eq!(format_money(&dec("0")), "0.00");
    }

    #[test]
    fn day_is_not_zero_padded() {
        assert_eq!(format_day(NaiveDate::from_ymd_opt(2024, 3, 5).unwrap()), "5/3/2024");
        assert_eq!(format_day(NaiveDate::from_ymd_opt(2024, 12, 25).unwrap()), "25/12/2024");
    }

    #[test]
    fn rows_carry_remaining_balance() {
        let rows = export_rows(&sample_result());
        assert_eq!(
            rows[0].cells(),
            ["2/1/2024", "Ravi Kumar", "pending", "50.00", "0.00", "50.00"].map(String::from)
        );
        assert_eq!(rows[1].cells()[5], "0.00");
    }

    #[test]
    fn summary_lines_use_currency_label() {
        let h = header(CustomerFilter::All, "All Customers");
        let lines = h.summary_lines(&sample_result());
        assert_eq!(lines[0], ("Total Order Value", "Rs 150.00".to_string()));
        assert_eq!(lines[2], ("Total Pending Amount", "Rs 50.00".to_string()));
    }

    #[test]
    fn format_parsing() {
        assert_eq!("PDF".parse::<ExportFormat>().unwrap(), ExportFormat::Pdf);
        assert_eq!("excel".parse::<ExportFormat>().unwrap(), ExportFormat::Xlsx);
        assert!("docx".parse::<ExportFormat>().is_err());
    }
}
