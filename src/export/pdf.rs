use super::{column_headers, export_rows, StatementHeader};
use crate::error::{AppError, AppResult};
use crate::models::StatementResult;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};

// A4, 单位 pt
const PAGE_WIDTH: f32 = 595.0;
const PAGE_HEIGHT: f32 = 842.0;
const MARGIN_X: f32 = 40.0;
const MARGIN_TOP: f32 = 50.0;
const MARGIN_BOTTOM: f32 = 50.0;
const TABLE_START: f32 = 125.0;
const ROW_HEIGHT: f32 = 18.0;
const CELL_PADDING: f32 = 4.0;
const SUMMARY_HEIGHT: f32 = 110.0;

const COLUMN_WIDTHS: [f32; 6] = [70.0, 145.0, 70.0, 75.0, 75.0, 80.0];

// 表头底色 rgb(22, 163, 74)
const HEADER_FILL: (f32, f32, f32) = (22.0 / 255.0, 163.0 / 255.0, 74.0 / 255.0);

const FONT_REGULAR: &str = "F1";
const FONT_BOLD: &str = "F2";

fn real(v: f32) -> Object {
    v.into()
}

/// 标准字体只支持 WinAnsi, 超出 Latin-1 的字符替换为 '?'
fn pdf_text(s: &str) -> Object {
    let bytes = s
        .chars()
        .map(|c| if (c as u32) < 256 { c as u8 } else { b'?' })
        .collect();
    Object::String(bytes, StringFormat::Literal)
}

/// 按字体大小粗略截断, 防止文字溢出单元格
fn fit(text: &str, width: f32, font_size: f32) -> String {
    let max_chars = ((width - 2.0 * CELL_PADDING) / (font_size * 0.5)).max(1.0) as usize;
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    out.push_str("...");
    out
}

/// 页面内容构建器, 坐标以页顶为原点向下
struct PageCanvas {
    ops: Vec<Operation>,
}

impl PageCanvas {
    fn new() -> Self {
        Self { ops: Vec::new() }
    }

    fn text(&mut self, font: &str, size: f32, x: f32, top: f32, text: &str) {
        self.ops.push(Operation::new("BT", vec![]));
        self.ops.push(Operation::new("Tf", vec![font.into(), real(size)]));
        self.ops.push(Operation::new("Td", vec![real(x), real(PAGE_HEIGHT - top)]));
        self.ops.push(Operation::new("Tj", vec![pdf_text(text)]));
        self.ops.push(Operation::new("ET", vec![]));
    }

    fn fill_color(&mut self, (r, g, b): (f32, f32, f32)) {
        self.ops.push(Operation::new("rg", vec![real(r), real(g), real(b)]));
    }

    fn stroke_color(&mut self, gray: f32) {
        self.ops.push(Operation::new("G", vec![real(gray)]));
    }

    fn rect(&mut self, x: f32, top: f32, width: f32, height: f32, op: &str) {
        self.ops.push(Operation::new(
            "re",
            vec![real(x), real(PAGE_HEIGHT - top - height), real(width), real(height)],
        ));
        self.ops.push(Operation::new(op, vec![]));
    }

    fn table_row(&mut self, top: f32, cells: &[String], header: bool) {
        let font = if header { FONT_BOLD } else { FONT_REGULAR };
        let size = 9.0;
        let mut x = MARGIN_X;

        if header {
            self.fill_color(HEADER_FILL);
            self.rect(MARGIN_X, top, COLUMN_WIDTHS.iter().sum(), ROW_HEIGHT, "f");
            self.fill_color((1.0, 1.0, 1.0));
        } else {
            self.fill_color((0.2, 0.2, 0.2));
        }

        for (cell, width) in cells.iter().zip(COLUMN_WIDTHS) {
            self.stroke_color(0.75);
            self.rect(x, top, width, ROW_HEIGHT, "S");
            self.text(font, size, x + CELL_PADDING, top + ROW_HEIGHT - 5.5, &fit(cell, width, size));
            x += width;
        }
        self.fill_color((0.0, 0.0, 0.0));
    }

    fn finish(self) -> AppResult<Vec<u8>> {
        Content { operations: self.ops }
            .encode()
            .map_err(|e| AppError::Export(e.to_string()))
    }
}

/// 渲染可打印的对账单 PDF
///
/// 第一页: 标题, 期间, 客户, 明细表; 明细超出一页时续页并重复表头; 最后是汇总.
pub fn render_pdf(header: &StatementHeader, result: &StatementResult) -> AppResult<Vec<u8>> {
    let columns = column_headers(&header.currency_label);
    let rows = export_rows(result);

    let mut pages: Vec<PageCanvas> = Vec::new();
    let mut canvas = PageCanvas::new();

    canvas.text(FONT_BOLD, 18.0, MARGIN_X, 62.0, &header.title());
    canvas.fill_color((0.39, 0.39, 0.39));
    canvas.text(FONT_REGULAR, 11.0, MARGIN_X, 85.0, &header.period());
    canvas.text(FONT_REGULAR, 11.0, MARGIN_X, 102.0, &header.customer_line());
    canvas.fill_color((0.0, 0.0, 0.0));

    let mut top = TABLE_START;
    canvas.table_row(top, &columns, true);
    top += ROW_HEIGHT;

    for row in &rows {
        if top + ROW_HEIGHT > PAGE_HEIGHT - MARGIN_BOTTOM {
            pages.push(std::mem::replace(&mut canvas, PageCanvas::new()));
            top = MARGIN_TOP;
            canvas.table_row(top, &columns, true);
            top += ROW_HEIGHT;
        }
        canvas.table_row(top, &row.cells(), false);
        top += ROW_HEIGHT;
    }

    if top + SUMMARY_HEIGHT > PAGE_HEIGHT - MARGIN_BOTTOM {
        pages.push(std::mem::replace(&mut canvas, PageCanvas::new()));
        top = MARGIN_TOP;
    }

    canvas.text(FONT_BOLD, 12.0, MARGIN_X, top + 42.0, "Summary");
    for (i, (label, amount)) in header.summary_lines(result).iter().enumerate() {
        let line = format!("{}: {}", label, amount);
        canvas.text(FONT_REGULAR, 10.0, MARGIN_X, top + 62.0 + 17.0 * i as f32, &line);
    }
    pages.push(canvas);

    assemble(header, pages)
}

fn font(base: &str) -> lopdf::Dictionary {
    dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => base,
        "Encoding" => "WinAnsiEncoding",
    }
}

fn assemble(header: &StatementHeader, pages: Vec<PageCanvas>) -> AppResult<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id: ObjectId = doc.new_object_id();

    let regular_id = doc.add_object(font("Helvetica"));
    let bold_id = doc.add_object(font("Helvetica-Bold"));
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            FONT_REGULAR => regular_id,
            FONT_BOLD => bold_id,
        },
    });

    let mut kids: Vec<Object> = Vec::with_capacity(pages.len());
    for canvas in pages {
        let content_id = doc.add_object(Stream::new(dictionary! {}, canvas.finish()?));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
        });
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => page_count,
            "Resources" => resources_id,
            "MediaBox" => vec![real(0.0), real(0.0), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
        }),
    );

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    let info_id = doc.add_object(dictionary! {
        "Title" => pdf_text(&header.title()),
        "Producer" => pdf_text("dairy-ledger"),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer)
        .map_err(|e| AppError::Export(e.to_string()))?;
    Ok(buffer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::export::test_support::{header, order, sample_result};
    use crate::models::{CustomerFilter, OrderStatus, StatementResult};
    use chrono::NaiveDate;

    fn contains(haystack: &[u8], needle: &str) -> bool {
        haystack
            .windows(needle.len())
            .any(|window| window == needle.as_bytes())
    }

    #[test]
    fn renders_title_table_and_summary() {
        let bytes = render_pdf(&header(CustomerFilter::All, "All Customers"), &sample_result()).unwrap();

        assert!(bytes.starts_with(b"%PDF-1.5"));
        assert!(contains(&bytes, "Jay Goga Milk - Statement"));
        assert!(contains(&bytes, "Period: 2024-01-01 to 2024-01-31"));
        assert!(contains(&bytes, "Remaining"));
        assert!(contains(&bytes, "2/1/2024"));
        assert!(contains(&bytes, "Total Pending Amount: Rs 50.00"));

        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);
    }

    #[test]
    fn empty_statement_still_renders() {
        let bytes = render_pdf(&header(CustomerFilter::All, "All Customers"), &StatementResult::empty()).unwrap();
        assert!(contains(&bytes, "Total Order Value: Rs 0.00"));
    }

    #[test]
    fn long_statements_flow_onto_more_pages() {
        let day = NaiveDate::from_ymd_opt(2024, 1, 15).unwrap();
        let mut result = StatementResult::empty();
        result.orders = (0..80)
            .map(|_| order(day, "Suresh", "40", None, OrderStatus::Pending))
            .collect();
        result.total_orders = 80;
        result.pending_orders = 80;

        let bytes = render_pdf(&header(CustomerFilter::All, "All Customers"), &result).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert!(doc.get_pages().len() >= 3);
    }

    #[test]
    fn long_names_are_truncated() {
        let name = "Shri Radhe Krishna Milk Distribution Centre";
        let fitted = fit(name, COLUMN_WIDTHS[1], 9.0);
        assert!(fitted.ends_with("..."));
        assert!(fitted.chars().count() < name.chars().count());
        assert_eq!(fit("Ravi", COLUMN_WIDTHS[1], 9.0), "Ravi");
    }
}
