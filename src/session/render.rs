use unicode_width::UnicodeWidthStr;

use crate::models::IssueSummary;

const MIN_WIDTH: usize = 4;
const TAB_WIDTH: usize = 4;
const PADDING: usize = 1;

/// Lay out rows as tab-padded columns.
///
/// Every cell but the last in a row is padded with tabs so that its column
/// is as wide as the widest cell plus padding, rounded up to a tab stop.
/// The last cell is written as is.
pub fn tab_align(rows: &[Vec<String>]) -> String {
    let columns = rows.iter().map(|r| r.len().saturating_sub(1)).max().unwrap_or(0);
    let mut widths = vec![MIN_WIDTH; columns];
    for row in rows {
        for (i, cell) in row.iter().take(row.len().saturating_sub(1)).enumerate() {
            widths[i] = widths[i].max(cell.width() + PADDING);
        }
    }

    let mut out = String::new();
    for row in rows {
        let last = row.len().saturating_sub(1);
        for (i, cell) in row.iter().enumerate() {
            out.push_str(cell);
            if i < last {
                let cell_width = widths[i].div_ceil(TAB_WIDTH) * TAB_WIDTH;
                let gap = cell_width - cell.width();
                out.push_str(&"\t".repeat(gap.div_ceil(TAB_WIDTH)));
            }
        }
        out.push('\n');
    }
    out
}

/// One `key  type/status  summary` row per issue, in the order given.
pub fn issue_table(issues: &[IssueSummary]) -> String {
    let rows: Vec<Vec<String>> = issues
        .iter()
        .map(|i| {
            vec![
                i.key.clone(),
                format!("{}/{}", i.issue_type, i.status),
                i.summary.clone(),
            ]
        })
        .collect();
    tab_align(&rows)
}
