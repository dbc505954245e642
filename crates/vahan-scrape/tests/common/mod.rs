//! Page builders shared by the integration tests.

#![allow(dead_code)]

pub const REPORT_PATH: &str = "/vahan4dashboard/vahan/view/reportview.xhtml";

/// A full dashboard document with the given token and table body.
pub fn page(token: &str, table_rows: &str) -> String {
    page_with(token, table_rows, "")
}

/// Like [`page`], with extra markup (dropdowns) inside the form.
pub fn page_with(token: &str, table_rows: &str, extra: &str) -> String {
    let fuel_headers: String = (0..FUEL_COLUMNS).map(|i| format!("<th>FUEL {i}</th>")).collect();
    format!(
        r#"<!DOCTYPE html>
<html><head><title>Vahan Dashboard</title></head><body>
<form id="masterLayout_formlogin" name="masterLayout_formlogin" method="post">
{extra}
<div id="combTablePnl"><table role="grid"><thead>
<tr><th rowspan="2">S No</th><th rowspan="2">Vehicle Category</th><th colspan="{FUEL_COLUMNS}">Fuel</th><th rowspan="2">TOTAL</th></tr>
<tr>{fuel_headers}</tr></thead>
<tbody id="groupingTable_data" class="ui-datatable-data ui-widget-content">{table_rows}</tbody></table></div>
<input type="hidden" name="javax.faces.ViewState" id="j_id1:javax.faces.ViewState:0" value="{token}" autocomplete="off" />
</form></body></html>"#
    )
}

/// Fuel columns in the rendered report; electric (BOV) is the eighth.
pub const FUEL_COLUMNS: usize = 24;

/// A data row as the report renders it: serial, category, one cell per fuel,
/// then the total. The EV count lands at index 9.
pub fn data_row(serial: u32, category: &str, ev: &str) -> String {
    let mut cells = vec![serial.to_string(), category.to_string()];
    cells.extend((2..9).map(|_| "0".to_string()));
    cells.push(ev.to_string());
    cells.extend((10..FUEL_COLUMNS + 2).map(|_| "0".to_string()));
    cells.push(ev.to_string());
    let tds: String = cells.iter().map(|c| format!("<td>{c}</td>")).collect();
    format!(r#"<tr data-ri="{serial}" class="ui-widget-content">{tds}</tr>"#)
}

pub const NO_RECORDS: &str =
    r#"<tr class="ui-widget-content ui-datatable-empty-message"><td colspan="10">No records found.</td></tr>"#;

/// A dropdown with a leading "all" option.
pub fn dropdown(id: &str, options: &[(&str, &str)]) -> String {
    let opts: String = options
        .iter()
        .map(|(value, label)| format!(r#"<option value="{value}">{label}</option>"#))
        .collect();
    format!(r#"<select id="{id}" name="{id}"><option value="-1">All</option>{opts}</select>"#)
}
