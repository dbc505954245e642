//! Builds the form bodies for the three postbacks the dashboard accepts.
//!
//! Each payload declares which control triggered it and which page regions
//! to re-render, followed by the full form state. The field set mirrors what
//! a browser submits, minus `javax.faces.partial.ajax`: leaving that flag out
//! makes the server answer with the whole document instead of an XML partial
//! response, which keeps parsing to a single HTML reader.

use crate::token::ViewState;
use crate::types::ALL_CODE;

/// Form field carrying the view state token.
pub const VIEW_STATE_FIELD: &str = "javax.faces.ViewState";
/// Form field carrying the region code.
pub const REGION_FIELD: &str = "j_idt33_input";
/// Form field carrying the sub-region code.
pub const SUB_REGION_FIELD: &str = "selectedRto_input";
/// Form field carrying the year.
pub const YEAR_FIELD: &str = "selectedYear_input";
/// Form field carrying the month code (`year` or `year * 100 + month`).
pub const MONTH_FIELD: &str = "groupingTable:selectMonth_input";
/// Form field naming the control that triggered the postback.
pub const SOURCE_FIELD: &str = "javax.faces.source";

const REFRESH_BUTTON: &str = "j_idt63";
const REGION_DROPDOWN: &str = "j_idt33";
const MONTH_DROPDOWN: &str = "groupingTable:selectMonth";
const REFRESH_RENDER: &str = "VhCatg+norms+fuel+VhClass+combTablePnl+groupingTable+msg+vhCatgPnl";

const Y_AXIS: &str = "Vehicle Category";
const X_AXIS: &str = "Fuel";
const YEAR_TYPE_CALENDAR: &str = "C";

/// Which UI action a payload replays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PayloadKind {
    /// The refresh button: re-render the table for the current selection.
    Refresh,
    /// A change of the region dropdown; renders the sub-region options.
    RegionSelect,
    /// A change of the month dropdown on an already rendered table.
    MonthSelect,
}

impl PayloadKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PayloadKind::Refresh => "refresh",
            PayloadKind::RegionSelect => "region-select",
            PayloadKind::MonthSelect => "month-select",
        }
    }
}

/// The time window of a selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    WholeYear,
    Month(u32),
}

/// The dashboard selection a payload encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub region_code: String,
    pub sub_region_code: String,
    pub year: i32,
    pub period: Period,
}

impl Selection {
    /// All regions, all sub-regions, whole year.
    pub fn year(year: i32) -> Self {
        Self {
            region_code: ALL_CODE.to_string(),
            sub_region_code: ALL_CODE.to_string(),
            year,
            period: Period::WholeYear,
        }
    }

    pub fn region(mut self, region_code: impl Into<String>) -> Self {
        self.region_code = region_code.into();
        self
    }

    pub fn sub_region(mut self, sub_region_code: impl Into<String>) -> Self {
        self.sub_region_code = sub_region_code.into();
        self
    }

    pub fn month(mut self, month: u32) -> Self {
        self.period = Period::Month(month);
        self
    }

    /// Value of the month dropdown: `2022` for the year, `202203` for March.
    pub fn month_code(&self) -> i64 {
        match self.period {
            Period::WholeYear => i64::from(self.year),
            Period::Month(m) => i64::from(self.year) * 100 + i64::from(m),
        }
    }
}

/// A complete, immutable form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Payload {
    kind: PayloadKind,
    fields: Vec<(&'static str, String)>,
}

impl Payload {
    pub fn kind(&self) -> PayloadKind {
        self.kind
    }

    /// Fields in submission order.
    pub fn fields(&self) -> &[(&'static str, String)] {
        &self.fields
    }

    /// Value of a field, if present.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v.as_str())
    }

    /// The view state token this payload was built with.
    pub fn token(&self) -> Option<&str> {
        self.get(VIEW_STATE_FIELD)
    }
}

/// Build the payload for `kind` from the selection and the current token.
///
/// A region-select always sends the sub-region as "all": the server only
/// learns the region here and renders its sub-region list.
pub fn build_payload(kind: PayloadKind, selection: &Selection, token: &ViewState) -> Payload {
    let mut fields: Vec<(&'static str, String)> = Vec::with_capacity(32);

    match kind {
        PayloadKind::Refresh => {
            fields.push((SOURCE_FIELD, REFRESH_BUTTON.into()));
            fields.push(("javax.faces.partial.execute", "@all".into()));
            fields.push(("javax.faces.partial.render", REFRESH_RENDER.into()));
            fields.push((REFRESH_BUTTON, REFRESH_BUTTON.into()));
        }
        PayloadKind::RegionSelect => {
            fields.push((SOURCE_FIELD, REGION_DROPDOWN.into()));
            fields.push(("javax.faces.partial.execute", REGION_DROPDOWN.into()));
            fields.push(("javax.faces.partial.render", "selectedRto".into()));
            fields.push(("javax.faces.behavior.event", "change".into()));
            fields.push(("javax.faces.partial.event", "change".into()));
        }
        PayloadKind::MonthSelect => {
            fields.push((SOURCE_FIELD, MONTH_DROPDOWN.into()));
            fields.push(("javax.faces.partial.execute", MONTH_DROPDOWN.into()));
            fields.push(("javax.faces.partial.render", "combTablePnl".into()));
            fields.push(("javax.faces.behavior.event", "change".into()));
            fields.push(("javax.faces.partial.event", "change".into()));
        }
    }

    let sub_region_code = match kind {
        PayloadKind::RegionSelect => ALL_CODE.to_string(),
        _ => selection.sub_region_code.clone(),
    };

    fields.extend([
        ("masterLayout_formlogin", "masterLayout_formlogin".to_string()),
        ("j_idt24_focus", String::new()),
        ("j_idt24_input", "A".to_string()),
        ("j_idt33_focus", String::new()),
        (REGION_FIELD, selection.region_code.clone()),
        ("selectedRto_focus", String::new()),
        (SUB_REGION_FIELD, sub_region_code),
        ("yaxisVar_focus", String::new()),
        ("yaxisVar_input", Y_AXIS.to_string()),
        ("xaxisVar_focus", String::new()),
        ("xaxisVar_input", X_AXIS.to_string()),
        ("selectedYearType_focus", String::new()),
        ("selectedYearType_input", YEAR_TYPE_CALENDAR.to_string()),
        ("selectedYear_focus", String::new()),
        (YEAR_FIELD, selection.year.to_string()),
        ("groupingTable:selectMonth_focus", String::new()),
        (MONTH_FIELD, selection.month_code().to_string()),
        ("vchgroupTable_scrollState", "0,0".to_string()),
        (VIEW_STATE_FIELD, token.as_str().to_string()),
    ]);

    Payload { kind, fields }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> ViewState {
        ViewState::new("tok-1")
    }

    #[test]
    fn test_refresh_payload() {
        let sel = Selection::year(2022).region("DL").sub_region("05");
        let p = build_payload(PayloadKind::Refresh, &sel, &token());

        assert_eq!(p.kind(), PayloadKind::Refresh);
        assert_eq!(p.get(SOURCE_FIELD), Some("j_idt63"));
        assert_eq!(p.get("javax.faces.partial.execute"), Some("@all"));
        assert_eq!(p.get("j_idt63"), Some("j_idt63"));
        assert_eq!(p.get(REGION_FIELD), Some("DL"));
        assert_eq!(p.get(SUB_REGION_FIELD), Some("05"));
        assert_eq!(p.get(YEAR_FIELD), Some("2022"));
        assert_eq!(p.get(MONTH_FIELD), Some("2022"));
        assert_eq!(p.token(), Some("tok-1"));
    }

    #[test]
    fn test_region_select_forces_all_sub_regions() {
        let sel = Selection::year(2023).region("DL").sub_region("05");
        let p = build_payload(PayloadKind::RegionSelect, &sel, &token());

        assert_eq!(p.get(SOURCE_FIELD), Some("j_idt33"));
        assert_eq!(p.get("javax.faces.partial.render"), Some("selectedRto"));
        assert_eq!(p.get("javax.faces.behavior.event"), Some("change"));
        assert_eq!(p.get(REGION_FIELD), Some("DL"));
        assert_eq!(p.get(SUB_REGION_FIELD), Some("-1"));
        assert_eq!(p.get(YEAR_FIELD), Some("2023"));
    }

    #[test]
    fn test_month_select_code() {
        let sel = Selection::year(2022).region("DL").sub_region("05").month(3);
        let p = build_payload(PayloadKind::MonthSelect, &sel, &token());

        assert_eq!(p.get(SOURCE_FIELD), Some("groupingTable:selectMonth"));
        assert_eq!(p.get("javax.faces.partial.render"), Some("combTablePnl"));
        assert_eq!(p.get(MONTH_FIELD), Some("202203"));
        assert_eq!(p.get(YEAR_FIELD), Some("2022"));
    }

    #[test]
    fn test_fixed_axes_and_no_ajax_flag() {
        for kind in [
            PayloadKind::Refresh,
            PayloadKind::RegionSelect,
            PayloadKind::MonthSelect,
        ] {
            let p = build_payload(kind, &Selection::year(2022), &token());
            assert_eq!(p.get("yaxisVar_input"), Some("Vehicle Category"));
            assert_eq!(p.get("xaxisVar_input"), Some("Fuel"));
            assert_eq!(p.get("selectedYearType_input"), Some("C"));
            assert_eq!(p.get("javax.faces.partial.ajax"), None);
            assert_eq!(p.fields().last().map(|(k, _)| *k), Some(VIEW_STATE_FIELD));
        }
    }

    #[test]
    fn test_builds_are_independent() {
        let first = build_payload(
            PayloadKind::Refresh,
            &Selection::year(2022).region("DL").sub_region("05"),
            &ViewState::new("a"),
        );
        let second = build_payload(PayloadKind::Refresh, &Selection::year(2023), &ViewState::new("b"));

        assert_eq!(first.get(REGION_FIELD), Some("DL"));
        assert_eq!(first.token(), Some("a"));
        assert_eq!(second.get(REGION_FIELD), Some("-1"));
        assert_eq!(second.get(SUB_REGION_FIELD), Some("-1"));
        assert_eq!(second.token(), Some("b"));
    }
}
