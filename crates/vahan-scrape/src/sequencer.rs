//! The postback conversation for one (region, sub-region, year).
//!
//! The server only accepts one order of requests:
//!
//! ```text
//! Init ─GET + refresh(year)─▶ YearSet ─region-select─▶ RegionSelected
//!      ─refresh(region, sub-region)─▶ SubRegionRendered
//!      ─month-select(1)─▶ MonthIterating(1) ─month-select(2)─▶ … ─▶ Done
//! ```
//!
//! Every response carries a fresh view state token and every request must
//! echo the latest one, so a conversation is strictly sequential.

use crate::payload::{build_payload, Payload, PayloadKind, Selection};
use crate::sink::RowSink;
use crate::table::{extract_counts, TableLayout};
use crate::token::{extract_view_state, ViewState};
use crate::transport::Transport;
use crate::types::{DataRow, RegionEntry, ScrapeError, ScrapeResult, UnitId};

/// Token state of one conversation, plus the transport it talks through.
///
/// The transport owns the cookie jar; the token lives here and is replaced
/// after every round trip.
pub struct SessionState<'a, T: Transport + ?Sized> {
    transport: &'a T,
    endpoint: &'a str,
    token: Option<ViewState>,
    round_trips: u32,
}

impl<'a, T: Transport + ?Sized> SessionState<'a, T> {
    pub fn new(transport: &'a T, endpoint: &'a str) -> Self {
        Self {
            transport,
            endpoint,
            token: None,
            round_trips: 0,
        }
    }

    /// The most recently observed token.
    pub fn token(&self) -> Option<&ViewState> {
        self.token.as_ref()
    }

    /// Requests sent so far.
    pub fn round_trips(&self) -> u32 {
        self.round_trips
    }

    /// Load the page with a plain GET and take its token.
    pub async fn open(&mut self) -> ScrapeResult<String> {
        let body = self.transport.get(self.endpoint).await?;
        self.observe(body)
    }

    /// Send a postback stamped with the current token and take the new one.
    pub async fn postback(&mut self, kind: PayloadKind, selection: &Selection) -> ScrapeResult<String> {
        let token = self.token.as_ref().ok_or_else(|| {
            ScrapeError::Sequence(format!("{} postback before the page was opened", kind.as_str()))
        })?;
        let payload: Payload = build_payload(kind, selection, token);

        tracing::debug!(
            kind = kind.as_str(),
            round_trip = self.round_trips + 1,
            region = %selection.region_code,
            sub_region = %selection.sub_region_code,
            month_code = selection.month_code(),
            "postback"
        );

        let body = self.transport.post_form(self.endpoint, payload.fields()).await?;
        self.observe(body)
    }

    fn observe(&mut self, body: String) -> ScrapeResult<String> {
        self.round_trips += 1;
        self.token = Some(extract_view_state(&body)?);
        Ok(body)
    }
}

/// Where a conversation stands.
///
/// `MonthIterating(m)` means month `m` has been fetched and more remain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationState {
    Init,
    YearSet,
    RegionSelected,
    SubRegionRendered,
    MonthIterating(u32),
    Done,
}

/// The rendered page for one month.
#[derive(Debug, Clone)]
pub struct MonthPage {
    pub month: u32,
    pub html: String,
}

/// Outcome of a completed conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitReport {
    pub months_extracted: u32,
    pub rows_written: u64,
    pub round_trips: u32,
}

/// One (region, sub-region, year) conversation.
pub struct Conversation<'a, T: Transport + ?Sized> {
    session: SessionState<'a, T>,
    entry: &'a RegionEntry,
    year: i32,
    month_until: u32,
    state: ConversationState,
}

impl<'a, T: Transport + ?Sized> Conversation<'a, T> {
    /// Start a conversation covering months `1..=month_until` of `year`.
    pub fn new(
        transport: &'a T,
        endpoint: &'a str,
        entry: &'a RegionEntry,
        year: i32,
        month_until: u32,
    ) -> ScrapeResult<Self> {
        if !(1..=12).contains(&month_until) {
            return Err(ScrapeError::InvalidInput(format!(
                "month_until must be within 1..=12, got {month_until}"
            )));
        }
        if entry.region_code.is_empty() || entry.sub_region_code.is_empty() {
            return Err(ScrapeError::InvalidInput(format!(
                "catalog entry {} / {} has an empty code",
                entry.region_name, entry.sub_region_name
            )));
        }

        Ok(Self {
            session: SessionState::new(transport, endpoint),
            entry,
            year,
            month_until,
            state: ConversationState::Init,
        })
    }

    pub fn state(&self) -> ConversationState {
        self.state
    }

    pub fn session(&self) -> &SessionState<'a, T> {
        &self.session
    }

    pub fn unit(&self) -> UnitId {
        UnitId::new(self.entry, self.year)
    }

    fn selection(&self) -> Selection {
        Selection::year(self.year)
            .region(self.entry.region_code.as_str())
            .sub_region(self.entry.sub_region_code.as_str())
    }

    /// Perform the next transition.
    ///
    /// Returns the month page for transitions that fetch a month, `None`
    /// for the setup steps.
    pub async fn advance(&mut self) -> ScrapeResult<Option<MonthPage>> {
        match self.state {
            ConversationState::Init => {
                self.session.open().await?;
                self.session
                    .postback(PayloadKind::Refresh, &Selection::year(self.year))
                    .await?;
                self.state = ConversationState::YearSet;
                Ok(None)
            }
            ConversationState::YearSet => {
                let selection = self.selection();
                self.session
                    .postback(PayloadKind::RegionSelect, &selection)
                    .await?;
                self.state = ConversationState::RegionSelected;
                Ok(None)
            }
            ConversationState::RegionSelected => {
                let selection = self.selection();
                self.session
                    .postback(PayloadKind::Refresh, &selection)
                    .await?;
                self.state = ConversationState::SubRegionRendered;
                Ok(None)
            }
            ConversationState::SubRegionRendered => self.fetch_month(1).await.map(Some),
            ConversationState::MonthIterating(m) => self.fetch_month(m + 1).await.map(Some),
            ConversationState::Done => Err(ScrapeError::Sequence(format!(
                "conversation for {} is already done",
                self.unit()
            ))),
        }
    }

    async fn fetch_month(&mut self, month: u32) -> ScrapeResult<MonthPage> {
        let selection = self.selection().month(month);
        let html = self
            .session
            .postback(PayloadKind::MonthSelect, &selection)
            .await?;

        self.state = if month >= self.month_until {
            ConversationState::Done
        } else {
            ConversationState::MonthIterating(month)
        };

        Ok(MonthPage { month, html })
    }

    /// Drive the conversation to `Done`, writing every month's rows to `sink`.
    ///
    /// Errors are tagged with the unit, and with the month once months are
    /// being fetched.
    pub async fn run<S: RowSink + ?Sized>(
        mut self,
        layout: &TableLayout,
        sink: &mut S,
    ) -> ScrapeResult<UnitReport> {
        let mut report = UnitReport::default();

        while self.state != ConversationState::Done {
            let next_month = match self.state {
                ConversationState::SubRegionRendered => Some(1),
                ConversationState::MonthIterating(m) => Some(m + 1),
                _ => None,
            };
            let unit = match next_month {
                Some(m) => self.unit().with_month(m),
                None => self.unit(),
            };

            let Some(page) = self.advance().await.map_err(|e| e.in_unit(unit.clone()))? else {
                continue;
            };

            let counts = extract_counts(&page.html, layout).map_err(|e| e.in_unit(unit.clone()))?;
            report.months_extracted += 1;

            for count in counts {
                sink.write_row(&DataRow::new(self.entry, self.year, page.month, count))
                    .map_err(|e| e.in_unit(unit.clone()))?;
                report.rows_written += 1;
            }
        }

        report.round_trips = self.session.round_trips();
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::payload::{MONTH_FIELD, REGION_FIELD, SOURCE_FIELD, SUB_REGION_FIELD, VIEW_STATE_FIELD};
    use crate::types::ErrorKind;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    #[derive(Debug, Clone)]
    enum Sent {
        Get,
        Post(Vec<(String, String)>),
    }

    impl Sent {
        fn field(&self, name: &str) -> Option<String> {
            match self {
                Sent::Get => None,
                Sent::Post(fields) => fields.iter().find(|(k, _)| k == name).map(|(_, v)| v.clone()),
            }
        }
    }

    /// Answers each request with the next scripted page and records what was sent.
    struct ScriptedTransport {
        pages: Mutex<VecDeque<String>>,
        sent: Mutex<Vec<Sent>>,
    }

    impl ScriptedTransport {
        fn new(pages: Vec<String>) -> Self {
            Self {
                pages: Mutex::new(pages.into()),
                sent: Mutex::new(Vec::new()),
            }
        }

        fn next(&self) -> ScrapeResult<String> {
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| ScrapeError::Sequence("script exhausted".into()))
        }

        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, _url: &str) -> ScrapeResult<String> {
            self.sent.lock().unwrap().push(Sent::Get);
            self.next()
        }

        async fn post_form(&self, _url: &str, fields: &[(&'static str, String)]) -> ScrapeResult<String> {
            let owned = fields.iter().map(|(k, v)| (k.to_string(), v.clone())).collect();
            self.sent.lock().unwrap().push(Sent::Post(owned));
            self.next()
        }
    }

    fn page(token: &str, rows: &str) -> String {
        format!(
            r#"<html><body><form id="masterLayout_formlogin">
            <table><tbody id="groupingTable_data">{rows}</tbody></table>
            <input type="hidden" name="javax.faces.ViewState" id="j_id1:javax.faces.ViewState:0" value="{token}" />
            </form></body></html>"#
        )
    }

    fn data_row(category: &str, ev: u64) -> String {
        let mut cells = vec!["1".to_string(), category.to_string()];
        cells.extend((2..9).map(|_| "0".to_string()));
        cells.push(ev.to_string());
        format!(
            "<tr>{}</tr>",
            cells.iter().map(|c| format!("<td>{c}</td>")).collect::<String>()
        )
    }

    const EMPTY: &str = "<tr><td colspan=\"10\">No records found.</td></tr>";

    fn script(months: u32) -> Vec<String> {
        (0..4 + months)
            .map(|i| page(&format!("tok-{i}"), EMPTY))
            .collect()
    }

    fn delhi() -> RegionEntry {
        RegionEntry::new("Delhi", "North RTO", "DL", "05")
    }

    #[tokio::test]
    async fn test_token_propagates_to_next_request() {
        let transport = ScriptedTransport::new(script(3));
        let entry = delhi();
        let conv = Conversation::new(&transport, "http://dash", &entry, 2022, 3).unwrap();
        let mut sink: Vec<DataRow> = Vec::new();
        conv.run(&TableLayout::default(), &mut sink).await.unwrap();

        let sent = transport.sent();
        assert_eq!(sent.len(), 7);
        for (i, request) in sent.iter().enumerate().skip(1) {
            assert_eq!(
                request.field(VIEW_STATE_FIELD),
                Some(format!("tok-{}", i - 1)),
                "request {i} must carry the token from response {}",
                i - 1
            );
        }
    }

    #[tokio::test]
    async fn test_request_order_and_month_codes() {
        let transport = ScriptedTransport::new(script(3));
        let entry = delhi();
        let conv = Conversation::new(&transport, "http://dash", &entry, 2022, 3).unwrap();
        let mut sink: Vec<DataRow> = Vec::new();
        conv.run(&TableLayout::default(), &mut sink).await.unwrap();

        let sent = transport.sent();
        assert!(matches!(sent[0], Sent::Get));

        let sources: Vec<_> = sent[1..].iter().map(|s| s.field(SOURCE_FIELD).unwrap()).collect();
        assert_eq!(
            sources,
            vec![
                "j_idt63",
                "j_idt33",
                "j_idt63",
                "groupingTable:selectMonth",
                "groupingTable:selectMonth",
                "groupingTable:selectMonth",
            ]
        );

        // Year refresh knows nothing about the region yet.
        assert_eq!(sent[1].field(REGION_FIELD).as_deref(), Some("-1"));
        assert_eq!(sent[1].field(MONTH_FIELD).as_deref(), Some("2022"));
        // Region select leaves the sub-region on "all".
        assert_eq!(sent[2].field(REGION_FIELD).as_deref(), Some("DL"));
        assert_eq!(sent[2].field(SUB_REGION_FIELD).as_deref(), Some("-1"));
        // Sub-region refresh carries both codes.
        assert_eq!(sent[3].field(SUB_REGION_FIELD).as_deref(), Some("05"));

        let months: Vec<_> = sent[4..].iter().map(|s| s.field(MONTH_FIELD).unwrap()).collect();
        assert_eq!(months, vec!["202201", "202202", "202203"]);
    }

    #[tokio::test]
    async fn test_state_transitions() {
        let transport = ScriptedTransport::new(script(2));
        let entry = delhi();
        let mut conv = Conversation::new(&transport, "http://dash", &entry, 2022, 2).unwrap();

        assert_eq!(conv.state(), ConversationState::Init);
        assert!(conv.advance().await.unwrap().is_none());
        assert_eq!(conv.state(), ConversationState::YearSet);
        assert!(conv.advance().await.unwrap().is_none());
        assert_eq!(conv.state(), ConversationState::RegionSelected);
        assert!(conv.advance().await.unwrap().is_none());
        assert_eq!(conv.state(), ConversationState::SubRegionRendered);

        let first = conv.advance().await.unwrap().unwrap();
        assert_eq!(first.month, 1);
        assert_eq!(conv.state(), ConversationState::MonthIterating(1));

        let second = conv.advance().await.unwrap().unwrap();
        assert_eq!(second.month, 2);
        assert_eq!(conv.state(), ConversationState::Done);

        let err = conv.advance().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sequence);
        assert_eq!(conv.session().round_trips(), 6);
    }

    #[tokio::test]
    async fn test_rows_written_per_month() {
        let mut pages = script(2);
        pages[4] = page("tok-4", &[data_row("MOTOR CAR", 7), data_row("BUS", 2)].concat());
        let transport = ScriptedTransport::new(pages);
        let entry = delhi();
        let conv = Conversation::new(&transport, "http://dash", &entry, 2022, 2).unwrap();

        let mut sink: Vec<DataRow> = Vec::new();
        let report = conv.run(&TableLayout::default(), &mut sink).await.unwrap();

        assert_eq!(report.months_extracted, 2);
        assert_eq!(report.rows_written, 2);
        assert_eq!(report.round_trips, 6);
        assert_eq!(sink[0].category, "MOTOR CAR");
        assert_eq!(sink[0].month, 1);
        assert_eq!(sink[1].electric_vehicle_count, 2);
        assert_eq!(sink[1].region, "Delhi");
    }

    #[tokio::test]
    async fn test_missing_token_aborts_with_unit() {
        let mut pages = script(2);
        pages[2] = "<html><body>Session expired</body></html>".to_string();
        let transport = ScriptedTransport::new(pages);
        let entry = delhi();
        let conv = Conversation::new(&transport, "http://dash", &entry, 2022, 2).unwrap();

        let mut sink: Vec<DataRow> = Vec::new();
        let err = conv.run(&TableLayout::default(), &mut sink).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ProtocolFormat);
        assert_eq!(err.unit().map(|u| u.year), Some(2022));
        assert_eq!(transport.sent().len(), 3);
    }

    #[tokio::test]
    async fn test_malformed_table_emits_nothing_for_that_month() {
        let mut pages = script(2);
        pages[4] = page("tok-4", &data_row("MOTOR CAR", 3));
        pages[5] = page("tok-5", &[data_row("BUS", 1), "<tr><td>1</td><td>x</td></tr>".to_string()].concat());
        let transport = ScriptedTransport::new(pages);
        let entry = delhi();
        let conv = Conversation::new(&transport, "http://dash", &entry, 2022, 2).unwrap();

        let mut sink: Vec<DataRow> = Vec::new();
        let err = conv.run(&TableLayout::default(), &mut sink).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::TableFormat);
        assert_eq!(err.unit().and_then(|u| u.month), Some(2));
        assert_eq!(sink.len(), 1);
        assert_eq!(sink[0].month, 1);
    }

    #[tokio::test]
    async fn test_postback_before_open_is_rejected() {
        let transport = ScriptedTransport::new(vec![]);
        let mut session = SessionState::new(&transport, "http://dash");
        let err = session
            .postback(PayloadKind::Refresh, &Selection::year(2022))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Sequence);
        assert!(transport.sent().is_empty());
    }

    #[test]
    fn test_month_until_bounds() {
        let transport = ScriptedTransport::new(vec![]);
        let entry = delhi();
        assert!(Conversation::new(&transport, "http://dash", &entry, 2022, 0).is_err());
        assert!(Conversation::new(&transport, "http://dash", &entry, 2022, 13).is_err());
        assert!(Conversation::new(&transport, "http://dash", &entry, 2022, 12).is_ok());
    }
}
