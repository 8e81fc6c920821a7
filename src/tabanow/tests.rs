use super::extract::PlanPageParser;
use super::merge::{dedupe_plans, merge_plan, sanitize_plan};
use super::search::{SearchQuery, absolute_url, build_search_url};
use super::text::{
    normalize_numeric_token, normalize_plan_code, normalize_whitespace, token_matches_helka,
};
use super::types::{ParcelRow, PlanDetail, SearchRow, positive_or_default};
use super::*;
use crate::model::PlanRecord;

const BASE: &str = "https://www.tabanow.co.il";

fn parser() -> PlanPageParser {
    PlanPageParser::new().expect("patterns compile")
}

fn plan(code: &str, description: &str) -> PlanRecord {
    PlanRecord {
        taba_code: code.to_string(),
        taba_description: description.to_string(),
        ..PlanRecord::default()
    }
}

#[test]
fn normalize_whitespace_collapses_and_trims() {
    assert_eq!(normalize_whitespace("  תכנית \n\t 507  "), "תכנית 507");
    assert_eq!(normalize_whitespace("\u{a0}a\u{a0}\u{a0}b"), "a b");
    assert_eq!(normalize_whitespace("   "), "");
}

#[test]
fn normalize_plan_code_ignores_case_and_whitespace() {
    assert_eq!(normalize_plan_code("ab 12"), normalize_plan_code("AB12"));
    assert_eq!(normalize_plan_code(" 507 - 0123456 "), "507-0123456");

    for sample in ["tmm 3/1", "  תמא 38 ", "Aa\tbB"] {
        let once = normalize_plan_code(sample);
        assert_eq!(normalize_plan_code(&once), once);
    }
}

#[test]
fn normalize_numeric_token_strips_leading_zeros_only_for_digits() {
    assert_eq!(normalize_numeric_token("0035"), "35");
    assert_eq!(normalize_numeric_token(" 000 "), "0");
    assert_eq!(normalize_numeric_token("ח-12"), "ח-12");
    assert_eq!(normalize_numeric_token(" 12א "), "12א");
    assert_eq!(normalize_numeric_token(""), "");
}

#[test]
fn token_matches_helka_handles_singles_and_ranges() {
    assert!(token_matches_helka("12-18", "15"));
    assert!(!token_matches_helka("12-18", "20"));
    assert!(token_matches_helka("18-12", "12"));
    assert!(token_matches_helka("12 - 18", "018"));
    assert!(token_matches_helka("7", "7"));
    assert!(token_matches_helka("007", "7"));
    assert!(!token_matches_helka("a-b", "5"));
    assert!(!token_matches_helka("1-5", "x"));
    assert!(!token_matches_helka("8", "7"));
}

#[test]
fn positive_or_default_applies_defaults_and_ceilings() {
    assert_eq!(positive_or_default(None, 8, 20), 8);
    assert_eq!(positive_or_default(Some("abc"), 8, 20), 8);
    assert_eq!(positive_or_default(Some("-3"), 8, 20), 8);
    assert_eq!(positive_or_default(Some("0"), 8, 20), 8);
    assert_eq!(positive_or_default(Some("5.9"), 8, 20), 5);
    assert_eq!(positive_or_default(Some("500"), 8, 20), 20);
}

#[test]
fn tabanow_config_from_raw_clamps_each_setting() {
    let config = TabanowConfig::from_raw(Some("http://localhost:9000/"), Some("50"), None, Some("90000"));
    assert_eq!(config.base_url, "http://localhost:9000");
    assert_eq!(config.max_block_pages, 20);
    assert_eq!(config.max_plan_details, 80);
    assert_eq!(config.request_timeout.as_millis(), 60_000);

    let defaults = TabanowConfig::from_raw(Some("  "), None, Some("x"), None);
    assert_eq!(defaults, TabanowConfig::default());
}

#[test]
fn build_search_url_never_encodes_first_page() {
    let first = build_search_url(BASE, SearchQuery::Block("6166"), 1).unwrap();
    assert_eq!(
        first,
        "https://www.tabanow.co.il/%D7%AA%D7%91%D7%A2/%D7%97%D7%99%D7%A4%D7%95%D7%A9?block=6166"
    );

    let third = build_search_url(BASE, SearchQuery::Block("6166"), 3).unwrap();
    assert!(third.ends_with("?block=6166&page=3"));

    let by_number = build_search_url(BASE, SearchQuery::Number("507-0123456"), 1).unwrap();
    assert!(by_number.ends_with("?number=507-0123456"));

    assert!(build_search_url("not a url", SearchQuery::Block("1"), 1).is_err());
}

#[test]
fn absolute_url_resolves_relative_links() {
    assert_eq!(absolute_url(BASE, "/plan/1"), "https://www.tabanow.co.il/plan/1");
    assert_eq!(
        absolute_url(BASE, "https://cdn.example.org/t.pdf"),
        "https://cdn.example.org/t.pdf"
    );
}

#[test]
fn decode_entities_handles_named_and_numeric_references() {
    let parser = parser();
    let html = parser.html();
    assert_eq!(html.decode_entities("a&nbsp;&amp;&quot;b&quot;"), "a &\"b\"");
    assert_eq!(html.decode_entities("&#1513;&#x5DC;"), "של");
    assert_eq!(html.decode_entities("&#39;&apos;&lt;&gt;"), "''<>");
    assert_eq!(html.decode_entities("&unknown; &#xFFFFFFFF;"), "&unknown; ");
}

#[test]
fn html_to_text_strips_tags_and_collapses_spaces() {
    let parser = parser();
    assert_eq!(
        parser.html().html_to_text("<b>עד</b>\n<i>12</i>&nbsp;קומות"),
        "עד 12 קומות"
    );
}

#[test]
fn scanner_returns_empty_results_on_malformed_markup() {
    let parser = parser();
    let html = parser.html();
    let broken = "<table><tbody><tr><td>unterminated";
    assert!(html.first_table_body(broken).is_none());
    assert!(html.rows("<tr><td>no close").is_empty());
    assert!(html.cells("").is_empty());
    assert!(html.first_link("<a>no href</a>").is_none());
    assert!(parser.search_rows(broken).is_empty());
    assert!(parser.parcel_rows(broken).is_empty());
}

#[test]
fn search_rows_parse_result_table() {
    let html = r#"
        <table><thead><tr><th>ישוב</th><th>מספר</th></tr></thead>
        <tbody>
          <tr>
            <td>תל אביב</td>
            <td><a href="/plan/507-0123456?x=1&amp;y=2">507-0123456</a></td>
            <td>מאושרת</td>
            <td>תוספת &quot;קומות&quot;</td>
            <td>רחוב הרצל</td>
          </tr>
          <tr><td>short</td><td>row</td></tr>
          <tr><td>x</td><td>no link</td><td>a</td><td>b</td><td>c</td></tr>
        </tbody></table>"#;

    let rows = parser().search_rows(html);
    assert_eq!(
        rows,
        vec![SearchRow {
            locality: "תל אביב".to_string(),
            plan_number: "507-0123456".to_string(),
            status: "מאושרת".to_string(),
            description: "תוספת \"קומות\"".to_string(),
            place: "רחוב הרצל".to_string(),
            href: "/plan/507-0123456?x=1&y=2".to_string(),
        }]
    );
}

#[test]
fn pagination_max_page_reads_highest_link() {
    let parser = parser();
    let html = r#"<a href="?block=1&amp;page=2">2</a><a href="/s?page=12&block=1">12</a><a href="?page=3">3</a>"#;
    assert_eq!(parser.pagination_max_page(html), 12);
    assert_eq!(parser.pagination_max_page("<p>no pages</p>"), 1);
}

#[test]
fn max_floors_prefers_largest_valid_candidate() {
    let parser = parser();
    assert_eq!(parser.max_floors("הבניין יכול להגיע עד 12 קומות"), Some(12));
    assert_eq!(parser.max_floors("מבנה בן 4 קומות ומרתף, ובחלק עד 9 קומות"), Some(9));
    assert_eq!(parser.max_floors("קומה אחת בלבד"), None);
    assert_eq!(parser.max_floors("אין כאן מידע"), None);
    assert_eq!(parser.max_floors("120 קומות"), None);
    assert_eq!(parser.max_floors("0 קומות"), None);
}

#[test]
fn lot_size_takes_largest_area_within_bounds() {
    let parser = parser();
    assert_eq!(
        parser.lot_size_sqm("שטח המגרש 450 מ\"ר, שטח התכנית 1,200 מ\"ר"),
        Some(1200.0)
    );
    assert_eq!(parser.lot_size_sqm("שטח 512.5 מ״ר"), Some(512.5));
    assert_eq!(parser.lot_size_sqm("שטח 2000000 מ\"ר"), None);
    assert_eq!(parser.lot_size_sqm("20 מרפסות"), None);
    assert_eq!(parser.lot_size_sqm("ללא שטח"), None);
}

#[test]
fn takanon_url_prefers_approved_documents() {
    let parser = parser();
    let html = r#"
        <a href="/docs/takanonim-h/old.pdf" title="תקנון">old</a>
        <a href="/docs/takanon/draft.pdf" title="תקנון לא מאושר">draft</a>
        <a href="/docs/takanon/final.pdf" title="תקנון התכנית">final</a>"#;
    assert_eq!(
        parser.takanon_url(html, BASE).as_deref(),
        Some("https://www.tabanow.co.il/docs/takanon/final.pdf")
    );

    let only_superseded = r#"<a title="תקנון" href="/docs/takanonim-h/old.pdf">old</a>"#;
    assert_eq!(
        parser.takanon_url(only_superseded, BASE).as_deref(),
        Some("https://www.tabanow.co.il/docs/takanonim-h/old.pdf")
    );

    assert_eq!(parser.takanon_url(r#"<a href="/other.pdf">x</a>"#, BASE), None);
}

#[test]
fn parcel_rows_follow_blocks_and_parcels_heading() {
    let html = r#"
        <h3>מסמכים</h3>
        <table><tr><td>1</td><td>99</td></tr></table>
        <h3 class="section">גושים וחלקות</h3>
        <table>
          <tr><th>גוש</th><th>חלקות</th></tr>
          <tr><td>06166</td><td><span>30-40</span>, <span class="cancelled">41</span>, <span>45</span></td></tr>
          <tr><td>6167</td><td>1, 2,3</td></tr>
          <tr><td>חלק</td><td>5</td></tr>
          <tr><td>6168</td><td><span class="cancelled">7</span></td></tr>
        </table>"#;

    let rows = parser().parcel_rows(html);
    assert_eq!(
        rows,
        vec![
            ParcelRow {
                gush: "6166".to_string(),
                helka_tokens: vec!["30-40".to_string(), "45".to_string()],
            },
            ParcelRow {
                gush: "6167".to_string(),
                helka_tokens: vec!["1".to_string(), "2".to_string(), "3".to_string()],
            },
            ParcelRow {
                gush: "6168".to_string(),
                helka_tokens: Vec::new(),
            },
        ]
    );
}

#[test]
fn parcel_rows_require_table_directly_under_heading() {
    let html = r#"<h3>גושים וחלקות</h3><p>אין נתונים</p><h3>אחר</h3><table><tr><td>1</td><td>2</td></tr></table>"#;
    assert!(parser().parcel_rows(html).is_empty());
}

#[test]
fn plan_contains_parcel_matches_block_and_token() {
    let detail = PlanDetail {
        parcel_rows: vec![
            ParcelRow {
                gush: "6166".to_string(),
                helka_tokens: vec!["30-40".to_string(), "52".to_string()],
            },
            ParcelRow {
                gush: "7000".to_string(),
                helka_tokens: vec!["35".to_string()],
            },
        ],
        ..PlanDetail::default()
    };

    assert!(plan_contains_parcel(&detail, "06166", "35"));
    assert!(plan_contains_parcel(&detail, "6166", "52"));
    assert!(!plan_contains_parcel(&detail, "6166", "41"));
    assert!(plan_contains_parcel(&detail, "7000", "35"));
    assert!(!plan_contains_parcel(&detail, "", "35"));
    assert!(!plan_contains_parcel(&detail, "6166", " "));
    assert!(!plan_contains_parcel(&PlanDetail::default(), "6166", "35"));
}

#[test]
fn merge_plan_keeps_base_where_incoming_is_empty() {
    let base = PlanRecord {
        taba_code: "5000".to_string(),
        plan_status: Some("מאושרת".to_string()),
        lot_size_sqm: Some(300.0),
        ..PlanRecord::default()
    };
    let incoming = PlanRecord {
        max_floors: Some(8),
        plan_status: Some(String::new()),
        lot_size_sqm: Some(0.0),
        source: Some("tabanow".to_string()),
        ..PlanRecord::default()
    };

    let merged = merge_plan(&base, &incoming);
    assert_eq!(merged.taba_code, "5000");
    assert_eq!(merged.max_floors, Some(8));
    assert_eq!(merged.plan_status.as_deref(), Some("מאושרת"));
    assert_eq!(merged.lot_size_sqm, Some(300.0));
    assert_eq!(merged.source.as_deref(), Some("tabanow"));

    let overriding = PlanRecord {
        taba_code: "5000א".to_string(),
        ..PlanRecord::default()
    };
    assert_eq!(merge_plan(&base, &overriding).taba_code, "5000א");
}

#[test]
fn dedupe_plans_folds_shared_keys_in_first_seen_order() {
    let mut second = plan("A", "y");
    second.max_floors = Some(3);

    let deduped = dedupe_plans(vec![
        plan("A", "x"),
        plan("", "תכנית ללא קוד"),
        plan("", ""),
        second,
        plan("a ", "z"),
    ]);

    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0].taba_code, "a ");
    assert_eq!(deduped[0].taba_description, "z");
    assert_eq!(deduped[0].max_floors, Some(3));
    assert_eq!(deduped[1].taba_description, "תכנית ללא קוד");
}

#[test]
fn merge_plan_lists_sanitizes_numeric_fields() {
    let mut scraper_plan = plan("507-1", "x");
    scraper_plan.max_floors = Some(0);
    scraper_plan.max_buildable_area_sqm = Some(-5.0);
    let mut html_plan = plan("507-1", "");
    html_plan.lot_size_sqm = Some(640.0);
    let mut tall = plan("507-2", "y");
    tall.max_floors = Some(95);

    let merged = merge_plan_lists(vec![scraper_plan, tall], vec![html_plan]);
    assert_eq!(merged.len(), 2);
    assert_eq!(merged[0].taba_description, "x");
    assert_eq!(merged[0].lot_size_sqm, Some(640.0));
    assert_eq!(merged[0].max_floors, None);
    assert_eq!(merged[0].max_buildable_area_sqm, None);
    assert_eq!(merged[1].max_floors, None);
    assert_eq!(sanitize_plan(plan("x", "")).lot_size_sqm, None);
}
