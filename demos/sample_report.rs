//! Print an analysis report for a small storefront event log

use journey_flux::{analyze_json_rows, AnalysisRequest};

fn main() {
    let rows = r#"[
        {"event_name": "page_view", "user_id": null, "client_id": "c1", "session_number": 1, "session_id": "s1", "session_campaign_id": null, "session_campaign_name": null, "session_source": "google", "session_medium": "cpc", "event_timestamp": 1705327200000000},
        {"event_name": "add_to_cart", "user_id": null, "client_id": "c1", "session_number": 1, "session_id": "s1", "session_campaign_id": null, "session_campaign_name": null, "session_source": "google", "session_medium": "cpc", "event_timestamp": 1705327230000000},
        {"event_name": "purchase", "user_id": "u1", "client_id": "c1", "session_number": 1, "session_id": "s1", "session_campaign_id": null, "session_campaign_name": null, "session_source": "google", "session_medium": "cpc", "event_timestamp": 1705327290000000},
        {"event_name": "page_view", "user_id": null, "client_id": "c2", "session_number": 1, "session_id": "s2", "session_campaign_id": "spring", "session_campaign_name": "Spring sale", "session_source": "newsletter", "session_medium": "email", "event_timestamp": 1705330800000000},
        {"event_name": "add_to_cart", "user_id": null, "client_id": "c2", "session_number": 1, "session_id": "s2", "session_campaign_id": "spring", "session_campaign_name": "Spring sale", "session_source": "newsletter", "session_medium": "email", "event_timestamp": 1705330845000000}
    ]"#;

    let request = r#"{
        "paths": {"path_length": 2},
        "funnel": {"steps": ["page_view", "add_to_cart", "purchase"]},
        "timing": {"start_event": "page_view", "end_event": "purchase", "segment_by": "source_medium"},
        "graph": {"min_occurrences": 1}
    }"#;

    let result = AnalysisRequest::from_json(request)
        .and_then(|request| analyze_json_rows(rows, &request))
        .and_then(|report| report.to_json_pretty());

    match result {
        Ok(json) => println!("{json}"),
        Err(e) => eprintln!("Error: {e}"),
    }
}
