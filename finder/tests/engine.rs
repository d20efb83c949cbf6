use finder::list::ListFilter;
use finder::model::{LatLon, Value};
use finder::selection::{DetailResponse, LoadState};
use finder::status::Status;
use finder::viewport::{Bounds, NoPadding};
use finder::{DetailOutcome, Finder, FinderConfig, FinderError};

const PAYLOAD: &str = r#"{
    "attributes": [null,
        {"name": "title", "type": "str"},
        {"name": "location", "type": "geopt"},
        {"name": "services", "type": "multi", "values": ["X", "Y"]},
        {"name": "total_beds", "type": "int"},
        {"name": "available_beds", "type": "int"},
        {"name": "alert_status", "type": "text"}
    ],
    "facility_types": [null, {"name": "hospital", "attribute_names": ["title", "location", "services"]}],
    "facilities": [null,
        {"name": "a", "type": 1, "values": [null, "Alpha", {"lat": 18.5, "lon": -72.3}, ["X"], 10, 4, null]},
        {"name": "b", "type": 1, "values": [null, "Beta", {"lat": 19.0, "lon": -72.0}, ["Y"], 5, 1, "fire"]},
        {"name": "c", "type": 1, "values": [null, "Gamma", null, ["Y"], null, null, null]}
    ],
    "timestamp": 1000
}"#;

fn loaded() -> Finder {
    let mut f = Finder::new(FinderConfig::default()).with_padding(NoPadding);
    f.load_data_json(PAYLOAD, None).expect("payload");
    f
}

fn response(values: &str) -> DetailResponse {
    DetailResponse::from_json(&format!(
        r#"{{"json": {{"values": {}}}, "html": "<div>detail</div>", "login_url": "/login"}}"#,
        values
    ))
    .expect("detail body")
}

#[test]
fn filter_keeps_views_consistent() {
    let mut f = loaded();
    let refresh = f.select_filter_by_name(Some("services"), Some("X".into())).unwrap();

    assert_eq!(f.markers().visible(&f.view_state().statuses), vec![1]);
    assert_eq!(refresh.list.visible_count, 1);
    assert_eq!(refresh.list.visible_rows().map(|r| r.facility).collect::<Vec<_>>(), vec![1]);
    assert_eq!(refresh.divisions.len(), 1);
    assert_eq!(refresh.divisions[0].all, 3);
    assert_eq!(refresh.divisions[0].count(Status::Visible), 1);
    assert_eq!(refresh.divisions[0].count(Status::ExcludedByFilter), 2);
    assert_eq!(refresh.cluster.unwrap().markers, vec![1]);
}

#[test]
fn clearing_the_filter_restores_everything() {
    let mut f = loaded();
    f.select_filter_by_name(Some("services"), Some("X".into())).unwrap();
    let refresh = f.select_filter_by_name(None, None).unwrap();
    assert_eq!(refresh.list.visible_count, 3);
    assert_eq!(refresh.cluster.unwrap().markers, vec![1, 2]);
}

#[test]
fn load_fits_bounds_and_remembers_selection() {
    let mut f = Finder::new(FinderConfig::default());
    let refresh = f.load_data_json(PAYLOAD, Some("b")).unwrap();
    assert_eq!(refresh.pending_selection, Some(2));
    let b = refresh.fit_bounds.expect("bounds");
    assert!(b.contains(LatLon::new(18.5, -72.3)));
    assert!(b.contains(LatLon::new(19.0, -72.0)));
    assert!(refresh.list.rows[1].class.contains("selected"));
    assert!(refresh.list.rows[1].class.contains("on-alert"));
}

#[test]
fn malformed_payload_is_an_error() {
    let mut f = Finder::new(FinderConfig::default());
    assert!(matches!(f.load_data_json("{", None), Err(FinderError::Payload(_))));
}

#[test]
fn viewport_updates_are_debounced() {
    let mut f = loaded();
    f.set_viewport_filter(true);
    f.set_viewport(Bounds::new(18.0, -73.0, 18.8, -72.1), 8);
    let first = f.viewport_changed(0.0).expect("first update runs at once");
    assert_eq!(first.list.visible_count, 2);
    assert_eq!(f.status(2), Some(Status::ExcludedByViewport));
    // Unlocated facilities are never excluded by the viewport.
    assert_eq!(f.status(3), Some(Status::Visible));

    f.set_viewport(Bounds::new(18.0, -73.0, 19.5, -71.0), 8);
    assert!(f.viewport_changed(100.0).is_none());
    assert!(f.viewport_changed(200.0).is_none());
    assert!(f.poll(400.0).is_none());
    let later = f.poll(450.0).expect("coalesced update");
    assert_eq!(later.list.visible_count, 3);
    assert!(later.cluster.is_none());
    assert!(f.poll(1000.0).is_none());
}

#[test]
fn list_filter_and_divisions() {
    let mut f = loaded();
    f.select_filter_by_name(Some("services"), Some("Y".into())).unwrap();
    let all = f.set_list_filter(ListFilter::All);
    assert_eq!(all.visible_count, 3);
    let excluded = f.set_list_filter(ListFilter::Only(Status::ExcludedByFilter));
    assert_eq!(excluded.visible_rows().map(|r| r.facility).collect::<Vec<_>>(), vec![1]);
    assert!(f.select_division(Some(0)).is_ok());
    assert!(matches!(f.select_division(Some(4)), Err(FinderError::InvalidState(_))));
}

#[test]
fn detail_load_opens_popup() {
    let mut f = loaded();
    let selected = f.select_facility(1).unwrap();
    assert!(selected.list.rows[0].class.contains("selected"));
    let req = selected.request.expect("request");
    assert_eq!(req.url, "/bubble?facility_name=a");
    assert!(!req.force_edit && !req.force_login);
    assert_eq!(selected.status_message.as_deref(), Some("Loading..."));

    let outcome = f.finish_detail(
        req.ticket,
        Ok(response(r#"[null, "Alpha 2", {"lat": 18.6, "lon": -72.3}, ["X"], 10, 4, null]"#)),
    );
    match outcome {
        DetailOutcome::Loaded { popup, status_message, row, .. } => {
            assert_eq!(popup.unwrap().html, "<div>detail</div>");
            assert!(status_message.is_none());
            assert_eq!(row.title, "Alpha 2");
        }
        other => panic!("unexpected outcome {:?}", other),
    }
    assert_eq!(f.markers().get(1).unwrap().position, LatLon::new(18.6, -72.3));
    assert_eq!(f.view_state().loader.state(), &LoadState::Loaded { facility: 1 });
}

#[test]
fn superseded_detail_is_dropped() {
    let mut f = loaded();
    let first = f.select_facility(1).unwrap().request.unwrap();
    let second = f.select_facility(2).unwrap().request.unwrap();

    let late = f.finish_detail(first.ticket, Ok(response(r#"[null, "Stale"]"#)));
    assert_eq!(late, DetailOutcome::Stale);
    assert_eq!(f.dataset().title(1), "Alpha");

    let failed = f.finish_detail(second.ticket, Err(FinderError::NetworkTimeout(10000)));
    assert!(matches!(failed, DetailOutcome::Failed { .. }));
}

#[test]
fn double_click_does_not_refetch() {
    let mut f = loaded();
    assert!(f.select_facility(1).unwrap().request.is_some());
    let again = f.select_facility(1).unwrap();
    assert!(again.request.is_none());
    assert!(again.status_message.is_none());
}

#[test]
fn double_click_keeps_open_editor() {
    let mut f = loaded();
    f.select_facility(1).unwrap();
    assert!(f.start_edit("/edit?facility_name=a"));
    assert!(f.select_facility(1).unwrap().request.is_none());
    assert!(f.edit_session().is_open());
    assert!(f.view_state().loader.is_loading());
}

#[test]
fn reload_invalidates_in_flight_detail() {
    let mut f = loaded();
    let old = f.select_facility(2).unwrap().request.unwrap();
    f.load_data_json(PAYLOAD, None).unwrap();
    let new = f.select_facility(2).unwrap().request.unwrap();
    assert_ne!(old.ticket, new.ticket);

    let late = f.finish_detail(old.ticket, Ok(response(r#"[null, "Stale"]"#)));
    assert_eq!(late, DetailOutcome::Stale);
    assert_eq!(f.dataset().title(2), "Beta");
    assert!(f.view_state().loader.is_current(new.ticket));
}

#[test]
fn unlocated_facility_prompts_for_location() {
    let mut f = loaded();
    let req = f.select_facility(3).unwrap().request.unwrap();
    assert!(req.force_login);
    let outcome = f.finish_detail(req.ticket, Ok(response(r#"[null, "Gamma", null, ["Y"], null, null, null]"#)));
    match outcome {
        DetailOutcome::Loaded { popup, status_message, .. } => {
            assert!(popup.is_none());
            let msg = status_message.unwrap();
            assert!(msg.contains("No location"));
            assert!(msg.contains("href=\"/login\""));
        }
        other => panic!("unexpected outcome {:?}", other),
    }
}

#[test]
fn logged_in_unlocated_facility_opens_editor() {
    let config = FinderConfig { logged_in: true, ..FinderConfig::default() };
    let mut f = Finder::new(config);
    f.load_data_json(PAYLOAD, None).unwrap();
    let req = f.select_facility(3).unwrap().request.unwrap();
    assert!(req.force_edit);
    assert_eq!(req.edit_url.as_deref(), Some("/edit?facility_name=c"));
    assert!(f.edit_session().is_open());
}

#[test]
fn detail_that_adds_location_adds_marker() {
    let mut f = loaded();
    let req = f.select_facility(3).unwrap().request.unwrap();
    let outcome = f.finish_detail(
        req.ticket,
        Ok(response(r#"[null, "Gamma", {"lat": 18.0, "lon": -72.0}, ["Y"], null, null, null]"#)),
    );
    assert!(matches!(outcome, DetailOutcome::Loaded { popup: Some(_), .. }));
    assert!(f.markers().get(3).is_some());
    assert!(f.markers().is_clustered(3));
}

#[test]
fn pushed_attribute_updates_views() {
    let mut f = loaded();
    f.select_filter_by_name(Some("services"), Some("X".into())).unwrap();
    let refresh = f
        .set_facility_attribute("b", "services", Some(Value::List(vec!["X".into(), "Y".into()])))
        .unwrap();
    assert_eq!(refresh.list.visible_count, 2);
    assert_eq!(refresh.divisions[0].count(Status::Visible), 2);
    assert!(matches!(
        f.set_facility_attribute("zz", "services", None),
        Err(FinderError::UnknownFacility(_))
    ));
    assert!(matches!(
        f.set_facility_attribute("b", "nope", None),
        Err(FinderError::UnknownAttribute(_))
    ));
}

#[test]
fn print_mode_caps_visible_facilities() {
    let config = FinderConfig { print: true, max_markers_to_print: 1, ..FinderConfig::default() };
    let mut f = Finder::new(config);
    let refresh = f.load_data_json(PAYLOAD, None).unwrap();
    assert_eq!(refresh.list.visible_count, 1);
    assert_eq!(refresh.cluster.unwrap().markers, vec![1]);
    assert_eq!(f.print_rows().len(), 1);
}

#[test]
fn add_new_flow() {
    let mut f = loaded();
    assert_eq!(f.start_add_new(), finder::AddNewStart::LoginRequired);

    let config = FinderConfig { logged_in: true, ..FinderConfig::default() };
    let mut f = Finder::new(config);
    f.load_data_json(PAYLOAD, None).unwrap();
    assert!(matches!(f.start_add_new(), finder::AddNewStart::AwaitingClick { .. }));
    let (fields, url) = f.place_new_facility(LatLon::new(1.5, 2.5)).unwrap();
    assert_eq!(fields[0], ("location.lat".to_string(), "1.5".to_string()));
    assert_eq!(url, "/edit?add_new=yes&facility_type=hospital");
    let moved = f.drag_new_facility(LatLon::new(3.0, 4.0)).unwrap();
    assert_eq!(moved[1].1, "4");
    let effects = f.cancel_edit();
    assert!(effects.remove_marker);
    assert!(!f.edit_session().is_open());
}
