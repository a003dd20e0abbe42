use crate::db::customers::{create_customer, NewCustomer};
use crate::db::scans::{insert_scan, NewScan};
use crate::errors::ServerError;
use crate::router::{handle, handle_at};
use crate::tests::utils::{
    body_bytes, body_json, expect_err, get, init_test_db, post_json, signed_in_consultant,
};
use chrono::{DateTime, Local, Utc};
use serde_json::{json, Value};

fn scan_ids(list: &Value) -> Vec<String> {
    list.as_array()
        .expect("expected a JSON array")
        .iter()
        .map(|s| s["id"].as_str().unwrap().to_string())
        .collect()
}

#[test]
fn first_scan_registers_customer_and_shows_in_todays_activity() {
    let db = init_test_db();
    let (consultant, token) = signed_in_consultant(&db, "Dana");

    let resp = handle(
        post_json(
            "/scans",
            &token,
            &json!({
                "customer": {"name": "Alice Moreno", "phone": "5551234"},
                "interest_status": "Hot",
                "interested_in": "Buying",
            }),
        ),
        &db,
    )
    .expect("scan failed");
    assert_eq!(resp.status(), 201);
    let created = body_json(resp);
    let scan_id = created["id"].as_str().unwrap().to_string();

    let list = body_json(handle(get("/scans", &token), &db).unwrap());

    assert_eq!(scan_ids(&list), vec![scan_id]);
    let row = &list[0];
    assert_eq!(row["customer"]["name"], "Alice Moreno");
    assert_eq!(row["customer"]["scan_count"], 1);
    assert_eq!(row["assigned_consultant"]["id"], consultant.as_str());
    assert_eq!(row["assigned_consultant"]["name"], "Dana");
    assert_eq!(row["interest_status"], "Hot");
}

#[test]
fn scan_for_unknown_customer_is_not_found() {
    let db = init_test_db();
    let (_, token) = signed_in_consultant(&db, "Dana");

    let err = expect_err(handle(
        post_json("/scans", &token, &json!({"customer_id": "ghost"})),
        &db,
    ));
    assert!(matches!(err, ServerError::NotFound));
}

#[test]
fn scan_needs_a_customer_and_a_known_consultant() {
    let db = init_test_db();
    let (_, token) = signed_in_consultant(&db, "Dana");

    let err = expect_err(handle(post_json("/scans", &token, &json!({})), &db));
    assert!(matches!(err, ServerError::BadRequest(_)));

    let err = expect_err(handle(
        post_json(
            "/scans",
            &token,
            &json!({"customer": {"name": "Bob"}, "consultant_id": "nobody"}),
        ),
        &db,
    ));
    assert!(matches!(err, ServerError::BadRequest(_)));
}

#[test]
fn invalid_json_is_a_bad_request() {
    let db = init_test_db();
    let (_, token) = signed_in_consultant(&db, "Dana");

    let req = http::Request::builder()
        .method(http::Method::POST)
        .uri("/scans")
        .header("Authorization", format!("Bearer {token}"))
        .body(astra::Body::from("{not json".to_string()))
        .unwrap();

    assert!(matches!(
        expect_err(handle(req, &db)),
        ServerError::BadRequest(_)
    ));
}

#[test]
fn activity_filters_by_date_search_and_category() {
    let db = init_test_db();
    let (consultant, token) = signed_in_consultant(&db, "Dana");

    let at = |s: &str| s.parse::<DateTime<Utc>>().unwrap().timestamp_millis();

    let (alice_scan, bob_scan) = db
        .with_conn(|conn| {
            let alice = create_customer(
                conn,
                &NewCustomer {
                    name: Some("Alice".into()),
                    phone: Some("5551234".into()),
                    email: None,
                },
                0,
            )?;
            let bob = create_customer(
                conn,
                &NewCustomer {
                    name: Some("Bob".into()),
                    phone: Some("4440000".into()),
                    email: None,
                },
                0,
            )?;
            let scan = |customer: &str, status: &str| NewScan {
                customer_id: customer.to_string(),
                consultant_id: Some(consultant.clone()),
                interest_status: status.parse().ok(),
                interested_in: None,
                follow_up_date: None,
            };
            let a = insert_scan(conn, &scan(alice.as_str(), "Warm"), at("2024-03-05T10:00:00Z"))?;
            let b = insert_scan(conn, &scan(bob.as_str(), "Cold"), at("2024-03-06T10:00:00Z"))?;
            insert_scan(conn, &scan(bob.as_str(), "Hot"), at("2024-04-01T10:00:00Z"))?;
            Ok((a, b))
        })
        .unwrap();

    let march = "/scans?from=2024-03-01&to=2024-03-31";

    let all_march = body_json(handle(get(march, &token), &db).unwrap());
    assert_eq!(scan_ids(&all_march), vec![bob_scan.clone(), alice_scan.clone()]);

    let by_phone = body_json(handle(get(&format!("{march}&q=555"), &token), &db).unwrap());
    assert_eq!(scan_ids(&by_phone), vec![alice_scan.clone()]);

    let by_status =
        body_json(handle(get(&format!("{march}&status=cold,hot"), &token), &db).unwrap());
    assert_eq!(scan_ids(&by_status), vec![bob_scan]);

    let oldest_first =
        body_json(handle(get(&format!("{march}&sort=date-asc"), &token), &db).unwrap());
    assert_eq!(scan_ids(&oldest_first)[0], alice_scan);
}

#[test]
fn activity_without_dates_only_shows_today() {
    let db = init_test_db();
    let (consultant, token) = signed_in_consultant(&db, "Dana");

    let now: DateTime<Local> = "2024-03-06T15:00:00Z"
        .parse::<DateTime<Utc>>()
        .unwrap()
        .with_timezone(&Local);
    let today_ms = now.timestamp_millis();
    let last_week_ms = today_ms - 7 * 24 * 60 * 60 * 1000;

    let today_scan = db
        .with_conn(|conn| {
            let customer = create_customer(conn, &NewCustomer::default(), 0)?;
            let scan = NewScan {
                customer_id: customer,
                consultant_id: Some(consultant.clone()),
                interest_status: None,
                interested_in: None,
                follow_up_date: None,
            };
            insert_scan(conn, &scan, last_week_ms)?;
            insert_scan(conn, &scan, today_ms)
        })
        .unwrap();

    let list = body_json(handle_at(get("/scans", &token), &db, now).unwrap());
    assert_eq!(scan_ids(&list), vec![today_scan]);
}

#[test]
fn mine_only_returns_callers_scans() {
    let db = init_test_db();
    let (_, dana) = signed_in_consultant(&db, "Dana");
    let (_, robin) = signed_in_consultant(&db, "Robin");

    for token in [&dana, &robin] {
        handle(
            post_json("/scans", token, &json!({"customer": {"name": "Walk-in"}})),
            &db,
        )
        .unwrap();
    }

    let everyone = body_json(handle(get("/scans", &dana), &db).unwrap());
    let mine = body_json(handle(get("/scans?mine=1", &dana), &db).unwrap());

    assert_eq!(everyone.as_array().unwrap().len(), 2);
    assert_eq!(mine.as_array().unwrap().len(), 1);
    assert_eq!(mine[0]["assigned_consultant"]["name"], "Dana");
}

#[test]
fn bad_activity_params_are_rejected() {
    let db = init_test_db();
    let (_, token) = signed_in_consultant(&db, "Dana");

    let err = expect_err(handle(get("/scans?sort=sideways", &token), &db));
    assert!(matches!(err, ServerError::BadRequest(_)));
}

#[test]
fn status_edit_updates_only_given_fields() {
    let db = init_test_db();
    let (_, token) = signed_in_consultant(&db, "Dana");

    let created = body_json(
        handle(
            post_json(
                "/scans",
                &token,
                &json!({"customer": {"name": "Cleo"}, "interest_status": "Warm", "interested_in": "Selling"}),
            ),
            &db,
        )
        .unwrap(),
    );
    let scan_id = created["id"].as_str().unwrap();

    let resp = handle(
        post_json(
            &format!("/scans/{scan_id}/status"),
            &token,
            &json!({"interest_status": "Bought"}),
        ),
        &db,
    )
    .unwrap();
    let updated = body_json(resp);

    assert_eq!(updated["interest_status"], "Bought");
    assert_eq!(updated["interested_in"], "Selling");

    let err = expect_err(handle(
        post_json("/scans/missing/status", &token, &json!({"interest_status": "Hot"})),
        &db,
    ));
    assert!(matches!(err, ServerError::NotFound));

    let err = expect_err(handle(
        post_json(&format!("/scans/{scan_id}/status"), &token, &json!({})),
        &db,
    ));
    assert!(matches!(err, ServerError::BadRequest(_)));
}

#[test]
fn export_returns_a_workbook() {
    let db = init_test_db();
    let (_, token) = signed_in_consultant(&db, "Dana");
    handle(
        post_json("/scans", &token, &json!({"customer": {"name": "Dee"}})),
        &db,
    )
    .unwrap();

    let resp = handle(get("/scans/export.xlsx", &token), &db).unwrap();

    assert_eq!(resp.status(), 200);
    assert_eq!(
        resp.headers().get("Content-Type").unwrap(),
        "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet"
    );
    let disposition = resp
        .headers()
        .get("Content-Disposition")
        .unwrap()
        .to_str()
        .unwrap()
        .to_string();
    assert!(disposition.starts_with("attachment; filename=\"activity_"));
    assert_eq!(&body_bytes(resp)[..2], b"PK");
}

#[test]
fn analytics_summarizes_todays_scans() {
    let db = init_test_db();
    let (consultant, token) = signed_in_consultant(&db, "Dana");

    for status in ["Hot", "Hot", "Cold"] {
        handle(
            post_json(
                "/scans",
                &token,
                &json!({"customer": {"name": "Eve"}, "interest_status": status}),
            ),
            &db,
        )
        .unwrap();
    }

    let summary = body_json(handle(get("/analytics", &token), &db).unwrap());

    assert_eq!(summary["total_scans"], 3);
    assert_eq!(summary["unique_customers"], 3);
    assert_eq!(summary["by_interest_status"]["Hot"], 2);
    assert_eq!(summary["by_interest_status"]["Cold"], 1);
    assert_eq!(summary["by_consultant"][0]["consultant_id"], consultant.as_str());
    assert_eq!(summary["by_consultant"][0]["scans"], 3);
}
