use crate::db::customers::{create_customer, NewCustomer};
use crate::db::scans::{insert_scan, NewScan};
use crate::domain::InterestStatus;
use crate::errors::ServerError;
use crate::router::handle;
use crate::tests::utils::{
    body_json, expect_err, get, init_test_db, post_json, signed_in_consultant,
};
use serde_json::{json, Value};

fn new_customer(db: &crate::db::Database, name: &str) -> String {
    db.with_conn(|conn| {
        create_customer(
            conn,
            &NewCustomer {
                name: Some(name.to_string()),
                ..Default::default()
            },
            0,
        )
    })
    .unwrap()
}

fn scan_at(db: &crate::db::Database, customer: &str, consultant: Option<&str>, at: i64) {
    db.with_conn(|conn| {
        insert_scan(
            conn,
            &NewScan {
                customer_id: customer.to_string(),
                consultant_id: consultant.map(str::to_string),
                interest_status: Some(InterestStatus::Warm),
                interested_in: None,
                follow_up_date: None,
            },
            at,
        )
    })
    .unwrap();
}

fn history_pairs(history: &Value) -> Vec<(String, i64)> {
    history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| {
            let date: chrono::DateTime<chrono::Utc> =
                serde_json::from_value(e["date"].clone()).unwrap();
            (
                e["consultant_id"].as_str().unwrap().to_string(),
                date.timestamp_millis(),
            )
        })
        .collect()
}

#[test]
fn history_collapses_consecutive_scans_per_consultant() {
    let db = init_test_db();
    let (c1, token) = signed_in_consultant(&db, "First");
    let (c2, _) = signed_in_consultant(&db, "Second");
    let customer = new_customer(&db, "Alice");

    scan_at(&db, &customer, Some(c1.as_str()), 1_000);
    scan_at(&db, &customer, Some(c1.as_str()), 2_000);
    scan_at(&db, &customer, None, 2_500);
    scan_at(&db, &customer, Some(c2.as_str()), 3_000);
    scan_at(&db, &customer, Some(c1.as_str()), 4_000);

    let resp = handle(get(&format!("/customers/{customer}/history"), &token), &db).unwrap();
    let history = body_json(resp);

    assert_eq!(
        history_pairs(&history),
        vec![(c1.clone(), 4_000), (c2, 3_000), (c1, 1_000)]
    );
    assert_eq!(history[0]["consultant_name"], "First");
}

#[test]
fn history_of_unknown_customer_is_not_found() {
    let db = init_test_db();
    let (_, token) = signed_in_consultant(&db, "Dana");

    let err = expect_err(handle(get("/customers/ghost/history", &token), &db));
    assert!(matches!(err, ServerError::NotFound));
}

#[test]
fn manual_assignment_starts_a_new_run_and_keeps_status() {
    let db = init_test_db();
    let (dana, token) = signed_in_consultant(&db, "Dana");
    let (robin, _) = signed_in_consultant(&db, "Robin");
    let customer = new_customer(&db, "Bea");
    scan_at(&db, &customer, Some(dana.as_str()), 1_000);

    let resp = handle(
        post_json(
            &format!("/customers/{customer}/assign"),
            &token,
            &json!({ "consultant_id": robin }),
        ),
        &db,
    )
    .unwrap();
    assert_eq!(resp.status(), 201);

    let history = body_json(
        handle(get(&format!("/customers/{customer}/history"), &token), &db).unwrap(),
    );
    let consultants: Vec<&str> = history
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["consultant_id"].as_str().unwrap())
        .collect();
    assert_eq!(consultants, vec![robin.as_str(), dana.as_str()]);

    let summary = body_json(
        handle(get(&format!("/customers/{customer}"), &token), &db).unwrap(),
    );
    assert_eq!(summary["scan_count"], 2);
}

#[test]
fn assigning_to_unknown_consultant_is_rejected() {
    let db = init_test_db();
    let (_, token) = signed_in_consultant(&db, "Dana");
    let customer = new_customer(&db, "Bea");

    let err = expect_err(handle(
        post_json(
            &format!("/customers/{customer}/assign"),
            &token,
            &json!({ "consultant_id": "nobody" }),
        ),
        &db,
    ));
    assert!(matches!(err, ServerError::BadRequest(_)));
}

#[test]
fn comments_round_trip_newest_first() {
    let db = init_test_db();
    let (dana, token) = signed_in_consultant(&db, "Dana");
    let customer = new_customer(&db, "Cy");
    let uri = format!("/customers/{customer}/comments");

    for body in ["left voicemail", "coming in Saturday"] {
        let resp = handle(post_json(&uri, &token, &json!({ "body": body })), &db).unwrap();
        assert_eq!(resp.status(), 201);
    }

    let comments = body_json(handle(get(&uri, &token), &db).unwrap());
    let comments = comments.as_array().unwrap();

    assert_eq!(comments.len(), 2);
    // Same-millisecond inserts still list the later one first.
    assert_eq!(comments[0]["body"], "coming in Saturday");
    assert_eq!(comments[0]["consultant_id"], dana.as_str());
    assert_eq!(comments[0]["consultant_name"], "Dana");
}

#[test]
fn empty_comment_is_a_bad_request() {
    let db = init_test_db();
    let (_, token) = signed_in_consultant(&db, "Dana");
    let customer = new_customer(&db, "Cy");

    let err = expect_err(handle(
        post_json(
            &format!("/customers/{customer}/comments"),
            &token,
            &json!({ "body": "   " }),
        ),
        &db,
    ));
    assert!(matches!(err, ServerError::BadRequest(_)));
}
