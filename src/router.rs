use crate::auth::{get_current_session, revoke_session, Session};
use crate::db::comments::{add_comment, list_comments};
use crate::db::connection::now_millis;
use crate::db::consultants::get_consultant;
use crate::db::customers::{create_customer, get_customer, NewCustomer};
use crate::db::scans::{
    get_scan, insert_scan, latest_scan_for_customer, update_scan_status, NewScan, StatusUpdate,
};
use crate::db::{Database, ListFilter, ScanOrder, ScanStore};
use crate::domain::{
    assignment_history, filter_and_sort, summarize, ActivityQuery, InterestStatus, InterestedIn,
    SortBy,
};
use crate::errors::ServerError;
use crate::responses::{json_response, json_response_with_status, ResultResp};
use crate::spreadsheets::export_activity_xlsx;
use astra::Request;
use chrono::{DateTime, Local, NaiveDate};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::io::Read;

const MAX_BODY_BYTES: u64 = 64 * 1024;

pub fn handle(req: Request, db: &Database) -> ResultResp {
    handle_at(req, db, Local::now())
}

/// Same as [`handle`] with "now" pinned, which decides what "today" means
/// for the activity list and analytics.
pub fn handle_at(req: Request, db: &Database, now: DateTime<Local>) -> ResultResp {
    let method = req.method().as_str().to_string();
    let path = req.uri().path().to_string();
    let params = parse_query(&req);

    let token = session_token(&req).ok_or(ServerError::Unauthenticated)?;
    let session = db.with_conn(|conn| get_current_session(conn, &token, now_millis()))?;

    tracing::debug!(
        %method,
        %path,
        consultant = %session.consultant_id,
        session_expires_at = session.expires_at,
        "request"
    );

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method.as_str(), segments.as_slice()) {
        ("POST", ["logout"]) => {
            db.with_conn(|conn| revoke_session(conn, &token, now_millis()))?;
            json_response(&json!({ "ok": true }))
        }

        ("GET", ["scans"]) => {
            let records = activity(db, &session, &params, &now)?;
            json_response(&records)
        }
        ("GET", ["scans", "export.xlsx"]) => {
            let records = activity(db, &session, &params, &now)?;
            let filename = format!("activity_{}.xlsx", now.format("%Y-%m-%d"));
            tracing::info!(rows = records.len(), "exporting activity workbook");
            export_activity_xlsx(&records, &filename)
        }
        ("POST", ["scans"]) => {
            let body: ScanRequest = read_json(req)?;
            record_scan(db, &session, body)
        }
        ("POST", ["scans", scan_id, "status"]) => {
            let update: StatusUpdate = read_json(req)?;
            if update.is_empty() {
                return Err(ServerError::BadRequest("nothing to update".into()));
            }
            let scan_id = scan_id.to_string();
            let updated = db.with_conn(|conn| {
                if !update_scan_status(conn, &scan_id, &update)? {
                    return Err(ServerError::NotFound);
                }
                get_scan(conn, &scan_id)
            })?;
            tracing::info!(scan_id = %scan_id, "scan status updated");
            json_response(&json!({
                "id": scan_id,
                "interest_status": updated.as_ref().and_then(|s| s.interest_status),
                "interested_in": updated.as_ref().and_then(|s| s.interested_in),
            }))
        }

        ("GET", ["customers", customer_id]) => {
            let customer = db
                .with_conn(|conn| get_customer(conn, customer_id))?
                .ok_or(ServerError::NotFound)?;
            json_response(&customer)
        }
        ("GET", ["customers", customer_id, "history"]) => {
            require_customer(db, customer_id)?;
            let scans = db.list_records(&ListFilter::for_customer(*customer_id).expanded())?;
            json_response(&assignment_history(&scans))
        }
        ("POST", ["customers", customer_id, "assign"]) => {
            let customer_id = customer_id.to_string();
            let body: AssignRequest = read_json(req)?;
            assign_customer(db, &session, &customer_id, &body.consultant_id)
        }
        ("GET", ["customers", customer_id, "comments"]) => {
            require_customer(db, customer_id)?;
            let comments = db.with_conn(|conn| list_comments(conn, customer_id))?;
            json_response(&comments)
        }
        ("POST", ["customers", customer_id, "comments"]) => {
            let customer_id = customer_id.to_string();
            require_customer(db, &customer_id)?;
            let body: CommentRequest = read_json(req)?;
            let id = db.with_conn(|conn| {
                add_comment(
                    conn,
                    &customer_id,
                    &session.consultant_id,
                    &body.body,
                    now_millis(),
                )
            })?;
            json_response_with_status(201, &json!({ "id": id }))
        }

        ("GET", ["analytics"]) => {
            let records = activity(db, &session, &params, &now)?;
            json_response(&summarize(&records, &now))
        }

        _ => Err(ServerError::NotFound),
    }
}

#[derive(Debug, Deserialize)]
struct ScanRequest {
    /// Existing customer, as encoded in their QR code.
    #[serde(default)]
    customer_id: Option<String>,
    /// New customer to register with this first scan.
    #[serde(default)]
    customer: Option<NewCustomer>,
    #[serde(default)]
    consultant_id: Option<String>,
    #[serde(default)]
    interest_status: Option<InterestStatus>,
    #[serde(default)]
    interested_in: Option<InterestedIn>,
    #[serde(default)]
    follow_up_date: Option<DateTime<chrono::Utc>>,
}

#[derive(Debug, Deserialize)]
struct AssignRequest {
    consultant_id: String,
}

#[derive(Debug, Deserialize)]
struct CommentRequest {
    body: String,
}

fn record_scan(db: &Database, session: &Session, body: ScanRequest) -> ResultResp {
    let now = now_millis();
    let consultant_id = body
        .consultant_id
        .unwrap_or_else(|| session.consultant_id.clone());

    let (scan_id, customer_id) = db.with_conn(|conn| {
        let tx = conn
            .transaction()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        if get_consultant(&tx, &consultant_id)?.is_none() {
            return Err(ServerError::BadRequest(format!(
                "unknown consultant '{consultant_id}'"
            )));
        }

        let customer_id = match (body.customer_id, body.customer) {
            (Some(id), _) => {
                if get_customer(&tx, &id)?.is_none() {
                    return Err(ServerError::NotFound);
                }
                id
            }
            (None, Some(new_customer)) => create_customer(&tx, &new_customer, now)?,
            (None, None) => {
                return Err(ServerError::BadRequest(
                    "customer_id or customer is required".into(),
                ))
            }
        };

        let scan_id = insert_scan(
            &tx,
            &NewScan {
                customer_id: customer_id.clone(),
                consultant_id: Some(consultant_id.clone()),
                interest_status: body.interest_status,
                interested_in: body.interested_in,
                follow_up_date: body.follow_up_date,
            },
            now,
        )?;

        tx.commit()
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok((scan_id, customer_id))
    })?;

    tracing::info!(%scan_id, %customer_id, %consultant_id, "scan recorded");
    json_response_with_status(
        201,
        &json!({ "id": scan_id, "customer_id": customer_id }),
    )
}

/// Manual assignment writes a new scan for the target consultant, carrying
/// the customer's latest interest data forward.
fn assign_customer(
    db: &Database,
    session: &Session,
    customer_id: &str,
    consultant_id: &str,
) -> ResultResp {
    let now = now_millis();

    let scan_id = db.with_conn(|conn| {
        let tx = conn
            .transaction()
            .map_err(|e| ServerError::DbError(e.to_string()))?;

        if get_customer(&tx, customer_id)?.is_none() {
            return Err(ServerError::NotFound);
        }
        if get_consultant(&tx, consultant_id)?.is_none() {
            return Err(ServerError::BadRequest(format!(
                "unknown consultant '{consultant_id}'"
            )));
        }

        let latest = latest_scan_for_customer(&tx, customer_id)?;
        let scan_id = insert_scan(
            &tx,
            &NewScan {
                customer_id: customer_id.to_string(),
                consultant_id: Some(consultant_id.to_string()),
                interest_status: latest.as_ref().and_then(|s| s.interest_status),
                interested_in: latest.as_ref().and_then(|s| s.interested_in),
                follow_up_date: None,
            },
            now,
        )?;

        tx.commit()
            .map_err(|e| ServerError::DbError(e.to_string()))?;
        Ok(scan_id)
    })?;

    tracing::info!(
        customer_id,
        consultant_id,
        assigned_by = %session.consultant_id,
        "customer assigned"
    );
    json_response_with_status(201, &json!({ "id": scan_id }))
}

fn require_customer(db: &Database, customer_id: &str) -> Result<(), ServerError> {
    db.with_conn(|conn| get_customer(conn, customer_id))?
        .map(|_| ())
        .ok_or(ServerError::NotFound)
}

/// Loads expanded scans and runs them through the filter/sort engine.
/// `mine=1` narrows the fetch to the caller's own scans.
fn activity(
    db: &Database,
    session: &Session,
    params: &HashMap<String, Vec<String>>,
    now: &DateTime<Local>,
) -> Result<Vec<crate::domain::ScanRecord>, ServerError> {
    let query = activity_query(params)?;

    let mine = first(params, "mine").is_some_and(|v| v == "1" || v == "true");
    let filter = ListFilter {
        consultant_id: mine.then(|| session.consultant_id.clone()),
        order: ScanOrder::CreatedDesc,
        expand: true,
        ..Default::default()
    };

    let records = db.list_records(&filter)?;
    Ok(filter_and_sort(&records, &query, now))
}

/// Builds an [`ActivityQuery`] from `from`, `to`, `q`, `interested_in`,
/// `status` and `sort`. List params accept repeats and comma-separated values.
pub fn activity_query(params: &HashMap<String, Vec<String>>) -> Result<ActivityQuery, ServerError> {
    let date = |key: &str| -> Result<Option<NaiveDate>, ServerError> {
        first(params, key)
            .map(|v| {
                NaiveDate::parse_from_str(v, "%Y-%m-%d")
                    .map_err(|_| ServerError::BadRequest(format!("{key} must be YYYY-MM-DD")))
            })
            .transpose()
    };

    let query = ActivityQuery {
        date_from: date("from")?,
        date_to: date("to")?,
        search_text: first(params, "q").map(str::to_string),
        interested_in: list(params, "interested_in")?,
        interest_status: list(params, "status")?,
        sort_by: first(params, "sort")
            .map(|s| s.parse::<SortBy>().map_err(ServerError::BadRequest))
            .transpose()?,
    };

    if let (Some(from), Some(to)) = (query.date_from, query.date_to) {
        if from > to {
            return Err(ServerError::BadRequest("from is after to".into()));
        }
    }

    Ok(query)
}

fn first<'a>(params: &'a HashMap<String, Vec<String>>, key: &str) -> Option<&'a str> {
    params
        .get(key)
        .and_then(|v| v.first())
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
}

fn list<T>(params: &HashMap<String, Vec<String>>, key: &str) -> Result<Vec<T>, ServerError>
where
    T: std::str::FromStr<Err = String> + PartialEq,
{
    let mut out = Vec::new();
    for raw in params.get(key).into_iter().flatten() {
        for part in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let value = part.parse::<T>().map_err(ServerError::BadRequest)?;
            if !out.contains(&value) {
                out.push(value);
            }
        }
    }
    Ok(out)
}

fn parse_query(req: &Request) -> HashMap<String, Vec<String>> {
    let mut map: HashMap<String, Vec<String>> = HashMap::new();

    if let Some(q) = req.uri().query() {
        for (k, v) in url::form_urlencoded::parse(q.as_bytes()) {
            map.entry(k.into_owned()).or_default().push(v.into_owned());
        }
    }

    map
}

/// `Authorization: Bearer <token>` wins over the `session` cookie.
fn session_token(req: &Request) -> Option<String> {
    let headers = req.headers();

    let bearer = headers
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all("Cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == "session")
        .map(|(_, value)| value.trim().to_string())
        .filter(|t| !t.is_empty())
}

fn read_json<T: DeserializeOwned>(req: Request) -> Result<T, ServerError> {
    let mut body = req.into_body();
    let mut buf = Vec::new();
    body.reader()
        .take(MAX_BODY_BYTES + 1)
        .read_to_end(&mut buf)
        .map_err(|e| ServerError::BadRequest(format!("failed to read body: {e}")))?;

    if buf.len() as u64 > MAX_BODY_BYTES {
        return Err(ServerError::BadRequest("request body too large".into()));
    }

    serde_json::from_slice(&buf).map_err(|e| ServerError::BadRequest(format!("invalid JSON: {e}")))
}
