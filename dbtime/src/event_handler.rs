use chrono::{DateTime, Utc};
use lambda_runtime::{tracing, Error, LambdaEvent};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use crate::config::{Config, Mode};
use crate::db;

const GREETING: &str = "Hello World!";
const CONTENT_TYPE: &str = "text/html; charset=UTF-8";

/// The gateway's proxy event. Only the query-string map is part of the
/// contract; the handler never branches on its contents.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    #[serde(default)]
    query_string_parameters: Option<HashMap<String, String>>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    status_code: u16,
    headers: HashMap<String, String>,
    body: String,
}

impl Response {
    fn with_status(status_code: u16, body: String) -> Self {
        Self {
            status_code,
            headers: HashMap::from([("Content-Type".to_string(), CONTENT_TYPE.to_string())]),
            body,
        }
    }

    fn ok(body: String) -> Self {
        Self::with_status(200, body)
    }

    fn internal_error(body: String) -> Self {
        Self::with_status(500, body)
    }
}

fn time_body(now: DateTime<Utc>) -> String {
    format!("The time is {now}")
}

pub(crate) async fn function_handler(
    config: Arc<Config>,
    event: LambdaEvent<Request>,
) -> Result<Response, Error> {
    let request = event.payload;
    tracing::debug!(query = ?request.query_string_parameters, "received event");

    let response = match config.mode {
        Mode::Echo => Response::ok(GREETING.to_string()),
        Mode::Query => match db::fetch_current_time(&config.conninfo()).await {
            Ok(now) => Response::ok(time_body(now)),
            Err(err) => {
                tracing::error!(error = ?err, "database request failed");
                Response::internal_error(err.to_string())
            }
        },
    };

    Ok(response)
}
