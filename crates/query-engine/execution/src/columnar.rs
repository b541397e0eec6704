//! Execute queries against the columnar backend over the ClickHouse HTTP interface.
//!
//! The query text travels in the request body and keeps its `{name:Type}` placeholders; each
//! value is sent separately as a `param_<name>` URL argument, which the server binds itself.

use std::time::Duration;

use chrono::SecondsFormat;
use serde::Deserialize;
use tracing::{info_span, Instrument};
use url::Url;

use query_engine_sql::sql::dialect::Dialect;
use query_engine_sql::sql::execution_plan::Query;
use query_engine_sql::sql::string::Param;

use crate::error::{BackendContractError, Error};
use crate::normalize::ColumnarRow;

const USER_HEADER: &str = "X-ClickHouse-User";
const PASSWORD_HEADER: &str = "X-ClickHouse-Key";

/// Where and as whom to reach the columnar backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickHouseConnection {
    pub url: String,
    pub database: String,
    pub user: Option<String>,
    pub password: Option<String>,
    /// Without one, requests wait for as long as the server takes.
    pub request_timeout: Option<Duration>,
}

/// An HTTP client bound to one ClickHouse server and database.
#[derive(Debug, Clone)]
pub struct ClickHouseClient {
    client: reqwest::Client,
    url: Url,
    database: String,
    user: Option<String>,
    password: Option<String>,
}

/// The parts of the `JSON` output format we read.
#[derive(Debug, Deserialize)]
struct JsonResponse {
    data: Vec<ColumnarRow>,
}

impl ClickHouseClient {
    pub fn new(connection: ClickHouseConnection) -> Result<Self, Error> {
        let url = Url::parse(&connection.url)?;
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = connection.request_timeout {
            builder = builder.timeout(timeout);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            url,
            database: connection.database,
            user: connection.user,
            password: connection.password,
        })
    }

    /// Run an event data values query and return its rows as the server produced them.
    pub async fn execute(&self, query: &Query) -> Result<Vec<ColumnarRow>, Error> {
        if query.dialect() != Dialect::Clickhouse {
            return Err(Error::DialectMismatch {
                expected: Dialect::Clickhouse,
                found: query.dialect(),
            });
        }

        let mut arguments = vec![
            ("database".to_string(), self.database.clone()),
            (
                "date_time_input_format".to_string(),
                "best_effort".to_string(),
            ),
        ];
        arguments.extend(
            query
                .params()
                .iter()
                .map(|(name, param)| (format!("param_{name}"), encode_param(param))),
        );

        tracing::info!(
            generated_sql = query.sql(),
            params = ?query.params(),
            database = %self.database,
        );

        let body = format!("{}\nFORMAT JSON", query.sql());
        let request = self.request(
            self.client
                .post(self.url.clone())
                .query(&arguments)
                .body(body),
        );

        let text = async {
            let response = request.send().await?;
            let status = response.status();
            let text = response.text().await?;
            if status.is_success() {
                Ok(text)
            } else {
                Err(Error::ColumnarStatus {
                    status: status.as_u16(),
                    body: text,
                })
            }
        }
        .instrument(info_span!("Database request"))
        .await?;

        let response: JsonResponse = serde_json::from_str(&text)
            .map_err(|err| BackendContractError::MalformedResponse(err.to_string()))?;
        Ok(response.data)
    }

    /// Check that the server is reachable and answering.
    pub async fn health_check(&self) -> Result<(), Error> {
        let url = self.url.join("ping")?;
        let response = self.request(self.client.get(url)).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status.is_success() {
            Ok(())
        } else {
            Err(Error::ColumnarStatus {
                status: status.as_u16(),
                body,
            })
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        let builder = match &self.user {
            Some(user) => builder.header(USER_HEADER, user),
            None => builder,
        };
        match &self.password {
            Some(password) => builder.header(PASSWORD_HEADER, password),
            None => builder,
        }
    }
}

/// Render a parameter value the way the server parses `param_<name>` arguments.
pub fn encode_param(param: &Param) -> String {
    match param {
        Param::Uuid(uuid) => uuid.to_string(),
        Param::Timestamp(timestamp) => timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
        Param::String(string) => escape(string, false),
        Param::StringArray(strings) => {
            let items: Vec<String> = strings
                .iter()
                .map(|string| format!("'{}'", escape(string, true)))
                .collect();
            format!("[{}]", items.join(","))
        }
    }
}

fn escape(value: &str, quoted: bool) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '\t' => escaped.push_str("\\t"),
            '\n' => escaped.push_str("\\n"),
            '\'' if quoted => escaped.push_str("\\'"),
            c => escaped.push(c),
        }
    }
    escaped
}
