//! Run the columnar executor against an in-process stand-in for the ClickHouse HTTP interface.

use std::collections::HashMap;
use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::{Query as UrlQuery, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::Router;

use query_engine_execution::columnar::{ClickHouseClient, ClickHouseConnection};
use query_engine_execution::error::Error;
use query_engine_execution::normalize::{normalize_columnar_rows, EventDataValueRow};
use query_engine_sql::sql::dialect::Dialect;
use query_engine_sql::sql::execution_plan::Query;
use query_engine_sql::sql::string::{Param, ParameterSet};

#[derive(Debug, Clone)]
struct Recorded {
    arguments: HashMap<String, String>,
    user: Option<String>,
    body: String,
}

#[derive(Clone)]
struct FakeServer {
    status: StatusCode,
    response: String,
    recorded: Arc<Mutex<Vec<Recorded>>>,
}

async fn handle_query(
    State(server): State<FakeServer>,
    UrlQuery(arguments): UrlQuery<HashMap<String, String>>,
    headers: HeaderMap,
    body: String,
) -> impl IntoResponse {
    let user = headers
        .get("X-ClickHouse-User")
        .and_then(|value| value.to_str().ok())
        .map(str::to_string);
    server.recorded.lock().unwrap().push(Recorded {
        arguments,
        user,
        body,
    });
    (server.status, server.response.clone())
}

async fn ping() -> &'static str {
    "Ok.\n"
}

fn start(server: FakeServer) -> SocketAddr {
    let router = Router::new()
        .route("/", post(handle_query))
        .route("/ping", get(ping))
        .with_state(server);

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(router.into_make_service())
            .await
            .unwrap();
    });
    address
}

fn client(address: SocketAddr) -> ClickHouseClient {
    client_with_timeout(address, None)
}

fn client_with_timeout(address: SocketAddr, request_timeout: Option<Duration>) -> ClickHouseClient {
    ClickHouseClient::new(ClickHouseConnection {
        url: format!("http://{address}/"),
        database: "analytics".to_string(),
        user: Some("reader".to_string()),
        password: Some("secret".to_string()),
        request_timeout,
    })
    .unwrap()
}

async fn answer_slowly() -> String {
    tokio::time::sleep(Duration::from_millis(500)).await;
    serde_json::json!({ "data": [] }).to_string()
}

fn start_slow() -> SocketAddr {
    let router = Router::new().route("/", post(answer_slowly));

    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::Server::from_tcp(listener)
            .unwrap()
            .serve(router.into_make_service())
            .await
            .unwrap();
    });
    address
}

fn values_query() -> Query {
    let mut params = ParameterSet::new();
    params
        .insert(
            "websiteId",
            Param::Uuid(uuid::Uuid::parse_str("02d89813-a1cf-4a5d-8a0e-0b8c5b5a1f8e").unwrap()),
        )
        .unwrap();
    params
        .insert("propertyName", Param::String("plan".to_string()))
        .unwrap();
    params
        .insert(
            "country",
            Param::StringArray(vec!["DE".to_string(), "FR".to_string()]),
        )
        .unwrap();

    Query::new(
        Dialect::Clickhouse,
        "select 1 from event_data where website_id = {websiteId:UUID} and data_key = {propertyName:String} and country in {country:Array(String)}".to_string(),
        params,
    )
    .unwrap()
}

#[tokio::test]
async fn sends_parameters_separately_and_reads_json_rows() {
    let recorded = Arc::new(Mutex::new(vec![]));
    let address = start(FakeServer {
        status: StatusCode::OK,
        response: serde_json::json!({
            "meta": [
                { "name": "value", "type": "String" },
                { "name": "dataType", "type": "UInt32" },
                { "name": "total", "type": "UInt64" }
            ],
            "data": [
                { "value": "3", "dataType": 2, "total": "10" },
                { "value": "pro", "dataType": 1, "total": "9" },
                { "value": "2024-01-05 13:00:00", "dataType": 4, "total": "2" }
            ],
            "rows": 3
        })
        .to_string(),
        recorded: recorded.clone(),
    });

    let rows = client(address).execute(&values_query()).await.unwrap();
    let normalized = normalize_columnar_rows(rows, 500).unwrap();

    assert_eq!(
        normalized,
        vec![
            EventDataValueRow {
                value: "3".to_string(),
                total: 10
            },
            EventDataValueRow {
                value: "pro".to_string(),
                total: 9
            },
            EventDataValueRow {
                value: "2024-01-05 13:00:00".to_string(),
                total: 2
            },
        ]
    );

    let recorded = recorded.lock().unwrap();
    let request = &recorded[0];
    assert_eq!(request.arguments["database"], "analytics");
    assert_eq!(
        request.arguments["param_websiteId"],
        "02d89813-a1cf-4a5d-8a0e-0b8c5b5a1f8e"
    );
    assert_eq!(request.arguments["param_propertyName"], "plan");
    assert_eq!(request.arguments["param_country"], "['DE','FR']");
    assert_eq!(request.user.as_deref(), Some("reader"));
    assert!(request.body.ends_with("\nFORMAT JSON"));
    assert!(!request.body.contains("plan"));
}

#[tokio::test]
async fn reports_server_errors() {
    let address = start(FakeServer {
        status: StatusCode::BAD_REQUEST,
        response: "Code: 62. DB::Exception: Syntax error".to_string(),
        recorded: Arc::new(Mutex::new(vec![])),
    });

    let result = client(address).execute(&values_query()).await;

    match result {
        Err(Error::ColumnarStatus { status, body }) => {
            assert_eq!(status, 400);
            assert!(body.contains("Syntax error"));
        }
        other => panic!("expected a status error, got {other:?}"),
    }
}

#[tokio::test]
async fn rejects_a_response_without_rows() {
    let address = start(FakeServer {
        status: StatusCode::OK,
        response: "{\"rows\": 0}".to_string(),
        recorded: Arc::new(Mutex::new(vec![])),
    });

    let result = client(address).execute(&values_query()).await;

    assert!(matches!(result, Err(Error::Contract(_))));
}

#[tokio::test]
async fn health_check_pings_the_server() {
    let address = start(FakeServer {
        status: StatusCode::OK,
        response: String::new(),
        recorded: Arc::new(Mutex::new(vec![])),
    });

    client(address).health_check().await.unwrap();
}

#[tokio::test]
async fn waits_for_slow_answers_unless_limited() {
    let address = start_slow();

    let rows = client(address).execute(&values_query()).await.unwrap();
    assert!(rows.is_empty());

    let result = client_with_timeout(address, Some(Duration::from_millis(50)))
        .execute(&values_query())
        .await;
    match result {
        Err(Error::Columnar(err)) => assert!(err.is_timeout(), "{err}"),
        other => panic!("expected a timeout, got {other:?}"),
    }
}
