//! An in-process stand-in for the ClickHouse HTTP interface.

use std::net::{SocketAddr, TcpListener};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Router;

use event_data_configuration::configuration::{BackendConfiguration, ClickHouseConfiguration};
use event_data_configuration::values::DatabaseName;
use event_data_configuration::Configuration;

#[derive(Clone)]
pub struct FakeClickHouse {
    pub data: serde_json::Value,
    pub requests: Arc<Mutex<Vec<String>>>,
}

impl FakeClickHouse {
    pub fn answering(data: serde_json::Value) -> Self {
        Self {
            data,
            requests: Arc::new(Mutex::new(vec![])),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    /// Serve on an ephemeral port and return a configuration pointing at it.
    pub fn start(&self) -> Configuration {
        let router = Router::new()
            .route("/", post(handle_query))
            .route("/ping", get(|| async { "Ok.\n" }))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let address: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::Server::from_tcp(listener)
                .unwrap()
                .serve(router.into_make_service())
                .await
                .unwrap();
        });

        Configuration {
            backend: BackendConfiguration::Clickhouse(ClickHouseConfiguration {
                url: format!("http://{address}/"),
                database: DatabaseName::default(),
                user: None,
                password: None,
                request_timeout: None,
            }),
        }
    }
}

async fn handle_query(State(server): State<FakeClickHouse>, body: String) -> (StatusCode, String) {
    server.requests.lock().unwrap().push(body);
    let response = serde_json::json!({ "meta": [], "data": server.data, "rows": 0 });
    (StatusCode::OK, response.to_string())
}

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
