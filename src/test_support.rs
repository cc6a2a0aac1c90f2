//! Throwaway HTTP servers standing in for remote collaborators in tests.

use actix_web::dev::ServerHandle;
use actix_web::{web, App, HttpRequest, HttpResponse, HttpServer};
use std::sync::{Arc, Mutex};

#[derive(Debug, Clone)]
pub struct MockRoute {
    pub method: &'static str,
    pub path: String,
    pub status: u16,
    pub body: String,
}

impl MockRoute {
    pub fn new(method: &'static str, path: &str, status: u16, body: impl Into<String>) -> Self {
        Self {
            method,
            path: path.to_string(),
            status,
            body: body.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub authorization: Option<String>,
    pub body: Vec<u8>,
}

pub struct MockServer {
    pub base_url: String,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    handle: ServerHandle,
}

impl MockServer {
    /// Serves `routes` on an ephemeral port. Routes are matched by method and
    /// path; a route listed several times answers in order, repeating the last.
    /// `{base_url}` in a response body is replaced with the server's own URL.
    pub async fn start(routes: Vec<MockRoute>) -> Self {
        let requests: Arc<Mutex<Vec<RecordedRequest>>> = Arc::new(Mutex::new(Vec::new()));
        let state = web::Data::new((Mutex::new(routes), requests.clone()));

        let server = HttpServer::new(move || {
            App::new()
                .app_data(state.clone())
                .app_data(web::PayloadConfig::new(16 * 1024 * 1024))
                .default_service(web::to(respond))
        })
        .workers(1)
        .bind(("127.0.0.1", 0))
        .unwrap();
        let addr = server.addrs()[0];
        let server = server.run();
        let handle = server.handle();
        actix_web::rt::spawn(server);

        Self {
            base_url: format!("http://{}", addr),
            requests,
            handle,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn recorded(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub async fn stop(self) {
        self.handle.stop(true).await;
    }
}

type MockState = (Mutex<Vec<MockRoute>>, Arc<Mutex<Vec<RecordedRequest>>>);

async fn respond(
    req: HttpRequest,
    body: web::Bytes,
    state: web::Data<MockState>,
) -> HttpResponse {
    let method = req.method().as_str().to_string();
    let path = req.path().to_string();
    state.1.lock().unwrap().push(RecordedRequest {
        method: method.clone(),
        path: path.clone(),
        authorization: req
            .headers()
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .map(|v| v.to_string()),
        body: body.to_vec(),
    });

    let mut routes = state.0.lock().unwrap();
    let matching: Vec<usize> = routes
        .iter()
        .enumerate()
        .filter(|(_, r)| r.method == method && r.path == path)
        .map(|(i, _)| i)
        .collect();

    let route = match matching.as_slice() {
        [] => return HttpResponse::NotFound().body("no mock route"),
        [only] => routes[*only].clone(),
        [first, ..] => routes.remove(*first),
    };

    let status = actix_web::http::StatusCode::from_u16(route.status)
        .unwrap_or(actix_web::http::StatusCode::INTERNAL_SERVER_ERROR);
    let base_url = format!("http://{}", req.connection_info().host());
    HttpResponse::build(status)
        .content_type("application/json")
        .body(route.body.replace("{base_url}", &base_url))
}
