//! Drives the assembled application in-process over the in-memory adapters.

use actix_web::http::StatusCode;
use actix_web::{App, test, web};
use serde_json::Value;

use critique::Trace;
use critique::domain::{Role, TRACE_ID_HEADER, User};
use critique::inbound::http::health::{HealthState, live, ready};
use critique::test_support::TestHarness;

/// Status, trace header and JSON body of one exchange.
pub struct Reply {
    pub status: StatusCode,
    pub trace_id: Option<String>,
    pub body: Value,
}

/// The full route table wrapped in the tracing middleware, as served in
/// production.
pub struct Api {
    pub harness: TestHarness,
    health: web::Data<HealthState>,
}

impl Api {
    pub fn new() -> Self {
        let health = web::Data::new(HealthState::new());
        health.mark_ready();
        Self {
            harness: TestHarness::new(),
            health,
        }
    }

    pub fn user(&self, username: &str, role: Role) -> User {
        self.harness.seed_user(username, role)
    }

    pub async fn send(&self, req: test::TestRequest) -> Reply {
        let app = test::init_service(
            App::new()
                .app_data(self.health.clone())
                .app_data(web::Data::new(self.harness.state()))
                .wrap(Trace)
                .service(web::scope("/api/v1").configure(critique::inbound::http::configure))
                .service(ready)
                .service(live),
        )
        .await;
        let res = test::call_service(&app, req.to_request()).await;
        let status = res.status();
        let trace_id = res
            .headers()
            .get(TRACE_ID_HEADER)
            .and_then(|value| value.to_str().ok())
            .map(str::to_owned);
        let bytes = test::read_body(res).await;
        Reply {
            status,
            trace_id,
            body: serde_json::from_slice(&bytes).unwrap_or(Value::Null),
        }
    }

    pub async fn send_as(&self, user: &User, req: test::TestRequest) -> Reply {
        self.send(req.insert_header(("Authorization", self.harness.bearer_for(user))))
            .await
    }
}
