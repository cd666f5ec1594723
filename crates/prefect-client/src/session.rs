//! Session client: authentication, vehicle selection and command dispatch
//!
//! The vendor keeps one "active vehicle" per session token on the server.
//! Commands act on whichever vehicle is active at the moment they arrive, so
//! a select followed by a command is only meaningful if nothing else selects
//! in between. [`Session`] serializes those pairs with a per-session guard.

use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::{json, Map, Value};
use tracing::{debug, info, instrument, warn};

use crate::config::{ClientConfig, CredentialSource, Credentials};
use crate::error::{PrefectError, Result};
use crate::transport::{Endpoint, HttpTransport, Transport};
use crate::types::{LookupCode, VehicleSnapshot};
use crate::vehicle::Vehicle;

/// API level sent with every request
const API_LEVEL: &str = "1";

/// Client-side view of the session state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Unauthenticated,
    Authenticated,
    /// Last vehicle this client selected. Advisory only: other holders of the
    /// same token may have changed the server-side selection since.
    VehicleSelected(String),
}

/// Authenticated context against the vendor API
pub struct Session {
    transport: Arc<dyn Transport>,
    auth_token: RwLock<Option<String>>,
    active_vehicle: RwLock<Option<String>>,
    /// Write side held across select+command pairs, read side by listings
    sequence: tokio::sync::RwLock<()>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("authenticated", &self.auth_token.read().is_some())
            .field("active_vehicle", &*self.active_vehicle.read())
            .finish()
    }
}

impl Session {
    /// Create a session talking HTTP to the configured service
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let transport = HttpTransport::new(config)?;
        info!("Session created for {}", transport.base_url());
        Ok(Self::with_transport(Arc::new(transport)))
    }

    /// Create a session over any transport
    pub fn with_transport(transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            auth_token: RwLock::new(None),
            active_vehicle: RwLock::new(None),
            sequence: tokio::sync::RwLock::new(()),
        }
    }

    pub fn state(&self) -> SessionState {
        if self.auth_token.read().is_none() {
            return SessionState::Unauthenticated;
        }
        match self.active_vehicle.read().clone() {
            Some(vin) => SessionState::VehicleSelected(vin),
            None => SessionState::Authenticated,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.auth_token.read().is_some()
    }

    /// Session token from the last successful login
    pub fn auth_token(&self) -> Option<String> {
        self.auth_token.read().clone()
    }

    /// VIN of the last successful selection made through this session
    pub fn active_vehicle(&self) -> Option<String> {
        self.active_vehicle.read().clone()
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Log in and store the session token
    ///
    /// Fails with `CredentialsMissing` if the source yields no usable
    /// username/password, and with `AuthenticationFailed` if the reply has no
    /// `response.authToken`. The token is never refreshed automatically.
    #[instrument(skip(self, source))]
    pub async fn authenticate(&self, source: &CredentialSource) -> Result<()> {
        let creds = source
            .resolve()
            .map_err(|e| PrefectError::CredentialsMissing(e.to_string()))?;
        self.login_with(&creds).await
    }

    /// Log in with an explicit username and password
    pub async fn login(&self, username: &str, password: &str) -> Result<()> {
        self.authenticate(&CredentialSource::explicit(username, password))
            .await
    }

    async fn login_with(&self, creds: &Credentials) -> Result<()> {
        let payload = json!({
            "PARAMS": {
                "emailaddress": creds.username,
                "password": creds.password,
                "persistent": "1",
                "apiLevel": API_LEVEL,
            }
        });

        // A token swap must not land between the halves of a select+command pair
        let _pair = self.sequence.write().await;
        let body = self.transport.post(Endpoint::Login, &payload).await?;

        let token = body
            .get("response")
            .and_then(|r| r.get("authToken"))
            .and_then(Value::as_str)
            .filter(|t| !t.is_empty())
            .map(str::to_owned);

        match token {
            Some(token) => {
                *self.auth_token.write() = Some(token);
                // A fresh token starts with no known server-side selection
                *self.active_vehicle.write() = None;
                info!("Authenticated");
                Ok(())
            }
            None => {
                warn!("Login reply has no auth token");
                Err(PrefectError::AuthenticationFailed { body })
            }
        }
    }

    // =========================================================================
    // Vehicles
    // =========================================================================

    /// Fetch telemetry for every vehicle on the account
    ///
    /// The vendor returns a bare object instead of a one-element array when a
    /// single vehicle is registered; both shapes yield the same sequence.
    #[instrument(skip(self))]
    pub async fn vehicle_snapshots(&self) -> Result<Vec<VehicleSnapshot>> {
        let _read = self.sequence.read().await;
        let payload = self.session_payload(Map::new())?;
        let body = self.transport.post(Endpoint::EnergyReport, &payload).await?;
        let snapshots = parse_vehicle_list(body)?;
        debug!("Energy report lists {} vehicle(s)", snapshots.len());
        Ok(snapshots)
    }

    /// List the account's vehicles as handles bound to this session
    pub async fn list_vehicles(self: &Arc<Self>) -> Result<Vec<Vehicle>> {
        Ok(self
            .vehicle_snapshots()
            .await?
            .into_iter()
            .map(|snapshot| Vehicle::new(Arc::clone(self), snapshot))
            .collect())
    }

    /// Handle for one vehicle by VIN
    pub async fn vehicle(self: &Arc<Self>, vin: &str) -> Result<Vehicle> {
        self.list_vehicles()
            .await?
            .into_iter()
            .find(|v| v.vin() == vin)
            .ok_or_else(|| PrefectError::VehicleNotFound(vin.to_string()))
    }

    /// Make `vin` the server-side active vehicle
    ///
    /// Returns `Ok(false)` when the server answers with an `error` field. Unlike
    /// [`send_command`](Self::send_command), a refusal here is reported as a
    /// boolean rather than an error; callers that need the selection to hold
    /// for a command should use [`command_vehicle`](Self::command_vehicle).
    #[instrument(skip(self))]
    pub async fn select_vehicle(&self, vin: &str) -> Result<bool> {
        let _pair = self.sequence.write().await;
        let body = self.post_select(vin).await?;
        Ok(!has_error(&body))
    }

    /// Dispatch a command to whatever vehicle is currently active
    ///
    /// Fails with `CommandRejected` on an `error` field and `CommandFailed` on
    /// a 400-class `status`; any other reply is returned unchanged.
    #[instrument(skip(self, code), fields(code = %code))]
    pub async fn send_command(&self, code: &LookupCode) -> Result<Value> {
        let _pair = self.sequence.write().await;
        self.post_command(code).await
    }

    /// Select `vin` and send `code` as one uninterruptible pair
    ///
    /// The selection is repeated on every call: another process sharing the
    /// token may have changed it. If the server refuses the selection the
    /// command is not sent and `CommandRejected` carries the select reply.
    #[instrument(skip(self, code), fields(code = %code))]
    pub async fn command_vehicle(&self, vin: &str, code: &LookupCode) -> Result<Value> {
        let _pair = self.sequence.write().await;

        let selected = self.post_select(vin).await?;
        if has_error(&selected) {
            warn!(vin, "Vehicle selection refused, command not sent");
            return Err(PrefectError::CommandRejected { body: selected });
        }

        self.post_command(code).await
    }

    // =========================================================================
    // Helper Methods
    // =========================================================================

    /// Build `{"PARAMS": {..., "SESSIONID", "apiLevel"}}`
    fn session_payload(&self, mut params: Map<String, Value>) -> Result<Value> {
        let token = self
            .auth_token
            .read()
            .clone()
            .ok_or(PrefectError::NotAuthenticated)?;
        params.insert("SESSIONID".into(), Value::String(token));
        params.insert("apiLevel".into(), Value::String(API_LEVEL.into()));
        Ok(json!({ "PARAMS": params }))
    }

    /// Selection request; caller holds the write guard
    async fn post_select(&self, vin: &str) -> Result<Value> {
        let mut params = Map::new();
        params.insert("VIN".into(), Value::String(vin.to_string()));
        let payload = self.session_payload(params)?;

        let body = self
            .transport
            .post(Endpoint::SetActiveVehicle, &payload)
            .await?;

        if has_error(&body) {
            warn!(vin, "Server refused vehicle selection");
        } else {
            *self.active_vehicle.write() = Some(vin.to_string());
            debug!(vin, "Active vehicle selected");
        }
        Ok(body)
    }

    /// Command request; caller holds the write guard
    async fn post_command(&self, code: &LookupCode) -> Result<Value> {
        let mut params = Map::new();
        params.insert("LOOKUPCODE".into(), Value::String(code.as_str().into()));
        let payload = self.session_payload(params)?;

        let body = self.transport.post(Endpoint::AddCommand, &payload).await?;
        check_command_reply(body)
    }
}

/// Whether a reply object carries an `error` key
fn has_error(body: &Value) -> bool {
    body.as_object()
        .map_or(false, |obj| obj.contains_key("error"))
}

/// Whether `status` reports a 4xx outcome
///
/// String statuses (`"400 Bad Request"`, `"Status 404"`) fail when any
/// whitespace-separated token is a number in 400..=499; numeric statuses
/// follow the same range.
fn is_client_error_status(body: &Value) -> bool {
    let is_4xx = |code: u64| (400..500).contains(&code);
    match body.get("status") {
        Some(Value::String(status)) => status
            .split_whitespace()
            .filter_map(|token| token.parse::<u64>().ok())
            .any(is_4xx),
        Some(Value::Number(n)) => n.as_u64().map_or(false, is_4xx),
        _ => false,
    }
}

fn check_command_reply(body: Value) -> Result<Value> {
    if has_error(&body) {
        warn!("Command rejected by server");
        return Err(PrefectError::CommandRejected { body });
    }
    if is_client_error_status(&body) {
        warn!("Command failed on server");
        return Err(PrefectError::CommandFailed { body });
    }
    Ok(body)
}

/// Normalize the energy report's `response` (object or array) into snapshots
fn parse_vehicle_list(body: Value) -> Result<Vec<VehicleSnapshot>> {
    let parsed = match body.get("response") {
        Some(Value::Array(items)) => Some(
            items
                .iter()
                .map(VehicleSnapshot::from_value)
                .collect::<serde_json::Result<Vec<_>>>(),
        ),
        Some(item @ Value::Object(_)) => Some(VehicleSnapshot::from_value(item).map(|v| vec![v])),
        _ => None,
    };

    match parsed {
        Some(Ok(snapshots)) => Ok(snapshots),
        Some(Err(e)) => {
            warn!("Malformed vehicle record: {}", e);
            Err(PrefectError::RequestFailed { body })
        }
        None => Err(PrefectError::RequestFailed { body }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::{MockTransport, MOCK_AUTH_TOKEN};
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn mock_session() -> (Arc<MockTransport>, Arc<Session>) {
        let mock = Arc::new(MockTransport::new());
        let session = Arc::new(Session::with_transport(mock.clone()));
        (mock, session)
    }

    async fn authenticated_session() -> (Arc<MockTransport>, Arc<Session>) {
        let (mock, session) = mock_session();
        session.login("driver@example.com", "pw").await.unwrap();
        mock.clear_calls();
        (mock, session)
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    #[tokio::test]
    async fn test_authenticate_stores_token() {
        let (mock, session) = mock_session();
        mock.respond(
            Endpoint::Login,
            json!({"response": {"authToken": "tok-42", "userId": 7}}),
        );

        assert_eq!(session.state(), SessionState::Unauthenticated);
        session.login("driver@example.com", "pw").await.unwrap();

        assert_eq!(session.auth_token().as_deref(), Some("tok-42"));
        assert_eq!(session.state(), SessionState::Authenticated);

        let call = &mock.calls()[0];
        assert_eq!(call.endpoint, Endpoint::Login);
        assert_eq!(call.param("emailaddress"), Some("driver@example.com"));
        assert_eq!(call.param("password"), Some("pw"));
        assert_eq!(call.param("persistent"), Some("1"));
        assert_eq!(call.param("apiLevel"), Some("1"));
    }

    #[tokio::test]
    async fn test_token_sent_as_session_id() {
        let (mock, session) = mock_session();
        mock.respond(Endpoint::Login, json!({"response": {"authToken": "tok-42"}}));
        session.login("u", "p").await.unwrap();

        session.vehicle_snapshots().await.unwrap();
        session.select_vehicle("VIN1").await.unwrap();
        session.send_command(&LookupCode::Lock).await.unwrap();

        for call in &mock.calls()[1..] {
            assert_eq!(call.param("SESSIONID"), Some("tok-42"));
            assert_eq!(call.param("apiLevel"), Some("1"));
        }
    }

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<parking_lot::Mutex<Vec<u8>>>);

    impl std::io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_login_logs_omit_username() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (mock, session) = mock_session();
        session.login("driver@example.com", "pw").await.unwrap();
        mock.respond(Endpoint::Login, json!({"response": {}}));
        session.login("driver@example.com", "pw").await.unwrap_err();

        let output = String::from_utf8(logs.0.lock().clone()).unwrap();
        assert!(output.contains("Authenticated"));
        assert!(!output.contains("driver@example.com"));
    }

    #[tokio::test]
    async fn test_authenticate_without_token_fails() {
        let (mock, session) = mock_session();
        let reply = json!({"response": {"message": "invalid password"}});
        mock.respond(Endpoint::Login, reply.clone());

        let err = session.login("u", "p").await.unwrap_err();
        assert!(matches!(err, PrefectError::AuthenticationFailed { .. }));
        assert_eq!(err.body(), Some(&reply));
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn test_authenticate_missing_credentials() {
        let (mock, session) = mock_session();
        let source = CredentialSource::file("/nonexistent/myfordmobile.json");

        let err = session.authenticate(&source).await.unwrap_err();
        assert!(matches!(err, PrefectError::CredentialsMissing(_)));

        let err = session.login("", "").await.unwrap_err();
        assert!(matches!(err, PrefectError::CredentialsMissing(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reauthentication_clears_selection() {
        let (_mock, session) = authenticated_session().await;
        session.select_vehicle("VIN1").await.unwrap();
        assert_eq!(
            session.state(),
            SessionState::VehicleSelected("VIN1".into())
        );

        session.login("u", "p").await.unwrap();
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[tokio::test]
    async fn test_transport_failure_is_not_domain_error() {
        let (mock, session) = mock_session();
        mock.enqueue_failure(Endpoint::Login, "connection refused");
        let err = session.login("u", "p").await.unwrap_err();
        assert!(err.is_transport());
    }

    // =========================================================================
    // Guards
    // =========================================================================

    #[tokio::test]
    async fn test_operations_require_authentication() {
        let (mock, session) = mock_session();

        assert!(matches!(
            session.vehicle_snapshots().await,
            Err(PrefectError::NotAuthenticated)
        ));
        assert!(matches!(
            session.select_vehicle("VIN1").await,
            Err(PrefectError::NotAuthenticated)
        ));
        assert!(matches!(
            session.send_command(&LookupCode::Start).await,
            Err(PrefectError::NotAuthenticated)
        ));
        assert!(mock.calls().is_empty());
    }

    // =========================================================================
    // Vehicle Listing
    // =========================================================================

    #[tokio::test]
    async fn test_bare_object_and_array_normalize_identically() {
        let (mock, session) = authenticated_session().await;
        let vehicle = json!({"vin": "X", "nickName": "Blue", "odometer": "100.5"});

        mock.enqueue(Endpoint::EnergyReport, json!({"response": vehicle.clone()}));
        mock.enqueue(Endpoint::EnergyReport, json!({"response": [vehicle]}));

        let from_object = session.vehicle_snapshots().await.unwrap();
        let from_array = session.vehicle_snapshots().await.unwrap();

        assert_eq!(from_object.len(), 1);
        assert_eq!(from_object, from_array);
        assert_eq!(from_object[0].vin, "X");
    }

    #[tokio::test]
    async fn test_list_vehicles_multiple() {
        let (mock, session) = authenticated_session().await;
        mock.respond(
            Endpoint::EnergyReport,
            json!({"response": [{"vin": "A"}, {"vin": "B"}]}),
        );

        let vehicles = session.list_vehicles().await.unwrap();
        let vins: Vec<_> = vehicles.iter().map(|v| v.vin().to_string()).collect();
        assert_eq!(vins, vec!["A", "B"]);
        assert!(Arc::ptr_eq(vehicles[0].session(), &session));
    }

    #[tokio::test]
    async fn test_list_vehicles_missing_response_key() {
        let (mock, session) = authenticated_session().await;
        let reply = json!({"getAllVehiclesResponse": []});
        mock.respond(Endpoint::EnergyReport, reply.clone());

        let err = session.vehicle_snapshots().await.unwrap_err();
        assert!(matches!(err, PrefectError::RequestFailed { .. }));
        assert_eq!(err.body(), Some(&reply));
    }

    #[tokio::test]
    async fn test_list_vehicles_malformed_entry() {
        let (mock, session) = authenticated_session().await;
        mock.respond(
            Endpoint::EnergyReport,
            json!({"response": [{"vin": "A"}, {"nickName": "no vin"}]}),
        );
        assert!(matches!(
            session.vehicle_snapshots().await,
            Err(PrefectError::RequestFailed { .. })
        ));
    }

    #[tokio::test]
    async fn test_vehicle_lookup_by_vin() {
        let (mock, session) = authenticated_session().await;
        mock.respond(Endpoint::EnergyReport, json!({"response": {"vin": "A"}}));

        assert_eq!(session.vehicle("A").await.unwrap().vin(), "A");
        assert!(matches!(
            session.vehicle("B").await,
            Err(PrefectError::VehicleNotFound(vin)) if vin == "B"
        ));
    }

    // =========================================================================
    // Selection
    // =========================================================================

    #[tokio::test]
    async fn test_select_vehicle_reports_boolean() {
        let (mock, session) = authenticated_session().await;

        mock.enqueue(Endpoint::SetActiveVehicle, json!({"error": "unknown VIN"}));
        assert!(!session.select_vehicle("NOPE").await.unwrap());
        assert_eq!(session.active_vehicle(), None);

        assert!(session.select_vehicle("VIN1").await.unwrap());
        assert_eq!(session.active_vehicle().as_deref(), Some("VIN1"));
        assert_eq!(mock.calls()[1].param("VIN"), Some("VIN1"));
    }

    #[tokio::test]
    async fn test_select_overwrites_cached_vehicle() {
        let (_mock, session) = authenticated_session().await;
        session.select_vehicle("A").await.unwrap();
        session.select_vehicle("B").await.unwrap();
        assert_eq!(session.state(), SessionState::VehicleSelected("B".into()));
    }

    // =========================================================================
    // Commands
    // =========================================================================

    #[tokio::test]
    async fn test_send_command_error_key() {
        let (mock, session) = authenticated_session().await;
        mock.respond(Endpoint::AddCommand, json!({"error": "session expired"}));

        let err = session.send_command(&LookupCode::Start).await.unwrap_err();
        assert!(matches!(err, PrefectError::CommandRejected { .. }));
        assert_eq!(err.body(), Some(&json!({"error": "session expired"})));
    }

    #[tokio::test]
    async fn test_send_command_400_status() {
        let (mock, session) = authenticated_session().await;
        mock.respond(Endpoint::AddCommand, json!({"status": "400 Bad Request"}));

        let err = session.send_command(&LookupCode::Start).await.unwrap_err();
        assert!(matches!(err, PrefectError::CommandFailed { .. }));
    }

    #[tokio::test]
    async fn test_send_command_returns_body_unchanged() {
        let (mock, session) = authenticated_session().await;
        let reply = json!({"status": "200 OK", "jobId": "123"});
        mock.respond(Endpoint::AddCommand, reply.clone());

        let result = session.send_command(&LookupCode::Unlock).await.unwrap();
        assert_eq!(result, reply);
        assert_eq!(mock.calls()[0].param("LOOKUPCODE"), Some("UNLOCK_CMD"));
    }

    #[tokio::test]
    async fn test_custom_lookup_code() {
        let (mock, session) = authenticated_session().await;
        session
            .send_command(&LookupCode::Other("HONK_CMD".into()))
            .await
            .unwrap();
        assert_eq!(mock.calls()[0].param("LOOKUPCODE"), Some("HONK_CMD"));
    }

    #[tokio::test]
    async fn test_command_vehicle_selects_then_commands() {
        let (mock, session) = authenticated_session().await;

        session
            .command_vehicle("VIN1", &LookupCode::Lock)
            .await
            .unwrap();

        assert_eq!(
            mock.endpoints(),
            vec![Endpoint::SetActiveVehicle, Endpoint::AddCommand]
        );
        assert_eq!(session.active_vehicle().as_deref(), Some("VIN1"));
    }

    #[tokio::test]
    async fn test_command_vehicle_stops_on_refused_selection() {
        let (mock, session) = authenticated_session().await;
        mock.enqueue(Endpoint::SetActiveVehicle, json!({"error": "not yours"}));

        let err = session
            .command_vehicle("VIN1", &LookupCode::Start)
            .await
            .unwrap_err();

        assert!(matches!(err, PrefectError::CommandRejected { .. }));
        assert_eq!(err.body(), Some(&json!({"error": "not yours"})));
        assert_eq!(mock.endpoints(), vec![Endpoint::SetActiveVehicle]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_relogin_does_not_split_command_pair() {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_millis(50)));
        mock.enqueue(Endpoint::Login, json!({"response": {"authToken": "tok-1"}}));
        mock.enqueue(Endpoint::Login, json!({"response": {"authToken": "tok-2"}}));
        let session = Arc::new(Session::with_transport(mock.clone()));
        session.login("u", "p").await.unwrap();

        let relogin = {
            let session = Arc::clone(&session);
            tokio::spawn(async move { session.login("u", "p").await.unwrap() })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        session
            .command_vehicle("VIN1", &LookupCode::Start)
            .await
            .unwrap();
        relogin.await.unwrap();

        let calls = mock.calls();
        let select = calls
            .iter()
            .position(|c| c.endpoint == Endpoint::SetActiveVehicle)
            .unwrap();
        assert_eq!(calls[select + 1].endpoint, Endpoint::AddCommand);
        assert_eq!(
            calls[select].param("SESSIONID"),
            calls[select + 1].param("SESSIONID")
        );
        assert_eq!(calls[select].param("SESSIONID"), Some("tok-2"));
        assert_eq!(session.state(), SessionState::VehicleSelected("VIN1".into()));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_relogin_waits_for_inflight_pair() {
        let mock = Arc::new(MockTransport::new().with_delay(Duration::from_millis(50)));
        mock.enqueue(Endpoint::Login, json!({"response": {"authToken": "tok-1"}}));
        mock.enqueue(Endpoint::Login, json!({"response": {"authToken": "tok-2"}}));
        let session = Arc::new(Session::with_transport(mock.clone()));
        session.login("u", "p").await.unwrap();

        let pair = {
            let session = Arc::clone(&session);
            tokio::spawn(async move {
                session
                    .command_vehicle("VIN1", &LookupCode::Lock)
                    .await
                    .unwrap()
            })
        };
        tokio::time::sleep(Duration::from_millis(10)).await;
        session.login("u", "p").await.unwrap();
        pair.await.unwrap();

        assert_eq!(
            mock.endpoints(),
            vec![
                Endpoint::Login,
                Endpoint::SetActiveVehicle,
                Endpoint::AddCommand,
                Endpoint::Login
            ]
        );
        let calls = mock.calls();
        assert_eq!(calls[1].param("SESSIONID"), Some("tok-1"));
        assert_eq!(calls[2].param("SESSIONID"), Some("tok-1"));
        // The new token has not selected anything yet
        assert_eq!(session.state(), SessionState::Authenticated);
    }

    #[test]
    fn test_status_classification() {
        assert!(is_client_error_status(&json!({"status": "400"})));
        assert!(is_client_error_status(&json!({"status": "400 Bad Request"})));
        assert!(is_client_error_status(&json!({"status": "404 Not Found"})));
        assert!(is_client_error_status(&json!({"status": "Status 422"})));
        assert!(is_client_error_status(&json!({"status": 404})));
        assert!(!is_client_error_status(&json!({"status": "500 Internal Error"})));
        assert!(!is_client_error_status(&json!({"status": "job 4000 queued"})));
        assert!(!is_client_error_status(&json!({"status": "200 OK"})));
        assert!(!is_client_error_status(&json!({"status": 200})));
        assert!(!is_client_error_status(&json!({"jobId": "1"})));
    }

    #[test]
    fn test_debug_hides_token() {
        let session = Session::with_transport(Arc::new(MockTransport::new()));
        *session.auth_token.write() = Some(MOCK_AUTH_TOKEN.to_string());
        let rendered = format!("{:?}", session);
        assert!(!rendered.contains(MOCK_AUTH_TOKEN));
        assert!(rendered.contains("authenticated: true"));
    }
}
