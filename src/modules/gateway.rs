use std::time::Duration;

use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::modules::config::{AuthMode, CycleConfig};
use crate::modules::error::{BotError, BotResult};
use crate::modules::session::{Credentials, Remote};
use crate::modules::supervisor::Connector;
use crate::modules::types::{
    CatchStatus, Checkpoint, CheckpointInfo, CheckpointReward, CreatureId, Encounter,
    EvolveOutcome, InventorySnapshot, ItemKind, Location, MapSnapshot, WildSighting,
};

/// JSON gateway that speaks the game protocol on our behalf.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    login_host: String,
    api_host: Option<String>,
    token: Option<String>,
    http: Client,
}

#[derive(Debug, Deserialize)]
struct Envelope {
    ok: bool,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RemoteFault>,
}

#[derive(Debug, Deserialize)]
struct RemoteFault {
    kind: String,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    provider: &'a str,
    username: &'a str,
    secret: &'a str,
    device_id: String,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    token: String,
}

#[derive(Debug, Deserialize)]
struct ServerReply {
    endpoint: String,
}

#[derive(Debug, Deserialize)]
struct CatchReply {
    status: CatchStatus,
}

impl HttpGateway {
    pub fn new(host: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            login_host: host.into(),
            api_host: None,
            token: None,
            http,
        })
    }

    fn url(&self, method: &str) -> String {
        let host = self.api_host.as_deref().unwrap_or(&self.login_host);
        format!("{}/{}", host.trim_end_matches('/'), method)
    }

    fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> BotResult<T> {
        let mut request = self.http.post(self.url(method)).json(&body);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let resp = request.send().map_err(|e| transport_error(method, e))?;
        let status = resp.status();
        let raw_body = resp.text().map_err(|e| transport_error(method, e))?;
        debug!(method, %status, bytes = raw_body.len(), "gateway reply");

        decode_envelope(method, &raw_body)
    }

    /// Calls whose reply carries nothing beyond success.
    fn call_ack(&self, method: &str, body: Value) -> BotResult<()> {
        let _: Option<Value> = self.call(method, body)?;
        Ok(())
    }
}

fn transport_error(method: &str, err: reqwest::Error) -> BotError {
    if err.is_timeout() {
        BotError::Timeout {
            method: method.to_string(),
        }
    } else if err.is_decode() {
        BotError::MalformedResponse {
            method: method.to_string(),
            reason: err.to_string(),
        }
    } else {
        BotError::Transport {
            method: method.to_string(),
            reason: err.to_string(),
        }
    }
}

fn decode_envelope<T: DeserializeOwned>(method: &str, raw_body: &str) -> BotResult<T> {
    let envelope: Envelope =
        serde_json::from_str(raw_body).map_err(|e| BotError::MalformedResponse {
            method: method.to_string(),
            reason: e.to_string(),
        })?;

    if !envelope.ok {
        let fault = envelope.error.unwrap_or(RemoteFault {
            kind: "unknown".into(),
            message: String::new(),
        });
        return Err(fault_error(method, fault));
    }

    // Acks decode as `Option<Value>` and accept an absent result.
    let result = envelope.result.unwrap_or(Value::Null);
    let absent = result.is_null();
    serde_json::from_value(result).map_err(|e| {
        if absent {
            BotError::MissingField {
                method: method.to_string(),
                field: "result".into(),
            }
        } else {
            BotError::MalformedResponse {
                method: method.to_string(),
                reason: e.to_string(),
            }
        }
    })
}

fn fault_error(method: &str, fault: RemoteFault) -> BotError {
    match fault.kind.as_str() {
        "token_expired" => BotError::AccessTokenExpired,
        "invalid_argument" => BotError::InvalidArgument(format!("{}: {}", method, fault.message)),
        "rejected" => BotError::rejected(method, fault.message),
        _ => BotError::invalid_response(method, format!("{}: {}", fault.kind, fault.message)),
    }
}

/// Stable per-account device id so the server sees one handset.
pub fn device_id(username: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(b"fieldrunner-device:");
    hasher.update(username.trim().to_lowercase().as_bytes());
    hex::encode(&hasher.finalize()[..16])
}

fn auth_provider(auth: AuthMode) -> &'static str {
    match auth {
        AuthMode::Ptc => "ptc",
        AuthMode::Google => "google",
    }
}

impl Remote for HttpGateway {
    fn login(&mut self, credentials: &Credentials) -> BotResult<()> {
        self.token = None;
        self.api_host = None;
        let body = LoginRequest {
            provider: auth_provider(credentials.auth),
            username: &credentials.username,
            secret: &credentials.secret,
            device_id: device_id(&credentials.username),
        };
        let body = serde_json::to_value(&body)
            .map_err(|e| BotError::InvalidArgument(format!("encode login: {}", e)))?;
        let reply: LoginReply = self.call("login", body)?;
        self.token = Some(reply.token);
        Ok(())
    }

    fn resolve_server(&mut self) -> BotResult<String> {
        let reply: ServerReply = self.call("resolve_server", json!({}))?;
        if reply.endpoint.trim().is_empty() {
            return Err(BotError::invalid_response("resolve_server", "empty endpoint"));
        }
        self.api_host = Some(reply.endpoint.clone());
        Ok(reply.endpoint)
    }

    fn report_position(&mut self, at: Location) -> BotResult<()> {
        self.call_ack("report_position", json!({ "lat": at.lat, "lng": at.lng }))
    }

    fn map_snapshot(&mut self, at: Location) -> BotResult<MapSnapshot> {
        self.call("map_snapshot", json!({ "lat": at.lat, "lng": at.lng }))
    }

    fn encounter(&mut self, sighting: &WildSighting) -> BotResult<Encounter> {
        self.call(
            "encounter",
            json!({
                "encounter_id": sighting.encounter_id,
                "spawn_point": sighting.spawn_point,
            }),
        )
    }

    fn throw_ball(&mut self, sighting: &WildSighting, ball: ItemKind) -> BotResult<CatchStatus> {
        let reply: CatchReply = self.call(
            "catch",
            json!({
                "encounter_id": sighting.encounter_id,
                "spawn_point": sighting.spawn_point,
                "lat": sighting.location.lat,
                "lng": sighting.location.lng,
                "ball": ball,
            }),
        )?;
        Ok(reply.status)
    }

    fn use_capture_aid(&mut self, sighting: &WildSighting, item: ItemKind) -> BotResult<()> {
        self.call_ack(
            "use_capture_item",
            json!({
                "encounter_id": sighting.encounter_id,
                "spawn_point": sighting.spawn_point,
                "item": item,
            }),
        )
    }

    fn evolve(&mut self, creature: CreatureId) -> BotResult<EvolveOutcome> {
        self.call("evolve", json!({ "creature_id": creature }))
    }

    fn transfer(&mut self, creature: CreatureId) -> BotResult<()> {
        self.call_ack("transfer", json!({ "creature_id": creature }))
    }

    fn recycle(&mut self, item: ItemKind, count: u32) -> BotResult<()> {
        self.call_ack("recycle", json!({ "item": item, "count": count }))
    }

    fn checkpoint_info(&mut self, checkpoint: &Checkpoint) -> BotResult<CheckpointInfo> {
        self.call(
            "checkpoint_info",
            json!({
                "id": checkpoint.id,
                "lat": checkpoint.location.lat,
                "lng": checkpoint.location.lng,
            }),
        )
    }

    fn interact_checkpoint(&mut self, checkpoint: &Checkpoint) -> BotResult<CheckpointReward> {
        self.call(
            "search_checkpoint",
            json!({
                "id": checkpoint.id,
                "lat": checkpoint.location.lat,
                "lng": checkpoint.location.lng,
            }),
        )
    }

    fn inventory(&mut self) -> BotResult<InventorySnapshot> {
        self.call("inventory", json!({}))
    }
}

/// Builds a fresh [`HttpGateway`] for every session attempt.
#[derive(Debug, Clone)]
pub struct GatewayConnector {
    host: String,
    timeout: Duration,
}

impl GatewayConnector {
    pub fn from_config(config: &CycleConfig) -> Self {
        Self {
            host: config.gateway_url.clone(),
            timeout: Duration::from_millis(config.request_timeout_ms.max(1)),
        }
    }
}

impl Connector for GatewayConnector {
    fn connect(&mut self) -> BotResult<Box<dyn Remote>> {
        let gateway = HttpGateway::new(self.host.clone(), self.timeout)
            .map_err(|e| BotError::Config(format!("failed to build http client: {e}")))?;
        Ok(Box::new(gateway))
    }
}
