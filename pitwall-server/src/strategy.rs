//! Strategy requests
//!
//! A [`StrategyProvider`] turns the current metrics into a natural-language
//! recommendation. Requests run detached from the telemetry loop and may
//! overlap, so every request carries a generation ticket from the
//! [`StrategyBoard`] and results older than the applied one are dropped.

use crate::config::LlmConfig;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use pitwall_core::{DrivingStyle, RaceMetrics, StrategyInsight, TelemetryPoint};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum StrategyError {
    #[error("no API key configured")]
    MissingApiKey,

    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("malformed response: {0}")]
    Malformed(String),
}

#[async_trait]
pub trait StrategyProvider: Send + Sync {
    /// Short name for logs
    fn name(&self) -> &str;

    async fn request_strategy(
        &self,
        metrics: &RaceMetrics,
        latest: &TelemetryPoint,
        driver_name: &str,
    ) -> Result<StrategyInsight, StrategyError>;
}

// === LLM client ===

const SYSTEM_PROMPT: &str = "You are a race engineer for a one-make GR Cup team. \
Analyze live telemetry and give short, actionable strategy calls. \
Respond ONLY with a JSON object matching the requested schema.";

/// Strategy from an OpenAI-compatible chat completions endpoint
pub struct LlmStrategyClient {
    client: reqwest::Client,
    config: LlmConfig,
}

impl LlmStrategyClient {
    pub fn new(config: LlmConfig) -> Result<Self, StrategyError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    content: Option<String>,
}

#[async_trait]
impl StrategyProvider for LlmStrategyClient {
    fn name(&self) -> &str {
        &self.config.model
    }

    async fn request_strategy(
        &self,
        metrics: &RaceMetrics,
        latest: &TelemetryPoint,
        driver_name: &str,
    ) -> Result<StrategyInsight, StrategyError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .ok_or(StrategyError::MissingApiKey)?;

        let prompt = build_prompt(metrics, latest, driver_name);
        let request = ChatRequest {
            model: &self.config.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
            response_format: ResponseFormat {
                kind: "json_object",
            },
        };

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StrategyError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let reply: ChatResponse = response.json().await?;
        let content = reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| StrategyError::Malformed("no content in response".to_string()))?;

        parse_insight(&content)
    }
}

/// User prompt describing the race state
pub fn build_prompt(metrics: &RaceMetrics, latest: &TelemetryPoint, driver_name: &str) -> String {
    let tire_note = if metrics.tire_stress_index > 70 {
        "(HIGH - risk of tire degradation)"
    } else {
        "(normal)"
    };
    let overtake_note = if metrics.overtake_risk_score > 50 {
        "(moderate-high - passing opportunity)"
    } else {
        "(low)"
    };
    let attack = if metrics.attack_window {
        "OPEN - driver can push"
    } else {
        "CLOSED - hold pace"
    };
    let fuel = if metrics.fuel_conservation_mode {
        "ACTIVE - saving fuel"
    } else {
        "normal"
    };
    let pace_note = if metrics.lap_pace_trend > 0.5 {
        "(slowing - consider pit)"
    } else {
        "(holding pace)"
    };

    format!(
        "Analyze the current race state and recommend a strategy.\n\n\
         DRIVER: {driver_name}\n\
         CURRENT LAP: {lap}\n\
         POSITION: P{position}\n\n\
         METRICS:\n\
         - Tire stress index: {tsi}/100 {tire_note}\n\
         - Overtake risk score: {ors}/100 {overtake_note}\n\
         - Attack window: {attack}\n\
         - Fuel conservation: {fuel}\n\
         - Weather risk: {weather:.0}/100\n\
         - Lap pace trend: {trend:+.2}s {pace_note}\n\
         - Brake stress: {brake}\n\n\
         RULES:\n\
         1. drivingStyle is exactly one of \"Aggressive\", \"Balanced\", \"Conservative\". \
         Aggressive when the attack window is open and tire stress is below 70; \
         Conservative when tire stress is above 70 or fuel conservation is active; \
         Balanced otherwise.\n\
         2. riskAlertSummary: one sentence naming the primary concern.\n\
         3. suggestedAction: one specific instruction for this lap.\n\
         4. pitStrategy: recommend a pit window if pace trend exceeds 0.5s, \
         tire management or an early stop if tire stress exceeds 80, \
         otherwise \"Stay out - pace is stable\".\n\n\
         Respond with JSON only:\n\
         {{\"drivingStyle\": \"...\", \"riskAlertSummary\": \"...\", \
         \"suggestedAction\": \"...\", \"pitStrategy\": \"...\"}}",
        lap = latest.lap,
        position = latest.position,
        tsi = metrics.tire_stress_index,
        ors = metrics.overtake_risk_score,
        weather = metrics.weather_risk,
        trend = metrics.lap_pace_trend,
        brake = metrics.brake_stress,
    )
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct InsightReply {
    #[serde(alias = "driverStyle", alias = "driving_style")]
    driving_style: Option<String>,
    #[serde(alias = "risk_alert_summary")]
    risk_alert_summary: Option<String>,
    #[serde(alias = "suggested_action")]
    suggested_action: Option<String>,
    #[serde(alias = "pit_strategy")]
    pit_strategy: Option<String>,
}

/// Parse the model's JSON reply. Unknown styles become Balanced and missing
/// text fields get neutral wording.
pub fn parse_insight(content: &str) -> Result<StrategyInsight, StrategyError> {
    let reply: InsightReply =
        serde_json::from_str(content.trim()).map_err(|e| StrategyError::Malformed(e.to_string()))?;

    let text = |value: Option<String>, default: &str| {
        value
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| default.to_string())
    };

    Ok(StrategyInsight {
        driving_style: reply
            .driving_style
            .and_then(|s| s.parse().ok())
            .unwrap_or(DrivingStyle::Balanced),
        risk_alert_summary: text(reply.risk_alert_summary, "Monitoring race conditions"),
        suggested_action: text(reply.suggested_action, "Maintain current pace"),
        pit_strategy: text(reply.pit_strategy, "Stay out - monitoring"),
    })
}

// === Strategy board ===

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyOrigin {
    Llm,
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedStrategy {
    pub insight: StrategyInsight,
    pub origin: StrategyOrigin,
    pub generation: u64,
    pub updated_at: DateTime<Utc>,
}

/// Generation of one strategy request
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct StrategyTicket(u64);

impl StrategyTicket {
    pub fn generation(&self) -> u64 {
        self.0
    }
}

#[derive(Default)]
struct BoardInner {
    issued: u64,
    /// Tickets at or below this generation are void
    floor: u64,
    current: Option<AppliedStrategy>,
}

/// The displayed strategy. Once set it is only ever replaced, never cleared.
#[derive(Default)]
pub struct StrategyBoard {
    inner: Mutex<BoardInner>,
}

impl StrategyBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn issue(&self) -> StrategyTicket {
        let mut inner = self.inner.lock();
        inner.issued += 1;
        StrategyTicket(inner.issued)
    }

    /// Void every ticket issued so far. Their results are discarded when
    /// they land; the displayed strategy stays until a newer one replaces it.
    pub fn invalidate(&self) {
        let mut inner = self.inner.lock();
        inner.floor = inner.issued;
    }

    /// True while nothing is displayed and no valid request is outstanding
    pub fn awaiting_first(&self) -> bool {
        let inner = self.inner.lock();
        inner.current.is_none() && inner.issued == inner.floor
    }

    /// Apply a result unless it was voided or a newer request already
    /// landed. Returns whether it was applied.
    pub fn apply(
        &self,
        ticket: StrategyTicket,
        insight: StrategyInsight,
        origin: StrategyOrigin,
    ) -> bool {
        let mut inner = self.inner.lock();
        if ticket.0 <= inner.floor {
            debug!("Discarding voided strategy #{}", ticket.0);
            return false;
        }
        if let Some(current) = &inner.current {
            if current.generation >= ticket.0 {
                debug!(
                    "Discarding stale strategy #{} (showing #{})",
                    ticket.0, current.generation
                );
                return false;
            }
        }

        inner.current = Some(AppliedStrategy {
            insight,
            origin,
            generation: ticket.0,
            updated_at: Utc::now(),
        });
        true
    }

    pub fn current(&self) -> Option<AppliedStrategy> {
        self.inner.lock().current.clone()
    }
}
