//! Out-of-process collaborators: a leaf-scoring oracle and an action
//! proposer, both behind narrow async traits. The search never cares which
//! backend answers.

use crate::ai::predictor::{MoveCandidate, MovePredictor, PredictionRequest};
use crate::battle::state::BattleState;
use crate::errors::{OracleError, OracleResult};
use crate::player::ChosenAction;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::Duration;
use tracing::debug;

/// An oracle's verdict on a position, 1..=100, higher favoring the perspective side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeafScore {
    pub score: u8,
    /// Free text for logs. Never read by the search.
    #[serde(default)]
    pub justification: Option<String>,
}

#[async_trait]
pub trait LeafEvaluator: Send + Sync {
    async fn score(&self, state: &BattleState, perspective: usize) -> OracleResult<LeafScore>;
}

/// Suggests extra candidate actions for the searching side.
#[async_trait]
pub trait ActionProposer: Send + Sync {
    async fn propose(
        &self,
        state: &BattleState,
        side: usize,
        count: usize,
    ) -> OracleResult<Vec<ChosenAction>>;
}

/// Runs `call`, turning an elapsed deadline into [`OracleError::Timeout`].
pub async fn with_timeout<T, F>(limit: Duration, call: F) -> OracleResult<T>
where
    F: Future<Output = OracleResult<T>>,
{
    match tokio::time::timeout(limit, call).await {
        Ok(result) => result,
        Err(_) => Err(OracleError::Timeout(limit)),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombatantSummary {
    pub species: String,
    pub hp: u16,
    pub max_hp: u16,
    pub status: Option<String>,
    pub moves: Vec<String>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SideSummary {
    pub name: String,
    pub roster: Vec<CombatantSummary>,
    pub reflect: bool,
    pub light_screen: bool,
    pub stealth_rock: bool,
    pub spikes: u8,
}

/// What an oracle is shown: the visible state plus the recent narrative.
/// Unseen opponent slots are left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StateSummary {
    pub turn: u32,
    pub perspective: usize,
    pub weather: String,
    pub sides: Vec<SideSummary>,
    pub recent_events: Vec<String>,
}

impl StateSummary {
    pub fn from_state(state: &BattleState, perspective: usize) -> Self {
        let sides = state
            .sides
            .iter()
            .enumerate()
            .map(|(index, side)| SideSummary {
                name: side.name.clone(),
                roster: side
                    .roster
                    .iter()
                    .enumerate()
                    .filter(|(_, c)| index == perspective || c.revealed)
                    .map(|(slot, c)| CombatantSummary {
                        species: c.species.to_string(),
                        hp: c.current_hp,
                        max_hp: c.max_hp(),
                        status: c.status.map(|s| s.to_string()),
                        moves: c.move_ids().map(|id| id.to_string()).collect(),
                        active: slot == side.active,
                    })
                    .collect(),
                reflect: side.conditions.reflect > 0,
                light_screen: side.conditions.light_screen > 0,
                stealth_rock: side.conditions.stealth_rock,
                spikes: side.conditions.spikes,
            })
            .collect();

        Self {
            turn: state.turn,
            perspective,
            weather: state.field.weather.to_string(),
            sides,
            recent_events: state.transcript(),
        }
    }
}

#[derive(Deserialize)]
struct ScoreReply {
    score: i64,
    #[serde(default)]
    justification: Option<String>,
}

fn first_integer(text: &str) -> Option<i64> {
    let start = text.find(|c: char| c.is_ascii_digit())?;
    let digits: String = text[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    let value: i64 = digits.parse().ok()?;
    let negative = text[..start].ends_with('-');
    Some(if negative { -value } else { value })
}

/// Reads an oracle reply: `{"score": n, "justification": "..."}` or any text
/// whose first integer is the score. Scores outside 1..=100 are malformed.
pub fn parse_leaf_score(text: &str) -> OracleResult<LeafScore> {
    let (raw, justification) = match serde_json::from_str::<ScoreReply>(text.trim()) {
        Ok(reply) => (reply.score, reply.justification),
        Err(_) => {
            let score = first_integer(text).ok_or_else(|| {
                OracleError::Malformed(format!("no score in {:?}", truncate(text)))
            })?;
            (score, Some(text.trim().to_string()).filter(|t| !t.is_empty()))
        }
    };
    if !(1..=100).contains(&raw) {
        return Err(OracleError::Malformed(format!("score {} outside 1..=100", raw)));
    }
    Ok(LeafScore {
        score: raw as u8,
        justification,
    })
}

fn truncate(text: &str) -> String {
    text.chars().take(80).collect()
}

fn transport(err: reqwest::Error) -> OracleError {
    if err.is_timeout() {
        OracleError::Timeout(Duration::ZERO)
    } else {
        OracleError::Transport(err.to_string())
    }
}

/// JSON-over-HTTP backend for every oracle role.
///
/// `POST {base}/score` with a [`StateSummary`], `POST {base}/predict` with a
/// [`PredictionRequest`], `POST {base}/propose` with a summary and a count.
#[derive(Debug, Clone)]
pub struct HttpOracle {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Serialize)]
struct ProposalRequest<'a> {
    summary: &'a StateSummary,
    count: usize,
}

impl HttpOracle {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    async fn post<B: Serialize + ?Sized>(&self, path: &str, body: &B) -> OracleResult<String> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(%url, "oracle request");
        self.client
            .post(&url)
            .json(body)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(transport)?
            .text()
            .await
            .map_err(transport)
    }
}

#[async_trait]
impl LeafEvaluator for HttpOracle {
    async fn score(&self, state: &BattleState, perspective: usize) -> OracleResult<LeafScore> {
        let summary = StateSummary::from_state(state, perspective);
        let body = self.post("score", &summary).await?;
        parse_leaf_score(&body)
    }
}

#[async_trait]
impl MovePredictor for HttpOracle {
    async fn predict(&self, request: &PredictionRequest) -> OracleResult<Vec<MoveCandidate>> {
        let body = self.post("predict", request).await?;
        serde_json::from_str(&body).map_err(|err| OracleError::Malformed(err.to_string()))
    }
}

#[async_trait]
impl ActionProposer for HttpOracle {
    async fn propose(
        &self,
        state: &BattleState,
        side: usize,
        count: usize,
    ) -> OracleResult<Vec<ChosenAction>> {
        let summary = StateSummary::from_state(state, side);
        let request = ProposalRequest {
            summary: &summary,
            count,
        };
        let body = self.post("propose", &request).await?;
        let proposals: Vec<ChosenAction> =
            serde_json::from_str(&body).map_err(|err| OracleError::Malformed(err.to_string()))?;
        Ok(proposals.into_iter().take(count).collect())
    }
}
