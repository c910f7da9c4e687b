// portal.rs - Wallet flows
//
// Client-side half of claim-code redemption (Phantom) and Name-NFT
// migration (MetaMask). Wallet extensions and fetch stay in JS; this
// module owns validation, request bodies, response parsing and the
// status lines shown to the player.

use std::fmt;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use serde::de::DeserializeOwned;
use serde::ser::{SerializeStruct, Serializer};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use wasm_bindgen::prelude::*;

pub const DEFAULT_API_BASE: &str = "https://epochstower-git-dev-aeonsmashs-projects.vercel.app/api";
/// Where the "Play in Decentraland" button goes
pub const DCL_URL: &str = "https://decentraland.org/play/?position=%3D-92%2C73";

/// Signed right after connecting Phantom. Failure to sign is not fatal.
pub const PHANTOM_LINK_MESSAGE: &str = "Epoch The Endless Tower: Link your wallet to access the game.";

/// Browser wallet extensions the page talks to
#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Extension {
    Phantom,
    MetaMask,
}

impl Extension {
    fn missing(self) -> &'static str {
        match self {
            Extension::Phantom => "Phantom wallet not found. Install Phantom and refresh.",
            Extension::MetaMask => {
                "MetaMask not found. Please install MetaMask to connect your Ethereum wallet."
            }
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FlowError {
    #[error("{}", .0.missing())]
    ExtensionMissing(Extension),
    #[error("Please enter your claim code.")]
    MissingClaimCode,
    #[error("Please enter your migration token.")]
    MissingToken,
    #[error("Please connect your Ethereum wallet first.")]
    WalletNotConnected,
    #[error("Name NFT verification failed. Please reconnect your wallet.")]
    NameNotVerified,
    #[error("No accounts found. Please unlock MetaMask.")]
    NoAccounts,
    #[error("Could not verify Name NFT ownership. Make sure you own a Decentraland Name NFT.")]
    VerifyFailed,
    #[error("This wallet does not own a Decentraland Name NFT. Please connect a wallet that owns one.")]
    NoNameNft,
    #[error("Server error: {status} {body}")]
    Server { status: u16, body: String },
    #[error("Unexpected response: {0}")]
    Response(String),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Success,
    Error,
}

impl Level {
    pub fn icon(self) -> &'static str {
        match self {
            Level::Info => "⏳",
            Level::Success => "✅",
            Level::Error => "❌",
        }
    }
}

/// One status line. `level` doubles as the CSS modifier class. Serializes
/// as `{level, message, text}` where `text` carries the icon prefix.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Status {
    pub level: Level,
    pub message: String,
}

impl Status {
    pub fn info(message: impl Into<String>) -> Self {
        Self { level: Level::Info, message: message.into() }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self { level: Level::Success, message: message.into() }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self { level: Level::Error, message: message.into() }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.level.icon(), self.message)
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut st = serializer.serialize_struct("Status", 3)?;
        st.serialize_field("level", &self.level)?;
        st.serialize_field("message", &self.message)?;
        st.serialize_field("text", &self.to_string())?;
        st.end()
    }
}

impl From<FlowError> for Status {
    fn from(err: FlowError) -> Self {
        log::info!("flow rejected: {err}");
        Status::error(err.to_string())
    }
}

/// Long-running steps the page reports while it waits on a wallet or fetch
#[wasm_bindgen]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Step {
    OpeningPhantom,
    SendingClaim,
    ConnectingMetaMask,
    VerifyingName,
    Migrating,
}

impl Step {
    pub fn status(self) -> Status {
        Status::info(match self {
            Step::OpeningPhantom => "Opening Phantom wallet... Please authorize the connection.",
            Step::SendingClaim => "Sending claim...",
            Step::ConnectingMetaMask => "Connecting to MetaMask...",
            Step::VerifyingName => "Verifying Decentraland Name NFT ownership...",
            Step::Migrating => "Migrating progress...",
        })
    }

    /// Error line for a step that threw. Uses `detail` (the thrown message)
    /// when there is one.
    pub fn failure(self, detail: Option<&str>) -> Status {
        let fallback = match self {
            Step::OpeningPhantom | Step::SendingClaim => "Failed to connect. Check console for details.",
            Step::ConnectingMetaMask | Step::VerifyingName => {
                "Failed to connect wallet. Check console for details."
            }
            Step::Migrating => "Failed to migrate. Check console for details.",
        };
        let message = detail.map(str::trim).filter(|d| !d.is_empty()).unwrap_or(fallback);
        log::info!("{self:?} failed: {message}");
        Status::error(message)
    }
}

/// API routes relative to a configurable base
#[derive(Clone, Debug)]
pub struct Endpoints {
    base: String,
}

impl Endpoints {
    pub fn new(base: &str) -> Self {
        Self { base: base.trim_end_matches('/').to_string() }
    }

    /// `base`, or the production API when it is absent or blank
    pub fn or_default(base: Option<&str>) -> Self {
        base.map(str::trim).filter(|b| !b.is_empty()).map(Self::new).unwrap_or_default()
    }

    pub fn redeem(&self) -> String {
        format!("{}/redeem", self.base)
    }

    pub fn migrate(&self) -> String {
        format!("{}/player/migrate", self.base)
    }

    pub fn verify_name(&self, wallet: &str) -> String {
        format!("{}/player/verify_name_nft?wallet={}", self.base, encode_component(wallet))
    }
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_API_BASE)
    }
}

// Left alone by encodeURIComponent
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

fn encode_component(s: &str) -> String {
    utf8_percent_encode(s, COMPONENT).to_string()
}

/// Decode a JSON body, treating non-2xx statuses as server errors
pub fn parse_response<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, FlowError> {
    if !(200..300).contains(&status) {
        return Err(FlowError::Server { status, body: body.to_string() });
    }
    serde_json::from_str(body).map_err(|e| FlowError::Response(e.to_string()))
}

// ============================================================================
// Claim code redemption
// ============================================================================

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ClaimRequest {
    pub code: String,
    pub wallet: String,
}

impl ClaimRequest {
    pub fn new(code: &str, wallet: &str) -> Result<Self, FlowError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(FlowError::MissingClaimCode);
        }
        Ok(Self { code: code.to_string(), wallet: wallet.to_string() })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct RedeemResponse {
    pub ok: bool,
    #[serde(default)]
    pub signature: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

impl RedeemResponse {
    pub fn status(&self) -> Status {
        if self.ok {
            let tx = self.signature.as_deref().unwrap_or("success");
            Status::success(format!("Claimed! Tx: {tx}"))
        } else {
            Status::error(self.message.as_deref().unwrap_or("Claim failed."))
        }
    }
}

// ============================================================================
// Name NFT migration
// ============================================================================

/// Trimmed and upper-cased, as typed or as taken from `?token=`
pub fn normalize_token(token: &str) -> String {
    token.trim().to_uppercase()
}

/// Pull the first `token` out of a query string such as `?token=abc&x=1`.
/// Keys and values are form-decoded (`%XX`, `+` as space).
pub fn token_from_query(search: &str) -> Option<String> {
    let query = search.strip_prefix('?').unwrap_or(search);
    form_urlencoded::parse(query.as_bytes())
        .find(|(k, _)| k == "token")
        .map(|(_, v)| normalize_token(&v))
        .filter(|t| !t.is_empty())
}

/// `0x1234...abcd`
pub fn short_address(addr: &str) -> String {
    let chars: Vec<char> = addr.chars().collect();
    if chars.len() <= 10 {
        return addr.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct VerifyNameResponse {
    pub ok: bool,
    #[serde(default)]
    pub name: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MigrationRequest {
    pub migration_token: String,
    pub wallet_address: String,
    pub new_decentraland_name: String,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct MigrateResponse {
    pub ok: bool,
    #[serde(default)]
    pub message: Option<String>,
}

impl MigrateResponse {
    pub fn status(&self) -> Status {
        let message = self.message.as_deref();
        if self.ok {
            Status::success(format!(
                "Migration successful!\n\n{}\n\nReturn to Decentraland and enter with your new name to continue playing.",
                message.unwrap_or_default()
            ))
        } else {
            Status::error(message.unwrap_or("Migration failed."))
        }
    }
}

/// Wallet and verified name carried between the connect and migrate clicks
#[derive(Debug, Default)]
pub struct MigrationSession {
    wallet: Option<String>,
    name: Option<String>,
}

impl MigrationSession {
    pub fn wallet(&self) -> Option<&str> {
        self.wallet.as_deref()
    }

    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Take the first account from `eth_requestAccounts`. Forgets any verified name.
    pub fn connect(&mut self, accounts: &[String]) -> Result<&str, FlowError> {
        let first = accounts.first().ok_or(FlowError::NoAccounts)?;
        self.name = None;
        Ok(self.wallet.insert(first.clone()).as_str())
    }

    /// Record the verify_name_nft answer. `status` is the HTTP status.
    pub fn verify(&mut self, status: u16, body: &str) -> Result<&str, FlowError> {
        if self.wallet.is_none() {
            return Err(FlowError::WalletNotConnected);
        }
        let resp: VerifyNameResponse = match parse_response(status, body) {
            Ok(resp) => resp,
            Err(FlowError::Server { .. }) => return Err(FlowError::VerifyFailed),
            Err(e) => return Err(e),
        };
        match resp.name {
            Some(name) if resp.ok && !name.is_empty() => Ok(self.name.insert(name).as_str()),
            _ => Err(FlowError::NoNameNft),
        }
    }

    /// Build the migrate body. Checks run in the order the page reports them.
    pub fn request(&self, token: &str) -> Result<MigrationRequest, FlowError> {
        let token = normalize_token(token);
        if token.is_empty() {
            return Err(FlowError::MissingToken);
        }
        let wallet = self.wallet.as_ref().ok_or(FlowError::WalletNotConnected)?;
        let name = self.name.as_ref().ok_or(FlowError::NameNotVerified)?;

        Ok(MigrationRequest {
            migration_token: token,
            wallet_address: wallet.clone(),
            new_decentraland_name: name.clone(),
        })
    }

    pub fn confirm_prompt(&self) -> Option<String> {
        self.name.as_ref().map(|name| {
            format!(
                "Migrate progress to \"{name}\"?\n\nThis will transfer all your game progress from your free name to this paid name NFT."
            )
        })
    }
}
