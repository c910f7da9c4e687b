use wasm_bindgen::prelude::*;

// ============================================================================
// COUNTDOWN FX - Bloom particles and ripples for the launch countdown
// ============================================================================

pub mod color;
pub mod config;
pub mod countdown;
pub mod driver;
pub mod logging;
pub mod portal;
pub mod render;
pub mod sim;
pub mod stage;

use config::FxConfig;
use driver::{FrameHandle, FrameScheduler};
use portal::{
    ClaimRequest, Endpoints, Extension, FlowError, MigrateResponse, MigrationSession,
    RedeemResponse, Status, Step,
};
use stage::{Channel, Stage};

/// Frame requests routed through two JS callbacks. `request(channel)` must
/// arrange for `FxStage.frame(channel, timestamp)` on the next animation
/// frame and return its numeric id; `cancel(id)` cancels it. A throw or a
/// non-numeric id counts as a refused request.
pub struct JsScheduler {
    channel: u32,
    request: js_sys::Function,
    cancel: js_sys::Function,
}

impl FrameScheduler for JsScheduler {
    fn request_frame(&mut self) -> Option<FrameHandle> {
        match self.request.call1(&JsValue::NULL, &JsValue::from(self.channel)) {
            Ok(id) => {
                let id = id.as_f64();
                if id.is_none() {
                    log::error!("request_frame({}) returned no frame id", self.channel);
                }
                id.map(|id| id as FrameHandle)
            }
            Err(err) => {
                log::error!("request_frame({}) failed: {err:?}", self.channel);
                None
            }
        }
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        if let Err(err) = self.cancel.call1(&JsValue::NULL, &JsValue::from(handle)) {
            log::error!("cancel_frame({handle}) failed: {err:?}");
        }
    }
}

fn to_js(err: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&err.to_string())
}

fn pairs(flat: &[f32]) -> Vec<[f32; 2]> {
    flat.chunks_exact(2).map(|c| [c[0], c[1]]).collect()
}

#[wasm_bindgen(start)]
pub fn start() {
    logging::init(log::LevelFilter::Info);
}

#[wasm_bindgen]
pub fn set_log_level(level: &str) {
    logging::init(logging::parse_level(level));
}

#[wasm_bindgen]
pub struct FxStage {
    inner: Stage<JsScheduler>,
}

#[wasm_bindgen]
impl FxStage {
    /// `config` is an optional JSON document, see `FxConfig`.
    #[wasm_bindgen(constructor)]
    pub fn new(
        request_frame: js_sys::Function,
        cancel_frame: js_sys::Function,
        config: Option<String>,
    ) -> Result<FxStage, JsValue> {
        let config = match config {
            Some(json) => FxConfig::from_json(&json).map_err(|e| {
                log::warn!("rejected fx config: {e}");
                to_js(e)
            })?,
            None => FxConfig::default(),
        };

        let scheduler = |channel: Channel| JsScheduler {
            channel: channel as u32,
            request: request_frame.clone(),
            cancel: cancel_frame.clone(),
        };
        let inner = Stage::new(&config, scheduler(Channel::Particles), scheduler(Channel::Ripples));
        Ok(FxStage { inner })
    }

    pub fn set_target(&mut self, target_ms: f64) {
        self.inner.set_target(target_ms as i64);
    }

    pub fn target_ms(&self) -> f64 {
        self.inner.target_ms() as f64
    }

    /// Poll once a second. `origins` are flattened (x, y) pairs of the lit
    /// dots. Returns true when the minute rolled over and effects fired.
    pub fn countdown_tick(
        &mut self,
        wall_ms: f64,
        now: f64,
        origins: &[f32],
        center_x: f32,
        center_y: f32,
    ) -> bool {
        self.inner.countdown_tick(wall_ms as i64, now, &pairs(origins), [center_x, center_y])
    }

    /// DD HH MM SS as eight digits, from the last countdown_tick
    pub fn digits(&self) -> Vec<u8> {
        self.inner.remaining().digits().to_vec()
    }

    pub fn remaining_text(&self) -> String {
        self.inner.remaining().to_string()
    }

    pub fn emit(&mut self, origins: &[f32], per_origin: u32, now: f64) -> usize {
        self.inner.emit(&pairs(origins), per_origin, now)
    }

    pub fn ripple(&mut self, cx: f32, cy: f32, now: f64) -> u32 {
        self.inner.ripple([cx, cy], now)
    }

    pub fn frame(&mut self, channel: u32, now: f64) {
        match Channel::from_u32(channel) {
            Some(ch) => self.inner.frame(ch, now),
            None => log::warn!("frame for unknown channel {channel}"),
        }
    }

    pub fn stop(&mut self) {
        self.inner.stop();
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }

    pub fn is_running(&self, channel: u32) -> bool {
        Channel::from_u32(channel).is_some_and(|ch| self.inner.is_running(ch))
    }

    // Accessors for WASM
    pub fn particle_count(&self) -> usize { self.inner.particles().effect().body.len() }
    pub fn ripple_count(&self) -> usize { self.inner.ripples().effect().handle.len() }
    pub fn particle_stride(&self) -> usize { self.inner.particle_stride() }
    pub fn ripple_stride(&self) -> usize { render::RIPPLE_STRIDE }

    pub fn output_ptr(&self, channel: u32) -> *const f32 {
        match Channel::from_u32(channel) {
            Some(ch) => self.inner.output(ch).ptr(),
            None => std::ptr::null(),
        }
    }

    pub fn output_len(&self, channel: u32) -> usize {
        Channel::from_u32(channel).map_or(0, |ch| self.inner.output(ch).len())
    }

    pub fn retired_ptr(&self, channel: u32) -> *const u32 {
        match Channel::from_u32(channel) {
            Some(ch) => self.inner.retired(ch).as_ptr(),
            None => std::ptr::null(),
        }
    }

    pub fn retired_len(&self, channel: u32) -> usize {
        Channel::from_u32(channel).map_or(0, |ch| self.inner.retired(ch).len())
    }
}

// ============================================================================
// PORTAL - wallet flow helpers, JSON in and out
// ============================================================================

fn status_json(status: &Status) -> Result<String, JsValue> {
    serde_json::to_string(status).map_err(to_js)
}

/// `/redeem` under `api_base`, or under the production API
#[wasm_bindgen]
pub fn claim_url(api_base: Option<String>) -> String {
    Endpoints::or_default(api_base.as_deref()).redeem()
}

/// Validated `/redeem` body, or an error status
#[wasm_bindgen]
pub fn claim_body(code: &str, wallet: &str) -> Result<String, JsValue> {
    let req = ClaimRequest::new(code, wallet).map_err(|e| to_js(Status::from(e)))?;
    serde_json::to_string(&req).map_err(to_js)
}

/// Status line for a `/redeem` response
#[wasm_bindgen]
pub fn claim_status(http_status: u16, body: &str) -> Result<String, JsValue> {
    let status = match portal::parse_response::<RedeemResponse>(http_status, body) {
        Ok(resp) => resp.status(),
        Err(e) => Status::from(e),
    };
    status_json(&status)
}

/// Info line to show while `step` is in flight
#[wasm_bindgen]
pub fn step_status(step: Step) -> Result<String, JsValue> {
    status_json(&step.status())
}

/// Error line for a step that threw, `detail` being the thrown message
#[wasm_bindgen]
pub fn step_failed(step: Step, detail: Option<String>) -> Result<String, JsValue> {
    status_json(&step.failure(detail.as_deref()))
}

#[wasm_bindgen]
pub fn extension_missing_status(extension: Extension) -> Result<String, JsValue> {
    status_json(&Status::from(FlowError::ExtensionMissing(extension)))
}

#[wasm_bindgen]
pub fn dcl_url() -> String {
    portal::DCL_URL.to_string()
}

#[wasm_bindgen]
pub fn phantom_link_message() -> String {
    portal::PHANTOM_LINK_MESSAGE.to_string()
}

#[wasm_bindgen]
pub fn token_from_query(search: &str) -> Option<String> {
    portal::token_from_query(search)
}

#[wasm_bindgen]
pub fn short_address(addr: &str) -> String {
    portal::short_address(addr)
}

#[wasm_bindgen]
pub struct FxMigration {
    session: MigrationSession,
    api: Endpoints,
}

#[wasm_bindgen]
impl FxMigration {
    #[wasm_bindgen(constructor)]
    pub fn new(api_base: Option<String>) -> FxMigration {
        let api = Endpoints::or_default(api_base.as_deref());
        FxMigration { session: MigrationSession::default(), api }
    }

    /// Takes the account list from eth_requestAccounts, returns the verify URL
    pub fn connect(&mut self, accounts: Vec<String>) -> Result<String, JsValue> {
        let wallet = self.session.connect(&accounts).map_err(|e| to_js(Status::from(e)))?;
        Ok(self.api.verify_name(wallet))
    }

    /// Feed the verify_name_nft response, returns the status JSON
    pub fn verify(&mut self, http_status: u16, body: &str) -> Result<String, JsValue> {
        let status = match self.session.verify(http_status, body) {
            Ok(name) => Status::success(format!("Wallet connected and Name NFT verified: {name}")),
            Err(e) => Status::from(e),
        };
        status_json(&status)
    }

    pub fn confirm_prompt(&self) -> Option<String> {
        self.session.confirm_prompt()
    }

    pub fn migrate_url(&self) -> String {
        self.api.migrate()
    }

    /// Validated `/player/migrate` body, or an error status
    pub fn migrate_body(&self, token: &str) -> Result<String, JsValue> {
        let req = self.session.request(token).map_err(|e| to_js(Status::from(e)))?;
        serde_json::to_string(&req).map_err(to_js)
    }

    pub fn migrate_status(&self, http_status: u16, body: &str) -> Result<String, JsValue> {
        let status = match portal::parse_response::<MigrateResponse>(http_status, body) {
            Ok(resp) => resp.status(),
            Err(e) => Status::from(e),
        };
        status_json(&status)
    }

    pub fn wallet_short(&self) -> Option<String> {
        self.session.wallet().map(portal::short_address)
    }

    pub fn name(&self) -> Option<String> {
        self.session.name().map(str::to_string)
    }
}
