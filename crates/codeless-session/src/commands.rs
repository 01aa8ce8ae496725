//! Units of work scheduled for inbound editor messages.
//!
//! Every decoded request becomes one tokio task. A task:
//! - waits for a slot on the connection's command semaphore,
//! - resolves its connection handle (gone: the task does nothing),
//! - touches session state only through the synchronized session store,
//! - routes UI effects through the UI context and waits for them,
//! - sends at most one response.
//!
//! Nothing here returns an error to the caller. Failures end up either as
//! a missing response (dropped request, connection gone) or as a non-OK
//! response status.

use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use codeless_core::{
    ApplyReport, BindingRequest, ChangeRequest, ClearRequest, InboundMessage, OutboundMessage,
    Payload, StatusResponse, TransformerRegistry, TweakRequest, STATUS_ERROR,
};
use codeless_protocol::{inbound_from_envelope, Envelope};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::connection::{Connection, ConnectionHandle};
use crate::ui::{UiError, UiHandle};

/// Everything a unit of work needs, cloned into each task.
#[derive(Debug, Clone)]
pub struct CommandContext {
    handle: ConnectionHandle,
    ui: UiHandle,
    transformers: Arc<TransformerRegistry>,
    permits: Arc<Semaphore>,
}

impl CommandContext {
    /// `concurrency` bounds how many units of work run at once on this
    /// connection; 1 processes messages strictly one after another.
    pub fn new(
        handle: ConnectionHandle,
        ui: UiHandle,
        transformers: Arc<TransformerRegistry>,
        concurrency: usize,
    ) -> Self {
        CommandContext {
            handle,
            ui,
            transformers,
            permits: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }

    pub fn handle(&self) -> &ConnectionHandle {
        &self.handle
    }

    /// The semaphore gating units of work on this connection.
    pub fn permits(&self) -> &Arc<Semaphore> {
        &self.permits
    }

    /// Schedule the unit of work for a decoded envelope. Returns `None`
    /// when the envelope carries nothing to act on; that message is
    /// silently dropped.
    pub fn dispatch_envelope(&self, envelope: Envelope) -> Option<JoinHandle<()>> {
        let message_type = envelope.message_type();
        match inbound_from_envelope(envelope) {
            Some(message) => Some(self.dispatch(message)),
            None => {
                debug!(connection = %self.handle.id(), %message_type, "dropping message");
                None
            }
        }
    }

    /// Schedule the unit of work for `message`.
    pub fn dispatch(&self, message: InboundMessage) -> JoinHandle<()> {
        match message {
            InboundMessage::Change(req) => {
                self.spawn(move |conn, ctx| change_request(req, conn, ctx))
            }
            InboundMessage::Tweak(req) => {
                self.spawn(move |conn, ctx| tweak_request(req, conn, ctx))
            }
            InboundMessage::Clear(req) => {
                self.spawn(move |conn, ctx| clear_request(req, conn, ctx))
            }
            InboundMessage::Binding(req) => {
                self.spawn(move |conn, ctx| binding_request(req, conn, ctx))
            }
            InboundMessage::DeviceInfo => self.spawn(device_info_request),
            InboundMessage::Disconnect => self.spawn(disconnect),
        }
    }

    /// Re-apply the session variant's recorded actions, e.g. after the UI
    /// has rebuilt a screen. `None` when there is no connection or no
    /// variant.
    pub async fn reapply_session_variant(&self) -> Option<ApplyReport> {
        let connection = self.handle.resolve().await?;
        let variant = connection.session().variant()?;
        let transformers = Arc::clone(&self.transformers);
        self.ui
            .run(move |host| lock(&variant).reapply(host, &transformers))
            .await
            .map_err(|e| warn!(connection = %self.handle.id(), error = %e, "replay failed"))
            .ok()
    }

    fn spawn<F, Fut>(&self, work: F) -> JoinHandle<()>
    where
        F: FnOnce(Arc<Connection>, CommandContext) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let ctx = self.clone();
        tokio::spawn(async move {
            let _permit = match Arc::clone(&ctx.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => return,
            };
            let Some(connection) = ctx.handle.resolve().await else {
                debug!(connection = %ctx.handle.id(), "connection gone, skipping command");
                return;
            };
            work(connection, ctx).await;
        })
    }
}

/// Schedule handling of a change request built from `payload`.
///
/// No payload means no request: nothing is scheduled and nothing will be
/// sent.
pub fn schedule_change_request(
    payload: Option<Payload>,
    ctx: &CommandContext,
) -> Option<JoinHandle<()>> {
    let request = ChangeRequest::from_payload(payload)?;
    Some(ctx.dispatch(InboundMessage::Change(request)))
}

// -----------------------------------------------------------------------------
// Handlers
// -----------------------------------------------------------------------------

async fn change_request(req: ChangeRequest, conn: Arc<Connection>, ctx: CommandContext) {
    let (variant, created) = conn.session().variant_or_create();
    if created {
        info!(connection = %conn.id(), "created session variant");
    }

    let outcome = match req.actions() {
        Some(actions) => {
            let actions = actions.to_vec();
            let transformers = Arc::clone(&ctx.transformers);
            ctx.ui
                .run(move |host| lock(&variant).add_actions(&actions, true, host, &transformers))
                .await
        }
        None => Ok(ApplyReport::default()),
    };

    conn.send(OutboundMessage::ChangeResponse(status_for(outcome)));
}

async fn tweak_request(req: TweakRequest, conn: Arc<Connection>, ctx: CommandContext) {
    let (variant, _) = conn.session().variant_or_create();

    let outcome = match req.tweaks() {
        Some(tweaks) => {
            let tweaks = tweaks.to_vec();
            ctx.ui
                .run(move |host| lock(&variant).add_tweaks(&tweaks, true, host))
                .await
        }
        None => Ok(ApplyReport::default()),
    };

    conn.send(OutboundMessage::TweakResponse(status_for(outcome)));
}

async fn clear_request(req: ClearRequest, conn: Arc<Connection>, ctx: CommandContext) {
    let mut response = StatusResponse::ok();

    if let (Some(variant), Some(names)) = (conn.session().variant(), req.action_names()) {
        let names = names.to_vec();
        let removed = ctx
            .ui
            .run(move |host| {
                let mut variant = lock(&variant);
                let mut removed = 0;
                for name in &names {
                    if variant.remove_action(name, host) {
                        removed += 1;
                    }
                }
                removed
            })
            .await;
        match removed {
            Ok(count) => debug!(connection = %conn.id(), count, "cleared actions"),
            Err(e) => response = ui_failure(e),
        }
    }

    conn.send(OutboundMessage::ClearResponse(response));
}

async fn binding_request(req: BindingRequest, conn: Arc<Connection>, ctx: CommandContext) {
    let bindings = conn.session().bindings_or_create();

    let response = match req.events() {
        Some(events) => {
            debug!(connection = %conn.id(), count = events.len(), "loading event bindings");
            let events = events.to_vec();
            let outcome = ctx
                .ui
                .run(move |host| lock(&bindings).update(&events, host))
                .await;
            match outcome {
                Ok(errors) if errors.is_empty() => StatusResponse::ok(),
                Ok(errors) => {
                    let mut response = StatusResponse::new();
                    response.set_status(STATUS_ERROR);
                    response.set_errors(errors.iter().map(ToString::to_string).collect());
                    response
                }
                Err(e) => ui_failure(e),
            }
        }
        None => StatusResponse::ok(),
    };

    conn.send(OutboundMessage::BindingResponse(response));
}

async fn device_info_request(conn: Arc<Connection>, ctx: CommandContext) {
    match ctx.ui.run(|host| host.device_info()).await {
        Ok(info) => {
            conn.send(OutboundMessage::DeviceInfoResponse(info));
        }
        Err(e) => warn!(connection = %conn.id(), error = %e, "could not collect device info"),
    }
}

async fn disconnect(conn: Arc<Connection>, ctx: CommandContext) {
    let variant = conn.session().variant();
    let bindings = conn.session().bindings();

    if variant.is_some() || bindings.is_some() {
        let stopped = ctx
            .ui
            .run(move |host| {
                if let Some(variant) = variant {
                    lock(&variant).stop(host);
                }
                if let Some(bindings) = bindings {
                    lock(&bindings).cleanup(host);
                }
            })
            .await;
        if let Err(e) = stopped {
            warn!(connection = %conn.id(), error = %e, "could not stop session effects");
        }
    }

    info!(connection = %conn.id(), "editor requested disconnect");
    conn.release();
    conn.close();
    ctx.handle.teardown().await;
}

// -----------------------------------------------------------------------------
// Helpers
// -----------------------------------------------------------------------------

fn status_for(outcome: Result<ApplyReport, UiError>) -> StatusResponse {
    match outcome {
        Ok(report) => StatusResponse::from_report(&report),
        Err(e) => ui_failure(e),
    }
}

fn ui_failure(e: UiError) -> StatusResponse {
    warn!(error = %e, "UI context failed");
    let mut response = StatusResponse::new();
    response.set_status(STATUS_ERROR);
    response.set_errors(vec![e.to_string()]);
    response
}

fn lock<T>(shared: &Mutex<T>) -> MutexGuard<'_, T> {
    shared.lock().unwrap_or_else(PoisonError::into_inner)
}
