use crate::core::bus::{EventBus, Message, MessageConsumer};
use crate::core::routing::all_identifiers;
use crate::domain::model::Document;
use crate::domain::ports::Knot;
use crate::utils::error::{ErrorCategory, KnotError, Result};
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// 已部署 knot 的生命週期控制
///
/// Dropping the handle without calling `stop` also ends the subscription loop.
#[must_use = "dropping a KnotHandle unsubscribes the knot"]
pub struct KnotHandle {
    name: String,
    address: String,
    shutdown: Option<oneshot::Sender<()>>,
    task: JoinHandle<()>,
}

impl KnotHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// 停止接收新訊息並取消訂閱；已在處理中的訊息會照常回覆
    pub async fn stop(mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Err(e) = self.task.await {
            tracing::warn!("Knot <{}> loop ended abnormally: {}", self.name, e);
        }
    }
}

/// 初始化設定並在 bus 上訂閱 knot 的位址
///
/// A configuration error is returned before anything is subscribed.
pub fn deploy<K: Knot>(bus: &EventBus, mut knot: K, config: &serde_json::Value) -> Result<KnotHandle> {
    let options = knot.init_configuration(config).map_err(|e| {
        tracing::error!("Cannot start <{}>: {}", knot.name(), e);
        match e.category() {
            ErrorCategory::Configuration => e,
            _ => KnotError::config(format!("{}: {}", knot.name(), e)),
        }
    })?;

    let knot = Arc::new(knot);
    let name = knot.name().to_string();
    let consumer = bus.consumer(options.address.clone());
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let span = tracing::info_span!("knot", name = %name, address = %options.address);
    let task = tokio::spawn(run(knot, consumer, shutdown_rx).instrument(span));

    Ok(KnotHandle {
        name,
        address: options.address,
        shutdown: Some(shutdown_tx),
        task,
    })
}

/// 同一種 knot 部署多個實例，共用同一個位址
///
/// Zero instances is a configuration error.
pub fn deploy_instances<K, F>(
    bus: &EventBus,
    instances: usize,
    config: &serde_json::Value,
    mut factory: F,
) -> Result<Vec<KnotHandle>>
where
    K: Knot,
    F: FnMut() -> K,
{
    if instances == 0 {
        return Err(KnotError::InvalidConfigValueError {
            field: "instances".to_string(),
            value: instances.to_string(),
            reason: "At least one instance is required".to_string(),
        });
    }

    (0..instances)
        .map(|_| deploy(bus, factory(), config))
        .collect()
}

async fn run<K: Knot>(
    knot: Arc<K>,
    mut consumer: MessageConsumer,
    mut shutdown: oneshot::Receiver<()>,
) {
    tracing::debug!("Starting <{}>", knot.name());

    loop {
        tokio::select! {
            _ = &mut shutdown => break,
            message = consumer.recv() => match message {
                Some(message) => {
                    let knot = Arc::clone(&knot);
                    tokio::spawn(on_message(knot, message).in_current_span());
                }
                None => break,
            },
        }
    }

    tracing::debug!("Stopped <{}>", knot.name());
}

async fn on_message<K: Knot>(knot: Arc<K>, message: Message) {
    tracing::trace!(
        "Got message on <{}> with value <{}>",
        message.address(),
        message.body()
    );

    let document: Document = match serde_json::from_str(message.body()) {
        Ok(document) => document,
        Err(e) => {
            tracing::warn!("Cannot decode document sent to <{}>: {}", message.address(), e);
            message.fail(format!("Cannot decode document: {}", e));
            return;
        }
    };

    let reply = match accepts(knot.as_ref(), &document) {
        Ok(false) => {
            // 原封不動回傳收到的內容，不經過重新編碼
            tracing::trace!("<{}> passing message through", knot.name());
            let body = message.body().to_string();
            send_reply(knot.name(), message, body);
            return;
        }
        Ok(true) => process_with_recovery(knot.as_ref(), document).await,
        Err(error) => recover(knot.as_ref(), document, error),
    };

    match serde_json::to_string(&reply) {
        Ok(body) => send_reply(knot.name(), message, body),
        Err(e) => {
            tracing::error!("Cannot encode reply from <{}>: {}", knot.name(), e);
            message.fail(format!("Cannot encode document: {}", e));
        }
    }
}

fn send_reply(name: &str, message: Message, body: String) {
    if !message.reply(body) {
        tracing::trace!("Caller stopped waiting, reply from <{}> dropped", name);
    }
}

/// 單一 document 的處理流程：過濾、處理、錯誤回復
///
/// Always yields a document. Faults and panics from `process` or
/// `should_process` go through `process_error`; if `process_error` itself
/// panics, the original document is marked failed instead.
pub async fn handle<K: Knot + ?Sized>(knot: &K, document: Document) -> Document {
    match accepts(knot, &document) {
        Ok(false) => {
            tracing::trace!("<{}> does not handle this document, passing through", knot.name());
            document
        }
        Ok(true) => process_with_recovery(knot, document).await,
        Err(error) => recover(knot, document, error),
    }
}

fn accepts<K: Knot + ?Sized>(knot: &K, document: &Document) -> Result<bool> {
    let identifiers = all_identifiers(document.fragments());
    std::panic::catch_unwind(AssertUnwindSafe(|| knot.should_process(&identifiers)))
        .map_err(|panic| KnotError::processing(knot.name(), panic_message(panic.as_ref())))
}

async fn process_with_recovery<K: Knot + ?Sized>(knot: &K, document: Document) -> Document {
    let original = document.clone();
    let error = match AssertUnwindSafe(knot.process(document)).catch_unwind().await {
        Ok(Ok(processed)) => return processed,
        Ok(Err(error)) => error,
        Err(panic) => KnotError::processing(knot.name(), panic_message(panic.as_ref())),
    };
    recover(knot, original, error)
}

fn recover<K: Knot + ?Sized>(knot: &K, document: Document, error: KnotError) -> Document {
    tracing::error!("Error occurred in <{}>: {}", knot.name(), error);

    let mut fallback = document.clone();
    match std::panic::catch_unwind(AssertUnwindSafe(|| knot.process_error(document, &error))) {
        Ok(recovered) => recovered,
        Err(panic) => {
            tracing::error!(
                "<{}> could not recover from error: {}",
                knot.name(),
                panic_message(panic.as_ref())
            );
            fallback.mark_failed(knot.name(), error.to_string());
            fallback
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        format!("panicked: {}", message)
    } else if let Some(message) = panic.downcast_ref::<String>() {
        format!("panicked: {}", message)
    } else {
        "panicked".to_string()
    }
}
