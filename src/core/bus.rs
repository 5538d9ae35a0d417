use crate::config::DeliveryOptions;
use crate::utils::error::TransportFault;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{mpsc, oneshot};

/// 每個 consumer 佇列的預設容量
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

type Reply = std::result::Result<String, String>;

/// 投遞到某個位址的單一請求，必須以 `reply` 或 `fail` 結束
#[derive(Debug)]
pub struct Message {
    address: String,
    headers: BTreeMap<String, String>,
    body: String,
    reply_to: oneshot::Sender<Reply>,
}

impl Message {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn headers(&self) -> &BTreeMap<String, String> {
        &self.headers
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    /// Returns false when the sender stopped waiting (e.g. it timed out).
    pub fn reply(self, body: String) -> bool {
        self.reply_to.send(Ok(body)).is_ok()
    }

    pub fn fail(self, message: impl Into<String>) -> bool {
        self.reply_to.send(Err(message.into())).is_ok()
    }
}

/// 某個位址上的一個訂閱者；drop 之後 bus 會在下次投遞時移除它
#[derive(Debug)]
pub struct MessageConsumer {
    address: String,
    receiver: mpsc::Receiver<Message>,
}

impl MessageConsumer {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub async fn recv(&mut self) -> Option<Message> {
        self.receiver.recv().await
    }
}

#[derive(Default)]
struct Handlers {
    senders: Vec<mpsc::Sender<Message>>,
    next: usize,
}

struct Registry {
    handlers: Mutex<HashMap<String, Handlers>>,
    capacity: usize,
}

/// 行程內的 point-to-point 訊息匯流排
///
/// 同一位址可以有多個 consumer（同一種 knot 的多個實例），請求以 round-robin 分配。
#[derive(Clone)]
pub struct EventBus {
    inner: Arc<Registry>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_QUEUE_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            inner: Arc::new(Registry {
                handlers: Mutex::new(HashMap::new()),
                capacity: capacity.max(1),
            }),
        }
    }

    pub fn consumer(&self, address: impl Into<String>) -> MessageConsumer {
        let address = address.into();
        let (sender, receiver) = mpsc::channel(self.inner.capacity);

        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(address.clone())
            .or_default()
            .senders
            .push(sender);

        tracing::debug!("Registered consumer on <{}>", address);
        MessageConsumer { address, receiver }
    }

    pub fn consumer_count(&self, address: &str) -> usize {
        self.inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(address)
            .map(|h| h.senders.iter().filter(|s| !s.is_closed()).count())
            .unwrap_or(0)
    }

    /// 送出請求並等待回覆，整個往返受 `options` 的 timeout 限制
    pub async fn request(
        &self,
        address: &str,
        body: String,
        options: &DeliveryOptions,
    ) -> std::result::Result<String, TransportFault> {
        let exchange = async {
            let (reply_to, reply) = oneshot::channel();
            let mut message = Message {
                address: address.to_string(),
                headers: options.headers.clone(),
                body,
                reply_to,
            };

            loop {
                let sender = self
                    .next_handler(address)
                    .ok_or_else(|| TransportFault::NoHandlers {
                        address: address.to_string(),
                    })?;
                match sender.send(message).await {
                    Ok(()) => break,
                    // consumer 在挑選後被關閉，換下一個
                    Err(mpsc::error::SendError(returned)) => message = returned,
                }
            }

            match reply.await {
                Ok(Ok(body)) => Ok(body),
                Ok(Err(message)) => Err(TransportFault::Recipient {
                    address: address.to_string(),
                    message,
                }),
                Err(_) => Err(TransportFault::ChannelClosed {
                    address: address.to_string(),
                }),
            }
        };

        // timeout 時 reply receiver 隨 future 一起被 drop，遲到的回覆會被丟棄
        match tokio::time::timeout(options.timeout(), exchange).await {
            Ok(result) => result,
            Err(_) => Err(TransportFault::Timeout {
                address: address.to_string(),
                timeout_ms: options.timeout_millis,
            }),
        }
    }

    fn next_handler(&self, address: &str) -> Option<mpsc::Sender<Message>> {
        let mut handlers = self
            .inner
            .handlers
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        let sender = handlers.get_mut(address).and_then(|entry| {
            entry.senders.retain(|s| !s.is_closed());
            if entry.senders.is_empty() {
                return None;
            }
            let idx = entry.next % entry.senders.len();
            entry.next = entry.next.wrapping_add(1);
            Some(entry.senders[idx].clone())
        });

        if sender.is_none() {
            handlers.remove(address);
        }
        sender
    }
}
