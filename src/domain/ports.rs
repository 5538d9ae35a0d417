use crate::config::KnotOptions;
use crate::domain::envelope::ServiceResponse;
use crate::domain::model::Document;
use crate::domain::service_entry::ServiceEntry;
use crate::utils::error::{KnotError, Result};
use async_trait::async_trait;
use std::collections::HashSet;

/// 一個 knot 需要提供的能力；訂閱、過濾、錯誤回復與回覆由 runtime 負責
#[async_trait]
pub trait Knot: Send + Sync + 'static {
    /// 用於日誌與錯誤標記
    fn name(&self) -> &str;

    /// Parses the raw unit configuration. An error here keeps the knot from subscribing.
    fn init_configuration(&mut self, config: &serde_json::Value) -> Result<KnotOptions>;

    fn should_process(&self, identifiers: &HashSet<String>) -> bool;

    /// Business-level failures belong in the returned document; `Err` is a fault.
    async fn process(&self, document: Document) -> Result<Document>;

    fn process_error(&self, document: Document, error: &KnotError) -> Document;
}

/// 外部資料來源；任何結果（包含傳輸失敗）都包成 ServiceResponse
#[async_trait]
pub trait ServiceClient: Send + Sync {
    async fn fetch(&self, entry: &ServiceEntry) -> ServiceResponse;
}
