use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

/// 外部服務呼叫結果的通用包裝：成功時只有 `data`，失敗時只有 `reason`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceResponse {
    success: bool,
    data: Option<String>,
    reason: Option<String>,
}

impl ServiceResponse {
    pub fn success(data: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data.into()),
            reason: None,
        }
    }

    /// Accepts anything displayable, so callers can pass `format_args!`.
    pub fn error(reason: impl fmt::Display) -> Self {
        Self {
            success: false,
            data: None,
            reason: Some(reason.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn data(&self) -> Option<&str> {
        self.data.as_deref()
    }

    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    pub fn into_result(self) -> std::result::Result<String, String> {
        match (self.success, self.data, self.reason) {
            (true, Some(data), _) => Ok(data),
            (_, _, Some(reason)) => Err(reason),
            _ => Err(String::new()),
        }
    }
}

#[derive(Serialize, Deserialize)]
struct WireResponse {
    success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    data: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reason: Option<String>,
}

impl Serialize for ServiceResponse {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let wire = if self.success {
            WireResponse {
                success: true,
                data: self.data.clone(),
                reason: None,
            }
        } else {
            WireResponse {
                success: false,
                data: None,
                reason: self.reason.clone(),
            }
        };
        wire.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for ServiceResponse {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let wire = WireResponse::deserialize(deserializer)?;
        if wire.success {
            let data = wire.data.ok_or_else(|| D::Error::missing_field("data"))?;
            Ok(Self::success(data))
        } else {
            let reason = wire.reason.ok_or_else(|| D::Error::missing_field("reason"))?;
            Ok(Self::error(reason))
        }
    }
}
