//! compose マニフェストのデコード / エンコード
//!
//! 中身の検証はしない。構文として読めることだけを確認し、
//! オペレーターが diff しやすいブロック形式の YAML に書き直す。

use crate::error::{DecodeError, StagingError};
use serde_yaml::Value;

/// デコード済みのマニフェスト（mapping / sequence / scalar の木）
#[derive(Debug, Clone, PartialEq)]
pub struct Manifest(Value);

impl Manifest {
    /// バイト列を UTF-8 の YAML として読む
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let text = std::str::from_utf8(bytes)?;
        if text.trim().is_empty() {
            return Ok(Self(Value::Null));
        }
        let value: Value = serde_yaml::from_str(text)?;
        Ok(Self(value))
    }

    /// ブロック形式の YAML テキストに書き出す
    pub fn encode(&self) -> Result<String, StagingError> {
        serde_yaml::to_string(&self.0).map_err(StagingError::Encode)
    }

    pub fn value(&self) -> &Value {
        &self.0
    }

    /// `services` に定義されたサービス名（ログ表示用）
    pub fn service_names(&self) -> Vec<String> {
        self.0
            .get("services")
            .and_then(Value::as_mapping)
            .map(|services| {
                services
                    .keys()
                    .filter_map(|k| k.as_str().map(str::to_string))
                    .collect()
            })
            .unwrap_or_default()
    }
}

impl From<Value> for Manifest {
    fn from(value: Value) -> Self {
        Self(value)
    }
}
