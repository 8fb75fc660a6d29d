//! Wire shapes for `POST /info`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Info request body. Only the fills-by-time query is needed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type")]
pub enum InfoRequest {
    #[serde(rename = "userFillsByTime", rename_all = "camelCase")]
    UserFillsByTime {
        user: String,
        start_time: i64,
        #[serde(skip_serializing_if = "Option::is_none")]
        end_time: Option<i64>,
        aggregate_by_time: bool,
    },
}

impl InfoRequest {
    /// Fills with `startTime <= time <= endTime`. `endTime` is inclusive on the wire.
    pub fn user_fills_by_time(user: &str, start_time: i64, end_time: Option<i64>) -> Self {
        Self::UserFillsByTime {
            user: user.to_string(),
            start_time,
            end_time,
            aggregate_by_time: false,
        }
    }

    pub fn start_time(&self) -> i64 {
        match self {
            Self::UserFillsByTime { start_time, .. } => *start_time,
        }
    }

    pub fn end_time(&self) -> Option<i64> {
        match self {
            Self::UserFillsByTime { end_time, .. } => *end_time,
        }
    }
}

/// One raw fill as returned by the exchange. Only `coin` and `time` are guaranteed.
///
/// `px`/`sz` are kept as raw JSON so both string and numeric encodings survive exactly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawFill {
    #[serde(default)]
    pub coin: String,
    #[serde(default)]
    pub side: Option<String>,
    #[serde(default)]
    pub px: Option<Value>,
    #[serde(default)]
    pub sz: Option<Value>,
    pub time: i64,
    #[serde(default)]
    pub tid: Option<i64>,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub crossed: Option<bool>,
}

/// Decodes a page body. A `null` body is treated as an empty page.
pub fn decode_page(body: &str) -> serde_json::Result<Vec<RawFill>> {
    let page: Option<Vec<RawFill>> = serde_json::from_str(body)?;
    Ok(page.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_serializes_to_wire_shape() {
        let req = InfoRequest::user_fills_by_time("0xabc", 1_000, Some(1_999));
        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            serde_json::json!({
                "type": "userFillsByTime",
                "user": "0xabc",
                "startTime": 1000,
                "endTime": 1999,
                "aggregateByTime": false
            })
        );
    }

    #[test]
    fn test_request_omits_missing_end_time() {
        let req = InfoRequest::user_fills_by_time("0xabc", 0, None);
        let v = serde_json::to_value(&req).unwrap();
        assert!(v.get("endTime").is_none());
        assert_eq!(req.start_time(), 0);
        assert_eq!(req.end_time(), None);
    }

    #[test]
    fn test_decode_page_accepts_sparse_records() {
        let body = r#"[
            {"coin":"BTC","side":"B","px":"101.5","sz":0.25,"time":2000,"tid":77,"hash":"0x1","crossed":true,"fee":"0.1"},
            {"coin":"ETH","time":3000}
        ]"#;
        let page = decode_page(body).unwrap();
        assert_eq!(page.len(), 2);
        assert_eq!(page[0].tid, Some(77));
        assert_eq!(page[0].crossed, Some(true));
        assert_eq!(page[1].side, None);
        assert_eq!(page[1].px, None);
    }

    #[test]
    fn test_decode_page_null_is_empty() {
        assert!(decode_page("null").unwrap().is_empty());
        assert!(decode_page("[]").unwrap().is_empty());
        assert!(decode_page("{not json").is_err());
    }
}
