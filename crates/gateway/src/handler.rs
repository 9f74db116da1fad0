// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::sync::{Arc, Mutex};

use axum::{Json, body::Bytes, extract::State};
use serde_json::Value;
use snafu::ResultExt;
use spoolmq_common_transport::zmq;
use tracing::{error, info, warn};

use crate::{
    archive::ArchiveSink,
    error::{ApiError, ApiResult, ResultBody, StoreFailedSnafu},
};

#[derive(Clone)]
pub(crate) struct GatewayState {
    publisher: Arc<Mutex<zmq::Socket>>,
    archive:   ArchiveSink,
}

impl GatewayState {
    pub(crate) fn new(publisher: zmq::Socket, archive: ArchiveSink) -> Self {
        Self {
            publisher: Arc::new(Mutex::new(publisher)),
            archive,
        }
    }

    fn publish(&self, payload: &[u8]) -> ApiResult<()> {
        let Ok(socket) = self.publisher.lock() else {
            error!("Publisher lock poisoned");
            return Err(ApiError::PublishFailed);
        };
        socket.send(payload, zmq::DONTWAIT).map_err(|e| {
            error!(error = %e, "Failed to publish record");
            ApiError::PublishFailed
        })
    }
}

/// `POST /results/flower`: republishes the record on the ingestion channel.
pub(crate) async fn flower(
    State(state): State<GatewayState>,
    body: Bytes,
) -> ApiResult<Json<ResultBody>> {
    let record = parse_record(&body)?;
    let payload = record.to_string();
    state.publish(payload.as_bytes())?;
    info!(size = payload.len(), "Published flower record");
    Ok(Json(ResultBody::OK))
}

/// `POST /results/pollinator`: writes the record to the archive.
pub(crate) async fn pollinator(
    State(state): State<GatewayState>,
    body: Bytes,
) -> ApiResult<Json<ResultBody>> {
    let record = parse_record(&body)?;
    let path = state
        .archive
        .store(&record)
        .await
        .inspect_err(|e| warn!(error = %e, "Failed to archive pollinator record"))
        .context(StoreFailedSnafu)?;
    info!(path = %path.display(), "Archived pollinator record");
    Ok(Json(ResultBody::OK))
}

/// A request body must be JSON and must not be null, false or empty.
fn parse_record(body: &[u8]) -> ApiResult<Value> {
    let record: Value = serde_json::from_slice(body).map_err(|_| ApiError::InvalidBody)?;
    let empty = match &record {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Object(fields) => fields.is_empty(),
        Value::Bool(true) | Value::Number(_) => false,
    };
    if empty {
        return Err(ApiError::InvalidBody);
    }
    Ok(record)
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case(b"not json" ; "garbage")]
    #[test_case(b"" ; "empty body")]
    #[test_case(b"null" ; "null")]
    #[test_case(b"{}" ; "empty object")]
    #[test_case(b"[]" ; "empty array")]
    fn test_rejects_empty_or_invalid_records(body: &[u8]) {
        assert!(matches!(parse_record(body), Err(ApiError::InvalidBody)));
    }

    #[test]
    fn test_accepts_record() {
        let record = parse_record(br#"{"metadata": {"node_id": "n1"}}"#).unwrap();
        assert_eq!(record["metadata"]["node_id"], "n1");
    }
}
