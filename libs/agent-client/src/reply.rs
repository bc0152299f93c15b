// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Reply post-processing and remote exception rendering.

use serde_json::Value;
use tracing::{debug, warn};

use agent_protocol::RemoteError;

use crate::store::{ResourceStore, download_and_delete};

/// Replace a `result.compile_log_id` blob reference with its content.
///
/// Returns a new reply value with `result.compile_log` set to the blob's
/// content. The blob is deleted from the store whether or not it could be
/// read. If it could not be read the value is returned unchanged.
pub async fn inject_compile_log(store: &dyn ResourceStore, mut value: Value) -> Value {
    let blob_id = match value.pointer("/result/compile_log_id") {
        Some(Value::String(id)) if !id.is_empty() => id.clone(),
        _ => return value,
    };

    match download_and_delete(store, &blob_id).await {
        Ok(blob) => {
            debug!(blob_id = %blob_id, size = blob.len(), "Injected compile log");
            if let Some(result) = value.get_mut("result").and_then(Value::as_object_mut) {
                result.insert(
                    "compile_log".to_string(),
                    Value::String(String::from_utf8_lossy(&blob).into_owned()),
                );
            }
        }
        Err(e) => {
            warn!(blob_id = %blob_id, error = %e, "Failed to fetch compile log");
        }
    }

    value
}

/// Render a remote exception as the payload of a remote fault.
///
/// Structured errors become the message, then each backtrace line, then the
/// content of the referenced diagnostics blob, separated by newlines. The
/// blob is deleted after it is read.
pub async fn format_exception(store: &dyn ResourceStore, exception: RemoteError) -> String {
    let err = match exception {
        RemoteError::Structured(err) => err,
        RemoteError::Text(text) => return text,
    };

    let mut msg = err.message;

    if let Some(backtrace) = &err.backtrace {
        msg.push('\n');
        msg.push_str(&backtrace.lines().join("\n"));
    }

    if let Some(blob_id) = &err.blobstore_id {
        msg.push('\n');
        match download_and_delete(store, blob_id).await {
            Ok(blob) => msg.push_str(&String::from_utf8_lossy(&blob)),
            Err(e) => {
                warn!(blob_id = %blob_id, error = %e, "Failed to fetch exception blob");
                msg.push_str(&format!("<unable to fetch blob {}: {}>", blob_id, e));
            }
        }
    }

    msg
}
