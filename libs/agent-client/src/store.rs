// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! The resource store seam, used to recover large payloads that agents
//! upload out of band and reference by id.

use async_trait::async_trait;
use tracing::warn;

use crate::error::StoreError;

#[async_trait]
pub trait ResourceStore: Send + Sync {
    async fn get(&self, id: &str) -> Result<Vec<u8>, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;
}

/// Fetch a blob and delete it from the store whether or not the fetch worked.
///
/// The blob is gone once this returns; if the caller crashes before using
/// the content, it is lost.
pub async fn download_and_delete(
    store: &dyn ResourceStore,
    blob_id: &str,
) -> Result<Vec<u8>, StoreError> {
    let blob = store.get(blob_id).await;

    if let Err(e) = store.delete(blob_id).await {
        warn!(blob_id = %blob_id, error = %e, "Failed to delete blob after download");
    }

    blob
}
