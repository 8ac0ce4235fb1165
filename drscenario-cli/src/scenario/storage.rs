//! Leftover block-image check on the storage toolbox.

use drscenario_cluster::{ClusterClient, ClusterError};
use drscenario_core::config::StorageConfig;
use tracing::{info, warn};

/// Lists the raw block images left in the configured pool on `context` and
/// removes each of them. Returns the removed image names.
///
/// A missing toolbox pod skips the check with a warning.
pub async fn purge_block_images<C: ClusterClient>(
    client: &C,
    context: &str,
    config: &StorageConfig,
) -> Result<Vec<String>, ClusterError> {
    let ns = config.toolbox_namespace.as_str();
    let Some(pod) = client
        .find_pod(context, ns, &config.toolbox_selector)
        .await?
    else {
        warn!(
            context,
            namespace = ns,
            selector = %config.toolbox_selector,
            "storage toolbox pod not found, skipping volume check"
        );
        return Ok(Vec::new());
    };

    let pool = format!("--pool={}", config.pool);
    let listing = client
        .exec_in_pod(context, ns, &pod, &["rbd", "ls", pool.as_str()])
        .await?;
    let images: Vec<String> = listing.split_whitespace().map(str::to_owned).collect();
    if images.is_empty() {
        info!(context, pool = %config.pool, "no block images left");
        return Ok(images);
    }

    warn!(context, pool = %config.pool, count = images.len(), "removing leftover block images");
    for image in &images {
        client
            .exec_in_pod(context, ns, &pod, &["rbd", "rm", pool.as_str(), image.as_str()])
            .await?;
        info!(context, image = %image, "block image removed");
    }
    Ok(images)
}
