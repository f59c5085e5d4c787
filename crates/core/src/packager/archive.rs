//! Turns a finished batch into a single download.

use std::collections::HashSet;

use tracing::info;

use super::types::{Delivery, PackageError};
use crate::converter::ConversionArtifact;
use crate::format::FormatTag;
use crate::metrics::DELIVERIES_TOTAL;
use crate::processor::BatchOutcome;
use crate::render::ZipPackage;

/// Builds deliveries from batch outcomes.
#[derive(Debug, Clone)]
pub struct Packager {
    archive_name: String,
}

/// Returns `name`, or `name` with a ` (n)` suffix before its extension when
/// `taken` already holds it.
pub fn unique_name(name: &str, taken: &HashSet<String>) -> String {
    if !taken.contains(name) {
        return name.to_string();
    }
    let (stem, extension) = match name.rfind('.') {
        Some(dot) if dot > 0 => name.split_at(dot),
        _ => (name, ""),
    };
    (1..)
        .map(|n| format!("{} ({}){}", stem, n, extension))
        .find(|candidate| !taken.contains(candidate))
        .unwrap_or_else(|| name.to_string())
}

impl Packager {
    pub fn new(archive_name: impl Into<String>) -> Self {
        Self {
            archive_name: archive_name.into(),
        }
    }

    pub fn archive_name(&self) -> &str {
        &self.archive_name
    }

    /// Zips `artifacts` (all converted to `target`) under their derived
    /// names, de-duplicating collisions.
    pub fn archive(
        &self,
        artifacts: &[ConversionArtifact],
        target: FormatTag,
    ) -> Result<ConversionArtifact, PackageError> {
        let mut zip = ZipPackage::new();
        let mut taken = HashSet::new();
        for artifact in artifacts {
            let name = unique_name(&artifact.file_name, &taken);
            zip.add(&name, &artifact.bytes)?;
            taken.insert(name);
        }
        let bytes = zip.finish()?;

        Ok(ConversionArtifact {
            file_name: self.archive_name.clone(),
            mime_type: "application/zip".to_string(),
            format: target,
            source_name: self.archive_name.clone(),
            source_md5: format!("{:x}", md5::compute(&bytes)),
            bytes,
        })
    }

    /// Picks a direct file or an archive for `outcome`.
    ///
    /// A batch of exactly one successful job yields the file itself; any
    /// other batch with at least one success yields an archive that lists
    /// the failures next to it.
    pub fn package(&self, outcome: BatchOutcome) -> Result<Delivery, PackageError> {
        let BatchOutcome {
            batch_id,
            target,
            total,
            mut artifacts,
            failures,
            ..
        } = outcome;

        if artifacts.is_empty() {
            return Err(PackageError::NothingConverted { failures });
        }

        let delivery = if total == 1 && failures.is_empty() && artifacts.len() == 1 {
            Delivery::File(artifacts.remove(0))
        } else {
            Delivery::Archive {
                artifact: self.archive(&artifacts, target)?,
                failures,
            }
        };

        DELIVERIES_TOTAL.with_label_values(&[delivery.kind()]).inc();
        info!(
            batch_id = %batch_id,
            kind = delivery.kind(),
            file = %delivery.artifact().file_name,
            bytes = delivery.artifact().len(),
            "Packaged delivery"
        );
        Ok(delivery)
    }
}

impl Default for Packager {
    fn default() -> Self {
        Self::new(crate::processor::ProcessorConfig::default().archive_name)
    }
}
