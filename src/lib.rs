// Copyright 2026, The Android Open Source Project
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Extracts the Android platform permissions an APK requests in its manifest.
//!
//! [`extract_permissions`] never fails: every problem, from a bad path to a corrupt archive, is
//! folded into the returned [`PermissionReport`].

mod report;

pub use report::{print_json_report, print_report, write_json_report, write_report};

use apkmanifest::{ApkManifest, ManifestError};
use log::{debug, info, warn};
use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Manifest tags that request a permission.
pub const PERMISSION_TAGS: [&str; 2] = ["uses-permission", "uses-permission-sdk-23"];
/// Only platform permissions are reported.
pub const PERMISSION_PREFIX: &str = "android.permission.";
const NAME_ATTRIBUTE: &str = "android:name";

/// Why permissions could not be extracted from an APK.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// Nothing exists at the given path.
    #[error("File does not exist: {}", .0.display())]
    NotFound(PathBuf),
    /// The path exists but is not a regular file.
    #[error("Path is not a file: {}", .0.display())]
    NotAFile(PathBuf),
    /// The file name doesn't end in `.apk`.
    #[error("File is not in APK format: {}", .0.display())]
    NotAnApk(PathBuf),
    /// The APK has no manifest, or an empty one.
    #[error("AndroidManifest.xml not found in APK")]
    ManifestNotFound,
    /// The zip container is damaged.
    #[error("APK file is corrupt: {}", .0.display())]
    CorruptArchive(PathBuf),
    /// The APK cannot be read by this user.
    #[error("No permission to read: {}", .0.display())]
    PermissionDenied(PathBuf),
    /// Text in the manifest could not be decoded.
    #[error("Failed to decode manifest text: {}", .0.display())]
    Decode(PathBuf),
    /// Any other failure, with the full error chain for diagnosis.
    #[error("Unexpected error: {message}\n{trace}")]
    Unexpected {
        /// One-line description of the failure.
        message: String,
        /// Debug rendering of the error and its causes.
        trace: String,
    },
}

impl ExtractError {
    fn unexpected(err: impl Into<anyhow::Error>) -> Self {
        let err = err.into();
        ExtractError::Unexpected { message: format!("{:#}", err), trace: format!("{:?}", err) }
    }
}

/// Result of extracting permissions from one APK.
#[derive(Debug)]
pub struct PermissionReport {
    apk_path: PathBuf,
    outcome: Result<Vec<String>, ExtractError>,
}

impl PermissionReport {
    /// The path the report is about, as given.
    pub fn apk_path(&self) -> &Path {
        &self.apk_path
    }

    /// Whether extraction succeeded.
    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// The declared platform permissions, deduplicated and sorted, or `None` if extraction failed.
    pub fn permissions(&self) -> Option<&[String]> {
        self.outcome.as_deref().ok()
    }

    /// Description of the failure, or an empty string on success.
    pub fn error(&self) -> String {
        match &self.outcome {
            Ok(_) => String::new(),
            Err(e) => e.to_string(),
        }
    }

    /// The permissions on success, or the classified reason extraction failed.
    pub fn outcome(&self) -> &Result<Vec<String>, ExtractError> {
        &self.outcome
    }
}

/// Source of decoded manifests.
pub trait ManifestReader {
    /// Reads and decodes the manifest of the APK at `apk_path`.
    fn read_manifest(&self, apk_path: &Path) -> Result<ApkManifest, ManifestError>;
}

/// Reads the manifest straight out of the APK file.
#[derive(Clone, Copy, Debug, Default)]
pub struct ApkManifestReader;

impl ManifestReader for ApkManifestReader {
    fn read_manifest(&self, apk_path: &Path) -> Result<ApkManifest, ManifestError> {
        apkmanifest::get_manifest(apk_path)
    }
}

/// Extract the platform permissions requested by the APK at `apk_path`.
pub fn extract_permissions<P: AsRef<Path>>(apk_path: P) -> PermissionReport {
    extract_permissions_with(&ApkManifestReader, apk_path)
}

/// Like [`extract_permissions`], with the manifest obtained from `reader`.
pub fn extract_permissions_with<R, P>(reader: &R, apk_path: P) -> PermissionReport
where
    R: ManifestReader + ?Sized,
    P: AsRef<Path>,
{
    let apk_path = apk_path.as_ref();
    let outcome = check_apk_path(apk_path).and_then(|()| read_permissions(reader, apk_path));
    match &outcome {
        Ok(permissions) => {
            info!("Found {} permissions in {}", permissions.len(), apk_path.display())
        }
        Err(e) => warn!("Failed to extract permissions from {}: {}", apk_path.display(), e),
    }
    PermissionReport { apk_path: apk_path.to_path_buf(), outcome }
}

fn check_apk_path(path: &Path) -> Result<(), ExtractError> {
    if !path.exists() {
        return Err(ExtractError::NotFound(path.to_path_buf()));
    }
    if !path.is_file() {
        return Err(ExtractError::NotAFile(path.to_path_buf()));
    }
    if !has_apk_suffix(path) {
        return Err(ExtractError::NotAnApk(path.to_path_buf()));
    }
    Ok(())
}

fn has_apk_suffix(path: &Path) -> bool {
    path.file_name()
        .map(|name| name.to_string_lossy().to_ascii_lowercase().ends_with(".apk"))
        .unwrap_or(false)
}

fn read_permissions<R: ManifestReader + ?Sized>(
    reader: &R,
    apk_path: &Path,
) -> Result<Vec<String>, ExtractError> {
    let manifest =
        reader.read_manifest(apk_path).map_err(|err| classify_manifest_error(err, apk_path))?;
    if manifest.is_empty() {
        return Err(ExtractError::ManifestNotFound);
    }
    Ok(collect_permissions(&manifest))
}

fn classify_manifest_error(err: ManifestError, apk_path: &Path) -> ExtractError {
    debug!("Manifest reader failed: {:?}", err);
    match err {
        ManifestError::MissingManifest => ExtractError::ManifestNotFound,
        ManifestError::InvalidZip(_) => ExtractError::CorruptArchive(apk_path.to_path_buf()),
        ManifestError::Io(e) if e.kind() == io::ErrorKind::PermissionDenied => {
            ExtractError::PermissionDenied(apk_path.to_path_buf())
        }
        ManifestError::InvalidText(_) => ExtractError::Decode(apk_path.to_path_buf()),
        err => ExtractError::unexpected(err),
    }
}

/// Returns the sorted, deduplicated `android.permission.*` names requested by `manifest`.
pub fn collect_permissions(manifest: &ApkManifest) -> Vec<String> {
    let permissions: BTreeSet<&String> = PERMISSION_TAGS
        .iter()
        .flat_map(|tag| manifest.elements(tag))
        .filter_map(|attributes| attributes.get(NAME_ATTRIBUTE))
        .filter(|name| name.starts_with(PERMISSION_PREFIX))
        .collect();
    permissions.into_iter().cloned().collect()
}
