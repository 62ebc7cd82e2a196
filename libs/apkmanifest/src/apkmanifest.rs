/*
 * Copyright 2026 The Android Open Source Project
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *      http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! Handle parsing of APK manifest files.
//! The manifest file is written as XML text, but is stored in the APK
//! as Android binary compressed XML. This library finds the manifest inside
//! the APK, decodes it with `axmldecoder` and flattens the element tree into
//! a map from element tag to the attributes of every element carrying that tag.

#[allow(dead_code)]
pub mod testing;

pub use axmldecoder::ParseError;

use apkzip::ZipReadError;
use axmldecoder::{Element, Node};
use log::{debug, warn};
use std::any::Any;
use std::collections::BTreeMap;
use std::fs::File;
use std::io;
use std::panic;
use std::path::Path;
use thiserror::Error;

/// Name of the manifest entry inside an APK.
pub const ANDROID_MANIFEST: &str = "AndroidManifest.xml";

/// Attributes of one manifest element, keyed by their qualified name (e.g. `android:name`).
pub type Attributes = BTreeMap<String, String>;

/// The elements of an Android manifest, grouped by tag in document order.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ApkManifest {
    elements: BTreeMap<String, Vec<Attributes>>,
}

impl ApkManifest {
    /// Appends an element to the list kept for its tag.
    pub fn push(&mut self, tag: impl Into<String>, attributes: Attributes) {
        self.elements.entry(tag.into()).or_default().push(attributes);
    }

    /// Returns the attributes of every element with the given tag, in document order.
    pub fn elements(&self, tag: &str) -> &[Attributes] {
        self.elements.get(tag).map(Vec::as_slice).unwrap_or_default()
    }

    /// Returns the distinct element tags present in the manifest.
    pub fn tags(&self) -> impl Iterator<Item = &str> {
        self.elements.keys().map(String::as_str)
    }

    /// Whether the manifest holds no elements at all.
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Adds `element` and, depth first, every element nested in it.
    fn push_tree(&mut self, element: &Element) {
        let attributes =
            element.get_attributes().iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        self.push(element.get_tag(), attributes);
        for child in element.get_children() {
            if let Node::Element(child) = child {
                self.push_tree(child);
            }
        }
    }
}

impl<T: Into<String>> FromIterator<(T, Attributes)> for ApkManifest {
    fn from_iter<I: IntoIterator<Item = (T, Attributes)>>(iter: I) -> Self {
        let mut manifest = ApkManifest::default();
        for (tag, attributes) in iter {
            manifest.push(tag, attributes);
        }
        manifest
    }
}

/// Errors from extracting the manifest of an APK.
#[derive(Debug, Error)]
pub enum ManifestError {
    /// There was an IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// The Zip archive, or the manifest entry in it, was invalid.
    #[error("Cannot read zip archive: {0}")]
    InvalidZip(String),
    /// The APK has no manifest entry.
    #[error("APK doesn't contain AndroidManifest.xml")]
    MissingManifest,
    /// A string in the manifest's string pool could not be decoded.
    #[error("Cannot decode manifest text: {0}")]
    InvalidText(ParseError),
    /// The manifest is not well-formed binary XML.
    #[error("Cannot parse manifest: {0}")]
    Malformed(ParseError),
    /// The decoder gave up on input it does not support.
    #[error("Cannot parse manifest: decoder aborted: {0}")]
    Unsupported(String),
}

impl From<ZipReadError> for ManifestError {
    fn from(err: ZipReadError) -> Self {
        match err {
            ZipReadError::Io(err) => ManifestError::Io(err),
            ZipReadError::InvalidZip(s) => ManifestError::InvalidZip(s.to_owned()),
            err @ ZipReadError::CorruptEntry { .. } => ManifestError::InvalidZip(err.to_string()),
            ZipReadError::MissingFile(_) => ManifestError::MissingManifest,
        }
    }
}

impl From<ParseError> for ManifestError {
    fn from(err: ParseError) -> Self {
        match err {
            ParseError::Utf8StringParseError(_) | ParseError::Utf16StringParseError(_) => {
                ManifestError::InvalidText(err)
            }
            // String pool failures reach us wrapped in a deku parse error.
            ParseError::DekuError(_) if is_text_error(&err) => ManifestError::InvalidText(err),
            _ => ManifestError::Malformed(err),
        }
    }
}

fn is_text_error(err: &ParseError) -> bool {
    let message = err.to_string();
    message.contains("invalid utf-8") || message.contains("invalid utf-16")
}

/// Find the manifest inside the given APK and decode it.
pub fn get_manifest<P: AsRef<Path>>(apk_path: P) -> Result<ApkManifest, ManifestError> {
    let apk = File::open(apk_path.as_ref())?;
    let manifest = apkzip::read_file(apk, ANDROID_MANIFEST)?;
    decode_manifest(&manifest)
}

/// Decode a binary XML manifest. An empty input yields an empty manifest.
pub fn decode_manifest(data: &[u8]) -> Result<ApkManifest, ManifestError> {
    if data.is_empty() {
        debug!("{} is empty", ANDROID_MANIFEST);
        return Ok(ApkManifest::default());
    }
    // axmldecoder panics on some inputs: long strings, style spans, truncated chunks.
    let document = panic::catch_unwind(|| axmldecoder::parse(data))
        .map_err(|payload| ManifestError::Unsupported(panic_message(payload)))??;

    let mut manifest = ApkManifest::default();
    match document.get_root() {
        Some(Node::Element(root)) => manifest.push_tree(root),
        Some(Node::Cdata(_)) => warn!("{} root is character data", ANDROID_MANIFEST),
        None => debug!("{} has no root element", ANDROID_MANIFEST),
    }
    debug!("Decoded manifest with tags {:?}", manifest.tags().collect::<Vec<_>>());
    Ok(manifest)
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    match payload.downcast::<String>() {
        Ok(message) => *message,
        Err(payload) => match payload.downcast::<&str>() {
            Ok(message) => message.to_string(),
            Err(_) => "unknown panic".to_owned(),
        },
    }
}
