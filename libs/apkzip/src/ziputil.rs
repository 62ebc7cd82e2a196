/*
 * Copyright (C) 2026 The Android Open Source Project
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

//! Utilities for zip handling of APK files.

use log::debug;
use std::io::{self, Read, Seek};
use thiserror::Error;
use zip::result::ZipError;
use zip::ZipArchive;

/// Upper bound on the buffer reserved up front for an entry. The declared size comes from the
/// central directory and cannot be trusted.
const MAX_PREALLOCATION: u64 = 1 << 20;

/// Errors from reading an entry out of an APK.
#[derive(Debug, Error)]
pub enum ZipReadError {
    /// There was an IO error.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    /// The Zip archive was invalid.
    #[error("Cannot read zip archive: {0}")]
    InvalidZip(&'static str),
    /// The entry exists but its data could not be decompressed or failed its checksum.
    #[error("Corrupt data in {name}: {source}")]
    CorruptEntry {
        /// Name of the damaged entry.
        name: String,
        /// The error raised while inflating the entry.
        source: io::Error,
    },
    /// The requested entry is not in the archive.
    #[error("Archive doesn't contain {0}")]
    MissingFile(String),
}

/// Read an entire file from a .zip file into memory and return it.
pub fn read_file<R: Read + Seek>(reader: R, file_name: &str) -> Result<Vec<u8>, ZipReadError> {
    let mut archive = ZipArchive::new(reader).map_err(|err| from_zip_error(err, file_name))?;
    debug!("Opened archive with {} entries", archive.len());
    let mut file = archive.by_name(file_name).map_err(|err| from_zip_error(err, file_name))?;
    let mut bytes = Vec::with_capacity(file.size().min(MAX_PREALLOCATION) as usize);
    file.read_to_end(&mut bytes).map_err(|err| match err.kind() {
        io::ErrorKind::InvalidData | io::ErrorKind::Other | io::ErrorKind::UnexpectedEof => {
            ZipReadError::CorruptEntry { name: file_name.to_owned(), source: err }
        }
        _ => ZipReadError::Io(err),
    })?;
    debug!("Read {} bytes from {}", bytes.len(), file_name);
    Ok(bytes)
}

fn from_zip_error(err: ZipError, name: &str) -> ZipReadError {
    match err {
        ZipError::Io(err) => ZipReadError::Io(err),
        ZipError::InvalidArchive(s) | ZipError::UnsupportedArchive(s) => {
            ZipReadError::InvalidZip(s)
        }
        ZipError::FileNotFound => ZipReadError::MissingFile(name.to_owned()),
    }
}
