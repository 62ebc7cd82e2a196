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

//! Extraction from real APK archives.

use apkmanifest::decode_manifest;
use apkmanifest::testing::{assert_contains, build_apk, build_apk_with_manifest, ManifestBuilder};
use apkperms::{extract_permissions, ExtractError};
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

fn write_file(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).unwrap();
    path
}

fn write_apk(dir: &TempDir, manifest: &ManifestBuilder) -> PathBuf {
    write_file(dir, "app.apk", &build_apk_with_manifest(&manifest.build()))
}

#[test]
fn sdk_23_duplicate_is_deduplicated() {
    let dir = TempDir::new().unwrap();
    let apk = write_apk(
        &dir,
        &ManifestBuilder::new("com.example.app")
            .uses_permission("android.permission.INTERNET")
            .uses_permission_sdk_23("android.permission.INTERNET"),
    );
    let report = extract_permissions(&apk);
    assert!(report.success(), "{}", report.error());
    assert_eq!(report.permissions().unwrap(), ["android.permission.INTERNET"]);
}

#[test]
fn permissions_come_back_sorted() {
    let dir = TempDir::new().unwrap();
    let apk = write_apk(
        &dir,
        &ManifestBuilder::new("com.example.app")
            .uses_permission("android.permission.WAKE_LOCK")
            .uses_permission("android.permission.ACCESS_NETWORK_STATE")
            .uses_permission_sdk_23("android.permission.CAMERA"),
    );
    let report = extract_permissions(&apk);
    assert_eq!(
        report.permissions().unwrap(),
        [
            "android.permission.ACCESS_NETWORK_STATE",
            "android.permission.CAMERA",
            "android.permission.WAKE_LOCK",
        ]
    );
}

#[test]
fn only_platform_permissions_are_kept() {
    let dir = TempDir::new().unwrap();
    let apk = write_apk(
        &dir,
        &ManifestBuilder::new("com.example.app")
            .utf8(true)
            .uses_permission("com.google.android.c2dm.permission.RECEIVE")
            .uses_permission("android.permission.VIBRATE")
            .element("permission", &[("android:name", "android.permission.DEFINED_HERE".into())]),
    );
    let report = extract_permissions(&apk);
    assert_eq!(report.permissions().unwrap(), ["android.permission.VIBRATE"]);
}

/// A compiled manifest declaring platform, sdk-23, third party and app-defined permissions.
fn compiled_manifest() -> Vec<u8> {
    fs::read("tests/data/AndroidManifest.xml").unwrap()
}

#[test]
fn compiled_manifest_yields_platform_permissions() {
    let dir = TempDir::new().unwrap();
    let apk = write_file(&dir, "permissions.apk", &build_apk_with_manifest(&compiled_manifest()));
    let report = extract_permissions(&apk);
    assert!(report.success(), "{}", report.error());
    assert_eq!(
        report.permissions().unwrap(),
        [
            "android.permission.ACCESS_FINE_LOCATION",
            "android.permission.CAMERA",
            "android.permission.INTERNET",
            "android.permission.WRITE_EXTERNAL_STORAGE",
        ]
    );
}

#[test]
fn compiled_manifest_decodes_typed_attributes() {
    let manifest = decode_manifest(&compiled_manifest()).unwrap();

    let root = &manifest.elements("manifest")[0];
    assert_eq!(root["package"], "com.example.permissions");
    assert_eq!(root["android:versionName"], "1.0");
    assert_eq!(root["android:versionCode"], "1");
    assert_eq!(manifest.elements("uses-sdk")[0]["android:minSdkVersion"], "21");
    assert_eq!(manifest.elements("application")[0]["android:debuggable"], "true");
    assert_eq!(
        manifest.elements("activity")[0]["android:name"],
        "com.example.permissions.MainActivity"
    );
    assert_eq!(manifest.elements("uses-permission").len(), 5);
    assert_eq!(manifest.elements("uses-permission-sdk-23").len(), 2);
    assert_eq!(
        manifest.elements("permission")[0]["android:name"],
        "com.example.permissions.permission.C2D_MESSAGE"
    );
}

#[test]
fn uppercase_extension_is_accepted() {
    let dir = TempDir::new().unwrap();
    let manifest = ManifestBuilder::new("com.example.app")
        .uses_permission("android.permission.INTERNET")
        .build();
    let apk = write_file(&dir, "APP.APK", &build_apk_with_manifest(&manifest));
    assert!(extract_permissions(&apk).success());
}

#[test]
fn corrupt_archive_is_reported() {
    let dir = TempDir::new().unwrap();
    let apk = write_file(&dir, "broken.apk", b"this is not a zip archive at all");
    let report = extract_permissions(&apk);
    assert!(!report.success());
    assert!(matches!(report.outcome(), Err(ExtractError::CorruptArchive(_))));
    assert_contains(&report.error(), "corrupt");
}

#[test]
fn truncated_archive_is_reported() {
    let dir = TempDir::new().unwrap();
    let manifest = ManifestBuilder::new("com.example.app").build();
    let content = build_apk_with_manifest(&manifest);
    let apk = write_file(&dir, "cut.apk", &content[..content.len() / 2]);
    let report = extract_permissions(&apk);
    assert!(matches!(report.outcome(), Err(ExtractError::CorruptArchive(_))));
}

#[test]
fn apk_without_manifest_is_reported() {
    let dir = TempDir::new().unwrap();
    let apk = write_file(&dir, "nomanifest.apk", &build_apk(&[("classes.dex", b"dex\n035\0")]));
    let report = extract_permissions(&apk);
    assert!(matches!(report.outcome(), Err(ExtractError::ManifestNotFound)));
    assert!(report.permissions().is_none());
}

#[test]
fn undecodable_manifest_text_is_reported() {
    let dir = TempDir::new().unwrap();
    let apk = write_apk(
        &dir,
        &ManifestBuilder::new("com.example.app")
            .uses_permission("android.permission.INTERNET")
            .corrupt_string("android.permission.INTERNET"),
    );
    let report = extract_permissions(&apk);
    assert!(matches!(report.outcome(), Err(ExtractError::Decode(_))));
}

#[test]
fn malformed_manifest_is_unexpected() {
    let dir = TempDir::new().unwrap();
    let apk = write_file(&dir, "junk.apk", &build_apk_with_manifest(b"<manifest/>"));
    let report = extract_permissions(&apk);
    match report.outcome() {
        Err(ExtractError::Unexpected { trace, .. }) => assert!(!trace.is_empty()),
        other => panic!("Unexpected outcome {:?}", other),
    }
}

#[test]
fn invalid_paths_are_rejected() {
    let dir = TempDir::new().unwrap();

    let report = extract_permissions(dir.path().join("absent.apk"));
    assert!(matches!(report.outcome(), Err(ExtractError::NotFound(_))));

    let report = extract_permissions(dir.path());
    assert!(matches!(report.outcome(), Err(ExtractError::NotAFile(_))));

    let manifest = ManifestBuilder::new("com.example.app").build();
    let zip = write_file(&dir, "app.zip", &build_apk_with_manifest(&manifest));
    let report = extract_permissions(&zip);
    assert!(matches!(report.outcome(), Err(ExtractError::NotAnApk(_))));
}
