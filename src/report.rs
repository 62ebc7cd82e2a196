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

//! Console rendering of a [`PermissionReport`].

use crate::PermissionReport;
use serde::Serialize;
use std::io::{self, Write};

const BORDER_WIDTH: usize = 60;

/// Writes the human readable report to stdout.
pub fn print_report(report: &PermissionReport) -> io::Result<()> {
    write_report(&mut io::stdout().lock(), report)
}

/// Writes the human readable report: a bordered header naming the APK, then either the numbered
/// permissions or the failure reason.
pub fn write_report<W: Write>(out: &mut W, report: &PermissionReport) -> io::Result<()> {
    let border = "=".repeat(BORDER_WIDTH);
    writeln!(out, "{}", border)?;
    writeln!(out, "APK file: {}", report.apk_path().display())?;
    writeln!(out, "{}", border)?;

    match report.permissions() {
        Some(permissions) => {
            writeln!(out, "Parsed successfully.")?;
            writeln!(out)?;
            writeln!(out, "Permissions found ({}):", permissions.len())?;
            if permissions.is_empty() {
                writeln!(out, "  No android.permission permissions declared.")?;
            }
            for (i, permission) in permissions.iter().enumerate() {
                writeln!(out, "  {}. {}", i + 1, permission)?;
            }
        }
        None => {
            writeln!(out, "Parsing failed.")?;
            writeln!(out, "Reason: {}", report.error())?;
        }
    }
    writeln!(out, "{}", border)
}

#[derive(Serialize)]
struct JsonReport<'a> {
    success: bool,
    apk_path: String,
    permissions: Option<&'a [String]>,
    error: String,
}

/// Writes the report to stdout as JSON.
pub fn print_json_report(report: &PermissionReport) -> io::Result<()> {
    write_json_report(&mut io::stdout().lock(), report)
}

/// Writes the report as a JSON object with `success`, `apk_path`, `permissions` and `error`.
pub fn write_json_report<W: Write>(out: &mut W, report: &PermissionReport) -> io::Result<()> {
    let json = JsonReport {
        success: report.success(),
        apk_path: report.apk_path().display().to_string(),
        permissions: report.permissions(),
        error: report.error(),
    };
    serde_json::to_writer_pretty(&mut *out, &json)?;
    writeln!(out)
}
