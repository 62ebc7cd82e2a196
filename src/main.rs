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

//! Tool for listing the permissions an APK requests.

use anyhow::Result;
use apkperms::{extract_permissions, print_json_report, print_report};
use clap::{builder::ValueParser, error::ErrorKind, Arg, ArgAction, Command};
use log::debug;
use std::path::PathBuf;
use std::process::exit;

/// Exit status when the arguments are wrong.
const EXIT_USAGE: i32 = 1;
/// Exit status with `--fail-on-error` when extraction failed.
const EXIT_EXTRACTION_FAILED: i32 = 2;

fn clap_command() -> Command {
    Command::new("apkperms")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Lists the android.permission.* permissions an APK declares")
        .arg(
            Arg::new("apk")
                .value_name("APK_PATH")
                .value_parser(ValueParser::path_buf())
                .required(true)
                .allow_hyphen_values(true)
                .help("Path to the APK file"),
        )
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the report as JSON"),
        )
        .arg(
            Arg::new("fail-on-error")
                .long("fail-on-error")
                .action(ArgAction::SetTrue)
                .help("Exit with status 2 if the permissions could not be extracted"),
        )
}

fn print_usage() {
    eprintln!("Usage: apkperms [--json] [--fail-on-error] <APK_PATH>");
    eprintln!();
    eprintln!("Examples:");
    eprintln!("  apkperms ./ApiDemos-debug.apk");
    eprintln!("  apkperms /data/local/tmp/com.example.app.apk");
}

fn main() -> Result<()> {
    env_logger::init();

    let args = match clap_command().try_get_matches() {
        Ok(args) => args,
        Err(e) if matches!(e.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => e.exit(),
        Err(e) => {
            debug!("Invalid arguments: {}", e);
            print_usage();
            exit(EXIT_USAGE);
        }
    };

    let apk_path = args.get_one::<PathBuf>("apk").unwrap();
    let report = extract_permissions(apk_path);
    if args.get_flag("json") {
        print_json_report(&report)?;
    } else {
        print_report(&report)?;
    }

    if !report.success() && args.get_flag("fail-on-error") {
        exit(EXIT_EXTRACTION_FAILED);
    }
    Ok(())
}
