// Copyright 2025 Kirky.X
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

use clonrs::config::settings::CloneSettings;
use clonrs::domain::task::CloneStatus;
use clonrs::events::{CloneEvent, LogLevel};
use clonrs::utils::telemetry;
use clonrs::workers::clone_worker::CloneWorker;
use std::sync::atomic::Ordering;
use tracing::{debug, error, info, warn};

/// 主函数
///
/// 应用程序入口点，负责加载配置、启动克隆工作器并消费事件流
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize logging
    telemetry::init_telemetry();
    info!("Starting clonrs...");

    // 2. Load configuration
    let settings = CloneSettings::new()?;
    info!("Configuration loaded");

    // 3. Start the clone worker
    let mut handle = CloneWorker::spawn(settings)?;

    // 4. Wire Ctrl-C to the cancellation flag
    let cancel = handle.cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Ctrl-C received, stopping after the current task");
            cancel.store(true, Ordering::SeqCst);
        }
    });

    // 5. Drain the event stream until the worker finishes
    while let Some(event) = handle.events.recv().await {
        match event {
            CloneEvent::Log { message, level } => match level {
                LogLevel::Error => error!("{}", message),
                LogLevel::Warning => warn!("{}", message),
                LogLevel::Success | LogLevel::Info => info!("{}", message),
            },
            CloneEvent::Progress(percent) => debug!("Progress: {}%", percent),
            CloneEvent::Status {
                files_downloaded,
                total_megabytes,
                elapsed_seconds,
            } => debug!(
                "Status: {} files, {:.2} MB, {:.0}s elapsed",
                files_downloaded, total_megabytes, elapsed_seconds
            ),
            CloneEvent::FileSaved(path) => debug!("File saved: {}", path.display()),
            CloneEvent::PageContent { url, .. } => debug!("Page content received for {}", url),
            CloneEvent::Finished(_) => {}
        }
    }

    // 6. Final report
    let report = handle.join.await?;
    info!(
        "Result: {} | {} files | {:.2} MB | {:.1}s | {:.2} MB/s average",
        report.status.as_str(),
        report.files_downloaded,
        report.total_megabytes(),
        report.duration_seconds,
        report.average_speed()
    );
    if report.status == CloneStatus::Completed {
        info!(
            "Clone saved under {}. Open index.html directly, or serve the folder with a local HTTP server for best fidelity.",
            report.destination_root.display()
        );
    }

    Ok(())
}
