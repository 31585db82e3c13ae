// Copyright (c) 2025 Kirky.X
//
// Licensed under the MIT License
// See LICENSE file in the project root for full license information.

use crate::utils::errors::CloneError;
use std::path::Path;
use std::time::Duration;
use sysinfo::Disks;
use tracing::{debug, warn};

/// 磁盘检查的触发间隔（按已保存文件数）
const DISK_CHECK_INTERVAL: u64 = 10;

/// 要求的余量倍数：当前负载大小的两倍
const DISK_HEADROOM_FACTOR: u64 = 2;

/// 资源防护
///
/// 限速与磁盘余量检查；两者都只约束工作器自身的推进节奏，
/// 不触碰任何全局状态
pub struct ResourceGuard {
    request_delay: Duration,
}

impl ResourceGuard {
    pub fn new(request_delay_seconds: u64) -> Self {
        Self {
            request_delay: Duration::from_secs(request_delay_seconds),
        }
    }

    /// 任务间延迟
    ///
    /// 首个下载完成之前不延迟，之后每个任务前等待配置的间隔
    pub async fn pace(&self, files_downloaded: u64) {
        if files_downloaded > 0 && !self.request_delay.is_zero() {
            tokio::time::sleep(self.request_delay).await;
        }
    }

    /// 磁盘余量检查
    ///
    /// 每 `DISK_CHECK_INTERVAL` 个已处理任务检查一次，首个任务也检查：
    /// 目标目录所在磁盘的可用空间必须不低于当前负载大小的两倍。
    /// 探测失败只记录告警，不会中断运行
    pub fn check_disk_space(
        &self,
        destination: &Path,
        tasks_completed: u64,
        payload_bytes: u64,
    ) -> Result<(), CloneError> {
        if tasks_completed % DISK_CHECK_INTERVAL != 0 {
            return Ok(());
        }
        let required = payload_bytes.saturating_mul(DISK_HEADROOM_FACTOR);
        if required == 0 {
            return Ok(());
        }

        match free_space_for(destination) {
            Some(free) => {
                debug!(
                    "Disk space check: {} bytes free, {} bytes required",
                    free, required
                );
                if free < required {
                    return Err(CloneError::LowDiskSpace { free });
                }
            }
            None => {
                warn!(
                    "Disk space probe failed for {}, skipping check",
                    destination.display()
                );
            }
        }
        Ok(())
    }
}

/// 目标路径所在磁盘的可用字节数
///
/// 按挂载点前缀匹配，取最长匹配的挂载点
fn free_space_for(path: &Path) -> Option<u64> {
    let disks = Disks::new_with_refreshed_list();
    disks
        .list()
        .iter()
        .filter(|disk| path.starts_with(disk.mount_point()))
        .max_by_key(|disk| disk.mount_point().as_os_str().len())
        .map(|disk| disk.available_space())
}
