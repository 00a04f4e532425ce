use crate::{Device, DeviceRegistry, DeviceStatus, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::interval;
use tracing::{info, warn};

/// 默认巡检周期（秒）
const SWEEP_INTERVAL_SECS: u64 = 60;

/// 设备失联监控器
///
/// 定期巡检注册表，超过 N 倍上报间隔未收到读数的设备标记为离线。
/// 失联设备列表同时作为 connection_lost 告警判定的输入。
pub struct LivenessMonitor {
    /// 设备注册表
    registry: Arc<DeviceRegistry>,

    /// 判定失联的上报间隔倍数
    offline_multiplier: u32,

    /// 是否正在运行
    running: Arc<RwLock<bool>>,
}

impl LivenessMonitor {
    /// 创建新的失联监控器
    ///
    /// # 参数
    /// * `registry` - 设备注册表
    /// * `offline_multiplier` - 判定失联的上报间隔倍数
    pub fn new(registry: Arc<DeviceRegistry>, offline_multiplier: u32) -> Self {
        Self {
            registry,
            offline_multiplier,
            running: Arc::new(RwLock::new(false)),
        }
    }

    /// 启动监控器
    ///
    /// 启动后台任务，定期执行失联巡检
    pub async fn start(&self) {
        let mut running = self.running.write().await;
        if *running {
            warn!("Liveness monitor is already running");
            return;
        }
        *running = true;
        drop(running);

        info!(
            offline_multiplier = self.offline_multiplier,
            "Liveness monitor started"
        );

        let registry = self.registry.clone();
        let multiplier = self.offline_multiplier;
        let running = self.running.clone();

        tokio::spawn(async move {
            let mut sweep_interval = interval(Duration::from_secs(SWEEP_INTERVAL_SECS));

            loop {
                sweep_interval.tick().await;

                let is_running = *running.read().await;
                if !is_running {
                    info!("Liveness monitor stopped");
                    break;
                }

                if let Err(e) = Self::sweep(&registry, multiplier).await {
                    warn!(error = %e, "Liveness sweep failed");
                }
            }
        });
    }

    /// 停止监控器
    pub async fn stop(&self) {
        let mut running = self.running.write().await;
        *running = false;
        info!("Liveness monitor stopping...");
    }

    /// 查询当前失联的设备
    ///
    /// 评估层据此生成 connection_lost 告警
    pub async fn stale_devices(&self) -> Result<Vec<Device>> {
        let now = chrono::Utc::now();
        let devices = self.registry.list_all().await?;
        Ok(devices
            .into_iter()
            .filter(|d| d.is_stale(now, self.offline_multiplier))
            .collect())
    }

    /// 执行一轮失联巡检
    ///
    /// 拆出为关联函数便于后台任务调用和测试直接驱动
    pub async fn sweep(registry: &DeviceRegistry, multiplier: u32) -> Result<usize> {
        let now = chrono::Utc::now();
        let devices = registry.list_all().await?;
        let mut marked = 0;

        for device in devices {
            if device.status != DeviceStatus::Offline && device.is_stale(now, multiplier) {
                if let Err(e) = registry.set_status(&device.id, DeviceStatus::Offline).await {
                    warn!(
                        device_id = %device.id,
                        error = %e,
                        "Failed to mark device offline"
                    );
                } else {
                    warn!(device_id = %device.id, "Device went offline (no readings)");
                    marked += 1;
                }
            }
        }

        Ok(marked)
    }
}
